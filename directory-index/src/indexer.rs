//! Runs index generation for every configured directory.

use std::any::Any;
use std::collections::{BTreeMap, BTreeSet};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::builder::IndexBuilder;
use crate::callbacks::CallbackRegistry;
use crate::config::{IndexesConfig, ResolvedIndexConfig};
use crate::enumerator::{Child, TreeEnumerator};
use crate::error::{IndexError, Result};
use crate::file_map::FileMap;
use crate::host::BuildHost;
use crate::pipeline::Plugin;

/// A directory whose index could not be generated.
#[derive(Debug)]
pub struct DirectoryFailure {
    /// The configured directory key.
    pub dir: String,

    /// Why it failed.
    pub error: IndexError,
}

/// Outcome of one indexing run.
#[derive(Debug, Default)]
pub struct RunReport {
    /// File map keys of the generated indexes, in directory key order.
    pub indexed: Vec<String>,

    /// Directories that produced no index.
    pub failures: Vec<DirectoryFailure>,
}

impl RunReport {
    /// Check whether every configured directory was indexed.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Look up the failure for a directory key.
    pub fn failure(&self, dir: &str) -> Option<&IndexError> {
        self.failures
            .iter()
            .find(|f| f.dir == dir)
            .map(|f| &f.error)
    }
}

/// Generates index files for a set of configured directories.
///
/// Each directory is an isolated unit of work: its configuration is
/// resolved, its source directory enumerated on the blocking pool, and its
/// index built and inserted. A failure in one directory is logged and
/// recorded in the [`RunReport`] without affecting the others.
#[derive(Debug, Clone, Default)]
pub struct DirectoryIndexer {
    /// Directories to index.
    config: IndexesConfig,

    /// Callbacks available to configuration by name.
    registry: Arc<CallbackRegistry>,
}

impl DirectoryIndexer {
    /// Create an indexer with the built-in callback registry.
    pub fn new(config: IndexesConfig) -> Self {
        Self {
            config,
            registry: Arc::new(CallbackRegistry::new()),
        }
    }

    /// Use a custom callback registry.
    pub fn with_registry(mut self, registry: CallbackRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    /// The configured directories.
    pub fn config(&self) -> &IndexesConfig {
        &self.config
    }

    /// Index every configured directory into `files`.
    ///
    /// Returns once every directory has been attempted. Every failure is
    /// scoped to its directory and reported in the returned [`RunReport`].
    /// Two keys that normalize to the same destination are not both built:
    /// the later key fails with [`IndexError::InvalidConfiguration`].
    pub async fn run(&self, files: &mut FileMap, host: &dyn BuildHost) -> Result<RunReport> {
        let mut report = RunReport::default();

        if self.config.is_empty() {
            debug!("No directories configured for indexing");
            return Ok(report);
        }

        let mut tasks = JoinSet::new();
        let mut destinations: BTreeMap<String, &str> = BTreeMap::new();
        let mut pending: BTreeSet<String> = BTreeSet::new();
        for (dir, options) in self.config.iter() {
            let resolved = match options.resolve(dir, &self.registry) {
                Ok(resolved) => resolved,
                Err(error) => {
                    record_failure(&mut report, dir, error);
                    continue;
                }
            };

            let destination = resolved.destination();
            if let Some(owner) = destinations.get(&destination) {
                let error = IndexError::InvalidConfiguration {
                    dir: dir.to_string(),
                    reason: format!("{destination} is already generated for {owner}"),
                };
                record_failure(&mut report, dir, error);
                continue;
            }
            destinations.insert(destination, dir);

            let root = host.source_path(dir);
            let dir = dir.to_string();
            pending.insert(dir.clone());
            debug!("Enumerating {} for {dir}", root.display());
            tasks.spawn_blocking(move || {
                let enumerator = TreeEnumerator::new(root, resolved.recursive);
                let children = panic::catch_unwind(AssertUnwindSafe(|| enumerator.enumerate(&dir)))
                    .unwrap_or_else(|payload| {
                        Err(IndexError::TaskFailed {
                            dir: dir.clone(),
                            reason: panic_message(payload.as_ref()),
                        })
                    });
                (dir, resolved, children)
            });
        }

        let mut enumerated: Vec<(String, ResolvedIndexConfig, Vec<Child>)> = Vec::new();
        let mut join_errors = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            let (dir, resolved, children) = match joined {
                Ok(finished) => finished,
                Err(error) => {
                    warn!("Enumeration task did not complete: {error}");
                    join_errors.push(error.to_string());
                    continue;
                }
            };
            pending.remove(&dir);
            match children {
                Ok(children) => enumerated.push((dir, resolved, children)),
                Err(error) => record_failure(&mut report, &dir, error),
            }
        }

        record_unfinished(&mut report, pending, &join_errors);

        enumerated.sort_by(|a, b| a.0.cmp(&b.0));
        for (dir, resolved, children) in enumerated {
            let built = panic::catch_unwind(AssertUnwindSafe(|| {
                IndexBuilder::new(&resolved).build(files, &children)
            }))
            .unwrap_or_else(|payload| {
                Err(IndexError::InvalidConfiguration {
                    dir: dir.clone(),
                    reason: format!("callback panicked: {}", panic_message(payload.as_ref())),
                })
            });

            match built {
                Ok(index) => {
                    let destination = resolved.destination();
                    files.insert(&destination, index);
                    report.indexed.push(destination);
                }
                Err(error) => record_failure(&mut report, &dir, error),
            }
        }

        report.failures.sort_by(|a, b| a.dir.cmp(&b.dir));
        info!(
            "Indexed {} of {} directories",
            report.indexed.len(),
            self.config.len()
        );

        Ok(report)
    }
}

#[async_trait]
impl Plugin for DirectoryIndexer {
    fn name(&self) -> &str {
        "directory-index"
    }

    async fn run(&self, files: &mut FileMap, host: &dyn BuildHost) -> Result<()> {
        DirectoryIndexer::run(self, files, host).await.map(|_| ())
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Fail every directory whose enumeration task never returned.
fn record_unfinished(report: &mut RunReport, pending: BTreeSet<String>, join_errors: &[String]) {
    for dir in pending {
        let error = IndexError::TaskFailed {
            dir: dir.clone(),
            reason: join_errors.join("; "),
        };
        record_failure(report, &dir, error);
    }
}

fn record_failure(report: &mut RunReport, dir: &str, error: IndexError) {
    warn!("Skipping index for {dir}: {error}");
    report.failures.push(DirectoryFailure {
        dir: dir.to_string(),
        error,
    });
}
