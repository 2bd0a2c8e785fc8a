//! A minimal build pipeline for running the indexer as one step among others.

use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::Result;
use crate::file_map::FileMap;
use crate::host::{BuildHost, SourceTree};

/// One step of a build: reads and writes the shared file map.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Process the file map. Returning marks the step as complete.
    async fn run(&self, files: &mut FileMap, host: &dyn BuildHost) -> Result<()>;
}

/// Reads a source tree and runs plugins over it in order.
pub struct Pipeline {
    source: SourceTree,
    plugins: Vec<Box<dyn Plugin>>,
}

impl Pipeline {
    /// Create a pipeline over a source tree.
    pub fn new(source: SourceTree) -> Self {
        Self {
            source,
            plugins: Vec::new(),
        }
    }

    /// Append a plugin.
    pub fn with_plugin(mut self, plugin: impl Plugin + 'static) -> Self {
        self.plugins.push(Box::new(plugin));
        self
    }

    /// The source tree this pipeline reads.
    pub fn source(&self) -> &SourceTree {
        &self.source
    }

    /// Read the source tree and run every plugin, returning the final file map.
    pub async fn build(&self) -> Result<FileMap> {
        let mut files = self.source.read()?;
        self.process(&mut files).await?;
        Ok(files)
    }

    /// Run every plugin over an existing file map.
    pub async fn process(&self, files: &mut FileMap) -> Result<()> {
        for plugin in &self.plugins {
            debug!("Running plugin {}", plugin.name());
            plugin.run(files, &self.source).await?;
        }
        info!("Build finished with {} files", files.len());
        Ok(())
    }
}
