//! Application state management

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::artifacts::{DirectorySink, LineArtifactSink, NoopSink};
use crate::config::Config;
use crate::ocr::{DiskModelLoader, ModelRegistry};
use crate::pipeline::ExtractionPipeline;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    registry: Arc<ModelRegistry>,
    pipeline: ExtractionPipeline,
}

impl AppState {
    /// Create application state with the disk-backed model loader.
    pub fn new(config: Config) -> Self {
        let loader = DiskModelLoader::new(config.models.dir.clone());
        let registry = Arc::new(ModelRegistry::new(
            Box::new(loader),
            config.models.cache_capacity,
        ));
        Self::with_registry(config, registry)
    }

    /// Create application state around an existing registry.
    ///
    /// Route tests use this to inject a registry with a stub loader.
    pub fn with_registry(config: Config, registry: Arc<ModelRegistry>) -> Self {
        let sink: Arc<dyn LineArtifactSink> = match &config.debug_line_dir {
            Some(dir) => match DirectorySink::new(dir.clone()) {
                Ok(sink) => Arc::new(sink),
                Err(err) => {
                    warn!(dir = %dir.display(), "Cannot create debug line directory: {err}");
                    Arc::new(NoopSink)
                }
            },
            None => Arc::new(NoopSink),
        };

        let pipeline = ExtractionPipeline::new(
            registry.clone(),
            sink,
            Duration::from_secs(config.ocr_timeout_secs),
        );

        Self {
            inner: Arc::new(AppStateInner {
                config,
                registry,
                pipeline,
            }),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the model registry
    pub fn registry(&self) -> &ModelRegistry {
        &self.inner.registry
    }

    /// Get the extraction pipeline
    pub fn pipeline(&self) -> &ExtractionPipeline {
        &self.inner.pipeline
    }
}
