//! Model registry
//!
//! Owns the fixed catalog of supported model identifiers and the bounded
//! cache of loaded handles. Activation is lazy: a model's artifacts are
//! only read when a request first names it, and a cached handle is reused
//! without touching disk. The cache lock is held across a load so each
//! identifier loads at most once even under concurrent first requests.

use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;
use tracing::{debug, info};

use super::engine::ModelHandle;
use super::generator::{DecodingParams, Seq2SeqGenerator};
use super::processor::LineProcessor;
use super::types::{ModelId, OcrError};

/// The fixed, ordered catalog of supported recognition models
pub const SUPPORTED_MODELS: [&str; 8] = [
    "microsoft/trocr-large-handwritten",
    "microsoft/trocr-large-printed",
    "microsoft/trocr-small-printed",
    "microsoft/trocr-small-handwritten",
    "microsoft/trocr-base-handwritten",
    "microsoft/trocr-base-printed",
    "microsoft/trocr-base-stage1",
    "microsoft/trocr-large-stage1",
];

/// Identifier loaded when a request does not name a model
pub const DEFAULT_MODEL: &str = "microsoft/trocr-base-printed";

/// Loads a model handle for a resolved catalog identifier
pub trait ModelLoader: Send + Sync {
    fn load(&self, id: &ModelId) -> Result<ModelHandle, OcrError>;
}

/// Loads model artifacts from a directory tree on disk
pub struct DiskModelLoader {
    models_dir: PathBuf,
}

impl DiskModelLoader {
    pub fn new(models_dir: PathBuf) -> Self {
        Self { models_dir }
    }
}

impl ModelLoader for DiskModelLoader {
    fn load(&self, id: &ModelId) -> Result<ModelHandle, OcrError> {
        let dir = self.models_dir.join(id.artifact_dir_name());
        if !dir.is_dir() {
            return Err(OcrError::model_load(
                id,
                format!(
                    "no artifacts at {}; expected encoder.rten, decoder.rten, \
                     processor.json and a vocabulary file",
                    dir.display()
                ),
            ));
        }

        let processor = LineProcessor::load(id, &dir)?;
        let manifest = processor.manifest();
        let params = DecodingParams {
            bos_token_id: manifest.bos_token_id,
            eos_token_id: manifest.eos_token_id,
            max_length: manifest.max_length,
        };
        let generator = Seq2SeqGenerator::load(id, &dir, params)?;

        Ok(ModelHandle::new(id.clone(), processor, Box::new(generator)))
    }
}

/// Catalog plus bounded cache of loaded model handles
pub struct ModelRegistry {
    catalog: Vec<ModelId>,
    default_id: ModelId,
    loader: Box<dyn ModelLoader>,
    loaded: Mutex<LruCache<ModelId, Arc<ModelHandle>>>,
}

impl ModelRegistry {
    /// Create a registry over the standard catalog.
    ///
    /// `cache_capacity` bounds how many loaded models stay resident;
    /// capacity 1 gives the single-active-slot memory profile, larger
    /// values keep recently used models warm.
    pub fn new(loader: Box<dyn ModelLoader>, cache_capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(cache_capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            catalog: SUPPORTED_MODELS.iter().map(|id| ModelId::new(*id)).collect(),
            default_id: ModelId::new(DEFAULT_MODEL),
            loader,
            loaded: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// The fixed ordered catalog, independent of what is loaded.
    pub fn supported(&self) -> Vec<String> {
        self.catalog.iter().map(|id| id.as_str().to_string()).collect()
    }

    pub fn default_id(&self) -> &ModelId {
        &self.default_id
    }

    /// Resolve an identifier (or the default) to a loaded handle.
    ///
    /// Returns the cached handle when the identifier is already loaded.
    /// A failed load leaves the cache untouched, so previously activated
    /// models keep working.
    pub fn activate(&self, requested: Option<&str>) -> Result<Arc<ModelHandle>, OcrError> {
        let id = match requested {
            Some(name) => self.resolve(name)?,
            None => self.default_id.clone(),
        };

        let mut loaded = self.loaded.lock();
        if let Some(handle) = loaded.get(&id) {
            debug!(model = %id, "Reusing loaded model");
            return Ok(handle.clone());
        }

        info!(model = %id, "Loading recognition model");
        let handle = Arc::new(self.loader.load(&id)?);
        loaded.put(id, handle.clone());
        Ok(handle)
    }

    fn resolve(&self, name: &str) -> Result<ModelId, OcrError> {
        self.catalog
            .iter()
            .find(|id| id.as_str() == name)
            .cloned()
            .ok_or_else(|| OcrError::ModelLoad {
                model: name.to_string(),
                message: "not in the supported model catalog".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::generator::TextGenerator;
    use crate::ocr::processor::ProcessorManifest;
    use rten_tensor::NdTensorView;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubGenerator;

    impl TextGenerator for StubGenerator {
        fn generate(&self, _pixel_values: NdTensorView<f32, 4>) -> Result<Vec<i32>, OcrError> {
            Ok(vec![0, 2])
        }
    }

    struct CountingLoader {
        loads: Arc<AtomicUsize>,
    }

    impl ModelLoader for CountingLoader {
        fn load(&self, id: &ModelId) -> Result<ModelHandle, OcrError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            Ok(ModelHandle::new(
                id.clone(),
                LineProcessor::from_parts(ProcessorManifest::default(), vec!["a".to_string()]),
                Box::new(StubGenerator),
            ))
        }
    }

    fn counting_registry(capacity: usize) -> (ModelRegistry, Arc<AtomicUsize>) {
        let loads = Arc::new(AtomicUsize::new(0));
        let registry = ModelRegistry::new(
            Box::new(CountingLoader {
                loads: loads.clone(),
            }),
            capacity,
        );
        (registry, loads)
    }

    #[test]
    fn supported_is_ordered_and_idempotent() {
        let (registry, _) = counting_registry(1);
        let first = registry.supported();
        let second = registry.supported();
        assert_eq!(first, second);
        assert_eq!(first.len(), SUPPORTED_MODELS.len());
        assert_eq!(first[0], SUPPORTED_MODELS[0]);
        assert!(first.contains(&DEFAULT_MODEL.to_string()));
    }

    #[test]
    fn activating_same_model_twice_loads_once() {
        let (registry, loads) = counting_registry(1);
        registry.activate(Some(DEFAULT_MODEL)).unwrap();
        registry.activate(Some(DEFAULT_MODEL)).unwrap();
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn activating_none_uses_the_default_slot() {
        let (registry, loads) = counting_registry(1);
        let by_default = registry.activate(None).unwrap();
        let by_name = registry.activate(Some(DEFAULT_MODEL)).unwrap();
        assert_eq!(by_default.id(), by_name.id());
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unknown_identifier_fails_without_loading() {
        let (registry, loads) = counting_registry(1);
        let result = registry.activate(Some("acme/unknown-model"));
        assert!(matches!(result, Err(OcrError::ModelLoad { .. })));
        assert_eq!(loads.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unknown_identifier_does_not_evict_loaded_models() {
        let (registry, loads) = counting_registry(1);
        registry.activate(Some(DEFAULT_MODEL)).unwrap();
        let _ = registry.activate(Some("acme/unknown-model"));
        registry.activate(Some(DEFAULT_MODEL)).unwrap();
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn single_slot_cache_reloads_after_eviction() {
        let (registry, loads) = counting_registry(1);
        registry.activate(Some("microsoft/trocr-base-printed")).unwrap();
        registry
            .activate(Some("microsoft/trocr-base-handwritten"))
            .unwrap();
        registry.activate(Some("microsoft/trocr-base-printed")).unwrap();
        assert_eq!(loads.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn larger_cache_keeps_both_models_warm() {
        let (registry, loads) = counting_registry(2);
        registry.activate(Some("microsoft/trocr-base-printed")).unwrap();
        registry
            .activate(Some("microsoft/trocr-base-handwritten"))
            .unwrap();
        registry.activate(Some("microsoft/trocr-base-printed")).unwrap();
        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn disk_loader_reports_missing_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let loader = DiskModelLoader::new(dir.path().to_path_buf());
        let result = loader.load(&ModelId::new(DEFAULT_MODEL));
        assert!(matches!(result, Err(OcrError::ModelLoad { .. })));
    }
}
