//! Recognition types
//!
//! Identifiers and error types for the recognition engine and model
//! registry.

use std::fmt;

use thiserror::Error;

/// Identifier of a recognition model from the supported catalog
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModelId(String);

impl ModelId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Directory name for this model's artifacts. Identifier namespaces use
    /// `/`, which cannot appear in a path component.
    pub fn artifact_dir_name(&self) -> String {
        self.0.replace('/', "__")
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Recognition error types
#[derive(Debug, Error)]
pub enum OcrError {
    /// The identifier is not in the catalog, or its artifacts are missing
    /// or corrupt
    #[error("Failed to load model '{model}': {message}")]
    ModelLoad { model: String, message: String },

    /// Pre-processing or generation failed for a line image
    #[error("Recognition failed: {0}")]
    Recognition(String),
}

impl OcrError {
    pub fn model_load(model: &ModelId, message: impl Into<String>) -> Self {
        Self::ModelLoad {
            model: model.as_str().to_string(),
            message: message.into(),
        }
    }
}
