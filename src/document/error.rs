//! Document error types

use thiserror::Error;

/// Errors from opening or rasterizing a PDF document
#[derive(Debug, Error)]
pub enum DocumentError {
    /// Input bytes are not a parseable PDF
    #[error("Failed to open document: {0}")]
    Open(String),

    /// A page failed to rasterize
    #[error("Render error: {0}")]
    Render(String),
}

/// Result type alias for document operations
pub type DocumentResult<T> = std::result::Result<T, DocumentError>;
