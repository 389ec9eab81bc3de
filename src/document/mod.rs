//! PDF document handling
//!
//! Wraps MuPDF document loading and per-page rasterization. A
//! [`PageDocument`] is request-scoped: it is created from an uploaded byte
//! buffer, driven page by page on a single blocking thread, and dropped
//! when the request completes.

mod error;
mod render;

pub use error::{DocumentError, DocumentResult};

use mupdf::Document;

/// Magic bytes every PDF starts with
const PDF_MAGIC: &[u8] = b"%PDF-";

/// A decoded PDF document with a fixed, ordered set of pages
pub struct PageDocument {
    doc: Document,
    page_count: usize,
}

impl PageDocument {
    /// Open a PDF from an in-memory byte buffer.
    ///
    /// Validates the magic bytes before handing the buffer to MuPDF so that
    /// arbitrary uploads fail with a clear open error instead of whatever a
    /// format probe produces.
    pub fn from_bytes(data: &[u8]) -> DocumentResult<Self> {
        if !data.starts_with(PDF_MAGIC) {
            return Err(DocumentError::Open(
                "input is not a PDF (missing %PDF- header)".to_string(),
            ));
        }

        let doc = Document::from_bytes(data, "application/pdf")
            .map_err(|e| DocumentError::Open(e.to_string()))?;
        let page_count = doc
            .page_count()
            .map_err(|e| DocumentError::Open(e.to_string()))? as usize;

        Ok(Self { doc, page_count })
    }

    /// Number of pages, in document order.
    pub fn page_count(&self) -> usize {
        self.page_count
    }

    /// Rasterize one page to an RGB image at the renderer's default
    /// resolution (72 DPI, scale 1.0).
    pub fn rasterize_page(&self, page_index: usize) -> DocumentResult<image::RgbImage> {
        if page_index >= self.page_count {
            return Err(DocumentError::Render(format!(
                "page index {} out of range (document has {} pages)",
                page_index, self.page_count
            )));
        }
        render::rasterize_page(&self.doc, page_index as i32)
    }
}
