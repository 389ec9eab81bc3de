//! Page rasterization
//!
//! Renders a single PDF page to an RGB pixel buffer via MuPDF.

use image::RgbImage;
use mupdf::{Colorspace, Document, Matrix};

use super::{DocumentError, DocumentResult};

/// Render `page_index` of `doc` to an RGB image at scale 1.0.
pub fn rasterize_page(doc: &Document, page_index: i32) -> DocumentResult<RgbImage> {
    let page = doc
        .load_page(page_index)
        .map_err(|e| DocumentError::Render(format!("failed to load page {page_index}: {e}")))?;

    let matrix = Matrix::new_scale(1.0, 1.0);
    let colorspace = Colorspace::device_rgb();
    // No alpha channel: empty page regions come back white instead of
    // transparent, which downstream binarization treats as background.
    let pixmap = page
        .to_pixmap(&matrix, &colorspace, false, true)
        .map_err(|e| DocumentError::Render(format!("failed to render page {page_index}: {e}")))?;

    pixmap_to_image(&pixmap)
}

/// Convert a MuPDF pixmap to an `RgbImage`, dropping any alpha channel.
fn pixmap_to_image(pixmap: &mupdf::Pixmap) -> DocumentResult<RgbImage> {
    let width = pixmap.width() as u32;
    let height = pixmap.height() as u32;
    let samples = pixmap.samples();
    let n = pixmap.n() as usize;

    let mut rgb_buffer = Vec::with_capacity((width * height * 3) as usize);
    for y in 0..height as usize {
        for x in 0..width as usize {
            let offset = (y * width as usize + x) * n;
            let r = samples.get(offset).copied().unwrap_or(0);
            let g = samples.get(offset + 1).copied().unwrap_or(0);
            let b = samples.get(offset + 2).copied().unwrap_or(0);
            rgb_buffer.extend_from_slice(&[r, g, b]);
        }
    }

    RgbImage::from_raw(width, height, rgb_buffer)
        .ok_or_else(|| DocumentError::Render("failed to create image buffer".to_string()))
}
