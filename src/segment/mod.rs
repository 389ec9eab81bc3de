//! Text-line segmentation
//!
//! Splits a rendered page image into per-line crops using classical image
//! processing: binarization, morphological closing with a wide flat kernel
//! (bridges gaps between glyphs and words without merging vertically
//! stacked lines), and external contour detection with an area filter.
//!
//! Crops are taken from the original page image, not the binarized one, so
//! the recognition model sees full pixel data.

use image::{GrayImage, RgbImage};
use imageproc::contours::{find_contours, BorderType, Contour};
use imageproc::contrast::{adaptive_threshold, threshold, ThresholdType};
use imageproc::morphology::{grayscale_close, Mask};
use thiserror::Error;

/// Default intensity cutoff for fixed binarization
pub const DEFAULT_THRESHOLD: u8 = 150;
/// Default structuring element width
pub const DEFAULT_KERNEL_WIDTH: u32 = 20;
/// Default structuring element height
pub const DEFAULT_KERNEL_HEIGHT: u32 = 1;
/// Default minimum contour area (in pixels) to count as a text line
pub const DEFAULT_MIN_AREA: u32 = 50;

/// Segmentation error types
#[derive(Debug, Error)]
pub enum SegmentError {
    #[error("Invalid segmentation config: {0}")]
    InvalidConfig(String),
}

/// Binarization strategy
///
/// `Fixed` is the parameterized default exposed to HTTP callers. `Adaptive`
/// thresholds against a local neighborhood mean, which copes better with
/// uneven page illumination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binarization {
    /// Global inverted threshold: intensity <= value becomes foreground
    Fixed { threshold: u8 },
    /// Local mean threshold over a (2 * block_radius + 1) square window
    Adaptive { block_radius: u32 },
}

impl Default for Binarization {
    fn default() -> Self {
        Self::Fixed {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

/// Immutable parameter bundle for line segmentation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentationConfig {
    pub binarization: Binarization,
    /// Structuring element width for morphological closing
    pub kernel_width: u32,
    /// Structuring element height for morphological closing
    pub kernel_height: u32,
    /// Contours with area <= min_area are discarded as noise
    pub min_area: u32,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            binarization: Binarization::default(),
            kernel_width: DEFAULT_KERNEL_WIDTH,
            kernel_height: DEFAULT_KERNEL_HEIGHT,
            min_area: DEFAULT_MIN_AREA,
        }
    }
}

impl SegmentationConfig {
    /// Reject degenerate parameter combinations before any processing runs.
    ///
    /// Kernel dimensions must fit the structuring-element mask (1..=255) and
    /// the area filter must be positive, otherwise speckle noise would pass
    /// straight into recognition.
    pub fn validate(&self) -> Result<(), SegmentError> {
        if self.kernel_width == 0 || self.kernel_height == 0 {
            return Err(SegmentError::InvalidConfig(
                "kernel dimensions must be >= 1".to_string(),
            ));
        }
        if self.kernel_width > 255 || self.kernel_height > 255 {
            return Err(SegmentError::InvalidConfig(
                "kernel dimensions must be <= 255".to_string(),
            ));
        }
        if self.min_area == 0 {
            return Err(SegmentError::InvalidConfig(
                "min_area must be positive".to_string(),
            ));
        }
        match self.binarization {
            Binarization::Fixed { threshold: 0 } => Err(SegmentError::InvalidConfig(
                "threshold_value must be positive".to_string(),
            )),
            Binarization::Adaptive { block_radius: 0 } => Err(SegmentError::InvalidConfig(
                "block_radius must be positive".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

/// Axis-aligned bounding box of a detected line, in page-image coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineBounds {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// A cropped line image produced by segmentation
#[derive(Debug, Clone)]
pub struct LineImage {
    pub bounds: LineBounds,
    pub pixels: RgbImage,
}

/// Segment a page image into text-line crops.
///
/// Returns crops sorted into reading order (top edge first, left edge as
/// tie-break). A blank or empty page yields an empty vector, never an
/// error: the area filter naturally admits nothing.
pub fn segment_lines(
    page: &RgbImage,
    config: &SegmentationConfig,
) -> Result<Vec<LineImage>, SegmentError> {
    config.validate()?;

    if page.width() == 0 || page.height() == 0 {
        return Ok(Vec::new());
    }

    let gray: GrayImage = image::imageops::grayscale(page);
    let binary = binarize(&gray, config.binarization);

    // Bridge gaps between glyphs so each text line becomes one connected
    // region. On a 0/255 image grayscale closing is plain binary closing.
    let mask = Mask::rectangle(config.kernel_width as u8, config.kernel_height as u8);
    let closed = grayscale_close(&binary, &mask);

    let contours = find_contours::<u32>(&closed);

    let mut bounds: Vec<LineBounds> = contours
        .iter()
        .filter(|c| c.parent.is_none() && c.border_type == BorderType::Outer)
        .filter(|c| contour_area(c) > config.min_area as f64)
        .filter_map(|c| bounding_rect(c, page.width(), page.height()))
        .collect();

    // Contour discovery order is an implementation detail of the tracing
    // algorithm; pin the output to reading order.
    bounds.sort_by_key(|b| (b.y, b.x));

    let lines = bounds
        .into_iter()
        .map(|b| LineImage {
            bounds: b,
            pixels: image::imageops::crop_imm(page, b.x, b.y, b.width, b.height).to_image(),
        })
        .collect();

    Ok(lines)
}

/// Map dark-on-light text to 255-valued foreground.
fn binarize(gray: &GrayImage, strategy: Binarization) -> GrayImage {
    match strategy {
        Binarization::Fixed { threshold: value } => {
            threshold(gray, value, ThresholdType::BinaryInverted)
        }
        Binarization::Adaptive { block_radius } => {
            let mut thresh = adaptive_threshold(gray, block_radius);
            for px in thresh.iter_mut() {
                *px = 255 - *px;
            }
            thresh
        }
    }
}

/// Enclosed area of a contour via the shoelace formula.
fn contour_area(contour: &Contour<u32>) -> f64 {
    let points = &contour.points;
    if points.len() < 3 {
        return 0.0;
    }

    let mut area = 0.0;
    let n = points.len();
    for i in 0..n {
        let j = (i + 1) % n;
        area += points[i].x as f64 * points[j].y as f64;
        area -= points[j].x as f64 * points[i].y as f64;
    }
    area.abs() / 2.0
}

/// Axis-aligned bounding rectangle of a contour, clamped to image bounds.
fn bounding_rect(contour: &Contour<u32>, img_width: u32, img_height: u32) -> Option<LineBounds> {
    let mut min_x = u32::MAX;
    let mut min_y = u32::MAX;
    let mut max_x = 0u32;
    let mut max_y = 0u32;

    for p in &contour.points {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }

    if min_x > max_x || min_y > max_y {
        return None;
    }

    let width = (max_x - min_x + 1).min(img_width - min_x);
    let height = (max_y - min_y + 1).min(img_height - min_y);

    Some(LineBounds {
        x: min_x,
        y: min_y,
        width,
        height,
    })
}
