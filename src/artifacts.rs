//! Debug line artifacts
//!
//! Optional side-channel that records each segmented line crop for offline
//! inspection. The sink is injected into the pipeline with a no-op default;
//! recording is best-effort and never fails a request.

use std::path::PathBuf;

use image::RgbImage;
use tracing::warn;

/// Receives each line crop as it is recognized
pub trait LineArtifactSink: Send + Sync {
    /// Record one line crop. `line_counter` runs across the whole document.
    fn record(&self, page_index: usize, line_counter: usize, line: &RgbImage);
}

/// Discards everything (the default)
pub struct NoopSink;

impl LineArtifactSink for NoopSink {
    fn record(&self, _page_index: usize, _line_counter: usize, _line: &RgbImage) {}
}

/// Writes each crop as `line_{page}_{counter}.png` into a directory
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    /// Create the sink, ensuring the target directory exists.
    pub fn new(dir: PathBuf) -> std::io::Result<Self> {
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }
}

impl LineArtifactSink for DirectorySink {
    fn record(&self, page_index: usize, line_counter: usize, line: &RgbImage) {
        let path = self
            .dir
            .join(format!("line_{page_index}_{line_counter}.png"));
        if let Err(err) = line.save(&path) {
            warn!(path = %path.display(), "Failed to write line artifact: {err}");
        }
    }
}
