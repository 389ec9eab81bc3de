//! Recognition engine
//!
//! A [`ModelHandle`] bundles the pre-processor and generative model loaded
//! for one catalog identifier. Handles are immutable once built and shared
//! as `Arc`s by the registry, so a request holds onto the exact pair it
//! started with even if another request causes a different model to load.

use image::RgbImage;

use super::generator::TextGenerator;
use super::processor::LineProcessor;
use super::types::{ModelId, OcrError};

/// A loaded (pre-processor, generative model) pair
pub struct ModelHandle {
    id: ModelId,
    processor: LineProcessor,
    generator: Box<dyn TextGenerator>,
}

impl ModelHandle {
    pub fn new(id: ModelId, processor: LineProcessor, generator: Box<dyn TextGenerator>) -> Self {
        Self {
            id,
            processor,
            generator,
        }
    }

    pub fn id(&self) -> &ModelId {
        &self.id
    }

    /// Recognize one line image: encode it to a tensor, run sequence
    /// generation, and decode the token ids with special tokens stripped.
    pub fn recognize(&self, line: &RgbImage) -> Result<String, OcrError> {
        let pixel_values = self.processor.encode(line);
        let token_ids = self.generator.generate(pixel_values.view())?;
        Ok(self.processor.decode(&token_ids))
    }
}
