//! Line pre-processor
//!
//! Converts a cropped line image into the normalized tensor a recognition
//! model expects, and decodes generated token ids back to text using the
//! model's vocabulary. The two directions live together because they are
//! two halves of the same artifact set: the manifest fixes the input
//! geometry and normalization, the vocabulary fixes the output mapping.

use std::fs;
use std::path::Path;

use image::RgbImage;
use rten_tensor::NdTensor;
use serde::Deserialize;

use super::types::{ModelId, OcrError};

/// SentencePiece word-boundary marker used in model vocabularies
const WORD_MARKER: char = '\u{2581}';

/// Per-model processing manifest, stored as `processor.json` next to the
/// model weights.
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessorManifest {
    /// Model input width in pixels
    pub input_width: u32,
    /// Model input height in pixels
    pub input_height: u32,
    /// Channel-wise normalization mean
    pub image_mean: [f32; 3],
    /// Channel-wise normalization std
    pub image_std: [f32; 3],
    /// Start-of-sequence token id
    pub bos_token_id: i32,
    /// End-of-sequence token id
    pub eos_token_id: i32,
    /// Padding token id
    pub pad_token_id: i32,
    /// Maximum generated sequence length
    pub max_length: usize,
    /// Vocabulary file name, one token per line
    #[serde(default = "default_vocab_file")]
    pub vocab_file: String,
}

fn default_vocab_file() -> String {
    "vocab.txt".to_string()
}

impl Default for ProcessorManifest {
    fn default() -> Self {
        Self {
            input_width: 384,
            input_height: 384,
            image_mean: [0.5, 0.5, 0.5],
            image_std: [0.5, 0.5, 0.5],
            bos_token_id: 0,
            eos_token_id: 2,
            pad_token_id: 1,
            max_length: 64,
            vocab_file: default_vocab_file(),
        }
    }
}

/// Image-to-tensor encoder and token-id-to-text decoder for one model
pub struct LineProcessor {
    manifest: ProcessorManifest,
    vocab: Vec<String>,
}

impl LineProcessor {
    /// Load the manifest and vocabulary from a model artifact directory.
    pub fn load(model: &ModelId, dir: &Path) -> Result<Self, OcrError> {
        let manifest_path = dir.join("processor.json");
        let raw = fs::read_to_string(&manifest_path).map_err(|e| {
            OcrError::model_load(
                model,
                format!("cannot read {}: {}", manifest_path.display(), e),
            )
        })?;
        let manifest: ProcessorManifest = serde_json::from_str(&raw).map_err(|e| {
            OcrError::model_load(
                model,
                format!("invalid manifest {}: {}", manifest_path.display(), e),
            )
        })?;

        let vocab_path = dir.join(&manifest.vocab_file);
        let vocab_raw = fs::read_to_string(&vocab_path).map_err(|e| {
            OcrError::model_load(model, format!("cannot read {}: {}", vocab_path.display(), e))
        })?;
        let vocab: Vec<String> = vocab_raw.lines().map(|l| l.to_string()).collect();
        if vocab.is_empty() {
            return Err(OcrError::model_load(
                model,
                format!("vocabulary {} is empty", vocab_path.display()),
            ));
        }

        Ok(Self::from_parts(manifest, vocab))
    }

    /// Build a processor from already-loaded parts.
    pub fn from_parts(manifest: ProcessorManifest, vocab: Vec<String>) -> Self {
        Self { manifest, vocab }
    }

    pub fn manifest(&self) -> &ProcessorManifest {
        &self.manifest
    }

    /// Encode a line crop into a normalized `[1, 3, H, W]` tensor.
    pub fn encode(&self, line: &RgbImage) -> NdTensor<f32, 4> {
        let width = self.manifest.input_width;
        let height = self.manifest.input_height;
        let resized = image::imageops::resize(
            line,
            width,
            height,
            image::imageops::FilterType::Triangle,
        );

        let mean = self.manifest.image_mean;
        let std = self.manifest.image_std;
        let mut tensor = NdTensor::zeros([1, 3, height as usize, width as usize]);
        for (x, y, pixel) in resized.enumerate_pixels() {
            for c in 0..3 {
                let value = pixel.0[c] as f32 / 255.0;
                tensor[[0, c, y as usize, x as usize]] = (value - mean[c]) / std[c];
            }
        }
        tensor
    }

    /// Decode generated token ids to text, skipping special control tokens
    /// and expanding SentencePiece word markers to spaces.
    pub fn decode(&self, token_ids: &[i32]) -> String {
        let specials = [
            self.manifest.bos_token_id,
            self.manifest.eos_token_id,
            self.manifest.pad_token_id,
        ];

        let mut text = String::new();
        for &id in token_ids {
            if id < 0 || specials.contains(&id) {
                continue;
            }
            let Some(token) = self.vocab.get(id as usize) else {
                continue;
            };
            match token.strip_prefix(WORD_MARKER) {
                Some(rest) => {
                    text.push(' ');
                    text.push_str(rest);
                }
                None => text.push_str(token),
            }
        }
        text.trim().to_string()
    }
}
