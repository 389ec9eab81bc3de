//! Generative text decoding
//!
//! The [`TextGenerator`] trait is the seam between the recognition engine
//! and a concrete model runtime. The bundled implementation runs an
//! encoder/decoder pair with greedy autoregressive decoding: one encoder
//! pass over the line tensor, then repeated decoder passes that extend the
//! token sequence until the end-of-sequence token or the length cap.

use std::path::Path;

use rten::Model;
use rten_tensor::prelude::*;
use rten_tensor::{NdTensor, NdTensorView};
use tracing::debug;

use super::types::{ModelId, OcrError};

/// Decoding policy owned by the model
#[derive(Debug, Clone, Copy)]
pub struct DecodingParams {
    pub bos_token_id: i32,
    pub eos_token_id: i32,
    pub max_length: usize,
}

/// Maps a preprocessed line tensor to a generated token id sequence
pub trait TextGenerator: Send + Sync {
    fn generate(&self, pixel_values: NdTensorView<f32, 4>) -> Result<Vec<i32>, OcrError>;
}

/// Encoder/decoder generator backed by the rten runtime.
///
/// Expects two model files: `encoder.rten` taking the pixel tensor and
/// producing a hidden-state sequence, and `decoder.rten` taking
/// `input_ids` plus `encoder_hidden_states` and producing next-token
/// logits. Execution is CPU-bound and fixed at construction.
pub struct Seq2SeqGenerator {
    encoder: Model,
    decoder: Model,
    token_input: rten::NodeId,
    hidden_input: rten::NodeId,
    params: DecodingParams,
}

impl Seq2SeqGenerator {
    /// Load the encoder/decoder pair from a model artifact directory.
    pub fn load(model: &ModelId, dir: &Path, params: DecodingParams) -> Result<Self, OcrError> {
        let encoder_path = dir.join("encoder.rten");
        let decoder_path = dir.join("decoder.rten");

        let encoder = Model::load_file(&encoder_path).map_err(|e| {
            OcrError::model_load(
                model,
                format!("cannot load {}: {}", encoder_path.display(), e),
            )
        })?;
        let decoder = Model::load_file(&decoder_path).map_err(|e| {
            OcrError::model_load(
                model,
                format!("cannot load {}: {}", decoder_path.display(), e),
            )
        })?;

        let token_input = decoder.find_node("input_ids").ok_or_else(|| {
            OcrError::model_load(model, "decoder has no 'input_ids' input")
        })?;
        let hidden_input = decoder.find_node("encoder_hidden_states").ok_or_else(|| {
            OcrError::model_load(model, "decoder has no 'encoder_hidden_states' input")
        })?;

        Ok(Self {
            encoder,
            decoder,
            token_input,
            hidden_input,
            params,
        })
    }
}

impl TextGenerator for Seq2SeqGenerator {
    fn generate(&self, pixel_values: NdTensorView<f32, 4>) -> Result<Vec<i32>, OcrError> {
        let encoder_input = self.encoder.input_ids()[0];
        let encoder_output = self.encoder.output_ids()[0];
        let mut encoded = self
            .encoder
            .run(
                vec![(encoder_input, pixel_values.into())],
                &[encoder_output],
                None,
            )
            .map_err(|e| OcrError::Recognition(format!("encoder pass failed: {e}")))?;
        let hidden: NdTensor<f32, 3> = encoded.remove(0).try_into().map_err(|_| {
            OcrError::Recognition("encoder produced an unexpected output shape".to_string())
        })?;

        let logits_output = self.decoder.output_ids()[0];
        let mut token_ids = vec![self.params.bos_token_id];

        while token_ids.len() < self.params.max_length {
            let input = NdTensor::from_data([1, token_ids.len()], token_ids.clone());
            let mut outputs = self
                .decoder
                .run(
                    vec![
                        (self.token_input, input.view().into()),
                        (self.hidden_input, hidden.view().into()),
                    ],
                    &[logits_output],
                    None,
                )
                .map_err(|e| OcrError::Recognition(format!("decoder pass failed: {e}")))?;
            let logits: NdTensor<f32, 3> = outputs.remove(0).try_into().map_err(|_| {
                OcrError::Recognition("decoder produced an unexpected logits shape".to_string())
            })?;

            let step = logits.size(1) - 1;
            let vocab_size = logits.size(2);
            let mut best_token = 0usize;
            let mut best_score = f32::NEG_INFINITY;
            for token in 0..vocab_size {
                let score = logits[[0, step, token]];
                if score > best_score {
                    best_score = score;
                    best_token = token;
                }
            }

            let next = best_token as i32;
            token_ids.push(next);
            if next == self.params.eos_token_id {
                break;
            }
        }

        debug!(tokens = token_ids.len(), "Generation complete");
        Ok(token_ids)
    }
}
