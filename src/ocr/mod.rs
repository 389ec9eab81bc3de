//! Text recognition
//!
//! Converts segmented line images to text through a swappable
//! (pre-processor, generative model) pair:
//!
//! - [`LineProcessor`] encodes a crop into a normalized tensor and decodes
//!   generated token ids back to text via the model vocabulary.
//! - [`TextGenerator`] runs greedy autoregressive sequence generation; the
//!   bundled [`Seq2SeqGenerator`] executes an encoder/decoder pair on the
//!   rten runtime.
//! - [`ModelRegistry`] resolves catalog identifiers to loaded
//!   [`ModelHandle`]s, caching a bounded number of them.

mod engine;
mod generator;
mod processor;
mod registry;
mod types;

pub use engine::ModelHandle;
pub use generator::{DecodingParams, Seq2SeqGenerator, TextGenerator};
pub use processor::{LineProcessor, ProcessorManifest};
pub use registry::{
    DiskModelLoader, ModelLoader, ModelRegistry, DEFAULT_MODEL, SUPPORTED_MODELS,
};
pub use types::{ModelId, OcrError};
