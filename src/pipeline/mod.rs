//! Document extraction pipeline
//!
//! Drives a whole OCR run: open the uploaded PDF, rasterize each page in
//! document order, segment it into line crops, recognize each crop with
//! the requested model, and join the fragments with newlines. Any failure
//! aborts the entire run; there is no partial-result return.
//!
//! The work is CPU-bound (MuPDF rendering, image processing, inference)
//! and runs on the blocking thread pool, with the whole document bounded
//! by a timeout since page and line counts are unbounded.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::time::timeout;
use tracing::debug;

use crate::artifacts::LineArtifactSink;
use crate::document::{DocumentError, PageDocument};
use crate::ocr::{ModelRegistry, OcrError};
use crate::segment::{segment_lines, SegmentError, SegmentationConfig};

/// Errors from a document extraction run
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error(transparent)]
    Segmentation(#[from] SegmentError),

    #[error(transparent)]
    Ocr(#[from] OcrError),

    #[error("Document processing timed out after {0} seconds")]
    Timeout(u64),

    #[error("Worker task failed: {0}")]
    Worker(String),
}

/// Orchestrates rasterization, segmentation and recognition for one upload
pub struct ExtractionPipeline {
    registry: Arc<ModelRegistry>,
    sink: Arc<dyn LineArtifactSink>,
    run_timeout: Duration,
}

impl ExtractionPipeline {
    pub fn new(
        registry: Arc<ModelRegistry>,
        sink: Arc<dyn LineArtifactSink>,
        run_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            sink,
            run_timeout,
        }
    }

    /// Extract text from a PDF byte buffer.
    ///
    /// `model` selects a catalog identifier (default model when `None`).
    /// Fragments are newline-terminated in page-major, reading order. The
    /// document is opened before the model is activated, so a malformed
    /// upload never triggers a model load.
    pub async fn extract_text(
        &self,
        pdf_bytes: Vec<u8>,
        model: Option<String>,
        config: SegmentationConfig,
    ) -> Result<String, ExtractError> {
        config.validate()?;

        let registry = self.registry.clone();
        let sink = self.sink.clone();
        let timeout_secs = self.run_timeout.as_secs();

        let work = tokio::task::spawn_blocking(move || -> Result<String, ExtractError> {
            let document = PageDocument::from_bytes(&pdf_bytes)?;
            let handle = registry.activate(model.as_deref())?;

            let mut text = String::new();
            let mut line_counter = 0usize;
            for page_index in 0..document.page_count() {
                let page_image = document.rasterize_page(page_index)?;
                let lines = segment_lines(&page_image, &config)?;
                debug!(
                    page = page_index,
                    lines = lines.len(),
                    "Segmented page into lines"
                );

                for line in &lines {
                    sink.record(page_index, line_counter, &line.pixels);
                    line_counter += 1;

                    let fragment = handle.recognize(&line.pixels)?;
                    text.push_str(&fragment);
                    text.push('\n');
                }
            }
            Ok(text)
        });

        match timeout(self.run_timeout, work).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(ExtractError::Worker(join_err.to_string())),
            Err(_) => Err(ExtractError::Timeout(timeout_secs)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::NoopSink;
    use crate::ocr::{
        LineProcessor, ModelHandle, ModelId, ModelLoader, ProcessorManifest, TextGenerator,
        DEFAULT_MODEL,
    };
    use rten_tensor::NdTensorView;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Assemble a minimal uncompressed PDF with one content stream per page.
    fn minimal_pdf(page_contents: &[&str]) -> Vec<u8> {
        let n = page_contents.len();
        let kids: Vec<String> = (0..n).map(|i| format!("{} 0 R", 3 + 2 * i)).collect();

        let mut objects: Vec<String> = vec![
            "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
            format!("<< /Type /Pages /Kids [{}] /Count {} >>", kids.join(" "), n),
        ];
        for (i, content) in page_contents.iter().enumerate() {
            objects.push(format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents {} 0 R >>",
                4 + 2 * i
            ));
            objects.push(format!(
                "<< /Length {} >>\nstream\n{}\nendstream",
                content.len(),
                content
            ));
        }

        let mut pdf = Vec::new();
        pdf.extend_from_slice(b"%PDF-1.4\n");
        let mut offsets = Vec::with_capacity(objects.len());
        for (i, body) in objects.iter().enumerate() {
            offsets.push(pdf.len());
            pdf.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
        }
        let xref_start = pdf.len();
        pdf.extend_from_slice(format!("xref\n0 {}\n", objects.len() + 1).as_bytes());
        pdf.extend_from_slice(b"0000000000 65535 f \n");
        for offset in &offsets {
            pdf.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
        }
        pdf.extend_from_slice(
            format!(
                "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
                objects.len() + 1,
                xref_start
            )
            .as_bytes(),
        );
        pdf
    }

    /// A filled black bar at (x, y) in PDF coordinates, sized like a line
    /// of text.
    fn text_bar(x: u32, y: u32) -> String {
        format!("0 0 0 rg {x} {y} 200 12 re f")
    }

    struct FixedGenerator {
        ids: Vec<i32>,
        calls: Arc<AtomicUsize>,
    }

    impl TextGenerator for FixedGenerator {
        fn generate(&self, _pixel_values: NdTensorView<f32, 4>) -> Result<Vec<i32>, OcrError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.ids.clone())
        }
    }

    struct FixedLoader {
        ids: Vec<i32>,
        loads: Arc<AtomicUsize>,
        calls: Arc<AtomicUsize>,
    }

    impl ModelLoader for FixedLoader {
        fn load(&self, id: &ModelId) -> Result<ModelHandle, OcrError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            let manifest = ProcessorManifest {
                input_width: 32,
                input_height: 8,
                ..Default::default()
            };
            let vocab = vec![
                "<s>".to_string(),
                "<pad>".to_string(),
                "</s>".to_string(),
                "\u{2581}HELLO".to_string(),
            ];
            Ok(ModelHandle::new(
                id.clone(),
                LineProcessor::from_parts(manifest, vocab),
                Box::new(FixedGenerator {
                    ids: self.ids.clone(),
                    calls: self.calls.clone(),
                }),
            ))
        }
    }

    struct TestPipeline {
        pipeline: ExtractionPipeline,
        loads: Arc<AtomicUsize>,
        calls: Arc<AtomicUsize>,
    }

    fn test_pipeline() -> TestPipeline {
        let loads = Arc::new(AtomicUsize::new(0));
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = Arc::new(ModelRegistry::new(
            Box::new(FixedLoader {
                ids: vec![0, 3, 2],
                loads: loads.clone(),
                calls: calls.clone(),
            }),
            1,
        ));
        TestPipeline {
            pipeline: ExtractionPipeline::new(
                registry,
                Arc::new(NoopSink),
                Duration::from_secs(30),
            ),
            loads,
            calls,
        }
    }

    #[tokio::test]
    async fn blank_pages_yield_an_empty_string() {
        let t = test_pipeline();
        let pdf = minimal_pdf(&["", ""]);
        let text = t
            .pipeline
            .extract_text(pdf, None, SegmentationConfig::default())
            .await
            .unwrap();
        assert_eq!(text, "");
        assert_eq!(t.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn single_line_page_recognizes_one_fragment() {
        let t = test_pipeline();
        let content = text_bar(50, 500);
        let pdf = minimal_pdf(&[&content]);
        let text = t
            .pipeline
            .extract_text(pdf, None, SegmentationConfig::default())
            .await
            .unwrap();
        assert_eq!(text, "HELLO\n");
        assert_eq!(t.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn two_pages_of_three_lines_recognize_six_fragments() {
        let t = test_pipeline();
        let page: String = [text_bar(50, 700), text_bar(50, 650), text_bar(50, 600)].join(" ");
        let pdf = minimal_pdf(&[&page, &page]);
        let text = t
            .pipeline
            .extract_text(pdf, None, SegmentationConfig::default())
            .await
            .unwrap();
        assert_eq!(t.calls.load(Ordering::SeqCst), 6);
        assert_eq!(text.matches('\n').count(), 6);
        assert_eq!(text, "HELLO\n".repeat(6));
    }

    #[tokio::test]
    async fn non_pdf_input_fails_before_any_model_load() {
        let t = test_pipeline();
        let result = t
            .pipeline
            .extract_text(
                b"definitely not a pdf".to_vec(),
                None,
                SegmentationConfig::default(),
            )
            .await;
        assert!(matches!(
            result,
            Err(ExtractError::Document(DocumentError::Open(_)))
        ));
        assert_eq!(t.loads.load(Ordering::SeqCst), 0);
        assert_eq!(t.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unknown_model_fails_with_model_load_error() {
        let t = test_pipeline();
        let pdf = minimal_pdf(&[""]);
        let result = t
            .pipeline
            .extract_text(
                pdf,
                Some("acme/not-a-model".to_string()),
                SegmentationConfig::default(),
            )
            .await;
        assert!(matches!(
            result,
            Err(ExtractError::Ocr(OcrError::ModelLoad { .. }))
        ));
    }

    #[tokio::test]
    async fn invalid_config_fails_fast() {
        let t = test_pipeline();
        let config = SegmentationConfig {
            min_area: 0,
            ..Default::default()
        };
        let result = t
            .pipeline
            .extract_text(minimal_pdf(&[""]), None, config)
            .await;
        assert!(matches!(result, Err(ExtractError::Segmentation(_))));
        assert_eq!(t.loads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn line_artifacts_are_recorded_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Arc::new(ModelRegistry::new(
            Box::new(FixedLoader {
                ids: vec![0, 3, 2],
                loads: Arc::new(AtomicUsize::new(0)),
                calls: Arc::new(AtomicUsize::new(0)),
            }),
            1,
        ));
        let sink = crate::artifacts::DirectorySink::new(dir.path().to_path_buf()).unwrap();
        let pipeline =
            ExtractionPipeline::new(registry, Arc::new(sink), Duration::from_secs(30));

        let page: String = [text_bar(50, 700), text_bar(50, 600)].join(" ");
        let pdf = minimal_pdf(&[&page]);
        pipeline
            .extract_text(pdf, None, SegmentationConfig::default())
            .await
            .unwrap();

        assert!(dir.path().join("line_0_0.png").exists());
        assert!(dir.path().join("line_0_1.png").exists());
    }

    #[tokio::test]
    async fn repeated_runs_reuse_the_loaded_model() {
        let t = test_pipeline();
        let pdf = minimal_pdf(&[""]);
        t.pipeline
            .extract_text(pdf.clone(), Some(DEFAULT_MODEL.to_string()), SegmentationConfig::default())
            .await
            .unwrap();
        t.pipeline
            .extract_text(pdf, Some(DEFAULT_MODEL.to_string()), SegmentationConfig::default())
            .await
            .unwrap();
        assert_eq!(t.loads.load(Ordering::SeqCst), 1);
    }
}
