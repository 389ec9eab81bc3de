//! OCR route
//!
//! `POST /ocr` accepts a multipart form with the PDF in the `file` field
//! plus optional model and segmentation parameters, runs the extraction
//! pipeline, and returns the recognized text. Missing or unparseable form
//! fields are client errors; everything that goes wrong past request
//! parsing is a processing fault.

use axum::{
    extract::{Multipart, State},
    routing::post,
    Json, Router,
};
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::segment::{
    Binarization, SegmentationConfig, DEFAULT_KERNEL_HEIGHT, DEFAULT_KERNEL_WIDTH,
    DEFAULT_MIN_AREA, DEFAULT_THRESHOLD,
};
use crate::state::AppState;

#[derive(Serialize)]
pub struct OcrResponse {
    pub text: String,
}

/// Create the OCR router
pub fn router() -> Router<AppState> {
    Router::new().route("/ocr", post(run_ocr))
}

/// POST /ocr
async fn run_ocr(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<OcrResponse>> {
    let mut file: Option<Vec<u8>> = None;
    let mut model: Option<String> = None;
    let mut threshold_value = DEFAULT_THRESHOLD as u32;
    let mut kernel_width = DEFAULT_KERNEL_WIDTH;
    let mut kernel_height = DEFAULT_KERNEL_HEIGHT;
    let mut min_area = DEFAULT_MIN_AREA;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("invalid multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("failed to read file field: {e}")))?;
                file = Some(bytes.to_vec());
            }
            "model" => {
                let value = text_field(&name, field).await?;
                if !value.is_empty() {
                    model = Some(value);
                }
            }
            "threshold_value" => threshold_value = int_field(&name, field).await?,
            "kernel_width" => kernel_width = int_field(&name, field).await?,
            "kernel_height" => kernel_height = int_field(&name, field).await?,
            "min_area" => min_area = int_field(&name, field).await?,
            _ => {}
        }
    }

    let file =
        file.ok_or_else(|| AppError::BadRequest("missing required field 'file'".to_string()))?;

    let threshold: u8 = threshold_value
        .try_into()
        .map_err(|_| AppError::BadRequest("threshold_value must be at most 255".to_string()))?;

    let config = SegmentationConfig {
        binarization: Binarization::Fixed { threshold },
        kernel_width,
        kernel_height,
        min_area,
    };

    let text = state.pipeline().extract_text(file, model, config).await?;
    Ok(Json(OcrResponse { text }))
}

async fn text_field(name: &str, field: axum::extract::multipart::Field<'_>) -> Result<String> {
    field
        .text()
        .await
        .map_err(|e| AppError::BadRequest(format!("failed to read field '{name}': {e}")))
}

async fn int_field(name: &str, field: axum::extract::multipart::Field<'_>) -> Result<u32> {
    let raw = text_field(name, field).await?;
    raw.trim()
        .parse()
        .map_err(|_| AppError::BadRequest(format!("field '{name}' must be a positive integer")))
}
