//! PDF processing endpoints
//!
//! Both handlers follow the same lifecycle: validate the multipart upload,
//! write inputs to scratch storage, run the processing backend, read the
//! result back, release every scratch file, then stream the bytes down with
//! download metadata headers.

use axum::{
    body::Bytes,
    extract::{Multipart, Query, State},
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::Deserialize;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::compressor::PdfCompressor;
use crate::error::AppError;
use crate::pdf::{merge, Preset};
use crate::state::SharedState;

/// Query parameters for the compress endpoint
#[derive(Debug, Deserialize)]
pub struct CompressParams {
    /// Requested quality in `[1, 100]`; taken as a raw string so malformed
    /// and out-of-range values reach our own validation instead of the
    /// extractor's plain-text rejection
    pub quality: Option<String>,
}

/// Validate the quality parameter, applying `default` when absent.
fn parse_quality(raw: Option<&str>, default: u8) -> Result<u8, AppError> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    match raw.parse::<i64>() {
        Ok(q) if (1..=100).contains(&q) => Ok(q as u8),
        Ok(q) => Err(AppError::Validation(format!(
            "quality must be between 1 and 100, got {}",
            q
        ))),
        Err(_) => Err(AppError::Validation(format!(
            "quality must be an integer between 1 and 100, got {}",
            raw
        ))),
    }
}

/// One uploaded file pulled out of the multipart body
struct Upload {
    filename: String,
    bytes: Bytes,
}

/// POST /api/pdf/merge - concatenate two or more PDFs in upload order
pub async fn merge_pdfs(
    State(state): State<SharedState>,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let mut uploads: Vec<Upload> = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(bad_field)? {
        match field.name().unwrap_or("") {
            "files" => {
                let filename = require_pdf_filename(field.file_name())?;
                let bytes = field.bytes().await.map_err(bad_field)?;
                uploads.push(Upload { filename, bytes });
            }
            other => {
                warn!(field = other, "Ignoring unknown multipart field");
            }
        }
    }

    if uploads.len() < 2 {
        return Err(AppError::Validation(
            "At least 2 PDF files are required for merging".to_string(),
        ));
    }

    // Inputs live in scratch for the duration of the merge; the guards
    // delete them on every exit path.
    let mut guards = Vec::with_capacity(uploads.len());
    let mut inputs: Vec<(String, PathBuf)> = Vec::with_capacity(uploads.len());
    for upload in &uploads {
        let guard = state.scratch.create(&upload.bytes).await?;
        inputs.push((upload.filename.clone(), guard.path().to_path_buf()));
        guards.push(guard);
    }

    let merged = tokio::task::spawn_blocking(move || merge::merge_files(&inputs))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("merge task panicked: {}", e)))??;
    drop(guards);

    info!(
        files = uploads.len(),
        output_bytes = merged.len(),
        "Merged PDFs"
    );

    let filename = format!("merged_{}.pdf", Utc::now().format("%Y%m%d_%H%M%S"));
    Ok(pdf_attachment(merged, &filename))
}

/// POST /api/pdf/compress - compress a single PDF at the requested quality
pub async fn compress_pdf(
    State(state): State<SharedState>,
    Query(params): Query<CompressParams>,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let quality = parse_quality(params.quality.as_deref(), state.default_quality)?;

    let mut upload: Option<Upload> = None;
    while let Some(field) = multipart.next_field().await.map_err(bad_field)? {
        match field.name().unwrap_or("") {
            "file" => {
                if upload.is_some() {
                    return Err(AppError::Validation(
                        "Exactly one PDF file must be supplied".to_string(),
                    ));
                }
                let filename = require_pdf_filename(field.file_name())?;
                let bytes = field.bytes().await.map_err(bad_field)?;
                upload = Some(Upload { filename, bytes });
            }
            other => {
                warn!(field = other, "Ignoring unknown multipart field");
            }
        }
    }

    let upload = upload
        .ok_or_else(|| AppError::Validation("A PDF file is required".to_string()))?;
    let original_size = upload.bytes.len();

    let input = state.scratch.create(&upload.bytes).await?;
    let output = state.scratch.reserve();

    let backend = match state
        .compressor
        .compress(input.path(), output.path(), quality)
        .await
    {
        Ok(()) => state.compressor.name(),
        // The external tool failed mid-request; lossless recompression can
        // still produce a usable result. Merge has no such second chance.
        Err(err) if state.compressor.name() != state.fallback.name() => {
            warn!(
                backend = state.compressor.name(),
                error = %err,
                "Preferred backend failed, retrying with lossless fallback"
            );
            state
                .fallback
                .compress(input.path(), output.path(), quality)
                .await?;
            state.fallback.name()
        }
        Err(err) => return Err(err.into()),
    };

    let compressed = tokio::fs::read(output.path()).await?;
    drop(input);
    drop(output);

    let compressed_size = compressed.len();
    let reduction = reduction_percentage(original_size, compressed_size);
    info!(
        filename = %upload.filename,
        original_size,
        compressed_size,
        reduction,
        backend,
        preset = Preset::from_quality(quality).name(),
        "Compressed PDF"
    );

    let out_name = format!("compressed_{}.pdf", Utc::now().format("%Y%m%d_%H%M%S"));
    let mut response = pdf_attachment(compressed, &out_name);
    let headers = response.headers_mut();
    insert_header(headers, "x-original-size", original_size.to_string());
    insert_header(headers, "x-compressed-size", compressed_size.to_string());
    insert_header(headers, "x-reduction-percentage", format!("{:.2}", reduction));
    insert_header(headers, "x-quality-setting", quality.to_string());
    Ok(response)
}

/// Percentage reduction, rounded to two decimals and clamped at zero.
///
/// A backend can legitimately produce output larger than the input (small or
/// already-optimized files); the result is still returned, but the reported
/// reduction is never negative.
pub fn reduction_percentage(original: usize, compressed: usize) -> f64 {
    if original == 0 {
        return 0.0;
    }
    let raw = (1.0 - compressed as f64 / original as f64) * 100.0;
    ((raw * 100.0).round() / 100.0).max(0.0)
}

fn bad_field(err: axum::extract::multipart::MultipartError) -> AppError {
    AppError::Validation(format!("Failed to read multipart field: {}", err))
}

/// The declared filename must be present and end in `.pdf`.
fn require_pdf_filename(file_name: Option<&str>) -> Result<String, AppError> {
    let filename = file_name
        .map(str::to_string)
        .ok_or_else(|| AppError::Validation("Uploaded file is missing a filename".to_string()))?;
    if !filename.to_lowercase().ends_with(".pdf") {
        return Err(AppError::Validation(format!("{} is not a PDF", filename)));
    }
    Ok(filename)
}

/// Binary download response with `application/pdf` content type.
fn pdf_attachment(bytes: Vec<u8>, filename: &str) -> Response {
    let mut response = (StatusCode::OK, bytes).into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/pdf"),
    );
    insert_header(
        headers,
        "content-disposition",
        format!("attachment; filename={}", filename),
    );
    response
}

fn insert_header(headers: &mut axum::http::HeaderMap, name: &'static str, value: String) {
    match HeaderValue::from_str(&value) {
        Ok(value) => {
            headers.insert(HeaderName::from_static(name), value);
        }
        Err(e) => {
            // Generated values are always ASCII; this is unreachable in practice.
            warn!(header = name, error = %e, "Dropped invalid response header");
        }
    }
}
