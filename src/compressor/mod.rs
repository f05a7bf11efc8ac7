//! Compression backends
//!
//! Two interchangeable implementations of [`PdfCompressor`]: an external
//! Ghostscript process doing lossy recompression, and an in-process lopdf
//! pass doing lossless stream compression. Which one handles requests is
//! decided once at startup by probing for the Ghostscript binary.

pub mod ghostscript;
pub mod lossless;

pub use ghostscript::GhostscriptCompressor;
pub use lossless::LosslessCompressor;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::CompressionConfig;

/// Errors that can occur during a backend invocation
#[derive(Error, Debug)]
pub enum CompressError {
    /// Backend process exited with a non-zero status
    #[error("backend exited with code {code}: {stderr}")]
    ProcessFailed {
        /// Exit code reported by the process (-1 if killed by signal)
        code: i32,
        /// Captured stderr output
        stderr: String,
    },

    /// Backend invocation exceeded the configured timeout
    #[error("backend timed out after {0} seconds")]
    Timeout(u64),

    /// The backend process could not be started
    #[error("failed to spawn backend process: {0}")]
    SpawnFailed(#[from] std::io::Error),

    /// The input bytes did not parse as a PDF
    #[error("input is not a valid PDF: {0}")]
    MalformedPdf(String),

    /// The backend reported success but wrote no output file
    #[error("backend produced no output file")]
    MissingOutput,

    /// In-process compression failed while rewriting the document
    #[error("compression library error: {0}")]
    Library(String),
}

/// A PDF compression backend.
///
/// Implementations read the PDF at `input`, write a compressed version to
/// `output`, and must not touch any other path. Both paths live in scratch
/// storage owned by the caller.
#[async_trait]
pub trait PdfCompressor: Send + Sync {
    /// Short backend name used in logs and result metadata.
    fn name(&self) -> &'static str;

    /// Compress `input` into `output` at the given quality in `[1, 100]`.
    async fn compress(
        &self,
        input: &Path,
        output: &Path,
        quality: u8,
    ) -> Result<(), CompressError>;
}

/// Probe for Ghostscript once and pick the backend for the process lifetime.
///
/// Returns the selected compressor plus the lossless fallback, which stays
/// available for retries when the preferred backend fails mid-request. When
/// Ghostscript is absent both are the same lossless backend.
pub async fn select_backend(
    config: &CompressionConfig,
) -> (Arc<dyn PdfCompressor>, Arc<LosslessCompressor>) {
    let fallback = Arc::new(LosslessCompressor::new());
    let timeout = Duration::from_secs(config.timeout_secs);

    match GhostscriptCompressor::probe(&config.ghostscript_bin, timeout).await {
        Some(gs) => {
            info!(
                binary = %config.ghostscript_bin,
                "Ghostscript detected, using external compression backend"
            );
            (Arc::new(gs), fallback)
        }
        None => {
            warn!(
                binary = %config.ghostscript_bin,
                "Ghostscript not available, using lossless in-process compression"
            );
            (fallback.clone(), fallback)
        }
    }
}
