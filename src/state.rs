//! Application state
//!
//! Everything a handler needs, built once at startup and injected through
//! `axum::extract::State` so the core stays testable without the HTTP layer:
//! the scratch store, the selected compression backend, and the lossless
//! fallback kept around for mid-request retries.

use std::sync::Arc;

use tracing::info;

use crate::compressor::{self, LosslessCompressor, PdfCompressor};
use crate::config::Config;
use crate::scratch::ScratchStore;

/// Shared, immutable application state
pub struct AppState {
    /// Scratch storage for uploads and backend outputs
    pub scratch: ScratchStore,
    /// Backend selected by the startup capability probe
    pub compressor: Arc<dyn PdfCompressor>,
    /// Lossless backend retried when the selected one fails
    pub fallback: Arc<LosslessCompressor>,
    /// Quality applied when a compress request omits the parameter
    pub default_quality: u8,
}

/// State handle shared across handlers
pub type SharedState = Arc<AppState>;

impl AppState {
    /// Create the scratch directory and probe the compression backend.
    pub async fn initialize(config: &Config) -> anyhow::Result<Self> {
        let scratch = ScratchStore::new(config.scratch.dir.clone()).await?;
        let (compressor, fallback) = compressor::select_backend(&config.compression).await;

        info!(
            backend = compressor.name(),
            scratch_dir = %scratch.dir().display(),
            "Processing service initialized"
        );

        Ok(Self {
            scratch,
            compressor,
            fallback,
            default_quality: config.compression.default_quality,
        })
    }
}
