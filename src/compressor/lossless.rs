//! Lossless in-process compression backend
//!
//! Rewrites the document with lopdf's stream compression. No image
//! downsampling happens here, so the quality input is ignored; this backend
//! serves installs without Ghostscript and failed Ghostscript invocations.

use std::path::Path;

use async_trait::async_trait;
use lopdf::Document;
use tracing::debug;

use crate::compressor::{CompressError, PdfCompressor};

/// In-process lossless compression backend
#[derive(Debug, Default)]
pub struct LosslessCompressor;

impl LosslessCompressor {
    /// Create the backend. Stateless; exists for symmetry with the probe API.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PdfCompressor for LosslessCompressor {
    fn name(&self) -> &'static str {
        "lossless"
    }

    async fn compress(
        &self,
        input: &Path,
        output: &Path,
        _quality: u8,
    ) -> Result<(), CompressError> {
        let input = input.to_path_buf();
        let output = output.to_path_buf();

        // Parsing and recompressing is CPU-bound; keep it off the runtime's
        // request-serving threads.
        tokio::task::spawn_blocking(move || {
            let mut doc = Document::load(&input)
                .map_err(|e| CompressError::MalformedPdf(e.to_string()))?;
            doc.compress();
            doc.save(&output)
                .map_err(|e| CompressError::Library(e.to_string()))?;
            debug!(output = %output.display(), "Lossless recompression complete");
            Ok(())
        })
        .await
        .map_err(|e| CompressError::Library(format!("compression task panicked: {}", e)))?
    }
}
