//! Ghostscript compression backend
//!
//! Shells out to the `gs` binary with `pdfwrite` settings derived from the
//! quality-to-preset mapping, bounded by a timeout.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, error, info};

use crate::compressor::{CompressError, PdfCompressor};
use crate::pdf::Preset;

/// How long the startup availability probe may take.
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// External Ghostscript compression backend
pub struct GhostscriptCompressor {
    binary: String,
    invocation_timeout: Duration,
}

impl GhostscriptCompressor {
    /// Create a backend for the given binary with an invocation timeout.
    pub fn new(binary: impl Into<String>, invocation_timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            invocation_timeout,
        }
    }

    /// Check whether the binary exists and responds to `--version`.
    ///
    /// Run once at startup; the result is held for the process lifetime.
    pub async fn probe(binary: &str, invocation_timeout: Duration) -> Option<Self> {
        let mut cmd = Command::new(binary);
        cmd.arg("--version");

        match timeout(PROBE_TIMEOUT, cmd.output()).await {
            Ok(Ok(output)) if output.status.success() => {
                let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
                info!(binary, version, "Ghostscript probe succeeded");
                Some(Self::new(binary, invocation_timeout))
            }
            _ => None,
        }
    }

    /// Build the full argument list for one invocation.
    fn build_args(input: &Path, output: &Path, preset: Preset) -> Vec<String> {
        vec![
            "-sDEVICE=pdfwrite".to_string(),
            "-dCompatibilityLevel=1.4".to_string(),
            "-dNOPAUSE".to_string(),
            "-dQUIET".to_string(),
            "-dBATCH".to_string(),
            format!("-dPDFSETTINGS={}", preset.pdf_settings()),
            "-dDownsampleColorImages=true".to_string(),
            format!("-dColorImageResolution={}", preset.color_image_dpi()),
            format!("-dJPEGQ={}", preset.jpeg_quality()),
            format!("-sOutputFile={}", output.display()),
            input.display().to_string(),
        ]
    }
}

#[async_trait]
impl PdfCompressor for GhostscriptCompressor {
    fn name(&self) -> &'static str {
        "ghostscript"
    }

    async fn compress(
        &self,
        input: &Path,
        output: &Path,
        quality: u8,
    ) -> Result<(), CompressError> {
        let preset = Preset::from_quality(quality);
        let args = Self::build_args(input, output, preset);

        debug!(
            binary = %self.binary,
            preset = preset.name(),
            input = %input.display(),
            "Spawning Ghostscript"
        );

        let mut cmd = Command::new(&self.binary);
        cmd.args(&args);

        match timeout(self.invocation_timeout, cmd.output()).await {
            Ok(Ok(out)) if out.status.success() => {
                // Paranoid Ghostscript builds can exit 0 without writing anything.
                if tokio::fs::metadata(output).await.is_err() {
                    return Err(CompressError::MissingOutput);
                }
                Ok(())
            }
            Ok(Ok(out)) => {
                let code = out.status.code().unwrap_or(-1);
                let stderr = String::from_utf8_lossy(&out.stderr).into_owned();
                error!(code, stderr = %stderr, "Ghostscript exited with an error");
                Err(CompressError::ProcessFailed { code, stderr })
            }
            Ok(Err(e)) => {
                error!(error = %e, "Failed to spawn Ghostscript");
                Err(CompressError::SpawnFailed(e))
            }
            Err(_) => {
                error!(
                    timeout_secs = self.invocation_timeout.as_secs(),
                    "Ghostscript invocation timed out"
                );
                Err(CompressError::Timeout(self.invocation_timeout.as_secs()))
            }
        }
    }
}
