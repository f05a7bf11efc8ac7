//! Application configuration
//!
//! Centralized configuration management with environment variable support
//! and sensible defaults.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Scratch storage configuration
    pub scratch: ScratchConfig,
    /// Compression backend configuration
    pub compression: CompressionConfig,
    /// Cross-origin configuration
    pub cors: CorsConfig,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to bind the server to
    pub port: u16,
    /// Host address to bind to
    pub host: String,
    /// Maximum accepted request body size in bytes
    pub max_upload_bytes: usize,
}

/// Scratch storage configuration
#[derive(Debug, Clone)]
pub struct ScratchConfig {
    /// Directory used for temporary upload and output files
    pub dir: PathBuf,
    /// How long a scratch file may survive before the sweep deletes it (seconds)
    pub retention_secs: u64,
    /// How often the background sweep runs (seconds)
    pub sweep_interval_secs: u64,
}

/// Compression backend configuration
#[derive(Debug, Clone)]
pub struct CompressionConfig {
    /// Ghostscript binary name or path
    pub ghostscript_bin: String,
    /// Bound on a single backend invocation (seconds)
    pub timeout_secs: u64,
    /// Quality used when the request does not specify one
    pub default_quality: u8,
}

/// Cross-origin configuration
#[derive(Debug, Clone)]
pub struct CorsConfig {
    /// Front-end origins allowed to call the API
    pub allowed_origins: Vec<String>,
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        Self {
            server: ServerConfig {
                port: env::var("PORT")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(8000),
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                max_upload_bytes: env::var("MAX_UPLOAD_BYTES")
                    .ok()
                    .and_then(|b| b.parse().ok())
                    .unwrap_or(100 * 1024 * 1024),
            },
            scratch: ScratchConfig {
                dir: env::var("SCRATCH_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| env::temp_dir().join("pdf_uploads")),
                retention_secs: env::var("SCRATCH_RETENTION_SECS")
                    .ok()
                    .and_then(|t| t.parse().ok())
                    .unwrap_or(3600),
                sweep_interval_secs: env::var("SWEEP_INTERVAL_SECS")
                    .ok()
                    .and_then(|t| t.parse().ok())
                    .unwrap_or(900),
            },
            compression: CompressionConfig {
                ghostscript_bin: env::var("GHOSTSCRIPT_BIN").unwrap_or_else(|_| "gs".to_string()),
                timeout_secs: env::var("GHOSTSCRIPT_TIMEOUT_SECS")
                    .ok()
                    .and_then(|t| t.parse().ok())
                    .unwrap_or(120),
                default_quality: 85,
            },
            cors: CorsConfig {
                allowed_origins: env::var("ALLOWED_ORIGINS")
                    .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
                    .unwrap_or_else(|_| {
                        vec![
                            "http://localhost:3000".to_string(),
                            "http://localhost:5173".to_string(),
                        ]
                    }),
            },
        }
    }

    /// Get the server address as a string
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl ScratchConfig {
    /// Retention window as a `Duration`
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }

    /// Sweep period as a `Duration`
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}
