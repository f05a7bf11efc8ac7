//! PDF Utilities Backend Library
//!
//! This library exposes modules for testing and external use.
//! The main binary is in `src/main.rs`.

pub mod api;
pub mod compressor;
pub mod config;
pub mod error;
pub mod pdf;
pub mod scratch;
pub mod state;
