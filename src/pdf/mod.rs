//! Pure PDF logic: page concatenation and the quality-to-preset mapping.
//!
//! Nothing in here touches HTTP or the filesystem lifecycle; handlers feed
//! scratch paths in and get bytes or errors back.

pub mod merge;
pub mod quality;

pub use merge::{merge_files, MergeError};
pub use quality::Preset;
