//! Quality-to-preset mapping for the external compression backend
//!
//! A continuous quality input in `[1, 100]` maps onto one of four discrete
//! Ghostscript presets. The mapping is monotonic: a higher quality input
//! never yields a lower-fidelity preset.

/// A discrete compression tier understood by Ghostscript's `-dPDFSETTINGS`.
///
/// Variants are ordered from lowest to highest fidelity so that `Ord`
/// reflects visual quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Preset {
    /// Low-resolution output, smallest files (72 dpi)
    Screen,
    /// Medium-resolution output (120 dpi)
    Ebook,
    /// Print-quality output (200 dpi)
    Printer,
    /// Near-lossless output, largest files (300 dpi)
    Prepress,
}

impl Preset {
    /// Map a quality value in `[1, 100]` to a preset.
    pub fn from_quality(quality: u8) -> Self {
        match quality {
            0..=25 => Preset::Screen,
            26..=60 => Preset::Ebook,
            61..=85 => Preset::Printer,
            _ => Preset::Prepress,
        }
    }

    /// The `-dPDFSETTINGS` value for this preset.
    pub fn pdf_settings(&self) -> &'static str {
        match self {
            Preset::Screen => "/screen",
            Preset::Ebook => "/ebook",
            Preset::Printer => "/printer",
            Preset::Prepress => "/prepress",
        }
    }

    /// Target color image resolution in DPI.
    pub fn color_image_dpi(&self) -> u32 {
        match self {
            Preset::Screen => 72,
            Preset::Ebook => 120,
            Preset::Printer => 200,
            Preset::Prepress => 300,
        }
    }

    /// JPEG quality used when downsampling images.
    pub fn jpeg_quality(&self) -> u32 {
        match self {
            Preset::Screen => 50,
            Preset::Ebook => 60,
            Preset::Printer => 75,
            Preset::Prepress => 85,
        }
    }

    /// Human-readable preset name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Preset::Screen => "screen",
            Preset::Ebook => "ebook",
            Preset::Printer => "printer",
            Preset::Prepress => "prepress",
        }
    }
}
