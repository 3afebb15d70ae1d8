//! Parameter types for codec operations.
//!
//! These structs describe *what* to encode, not *how*. They sit between the
//! store and derivative planning (which decide what images to produce) and
//! the [`codec`](super::codec) (which does the pixel work), so a mock codec
//! can stand in during tests.
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality (1–100, default 80). Clamped on construction.
//! - [`Effort`]: Compression effort for lossless formats (0–9, default 9).
//! - [`SizeProfile`]: A configured derivative: label plus bounding box.
//! - [`EncodeParams`]: Everything one encode needs.

use super::codec::ImageKind;
use serde::{Deserialize, Serialize};

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(80)
    }
}

/// Compression effort for lossless encoders (0 = fastest, 9 = smallest).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Effort(pub u8);

impl Effort {
    pub fn new(value: u8) -> Self {
        Self(value.min(9))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Effort {
    fn default() -> Self {
        Self(9)
    }
}

/// A derivative size profile: `small` → fit inside 150×150, and so on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SizeProfile {
    pub label: String,
    pub width: u32,
    pub height: u32,
}

impl SizeProfile {
    pub fn new(label: &str, width: u32, height: u32) -> Self {
        Self {
            label: label.to_string(),
            width,
            height,
        }
    }
}

/// Parameters for a single encode.
///
/// `None` bounds leave that axis unconstrained; `None` format means the
/// primary lossy format (JPEG).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EncodeParams {
    pub target_width: Option<u32>,
    pub target_height: Option<u32>,
    pub quality: Quality,
    pub effort: Effort,
    pub format: Option<ImageKind>,
}

impl EncodeParams {
    /// Same-size re-encode used to optimize an original before it is stored.
    pub fn optimize(format: ImageKind, quality: Quality, effort: Effort) -> Self {
        Self {
            target_width: None,
            target_height: None,
            quality,
            effort,
            format: Some(format),
        }
    }

    /// Resize into a profile's bounding box, keeping the source format.
    pub fn for_profile(
        profile: &SizeProfile,
        format: ImageKind,
        quality: Quality,
        effort: Effort,
    ) -> Self {
        Self {
            target_width: Some(profile.width),
            target_height: Some(profile.height),
            quality,
            effort,
            format: Some(format),
        }
    }

    /// The format the encoder will actually produce.
    pub fn output_format(&self) -> ImageKind {
        self.format.unwrap_or(ImageKind::Jpeg)
    }
}
