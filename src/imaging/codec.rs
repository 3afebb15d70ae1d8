//! Image codec trait and shared types.
//!
//! The [`ImageCodec`] trait defines the two operations the store needs from an
//! image library: read intrinsic metadata out of an encoded buffer, and
//! re-encode a buffer at a target size, quality, and format.
//!
//! The production implementation is [`RustCodec`](super::rust_codec::RustCodec),
//! built on the `image` crate. Tests use the recording `MockCodec` below so the
//! upload pipeline can be exercised without pixel work.

use super::params::EncodeParams;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Failed to decode image: {0}")]
    Decode(String),
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),
    #[error("Failed to encode {format} image: {reason}")]
    Encode { format: ImageKind, reason: String },
}

/// Image formats the store accepts and produces.
///
/// Serialized names match the short format names reported in upload metadata
/// (`"jpeg"`, `"png"`, `"webp"`, `"gif"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    Jpeg,
    Png,
    Webp,
    Gif,
}

impl ImageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ImageKind::Jpeg => "jpeg",
            ImageKind::Png => "png",
            ImageKind::Webp => "webp",
            ImageKind::Gif => "gif",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ImageKind::Jpeg => "image/jpeg",
            ImageKind::Png => "image/png",
            ImageKind::Webp => "image/webp",
            ImageKind::Gif => "image/gif",
        }
    }

    /// Whether the encoder for this format ignores quality and uses an
    /// effort setting instead.
    pub fn is_lossless(self) -> bool {
        !matches!(self, ImageKind::Jpeg)
    }
}

impl fmt::Display for ImageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Intrinsic properties of a decoded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    pub format: ImageKind,
    pub has_alpha: bool,
}

/// Trait for image codecs.
///
/// `Sync` is required because derivatives are encoded in parallel with rayon,
/// all sharing one codec.
pub trait ImageCodec: Sync {
    /// Decode a buffer far enough to report its dimensions, format, and alpha.
    fn decode_metadata(&self, bytes: &[u8]) -> Result<ImageInfo, CodecError>;

    /// Decode, fit inside the requested bounds (never upscaling), and re-encode.
    fn encode(&self, bytes: &[u8], params: &EncodeParams) -> Result<Vec<u8>, CodecError>;
}
