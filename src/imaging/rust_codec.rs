//! Pure Rust codec built on the `image` crate.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, WebP, GIF) | `ImageReader::with_guessed_format` (content sniffing) |
//! | Resize | `DynamicImage::resize_exact` with `Lanczos3`, dimensions from [`fit_inside`] |
//! | Encode → JPEG | `JpegEncoder::new_with_quality` (baseline, alpha flattened) |
//! | Encode → PNG | `PngEncoder::new_with_quality`, effort → compression level |
//! | Encode → WebP | `WebPEncoder::new_lossless` |
//! | Encode → GIF | `GifEncoder::new_with_speed`, effort → speed |

use super::calculations::fit_inside;
use super::codec::{CodecError, ImageCodec, ImageInfo, ImageKind};
use super::params::{EncodeParams, Effort, Quality};
use image::codecs::gif::GifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::codecs::webp::WebPEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, Frame, ImageFormat, ImageReader};
use std::io::Cursor;
use tracing::debug;

/// Container formats the store accepts, keyed by what the decoder sniffs.
const SUPPORTED_FORMATS: &[(ImageFormat, ImageKind)] = &[
    (ImageFormat::Jpeg, ImageKind::Jpeg),
    (ImageFormat::Png, ImageKind::Png),
    (ImageFormat::WebP, ImageKind::Webp),
    (ImageFormat::Gif, ImageKind::Gif),
];

/// Map an `image` crate format to a supported [`ImageKind`].
pub fn kind_of(format: ImageFormat) -> Option<ImageKind> {
    SUPPORTED_FORMATS
        .iter()
        .find(|(f, _)| *f == format)
        .map(|(_, kind)| *kind)
}

/// Codec backed by the `image` crate's pure Rust decoders and encoders.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustCodec;

impl RustCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustCodec {
    fn default() -> Self {
        Self::new()
    }
}

/// Sniff the container format and fully decode the pixels.
///
/// The format comes from the bytes, never from a file name or declared MIME type.
fn decode(bytes: &[u8]) -> Result<(DynamicImage, ImageKind), CodecError> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| CodecError::Decode(e.to_string()))?;

    let format = reader
        .format()
        .ok_or_else(|| CodecError::Decode("unrecognized image data".to_string()))?;
    let kind =
        kind_of(format).ok_or_else(|| CodecError::UnsupportedFormat(format!("{format:?}")))?;

    let img = reader
        .decode()
        .map_err(|e| CodecError::Decode(e.to_string()))?;
    Ok((img, kind))
}

fn png_compression(effort: Effort) -> CompressionType {
    match effort.value() {
        0..=3 => CompressionType::Fast,
        4..=6 => CompressionType::Default,
        _ => CompressionType::Best,
    }
}

/// GIF speed runs 1 (best) to 30 (fastest); effort runs the other way.
fn gif_speed(effort: Effort) -> i32 {
    30 - 29 * i32::from(effort.value()) / 9
}

/// WebP's lossless encoder only takes 8-bit RGB(A).
fn webp_compatible(img: &DynamicImage) -> DynamicImage {
    if img.color().has_alpha() {
        DynamicImage::ImageRgba8(img.to_rgba8())
    } else {
        DynamicImage::ImageRgb8(img.to_rgb8())
    }
}

/// Encode a decoded image into the requested container.
fn encode_image(
    img: &DynamicImage,
    format: ImageKind,
    quality: Quality,
    effort: Effort,
) -> Result<Vec<u8>, CodecError> {
    let mut buf = Vec::new();
    let result = match format {
        ImageKind::Jpeg => {
            // JPEG has no alpha channel
            let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
            let encoder = JpegEncoder::new_with_quality(&mut buf, quality.value() as u8);
            rgb.write_with_encoder(encoder)
        }
        ImageKind::Png => {
            let encoder =
                PngEncoder::new_with_quality(&mut buf, png_compression(effort), PngFilter::Adaptive);
            img.write_with_encoder(encoder)
        }
        ImageKind::Webp => {
            let encoder = WebPEncoder::new_lossless(&mut buf);
            webp_compatible(img).write_with_encoder(encoder)
        }
        ImageKind::Gif => {
            let mut encoder = GifEncoder::new_with_speed(&mut buf, gif_speed(effort));
            encoder.encode_frame(Frame::new(img.to_rgba8()))
        }
    };

    result.map_err(|e| CodecError::Encode {
        format,
        reason: e.to_string(),
    })?;
    Ok(buf)
}

impl ImageCodec for RustCodec {
    fn decode_metadata(&self, bytes: &[u8]) -> Result<ImageInfo, CodecError> {
        let (img, format) = decode(bytes)?;
        Ok(ImageInfo {
            width: img.width(),
            height: img.height(),
            format,
            has_alpha: img.color().has_alpha(),
        })
    }

    fn encode(&self, bytes: &[u8], params: &EncodeParams) -> Result<Vec<u8>, CodecError> {
        let (img, _) = decode(bytes)?;
        let source = (img.width(), img.height());
        let (width, height) = fit_inside(source, (params.target_width, params.target_height));

        let img = if (width, height) == source {
            img
        } else {
            img.resize_exact(width, height, FilterType::Lanczos3)
        };

        let format = params.output_format();
        debug!(%format, width, height, quality = params.quality.value(), "encoding image");
        encode_image(&img, format, params.quality, params.effort)
    }
}
