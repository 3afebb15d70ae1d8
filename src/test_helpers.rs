//! Shared test utilities for the image-vault test suite.
//!
//! Provides synthetic image bytes, a temp-rooted store, and lookup helpers for
//! descriptors and listings.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let (_tmp, store) = temp_store();
//! let descriptor = store
//!     .upload(&synthetic_jpeg(400, 300), "photo.jpg", "image/jpeg", &UploadOptions::default())
//!     .unwrap();
//! assert_derivative_labels(&descriptor, &["small", "medium", "large"]);
//! ```

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ImageEncoder, RgbImage, RgbaImage};
use std::path::Path;
use tempfile::TempDir;

use crate::config::StoreConfig;
use crate::imaging::ImageCodec;
use crate::store::AssetStore;
use crate::types::{AssetDescriptor, CatalogPage};

// =========================================================================
// Synthetic images
// =========================================================================

/// A valid JPEG with a color gradient, so encoders have real work to do.
pub fn synthetic_jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, 90)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
    buf
}

/// A valid PNG, optionally with a varying alpha channel.
pub fn synthetic_png(width: u32, height: u32, alpha: bool) -> Vec<u8> {
    let mut buf = Vec::new();
    let encoder = PngEncoder::new(&mut buf);
    if alpha {
        let img = RgbaImage::from_fn(width, height, |x, y| {
            image::Rgba([(x % 256) as u8, (y % 256) as u8, 64, ((x + y) % 256) as u8])
        });
        encoder
            .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgba8)
            .unwrap();
    } else {
        let img = RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, 32, (y % 256) as u8])
        });
        encoder
            .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
            .unwrap();
    }
    buf
}

// =========================================================================
// Store setup
// =========================================================================

/// Stock config rooted at `root`.
pub fn test_config(root: &Path) -> StoreConfig {
    let mut config = StoreConfig::default();
    config.storage.root = root.to_path_buf();
    config
}

/// A store with the real codec in a fresh temp directory.
pub fn temp_store() -> (TempDir, AssetStore) {
    let tmp = TempDir::new().unwrap();
    let store = AssetStore::open(test_config(tmp.path())).unwrap();
    (tmp, store)
}

/// A store with a caller-supplied codec in a fresh temp directory.
pub fn temp_store_with<C: ImageCodec>(codec: C) -> (TempDir, AssetStore<C>) {
    let tmp = TempDir::new().unwrap();
    let store = AssetStore::with_codec(test_config(tmp.path()), codec).unwrap();
    (tmp, store)
}

// =========================================================================
// Lookups and assertions
// =========================================================================

/// Key of a descriptor's derivative. Panics if the label is missing.
pub fn derivative_key<'a>(descriptor: &'a AssetDescriptor, label: &str) -> &'a str {
    descriptor
        .derivatives
        .as_ref()
        .and_then(|d| d.get(label))
        .map(String::as_str)
        .unwrap_or_else(|| panic!("derivative '{label}' not in {:?}", descriptor.derivatives))
}

/// Assert a descriptor carries exactly these derivative labels.
pub fn assert_derivative_labels(descriptor: &AssetDescriptor, expected: &[&str]) {
    let mut actual: Vec<&str> = descriptor
        .derivatives
        .as_ref()
        .map(|d| d.keys().map(String::as_str).collect())
        .unwrap_or_default();
    actual.sort();
    let mut expected = expected.to_vec();
    expected.sort();
    assert_eq!(actual, expected, "derivative labels mismatch");
}

/// Relative paths of a listing, in listing order.
pub fn listed_paths(page: &CatalogPage) -> Vec<&str> {
    page.items.iter().map(|i| i.relative_path.as_str()).collect()
}

/// Every file under `root`, relative and `/`-separated, sorted.
pub fn files_under(root: &Path) -> Vec<String> {
    let mut files: Vec<String> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| crate::layout::public_key(root, e.path()))
        .collect();
    files.sort();
    files
}
