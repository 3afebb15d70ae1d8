//! File naming for stored assets.
//!
//! Every upload gets a fresh name of the form `<millis>-<uuid-v4><.ext>`, keeping
//! the uploader's extension with its case unchanged. Derivatives insert a size label
//! before the extension:
//!
//! - `1730800000000-6f1c…e2.jpg` → original
//! - `1730800000000-6f1c…e2-small.jpg` → `small` derivative
//!
//! The transform is invertible given the configured label set, which is how the
//! catalog hides derivatives from listings.
//!
//! ## Content types
//!
//! Extensions map to MIME types case-insensitively; anything unrecognized is
//! served as `image/jpeg`. An upload whose name has no recognized image
//! extension is stored with the extension of its decoded format, so every
//! stored file stays visible to listings and stats.

use chrono::{DateTime, Utc};
use std::borrow::Cow;
use std::path::Path;
use uuid::Uuid;

/// Extensions recognized as stored images (lowercase, no dot).
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif"];

const CONTENT_TYPES: &[(&str, &str)] = &[
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("webp", "image/webp"),
    ("gif", "image/gif"),
];

pub const DEFAULT_CONTENT_TYPE: &str = "image/jpeg";

/// Split a name into `(stem, extension)` where the extension keeps its dot.
///
/// Only the last path segment is considered. A leading dot does not start an
/// extension (`.hidden` has none), and a name without a dot has an empty one.
pub fn split_extension(name: &str) -> (&str, &str) {
    let base_start = name.rfind(['/', '\\']).map_or(0, |i| i + 1);
    match name[base_start..].rfind('.') {
        Some(dot) if dot > 0 => name.split_at(base_start + dot),
        _ => (name, ""),
    }
}

/// Generate a collision-resistant file name for an upload made at `at`.
///
/// No filesystem access; uniqueness comes from the millisecond timestamp plus a
/// random v4 UUID, so identical bytes uploaded twice get distinct names.
pub fn generate_file_name(original_name: &str, at: DateTime<Utc>) -> String {
    let (_, ext) = split_extension(original_name);
    format!("{}-{}{}", at.timestamp_millis(), Uuid::new_v4(), ext)
}

/// `name` as is when it ends in a recognized image extension, otherwise with
/// the preferred extension for `mime` appended.
pub fn with_image_extension<'a>(name: &'a str, mime: &str) -> Cow<'a, str> {
    let (_, ext) = split_extension(name);
    let recognized = ext
        .strip_prefix('.')
        .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()));
    if recognized {
        Cow::Borrowed(name)
    } else {
        Cow::Owned(format!("{name}{}", extension_for_mime(mime)))
    }
}

/// Insert `-<label>` immediately before the extension.
pub fn derivative_file_name(file_name: &str, label: &str) -> String {
    let (stem, ext) = split_extension(file_name);
    format!("{stem}-{label}{ext}")
}

/// Inverse of [`derivative_file_name`]: recover the original name and label.
///
/// Returns `None` when the name carries no known label suffix or no extension.
pub fn split_derivative<'a, L: AsRef<str>>(
    file_name: &str,
    labels: &'a [L],
) -> Option<(String, &'a str)> {
    let (stem, ext) = split_extension(file_name);
    if ext.len() < 2 {
        return None;
    }
    labels.iter().map(AsRef::as_ref).find_map(|label| {
        stem.strip_suffix(label)
            .and_then(|rest| rest.strip_suffix('-'))
            .map(|base| (format!("{base}{ext}"), label))
    })
}

/// Whether `file_name` is a derivative for one of `labels`.
pub fn is_derivative<L: AsRef<str>>(file_name: &str, labels: &[L]) -> bool {
    split_derivative(file_name, labels).is_some()
}

fn lowercase_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
}

/// Content type for a stored path, by extension.
pub fn content_type_for(path: &Path) -> &'static str {
    lowercase_extension(path)
        .and_then(|ext| {
            CONTENT_TYPES
                .iter()
                .find(|(e, _)| *e == ext)
                .map(|(_, mime)| *mime)
        })
        .unwrap_or(DEFAULT_CONTENT_TYPE)
}

/// Preferred extension (with dot) for a MIME type, `.jpg` when unknown.
pub fn extension_for_mime(mime: &str) -> &'static str {
    match mime.to_ascii_lowercase().as_str() {
        "image/png" => ".png",
        "image/webp" => ".webp",
        "image/gif" => ".gif",
        _ => ".jpg",
    }
}

/// Whether a path has one of the recognized image extensions.
pub fn is_image_file(path: &Path) -> bool {
    lowercase_extension(path).is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}
