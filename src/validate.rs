//! Input validation that runs before any codec work or filesystem I/O.

use crate::config::ImagesConfig;
use thiserror::Error;

pub const MAX_CATEGORY_LEN: usize = 50;
pub const MAX_PAGE_LIMIT: usize = 100;
pub const MAX_BATCH_FILES: usize = 10;
pub const DEFAULT_CATEGORY: &str = "general";

#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("No image data provided")]
    EmptyFile,
    #[error("File size {size} exceeds maximum allowed size of {max} bytes")]
    TooLarge { size: u64, max: u64 },
    #[error("Invalid file type '{mime}'. Allowed types: {}", .allowed.join(", "))]
    UnsupportedType { mime: String, allowed: Vec<String> },
    #[error("Invalid category '{0}': {1}")]
    InvalidCategory(String, &'static str),
    #[error("Page must be at least 1")]
    InvalidPage,
    #[error("Limit must be between 1 and {max}, got {0}", max = MAX_PAGE_LIMIT)]
    InvalidLimit(usize),
    #[error("Too many files in one upload: {count} (maximum {max})", max = MAX_BATCH_FILES)]
    TooManyFiles { count: usize },
    #[error("No files provided")]
    NoFiles,
    #[error("Unknown size '{label}'. Available sizes: {}", .available.join(", "))]
    UnknownSize {
        label: String,
        available: Vec<String>,
    },
}

/// Check an upload's size and declared MIME type against the image settings.
pub fn validate_upload(
    byte_len: usize,
    mime_type: &str,
    images: &ImagesConfig,
) -> Result<(), ValidationError> {
    if byte_len == 0 {
        return Err(ValidationError::EmptyFile);
    }

    let size = byte_len as u64;
    if size > images.max_file_size {
        return Err(ValidationError::TooLarge {
            size,
            max: images.max_file_size,
        });
    }

    let mime = mime_type.trim().to_ascii_lowercase();
    if !images.allowed_types.iter().any(|t| t.eq_ignore_ascii_case(&mime)) {
        return Err(ValidationError::UnsupportedType {
            mime: mime_type.to_string(),
            allowed: images.allowed_types.clone(),
        });
    }
    Ok(())
}

/// Trim and check a category name, returning the value to use on disk.
///
/// A category becomes one directory under the storage root, so it must be a
/// single path segment.
pub fn validate_category(category: &str) -> Result<String, ValidationError> {
    let trimmed = category.trim();
    let invalid = |reason| ValidationError::InvalidCategory(category.to_string(), reason);

    if trimmed.is_empty() {
        return Err(invalid("must not be empty"));
    }
    if trimmed.chars().count() > MAX_CATEGORY_LEN {
        return Err(invalid("must be at most 50 characters"));
    }
    if trimmed.contains(['/', '\\']) || trimmed.chars().any(char::is_control) {
        return Err(invalid("must be a single path segment"));
    }
    if trimmed.chars().all(|c| c == '.') {
        return Err(invalid("must not be a relative directory"));
    }
    Ok(trimmed.to_string())
}

pub fn validate_pagination(page: usize, limit: usize) -> Result<(), ValidationError> {
    if page < 1 {
        return Err(ValidationError::InvalidPage);
    }
    if !(1..=MAX_PAGE_LIMIT).contains(&limit) {
        return Err(ValidationError::InvalidLimit(limit));
    }
    Ok(())
}

pub fn validate_batch(count: usize) -> Result<(), ValidationError> {
    match count {
        0 => Err(ValidationError::NoFiles),
        n if n > MAX_BATCH_FILES => Err(ValidationError::TooManyFiles { count: n }),
        _ => Ok(()),
    }
}
