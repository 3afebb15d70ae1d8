//! Types handed back to callers.
//!
//! These serialize to JSON with camelCase field names; that shape is the stable
//! contract consumed by the CLI's `--json` mode and by any service wrapping the
//! store. None of them is persisted; they are rebuilt from the filesystem on
//! demand.

use crate::imaging::ImageKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Result of a successful upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetDescriptor {
    /// Generated file name, unique per upload.
    pub id: String,
    /// Key of the original relative to the storage root, `/`-separated.
    pub relative_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub category: String,
    /// Size label → key of that derivative. Absent when generation was skipped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub derivatives: Option<BTreeMap<String, String>>,
    pub metadata: AssetMetadata,
    pub uploaded_at: DateTime<Utc>,
}

/// Upload metadata. Dimensions and format describe the bytes as uploaded;
/// `byte_size` is the size of the stored original.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetMetadata {
    pub original_name: String,
    pub mime_type: String,
    pub byte_size: u64,
    pub width: u32,
    pub height: u32,
    pub format: ImageKind,
}

/// Bytes of a stored file plus the content type to serve it with.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredImage {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
}

/// Metadata read back from a stored file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredMetadata {
    pub relative_path: String,
    pub byte_size: u64,
    pub last_modified: DateTime<Utc>,
    /// Creation time, where the filesystem records one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    pub width: u32,
    pub height: u32,
    pub format: ImageKind,
}

/// One original in a listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub relative_path: String,
    pub byte_size: u64,
    pub last_modified: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// One page of a listing. `total` counts every matching original, not just
/// the ones on this page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogPage {
    pub items: Vec<CatalogEntry>,
    pub total: usize,
    pub page: usize,
    pub limit: usize,
}

impl CatalogPage {
    pub fn pagination(&self) -> Pagination {
        Pagination::new(self.page, self.limit, self.total)
    }
}

/// Derived page arithmetic for a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: usize,
    pub limit: usize,
    pub total: usize,
    pub total_pages: usize,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    pub fn new(page: usize, limit: usize, total: usize) -> Self {
        let total_pages = if limit == 0 { 0 } else { total.div_ceil(limit) };
        Self {
            page,
            limit,
            total,
            total_pages,
            has_next: page < total_pages,
            has_prev: page > 1,
        }
    }
}

/// Aggregate size of everything under the storage root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageStats {
    pub total_count: usize,
    pub total_bytes: u64,
    /// `total_bytes` in MiB, rounded to two decimals.
    pub total_megabytes: f64,
    pub root: String,
}

impl StorageStats {
    pub fn new(total_count: usize, total_bytes: u64, root: String) -> Self {
        let megabytes = total_bytes as f64 / (1024.0 * 1024.0);
        Self {
            total_count,
            total_bytes,
            total_megabytes: (megabytes * 100.0).round() / 100.0,
            root,
        }
    }
}

/// What happened to one derivative during a delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "error", rename_all = "lowercase")]
pub enum DerivativeOutcome {
    Removed,
    /// Nothing to remove; not an error.
    Missing,
    Failed(String),
}

/// Result of deleting an original and its derivatives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteReport {
    pub path: String,
    pub derivatives: BTreeMap<String, DerivativeOutcome>,
}

impl DeleteReport {
    pub fn removed_count(&self) -> usize {
        self.derivatives
            .values()
            .filter(|o| **o == DerivativeOutcome::Removed)
            .count()
    }

    /// Labels whose removal failed, with the error message.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &str)> {
        self.derivatives.iter().filter_map(|(label, outcome)| match outcome {
            DerivativeOutcome::Failed(msg) => Some((label.as_str(), msg.as_str())),
            _ => None,
        })
    }

    pub fn is_clean(&self) -> bool {
        self.failures().next().is_none()
    }
}
