//! Catalog of stored originals.
//!
//! The filesystem is the only source of truth: every call walks the tree under
//! the storage root (or one category below it) and rebuilds the answer.
//!
//! ```text
//! uploads/
//! ├── products/
//! │   └── 2024/
//! │       └── 11/
//! │           ├── 1730800000000-6f1c….jpg          # listed
//! │           ├── 1730800000000-6f1c…-small.jpg    # derivative: counted in stats only
//! │           └── .1730800000001-a2b4….jpg.partial # staging file: ignored
//! └── general/
//!     └── …
//! ```
//!
//! Listings include only files with a recognized image extension, skip derivative
//! files for the configured labels, and are ordered newest first by modification
//! time. Stats count every image file, derivatives included.

use crate::layout;
use crate::naming;
use crate::types::{CatalogEntry, CatalogPage, StorageStats};
use chrono::{DateTime, Utc};
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Listing filter and page selection.
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    /// Restrict to one category directory.
    pub category: Option<String>,
    /// 1-based page number.
    pub page: usize,
    pub limit: usize,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            category: None,
            page: 1,
            limit: 20,
        }
    }
}

/// An image file found during a walk.
#[derive(Debug, Clone)]
struct ScannedFile {
    path: PathBuf,
    byte_size: u64,
    modified: SystemTime,
}

/// Whether a walk error only means the entry was removed while walking.
fn vanished(err: &walkdir::Error) -> bool {
    err.io_error()
        .is_some_and(|e| e.kind() == io::ErrorKind::NotFound)
}

/// Walk `dir` recursively and collect every recognized image file.
///
/// A missing directory yields nothing. Entries deleted concurrently between
/// the directory read and their stat are skipped.
fn collect_images(dir: &Path) -> Result<Vec<ScannedFile>, CatalogError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if vanished(&e) => continue,
            Err(e) => return Err(e.into()),
        };
        if !entry.file_type().is_file() || !naming::is_image_file(entry.path()) {
            continue;
        }
        let meta = match entry.metadata() {
            Ok(meta) => meta,
            Err(e) if vanished(&e) => {
                debug!(path = %entry.path().display(), "skipped entry removed during walk");
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        files.push(ScannedFile {
            byte_size: meta.len(),
            modified: meta.modified()?,
            path: entry.into_path(),
        });
    }
    Ok(files)
}

fn file_name(path: &Path) -> &str {
    path.file_name().and_then(|n| n.to_str()).unwrap_or("")
}

/// List originals under `root`, newest first, one page at a time.
///
/// Pagination arguments are taken as given; callers validate them first.
pub fn list<L: AsRef<str>>(
    root: &Path,
    labels: &[L],
    query: &ListQuery,
) -> Result<CatalogPage, CatalogError> {
    let dir = match &query.category {
        Some(category) => root.join(category),
        None => root.to_path_buf(),
    };

    let mut originals: Vec<ScannedFile> = collect_images(&dir)?
        .into_iter()
        .filter(|f| !naming::is_derivative(file_name(&f.path), labels))
        .collect();
    originals.sort_by(|a, b| b.modified.cmp(&a.modified));

    let total = originals.len();
    let skip = query.page.saturating_sub(1).saturating_mul(query.limit);
    let items = originals
        .into_iter()
        .skip(skip)
        .take(query.limit)
        .filter_map(|f| {
            Some(CatalogEntry {
                relative_path: layout::public_key(root, &f.path)?,
                byte_size: f.byte_size,
                last_modified: DateTime::<Utc>::from(f.modified),
                url: None,
            })
        })
        .collect();

    debug!(dir = %dir.display(), total, page = query.page, "listed catalog");
    Ok(CatalogPage {
        items,
        total,
        page: query.page,
        limit: query.limit,
    })
}

/// Count and sum every image file under `root`, derivatives included.
pub fn stats(root: &Path) -> Result<StorageStats, CatalogError> {
    let files = collect_images(root)?;
    let total_bytes = files.iter().map(|f| f.byte_size).sum();
    debug!(root = %root.display(), count = files.len(), total_bytes, "computed storage stats");
    Ok(StorageStats::new(
        files.len(),
        total_bytes,
        root.display().to_string(),
    ))
}
