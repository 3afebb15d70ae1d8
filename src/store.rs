//! Asset store: upload, read, delete, and inspect stored images.
//!
//! An [`AssetStore`] is built once from a [`StoreConfig`] and shared by reference.
//! It owns no state beyond the storage root; every call goes to the filesystem.
//!
//! ## Upload pipeline
//!
//! ```text
//! bytes ─▶ validate ─▶ decode metadata ─▶ optimize original ─┐
//!                                      └▶ build derivatives ─┴▶ name ─▶ publish
//! ```
//!
//! All encoding happens in memory before anything touches disk. Publishing
//! writes each file to a `.<name>.partial` staging file next to its destination
//! and renames it into place, in parallel. If any file of an upload fails to
//! publish, the files already published for that upload are removed again and
//! the upload fails. Publishing itself is not atomic: a concurrent reader may
//! see the original before its derivatives, or briefly see files that a
//! rollback then removes.
//!
//! ## Errors
//!
//! Every failure maps to one [`ErrorKind`]: invalid input and missing assets are
//! the caller's problem; codec and storage failures are ours.
//! [`StoreError::public_message`] strips filesystem paths unless the store runs
//! in development mode.

use crate::catalog::{self, CatalogError, ListQuery};
use crate::config::{ConfigError, StoreConfig};
use crate::imaging::{
    CodecError, DerivativeConfig, EncodeParams, ImageCodec, RustCodec, build_derivatives,
};
use crate::layout::{self, LayoutError};
use crate::naming;
use crate::types::{
    AssetDescriptor, AssetMetadata, CatalogPage, DeleteReport, DerivativeOutcome, StorageStats,
    StoredImage, StoredMetadata,
};
use crate::validate::{self, DEFAULT_CATEGORY, ValidationError};
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),
    #[error("Invalid path: {0}")]
    Path(#[from] LayoutError),
    #[error("Image not found: {0}")]
    NotFound(String),
    #[error("Image processing failed: {0}")]
    Codec(#[from] CodecError),
    #[error("Storage failure at {}: {source}", .path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Derivative cleanup failed for {path}: {}", .labels.join(", "))]
    Cleanup { path: String, labels: Vec<String> },
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Stable classification of a [`StoreError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidInput,
    NotFound,
    CodecFailure,
    StorageFailure,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::NotFound => "not_found",
            ErrorKind::CodecFailure => "codec_failure",
            ErrorKind::StorageFailure => "storage_failure",
        }
    }

    /// Whether the caller caused the failure.
    pub fn is_client_error(self) -> bool {
        matches!(self, ErrorKind::InvalidInput | ErrorKind::NotFound)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Serializable error body: a kind plus a message safe to show the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub message: String,
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::Validation(_) | StoreError::Path(_) | StoreError::Config(_) => {
                ErrorKind::InvalidInput
            }
            StoreError::NotFound(_) => ErrorKind::NotFound,
            StoreError::Codec(_) => ErrorKind::CodecFailure,
            StoreError::Storage { .. }
            | StoreError::Cleanup { .. }
            | StoreError::Catalog(_) => ErrorKind::StorageFailure,
        }
    }

    /// Message for the caller. Server-side failures hide internal paths and
    /// causes unless `development` is set.
    pub fn public_message(&self, development: bool) -> String {
        if development || self.kind().is_client_error() {
            return self.to_string();
        }
        match self.kind() {
            ErrorKind::CodecFailure => "Image processing failed".to_string(),
            _ => "Storage operation failed".to_string(),
        }
    }

    pub fn report(&self, development: bool) -> ErrorReport {
        ErrorReport {
            kind: self.kind(),
            message: self.public_message(development),
        }
    }

    fn storage(path: &Path, source: io::Error) -> Self {
        StoreError::Storage {
            path: path.to_path_buf(),
            source,
        }
    }

    /// I/O failure on a file that was just resolved. A file removed in the
    /// meantime by another caller is `NotFound`, not a storage failure.
    fn io_at(logical: &str, path: &Path, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            StoreError::NotFound(logical.to_string())
        } else {
            StoreError::storage(path, source)
        }
    }
}

impl DeleteReport {
    /// Strict mode: any failed derivative removal becomes an error.
    pub fn into_result(self) -> Result<Self, StoreError> {
        let labels: Vec<String> = self.failures().map(|(label, _)| label.to_string()).collect();
        if labels.is_empty() {
            Ok(self)
        } else {
            Err(StoreError::Cleanup {
                path: self.path,
                labels,
            })
        }
    }
}

/// Per-upload switches.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadOptions {
    pub category: String,
    pub generate_derivatives: bool,
    pub optimize: bool,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            category: DEFAULT_CATEGORY.to_string(),
            generate_derivatives: true,
            optimize: true,
        }
    }
}

/// One file of a batch upload.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Image store rooted at a directory.
///
/// Generic over the codec so tests can swap in a recording mock.
pub struct AssetStore<C: ImageCodec = RustCodec> {
    root: PathBuf,
    config: StoreConfig,
    codec: C,
}

impl AssetStore<RustCodec> {
    /// Open a store with the `image`-crate codec.
    pub fn open(config: StoreConfig) -> Result<Self, StoreError> {
        Self::with_codec(config, RustCodec::new())
    }
}

impl<C: ImageCodec> AssetStore<C> {
    /// Validate the config and create the storage root if needed.
    pub fn with_codec(config: StoreConfig, codec: C) -> Result<Self, StoreError> {
        config.validate()?;
        let root = config.storage.root.clone();
        fs::create_dir_all(&root).map_err(|e| StoreError::storage(&root, e))?;
        info!(root = %root.display(), "opened asset store");
        Ok(Self {
            root,
            config,
            codec,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn derivative_config(&self) -> DerivativeConfig {
        DerivativeConfig {
            profiles: self.config.images.derivatives.clone(),
            quality: self.config.images.quality(),
            effort: self.config.images.effort(),
        }
    }

    fn url_for(&self, key: &str) -> Option<String> {
        self.config
            .storage
            .public_base_url
            .as_deref()
            .map(|base| layout::public_url(base, key))
    }

    fn resolve(&self, logical: &str) -> Result<PathBuf, StoreError> {
        Ok(layout::resolve_logical(&self.root, logical)?)
    }

    /// Resolve a key that must name an existing file.
    fn resolve_existing(&self, logical: &str) -> Result<PathBuf, StoreError> {
        let path = self.resolve(logical)?;
        if path.is_file() {
            Ok(path)
        } else {
            Err(StoreError::NotFound(logical.to_string()))
        }
    }

    /// Store an upload made now.
    pub fn upload(
        &self,
        bytes: &[u8],
        original_name: &str,
        mime_type: &str,
        options: &UploadOptions,
    ) -> Result<AssetDescriptor, StoreError> {
        self.upload_at(bytes, original_name, mime_type, options, Utc::now())
    }

    /// Store an upload as if it happened at `at`, which fixes both the
    /// `YYYY/MM` directory and the timestamp part of the name.
    pub fn upload_at(
        &self,
        bytes: &[u8],
        original_name: &str,
        mime_type: &str,
        options: &UploadOptions,
        at: DateTime<Utc>,
    ) -> Result<AssetDescriptor, StoreError> {
        validate::validate_upload(bytes.len(), mime_type, &self.config.images)?;
        let category = validate::validate_category(&options.category)?;

        let info = self.codec.decode_metadata(bytes)?;
        debug!(width = info.width, height = info.height, format = %info.format, "decoded upload");

        let original: Cow<[u8]> = if options.optimize {
            let params = EncodeParams::optimize(
                info.format,
                self.config.images.quality(),
                self.config.images.effort(),
            );
            Cow::Owned(self.codec.encode(bytes, &params)?)
        } else {
            Cow::Borrowed(bytes)
        };

        let derivatives = if options.generate_derivatives {
            build_derivatives(&self.codec, bytes, info.format, &self.derivative_config())?
        } else {
            Vec::new()
        };

        let stored_name = naming::with_image_extension(original_name, info.format.mime_type());
        let file_name = naming::generate_file_name(&stored_name, at);
        let relative_dir = layout::category_dir(&category, at);
        let dir = self.root.join(&relative_dir);
        fs::create_dir_all(&dir).map_err(|e| StoreError::storage(&dir, e))?;

        let mut writes: Vec<(PathBuf, &[u8])> = vec![(dir.join(&file_name), &*original)];
        let mut derivative_keys = BTreeMap::new();
        for derivative in &derivatives {
            let name = naming::derivative_file_name(&file_name, &derivative.label);
            derivative_keys.insert(
                derivative.label.clone(),
                layout::to_key(&relative_dir.join(&name)),
            );
            writes.push((dir.join(name), derivative.bytes.as_slice()));
        }
        publish_all(&writes)?;

        let relative_path = layout::to_key(&relative_dir.join(&file_name));
        info!(
            path = %relative_path,
            bytes = original.len(),
            derivatives = derivative_keys.len(),
            "stored upload"
        );

        Ok(AssetDescriptor {
            id: file_name,
            url: self.url_for(&relative_path),
            relative_path,
            category,
            derivatives: options.generate_derivatives.then_some(derivative_keys),
            metadata: AssetMetadata {
                original_name: original_name.to_string(),
                mime_type: mime_type.to_string(),
                byte_size: original.len() as u64,
                width: info.width,
                height: info.height,
                format: info.format,
            },
            uploaded_at: at,
        })
    }

    /// Store several files with the same options.
    ///
    /// Every file is validated before any is processed; the uploads then run in
    /// parallel. Files are independent: if one fails, the others that already
    /// succeeded stay stored.
    pub fn upload_batch(
        &self,
        files: &[UploadFile],
        options: &UploadOptions,
    ) -> Result<Vec<AssetDescriptor>, StoreError> {
        validate::validate_batch(files.len())?;
        for file in files {
            validate::validate_upload(file.bytes.len(), &file.mime_type, &self.config.images)?;
        }
        validate::validate_category(&options.category)?;

        files
            .par_iter()
            .map(|file| self.upload(&file.bytes, &file.name, &file.mime_type, options))
            .collect()
    }

    /// Read a stored file.
    pub fn get(&self, logical: &str) -> Result<StoredImage, StoreError> {
        let path = self.resolve_existing(logical)?;
        let bytes = fs::read(&path).map_err(|e| StoreError::io_at(logical, &path, e))?;
        Ok(StoredImage {
            bytes,
            content_type: naming::content_type_for(&path),
        })
    }

    /// Read the `label` derivative of the original at `logical`.
    pub fn get_variant(&self, logical: &str, label: &str) -> Result<StoredImage, StoreError> {
        if self.config.images.profile(label).is_none() {
            return Err(ValidationError::UnknownSize {
                label: label.to_string(),
                available: self
                    .config
                    .images
                    .labels()
                    .into_iter()
                    .map(String::from)
                    .collect(),
            }
            .into());
        }
        self.get(&naming::derivative_file_name(logical, label))
    }

    /// Whether a file exists at `logical`. Keys that could not name a file
    /// under the root are reported as absent.
    pub fn exists(&self, logical: &str) -> bool {
        self.resolve(logical).is_ok_and(|path| path.is_file())
    }

    /// Delete an original and every derivative it may have.
    ///
    /// A missing original is `NotFound`. Derivatives are removed in parallel;
    /// each gets an outcome in the report instead of aborting the delete.
    pub fn delete(&self, logical: &str) -> Result<DeleteReport, StoreError> {
        let path = self.resolve_existing(logical)?;
        fs::remove_file(&path).map_err(|e| StoreError::io_at(logical, &path, e))?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let derivatives: BTreeMap<String, DerivativeOutcome> = self
            .config
            .images
            .derivatives
            .par_iter()
            .map(|profile| {
                let sibling = path.with_file_name(naming::derivative_file_name(&name, &profile.label));
                (profile.label.clone(), remove_if_present(&sibling))
            })
            .collect();

        let report = DeleteReport {
            path: logical.to_string(),
            derivatives,
        };
        info!(
            path = %logical,
            derivatives_removed = report.removed_count(),
            "deleted image"
        );
        Ok(report)
    }

    /// Size, timestamps, and decoded dimensions of a stored file.
    pub fn metadata(&self, logical: &str) -> Result<StoredMetadata, StoreError> {
        let path = self.resolve_existing(logical)?;
        let meta = fs::metadata(&path).map_err(|e| StoreError::io_at(logical, &path, e))?;
        let modified = meta.modified().map_err(|e| StoreError::storage(&path, e))?;
        let bytes = fs::read(&path).map_err(|e| StoreError::io_at(logical, &path, e))?;
        let info = self.codec.decode_metadata(&bytes)?;

        Ok(StoredMetadata {
            relative_path: layout::public_key(&self.root, &path)
                .unwrap_or_else(|| logical.to_string()),
            byte_size: meta.len(),
            last_modified: DateTime::<Utc>::from(modified),
            created: meta.created().ok().map(DateTime::<Utc>::from),
            width: info.width,
            height: info.height,
            format: info.format,
        })
    }

    /// List originals, newest first.
    pub fn list(&self, query: &ListQuery) -> Result<CatalogPage, StoreError> {
        validate::validate_pagination(query.page, query.limit)?;
        let query = match &query.category {
            Some(category) => ListQuery {
                category: Some(validate::validate_category(category)?),
                ..query.clone()
            },
            None => query.clone(),
        };

        let mut page = catalog::list(&self.root, &self.config.images.labels(), &query)?;
        for item in &mut page.items {
            item.url = self.url_for(&item.relative_path);
        }
        Ok(page)
    }

    /// Totals over every image file in the store.
    pub fn stats(&self) -> Result<StorageStats, StoreError> {
        Ok(catalog::stats(&self.root)?)
    }
}

/// Staging file used while publishing `path`.
fn staging_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(".");
    name.push(path.file_name().unwrap_or_default());
    name.push(".partial");
    path.with_file_name(name)
}

/// Write `bytes` to a staging file, then rename it onto `path`.
fn publish(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let staging = staging_path(path);
    let result = fs::write(&staging, bytes).and_then(|()| fs::rename(&staging, path));
    if result.is_err() {
        let _ = fs::remove_file(&staging);
    }
    result
}

/// Publish every file of one upload, or none of them.
fn publish_all(files: &[(PathBuf, &[u8])]) -> Result<(), StoreError> {
    let results: Vec<io::Result<()>> = files
        .par_iter()
        .map(|(path, bytes)| publish(path, bytes))
        .collect();

    let mut published = Vec::with_capacity(files.len());
    let mut failure = None;
    for ((path, _), result) in files.iter().zip(results) {
        match result {
            Ok(()) => published.push(path),
            Err(e) => {
                failure.get_or_insert((path, e));
            }
        }
    }

    let Some((path, source)) = failure else {
        return Ok(());
    };
    for done in published {
        if let Err(e) = fs::remove_file(done) {
            warn!(path = %done.display(), error = %e, "failed to roll back published file");
        }
    }
    warn!(path = %path.display(), error = %source, "upload rolled back");
    Err(StoreError::storage(path, source))
}

fn remove_if_present(path: &Path) -> DerivativeOutcome {
    match fs::remove_file(path) {
        Ok(()) => DerivativeOutcome::Removed,
        Err(e) if e.kind() == io::ErrorKind::NotFound => DerivativeOutcome::Missing,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to remove derivative");
            DerivativeOutcome::Failed(e.to_string())
        }
    }
}
