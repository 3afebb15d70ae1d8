//! # Image Vault
//!
//! Storage core for uploaded images. Every upload is validated, re-encoded in
//! its own format, and written to disk together with one resized derivative per
//! configured size profile. The filesystem under the storage root is the only
//! state: no database, no index file, no sidecar metadata.
//!
//! # Storage Layout
//!
//! ```text
//! <root>/<category>/<YYYY>/<MM>/<millis>-<uuid><ext>          original
//! <root>/<category>/<YYYY>/<MM>/<millis>-<uuid>-<label><ext>  derivative
//! ```
//!
//! Callers address images by the key relative to the root, always with `/`
//! separators (`products/2024/11/1730800000000-6f1c….jpg`). Keys that would
//! escape the root are rejected before any filesystem access.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`store`] | [`store::AssetStore`]: upload, get, exists, delete, metadata, list, stats |
//! | [`imaging`] | Codec trait, `image`-crate codec, size calculations, parallel derivative generation |
//! | [`catalog`] | Directory walks behind listing and stats |
//! | [`naming`] | Unique file names, derivative suffixes, extension and MIME tables |
//! | [`layout`] | `category/YYYY/MM` directories and safe logical-path resolution |
//! | [`validate`] | Upload, category, pagination, and batch checks |
//! | [`config`] | `image-vault.toml` loading, merging over stock defaults, validation |
//! | [`types`] | Serializable results: descriptors, listings, metadata, stats, delete reports |
//! | [`output`] | CLI text formatting for each command |
//!
//! # Design Decisions
//!
//! ## Encode First, Then Publish
//!
//! The optimized original and all derivatives are encoded in memory before any
//! byte is written. Each file is then staged as `.<name>.partial` and renamed
//! into place. A failure while publishing rolls back the files already
//! published for that upload, so a failed upload leaves nothing behind. The
//! renames are not atomic as a group: concurrent readers can see an original
//! shortly before its derivatives appear.
//!
//! ## Derivatives Are Found by Name
//!
//! Derivatives carry no metadata linking them to their original; the
//! `-<label>` suffix before the extension is the link. Listing skips any file
//! whose stem ends in a configured label, and delete derives the derivative
//! names from the original's name.
//!
//! ## Pure-Rust Imaging
//!
//! Decoding, Lanczos3 resizing, and encoding all use the `image` crate, so the
//! binary has no system library dependencies. The [`imaging::ImageCodec`] trait
//! keeps the store testable with a recording mock.

pub mod catalog;
pub mod config;
pub mod imaging;
pub mod layout;
pub mod naming;
pub mod output;
pub mod store;
pub mod types;
pub mod validate;

#[cfg(test)]
pub(crate) mod test_helpers;
