//! Directory layout of the storage root.
//!
//! Assets live at `root/<category>/<YYYY>/<MM>/<file>`, with year and month taken
//! from the upload instant in UTC. The path relative to the root, with `/`
//! separators, is the asset's public key; callers hand that key back to read or
//! delete the asset.
//!
//! Everything here is pure path arithmetic. No I/O.

use chrono::{DateTime, Datelike, Utc};
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum LayoutError {
    #[error("Path must not be empty")]
    Empty,
    #[error("Path escapes the storage root: {0}")]
    Escapes(String),
}

/// Relative directory for an upload in `category` at `when`.
pub fn category_dir(category: &str, when: DateTime<Utc>) -> PathBuf {
    Path::new(category)
        .join(format!("{:04}", when.year()))
        .join(format!("{:02}", when.month()))
}

/// Render a relative path as a `/`-separated key.
pub fn to_key(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Public key of an absolute path under `root`, or `None` if it lies elsewhere.
pub fn public_key(root: &Path, absolute: &Path) -> Option<String> {
    absolute.strip_prefix(root).ok().map(to_key)
}

/// Resolve a caller-supplied key to a path under `root`.
///
/// Both `/` and `\` separate segments. Absolute paths, drive prefixes, and `..`
/// segments are rejected so a key can never address anything outside the root.
pub fn resolve_logical(root: &Path, logical: &str) -> Result<PathBuf, LayoutError> {
    let normalized = logical.replace('\\', "/");
    let mut resolved = root.to_path_buf();
    let mut depth = 0usize;

    for component in Path::new(&normalized).components() {
        match component {
            Component::Normal(segment) => {
                resolved.push(segment);
                depth += 1;
            }
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(LayoutError::Escapes(logical.to_string()));
            }
        }
    }

    if depth == 0 {
        return Err(LayoutError::Empty);
    }
    Ok(resolved)
}

/// Absolute URL for a key under a public base URL.
pub fn public_url(base: &str, key: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn category_dir_zero_pads_month() {
        let when = Utc.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).unwrap();
        assert_eq!(category_dir("products", when), PathBuf::from("products/2024/03"));
    }

    #[test]
    fn category_dir_uses_utc_month() {
        // Last instant of October in UTC stays in October
        let when = Utc.with_ymd_and_hms(2024, 10, 31, 23, 59, 59).unwrap();
        assert_eq!(category_dir("general", when), PathBuf::from("general/2024/10"));
    }

    #[test]
    fn public_key_strips_root() {
        let root = Path::new("/srv/uploads");
        let abs = root.join("products").join("2024").join("11").join("a.jpg");
        assert_eq!(
            public_key(root, &abs),
            Some("products/2024/11/a.jpg".to_string())
        );
    }

    #[test]
    fn public_key_outside_root_is_none() {
        assert_eq!(
            public_key(Path::new("/srv/uploads"), Path::new("/etc/passwd")),
            None
        );
    }

    #[test]
    fn resolve_logical_joins_under_root() {
        let root = Path::new("/srv/uploads");
        assert_eq!(
            resolve_logical(root, "products/2024/11/a.jpg").unwrap(),
            root.join("products/2024/11/a.jpg")
        );
        assert_eq!(
            resolve_logical(root, "products\\2024\\11\\a.jpg").unwrap(),
            root.join("products/2024/11/a.jpg")
        );
        assert_eq!(
            resolve_logical(root, "./products/a.jpg").unwrap(),
            root.join("products/a.jpg")
        );
    }

    #[test]
    fn resolve_logical_rejects_escapes() {
        let root = Path::new("/srv/uploads");
        for bad in ["../secret.jpg", "products/../../x.jpg", "/etc/passwd", "\\abs.jpg"] {
            assert!(
                matches!(resolve_logical(root, bad), Err(LayoutError::Escapes(_))),
                "expected {bad} to be rejected"
            );
        }
    }

    #[test]
    fn resolve_logical_rejects_empty() {
        let root = Path::new("/srv/uploads");
        assert_eq!(resolve_logical(root, ""), Err(LayoutError::Empty));
        assert_eq!(resolve_logical(root, "./"), Err(LayoutError::Empty));
    }

    #[test]
    fn public_url_joins_with_single_slash() {
        assert_eq!(
            public_url("https://cdn.example.com/images/", "a/b.jpg"),
            "https://cdn.example.com/images/a/b.jpg"
        );
        assert_eq!(
            public_url("http://localhost:3000/api/v1/images", "a.jpg"),
            "http://localhost:3000/api/v1/images/a.jpg"
        );
    }
}
