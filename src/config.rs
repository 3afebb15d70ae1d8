//! Store configuration.
//!
//! Handles loading, validating, and merging a TOML config file. Stock defaults
//! form the base layer; a user file only needs the keys it wants to change.
//! Unknown keys are rejected.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! development = false          # Include internal details in error messages
//!
//! [storage]
//! root = "uploads"             # Storage root directory
//! # public_base_url = "http://localhost:3000/api/v1/images"
//!
//! [images]
//! quality = 80                 # Lossy (JPEG) quality, 1-100
//! png_compression = 9          # Lossless effort, 0-9
//! max_file_size = 10485760     # Maximum upload size in bytes (10 MiB)
//! allowed_types = ["image/jpeg", "image/png", "image/webp", "image/gif"]
//!
//! [[images.derivatives]]
//! label = "small"
//! width = 150
//! height = 150
//! # ... medium 300x300, large 800x800
//!
//! [processing]
//! # max_processes = 4          # Cap on parallel workers (default: CPU cores)
//! ```

use crate::imaging::{Effort, Quality, SizeProfile};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Store configuration loaded from a TOML file.
///
/// All fields have defaults matching a stock deployment. Unknown keys are rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Development mode: error messages may include filesystem paths.
    pub development: bool,
    /// Where files live and how they are addressed.
    pub storage: StorageConfig,
    /// Upload limits, encoding settings, and derivative profiles.
    pub images: ImagesConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl StoreConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Validation(msg.to_string()));

        if self.storage.root.as_os_str().is_empty() {
            return invalid("storage.root must not be empty");
        }
        let bad_url = self
            .storage
            .public_base_url
            .as_deref()
            .is_some_and(|base| !(base.starts_with("http://") || base.starts_with("https://")));
        if bad_url {
            return invalid("storage.public_base_url must start with http:// or https://");
        }

        let images = &self.images;
        if !(1..=100).contains(&images.quality) {
            return invalid("images.quality must be 1-100");
        }
        if images.png_compression > 9 {
            return invalid("images.png_compression must be 0-9");
        }
        if images.max_file_size == 0 {
            return invalid("images.max_file_size must be greater than zero");
        }
        if images.allowed_types.is_empty() {
            return invalid("images.allowed_types must not be empty");
        }
        if images.derivatives.is_empty() {
            return invalid("images.derivatives must not be empty");
        }

        let mut seen = HashSet::new();
        for profile in &images.derivatives {
            if profile.label.is_empty()
                || !profile
                    .label
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_')
            {
                return Err(ConfigError::Validation(format!(
                    "images.derivatives label '{}' must be non-empty and contain only letters, digits, or '_'",
                    profile.label
                )));
            }
            if !seen.insert(profile.label.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "images.derivatives label '{}' is duplicated",
                    profile.label
                )));
            }
            if profile.width == 0 || profile.height == 0 {
                return Err(ConfigError::Validation(format!(
                    "images.derivatives '{}' must have non-zero width and height",
                    profile.label
                )));
            }
        }
        Ok(())
    }
}

/// Storage location settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// Root directory under which every asset is stored.
    pub root: PathBuf,
    /// Base URL prepended to public keys in descriptors and listings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_base_url: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("uploads"),
            public_base_url: None,
        }
    }
}

/// Upload limits and encoding settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImagesConfig {
    /// Lossy encoding quality (1 = worst, 100 = best).
    pub quality: u32,
    /// Lossless compression effort (0 = fastest, 9 = smallest).
    pub png_compression: u8,
    /// Largest accepted upload, in bytes.
    pub max_file_size: u64,
    /// MIME types accepted at upload.
    pub allowed_types: Vec<String>,
    /// Derivative size profiles, generated in this order.
    pub derivatives: Vec<SizeProfile>,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            quality: 80,
            png_compression: 9,
            max_file_size: 10 * 1024 * 1024,
            allowed_types: ["image/jpeg", "image/png", "image/webp", "image/gif"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            derivatives: vec![
                SizeProfile::new("small", 150, 150),
                SizeProfile::new("medium", 300, 300),
                SizeProfile::new("large", 800, 800),
            ],
        }
    }
}

impl ImagesConfig {
    pub fn quality(&self) -> Quality {
        Quality::new(self.quality)
    }

    pub fn effort(&self) -> Effort {
        Effort::new(self.png_compression)
    }

    /// Configured derivative labels, in profile order.
    pub fn labels(&self) -> Vec<&str> {
        self.derivatives.iter().map(|p| p.label.as_str()).collect()
    }

    pub fn profile(&self, label: &str) -> Option<&SizeProfile> {
        self.derivatives.iter().find(|p| p.label == label)
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel workers for encoding, batch uploads, and
    /// derivative cleanup. When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the worker count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)`, never zero
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map_or(cores, |n| n.clamp(1, cores))
}

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the base layer that user overrides are merged on top of.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(StoreConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely, so a user
///   `[[images.derivatives]]` list replaces the stock profiles.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<StoreConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: StoreConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from the file at `path`, falling back to stock defaults when absent.
pub fn load_config(path: &Path) -> Result<StoreConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(path)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock config file with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# image-vault configuration
# =========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.

# Include internal details (such as filesystem paths) in error messages.
development = false

# ---------------------------------------------------------------------------
# Storage
# ---------------------------------------------------------------------------
[storage]
# Directory under which assets are stored as <category>/<YYYY>/<MM>/<file>.
root = "uploads"

# Base URL prepended to public keys in upload results and listings.
# Omit to leave URLs out.
# public_base_url = "http://localhost:3000/api/v1/images"

# ---------------------------------------------------------------------------
# Images
# ---------------------------------------------------------------------------
[images]
# JPEG encoding quality (1 = worst, 100 = best).
quality = 80

# Compression effort for PNG and GIF (0 = fastest, 9 = smallest).
png_compression = 9

# Largest accepted upload in bytes (10 MiB).
max_file_size = 10485760

# MIME types accepted at upload.
allowed_types = ["image/jpeg", "image/png", "image/webp", "image/gif"]

# Derivative sizes. Each upload gets one resized copy per entry, fitted inside
# width x height without upscaling. Listing one here replaces the whole list.
# Labels may contain letters, digits, and '_'.
[[images.derivatives]]
label = "small"
width = 150
height = 150

[[images.derivatives]]
label = "medium"
width = 300
height = 300

[[images.derivatives]]
label = "large"
width = 800
height = 800

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_matches_stock_deployment() {
        let config = StoreConfig::default();
        assert!(!config.development);
        assert_eq!(config.storage.root, PathBuf::from("uploads"));
        assert_eq!(config.storage.public_base_url, None);
        assert_eq!(config.images.quality, 80);
        assert_eq!(config.images.png_compression, 9);
        assert_eq!(config.images.max_file_size, 10_485_760);
        assert_eq!(config.images.allowed_types.len(), 4);
        assert_eq!(config.images.labels(), vec!["small", "medium", "large"]);
    }

    #[test]
    fn parse_partial_config() {
        let toml = r#"
[images]
quality = 65
"#;
        let config: StoreConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.images.quality, 65);
        // Defaults preserved
        assert_eq!(config.images.png_compression, 9);
        assert_eq!(config.images.derivatives.len(), 3);
        assert_eq!(config.storage.root, PathBuf::from("uploads"));
    }

    #[test]
    fn parse_derivative_profiles() {
        let toml = r#"
[[images.derivatives]]
label = "thumb"
width = 64
height = 64

[[images.derivatives]]
label = "hero"
width = 1600
height = 900
"#;
        let config: StoreConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.images.labels(), vec!["thumb", "hero"]);
        assert_eq!(
            config.images.profile("hero"),
            Some(&SizeProfile::new("hero", 1600, 900))
        );
    }

    #[test]
    fn quality_and_effort_accessors() {
        let config = ImagesConfig::default();
        assert_eq!(config.quality(), Quality::new(80));
        assert_eq!(config.effort(), Effort::new(9));
    }

    // =========================================================================
    // load_config tests
    // =========================================================================

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(&tmp.path().join("image-vault.toml")).unwrap();
        assert_eq!(config.images.quality, 80);
        assert_eq!(config.storage.root, PathBuf::from("uploads"));
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("image-vault.toml");
        fs::write(
            &path,
            r#"
development = true

[storage]
root = "/var/lib/images"
public_base_url = "https://cdn.example.com/images"
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert!(config.development);
        assert_eq!(config.storage.root, PathBuf::from("/var/lib/images"));
        assert_eq!(
            config.storage.public_base_url.as_deref(),
            Some("https://cdn.example.com/images")
        );
        // Unspecified sections fall back to defaults
        assert_eq!(config.images.quality, 80);
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("image-vault.toml");
        fs::write(&path, "this is not [valid toml").unwrap();
        assert!(matches!(load_config(&path), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn load_config_validates_values() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("image-vault.toml");
        fs::write(
            &path,
            r#"
[images]
quality = 0
"#,
        )
        .unwrap();
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("quality"));
    }

    #[test]
    fn stock_config_toml_parses_to_defaults() {
        let config: StoreConfig = toml::from_str(stock_config_toml()).unwrap();
        let defaults = StoreConfig::default();
        assert_eq!(config.images.quality, defaults.images.quality);
        assert_eq!(config.images.derivatives, defaults.images.derivatives);
        assert_eq!(config.images.allowed_types, defaults.images.allowed_types);
        assert_eq!(config.storage.root, defaults.storage.root);
        assert!(config.validate().is_ok());
    }

    // =========================================================================
    // Processing config tests
    // =========================================================================

    #[test]
    fn effective_threads_auto() {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(effective_threads(&ProcessingConfig::default()), cores);
    }

    #[test]
    fn effective_threads_clamped_to_cores() {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let config = ProcessingConfig {
            max_processes: Some(99999),
        };
        assert_eq!(effective_threads(&config), cores);
    }

    #[test]
    fn effective_threads_never_zero() {
        let config = ProcessingConfig {
            max_processes: Some(0),
        };
        assert_eq!(effective_threads(&config), 1);
    }

    // =========================================================================
    // merge_toml tests
    // =========================================================================

    #[test]
    fn merge_toml_table_merge() {
        let base = stock_defaults_value().unwrap();
        let overlay: toml::Value = toml::from_str(
            r#"
[images]
quality = 70
"#,
        )
        .unwrap();
        let merged = merge_toml(base, overlay);
        let images = merged.get("images").unwrap();
        assert_eq!(images.get("quality").unwrap().as_integer(), Some(70));
        assert_eq!(
            images.get("png_compression").unwrap().as_integer(),
            Some(9)
        );
    }

    #[test]
    fn merge_toml_replaces_profile_list() {
        let base = stock_defaults_value().unwrap();
        let overlay: toml::Value = toml::from_str(
            r#"
[[images.derivatives]]
label = "thumb"
width = 100
height = 100
"#,
        )
        .unwrap();
        let config = resolve_config(base, Some(overlay)).unwrap();
        assert_eq!(config.images.labels(), vec!["thumb"]);
    }

    #[test]
    fn stock_defaults_omit_unset_base_url() {
        let base = stock_defaults_value().unwrap();
        let storage = base.get("storage").unwrap();
        assert!(storage.get("public_base_url").is_none());
        assert_eq!(storage.get("root").unwrap().as_str(), Some("uploads"));
    }

    // =========================================================================
    // Unknown key rejection tests
    // =========================================================================

    #[test]
    fn unknown_key_rejected() {
        let toml_str = r#"
[images]
qualty = 90
"#;
        let result: Result<StoreConfig, _> = toml::from_str(toml_str);
        let err = result.unwrap_err().to_string();
        assert!(err.contains("unknown field"));
    }

    #[test]
    fn unknown_section_rejected() {
        let result: Result<StoreConfig, _> = toml::from_str("[cache]\nenabled = true\n");
        assert!(result.is_err());
    }

    #[test]
    fn unknown_profile_key_rejected() {
        let toml_str = r#"
[[images.derivatives]]
label = "small"
width = 150
height = 150
crop = true
"#;
        let result: Result<StoreConfig, _> = toml::from_str(toml_str);
        assert!(result.is_err());
    }

    // =========================================================================
    // Validation tests
    // =========================================================================

    #[test]
    fn validate_default_config_passes() {
        assert!(StoreConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_quality_bounds() {
        let mut config = StoreConfig::default();
        config.images.quality = 100;
        assert!(config.validate().is_ok());
        config.images.quality = 1;
        assert!(config.validate().is_ok());
        config.images.quality = 0;
        assert!(config.validate().is_err());
        config.images.quality = 101;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_png_compression_bound() {
        let mut config = StoreConfig::default();
        config.images.png_compression = 10;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("png_compression"));
    }

    #[test]
    fn validate_profiles() {
        let mut config = StoreConfig::default();
        config.images.derivatives = vec![];
        assert!(config.validate().is_err());

        config.images.derivatives = vec![SizeProfile::new("x-large", 10, 10)];
        assert!(config.validate().is_err());

        config.images.derivatives = vec![
            SizeProfile::new("small", 10, 10),
            SizeProfile::new("small", 20, 20),
        ];
        assert!(config.validate().unwrap_err().to_string().contains("duplicated"));

        config.images.derivatives = vec![SizeProfile::new("flat", 10, 0)];
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_public_base_url_scheme() {
        let mut config = StoreConfig::default();
        config.storage.public_base_url = Some("cdn.example.com".into());
        assert!(config.validate().is_err());
        config.storage.public_base_url = Some("https://cdn.example.com".into());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_limits() {
        let mut config = StoreConfig::default();
        config.images.max_file_size = 0;
        assert!(config.validate().is_err());

        let mut config = StoreConfig::default();
        config.images.allowed_types.clear();
        assert!(config.validate().is_err());
    }
}
