//! CLI output formatting for every command.
//!
//! # Key-First Display
//!
//! Every stored image is identified by its key (the path relative to the
//! storage root). Each block leads with the key; details such as size,
//! dimensions, and derivative keys follow as indented context lines.
//! Derivatives are printed in label order.
//!
//! # Output Format
//!
//! ## Upload
//!
//! ```text
//! general/2024/11/1730800000000-6f1c….jpg
//!     Original: photo.jpg (image/jpeg, 1200x900 jpeg)
//!     Stored: 182.4 KB
//!     large: general/2024/11/1730800000000-6f1c…-large.jpg
//!     medium: general/2024/11/1730800000000-6f1c…-medium.jpg
//!     small: general/2024/11/1730800000000-6f1c…-small.jpg
//! ```
//!
//! ## List
//!
//! ```text
//! 001 products/2024/11/1730800000000-6f1c….jpg (182.4 KB, 2024-11-05 10:00:00 UTC)
//! 002 products/2024/10/1728000000000-a2b4….png (44.0 KB, 2024-10-04 00:00:00 UTC)
//!
//! Page 1 of 3 (25 images)
//! ```
//!
//! ## Stats
//!
//! ```text
//! Root: uploads
//!     Images: 100
//!     Size: 12.34 MB (12939428 bytes)
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.

use crate::types::{
    AssetDescriptor, CatalogPage, DeleteReport, DerivativeOutcome, StorageStats, StoredMetadata,
};
use chrono::{DateTime, Utc};

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Human-readable byte count: `512 B`, `1.5 KB`, `12.3 MB`.
fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 3] = ["KB", "MB", "GB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

fn format_time(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

fn print_lines(lines: Vec<String>) {
    for line in lines {
        println!("{}", line);
    }
}

// ============================================================================
// Upload
// ============================================================================

/// Format one upload result.
pub fn format_upload(descriptor: &AssetDescriptor) -> Vec<String> {
    let meta = &descriptor.metadata;
    let mut lines = vec![
        descriptor.relative_path.clone(),
        format!(
            "    Original: {} ({}, {}x{} {})",
            meta.original_name, meta.mime_type, meta.width, meta.height, meta.format
        ),
        format!("    Stored: {}", format_bytes(meta.byte_size)),
    ];
    if let Some(url) = &descriptor.url {
        lines.push(format!("    URL: {}", url));
    }
    if let Some(derivatives) = &descriptor.derivatives {
        for (label, key) in derivatives {
            lines.push(format!("    {}: {}", label, key));
        }
    }
    lines
}

pub fn print_upload(descriptor: &AssetDescriptor) {
    print_lines(format_upload(descriptor));
}

// ============================================================================
// Info
// ============================================================================

/// Format the metadata of a stored file.
pub fn format_metadata(meta: &StoredMetadata) -> Vec<String> {
    let mut lines = vec![
        meta.relative_path.clone(),
        format!("    Format: {} {}x{}", meta.format, meta.width, meta.height),
        format!(
            "    Size: {} ({} bytes)",
            format_bytes(meta.byte_size),
            meta.byte_size
        ),
        format!("    Modified: {}", format_time(&meta.last_modified)),
    ];
    if let Some(created) = &meta.created {
        lines.push(format!("    Created: {}", format_time(created)));
    }
    lines
}

pub fn print_metadata(meta: &StoredMetadata) {
    print_lines(format_metadata(meta));
}

// ============================================================================
// List
// ============================================================================

/// Format one page of a listing, numbered across pages.
pub fn format_listing(page: &CatalogPage) -> Vec<String> {
    let pagination = page.pagination();
    if page.items.is_empty() {
        return vec![format!(
            "No images on page {} ({} total)",
            pagination.page, pagination.total
        )];
    }

    let offset = (page.page.saturating_sub(1)) * page.limit;
    let mut lines: Vec<String> = page
        .items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            format!(
                "{} {} ({}, {})",
                format_index(offset + i + 1),
                item.relative_path,
                format_bytes(item.byte_size),
                format_time(&item.last_modified)
            )
        })
        .collect();

    lines.push(String::new());
    lines.push(format!(
        "Page {} of {} ({} images)",
        pagination.page, pagination.total_pages, pagination.total
    ));
    lines
}

pub fn print_listing(page: &CatalogPage) {
    print_lines(format_listing(page));
}

// ============================================================================
// Delete
// ============================================================================

/// Format a delete report: the original, then one line per derivative.
pub fn format_delete(report: &DeleteReport) -> Vec<String> {
    let mut lines = vec![format!("Deleted {}", report.path)];
    for (label, outcome) in &report.derivatives {
        let status = match outcome {
            DerivativeOutcome::Removed => "removed".to_string(),
            DerivativeOutcome::Missing => "not present".to_string(),
            DerivativeOutcome::Failed(msg) => format!("FAILED ({})", msg),
        };
        lines.push(format!("    {}: {}", label, status));
    }
    lines
}

pub fn print_delete(report: &DeleteReport) {
    print_lines(format_delete(report));
}

// ============================================================================
// Stats
// ============================================================================

pub fn format_stats(stats: &StorageStats) -> Vec<String> {
    vec![
        format!("Root: {}", stats.root),
        format!("    Images: {}", stats.total_count),
        format!(
            "    Size: {:.2} MB ({} bytes)",
            stats.total_megabytes, stats.total_bytes
        ),
    ]
}

pub fn print_stats(stats: &StorageStats) {
    print_lines(format_stats(stats));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::ImageKind;
    use crate::types::{AssetMetadata, CatalogEntry};
    use chrono::TimeZone;
    use std::collections::BTreeMap;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 11, 5, 10, 0, 0).unwrap()
    }

    fn descriptor() -> AssetDescriptor {
        AssetDescriptor {
            id: "1-a.jpg".into(),
            relative_path: "products/2024/11/1-a.jpg".into(),
            url: None,
            category: "products".into(),
            derivatives: Some(BTreeMap::from([
                ("large".to_string(), "products/2024/11/1-a-large.jpg".to_string()),
                ("small".to_string(), "products/2024/11/1-a-small.jpg".to_string()),
            ])),
            metadata: AssetMetadata {
                original_name: "photo.jpg".into(),
                mime_type: "image/jpeg".into(),
                byte_size: 2048,
                width: 1200,
                height: 900,
                format: ImageKind::Jpeg,
            },
            uploaded_at: at(),
        }
    }

    fn entry(path: &str, bytes: u64) -> CatalogEntry {
        CatalogEntry {
            relative_path: path.into(),
            byte_size: bytes,
            last_modified: at(),
            url: None,
        }
    }

    // =========================================================================
    // Helper tests
    // =========================================================================

    #[test]
    fn format_index_pads() {
        assert_eq!(format_index(1), "001");
        assert_eq!(format_index(42), "042");
        assert_eq!(format_index(1000), "1000");
    }

    #[test]
    fn format_bytes_units() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(1023), "1023 B");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(10 * 1024 * 1024), "10.0 MB");
        assert_eq!(format_bytes(3 * 1024 * 1024 * 1024), "3.0 GB");
    }

    #[test]
    fn format_time_is_utc() {
        assert_eq!(format_time(&at()), "2024-11-05 10:00:00 UTC");
    }

    // =========================================================================
    // Command output tests
    // =========================================================================

    #[test]
    fn upload_leads_with_key_then_details() {
        let lines = format_upload(&descriptor());
        assert_eq!(lines[0], "products/2024/11/1-a.jpg");
        assert_eq!(lines[1], "    Original: photo.jpg (image/jpeg, 1200x900 jpeg)");
        assert_eq!(lines[2], "    Stored: 2.0 KB");
        // Derivatives in label order
        assert_eq!(lines[3], "    large: products/2024/11/1-a-large.jpg");
        assert_eq!(lines[4], "    small: products/2024/11/1-a-small.jpg");
    }

    #[test]
    fn upload_shows_url_when_present() {
        let mut d = descriptor();
        d.url = Some("https://cdn/x.jpg".into());
        d.derivatives = None;
        let lines = format_upload(&d);
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[3], "    URL: https://cdn/x.jpg");
    }

    #[test]
    fn listing_numbers_across_pages() {
        let page = CatalogPage {
            items: vec![entry("a/2024/11/1.jpg", 100), entry("a/2024/11/2.jpg", 2048)],
            total: 12,
            page: 2,
            limit: 10,
        };
        let lines = format_listing(&page);
        assert_eq!(lines[0], "011 a/2024/11/1.jpg (100 B, 2024-11-05 10:00:00 UTC)");
        assert_eq!(lines[1], "012 a/2024/11/2.jpg (2.0 KB, 2024-11-05 10:00:00 UTC)");
        assert_eq!(lines[2], "");
        assert_eq!(lines[3], "Page 2 of 2 (12 images)");
    }

    #[test]
    fn empty_listing() {
        let page = CatalogPage {
            items: vec![],
            total: 0,
            page: 1,
            limit: 20,
        };
        assert_eq!(format_listing(&page), vec!["No images on page 1 (0 total)"]);
    }

    #[test]
    fn delete_lists_each_derivative_outcome() {
        let report = DeleteReport {
            path: "a/2024/11/1.jpg".into(),
            derivatives: BTreeMap::from([
                ("large".to_string(), DerivativeOutcome::Failed("denied".into())),
                ("medium".to_string(), DerivativeOutcome::Missing),
                ("small".to_string(), DerivativeOutcome::Removed),
            ]),
        };
        assert_eq!(
            format_delete(&report),
            vec![
                "Deleted a/2024/11/1.jpg",
                "    large: FAILED (denied)",
                "    medium: not present",
                "    small: removed",
            ]
        );
    }

    #[test]
    fn metadata_block() {
        let meta = StoredMetadata {
            relative_path: "a/2024/11/1.png".into(),
            byte_size: 500,
            last_modified: at(),
            created: None,
            width: 30,
            height: 20,
            format: ImageKind::Png,
        };
        assert_eq!(
            format_metadata(&meta),
            vec![
                "a/2024/11/1.png",
                "    Format: png 30x20",
                "    Size: 500 B (500 bytes)",
                "    Modified: 2024-11-05 10:00:00 UTC",
            ]
        );
    }

    #[test]
    fn stats_block() {
        let stats = StorageStats::new(100, 12_939_428, "uploads".into());
        assert_eq!(
            format_stats(&stats),
            vec!["Root: uploads", "    Images: 100", "    Size: 12.34 MB (12939428 bytes)"]
        );
    }
}
