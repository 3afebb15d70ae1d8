//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Calculate output dimensions for a fit-inside resize that never upscales.
///
/// The result preserves the source aspect ratio and lies within both bounds.
/// A `None` bound leaves that axis unconstrained. When the source already
/// fits, it is returned unchanged.
///
/// # Examples
/// ```
/// # use image_vault::imaging::fit_inside;
/// // 1200x900 into a 150x150 box → 150x113
/// assert_eq!(fit_inside((1200, 900), (Some(150), Some(150))), (150, 113));
///
/// // Never enlarges
/// assert_eq!(fit_inside((100, 80), (Some(800), Some(800))), (100, 80));
/// ```
pub fn fit_inside(source: (u32, u32), bounds: (Option<u32>, Option<u32>)) -> (u32, u32) {
    let (src_w, src_h) = source;
    if src_w == 0 || src_h == 0 {
        return source;
    }

    let scale_for = |bound: Option<u32>, edge: u32| bound.map(|b| b as f64 / edge as f64);
    let scale = match (scale_for(bounds.0, src_w), scale_for(bounds.1, src_h)) {
        (Some(sx), Some(sy)) => sx.min(sy),
        (Some(s), None) | (None, Some(s)) => s,
        (None, None) => return source,
    };

    if scale >= 1.0 {
        return source;
    }

    let scaled = |edge: u32| ((edge as f64 * scale).round() as u32).max(1);
    (scaled(src_w), scaled(src_h))
}
