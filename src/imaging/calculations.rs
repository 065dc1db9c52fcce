//! Pure calculation functions for variant dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

use super::backend::Dimensions;

/// Decide which of the requested widths to generate for an image.
///
/// Keeps every requested width that does not exceed the intrinsic width, in
/// the order the caller gave them. Repeated widths are kept once (first
/// occurrence wins), so each variant has exactly one writer. If nothing
/// survives the filter, the intrinsic width is used on its own.
///
/// # Arguments
/// * `intrinsic` - Original image width in pixels
/// * `requested` - Configured widths, any order
///
/// # Examples
/// ```
/// # use html_srcset::imaging::resolve_widths;
/// assert_eq!(resolve_widths(800, &[320, 640, 1280]), vec![320, 640]);
/// assert_eq!(resolve_widths(200, &[320, 640, 1280]), vec![200]);
/// ```
pub fn resolve_widths(intrinsic: u32, requested: &[u32]) -> Vec<u32> {
    let mut widths: Vec<u32> = Vec::with_capacity(requested.len());
    for &width in requested {
        if width <= intrinsic && !widths.contains(&width) {
            widths.push(width);
        }
    }

    // Original is narrower than every breakpoint
    if widths.is_empty() {
        widths.push(intrinsic);
    }

    widths
}

/// Height of a variant, preserving the source's own aspect ratio.
///
/// Computed as `round(width / aspect)` with `aspect = w / h`. Extremely wide
/// sources can round to zero, which no encoder accepts, so the result is
/// never smaller than 1.
///
/// # Examples
/// ```
/// # use html_srcset::imaging::{variant_height, Dimensions};
/// let dims = Dimensions { width: 1920, height: 1080 };
/// assert_eq!(variant_height(320, dims), 180);
/// ```
pub fn variant_height(width: u32, source: Dimensions) -> u32 {
    let aspect = source.width as f64 / source.height as f64;
    let height = (width as f64 / aspect).round() as u32;
    height.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dims(width: u32, height: u32) -> Dimensions {
        Dimensions { width, height }
    }

    // =========================================================================
    // resolve_widths tests
    // =========================================================================

    #[test]
    fn widths_all_fit() {
        assert_eq!(resolve_widths(1920, &[320, 640, 1280]), vec![320, 640, 1280]);
    }

    #[test]
    fn widths_drop_larger_than_original() {
        assert_eq!(resolve_widths(800, &[320, 640, 1280]), vec![320, 640]);
    }

    #[test]
    fn widths_fall_back_to_original() {
        assert_eq!(resolve_widths(200, &[320, 640, 1280]), vec![200]);
    }

    #[test]
    fn widths_equal_to_original_kept() {
        assert_eq!(resolve_widths(640, &[320, 640, 1280]), vec![320, 640]);
    }

    #[test]
    fn widths_preserve_requested_order() {
        assert_eq!(resolve_widths(2000, &[1280, 320, 640]), vec![1280, 320, 640]);
    }

    #[test]
    fn widths_duplicates_kept_once() {
        assert_eq!(resolve_widths(2000, &[640, 320, 640]), vec![640, 320]);
    }

    #[test]
    fn widths_empty_request_uses_original() {
        assert_eq!(resolve_widths(1000, &[]), vec![1000]);
    }

    #[test]
    fn widths_invariants_hold_across_inputs() {
        let requests: [&[u32]; 5] = [
            &[320, 640, 1280],
            &[1600],
            &[1, 2, 3],
            &[5000, 4000],
            &[],
        ];
        for intrinsic in [1, 199, 320, 800, 1920, 4096] {
            for requested in requests {
                let widths = resolve_widths(intrinsic, requested);
                assert!(!widths.is_empty());
                assert!(widths.iter().all(|&w| w <= intrinsic));
                if requested.iter().all(|&w| w > intrinsic) {
                    assert_eq!(widths, vec![intrinsic]);
                } else {
                    assert!(widths.iter().all(|w| requested.contains(w)));
                }
            }
        }
    }

    // =========================================================================
    // variant_height tests
    // =========================================================================

    #[test]
    fn height_landscape_16_9() {
        let source = dims(1920, 1080);
        assert_eq!(variant_height(320, source), 180);
        assert_eq!(variant_height(640, source), 360);
        assert_eq!(variant_height(1280, source), 720);
    }

    #[test]
    fn height_portrait() {
        assert_eq!(variant_height(300, dims(600, 800)), 400);
    }

    #[test]
    fn height_rounds_to_nearest() {
        // 800x600 → 4:3, 100 / 1.333 = 75
        assert_eq!(variant_height(100, dims(800, 600)), 75);
        // 1000x333 → 320 / 3.003 = 106.56 → 107
        assert_eq!(variant_height(320, dims(1000, 333)), 107);
    }

    #[test]
    fn height_never_zero_for_extreme_panoramas() {
        assert_eq!(variant_height(320, dims(100_000, 10)), 1);
    }
}
