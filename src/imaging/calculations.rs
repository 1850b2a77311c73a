//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// How to size an image before splitting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResizeTarget {
    /// Fixed width; height keeps the aspect ratio.
    Width(u32),
    /// Multiply both edges.
    Scale(f64),
}

/// Calculate the resized dimensions for a target.
///
/// Fractional pixels are truncated and each edge is at least 1.
///
/// ```
/// # use landing_kit::imaging::{ResizeTarget, calculate_resized_dimensions};
/// assert_eq!(calculate_resized_dimensions((375, 1000), ResizeTarget::Scale(2.0)), (750, 2000));
/// assert_eq!(calculate_resized_dimensions((1500, 900), ResizeTarget::Width(750)), (750, 450));
/// ```
pub fn calculate_resized_dimensions(original: (u32, u32), target: ResizeTarget) -> (u32, u32) {
    let (w, h) = original;
    let (new_w, new_h) = match target {
        ResizeTarget::Width(width) => {
            let ratio = width as f64 / w.max(1) as f64;
            (width as f64, h as f64 * ratio)
        }
        ResizeTarget::Scale(scale) => (w as f64 * scale, h as f64 * scale),
    };
    ((new_w as u32).max(1), (new_h as u32).max(1))
}

/// Number of strips for an image of `height` with nominal `split_height`.
///
/// Never less than one; a short image is a single strip.
pub fn calculate_split_count(height: u32, split_height: u32) -> u32 {
    (height / split_height.max(1)).max(1)
}

/// Vertical bounds of one strip: `top..bottom`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StripBounds {
    pub top: u32,
    pub bottom: u32,
}

impl StripBounds {
    pub fn height(&self) -> u32 {
        self.bottom - self.top
    }
}

/// Cut `height` into `count` strips.
///
/// Strips share a nominal height of `height / count`. Every strip after the
/// first starts `overlap` pixels early so seams do not show, and the last
/// strip runs to the bottom edge to absorb the remainder.
pub fn calculate_strip_bounds(height: u32, count: u32, overlap: u32) -> Vec<StripBounds> {
    let count = count.max(1);
    let nominal = height / count;

    (0..count)
        .map(|i| {
            let start = i * nominal;
            let top = if i > 0 {
                start.saturating_sub(overlap)
            } else {
                start
            };
            let bottom = if i == count - 1 {
                height
            } else {
                (i + 1) * nominal
            };
            StripBounds { top, bottom }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // calculate_resized_dimensions
    // =========================================================================

    #[test]
    fn resize_by_width_keeps_aspect() {
        assert_eq!(
            calculate_resized_dimensions((1000, 3000), ResizeTarget::Width(750)),
            (750, 2250)
        );
    }

    #[test]
    fn resize_by_scale() {
        assert_eq!(
            calculate_resized_dimensions((400, 1201), ResizeTarget::Scale(0.5)),
            (200, 600)
        );
    }

    #[test]
    fn resize_truncates_fractions() {
        // 500 * (100 / 300) = 166.67 → 166
        assert_eq!(
            calculate_resized_dimensions((300, 500), ResizeTarget::Width(100)),
            (100, 166)
        );
    }

    #[test]
    fn resize_never_collapses_to_zero() {
        assert_eq!(
            calculate_resized_dimensions((10, 10), ResizeTarget::Scale(0.01)),
            (1, 1)
        );
    }

    // =========================================================================
    // calculate_split_count
    // =========================================================================

    #[test]
    fn split_count_floors() {
        assert_eq!(calculate_split_count(1000, 200), 5);
        assert_eq!(calculate_split_count(1099, 200), 5);
        assert_eq!(calculate_split_count(1200, 200), 6);
    }

    #[test]
    fn split_count_minimum_one() {
        assert_eq!(calculate_split_count(150, 200), 1);
        assert_eq!(calculate_split_count(0, 200), 1);
    }

    // =========================================================================
    // calculate_strip_bounds
    // =========================================================================

    #[test]
    fn strips_overlap_after_first() {
        let strips = calculate_strip_bounds(1000, 5, 10);
        assert_eq!(
            strips,
            vec![
                StripBounds { top: 0, bottom: 200 },
                StripBounds { top: 190, bottom: 400 },
                StripBounds { top: 390, bottom: 600 },
                StripBounds { top: 590, bottom: 800 },
                StripBounds { top: 790, bottom: 1000 },
            ]
        );
        assert_eq!(strips[0].height(), 200);
        assert_eq!(strips[1].height(), 210);
    }

    #[test]
    fn last_strip_absorbs_remainder() {
        let strips = calculate_strip_bounds(1099, 5, 10);
        // nominal 219
        assert_eq!(strips[3], StripBounds { top: 647, bottom: 876 });
        assert_eq!(strips[4], StripBounds { top: 866, bottom: 1099 });
    }

    #[test]
    fn single_strip_is_whole_image() {
        assert_eq!(
            calculate_strip_bounds(150, 1, 10),
            vec![StripBounds { top: 0, bottom: 150 }]
        );
    }

    #[test]
    fn overlap_larger_than_strip_clamps_at_zero() {
        let strips = calculate_strip_bounds(20, 4, 10);
        assert_eq!(strips[1].top, 0);
        assert_eq!(strips[3].bottom, 20);
    }
}
