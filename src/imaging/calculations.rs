//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

use super::backend::Dimensions;

/// Dimensions after fitting `source` into `max_width`, keeping the aspect ratio.
///
/// Never upscales. The height is rounded and kept at least 1 pixel.
///
/// # Examples
/// ```
/// # use quire::imaging::{Dimensions, fit_width};
/// let fitted = fit_width(Dimensions { width: 1600, height: 900 }, 800);
/// assert_eq!(fitted, Dimensions { width: 800, height: 450 });
/// ```
pub fn fit_width(source: Dimensions, max_width: u32) -> Dimensions {
    if max_width == 0 || source.width <= max_width {
        return source;
    }
    let scale = max_width as f64 / source.width as f64;
    let height = (source.height as f64 * scale).round().max(1.0) as u32;
    Dimensions {
        width: max_width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dims(width: u32, height: u32) -> Dimensions {
        Dimensions { width, height }
    }

    #[test]
    fn landscape_scaled_down() {
        assert_eq!(fit_width(dims(1600, 900), 800), dims(800, 450));
    }

    #[test]
    fn portrait_scaled_down() {
        assert_eq!(fit_width(dims(1200, 1800), 800), dims(800, 1200));
    }

    #[test]
    fn narrow_image_is_not_upscaled() {
        assert_eq!(fit_width(dims(640, 480), 800), dims(640, 480));
        assert_eq!(fit_width(dims(800, 600), 800), dims(800, 600));
    }

    #[test]
    fn extreme_panorama_keeps_one_pixel_height() {
        assert_eq!(fit_width(dims(100_000, 10), 800), dims(800, 1));
    }

    #[test]
    fn zero_limit_means_unbounded() {
        assert_eq!(fit_width(dims(5000, 100), 0), dims(5000, 100));
    }
}
