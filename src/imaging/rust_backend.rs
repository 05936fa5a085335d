//! Pure Rust image processing backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, WebP) | `image` crate (pure Rust decoders) |
//! | Resize | `image::DynamicImage::resize_exact` with `Lanczos3` filter |
//! | Encode → WebP | `image::codecs::webp::WebPEncoder` (lossless) |

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::calculations::fit_width;
use super::params::OptimizeParams;
use image::codecs::webp::WebPEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};
use std::path::Path;

/// Source extensions that are decoded and re-encoded as WebP.
pub const OPTIMIZABLE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// Whether the image at `path` is re-encoded rather than copied.
pub fn is_optimizable(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| OPTIMIZABLE_EXTENSIONS.iter().any(|o| e.eq_ignore_ascii_case(o)))
}

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Load and decode an image from disk.
fn load_image(path: &Path) -> Result<DynamicImage, BackendError> {
    ImageReader::open(path)
        .map_err(BackendError::Io)?
        .with_guessed_format()
        .map_err(BackendError::Io)?
        .decode()
        .map_err(|e| {
            BackendError::ProcessingFailed(format!("Failed to decode {}: {}", path.display(), e))
        })
}

/// Encode and save as lossless WebP.
fn save_webp(img: &DynamicImage, path: &Path) -> Result<(), BackendError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(path).map_err(BackendError::Io)?;
    let writer = std::io::BufWriter::new(file);
    let rgba = DynamicImage::ImageRgba8(img.to_rgba8());
    rgba.write_with_encoder(WebPEncoder::new_lossless(writer))
        .map_err(|e| BackendError::ProcessingFailed(format!("WebP encode failed: {}", e)))
}

impl ImageBackend for RustBackend {
    fn optimize(&self, params: &OptimizeParams) -> Result<Dimensions, BackendError> {
        let img = load_image(&params.source)?;
        let source = Dimensions {
            width: img.width(),
            height: img.height(),
        };
        let target = fit_width(source, params.max_width);
        let img = if target == source {
            img
        } else {
            img.resize_exact(target.width, target.height, FilterType::Lanczos3)
        };
        save_webp(&img, &params.output)?;
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageEncoder, RgbImage};

    /// Create a small valid JPEG file with the given dimensions.
    fn create_test_jpeg(path: &Path, width: u32, height: u32) {
        let img = RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        });
        let file = std::fs::File::create(path).unwrap();
        let writer = std::io::BufWriter::new(file);
        image::codecs::jpeg::JpegEncoder::new(writer)
            .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
            .unwrap();
    }

    /// Create a small valid PNG file with the given dimensions.
    fn create_test_png(path: &Path, width: u32, height: u32) {
        let img = RgbImage::from_fn(width, height, |x, _| image::Rgb([(x % 256) as u8, 0, 0]));
        img.save(path).unwrap();
    }

    #[test]
    fn optimizable_extensions() {
        assert!(is_optimizable(Path::new("a/photo.JPG")));
        assert!(is_optimizable(Path::new("diagram.png")));
        assert!(!is_optimizable(Path::new("logo.svg")));
        assert!(!is_optimizable(Path::new("anim.gif")));
    }

    #[test]
    fn optimize_scales_wide_jpeg_to_webp() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("wide.jpg");
        create_test_jpeg(&source, 400, 200);

        let output = tmp.path().join("out/wide.webp");
        let backend = RustBackend::new();
        let dims = backend
            .optimize(&OptimizeParams {
                source,
                output: output.clone(),
                max_width: 100,
            })
            .unwrap();

        assert_eq!(dims, Dimensions { width: 100, height: 50 });
        assert!(output.exists());
        assert_eq!(image::image_dimensions(&output).unwrap(), (100, 50));
    }

    #[test]
    fn optimize_keeps_narrow_png_size() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("small.png");
        create_test_png(&source, 64, 48);

        let output = tmp.path().join("small.webp");
        let dims = RustBackend::new()
            .optimize(&OptimizeParams {
                source,
                output: output.clone(),
                max_width: 800,
            })
            .unwrap();

        assert_eq!(dims, Dimensions { width: 64, height: 48 });
        assert!(std::fs::metadata(&output).unwrap().len() > 0);
    }

    #[test]
    fn optimize_corrupt_source_errors() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("broken.png");
        std::fs::write(&source, b"not an image").unwrap();

        let result = RustBackend::new().optimize(&OptimizeParams {
            source,
            output: tmp.path().join("broken.webp"),
            max_width: 800,
        });
        assert!(matches!(result, Err(BackendError::ProcessingFailed(_))));
    }
}
