//! Pure Rust image processing backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, WebP) | `image` crate (pure Rust decoders) |
//! | Resize | `DynamicImage::resize_exact` with `Lanczos3` |
//! | Strip crop | `DynamicImage::crop_imm` |
//! | Encode → WebP | `image::codecs::webp::WebPEncoder::new_lossless` |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` (quality 75, alpha flattened on white) |
//! | Encode → PNG | `image::codecs::png` via `save_with_format` |

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::params::{ConvertParams, OutputFormat, SliceParams};
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader, Rgb, RgbImage};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// JPEG quality for split strips.
const JPEG_QUALITY: u8 = 75;

/// Pure Rust backend using the `image` crate ecosystem.
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

/// Composite any alpha channel onto a white background.
fn flatten_on_white(img: &DynamicImage) -> RgbImage {
    if !img.color().has_alpha() {
        return img.to_rgb8();
    }
    let rgba = img.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let a = a as u32;
        let blend = |c: u8| ((c as u32 * a + 255 * (255 - a)) / 255) as u8;
        Rgb([blend(r), blend(g), blend(b)])
    })
}

fn create(path: &Path) -> Result<BufWriter<File>, BackendError> {
    Ok(BufWriter::new(File::create(path)?))
}

/// Encode `img` to `path` in the requested format.
fn save_image(img: &DynamicImage, path: &Path, format: OutputFormat) -> Result<(), BackendError> {
    match format {
        OutputFormat::Png => img
            .save_with_format(path, ImageFormat::Png)
            .map_err(|e| BackendError::ProcessingFailed(format!("PNG encode failed: {e}"))),
        OutputFormat::Jpeg => {
            let rgb = DynamicImage::ImageRgb8(flatten_on_white(img));
            let encoder =
                image::codecs::jpeg::JpegEncoder::new_with_quality(create(path)?, JPEG_QUALITY);
            rgb.write_with_encoder(encoder)
                .map_err(|e| BackendError::ProcessingFailed(format!("JPEG encode failed: {e}")))
        }
        OutputFormat::WebP => {
            // The lossless encoder only takes 8-bit RGB(A).
            let normalized = if img.color().has_alpha() {
                DynamicImage::ImageRgba8(img.to_rgba8())
            } else {
                DynamicImage::ImageRgb8(img.to_rgb8())
            };
            let encoder = image::codecs::webp::WebPEncoder::new_lossless(create(path)?);
            normalized
                .write_with_encoder(encoder)
                .map_err(|e| BackendError::ProcessingFailed(format!("WebP encode failed: {e}")))
        }
    }
}

impl ImageBackend for RustBackend {
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
        let (width, height) = image::image_dimensions(path).map_err(|e| {
            BackendError::ProcessingFailed(format!("Failed to read dimensions: {}", e))
        })?;
        Ok(Dimensions { width, height })
    }

    fn convert(&self, params: &ConvertParams) -> Result<(), BackendError> {
        let img = load_image(&params.source)?;
        save_image(&img, &params.output, OutputFormat::WebP)
    }

    fn slice(&self, params: &SliceParams) -> Result<(), BackendError> {
        let img = load_image(&params.source)?;
        let resized = img.resize_exact(params.width, params.height, FilterType::Lanczos3);

        for slice in &params.slices {
            if slice.height == 0 || slice.top + slice.height > params.height {
                return Err(BackendError::ProcessingFailed(format!(
                    "strip {}+{} outside {}px image",
                    slice.top, slice.height, params.height
                )));
            }
            let strip = resized.crop_imm(0, slice.top, params.width, slice.height);
            save_image(&strip, &slice.output, params.format)?;
        }
        Ok(())
    }
}
