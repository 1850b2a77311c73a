//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how*. The high-level
//! [`operations`](super::operations) module decides which files to produce
//! and the [`backend`](super::backend) does the pixel work, so tests can swap
//! in a mock without touching the planning logic.
//!
//! - [`OutputFormat`]: encoding for written files, chosen by extension.
//! - [`ConvertParams`]: one source re-encoded as lossless WebP.
//! - [`Slice`] / [`SliceParams`]: resize once, then cut horizontal strips.

use std::path::{Path, PathBuf};

/// Encoding used for a written image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Png,
    /// Alpha is flattened onto white before encoding.
    Jpeg,
    /// Always lossless.
    WebP,
}

impl OutputFormat {
    /// Format matching a file's extension, case-insensitively.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "webp" => Some(Self::WebP),
            _ => None,
        }
    }

    /// Strip format for a split source: PNG stays PNG, everything else is JPEG.
    pub fn for_slices_of(source: &Path) -> Self {
        match Self::from_path(source) {
            Some(Self::Png) => Self::Png,
            _ => Self::Jpeg,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::WebP => "webp",
        }
    }
}

/// Re-encode `source` as lossless WebP at `output`.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertParams {
    pub source: PathBuf,
    pub output: PathBuf,
}

/// One horizontal strip of a resized image, full width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slice {
    pub top: u32,
    pub height: u32,
    pub output: PathBuf,
}

/// Resize `source` to exactly `width`×`height`, then write each slice.
#[derive(Debug, Clone, PartialEq)]
pub struct SliceParams {
    pub source: PathBuf,
    pub width: u32,
    pub height: u32,
    pub format: OutputFormat,
    pub slices: Vec<Slice>,
}
