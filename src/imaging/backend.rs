//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait covers the three operations the build needs:
//! identify, lossless WebP conversion, and resize-and-slice for the splitter.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate. Tests use the recording `MockBackend` below.

use super::params::{ConvertParams, SliceParams};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Trait for image processing backends.
pub trait ImageBackend: Sync {
    /// Get image dimensions without a full decode where possible.
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError>;

    /// Re-encode an image as lossless WebP.
    fn convert(&self, params: &ConvertParams) -> Result<(), BackendError>;

    /// Resize once, then write every requested strip.
    fn slice(&self, params: &SliceParams) -> Result<(), BackendError>;
}
