//! Image processing, pure Rust.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::image_dimensions` |
//! | **Convert → WebP** | lossless `WebPEncoder` |
//! | **Split** | Lanczos3 resize + `crop_imm` strips, JPEG or PNG |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: High-level functions combining calculations + backend

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::{ResizeTarget, calculate_resized_dimensions};
pub use operations::{
    GeneratedStrip, SplitOutput, StripConfig, convert_to_webp, get_dimensions, split_image,
};
pub use params::OutputFormat;
pub use rust_backend::RustBackend;
