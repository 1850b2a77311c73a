//! High-level image operations.
//!
//! These functions combine calculations with backend execution.
//! They take configuration, compute parameters, and call the backend.

use super::backend::{BackendError, ImageBackend};
use super::calculations::{
    ResizeTarget, calculate_resized_dimensions, calculate_split_count, calculate_strip_bounds,
};
use super::params::{ConvertParams, OutputFormat, Slice, SliceParams};
use std::path::{Path, PathBuf};

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Get image dimensions using the backend.
pub fn get_dimensions(backend: &impl ImageBackend, path: &Path) -> Result<(u32, u32)> {
    let dims = backend.identify(path)?;
    Ok((dims.width, dims.height))
}

/// Write a lossless WebP copy of `source` at `output`.
pub fn convert_to_webp(backend: &impl ImageBackend, source: &Path, output: &Path) -> Result<()> {
    backend.convert(&ConvertParams {
        source: source.to_path_buf(),
        output: output.to_path_buf(),
    })
}

/// Strip geometry shared by every split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StripConfig {
    pub split_height: u32,
    pub overlap: u32,
}

/// One written strip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedStrip {
    /// 1-based, also the file stem.
    pub index: u32,
    pub path: PathBuf,
    pub height: u32,
}

/// Outcome of splitting one image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitOutput {
    pub width: u32,
    pub height: u32,
    pub format: OutputFormat,
    pub strips: Vec<GeneratedStrip>,
}

/// Resize `source` and cut it into numbered strips inside `output_dir`.
///
/// The strip count is derived from the resized height unless `count` is
/// given, which lets a companion image be cut into the same number of
/// pieces as its primary. Files are named `1.<ext>`, `2.<ext>`, ... with the
/// extension chosen by [`OutputFormat::for_slices_of`].
pub fn split_image(
    backend: &impl ImageBackend,
    source: &Path,
    output_dir: &Path,
    target: ResizeTarget,
    count: Option<u32>,
    config: &StripConfig,
) -> Result<SplitOutput> {
    let original = get_dimensions(backend, source)?;
    let (width, height) = calculate_resized_dimensions(original, target);
    let count = count.unwrap_or_else(|| calculate_split_count(height, config.split_height));
    let format = OutputFormat::for_slices_of(source);

    let bounds = calculate_strip_bounds(height, count, config.overlap);

    let strips: Vec<GeneratedStrip> = bounds
        .iter()
        .zip(1..)
        .map(|(b, index)| GeneratedStrip {
            index,
            path: output_dir.join(format!("{index}.{}", format.extension())),
            height: b.height(),
        })
        .collect();

    let slices = bounds
        .iter()
        .zip(&strips)
        .map(|(b, strip)| Slice {
            top: b.top,
            height: b.height(),
            output: strip.path.clone(),
        })
        .collect();

    backend.slice(&SliceParams {
        source: source.to_path_buf(),
        width,
        height,
        format,
        slices,
    })?;

    Ok(SplitOutput {
        width,
        height,
        format,
        strips,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::Dimensions;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};

    const STRIPS: StripConfig = StripConfig {
        split_height: 200,
        overlap: 10,
    };

    #[test]
    fn get_dimensions_calls_backend() {
        let backend = MockBackend::with_dimensions(vec![Dimensions {
            width: 1920,
            height: 1080,
        }]);

        let dims = get_dimensions(&backend, Path::new("/test.jpg")).unwrap();
        assert_eq!(dims, (1920, 1080));
    }

    #[test]
    fn convert_records_paths() {
        let tmp = tempfile::TempDir::new().unwrap();
        let output = tmp.path().join("a.webp");
        let backend = MockBackend::new();
        convert_to_webp(&backend, Path::new("/s/a.png"), &output).unwrap();
        assert_eq!(
            backend.get_operations(),
            vec![RecordedOp::Convert {
                source: "/s/a.png".to_string(),
                output: output.to_string_lossy().to_string(),
            }]
        );
    }

    #[test]
    fn split_scales_and_counts_strips() {
        let backend = MockBackend::with_dimensions(vec![Dimensions {
            width: 375,
            height: 500,
        }]);

        let out = split_image(
            &backend,
            Path::new("/img/pc/top/main.jpg"),
            Path::new("/img/pc/top"),
            ResizeTarget::Scale(2.0),
            None,
            &STRIPS,
        )
        .unwrap();

        assert_eq!((out.width, out.height), (750, 1000));
        assert_eq!(out.format, OutputFormat::Jpeg);
        assert_eq!(out.strips.len(), 5);
        assert_eq!(out.strips[0].path, Path::new("/img/pc/top/1.jpg"));
        assert_eq!(out.strips[0].height, 200);
        assert_eq!(out.strips[1].height, 210);

        let ops = backend.get_operations();
        assert_eq!(ops.len(), 2);
        match &ops[1] {
            RecordedOp::Slice { slices, .. } => {
                assert_eq!(slices[1], (190, 210, "/img/pc/top/2.jpg".to_string()));
                assert_eq!(slices[4], (790, 210, "/img/pc/top/5.jpg".to_string()));
            }
            other => panic!("expected slice, got {other:?}"),
        }
    }

    #[test]
    fn split_with_forced_count() {
        let backend = MockBackend::with_dimensions(vec![Dimensions {
            width: 375,
            height: 300,
        }]);

        let out = split_image(
            &backend,
            Path::new("/img/sp/top/main.png"),
            Path::new("/img/sp/top"),
            ResizeTarget::Width(750),
            Some(5),
            &STRIPS,
        )
        .unwrap();

        // 300 * 2 = 600 high, five strips of nominal 120
        assert_eq!(out.height, 600);
        assert_eq!(out.format, OutputFormat::Png);
        assert_eq!(out.strips.len(), 5);
        assert_eq!(out.strips[4].path, Path::new("/img/sp/top/5.png"));
        assert_eq!(out.strips[4].height, 130);
    }

    #[test]
    fn split_propagates_identify_failure() {
        let backend = MockBackend::new();
        let result = split_image(
            &backend,
            Path::new("/missing.jpg"),
            Path::new("/"),
            ResizeTarget::Scale(1.0),
            None,
            &STRIPS,
        );
        assert!(result.is_err());
        assert_eq!(backend.get_operations().len(), 1);
    }
}
