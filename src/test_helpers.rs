//! Shared test utilities for the landing-kit test suite.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let fx = setup_fixtures();
//! let report = build_with_backend(&MockBackend::new(), &fx.site, &fx.output, &fx.temp, ...);
//!
//! assert!(read_output(&fx, "index.html").contains("<!-- ga -->"));
//! assert_eq!(find_outcome(&report, "index.html").action, Action::Injected { head: 1, body: 1 });
//! ```

use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::pipeline::{BuildReport, FileOutcome};

// =========================================================================
// Fixture setup
// =========================================================================

/// An isolated copy of `fixtures/site/` plus sibling output and temp dirs.
pub struct Fixture {
    /// Keeps the directory alive for the test's duration.
    pub tmp: TempDir,
    pub site: PathBuf,
    pub output: PathBuf,
    pub temp: PathBuf,
}

/// Copy `fixtures/site/` to `<tmp>/site` and return the paths.
///
/// Tests get an isolated copy they can mutate without affecting other tests
/// or the source fixtures. Output and temp dirs are not created.
pub fn setup_fixtures() -> Fixture {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/site");
    let site = tmp.path().join("site");
    std::fs::create_dir_all(&site).unwrap();
    copy_dir_recursive(&fixtures, &site).unwrap();
    Fixture {
        output: tmp.path().join("dist"),
        temp: tmp.path().join("temp"),
        site,
        tmp,
    }
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            std::fs::create_dir_all(&dst_path)?;
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            std::fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

/// Write a small PNG, creating parent directories.
pub fn write_test_png(path: &Path, width: u32, height: u32) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    image::RgbaImage::from_fn(width, height, |x, y| {
        image::Rgba([(x * 16) as u8, (y * 16) as u8, 200, 255])
    })
    .save(path)
    .unwrap();
}

// =========================================================================
// Lookups: panic with a clear message on miss
// =========================================================================

pub fn read_output(fx: &Fixture, rel: &str) -> String {
    std::fs::read_to_string(fx.output.join(rel))
        .unwrap_or_else(|e| panic!("output file '{rel}' unreadable: {e}"))
}

pub fn read_source(fx: &Fixture, rel: &str) -> String {
    std::fs::read_to_string(fx.site.join(rel))
        .unwrap_or_else(|e| panic!("source file '{rel}' unreadable: {e}"))
}

/// Find the outcome for a file. Panics if not found.
pub fn find_outcome<'a>(report: &'a BuildReport, path: &str) -> &'a FileOutcome {
    report
        .files
        .iter()
        .find(|f| f.path == path)
        .unwrap_or_else(|| {
            let paths: Vec<&str> = report.files.iter().map(|f| f.path.as_str()).collect();
            panic!("no outcome for '{path}'. Available: {paths:?}")
        })
}
