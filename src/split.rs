//! Image splitter: cut a tall landing-page image into strips and emit markup.
//!
//! Layout convention under an `images/` directory:
//!
//! ```text
//! site/images/pc/top/main.jpg   desktop source
//! site/images/sp/top/main.jpg   optional mobile companion (.png also tried)
//! site/images/about/main.png    single-layout source
//! ```
//!
//! The desktop image is resized (by width or scale), its strip count is
//! derived from the resized height, and strips `1..=N` are written next to
//! it. A mobile companion is resized independently and cut into the same
//! number of strips. The returned markup references the strips with paths
//! relative to the page (`./images/...`), as `<picture>` elements when the
//! source is under `pc/` and plain `<img>` elements otherwise. Each element
//! carries `--h` set to half the strip height.

use crate::config::SplitConfig;
use crate::imaging::{
    BackendError, ImageBackend, ResizeTarget, SplitOutput, StripConfig, split_image,
};
use maud::{Markup, PreEscaped, html};
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SplitError {
    #[error("Image not found: {0}")]
    NotFound(PathBuf),
    #[error("{0} is not inside an images/ directory")]
    OutsideImagesDir(PathBuf),
    #[error("Image processing failed: {0}")]
    Backend(#[from] BackendError),
}

const IMAGES_DIR: &str = "images";
const DESKTOP_DIR: &str = "pc";
const MOBILE_DIR: &str = "sp";

/// One `split` invocation. Unset sizes fall back to the `[split]` config.
#[derive(Debug, Clone, Default)]
pub struct SplitRequest {
    pub image: PathBuf,
    pub width: Option<u32>,
    pub scale: Option<f64>,
    pub sp_width: Option<u32>,
    pub sp_scale: Option<f64>,
    pub media: Option<String>,
}

impl SplitRequest {
    fn desktop_target(&self, config: &SplitConfig) -> ResizeTarget {
        resize_target(self.width, self.scale, config.scale)
    }

    fn mobile_target(&self, config: &SplitConfig) -> ResizeTarget {
        resize_target(self.sp_width, self.sp_scale, config.scale)
    }
}

fn resize_target(width: Option<u32>, scale: Option<f64>, default_scale: f64) -> ResizeTarget {
    match width {
        Some(w) => ResizeTarget::Width(w),
        None => ResizeTarget::Scale(scale.unwrap_or(default_scale)),
    }
}

/// What a split produced.
#[derive(Debug, Clone)]
pub struct SplitResult {
    pub source: PathBuf,
    pub desktop: SplitOutput,
    /// Mobile companion path and its strips.
    pub mobile: Option<(PathBuf, SplitOutput)>,
    pub markup: String,
}

impl SplitResult {
    pub fn count(&self) -> usize {
        self.desktop.strips.len()
    }
}

/// Where an image sits relative to `images/`, as needed for markup.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ImageLayout {
    /// Page-relative prefix, e.g. `./images`.
    relative_path: String,
    /// Directories between the layout root and the file, `/`-joined.
    sub_dir: String,
    responsive: bool,
    wrapper_class: Option<String>,
}

fn normal_components(path: &Path) -> Vec<String> {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect()
}

fn image_layout(path: &Path) -> Result<ImageLayout, SplitError> {
    let parts = normal_components(path);
    let dir_end = parts.len().saturating_sub(1);
    let images = parts[..dir_end]
        .iter()
        .position(|p| p == IMAGES_DIR)
        .ok_or_else(|| SplitError::OutsideImagesDir(path.to_path_buf()))?;
    let desktop = parts[images + 1..dir_end]
        .iter()
        .position(|p| p == DESKTOP_DIR)
        .map(|i| images + 1 + i);

    let (base_end, sub_start) = match desktop {
        Some(pc) => (pc, pc + 1),
        None => (images + 1, images + 1),
    };

    // Only directories name the wrapper; `pc` itself is skipped.
    let dirs = &parts[images + 1..dir_end];
    let wrapper_class = match dirs.first().map(String::as_str) {
        Some(DESKTOP_DIR) => dirs.get(1).cloned(),
        other => other.map(str::to_string),
    };

    Ok(ImageLayout {
        relative_path: format!("./{}", parts[images..base_end].join("/")),
        sub_dir: parts[sub_start..dir_end].join("/"),
        responsive: desktop.is_some(),
        wrapper_class,
    })
}

/// Locate the mobile companion of a desktop image.
///
/// The `pc` directory after `images/` is swapped for `sp`; if that file is
/// missing and the source is a `.jpg`, the `.png` sibling is tried.
pub fn find_mobile_image(desktop: &Path) -> Option<PathBuf> {
    let parts: Vec<Component> = desktop.components().collect();
    let images = parts.iter().position(|c| c.as_os_str() == IMAGES_DIR)?;
    let pc = parts[images + 1..]
        .iter()
        .position(|c| c.as_os_str() == DESKTOP_DIR)
        .map(|i| images + 1 + i)?;

    let mobile: PathBuf = parts
        .iter()
        .enumerate()
        .map(|(i, c)| {
            if i == pc {
                Path::new(MOBILE_DIR)
            } else {
                Path::new(c.as_os_str())
            }
        })
        .collect();

    if mobile.exists() {
        return Some(mobile);
    }
    if mobile.extension().is_some_and(|e| e == "jpg") {
        let png = mobile.with_extension("png");
        if png.exists() {
            return Some(png);
        }
    }
    None
}

fn half_height(height: u32) -> String {
    format!("{:.1}", height as f64 / 2.0)
}

fn strip_tag(layout: &ImageLayout, index: u32, height: u32, ext: &str, media: &str) -> Markup {
    let file = format!("{index}.{ext}");
    let style = format!("--h: {};", half_height(height));
    if layout.responsive {
        let in_dir = |dir: &str| {
            [layout.relative_path.as_str(), dir, layout.sub_dir.as_str(), file.as_str()]
                .iter()
                .filter(|s| !s.is_empty())
                .copied()
                .collect::<Vec<_>>()
                .join("/")
        };
        html! {
            picture style=(style) {
                "\n  "
                source srcset=(in_dir(MOBILE_DIR)) media=(media);
                "\n  "
                img src=(in_dir(DESKTOP_DIR)) alt="";
                "\n"
            }
        }
    } else {
        let src = if layout.sub_dir.is_empty() {
            format!("{}/{file}", layout.relative_path)
        } else {
            format!("{}/{}/{file}", layout.relative_path, layout.sub_dir)
        };
        html! { img src=(src) style=(style) alt=""; }
    }
}

fn render_markup(layout: &ImageLayout, heights: &[u32], ext: &str, media: &str) -> String {
    let tags: Vec<String> = heights
        .iter()
        .zip(1..)
        .map(|(&h, i)| strip_tag(layout, i, h, ext, media).into_string())
        .collect();
    let body = tags.join("\n");

    match &layout.wrapper_class {
        Some(class) => html! {
            div class=(class) { "\n" (PreEscaped(body)) "\n" }
        }
        .into_string(),
        None => body,
    }
}

/// Split an image (and its mobile companion) and build the markup.
pub fn split(
    backend: &impl ImageBackend,
    request: &SplitRequest,
    config: &SplitConfig,
) -> Result<SplitResult, SplitError> {
    let source = &request.image;
    if !source.is_file() {
        return Err(SplitError::NotFound(source.clone()));
    }
    let layout = image_layout(source)?;
    let strips = StripConfig {
        split_height: config.split_height,
        overlap: config.overlap,
    };

    let desktop_dir = source.parent().unwrap_or(Path::new("."));
    let desktop = split_image(
        backend,
        source,
        desktop_dir,
        request.desktop_target(config),
        None,
        &strips,
    )?;
    tracing::debug!(
        "{} resized to {}x{}, {} strips",
        source.display(),
        desktop.width,
        desktop.height,
        desktop.strips.len()
    );

    let mobile = match find_mobile_image(source) {
        Some(path) => {
            let dir = path.parent().unwrap_or(Path::new("."));
            let out = split_image(
                backend,
                &path,
                dir,
                request.mobile_target(config),
                Some(desktop.strips.len() as u32),
                &strips,
            )?;
            Some((path, out))
        }
        None => {
            if layout.responsive {
                tracing::info!("no mobile image for {}", source.display());
            }
            None
        }
    };

    let heights: Vec<u32> = desktop.strips.iter().map(|s| s.height).collect();
    let media = request.media.as_deref().unwrap_or(&config.media);
    let markup = render_markup(&layout, &heights, desktop.format.extension(), media);

    Ok(SplitResult {
        source: source.clone(),
        desktop,
        mobile,
        markup,
    })
}
