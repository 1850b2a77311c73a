//! Build pipeline: source site → output directory (+ archive).
//!
//! ```text
//! load config ─► collect files ─► clean output ─► transform (rayon) ─► package
//! ```
//!
//! ## Stages
//!
//! 1. **Load**: `config.toml` from the site root; snippet rules only when
//!    the build mode inserts snippets.
//! 2. **Collect**: every file under the source, as `/`-separated relative
//!    paths, except `config.toml`, the snippets directory, hidden entries,
//!    and the output/temp directories when they sit inside the source.
//!    Privacy-policy files are dropped here when the mode excludes them.
//! 3. **Clean**: the output directory is removed and recreated.
//! 4. **Transform**: per file by [`AssetKind`], in parallel. See
//!    [`transform_file`] for the table.
//! 5. **Package**: zip the output next to it, unless serving.
//!
//! Progress is reported through an optional `mpsc` channel so the CLI can
//! print while workers run; the returned [`BuildReport`] carries the same
//! information for callers that don't listen.

use crate::assets::{self, AssetKind};
use crate::cache::{CacheStats, CacheStatus, ConversionCache};
use crate::config::{self, ConfigError, SiteConfig};
use crate::imaging::{BackendError, ImageBackend, RustBackend, convert_to_webp};
use crate::mode::{BuildMode, StageOptions};
use crate::package::{self, PackageError, PackageSummary};
use crate::snippets::{self, Insertions, SnippetRule};
use rayon::prelude::*;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Image conversion failed: {0}")]
    Imaging(#[from] BackendError),
    #[error("Packaging failed: {0}")]
    Package(#[from] PackageError),
    #[error("Source directory not found: {0}")]
    SourceNotFound(PathBuf),
    #[error("Output directory {0} would overwrite the source")]
    OutputOverlapsSource(PathBuf),
}

/// A collected source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Site-relative, `/`-separated.
    pub path: String,
    pub kind: AssetKind,
}

/// Everything decided before any file is written.
#[derive(Debug, Clone)]
pub struct BuildPlan {
    pub source: PathBuf,
    pub config: SiteConfig,
    pub rules: Vec<SnippetRule>,
    pub files: Vec<SourceFile>,
    /// Files left out by the privacy-policy switch.
    pub excluded: Vec<String>,
}

impl BuildPlan {
    pub fn snippets_dir(&self) -> PathBuf {
        self.source.join(&self.config.paths.snippets_dir)
    }
}

/// What happened to one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Copied,
    Injected { head: usize, body: usize },
    Minified { before: usize, after: usize },
    Converted {
        webp: String,
        status: CacheStatus,
        kept_original: bool,
    },
    Skipped(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOutcome {
    pub path: String,
    pub kind: AssetKind,
    pub action: Action,
}

/// Progress events, sent in completion order.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    Started {
        mode: BuildMode,
        files: usize,
        excluded: usize,
        snippets: usize,
    },
    File(FileOutcome),
    Packaged(PackageSummary),
}

#[derive(Debug, Clone)]
pub struct BuildReport {
    pub mode: BuildMode,
    pub options: StageOptions,
    /// In source order, not completion order.
    pub files: Vec<FileOutcome>,
    pub excluded: Vec<String>,
    pub snippets: usize,
    pub cache: CacheStats,
    pub archive: Option<PackageSummary>,
}

/// Snippet resolution for one page, as reported by `check`.
#[derive(Debug, Clone)]
pub struct PageSnippets {
    pub path: String,
    pub insertions: Insertions,
}

#[derive(Debug, Clone)]
pub struct CheckReport {
    pub mode: BuildMode,
    pub files: Vec<SourceFile>,
    pub excluded: Vec<String>,
    pub pages: Vec<PageSnippets>,
    /// `.html` fragments without a rule.
    pub unconfigured: Vec<String>,
    /// Rules whose fragment could not be loaded.
    pub missing: Vec<String>,
}

fn relative_slash_path(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Relative location of `inner` under `root`, if it is inside it.
fn nested_under(inner: &Path, root: &Path) -> Option<String> {
    let inner = resolve_path(inner).ok()?;
    let root = resolve_path(root).ok()?;
    inner
        .strip_prefix(&root)
        .ok()
        .filter(|rel| !rel.as_os_str().is_empty())
        .map(|rel| relative_slash_path(rel, Path::new("")))
}

/// Load config and snippets and collect the files to build.
pub fn plan(
    source: &Path,
    output: &Path,
    temp_dir: &Path,
    mode: &BuildMode,
) -> Result<BuildPlan, BuildError> {
    if !source.is_dir() {
        return Err(BuildError::SourceNotFound(source.to_path_buf()));
    }
    let config = config::load_config(source)?;
    let snippets_dir = source.join(&config.paths.snippets_dir);
    let rules = if mode.insert_snippets() {
        snippets::load_snippets(&snippets_dir)
    } else {
        Vec::new()
    };

    let mut skip_dirs: Vec<String> = [output, temp_dir]
        .iter()
        .filter_map(|d| nested_under(d, source))
        .collect();
    skip_dirs.push(relative_slash_path(&snippets_dir, source));

    let mut files = Vec::new();
    let mut excluded = Vec::new();
    let walker = WalkDir::new(source)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            if e.depth() == 0 {
                return true;
            }
            let hidden = e.file_name().to_string_lossy().starts_with('.');
            !hidden && !skip_dirs.contains(&relative_slash_path(e.path(), source))
        });

    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = relative_slash_path(entry.path(), source);
        if path == config::CONFIG_FILENAME {
            continue;
        }
        if !mode.includes(&path, &config.privacy_policy.patterns) {
            tracing::debug!("excluded {path} (privacy policy off)");
            excluded.push(path);
            continue;
        }
        let kind = assets::classify(&path, &config.images.extensions);
        files.push(SourceFile { path, kind });
    }

    Ok(BuildPlan {
        source: source.to_path_buf(),
        config,
        rules,
        files,
        excluded,
    })
}

/// Resolve snippets for every page without writing anything.
pub fn check(
    source: &Path,
    output: &Path,
    temp_dir: &Path,
    mode: &BuildMode,
) -> Result<CheckReport, BuildError> {
    let plan = plan(source, output, temp_dir, mode)?;
    let snippet_config = snippets::load_snippet_config(&plan.snippets_dir());

    let pages = plan
        .files
        .iter()
        .filter(|f| f.kind == AssetKind::Html)
        .map(|f| PageSnippets {
            path: f.path.clone(),
            insertions: snippets::resolve_insertions(&plan.rules, &f.path),
        })
        .collect();

    let missing = if mode.insert_snippets() {
        snippet_config
            .keys()
            .filter(|name| !plan.rules.iter().any(|r| &r.name == *name))
            .cloned()
            .collect()
    } else {
        Vec::new()
    };

    Ok(CheckReport {
        mode: *mode,
        unconfigured: snippets::unconfigured_snippets(&plan.snippets_dir(), &snippet_config),
        missing,
        pages,
        files: plan.files,
        excluded: plan.excluded,
    })
}

/// Run the full build with the production image backend.
pub fn build(
    source: &Path,
    output: &Path,
    temp_dir: &Path,
    mode: &BuildMode,
    use_cache: bool,
    events: Option<Sender<PipelineEvent>>,
) -> Result<BuildReport, BuildError> {
    build_with_backend(
        &RustBackend::new(),
        source,
        output,
        temp_dir,
        mode,
        use_cache,
        events,
    )
}

/// Run the full build using a specific backend (allows testing with mock).
pub fn build_with_backend(
    backend: &impl ImageBackend,
    source: &Path,
    output: &Path,
    temp_dir: &Path,
    mode: &BuildMode,
    use_cache: bool,
    events: Option<Sender<PipelineEvent>>,
) -> Result<BuildReport, BuildError> {
    let plan = plan(source, output, temp_dir, mode)?;
    let options = mode.stage_options();
    let emit = |event: PipelineEvent| {
        if let Some(tx) = &events {
            let _ = tx.send(event);
        }
    };

    emit(PipelineEvent::Started {
        mode: *mode,
        files: plan.files.len(),
        excluded: plan.excluded.len(),
        snippets: plan.rules.len(),
    });

    clean_output(source, output)?;

    let cache = if options.convert_images {
        Some(ConversionCache::open(temp_dir, use_cache)?)
    } else {
        None
    };

    let files = plan
        .files
        .par_iter()
        .map(|file| {
            let outcome = transform_file(backend, &plan, file, output, &options, cache.as_ref())?;
            emit(PipelineEvent::File(outcome.clone()));
            Ok(outcome)
        })
        .collect::<Result<Vec<_>, BuildError>>()?;

    let cache = match cache {
        Some(c) => c.finish()?,
        None => CacheStats::default(),
    };

    let archive = if options.package {
        let path = package::archive_path(output, &plan.config.package.name);
        let summary = package::create_archive(output, &path)?;
        emit(PipelineEvent::Packaged(summary.clone()));
        Some(summary)
    } else {
        None
    };

    Ok(BuildReport {
        mode: *mode,
        options,
        files,
        excluded: plan.excluded,
        snippets: plan.rules.len(),
        cache,
        archive,
    })
}

/// Resolve `path` through symlinks and `..`, even if it does not exist yet.
///
/// The nearest existing ancestor is canonicalized and the missing tail is
/// appended with `.` and `..` folded lexically.
fn resolve_path(path: &Path) -> io::Result<PathBuf> {
    let absolute = std::path::absolute(path)?;
    let mut base = absolute.as_path();
    let mut tail = Vec::new();
    let mut resolved = loop {
        if let Ok(p) = base.canonicalize() {
            break p;
        }
        match (base.components().next_back(), base.parent()) {
            (Some(last), Some(parent)) => {
                tail.push(last);
                base = parent;
            }
            _ => break base.to_path_buf(),
        }
    };
    for part in tail.into_iter().rev() {
        match part {
            Component::ParentDir => {
                resolved.pop();
            }
            Component::Normal(name) => resolved.push(name),
            _ => {}
        }
    }
    Ok(resolved)
}

/// Remove and recreate `output`, refusing to touch the source tree.
fn clean_output(source: &Path, output: &Path) -> Result<(), BuildError> {
    let src = resolve_path(source)?;
    let out = resolve_path(output)?;
    if src.starts_with(&out) {
        return Err(BuildError::OutputOverlapsSource(output.to_path_buf()));
    }
    if output.exists() {
        fs::remove_dir_all(output)?;
    }
    fs::create_dir_all(output)?;
    Ok(())
}

/// Read a text asset; `None` when it is not UTF-8 and must pass through as is.
fn read_text(path: &Path, rel: &str) -> Result<Option<String>, BuildError> {
    match String::from_utf8(fs::read(path)?) {
        Ok(text) => Ok(Some(text)),
        Err(_) => {
            tracing::warn!("{rel} is not UTF-8, copied unchanged");
            Ok(None)
        }
    }
}

fn copy_file(from: &Path, to: &Path) -> Result<Action, BuildError> {
    fs::copy(from, to)?;
    Ok(Action::Copied)
}

/// Produce one output file.
///
/// | Kind | Action |
/// |---|---|
/// | `Html` | snippets spliced in when any apply, otherwise copied |
/// | `Style` | minified in production; `sourceURL` trailer in development |
/// | `StyleSource` | skipped |
/// | `Script`, `Other` | copied |
/// | `Image` | WebP sibling when converting; original kept per config |
///
/// Pages and stylesheets that are not UTF-8 are copied unchanged.
fn transform_file(
    backend: &impl ImageBackend,
    plan: &BuildPlan,
    file: &SourceFile,
    output: &Path,
    options: &StageOptions,
    cache: Option<&ConversionCache>,
) -> Result<FileOutcome, BuildError> {
    let src = plan.source.join(&file.path);
    let dest = output.join(&file.path);
    if file.kind != AssetKind::StyleSource
        && let Some(parent) = dest.parent()
    {
        fs::create_dir_all(parent)?;
    }

    let action = match file.kind {
        AssetKind::Html => {
            let insertions = snippets::resolve_insertions(&plan.rules, &file.path);
            if insertions.is_empty() {
                copy_file(&src, &dest)?
            } else {
                match read_text(&src, &file.path)? {
                    Some(page) => {
                        fs::write(&dest, snippets::inject(&page, &insertions))?;
                        Action::Injected {
                            head: insertions.head.len(),
                            body: insertions.body.len(),
                        }
                    }
                    None => copy_file(&src, &dest)?,
                }
            }
        }
        AssetKind::Style => {
            let Some(css) = read_text(&src, &file.path)? else {
                return Ok(FileOutcome {
                    path: file.path.clone(),
                    kind: file.kind,
                    action: copy_file(&src, &dest)?,
                });
            };
            let mut body = if options.minify {
                assets::minify_css(&css)
            } else {
                css.clone()
            };
            if options.source_maps {
                body.push_str(&assets::source_url_trailer(&file.path));
            }
            fs::write(&dest, &body)?;
            if options.minify {
                Action::Minified {
                    before: css.len(),
                    after: body.len(),
                }
            } else {
                Action::Copied
            }
        }
        AssetKind::StyleSource => {
            tracing::warn!("{} needs a Sass compiler, skipped", file.path);
            Action::Skipped("needs a Sass compiler")
        }
        AssetKind::Image => match cache {
            Some(cache) => {
                let webp = assets::webp_path(&file.path);
                let status =
                    cache.fetch_or_convert(&webp, &src, &output.join(&webp), |out| {
                        convert_to_webp(backend, &src, out).map_err(BuildError::from)
                    })?;
                let kept_original = plan.config.images.keep_originals;
                if kept_original {
                    fs::copy(&src, &dest)?;
                }
                Action::Converted {
                    webp,
                    status,
                    kept_original,
                }
            }
            None => copy_file(&src, &dest)?,
        },
        AssetKind::Script | AssetKind::Other => copy_file(&src, &dest)?,
    };

    Ok(FileOutcome {
        path: file.path.clone(),
        kind: file.kind,
        action,
    })
}
