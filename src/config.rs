//! Site configuration module.
//!
//! Handles loading, validating and merging the site's `config.toml`. Stock
//! defaults form the base layer; the user file only needs the keys it wants
//! to change.
//!
//! ## Config File Location
//!
//! ```text
//! site/
//! ├── config.toml          # optional
//! ├── index.html
//! ├── snippets/
//! └── ...
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! [paths]
//! snippets_dir = "snippets"     # snippet fragments + config.json
//!
//! [privacy_policy]
//! patterns = ["privacy-policy*", "css/privacy-policy*"]
//!
//! [images]
//! extensions = ["jpg", "jpeg", "png"]
//! keep_originals = true
//!
//! [package]
//! name = "site"                 # archive written as <name>.zip
//!
//! [split]
//! scale = 2.0
//! split_height = 200
//! overlap = 10
//! media = "(max-width: 750px)"
//!
//! [processing]
//! max_processes = 4             # omit for auto = CPU cores
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Name of the config file in the site root.
pub const CONFIG_FILENAME: &str = "config.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Site configuration loaded from `config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Locations inside the site root.
    pub paths: PathsConfig,
    /// Files dropped when the privacy policy is switched off.
    pub privacy_policy: PrivacyPolicyConfig,
    /// Image conversion settings.
    pub images: ImagesConfig,
    /// Archive settings.
    pub package: PackageConfig,
    /// Defaults for the `split` command.
    pub split: SplitConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl SiteConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.paths.snippets_dir.trim().is_empty() {
            return Err(ConfigError::Validation(
                "paths.snippets_dir must not be empty".into(),
            ));
        }
        if self.package.name.is_empty() || self.package.name.contains(['/', '\\']) {
            return Err(ConfigError::Validation(
                "package.name must be a plain file name".into(),
            ));
        }
        if let Some(ext) = self
            .images
            .extensions
            .iter()
            .find(|e| e.starts_with('.') || e.chars().any(|c| c.is_ascii_uppercase()))
        {
            return Err(ConfigError::Validation(format!(
                "images.extensions entries must be lowercase without a dot, got {ext:?}"
            )));
        }
        if !(self.split.scale > 0.0) {
            return Err(ConfigError::Validation(
                "split.scale must be positive".into(),
            ));
        }
        if self.split.split_height == 0 {
            return Err(ConfigError::Validation(
                "split.split_height must be non-zero".into(),
            ));
        }
        if self.split.overlap >= self.split.split_height {
            return Err(ConfigError::Validation(
                "split.overlap must be smaller than split.split_height".into(),
            ));
        }
        Ok(())
    }
}

/// Locations inside the site root.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    /// Directory holding `<name>.html` fragments and `config.json`.
    pub snippets_dir: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            snippets_dir: "snippets".to_string(),
        }
    }
}

/// Privacy-policy file set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PrivacyPolicyConfig {
    /// Site-relative patterns (same syntax as snippet rules).
    pub patterns: Vec<String>,
}

impl Default for PrivacyPolicyConfig {
    fn default() -> Self {
        Self {
            patterns: vec![
                "privacy-policy*".to_string(),
                "css/privacy-policy*".to_string(),
            ],
        }
    }
}

/// Image conversion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImagesConfig {
    /// Source extensions that get a WebP sibling.
    pub extensions: Vec<String>,
    /// Also copy the unconverted source image.
    pub keep_originals: bool,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            extensions: vec!["jpg".to_string(), "jpeg".to_string(), "png".to_string()],
            keep_originals: true,
        }
    }
}

/// Archive settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PackageConfig {
    /// Archive stem; the zip lands next to the output directory.
    pub name: String,
}

impl Default for PackageConfig {
    fn default() -> Self {
        Self {
            name: "site".to_string(),
        }
    }
}

/// Defaults for the image splitter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SplitConfig {
    /// Resize factor used when no target width is given.
    pub scale: f64,
    /// Nominal height of one slice, in resized pixels.
    pub split_height: u32,
    /// Pixels each slice after the first reaches back into its predecessor.
    pub overlap: u32,
    /// `media` attribute of the mobile `<source>`.
    pub media: String,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            scale: 2.0,
            split_height: 200,
            overlap: 10,
            media: "(max-width: 750px)".to_string(),
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel transform workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(SiteConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// Tables merge key by key; any other overlay value replaces the base value.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `config.toml` from the site root as a raw TOML value.
///
/// Returns `Ok(None)` when the file does not exist.
pub fn load_raw_config(root: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = root.join(CONFIG_FILENAME);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Load the site config: stock defaults, user overrides, validation.
pub fn load_config(root: &Path) -> Result<SiteConfig, ConfigError> {
    let base = stock_defaults_value();
    let merged = match load_raw_config(root)? {
        Some(overlay) => merge_toml(base, overlay),
        None => {
            tracing::debug!("no {} in {}, using defaults", CONFIG_FILENAME, root.display());
            base
        }
    };
    let config: SiteConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Returns a fully-commented stock `config.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# landing-kit configuration
# =========================
# All settings are optional. Values shown are the defaults.
# Unknown keys cause an error.

# ---------------------------------------------------------------------------
# Paths (relative to the site root)
# ---------------------------------------------------------------------------
[paths]
# Snippet fragments (<name>.html) and their rules (config.json).
snippets_dir = "snippets"

# ---------------------------------------------------------------------------
# Privacy policy
# ---------------------------------------------------------------------------
[privacy_policy]
# Files left out of the build when run with --no-privacy-policy.
# Same pattern syntax as snippet rules: exact, "prefix*", or "a*b".
patterns = ["privacy-policy*", "css/privacy-policy*"]

# ---------------------------------------------------------------------------
# Images
# ---------------------------------------------------------------------------
[images]
# Extensions that get a lossless .webp sibling in production builds.
extensions = ["jpg", "jpeg", "png"]

# Copy the original next to the .webp.
keep_originals = true

# ---------------------------------------------------------------------------
# Packaging
# ---------------------------------------------------------------------------
[package]
# The build archive is written next to the output directory as <name>.zip.
name = "site"

# ---------------------------------------------------------------------------
# Image splitter (landing-kit split)
# ---------------------------------------------------------------------------
[split]
# Resize factor when no --width is given.
scale = 2.0

# Nominal slice height in resized pixels.
split_height = 200

# Pixels each slice overlaps the previous one.
overlap = 10

# media attribute of the mobile <source>.
media = "(max-width: 750px)"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel workers. Omit to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
