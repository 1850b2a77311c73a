//! # landing-kit
//!
//! A build tool for static landing-page sites. The site directory is plain
//! HTML, CSS, JS and images; landing-kit turns it into a deployable copy with
//! tracking snippets spliced into pages, stylesheets minified, images
//! converted to WebP and the result zipped for upload.
//!
//! # Pipeline
//!
//! ```text
//! site/  ─► plan (config, snippets, file list) ─► transform ─► dist/ ─► <name>.zip
//! ```
//!
//! What runs is decided by a [`mode::BuildMode`]: development builds keep
//! stylesheets readable, serving builds skip the slow image and packaging
//! stages, and the snippet and privacy-policy switches gate their features.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`matcher`] | Glob-like path patterns (`*`, `?`, `**`) used by snippet rules and privacy patterns |
//! | [`snippets`] | `snippets/config.json` rules, per-page resolution, head/body injection |
//! | [`mode`] | The four build switches and the stage options they imply |
//! | [`pipeline`] | `plan`, `check` and `build`: collect, transform, package |
//! | [`assets`] | Extension classification and CSS minification |
//! | [`cache`] | Content-addressed WebP cache in the temp directory |
//! | [`package`] | Zip the output directory |
//! | [`split`] | Cut tall images into strips and emit `<picture>` markup |
//! | [`imaging`] | Pure-Rust image operations behind the [`imaging::ImageBackend`] trait |
//! | [`config`] | `config.toml` loading, stock defaults, validation |
//! | [`output`] | CLI output formatting |
//!
//! # Snippets
//!
//! A snippet is an HTML fragment in `snippets/` plus an entry in
//! `snippets/config.json`:
//!
//! ```json
//! {
//!   "head-ga": { "applyTo": ["all"], "excludeFrom": ["blog/draft.html"], "priority": 10 },
//!   "body-gtm": { "applyTo": ["**/*.html"], "position": "append" }
//! }
//! ```
//!
//! Names starting with `head-` go into `<head>`, everything else into
//! `<body>`. Within a zone, snippets are applied one at a time in ascending
//! priority, so of two prepends the higher priority ends up first.

pub mod assets;
pub mod cache;
pub mod config;
pub mod imaging;
pub mod matcher;
pub mod mode;
pub mod output;
pub mod package;
pub mod pipeline;
pub mod snippets;
pub mod split;

#[cfg(test)]
pub(crate) mod test_helpers;
