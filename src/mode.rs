//! Build mode: the four switches that decide which pipeline stages run.
//!
//! | Switch | CLI | Effect |
//! |---|---|---|
//! | `development` | `build --dev` / `dev` | no minification, source-map trailers |
//! | `serving` | `dev` | skip image conversion and packaging |
//! | `insert_snippets` | `--no-snippets` turns off | snippet evaluation at all |
//! | `privacy_policy` | `--no-privacy-policy` turns off | privacy-policy files in the output |
//!
//! The switches are independent; all sixteen combinations are valid. A
//! [`BuildMode`] is assembled once from CLI flags through its setters and
//! then handed to every stage by shared reference.

use crate::matcher::matches_any;

/// Build-mode switches for one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildMode {
    development: bool,
    serving: bool,
    insert_snippets: bool,
    privacy_policy: bool,
}

impl Default for BuildMode {
    /// Production batch build with snippets and privacy policy enabled.
    fn default() -> Self {
        Self {
            development: false,
            serving: false,
            insert_snippets: true,
            privacy_policy: true,
        }
    }
}

/// Processing options derived from a [`BuildMode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageOptions {
    pub minify: bool,
    pub source_maps: bool,
    pub convert_images: bool,
    pub package: bool,
}

impl BuildMode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_development_mode(&mut self, on: bool) -> &mut Self {
        self.development = on;
        self
    }

    pub fn set_serving_mode(&mut self, on: bool) -> &mut Self {
        self.serving = on;
        self
    }

    pub fn set_snippets_mode(&mut self, on: bool) -> &mut Self {
        self.insert_snippets = on;
        self
    }

    pub fn set_privacy_policy_mode(&mut self, on: bool) -> &mut Self {
        self.privacy_policy = on;
        self
    }

    pub fn is_development(&self) -> bool {
        self.development
    }

    pub fn is_serving(&self) -> bool {
        self.serving
    }

    pub fn insert_snippets(&self) -> bool {
        self.insert_snippets
    }

    pub fn build_privacy_policy(&self) -> bool {
        self.privacy_policy
    }

    /// Pick the development or production variant of an option.
    pub fn select<T>(&self, dev: T, prod: T) -> T {
        if self.development { dev } else { prod }
    }

    pub fn stage_options(&self) -> StageOptions {
        StageOptions {
            minify: self.select(false, true),
            source_maps: self.select(true, false),
            // Serving is for fast iteration; conversion is the slow stage.
            convert_images: !self.serving,
            package: !self.serving,
        }
    }

    /// Does `path` belong in the output, given the privacy-policy switch?
    pub fn includes<S: AsRef<str>>(&self, path: &str, privacy_patterns: &[S]) -> bool {
        self.privacy_policy || !matches_any(path, privacy_patterns)
    }

    /// Short human label, e.g. `production`, `development+serving`.
    pub fn label(&self) -> String {
        let mut label = self.select("development", "production").to_string();
        if self.serving {
            label.push_str("+serving");
        }
        label
    }
}
