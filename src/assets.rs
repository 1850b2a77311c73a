//! Asset classification and the per-file text transforms.
//!
//! Every collected file gets an [`AssetKind`] from its extension; the
//! pipeline dispatches on it. The transforms here are pure string
//! functions so they can be tested without touching the filesystem.

/// How a source file is handled by the transform stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    /// `.html` / `.htm`: snippet injection.
    Html,
    /// `.css`: minified in production.
    Style,
    /// `.scss` / `.sass`: needs an external compiler, skipped.
    StyleSource,
    /// `.js` / `.mjs`: copied.
    Script,
    /// One of the configured image extensions.
    Image,
    Other,
}

impl AssetKind {
    pub fn label(self) -> &'static str {
        match self {
            AssetKind::Html => "html",
            AssetKind::Style => "css",
            AssetKind::StyleSource => "scss",
            AssetKind::Script => "js",
            AssetKind::Image => "image",
            AssetKind::Other => "file",
        }
    }
}

/// Classify a site-relative path. Extensions compare case-insensitively.
pub fn classify<S: AsRef<str>>(path: &str, image_extensions: &[S]) -> AssetKind {
    let ext = match path.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.contains('/') => ext.to_ascii_lowercase(),
        _ => return AssetKind::Other,
    };
    match ext.as_str() {
        "html" | "htm" => AssetKind::Html,
        "css" => AssetKind::Style,
        "scss" | "sass" => AssetKind::StyleSource,
        "js" | "mjs" => AssetKind::Script,
        e if image_extensions.iter().any(|i| i.as_ref() == e) => AssetKind::Image,
        _ => AssetKind::Other,
    }
}

/// Path of the WebP sibling for an image, e.g. `img/hero.png` → `img/hero.webp`.
pub fn webp_path(path: &str) -> String {
    let stem = match path.rsplit_once('.') {
        Some((stem, ext)) if !ext.contains('/') => stem,
        _ => path,
    };
    format!("{stem}.webp")
}

/// Minify a stylesheet.
///
/// Comments are removed, whitespace runs collapse to one space, and spaces
/// next to `{`, `}`, `;` and `,` are dropped. String literals pass through
/// untouched, including any `/*` inside them.
pub fn minify_css(css: &str) -> String {
    let mut out = String::with_capacity(css.len());
    let mut chars = css.chars().peekable();
    let mut pending_space = false;

    let tight = |out: &String| out.is_empty() || out.ends_with(['{', '}', ';', ',']);

    while let Some(c) = chars.next() {
        match c {
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for c in chars.by_ref() {
                    if prev == '*' && c == '/' {
                        break;
                    }
                    prev = c;
                }
                pending_space = true;
            }
            c if c.is_whitespace() => pending_space = true,
            '{' | '}' | ';' | ',' => {
                pending_space = false;
                out.push(c);
            }
            _ => {
                if pending_space && !tight(&out) {
                    out.push(' ');
                }
                pending_space = false;
                out.push(c);
                if c == '"' || c == '\'' {
                    let mut escaped = false;
                    for s in chars.by_ref() {
                        out.push(s);
                        if escaped {
                            escaped = false;
                        } else if s == '\\' {
                            escaped = true;
                        } else if s == c {
                            break;
                        }
                    }
                }
            }
        }
    }
    out
}

/// Trailer that names the source file in browser devtools.
pub fn source_url_trailer(path: &str) -> String {
    format!("\n/*# sourceURL={path} */\n")
}
