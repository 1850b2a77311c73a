//! WebP conversion cache for incremental builds.
//!
//! Lossless WebP encoding is the slowest part of a production build. The
//! cache keeps every converted file under `<temp_dir>/webp-cache/` and skips
//! the encoder when neither the source image nor the encoder settings have
//! changed since the last build.
//!
//! ## Cache keys
//!
//! Lookups are content-addressed by `source_hash` + `params_hash`, not by
//! path, so moving or renaming an image does not force a re-encode.
//!
//! - **`source_hash`**: SHA-256 of the source file contents. Content-based
//!   so it survives `git checkout`, which resets modification times.
//! - **`params_hash`**: SHA-256 of the encoder identity. Bump
//!   [`ENCODER_REVISION`] when the encoder output changes.
//!
//! A hit requires a matching entry **and** the cached file still on disk.
//! A hit stored under another path is copied into place inside the cache
//! and reported as a copy rather than a hit.
//!
//! ## Storage
//!
//! `<temp_dir>/webp-cache/manifest.json` maps cache-relative paths to their
//! keys. The temp directory is never cleaned by a build, unlike the output
//! directory.
//!
//! ## Bypassing the cache
//!
//! `--no-cache` starts from an empty manifest, so every image is
//! re-encoded and old cache files are overwritten.

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Cache directory name inside the temp directory.
pub const CACHE_DIRNAME: &str = "webp-cache";

const MANIFEST_FILENAME: &str = "manifest.json";

/// Version of the manifest format. Bump to invalidate existing caches.
const MANIFEST_VERSION: u32 = 1;

/// Revision of the WebP encoder settings, folded into every params hash.
pub const ENCODER_REVISION: u32 = 1;

/// Cache key for one converted file.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct CacheEntry {
    pub source_hash: String,
    pub params_hash: String,
}

/// On-disk manifest: cache-relative path → key.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CacheManifest {
    pub version: u32,
    pub entries: HashMap<String, CacheEntry>,
    /// `"{source_hash}:{params_hash}"` → path. Rebuilt on load, never serialized.
    #[serde(skip)]
    content_index: HashMap<String, String>,
}

fn content_key(source_hash: &str, params_hash: &str) -> String {
    format!("{source_hash}:{params_hash}")
}

impl CacheManifest {
    pub fn empty() -> Self {
        Self {
            version: MANIFEST_VERSION,
            entries: HashMap::new(),
            content_index: HashMap::new(),
        }
    }

    /// Load from `cache_dir`. Missing, corrupt, or outdated manifests load empty.
    pub fn load(cache_dir: &Path) -> Self {
        let Ok(content) = fs::read_to_string(cache_dir.join(MANIFEST_FILENAME)) else {
            return Self::empty();
        };
        let mut manifest: Self = match serde_json::from_str(&content) {
            Ok(m) => m,
            Err(e) => {
                tracing::debug!("discarding unreadable cache manifest: {e}");
                return Self::empty();
            }
        };
        if manifest.version != MANIFEST_VERSION {
            return Self::empty();
        }
        manifest.content_index = manifest
            .entries
            .iter()
            .map(|(path, entry)| {
                (
                    content_key(&entry.source_hash, &entry.params_hash),
                    path.clone(),
                )
            })
            .collect();
        manifest
    }

    pub fn save(&self, cache_dir: &Path) -> io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(cache_dir.join(MANIFEST_FILENAME), json)
    }

    /// Stored path for these hashes, if its file is still in `cache_dir`.
    pub fn find_cached(
        &self,
        source_hash: &str,
        params_hash: &str,
        cache_dir: &Path,
    ) -> Option<String> {
        let stored = self
            .content_index
            .get(&content_key(source_hash, params_hash))?;
        cache_dir.join(stored).exists().then(|| stored.clone())
    }

    /// Record `path` as holding this content, dropping any older path for it.
    pub fn insert(&mut self, path: String, source_hash: String, params_hash: String) {
        let key = content_key(&source_hash, &params_hash);
        if let Some(old) = self.content_index.get(&key)
            && *old != path
        {
            self.entries.remove(old.as_str());
        }
        self.content_index.insert(key, path.clone());
        self.entries.insert(
            path,
            CacheEntry {
                source_hash,
                params_hash,
            },
        );
    }
}

/// SHA-256 hash of a file's contents, returned as a hex string.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let bytes = fs::read(path)?;
    Ok(format!("{:x}", Sha256::digest(&bytes)))
}

/// SHA-256 hash of the WebP encoder settings.
pub fn hash_webp_params(revision: u32) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"webp-lossless\0");
    hasher.update(revision.to_le_bytes());
    format!("{:x}", hasher.finalize())
}

/// How one conversion was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Cached file at the same path.
    Hit,
    /// Cached file found under another path and copied.
    Copied,
    /// Freshly encoded.
    Encoded,
}

/// Summary of cache performance for a build run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u32,
    pub copies: u32,
    pub misses: u32,
}

impl CacheStats {
    pub fn record(&mut self, status: CacheStatus) {
        match status {
            CacheStatus::Hit => self.hits += 1,
            CacheStatus::Copied => self.copies += 1,
            CacheStatus::Encoded => self.misses += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.hits + self.copies + self.misses
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.hits + self.copies, self.copies) {
            (0, _) => write!(f, "{} encoded", self.misses),
            (_, 0) => write!(
                f,
                "{} cached, {} encoded ({} total)",
                self.hits,
                self.misses,
                self.total()
            ),
            _ => write!(
                f,
                "{} cached, {} copied, {} encoded ({} total)",
                self.hits,
                self.copies,
                self.misses,
                self.total()
            ),
        }
    }
}

/// Shared cache handle for one build; safe to use from rayon workers.
pub struct ConversionCache {
    dir: PathBuf,
    params_hash: String,
    manifest: Mutex<CacheManifest>,
    stats: Mutex<CacheStats>,
}

impl ConversionCache {
    /// Open the cache under `temp_dir`, creating it if needed.
    pub fn open(temp_dir: &Path, use_cache: bool) -> io::Result<Self> {
        let dir = temp_dir.join(CACHE_DIRNAME);
        fs::create_dir_all(&dir)?;
        let manifest = if use_cache {
            CacheManifest::load(&dir)
        } else {
            CacheManifest::empty()
        };
        Ok(Self {
            dir,
            params_hash: hash_webp_params(ENCODER_REVISION),
            manifest: Mutex::new(manifest),
            stats: Mutex::new(CacheStats::default()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Produce `dest` from the cache, or by running `convert` on a miss.
    ///
    /// `key_path` is the site-relative output path, which is also where the
    /// file lives inside the cache. `convert` receives the cache path to
    /// write. The manifest lock is not held while encoding.
    pub fn fetch_or_convert<E, F>(
        &self,
        key_path: &str,
        source: &Path,
        dest: &Path,
        convert: F,
    ) -> Result<CacheStatus, E>
    where
        E: From<io::Error>,
        F: FnOnce(&Path) -> Result<(), E>,
    {
        let source_hash = hash_file(source)?;
        let cached = self.lock_manifest().find_cached(
            &source_hash,
            &self.params_hash,
            &self.dir,
        );
        let target = self.dir.join(key_path);

        let status = match cached {
            Some(stored) if stored == key_path => CacheStatus::Hit,
            Some(stored) => {
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::copy(self.dir.join(&stored), &target)?;
                CacheStatus::Copied
            }
            None => {
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent)?;
                }
                convert(&target)?;
                CacheStatus::Encoded
            }
        };

        if status != CacheStatus::Hit {
            self.lock_manifest().insert(
                key_path.to_string(),
                source_hash,
                self.params_hash.clone(),
            );
        }
        fs::copy(&target, dest)?;

        if let Ok(mut stats) = self.stats.lock() {
            stats.record(status);
        }
        Ok(status)
    }

    /// Persist the manifest and return this run's stats.
    pub fn finish(self) -> io::Result<CacheStats> {
        let manifest = self
            .manifest
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        manifest.save(&self.dir)?;
        Ok(self
            .stats
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner()))
    }

    fn lock_manifest(&self) -> std::sync::MutexGuard<'_, CacheManifest> {
        self.manifest
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    // =========================================================================
    // CacheManifest
    // =========================================================================

    #[test]
    fn find_cached_hit() {
        let tmp = TempDir::new().unwrap();
        let mut m = CacheManifest::empty();
        m.insert("img/hero.webp".into(), "src".into(), "prm".into());
        fs::create_dir_all(tmp.path().join("img")).unwrap();
        fs::write(tmp.path().join("img/hero.webp"), "data").unwrap();

        assert_eq!(
            m.find_cached("src", "prm", tmp.path()),
            Some("img/hero.webp".to_string())
        );
        assert_eq!(m.find_cached("other", "prm", tmp.path()), None);
        assert_eq!(m.find_cached("src", "other", tmp.path()), None);
    }

    #[test]
    fn find_cached_miss_when_file_deleted() {
        let tmp = TempDir::new().unwrap();
        let mut m = CacheManifest::empty();
        m.insert("gone.webp".into(), "h".into(), "p".into());
        assert_eq!(m.find_cached("h", "p", tmp.path()), None);
    }

    #[test]
    fn insert_drops_stale_path() {
        let mut m = CacheManifest::empty();
        m.insert("old/a.webp".into(), "s".into(), "p".into());
        m.insert("new/a.webp".into(), "s".into(), "p".into());
        assert!(!m.entries.contains_key("old/a.webp"));
        assert!(m.entries.contains_key("new/a.webp"));
    }

    #[test]
    fn save_load_rebuilds_index() {
        let tmp = TempDir::new().unwrap();
        let mut m = CacheManifest::empty();
        m.insert("x.webp".into(), "s1".into(), "p1".into());
        m.save(tmp.path()).unwrap();
        fs::write(tmp.path().join("x.webp"), "data").unwrap();

        let loaded = CacheManifest::load(tmp.path());
        assert_eq!(loaded.entries.len(), 1);
        assert_eq!(
            loaded.find_cached("s1", "p1", tmp.path()),
            Some("x.webp".to_string())
        );
    }

    #[test]
    fn load_corrupt_or_outdated_returns_empty() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(MANIFEST_FILENAME), "not json").unwrap();
        assert!(CacheManifest::load(tmp.path()).entries.is_empty());

        let json = format!(
            r#"{{"version": {}, "entries": {{"a": {{"source_hash":"h","params_hash":"p"}}}}}}"#,
            MANIFEST_VERSION + 1
        );
        fs::write(tmp.path().join(MANIFEST_FILENAME), json).unwrap();
        assert!(CacheManifest::load(tmp.path()).entries.is_empty());
    }

    // =========================================================================
    // Hashes
    // =========================================================================

    #[test]
    fn hash_file_tracks_content() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.png");
        fs::write(&path, b"one").unwrap();
        let h1 = hash_file(&path).unwrap();
        assert_eq!(h1.len(), 64);
        assert_eq!(h1, hash_file(&path).unwrap());
        fs::write(&path, b"two").unwrap();
        assert_ne!(h1, hash_file(&path).unwrap());
    }

    #[test]
    fn params_hash_follows_revision() {
        assert_eq!(hash_webp_params(1), hash_webp_params(1));
        assert_ne!(hash_webp_params(1), hash_webp_params(2));
    }

    // =========================================================================
    // ConversionCache
    // =========================================================================

    fn fake_convert(calls: &Mutex<u32>) -> impl FnOnce(&Path) -> Result<(), io::Error> + '_ {
        move |out: &Path| {
            *calls.lock().unwrap() += 1;
            fs::write(out, b"webp")
        }
    }

    #[test]
    fn second_run_is_a_hit() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("hero.png");
        fs::write(&source, b"pixels").unwrap();
        let dest = tmp.path().join("hero.webp");
        let temp_dir = tmp.path().join("temp");
        let calls = Mutex::new(0);

        let cache = ConversionCache::open(&temp_dir, true).unwrap();
        let status = cache
            .fetch_or_convert("hero.webp", &source, &dest, fake_convert(&calls))
            .unwrap();
        assert_eq!(status, CacheStatus::Encoded);
        assert_eq!(cache.finish().unwrap().misses, 1);

        fs::remove_file(&dest).unwrap();
        let cache = ConversionCache::open(&temp_dir, true).unwrap();
        let status = cache
            .fetch_or_convert("hero.webp", &source, &dest, fake_convert(&calls))
            .unwrap();
        assert_eq!(status, CacheStatus::Hit);
        assert_eq!(*calls.lock().unwrap(), 1);
        assert_eq!(fs::read(&dest).unwrap(), b"webp");
    }

    #[test]
    fn moved_source_is_copied() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("a.png");
        fs::write(&source, b"pixels").unwrap();
        let temp_dir = tmp.path().join("temp");
        let calls = Mutex::new(0);

        let cache = ConversionCache::open(&temp_dir, true).unwrap();
        cache
            .fetch_or_convert("a.webp", &source, &tmp.path().join("a.webp"), fake_convert(&calls))
            .unwrap();
        let status = cache
            .fetch_or_convert(
                "img/b.webp",
                &source,
                &tmp.path().join("b.webp"),
                fake_convert(&calls),
            )
            .unwrap();

        assert_eq!(status, CacheStatus::Copied);
        assert_eq!(*calls.lock().unwrap(), 1);
        assert!(cache.dir().join("img/b.webp").exists());
    }

    #[test]
    fn no_cache_always_encodes() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("a.png");
        fs::write(&source, b"pixels").unwrap();
        let dest = tmp.path().join("a.webp");
        let temp_dir = tmp.path().join("temp");
        let calls = Mutex::new(0);

        let cache = ConversionCache::open(&temp_dir, true).unwrap();
        cache
            .fetch_or_convert("a.webp", &source, &dest, fake_convert(&calls))
            .unwrap();
        cache.finish().unwrap();

        let cache = ConversionCache::open(&temp_dir, false).unwrap();
        let status = cache
            .fetch_or_convert("a.webp", &source, &dest, fake_convert(&calls))
            .unwrap();
        assert_eq!(status, CacheStatus::Encoded);
        assert_eq!(*calls.lock().unwrap(), 2);
    }

    #[test]
    fn failed_conversion_is_not_recorded() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("a.png");
        fs::write(&source, b"pixels").unwrap();
        let cache = ConversionCache::open(&tmp.path().join("temp"), true).unwrap();

        let result: Result<CacheStatus, io::Error> =
            cache.fetch_or_convert("a.webp", &source, &tmp.path().join("a.webp"), |_| {
                Err(io::Error::other("boom"))
            });
        assert!(result.is_err());

        let stats = cache.finish().unwrap();
        assert_eq!(stats.total(), 0);
    }

    // =========================================================================
    // CacheStats
    // =========================================================================

    #[test]
    fn cache_stats_display() {
        let mut s = CacheStats::default();
        s.record(CacheStatus::Encoded);
        assert_eq!(s.to_string(), "1 encoded");
        s.record(CacheStatus::Hit);
        assert_eq!(s.to_string(), "1 cached, 1 encoded (2 total)");
        s.record(CacheStatus::Copied);
        assert_eq!(s.to_string(), "1 cached, 1 copied, 1 encoded (3 total)");
    }
}
