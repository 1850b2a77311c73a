//! Packaging: zip the built output directory for upload.
//!
//! Entries are stored with `/`-separated paths relative to the output
//! directory, in file-name order so the archive layout is stable between
//! builds. Directories are implied by their files.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

#[derive(Error, Debug)]
pub enum PackageError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("Archive {0} would be written inside the directory it packages")]
    ArchiveInsideSource(PathBuf),
}

/// A written archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSummary {
    pub path: PathBuf,
    pub files: usize,
    pub bytes: u64,
}

/// Where the archive for `output_dir` goes: `<parent>/<name>.zip`.
pub fn archive_path(output_dir: &Path, name: &str) -> PathBuf {
    let parent = output_dir
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    parent.join(format!("{name}.zip"))
}

/// Zip every file under `dir` into `archive`, replacing any previous archive.
pub fn create_archive(dir: &Path, archive: &Path) -> Result<PackageSummary, PackageError> {
    if let (Ok(dir_abs), Some(parent)) = (dir.canonicalize(), archive.parent()) {
        let parent = if parent.as_os_str().is_empty() {
            Path::new(".")
        } else {
            parent
        };
        if parent
            .canonicalize()
            .is_ok_and(|p| p.starts_with(&dir_abs))
        {
            return Err(PackageError::ArchiveInsideSource(archive.to_path_buf()));
        }
    }

    let mut writer = ZipWriter::new(File::create(archive)?);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut files = 0;

    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry
            .path()
            .strip_prefix(dir)
            .unwrap_or(entry.path())
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        writer.start_file(name, options)?;
        io::copy(&mut File::open(entry.path())?, &mut writer)?;
        files += 1;
    }
    writer.finish()?;

    let bytes = fs::metadata(archive)?.len();
    tracing::debug!("packaged {files} files into {}", archive.display());
    Ok(PackageSummary {
        path: archive.to_path_buf(),
        files,
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;
    use zip::ZipArchive;

    #[test]
    fn archive_sits_next_to_output() {
        assert_eq!(
            archive_path(Path::new("/work/dist"), "site"),
            Path::new("/work/site.zip")
        );
        assert_eq!(archive_path(Path::new("dist"), "lp"), Path::new("./lp.zip"));
    }

    #[test]
    fn zips_nested_files_with_forward_slashes() {
        let tmp = TempDir::new().unwrap();
        let dist = tmp.path().join("dist");
        fs::create_dir_all(dist.join("css")).unwrap();
        fs::write(dist.join("index.html"), "<html></html>").unwrap();
        fs::write(dist.join("css/style.css"), "a{b:c}").unwrap();

        let archive = archive_path(&dist, "site");
        let summary = create_archive(&dist, &archive).unwrap();
        assert_eq!(summary.files, 2);
        assert!(summary.bytes > 0);

        let mut zip = ZipArchive::new(File::open(&archive).unwrap()).unwrap();
        let mut names: Vec<String> = zip.file_names().map(str::to_string).collect();
        names.sort();
        assert_eq!(names, vec!["css/style.css", "index.html"]);

        let mut content = String::new();
        zip.by_name("css/style.css")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "a{b:c}");
    }

    #[test]
    fn rejects_archive_inside_packaged_dir() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.txt"), "x").unwrap();
        let result = create_archive(tmp.path(), &tmp.path().join("self.zip"));
        assert!(matches!(result, Err(PackageError::ArchiveInsideSource(_))));
    }

    #[test]
    fn empty_dir_gives_empty_archive() {
        let tmp = TempDir::new().unwrap();
        let dist = tmp.path().join("dist");
        fs::create_dir_all(&dist).unwrap();
        let summary = create_archive(&dist, &tmp.path().join("out.zip")).unwrap();
        assert_eq!(summary.files, 0);
    }
}
