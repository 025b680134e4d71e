// Input discovery: JPEG files in one directory

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{SheetError, SheetResult};

/// A JPEG on disk. Only read, never modified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceImage {
    pub path: PathBuf,
    pub displayed_filename: String,
}

impl SourceImage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let displayed_filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        SourceImage {
            path,
            displayed_filename,
        }
    }
}

fn is_jpeg(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg"))
        .unwrap_or(false)
}

/// Keep regular JPEG files. An unreadable directory entry fails the whole
/// listing rather than silently shrinking the roll.
fn jpeg_paths(entries: impl Iterator<Item = std::io::Result<PathBuf>>) -> std::io::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in entries {
        let path = entry?;
        if path.is_file() && is_jpeg(&path) {
            paths.push(path);
        }
    }
    Ok(paths)
}

/// List `.jpg`/`.jpeg` files directly inside `dir`, sorted by file name and
/// capped at `limit`. Subdirectories are not searched.
pub fn discover_images(dir: &Path, limit: usize) -> SheetResult<Vec<SourceImage>> {
    let entries = std::fs::read_dir(dir)?.map(|entry| entry.map(|e| e.path()));
    let mut paths = jpeg_paths(entries)?;
    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    if paths.is_empty() {
        return Err(SheetError::EmptyInput {
            dir: Some(dir.to_path_buf()),
        });
    }

    if paths.len() > limit {
        warn!(
            found = paths.len(),
            dropped = paths.len() - limit,
            "more images than grid cells, using the first {}",
            limit
        );
        paths.truncate(limit);
    }

    debug!(count = paths.len(), dir = %dir.display(), "discovered images");
    Ok(paths.into_iter().map(SourceImage::new).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"").unwrap();
    }

    #[test]
    fn test_filters_extensions_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "a.jpg");
        touch(dir.path(), "b.JPEG");
        touch(dir.path(), "c.Jpg");
        touch(dir.path(), "d.png");
        touch(dir.path(), "e.jpg.txt");
        touch(dir.path(), "noext");

        let images = discover_images(dir.path(), 36).unwrap();
        let names: Vec<_> = images.iter().map(|i| i.displayed_filename.as_str()).collect();
        assert_eq!(names, vec!["a.jpg", "b.JPEG", "c.Jpg"]);
    }

    #[test]
    fn test_ignores_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "top.jpg");
        let sub = dir.path().join("nested.jpg");
        fs::create_dir(&sub).unwrap();
        touch(&sub, "inner.jpg");

        let images = discover_images(dir.path(), 36).unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].displayed_filename, "top.jpg");
    }

    #[test]
    fn test_caps_at_limit_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..40 {
            touch(dir.path(), &format!("img_{:02}.jpg", i));
        }

        let images = discover_images(dir.path(), 36).unwrap();
        assert_eq!(images.len(), 36);
        assert_eq!(images[0].displayed_filename, "img_00.jpg");
        assert_eq!(images[35].displayed_filename, "img_35.jpg");
    }

    #[test]
    fn test_empty_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "readme.txt");
        assert!(matches!(
            discover_images(dir.path(), 36),
            Err(SheetError::EmptyInput { .. })
        ));
    }

    #[test]
    fn test_missing_directory_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(discover_images(&missing, 36), Err(SheetError::Io(_))));
    }

    #[test]
    fn test_unreadable_entry_fails_listing() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("a.jpg");
        fs::write(&good, b"").unwrap();
        let entries = vec![
            Ok(good),
            Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "entry unreadable")),
        ];
        let err = jpeg_paths(entries.into_iter()).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::PermissionDenied);
    }
}
