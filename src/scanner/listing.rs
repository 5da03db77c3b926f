//! Single-directory listing.
//!
//! Every component reads directories through [`read_dir_sorted`] so that
//! ordering is by NFC name regardless of OS listing order or on-disk
//! normalization form.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::kind::{classify, MediaKind};
use super::path_utils::{file_name_nfc, fold_name};
use super::ScanError;

/// One immediate child of a directory.
#[derive(Debug, Clone)]
pub struct DirItem {
    /// Real on-disk path.
    pub path: PathBuf,
    /// NFC name.
    pub name: String,
    /// Directory (symlinks followed).
    pub is_dir: bool,
    /// File size in bytes (0 for directories).
    pub size: u64,
}

impl DirItem {
    /// Classification of the item; directories are always [`MediaKind::Other`].
    #[must_use]
    pub fn kind(&self) -> MediaKind {
        if self.is_dir {
            MediaKind::Other
        } else {
            classify(&self.name)
        }
    }

    /// Whether the item is an image file.
    #[must_use]
    pub fn is_image(&self) -> bool {
        self.kind() == MediaKind::Image
    }

    /// Whether the item is a recognized archive file.
    #[must_use]
    pub fn is_archive(&self) -> bool {
        matches!(self.kind(), MediaKind::Archive(_))
    }

    /// Whether the name starts with a dot.
    #[must_use]
    pub fn is_hidden(&self) -> bool {
        self.name.starts_with('.')
    }

    /// Name in comparison form (see [`fold_name`]).
    #[must_use]
    pub fn folded_name(&self) -> String {
        fold_name(&self.name)
    }
}

/// List the immediate children of `dir`, sorted by NFC name.
///
/// Failing to open `dir` itself is an error. Individual children whose
/// metadata cannot be read are skipped with a warning.
pub fn read_dir_sorted(dir: &Path) -> Result<Vec<DirItem>, ScanError> {
    let mut items = Vec::new();

    for result in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
    {
        match result {
            Ok(entry) => {
                let is_dir = entry.file_type().is_dir();
                let size = if is_dir {
                    0
                } else {
                    entry.metadata().map(|m| m.len()).unwrap_or(0)
                };
                items.push(DirItem {
                    name: file_name_nfc(entry.path()),
                    path: entry.into_path(),
                    is_dir,
                    size,
                });
            }
            Err(err) if err.depth() == 0 => {
                return Err(convert_walkdir_error(dir, err));
            }
            Err(err) => {
                log::warn!("Skipping unreadable entry in {}: {}", dir.display(), err);
            }
        }
    }

    items.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(items)
}

fn convert_walkdir_error(dir: &Path, err: walkdir::Error) -> ScanError {
    let path = err.path().map_or_else(|| dir.to_path_buf(), Path::to_path_buf);
    match err.io_error().map(std::io::Error::kind) {
        Some(ErrorKind::PermissionDenied) => ScanError::PermissionDenied(path),
        Some(ErrorKind::NotFound) => ScanError::NotFound(path),
        _ => ScanError::Io {
            source: std::io::Error::other(err.to_string()),
            path,
        },
    }
}
