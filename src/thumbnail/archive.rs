//! Zip-container archives (`zip`, `cbz`, `epub`).

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use zip::ZipArchive;

use super::{Thumbnail, ThumbnailError};
use crate::scanner::kind::is_image_name;
use crate::scanner::path_utils::normalize_path_str;

/// First image considered by the cover heuristic. The first pages of
/// scanned books are often credits or blank sheets.
const WINDOW_START: usize = 2;

/// One past the last image considered by the cover heuristic.
const WINDOW_END: usize = 10;

/// An image stored inside an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveImage {
    /// Entry name inside the archive (NFC).
    pub name: String,
    /// Raw entry name as stored, used for lookups.
    raw_name: String,
    /// Uncompressed size.
    pub size: u64,
}

/// Choose the cover among images sorted by name.
///
/// Among images `[2, min(10, len))` the largest uncompressed one wins,
/// the earliest on ties. With two or fewer images the first one is used.
#[must_use]
pub fn pick_cover_index(sizes: &[u64]) -> Option<usize> {
    if sizes.is_empty() {
        return None;
    }
    if sizes.len() <= WINDOW_START {
        return Some(0);
    }
    let end = sizes.len().min(WINDOW_END);
    let mut best = WINDOW_START;
    for i in WINDOW_START + 1..end {
        if sizes[i] > sizes[best] {
            best = i;
        }
    }
    Some(best)
}

fn open(path: &Path) -> Result<ZipArchive<BufReader<File>>, ThumbnailError> {
    let file = File::open(path).map_err(|source| ThumbnailError::io(path, source))?;
    ZipArchive::new(BufReader::new(file)).map_err(|e| ThumbnailError::Archive {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

fn list_images<R: Read + std::io::Seek>(archive: &mut ZipArchive<R>) -> Vec<ArchiveImage> {
    let mut images = Vec::new();
    for i in 0..archive.len() {
        let Ok(entry) = archive.by_index_raw(i) else {
            continue;
        };
        if entry.is_dir() {
            continue;
        }
        let raw_name = entry.name().to_string();
        let name = normalize_path_str(&raw_name);
        let base = name.rsplit('/').next().unwrap_or(&name);
        if base.starts_with('.') || name.starts_with("__MACOSX/") || !is_image_name(base) {
            continue;
        }
        images.push(ArchiveImage {
            name,
            raw_name,
            size: entry.size(),
        });
    }
    images.sort_by(|a, b| a.name.cmp(&b.name));
    images
}

/// Image entries of the archive at `path`, sorted by name.
pub fn image_entries(path: &Path) -> Result<Vec<ArchiveImage>, ThumbnailError> {
    let mut archive = open(path)?;
    Ok(list_images(&mut archive))
}

fn read_raw<R: Read + std::io::Seek>(
    archive: &mut ZipArchive<R>,
    path: &Path,
    image: &ArchiveImage,
) -> Result<Vec<u8>, ThumbnailError> {
    let archive_err = |message: String| ThumbnailError::Archive {
        path: path.to_path_buf(),
        message,
    };
    let mut entry = archive
        .by_name(&image.raw_name)
        .map_err(|e| archive_err(e.to_string()))?;
    let mut bytes = Vec::with_capacity(usize::try_from(image.size).unwrap_or(0));
    entry
        .read_to_end(&mut bytes)
        .map_err(|e| archive_err(e.to_string()))?;
    Ok(bytes)
}

/// Cover image of the archive at `path`.
pub fn extract_cover(path: &Path) -> Result<Thumbnail, ThumbnailError> {
    let mut archive = open(path)?;
    let images = list_images(&mut archive);
    let sizes: Vec<u64> = images.iter().map(|img| img.size).collect();
    let index = pick_cover_index(&sizes).ok_or_else(|| ThumbnailError::NoImage(path.display().to_string()))?;

    let image = &images[index];
    log::debug!("Cover of {} is '{}' ({} bytes)", path.display(), image.name, image.size);
    let bytes = read_raw(&mut archive, path, image)?;
    Ok(Thumbnail::new(bytes, &image.name))
}

/// Read one image entry by name.
pub fn read_entry(path: &Path, name: &str) -> Result<Thumbnail, ThumbnailError> {
    let mut archive = open(path)?;
    let wanted = normalize_path_str(name);
    let image = list_images(&mut archive)
        .into_iter()
        .find(|img| img.name == wanted)
        .ok_or_else(|| ThumbnailError::NotFound(path.join(name)))?;
    let bytes = read_raw(&mut archive, path, &image)?;
    Ok(Thumbnail::new(bytes, &image.name))
}
