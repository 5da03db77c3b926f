//! File classification by extension.

use std::path::Path;

/// Image extensions accepted as posters and archive pages.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif", "bmp", "avif"];

/// Archive extensions recognized as chapters.
pub const ARCHIVE_EXTENSIONS: &[&str] = &["zip", "cbz", "rar", "cbr", "pdf", "epub"];

/// Keywords that mark an image as an intended poster.
pub const POSTER_KEYWORDS: &[&str] = &["poster", "cover", "folder", "thumb"];

/// Container format of a recognized archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// zip / cbz
    Zip,
    /// rar / cbr (recognized, not extractable)
    Rar,
    /// pdf
    Pdf,
    /// epub (a zip container)
    Epub,
}

impl ArchiveFormat {
    /// Whether the container can be opened with the zip reader.
    #[must_use]
    pub fn is_zip_container(self) -> bool {
        matches!(self, Self::Zip | Self::Epub)
    }
}

/// Classification of a directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    /// A poster-capable image.
    Image,
    /// A chapter archive or document.
    Archive(ArchiveFormat),
    /// Anything else.
    Other,
}

fn extension_lower(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .and_then(|s| s.to_str())
        .map(str::to_lowercase)
}

/// Classify a file name by its extension.
#[must_use]
pub fn classify(name: &str) -> MediaKind {
    let Some(ext) = extension_lower(name) else {
        return MediaKind::Other;
    };

    match ext.as_str() {
        "zip" | "cbz" => MediaKind::Archive(ArchiveFormat::Zip),
        "rar" | "cbr" => MediaKind::Archive(ArchiveFormat::Rar),
        "pdf" => MediaKind::Archive(ArchiveFormat::Pdf),
        "epub" => MediaKind::Archive(ArchiveFormat::Epub),
        e if IMAGE_EXTENSIONS.contains(&e) => MediaKind::Image,
        _ => MediaKind::Other,
    }
}

/// Whether `name` has an image extension.
#[must_use]
pub fn is_image_name(name: &str) -> bool {
    classify(name) == MediaKind::Image
}

/// Strip one known archive extension from a name.
///
/// `"Vol 01.cbz"` becomes `"Vol 01"`; `"Vol.1"` is left alone.
#[must_use]
pub fn strip_archive_extension(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty() && ARCHIVE_EXTENSIONS.contains(&ext.to_lowercase().as_str()) =>
        {
            stem
        }
        _ => name,
    }
}
