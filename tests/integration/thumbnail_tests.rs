use nascatalog::cache::PosterRef;
use nascatalog::thumbnail::{ThumbnailError, ThumbnailExtractor};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use tempfile::tempdir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

fn build_zip(path: &Path, entries: &[(&str, &[u8])]) {
    let mut zip = ZipWriter::new(File::create(path).unwrap());
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, data) in entries {
        zip.start_file(*name, options).unwrap();
        zip.write_all(data).unwrap();
    }
    zip.finish().unwrap();
}

fn page(fill: u8, len: usize) -> Vec<u8> {
    vec![fill; len]
}

#[test]
fn test_archive_cover_is_largest_in_window() {
    let lib = tempdir().unwrap();
    fs::create_dir(lib.path().join("S")).unwrap();
    let (p1, p2, p3, p4, p5) = (page(1, 10), page(2, 10), page(3, 40), page(4, 400), page(5, 40));
    build_zip(
        &lib.path().join("S/Vol 01.cbz"),
        &[
            ("005.jpg", &p5),
            ("001.jpg", &p1),
            ("__MACOSX/._004.jpg", &page(9, 4000)),
            ("003.jpg", &p3),
            ("notes.txt", &page(0, 9000)),
            ("002.jpg", &p2),
            ("004.jpg", &p4),
        ],
    );

    let extractor = ThumbnailExtractor::new(lib.path(), None);
    let thumb = extractor
        .extract(&PosterRef::ArchiveEntry("S/Vol 01.cbz".into()))
        .unwrap();
    assert_eq!(thumb.bytes, p4);
    assert_eq!(thumb.mime, "image/jpeg");
}

#[test]
fn test_archive_pages_listed_and_read() {
    let lib = tempdir().unwrap();
    build_zip(
        &lib.path().join("ch.zip"),
        &[("b/02.png", b"two"), ("b/01.png", b"one"), (".hidden.png", b"no")],
    );

    let extractor = ThumbnailExtractor::new(lib.path(), None);
    let pages = extractor.list_pages("ch.zip").unwrap();
    assert_eq!(pages, vec!["b/01.png", "b/02.png"]);
    assert_eq!(extractor.read_page("ch.zip", "b/02.png").unwrap().bytes, b"two");
    assert!(extractor.read_page("ch.zip", "b/03.png").is_err());
}

#[test]
fn test_corrupt_archive_has_no_image() {
    let lib = tempdir().unwrap();
    fs::write(lib.path().join("broken.cbz"), b"definitely not a zip").unwrap();

    let extractor = ThumbnailExtractor::new(lib.path(), None);
    let err = extractor
        .extract(&PosterRef::ArchiveEntry("broken.cbz".into()))
        .unwrap_err();
    assert!(matches!(err, ThumbnailError::NoImage(_)), "{:?}", err);
}

#[cfg(unix)]
#[test]
fn test_unreadable_archive_has_no_image() {
    use std::os::unix::fs::PermissionsExt;

    let lib = tempdir().unwrap();
    let locked = lib.path().join("locked.cbz");
    build_zip(&locked, &[("01.jpg", &page(1, 64))]);
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    if File::open(&locked).is_ok() {
        // Running with privileges that ignore permissions.
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();
        return;
    }

    let extractor = ThumbnailExtractor::new(lib.path(), None);
    let result = extractor.extract(&PosterRef::ArchiveEntry("locked.cbz".into()));
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();

    let err = result.unwrap_err();
    assert!(matches!(err, ThumbnailError::NoImage(_)), "{:?}", err);
}

#[test]
fn test_epub_is_read_as_zip() {
    let lib = tempdir().unwrap();
    build_zip(
        &lib.path().join("book.epub"),
        &[("mimetype", b"application/epub+zip"), ("OEBPS/cover.jpg", b"cover")],
    );

    let extractor = ThumbnailExtractor::new(lib.path(), None);
    let thumb = extractor
        .extract(&PosterRef::ArchiveEntry("book.epub".into()))
        .unwrap();
    assert_eq!(thumb.bytes, b"cover");
}

#[test]
fn test_directory_marker_uses_first_archive() {
    let lib = tempdir().unwrap();
    fs::create_dir(lib.path().join("Series")).unwrap();
    build_zip(&lib.path().join("Series/b.cbz"), &[("1.jpg", b"second")]);
    build_zip(&lib.path().join("Series/a.cbz"), &[("1.jpg", b"first")]);

    let extractor = ThumbnailExtractor::new(lib.path(), None);
    let thumb = extractor
        .extract(&PosterRef::ArchiveEntry("Series".into()))
        .unwrap();
    assert_eq!(thumb.bytes, b"first");
}

#[test]
fn test_disk_cache_serves_after_source_removed() {
    let lib = tempdir().unwrap();
    let cache = tempdir().unwrap();
    build_zip(&lib.path().join("v.cbz"), &[("1.jpg", b"img")]);
    let poster = PosterRef::ArchiveEntry("v.cbz".into());

    let extractor = ThumbnailExtractor::new(lib.path(), Some(cache.path().to_path_buf()));
    assert_eq!(extractor.extract(&poster).unwrap().bytes, b"img");

    fs::remove_file(lib.path().join("v.cbz")).unwrap();
    let again = extractor.extract(&poster).unwrap();
    assert_eq!(again.bytes, b"img");
    assert_eq!(again.mime, "image/jpeg");
}

#[test]
fn test_concurrent_requests_share_one_result() {
    let lib = tempdir().unwrap();
    let cache = tempdir().unwrap();
    build_zip(&lib.path().join("v.cbz"), &[("1.jpg", b"img")]);
    let poster = PosterRef::ArchiveEntry("v.cbz".into());
    let extractor = ThumbnailExtractor::new(lib.path(), Some(cache.path().to_path_buf()));

    std::thread::scope(|s| {
        let handles: Vec<_> = (0..8).map(|_| s.spawn(|| extractor.extract(&poster))).collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap().unwrap().bytes, b"img");
        }
    });

    // One data file and one mime file.
    assert_eq!(fs::read_dir(cache.path()).unwrap().count(), 2);
}

#[test]
fn test_missing_archive_is_not_found() {
    let lib = tempdir().unwrap();
    let extractor = ThumbnailExtractor::new(lib.path(), None);
    assert!(matches!(
        extractor.extract(&PosterRef::ArchiveEntry("gone.cbz".into())),
        Err(ThumbnailError::NotFound(_))
    ));
}
