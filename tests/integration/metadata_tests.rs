use nascatalog::cache::PosterRef;
use nascatalog::metadata::MetadataResolver;
use nascatalog::scanner::NameFilter;
use std::fs;
use tempfile::tempdir;

#[test]
fn test_series_json_sidecar() {
    let dir = tempdir().unwrap();
    let series = dir.path().join("Webtoon/Lore");
    fs::create_dir_all(&series).unwrap();
    fs::write(
        series.join("series.json"),
        r#"{
            "content": {
                "title": "Lore Olympus",
                "synopsis": "Myths, retold.",
                "status": "COMPLETED",
                "authors": [
                    {"name": "Rachel Smythe", "type": "AUTHOR"},
                    {"name": "Webtoon", "type": "PUBLISHER"}
                ],
                "seoKeywords": ["romance", "fantasy"]
            },
            "thumbnail": "https://cdn.example.com/lore.jpg"
        }"#,
    )
    .unwrap();

    let resolver = MetadataResolver::default();
    let resolved = resolver.resolve(&series, "Webtoon/Lore").unwrap();
    assert_eq!(resolved.title, "Lore Olympus");
    assert_eq!(resolved.metadata.summary, "Myths, retold.");
    assert_eq!(resolved.metadata.writers, vec!["Rachel Smythe".to_string()]);
    assert_eq!(resolved.metadata.publisher, "Webtoon");
    assert_eq!(resolved.metadata.genres, vec!["romance".to_string(), "fantasy".to_string()]);
    assert!(matches!(resolved.poster, Some(PosterRef::ExternalUrl(_))));
}

#[test]
fn test_yaml_meta_section_with_relative_poster() {
    let dir = tempdir().unwrap();
    let series = dir.path().join("Vinland");
    fs::create_dir_all(&series).unwrap();
    fs::write(series.join("art.png"), b"png").unwrap();
    fs::write(series.join("series.yaml"), "meta:\n  title: Vinland Saga\n  poster: art.png\n").unwrap();

    let resolved = MetadataResolver::default().resolve(&series, "Vinland").unwrap();
    assert_eq!(resolved.title, "Vinland Saga");
    assert_eq!(resolved.poster, Some(PosterRef::LocalFile("Vinland/art.png".into())));
}

#[test]
fn test_poster_found_in_first_chapter() {
    let dir = tempdir().unwrap();
    let series = dir.path().join("Solo");
    fs::create_dir_all(series.join("ep001")).unwrap();
    fs::create_dir_all(series.join("ep002")).unwrap();
    fs::write(series.join("ep001/01.jpg"), b"a").unwrap();
    fs::write(series.join("ep002/01.jpg"), b"b").unwrap();

    let resolved = MetadataResolver::default().resolve(&series, "Solo").unwrap();
    assert_eq!(resolved.poster, Some(PosterRef::LocalFile("Solo/ep001/01.jpg".into())));
}

#[test]
fn test_excluded_folders_not_searched() {
    let dir = tempdir().unwrap();
    let series = dir.path().join("S");
    fs::create_dir_all(series.join("@eaDir")).unwrap();
    fs::write(series.join("@eaDir/SYNOFILE_THUMB_XL.jpg"), b"x").unwrap();

    let filter = NameFilter::new(["@eaDir"], true);
    let resolver = MetadataResolver::new(3, filter);
    let resolved = resolver.resolve(&series, "S").unwrap();
    assert_eq!(resolved.title, "S");
    assert!(resolved.poster.is_none());
}

#[test]
fn test_archive_title_strips_extension() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("Vol 03.cbz");
    fs::write(&file, b"").unwrap();

    let resolved = MetadataResolver::resolve_file(&file, "M/Vol 03.cbz");
    assert_eq!(resolved.title, "Vol 03");
    assert_eq!(resolved.poster, Some(PosterRef::ArchiveEntry("M/Vol 03.cbz".into())));
}

#[test]
fn test_missing_path_has_no_poster() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("gone");
    // Not a directory, so resolved as a plain file with no poster.
    let resolved = MetadataResolver::default().resolve(&missing, "gone").unwrap();
    assert!(resolved.poster.is_none());
}
