use nascatalog::cache::{CacheStore, PathHash, PosterRef, MAX_PAGE_SIZE};
use nascatalog::catalog::{Catalog, CatalogError, CatalogSettings};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::{tempdir, TempDir};

fn library() -> TempDir {
    let lib = tempdir().unwrap();
    let root = lib.path();
    fs::create_dir_all(root.join("Manga/Berserk")).unwrap();
    fs::create_dir_all(root.join("Manga/Monster")).unwrap();
    fs::create_dir_all(root.join("Webtoon/Tower/ep1")).unwrap();
    fs::write(root.join("Manga/Berserk/Vol 01.cbz"), b"").unwrap();
    fs::write(root.join("Manga/Berserk/Vol 02.cbz"), b"").unwrap();
    fs::write(root.join("Manga/Monster/cover.jpg"), b"jpg").unwrap();
    fs::write(root.join("Webtoon/Tower/ep1/001.jpg"), b"jpg").unwrap();
    fs::write(
        root.join("Webtoon/Tower/kavita.yaml"),
        "name: Tower of God\nwriter: SIU\nstatus: Ongoing\n",
    )
    .unwrap();
    lib
}

fn open(root: &Path, db: &TempDir) -> Catalog {
    let store = Arc::new(CacheStore::open(&db.path().join("catalog.db")).unwrap());
    let settings = CatalogSettings {
        workers: 4,
        thumb_cache_dir: Some(db.path().join("thumbs")),
        ..CatalogSettings::default()
    };
    Catalog::new(root, store, settings).unwrap()
}

#[test]
fn test_root_listing_scans_on_first_use() {
    let lib = library();
    let db = tempdir().unwrap();
    let catalog = open(lib.path(), &db);

    let listing = catalog.list_children("", 1, None).unwrap();
    let titles: Vec<String> = listing
        .items
        .iter()
        .map(|i| i.metadata.as_ref().unwrap().title.clone())
        .collect();
    assert_eq!(listing.total_items, 3);
    assert_eq!(titles, vec!["Berserk", "Monster", "Tower of God"]);
}

#[test]
fn test_listing_is_served_from_cache_after_scan() {
    let lib = library();
    let db = tempdir().unwrap();
    let catalog = open(lib.path(), &db);

    catalog.trigger_scan("", None).unwrap();
    fs::create_dir_all(lib.path().join("Manga/Added Later")).unwrap();

    let listing = catalog.list_children("Manga", 1, None).unwrap();
    assert_eq!(listing.total_items, 2);

    catalog.trigger_scan("Manga", None).unwrap();
    let listing = catalog.list_children("Manga", 1, None).unwrap();
    assert_eq!(listing.total_items, 3);
}

#[test]
fn test_series_chapters_and_poster_marker() {
    let lib = library();
    let db = tempdir().unwrap();
    let catalog = open(lib.path(), &db);

    let chapters = catalog.list_children("Manga/Berserk", 1, None).unwrap();
    let names: Vec<&str> = chapters.items.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, vec!["Vol 01.cbz", "Vol 02.cbz"]);
    assert!(chapters.items.iter().all(|i| !i.is_directory));

    let details = catalog.entry_metadata("Manga/Berserk").unwrap();
    assert!(details.cached);
    assert_eq!(
        details.poster,
        Some(PosterRef::ArchiveEntry("Manga/Berserk/Vol 01.cbz".into()))
    );
    assert_eq!(details.chapters.len(), 2);
}

#[test]
fn test_sidecar_metadata_reaches_details() {
    let lib = library();
    let db = tempdir().unwrap();
    let catalog = open(lib.path(), &db);
    catalog.trigger_scan("", None).unwrap();

    let details = catalog.entry_metadata("webtoon/tower").unwrap();
    assert_eq!(details.title, "Tower of God");
    assert_eq!(details.metadata.writers, vec!["SIU".to_string()]);
    assert_eq!(details.metadata.status, "Ongoing");
}

#[test]
fn test_search_finds_series_by_title() {
    let lib = library();
    let db = tempdir().unwrap();
    let catalog = open(lib.path(), &db);
    catalog.trigger_scan("", None).unwrap();

    let hits = catalog.search("tower", 1, None).unwrap();
    assert_eq!(hits.total_items, 1);
    assert_eq!(hits.items[0].path, "Webtoon/Tower");

    assert_eq!(catalog.search("nothing like this", 1, None).unwrap().total_items, 0);
}

#[test]
fn test_purge_then_rescan_restores_entries() {
    let lib = library();
    let db = tempdir().unwrap();
    let catalog = open(lib.path(), &db);
    catalog.trigger_scan("", None).unwrap();
    let before = rows(&catalog);
    assert_eq!(before.len() as u64, catalog.stats().unwrap().entries);

    assert_eq!(catalog.purge_by_title("Monster").unwrap(), 1);
    assert_eq!(catalog.stats().unwrap().entries, before.len() as u64 - 1);

    catalog.trigger_scan("", None).unwrap();
    assert_eq!(rows(&catalog), before);
}

type Row = (String, PathHash, PathHash, String, Option<PosterRef>, u32, bool);

// Every cached row below the library root, keyed by relative path.
fn rows(catalog: &Catalog) -> Vec<Row> {
    let store = catalog.store();
    let root = PathHash::of(catalog.root());
    let mut found: Vec<_> = store.get(&root).unwrap().into_iter().collect();
    let mut pending = vec![root];
    while let Some(parent) = pending.pop() {
        for entry in store.query_children(&parent, 1, MAX_PAGE_SIZE).unwrap().items {
            pending.push(entry.path_hash.clone());
            found.push(entry);
        }
    }
    let mut rows: Vec<Row> = found
        .into_iter()
        .map(|e| (e.rel_path, e.path_hash, e.parent_hash, e.title, e.poster, e.depth, e.is_series))
        .collect();
    rows.sort_by(|a, b| a.0.cmp(&b.0));
    rows
}

#[test]
fn test_shallow_series_listed_and_searchable() {
    let lib = tempdir().unwrap();
    let root = lib.path();
    fs::create_dir_all(root.join("OneShots/Extras")).unwrap();
    fs::create_dir_all(root.join("Manga/Berserk")).unwrap();
    fs::write(root.join("OneShots/Story.cbz"), b"").unwrap();
    fs::write(root.join("OneShots/Extras/1.jpg"), b"jpg").unwrap();
    fs::write(root.join("Manga/Berserk/Vol 01.cbz"), b"").unwrap();
    let db = tempdir().unwrap();
    let catalog = open(root, &db);

    let listing = catalog.list_children("", 1, None).unwrap();
    let paths: Vec<&str> = listing.items.iter().map(|i| i.path.as_str()).collect();
    assert_eq!(paths, vec!["Manga/Berserk", "OneShots"]);
    assert!(listing.items.iter().all(|i| i.is_directory));

    let hits = catalog.search("oneshots", 1, None).unwrap();
    assert_eq!(hits.total_items, 1);
    assert_eq!(hits.items[0].path, "OneShots");

    let chapters = catalog.list_children("OneShots", 1, None).unwrap();
    let names: Vec<&str> = chapters.items.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, vec!["Extras", "Story.cbz"]);
}

#[test]
fn test_thumbnail_for_local_poster() {
    let lib = library();
    let db = tempdir().unwrap();
    let catalog = open(lib.path(), &db);

    let details = catalog.entry_metadata("Manga/Monster").unwrap();
    let poster = details.poster.unwrap();
    assert_eq!(poster, PosterRef::LocalFile("Manga/Monster/cover.jpg".into()));

    let thumb = catalog.thumbnail(&poster).unwrap();
    assert_eq!(thumb.bytes, b"jpg");
    assert_eq!(thumb.mime, "image/jpeg");
}

#[test]
fn test_pages_of_image_folder() {
    let lib = library();
    let db = tempdir().unwrap();
    let catalog = open(lib.path(), &db);

    assert_eq!(catalog.list_pages("Webtoon/Tower/ep1").unwrap(), vec!["001.jpg"]);
    let page = catalog.read_page("Webtoon/Tower/ep1", "001.jpg").unwrap();
    assert_eq!(page.bytes, b"jpg");
}

#[test]
fn test_escaping_root_is_rejected() {
    let lib = library();
    let db = tempdir().unwrap();
    let catalog = open(lib.path(), &db);

    for bad in ["..", "Manga/../..", "%2E%2E/etc"] {
        assert!(
            matches!(catalog.list_children(bad, 1, None), Err(CatalogError::InvalidPath(_))),
            "{} accepted",
            bad
        );
    }
}

#[test]
fn test_series_depth_override() {
    let lib = library();
    let db = tempdir().unwrap();
    let catalog = open(lib.path(), &db);

    // Depth 1: every category is a series and nothing below it is scanned.
    let report = catalog.trigger_scan("", Some(1)).unwrap();
    assert_eq!(report.processed, 3);
    assert!(!report.is_partial());
}
