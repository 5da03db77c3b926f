use nascatalog::cache::{CacheStore, CacheWriter, Entry, PathHash, PosterRef};
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;

fn entry(root: &Path, rel: &str, title: &str) -> Entry {
    let depth = rel.split('/').count() as u32;
    let mut e = Entry::new(&root.join(rel), rel, true, depth);
    e.title = title.to_string();
    e
}

#[test]
fn test_cache_survives_reopen() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("catalog.db");
    let root = Path::new("/lib");

    {
        let store = CacheStore::open(&db).unwrap();
        let mut e = entry(root, "Manga/Berserk", "Berserk");
        e.poster = Some(PosterRef::ArchiveEntry("Manga/Berserk/Vol 01.cbz".into()));
        store.upsert(&[e]).unwrap();
    }

    let store = CacheStore::open(&db).unwrap();
    let got = store.get(&PathHash::of(&root.join("Manga/Berserk"))).unwrap().unwrap();
    assert_eq!(got.title, "Berserk");
    assert_eq!(
        got.poster,
        Some(PosterRef::ArchiveEntry("Manga/Berserk/Vol 01.cbz".into()))
    );
}

#[test]
fn test_upsert_replaces_row() {
    let dir = tempdir().unwrap();
    let store = CacheStore::open(&dir.path().join("c.db")).unwrap();
    let root = Path::new("/lib");

    store.upsert(&[entry(root, "Manga/Monster", "Old")]).unwrap();
    store.upsert(&[entry(root, "Manga/Monster", "Monster")]).unwrap();

    assert_eq!(store.count().unwrap(), 1);
    let got = store.get(&PathHash::of(&root.join("Manga/Monster"))).unwrap().unwrap();
    assert_eq!(got.title, "Monster");
}

#[test]
fn test_children_paging_is_complete_and_ordered() {
    let dir = tempdir().unwrap();
    let store = CacheStore::open(&dir.path().join("c.db")).unwrap();
    let root = Path::new("/lib");

    let rows: Vec<Entry> = (0..7)
        .map(|i| entry(root, &format!("Webtoon/S{}", i), &format!("Series {}", i)))
        .collect();
    store.upsert(&rows).unwrap();

    let parent = PathHash::of(&root.join("Webtoon"));
    let mut seen = Vec::new();
    for page in 1..=3 {
        let result = store.query_children(&parent, page, 3).unwrap();
        assert_eq!(result.total, 7);
        seen.extend(result.items.into_iter().map(|e| e.title));
    }
    let expected: Vec<String> = (0..7).map(|i| format!("Series {}", i)).collect();
    assert_eq!(seen, expected);
}

fn series(root: &Path, rel: &str, title: &str) -> Entry {
    let mut e = entry(root, rel, title);
    e.is_series = true;
    e
}

#[test]
fn test_search_matches_series_only() {
    let dir = tempdir().unwrap();
    let store = CacheStore::open(&dir.path().join("c.db")).unwrap();
    let root = Path::new("/lib");

    store
        .upsert(&[
            entry(root, "Dragon", "Dragon"),
            series(root, "Manga/Dragon Ball", "Dragon Ball"),
            entry(root, "Manga/Dragon Ball/Dragon 01", "Dragon 01"),
            series(root, "Shorts", "Dragon Shorts"),
            series(root, "Manga/Naruto", "Naruto"),
        ])
        .unwrap();

    let hits = store.search_title("dragon", 1, 10).unwrap();
    let titles: Vec<&str> = hits.items.iter().map(|e| e.title.as_str()).collect();
    assert_eq!(titles, vec!["Dragon Ball", "Dragon Shorts"]);
}

#[test]
fn test_series_listing_mixes_depths() {
    let dir = tempdir().unwrap();
    let store = CacheStore::open(&dir.path().join("c.db")).unwrap();
    let root = Path::new("/lib");

    store
        .upsert(&[
            entry(root, "Manga", "Manga"),
            series(root, "Manga/Berserk", "Berserk"),
            series(root, "OneShots", "OneShots"),
            entry(root, "OneShots/Extras", "Extras"),
        ])
        .unwrap();

    let page = store.query_series(1, 10).unwrap();
    assert_eq!(page.total, 2);
    let depths: Vec<u32> = page.items.iter().map(|e| e.depth).collect();
    assert_eq!(depths, vec![2, 1]);
}

#[test]
fn test_search_escapes_like_wildcards() {
    let dir = tempdir().unwrap();
    let store = CacheStore::open(&dir.path().join("c.db")).unwrap();
    let root = Path::new("/lib");

    store
        .upsert(&[series(root, "M/100% Love", "100% Love"), series(root, "M/1000 Nights", "1000 Nights")])
        .unwrap();

    let hits = store.search_title("100%", 1, 10).unwrap();
    assert_eq!(hits.total, 1);
    assert_eq!(hits.items[0].title, "100% Love");
}

#[test]
fn test_purge_by_title_and_clear() {
    let dir = tempdir().unwrap();
    let store = CacheStore::open(&dir.path().join("c.db")).unwrap();
    let root = Path::new("/lib");

    store
        .upsert(&[
            entry(root, "A/Dup", "Same"),
            entry(root, "B/Dup", "Same"),
            entry(root, "B/Other", "Other"),
        ])
        .unwrap();

    assert_eq!(store.purge_by_title("Same").unwrap(), 2);
    assert_eq!(store.count().unwrap(), 1);
    store.clear().unwrap();
    assert_eq!(store.count().unwrap(), 0);
}

#[test]
fn test_writer_serializes_concurrent_batches() {
    let dir = tempdir().unwrap();
    let store = Arc::new(CacheStore::open(&dir.path().join("c.db")).unwrap());
    let writer = Arc::new(CacheWriter::spawn(Arc::clone(&store)).unwrap());
    let root = Path::new("/lib");

    std::thread::scope(|s| {
        for t in 0..4 {
            let writer = Arc::clone(&writer);
            s.spawn(move || {
                for i in 0..25 {
                    let rel = format!("T{}/S{}", t, i);
                    writer.submit(vec![entry(root, &rel, &rel)]).unwrap();
                }
            });
        }
    });

    let writer = Arc::try_unwrap(writer).ok().unwrap();
    let stats = writer.finish().unwrap();
    assert_eq!(stats.rows_written, 100);
    assert_eq!(stats.failed_batches, 0);
    assert_eq!(store.count().unwrap(), 100);
}
