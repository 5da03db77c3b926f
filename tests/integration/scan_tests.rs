use nascatalog::cache::{CacheStore, PathHash};
use nascatalog::progress::ProgressCallback;
use nascatalog::scanner::{DirectoryScanner, ScanPool, ScanSnapshot, ScannerConfig};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::tempdir;

#[derive(Default)]
struct Recorder {
    started: AtomicUsize,
    finished: AtomicUsize,
    failed: Mutex<Vec<String>>,
    last: Mutex<Option<ScanSnapshot>>,
}

impl ProgressCallback for Recorder {
    fn on_scan_start(&self, _root: &str) {
        self.started.fetch_add(1, Ordering::SeqCst);
    }

    fn on_task_finished(&self, _snapshot: &ScanSnapshot, _path: &str) {
        self.finished.fetch_add(1, Ordering::SeqCst);
    }

    fn on_task_failed(&self, path: &str, _message: &str) {
        self.failed.lock().unwrap().push(path.to_string());
    }

    fn on_scan_end(&self, snapshot: &ScanSnapshot) {
        *self.last.lock().unwrap() = Some(*snapshot);
    }
}

fn build_tree(root: &Path, categories: usize, series: usize) {
    for c in 0..categories {
        for s in 0..series {
            let dir = root.join(format!("Cat{}", c)).join(format!("Series{:02}", s));
            fs::create_dir_all(dir.join("ch1")).unwrap();
            fs::write(dir.join("ch1/001.jpg"), b"x").unwrap();
        }
    }
}

fn store(dir: &Path) -> Arc<CacheStore> {
    Arc::new(CacheStore::open(&dir.join("c.db")).unwrap())
}

#[test]
fn test_scan_wide_tree_with_callbacks() {
    let lib = tempdir().unwrap();
    build_tree(lib.path(), 3, 20);
    let db = tempdir().unwrap();
    let store = store(db.path());

    let scanner = DirectoryScanner::new(lib.path(), ScannerConfig::default());
    let pool = ScanPool::new(8).unwrap();
    let recorder = Recorder::default();
    let report = scanner.scan(&pool, Arc::clone(&store), "", Some(&recorder)).unwrap();

    // root + 3 categories + 60 series
    assert_eq!(report.processed, 64);
    assert_eq!(report.failed, 0);
    assert_eq!(recorder.started.load(Ordering::SeqCst), 1);
    assert_eq!(recorder.finished.load(Ordering::SeqCst), 64);
    assert_eq!(recorder.last.lock().unwrap().as_ref().unwrap().processed, 64);

    // root + categories + series + one chapter per series
    assert_eq!(store.count().unwrap(), 1 + 3 + 60 + 60);
    let series = store.query_series(1, 500).unwrap();
    assert_eq!(series.total, 60);
}

#[test]
fn test_scan_results_independent_of_worker_count() {
    let lib = tempdir().unwrap();
    build_tree(lib.path(), 2, 10);

    let mut counts = Vec::new();
    for workers in [1, 4, 16] {
        let db = tempdir().unwrap();
        let store = store(db.path());
        let scanner = DirectoryScanner::new(lib.path(), ScannerConfig::default());
        let pool = ScanPool::new(workers).unwrap();
        scanner.scan(&pool, Arc::clone(&store), "", None).unwrap();
        counts.push(store.count().unwrap());
    }
    assert!(counts.windows(2).all(|w| w[0] == w[1]), "{:?}", counts);
}

#[test]
fn test_subtree_scan_only_touches_subtree() {
    let lib = tempdir().unwrap();
    build_tree(lib.path(), 2, 3);
    let db = tempdir().unwrap();
    let store = store(db.path());

    let scanner = DirectoryScanner::new(lib.path(), ScannerConfig::default());
    let pool = ScanPool::new(2).unwrap();
    let report = scanner.scan(&pool, Arc::clone(&store), "Cat1", None).unwrap();

    assert_eq!(report.root, "Cat1");
    assert_eq!(report.processed, 4);
    assert!(store.get(&PathHash::of(&lib.path().join("Cat0"))).unwrap().is_none());
    let cat1 = store.get(&PathHash::of(&lib.path().join("Cat1"))).unwrap().unwrap();
    assert_eq!(cat1.depth, 1);
}

#[test]
fn test_scan_stops_submitting_after_shutdown() {
    let lib = tempdir().unwrap();
    build_tree(lib.path(), 2, 5);
    let db = tempdir().unwrap();
    let store = store(db.path());

    let flag = Arc::new(AtomicBool::new(true));
    let scanner = DirectoryScanner::new(lib.path(), ScannerConfig::default());
    let pool = ScanPool::new(2).unwrap().with_shutdown_flag(flag);
    let report = scanner.scan(&pool, Arc::clone(&store), "", None).unwrap();

    assert!(report.interrupted);
    assert!(report.is_partial());
    assert_eq!(report.processed, 0);
}

#[cfg(unix)]
#[test]
fn test_unreadable_directory_is_isolated() {
    use std::os::unix::fs::PermissionsExt;

    let lib = tempdir().unwrap();
    build_tree(lib.path(), 1, 3);
    let locked = lib.path().join("Cat0/Locked");
    fs::create_dir(&locked).unwrap();
    fs::write(locked.join("a.jpg"), b"x").unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    if fs::read_dir(&locked).is_ok() {
        // Running with privileges that ignore permissions.
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let db = tempdir().unwrap();
    let store = store(db.path());
    let scanner = DirectoryScanner::new(lib.path(), ScannerConfig::default());
    let pool = ScanPool::new(4).unwrap();
    let recorder = Recorder::default();
    let report = scanner.scan(&pool, Arc::clone(&store), "", Some(&recorder)).unwrap();

    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

    assert_eq!(report.failed, 1);
    assert_eq!(report.succeeded, report.processed - 1);
    assert_eq!(recorder.failed.lock().unwrap().len(), 1);

    // Siblings are complete and the locked folder is still listed.
    let children = store.query_children(&PathHash::of(&lib.path().join("Cat0")), 1, 50).unwrap();
    assert_eq!(children.total, 4);
    let locked_entry = store.get(&PathHash::of(&locked)).unwrap().unwrap();
    assert_eq!(locked_entry.title, "Locked");
    assert!(locked_entry.poster.is_none());
}
