use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use nascatalog::config::{Config, ENV_PREFIX};
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

#[test]
fn test_config_load_defaults() {
    // Use figment directly without Env to avoid interference from other tests
    let config: Config = Figment::from(Serialized::defaults(Config::default()))
        .extract()
        .unwrap();
    assert_eq!(config.series_depth, 2);
    assert_eq!(config.workers, 12);
    assert_eq!(config.default_page_size, 50);
    assert!(config.root.is_none());
}

#[test]
fn test_config_load_from_env() {
    std::env::set_var("NASCATALOG_SERIES_DEPTH", "3");
    std::env::set_var("NASCATALOG_ROOT_CATEGORIES", "[Manga, Webtoon]");

    let config: Config = Figment::from(Serialized::defaults(Config::default()))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()
        .unwrap();

    assert_eq!(config.series_depth, 3);
    assert_eq!(config.root_categories, vec!["Manga".to_string(), "Webtoon".to_string()]);

    std::env::remove_var("NASCATALOG_SERIES_DEPTH");
    std::env::remove_var("NASCATALOG_ROOT_CATEGORIES");
}

#[test]
fn test_config_load_from_toml() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(
        &config_path,
        r##"
root = "/volume1/comics"
workers = 200
excluded_names = ["@eaDir", "#snapshot"]
skip_hidden = false
"##,
    )
    .unwrap();

    let config = Config::load(Some(&config_path)).unwrap();
    assert_eq!(config.root, Some(PathBuf::from("/volume1/comics")));
    // Clamped to the pool maximum.
    assert_eq!(config.workers, 64);
    assert_eq!(config.excluded_names, vec!["@eaDir".to_string(), "#snapshot".to_string()]);
    assert!(!config.skip_hidden);
    // Untouched keys keep their defaults.
    assert_eq!(config.default_page_size, 50);
}

#[test]
fn test_config_missing_explicit_file_errors() {
    let temp_dir = tempdir().unwrap();
    assert!(Config::load(Some(&temp_dir.path().join("absent.toml"))).is_err());
}

#[test]
fn test_config_save_round_trip() {
    let temp_dir = tempdir().unwrap();
    let path = temp_dir.path().join("nested/config.toml");
    let config = Config {
        root: Some(PathBuf::from("/lib")),
        root_categories: vec!["Manga".into()],
        ..Config::default()
    };
    config.save(&path).unwrap();

    let loaded: Config = Figment::from(Serialized::defaults(Config::default()))
        .merge(Toml::file(&path))
        .extract()
        .unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_scanner_config_follows_settings() {
    let config = Config {
        series_depth: 4,
        poster_search_depth: 5,
        ..Config::default()
    };
    let scanner = config.scanner_config();
    assert_eq!(scanner.series_depth, 4);
    assert_eq!(scanner.poster_search_depth, 5);
    assert_eq!(scanner.excluded_names, config.excluded_names);
}
