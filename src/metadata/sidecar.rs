//! Sidecar metadata files (`kavita.yaml`, `series.yaml`, `series.json`).

use std::path::Path;

use serde_json::Value as JsonValue;
use serde_yaml::Value as YamlValue;

use super::MetadataError;
use crate::scanner::listing::DirItem;
use crate::scanner::path_utils::fold_name;

/// Recognized sidecar names, in priority order.
pub const SIDECAR_NAMES: &[&str] = &["kavita.yaml", "series.yaml", "series.json"];

/// JSON poster keys, searched section by section.
const JSON_POSTER_ORDER: &[(&str, &[&str])] = &[
    ("web", &["main_img", "share_img"]),
    (
        "content",
        &[
            "backgroundImage",
            "featuredCharacterImageA",
            "featuredCharacterImageB",
            "titleImageA",
            "titleImageB",
        ],
    ),
    ("", &["image", "thumbnail", "cover", "poster"]),
];

/// Fields a sidecar may provide. Everything is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sidecar {
    /// Title override.
    pub title: Option<String>,
    /// Poster value: URL or file name relative to the sidecar's directory.
    pub poster: Option<String>,
    /// Synopsis.
    pub summary: Option<String>,
    /// Writers.
    pub writers: Vec<String>,
    /// Genres.
    pub genres: Vec<String>,
    /// Status.
    pub status: Option<String>,
    /// Publisher.
    pub publisher: Option<String>,
}

/// Pick the highest-priority sidecar file present in a listing.
#[must_use]
pub fn find_sidecar(listing: &[DirItem]) -> Option<&DirItem> {
    SIDECAR_NAMES.iter().find_map(|wanted| {
        listing
            .iter()
            .find(|item| !item.is_dir && item.folded_name() == fold_name(wanted))
    })
}

/// Read and parse a sidecar file, choosing the format by extension.
pub fn load(path: &Path) -> Result<Sidecar, MetadataError> {
    let bytes = std::fs::read(path).map_err(|source| MetadataError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let text = String::from_utf8_lossy(&bytes);

    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    let parsed = if is_json {
        parse_json(&text).map_err(|e| e.to_string())
    } else {
        parse_yaml(&text).map_err(|e| e.to_string())
    };

    parsed.map_err(|message| MetadataError::Parse {
        path: path.to_path_buf(),
        message,
    })
}

/// Parse YAML sidecar text.
///
/// Fields are read from a `meta` section, else a `search` section, else the
/// document root.
pub fn parse_yaml(text: &str) -> Result<Sidecar, serde_yaml::Error> {
    let doc: YamlValue = serde_yaml::from_str(text)?;
    let section = ["meta", "search"]
        .iter()
        .find_map(|key| doc.get(*key).filter(|v| v.is_mapping()))
        .unwrap_or(&doc);

    Ok(Sidecar {
        title: yaml_string(section, &["localizedName", "name", "title"]),
        poster: yaml_string(section, &["poster_url", "poster", "cover"]),
        summary: yaml_string(section, &["summary"]),
        writers: yaml_list(section, &["writer", "author", "writers"]),
        genres: yaml_list(section, &["genres", "tags"]),
        status: yaml_string(section, &["status"]),
        publisher: yaml_string(section, &["publisher"]),
    })
}

fn yaml_scalar(value: &YamlValue) -> Option<String> {
    let text = match value {
        YamlValue::String(s) => s.trim().to_string(),
        YamlValue::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn yaml_string(section: &YamlValue, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| section.get(*key).and_then(yaml_scalar))
}

fn yaml_list(section: &YamlValue, keys: &[&str]) -> Vec<String> {
    for key in keys {
        match section.get(*key) {
            Some(YamlValue::Sequence(items)) => {
                let list: Vec<String> = items.iter().filter_map(yaml_scalar).collect();
                if !list.is_empty() {
                    return list;
                }
            }
            Some(value) => {
                if let Some(single) = yaml_scalar(value) {
                    return vec![single];
                }
            }
            None => {}
        }
    }
    Vec::new()
}

/// Parse a `series.json` sidecar (webtoon platform export layout).
pub fn parse_json(text: &str) -> Result<Sidecar, serde_json::Error> {
    let doc: JsonValue = serde_json::from_str(text)?;
    let content = doc.get("content").unwrap_or(&JsonValue::Null);

    let poster = JSON_POSTER_ORDER.iter().find_map(|(section, keys)| {
        let source = if section.is_empty() {
            &doc
        } else {
            doc.get(*section).unwrap_or(&JsonValue::Null)
        };
        keys.iter().find_map(|key| json_string(source, key))
    });

    let authors = content
        .get("authors")
        .and_then(JsonValue::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    let people_of = |kind: &str| -> Vec<String> {
        authors
            .iter()
            .filter(|a| a.get("type").and_then(JsonValue::as_str) == Some(kind))
            .filter_map(|a| json_string(a, "name"))
            .collect()
    };

    let genres = content
        .get("seoKeywords")
        .and_then(JsonValue::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(JsonValue::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Ok(Sidecar {
        title: json_string(content, "title").or_else(|| json_string(&doc, "title")),
        poster,
        summary: json_string(content, "synopsis"),
        writers: people_of("AUTHOR"),
        genres,
        status: json_string(content, "status"),
        publisher: people_of("PUBLISHER").into_iter().next(),
    })
}

fn json_string(value: &JsonValue, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(JsonValue::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
