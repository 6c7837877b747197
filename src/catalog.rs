//! Catalog loading and saving.
//!
//! The catalog is hand-edited JSON, so loading tolerates a byte-order mark,
//! trailing commas and a lone top-level object. Saving always replaces the
//! whole file at once (temp file + rename).

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::string::FromUtf8Error;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;

use crate::models::CatalogRecord;

// ============================================================================
// REGEX PATTERNS
// ============================================================================

/// Event id inside a link: ".../events/1234567890/?ref=share"
pub static EVENT_LINK_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"/events/(\d+)").unwrap());

/// Trailing comma before a closing bracket or brace.
pub static TRAILING_COMMA: Lazy<Regex> = Lazy::new(|| Regex::new(r",(\s*[\]}])").unwrap());

const BOM: char = '\u{feff}';

// ============================================================================
// Errors
// ============================================================================

/// Catalog failures. All of these abort the run.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed reading catalog {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("catalog {path} is not valid UTF-8: {source}")]
    Encoding {
        path: PathBuf,
        #[source]
        source: FromUtf8Error,
    },
    #[error("catalog {path} is not valid JSON after repair: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("catalog {path} does not contain event records: {source}")]
    Shape {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed writing {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

// ============================================================================
// Reference Ids
// ============================================================================

/// Digits following `/events/` in a link.
pub fn reference_id_from_link(link: &str) -> Option<String> {
    EVENT_LINK_ID
        .captures(link)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Point `link` at `new_id`, keeping host, path shape and query intact.
/// Returns `None` when the link has no event id segment to rewrite.
pub fn rewrite_link(link: &str, new_id: &str) -> Option<String> {
    let caps = EVENT_LINK_ID.captures(link)?;
    let digits = caps.get(1)?;
    Some(format!(
        "{}{}{}",
        &link[..digits.start()],
        new_id,
        &link[digits.end()..]
    ))
}

// ============================================================================
// Parsing
// ============================================================================

/// Parse catalog text, applying repairs only when the plain parse fails.
pub fn parse_catalog(text: &str, path: &Path) -> Result<Vec<CatalogRecord>, CatalogError> {
    let text = text.trim_start_matches(BOM);

    let value: Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(_) => {
            let repaired = TRAILING_COMMA.replace_all(text, "$1");
            serde_json::from_str(&repaired).map_err(|source| CatalogError::Parse {
                path: path.to_path_buf(),
                source,
            })?
        }
    };

    let value = match value {
        Value::Object(_) => Value::Array(vec![value]),
        other => other,
    };

    serde_json::from_value(value).map_err(|source| CatalogError::Shape {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_catalog(path: &Path) -> Result<Vec<CatalogRecord>, CatalogError> {
    let bytes = fs::read(path).map_err(|source| CatalogError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    // Lossy decoding would rewrite untouched records on save
    let text = String::from_utf8(bytes).map_err(|source| CatalogError::Encoding {
        path: path.to_path_buf(),
        source,
    })?;
    parse_catalog(&text, path)
}

// ============================================================================
// Writing
// ============================================================================

/// Replace `path` with `contents` in one step: write a sibling temp file,
/// then rename over the target.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), CatalogError> {
    let write_err = |source: io::Error| CatalogError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_err)?;
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp_path = path.with_file_name(format!(".{file_name}.tmp"));
    fs::write(&tmp_path, contents).map_err(write_err)?;
    fs::rename(&tmp_path, path).map_err(write_err)?;
    Ok(())
}

/// Pretty-printed catalog JSON with a trailing newline.
///
/// Records come out in canonical layout: `name`, `fbLink`, `date`, then unknown
/// keys in their original order. Null links and dates are omitted.
pub fn render_catalog(records: &[CatalogRecord]) -> Result<String, serde_json::Error> {
    let mut out = serde_json::to_string_pretty(records)?;
    out.push('\n');
    Ok(out)
}

pub fn save_catalog(path: &Path, records: &[CatalogRecord]) -> Result<(), CatalogError> {
    let rendered = render_catalog(records).map_err(|source| CatalogError::Shape {
        path: path.to_path_buf(),
        source,
    })?;
    write_atomic(path, rendered.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn parse(text: &str) -> Result<Vec<CatalogRecord>, CatalogError> {
        parse_catalog(text, Path::new("events.json"))
    }

    #[test]
    fn test_reference_id_from_link() {
        assert_eq!(
            reference_id_from_link("https://www.facebook.com/events/123456/?ref=x").as_deref(),
            Some("123456")
        );
        assert_eq!(reference_id_from_link("https://example.com/e/123"), None);
        assert_eq!(reference_id_from_link(""), None);
    }

    #[test]
    fn test_rewrite_link_keeps_surroundings() {
        assert_eq!(
            rewrite_link("https://www.facebook.com/events/111/?ref=share", "222").as_deref(),
            Some("https://www.facebook.com/events/222/?ref=share")
        );
        assert_eq!(rewrite_link("https://example.com/", "222"), None);
    }

    #[test]
    fn test_parse_plain_array() {
        let records = parse(r#"[{"name":"A","fbLink":"x/events/1"},{"name":"B"}]"#).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].reference_id().as_deref(), Some("1"));
        assert_eq!(records[1].link, None);
    }

    #[test]
    fn test_parse_repairs_bom_and_trailing_commas() {
        let text = "\u{feff}[\n  {\"name\": \"A\", \"tags\": [\"run\", \"fun\",],},\n]\n";
        let records = parse(text).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "A");
    }

    #[test]
    fn test_parse_wraps_single_object() {
        let records = parse(r#"{"name":"Solo","fbLink":"/events/9"}"#).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].reference_id().as_deref(), Some("9"));
    }

    #[test]
    fn test_parse_failure_is_fatal_error() {
        assert!(matches!(parse("[{\"name\": "), Err(CatalogError::Parse { .. })));
        assert!(matches!(parse("42"), Err(CatalogError::Shape { .. })));
    }

    #[test]
    fn test_save_then_load_preserves_field_order() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("events.json");
        fs::write(
            &path,
            r#"[{"zeta":1,"name":"A","alpha":2,"fbLink":"https://x/events/5/"}]"#,
        )
        .unwrap();

        let records = load_catalog(&path).unwrap();
        save_catalog(&path, &records).unwrap();

        let written = fs::read_to_string(&path).unwrap();
        let zeta = written.find("zeta").unwrap();
        let alpha = written.find("alpha").unwrap();
        assert!(zeta < alpha);
        assert_eq!(load_catalog(&path).unwrap(), records);
        assert!(!temp.path().join(".events.json.tmp").exists());
    }

    #[test]
    fn test_load_rejects_invalid_utf8() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("events.json");
        let mut bytes = b"[{\"name\": \"Caf".to_vec();
        bytes.push(0xe9);
        bytes.extend_from_slice(b" Run\"}]");
        fs::write(&path, &bytes).unwrap();

        let err = load_catalog(&path).unwrap_err();
        assert!(matches!(err, CatalogError::Encoding { .. }));
        assert_eq!(fs::read(&path).unwrap(), bytes);
    }

    #[test]
    fn test_load_missing_file_is_read_error() {
        let temp = tempdir().unwrap();
        let err = load_catalog(&temp.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, CatalogError::Read { .. }));
    }
}
