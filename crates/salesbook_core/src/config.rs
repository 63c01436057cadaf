//! YAML configuration loading (`book.yaml`, `pars.yaml`, `logistics.yaml`).

use std::fs;
use std::path::Path;

use serde_yaml::Value;

use crate::spec::{
    ConfigError, EnumBookValue, SpecBook, SpecBookEntry, convert_number_to_text,
};

/// Read and parse a classification book file.
pub fn load_book(path: &Path) -> Result<SpecBook, ConfigError> {
    let c_text = read_config_text(path)?;
    parse_book(&c_text, &path.display().to_string())
}

/// Parse classification book YAML, preserving document order.
///
/// The root must be a mapping; keys may be strings, numbers or booleans and
/// values either a plain group label or a `{group, color}` record.
pub fn parse_book(text: &str, origin: &str) -> Result<SpecBook, ConfigError> {
    let value: Value = serde_yaml::from_str(text).map_err(|source| ConfigError::Yaml {
        origin: origin.to_string(),
        source,
    })?;

    let Value::Mapping(mapping) = value else {
        return Err(ConfigError::Invalid {
            origin: origin.to_string(),
            message: "expected a mapping of article -> group".to_string(),
        });
    };

    let mut l_entries = Vec::with_capacity(mapping.len());
    for (key, value) in mapping {
        let c_key = match key {
            Value::String(s) => s,
            Value::Number(n) => derive_number_key(&n),
            Value::Bool(b) => b.to_string(),
            other => {
                return Err(ConfigError::Invalid {
                    origin: origin.to_string(),
                    message: format!("unsupported key {other:?}"),
                });
            }
        };
        let value = serde_yaml::from_value::<EnumBookValue>(value).map_err(|_| {
            ConfigError::Invalid {
                origin: origin.to_string(),
                message: format!(
                    "value of {c_key:?} must be a group label or a {{group, color}} record"
                ),
            }
        })?;
        l_entries.push(SpecBookEntry { key: c_key, value });
    }

    tracing::debug!(origin, entries = l_entries.len(), "book parsed");
    Ok(SpecBook { entries: l_entries })
}

/// Render a numeric key the way numeric cells render, so `12345.0` and a
/// `12345` cell normalize to the same key.
fn derive_number_key(n: &serde_yaml::Number) -> String {
    if let Some(n_int) = n.as_i64() {
        return n_int.to_string();
    }
    if let Some(n_uint) = n.as_u64() {
        return n_uint.to_string();
    }
    n.as_f64()
        .map_or_else(|| n.to_string(), convert_number_to_text)
}

/// Read and parse a column-list file.
pub fn load_columns(path: &Path) -> Result<Vec<String>, ConfigError> {
    let c_text = read_config_text(path)?;
    parse_columns(&c_text, &path.display().to_string())
}

/// Parse a YAML sequence of column names.
pub fn parse_columns(text: &str, origin: &str) -> Result<Vec<String>, ConfigError> {
    let l_columns: Vec<String> =
        serde_yaml::from_str(text).map_err(|source| ConfigError::Yaml {
            origin: origin.to_string(),
            source,
        })?;
    if l_columns.is_empty() {
        return Err(ConfigError::Invalid {
            origin: origin.to_string(),
            message: "column list is empty".to_string(),
        });
    }
    Ok(l_columns)
}

fn read_config_text(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::ClassificationTable;
    use crate::spec::EnumCellValue;

    #[test]
    fn test_parse_book_keeps_order_and_both_shapes() {
        let book = parse_book(
            "ABC123:\n  group: Shoes\n  color: Red\nzz-1: Bags\n12345:\n  group: Hats\n",
            "book.yaml",
        )
        .unwrap();

        assert_eq!(
            book.entries,
            vec![
                SpecBookEntry {
                    key: "ABC123".to_string(),
                    value: EnumBookValue::Structured {
                        group: Some("Shoes".to_string()),
                        color: Some("Red".to_string()),
                    },
                },
                SpecBookEntry {
                    key: "zz-1".to_string(),
                    value: EnumBookValue::Plain("Bags".to_string()),
                },
                SpecBookEntry {
                    key: "12345".to_string(),
                    value: EnumBookValue::Structured {
                        group: Some("Hats".to_string()),
                        color: None,
                    },
                },
            ]
        );
    }

    #[test]
    fn test_parse_book_rejects_non_mapping_root() {
        let err = parse_book("- a\n- b\n", "book.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_parse_book_rejects_malformed_value() {
        let err = parse_book("abc:\n  - 1\n  - 2\n", "book.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_parse_book_rejects_invalid_yaml() {
        let err = parse_book("abc: [unclosed", "book.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml { .. }));
    }

    #[test]
    fn test_float_shaped_key_matches_numeric_cell() {
        let book = parse_book("12345.0: Shoes\n678: Bags\n", "book.yaml").unwrap();
        assert_eq!(book.entries[0].key, "12345");
        assert_eq!(book.entries[1].key, "678");

        let table = ClassificationTable::from_book(&book);
        assert_eq!(
            table
                .lookup(&EnumCellValue::Number(12345.0))
                .map(|hit| hit.group.as_str()),
            Some("Shoes")
        );
        assert_eq!(
            table.lookup(&"12345".into()).map(|hit| hit.group.as_str()),
            Some("Shoes")
        );
        assert_eq!(
            table
                .lookup(&EnumCellValue::Number(678.0))
                .map(|hit| hit.group.as_str()),
            Some("Bags")
        );
    }

    #[test]
    fn test_parse_columns() {
        assert_eq!(
            parse_columns("- Артикул поставщика\n- Размер\n", "pars.yaml").unwrap(),
            vec!["Артикул поставщика", "Размер"]
        );
        assert!(parse_columns("[]", "pars.yaml").is_err());
        assert!(parse_columns("a: b", "pars.yaml").is_err());
    }

    #[test]
    fn test_load_book_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_book(&dir.path().join("book.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_load_columns_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pars.yaml");
        fs::write(&path, "- Group\n- Color\n").unwrap();
        assert_eq!(load_columns(&path).unwrap(), vec!["Group", "Color"]);
    }
}
