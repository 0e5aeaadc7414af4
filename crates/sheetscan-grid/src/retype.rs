use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::csv_out::{read_csv, write_csv};
use crate::error::GridError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Number,
    /// Any tag other than `number` leaves the column as text.
    #[serde(other)]
    Text,
}

impl ColumnType {
    fn from_tag(tag: &serde_json::Value) -> Self {
        match tag.as_str() {
            Some("number") => Self::Number,
            _ => Self::Text,
        }
    }
}

/// Column header -> declared type. Unmapped columns are treated as text.
pub type ColumnTypeMap = BTreeMap<String, ColumnType>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetypeReport {
    pub path: PathBuf,
    pub row_count: usize,
    pub converted_cells: usize,
    pub unknown_columns: Vec<String>,
    pub message: String,
}

/// Parses a JSON object such as `{"age": "number", "name": "text"}`.
///
/// Only the exact tag `"number"` marks a numeric column; every other value
/// means text.
///
/// # Errors
/// Returns [`GridError::InvalidColumnTypes`] for malformed JSON or a
/// non-object document.
pub fn parse_column_types(json: &str) -> Result<ColumnTypeMap, GridError> {
    let tags: BTreeMap<String, serde_json::Value> = serde_json::from_str(json)
        .map_err(|error| GridError::InvalidColumnTypes(error.to_string()))?;
    Ok(tags
        .into_iter()
        .map(|(column, tag)| (column, ColumnType::from_tag(&tag)))
        .collect())
}

/// Canonical text for a numeric cell, or `None` when it does not parse.
///
/// Text containing a `.` is read as a float and rendered in shortest
/// round-trip form that keeps a fractional part (`30.50` -> `30.5`,
/// `2.` -> `2.0`); anything else must be an integer. Exponents carry a sign
/// and at least two digits (`0.00001` -> `1e-05`).
#[must_use]
pub fn normalize_number(cell: &str) -> Option<String> {
    let trimmed = cell.trim();
    if trimmed.contains('.') {
        let value = trimmed.parse::<f64>().ok()?;
        Some(float_text(value))
    } else {
        let value = trimmed.parse::<i128>().ok()?;
        Some(value.to_string())
    }
}

fn float_text(value: f64) -> String {
    let shortest = format!("{value:?}");
    let Some((mantissa, exponent)) = shortest.split_once('e') else {
        return shortest;
    };
    let (sign, digits) = match exponent.strip_prefix('-') {
        Some(digits) => ('-', digits),
        None => ('+', exponent),
    };
    format!("{mantissa}e{sign}{digits:0>2}")
}

/// Rewrites numeric columns in place and returns how many cells changed.
/// The first row is the header row and is never modified.
pub fn retype_rows(rows: &mut [Vec<String>], types: &ColumnTypeMap) -> usize {
    let Some((headers, data)) = rows.split_first_mut() else {
        return 0;
    };

    let numeric = headers
        .iter()
        .map(|header| types.get(header) == Some(&ColumnType::Number))
        .collect::<Vec<_>>();

    let mut converted = 0;
    for row in data {
        for (cell, is_numeric) in row.iter_mut().zip(numeric.iter().copied()) {
            if !is_numeric {
                continue;
            }
            if let Some(normalized) = normalize_number(cell) {
                if normalized != *cell {
                    converted += 1;
                    *cell = normalized;
                }
            }
        }
    }
    converted
}

fn sibling_temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.retype.tmp"))
}

// Writes beside `path`, then renames over it; a failed write leaves `path` as it was.
fn write_replacing(path: &Path, rows: &[Vec<String>]) -> Result<(), GridError> {
    let tmp = sibling_temp_path(path);
    let written = write_csv(&tmp, rows, b',')
        .and_then(|()| std::fs::rename(&tmp, path).map_err(GridError::from));
    if written.is_err() {
        let _ = std::fs::remove_file(&tmp);
    }
    written
}

/// Reparses a delimited file and rewrites it with numeric columns normalized.
///
/// # Errors
/// Returns [`GridError::EmptyFile`] when the file has no records, leaving it
/// untouched, and I/O or CSV errors otherwise.
pub fn retype_csv(path: &Path, types: &ColumnTypeMap) -> Result<RetypeReport, GridError> {
    let mut rows = read_csv(path, b',')?;
    if rows.is_empty() {
        return Err(GridError::EmptyFile {
            path: path.to_path_buf(),
        });
    }

    let unknown_columns = types
        .keys()
        .filter(|name| !rows[0].contains(name))
        .cloned()
        .collect::<Vec<_>>();
    for name in &unknown_columns {
        warn!(column = %name, "mapped column is not present in the header row");
    }

    let converted_cells = retype_rows(&mut rows, types);

    write_replacing(path, &rows)?;

    info!(
        path = %path.display(),
        rows = rows.len() - 1,
        converted_cells,
        "column types updated"
    );

    Ok(RetypeReport {
        path: path.to_path_buf(),
        row_count: rows.len() - 1,
        converted_cells,
        unknown_columns,
        message: format!("updated column types: {}", path.display()),
    })
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::{
        ColumnType, normalize_number, parse_column_types, retype_rows, sibling_temp_path,
        write_replacing,
    };
    use crate::error::GridError;

    #[test]
    fn normalizes_integers_and_floats() {
        assert_eq!(normalize_number("30").as_deref(), Some("30"));
        assert_eq!(normalize_number(" +007 ").as_deref(), Some("7"));
        assert_eq!(normalize_number("30.5").as_deref(), Some("30.5"));
        assert_eq!(normalize_number("30.50").as_deref(), Some("30.5"));
        assert_eq!(normalize_number("2.").as_deref(), Some("2.0"));
        assert_eq!(normalize_number("-0.25").as_deref(), Some("-0.25"));
    }

    #[test]
    fn exponents_are_signed_and_padded() {
        assert_eq!(normalize_number("0.00001").as_deref(), Some("1e-05"));
        assert_eq!(
            normalize_number("12345678901234567.0").as_deref(),
            Some("1.2345678901234568e+16")
        );
        assert_eq!(normalize_number("1.5e-120").as_deref(), Some("1.5e-120"));
        assert_eq!(normalize_number("0.0001").as_deref(), Some("0.0001"));
    }

    #[test]
    fn leaves_non_numbers_alone() {
        assert_eq!(normalize_number("N/A"), None);
        assert_eq!(normalize_number("1,000"), None);
        assert_eq!(normalize_number("1.2.3"), None);
        assert_eq!(normalize_number(""), None);
    }

    #[test]
    fn canonical_output_is_a_fixed_point() {
        for raw in ["30", "30.50", "1e3", "12.000", "-4", "0.00001", "2.5e20"] {
            if let Some(first) = normalize_number(raw) {
                assert_eq!(normalize_number(&first).as_deref(), Some(first.as_str()));
            }
        }
    }

    #[test]
    fn rewrites_only_mapped_number_columns() {
        let types = parse_column_types(r#"{"age": "number", "name": "text"}"#)
            .expect("mapping should parse");
        let mut rows = vec![
            vec!["name".to_string(), "age".to_string()],
            vec!["007".to_string(), "030".to_string()],
            vec!["Bo".to_string(), "N/A".to_string(), "extra".to_string()],
        ];

        let converted = retype_rows(&mut rows, &types);
        assert_eq!(converted, 1);
        assert_eq!(rows[1], vec!["007", "30"]);
        assert_eq!(rows[2], vec!["Bo", "N/A", "extra"]);
    }

    #[test]
    fn parses_column_type_tags() {
        let types = parse_column_types(r#"{"pay": "number", "age": "integer", "id": 5}"#)
            .expect("mapping should parse");
        assert_eq!(types.get("pay"), Some(&ColumnType::Number));
        assert_eq!(types.get("age"), Some(&ColumnType::Text));
        assert_eq!(types.get("id"), Some(&ColumnType::Text));
    }

    #[test]
    fn unknown_tag_leaves_column_as_text() {
        let types = parse_column_types(r#"{"age": "date"}"#).expect("mapping should parse");
        let mut rows = vec![vec!["age".to_string()], vec!["030".to_string()]];

        assert_eq!(retype_rows(&mut rows, &types), 0);
        assert_eq!(rows[1], vec!["030"]);
    }

    #[test]
    fn rejects_malformed_mappings() {
        for json in ["[1, 2]", "{not json", "\"number\""] {
            let err = parse_column_types(json).expect_err("mapping should be rejected");
            assert!(matches!(err, GridError::InvalidColumnTypes(_)), "{json}");
        }
    }

    #[test]
    fn failed_replace_removes_temp_file() {
        let dir = tempdir().expect("tempdir should be created");
        let target = dir.path().join("table.csv");
        std::fs::create_dir(&target).expect("directory should be created");
        std::fs::write(target.join("keep"), "x").expect("file should be written");

        let rows = vec![vec!["age".to_string()], vec!["30".to_string()]];
        write_replacing(&target, &rows).expect_err("cannot replace a directory");
        assert!(!sibling_temp_path(&target).exists());
        assert!(target.join("keep").exists());
    }
}
