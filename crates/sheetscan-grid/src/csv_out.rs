use std::path::Path;

use csv::{ReaderBuilder, WriterBuilder};

use crate::error::GridError;

pub(crate) fn write_csv(path: &Path, rows: &[Vec<String>], delimiter: u8) -> Result<(), GridError> {
    let mut writer = WriterBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_path(path)?;
    for row in rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Reads every record, the header line included, without requiring a
/// uniform record length.
pub(crate) fn read_csv(path: &Path, delimiter: u8) -> Result<Vec<Vec<String>>, GridError> {
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::{read_csv, write_csv};
    use tempfile::tempdir;

    #[test]
    fn quotes_cells_containing_delimiters() {
        let dir = tempdir().expect("tempdir should be created");
        let path = dir.path().join("quoted.csv");
        let rows = vec![
            vec!["name".to_string(), "note".to_string()],
            vec!["Ann".to_string(), "a, b".to_string()],
        ];

        write_csv(&path, &rows, b',').expect("csv should be written");
        let text = std::fs::read_to_string(&path).expect("csv should be readable");
        assert_eq!(text, "name,note\nAnn,\"a, b\"\n");

        let back = read_csv(&path, b',').expect("csv should be read");
        assert_eq!(back, rows);
    }

    #[test]
    fn reads_ragged_records() {
        let dir = tempdir().expect("tempdir should be created");
        let path = dir.path().join("ragged.csv");
        std::fs::write(&path, "a,b,c\n1\n2,3\n").expect("fixture should be written");

        let rows = read_csv(&path, b',').expect("csv should be read");
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1], vec!["1"]);
    }
}
