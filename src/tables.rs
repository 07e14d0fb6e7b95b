//! # Tabular files
//!
//! The collector writes, and every downstream component reads, plain CSV files
//! with a header row. A [`Table`] is the in-memory form: ordered column names
//! plus rows of text cells.
//!
//! Writes go through a temporary file in the destination directory which is
//! then persisted over the target, so a failed run never leaves a half-written
//! table behind and never touches the previous file.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde_json::{Map, Value};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::DataError;

/// A header plus rows of text cells, in file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Build a table from JSON objects as returned in an upstream `dados` array.
    ///
    /// Columns are the union of keys in first-seen order; a record missing a
    /// key gets an empty cell.
    pub fn from_records(records: &[Map<String, Value>]) -> Self {
        let mut columns: Vec<String> = Vec::new();
        for record in records {
            for key in record.keys() {
                if !columns.iter().any(|c| c == key) {
                    columns.push(key.clone());
                }
            }
        }

        let rows = records
            .iter()
            .map(|record| {
                columns
                    .iter()
                    .map(|c| record.get(c).map(cell_text).unwrap_or_default())
                    .collect()
            })
            .collect();

        Self { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of `name` in the header.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Read a CSV file with a header row.
    pub fn read_csv(path: &Path) -> Result<Self, DataError> {
        let file = fs::File::open(path).map_err(|e| DataError::from_io(path, e))?;
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(file);

        let table_error = |source: csv::Error| DataError::Table {
            path: path.to_path_buf(),
            source,
        };

        let columns = reader
            .headers()
            .map_err(table_error)?
            .iter()
            .map(str::to_string)
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(table_error)?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        debug!("Read {} rows from {}", rows.len(), path.display());
        Ok(Self { columns, rows })
    }

    /// Write the table as CSV, replacing `path` only once the write succeeded.
    pub fn write_csv(&self, path: &Path) -> Result<(), DataError> {
        let dir = parent_dir(path);
        fs::create_dir_all(&dir).map_err(|e| DataError::from_io(&dir, e))?;

        let mut tmp = NamedTempFile::new_in(&dir).map_err(|e| DataError::from_io(&dir, e))?;
        {
            let mut writer = csv::Writer::from_writer(&mut tmp);
            let table_error = |source: csv::Error| DataError::Table {
                path: path.to_path_buf(),
                source,
            };
            if !self.columns.is_empty() {
                writer.write_record(&self.columns).map_err(table_error)?;
                for row in &self.rows {
                    writer.write_record(row).map_err(table_error)?;
                }
            }
            writer
                .flush()
                .map_err(|e| DataError::from_io(path, e))?;
        }

        tmp.persist(path)
            .map_err(|e| DataError::from_io(path, e.error))?;
        debug!("Wrote {} rows to {}", self.rows.len(), path.display());
        Ok(())
    }
}

/// Render a JSON value as a table cell.
///
/// Strings are taken verbatim, `null` becomes empty, everything else is its
/// JSON text.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn records(values: Value) -> Vec<Map<String, Value>> {
        serde_json::from_value(values).unwrap()
    }

    #[test]
    fn test_from_records_unions_columns_in_first_seen_order() {
        let table = Table::from_records(&records(json!([
            {"id": 1, "nome": "Ana"},
            {"id": 2, "siglaUf": "SP", "nome": null}
        ])));

        assert_eq!(table.columns, vec!["id", "nome", "siglaUf"]);
        assert_eq!(table.rows[0], vec!["1", "Ana", ""]);
        assert_eq!(table.rows[1], vec!["2", "", "SP"]);
    }

    #[test]
    fn test_write_then_read_csv() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("deputados.csv");
        let table = Table {
            columns: vec!["id".into(), "nome".into()],
            rows: vec![vec!["1".into(), "Ana, a primeira".into()]],
        };

        table.write_csv(&path).unwrap();
        let back = Table::read_csv(&path).unwrap();

        assert_eq!(back, table);
        assert_eq!(back.column("nome"), Some(1));
        assert_eq!(back.column("email"), None);
    }

    #[test]
    fn test_read_missing_file() {
        let dir = tempdir().unwrap();
        let err = Table::read_csv(&dir.path().join("nope.csv")).unwrap_err();
        assert!(matches!(err, DataError::MissingFile { .. }));
    }

    #[test]
    fn test_cell_text() {
        assert_eq!(cell_text(&json!("texto")), "texto");
        assert_eq!(cell_text(&json!(12.5)), "12.5");
        assert_eq!(cell_text(&json!(null)), "");
        assert_eq!(cell_text(&json!(true)), "true");
    }
}
