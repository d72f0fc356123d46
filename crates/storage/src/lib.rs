//! CSV-backed tabular store.
//!
//! Columns are untyped text; an empty cell is "unset" (CSV has no null).
//! Row position is the stable identity used to write results back.

use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, WriterBuilder};
use thiserror::Error;
use tracing::info;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    #[error("malformed table: {0}")]
    Parse(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// An ordered sequence of rows under first-seen column order.
#[derive(Debug, Clone)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Dataset {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(StoreError::NotFound(path.to_path_buf()));
        }

        let mut reader = ReaderBuilder::new()
            .flexible(true)
            .from_path(path)
            .map_err(|e| StoreError::Parse(e.to_string()))?;

        let columns: Vec<String> = reader
            .headers()
            .map_err(|e| StoreError::Parse(e.to_string()))?
            .iter()
            .map(|h| h.to_string())
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| StoreError::Parse(e.to_string()))?;
            rows.push(record.iter().map(|v| v.to_string()).collect());
        }

        info!(path = %path.display(), rows = rows.len(), columns = columns.len(), "dataset loaded");
        Ok(Self { columns, rows })
    }

    /// Write the full dataset, original and derived columns alike, in
    /// first-seen column order. Callers derive the output path; the input
    /// file is never passed here.
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut writer = WriterBuilder::new()
            .from_path(path)
            .map_err(|e| StoreError::Parse(e.to_string()))?;

        writer
            .write_record(&self.columns)
            .map_err(|e| StoreError::Parse(e.to_string()))?;
        for row in &self.rows {
            let mut record: Vec<&str> = row.iter().map(|s| s.as_str()).collect();
            record.resize(self.columns.len(), "");
            writer
                .write_record(&record)
                .map_err(|e| StoreError::Parse(e.to_string()))?;
        }
        writer.flush()?;

        info!(path = %path.display(), rows = self.rows.len(), "dataset saved");
        Ok(())
    }

    /// Add an empty column if missing. Idempotent.
    pub fn ensure_column(&mut self, name: &str) {
        if !self.column_exists(name) {
            self.columns.push(name.to_string());
        }
    }

    pub fn column_exists(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell value, or `None` when the column is absent or the cell unset.
    pub fn get(&self, row: usize, column: &str) -> Option<&str> {
        let idx = self.columns.iter().position(|c| c == column)?;
        self.rows
            .get(row)?
            .get(idx)
            .map(|v| v.as_str())
            .filter(|v| !v.is_empty())
    }

    /// Set a cell, growing the row to the column's position if the row was
    /// parsed short. Panics on an unknown column: callers `ensure_column`
    /// first.
    pub fn set(&mut self, row: usize, column: &str, value: &str) {
        let idx = self
            .columns
            .iter()
            .position(|c| c == column)
            .unwrap_or_else(|| panic!("unknown column '{}'", column));
        let cells = &mut self.rows[row];
        if cells.len() <= idx {
            cells.resize(idx + 1, String::new());
        }
        cells[idx] = value.to_string();
    }

    /// Distinct non-empty values of a column with their counts, insertion
    /// ordered. Used for the end-of-run summary.
    pub fn value_counts(&self, column: &str) -> Vec<(String, usize)> {
        let mut counts: Vec<(String, usize)> = Vec::new();
        for row in 0..self.len() {
            if let Some(value) = self.get(row, column) {
                match counts.iter_mut().find(|(v, _)| v == value) {
                    Some((_, n)) => *n += 1,
                    None => counts.push((value.to_string(), 1)),
                }
            }
        }
        counts
    }

    /// Build a dataset in memory. Mostly a test convenience.
    pub fn from_parts(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { columns, rows }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_csv(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn load_missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = Dataset::load(&dir.path().join("nope.csv")).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn load_reads_headers_and_rows() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(&dir, "keys.csv", "key_1,to check\nAAA,true\nBBB,\n");
        let ds = Dataset::load(&path).unwrap();
        assert_eq!(ds.columns(), ["key_1", "to check"]);
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.get(0, "key_1"), Some("AAA"));
        assert_eq!(ds.get(0, "to check"), Some("true"));
        assert_eq!(ds.get(1, "to check"), None); // empty cell is unset
        assert_eq!(ds.get(0, "missing"), None);
    }

    #[test]
    fn ensure_column_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(&dir, "keys.csv", "key_1\nAAA\n");
        let mut ds = Dataset::load(&path).unwrap();
        ds.ensure_column("key_1_status");
        ds.ensure_column("key_1_status");
        assert_eq!(ds.columns(), ["key_1", "key_1_status"]);
        assert_eq!(ds.get(0, "key_1_status"), None);
    }

    #[test]
    fn set_grows_short_rows() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(&dir, "keys.csv", "key_1\nAAA\n");
        let mut ds = Dataset::load(&path).unwrap();
        ds.ensure_column("key_1_status");
        ds.set(0, "key_1_status", "Activated");
        assert_eq!(ds.get(0, "key_1_status"), Some("Activated"));
    }

    #[test]
    fn save_roundtrips_with_derived_columns() {
        let dir = TempDir::new().unwrap();
        let input = write_csv(&dir, "keys.csv", "key_1,note\nAAA,hello\nBBB,\n");
        let mut ds = Dataset::load(&input).unwrap();
        ds.ensure_column("key_1_status");
        ds.set(1, "key_1_status", "Not activated");

        let output = dir.path().join("keys_with_status.csv");
        ds.save(&output).unwrap();

        let reloaded = Dataset::load(&output).unwrap();
        assert_eq!(reloaded.columns(), ["key_1", "note", "key_1_status"]);
        assert_eq!(reloaded.get(0, "note"), Some("hello"));
        assert_eq!(reloaded.get(0, "key_1_status"), None);
        assert_eq!(reloaded.get(1, "key_1_status"), Some("Not activated"));

        // input untouched
        let original = std::fs::read_to_string(&input).unwrap();
        assert_eq!(original, "key_1,note\nAAA,hello\nBBB,\n");
    }

    #[test]
    fn value_counts_skips_unset_cells() {
        let ds = Dataset::from_parts(
            vec!["s".into()],
            vec![
                vec!["Activated".into()],
                vec!["".into()],
                vec!["Activated".into()],
                vec!["Invalid".into()],
            ],
        );
        assert_eq!(
            ds.value_counts("s"),
            vec![("Activated".to_string(), 2), ("Invalid".to_string(), 1)]
        );
    }
}
