//! Generic column-named table

use crate::error::ComputeError;
use serde::{Deserialize, Serialize};

/// An immutable table of string cells with a header row.
///
/// Every row has exactly one cell per column. Operations that change the shape
/// return a new table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TableParts")]
pub struct RawTable {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

/// Unchecked wire form; deserialization goes through `RawTable::new`
#[derive(Deserialize)]
struct TableParts {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl TryFrom<TableParts> for RawTable {
    type Error = ComputeError;

    fn try_from(parts: TableParts) -> Result<Self, Self::Error> {
        RawTable::new(parts.columns, parts.rows)
    }
}

impl RawTable {
    /// Create a table, rejecting rows whose width differs from the header
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self, ComputeError> {
        for (index, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(ComputeError::RaggedRow {
                    row: index,
                    expected: columns.len(),
                    found: row.len(),
                });
            }
        }
        Ok(Self { columns, rows })
    }

    /// Convenience constructor from string slices
    pub fn from_strs(columns: &[&str], rows: &[&[&str]]) -> Result<Self, ComputeError> {
        Self::new(
            columns.iter().map(|c| c.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Names from `required` that are not present, in `required` order
    pub fn missing_columns(&self, required: &[&str]) -> Vec<String> {
        required
            .iter()
            .filter(|c| !self.has_column(c))
            .map(|c| c.to_string())
            .collect()
    }

    /// Copy of this table without the named columns.
    ///
    /// Names that are not present are ignored.
    pub fn drop_columns(&self, names: &[String]) -> RawTable {
        let keep: Vec<usize> = (0..self.columns.len())
            .filter(|&i| !names.contains(&self.columns[i]))
            .collect();

        RawTable {
            columns: keep.iter().map(|&i| self.columns[i].clone()).collect(),
            rows: self
                .rows
                .iter()
                .map(|row| keep.iter().map(|&i| row[i].clone()).collect())
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> RawTable {
        RawTable::from_strs(
            &["student_id", "Gender", "grades"],
            &[&["1", "F", "88"], &["2", "M", "72"]],
        )
        .unwrap()
    }

    #[test]
    fn test_rejects_ragged_rows() {
        let result = RawTable::from_strs(&["a", "b"], &[&["1", "2"], &["3"]]);
        assert!(matches!(
            result,
            Err(ComputeError::RaggedRow {
                row: 1,
                expected: 2,
                found: 1
            })
        ));
    }

    #[test]
    fn test_drop_columns() {
        let table = sample();
        let cleaned = table.drop_columns(&["Gender".to_string()]);

        assert_eq!(cleaned.columns(), &["student_id".to_string(), "grades".to_string()]);
        assert_eq!(cleaned.rows()[1], vec!["2".to_string(), "72".to_string()]);
        // Input untouched
        assert_eq!(table.columns().len(), 3);
    }

    #[test]
    fn test_drop_columns_tolerates_absent_names() {
        let table = sample();
        let cleaned = table.drop_columns(&["zip".to_string()]);
        assert_eq!(cleaned, table);
    }

    #[test]
    fn test_missing_columns_preserves_order() {
        let table = sample();
        assert_eq!(
            table.missing_columns(&["week_date", "grades", "absences"]),
            vec!["week_date".to_string(), "absences".to_string()]
        );
    }

    #[test]
    fn test_deserialize_checks_row_width() {
        let ragged = r#"{"columns":["student_id","week_date","grades"],"rows":[["4","2024-02-05"]]}"#;
        let err = serde_json::from_str::<RawTable>(ragged).unwrap_err();
        assert!(err.to_string().contains("Row 0 has 2 cells, expected 3"));

        let table: RawTable = serde_json::from_str(&serde_json::to_string(&sample()).unwrap()).unwrap();
        assert_eq!(table, sample());
    }
}
