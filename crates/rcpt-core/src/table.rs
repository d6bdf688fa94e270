//! Ordered result table built from heterogeneous rows.

use std::collections::HashMap;

use crate::models::record::ResultRow;

/// Rows of string cells under a header that is the union of all keys seen.
///
/// Columns appear in the order their key was first seen. Cells missing from
/// a row read as empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultTable {
    columns: Vec<String>,
    index: HashMap<String, usize>,
    rows: Vec<Vec<String>>,
}

impl ResultTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from batch output rows.
    pub fn from_rows(rows: &[ResultRow]) -> Self {
        let mut table = Self::new();
        for row in rows {
            table.push_record(row.cells());
        }
        table
    }

    /// Append one record given as `(column, value)` pairs.
    ///
    /// Unknown columns are added at the end of the header. A repeated key
    /// keeps its last value.
    pub fn push_record<K, V, I>(&mut self, cells: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut row = vec![String::new(); self.columns.len()];
        for (key, value) in cells {
            let column = self.column_index(key.as_ref());
            if column >= row.len() {
                row.resize(column + 1, String::new());
            }
            row[column] = value.into();
        }
        self.rows.push(row);
    }

    fn column_index(&mut self, key: &str) -> usize {
        if let Some(&i) = self.index.get(key) {
            return i;
        }
        let i = self.columns.len();
        self.columns.push(key.to_string());
        self.index.insert(key.to_string(), i);
        i
    }

    /// Header, in first-seen order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cells of every row, padded to the full header width.
    pub fn rows(&self) -> impl Iterator<Item = Vec<&str>> + '_ {
        self.rows.iter().map(|row| {
            (0..self.columns.len())
                .map(|i| row.get(i).map(String::as_str).unwrap_or(""))
                .collect()
        })
    }

    /// Rows as `(column, value)` pairs in header order.
    pub fn records(&self) -> impl Iterator<Item = Vec<(&str, &str)>> + '_ {
        self.rows().map(|cells| {
            self.columns
                .iter()
                .map(String::as_str)
                .zip(cells)
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::record::{ExtractedReceipt, FLAT_FIELDS, FlatRecord};
    use pretty_assertions::assert_eq;

    fn record(filename: &str, amount: &str) -> ResultRow {
        let receipt = ExtractedReceipt {
            amount: amount.to_string(),
            ..Default::default()
        };
        ResultRow::Record(FlatRecord::from_receipt(&receipt, filename))
    }

    #[test]
    fn test_records_only_use_fixed_header() {
        let table = ResultTable::from_rows(&[record("a.png", "1"), record("b.png", "2")]);

        assert_eq!(table.columns(), FLAT_FIELDS.map(String::from).as_slice());
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_header_is_union_in_first_seen_order() {
        let rows = vec![
            ResultRow::error("bad.pdf", "Processing failed"),
            record("good.png", "9,99"),
        ];
        let table = ResultTable::from_rows(&rows);

        let mut expected = vec!["filename".to_string(), "error".to_string()];
        expected.extend(
            FLAT_FIELDS
                .iter()
                .filter(|f| **f != "filename")
                .map(|f| f.to_string()),
        );
        assert_eq!(table.columns(), expected.as_slice());

        let cells: Vec<Vec<&str>> = table.rows().collect();
        assert_eq!(cells[0][0], "bad.pdf");
        assert_eq!(cells[0][1], "Processing failed");
        assert!(cells[0][2..].iter().all(|c| c.is_empty()));
        assert_eq!(cells[1][0], "good.png");
        assert_eq!(cells[1][1], "");
        assert_eq!(cells[1].len(), expected.len());
    }

    #[test]
    fn test_push_record_pads_and_overwrites() {
        let mut table = ResultTable::new();
        table.push_record([("a", "1")]);
        table.push_record([("b", "2"), ("a", "3"), ("b", "4")]);

        assert_eq!(table.columns(), ["a".to_string(), "b".to_string()].as_slice());
        let cells: Vec<Vec<&str>> = table.rows().collect();
        assert_eq!(cells, vec![vec!["1", ""], vec!["3", "4"]]);
    }

    #[test]
    fn test_records_pair_cells_with_columns() {
        let mut table = ResultTable::new();
        table.push_record([("filename", "x.png"), ("error", "boom")]);

        let records: Vec<_> = table.records().collect();
        assert_eq!(records, vec![vec![("filename", "x.png"), ("error", "boom")]]);
    }

    #[test]
    fn test_empty_table() {
        let table = ResultTable::from_rows(&[]);
        assert!(table.is_empty());
        assert!(table.columns().is_empty());
        assert_eq!(table.rows().count(), 0);
    }
}
