//! Table types.

use super::{Rect, StyleAttributes};
use serde::{Deserialize, Serialize};

/// A grid of text cells.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TableBlock {
    /// Caller-assigned identifier used in error messages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Rows in the table
    pub rows: Vec<TableRow>,

    /// Number of header rows (0 = no header)
    #[serde(default)]
    pub header_rows: u8,

    /// Relative column widths; columns share the width equally when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column_widths: Option<Vec<f32>>,

    /// Style inherited by every cell
    #[serde(default, skip_serializing_if = "StyleAttributes::is_empty")]
    pub style: StyleAttributes,

    /// Position on the page, set by layout
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbox: Option<Rect>,
}

impl TableBlock {
    /// Create a new empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from rows of plain strings.
    pub fn from_rows<R, C>(rows: R) -> Self
    where
        R: IntoIterator<Item = C>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        Self {
            rows: rows
                .into_iter()
                .map(|row| TableRow::new(row.into_iter().map(TableCell::new).collect()))
                .collect(),
            ..Self::default()
        }
    }

    /// Set the number of header rows.
    pub fn with_header_rows(mut self, header_rows: u8) -> Self {
        self.header_rows = header_rows;
        self
    }

    /// Set the identifier.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Get the number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns (widest row).
    pub fn column_count(&self) -> usize {
        self.rows.iter().map(|r| r.cells.len()).max().unwrap_or(0)
    }

    /// Check if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Whether the row at `index` is a header row.
    pub fn is_header_row(&self, index: usize) -> bool {
        index < self.header_rows as usize
    }

    /// Get plain text representation of the table.
    pub fn plain_text(&self) -> String {
        self.rows
            .iter()
            .map(|row| row.plain_text())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A table row.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TableRow {
    /// Cells in the row
    pub cells: Vec<TableCell>,
}

impl TableRow {
    /// Create a row from cells.
    pub fn new(cells: Vec<TableCell>) -> Self {
        Self { cells }
    }

    /// Tab-separated cell text.
    pub fn plain_text(&self) -> String {
        self.cells
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join("\t")
    }
}

/// A table cell.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TableCell {
    /// Cell text
    pub text: String,

    /// Style overrides on top of the table style
    #[serde(default, skip_serializing_if = "StyleAttributes::is_empty")]
    pub style: StyleAttributes,
}

impl TableCell {
    /// Create a cell with text.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: StyleAttributes::default(),
        }
    }

    /// Set style overrides.
    pub fn with_style(mut self, style: StyleAttributes) -> Self {
        self.style = style;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rows() {
        let table = TableBlock::from_rows([["a", "b"], ["c", "d"]]).with_header_rows(1);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.column_count(), 2);
        assert!(table.is_header_row(0));
        assert!(!table.is_header_row(1));
        assert_eq!(table.plain_text(), "a\tb\nc\td");
    }

    #[test]
    fn test_column_count_uses_widest_row() {
        let table = TableBlock::from_rows(vec![vec!["a"], vec!["b", "c", "d"]]);
        assert_eq!(table.column_count(), 3);
    }
}
