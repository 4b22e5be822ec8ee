//! Table measurement.

use super::text::{break_lines, measuring_face, LineBox};
use crate::font::StandardFont;
use crate::model::{ResolvedStyle, StyleCascade, TableBlock, TableCell};

/// Inner padding on every side of a cell, in points.
pub const CELL_PADDING: f32 = 4.0;

/// Column widths and row heights of a table at a given width.
#[derive(Debug, Clone, PartialEq)]
pub struct TableGeometry {
    pub column_widths: Vec<f32>,
    pub row_heights: Vec<f32>,
}

impl TableGeometry {
    /// Total height of all rows.
    pub fn height(&self) -> f32 {
        self.row_heights.iter().sum()
    }

    /// Left edge of every column, starting at `origin`.
    pub fn column_offsets(&self, origin: f32) -> Vec<f32> {
        self.column_widths
            .iter()
            .scan(origin, |x, w| {
                let left = *x;
                *x += w;
                Some(left)
            })
            .collect()
    }
}

/// A wrapped cell ready to draw or measure.
#[derive(Debug, Clone)]
pub struct CellLayout {
    pub style: ResolvedStyle,
    pub face: StandardFont,
    pub lines: Vec<LineBox>,
}

impl CellLayout {
    /// Height of the cell including padding.
    pub fn height(&self) -> f32 {
        self.lines.len().max(1) as f32 * self.style.leading() + 2.0 * CELL_PADDING
    }
}

/// Wrap one cell inside a column.
pub fn layout_cell(
    cell: &TableCell,
    table_style: &ResolvedStyle,
    cascade: &StyleCascade,
    header: bool,
    column_width: f32,
) -> CellLayout {
    let style = cascade.cell(table_style, cell, header);
    let face = measuring_face(&style);
    let inner = (column_width - 2.0 * CELL_PADDING).max(1.0);
    let lines = break_lines(&cell.text, face, style.font_size, inner);
    CellLayout { style, face, lines }
}

fn column_widths(table: &TableBlock, width: f32) -> Vec<f32> {
    let columns = table.column_count().max(1);
    match &table.column_widths {
        Some(weights) if weights.len() == columns => {
            let total: f32 = weights.iter().sum();
            if total.is_finite() && total > 0.0 {
                return weights.iter().map(|w| w / total * width).collect();
            }
            log::warn!("Table column widths do not sum to a usable total, sharing width equally");
            vec![width / columns as f32; columns]
        }
        Some(weights) => {
            log::warn!(
                "Table declares {} column widths for {} columns, sharing width equally",
                weights.len(),
                columns
            );
            vec![width / columns as f32; columns]
        }
        None => vec![width / columns as f32; columns],
    }
}

/// Measure a table laid out `width` points wide.
pub fn measure(
    table: &TableBlock,
    style: &ResolvedStyle,
    cascade: &StyleCascade,
    width: f32,
) -> TableGeometry {
    let column_widths = column_widths(table, width);
    let empty_row = style.leading() + 2.0 * CELL_PADDING;

    let row_heights = table
        .rows
        .iter()
        .enumerate()
        .map(|(r, row)| {
            let header = table.is_header_row(r);
            row.cells
                .iter()
                .zip(&column_widths)
                .map(|(cell, &w)| layout_cell(cell, style, cascade, header, w).height())
                .fold(empty_row, f32::max)
        })
        .collect();

    TableGeometry {
        column_widths,
        row_heights,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::StyleAttributes;

    #[test]
    fn test_equal_columns() {
        let cascade = StyleCascade::new(&StyleAttributes::default());
        let table = TableBlock::from_rows([["a", "b", "c", "d"]]);
        let geometry = measure(&table, cascade.root(), &cascade, 400.0);
        assert_eq!(geometry.column_widths, vec![100.0; 4]);
        assert_eq!(geometry.column_offsets(10.0), vec![10.0, 110.0, 210.0, 310.0]);
    }

    #[test]
    fn test_weighted_columns() {
        let cascade = StyleCascade::new(&StyleAttributes::default());
        let mut table = TableBlock::from_rows([["a", "b"]]);
        table.column_widths = Some(vec![3.0, 1.0]);
        let geometry = measure(&table, cascade.root(), &cascade, 400.0);
        assert_eq!(geometry.column_widths, vec![300.0, 100.0]);
    }

    #[test]
    fn test_overflowing_weights_share_equally() {
        let cascade = StyleCascade::new(&StyleAttributes::default());
        let mut table = TableBlock::from_rows([["a", "b"]]);
        table.column_widths = Some(vec![f32::MAX, f32::MAX]);
        let geometry = measure(&table, cascade.root(), &cascade, 400.0);
        assert_eq!(geometry.column_widths, vec![200.0, 200.0]);
    }

    #[test]
    fn test_row_height_follows_tallest_cell() {
        let cascade = StyleCascade::new(&StyleAttributes::new().with_font_family("Courier"));
        let style = cascade.root().clone();
        // Nine characters of 11pt Courier need 59.4pt; a 48pt column wraps them.
        let table = TableBlock::from_rows([["short", "aaaa bbbb"]]);
        let geometry = measure(&table, &style, &cascade, 96.0);
        let single = style.leading() + 2.0 * CELL_PADDING;
        assert!((geometry.row_heights[0] - (single + style.leading())).abs() < 1e-3);
    }
}
