//! Table reconstruction.
//!
//! Two detectors run in turn. Ruled grids come from stroked rules that form
//! at least two rows and two columns; runs whose centre falls in a cell
//! become its text. Text left over is then searched for column-aligned rows
//! (stream mode), which is less reliable and scores lower.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

use super::cluster::group_into_lines;
use super::interpreter::{Rule, TextRun};
use crate::model::{Rect, TableBlock, TableCell, TableRow};

/// Confidence of a fully populated ruled grid.
const RULED_CONFIDENCE: f32 = 0.9;

/// Confidence of a column-aligned table.
const STREAM_CONFIDENCE: f32 = 0.6;

/// Rules closer than this are merged into one grid line.
const GRID_SNAP: f32 = 1.0;

/// Rules whose ends are this close belong to the same grid.
const GRID_JOIN: f32 = 1.5;

/// A table found on a page.
#[derive(Debug, Clone)]
pub struct DetectedTable {
    /// Extent in user space
    pub rect: Rect,
    pub table: TableBlock,
    pub confidence: f32,
    /// Indices of the runs that became cell text
    pub runs: BTreeSet<usize>,
}

fn by_f32(a: &f32, b: &f32) -> Ordering {
    a.partial_cmp(b).unwrap_or(Ordering::Equal)
}

/// Sorted values with near-duplicates merged.
fn snap(mut values: Vec<f32>) -> Vec<f32> {
    values.sort_by(by_f32);
    let mut out: Vec<f32> = Vec::new();
    for v in values {
        match out.last() {
            Some(last) if v - last <= GRID_SNAP => {}
            _ => out.push(v),
        }
    }
    out
}

fn touches(a: &Rule, b: &Rule) -> bool {
    a.x0 - GRID_JOIN <= b.x1 && b.x0 - GRID_JOIN <= a.x1 && a.y0 - GRID_JOIN <= b.y1 && b.y0 - GRID_JOIN <= a.y1
}

/// Split rules into connected groups.
fn connected_groups(rules: &[Rule]) -> Vec<Vec<Rule>> {
    let mut parent: Vec<usize> = (0..rules.len()).collect();
    fn root(parent: &mut [usize], mut i: usize) -> usize {
        while parent[i] != i {
            parent[i] = parent[parent[i]];
            i = parent[i];
        }
        i
    }
    for i in 0..rules.len() {
        for j in i + 1..rules.len() {
            if touches(&rules[i], &rules[j]) {
                let (a, b) = (root(&mut parent, i), root(&mut parent, j));
                parent[a] = b;
            }
        }
    }

    let mut groups: HashMap<usize, Vec<Rule>> = HashMap::new();
    for (i, rule) in rules.iter().enumerate() {
        groups.entry(root(&mut parent, i)).or_default().push(*rule);
    }
    let mut groups: Vec<Vec<Rule>> = groups.into_values().collect();
    groups.sort_by(|a, b| by_f32(&b[0].y1, &a[0].y1));
    groups
}

/// Join the text of runs as lines, top to bottom.
fn cell_text(runs: &[TextRun], members: &[usize]) -> String {
    let selected = members.iter().map(|&i| runs[i].clone()).collect();
    group_into_lines(selected)
        .iter()
        .map(|l| l.text())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// First row all bold reads as a header.
fn header_rows(runs: &[TextRun], first_row: &[Vec<usize>], row_count: usize) -> u8 {
    let members: Vec<&TextRun> = first_row.iter().flatten().map(|&i| &runs[i]).collect();
    u8::from(row_count > 1 && !members.is_empty() && members.iter().all(|r| r.bold))
}

/// Find ruled grids and fill them with the runs they enclose.
pub fn detect_ruled(runs: &[TextRun], rules: &[Rule]) -> Vec<DetectedTable> {
    let mut tables = Vec::new();
    let mut taken: BTreeSet<usize> = BTreeSet::new();

    for group in connected_groups(rules) {
        let ys = snap(group.iter().filter(|r| r.is_horizontal()).map(|r| r.y0).collect());
        let xs = snap(group.iter().filter(|r| r.is_vertical()).map(|r| r.x0).collect());
        if ys.len() < 3 || xs.len() < 3 {
            continue;
        }
        // Rows top to bottom.
        let ys: Vec<f32> = ys.into_iter().rev().collect();
        let (rows, cols) = (ys.len() - 1, xs.len() - 1);
        let (left, right, top, bottom) = (xs[0], xs[cols], ys[0], ys[rows]);

        let mut cells: Vec<Vec<Vec<usize>>> = vec![vec![Vec::new(); cols]; rows];
        let mut members = BTreeSet::new();
        for (i, run) in runs.iter().enumerate() {
            if run.degraded || taken.contains(&i) {
                continue;
            }
            let cx = run.x + run.width / 2.0;
            let cy = (run.top() + run.bottom()) / 2.0;
            if cx < left || cx > right || cy > top || cy < bottom {
                continue;
            }
            let row = ys.windows(2).position(|w| cy <= w[0] && cy >= w[1]);
            let col = xs.windows(2).position(|w| cx >= w[0] && cx <= w[1]);
            if let (Some(row), Some(col)) = (row, col) {
                cells[row][col].push(i);
                members.insert(i);
            }
        }

        let empty = cells.iter().flatten().filter(|c| c.is_empty()).count();
        let mut table = TableBlock::new();
        table.header_rows = header_rows(runs, &cells[0], rows);
        table.column_widths = Some(xs.windows(2).map(|w| w[1] - w[0]).collect());
        table.rows = cells
            .iter()
            .map(|row| TableRow::new(row.iter().map(|m| TableCell::new(cell_text(runs, m))).collect()))
            .collect();

        let confidence = RULED_CONFIDENCE - 0.3 * empty as f32 / (rows * cols) as f32;
        log::debug!(
            "Ruled grid {}x{} at ({:.1}, {:.1}), {} empty cells",
            rows,
            cols,
            left,
            bottom,
            empty
        );
        taken.extend(members.iter().copied());
        tables.push(DetectedTable {
            rect: Rect::new(left, bottom, right - left, top - bottom),
            table,
            confidence,
            runs: members,
        });
    }
    tables
}

/// Stream-mode detector configuration.
#[derive(Debug, Clone)]
pub struct TableDetectorConfig {
    /// Minimum rows to consider a table
    pub min_rows: usize,
    /// Minimum columns to consider a table
    pub min_columns: usize,
    /// Maximum columns; more usually means words were split apart
    pub max_columns: usize,
    /// Row grouping tolerance as a fraction of font size
    pub y_tolerance_factor: f32,
    /// Minimum share of runs aligned with a column edge
    pub min_alignment_ratio: f32,
    /// Minimum gap between column edges in points
    pub min_column_gap: f32,
}

impl Default for TableDetectorConfig {
    fn default() -> Self {
        Self {
            min_rows: 2,
            min_columns: 2,
            max_columns: 6,
            y_tolerance_factor: 0.4,
            min_alignment_ratio: 0.3,
            min_column_gap: 15.0,
        }
    }
}

#[derive(Debug, Clone)]
struct RowData {
    y: f32,
    /// Run indices sorted by x
    members: Vec<usize>,
}

/// Detects tables from column-aligned text without rules.
#[derive(Debug, Clone, Default)]
pub struct TableDetector {
    config: TableDetectorConfig,
}

impl TableDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: TableDetectorConfig) -> Self {
        Self { config }
    }

    /// Detect tables among the runs at `candidates`.
    pub fn detect(&self, runs: &[TextRun], candidates: &[usize]) -> Vec<DetectedTable> {
        if candidates.len() < self.config.min_rows * self.config.min_columns {
            return vec![];
        }
        let rows = self.group_into_rows(runs, candidates);
        let columns = self.detect_columns(runs, &rows);
        if rows.len() < self.config.min_rows || columns.len() < self.config.min_columns {
            return vec![];
        }

        let mut tables = Vec::new();
        for (start, end) in self.find_table_regions(runs, &rows, &columns) {
            let region = &rows[start..=end];
            let columns = self.detect_columns(runs, region);
            if columns.len() < self.config.min_columns {
                continue;
            }
            if columns.len() > self.config.max_columns {
                log::debug!("Skipping aligned region with {} columns", columns.len());
                continue;
            }
            if self.is_list_pattern(runs, region, &columns) {
                log::debug!("Skipping aligned region that reads as a list");
                continue;
            }
            tables.push(self.to_table(runs, region, &columns));
        }
        tables
    }

    fn group_into_rows(&self, runs: &[TextRun], candidates: &[usize]) -> Vec<RowData> {
        let mut sorted = candidates.to_vec();
        sorted.sort_by(|&a, &b| by_f32(&runs[b].y, &runs[a].y).then(by_f32(&runs[a].x, &runs[b].x)));

        let mut rows: Vec<RowData> = Vec::new();
        for i in sorted {
            let tolerance = runs[i].font_size * self.config.y_tolerance_factor;
            match rows.last_mut() {
                Some(row) if (runs[i].y - row.y).abs() <= tolerance => row.members.push(i),
                _ => rows.push(RowData {
                    y: runs[i].y,
                    members: vec![i],
                }),
            }
        }
        for row in &mut rows {
            row.members.sort_by(|&a, &b| by_f32(&runs[a].x, &runs[b].x));
        }
        rows
    }

    /// Left edges shared by enough multi-run rows.
    fn detect_columns(&self, runs: &[TextRun], rows: &[RowData]) -> Vec<f32> {
        let multi: Vec<&RowData> = rows.iter().filter(|r| r.members.len() >= 2).collect();
        if multi.len() < self.config.min_rows {
            return vec![];
        }

        let bucket_size = 5.0;
        let mut edge_counts: HashMap<i32, usize> = HashMap::new();
        for row in &multi {
            let buckets: BTreeSet<i32> = row
                .members
                .iter()
                .map(|&i| (runs[i].x / bucket_size).round() as i32)
                .collect();
            for bucket in buckets {
                *edge_counts.entry(bucket).or_insert(0) += 1;
            }
        }

        let min_occurrences = ((multi.len() as f32 * self.config.min_alignment_ratio) as usize).max(2);
        let mut edges: Vec<f32> = edge_counts
            .into_iter()
            .filter(|(_, count)| *count >= min_occurrences)
            .map(|(bucket, _)| bucket as f32 * bucket_size)
            .collect();
        edges.sort_by(by_f32);

        let mut merged: Vec<f32> = Vec::new();
        for edge in edges {
            if merged.last().map_or(true, |last| edge - last >= self.config.min_column_gap) {
                merged.push(edge);
            }
        }
        merged
    }

    fn alignment_score(&self, runs: &[TextRun], row: &RowData, columns: &[f32]) -> f32 {
        if row.members.len() < 2 {
            return 0.0;
        }
        let aligned = row
            .members
            .iter()
            .filter(|&&i| columns.iter().any(|c| (runs[i].x - c).abs() <= 5.0))
            .count();
        aligned as f32 / row.members.len() as f32
    }

    fn find_table_regions(&self, runs: &[TextRun], rows: &[RowData], columns: &[f32]) -> Vec<(usize, usize)> {
        let mut regions = Vec::new();
        let mut start: Option<usize> = None;
        for (i, row) in rows.iter().enumerate() {
            if self.alignment_score(runs, row, columns) >= self.config.min_alignment_ratio {
                start.get_or_insert(i);
            } else if let Some(s) = start.take() {
                if i - s >= self.config.min_rows {
                    regions.push((s, i - 1));
                }
            }
        }
        if let Some(s) = start {
            if rows.len() - s >= self.config.min_rows {
                regions.push((s, rows.len() - 1));
            }
        }
        regions
    }

    fn is_list_pattern(&self, runs: &[TextRun], rows: &[RowData], columns: &[f32]) -> bool {
        let mut bullets = 0;
        let mut numbers = 0;
        for row in rows {
            if let Some(&first) = row.members.first() {
                let text = runs[first].text.trim();
                if is_bullet_marker(text) {
                    bullets += 1;
                } else if is_number_marker(text) {
                    numbers += 1;
                }
            }
        }
        let bullet_ratio = bullets as f32 / rows.len() as f32;
        let marker_ratio = (bullets + numbers) as f32 / rows.len() as f32;
        bullet_ratio >= 0.5 || (columns.len() == 2 && marker_ratio >= 0.5)
    }

    fn column_for(x: f32, columns: &[f32]) -> usize {
        columns
            .iter()
            .rposition(|&c| x >= c - 10.0)
            .unwrap_or(0)
    }

    fn to_table(&self, runs: &[TextRun], rows: &[RowData], columns: &[f32]) -> DetectedTable {
        let members: BTreeSet<usize> = rows.iter().flat_map(|r| r.members.iter().copied()).collect();
        let left = members.iter().map(|&i| runs[i].x).fold(f32::MAX, f32::min);
        let right = members.iter().map(|&i| runs[i].right()).fold(f32::MIN, f32::max);
        let top = members.iter().map(|&i| runs[i].top()).fold(f32::MIN, f32::max);
        let bottom = members.iter().map(|&i| runs[i].bottom()).fold(f32::MAX, f32::min);

        let cells: Vec<Vec<Vec<usize>>> = rows
            .iter()
            .map(|row| {
                let mut cells = vec![Vec::new(); columns.len()];
                for &i in &row.members {
                    cells[Self::column_for(runs[i].x, columns)].push(i);
                }
                cells
            })
            .collect();

        let mut table = TableBlock::new();
        table.header_rows = header_rows(runs, &cells[0], rows.len());
        table.column_widths = Some(
            columns
                .iter()
                .enumerate()
                .map(|(i, c)| columns.get(i + 1).copied().unwrap_or(right) - c)
                .collect(),
        );
        table.rows = cells
            .iter()
            .map(|row| TableRow::new(row.iter().map(|m| TableCell::new(cell_text(runs, m))).collect()))
            .collect();

        DetectedTable {
            rect: Rect::new(left, bottom, right - left, top - bottom),
            table,
            confidence: STREAM_CONFIDENCE,
            runs: members,
        }
    }
}

fn is_bullet_marker(text: &str) -> bool {
    matches!(
        text.trim(),
        "-" | "–" | "—" | "•" | "·" | "*" | "○" | "▪" | "◦" | "▸" | "►" | "■" | "●" | "□" | "◆" | "▶" | "➤"
    )
}

fn is_number_marker(text: &str) -> bool {
    let cleaned: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    if cleaned.is_empty() {
        return false;
    }
    if cleaned.parse::<u32>().is_ok() {
        return true;
    }
    if let Some(pos) = cleaned.find(|c: char| !c.is_ascii_digit()) {
        let (prefix, suffix) = cleaned.split_at(pos);
        if !prefix.is_empty() && (suffix == "." || suffix == ")") {
            return true;
        }
    }
    let chars: Vec<char> = cleaned.chars().collect();
    chars.len() == 2 && chars[0].is_alphabetic() && (chars[1] == '.' || chars[1] == ')')
}
