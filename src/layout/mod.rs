//! Layout engine: pagination and block placement.
//!
//! Blocks of the document body flow top to bottom through the content box
//! of each page. A block that does not fit the space left is split (text at
//! a line boundary, tables at a row boundary) or, for images, moved whole to
//! the next page. Blocks are handled strictly in document order.

pub mod table;
pub mod text;

pub use table::{layout_cell, measure as measure_table, CellLayout, TableGeometry, CELL_PADDING};
pub use text::{break_lines, line_text, measuring_face, LineBox};

use crate::error::{Error, Result};
use crate::model::{
    Alignment, Block, Document, ImageBlock, Page, PageConstraints, Rect, StyleCascade,
    TableBlock, TextBlock, EPSILON,
};

/// Lay out `doc` on pages described by `constraints`.
///
/// The body is re-flowed from scratch, so laying out an already laid-out
/// document yields identical pages.
pub fn layout(doc: &Document, constraints: &PageConstraints) -> Result<Document> {
    let content = constraints.content_box();
    if !(content.width > 0.0 && content.height > 0.0) || !content.width.is_finite() {
        return Err(Error::layout(
            "page",
            format!(
                "margins leave no content area on a {}x{}pt page",
                constraints.size.width, constraints.size.height
            ),
        ));
    }

    let cascade = StyleCascade::new(&doc.style);
    let mut paginator = Paginator::new(constraints);

    for (index, block) in doc.body.iter().enumerate() {
        let label = block.label(|| format!("body[{}]", index));
        match block {
            Block::Text(text) => paginator.place_text(&label, block, text, &cascade)?,
            Block::Image(image) => paginator.place_image(&label, block, image, &cascade)?,
            Block::Table(table) => paginator.place_table(&label, block, table, &cascade)?,
        }
    }

    let pages = paginator.finish();
    log::debug!(
        "Laid out {} blocks on {} pages",
        doc.body.len(),
        pages.len()
    );

    let mut out = doc.clone();
    out.page = *constraints;
    out.pages = pages;
    Ok(out)
}

/// Lay out a document with its own page constraints.
pub fn layout_document(doc: &Document) -> Result<Document> {
    layout(doc, &doc.page)
}

/// Tracks the page being filled and the vertical cursor inside it.
struct Paginator {
    constraints: PageConstraints,
    content: Rect,
    pages: Vec<Page>,
    /// Height used on the current page, from the content top
    cursor: f32,
}

impl Paginator {
    fn new(constraints: &PageConstraints) -> Self {
        let mut paginator = Self {
            constraints: *constraints,
            content: constraints.content_box(),
            pages: Vec::new(),
            cursor: 0.0,
        };
        paginator.new_page();
        paginator
    }

    fn new_page(&mut self) {
        let number = self.pages.len() as u32 + 1;
        self.pages.push(Page::new(
            number,
            self.constraints.size.width,
            self.constraints.size.height,
            self.constraints.margins,
        ));
        self.cursor = 0.0;
    }

    fn current_is_empty(&self) -> bool {
        self.pages.last().map_or(true, |p| p.blocks.is_empty())
    }

    fn spacing(&self) -> f32 {
        if self.current_is_empty() {
            0.0
        } else {
            self.constraints.block_spacing
        }
    }

    /// Vertical space left for the next block.
    fn available(&self) -> f32 {
        self.content.height - self.cursor - self.spacing()
    }

    fn fits(&self, height: f32) -> bool {
        height <= self.available() + EPSILON
    }

    fn place(&mut self, block: &Block, x: f32, width: f32, height: f32) {
        let y = self.content.y + self.cursor + self.spacing();
        let placed = block.placed(Rect::new(x, y, width, height));
        self.cursor = y + height - self.content.y;
        if let Some(page) = self.pages.last_mut() {
            page.blocks.push(placed);
        }
    }

    fn place_text(
        &mut self,
        label: &str,
        block: &Block,
        text: &TextBlock,
        cascade: &StyleCascade,
    ) -> Result<()> {
        let style = cascade.block(block);
        let leading = style.leading();
        if leading > self.content.height + EPSILON {
            return Err(Error::layout(
                label,
                format!(
                    "line height {:.2}pt exceeds content height {:.2}pt",
                    leading, self.content.height
                ),
            ));
        }

        let face = measuring_face(&style);
        let lines = break_lines(&text.text, face, style.font_size, self.content.width);

        let mut first = 0;
        while first < lines.len() {
            let fit = ((self.available() + EPSILON) / leading).floor().max(0.0) as usize;
            if fit == 0 {
                self.new_page();
                continue;
            }

            let last = (first + fit).min(lines.len());
            let fragment = if first == 0 && last == lines.len() {
                block.clone()
            } else {
                log::debug!("Splitting {} after line {}", label, last);
                let mut part = text.clone();
                part.text = text.text[lines[first].start..lines[last - 1].end].to_string();
                Block::Text(part)
            };

            let height = (last - first) as f32 * leading;
            self.place(&fragment, self.content.x, self.content.width, height);

            first = last;
            if first < lines.len() {
                self.new_page();
            }
        }
        Ok(())
    }

    fn place_image(
        &mut self,
        label: &str,
        block: &Block,
        image: &ImageBlock,
        cascade: &StyleCascade,
    ) -> Result<()> {
        let (mut width, mut height) = (image.width, image.height);
        if width > self.content.width {
            height *= self.content.width / width;
            width = self.content.width;
        }
        if height > self.content.height + EPSILON {
            return Err(Error::layout(
                label,
                format!(
                    "image height {:.2}pt exceeds content height {:.2}pt",
                    height, self.content.height
                ),
            ));
        }

        if !self.fits(height) {
            log::debug!("Moving {} to page {}", label, self.pages.len() + 1);
            self.new_page();
        }

        let x = match cascade.block(block).alignment {
            Alignment::Center => self.content.x + (self.content.width - width) / 2.0,
            Alignment::Right => self.content.right() - width,
            Alignment::Left | Alignment::Justify => self.content.x,
        };
        self.place(block, x, width, height);
        Ok(())
    }

    fn place_table(
        &mut self,
        label: &str,
        block: &Block,
        table: &TableBlock,
        cascade: &StyleCascade,
    ) -> Result<()> {
        let style = cascade.block(block);
        let geometry = measure_table(table, &style, cascade, self.content.width);
        let heights = &geometry.row_heights;

        if let Some((row, height)) = heights
            .iter()
            .enumerate()
            .find(|(_, h)| **h > self.content.height + EPSILON)
        {
            return Err(Error::layout(
                label,
                format!(
                    "row {} height {:.2}pt exceeds content height {:.2}pt",
                    row, height, self.content.height
                ),
            ));
        }

        if heights.is_empty() {
            self.place(block, self.content.x, self.content.width, 0.0);
            return Ok(());
        }

        let mut first = 0;
        while first < heights.len() {
            let available = self.available();
            let mut used = 0.0;
            let mut last = first;
            while last < heights.len() && used + heights[last] <= available + EPSILON {
                used += heights[last];
                last += 1;
            }
            if last == first {
                self.new_page();
                continue;
            }

            let fragment = if first == 0 && last == heights.len() {
                block.clone()
            } else {
                log::debug!("Splitting {} after row {}", label, last);
                let mut part = table.clone();
                part.rows = table.rows[first..last].to_vec();
                part.header_rows = (table.header_rows as usize)
                    .saturating_sub(first)
                    .min(last - first) as u8;
                Block::Table(part)
            };
            self.place(&fragment, self.content.x, self.content.width, used);

            first = last;
            if first < heights.len() {
                self.new_page();
            }
        }
        Ok(())
    }

    fn finish(self) -> Vec<Page> {
        self.pages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Margins, PageSize, StyleAttributes};

    fn small_page() -> PageConstraints {
        // 100pt of content height.
        PageConstraints::new(PageSize::new(200.0, 140.0))
            .with_margins(Margins::all(20.0))
            .with_block_spacing(0.0)
    }

    fn courier(size: f32) -> StyleAttributes {
        StyleAttributes::new()
            .with_font_family("Courier")
            .with_font_size(size)
            .with_line_height(1.0)
    }

    #[test]
    fn test_single_block_at_top_margin() {
        let mut doc = Document::new();
        doc.push(TextBlock::new("A short paragraph."));
        let out = layout_document(&doc).unwrap();
        assert_eq!(out.pages.len(), 1);

        let bbox = out.pages[0].blocks[0].bbox().unwrap();
        let content = PageConstraints::default().content_box();
        assert_eq!(bbox.y, content.y);
        assert_eq!(bbox.x, content.x);
        assert_eq!(bbox.width, content.width);
    }

    #[test]
    fn test_body_untouched() {
        let mut doc = Document::new();
        doc.push(TextBlock::new("x"));
        let out = layout_document(&doc).unwrap();
        assert!(out.body[0].bbox().is_none());
    }

    #[test]
    fn test_empty_body_gives_one_page() {
        let out = layout_document(&Document::new()).unwrap();
        assert_eq!(out.pages.len(), 1);
        assert!(out.pages[0].is_empty());
    }

    #[test]
    fn test_zero_slack_stays_on_page() {
        let mut doc = Document::new();
        // Ten 10pt lines fill the 100pt content box exactly.
        doc.push(TextBlock::new(vec!["x"; 10].join("\n")).with_style(courier(10.0)));
        let out = layout(&doc, &small_page()).unwrap();
        assert_eq!(out.pages.len(), 1);
        assert_eq!(out.pages[0].blocks[0].bbox().unwrap().height, 100.0);
    }

    #[test]
    fn test_text_splits_at_line_boundary() {
        let mut doc = Document::new();
        doc.push(ImageBlock::new(50.0, 75.0));
        doc.push(TextBlock::new("l1\nl2\nl3\nl4").with_style(courier(10.0)));
        let out = layout(&doc, &small_page()).unwrap();
        assert_eq!(out.pages.len(), 2);

        let first = &out.pages[0].blocks[1];
        let second = &out.pages[1].blocks[0];
        match (first, second) {
            (Block::Text(a), Block::Text(b)) => {
                assert_eq!(a.text, "l1\nl2");
                assert_eq!(b.text, "l3\nl4");
            }
            other => panic!("unexpected blocks {:?}", other),
        }
        assert_eq!(first.bbox().unwrap().height, 20.0);
        assert_eq!(second.bbox().unwrap().y, 20.0);
    }

    #[test]
    fn test_image_moves_whole() {
        let mut doc = Document::new();
        doc.push(ImageBlock::new(50.0, 60.0));
        doc.push(ImageBlock::new(50.0, 60.0));
        let out = layout(&doc, &small_page()).unwrap();
        assert_eq!(out.pages.len(), 2);
        assert_eq!(out.pages[1].blocks[0].bbox().unwrap().y, 20.0);
    }

    #[test]
    fn test_wide_image_scaled_to_content_width() {
        let mut doc = Document::new();
        doc.push(ImageBlock::new(320.0, 80.0));
        let out = layout(&doc, &small_page()).unwrap();
        let bbox = out.pages[0].blocks[0].bbox().unwrap();
        assert_eq!(bbox.width, 160.0);
        assert_eq!(bbox.height, 40.0);
    }

    #[test]
    fn test_centered_image() {
        let mut doc = Document::new();
        let mut image = ImageBlock::new(60.0, 10.0);
        image.style = StyleAttributes::new().with_alignment(Alignment::Center);
        doc.push(image);
        let out = layout(&doc, &small_page()).unwrap();
        assert_eq!(out.pages[0].blocks[0].bbox().unwrap().x, 70.0);
    }

    #[test]
    fn test_tall_image_is_layout_error() {
        let mut doc = Document::new();
        doc.push(ImageBlock::new(50.0, 101.0).with_id("hero"));
        let err = layout(&doc, &small_page()).unwrap_err();
        match err {
            Error::Layout { block, .. } => assert_eq!(block, "hero"),
            other => panic!("expected layout error, got {:?}", other),
        }
    }

    #[test]
    fn test_tall_line_is_layout_error() {
        let mut doc = Document::new();
        doc.push(TextBlock::new("big").with_style(courier(120.0)));
        let err = layout(&doc, &small_page()).unwrap_err();
        assert!(matches!(err, Error::Layout { ref block, .. } if block == "body[0]"));
    }

    #[test]
    fn test_tall_table_row_is_layout_error() {
        let mut doc = Document::new();
        let tall_cell = vec!["line"; 12].join("\n");
        let mut table = TableBlock::from_rows(vec![vec!["head".to_string()], vec![tall_cell]])
            .with_header_rows(1)
            .with_id("ledger");
        table.style = courier(10.0);
        doc.push(table);
        let err = layout(&doc, &small_page()).unwrap_err();
        match err {
            Error::Layout { block, reason } => {
                assert_eq!(block, "ledger");
                assert!(reason.starts_with("row 1 "), "{}", reason);
            }
            other => panic!("expected layout error, got {:?}", other),
        }
    }

    #[test]
    fn test_table_splits_at_row_boundary() {
        let mut doc = Document::new();
        let rows: Vec<Vec<String>> = (0..8).map(|i| vec![format!("r{}", i)]).collect();
        let mut table = TableBlock::from_rows(rows).with_header_rows(1);
        // Each row: 10pt text + 8pt padding = 18pt, five rows fit in 100pt.
        table.style = courier(10.0);
        doc.push(table);
        let out = layout(&doc, &small_page()).unwrap();
        assert_eq!(out.pages.len(), 2);

        match (&out.pages[0].blocks[0], &out.pages[1].blocks[0]) {
            (Block::Table(a), Block::Table(b)) => {
                assert_eq!(a.rows.len(), 5);
                assert_eq!(a.header_rows, 1);
                assert_eq!(b.rows.len(), 3);
                assert_eq!(b.header_rows, 0);
            }
            other => panic!("unexpected blocks {:?}", other),
        }
    }

    #[test]
    fn test_blocks_do_not_overlap() {
        let mut doc = Document::new();
        for i in 0..12 {
            doc.push(TextBlock::new(format!("Paragraph {}", i)));
        }
        let constraints = PageConstraints::new(PageSize::A5).with_margins(Margins::all(40.0));
        let out = layout(&doc, &constraints).unwrap();
        for page in &out.pages {
            let content = page.content_box();
            let boxes: Vec<Rect> = page.blocks.iter().filter_map(Block::bbox).collect();
            for (i, a) in boxes.iter().enumerate() {
                assert!(content.contains(a));
                for b in &boxes[i + 1..] {
                    assert!(!a.intersects(b));
                }
            }
        }
    }

    #[test]
    fn test_no_content_area() {
        let constraints = PageConstraints::new(PageSize::new(100.0, 100.0)).with_margins(Margins::all(60.0));
        let err = layout(&Document::new(), &constraints).unwrap_err();
        assert!(matches!(err, Error::Layout { .. }));
    }
}
