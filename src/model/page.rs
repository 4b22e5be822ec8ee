//! Page-level types.

use super::{ImageBlock, Margins, Rect, StyleAttributes, TableBlock, TextBlock};
use serde::{Deserialize, Serialize};

/// A single page produced by layout or extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// Page number (1-indexed)
    pub number: u32,

    /// Page width in points (1 point = 1/72 inch)
    pub width: f32,

    /// Page height in points
    pub height: f32,

    /// Margins around the content area
    pub margins: Margins,

    /// Content blocks on the page, top to bottom
    pub blocks: Vec<Block>,
}

impl Page {
    /// Create a new empty page.
    pub fn new(number: u32, width: f32, height: f32, margins: Margins) -> Self {
        Self {
            number,
            width,
            height,
            margins,
            blocks: Vec::new(),
        }
    }

    /// The area inside the margins.
    pub fn content_box(&self) -> Rect {
        Rect::new(
            self.margins.left,
            self.margins.top,
            self.width - self.margins.left - self.margins.right,
            self.height - self.margins.top - self.margins.bottom,
        )
    }

    /// Check if the page is empty (no content blocks).
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Get plain text content of the page.
    pub fn plain_text(&self) -> String {
        self.blocks
            .iter()
            .filter_map(|block| match block {
                Block::Text(t) => Some(t.text.clone()),
                Block::Table(t) => Some(t.plain_text()),
                Block::Image(_) => None,
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// A content block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    /// Flowing text or a heading
    Text(TextBlock),

    /// A raster image
    Image(ImageBlock),

    /// A table
    Table(TableBlock),
}

impl Block {
    /// Block kind keyword.
    pub fn kind(&self) -> &'static str {
        match self {
            Block::Text(_) => "text",
            Block::Image(_) => "image",
            Block::Table(_) => "table",
        }
    }

    /// Caller-assigned identifier.
    pub fn id(&self) -> Option<&str> {
        match self {
            Block::Text(b) => b.id.as_deref(),
            Block::Image(b) => b.id.as_deref(),
            Block::Table(b) => b.id.as_deref(),
        }
    }

    /// Style overrides.
    pub fn style(&self) -> &StyleAttributes {
        match self {
            Block::Text(b) => &b.style,
            Block::Image(b) => &b.style,
            Block::Table(b) => &b.style,
        }
    }

    /// Bounding box, present after layout.
    pub fn bbox(&self) -> Option<Rect> {
        match self {
            Block::Text(b) => b.bbox,
            Block::Image(b) => b.bbox,
            Block::Table(b) => b.bbox,
        }
    }

    /// Attach a bounding box.
    pub fn set_bbox(&mut self, bbox: Rect) {
        match self {
            Block::Text(b) => b.bbox = Some(bbox),
            Block::Image(b) => b.bbox = Some(bbox),
            Block::Table(b) => b.bbox = Some(bbox),
        }
    }

    /// A copy of this block with the bounding box attached.
    pub fn placed(&self, bbox: Rect) -> Block {
        let mut block = self.clone();
        block.set_bbox(bbox);
        block
    }

    /// Human-readable label: the id when present, otherwise `fallback`.
    pub fn label(&self, fallback: impl FnOnce() -> String) -> String {
        self.id().map(str::to_string).unwrap_or_else(fallback)
    }

    /// Check if this block is text.
    pub fn is_text(&self) -> bool {
        matches!(self, Block::Text(_))
    }

    /// Check if this block is a table.
    pub fn is_table(&self) -> bool {
        matches!(self, Block::Table(_))
    }

    /// Check if this block is an image.
    pub fn is_image(&self) -> bool {
        matches!(self, Block::Image(_))
    }
}

impl From<TextBlock> for Block {
    fn from(block: TextBlock) -> Self {
        Block::Text(block)
    }
}

impl From<ImageBlock> for Block {
    fn from(block: ImageBlock) -> Self {
        Block::Image(block)
    }
}

impl From<TableBlock> for Block {
    fn from(block: TableBlock) -> Self {
        Block::Table(block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_bbox_absent_until_placed() {
        let block: Block = TextBlock::new("Hello").into();
        assert!(block.bbox().is_none());

        let placed = block.placed(Rect::new(72.0, 72.0, 100.0, 13.2));
        assert_eq!(placed.bbox(), Some(Rect::new(72.0, 72.0, 100.0, 13.2)));
        assert!(block.bbox().is_none());
    }

    #[test]
    fn test_block_label() {
        let block: Block = TextBlock::new("x").with_id("intro").into();
        assert_eq!(block.label(|| "body[0]".to_string()), "intro");

        let block: Block = ImageBlock::new(10.0, 10.0).into();
        assert_eq!(block.label(|| "body[3]".to_string()), "body[3]");
    }

    #[test]
    fn test_page_plain_text() {
        let mut page = Page::new(1, 612.0, 792.0, Margins::default());
        page.blocks.push(TextBlock::new("Intro").into());
        page.blocks.push(TableBlock::from_rows([["a", "b"]]).into());
        page.blocks.push(ImageBlock::new(10.0, 10.0).into());
        assert_eq!(page.plain_text(), "Intro\n\na\tb");
    }
}
