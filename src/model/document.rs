//! Document-level types.

use super::{Block, Page, PageConstraints, StyleAttributes};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A document: metadata, an unpaginated block flow, and (after layout or
/// extraction) its pages.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Document {
    /// Document metadata (title, author, etc.)
    pub metadata: Metadata,

    /// Default page size, margins and spacing
    pub page: PageConstraints,

    /// Document-wide style, the root of the cascade
    #[serde(default, skip_serializing_if = "StyleAttributes::is_empty")]
    pub style: StyleAttributes,

    /// Content in reading order, before pagination
    pub body: Vec<Block>,

    /// Laid-out pages; empty until layout
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pages: Vec<Page>,
}

impl Document {
    /// Create a new empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.metadata.title = Some(title.into());
        self
    }

    /// Set the page constraints.
    pub fn with_page(mut self, page: PageConstraints) -> Self {
        self.page = page;
        self
    }

    /// Append a block to the body.
    pub fn push(&mut self, block: impl Into<Block>) {
        self.body.push(block.into());
    }

    /// Get the number of laid-out pages.
    pub fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    /// Get a page by number (1-indexed).
    pub fn get_page(&self, page_num: u32) -> Option<&Page> {
        if page_num == 0 {
            return None;
        }
        self.pages.get((page_num - 1) as usize)
    }

    /// Whether every block on every page carries a bounding box.
    pub fn is_laid_out(&self) -> bool {
        !self.pages.is_empty()
            && self
                .pages
                .iter()
                .all(|p| p.blocks.iter().all(|b| b.bbox().is_some()))
    }

    /// Get plain text content of the body.
    pub fn plain_text(&self) -> String {
        self.body
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

/// Document metadata.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Metadata {
    /// Document title
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Document author
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    /// Document subject
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,

    /// Keywords
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords: Option<String>,

    /// Creator application
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,

    /// Creation date
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Margins, Rect, TextBlock};

    #[test]
    fn test_document_not_laid_out_initially() {
        let mut doc = Document::new().with_title("Report");
        doc.push(TextBlock::new("Body"));
        assert!(!doc.is_laid_out());
        assert_eq!(doc.page_count(), 0);
        assert!(doc.get_page(0).is_none());
    }

    #[test]
    fn test_document_laid_out_when_boxes_attached() {
        let mut doc = Document::new();
        let mut page = Page::new(1, 612.0, 792.0, Margins::default());
        page.blocks
            .push(Block::from(TextBlock::new("x")).placed(Rect::new(72.0, 72.0, 468.0, 13.2)));
        doc.pages.push(page);
        assert!(doc.is_laid_out());
        assert_eq!(doc.get_page(1).map(|p| p.number), Some(1));
    }
}
