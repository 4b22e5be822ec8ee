//! Elements reconstructed from existing PDFs.

use super::{Block, Rect};
use serde::{Deserialize, Serialize};

/// What an extracted element was classified as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    Text,
    Image,
    Table,
}

/// A block recovered from a PDF content stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedElement {
    /// Page number (1-indexed)
    pub page: u32,

    /// Classification
    pub kind: ElementKind,

    /// Source rectangle in PDF user space (bottom-left origin)
    pub source: Rect,

    /// Classification confidence in [0, 1]
    pub confidence: f32,

    /// The reconstructed block, with its bounding box in page coordinates
    pub block: Block,
}

impl ExtractedElement {
    /// Create an element, deriving its kind from the block.
    pub fn new(page: u32, block: Block, source: Rect, confidence: f32) -> Self {
        let kind = match &block {
            Block::Text(_) => ElementKind::Text,
            Block::Image(_) => ElementKind::Image,
            Block::Table(_) => ElementKind::Table,
        };
        Self {
            page,
            kind,
            source,
            confidence: confidence.clamp(0.0, 1.0),
            block,
        }
    }
}
