//! Text blocks.

use super::{Rect, StyleAttributes};
use serde::{Deserialize, Serialize};

/// A run of flowing text, optionally a heading.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TextBlock {
    /// Caller-assigned identifier used in error messages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Text content; `\n` forces a line break
    pub text: String,

    /// Heading level (1-6), if this block is a heading
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading: Option<u8>,

    /// Style overrides
    #[serde(default, skip_serializing_if = "StyleAttributes::is_empty")]
    pub style: StyleAttributes,

    /// Position on the page, set by layout
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbox: Option<Rect>,
}

impl TextBlock {
    /// Create a new text block.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    /// Create a heading block.
    pub fn heading(level: u8, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            heading: Some(level.clamp(1, 6)),
            ..Default::default()
        }
    }

    /// Set the identifier.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set style overrides.
    pub fn with_style(mut self, style: StyleAttributes) -> Self {
        self.style = style;
        self
    }

    /// Whether this block is a heading.
    pub fn is_heading(&self) -> bool {
        self.heading.is_some()
    }
}
