//! Style attributes and the resolution pass that flattens them.
//!
//! Styles cascade document → heading preset → block → table cell. Every
//! attribute a renderer needs is present on [`ResolvedStyle`], so nothing is
//! looked up through parent chains at draw time.

use super::{Block, TableCell};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Horizontal text alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    /// Left alignment (default)
    #[default]
    Left,
    /// Center alignment
    Center,
    /// Right alignment
    Right,
    /// Justified alignment
    Justify,
}

impl Alignment {
    /// Keyword used in structured documents.
    pub fn as_str(&self) -> &'static str {
        match self {
            Alignment::Left => "left",
            Alignment::Center => "center",
            Alignment::Right => "right",
            Alignment::Justify => "justify",
        }
    }
}

impl FromStr for Alignment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "left" => Ok(Alignment::Left),
            "center" => Ok(Alignment::Center),
            "right" => Ok(Alignment::Right),
            "justify" => Ok(Alignment::Justify),
            other => Err(format!("unknown alignment '{}'", other)),
        }
    }
}

/// An sRGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Colour {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Colour {
    pub const BLACK: Colour = Colour::rgb(0, 0, 0);
    pub const WHITE: Colour = Colour::rgb(255, 255, 255);

    /// Create a colour from 8-bit channels.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Create a colour from PDF-style unit channels, clamping to [0, 1].
    pub fn from_unit(r: f32, g: f32, b: f32) -> Self {
        let channel = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        Self::rgb(channel(r), channel(g), channel(b))
    }

    /// Channels scaled to [0, 1] for `rg` operators.
    pub fn to_unit(&self) -> (f32, f32, f32) {
        (
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
        )
    }
}

impl fmt::Display for Colour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl FromStr for Colour {
    type Err = String;

    /// Parse `#rrggbb`, `#rgb`, or one of a few colour names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "black" => return Ok(Colour::BLACK),
            "white" => return Ok(Colour::WHITE),
            "red" => return Ok(Colour::rgb(255, 0, 0)),
            "green" => return Ok(Colour::rgb(0, 128, 0)),
            "blue" => return Ok(Colour::rgb(0, 0, 255)),
            "gray" | "grey" => return Ok(Colour::rgb(128, 128, 128)),
            _ => {}
        }

        let hex = s
            .strip_prefix('#')
            .ok_or_else(|| format!("colour '{}' must start with '#'", s))?;
        let digits: Vec<u8> = hex
            .chars()
            .map(|c| c.to_digit(16).map(|d| d as u8))
            .collect::<Option<_>>()
            .ok_or_else(|| format!("colour '{}' is not hexadecimal", s))?;

        match digits.as_slice() {
            [r, g, b] => Ok(Colour::rgb(r * 17, g * 17, b * 17)),
            [r1, r2, g1, g2, b1, b2] => Ok(Colour::rgb(r1 * 16 + r2, g1 * 16 + g2, b1 * 16 + b2)),
            _ => Err(format!("colour '{}' must have 3 or 6 hex digits", s)),
        }
    }
}

/// Partial style: every attribute is optional and falls back to the parent.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StyleAttributes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<Colour>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alignment: Option<Alignment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub italic: Option<bool>,
    /// Line height as a multiple of the font size
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_height: Option<f32>,
}

impl StyleAttributes {
    /// Create an empty style.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the font family.
    pub fn with_font_family(mut self, family: impl Into<String>) -> Self {
        self.font_family = Some(family.into());
        self
    }

    /// Set the font size in points.
    pub fn with_font_size(mut self, size: f32) -> Self {
        self.font_size = Some(size);
        self
    }

    /// Set the text colour.
    pub fn with_color(mut self, color: Colour) -> Self {
        self.color = Some(color);
        self
    }

    /// Set the alignment.
    pub fn with_alignment(mut self, alignment: Alignment) -> Self {
        self.alignment = Some(alignment);
        self
    }

    /// Set bold.
    pub fn with_bold(mut self, bold: bool) -> Self {
        self.bold = Some(bold);
        self
    }

    /// Set italic.
    pub fn with_italic(mut self, italic: bool) -> Self {
        self.italic = Some(italic);
        self
    }

    /// Set the line height factor.
    pub fn with_line_height(mut self, factor: f32) -> Self {
        self.line_height = Some(factor);
        self
    }

    /// Whether no attribute is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Overlay these attributes on a resolved parent.
    pub fn resolve(&self, parent: &ResolvedStyle) -> ResolvedStyle {
        ResolvedStyle {
            font_family: self
                .font_family
                .clone()
                .unwrap_or_else(|| parent.font_family.clone()),
            font_size: self.font_size.unwrap_or(parent.font_size),
            color: self.color.unwrap_or(parent.color),
            alignment: self.alignment.unwrap_or(parent.alignment),
            bold: self.bold.unwrap_or(parent.bold),
            italic: self.italic.unwrap_or(parent.italic),
            line_height: self.line_height.unwrap_or(parent.line_height),
        }
    }
}

/// Fully resolved style with no missing attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedStyle {
    pub font_family: String,
    pub font_size: f32,
    pub color: Colour,
    pub alignment: Alignment,
    pub bold: bool,
    pub italic: bool,
    pub line_height: f32,
}

impl ResolvedStyle {
    /// Distance between consecutive baselines.
    pub fn leading(&self) -> f32 {
        self.font_size * self.line_height
    }
}

impl Default for ResolvedStyle {
    fn default() -> Self {
        Self {
            font_family: "Helvetica".to_string(),
            font_size: 11.0,
            color: Colour::BLACK,
            alignment: Alignment::Left,
            bold: false,
            italic: false,
            line_height: 1.2,
        }
    }
}

/// Default size and weight for a heading level.
fn heading_preset(level: u8) -> StyleAttributes {
    let size = match level {
        1 => 24.0,
        2 => 18.0,
        3 => 15.0,
        4 => 13.0,
        5 => 11.0,
        _ => 10.0,
    };
    StyleAttributes::new().with_font_size(size).with_bold(true)
}

/// Computes flat styles for blocks and table cells.
#[derive(Debug, Clone)]
pub struct StyleCascade {
    root: ResolvedStyle,
}

impl StyleCascade {
    /// Create a cascade rooted at the document style.
    pub fn new(document_style: &StyleAttributes) -> Self {
        Self {
            root: document_style.resolve(&ResolvedStyle::default()),
        }
    }

    /// The resolved document style.
    pub fn root(&self) -> &ResolvedStyle {
        &self.root
    }

    /// Resolve the style of a top-level block.
    pub fn block(&self, block: &Block) -> ResolvedStyle {
        match block {
            Block::Text(text) => match text.heading {
                Some(level) => text.style.resolve(&heading_preset(level).resolve(&self.root)),
                None => text.style.resolve(&self.root),
            },
            Block::Image(image) => image.style.resolve(&self.root),
            Block::Table(table) => table.style.resolve(&self.root),
        }
    }

    /// Resolve the style of a table cell given its table's resolved style.
    pub fn cell(&self, table: &ResolvedStyle, cell: &TableCell, header: bool) -> ResolvedStyle {
        if header {
            cell.style
                .resolve(&StyleAttributes::new().with_bold(true).resolve(table))
        } else {
            cell.style.resolve(table)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TextBlock;

    #[test]
    fn test_colour_parse() {
        assert_eq!("#ff8000".parse::<Colour>().unwrap(), Colour::rgb(255, 128, 0));
        assert_eq!("#fff".parse::<Colour>().unwrap(), Colour::WHITE);
        assert_eq!("black".parse::<Colour>().unwrap(), Colour::BLACK);
        assert!("ff8000".parse::<Colour>().is_err());
        assert!("#ff80".parse::<Colour>().is_err());
        assert!("#gg0000".parse::<Colour>().is_err());
    }

    #[test]
    fn test_colour_display() {
        assert_eq!(Colour::rgb(255, 128, 0).to_string(), "#ff8000");
    }

    #[test]
    fn test_resolve_inherits_parent() {
        let parent = ResolvedStyle::default();
        let style = StyleAttributes::new().with_font_size(14.0);
        let resolved = style.resolve(&parent);
        assert_eq!(resolved.font_size, 14.0);
        assert_eq!(resolved.font_family, "Helvetica");
        assert_eq!(resolved.line_height, 1.2);
    }

    #[test]
    fn test_heading_preset_overridable() {
        let cascade = StyleCascade::new(&StyleAttributes::new().with_font_family("Times"));
        let mut heading = TextBlock::new("Title");
        heading.heading = Some(1);
        let resolved = cascade.block(&Block::Text(heading.clone()));
        assert_eq!(resolved.font_size, 24.0);
        assert!(resolved.bold);
        assert_eq!(resolved.font_family, "Times");

        heading.style = StyleAttributes::new().with_bold(false);
        let resolved = cascade.block(&Block::Text(heading));
        assert!(!resolved.bold);
    }

    #[test]
    fn test_header_cell_is_bold() {
        let cascade = StyleCascade::new(&StyleAttributes::default());
        let table = cascade.root().clone();
        let cell = TableCell::new("Name");
        assert!(cascade.cell(&table, &cell, true).bold);
        assert!(!cascade.cell(&table, &cell, false).bold);
    }
}
