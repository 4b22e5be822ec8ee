//! Content stream builder working in top-left page coordinates.

use crate::model::{Colour, Rect};
use lopdf::content::{Content, Operation};
use lopdf::{Object, StringFormat};

fn real(value: f32) -> Object {
    Object::Real(value)
}

fn name(value: &str) -> Object {
    Object::Name(value.as_bytes().to_vec())
}

/// Accumulates drawing operations for one page.
pub struct Canvas {
    page_height: f32,
    operations: Vec<Operation>,
}

impl Canvas {
    /// Create a canvas for a page of the given height.
    pub fn new(page_height: f32) -> Self {
        Self {
            page_height,
            operations: Vec::new(),
        }
    }

    fn op(&mut self, operator: &str, operands: Vec<Object>) {
        self.operations.push(Operation::new(operator, operands));
    }

    /// PDF user-space y for a top-left y.
    fn flip(&self, y: f32) -> f32 {
        self.page_height - y
    }

    pub fn save(&mut self) {
        self.op("q", vec![]);
    }

    pub fn restore(&mut self) {
        self.op("Q", vec![]);
    }

    pub fn fill_colour(&mut self, colour: Colour) {
        let (r, g, b) = colour.to_unit();
        self.op("rg", vec![real(r), real(g), real(b)]);
    }

    pub fn stroke_colour(&mut self, colour: Colour) {
        let (r, g, b) = colour.to_unit();
        self.op("RG", vec![real(r), real(g), real(b)]);
    }

    pub fn line_width(&mut self, width: f32) {
        self.op("w", vec![real(width)]);
    }

    /// Append a rectangle to the current path.
    pub fn rect(&mut self, rect: Rect) {
        let y = self.flip(rect.bottom());
        self.op(
            "re",
            vec![real(rect.x), real(y), real(rect.width), real(rect.height)],
        );
    }

    pub fn stroke(&mut self) {
        self.op("S", vec![]);
    }

    pub fn fill(&mut self) {
        self.op("f", vec![]);
    }

    pub fn fill_and_stroke(&mut self) {
        self.op("B", vec![]);
    }

    pub fn begin_text(&mut self, font: &str, size: f32) {
        self.op("BT", vec![]);
        self.op("Tf", vec![name(font), real(size)]);
    }

    pub fn end_text(&mut self) {
        self.op("ET", vec![]);
    }

    /// Show encoded text with its baseline at top-left coordinates (x, baseline).
    pub fn show_text(&mut self, x: f32, baseline: f32, word_spacing: f32, bytes: Vec<u8>) {
        let y = self.flip(baseline);
        self.op("Tw", vec![real(word_spacing)]);
        self.op(
            "Tm",
            vec![real(1.0), real(0.0), real(0.0), real(1.0), real(x), real(y)],
        );
        self.op("Tj", vec![Object::String(bytes, StringFormat::Literal)]);
    }

    /// Paint an image XObject into `rect`.
    pub fn image(&mut self, resource: &str, rect: Rect) {
        let y = self.flip(rect.bottom());
        self.save();
        self.op(
            "cm",
            vec![
                real(rect.width),
                real(0.0),
                real(0.0),
                real(rect.height),
                real(rect.x),
                real(y),
            ],
        );
        self.op("Do", vec![name(resource)]);
        self.restore();
    }

    /// Finish the page.
    pub fn into_content(self) -> Content {
        Content {
            operations: self.operations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_flipped_to_user_space() {
        let mut canvas = Canvas::new(800.0);
        canvas.rect(Rect::new(10.0, 100.0, 50.0, 20.0));
        let content = canvas.into_content();
        let op = &content.operations[0];
        assert_eq!(op.operator, "re");
        assert!(matches!(op.operands[1], Object::Real(y) if (y - 680.0).abs() < 1e-3));
    }

    #[test]
    fn test_image_wrapped_in_graphics_state() {
        let mut canvas = Canvas::new(800.0);
        canvas.image("Im1", Rect::new(0.0, 0.0, 10.0, 10.0));
        let content = canvas.into_content();
        let ops: Vec<&str> = content
            .operations
            .iter()
            .map(|op| op.operator.as_str())
            .collect();
        assert_eq!(ops, vec!["q", "cm", "Do", "Q"]);
    }
}
