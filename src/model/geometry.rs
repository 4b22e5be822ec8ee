//! Page geometry: rectangles, margins, page sizes.

use serde::{Deserialize, Serialize};

/// Tolerance used when comparing layout positions, in points.
pub const EPSILON: f32 = 1e-3;

/// An axis-aligned rectangle in points.
///
/// Model rectangles use a top-left origin with `y` growing downwards.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    /// Create a new rectangle.
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Right edge.
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Bottom edge.
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Whether the two rectangles share interior area. Touching edges do not count.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.right() - EPSILON
            && other.x < self.right() - EPSILON
            && self.y < other.bottom() - EPSILON
            && other.y < self.bottom() - EPSILON
    }

    /// Whether `other` lies entirely inside this rectangle.
    pub fn contains(&self, other: &Rect) -> bool {
        other.x >= self.x - EPSILON
            && other.y >= self.y - EPSILON
            && other.right() <= self.right() + EPSILON
            && other.bottom() <= self.bottom() + EPSILON
    }

    /// Smallest rectangle covering both.
    pub fn union(&self, other: &Rect) -> Rect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Rect::new(
            x,
            y,
            self.right().max(other.right()) - x,
            self.bottom().max(other.bottom()) - y,
        )
    }

    /// Center point.
    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// Page margins in points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Margins {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Margins {
    /// Same margin on all four sides.
    pub fn all(value: f32) -> Self {
        Self {
            top: value,
            right: value,
            bottom: value,
            left: value,
        }
    }

    /// Vertical and horizontal margins.
    pub fn symmetric(vertical: f32, horizontal: f32) -> Self {
        Self {
            top: vertical,
            right: horizontal,
            bottom: vertical,
            left: horizontal,
        }
    }

    /// Margins in CSS order (top, right, bottom, left).
    pub fn trbl(top: f32, right: f32, bottom: f32, left: f32) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }
}

impl Default for Margins {
    fn default() -> Self {
        // One inch.
        Self::all(72.0)
    }
}

/// Page dimensions in points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

impl PageSize {
    pub const A4: PageSize = PageSize::new(595.28, 841.89);
    pub const A5: PageSize = PageSize::new(419.53, 595.28);
    pub const LETTER: PageSize = PageSize::new(612.0, 792.0);
    pub const LEGAL: PageSize = PageSize::new(612.0, 1008.0);

    /// Create a custom page size.
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Look up a named paper size (case-insensitive).
    pub fn named(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "A4" => Some(Self::A4),
            "A5" => Some(Self::A5),
            "LETTER" => Some(Self::LETTER),
            "LEGAL" => Some(Self::LEGAL),
            _ => None,
        }
    }

    /// Swap width and height.
    pub fn landscape(self) -> Self {
        Self::new(self.height, self.width)
    }
}

impl Default for PageSize {
    fn default() -> Self {
        Self::A4
    }
}

/// Page size, margins and flow spacing used by the layout engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageConstraints {
    /// Page dimensions
    pub size: PageSize,

    /// Margins around the content area
    pub margins: Margins,

    /// Vertical gap inserted between consecutive blocks on a page
    pub block_spacing: f32,
}

impl PageConstraints {
    /// Create constraints with default margins and spacing.
    pub fn new(size: PageSize) -> Self {
        Self {
            size,
            ..Default::default()
        }
    }

    /// Set the margins.
    pub fn with_margins(mut self, margins: Margins) -> Self {
        self.margins = margins;
        self
    }

    /// Set the gap between blocks.
    pub fn with_block_spacing(mut self, spacing: f32) -> Self {
        self.block_spacing = spacing;
        self
    }

    /// The area inside the margins.
    pub fn content_box(&self) -> Rect {
        Rect::new(
            self.margins.left,
            self.margins.top,
            self.size.width - self.margins.left - self.margins.right,
            self.size.height - self.margins.top - self.margins.bottom,
        )
    }
}

impl Default for PageConstraints {
    fn default() -> Self {
        Self {
            size: PageSize::default(),
            margins: Margins::default(),
            block_spacing: 8.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_intersects() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(5.0, 5.0, 10.0, 10.0);
        let c = Rect::new(0.0, 10.0, 10.0, 10.0);
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn test_rect_contains() {
        let outer = Rect::new(72.0, 72.0, 451.28, 697.89);
        assert!(outer.contains(&Rect::new(72.0, 72.0, 451.28, 13.2)));
        assert!(!outer.contains(&Rect::new(70.0, 72.0, 10.0, 10.0)));
    }

    #[test]
    fn test_content_box() {
        let constraints = PageConstraints::new(PageSize::LETTER).with_margins(Margins::all(50.0));
        let content = constraints.content_box();
        assert_eq!(content.x, 50.0);
        assert_eq!(content.y, 50.0);
        assert_eq!(content.width, 512.0);
        assert_eq!(content.height, 692.0);
    }

    #[test]
    fn test_named_page_size() {
        assert_eq!(PageSize::named("letter"), Some(PageSize::LETTER));
        assert_eq!(PageSize::named("a4"), Some(PageSize::A4));
        assert_eq!(PageSize::named("B5"), None);
    }
}
