//! Content stream interpreter.
//!
//! Walks the operations of one page and records what was painted: text runs
//! with their position and font, axis-aligned rules from stroked paths, and
//! image XObjects. Everything is kept in PDF user space (origin bottom-left).

use std::collections::BTreeMap;

use unicode_normalization::UnicodeNormalization;

use super::backend::{ContentOp, FontInfo, ImageData, PageId, PdfBackend, PdfValue};
use crate::model::{Colour, Rect};

/// TJ adjustments beyond this many thousandths of an em read as word spaces.
const TJ_SPACE_THRESHOLD: f32 = 200.0;

/// Rules thinner than this many points are treated as lines when filled.
const RULE_THICKNESS: f32 = 2.0;

/// A string shown by one text-showing operator.
#[derive(Debug, Clone)]
pub struct TextRun {
    pub text: String,
    /// Left edge of the first glyph
    pub x: f32,
    /// Baseline
    pub y: f32,
    /// Advance of the whole run
    pub width: f32,
    /// Effective font size (text and CTM scaling applied)
    pub font_size: f32,
    pub font_name: String,
    pub bold: bool,
    pub italic: bool,
    pub colour: Colour,
    /// Number of glyphs shown
    pub glyphs: usize,
    /// Sum of kerning adjustments smaller than a space, in ems
    pub kerning: f32,
    /// Shown with a rotated or skewed matrix, at a non-finite position, or
    /// with codes the font cannot map to Unicode
    pub degraded: bool,
}

impl TextRun {
    /// Approximate bottom (baseline minus descender).
    pub fn bottom(&self) -> f32 {
        self.y - self.font_size * 0.2
    }

    /// Approximate top (baseline plus ascender).
    pub fn top(&self) -> f32 {
        self.y + self.font_size * 0.8
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Box around the run in user space.
    pub fn rect(&self) -> Rect {
        if !(self.x.is_finite() && self.y.is_finite() && self.width.is_finite()) {
            return Rect::default();
        }
        Rect::new(self.x, self.bottom(), self.width.max(0.0), self.top() - self.bottom())
    }
}

/// An axis-aligned line segment in user space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rule {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl Rule {
    fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Option<Self> {
        if !(x0.is_finite() && y0.is_finite() && x1.is_finite() && y1.is_finite()) {
            return None;
        }
        let rule = Self {
            x0: x0.min(x1),
            y0: y0.min(y1),
            x1: x0.max(x1),
            y1: y0.max(y1),
        };
        (rule.is_horizontal() || rule.is_vertical()).then_some(rule)
    }

    pub fn is_horizontal(&self) -> bool {
        (self.y1 - self.y0).abs() < 0.5 && self.x1 - self.x0 > 0.5
    }

    pub fn is_vertical(&self) -> bool {
        (self.x1 - self.x0).abs() < 0.5 && self.y1 - self.y0 > 0.5
    }
}

/// An image painted on the page.
#[derive(Debug, Clone)]
pub struct PlacedImage {
    /// Area covered by the unit square under the CTM
    pub rect: Rect,
    pub image: ImageData,
}

/// Everything recorded from one page.
#[derive(Debug, Clone, Default)]
pub struct PageContent {
    pub runs: Vec<TextRun>,
    pub rules: Vec<Rule>,
    pub images: Vec<PlacedImage>,
}

/// Affine matrix [a b c d e f].
#[derive(Debug, Clone, Copy, PartialEq)]
struct Matrix([f32; 6]);

impl Matrix {
    const IDENTITY: Matrix = Matrix([1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);

    fn translate(tx: f32, ty: f32) -> Self {
        Matrix([1.0, 0.0, 0.0, 1.0, tx, ty])
    }

    /// `self` applied first, then `other`.
    fn then(&self, other: &Matrix) -> Matrix {
        let [a, b, c, d, e, f] = self.0;
        let [a2, b2, c2, d2, e2, f2] = other.0;
        Matrix([
            a * a2 + b * c2,
            a * b2 + b * d2,
            c * a2 + d * c2,
            c * b2 + d * d2,
            e * a2 + f * c2 + e2,
            e * b2 + f * d2 + f2,
        ])
    }

    fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        let [a, b, c, d, e, f] = self.0;
        (a * x + c * y + e, b * x + d * y + f)
    }

    /// Vertical scale factor.
    fn scale(&self) -> f32 {
        let [_, _, c, d, _, _] = self.0;
        (c * c + d * d).sqrt()
    }

    /// True when the matrix rotates, skews or mirrors.
    fn is_rotated(&self) -> bool {
        let [a, b, c, d, _, _] = self.0;
        let tolerance = 1e-3 * (a.abs() + d.abs()).max(1e-6);
        b.abs() > tolerance || c.abs() > tolerance || a <= 0.0 || d <= 0.0
    }

    fn from_operands(operands: &[PdfValue]) -> Option<Matrix> {
        if operands.len() < 6 {
            return None;
        }
        let mut m = [0.0; 6];
        for (slot, value) in m.iter_mut().zip(operands) {
            *slot = value.as_number()?;
        }
        Some(Matrix(m))
    }
}

/// Graphics state saved by `q` and restored by `Q`.
#[derive(Debug, Clone)]
struct GraphicsState {
    ctm: Matrix,
    fill: Colour,
    font: Option<Vec<u8>>,
    font_size: f32,
    char_spacing: f32,
    word_spacing: f32,
    horizontal_scale: f32,
    leading: f32,
    rise: f32,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            ctm: Matrix::IDENTITY,
            fill: Colour::BLACK,
            font: None,
            font_size: 12.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scale: 1.0,
            leading: 0.0,
            rise: 0.0,
        }
    }
}

/// Walks one page's operations.
pub struct Interpreter<'a, B: PdfBackend + ?Sized> {
    backend: &'a B,
    page: PageId,
    fonts: BTreeMap<Vec<u8>, FontInfo>,
    state: GraphicsState,
    stack: Vec<GraphicsState>,
    text_matrix: Matrix,
    line_matrix: Matrix,
    path: Vec<(f32, f32, f32, f32)>,
    subpath_start: Option<(f32, f32)>,
    current_point: Option<(f32, f32)>,
    out: PageContent,
}

impl<'a, B: PdfBackend + ?Sized> Interpreter<'a, B> {
    pub fn new(backend: &'a B, page: PageId) -> Self {
        Self {
            backend,
            page,
            fonts: backend.page_fonts(page),
            state: GraphicsState::default(),
            stack: Vec::new(),
            text_matrix: Matrix::IDENTITY,
            line_matrix: Matrix::IDENTITY,
            path: Vec::new(),
            subpath_start: None,
            current_point: None,
            out: PageContent::default(),
        }
    }

    /// Interpret the page's content stream.
    ///
    /// A stream that cannot be read yields whatever was recorded so far.
    pub fn run(mut self) -> PageContent {
        let ops = match self
            .backend
            .page_content(self.page)
            .and_then(|data| self.backend.decode_content(&data))
        {
            Ok(ops) => ops,
            Err(e) => {
                log::warn!("Unreadable content stream on page {:?}: {}", self.page, e);
                return self.out;
            }
        };
        for op in &ops {
            self.step(op);
        }
        self.out
    }

    fn num(op: &ContentOp, index: usize) -> Option<f32> {
        op.operands.get(index).and_then(PdfValue::as_number)
    }

    fn step(&mut self, op: &ContentOp) {
        match op.operator.as_str() {
            "q" => self.stack.push(self.state.clone()),
            "Q" => {
                if let Some(state) = self.stack.pop() {
                    self.state = state;
                }
            }
            "cm" => {
                if let Some(m) = Matrix::from_operands(&op.operands) {
                    self.state.ctm = m.then(&self.state.ctm);
                }
            }

            "g" => {
                if let Some(v) = Self::num(op, 0) {
                    self.state.fill = Colour::from_unit(v, v, v);
                }
            }
            "rg" => {
                if let (Some(r), Some(g), Some(b)) =
                    (Self::num(op, 0), Self::num(op, 1), Self::num(op, 2))
                {
                    self.state.fill = Colour::from_unit(r, g, b);
                }
            }
            "k" => {
                if let (Some(c), Some(m), Some(y), Some(k)) = (
                    Self::num(op, 0),
                    Self::num(op, 1),
                    Self::num(op, 2),
                    Self::num(op, 3),
                ) {
                    self.state.fill =
                        Colour::from_unit((1.0 - c) * (1.0 - k), (1.0 - m) * (1.0 - k), (1.0 - y) * (1.0 - k));
                }
            }

            "m" => {
                if let (Some(x), Some(y)) = (Self::num(op, 0), Self::num(op, 1)) {
                    let p = self.state.ctm.apply(x, y);
                    self.subpath_start = Some(p);
                    self.current_point = Some(p);
                }
            }
            "l" => {
                if let (Some(x), Some(y), Some(from)) =
                    (Self::num(op, 0), Self::num(op, 1), self.current_point)
                {
                    let to = self.state.ctm.apply(x, y);
                    self.path.push((from.0, from.1, to.0, to.1));
                    self.current_point = Some(to);
                }
            }
            "h" => {
                if let (Some(start), Some(from)) = (self.subpath_start, self.current_point) {
                    self.path.push((from.0, from.1, start.0, start.1));
                    self.current_point = Some(start);
                }
            }
            "re" => {
                if let (Some(x), Some(y), Some(w), Some(h)) = (
                    Self::num(op, 0),
                    Self::num(op, 1),
                    Self::num(op, 2),
                    Self::num(op, 3),
                ) {
                    let corners = [(x, y), (x + w, y), (x + w, y + h), (x, y + h)];
                    let points: Vec<(f32, f32)> = corners
                        .iter()
                        .map(|&(px, py)| self.state.ctm.apply(px, py))
                        .collect();
                    for i in 0..4 {
                        let (a, b) = (points[i], points[(i + 1) % 4]);
                        self.path.push((a.0, a.1, b.0, b.1));
                    }
                    self.subpath_start = Some(points[0]);
                    self.current_point = Some(points[0]);
                }
            }
            "S" | "s" | "B" | "B*" | "b" | "b*" => self.paint_path(true),
            "f" | "F" | "f*" => self.paint_path(false),
            "n" => self.clear_path(),

            "BT" => {
                self.text_matrix = Matrix::IDENTITY;
                self.line_matrix = Matrix::IDENTITY;
            }
            "ET" => {}
            "Tf" => {
                if let Some(PdfValue::Name(name)) = op.operands.first() {
                    self.state.font = Some(name.clone());
                }
                if let Some(size) = Self::num(op, 1) {
                    self.state.font_size = size;
                }
            }
            "Tc" => self.state.char_spacing = Self::num(op, 0).unwrap_or(0.0),
            "Tw" => self.state.word_spacing = Self::num(op, 0).unwrap_or(0.0),
            "Tz" => self.state.horizontal_scale = Self::num(op, 0).unwrap_or(100.0) / 100.0,
            "TL" => self.state.leading = Self::num(op, 0).unwrap_or(0.0),
            "Ts" => self.state.rise = Self::num(op, 0).unwrap_or(0.0),
            "Td" => {
                if let (Some(tx), Some(ty)) = (Self::num(op, 0), Self::num(op, 1)) {
                    self.move_line(tx, ty);
                }
            }
            "TD" => {
                if let (Some(tx), Some(ty)) = (Self::num(op, 0), Self::num(op, 1)) {
                    self.state.leading = -ty;
                    self.move_line(tx, ty);
                }
            }
            "Tm" => {
                if let Some(m) = Matrix::from_operands(&op.operands) {
                    self.text_matrix = m;
                    self.line_matrix = m;
                }
            }
            "T*" => self.move_line(0.0, -self.state.leading),
            "Tj" => {
                if let Some(PdfValue::Str(bytes)) = op.operands.first() {
                    self.show(&[PdfValue::Str(bytes.clone())]);
                }
            }
            "TJ" => {
                if let Some(PdfValue::Array(items)) = op.operands.first() {
                    self.show(items);
                }
            }
            "'" => {
                self.move_line(0.0, -self.state.leading);
                if let Some(PdfValue::Str(bytes)) = op.operands.first() {
                    self.show(&[PdfValue::Str(bytes.clone())]);
                }
            }
            "\"" => {
                self.state.word_spacing = Self::num(op, 0).unwrap_or(self.state.word_spacing);
                self.state.char_spacing = Self::num(op, 1).unwrap_or(self.state.char_spacing);
                self.move_line(0.0, -self.state.leading);
                if let Some(PdfValue::Str(bytes)) = op.operands.get(2) {
                    self.show(&[PdfValue::Str(bytes.clone())]);
                }
            }

            "Do" => {
                if let Some(PdfValue::Name(name)) = op.operands.first() {
                    self.paint_xobject(name);
                }
            }
            _ => {}
        }
    }

    fn move_line(&mut self, tx: f32, ty: f32) {
        self.line_matrix = Matrix::translate(tx, ty).then(&self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    fn clear_path(&mut self) {
        self.path.clear();
        self.subpath_start = None;
        self.current_point = None;
    }

    fn paint_path(&mut self, stroked: bool) {
        for &(x0, y0, x1, y1) in &self.path {
            if stroked {
                if let Some(rule) = Rule::new(x0, y0, x1, y1) {
                    self.out.rules.push(rule);
                }
            }
        }
        if !stroked {
            // Thin filled rectangles are drawn rules.
            let xs = self.path.iter().flat_map(|s| [s.0, s.2]);
            let ys = self.path.iter().flat_map(|s| [s.1, s.3]);
            let (min_x, max_x) = xs.fold((f32::MAX, f32::MIN), |(lo, hi), v| (lo.min(v), hi.max(v)));
            let (min_y, max_y) = ys.fold((f32::MAX, f32::MIN), |(lo, hi), v| (lo.min(v), hi.max(v)));
            if !self.path.is_empty() {
                let rule = if max_y - min_y < RULE_THICKNESS {
                    let y = (min_y + max_y) / 2.0;
                    Rule::new(min_x, y, max_x, y)
                } else if max_x - min_x < RULE_THICKNESS {
                    let x = (min_x + max_x) / 2.0;
                    Rule::new(x, min_y, x, max_y)
                } else {
                    None
                };
                self.out.rules.extend(rule);
            }
        }
        self.clear_path();
    }

    fn paint_xobject(&mut self, name: &[u8]) {
        let Some(image) = self.backend.page_image(self.page, name) else {
            log::debug!(
                "Skipping non-image XObject /{}",
                String::from_utf8_lossy(name)
            );
            return;
        };
        let corners = [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (1.0, 1.0)]
            .map(|(x, y)| self.state.ctm.apply(x, y));
        let min_x = corners.iter().map(|p| p.0).fold(f32::MAX, f32::min);
        let max_x = corners.iter().map(|p| p.0).fold(f32::MIN, f32::max);
        let min_y = corners.iter().map(|p| p.1).fold(f32::MAX, f32::min);
        let max_y = corners.iter().map(|p| p.1).fold(f32::MIN, f32::max);
        if !(min_x.is_finite() && max_x.is_finite() && min_y.is_finite() && max_y.is_finite()) {
            log::warn!("Image with non-finite placement skipped");
            return;
        }
        self.out.images.push(PlacedImage {
            rect: Rect::new(min_x, min_y, max_x - min_x, max_y - min_y),
            image,
        });
    }

    /// Show strings and TJ adjustments as one run.
    fn show(&mut self, items: &[PdfValue]) {
        let font = self
            .state
            .font
            .as_ref()
            .and_then(|name| self.fonts.get(name).cloned())
            .unwrap_or_else(|| {
                let name = self.state.font.as_deref().unwrap_or_default();
                FontInfo::unknown(&String::from_utf8_lossy(name))
            });
        let size = self.state.font_size;
        let scale = self.state.horizontal_scale;

        let start = Matrix::translate(0.0, self.state.rise)
            .then(&self.text_matrix)
            .then(&self.state.ctm);
        let (x, y) = start.apply(0.0, 0.0);
        let effective_size = size * start.scale();

        let mut text = String::new();
        let mut glyphs = 0;
        let mut kerning = 0.0;
        let mut undecodable = false;

        for item in items {
            match item {
                PdfValue::Str(bytes) => {
                    let decoded = font.decode_string(bytes);
                    text.push_str(&decoded.text);
                    undecodable |= !decoded.complete;
                    for code in decoded.codes {
                        let mut advance =
                            font.code_width(code) / 1000.0 * size + self.state.char_spacing;
                        // Word spacing applies to the single-byte code 32 only.
                        if code == 32 && !font.is_composite() {
                            advance += self.state.word_spacing;
                        }
                        self.advance(advance * scale);
                        glyphs += 1;
                    }
                }
                other => {
                    let Some(adjustment) = other.as_number() else {
                        continue;
                    };
                    self.advance(-adjustment / 1000.0 * size * scale);
                    if -adjustment > TJ_SPACE_THRESHOLD {
                        if !text.is_empty() && !text.ends_with(' ') {
                            text.push(' ');
                        }
                    } else {
                        kerning += adjustment.abs() / 1000.0;
                    }
                }
            }
        }

        let end = Matrix::translate(0.0, self.state.rise)
            .then(&self.text_matrix)
            .then(&self.state.ctm);
        let (end_x, _) = end.apply(0.0, 0.0);

        let text: String = text.nfc().collect();
        if text.trim().is_empty() {
            return;
        }

        if undecodable {
            log::debug!("Run in font {} has codes without Unicode values", font.base_font);
        }
        let degraded = start.is_rotated()
            || undecodable
            || !(x.is_finite() && y.is_finite() && end_x.is_finite() && effective_size.is_finite());
        self.out.runs.push(TextRun {
            text,
            x,
            y,
            width: end_x - x,
            font_size: effective_size,
            bold: font.is_bold(),
            italic: font.is_italic(),
            font_name: font.base_font,
            colour: self.state.fill,
            glyphs,
            kerning,
            degraded,
        });
    }

    fn advance(&mut self, tx: f32) {
        self.text_matrix = Matrix::translate(tx, 0.0).then(&self.text_matrix);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matrix_then_composes_left_to_right() {
        let scale = Matrix([2.0, 0.0, 0.0, 2.0, 0.0, 0.0]);
        let shift = Matrix::translate(10.0, 5.0);
        assert_eq!(scale.then(&shift).apply(1.0, 1.0), (12.0, 7.0));
        assert_eq!(shift.then(&scale).apply(1.0, 1.0), (22.0, 12.0));
    }

    #[test]
    fn test_matrix_rotation_detected() {
        assert!(!Matrix::IDENTITY.is_rotated());
        assert!(Matrix([0.0, 1.0, -1.0, 0.0, 0.0, 0.0]).is_rotated());
        assert!(Matrix([-1.0, 0.0, 0.0, 1.0, 0.0, 0.0]).is_rotated());
    }

    #[test]
    fn test_rule_normalised_and_axis_aligned() {
        let rule = Rule::new(100.0, 50.0, 10.0, 50.0).unwrap();
        assert_eq!((rule.x0, rule.x1), (10.0, 100.0));
        assert!(rule.is_horizontal());
        assert!(Rule::new(0.0, 0.0, 10.0, 10.0).is_none());
        assert!(Rule::new(0.0, f32::NAN, 10.0, 0.0).is_none());
    }

    #[test]
    fn test_run_rect_degrades_for_non_finite() {
        let run = TextRun {
            text: "x".into(),
            x: f32::INFINITY,
            y: 0.0,
            width: 5.0,
            font_size: 10.0,
            font_name: "Helvetica".into(),
            bold: false,
            italic: false,
            colour: Colour::BLACK,
            glyphs: 1,
            kerning: 0.0,
            degraded: true,
        };
        assert_eq!(run.rect(), Rect::default());
    }
}
