//! Drawing laid-out blocks onto a page canvas.

use super::canvas::Canvas;
use super::RenderOptions;
use crate::error::{Error, Result};
use crate::font::{winansi, FontRegistry, StandardFont};
use crate::layout::{break_lines, layout_cell, line_text, measure_table, LineBox, CELL_PADDING};
use crate::model::{Alignment, Colour, ImageBlock, Rect, ResolvedStyle, StyleCascade, TableBlock, TextBlock};
use std::collections::BTreeMap;

const PLACEHOLDER_FILL: Colour = Colour::rgb(217, 217, 217);
const PLACEHOLDER_EDGE: Colour = Colour::rgb(150, 150, 150);

/// Resource names used on one page.
#[derive(Default)]
pub struct PageResources {
    /// Resource name per face, in order of first use
    pub fonts: BTreeMap<StandardFont, String>,
    /// Image XObjects: resource name and block index on the page
    pub images: Vec<(String, usize)>,
}

impl PageResources {
    fn font_name(&mut self, face: StandardFont) -> String {
        let next = self.fonts.len() + 1;
        self.fonts
            .entry(face)
            .or_insert_with(|| format!("F{}", next))
            .clone()
    }

    fn image_name(&mut self, block_index: usize) -> String {
        let name = format!("Im{}", self.images.len() + 1);
        self.images.push((name.clone(), block_index));
        name
    }
}

/// Resolve a style to a face, rejecting values the renderer cannot draw.
pub fn render_face(label: &str, style: &ResolvedStyle) -> Result<StandardFont> {
    if !(style.font_size > 0.0 && style.font_size.is_finite()) {
        return Err(Error::render(
            label,
            format!("unsupported font size {}", style.font_size),
        ));
    }
    if !(style.line_height > 0.0 && style.line_height.is_finite()) {
        return Err(Error::render(
            label,
            format!("unsupported line height {}", style.line_height),
        ));
    }
    FontRegistry::global()
        .resolve(&style.font_family, style.bold, style.italic)
        .ok_or_else(|| {
            Error::render(
                label,
                format!("unregistered font '{}'", style.font_family),
            )
        })
}

/// Draws blocks of one page.
pub struct PagePainter<'a> {
    pub canvas: Canvas,
    pub resources: PageResources,
    cascade: &'a StyleCascade,
    options: &'a RenderOptions,
}

impl<'a> PagePainter<'a> {
    pub fn new(page_height: f32, cascade: &'a StyleCascade, options: &'a RenderOptions) -> Self {
        Self {
            canvas: Canvas::new(page_height),
            resources: PageResources::default(),
            cascade,
            options,
        }
    }

    /// Draw wrapped lines inside `area`, the first baseline one ascent below its top.
    fn draw_lines(
        &mut self,
        label: &str,
        source: &str,
        lines: &[LineBox],
        style: &ResolvedStyle,
        face: StandardFont,
        area: Rect,
    ) {
        let font = self.resources.font_name(face);
        let leading = style.leading();
        let glyph_height = face.ascent(style.font_size) - face.descent(style.font_size);
        let first_baseline = area.y + (leading - glyph_height) / 2.0 + face.ascent(style.font_size);

        self.canvas.begin_text(&font, style.font_size);
        self.canvas.fill_colour(style.color);
        for (i, line) in lines.iter().enumerate() {
            let text = line_text(source, line);
            if text.is_empty() {
                continue;
            }
            let (bytes, replaced) = winansi::encode_lossy(&text);
            if replaced > 0 {
                log::warn!(
                    "{}: {} characters have no WinAnsi code and were drawn as '?'",
                    label,
                    replaced
                );
            }

            let slack = (area.width - line.width).max(0.0);
            let ends_paragraph =
                i + 1 == lines.len() || source[line.end..].starts_with('\n');
            let spaces = bytes.iter().filter(|&&b| b == b' ').count();
            let (x, word_spacing) = match style.alignment {
                Alignment::Left => (area.x, 0.0),
                Alignment::Center => (area.x + slack / 2.0, 0.0),
                Alignment::Right => (area.x + slack, 0.0),
                Alignment::Justify if !ends_paragraph && spaces > 0 => {
                    (area.x, slack / spaces as f32)
                }
                Alignment::Justify => (area.x, 0.0),
            };

            let baseline = first_baseline + i as f32 * leading;
            self.canvas.show_text(x, baseline, word_spacing, bytes);
        }
        self.canvas.end_text();
    }

    pub fn text(&mut self, label: &str, block: &TextBlock, style: &ResolvedStyle, bbox: Rect) -> Result<()> {
        let face = render_face(label, style)?;
        let lines = break_lines(&block.text, face, style.font_size, bbox.width);
        self.draw_lines(label, &block.text, &lines, style, face, bbox);
        Ok(())
    }

    /// Draw an image; returns the XObject resource name when image data is present.
    pub fn image(&mut self, block_index: usize, block: &ImageBlock, bbox: Rect) -> Option<String> {
        if block.data.is_some() {
            let name = self.resources.image_name(block_index);
            self.canvas.image(&name, bbox);
            return Some(name);
        }

        self.canvas.save();
        self.canvas.fill_colour(PLACEHOLDER_FILL);
        self.canvas.stroke_colour(PLACEHOLDER_EDGE);
        self.canvas.line_width(0.5);
        self.canvas.rect(bbox);
        self.canvas.fill_and_stroke();
        self.canvas.restore();
        None
    }

    pub fn table(&mut self, label: &str, block: &TableBlock, style: &ResolvedStyle, bbox: Rect) -> Result<()> {
        let geometry = measure_table(block, style, self.cascade, bbox.width);
        let offsets = geometry.column_offsets(bbox.x);

        if self.options.table_borders {
            self.canvas.save();
            self.canvas.stroke_colour(self.options.border_colour);
            self.canvas.line_width(self.options.border_width);
            let mut y = bbox.y;
            for height in &geometry.row_heights {
                for (x, width) in offsets.iter().zip(&geometry.column_widths) {
                    self.canvas.rect(Rect::new(*x, y, *width, *height));
                }
                y += height;
            }
            self.canvas.stroke();
            self.canvas.restore();
        }

        let mut y = bbox.y;
        for (r, row) in block.rows.iter().enumerate() {
            let header = block.is_header_row(r);
            for (c, cell) in row.cells.iter().enumerate().take(offsets.len()) {
                let width = geometry.column_widths[c];
                let cell_label = format!("{} cell [{}][{}]", label, r, c);
                let laid = layout_cell(cell, style, self.cascade, header, width);
                let face = render_face(&cell_label, &laid.style)?;
                let inner = Rect::new(
                    offsets[c] + CELL_PADDING,
                    y + CELL_PADDING,
                    width - 2.0 * CELL_PADDING,
                    geometry.row_heights[r] - 2.0 * CELL_PADDING,
                );
                self.draw_lines(&cell_label, &cell.text, &laid.lines, &laid.style, face, inner);
            }
            y += geometry.row_heights[r];
        }
        Ok(())
    }
}
