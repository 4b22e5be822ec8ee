//! Greedy line breaking with Standard-14 metrics.

use crate::font::{FontFamily, FontRegistry, StandardFont};
use crate::model::{ResolvedStyle, EPSILON};

/// One wrapped line: a byte range of the source text and its width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineBox {
    pub start: usize,
    pub end: usize,
    pub width: f32,
}

impl LineBox {
    /// The line's text.
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start..self.end]
    }
}

/// Face used to measure text in `style`.
///
/// Unknown families are measured as Helvetica so layout can proceed; the
/// renderer rejects them.
pub fn measuring_face(style: &ResolvedStyle) -> StandardFont {
    FontRegistry::global()
        .resolve(&style.font_family, style.bold, style.italic)
        .unwrap_or_else(|| {
            log::warn!(
                "Font family '{}' is not registered, measuring as Helvetica",
                style.font_family
            );
            FontFamily::HELVETICA.face(style.bold, style.italic)
        })
}

fn advance(font: StandardFont, c: char, size: f32) -> f32 {
    let c = if c.is_whitespace() { ' ' } else { c };
    font.char_width(c) as f32 * size / 1000.0
}

fn measure(font: StandardFont, text: &str, size: f32) -> f32 {
    text.chars().map(|c| advance(font, c, size)).sum()
}

/// Byte ranges of the whitespace-separated words of `text`.
fn words(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut start = None;
    for (i, c) in text.char_indices() {
        match (c.is_whitespace(), start) {
            (true, Some(s)) => {
                spans.push((s, i));
                start = None;
            }
            (false, None) => start = Some(i),
            _ => {}
        }
    }
    if let Some(s) = start {
        spans.push((s, text.len()));
    }
    spans
}

/// Wrap `text` into lines no wider than `max_width`.
///
/// `\n` forces a break; an empty paragraph still produces one (empty) line.
/// Words wider than a whole line are broken between characters.
pub fn break_lines(text: &str, font: StandardFont, size: f32, max_width: f32) -> Vec<LineBox> {
    let mut lines = Vec::new();
    let mut offset = 0;
    for paragraph in text.split('\n') {
        wrap_paragraph(paragraph, offset, font, size, max_width, &mut lines);
        offset += paragraph.len() + 1;
    }
    lines
}

fn wrap_paragraph(
    paragraph: &str,
    base: usize,
    font: StandardFont,
    size: f32,
    max_width: f32,
    out: &mut Vec<LineBox>,
) {
    let spans = words(paragraph);
    if spans.is_empty() {
        out.push(LineBox {
            start: base,
            end: base,
            width: 0.0,
        });
        return;
    }

    // (start, end, width) of the line being filled
    let mut line: Option<(usize, usize, f32)> = None;
    for (ws, we) in spans {
        let word_width = measure(font, &paragraph[ws..we], size);

        if let Some((ls, le, lw)) = line {
            let gap = measure(font, &paragraph[le..ws], size);
            if lw + gap + word_width <= max_width + EPSILON {
                line = Some((ls, we, lw + gap + word_width));
                continue;
            }
            out.push(LineBox {
                start: base + ls,
                end: base + le,
                width: lw,
            });
        }

        if word_width <= max_width + EPSILON {
            line = Some((ws, we, word_width));
            continue;
        }

        let mut chunk_start = ws;
        let mut chunk_width = 0.0;
        for (i, c) in paragraph[ws..we].char_indices() {
            let w = advance(font, c, size);
            let pos = ws + i;
            if chunk_width + w > max_width + EPSILON && pos > chunk_start {
                out.push(LineBox {
                    start: base + chunk_start,
                    end: base + pos,
                    width: chunk_width,
                });
                chunk_start = pos;
                chunk_width = 0.0;
            }
            chunk_width += w;
        }
        line = Some((chunk_start, we, chunk_width));
    }

    if let Some((ls, le, lw)) = line {
        out.push(LineBox {
            start: base + ls,
            end: base + le,
            width: lw,
        });
    }
}

/// Draw-ready text of a line: whitespace normalised to spaces.
pub fn line_text(source: &str, line: &LineBox) -> String {
    line.text(source)
        .chars()
        .map(|c| if c.is_whitespace() { ' ' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_line_fits() {
        let lines = break_lines("A short paragraph.", StandardFont::Helvetica, 11.0, 451.0);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].start, 0);
        assert_eq!(lines[0].end, 18);
    }

    #[test]
    fn test_wraps_at_word_boundary() {
        // Courier 10pt: 6pt per character, 60pt = 10 characters.
        let text = "aaaa bbbb cccc";
        let lines = break_lines(text, StandardFont::Courier, 10.0, 60.0);
        let texts: Vec<&str> = lines.iter().map(|l| l.text(text)).collect();
        assert_eq!(texts, vec!["aaaa bbbb", "cccc"]);
        assert!((lines[0].width - 54.0).abs() < 1e-3);
    }

    #[test]
    fn test_exact_fit_stays_on_line() {
        let text = "aaaa bbbbb";
        let lines = break_lines(text, StandardFont::Courier, 10.0, 60.0);
        assert_eq!(lines.len(), 1);
    }

    #[test]
    fn test_hard_breaks_and_blank_lines() {
        let text = "one\n\ntwo";
        let lines = break_lines(text, StandardFont::Helvetica, 10.0, 500.0);
        let texts: Vec<&str> = lines.iter().map(|l| l.text(text)).collect();
        assert_eq!(texts, vec!["one", "", "two"]);
    }

    #[test]
    fn test_long_word_broken_by_character() {
        let text = "abcdefghijklmnop";
        let lines = break_lines(text, StandardFont::Courier, 10.0, 30.0);
        let texts: Vec<&str> = lines.iter().map(|l| l.text(text)).collect();
        assert_eq!(texts, vec!["abcde", "fghij", "klmno", "p"]);
    }

    #[test]
    fn test_empty_text_is_one_line() {
        let lines = break_lines("", StandardFont::Helvetica, 10.0, 100.0);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].width, 0.0);
    }

    #[test]
    fn test_line_text_normalises_tabs() {
        let text = "a\tb";
        let lines = break_lines(text, StandardFont::Helvetica, 10.0, 100.0);
        assert_eq!(line_text(text, &lines[0]), "a b");
    }
}
