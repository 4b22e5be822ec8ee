//! Spatial clustering of text runs into lines and paragraphs.

use std::cmp::Ordering;
use std::collections::HashMap;

use super::interpreter::TextRun;
use crate::font::StandardFont;
use crate::model::{Colour, Rect, StyleAttributes};

/// Heading sizes of the built-in presets, largest first.
const PRESET_HEADING_SIZES: [f32; 4] = [24.0, 18.0, 15.0, 13.0];

/// Highest confidence a reconstructed paragraph can reach.
pub const MAX_TEXT_CONFIDENCE: f32 = 0.95;

fn by_f32(a: f32, b: f32) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

/// Runs sharing a baseline.
#[derive(Debug, Clone)]
pub struct Line {
    /// Runs sorted left to right
    pub runs: Vec<TextRun>,
    pub y: f32,
    pub x: f32,
    /// Dominant font size weighted by text length
    pub font_size: f32,
    pub heading: Option<u8>,
}

impl Line {
    fn from_runs(mut runs: Vec<TextRun>) -> Self {
        runs.sort_by(|a, b| by_f32(a.x, b.x));
        let total: usize = runs.iter().map(|r| r.text.len()).sum();
        let weighted: f32 = runs.iter().map(|r| r.font_size * r.text.len() as f32).sum();
        let font_size = if total > 0 {
            weighted / total as f32
        } else {
            runs.first().map(|r| r.font_size).unwrap_or(0.0)
        };
        let y = runs.first().map(|r| r.y).unwrap_or(0.0);
        let x = runs.first().map(|r| r.x).unwrap_or(0.0);
        Self {
            runs,
            y,
            x,
            font_size,
            heading: None,
        }
    }

    /// Space-separated text of the runs; a gap wider than a fifth of a
    /// character inserts a space.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for (i, run) in self.runs.iter().enumerate() {
            if i > 0 && self.is_word_gap(i) && !out.ends_with(' ') && !run.text.starts_with(' ') {
                out.push(' ');
            }
            out.push_str(&run.text);
        }
        out.trim().to_string()
    }

    fn avg_char_width(run: &TextRun) -> f32 {
        let chars = run.text.chars().count();
        if chars > 0 && run.width > 0.0 {
            run.width / chars as f32
        } else {
            run.font_size * 0.5
        }
    }

    /// Whether the gap before run `i` separates words.
    fn is_word_gap(&self, i: usize) -> bool {
        let (prev, run) = (&self.runs[i - 1], &self.runs[i]);
        let gap = run.x - prev.right();
        if gap <= Self::avg_char_width(run) * 0.2 {
            return false;
        }
        let spaceless = |c: Option<char>| c.map(is_spaceless_script_char).unwrap_or(false);
        !(spaceless(prev.text.chars().last()) && spaceless(run.text.chars().next()))
    }

    /// Gaps between runs of one word, as fractions of the font size.
    fn intra_word_gaps(&self) -> impl Iterator<Item = f32> + '_ {
        (1..self.runs.len()).filter(move |&i| !self.is_word_gap(i)).map(move |i| {
            let gap = self.runs[i].x - self.runs[i - 1].right();
            gap.abs() / self.font_size.max(1.0)
        })
    }

    pub fn is_bold(&self) -> bool {
        let bold: usize = self.runs.iter().filter(|r| r.bold).map(|r| r.text.len()).sum();
        let total: usize = self.runs.iter().map(|r| r.text.len()).sum();
        total > 0 && bold * 2 > total
    }

    pub fn right(&self) -> f32 {
        self.runs.iter().map(TextRun::right).fold(self.x, f32::max)
    }

    pub fn top(&self) -> f32 {
        self.runs.iter().map(TextRun::top).fold(f32::MIN, f32::max)
    }

    pub fn bottom(&self) -> f32 {
        self.runs.iter().map(TextRun::bottom).fold(f32::MAX, f32::min)
    }
}

/// Lines grouped into one paragraph or heading.
#[derive(Debug, Clone)]
pub struct Paragraph {
    pub lines: Vec<Line>,
    pub heading: Option<u8>,
}

impl Paragraph {
    pub fn text(&self) -> String {
        self.lines
            .iter()
            .map(Line::text)
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Bounding box in user space.
    pub fn rect(&self) -> Rect {
        let left = self.lines.iter().map(|l| l.x).fold(f32::MAX, f32::min);
        let right = self.lines.iter().map(Line::right).fold(f32::MIN, f32::max);
        let top = self.lines.iter().map(Line::top).fold(f32::MIN, f32::max);
        let bottom = self.lines.iter().map(Line::bottom).fold(f32::MAX, f32::min);
        Rect::new(left, bottom, right - left, top - bottom)
    }

    fn runs(&self) -> impl Iterator<Item = &TextRun> {
        self.lines.iter().flat_map(|l| l.runs.iter())
    }

    /// Score how cleanly the paragraph was reconstructed.
    ///
    /// Text shown glyph by glyph, or with uneven kerning and gaps inside
    /// words, scores lower.
    pub fn confidence(&self) -> f32 {
        let runs: Vec<&TextRun> = self.runs().collect();
        if runs.is_empty() {
            return 0.0;
        }
        let glyphs: usize = runs.iter().map(|r| r.glyphs.max(1)).sum();

        let single = runs.iter().filter(|r| r.glyphs <= 1).count() as f32 / runs.len() as f32;
        let kerning: f32 = runs.iter().map(|r| r.kerning).sum();
        let gaps: f32 = self.lines.iter().flat_map(|l| l.intra_word_gaps()).sum();
        let irregularity = (kerning + gaps) / glyphs as f32;

        let confidence = MAX_TEXT_CONFIDENCE - 0.3 * single - (irregularity * 4.0).min(0.4);
        log::debug!(
            "Paragraph confidence {:.2} (single-glyph {:.2}, irregularity {:.3})",
            confidence,
            single,
            irregularity
        );
        confidence.clamp(0.05, MAX_TEXT_CONFIDENCE)
    }

    /// Style attributes recovered from the dominant run.
    pub fn style(&self) -> StyleAttributes {
        let Some(run) = self.runs().max_by_key(|r| r.text.len()) else {
            return StyleAttributes::default();
        };
        let mut style = StyleAttributes::new();
        if self.heading.is_none() {
            style = style.with_font_size((run.font_size * 10.0).round() / 10.0);
            if run.bold {
                style = style.with_bold(true);
            }
        }
        if let Some(face) = StandardFont::from_base_name(&run.font_name) {
            if face.family_name() != "Helvetica" {
                style = style.with_font_family(face.family_name());
            }
        }
        if run.italic {
            style = style.with_italic(true);
        }
        if run.colour != Colour::BLACK {
            style = style.with_color(run.colour);
        }
        style
    }
}

/// Font size statistics used to find headings.
#[derive(Debug, Clone, Default)]
pub struct FontStatistics {
    /// Most common size, the body text size
    pub body_size: f32,
    /// Sizes larger than body text, largest first
    pub heading_sizes: Vec<f32>,
    /// Observed sizes (tenths of a point) weighted by characters
    pub size_histogram: HashMap<i32, usize>,
}

impl FontStatistics {
    pub fn add(&mut self, size: f32, chars: usize) {
        if size.is_finite() {
            *self.size_histogram.entry((size * 10.0).round() as i32).or_insert(0) += chars.max(1);
        }
    }

    pub fn analyze(&mut self) {
        let Some((body, _)) = self
            .size_histogram
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0)))
        else {
            self.body_size = 12.0;
            return;
        };
        self.body_size = *body as f32 / 10.0;

        let mut larger: Vec<f32> = self
            .size_histogram
            .keys()
            .map(|k| *k as f32 / 10.0)
            .filter(|s| *s > self.body_size + 0.5)
            .collect();
        larger.sort_by(|a, b| by_f32(*b, *a));
        self.heading_sizes = larger;
    }

    /// Heading level for a size, or `None` for body text.
    ///
    /// Sizes matching a heading preset keep that preset's level; other
    /// large sizes are ranked among the sizes seen.
    pub fn heading_level(&self, size: f32) -> Option<u8> {
        if size < self.body_size + 1.5 {
            return None;
        }
        if let Some(i) = PRESET_HEADING_SIZES.iter().position(|p| (p - size).abs() <= 0.25) {
            return Some(i as u8 + 1);
        }
        let rank = self
            .heading_sizes
            .iter()
            .position(|h| size >= h - 0.5)
            .unwrap_or(4);
        Some((rank + 1).min(6) as u8)
    }
}

/// Group runs into lines by baseline, top to bottom.
pub fn group_into_lines(runs: Vec<TextRun>) -> Vec<Line> {
    let mut runs = runs;
    runs.sort_by(|a, b| by_f32(b.y, a.y).then(by_f32(a.x, b.x)));

    let mut lines = Vec::new();
    let mut current: Vec<TextRun> = Vec::new();
    let mut current_y: Option<f32> = None;

    for run in runs {
        let tolerance = run.font_size * 0.3;
        match current_y {
            Some(y) if (run.y - y).abs() <= tolerance => current.push(run),
            _ => {
                if !current.is_empty() {
                    lines.push(Line::from_runs(std::mem::take(&mut current)));
                }
                current_y = Some(run.y);
                current.push(run);
            }
        }
    }
    if !current.is_empty() {
        lines.push(Line::from_runs(current));
    }
    lines
}

/// Mark heading lines.
pub fn detect_headings(lines: &mut [Line], stats: &FontStatistics) {
    for line in lines.iter_mut() {
        line.heading = stats.heading_level(line.font_size);
    }
}

/// Smallest baseline distance between lines of one size, capped at 1.25 em.
fn line_pitch(lines: &[Line], size: f32) -> f32 {
    let observed = lines
        .windows(2)
        .filter(|w| (w[0].font_size - size).abs() < 0.5 && (w[1].font_size - size).abs() < 0.5)
        .map(|w| (w[0].y - w[1].y).abs())
        .filter(|s| *s > 0.1)
        .fold(f32::MAX, f32::min);
    observed.min(size * 1.25)
}

fn should_break(prev: &Line, curr: &Line, pitch: f32) -> bool {
    if prev.heading != curr.heading {
        return true;
    }
    if (prev.y - curr.y).abs() > pitch * 1.3 {
        return true;
    }
    if (prev.font_size - curr.font_size).abs() > 1.0 {
        return true;
    }
    curr.heading.is_none() && (prev.x - curr.x).abs() > 20.0
}

/// Group lines into paragraphs on spacing, font size, indent and heading changes.
pub fn group_into_paragraphs(lines: Vec<Line>) -> Vec<Paragraph> {
    let pitches: Vec<f32> = lines.iter().map(|l| line_pitch(&lines, l.font_size)).collect();
    let mut paragraphs: Vec<Paragraph> = Vec::new();

    for (line, pitch) in lines.into_iter().zip(pitches) {
        let heading = line.heading;
        match paragraphs.last_mut() {
            Some(p) if p.lines.last().is_some_and(|prev| !should_break(prev, &line, pitch)) => {
                p.lines.push(line)
            }
            _ => paragraphs.push(Paragraph {
                lines: vec![line],
                heading,
            }),
        }
    }
    paragraphs
}

/// Check if a character belongs to a script written without spaces.
pub fn is_spaceless_script_char(c: char) -> bool {
    matches!(c,
        '\u{3040}'..='\u{30FF}'
        | '\u{3400}'..='\u{4DBF}'
        | '\u{4E00}'..='\u{9FFF}'
        | '\u{F900}'..='\u{FAFF}'
        | '\u{0E00}'..='\u{0E7F}'
        | '\u{3000}'..='\u{303F}'
        | '\u{FF00}'..='\u{FFEF}'
    )
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn run(text: &str, x: f32, y: f32, size: f32) -> TextRun {
        let width = StandardFont::Helvetica.text_width(text, size);
        TextRun {
            text: text.to_string(),
            x,
            y,
            width,
            font_size: size,
            font_name: "Helvetica".to_string(),
            bold: false,
            italic: false,
            colour: Colour::BLACK,
            glyphs: text.len(),
            kerning: 0.0,
            degraded: false,
        }
    }

    #[test]
    fn test_font_statistics() {
        let mut stats = FontStatistics::default();
        stats.add(11.0, 500);
        stats.add(18.0, 20);
        stats.add(30.0, 10);
        stats.analyze();
        assert_eq!(stats.body_size, 11.0);
        assert_eq!(stats.heading_level(11.0), None);
        assert_eq!(stats.heading_level(18.0), Some(2));
        assert_eq!(stats.heading_level(30.0), Some(1));
    }

    #[test]
    fn test_group_into_lines_by_baseline() {
        let runs = vec![
            run("world", 60.0, 700.5, 11.0),
            run("Hello", 10.0, 700.0, 11.0),
            run("Next", 10.0, 686.8, 11.0),
        ];
        let lines = group_into_lines(runs);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text(), "Hello world");
        assert_eq!(lines[1].text(), "Next");
    }

    #[test]
    fn test_adjacent_runs_join_without_space() {
        let first = run("Hel", 10.0, 700.0, 11.0);
        let second = run("lo", first.right(), 700.0, 11.0);
        let lines = group_into_lines(vec![first, second]);
        assert_eq!(lines[0].text(), "Hello");
    }

    #[test]
    fn test_paragraph_break_on_spacing() {
        let runs = vec![
            run("First line", 72.0, 700.0, 11.0),
            run("second line", 72.0, 686.8, 11.0),
            run("New paragraph", 72.0, 657.6, 11.0),
        ];
        let paragraphs = group_into_paragraphs(group_into_lines(runs));
        assert_eq!(paragraphs.len(), 2);
        assert_eq!(paragraphs[0].text(), "First line second line");
    }

    #[test]
    fn test_clean_paragraph_confidence() {
        let paragraphs =
            group_into_paragraphs(group_into_lines(vec![run("Clean text", 72.0, 700.0, 11.0)]));
        assert_eq!(paragraphs[0].confidence(), MAX_TEXT_CONFIDENCE);
    }

    #[test]
    fn test_glyph_by_glyph_confidence_drops() {
        let mut x = 72.0;
        let mut runs = Vec::new();
        for (i, c) in "jitter".chars().enumerate() {
            let r = run(&c.to_string(), x, 700.0, 11.0);
            x = r.right() + if i % 2 == 0 { 0.9 } else { -0.6 };
            runs.push(r);
        }
        let paragraphs = group_into_paragraphs(group_into_lines(runs));
        assert_eq!(paragraphs.len(), 1);
        assert!(paragraphs[0].confidence() < 0.7);
    }

    #[test]
    fn test_spaceless_script() {
        assert!(is_spaceless_script_char('中'));
        assert!(!is_spaceless_script_char('a'));
    }
}
