//! Standard-14 fonts: metrics, encoding, and the family registry.
//!
//! Layout measures text with these metrics, the renderer references the
//! faces by base name, and extraction uses them to size text runs from
//! PDFs that omit `/Widths`.

mod metrics;
pub mod winansi;

pub use metrics::FontMetrics;

use std::collections::HashMap;
use std::sync::{OnceLock, RwLock};

/// One of the twelve Latin Standard-14 faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StandardFont {
    Helvetica,
    HelveticaBold,
    HelveticaOblique,
    HelveticaBoldOblique,
    TimesRoman,
    TimesBold,
    TimesItalic,
    TimesBoldItalic,
    Courier,
    CourierBold,
    CourierOblique,
    CourierBoldOblique,
}

impl StandardFont {
    /// PostScript name used as `/BaseFont`.
    pub fn base_name(&self) -> &'static str {
        match self {
            StandardFont::Helvetica => "Helvetica",
            StandardFont::HelveticaBold => "Helvetica-Bold",
            StandardFont::HelveticaOblique => "Helvetica-Oblique",
            StandardFont::HelveticaBoldOblique => "Helvetica-BoldOblique",
            StandardFont::TimesRoman => "Times-Roman",
            StandardFont::TimesBold => "Times-Bold",
            StandardFont::TimesItalic => "Times-Italic",
            StandardFont::TimesBoldItalic => "Times-BoldItalic",
            StandardFont::Courier => "Courier",
            StandardFont::CourierBold => "Courier-Bold",
            StandardFont::CourierOblique => "Courier-Oblique",
            StandardFont::CourierBoldOblique => "Courier-BoldOblique",
        }
    }

    /// Match a `/BaseFont` name, ignoring subset prefixes like `ABCDEF+`.
    ///
    /// Arial is metric-compatible with Helvetica and maps onto it.
    pub fn from_base_name(name: &str) -> Option<Self> {
        let name = match name.split_once('+') {
            Some((prefix, rest)) if prefix.len() == 6 => rest,
            _ => name,
        };
        let lower = name.to_ascii_lowercase();
        let bold = lower.contains("bold");
        let italic = lower.contains("italic") || lower.contains("oblique");

        let family = if lower.starts_with("helvetica") || lower.starts_with("arial") {
            FontFamily::HELVETICA
        } else if lower.starts_with("times") {
            FontFamily::TIMES
        } else if lower.starts_with("courier") {
            FontFamily::COURIER
        } else {
            return None;
        };
        Some(family.face(bold, italic))
    }

    /// Family name as used in style attributes.
    pub fn family_name(&self) -> &'static str {
        match self {
            StandardFont::Helvetica
            | StandardFont::HelveticaBold
            | StandardFont::HelveticaOblique
            | StandardFont::HelveticaBoldOblique => "Helvetica",
            StandardFont::TimesRoman
            | StandardFont::TimesBold
            | StandardFont::TimesItalic
            | StandardFont::TimesBoldItalic => "Times",
            _ => "Courier",
        }
    }

    /// Whether this is a bold face.
    pub fn is_bold(&self) -> bool {
        self.base_name().contains("Bold")
    }

    /// Whether this is an italic or oblique face.
    pub fn is_italic(&self) -> bool {
        let name = self.base_name();
        name.contains("Italic") || name.contains("Oblique")
    }

    /// Width table and vertical metrics.
    pub fn metrics(&self) -> &'static FontMetrics {
        match self {
            StandardFont::Helvetica | StandardFont::HelveticaOblique => &metrics::HELVETICA,
            StandardFont::HelveticaBold | StandardFont::HelveticaBoldOblique => {
                &metrics::HELVETICA_BOLD
            }
            StandardFont::TimesRoman => &metrics::TIMES_ROMAN,
            StandardFont::TimesBold => &metrics::TIMES_BOLD,
            StandardFont::TimesItalic => &metrics::TIMES_ITALIC,
            StandardFont::TimesBoldItalic => &metrics::TIMES_BOLD_ITALIC,
            _ => &metrics::COURIER,
        }
    }

    /// Advance width of a WinAnsi code in 1/1000 em.
    pub fn code_width(&self, code: u8) -> u16 {
        self.metrics().widths[code as usize]
    }

    /// Advance width of a character in 1/1000 em. Unencodable characters
    /// measure as `?`, which is what gets drawn.
    pub fn char_width(&self, c: char) -> u16 {
        self.code_width(winansi::encode_char(c).unwrap_or(b'?'))
    }

    /// Width of `text` at `size` points.
    pub fn text_width(&self, text: &str, size: f32) -> f32 {
        let units: u32 = text.chars().map(|c| self.char_width(c) as u32).sum();
        units as f32 * size / 1000.0
    }

    /// Ascender height at `size` points.
    pub fn ascent(&self, size: f32) -> f32 {
        self.metrics().ascent as f32 * size / 1000.0
    }

    /// Descender depth at `size` points (negative).
    pub fn descent(&self, size: f32) -> f32 {
        self.metrics().descent as f32 * size / 1000.0
    }
}

/// The four faces of a family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FontFamily {
    pub regular: StandardFont,
    pub bold: StandardFont,
    pub italic: StandardFont,
    pub bold_italic: StandardFont,
}

impl FontFamily {
    pub const HELVETICA: FontFamily = FontFamily {
        regular: StandardFont::Helvetica,
        bold: StandardFont::HelveticaBold,
        italic: StandardFont::HelveticaOblique,
        bold_italic: StandardFont::HelveticaBoldOblique,
    };

    pub const TIMES: FontFamily = FontFamily {
        regular: StandardFont::TimesRoman,
        bold: StandardFont::TimesBold,
        italic: StandardFont::TimesItalic,
        bold_italic: StandardFont::TimesBoldItalic,
    };

    pub const COURIER: FontFamily = FontFamily {
        regular: StandardFont::Courier,
        bold: StandardFont::CourierBold,
        italic: StandardFont::CourierOblique,
        bold_italic: StandardFont::CourierBoldOblique,
    };

    /// Pick the face for a weight and slant.
    pub fn face(&self, bold: bool, italic: bool) -> StandardFont {
        match (bold, italic) {
            (false, false) => self.regular,
            (true, false) => self.bold,
            (false, true) => self.italic,
            (true, true) => self.bold_italic,
        }
    }
}

/// Maps family names used in styles onto Standard-14 faces.
///
/// Built-in names are installed once when the global registry is first
/// touched. Registration takes the write lock; lookups only ever take the
/// read lock, so concurrent layout and render passes do not contend.
#[derive(Debug)]
pub struct FontRegistry {
    families: RwLock<HashMap<String, FontFamily>>,
}

impl FontRegistry {
    /// A registry holding only the built-in family names.
    pub fn with_builtins() -> Self {
        let builtins = [
            ("helvetica", FontFamily::HELVETICA),
            ("arial", FontFamily::HELVETICA),
            ("sans-serif", FontFamily::HELVETICA),
            ("times", FontFamily::TIMES),
            ("times-roman", FontFamily::TIMES),
            ("times new roman", FontFamily::TIMES),
            ("serif", FontFamily::TIMES),
            ("courier", FontFamily::COURIER),
            ("courier new", FontFamily::COURIER),
            ("monospace", FontFamily::COURIER),
        ];
        Self {
            families: RwLock::new(
                builtins
                    .into_iter()
                    .map(|(name, family)| (name.to_string(), family))
                    .collect(),
            ),
        }
    }

    /// The process-wide registry.
    pub fn global() -> &'static FontRegistry {
        static REGISTRY: OnceLock<FontRegistry> = OnceLock::new();
        REGISTRY.get_or_init(FontRegistry::with_builtins)
    }

    /// Register a family name. Returns `false` if the name was already taken
    /// (the existing mapping is kept).
    pub fn register(&self, name: &str, family: FontFamily) -> bool {
        let key = name.trim().to_ascii_lowercase();
        let mut families = self.families.write().unwrap_or_else(|e| e.into_inner());
        if families.contains_key(&key) {
            return false;
        }
        log::debug!("Registered font family '{}'", name);
        families.insert(key, family);
        true
    }

    /// Whether a family name is known.
    pub fn contains(&self, name: &str) -> bool {
        self.family(name).is_some()
    }

    /// Look up a family by name (case-insensitive).
    pub fn family(&self, name: &str) -> Option<FontFamily> {
        let families = self.families.read().unwrap_or_else(|e| e.into_inner());
        families.get(&name.trim().to_ascii_lowercase()).copied()
    }

    /// Resolve a family, weight and slant to a face.
    pub fn resolve(&self, name: &str, bold: bool, italic: bool) -> Option<StandardFont> {
        self.family(name).map(|f| f.face(bold, italic))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_helvetica_known_widths() {
        let font = StandardFont::Helvetica;
        assert_eq!(font.char_width(' '), 278);
        assert_eq!(font.char_width('A'), 667);
        assert_eq!(font.char_width('a'), 556);
        assert_eq!(font.char_width('W'), 944);
    }

    #[test]
    fn test_courier_is_monospaced() {
        let font = StandardFont::CourierBold;
        assert_eq!(font.text_width("iiii", 10.0), font.text_width("MMMM", 10.0));
        assert!((font.text_width("abc", 10.0) - 18.0).abs() < 1e-4);
    }

    #[test]
    fn test_text_width_scales_with_size() {
        let font = StandardFont::TimesRoman;
        let w10 = font.text_width("Hello", 10.0);
        let w20 = font.text_width("Hello", 20.0);
        assert!((w20 - 2.0 * w10).abs() < 1e-4);
    }

    #[test]
    fn test_from_base_name() {
        assert_eq!(
            StandardFont::from_base_name("Helvetica-Bold"),
            Some(StandardFont::HelveticaBold)
        );
        assert_eq!(
            StandardFont::from_base_name("ABCDEF+Times-Italic"),
            Some(StandardFont::TimesItalic)
        );
        assert_eq!(
            StandardFont::from_base_name("ArialMT"),
            Some(StandardFont::Helvetica)
        );
        assert_eq!(StandardFont::from_base_name("NanumGothic"), None);
    }

    #[test]
    fn test_registry_builtins() {
        let registry = FontRegistry::with_builtins();
        assert_eq!(
            registry.resolve("Times", true, true),
            Some(StandardFont::TimesBoldItalic)
        );
        assert_eq!(
            registry.resolve("monospace", false, false),
            Some(StandardFont::Courier)
        );
        assert!(!registry.contains("Comic Sans"));
    }

    #[test]
    fn test_registry_register_once() {
        let registry = FontRegistry::with_builtins();
        assert!(registry.register("Corporate", FontFamily::TIMES));
        assert!(!registry.register("corporate", FontFamily::COURIER));
        assert_eq!(
            registry.resolve("CORPORATE", false, false),
            Some(StandardFont::TimesRoman)
        );
    }

    #[test]
    fn test_registry_concurrent_reads() {
        let registry = FontRegistry::global();
        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    for _ in 0..100 {
                        assert!(registry.contains("Helvetica"));
                    }
                });
            }
        });
    }
}
