//! PDF backend abstraction layer.
//!
//! The interpreter and the clustering heuristics only see the types in this
//! module; `lopdf` stays behind [`LopdfBackend`].

use std::collections::{BTreeMap, HashMap};
use std::io::Cursor;
use std::sync::Arc;

use ::image::{DynamicImage, GrayImage, ImageFormat, RgbImage, RgbaImage};
use lopdf::{Dictionary, Document as LopdfDocument, Object, Stream};

use super::cmap::{code_value, ToUnicode};
use crate::error::{Error, Result};
use crate::font::{winansi, StandardFont};
use crate::model::{Metadata, Rect};

/// Page identifier: (object number, generation number).
pub type PageId = (u32, u16);

/// A value from a content stream operand.
#[derive(Debug, Clone)]
pub enum PdfValue {
    Integer(i64),
    Real(f32),
    Name(Vec<u8>),
    Str(Vec<u8>),
    Array(Vec<PdfValue>),
    Other,
}

impl PdfValue {
    /// Numeric value of an integer or real operand.
    pub fn as_number(&self) -> Option<f32> {
        match self {
            PdfValue::Integer(i) => Some(*i as f32),
            PdfValue::Real(r) => Some(*r),
            _ => None,
        }
    }
}

/// A single operation from a content stream.
#[derive(Debug, Clone)]
pub struct ContentOp {
    pub operator: String,
    pub operands: Vec<PdfValue>,
}

/// What the interpreter needs to know about a font resource.
#[derive(Debug, Clone)]
pub struct FontInfo {
    /// Base font name, e.g. "Helvetica-Bold"
    pub base_font: String,
    /// The Standard 14 face this font maps to, if any
    pub standard: Option<StandardFont>,
    /// First character code covered by `widths`
    pub first_char: u32,
    /// Glyph widths in thousandths of text space
    pub widths: Vec<f32>,
    /// Whether the font uses WinAnsiEncoding (or is a Standard 14 font)
    pub win_ansi: bool,
    /// Bytes per character code: 2 for composite (Type0) fonts, else 1
    pub code_bytes: usize,
    /// Mapping from the font's `/ToUnicode` stream
    pub to_unicode: Option<Arc<ToUnicode>>,
    /// Descendant font widths of a composite font
    pub cid_widths: Option<Arc<CidWidths>>,
}

/// `/DW` and `/W` widths of a CID font, in thousandths of text space.
#[derive(Debug, Clone, PartialEq)]
pub struct CidWidths {
    pub default: f32,
    pub widths: HashMap<u32, f32>,
}

impl CidWidths {
    pub fn width(&self, cid: u32) -> f32 {
        self.widths.get(&cid).copied().unwrap_or(self.default)
    }
}

impl Default for CidWidths {
    fn default() -> Self {
        Self {
            default: 1000.0,
            widths: HashMap::new(),
        }
    }
}

/// Text of one shown string, with the character codes it was shown with.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedString {
    pub text: String,
    pub codes: Vec<u32>,
    /// False when some code had no known Unicode value
    pub complete: bool,
}

impl FontInfo {
    /// Font info for an unknown resource name.
    pub fn unknown(name: &str) -> Self {
        Self {
            base_font: name.to_string(),
            standard: None,
            first_char: 0,
            widths: Vec::new(),
            win_ansi: false,
            code_bytes: 1,
            to_unicode: None,
            cid_widths: None,
        }
    }

    /// Whether codes are multi-byte CIDs.
    pub fn is_composite(&self) -> bool {
        self.code_bytes > 1
    }

    /// Advance width of a character code in thousandths of text space.
    pub fn code_width(&self, code: u32) -> f32 {
        if let Some(cid) = &self.cid_widths {
            return cid.width(code);
        }
        let explicit = code
            .checked_sub(self.first_char)
            .and_then(|i| self.widths.get(i as usize));
        match (explicit, self.standard, u8::try_from(code)) {
            (Some(w), _, _) if *w > 0.0 => *w,
            (_, Some(face), Ok(byte)) => face.code_width(byte) as f32,
            _ => 500.0,
        }
    }

    /// Whether the base font name marks a bold face.
    pub fn is_bold(&self) -> bool {
        let name = self.base_font.to_lowercase();
        name.contains("bold") || name.contains("black") || name.contains("heavy")
    }

    /// Whether the base font name marks an italic face.
    pub fn is_italic(&self) -> bool {
        let name = self.base_font.to_lowercase();
        name.contains("italic") || name.contains("oblique")
    }

    /// Decode string bytes shown with this font, without a ToUnicode map.
    pub fn decode(&self, bytes: &[u8]) -> String {
        if self.win_ansi {
            winansi::decode(bytes)
        } else {
            decode_text_simple(bytes)
        }
    }

    /// Split string bytes into character codes and map them to text.
    ///
    /// The ToUnicode map wins when present. Simple fonts fall back to their
    /// encoding; composite fonts have no fallback and their unmapped codes
    /// become U+FFFD.
    pub fn decode_string(&self, bytes: &[u8]) -> DecodedString {
        let chunks: Vec<&[u8]> = bytes.chunks(self.code_bytes.max(1)).collect();
        let codes: Vec<u32> = chunks.iter().map(|c| code_value(c)).collect();

        let Some(map) = self.to_unicode.as_deref() else {
            if self.is_composite() {
                return DecodedString {
                    text: char::REPLACEMENT_CHARACTER.to_string().repeat(codes.len()),
                    codes,
                    complete: false,
                };
            }
            return DecodedString {
                text: self.decode(bytes),
                codes,
                complete: true,
            };
        };

        let mut text = String::new();
        let mut complete = true;
        for (code, chunk) in codes.iter().zip(&chunks) {
            match map.lookup(*code) {
                Some(mapped) => text.push_str(mapped),
                None if !self.is_composite() => text.push_str(&self.decode(chunk)),
                None => {
                    text.push(char::REPLACEMENT_CHARACTER);
                    complete = false;
                }
            }
        }
        DecodedString {
            text,
            codes,
            complete,
        }
    }
}

/// Raster data of an image XObject, re-encoded as JPEG or PNG.
#[derive(Debug, Clone)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    /// JPEG or PNG bytes; `None` when the encoding is not supported
    pub data: Option<Vec<u8>>,
}

/// Abstract interface for PDF document access.
pub trait PdfBackend: Sync {
    /// All pages as page number (1-indexed) to page id.
    fn pages(&self) -> BTreeMap<u32, PageId>;

    /// The page's MediaBox in user space.
    fn media_box(&self, page: PageId) -> Rect;

    /// Font resources of a page by resource name.
    fn page_fonts(&self, page: PageId) -> BTreeMap<Vec<u8>, FontInfo>;

    /// Decompressed content stream bytes of a page.
    fn page_content(&self, page: PageId) -> Result<Vec<u8>>;

    /// Parse content stream bytes into operations.
    fn decode_content(&self, data: &[u8]) -> Result<Vec<ContentOp>>;

    /// An image XObject of a page by resource name; `None` for forms and
    /// missing resources.
    fn page_image(&self, page: PageId, name: &[u8]) -> Option<ImageData>;

    /// Document metadata from the Info dictionary.
    fn metadata(&self) -> Metadata;
}

/// Decode a text string: UTF-16BE with BOM, then UTF-8, then Latin-1.
pub fn decode_text_simple(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let utf16: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&utf16);
    }

    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }

    bytes.iter().map(|&b| b as char).collect()
}

/// Parse PDF bytes, decrypting with `password` when the document is encrypted.
pub fn load_document(data: &[u8], password: Option<&str>) -> Result<LopdfDocument> {
    let mut doc = LopdfDocument::load_mem(data)?;
    if doc.is_encrypted() {
        let Some(password) = password.filter(|p| !p.is_empty()) else {
            return Err(Error::Encrypted);
        };
        doc.decrypt(password).map_err(|e| match e {
            lopdf::Error::Decryption(_) => Error::InvalidPassword,
            other => Error::from(other),
        })?;
    }
    Ok(doc)
}

/// Concrete [`PdfBackend`] backed by `lopdf::Document`.
pub struct LopdfBackend {
    doc: LopdfDocument,
}

impl LopdfBackend {
    /// Load from an in-memory byte slice.
    pub fn load_bytes(data: &[u8]) -> Result<Self> {
        Self::load_bytes_with_password(data, None)
    }

    /// Load an in-memory document that may be password protected.
    pub fn load_bytes_with_password(data: &[u8], password: Option<&str>) -> Result<Self> {
        let doc = load_document(data, password)?;
        if doc.get_pages().is_empty() {
            return Err(Error::Extraction("document has no page tree".to_string()));
        }
        Ok(Self { doc })
    }

    /// Direct access to the underlying document.
    pub fn raw_doc(&self) -> &LopdfDocument {
        &self.doc
    }

    /// PDF header version.
    pub fn version(&self) -> String {
        self.doc.version.to_string()
    }

    fn resolve<'a>(&'a self, obj: &'a Object) -> Option<&'a Object> {
        match obj {
            Object::Reference(id) => self.doc.get_object(*id).ok(),
            other => Some(other),
        }
    }

    fn resolve_dict<'a>(&'a self, obj: &'a Object) -> Option<&'a Dictionary> {
        match self.resolve(obj)? {
            Object::Dictionary(dict) => Some(dict),
            Object::Stream(stream) => Some(&stream.dict),
            _ => None,
        }
    }

    /// Look up a page attribute, following the Parent chain for inherited keys.
    fn inherited(&self, page: PageId, key: &[u8]) -> Option<&Object> {
        let mut dict = self.doc.get_dictionary(page).ok()?;
        for _ in 0..32 {
            if let Ok(value) = dict.get(key) {
                return self.resolve(value);
            }
            let parent = dict.get(b"Parent").ok()?;
            dict = self.resolve_dict(parent)?;
        }
        None
    }

    fn resource_dict(&self, page: PageId, category: &[u8]) -> Option<&Dictionary> {
        let resources = self.inherited(page, b"Resources")?;
        let resources = self.resolve_dict(resources)?;
        self.resolve_dict(resources.get(category).ok()?)
    }

    fn font_info(&self, dict: &Dictionary) -> FontInfo {
        let base_font = dict
            .get(b"BaseFont")
            .ok()
            .and_then(|o| o.as_name().ok())
            .map(|n| String::from_utf8_lossy(n).to_string())
            .unwrap_or_else(|| "Unknown".to_string());
        let standard = StandardFont::from_base_name(&base_font);

        let encoding = dict
            .get(b"Encoding")
            .ok()
            .and_then(|o| self.resolve(o))
            .and_then(|o| match o {
                Object::Name(name) => Some(name.clone()),
                Object::Dictionary(d) => d
                    .get(b"BaseEncoding")
                    .ok()
                    .and_then(|b| b.as_name().ok())
                    .map(|b| b.to_vec()),
                _ => None,
            });
        let win_ansi = match encoding.as_deref() {
            Some(b"WinAnsiEncoding") => true,
            Some(_) => false,
            None => standard.is_some(),
        };

        let first_char = dict
            .get(b"FirstChar")
            .ok()
            .and_then(|o| number(o))
            .map(|n| n.max(0.0) as u32)
            .unwrap_or(0);
        let widths = dict
            .get(b"Widths")
            .ok()
            .and_then(|o| self.resolve(o))
            .and_then(|o| match o {
                Object::Array(items) => Some(
                    items
                        .iter()
                        .map(|w| self.resolve(w).and_then(number).unwrap_or(0.0))
                        .collect(),
                ),
                _ => None,
            })
            .unwrap_or_default();

        let to_unicode = dict
            .get(b"ToUnicode")
            .ok()
            .and_then(|o| self.resolve(o))
            .and_then(|o| match o {
                Object::Stream(stream) => Some(ToUnicode::parse(&stream_bytes(stream))),
                _ => None,
            })
            .filter(|map| !map.is_empty())
            .map(Arc::new);

        let composite = dict
            .get(b"Subtype")
            .ok()
            .and_then(|o| o.as_name().ok())
            == Some(b"Type0".as_slice());
        let (code_bytes, cid_widths) = if composite {
            if !matches!(encoding.as_deref(), Some(b"Identity-H" | b"Identity-V")) {
                log::debug!("Font {} has a non-identity CMap, reading two-byte codes", base_font);
            }
            (2, Some(Arc::new(self.cid_widths(dict))))
        } else {
            (1, None)
        };
        if composite && to_unicode.is_none() {
            log::warn!("Composite font {} has no ToUnicode map, its text is undecodable", base_font);
        }

        FontInfo {
            base_font,
            standard,
            first_char,
            widths,
            win_ansi,
            code_bytes,
            to_unicode,
            cid_widths,
        }
    }

    /// Widths of the first descendant of a Type0 font.
    fn cid_widths(&self, type0: &Dictionary) -> CidWidths {
        let descendant = type0
            .get(b"DescendantFonts")
            .ok()
            .and_then(|o| self.resolve(o))
            .and_then(|o| match o {
                Object::Array(items) => items.first(),
                _ => None,
            })
            .and_then(|o| self.resolve_dict(o));
        let Some(descendant) = descendant else {
            return CidWidths::default();
        };

        let default = descendant
            .get(b"DW")
            .ok()
            .and_then(|o| self.resolve(o))
            .and_then(number)
            .unwrap_or(1000.0);
        let widths = match descendant.get(b"W").ok().and_then(|o| self.resolve(o)) {
            Some(Object::Array(items)) => self.parse_w_array(items),
            _ => HashMap::new(),
        };
        CidWidths { default, widths }
    }

    /// Parse a `/W` array: `c [w1 w2 ...]` and `c_first c_last w` entries.
    fn parse_w_array(&self, items: &[Object]) -> HashMap<u32, f32> {
        const MAX_RUN: u32 = 0xFFFF;
        let value = |i: usize| items.get(i).and_then(|o| self.resolve(o));
        let cid = |o: &Object| number(o).filter(|n| *n >= 0.0).map(|n| n as u32);

        let mut widths = HashMap::new();
        let mut i = 0;
        while i < items.len() {
            let Some(first) = value(i).and_then(cid) else {
                i += 1;
                continue;
            };
            match value(i + 1) {
                Some(Object::Array(run)) => {
                    for (offset, w) in run.iter().enumerate().take(MAX_RUN as usize) {
                        if let Some(w) = self.resolve(w).and_then(number) {
                            widths.insert(first.saturating_add(offset as u32), w);
                        }
                    }
                    i += 2;
                }
                Some(last) => {
                    let last = cid(last).unwrap_or(first).min(first.saturating_add(MAX_RUN));
                    if let Some(w) = value(i + 2).and_then(number) {
                        for code in first..=last {
                            widths.insert(code, w);
                        }
                    }
                    i += 3;
                }
                None => break,
            }
        }
        widths
    }

    fn info_string(&self, info: &Dictionary, key: &[u8]) -> Option<String> {
        match self.resolve(info.get(key).ok()?)? {
            Object::String(bytes, _) => {
                let text = decode_text_simple(bytes);
                let text = text.trim();
                (!text.is_empty()).then(|| text.to_string())
            }
            _ => None,
        }
    }

    fn image_data(&self, stream: &Stream) -> Option<Vec<u8>> {
        let dict = &stream.dict;
        let width = dict.get(b"Width").ok().and_then(number)?;
        let height = dict.get(b"Height").ok().and_then(number)?;
        let Some(pixels) = pixel_count(width, height) else {
            log::warn!("Image of {}x{} pixels is empty or too large, data skipped", width, height);
            return None;
        };
        let (width, height) = (width as u32, height as u32);

        let filter = dict.get(b"Filter").ok().and_then(|f| match self.resolve(f)? {
            Object::Name(name) => Some(name.clone()),
            Object::Array(items) if items.len() == 1 => items[0].as_name().ok().map(|n| n.to_vec()),
            _ => None,
        });
        if filter.as_deref() == Some(b"DCTDecode") {
            return Some(stream.content.clone());
        }

        let bits = dict.get(b"BitsPerComponent").ok().and_then(number).unwrap_or(8.0);
        if bits != 8.0 {
            return None;
        }
        let colour_space = dict
            .get(b"ColorSpace")
            .ok()
            .and_then(|c| self.resolve(c))
            .and_then(|c| c.as_name().ok())
            .map(|c| c.to_vec());
        let raw = stream_bytes(stream);

        let alpha = dict
            .get(b"SMask")
            .ok()
            .and_then(|m| match self.resolve(m)? {
                Object::Stream(mask) => Some(stream_bytes(mask)),
                _ => None,
            })
            .filter(|m| m.len() == pixels);

        let image = match (colour_space.as_deref(), alpha) {
            (Some(b"DeviceRGB"), Some(alpha)) => {
                let mut rgba = Vec::with_capacity(alpha.len() * 4);
                for (pixel, a) in raw.chunks_exact(3).zip(alpha) {
                    rgba.extend_from_slice(pixel);
                    rgba.push(a);
                }
                DynamicImage::ImageRgba8(RgbaImage::from_raw(width, height, rgba)?)
            }
            (Some(b"DeviceRGB"), None) => DynamicImage::ImageRgb8(RgbImage::from_raw(width, height, raw)?),
            (Some(b"DeviceGray"), _) => DynamicImage::ImageLuma8(GrayImage::from_raw(width, height, raw)?),
            _ => return None,
        };

        let mut png = Cursor::new(Vec::new());
        image.write_to(&mut png, ImageFormat::Png).ok()?;
        Some(png.into_inner())
    }
}

/// Largest raster re-encoded during extraction.
const MAX_IMAGE_PIXELS: usize = 1 << 26;

/// Pixel count of a `width` x `height` raster, `None` when a dimension is
/// not a positive integer or the raster exceeds [`MAX_IMAGE_PIXELS`].
fn pixel_count(width: f32, height: f32) -> Option<usize> {
    let valid = |v: f32| v.is_finite() && v >= 1.0 && v.fract() == 0.0 && v <= u32::MAX as f32;
    if !(valid(width) && valid(height)) {
        return None;
    }
    (width as usize)
        .checked_mul(height as usize)
        .filter(|&pixels| pixels <= MAX_IMAGE_PIXELS)
}

/// Decoded stream data, or the raw bytes when the stream has no filter.
fn stream_bytes(stream: &Stream) -> Vec<u8> {
    if stream.dict.has(b"Filter") {
        stream.decompressed_content().unwrap_or_default()
    } else {
        stream.content.clone()
    }
}

fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

impl PdfBackend for LopdfBackend {
    fn pages(&self) -> BTreeMap<u32, PageId> {
        self.doc.get_pages()
    }

    fn media_box(&self, page: PageId) -> Rect {
        let values: Option<Vec<f32>> = match self.inherited(page, b"MediaBox") {
            Some(Object::Array(items)) if items.len() == 4 => items
                .iter()
                .map(|o| self.resolve(o).and_then(number))
                .collect(),
            _ => None,
        };
        match values {
            Some(v) => {
                let (x0, x1) = (v[0].min(v[2]), v[0].max(v[2]));
                let (y0, y1) = (v[1].min(v[3]), v[1].max(v[3]));
                Rect::new(x0, y0, x1 - x0, y1 - y0)
            }
            None => {
                log::warn!("Page {:?} has no usable MediaBox, assuming Letter", page);
                Rect::new(0.0, 0.0, 612.0, 792.0)
            }
        }
    }

    fn page_fonts(&self, page: PageId) -> BTreeMap<Vec<u8>, FontInfo> {
        let Some(fonts) = self.resource_dict(page, b"Font") else {
            return BTreeMap::new();
        };
        fonts
            .iter()
            .filter_map(|(name, obj)| {
                let dict = self.resolve_dict(obj)?;
                Some((name.clone(), self.font_info(dict)))
            })
            .collect()
    }

    fn page_content(&self, page: PageId) -> Result<Vec<u8>> {
        let page_dict = self.doc.get_dictionary(page)?;
        let contents = match page_dict.get(b"Contents") {
            Ok(contents) => contents,
            Err(_) => return Ok(Vec::new()),
        };

        let streams: Vec<&Object> = match self.resolve(contents) {
            Some(Object::Array(items)) => items.iter().collect(),
            Some(other) => vec![other],
            None => vec![],
        };

        let mut content = Vec::new();
        for obj in streams {
            match self.resolve(obj) {
                Some(Object::Stream(s)) => match s.decompressed_content() {
                    Ok(data) => content.extend_from_slice(&data),
                    Err(_) => content.extend_from_slice(&s.content),
                },
                _ => log::warn!("Skipping non-stream page content on {:?}", page),
            }
            content.push(b'\n');
        }
        Ok(content)
    }

    fn decode_content(&self, data: &[u8]) -> Result<Vec<ContentOp>> {
        let content = lopdf::content::Content::decode(data)?;
        Ok(content
            .operations
            .into_iter()
            .map(|op| ContentOp {
                operands: op.operands.iter().map(convert_object).collect(),
                operator: op.operator,
            })
            .collect())
    }

    fn page_image(&self, page: PageId, name: &[u8]) -> Option<ImageData> {
        let xobjects = self.resource_dict(page, b"XObject")?;
        let stream = match self.resolve(xobjects.get(name).ok()?)? {
            Object::Stream(stream) => stream,
            _ => return None,
        };
        let subtype = stream.dict.get(b"Subtype").ok()?.as_name().ok()?;
        if subtype != b"Image" {
            return None;
        }
        let width = stream.dict.get(b"Width").ok().and_then(number).unwrap_or(0.0) as u32;
        let height = stream.dict.get(b"Height").ok().and_then(number).unwrap_or(0.0) as u32;
        Some(ImageData {
            width,
            height,
            data: self.image_data(stream),
        })
    }

    fn metadata(&self) -> Metadata {
        let mut metadata = Metadata::default();
        let Some(info) = self
            .doc
            .trailer
            .get(b"Info")
            .ok()
            .and_then(|o| self.resolve_dict(o))
        else {
            return metadata;
        };
        metadata.title = self.info_string(info, b"Title");
        metadata.author = self.info_string(info, b"Author");
        metadata.subject = self.info_string(info, b"Subject");
        metadata.keywords = self.info_string(info, b"Keywords");
        metadata.creator = self.info_string(info, b"Creator");
        metadata.created = self
            .info_string(info, b"CreationDate")
            .and_then(|d| parse_pdf_date(&d));
        metadata
    }
}

/// Parse a PDF date string ("D:YYYYMMDDHHmmSS" with optional zone).
pub fn parse_pdf_date(value: &str) -> Option<chrono::DateTime<chrono::Utc>> {
    use chrono::{NaiveDate, TimeZone, Utc};

    let digits: String = value
        .trim_start_matches("D:")
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    let field = |from: usize, len: usize, default: u32| -> u32 {
        digits
            .get(from..from + len)
            .and_then(|s| s.parse().ok())
            .unwrap_or(default)
    };
    let year = digits.get(0..4)?.parse::<i32>().ok()?;
    let naive = NaiveDate::from_ymd_opt(year, field(4, 2, 1), field(6, 2, 1))?.and_hms_opt(
        field(8, 2, 0),
        field(10, 2, 0),
        field(12, 2, 0),
    )?;
    Some(Utc.from_utc_datetime(&naive))
}

fn convert_object(obj: &Object) -> PdfValue {
    match obj {
        Object::Integer(i) => PdfValue::Integer(*i),
        Object::Real(r) => PdfValue::Real(*r),
        Object::Name(n) => PdfValue::Name(n.clone()),
        Object::String(b, _) => PdfValue::Str(b.clone()),
        Object::Array(arr) => PdfValue::Array(arr.iter().map(convert_object).collect()),
        _ => PdfValue::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_decode_text_simple_utf8() {
        assert_eq!(decode_text_simple(b"Hello"), "Hello");
    }

    #[test]
    fn test_decode_text_simple_latin1() {
        let bytes = vec![0x48, 0x65, 0x6C, 0x6C, 0xE9];
        assert_eq!(decode_text_simple(&bytes), "Hellé");
    }

    #[test]
    fn test_decode_text_simple_utf16be() {
        let bytes = vec![0xFE, 0xFF, 0x00, 0x48, 0x00, 0x69];
        assert_eq!(decode_text_simple(&bytes), "Hi");
    }

    #[test]
    fn test_pdf_value_as_number() {
        assert_eq!(PdfValue::Integer(42).as_number(), Some(42.0));
        assert_eq!(PdfValue::Real(2.5).as_number(), Some(2.5));
        assert_eq!(PdfValue::Other.as_number(), None);
    }

    #[test]
    fn test_font_info_width_fallbacks() {
        let a = u32::from(b'a');
        let mut font = FontInfo::unknown("F9");
        assert_eq!(font.code_width(a), 500.0);

        font.standard = Some(StandardFont::Courier);
        assert_eq!(font.code_width(a), 600.0);
        assert_eq!(font.code_width(0x1234), 500.0);

        font.first_char = 97;
        font.widths = vec![250.0];
        assert_eq!(font.code_width(a), 250.0);
    }

    fn composite(to_unicode: Option<&[u8]>) -> FontInfo {
        let mut widths = HashMap::new();
        widths.insert(0x24, 600.0);
        FontInfo {
            code_bytes: 2,
            to_unicode: to_unicode.map(|data| Arc::new(ToUnicode::parse(data))),
            cid_widths: Some(Arc::new(CidWidths {
                default: 1000.0,
                widths,
            })),
            ..FontInfo::unknown("ABCDEF+Arial")
        }
    }

    #[test]
    fn test_composite_font_decoding() {
        let font = composite(Some(b"beginbfchar <0024> <0041> <0025> <0042> endbfchar"));
        let decoded = font.decode_string(&[0x00, 0x24, 0x00, 0x25]);
        assert_eq!(decoded.text, "AB");
        assert_eq!(decoded.codes, vec![0x24, 0x25]);
        assert!(decoded.complete);
        assert_eq!(font.code_width(0x24), 600.0);
        assert_eq!(font.code_width(0x25), 1000.0);
    }

    #[test]
    fn test_composite_font_without_map_is_incomplete() {
        let decoded = composite(None).decode_string(&[0x00, 0x24, 0x00, 0x25]);
        assert!(!decoded.complete);
        assert_eq!(decoded.text, "\u{FFFD}\u{FFFD}");

        let partial = composite(Some(b"beginbfchar <0024> <0041> endbfchar"))
            .decode_string(&[0x00, 0x24, 0x00, 0x99]);
        assert!(!partial.complete);
        assert_eq!(partial.text, "A\u{FFFD}");
    }

    #[test]
    fn test_simple_font_map_falls_back_to_encoding() {
        let font = FontInfo {
            win_ansi: true,
            to_unicode: Some(Arc::new(ToUnicode::parse(b"beginbfchar <01> <03A9> endbfchar"))),
            ..FontInfo::unknown("F1")
        };
        let decoded = font.decode_string(&[0x01, b'x']);
        assert_eq!(decoded.text, "\u{3A9}x");
        assert!(decoded.complete);
    }

    #[test]
    fn test_pixel_count_limits() {
        assert_eq!(pixel_count(4.0, 3.0), Some(12));
        assert_eq!(pixel_count(0.0, 3.0), None);
        assert_eq!(pixel_count(-2.0, 3.0), None);
        assert_eq!(pixel_count(2.5, 3.0), None);
        assert_eq!(pixel_count(70000.0, 70000.0), None);
        assert_eq!(pixel_count(f32::INFINITY, 1.0), None);
    }

    #[test]
    fn test_parse_pdf_date() {
        let date = parse_pdf_date("D:20240315093000Z").unwrap();
        assert_eq!((date.year(), date.month(), date.day()), (2024, 3, 15));
        assert_eq!((date.hour(), date.minute()), (9, 30));
        assert!(parse_pdf_date("yesterday").is_none());
    }

    #[test]
    fn test_load_rejects_garbage() {
        assert!(LopdfBackend::load_bytes(b"%PDF-1.7\nnot really").is_err());
    }
}
