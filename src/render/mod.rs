//! Render backend: laid-out documents to PDF bytes.
//!
//! Every page of a laid-out [`Document`] becomes one PDF page. Text is set in
//! the Standard 14 fonts with WinAnsi encoding, so no font program is
//! embedded. Output is deterministic for a given document and options.

mod canvas;
mod draw;
mod image;

pub use canvas::Canvas;
pub use image::{encode_image, EncodedImage};

use crate::error::{Error, Result};
use crate::font::StandardFont;
use crate::model::{Block, Colour, Document, Metadata, Page, StyleCascade};
use draw::{render_face, PagePainter};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::{Dictionary, Object, ObjectId, Stream, StringFormat};
use std::collections::BTreeMap;
use std::io::Write;

/// Zlib-compress `data` for a FlateDecode stream.
pub(crate) fn deflate(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

/// Options for PDF output.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Flate-compress page content streams
    pub compress: bool,

    /// Header version, e.g. "1.7"
    pub pdf_version: String,

    /// Value of the Producer entry in the info dictionary
    pub producer: String,

    /// Stroke cell borders of tables
    pub table_borders: bool,

    /// Colour of table borders
    pub border_colour: Colour,

    /// Width of table borders in points
    pub border_width: f32,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            compress: true,
            pdf_version: "1.7".to_string(),
            producer: format!("KurbyPdf {}", crate::VERSION),
            table_borders: true,
            border_colour: Colour::BLACK,
            border_width: 0.5,
        }
    }
}

impl RenderOptions {
    /// Create new render options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable content stream compression.
    pub fn with_compression(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    /// Set the PDF header version.
    pub fn with_pdf_version(mut self, version: impl Into<String>) -> Self {
        self.pdf_version = version.into();
        self
    }

    /// Set the producer string.
    pub fn with_producer(mut self, producer: impl Into<String>) -> Self {
        self.producer = producer.into();
        self
    }

    /// Enable or disable table borders.
    pub fn with_table_borders(mut self, borders: bool) -> Self {
        self.table_borders = borders;
        self
    }

    /// Set table border colour and width.
    pub fn with_border(mut self, colour: Colour, width: f32) -> Self {
        self.border_colour = colour;
        self.border_width = width;
        self
    }
}

/// Render a laid-out document to PDF bytes.
///
/// Fails with a render error when the document has no pages, a block has no
/// bounding box, a font is not registered, or image data cannot be decoded.
pub fn render(doc: &Document, options: &RenderOptions) -> Result<Vec<u8>> {
    if doc.pages.is_empty() {
        return Err(Error::render("document", "document has no laid-out pages"));
    }

    let cascade = StyleCascade::new(&doc.style);
    let mut writer = PdfWriter::new(&options.pdf_version);
    let pages_id = writer.pdf.new_object_id();

    let mut kids = Vec::with_capacity(doc.pages.len());
    for page in &doc.pages {
        let page_id = render_page(&mut writer, page, pages_id, &cascade, options)?;
        kids.push(Object::Reference(page_id));
    }

    let mut pages = Dictionary::new();
    pages.set("Type", Object::Name(b"Pages".to_vec()));
    pages.set("Count", Object::Integer(kids.len() as i64));
    pages.set("Kids", Object::Array(kids));
    writer.pdf.objects.insert(pages_id, Object::Dictionary(pages));

    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference(pages_id));
    let catalog_id = writer.pdf.add_object(catalog);
    writer.pdf.trailer.set("Root", Object::Reference(catalog_id));

    let info_id = writer.pdf.add_object(info_dictionary(&doc.metadata, &options.producer));
    writer.pdf.trailer.set("Info", Object::Reference(info_id));

    let mut bytes = Vec::new();
    writer
        .pdf
        .save_to(&mut bytes)
        .map_err(|e| Error::render("document", format!("failed to write PDF: {}", e)))?;

    log::info!(
        "Rendered {} pages into {} bytes",
        doc.pages.len(),
        bytes.len()
    );
    Ok(bytes)
}

/// The output document with fonts shared across pages.
struct PdfWriter {
    pdf: lopdf::Document,
    fonts: BTreeMap<StandardFont, ObjectId>,
}

impl PdfWriter {
    fn new(version: &str) -> Self {
        Self {
            pdf: lopdf::Document::with_version(version),
            fonts: BTreeMap::new(),
        }
    }

    fn font(&mut self, face: StandardFont) -> ObjectId {
        if let Some(id) = self.fonts.get(&face) {
            return *id;
        }
        let mut dict = Dictionary::new();
        dict.set("Type", Object::Name(b"Font".to_vec()));
        dict.set("Subtype", Object::Name(b"Type1".to_vec()));
        dict.set("BaseFont", Object::Name(face.base_name().as_bytes().to_vec()));
        dict.set("Encoding", Object::Name(b"WinAnsiEncoding".to_vec()));
        let id = self.pdf.add_object(dict);
        self.fonts.insert(face, id);
        id
    }
}

fn render_page(
    writer: &mut PdfWriter,
    page: &Page,
    pages_id: ObjectId,
    cascade: &StyleCascade,
    options: &RenderOptions,
) -> Result<ObjectId> {
    let mut painter = PagePainter::new(page.height, cascade, options);

    for (index, block) in page.blocks.iter().enumerate() {
        let label = block.label(|| format!("page {} block {}", page.number, index));
        let bbox = block.bbox().ok_or_else(|| {
            Error::render(&label, "block has no bounding box; lay the document out first")
        })?;
        let style = cascade.block(block);
        match block {
            Block::Text(text) => painter.text(&label, text, &style, bbox)?,
            Block::Image(image) => {
                painter.image(index, image, bbox);
            }
            Block::Table(table) => {
                // Validate the table style itself even when every cell overrides it.
                render_face(&label, &style)?;
                painter.table(&label, table, &style, bbox)?
            }
        }
    }

    let mut font_dict = Dictionary::new();
    for (face, name) in &painter.resources.fonts {
        let id = writer.font(*face);
        font_dict.set(name.as_bytes().to_vec(), Object::Reference(id));
    }

    let mut xobjects = Dictionary::new();
    for (name, index) in &painter.resources.images {
        let Some(Block::Image(image)) = page.blocks.get(*index) else {
            continue;
        };
        let label = page.blocks[*index].label(|| format!("page {} block {}", page.number, index));
        let data = image.data.as_deref().unwrap_or_default();
        let encoded = encode_image(data)
            .map_err(|e| Error::render(&label, format!("cannot decode image: {}", e)))?;
        let mut stream = encoded.image;
        if let Some(mask) = encoded.mask {
            let mask_id = writer.pdf.add_object(mask);
            stream.dict.set("SMask", Object::Reference(mask_id));
        }
        let id = writer.pdf.add_object(stream);
        xobjects.set(name.as_bytes().to_vec(), Object::Reference(id));
    }

    let content = painter
        .canvas
        .into_content()
        .encode()
        .map_err(|e| Error::render(format!("page {}", page.number), e.to_string()))?;
    let stream = if options.compress {
        let compressed = deflate(&content)?;
        let mut dict = Dictionary::new();
        dict.set("Filter", Object::Name(b"FlateDecode".to_vec()));
        Stream::new(dict, compressed)
    } else {
        Stream::new(Dictionary::new(), content)
    };
    let content_id = writer.pdf.add_object(stream);

    let mut resources = Dictionary::new();
    resources.set("Font", Object::Dictionary(font_dict));
    if !xobjects.is_empty() {
        resources.set("XObject", Object::Dictionary(xobjects));
    }

    let mut dict = Dictionary::new();
    dict.set("Type", Object::Name(b"Page".to_vec()));
    dict.set("Parent", Object::Reference(pages_id));
    dict.set(
        "MediaBox",
        Object::Array(vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Real(page.width),
            Object::Real(page.height),
        ]),
    );
    dict.set("Resources", Object::Dictionary(resources));
    dict.set("Contents", Object::Reference(content_id));
    Ok(writer.pdf.add_object(dict))
}

/// Encode a text string: PDFDocEncoding-safe ASCII as a literal, anything
/// else as UTF-16BE with a byte order mark.
pub(crate) fn text_string(value: &str) -> Object {
    if value.is_ascii() {
        return Object::String(value.as_bytes().to_vec(), StringFormat::Literal);
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in value.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

fn info_dictionary(metadata: &Metadata, producer: &str) -> Dictionary {
    let mut info = Dictionary::new();
    let entries = [
        ("Title", &metadata.title),
        ("Author", &metadata.author),
        ("Subject", &metadata.subject),
        ("Keywords", &metadata.keywords),
        ("Creator", &metadata.creator),
    ];
    for (key, value) in entries {
        if let Some(value) = value {
            info.set(key, text_string(value));
        }
    }
    info.set("Producer", text_string(producer));
    if let Some(created) = metadata.created {
        let date = created.format("D:%Y%m%d%H%M%SZ").to_string();
        info.set("CreationDate", Object::String(date.into_bytes(), StringFormat::Literal));
    }
    info
}
