//! # kurbypdf
//!
//! Structured documents to paginated PDF, and back again.
//!
//! The generation path binds a JSON description into the document model,
//! lays its blocks out on pages and renders PDF bytes. The extraction path
//! reads an existing PDF and reconstructs the model heuristically, tagging
//! every recovered element with a confidence score. A watermark module hides
//! an encrypted, signed claims payload inside existing PDFs.
//!
//! ## Quick Start
//!
//! ```no_run
//! use kurbypdf::{extract, generate};
//!
//! fn main() -> kurbypdf::Result<()> {
//!     let pdf = generate(r#"{"title": "Report", "body": "A short paragraph."}"#)?;
//!     std::fs::write("report.pdf", &pdf)?;
//!
//!     let recovered = extract(&pdf)?;
//!     println!("{}", recovered.document.plain_text());
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Binding**: validated JSON input with field paths in every error
//! - **Layout**: text wrapping, table row splitting, strict document order
//! - **Rendering**: Standard 14 fonts, JPEG/PNG images, ruled tables
//! - **Extraction**: lines, paragraphs, headings and tables with confidence
//! - **Watermarking**: AES-encrypted, HMAC-signed claims hidden in pages
//! - **Parallel processing**: Rayon for batches and multi-page extraction

pub mod binding;
pub mod detect;
pub mod error;
pub mod extract;
pub mod font;
pub mod layout;
pub mod model;
pub mod render;
pub mod watermark;

pub use binding::{from_model, from_model_string, to_model, to_model_str, JsonFormat};
pub use detect::{detect_format_from_bytes, detect_format_from_path, is_pdf_bytes, PdfFormat};
pub use error::{Error, Result};
pub use extract::{ExtractOptions, Extraction, PageSelection};
pub use font::{FontFamily, FontRegistry, StandardFont};
pub use layout::{layout, layout_document};
pub use model::{
    Alignment, Block, Colour, Document, ElementKind, ExtractedElement, ImageBlock, ImageFormat,
    Margins, Metadata, Page, PageConstraints, PageSize, Rect, StyleAttributes, TableBlock,
    TableCell, TableRow, TextBlock,
};
pub use render::{render, RenderOptions};
pub use watermark::{
    verify_detailed, watermark, EmbedOptions, Verification, VerifyReason, WatermarkKeys,
    WatermarkRequest, WatermarkResult,
};

use rayon::prelude::*;
use serde_json::Value;
use std::path::Path;

/// Crate version, written into the PDF producer field.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Generate a PDF from a JSON document description.
///
/// # Example
///
/// ```no_run
/// let pdf = kurbypdf::generate(r#"{"body": [{"type": "text", "text": "Hello"}]}"#).unwrap();
/// assert!(pdf.starts_with(b"%PDF-"));
/// ```
pub fn generate(json: &str) -> Result<Vec<u8>> {
    KurbyPdf::new().generate(json)
}

/// Generate a PDF from an already parsed JSON value.
pub fn generate_value(input: &Value) -> Result<Vec<u8>> {
    KurbyPdf::new().generate_value(input)
}

/// Lay out and render a document built in code.
pub fn generate_document(doc: &Document) -> Result<Vec<u8>> {
    KurbyPdf::new().generate_document(doc)
}

/// Generate several independent documents in parallel.
///
/// Results keep the order of the inputs; one failing document does not
/// affect the others.
pub fn generate_many(inputs: &[Value]) -> Vec<Result<Vec<u8>>> {
    let builder = KurbyPdf::new();
    inputs
        .par_iter()
        .map(|input| builder.generate_value(input))
        .collect()
}

/// Reconstruct a document from PDF bytes with default options.
///
/// # Example
///
/// ```no_run
/// let data = std::fs::read("document.pdf").unwrap();
/// let extraction = kurbypdf::extract(&data).unwrap();
/// for element in &extraction.elements {
///     println!("{:?} {:.2}", element.kind, element.confidence);
/// }
/// ```
pub fn extract(data: &[u8]) -> Result<Extraction> {
    extract::extract(data, &ExtractOptions::default())
}

/// Reconstruct a document from a PDF file.
pub fn extract_file<P: AsRef<Path>>(path: P) -> Result<Extraction> {
    let data = std::fs::read(path)?;
    extract(&data)
}

/// Reconstruct a document and return its structured JSON description.
pub fn extract_to_json(data: &[u8], format: JsonFormat) -> Result<String> {
    let extraction = extract(data)?;
    from_model_string(&extraction.document, format)
}

/// Builder for generating, extracting and watermarking documents.
///
/// # Example
///
/// ```no_run
/// use kurbypdf::{KurbyPdf, PageConstraints, PageSize, WatermarkKeys, WatermarkRequest};
///
/// let keys = WatermarkKeys::new(b"hmac secret".to_vec(), vec![0u8; 32])?;
/// let pdf = KurbyPdf::new()
///     .with_page(PageConstraints::new(PageSize::LETTER))
///     .with_compression(false)
///     .with_watermark(WatermarkRequest::new(keys).with_claim("user", "alice"))
///     .generate(r#"{"title": "Memo", "body": "Confidential."}"#)?;
/// # Ok::<(), kurbypdf::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct KurbyPdf {
    page: Option<PageConstraints>,
    render_options: RenderOptions,
    extract_options: ExtractOptions,
    watermark: Option<WatermarkRequest>,
}

impl KurbyPdf {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the page constraints of every generated document.
    pub fn with_page(mut self, page: PageConstraints) -> Self {
        self.page = Some(page);
        self
    }

    /// Set render options.
    pub fn with_render_options(mut self, options: RenderOptions) -> Self {
        self.render_options = options;
        self
    }

    /// Enable or disable content stream compression.
    pub fn with_compression(mut self, compress: bool) -> Self {
        self.render_options = self.render_options.with_compression(compress);
        self
    }

    /// Set extraction options.
    pub fn with_extract_options(mut self, options: ExtractOptions) -> Self {
        self.extract_options = options;
        self
    }

    /// Extract only the selected pages.
    pub fn with_pages(mut self, pages: PageSelection) -> Self {
        self.extract_options = self.extract_options.with_pages(pages);
        self
    }

    /// Disable parallel processing.
    pub fn sequential(mut self) -> Self {
        self.extract_options = self.extract_options.sequential();
        self
    }

    /// Watermark every generated PDF.
    pub fn with_watermark(mut self, request: WatermarkRequest) -> Self {
        self.watermark = Some(request);
        self
    }

    /// Lay out a document with the builder's page constraints, or its own.
    pub fn layout(&self, doc: &Document) -> Result<Document> {
        layout::layout(doc, self.page.as_ref().unwrap_or(&doc.page))
    }

    /// Generate a PDF from JSON text.
    pub fn generate(&self, json: &str) -> Result<Vec<u8>> {
        self.generate_document(&to_model_str(json)?)
    }

    /// Generate a PDF from a JSON value.
    pub fn generate_value(&self, input: &Value) -> Result<Vec<u8>> {
        self.generate_document(&to_model(input)?)
    }

    /// Lay out, render and optionally watermark a document.
    pub fn generate_document(&self, doc: &Document) -> Result<Vec<u8>> {
        let laid_out = self.layout(doc)?;
        let pdf = render::render(&laid_out, &self.render_options)?;
        match &self.watermark {
            Some(request) => Ok(watermark::watermark(&pdf, request)?.pdf),
            None => Ok(pdf),
        }
    }

    /// Extract a document from PDF bytes.
    pub fn extract(&self, data: &[u8]) -> Result<Extraction> {
        extract::extract(data, &self.extract_options)
    }
}
