//! Extraction engine: best-effort reconstruction of documents from PDF bytes.
//!
//! Each selected page is interpreted into text runs, rules and images (see
//! [`interpreter`]), then reassembled: ruled grids and column-aligned text
//! become tables, remaining runs are clustered into lines and paragraphs,
//! and headings are read off document-wide font statistics. Every element
//! carries a confidence score. Only input that is not a PDF container fails;
//! odd geometry lowers confidence instead.

pub mod backend;
mod cluster;
pub mod cmap;
pub mod interpreter;
mod options;
mod tables;

pub use backend::{decode_text_simple, load_document, LopdfBackend, PageId, PdfBackend};
pub use cluster::{FontStatistics, MAX_TEXT_CONFIDENCE};
pub use options::{ExtractOptions, PageSelection};
pub use tables::{DetectedTable, TableDetector, TableDetectorConfig};

use std::collections::BTreeSet;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::detect::detect_format_from_bytes;
use crate::error::Result;
use crate::model::{
    Block, Document, ExtractedElement, ImageBlock, Margins, Page, PageConstraints, PageSize, Rect,
    TextBlock,
};
use cluster::{detect_headings, group_into_lines, group_into_paragraphs};
use interpreter::{Interpreter, PageContent};

/// Confidence of an image with decodable data.
const IMAGE_CONFIDENCE: f32 = 0.85;

/// Confidence of an image whose encoding could not be carried over.
const OPAQUE_IMAGE_CONFIDENCE: f32 = 0.5;

/// Confidence of a run shown rotated or at a non-finite position.
const DEGRADED_CONFIDENCE: f32 = 0.25;

/// The result of extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extraction {
    /// Reconstructed document; `body` in reading order without boxes,
    /// `pages` with boxes
    pub document: Document,

    /// Every reconstructed block with its page, source box and confidence
    pub elements: Vec<ExtractedElement>,
}

impl Extraction {
    /// Mean confidence over all elements (0 when nothing was found).
    pub fn mean_confidence(&self) -> f32 {
        if self.elements.is_empty() {
            return 0.0;
        }
        self.elements.iter().map(|e| e.confidence).sum::<f32>() / self.elements.len() as f32
    }

    /// Elements of one page (1-indexed).
    pub fn elements_on(&self, page: u32) -> impl Iterator<Item = &ExtractedElement> {
        self.elements.iter().filter(move |e| e.page == page)
    }
}

/// Extract a document from PDF bytes.
pub fn extract(data: &[u8], options: &ExtractOptions) -> Result<Extraction> {
    let format = detect_format_from_bytes(data)?;
    log::debug!("Extracting from {}", format);
    let backend = LopdfBackend::load_bytes_with_password(data, options.password.as_deref())?;
    extract_with_backend(&backend, options)
}

/// One interpreted page.
struct PageScan {
    number: u32,
    media: Rect,
    content: PageContent,
}

/// Extract through any [`PdfBackend`].
pub fn extract_with_backend<B: PdfBackend + ?Sized>(
    backend: &B,
    options: &ExtractOptions,
) -> Result<Extraction> {
    let selected: Vec<(u32, PageId)> = backend
        .pages()
        .into_iter()
        .filter(|(number, _)| options.pages.includes(*number))
        .collect();

    let scan = |&(number, id): &(u32, PageId)| PageScan {
        number,
        media: backend.media_box(id),
        content: Interpreter::new(backend, id).run(),
    };
    let scans: Vec<PageScan> = if options.parallel {
        selected.par_iter().map(scan).collect()
    } else {
        selected.iter().map(scan).collect()
    };

    let mut stats = FontStatistics::default();
    for run in scans.iter().flat_map(|s| &s.content.runs).filter(|r| !r.degraded) {
        stats.add(run.font_size, run.text.chars().count());
    }
    stats.analyze();
    log::debug!(
        "Body text size {:.1}pt, heading sizes {:?}",
        stats.body_size,
        stats.heading_sizes
    );

    let build = |scan: &PageScan| page_elements(scan, &stats, options);
    let per_page: Vec<Vec<ExtractedElement>> = if options.parallel {
        scans.par_iter().map(build).collect()
    } else {
        scans.iter().map(build).collect()
    };

    let mut document = Document::new();
    document.metadata = backend.metadata();
    if let Some(first) = scans.first() {
        document.page = PageConstraints::new(PageSize::new(first.media.width, first.media.height));
    }

    let mut elements = Vec::new();
    for (scan, page_elements) in scans.iter().zip(per_page) {
        let mut page = Page::new(
            scan.number,
            scan.media.width,
            scan.media.height,
            estimate_margins(scan.media, &page_elements),
        );
        for element in &page_elements {
            page.blocks.push(element.block.clone());
            let mut block = element.block.clone();
            clear_bbox(&mut block);
            document.body.push(block);
        }
        document.pages.push(page);
        elements.extend(page_elements);
    }
    if let Some(first) = document.pages.first() {
        document.page.margins = first.margins;
    }

    log::info!(
        "Extracted {} elements from {} pages",
        elements.len(),
        document.pages.len()
    );
    Ok(Extraction { document, elements })
}

fn clear_bbox(block: &mut Block) {
    match block {
        Block::Text(b) => b.bbox = None,
        Block::Image(b) => b.bbox = None,
        Block::Table(b) => b.bbox = None,
    }
}

/// Convert a user-space box to top-left page coordinates.
fn to_page_space(media: Rect, rect: Rect) -> Rect {
    Rect::new(
        rect.x - media.x,
        media.y + media.height - rect.y - rect.height,
        rect.width,
        rect.height,
    )
}

fn estimate_margins(media: Rect, elements: &[ExtractedElement]) -> Margins {
    let boxes: Vec<Rect> = elements
        .iter()
        .filter(|e| e.confidence > DEGRADED_CONFIDENCE)
        .filter_map(|e| e.block.bbox())
        .collect();
    let Some(extent) = boxes.iter().copied().reduce(|a, b| a.union(&b)) else {
        return Margins::default();
    };
    Margins::trbl(
        extent.y.max(0.0),
        (media.width - extent.right()).max(0.0),
        (media.height - extent.bottom()).max(0.0),
        extent.x.max(0.0),
    )
}

fn page_elements(scan: &PageScan, stats: &FontStatistics, options: &ExtractOptions) -> Vec<ExtractedElement> {
    let runs = &scan.content.runs;
    let mut located: Vec<(Rect, ExtractedElement)> = Vec::new();
    let mut place = |source: Rect, block: Block, confidence: f32| {
        let bbox = to_page_space(scan.media, source);
        let element = ExtractedElement::new(scan.number, block.placed(bbox), source, confidence);
        located.push((source, element));
    };

    let mut consumed: BTreeSet<usize> = BTreeSet::new();
    if options.detect_tables {
        let ruled = tables::detect_ruled(runs, &scan.content.rules);
        consumed.extend(ruled.iter().flat_map(|t| t.runs.iter().copied()));
        let candidates: Vec<usize> = (0..runs.len())
            .filter(|i| !runs[*i].degraded && !consumed.contains(i))
            .collect();
        let aligned = TableDetector::new().detect(runs, &candidates);
        consumed.extend(aligned.iter().flat_map(|t| t.runs.iter().copied()));

        for detected in ruled.into_iter().chain(aligned) {
            place(detected.rect, Block::Table(detected.table), detected.confidence);
        }
    }

    let text_runs = runs
        .iter()
        .enumerate()
        .filter(|(i, r)| !r.degraded && !consumed.contains(i))
        .map(|(_, r)| r.clone())
        .collect();
    let mut lines = group_into_lines(text_runs);
    if options.detect_headings {
        detect_headings(&mut lines, stats);
    }
    for paragraph in group_into_paragraphs(lines) {
        let text = paragraph.text();
        if text.is_empty() {
            continue;
        }
        let block = match paragraph.heading {
            Some(level) => TextBlock::heading(level, text),
            None => TextBlock::new(text),
        }
        .with_style(paragraph.style());
        place(paragraph.rect(), Block::Text(block), paragraph.confidence());
    }

    for placed in &scan.content.images {
        let mut block = ImageBlock::new(placed.rect.width, placed.rect.height);
        let confidence = match &placed.image.data {
            Some(data) => {
                block = block.with_data(data.clone());
                IMAGE_CONFIDENCE
            }
            None => OPAQUE_IMAGE_CONFIDENCE,
        };
        place(placed.rect, Block::Image(block), confidence);
    }

    // Reading order: top to bottom, then left to right.
    located.sort_by(|(a, _), (b, _)| {
        (b.y + b.height)
            .partial_cmp(&(a.y + a.height))
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal))
    });
    let mut elements: Vec<ExtractedElement> = located.into_iter().map(|(_, e)| e).collect();

    for run in runs.iter().filter(|r| r.degraded) {
        log::warn!(
            "Page {}: run {:?} is rotated, off-page or undecodable, kept as a low-confidence element",
            scan.number,
            run.text
        );
        let source = run.rect();
        let bbox = if source == Rect::default() {
            source
        } else {
            to_page_space(scan.media, source)
        };
        elements.push(ExtractedElement::new(
            scan.number,
            Block::Text(TextBlock::new(run.text.clone())).placed(bbox),
            source,
            DEGRADED_CONFIDENCE,
        ));
    }
    elements
}
