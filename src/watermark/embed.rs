//! Hides a sealed payload inside the pages of an existing PDF.
//!
//! The payload lives in one stream object. Every page gets a few 1×1 form
//! XObjects pointing at it through the `/_k1` key, each drawn inside a
//! zero-area clip so nothing becomes visible.

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document as LopdfDocument, Object, ObjectId, Stream};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{Error, Result};

/// Key on a form XObject that points at the payload stream.
pub const PAYLOAD_REF_KEY: &[u8] = b"_k1";
/// Marker key on the payload stream itself.
pub const PAYLOAD_MARK_KEY: &[u8] = b"_k1v";

const DEFAULT_MEDIA_BOX: [f32; 4] = [0.0, 0.0, 612.0, 792.0];
const INSET_RATIO: f32 = 0.05;

/// Options for embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbedOptions {
    /// Copies of the payload reference drawn on every page (at least 1)
    pub copies_per_page: usize,
    /// Scatter copies randomly inside the page instead of down the left edge
    pub randomize_positions: bool,
    /// Fixed seed for reproducible positions
    pub seed: Option<u64>,
}

impl Default for EmbedOptions {
    fn default() -> Self {
        Self {
            copies_per_page: 3,
            randomize_positions: true,
            seed: None,
        }
    }
}

impl EmbedOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_copies(mut self, copies: usize) -> Self {
        self.copies_per_page = copies;
        self
    }

    pub fn with_random_positions(mut self, randomize: bool) -> Self {
        self.randomize_positions = randomize;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Output of [`embed`].
#[derive(Debug, Clone)]
pub struct Embedded {
    pub pdf: Vec<u8>,
    /// Total form XObjects referencing the payload
    pub copies: usize,
}

/// Embed `payload` into every page of `pdf`.
pub fn embed(pdf: &[u8], payload: &[u8], options: &EmbedOptions) -> Result<Embedded> {
    if options.copies_per_page == 0 {
        return Err(Error::Watermark("copies_per_page must be at least 1".into()));
    }
    if payload.is_empty() {
        return Err(Error::Watermark("payload is empty".into()));
    }

    let mut doc = LopdfDocument::load_mem(pdf)?;
    let pages: Vec<ObjectId> = doc.get_pages().into_values().collect();
    if pages.is_empty() {
        return Err(Error::Watermark("document has no pages".into()));
    }

    let mut marker = Dictionary::new();
    marker.set(PAYLOAD_MARK_KEY.to_vec(), Object::Name(b"1".to_vec()));
    let payload_id = doc.add_object(Stream::new(marker, payload.to_vec()));

    let seed = options.seed.unwrap_or_else(|| rand::rng().random());
    let mut rng = StdRng::seed_from_u64(seed);

    let mut copies = 0;
    for page_id in pages {
        copies += embed_page(&mut doc, page_id, payload_id, options, &mut rng)?;
    }

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|e| Error::Watermark(format!("failed to write PDF: {}", e)))?;

    log::info!(
        "Embedded watermark: {} copies, {} payload bytes",
        copies,
        payload.len()
    );
    Ok(Embedded { pdf: bytes, copies })
}

fn embed_page(
    doc: &mut LopdfDocument,
    page_id: ObjectId,
    payload_id: ObjectId,
    options: &EmbedOptions,
    rng: &mut StdRng,
) -> Result<usize> {
    let media_box = inherited(doc, page_id, b"MediaBox")
        .and_then(|obj| rect_of(doc, &obj))
        .unwrap_or(DEFAULT_MEDIA_BOX);

    let mut resources = inherited(doc, page_id, b"Resources")
        .and_then(|obj| dict_of(doc, &obj))
        .unwrap_or_default();
    let mut xobjects = resources
        .get(b"XObject")
        .ok()
        .and_then(|obj| dict_of(doc, obj))
        .unwrap_or_default();

    let mut operations = Vec::new();
    let mut counter = 1;
    for index in 0..options.copies_per_page {
        let name = loop {
            let candidate = format!("Kw{}", counter);
            counter += 1;
            if !xobjects.has(candidate.as_bytes()) {
                break candidate;
            }
        };

        let mut form = Dictionary::new();
        form.set("Type", Object::Name(b"XObject".to_vec()));
        form.set("Subtype", Object::Name(b"Form".to_vec()));
        form.set(
            "BBox",
            Object::Array(vec![0.into(), 0.into(), 1.into(), 1.into()]),
        );
        form.set(PAYLOAD_REF_KEY.to_vec(), Object::Reference(payload_id));
        let form_id = doc.add_object(Stream::new(form, Vec::new()));
        xobjects.set(name.as_bytes().to_vec(), Object::Reference(form_id));

        let (tx, ty) = position(media_box, index, options, rng);
        operations.extend(draw_hidden(&name, tx, ty));
    }
    resources.set("XObject", Object::Dictionary(xobjects));

    let prologue = Content {
        operations: vec![Operation::new("q", vec![])],
    };
    let mut epilogue = Content {
        operations: vec![Operation::new("Q", vec![])],
    };
    epilogue.operations.extend(operations);
    let prologue_id = doc.add_object(Stream::new(Dictionary::new(), prologue.encode()?));
    let epilogue_id = doc.add_object(Stream::new(Dictionary::new(), epilogue.encode()?));

    let mut contents = vec![Object::Reference(prologue_id)];
    contents.extend(existing_contents(doc, page_id));
    contents.push(Object::Reference(epilogue_id));

    let page = doc.get_object_mut(page_id)?.as_dict_mut()?;
    page.set("Resources", Object::Dictionary(resources));
    page.set("Contents", Object::Array(contents));

    log::debug!(
        "Page {:?}: {} watermark copies",
        page_id,
        options.copies_per_page
    );
    Ok(options.copies_per_page)
}

/// `q 1 0 0 1 tx ty cm 0 0 0 0 re W n /Name Do Q`
fn draw_hidden(name: &str, tx: f32, ty: f32) -> Vec<Operation> {
    vec![
        Operation::new("q", vec![]),
        Operation::new(
            "cm",
            vec![
                1.into(),
                0.into(),
                0.into(),
                1.into(),
                Object::Real(tx),
                Object::Real(ty),
            ],
        ),
        Operation::new("re", vec![0.into(), 0.into(), 0.into(), 0.into()]),
        Operation::new("W", vec![]),
        Operation::new("n", vec![]),
        Operation::new("Do", vec![Object::Name(name.as_bytes().to_vec())]),
        Operation::new("Q", vec![]),
    ]
}

fn position(media_box: [f32; 4], index: usize, options: &EmbedOptions, rng: &mut StdRng) -> (f32, f32) {
    let [x0, y0, x1, y1] = media_box;
    let width = (x1 - x0).abs();
    let height = (y1 - y0).abs();
    let (x0, y0) = (x0.min(x1), y0.min(y1));

    if options.randomize_positions {
        let margin_x = (width * INSET_RATIO).max(1.0);
        let margin_y = (height * INSET_RATIO).max(1.0);
        let span_x = (width - 2.0 * margin_x).max(0.0);
        let span_y = (height - 2.0 * margin_y).max(0.0);
        (
            x0 + margin_x + rng.random::<f32>() * span_x,
            y0 + margin_y + rng.random::<f32>() * span_y,
        )
    } else {
        let gap = height / (options.copies_per_page as f32 + 1.0);
        (x0 + 1.0, y0 + gap * (index as f32 + 1.0))
    }
}

fn existing_contents(doc: &LopdfDocument, page_id: ObjectId) -> Vec<Object> {
    let Ok(page) = doc.get_dictionary(page_id) else {
        return Vec::new();
    };
    match page.get(b"Contents") {
        Ok(Object::Reference(id)) => match doc.get_object(*id) {
            Ok(Object::Array(items)) => items.clone(),
            _ => vec![Object::Reference(*id)],
        },
        Ok(Object::Array(items)) => items.clone(),
        _ => Vec::new(),
    }
}

/// Page attribute with inheritance through the Parent chain, resolved.
fn inherited(doc: &LopdfDocument, page_id: ObjectId, key: &[u8]) -> Option<Object> {
    let mut dict = doc.get_dictionary(page_id).ok()?;
    for _ in 0..32 {
        if let Ok(value) = dict.get(key) {
            return Some(resolve(doc, value).clone());
        }
        let parent = dict.get(b"Parent").ok()?.as_reference().ok()?;
        dict = doc.get_dictionary(parent).ok()?;
    }
    None
}

fn resolve<'a>(doc: &'a LopdfDocument, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        other => other,
    }
}

fn dict_of(doc: &LopdfDocument, obj: &Object) -> Option<Dictionary> {
    match resolve(doc, obj) {
        Object::Dictionary(dict) => Some(dict.clone()),
        _ => None,
    }
}

fn rect_of(doc: &LopdfDocument, obj: &Object) -> Option<[f32; 4]> {
    let Object::Array(items) = resolve(doc, obj) else {
        return None;
    };
    if items.len() != 4 {
        return None;
    }
    let mut rect = [0.0; 4];
    for (slot, item) in rect.iter_mut().zip(items) {
        *slot = match resolve(doc, item) {
            Object::Integer(i) => *i as f32,
            Object::Real(r) => *r,
            _ => return None,
        };
    }
    Some(rect)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Block, Document, TextBlock};

    fn sample_pdf() -> Vec<u8> {
        let mut doc = Document::new();
        doc.body.push(Block::Text(TextBlock::new("Watermark host page.")));
        crate::generate_document(&doc).unwrap()
    }

    fn form_count(pdf: &[u8]) -> usize {
        let doc = LopdfDocument::load_mem(pdf).unwrap();
        doc.objects
            .values()
            .filter(|obj| match obj {
                Object::Stream(stream) => stream.dict.has(PAYLOAD_REF_KEY),
                _ => false,
            })
            .count()
    }

    #[test]
    fn test_embed_copies() {
        let out = embed(&sample_pdf(), b"0123456789abcdef", &EmbedOptions::new().with_seed(7)).unwrap();
        assert_eq!(out.copies, 3);
        assert_eq!(form_count(&out.pdf), 3);
    }

    #[test]
    fn test_existing_content_isolated() {
        let out = embed(&sample_pdf(), b"payload", &EmbedOptions::new().with_copies(1)).unwrap();
        let doc = LopdfDocument::load_mem(&out.pdf).unwrap();
        let page_id = *doc.get_pages().values().next().unwrap();
        let content = doc.get_page_content(page_id).unwrap();
        let text = String::from_utf8_lossy(&content);
        assert!(text.trim_start().starts_with('q'));
        assert!(text.contains("Do"));
        assert!(text.contains("Tj"));
    }

    #[test]
    fn test_seeded_positions_repeat() {
        let pdf = sample_pdf();
        let opts = EmbedOptions::new().with_seed(99);
        let a = embed(&pdf, b"payload", &opts).unwrap();
        let b = embed(&pdf, b"payload", &opts).unwrap();
        assert_eq!(a.pdf, b.pdf);
    }

    #[test]
    fn test_fixed_positions_inside_page() {
        let opts = EmbedOptions::new().with_random_positions(false).with_copies(4);
        let mut rng = StdRng::seed_from_u64(1);
        for i in 0..4 {
            let (x, y) = position(DEFAULT_MEDIA_BOX, i, &opts, &mut rng);
            assert_eq!(x, 1.0);
            assert!(y > 0.0 && y < 792.0);
        }
    }

    #[test]
    fn test_random_positions_inside_inset() {
        let opts = EmbedOptions::new();
        let mut rng = StdRng::seed_from_u64(3);
        for i in 0..50 {
            let (x, y) = position(DEFAULT_MEDIA_BOX, i, &opts, &mut rng);
            assert!((30.6..=581.4).contains(&x));
            assert!((39.6..=752.4).contains(&y));
        }
    }

    #[test]
    fn test_rejects_zero_copies() {
        let err = embed(&sample_pdf(), b"payload", &EmbedOptions::new().with_copies(0)).unwrap_err();
        assert!(matches!(err, Error::Watermark(_)));
    }

    #[test]
    fn test_rejects_non_pdf() {
        assert!(embed(b"hello", b"payload", &EmbedOptions::new()).is_err());
    }
}
