//! Integration tests for binding, layout and rendering.

use kurbypdf::{
    generate, generate_value, layout, layout_document, render, to_model, Block, Document, Error,
    ImageBlock, KurbyPdf, Margins, PageConstraints, PageSize, Rect, RenderOptions, TableBlock,
    TextBlock,
};
use serde_json::json;

fn long_paragraph(words: usize) -> String {
    (0..words)
        .map(|i| format!("word{}", i))
        .collect::<Vec<_>>()
        .join(" ")
}

fn page_count(pdf: &[u8]) -> usize {
    lopdf::Document::load_mem(pdf).unwrap().get_pages().len()
}

#[test]
fn test_report_end_to_end() {
    let doc = to_model(&json!({"title": "Report", "body": "A short paragraph."})).unwrap();
    let laid_out = layout_document(&doc).unwrap();

    assert_eq!(laid_out.pages.len(), 1);
    let content = laid_out.page.content_box();
    let bbox = laid_out.pages[0].blocks[0].bbox().unwrap();
    assert!((bbox.y - content.y).abs() < 1e-3);
    assert!((bbox.x - content.x).abs() < 1e-3);
    assert!((bbox.width - content.width).abs() < 1e-3);

    let pdf = render(&laid_out, &RenderOptions::default()).unwrap();
    assert_eq!(page_count(&pdf), 1);
}

#[test]
fn test_pagination_stays_in_content_area() {
    let mut body = Vec::new();
    for i in 0..12 {
        body.push(json!({"type": "text", "heading": 2, "text": format!("Part {}", i)}));
        body.push(json!({"type": "text", "text": long_paragraph(120)}));
        body.push(json!({"type": "table", "header_rows": 1,
            "rows": [["Name", "Value"], ["a", "1"], ["b", "2"], ["c", "3"]]}));
    }
    let doc = to_model(&json!({"body": body})).unwrap();
    let laid_out = layout_document(&doc).unwrap();
    assert!(laid_out.pages.len() > 1);

    for page in &laid_out.pages {
        let content = page.content_box();
        for block in &page.blocks {
            let bbox = block.bbox().unwrap();
            assert!(
                content.contains(&bbox),
                "page {}: {:?} outside {:?}",
                page.number,
                bbox,
                content
            );
        }
    }
}

#[test]
fn test_siblings_do_not_overlap() {
    let mut doc = Document::new();
    for i in 0..30 {
        doc.push(TextBlock::new(format!("Paragraph {} {}", i, long_paragraph(40))));
        if i % 5 == 0 {
            doc.push(ImageBlock::new(200.0, 90.0));
        }
    }
    let laid_out = layout_document(&doc).unwrap();

    for page in &laid_out.pages {
        let boxes: Vec<Rect> = page.blocks.iter().filter_map(Block::bbox).collect();
        for (i, a) in boxes.iter().enumerate() {
            for b in &boxes[i + 1..] {
                assert!(!a.intersects(b), "{:?} overlaps {:?}", a, b);
            }
        }
    }
}

#[test]
fn test_layout_idempotent() {
    let mut doc = Document::new();
    doc.push(TextBlock::heading(1, "Title"));
    doc.push(TextBlock::new(long_paragraph(600)));
    doc.push(TableBlock::from_rows(vec![vec!["x", "y"]; 40]).with_header_rows(1));

    let constraints = PageConstraints::new(PageSize::LETTER).with_margins(Margins::all(50.0));
    let once = layout(&doc, &constraints).unwrap();
    let twice = layout(&once, &constraints).unwrap();
    assert_eq!(once.pages, twice.pages);
}

#[test]
fn test_split_table_keeps_document_order() {
    let mut doc = Document::new();
    doc.push(TextBlock::new("Before"));
    doc.push(TableBlock::from_rows(vec![vec!["row", "data"]; 80]));
    doc.push(TextBlock::new("After"));
    let laid_out = layout_document(&doc).unwrap();
    assert!(laid_out.pages.len() >= 2);

    let kinds: Vec<&str> = laid_out
        .pages
        .iter()
        .flat_map(|p| p.blocks.iter().map(Block::kind))
        .collect();
    assert_eq!(kinds.first(), Some(&"text"));
    assert_eq!(kinds.last(), Some(&"text"));
    assert!(kinds[1..kinds.len() - 1].iter().all(|k| *k == "table"));

    let rows: usize = laid_out
        .pages
        .iter()
        .flat_map(|p| &p.blocks)
        .filter_map(|b| match b {
            Block::Table(t) => Some(t.row_count()),
            _ => None,
        })
        .sum();
    assert_eq!(rows, 80);
}

#[test]
fn test_oversized_image_is_layout_error() {
    let doc = to_model(&json!({"body": [
        {"type": "image", "id": "poster", "width": 100, "height": 5000}
    ]}))
    .unwrap();
    let err = layout_document(&doc).unwrap_err();
    match err {
        Error::Layout { block, .. } => assert_eq!(block, "poster"),
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_oversized_line_is_layout_error() {
    let doc = to_model(&json!({
        "page": {"size": {"width": 300, "height": 200}, "margins": 20},
        "body": [{"type": "text", "text": "Huge", "style": {"font_size": 400}}]
    }))
    .unwrap();
    assert!(matches!(layout_document(&doc), Err(Error::Layout { .. })));
}

#[test]
fn test_render_png_image() {
    let mut png = Vec::new();
    let pixels = image::RgbaImage::from_pixel(4, 4, image::Rgba([200, 30, 30, 128]));
    image::DynamicImage::ImageRgba8(pixels)
        .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
        .unwrap();

    let mut doc = Document::new();
    doc.push(ImageBlock::new(40.0, 40.0).with_data(png));
    let pdf = generate_document_uncompressed(&doc);

    let parsed = lopdf::Document::load_mem(&pdf).unwrap();
    let has_smask = parsed.objects.values().any(|obj| match obj {
        lopdf::Object::Stream(s) => s.dict.has(b"SMask"),
        _ => false,
    });
    assert!(has_smask);
}

fn generate_document_uncompressed(doc: &Document) -> Vec<u8> {
    KurbyPdf::new()
        .with_compression(false)
        .generate_document(doc)
        .unwrap()
}

#[test]
fn test_render_is_deterministic() {
    let input = json!({"title": "Same", "body": [
        {"type": "text", "text": long_paragraph(50)},
        {"type": "table", "rows": [["a", "b"]]}
    ]});
    assert_eq!(generate_value(&input).unwrap(), generate_value(&input).unwrap());
}

#[test]
fn test_multi_page_render() {
    let mut body = Vec::new();
    for _ in 0..20 {
        body.push(json!({"type": "text", "text": long_paragraph(150)}));
    }
    let input = json!({"body": body});
    let laid_out = layout_document(&to_model(&input).unwrap()).unwrap();
    let pdf = generate_value(&input).unwrap();
    assert_eq!(page_count(&pdf), laid_out.pages.len());
}

#[test]
fn test_unknown_font_family_is_render_error() {
    let result = generate(
        r#"{"body": [{"type": "text", "id": "fancy", "text": "x", "style": {"font_family": "Comic"}}]}"#,
    );
    match result {
        Err(Error::Render { block, .. }) => assert_eq!(block, "fancy"),
        other => panic!("expected render error, got {:?}", other.map(|b| b.len())),
    }
}
