//! Model → structured output.
//!
//! Always emits the long form accepted by the decoder, so decoding the
//! output reproduces the document exactly.

use crate::model::{Block, Document, StyleAttributes, TableCell};
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::SecondsFormat;
use serde_json::{json, Map, Value};

/// Encode a document as a structured description.
pub fn encode_document(doc: &Document) -> Value {
    let mut root = Map::new();
    let meta = &doc.metadata;
    let strings = [
        ("title", &meta.title),
        ("author", &meta.author),
        ("subject", &meta.subject),
        ("keywords", &meta.keywords),
        ("creator", &meta.creator),
    ];
    for (key, value) in strings {
        if let Some(value) = value {
            root.insert(key.to_string(), Value::String(value.clone()));
        }
    }
    if let Some(created) = meta.created {
        root.insert(
            "created".to_string(),
            Value::String(created.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        );
    }

    let page = &doc.page;
    root.insert(
        "page".to_string(),
        json!({
            "size": {"width": page.size.width, "height": page.size.height},
            "margins": {
                "top": page.margins.top,
                "right": page.margins.right,
                "bottom": page.margins.bottom,
                "left": page.margins.left,
            },
            "block_spacing": page.block_spacing,
        }),
    );

    if !doc.style.is_empty() {
        root.insert("style".to_string(), encode_style(&doc.style));
    }

    root.insert(
        "body".to_string(),
        Value::Array(doc.body.iter().map(encode_block).collect()),
    );
    Value::Object(root)
}

fn encode_style(style: &StyleAttributes) -> Value {
    let mut map = Map::new();
    if let Some(family) = &style.font_family {
        map.insert("font_family".to_string(), json!(family));
    }
    if let Some(size) = style.font_size {
        map.insert("font_size".to_string(), json!(size));
    }
    if let Some(color) = style.color {
        map.insert("color".to_string(), json!(color.to_string()));
    }
    if let Some(alignment) = style.alignment {
        map.insert("alignment".to_string(), json!(alignment.as_str()));
    }
    if let Some(bold) = style.bold {
        map.insert("bold".to_string(), json!(bold));
    }
    if let Some(italic) = style.italic {
        map.insert("italic".to_string(), json!(italic));
    }
    if let Some(line_height) = style.line_height {
        map.insert("line_height".to_string(), json!(line_height));
    }
    Value::Object(map)
}

fn insert_common(map: &mut Map<String, Value>, id: &Option<String>, style: &StyleAttributes) {
    if let Some(id) = id {
        map.insert("id".to_string(), json!(id));
    }
    if !style.is_empty() {
        map.insert("style".to_string(), encode_style(style));
    }
}

fn encode_block(block: &Block) -> Value {
    let mut map = Map::new();
    map.insert("type".to_string(), json!(block.kind()));

    match block {
        Block::Text(text) => {
            insert_common(&mut map, &text.id, &text.style);
            map.insert("text".to_string(), json!(text.text));
            if let Some(level) = text.heading {
                map.insert("heading".to_string(), json!(level));
            }
        }
        Block::Image(image) => {
            insert_common(&mut map, &image.id, &image.style);
            map.insert("width".to_string(), json!(image.width));
            map.insert("height".to_string(), json!(image.height));
            if let Some(data) = &image.data {
                map.insert("data".to_string(), json!(STANDARD.encode(data)));
            }
            if let Some(alt) = &image.alt {
                map.insert("alt".to_string(), json!(alt));
            }
        }
        Block::Table(table) => {
            insert_common(&mut map, &table.id, &table.style);
            let rows: Vec<Value> = table
                .rows
                .iter()
                .map(|row| Value::Array(row.cells.iter().map(encode_cell).collect()))
                .collect();
            map.insert("rows".to_string(), Value::Array(rows));
            if table.header_rows > 0 {
                map.insert("header_rows".to_string(), json!(table.header_rows));
            }
            if let Some(widths) = &table.column_widths {
                map.insert("column_widths".to_string(), json!(widths));
            }
        }
    }
    Value::Object(map)
}

fn encode_cell(cell: &TableCell) -> Value {
    if cell.style.is_empty() {
        json!(cell.text)
    } else {
        json!({"text": cell.text, "style": encode_style(&cell.style)})
    }
}
