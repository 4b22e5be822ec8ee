//! Structured input → model.

use crate::error::{Error, Result};
use crate::model::{
    Alignment, Block, Colour, Document, ImageBlock, Margins, Metadata, PageConstraints, PageSize,
    StyleAttributes, TableBlock, TableCell, TableRow, TextBlock,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

const ROOT_FIELDS: &[&str] = &[
    "title", "author", "subject", "keywords", "creator", "created", "page", "style", "body",
];
const PAGE_FIELDS: &[&str] = &["size", "margins", "block_spacing"];
const STYLE_FIELDS: &[&str] = &[
    "font_family",
    "font_size",
    "color",
    "alignment",
    "bold",
    "italic",
    "line_height",
];

/// JSON type name for error messages.
fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn mismatch(path: &str, expected: &str, found: &Value) -> Error {
    Error::schema(
        path,
        format!("expected {}, found {}", expected, type_name(found)),
    )
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", path, key)
    }
}

/// An object being decoded, with the path used in error messages.
struct Fields<'a> {
    map: &'a Map<String, Value>,
    path: String,
}

impl<'a> Fields<'a> {
    fn new(value: &'a Value, path: impl Into<String>) -> Result<Self> {
        let path = path.into();
        match value {
            Value::Object(map) => Ok(Self { map, path }),
            other => {
                let label = if path.is_empty() { "$" } else { path.as_str() };
                Err(mismatch(label, "object", other))
            }
        }
    }

    fn path_of(&self, key: &str) -> String {
        join(&self.path, key)
    }

    /// A present, non-null value.
    fn get(&self, key: &str) -> Option<&'a Value> {
        self.map.get(key).filter(|v| !v.is_null())
    }

    fn required(&self, key: &str) -> Result<&'a Value> {
        self.get(key)
            .ok_or_else(|| Error::schema(self.path_of(key), "missing required field"))
    }

    fn string_value(&self, key: &str, value: &Value) -> Result<String> {
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| mismatch(&self.path_of(key), "string", value))
    }

    fn opt_string(&self, key: &str) -> Result<Option<String>> {
        self.get(key).map(|v| self.string_value(key, v)).transpose()
    }

    fn req_string(&self, key: &str) -> Result<String> {
        self.string_value(key, self.required(key)?)
    }

    fn number_value(&self, key: &str, value: &Value) -> Result<f32> {
        let n = value
            .as_f64()
            .ok_or_else(|| mismatch(&self.path_of(key), "number", value))? as f32;
        if !n.is_finite() {
            return Err(Error::schema(self.path_of(key), "number out of range"));
        }
        Ok(n)
    }

    fn opt_number(&self, key: &str) -> Result<Option<f32>> {
        self.get(key).map(|v| self.number_value(key, v)).transpose()
    }

    fn check_positive(&self, key: &str, n: f32) -> Result<f32> {
        if n > 0.0 {
            Ok(n)
        } else {
            Err(Error::schema(self.path_of(key), format!("must be positive, got {}", n)))
        }
    }

    fn check_non_negative(&self, key: &str, n: f32) -> Result<f32> {
        if n >= 0.0 {
            Ok(n)
        } else {
            Err(Error::schema(self.path_of(key), format!("must not be negative, got {}", n)))
        }
    }

    fn opt_positive(&self, key: &str) -> Result<Option<f32>> {
        self.opt_number(key)?
            .map(|n| self.check_positive(key, n))
            .transpose()
    }

    fn req_positive(&self, key: &str) -> Result<f32> {
        let n = self.number_value(key, self.required(key)?)?;
        self.check_positive(key, n)
    }

    fn opt_non_negative(&self, key: &str) -> Result<Option<f32>> {
        self.opt_number(key)?
            .map(|n| self.check_non_negative(key, n))
            .transpose()
    }

    fn opt_bool(&self, key: &str) -> Result<Option<bool>> {
        self.get(key)
            .map(|v| {
                v.as_bool()
                    .ok_or_else(|| mismatch(&self.path_of(key), "boolean", v))
            })
            .transpose()
    }

    fn opt_small_int(&self, key: &str, range: std::ops::RangeInclusive<u8>) -> Result<Option<u8>> {
        let Some(value) = self.get(key) else {
            return Ok(None);
        };
        let n = value
            .as_u64()
            .ok_or_else(|| mismatch(&self.path_of(key), "non-negative integer", value))?;
        match u8::try_from(n) {
            Ok(n) if range.contains(&n) => Ok(Some(n)),
            _ => Err(Error::schema(
                self.path_of(key),
                format!("must be between {} and {}, got {}", range.start(), range.end(), n),
            )),
        }
    }

    fn opt_array(&self, key: &str) -> Result<Option<&'a Vec<Value>>> {
        self.get(key)
            .map(|v| {
                v.as_array()
                    .ok_or_else(|| mismatch(&self.path_of(key), "array", v))
            })
            .transpose()
    }

    fn warn_unknown(&self, known: &[&str]) {
        for key in self.map.keys() {
            if !known.contains(&key.as_str()) {
                log::warn!("Ignoring unknown field `{}`", self.path_of(key));
            }
        }
    }
}

/// Decode a structured document description.
pub fn decode_document(input: &Value) -> Result<Document> {
    let root = Fields::new(input, "")?;
    root.warn_unknown(ROOT_FIELDS);

    let created = root
        .opt_string("created")?
        .map(|text| {
            DateTime::parse_from_rfc3339(&text)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| Error::schema("created", format!("invalid RFC 3339 date: {}", e)))
        })
        .transpose()?;

    let metadata = Metadata {
        title: root.opt_string("title")?,
        author: root.opt_string("author")?,
        subject: root.opt_string("subject")?,
        keywords: root.opt_string("keywords")?,
        creator: root.opt_string("creator")?,
        created,
    };

    let page = match root.get("page") {
        Some(value) => decode_page(value, "page")?,
        None => PageConstraints::default(),
    };

    let style = match root.get("style") {
        Some(value) => decode_style(value, "style")?,
        None => StyleAttributes::default(),
    };

    let body = match root.required("body")? {
        Value::String(text) => vec![Block::Text(TextBlock::new(text.clone()))],
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| decode_block(item, &format!("body[{}]", i)))
            .collect::<Result<Vec<_>>>()?,
        other => return Err(mismatch("body", "string or array", other)),
    };

    Ok(Document {
        metadata,
        page,
        style,
        body,
        pages: Vec::new(),
    })
}

fn decode_page(value: &Value, path: &str) -> Result<PageConstraints> {
    let fields = Fields::new(value, path)?;
    fields.warn_unknown(PAGE_FIELDS);
    let mut page = PageConstraints::default();

    if let Some(size) = fields.get("size") {
        let size_path = fields.path_of("size");
        page.size = match size {
            Value::String(name) => PageSize::named(name).ok_or_else(|| {
                Error::schema(&size_path, format!("unknown page size '{}'", name))
            })?,
            Value::Object(_) => {
                let dims = Fields::new(size, size_path)?;
                PageSize::new(dims.req_positive("width")?, dims.req_positive("height")?)
            }
            other => return Err(mismatch(&size_path, "string or object", other)),
        };
    }

    if let Some(margins) = fields.get("margins") {
        let margins_path = fields.path_of("margins");
        page.margins = match margins {
            Value::Number(_) => Margins::all(fields.check_non_negative(
                "margins",
                fields.number_value("margins", margins)?,
            )?),
            Value::Object(_) => {
                let sides = Fields::new(margins, margins_path)?;
                let default = Margins::default();
                Margins::trbl(
                    sides.opt_non_negative("top")?.unwrap_or(default.top),
                    sides.opt_non_negative("right")?.unwrap_or(default.right),
                    sides.opt_non_negative("bottom")?.unwrap_or(default.bottom),
                    sides.opt_non_negative("left")?.unwrap_or(default.left),
                )
            }
            other => return Err(mismatch(&margins_path, "number or object", other)),
        };
    }

    if let Some(spacing) = fields.opt_non_negative("block_spacing")? {
        page.block_spacing = spacing;
    }

    Ok(page)
}

fn decode_style(value: &Value, path: &str) -> Result<StyleAttributes> {
    let fields = Fields::new(value, path)?;
    fields.warn_unknown(STYLE_FIELDS);

    let color = fields
        .opt_string("color")?
        .map(|text| {
            text.parse::<Colour>()
                .map_err(|reason| Error::schema(fields.path_of("color"), reason))
        })
        .transpose()?;
    let alignment = fields
        .opt_string("alignment")?
        .map(|text| {
            text.parse::<Alignment>()
                .map_err(|reason| Error::schema(fields.path_of("alignment"), reason))
        })
        .transpose()?;

    Ok(StyleAttributes {
        font_family: fields.opt_string("font_family")?,
        font_size: fields.opt_positive("font_size")?,
        color,
        alignment,
        bold: fields.opt_bool("bold")?,
        italic: fields.opt_bool("italic")?,
        line_height: fields.opt_positive("line_height")?,
    })
}

fn decode_optional_style(fields: &Fields<'_>) -> Result<StyleAttributes> {
    match fields.get("style") {
        Some(value) => decode_style(value, &fields.path_of("style")),
        None => Ok(StyleAttributes::default()),
    }
}

fn decode_block(value: &Value, path: &str) -> Result<Block> {
    let fields = Fields::new(value, path)?;
    let kind = fields.req_string("type")?;

    match kind.as_str() {
        "text" => {
            fields.warn_unknown(&["type", "id", "text", "heading", "style"]);
            Ok(Block::Text(TextBlock {
                id: fields.opt_string("id")?,
                text: fields.req_string("text")?,
                heading: fields.opt_small_int("heading", 1..=6)?,
                style: decode_optional_style(&fields)?,
                bbox: None,
            }))
        }
        "image" => {
            fields.warn_unknown(&["type", "id", "width", "height", "data", "alt", "style"]);
            let data = fields
                .opt_string("data")?
                .map(|encoded| {
                    STANDARD.decode(encoded.trim()).map_err(|e| {
                        Error::schema(fields.path_of("data"), format!("invalid base64: {}", e))
                    })
                })
                .transpose()?;
            Ok(Block::Image(ImageBlock {
                id: fields.opt_string("id")?,
                width: fields.req_positive("width")?,
                height: fields.req_positive("height")?,
                data,
                alt: fields.opt_string("alt")?,
                style: decode_optional_style(&fields)?,
                bbox: None,
            }))
        }
        "table" => {
            fields.warn_unknown(&["type", "id", "rows", "header_rows", "column_widths", "style"]);
            decode_table(&fields).map(Block::Table)
        }
        other => Err(Error::schema(
            fields.path_of("type"),
            format!("unknown block type '{}'", other),
        )),
    }
}

fn decode_table(fields: &Fields<'_>) -> Result<TableBlock> {
    let rows_path = fields.path_of("rows");
    let rows_value = fields.required("rows")?;
    let rows = rows_value
        .as_array()
        .ok_or_else(|| mismatch(&rows_path, "array", rows_value))?
        .iter()
        .enumerate()
        .map(|(r, row)| {
            let row_path = format!("{}[{}]", rows_path, r);
            let cells = row
                .as_array()
                .ok_or_else(|| mismatch(&row_path, "array", row))?;
            cells
                .iter()
                .enumerate()
                .map(|(c, cell)| decode_cell(cell, &format!("{}[{}]", row_path, c)))
                .collect::<Result<Vec<_>>>()
                .map(TableRow::new)
        })
        .collect::<Result<Vec<_>>>()?;

    let header_rows = fields.opt_small_int("header_rows", 0..=u8::MAX)?.unwrap_or(0);
    if header_rows as usize > rows.len() {
        return Err(Error::schema(
            fields.path_of("header_rows"),
            format!("{} header rows but only {} rows", header_rows, rows.len()),
        ));
    }

    let column_widths = fields
        .opt_array("column_widths")?
        .map(|widths| {
            let path = fields.path_of("column_widths");
            widths
                .iter()
                .enumerate()
                .map(|(i, w)| {
                    let item = format!("{}[{}]", path, i);
                    let n = w.as_f64().ok_or_else(|| mismatch(&item, "number", w))?;
                    match n as f32 {
                        width if width.is_finite() && width > 0.0 => Ok(width),
                        _ if n > 0.0 => Err(Error::schema(item, format!("out of range, got {}", n))),
                        _ => Err(Error::schema(item, format!("must be positive, got {}", n))),
                    }
                })
                .collect::<Result<Vec<_>>>()
        })
        .transpose()?;

    Ok(TableBlock {
        id: fields.opt_string("id")?,
        rows,
        header_rows,
        column_widths,
        style: decode_optional_style(fields)?,
        bbox: None,
    })
}

fn decode_cell(value: &Value, path: &str) -> Result<TableCell> {
    match value {
        Value::String(text) => Ok(TableCell::new(text.clone())),
        Value::Object(_) => {
            let fields = Fields::new(value, path)?;
            fields.warn_unknown(&["text", "style"]);
            Ok(TableCell {
                text: fields.req_string("text")?,
                style: decode_optional_style(&fields)?,
            })
        }
        other => Err(mismatch(path, "string or object", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema_field(err: Error) -> String {
        match err {
            Error::Schema { field, .. } => field,
            other => panic!("expected schema error, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_minimal() {
        let doc = decode_document(&json!({"title": "Report", "body": "A short paragraph."})).unwrap();
        assert_eq!(doc.metadata.title.as_deref(), Some("Report"));
        assert_eq!(doc.body.len(), 1);
        assert_eq!(doc.page, PageConstraints::default());
        assert!(doc.pages.is_empty());
        match &doc.body[0] {
            Block::Text(text) => {
                assert_eq!(text.text, "A short paragraph.");
                assert!(text.bbox.is_none());
            }
            other => panic!("expected text block, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_body() {
        let err = decode_document(&json!({"title": "x"})).unwrap_err();
        assert_eq!(schema_field(err), "body");
    }

    #[test]
    fn test_root_must_be_object() {
        let err = decode_document(&json!(["not", "an", "object"])).unwrap_err();
        assert_eq!(schema_field(err), "$");
    }

    #[test]
    fn test_type_mismatch_names_field() {
        let input = json!({"body": [{"type": "text", "text": "a", "style": {"font_size": "big"}}]});
        let err = decode_document(&input).unwrap_err();
        assert!(err.to_string().contains("expected number, found string"));
        assert_eq!(schema_field(err), "body[0].style.font_size");
    }

    #[test]
    fn test_unknown_block_type() {
        let err = decode_document(&json!({"body": [{"type": "chart"}]})).unwrap_err();
        assert_eq!(schema_field(err), "body[0].type");
    }

    #[test]
    fn test_table_cell_mismatch() {
        let input = json!({"body": [{"type": "table", "rows": [["a", 3]]}]});
        let err = decode_document(&input).unwrap_err();
        assert_eq!(schema_field(err), "body[0].rows[0][1]");
    }

    #[test]
    fn test_header_rows_bounded() {
        let input = json!({"body": [{"type": "table", "rows": [["a"]], "header_rows": 2}]});
        let err = decode_document(&input).unwrap_err();
        assert_eq!(schema_field(err), "body[0].header_rows");
    }

    #[test]
    fn test_column_widths_must_fit_f32() {
        for widths in [json!([1e-50, 1]), json!([1e300]), json!([0, 1]), json!([-2, 1])] {
            let input = json!({"body": [{"type": "table", "rows": [["a", "b"]], "column_widths": widths}]});
            let err = decode_document(&input).unwrap_err();
            assert!(schema_field(err).starts_with("body[0].column_widths["));
        }

        let input = json!({"body": [{"type": "table", "rows": [["a", "b"]], "column_widths": [1e-30, 2.5]}]});
        let doc = decode_document(&input).unwrap();
        match &doc.body[0] {
            Block::Table(table) => assert_eq!(table.column_widths.as_ref().map(Vec::len), Some(2)),
            other => panic!("unexpected block {:?}", other),
        }
    }

    #[test]
    fn test_heading_range() {
        let input = json!({"body": [{"type": "text", "text": "a", "heading": 7}]});
        let err = decode_document(&input).unwrap_err();
        assert_eq!(schema_field(err), "body[0].heading");
    }

    #[test]
    fn test_image_requires_positive_size() {
        let input = json!({"body": [{"type": "image", "width": 0, "height": 10}]});
        let err = decode_document(&input).unwrap_err();
        assert_eq!(schema_field(err), "body[0].width");

        let input = json!({"body": [{"type": "image", "width": 10}]});
        let err = decode_document(&input).unwrap_err();
        assert_eq!(schema_field(err), "body[0].height");
    }

    #[test]
    fn test_invalid_base64() {
        let input = json!({"body": [{"type": "image", "width": 1, "height": 1, "data": "***"}]});
        let err = decode_document(&input).unwrap_err();
        assert_eq!(schema_field(err), "body[0].data");
    }

    #[test]
    fn test_page_settings() {
        let input = json!({
            "page": {"size": "letter", "margins": 36, "block_spacing": 4},
            "body": []
        });
        let doc = decode_document(&input).unwrap();
        assert_eq!(doc.page.size, PageSize::LETTER);
        assert_eq!(doc.page.margins, Margins::all(36.0));
        assert_eq!(doc.page.block_spacing, 4.0);

        let input = json!({"page": {"size": {"width": 300, "height": 400}, "margins": {"top": 10}}, "body": []});
        let doc = decode_document(&input).unwrap();
        assert_eq!(doc.page.size, PageSize::new(300.0, 400.0));
        assert_eq!(doc.page.margins.top, 10.0);
        assert_eq!(doc.page.margins.left, 72.0);
    }

    #[test]
    fn test_bad_colour() {
        let input = json!({"style": {"color": "purple-ish"}, "body": []});
        let err = decode_document(&input).unwrap_err();
        assert_eq!(schema_field(err), "style.color");
    }

    #[test]
    fn test_null_treated_as_absent() {
        let input = json!({"title": null, "body": [{"type": "text", "text": "a", "id": null}]});
        let doc = decode_document(&input).unwrap();
        assert!(doc.metadata.title.is_none());
    }
}
