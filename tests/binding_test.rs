//! Integration tests for the binding layer.

use kurbypdf::{
    from_model, from_model_string, layout_document, to_model, to_model_str, Alignment, Block,
    Error, JsonFormat,
};
use serde_json::{json, Value};

fn schema_field(err: Error) -> String {
    match err {
        Error::Schema { field, .. } => field,
        other => panic!("expected schema error, got {}", other),
    }
}

fn round_trip(input: Value) {
    let doc = to_model(&input).unwrap();
    let canonical = from_model(&doc);
    assert_eq!(to_model(&canonical).unwrap(), doc);
    // The canonical form is a fixed point.
    assert_eq!(from_model(&to_model(&canonical).unwrap()), canonical);
}

#[test]
fn test_round_trip_minimal() {
    round_trip(json!({"body": "Just text."}));
}

#[test]
fn test_round_trip_mixed_blocks() {
    round_trip(json!({
        "title": "Inventory",
        "subject": "Stock",
        "keywords": "a, b",
        "created": "2023-11-05T08:00:00Z",
        "page": {"size": "A5", "margins": {"left": 36, "right": 36}, "block_spacing": 4},
        "style": {"font_family": "Courier", "font_size": 9},
        "body": [
            {"type": "text", "text": "Stock", "heading": 2, "style": {"alignment": "center"}},
            {"type": "table", "id": "stock", "header_rows": 1,
             "rows": [["Item", "Count"], ["Bolts", "400"], [{"text": "Nuts", "style": {"italic": true}}, "12"]]},
            {"type": "image", "width": 64, "height": 32}
        ]
    }));
}

#[test]
fn test_round_trip_laid_out_document() {
    let doc = to_model(&json!({"body": ["ignored"]}));
    assert!(doc.is_err());

    let doc = to_model(&json!({"body": [{"type": "text", "text": "Placed"}]})).unwrap();
    let laid_out = layout_document(&doc).unwrap();
    let again = to_model(&from_model(&laid_out)).unwrap();
    assert_eq!(again.body, laid_out.body);
    assert_eq!(again.metadata, laid_out.metadata);
}

#[test]
fn test_body_string_shorthand() {
    let doc = to_model_str(r#"{"body": "Hello"}"#).unwrap();
    assert_eq!(doc.body.len(), 1);
    match &doc.body[0] {
        Block::Text(text) => assert_eq!(text.text, "Hello"),
        other => panic!("unexpected block {:?}", other),
    }
}

#[test]
fn test_style_values_bound() {
    let doc = to_model(&json!({"body": [
        {"type": "text", "text": "x", "style": {"alignment": "right", "bold": true, "color": "#ff0000"}}
    ]}))
    .unwrap();
    let style = doc.body[0].style();
    assert_eq!(style.alignment, Some(Alignment::Right));
    assert_eq!(style.bold, Some(true));
}

#[test]
fn test_error_paths() {
    assert_eq!(schema_field(to_model(&json!({})).unwrap_err()), "body");
    assert_eq!(
        schema_field(to_model(&json!({"body": [{"type": "text"}]})).unwrap_err()),
        "body[0].text"
    );
    assert_eq!(
        schema_field(
            to_model(&json!({"body": [{"type": "text", "text": "a"}, {"type": "image", "width": 3}]}))
                .unwrap_err()
        ),
        "body[1].height"
    );
    assert_eq!(
        schema_field(to_model(&json!({"title": 5, "body": []})).unwrap_err()),
        "title"
    );
}

#[test]
fn test_wrong_root_type() {
    let err = to_model(&json!([1, 2, 3])).unwrap_err();
    assert!(matches!(err, Error::Schema { .. }));
}

#[test]
fn test_json_formats() {
    let doc = to_model(&json!({"body": "Formats"})).unwrap();
    let pretty = from_model_string(&doc, JsonFormat::Pretty).unwrap();
    let compact = from_model_string(&doc, JsonFormat::Compact).unwrap();
    assert!(pretty.contains('\n'));
    assert!(!compact.contains('\n'));
    assert_eq!(
        serde_json::from_str::<Value>(&pretty).unwrap(),
        serde_json::from_str::<Value>(&compact).unwrap()
    );
}
