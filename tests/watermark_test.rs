//! Integration tests for watermark embedding and verification.

use std::collections::BTreeMap;

use base64::{engine::general_purpose::STANDARD, Engine};
use kurbypdf::watermark::{
    embed, extract_all, extract_first, open, seal, verify, verify_base64, verify_detailed,
    watermark, EmbedOptions, VerifyReason, WatermarkKeys, WatermarkRequest,
};
use kurbypdf::extract::extract as extract_with;
use kurbypdf::{extract, generate_document, Document, Error, ExtractOptions, TextBlock};

const HMAC_KEY: &[u8] = b"integration-hmac-key";
const AES_KEY: [u8; 32] = [0x2a; 32];

fn keys() -> WatermarkKeys {
    WatermarkKeys::new(HMAC_KEY, AES_KEY).unwrap()
}

fn source_pdf(pages: usize) -> Vec<u8> {
    let mut doc = Document::new().with_title("Distribution copy");
    for i in 0..pages {
        doc.push(TextBlock::heading(1, format!("Page {}", i + 1)));
        // Enough text to fill the rest of the page.
        doc.push(TextBlock::new("Filler sentence for the page. ".repeat(160)));
    }
    generate_document(&doc).unwrap()
}

fn marked(pages: usize) -> Vec<u8> {
    let request = WatermarkRequest::new(keys())
        .with_claim("recipient", "dana@example.com")
        .with_claim("copy", "12");
    watermark(&source_pdf(pages), &request).unwrap().pdf
}

#[test]
fn test_claims_verify_with_right_keys() {
    let pdf = marked(1);
    let result = verify_detailed(&pdf, None, HMAC_KEY, &AES_KEY);
    assert!(result.valid, "{:?}", result.reason);
    assert_eq!(result.claims["recipient"], "dana@example.com");
    assert_eq!(result.claims["copy"], "12");
    assert!(verify(&pdf, None, HMAC_KEY, &AES_KEY));
}

#[test]
fn test_wrong_hmac_key_is_invalid_signature() {
    let result = verify_detailed(&marked(1), None, b"another-hmac-key", &AES_KEY);
    assert!(!result.valid);
    assert_eq!(result.reason, Some(VerifyReason::InvalidSignature));
    assert!(result.claims.is_empty());
}

#[test]
fn test_wrong_aes_key_is_exception() {
    let result = verify_detailed(&marked(1), None, HMAC_KEY, &[0x11; 32]);
    assert!(!result.valid);
    let reason = result.reason.unwrap().to_string();
    assert!(reason.starts_with("EXCEPTION:"), "{}", reason);
}

#[test]
fn test_plain_pdf_has_no_watermark() {
    let result = verify_detailed(&source_pdf(1), None, HMAC_KEY, &AES_KEY);
    assert_eq!(result.reason, Some(VerifyReason::WatermarkNotFound));
    assert!(extract_first(&source_pdf(1), None, &keys()).unwrap().is_none());
}

#[test]
fn test_every_page_carries_copies() {
    let source = source_pdf(3);
    let page_count = lopdf::Document::load_mem(&source).unwrap().get_pages().len();
    assert!(page_count >= 3);

    let request = WatermarkRequest::new(keys())
        .with_claim("k", "v")
        .with_embed_options(EmbedOptions::new().with_copies(2).with_seed(5));
    let result = watermark(&source, &request).unwrap();
    assert_eq!(result.copies, page_count * 2);

    // All copies point at one payload.
    let decoded = extract_all(&result.pdf, None, &keys()).unwrap();
    assert_eq!(decoded.len(), 1);
    assert!(decoded[0].signature_valid);
}

#[test]
fn test_watermark_leaves_text_intact() {
    let source = source_pdf(1);
    let before = extract(&source).unwrap();
    let after = extract(&marked(1)).unwrap();
    assert_eq!(before.document.plain_text(), after.document.plain_text());
    assert_eq!(before.elements.len(), after.elements.len());
}

#[test]
fn test_base64_keys() {
    let pdf = marked(1);
    assert!(verify_base64(&pdf, None, &STANDARD.encode(HMAC_KEY), &STANDARD.encode(AES_KEY)));
    assert!(!verify_base64(&pdf, None, &STANDARD.encode(b"nope"), &STANDARD.encode(AES_KEY)));
    assert!(!verify_base64(&pdf, None, "", ""));
}

#[test]
fn test_manual_seal_and_embed() {
    let mut claims = BTreeMap::new();
    claims.insert("order".to_string(), "A-1009".to_string());
    let payload = seal(&claims, &keys()).unwrap();
    assert!(open(&payload, &keys()).unwrap().signature_valid);

    let options = EmbedOptions::new().with_random_positions(false).with_copies(1);
    let embedded = embed(&source_pdf(1), &payload, &options).unwrap();
    assert_eq!(embedded.copies, 1);

    let decoded = extract_first(&embedded.pdf, None, &keys()).unwrap().unwrap();
    assert_eq!(decoded.claims, claims);
}

#[test]
fn test_rewatermarking_keeps_both_payloads() {
    let first = marked(1);
    let request = WatermarkRequest::new(keys()).with_claim("copy", "13");
    let second = watermark(&first, &request).unwrap().pdf;

    let decoded = extract_all(&second, None, &keys()).unwrap();
    assert_eq!(decoded.len(), 2);
    let copies: Vec<&str> = decoded.iter().map(|d| d.claims["copy"].as_str()).collect();
    assert!(copies.contains(&"12"));
    assert!(copies.contains(&"13"));
}

#[test]
fn test_empty_pdf_reason() {
    assert_eq!(
        verify_detailed(&[], None, HMAC_KEY, &AES_KEY).reason,
        Some(VerifyReason::EmptyPdf)
    );
}

fn protected(user: &str) -> (Vec<u8>, String) {
    let request = WatermarkRequest::new(keys())
        .with_claim("recipient", "erin@example.com")
        .with_user_password(user);
    let result = watermark(&source_pdf(1), &request).unwrap();
    let owner = result.owner_password.unwrap();
    (result.pdf, owner)
}

#[test]
fn test_protected_output_verifies_with_user_password() {
    let (pdf, owner) = protected("open-sesame");
    assert_eq!(owner.chars().count(), 32);
    assert_ne!(owner, "open-sesame");

    let result = verify_detailed(&pdf, Some("open-sesame"), HMAC_KEY, &AES_KEY);
    assert!(result.valid, "{:?}", result.reason);
    assert_eq!(result.claims["recipient"], "erin@example.com");
}

#[test]
fn test_protected_output_needs_password() {
    let (pdf, _) = protected("open-sesame");

    let missing = verify_detailed(&pdf, None, HMAC_KEY, &AES_KEY);
    assert!(!missing.valid);
    assert_eq!(
        missing.reason,
        Some(VerifyReason::Exception("EncryptedError".into()))
    );

    let wrong = verify_detailed(&pdf, Some("guess"), HMAC_KEY, &AES_KEY);
    assert!(!wrong.valid);
    assert!(matches!(
        extract_all(&pdf, Some("guess"), &keys()),
        Err(Error::InvalidPassword)
    ));
}

#[test]
fn test_protected_output_extracts_with_password() {
    let (pdf, _) = protected("reader-pass");
    assert!(matches!(extract(&pdf), Err(Error::Encrypted)));

    let options = ExtractOptions::default().with_password("reader-pass");
    let extraction = extract_with(&pdf, &options).unwrap();
    assert!(extraction.document.plain_text().contains("Filler sentence"));
}
