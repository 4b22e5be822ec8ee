//! Locating, decoding and verifying embedded payloads.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine};
use lopdf::{Dictionary, Document as LopdfDocument, Object, ObjectId};
use serde::{Serialize, Serializer};

use super::embed::PAYLOAD_REF_KEY;
use super::payload::{open, DecodedWatermark, WatermarkKeys};
use crate::error::Result;
use crate::extract::load_document;

/// Why a verification failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyReason {
    EmptyPdf,
    MissingKeys,
    WatermarkNotFound,
    InvalidSignature,
    /// An error was raised while decoding; holds [`crate::Error::kind`]
    Exception(String),
}

impl fmt::Display for VerifyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerifyReason::EmptyPdf => write!(f, "EMPTY_PDF"),
            VerifyReason::MissingKeys => write!(f, "MISSING_KEYS"),
            VerifyReason::WatermarkNotFound => write!(f, "WATERMARK_NOT_FOUND"),
            VerifyReason::InvalidSignature => write!(f, "INVALID_SIGNATURE"),
            VerifyReason::Exception(kind) => write!(f, "EXCEPTION:{}", kind),
        }
    }
}

impl Serialize for VerifyReason {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Detailed verification outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verification {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<VerifyReason>,
    pub claims: BTreeMap<String, String>,
    pub timestamp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
}

impl Verification {
    fn ok(decoded: DecodedWatermark) -> Self {
        Self {
            valid: true,
            reason: None,
            claims: decoded.claims,
            timestamp: decoded.timestamp,
            nonce: Some(decoded.nonce),
        }
    }

    fn fail(reason: VerifyReason) -> Self {
        Self {
            valid: false,
            reason: Some(reason),
            claims: BTreeMap::new(),
            timestamp: 0,
            nonce: None,
        }
    }
}

/// Decode every distinct payload referenced from the pages of `pdf`.
///
/// `password` opens protected documents; it is ignored for unprotected ones.
pub fn extract_all(
    pdf: &[u8],
    password: Option<&str>,
    keys: &WatermarkKeys,
) -> Result<Vec<DecodedWatermark>> {
    let doc = load_document(pdf, password)?;
    let payloads = payload_ids(&doc);
    log::debug!("Found {} watermark payload(s)", payloads.len());

    let mut decoded = Vec::with_capacity(payloads.len());
    for id in payloads {
        let Ok(stream) = doc.get_object(id).and_then(Object::as_stream) else {
            log::warn!("Watermark reference {:?} is not a stream", id);
            continue;
        };
        let bytes = stream
            .decompressed_content()
            .unwrap_or_else(|_| stream.content.clone());
        decoded.push(open(&bytes, keys)?);
    }
    Ok(decoded)
}

/// Decode the first payload, if any.
pub fn extract_first(
    pdf: &[u8],
    password: Option<&str>,
    keys: &WatermarkKeys,
) -> Result<Option<DecodedWatermark>> {
    Ok(extract_all(pdf, password, keys)?.into_iter().next())
}

/// Check that `pdf` carries a correctly signed payload.
pub fn verify(pdf: &[u8], password: Option<&str>, hmac_key: &[u8], aes_key: &[u8]) -> bool {
    verify_detailed(pdf, password, hmac_key, aes_key).valid
}

/// [`verify`] with base64-encoded keys. Undecodable keys fail verification.
pub fn verify_base64(
    pdf: &[u8],
    password: Option<&str>,
    hmac_key_base64: &str,
    aes_key_base64: &str,
) -> bool {
    let (Ok(hmac), Ok(aes)) = (
        STANDARD.decode(hmac_key_base64.trim()),
        STANDARD.decode(aes_key_base64.trim()),
    ) else {
        return false;
    };
    verify(pdf, password, &hmac, &aes)
}

/// Verify and report why verification failed, or the recovered claims.
pub fn verify_detailed(
    pdf: &[u8],
    password: Option<&str>,
    hmac_key: &[u8],
    aes_key: &[u8],
) -> Verification {
    if pdf.is_empty() {
        return Verification::fail(VerifyReason::EmptyPdf);
    }
    if hmac_key.is_empty() || aes_key.is_empty() {
        return Verification::fail(VerifyReason::MissingKeys);
    }

    let first = WatermarkKeys::new(hmac_key, aes_key)
        .and_then(|keys| extract_first(pdf, password, &keys));
    match first {
        Ok(None) => Verification::fail(VerifyReason::WatermarkNotFound),
        Ok(Some(decoded)) if !decoded.signature_valid => {
            Verification::fail(VerifyReason::InvalidSignature)
        }
        Ok(Some(decoded)) => Verification::ok(decoded),
        Err(err) => {
            log::debug!("Watermark verification failed: {}", err);
            Verification::fail(VerifyReason::Exception(err.kind().to_string()))
        }
    }
}

/// Payload stream ids reachable from page-level form XObjects, in page order.
fn payload_ids(doc: &LopdfDocument) -> Vec<ObjectId> {
    let mut seen = BTreeSet::new();
    let mut ids = Vec::new();
    for page_id in doc.get_pages().into_values() {
        let Some(xobjects) = page_xobjects(doc, page_id) else {
            continue;
        };
        for (_, value) in xobjects.iter() {
            let Some(form) = stream_dict(doc, value) else {
                continue;
            };
            if let Ok(Object::Reference(id)) = form.get(PAYLOAD_REF_KEY) {
                if seen.insert(*id) {
                    ids.push(*id);
                }
            }
        }
    }
    ids
}

fn page_xobjects(doc: &LopdfDocument, page_id: ObjectId) -> Option<&Dictionary> {
    let mut dict = doc.get_dictionary(page_id).ok()?;
    let resources = loop {
        if let Ok(value) = dict.get(b"Resources") {
            break value;
        }
        let parent = dict.get(b"Parent").ok()?.as_reference().ok()?;
        dict = doc.get_dictionary(parent).ok()?;
    };
    let resources = as_dict(doc, resources)?;
    as_dict(doc, resources.get(b"XObject").ok()?)
}

fn as_dict<'a>(doc: &'a LopdfDocument, obj: &'a Object) -> Option<&'a Dictionary> {
    match obj {
        Object::Reference(id) => doc.get_dictionary(*id).ok(),
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

fn stream_dict<'a>(doc: &'a LopdfDocument, obj: &'a Object) -> Option<&'a Dictionary> {
    let obj = match obj {
        Object::Reference(id) => doc.get_object(*id).ok()?,
        other => other,
    };
    match obj {
        Object::Stream(stream) => Some(&stream.dict),
        _ => None,
    }
}
