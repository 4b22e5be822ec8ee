//! Forensic watermarking of existing PDFs.
//!
//! A watermark is a set of string claims sealed into an encrypted, signed
//! payload ([`seal`]) and hidden in every page ([`embed`]). The inspection
//! side ([`extract_all`], [`verify_detailed`]) finds the payload again and
//! checks its signature. A request with a user password also encrypts the
//! output ([`protect`]).

mod embed;
mod inspect;
mod payload;
mod protect;

use std::collections::BTreeMap;

pub use embed::{embed, EmbedOptions, Embedded, PAYLOAD_MARK_KEY, PAYLOAD_REF_KEY};
pub use inspect::{
    extract_all, extract_first, verify, verify_base64, verify_detailed, Verification,
    VerifyReason,
};
pub use payload::{open, seal, seal_with, DecodedWatermark, WatermarkKeys, PAYLOAD_VERSION};
pub use protect::{protect, random_owner_password, OWNER_PASSWORD_LEN};

use crate::error::{Error, Result};

/// Everything needed to watermark a document.
#[derive(Debug, Clone)]
pub struct WatermarkRequest {
    pub keys: WatermarkKeys,
    pub claims: BTreeMap<String, String>,
    pub embed: EmbedOptions,
    /// Encrypt the output so it opens only with this password
    pub user_password: Option<String>,
    /// Owner password; generated when protecting without one
    pub owner_password: Option<String>,
}

impl WatermarkRequest {
    pub fn new(keys: WatermarkKeys) -> Self {
        Self {
            keys,
            claims: BTreeMap::new(),
            embed: EmbedOptions::default(),
            user_password: None,
            owner_password: None,
        }
    }

    /// Add a claim. Later values replace earlier ones for the same key.
    pub fn with_claim(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.claims.insert(key.into(), value.into());
        self
    }

    pub fn with_claims(mut self, claims: BTreeMap<String, String>) -> Self {
        self.claims.extend(claims);
        self
    }

    pub fn with_embed_options(mut self, embed: EmbedOptions) -> Self {
        self.embed = embed;
        self
    }

    pub fn with_user_password(mut self, password: impl Into<String>) -> Self {
        self.user_password = Some(password.into());
        self
    }

    pub fn with_owner_password(mut self, password: impl Into<String>) -> Self {
        self.owner_password = Some(password.into());
        self
    }
}

/// A watermarked document.
#[derive(Debug, Clone)]
pub struct WatermarkResult {
    pub pdf: Vec<u8>,
    /// Number of hidden references written across all pages
    pub copies: usize,
    /// Size of the sealed payload
    pub payload_len: usize,
    /// Owner password of a protected result; `None` when unprotected
    pub owner_password: Option<String>,
}

/// Seal the request's claims and embed them into `pdf`, then protect the
/// result when the request carries a user password.
pub fn watermark(pdf: &[u8], request: &WatermarkRequest) -> Result<WatermarkResult> {
    if pdf.is_empty() {
        return Err(Error::Watermark("input PDF is empty".into()));
    }
    let payload = seal(&request.claims, &request.keys)?;
    let embedded = embed(pdf, &payload, &request.embed)?;

    let (pdf, owner_password) = match request.user_password.as_deref().filter(|p| !p.is_empty()) {
        Some(user) => {
            let owner = request
                .owner_password
                .clone()
                .filter(|p| !p.is_empty())
                .unwrap_or_else(|| random_owner_password(OWNER_PASSWORD_LEN));
            (protect(&embedded.pdf, user, &owner)?, Some(owner))
        }
        None => (embedded.pdf, None),
    };

    Ok(WatermarkResult {
        pdf,
        copies: embedded.copies,
        payload_len: payload.len(),
        owner_password,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Block, Document, TextBlock};

    fn request() -> WatermarkRequest {
        let keys = WatermarkKeys::new(b"k".to_vec(), [1u8; 32].to_vec()).unwrap();
        WatermarkRequest::new(keys)
            .with_claim("user", "carol")
            .with_claim("copy", "7")
    }

    #[test]
    fn test_watermark_and_verify() {
        let mut doc = Document::new();
        doc.body.push(Block::Text(TextBlock::new("First page.")));
        let pdf = crate::generate_document(&doc).unwrap();

        let result = watermark(&pdf, &request()).unwrap();
        assert_eq!(result.copies, 3);
        assert!(result.payload_len > 16);

        assert!(result.owner_password.is_none());

        let check = verify_detailed(&result.pdf, None, b"k", &[1u8; 32]);
        assert!(check.valid);
        assert_eq!(check.claims["user"], "carol");
        assert_eq!(check.claims["copy"], "7");
    }

    #[test]
    fn test_explicit_owner_password_returned() {
        let mut doc = Document::new();
        doc.body.push(Block::Text(TextBlock::new("Locked.")));
        let pdf = crate::generate_document(&doc).unwrap();

        let request = request()
            .with_user_password("reader")
            .with_owner_password("keeper");
        let result = watermark(&pdf, &request).unwrap();
        assert_eq!(result.owner_password.as_deref(), Some("keeper"));
    }

    #[test]
    fn test_owner_password_without_user_password_ignored() {
        let mut doc = Document::new();
        doc.body.push(Block::Text(TextBlock::new("Open.")));
        let pdf = crate::generate_document(&doc).unwrap();

        let result = watermark(&pdf, &request().with_owner_password("keeper")).unwrap();
        assert!(result.owner_password.is_none());
        assert!(verify_detailed(&result.pdf, None, b"k", &[1u8; 32]).valid);
    }

    #[test]
    fn test_empty_input() {
        assert!(matches!(
            watermark(&[], &request()),
            Err(Error::Watermark(_))
        ));
    }
}
