//! Sealed claims payload: HMAC-SHA256 signed JSON, encrypted with AES-GCM.
//!
//! Layout of a sealed payload: `IV(12) || ciphertext || tag(16)`.

use std::collections::BTreeMap;

use aes_gcm::aead::consts::U12;
use aes_gcm::aead::{Aead, KeyInit, Nonce};
use aes_gcm::{Aes128Gcm, Aes256Gcm, AesGcm};
use base64::{engine::general_purpose::STANDARD, Engine};
use hmac::{Hmac, Mac};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::{Error, Result};

type HmacSha256 = Hmac<Sha256>;
type Aes192Gcm = AesGcm<aes::Aes192, U12>;

/// Payload format version written into every body.
pub const PAYLOAD_VERSION: u32 = 1;

const IV_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// Keys used to sign and encrypt a watermark payload.
#[derive(Clone, PartialEq, Eq)]
pub struct WatermarkKeys {
    hmac_key: Vec<u8>,
    aes_key: Vec<u8>,
}

impl WatermarkKeys {
    /// Create keys from raw bytes. The AES key must be 16, 24 or 32 bytes.
    pub fn new(hmac_key: impl Into<Vec<u8>>, aes_key: impl Into<Vec<u8>>) -> Result<Self> {
        let hmac_key = hmac_key.into();
        let aes_key = aes_key.into();
        if hmac_key.is_empty() {
            return Err(Error::Watermark("HMAC key must not be empty".into()));
        }
        if !matches!(aes_key.len(), 16 | 24 | 32) {
            return Err(Error::Watermark(format!(
                "AES key must be 16, 24 or 32 bytes, got {}",
                aes_key.len()
            )));
        }
        Ok(Self { hmac_key, aes_key })
    }

    /// Create keys from base64 text.
    pub fn from_base64(hmac_key: &str, aes_key: &str) -> Result<Self> {
        let hmac = STANDARD
            .decode(hmac_key.trim())
            .map_err(|e| Error::Watermark(format!("invalid base64 HMAC key: {}", e)))?;
        let aes = STANDARD
            .decode(aes_key.trim())
            .map_err(|e| Error::Watermark(format!("invalid base64 AES key: {}", e)))?;
        Self::new(hmac, aes)
    }

    fn mac(&self) -> Result<HmacSha256> {
        <HmacSha256 as Mac>::new_from_slice(&self.hmac_key)
            .map_err(|e| Error::Watermark(format!("HMAC error: {}", e)))
    }
}

impl std::fmt::Debug for WatermarkKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatermarkKeys")
            .field("hmac_key", &format_args!("<{} bytes>", self.hmac_key.len()))
            .field("aes_key", &format_args!("<{} bytes>", self.aes_key.len()))
            .finish()
    }
}

/// Claims recovered from one payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedWatermark {
    pub claims: BTreeMap<String, String>,
    /// Milliseconds since the Unix epoch at sealing time.
    pub timestamp: i64,
    pub nonce: String,
    pub signature_valid: bool,
}

// Fields are declared in key order; the signed bytes are the JSON with
// sorted keys.
#[derive(Serialize)]
struct Body<'a> {
    claims: &'a BTreeMap<String, String>,
    nonce: &'a str,
    ts: i64,
    v: u32,
}

#[derive(Serialize, Deserialize)]
struct Sealed {
    claims: BTreeMap<String, String>,
    nonce: String,
    sig: String,
    ts: i64,
    v: u32,
}

/// Sign and encrypt claims, stamping the current time and a random nonce.
pub fn seal(claims: &BTreeMap<String, String>, keys: &WatermarkKeys) -> Result<Vec<u8>> {
    let ts = chrono::Utc::now().timestamp_millis();
    let nonce = rand::rng().next_u64().to_string();
    seal_with(claims, ts, &nonce, keys)
}

/// Sign and encrypt claims with an explicit timestamp and nonce.
pub fn seal_with(
    claims: &BTreeMap<String, String>,
    timestamp: i64,
    nonce: &str,
    keys: &WatermarkKeys,
) -> Result<Vec<u8>> {
    let body = serde_json::to_vec(&Body {
        claims,
        nonce,
        ts: timestamp,
        v: PAYLOAD_VERSION,
    })?;

    let mut mac = keys.mac()?;
    mac.update(&body);
    let sig = STANDARD.encode(mac.finalize().into_bytes());

    let sealed = serde_json::to_vec(&Sealed {
        claims: claims.clone(),
        nonce: nonce.to_string(),
        sig,
        ts: timestamp,
        v: PAYLOAD_VERSION,
    })?;

    let mut iv = [0u8; IV_LEN];
    rand::rng().fill_bytes(&mut iv);
    let ciphertext = encrypt(&keys.aes_key, &iv, &sealed)?;

    let mut out = Vec::with_capacity(IV_LEN + ciphertext.len());
    out.extend_from_slice(&iv);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Decrypt a payload and check its signature.
///
/// A bad signature is reported through `signature_valid`; decryption,
/// authentication or format failures are errors.
pub fn open(blob: &[u8], keys: &WatermarkKeys) -> Result<DecodedWatermark> {
    if blob.len() <= IV_LEN + TAG_LEN {
        return Err(Error::Watermark(format!(
            "payload has invalid length {}",
            blob.len()
        )));
    }
    let (iv, ciphertext) = blob.split_at(IV_LEN);
    let plain = decrypt(&keys.aes_key, iv, ciphertext)?;

    let sealed: Sealed = serde_json::from_slice(&plain)
        .map_err(|e| Error::Watermark(format!("payload is not a sealed claims object: {}", e)))?;
    if sealed.v != PAYLOAD_VERSION {
        return Err(Error::Watermark(format!(
            "unsupported payload version {}",
            sealed.v
        )));
    }

    let body = serde_json::to_vec(&Body {
        claims: &sealed.claims,
        nonce: &sealed.nonce,
        ts: sealed.ts,
        v: sealed.v,
    })?;
    let signature_valid = match STANDARD.decode(&sealed.sig) {
        Ok(sig) => {
            let mut mac = keys.mac()?;
            mac.update(&body);
            mac.verify_slice(&sig).is_ok()
        }
        Err(_) => false,
    };
    if !signature_valid {
        log::warn!("watermark payload signature does not match");
    }

    Ok(DecodedWatermark {
        claims: sealed.claims,
        timestamp: sealed.ts,
        nonce: sealed.nonce,
        signature_valid,
    })
}

fn encrypt(key: &[u8], iv: &[u8], plain: &[u8]) -> Result<Vec<u8>> {
    match key.len() {
        16 => encrypt_with::<Aes128Gcm>(key, iv, plain),
        24 => encrypt_with::<Aes192Gcm>(key, iv, plain),
        _ => encrypt_with::<Aes256Gcm>(key, iv, plain),
    }
}

fn decrypt(key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
    match key.len() {
        16 => decrypt_with::<Aes128Gcm>(key, iv, ciphertext),
        24 => decrypt_with::<Aes192Gcm>(key, iv, ciphertext),
        _ => decrypt_with::<Aes256Gcm>(key, iv, ciphertext),
    }
}

fn encrypt_with<C: Aead + KeyInit>(key: &[u8], iv: &[u8], plain: &[u8]) -> Result<Vec<u8>> {
    let cipher = C::new_from_slice(key)
        .map_err(|_| Error::Watermark("invalid AES key length".into()))?;
    cipher
        .encrypt(Nonce::<C>::from_slice(iv), plain)
        .map_err(|_| Error::Watermark("payload encryption failed".into()))
}

fn decrypt_with<C: Aead + KeyInit>(key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
    let cipher = C::new_from_slice(key)
        .map_err(|_| Error::Watermark("invalid AES key length".into()))?;
    cipher
        .decrypt(Nonce::<C>::from_slice(iv), ciphertext)
        .map_err(|_| Error::Watermark("payload decryption failed".into()))
}
