//! Password protection of watermarked output (AES-256, PDF 2.0 security handler).

use std::collections::BTreeMap;
use std::sync::Arc;

use lopdf::encryption::crypt_filters::{Aes256CryptFilter, CryptFilter};
use lopdf::{Document as LopdfDocument, EncryptionState, EncryptionVersion, Permissions};
use rand::seq::SliceRandom;
use rand::{Rng, RngCore};

use crate::error::{Error, Result};

/// Length of generated owner passwords.
pub const OWNER_PASSWORD_LEN: usize = 32;

const UPPER: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const LOWER: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const DIGIT: &[u8] = b"0123456789";
const SYMBOL: &[u8] = b"!@#$%^&*()-_=+[]{};:,.<>?";

/// Generate an owner password of `len` characters with at least one upper
/// case letter, lower case letter, digit and symbol.
pub fn random_owner_password(len: usize) -> String {
    let mut rng = rand::rng();
    let all: Vec<u8> = [UPPER, LOWER, DIGIT, SYMBOL].concat();
    let pick = |rng: &mut rand::rngs::ThreadRng, set: &[u8]| set[rng.random_range(0..set.len())];

    let mut chars = vec![
        pick(&mut rng, UPPER),
        pick(&mut rng, LOWER),
        pick(&mut rng, DIGIT),
        pick(&mut rng, SYMBOL),
    ];
    while chars.len() < len {
        chars.push(pick(&mut rng, &all));
    }
    chars.shuffle(&mut rng);
    chars.into_iter().map(char::from).collect()
}

/// Encrypt `pdf` so it opens only with `user_password` (or `owner_password`).
///
/// Printing stays allowed; content copying is not.
pub fn protect(pdf: &[u8], user_password: &str, owner_password: &str) -> Result<Vec<u8>> {
    if user_password.is_empty() || owner_password.is_empty() {
        return Err(Error::Watermark("passwords must not be empty".into()));
    }
    let mut doc = LopdfDocument::load_mem(pdf)?;

    let mut file_key = [0u8; 32];
    rand::rng().fill_bytes(&mut file_key);
    let filter: Arc<dyn CryptFilter> = Arc::new(Aes256CryptFilter);
    let version = EncryptionVersion::V5 {
        encrypt_metadata: true,
        crypt_filters: BTreeMap::from([(b"StdCF".to_vec(), filter)]),
        file_encryption_key: &file_key,
        stream_filter: b"StdCF".to_vec(),
        string_filter: b"StdCF".to_vec(),
        owner_password,
        user_password,
        permissions: Permissions::all() - Permissions::COPYABLE,
    };
    let state = EncryptionState::try_from(version)
        .map_err(|e| Error::Watermark(format!("cannot set up encryption: {}", e)))?;
    doc.encrypt(&state)
        .map_err(|e| Error::Watermark(format!("encryption failed: {}", e)))?;

    let mut out = Vec::new();
    doc.save_to(&mut out)?;
    log::debug!("Protected document with AES-256 ({} bytes)", out.len());
    Ok(out)
}
