//! WinAnsiEncoding (PDF Reference, Annex D).

/// Code points for bytes 0x80..=0x9F; `None` marks unused codes.
const HIGH_CONTROL: [Option<char>; 32] = [
    Some('\u{20AC}'),
    None,
    Some('\u{201A}'),
    Some('\u{0192}'),
    Some('\u{201E}'),
    Some('\u{2026}'),
    Some('\u{2020}'),
    Some('\u{2021}'),
    Some('\u{02C6}'),
    Some('\u{2030}'),
    Some('\u{0160}'),
    Some('\u{2039}'),
    Some('\u{0152}'),
    None,
    Some('\u{017D}'),
    None,
    None,
    Some('\u{2018}'),
    Some('\u{2019}'),
    Some('\u{201C}'),
    Some('\u{201D}'),
    Some('\u{2022}'),
    Some('\u{2013}'),
    Some('\u{2014}'),
    Some('\u{02DC}'),
    Some('\u{2122}'),
    Some('\u{0161}'),
    Some('\u{203A}'),
    Some('\u{0153}'),
    None,
    Some('\u{017E}'),
    Some('\u{0178}'),
];

/// Encode one character, or `None` if WinAnsi has no code for it.
pub fn encode_char(c: char) -> Option<u8> {
    match c as u32 {
        0x20..=0x7E | 0xA0..=0xFF => Some(c as u32 as u8),
        // Tabs measure and draw as spaces.
        0x09 => Some(b' '),
        _ => HIGH_CONTROL
            .iter()
            .position(|&mapped| mapped == Some(c))
            .map(|i| 0x80 + i as u8),
    }
}

/// Encode a string, replacing unencodable characters with `?`.
///
/// Returns the bytes and the number of replaced characters.
pub fn encode_lossy(text: &str) -> (Vec<u8>, usize) {
    let mut replaced = 0;
    let bytes = text
        .chars()
        .map(|c| {
            encode_char(c).unwrap_or_else(|| {
                replaced += 1;
                b'?'
            })
        })
        .collect();
    (bytes, replaced)
}

/// Decode a single byte.
pub fn decode_byte(b: u8) -> char {
    match b {
        0x80..=0x9F => HIGH_CONTROL[(b - 0x80) as usize].unwrap_or('\u{FFFD}'),
        _ => b as char,
    }
}

/// Decode a byte string.
pub fn decode(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| decode_byte(b)).collect()
}
