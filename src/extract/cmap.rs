//! `/ToUnicode` CMap parsing.
//!
//! Only the `bfchar` and `bfrange` sections matter for text extraction;
//! everything else in the CMap program is skipped.

use std::collections::HashMap;

/// Ranges wider than this are truncated.
const MAX_RANGE: u32 = 0xFFFF;

/// Character code to Unicode mapping read from a `/ToUnicode` stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToUnicode {
    mappings: HashMap<u32, String>,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Hex(Vec<u8>),
    ArrayStart,
    ArrayEnd,
    Word(String),
}

impl ToUnicode {
    /// Parse CMap program bytes. Malformed entries are skipped.
    pub fn parse(data: &[u8]) -> Self {
        let tokens = tokenize(data);
        let mut mappings = HashMap::new();

        let mut i = 0;
        while i < tokens.len() {
            match &tokens[i] {
                Token::Word(w) if w == "beginbfchar" => {
                    i = parse_bfchar(&tokens, i + 1, &mut mappings);
                }
                Token::Word(w) if w == "beginbfrange" => {
                    i = parse_bfrange(&tokens, i + 1, &mut mappings);
                }
                _ => i += 1,
            }
        }
        Self { mappings }
    }

    /// Unicode text of a character code.
    pub fn lookup(&self, code: u32) -> Option<&str> {
        self.mappings.get(&code).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}

/// Big-endian code value of up to four bytes.
pub fn code_value(bytes: &[u8]) -> u32 {
    bytes
        .iter()
        .take(4)
        .fold(0u32, |acc, &b| (acc << 8) | u32::from(b))
}

fn utf16_units(bytes: &[u8]) -> Vec<u16> {
    if bytes.len() == 1 {
        return vec![u16::from(bytes[0])];
    }
    bytes
        .chunks_exact(2)
        .map(|c| u16::from_be_bytes([c[0], c[1]]))
        .collect()
}

fn decode_utf16(bytes: &[u8]) -> Option<String> {
    String::from_utf16(&utf16_units(bytes)).ok()
}

fn parse_bfchar(tokens: &[Token], mut i: usize, out: &mut HashMap<u32, String>) -> usize {
    while i < tokens.len() {
        match (&tokens[i], tokens.get(i + 1)) {
            (Token::Word(w), _) if w == "endbfchar" => return i + 1,
            (Token::Hex(src), Some(Token::Hex(dst))) => {
                if let Some(text) = decode_utf16(dst) {
                    out.insert(code_value(src), text);
                }
                i += 2;
            }
            _ => i += 1,
        }
    }
    i
}

fn parse_bfrange(tokens: &[Token], mut i: usize, out: &mut HashMap<u32, String>) -> usize {
    while i < tokens.len() {
        let (Token::Hex(lo), Some(Token::Hex(hi))) = (&tokens[i], tokens.get(i + 1)) else {
            if matches!(&tokens[i], Token::Word(w) if w == "endbfrange") {
                return i + 1;
            }
            i += 1;
            continue;
        };
        let lo = code_value(lo);
        let hi = code_value(hi).min(lo.saturating_add(MAX_RANGE));
        i += 2;

        match tokens.get(i) {
            Some(Token::Hex(dst)) => {
                let start = utf16_units(dst);
                for (offset, code) in (lo..=hi).enumerate() {
                    let mut units = start.clone();
                    if let Some(last) = units.last_mut() {
                        *last = last.wrapping_add(offset as u16);
                    }
                    if let Ok(text) = String::from_utf16(&units) {
                        out.insert(code, text);
                    }
                }
                i += 1;
            }
            Some(Token::ArrayStart) => {
                i += 1;
                let mut code = u64::from(lo);
                while let Some(token) = tokens.get(i) {
                    i += 1;
                    match token {
                        Token::ArrayEnd => break,
                        Token::Hex(dst) if code <= u64::from(hi) => {
                            if let Some(text) = decode_utf16(dst) {
                                out.insert(code as u32, text);
                            }
                            code += 1;
                        }
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }
    i
}

fn tokenize(data: &[u8]) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < data.len() {
        match data[i] {
            b'%' => {
                while i < data.len() && data[i] != b'\n' && data[i] != b'\r' {
                    i += 1;
                }
            }
            b'<' if data.get(i + 1) == Some(&b'<') => {
                tokens.push(Token::Word("<<".into()));
                i += 2;
            }
            b'>' if data.get(i + 1) == Some(&b'>') => {
                tokens.push(Token::Word(">>".into()));
                i += 2;
            }
            b'<' => {
                let mut digits = Vec::new();
                i += 1;
                while i < data.len() && data[i] != b'>' {
                    if data[i].is_ascii_hexdigit() {
                        digits.push(data[i]);
                    }
                    i += 1;
                }
                i += 1;
                if digits.len() % 2 == 1 {
                    digits.push(b'0');
                }
                let bytes = digits
                    .chunks_exact(2)
                    .filter_map(|pair| {
                        std::str::from_utf8(pair)
                            .ok()
                            .and_then(|s| u8::from_str_radix(s, 16).ok())
                    })
                    .collect();
                tokens.push(Token::Hex(bytes));
            }
            b'(' => {
                let mut depth = 0;
                while i < data.len() {
                    match data[i] {
                        b'\\' => i += 1,
                        b'(' => depth += 1,
                        b')' => {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                        }
                        _ => {}
                    }
                    i += 1;
                }
                i += 1;
            }
            b'[' => {
                tokens.push(Token::ArrayStart);
                i += 1;
            }
            b']' => {
                tokens.push(Token::ArrayEnd);
                i += 1;
            }
            c if c.is_ascii_whitespace() => i += 1,
            _ => {
                let start = i;
                while i < data.len()
                    && !data[i].is_ascii_whitespace()
                    && !b"<>[]()%".contains(&data[i])
                {
                    i += 1;
                }
                if i == start {
                    i += 1;
                    continue;
                }
                tokens.push(Token::Word(String::from_utf8_lossy(&data[start..i]).into_owned()));
            }
        }
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    const IDENTITY_CMAP: &[u8] = b"/CIDInit /ProcSet findresource begin
12 dict begin
begincmap
/CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def
/CMapName /Adobe-Identity-UCS def
1 begincodespacerange
<0000> <FFFF>
endcodespacerange
2 beginbfchar
<0024> <0041>
<0025> <0042>
endbfchar
endcmap";

    #[test]
    fn test_bfchar() {
        let cmap = ToUnicode::parse(IDENTITY_CMAP);
        assert_eq!(cmap.lookup(0x24), Some("A"));
        assert_eq!(cmap.lookup(0x25), Some("B"));
        assert_eq!(cmap.lookup(0x26), None);
        assert_eq!(cmap.len(), 2);
    }

    #[test]
    fn test_bfrange_increments() {
        let cmap = ToUnicode::parse(b"1 beginbfrange <0003> <0005> <0061> endbfrange");
        assert_eq!(cmap.lookup(3), Some("a"));
        assert_eq!(cmap.lookup(5), Some("c"));
        assert_eq!(cmap.lookup(6), None);
    }

    #[test]
    fn test_bfrange_array_and_ligature() {
        let cmap = ToUnicode::parse(
            b"beginbfrange\n<10> <12> [<0066006C> <0058> <D83DDE00>]\nendbfrange",
        );
        assert_eq!(cmap.lookup(0x10), Some("fl"));
        assert_eq!(cmap.lookup(0x11), Some("X"));
        assert_eq!(cmap.lookup(0x12), Some("\u{1F600}"));
    }

    #[test]
    fn test_single_byte_source_codes() {
        let cmap = ToUnicode::parse(b"beginbfchar <41> <0391> endbfchar");
        assert_eq!(cmap.lookup(0x41), Some("\u{391}"));
    }

    #[test]
    fn test_huge_range_truncated() {
        let cmap = ToUnicode::parse(b"beginbfrange <00000000> <FFFFFFFF> <0041> endbfrange");
        assert_eq!(cmap.lookup(0), Some("A"));
        assert!(cmap.lookup(MAX_RANGE + 1).is_none());
        assert!(cmap.len() <= MAX_RANGE as usize + 1);
    }

    #[test]
    fn test_garbage_is_empty() {
        assert!(ToUnicode::parse(b"not a cmap <zz> [[[").is_empty());
        assert!(ToUnicode::parse(b"").is_empty());
    }

    #[test]
    fn test_code_value() {
        assert_eq!(code_value(&[0x00, 0x24]), 0x24);
        assert_eq!(code_value(&[0x41]), 0x41);
        assert_eq!(code_value(&[0x01, 0x02, 0x03]), 0x010203);
    }
}
