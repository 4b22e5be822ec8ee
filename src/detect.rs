//! PDF container sniffing.
//!
//! A cheap check run before a document is handed to the parser, so that
//! non-PDF input fails with a clear extraction error.

use crate::error::{Error, Result};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Header information of a PDF file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfFormat {
    /// Header version, e.g. "1.7"
    pub version: String,
    /// Offset of `%PDF-` from the start of the data
    pub header_offset: usize,
    /// Whether an `%%EOF` marker was found near the end
    pub has_eof_marker: bool,
}

impl std::fmt::Display for PdfFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PDF {}", self.version)
    }
}

const PDF_MAGIC: &[u8] = b"%PDF-";
const EOF_MARKER: &[u8] = b"%%EOF";
const VERSION_LEN: usize = 3;

/// Readers accept the header anywhere in the first kilobyte.
const HEADER_WINDOW: usize = 1024;

/// Trailing bytes searched for `%%EOF`.
const TRAILER_WINDOW: usize = 1024;

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Check that `data` starts like a PDF file.
///
/// Fails with [`Error::Extraction`] when no `%PDF-x.y` header is found.
pub fn detect_format_from_bytes(data: &[u8]) -> Result<PdfFormat> {
    let window = &data[..data.len().min(HEADER_WINDOW)];
    let offset = find(window, PDF_MAGIC)
        .ok_or_else(|| Error::Extraction("input is not a PDF (no %PDF- header)".to_string()))?;

    let start = offset + PDF_MAGIC.len();
    let version = data
        .get(start..start + VERSION_LEN)
        .map(|v| String::from_utf8_lossy(v).to_string())
        .filter(|v| is_valid_version(v))
        .ok_or_else(|| Error::Extraction("malformed PDF header version".to_string()))?;

    let tail = &data[data.len().saturating_sub(TRAILER_WINDOW)..];
    Ok(PdfFormat {
        version,
        header_offset: offset,
        has_eof_marker: find(tail, EOF_MARKER).is_some(),
    })
}

/// Check the header of a file on disk.
pub fn detect_format_from_path<P: AsRef<Path>>(path: P) -> Result<PdfFormat> {
    let mut data = Vec::new();
    File::open(path)?.read_to_end(&mut data)?;
    detect_format_from_bytes(&data)
}

fn is_valid_version(version: &str) -> bool {
    let bytes = version.as_bytes();
    bytes.len() == VERSION_LEN && bytes[0].is_ascii_digit() && bytes[1] == b'.' && bytes[2].is_ascii_digit()
}

/// Check if bytes carry a PDF header.
pub fn is_pdf_bytes(data: &[u8]) -> bool {
    detect_format_from_bytes(data).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_valid_pdf() {
        let data = b"%PDF-1.7\n%\xe2\xe3\xcf\xd3\n%%EOF\n";
        let format = detect_format_from_bytes(data).unwrap();
        assert_eq!(format.version, "1.7");
        assert_eq!(format.header_offset, 0);
        assert!(format.has_eof_marker);
    }

    #[test]
    fn test_detect_header_after_junk() {
        let data = b"\xef\xbb\xbfjunk%PDF-2.0\n";
        let format = detect_format_from_bytes(data).unwrap();
        assert_eq!(format.version, "2.0");
        assert_eq!(format.header_offset, 7);
        assert!(!format.has_eof_marker);
    }

    #[test]
    fn test_detect_invalid_format() {
        let result = detect_format_from_bytes(b"<!DOCTYPE html>");
        assert!(matches!(result, Err(Error::Extraction(_))));
    }

    #[test]
    fn test_detect_truncated_header() {
        assert!(detect_format_from_bytes(b"%PDF").is_err());
        assert!(detect_format_from_bytes(b"%PDF-1").is_err());
    }

    #[test]
    fn test_is_pdf_bytes() {
        assert!(is_pdf_bytes(b"%PDF-1.4\n"));
        assert!(!is_pdf_bytes(b"Not a PDF"));
    }

    #[test]
    fn test_version_validation() {
        assert!(is_valid_version("1.7"));
        assert!(!is_valid_version("10.0"));
        assert!(!is_valid_version("abc"));
    }

    #[test]
    fn test_detect_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.pdf");
        std::fs::write(&path, b"%PDF-1.5\n%%EOF").unwrap();
        assert_eq!(detect_format_from_path(&path).unwrap().version, "1.5");
    }
}
