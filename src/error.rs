//! Error types for kurbypdf.

use std::io;
use thiserror::Error;

/// Result type alias for kurbypdf operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while binding, laying out, rendering,
/// extracting or watermarking documents.
#[derive(Error, Debug)]
pub enum Error {
    /// Structured input is missing a field or has a value of the wrong type.
    #[error("Schema error at `{field}`: {reason}")]
    Schema { field: String, reason: String },

    /// Content cannot fit the page constraints even on an empty page.
    #[error("Layout error in {block}: {reason}")]
    Layout { block: String, reason: String },

    /// A style value or resource cannot be drawn.
    #[error("Render error in {block}: {reason}")]
    Render { block: String, reason: String },

    /// The input is not a well-formed PDF container.
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// The PDF document is encrypted and requires a password.
    #[error("Document is encrypted")]
    Encrypted,

    /// The provided password is incorrect.
    #[error("Invalid password")]
    InvalidPassword,

    /// Watermark payload could not be built, embedded or decoded.
    #[error("Watermark error: {0}")]
    Watermark(String),

    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON text could not be parsed or produced.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Build a schema error for a field path.
    pub fn schema(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Schema {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Build a layout error for a block label.
    pub fn layout(block: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Layout {
            block: block.into(),
            reason: reason.into(),
        }
    }

    /// Build a render error for a block label.
    pub fn render(block: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Render {
            block: block.into(),
            reason: reason.into(),
        }
    }

    /// Short name of the error category, used in verification reason codes.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Schema { .. } => "SchemaError",
            Error::Layout { .. } => "LayoutError",
            Error::Render { .. } => "RenderError",
            Error::Extraction(_) => "ExtractionError",
            Error::Encrypted => "EncryptedError",
            Error::InvalidPassword => "InvalidPasswordError",
            Error::Watermark(_) => "WatermarkError",
            Error::Io(_) => "IoError",
            Error::Json(_) => "JsonError",
        }
    }
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(e) => Error::Io(e),
            lopdf::Error::Decryption(_) => Error::Encrypted,
            _ => Error::Extraction(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::schema("body[0].text", "missing required field");
        assert_eq!(
            err.to_string(),
            "Schema error at `body[0].text`: missing required field"
        );

        let err = Error::layout("body[2]", "image taller than page content area");
        assert_eq!(
            err.to_string(),
            "Layout error in body[2]: image taller than page content area"
        );
    }

    #[test]
    fn test_password_error_kinds() {
        assert_eq!(Error::Encrypted.to_string(), "Document is encrypted");
        assert_eq!(Error::Encrypted.kind(), "EncryptedError");
        assert_eq!(Error::InvalidPassword.kind(), "InvalidPasswordError");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
