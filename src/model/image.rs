//! Image blocks.

use super::{Rect, StyleAttributes};
use serde::{Deserialize, Serialize};

/// Encoded raster image format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Unknown,
}

impl ImageFormat {
    /// Detect the format from the leading bytes.
    pub fn detect(data: &[u8]) -> Self {
        match ::image::guess_format(data) {
            Ok(::image::ImageFormat::Jpeg) => ImageFormat::Jpeg,
            Ok(::image::ImageFormat::Png) => ImageFormat::Png,
            _ => ImageFormat::Unknown,
        }
    }
}

/// A raster image placed at a fixed size.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ImageBlock {
    /// Caller-assigned identifier used in error messages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Display width in points
    pub width: f32,

    /// Display height in points
    pub height: f32,

    /// Encoded image bytes (PNG or JPEG); drawn as a placeholder when absent
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "base64_bytes"
    )]
    pub data: Option<Vec<u8>>,

    /// Alternative text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,

    /// Style overrides (alignment positions the image)
    #[serde(default, skip_serializing_if = "StyleAttributes::is_empty")]
    pub style: StyleAttributes,

    /// Position on the page, set by layout
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbox: Option<Rect>,
}

impl ImageBlock {
    /// Create an image block of the given size without image data.
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    /// Attach encoded image bytes.
    pub fn with_data(mut self, data: Vec<u8>) -> Self {
        self.data = Some(data);
        self
    }

    /// Set the identifier.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set alternative text.
    pub fn with_alt(mut self, alt: impl Into<String>) -> Self {
        self.alt = Some(alt.into());
        self
    }

    /// Format of the attached data, if any.
    pub fn format(&self) -> Option<ImageFormat> {
        self.data.as_deref().map(ImageFormat::detect)
    }
}

mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(data: &Option<Vec<u8>>, s: S) -> Result<S::Ok, S::Error> {
        match data {
            Some(bytes) => s.serialize_str(&STANDARD.encode(bytes)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<u8>>, D::Error> {
        let encoded: Option<String> = Option::deserialize(d)?;
        encoded
            .map(|text| STANDARD.decode(text).map_err(serde::de::Error::custom))
            .transpose()
    }
}
