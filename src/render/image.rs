//! Image XObject encoding.

use super::deflate;
use ::image::{ColorType, DynamicImage, ImageFormat};
use lopdf::{Dictionary, Object, Stream};

/// An encoded image ready to add to the PDF.
pub struct EncodedImage {
    pub image: Stream,
    /// Alpha channel as a separate DeviceGray image, if any
    pub mask: Option<Stream>,
}

fn image_dict(width: u32, height: u32, colour_space: &str, filter: &str) -> Dictionary {
    let mut dict = Dictionary::new();
    dict.set("Type", Object::Name(b"XObject".to_vec()));
    dict.set("Subtype", Object::Name(b"Image".to_vec()));
    dict.set("Width", Object::Integer(width as i64));
    dict.set("Height", Object::Integer(height as i64));
    dict.set("ColorSpace", Object::Name(colour_space.as_bytes().to_vec()));
    dict.set("BitsPerComponent", Object::Integer(8));
    dict.set("Filter", Object::Name(filter.as_bytes().to_vec()));
    dict
}

/// Encode PNG or JPEG bytes as an image XObject.
///
/// Baseline RGB and greyscale JPEGs are embedded as-is; anything else is
/// decoded and stored as Flate-compressed RGB with an optional soft mask.
pub fn encode_image(data: &[u8]) -> Result<EncodedImage, String> {
    let format = ::image::guess_format(data).map_err(|e| e.to_string())?;
    let decoded = ::image::load_from_memory_with_format(data, format).map_err(|e| e.to_string())?;
    let (width, height) = (decoded.width(), decoded.height());

    if format == ImageFormat::Jpeg {
        let colour_space = match decoded.color() {
            ColorType::Rgb8 => Some("DeviceRGB"),
            ColorType::L8 => Some("DeviceGray"),
            _ => None,
        };
        if let Some(colour_space) = colour_space {
            let dict = image_dict(width, height, colour_space, "DCTDecode");
            return Ok(EncodedImage {
                image: Stream::new(dict, data.to_vec()),
                mask: None,
            });
        }
    }

    encode_raster(&decoded)
}

fn encode_raster(decoded: &DynamicImage) -> Result<EncodedImage, String> {
    let (width, height) = (decoded.width(), decoded.height());
    let rgb = deflate(decoded.to_rgb8().as_raw()).map_err(|e| e.to_string())?;

    let mask = if decoded.color().has_alpha() {
        let alphas: Vec<u8> = decoded.to_rgba8().pixels().map(|p| p.0[3]).collect();
        let compressed = deflate(&alphas).map_err(|e| e.to_string())?;
        Some(Stream::new(
            image_dict(width, height, "DeviceGray", "FlateDecode"),
            compressed,
        ))
    } else {
        None
    };

    Ok(EncodedImage {
        image: Stream::new(image_dict(width, height, "DeviceRGB", "FlateDecode"), rgb),
        mask,
    })
}
