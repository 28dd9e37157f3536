//! Signature image decoding and PDF image XObject construction

use std::io::Write;

use base64::{
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine,
};
use flate2::{write::ZlibEncoder, Compression};
use image::{DynamicImage, GenericImageView, ImageFormat};
use lopdf::{Dictionary, Object, Stream};

use crate::error::CoreError;

/// Raster encodings accepted for a signature
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureFormat {
    Png,
    Jpeg,
}

/// A decoded signature ready to be embedded into a document
#[derive(Debug, Clone)]
pub struct SignatureImage {
    pub format: SignatureFormat,
    pub width: u32,
    pub height: u32,
    /// Stream data for the image XObject, already encoded with `filter`
    data: Vec<u8>,
    filter: &'static str,
    color_space: &'static str,
    /// zlib-compressed 8-bit alpha channel, PNG only
    alpha: Option<Vec<u8>>,
}

/// Standard alphabet with optional padding
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Decode the transport form of a signature: raw base64 or a `data:` URL
///
/// Everything up to the first comma is treated as a data-URL header and
/// dropped, the same way a browser canvas export is shaped. Padding is
/// optional and the URL-safe alphabet is accepted alongside the standard one.
pub fn decode_signature_payload(payload: &str) -> Result<Vec<u8>, CoreError> {
    let encoded = match payload.split_once(',') {
        Some((_, data)) => data,
        None => payload,
    };
    let cleaned: String = encoded
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();

    let bytes = LENIENT_BASE64
        .decode(cleaned.as_bytes())
        .map_err(|e| CoreError::InvalidSignatureEncoding(e.to_string()))?;
    if bytes.is_empty() {
        return Err(CoreError::InvalidSignatureEncoding(
            "decoded payload is empty".into(),
        ));
    }
    Ok(bytes)
}

/// Component count from the first JPEG frame header (SOFn)
fn jpeg_components(bytes: &[u8]) -> Option<u8> {
    if !bytes.starts_with(&[0xFF, 0xD8]) {
        return None;
    }

    let mut pos = 2;
    while pos + 4 <= bytes.len() {
        if bytes[pos] != 0xFF {
            return None;
        }
        let marker = bytes[pos + 1];
        match marker {
            // fill byte
            0xFF => {
                pos += 1;
                continue;
            }
            0x01 | 0xD0..=0xD7 => {
                pos += 2;
                continue;
            }
            _ => {}
        }

        // DHT, JPG and DAC share the C4/C8/CC slots but are not frames
        let is_frame = matches!(marker, 0xC0..=0xCF) && !matches!(marker, 0xC4 | 0xC8 | 0xCC);
        if is_frame {
            // length(2) precision(1) height(2) width(2) components(1)
            return bytes.get(pos + 9).copied();
        }

        let len = u16::from_be_bytes([bytes[pos + 2], bytes[pos + 3]]) as usize;
        if marker == 0xDA || len < 2 {
            return None;
        }
        pos += 2 + len;
    }
    None
}

fn zlib(data: &[u8]) -> Result<Vec<u8>, CoreError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| CoreError::OperationError(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| CoreError::OperationError(e.to_string()))
}

impl SignatureImage {
    /// Decode signature bytes, trying PNG first and JPEG second
    pub fn decode(bytes: &[u8]) -> Result<Self, CoreError> {
        if let Ok(decoded) = image::load_from_memory_with_format(bytes, ImageFormat::Png) {
            return Self::from_pixels(SignatureFormat::Png, decoded);
        }
        if let Ok(decoded) = image::load_from_memory_with_format(bytes, ImageFormat::Jpeg) {
            return Self::from_jpeg(bytes, decoded, jpeg_components(bytes));
        }
        Err(CoreError::UnsupportedImageFormat)
    }

    /// Re-encode decoded pixels as zlib RGB plus an optional alpha mask
    fn from_pixels(format: SignatureFormat, decoded: DynamicImage) -> Result<Self, CoreError> {
        let (width, height) = decoded.dimensions();
        if width == 0 || height == 0 {
            return Err(CoreError::UnsupportedImageFormat);
        }

        let alpha = if decoded.color().has_alpha() {
            let rgba = decoded.to_rgba8();
            let channel: Vec<u8> = rgba.pixels().map(|p| p[3]).collect();
            Some(zlib(&channel)?)
        } else {
            None
        };

        let rgb = decoded.to_rgb8();
        Ok(Self {
            format,
            width,
            height,
            data: zlib(rgb.as_raw())?,
            filter: "FlateDecode",
            color_space: "DeviceRGB",
            alpha,
        })
    }

    /// Pass gray and RGB JPEG data through untouched
    ///
    /// Other layouts (CMYK, YCCK) go through the decoder's RGB conversion
    /// instead, since the decoded colour type no longer says what the DCT
    /// stream holds.
    fn from_jpeg(
        original: &[u8],
        decoded: DynamicImage,
        components: Option<u8>,
    ) -> Result<Self, CoreError> {
        let color_space = match components {
            Some(1) => "DeviceGray",
            Some(3) => "DeviceRGB",
            _ => return Self::from_pixels(SignatureFormat::Jpeg, decoded),
        };

        let (width, height) = decoded.dimensions();
        if width == 0 || height == 0 {
            return Err(CoreError::UnsupportedImageFormat);
        }

        Ok(Self {
            format: SignatureFormat::Jpeg,
            width,
            height,
            data: original.to_vec(),
            filter: "DCTDecode",
            color_space,
            alpha: None,
        })
    }

    pub fn has_alpha(&self) -> bool {
        self.alpha.is_some()
    }

    fn image_dict(&self, color_space: &str, filter: &str) -> Dictionary {
        let mut dict = Dictionary::new();
        dict.set("Type", Object::Name(b"XObject".to_vec()));
        dict.set("Subtype", Object::Name(b"Image".to_vec()));
        dict.set("Width", self.width as i64);
        dict.set("Height", self.height as i64);
        dict.set("ColorSpace", Object::Name(color_space.as_bytes().to_vec()));
        dict.set("BitsPerComponent", 8i64);
        dict.set("Filter", Object::Name(filter.as_bytes().to_vec()));
        dict
    }

    /// Add the image (and its soft mask) to `doc`, returning the XObject id
    pub fn embed(&self, doc: &mut lopdf::Document) -> lopdf::ObjectId {
        let mut dict = self.image_dict(self.color_space, self.filter);

        if let Some(alpha) = &self.alpha {
            let mask_dict = self.image_dict("DeviceGray", "FlateDecode");
            let mask_id = doc.add_object(Stream::new(mask_dict, alpha.clone()));
            dict.set("SMask", Object::Reference(mask_id));
        }

        // Data is already encoded; keep lopdf from compressing it a second time
        let stream = Stream::new(dict, self.data.clone()).with_compression(false);
        doc.add_object(stream)
    }
}

#[cfg(test)]
pub(crate) mod test_images {
    use image::{DynamicImage, ImageBuffer, ImageFormat, Luma, Rgb, Rgba};
    use std::io::Cursor;

    fn encode(image: DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut buf = Vec::new();
        image.write_to(&mut Cursor::new(&mut buf), format).unwrap();
        buf
    }

    /// Transparent signature-pad style PNG with a dark stroke
    pub fn png_rgba(width: u32, height: u32) -> Vec<u8> {
        let img = ImageBuffer::from_fn(width, height, |x, y| {
            if y == height / 2 || x == y {
                Rgba([10u8, 10, 40, 255])
            } else {
                Rgba([0u8, 0, 0, 0])
            }
        });
        encode(DynamicImage::ImageRgba8(img), ImageFormat::Png)
    }

    pub fn png_rgb(width: u32, height: u32) -> Vec<u8> {
        let img = ImageBuffer::from_pixel(width, height, Rgb([200u8, 200, 200]));
        encode(DynamicImage::ImageRgb8(img), ImageFormat::Png)
    }

    pub fn jpeg_rgb(width: u32, height: u32) -> Vec<u8> {
        let img = ImageBuffer::from_pixel(width, height, Rgb([30u8, 60, 90]));
        encode(DynamicImage::ImageRgb8(img), ImageFormat::Jpeg)
    }

    pub fn jpeg_gray(width: u32, height: u32) -> Vec<u8> {
        let img = ImageBuffer::from_pixel(width, height, Luma([90u8]));
        encode(DynamicImage::ImageLuma8(img), ImageFormat::Jpeg)
    }
}

#[cfg(test)]
mod tests {
    use super::test_images::*;
    use super::*;
    use lopdf::Document;

    #[test]
    fn test_decode_png_with_alpha() {
        let sig = SignatureImage::decode(&png_rgba(120, 40)).unwrap();
        assert_eq!(sig.format, SignatureFormat::Png);
        assert_eq!((sig.width, sig.height), (120, 40));
        assert!(sig.has_alpha());
    }

    #[test]
    fn test_decode_opaque_png_has_no_mask() {
        let sig = SignatureImage::decode(&png_rgb(30, 10)).unwrap();
        assert_eq!(sig.format, SignatureFormat::Png);
        assert!(!sig.has_alpha());
    }

    #[test]
    fn test_decode_falls_back_to_jpeg() {
        let bytes = jpeg_rgb(64, 32);
        let sig = SignatureImage::decode(&bytes).unwrap();
        assert_eq!(sig.format, SignatureFormat::Jpeg);
        assert_eq!((sig.width, sig.height), (64, 32));
        // JPEG data is embedded untouched
        assert_eq!(sig.data, bytes);
        assert_eq!(sig.color_space, "DeviceRGB");
    }

    #[test]
    fn test_grayscale_jpeg_uses_device_gray() {
        let sig = SignatureImage::decode(&jpeg_gray(16, 16)).unwrap();
        assert_eq!(sig.color_space, "DeviceGray");
    }

    #[test]
    fn test_jpeg_frame_components() {
        assert_eq!(jpeg_components(&jpeg_rgb(8, 8)), Some(3));
        assert_eq!(jpeg_components(&jpeg_gray(8, 8)), Some(1));
        assert_eq!(jpeg_components(&png_rgb(8, 8)), None);

        // SOI, a 4 byte APP0, then a baseline frame header with 4 components
        let cmyk_header = [
            0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x04, 0x00, 0x00, 0xFF, 0xC0, 0x00, 0x14, 0x08, 0x00,
            0x10, 0x00, 0x10, 0x04,
        ];
        assert_eq!(jpeg_components(&cmyk_header), Some(4));
    }

    #[test]
    fn test_four_component_jpeg_is_reencoded() {
        let bytes = jpeg_rgb(12, 6);
        let decoded = image::load_from_memory_with_format(&bytes, ImageFormat::Jpeg).unwrap();
        let sig = SignatureImage::from_jpeg(&bytes, decoded, Some(4)).unwrap();

        assert_eq!(sig.format, SignatureFormat::Jpeg);
        assert_eq!(sig.filter, "FlateDecode");
        assert_eq!(sig.color_space, "DeviceRGB");
        assert_ne!(sig.data, bytes);

        let mut doc = Document::with_version("1.7");
        let id = sig.embed(&mut doc);
        let stream = doc.get_object(id).unwrap().as_stream().unwrap();
        assert_eq!(
            stream.dict.get(b"Filter").unwrap().as_name().unwrap(),
            b"FlateDecode"
        );
    }

    #[test]
    fn test_unknown_bytes_rejected() {
        let result = SignatureImage::decode(b"GIF89a not really an image");
        assert!(matches!(result, Err(CoreError::UnsupportedImageFormat)));
    }

    #[test]
    fn test_embed_png_adds_smask() {
        let sig = SignatureImage::decode(&png_rgba(20, 10)).unwrap();
        let mut doc = Document::with_version("1.7");
        let id = sig.embed(&mut doc);

        let stream = doc.get_object(id).unwrap().as_stream().unwrap();
        assert_eq!(stream.dict.get(b"Subtype").unwrap().as_name().unwrap(), b"Image");
        assert_eq!(stream.dict.get(b"Width").unwrap().as_i64().unwrap(), 20);
        assert_eq!(
            stream.dict.get(b"Filter").unwrap().as_name().unwrap(),
            b"FlateDecode"
        );

        let mask_id = stream.dict.get(b"SMask").unwrap().as_reference().unwrap();
        let mask = doc.get_object(mask_id).unwrap().as_stream().unwrap();
        assert_eq!(
            mask.dict.get(b"ColorSpace").unwrap().as_name().unwrap(),
            b"DeviceGray"
        );
    }

    #[test]
    fn test_embed_jpeg_uses_dct() {
        let sig = SignatureImage::decode(&jpeg_rgb(8, 8)).unwrap();
        let mut doc = Document::with_version("1.7");
        let id = sig.embed(&mut doc);

        let stream = doc.get_object(id).unwrap().as_stream().unwrap();
        assert_eq!(
            stream.dict.get(b"Filter").unwrap().as_name().unwrap(),
            b"DCTDecode"
        );
        assert!(stream.dict.get(b"SMask").is_err());
    }

    #[test]
    fn test_payload_plain_base64() {
        let bytes = decode_signature_payload("aGVsbG8=").unwrap();
        assert_eq!(bytes, b"hello");
    }

    #[test]
    fn test_payload_data_url_prefix_stripped() {
        let bytes = decode_signature_payload("data:image/png;base64,aGVsbG8=").unwrap();
        assert_eq!(bytes, b"hello");
    }

    #[test]
    fn test_payload_with_line_breaks() {
        let bytes = decode_signature_payload("aGVs\nbG8=").unwrap();
        assert_eq!(bytes, b"hello");
    }

    #[test]
    fn test_payload_padding_optional() {
        assert_eq!(decode_signature_payload("aGVsbG8").unwrap(), b"hello");
        assert_eq!(
            decode_signature_payload("data:image/png;base64,aGk").unwrap(),
            b"hi"
        );
    }

    #[test]
    fn test_payload_url_safe_alphabet() {
        // 0xfb 0xff encodes to "+/8=" in the standard alphabet
        assert_eq!(decode_signature_payload("-_8").unwrap(), vec![0xfb, 0xff]);
        assert_eq!(decode_signature_payload("+/8=").unwrap(), vec![0xfb, 0xff]);
    }

    #[test]
    fn test_payload_invalid_base64() {
        let result = decode_signature_payload("data:image/png;base64,@@@");
        assert!(matches!(
            result,
            Err(CoreError::InvalidSignatureEncoding(_))
        ));
    }

    #[test]
    fn test_payload_empty_after_prefix() {
        let result = decode_signature_payload("data:image/png;base64,");
        assert!(matches!(
            result,
            Err(CoreError::InvalidSignatureEncoding(_))
        ));
    }
}
