//! Cover image decoding and embedding
//!
//! The cover arrives as raw PNG or JPEG bytes and becomes a single full-bleed
//! page. JPEG data passes straight through as a DCTDecode stream; PNG is
//! decoded and re-embedded as FlateDecode RGB, with a grayscale SMask when the
//! image carries alpha.

use std::io::Cursor;

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

use crate::error::{Error, FragmentRef, Result};

/// Name under which the cover XObject is registered on the cover page
pub const COVER_RESOURCE: &str = "FBcover";

#[derive(Debug)]
enum Encoding {
    /// Raw JPEG bytes, embedded as-is
    Jpeg(Vec<u8>),
    /// Zlib-compressed 8-bit RGB, plus optional zlib-compressed alpha channel
    Flate {
        rgb: Vec<u8>,
        alpha: Option<Vec<u8>>,
    },
}

/// A decoded cover image ready for embedding
#[derive(Debug)]
pub struct CoverImage {
    width: u32,
    height: u32,
    encoding: Encoding,
}

impl CoverImage {
    /// Decode cover bytes, sniffing PNG by its magic bytes and treating
    /// everything else as JPEG.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let fail = |reason: String| Error::FragmentDecode {
            fragment: FragmentRef::Cover,
            reason,
        };

        let is_png = bytes.len() > 1 && bytes[0] == 0x89 && bytes[1] == 0x50;
        if is_png {
            let decoded = image::ImageReader::with_format(
                Cursor::new(bytes),
                image::ImageFormat::Png,
            )
            .decode()
            .map_err(|e| fail(format!("not a decodable PNG: {}", e)))?;
            let rgba: image::RgbaImage = decoded.to_rgba8();
            let (width, height) = (rgba.width(), rgba.height());

            let rgb_data: Vec<u8> = rgba
                .pixels()
                .flat_map(|p| [p.0[0], p.0[1], p.0[2]])
                .collect();
            let rgb = miniz_oxide::deflate::compress_to_vec_zlib(&rgb_data, 6);

            let alpha = if rgba.pixels().any(|p| p.0[3] < 255) {
                let alpha_data: Vec<u8> = rgba.pixels().map(|p| p.0[3]).collect();
                Some(miniz_oxide::deflate::compress_to_vec_zlib(&alpha_data, 6))
            } else {
                None
            };

            Ok(Self {
                width,
                height,
                encoding: Encoding::Flate { rgb, alpha },
            })
        } else {
            let (width, height) =
                image::ImageReader::with_format(Cursor::new(bytes), image::ImageFormat::Jpeg)
                    .into_dimensions()
                    .map_err(|e| fail(format!("not a decodable JPEG: {}", e)))?;
            Ok(Self {
                width,
                height,
                encoding: Encoding::Jpeg(bytes.to_vec()),
            })
        }
    }

    /// Register the image XObject (and its SMask, if any) in `doc`
    pub fn add_to_document(&self, doc: &mut Document) -> ObjectId {
        let mut dict = Dictionary::new();
        dict.set("Type", Object::Name(b"XObject".to_vec()));
        dict.set("Subtype", Object::Name(b"Image".to_vec()));
        dict.set("Width", Object::Integer(self.width as i64));
        dict.set("Height", Object::Integer(self.height as i64));
        dict.set("BitsPerComponent", Object::Integer(8));

        let content = match &self.encoding {
            Encoding::Jpeg(data) => {
                dict.set("ColorSpace", Object::Name(b"DeviceRGB".to_vec()));
                dict.set("Filter", Object::Name(b"DCTDecode".to_vec()));
                data.clone()
            }
            Encoding::Flate { rgb, alpha } => {
                dict.set("ColorSpace", Object::Name(b"DeviceRGB".to_vec()));
                dict.set("Filter", Object::Name(b"FlateDecode".to_vec()));
                if let Some(alpha) = alpha {
                    let mut mask = Dictionary::new();
                    mask.set("Type", Object::Name(b"XObject".to_vec()));
                    mask.set("Subtype", Object::Name(b"Image".to_vec()));
                    mask.set("Width", Object::Integer(self.width as i64));
                    mask.set("Height", Object::Integer(self.height as i64));
                    mask.set("ColorSpace", Object::Name(b"DeviceGray".to_vec()));
                    mask.set("BitsPerComponent", Object::Integer(8));
                    mask.set("Filter", Object::Name(b"FlateDecode".to_vec()));
                    let mask_id = doc.add_object(Object::Stream(Stream {
                        dict: mask,
                        content: alpha.clone(),
                        allows_compression: false,
                        start_position: None,
                    }));
                    dict.set("SMask", Object::Reference(mask_id));
                }
                rgb.clone()
            }
        };

        doc.add_object(Object::Stream(Stream {
            dict,
            content,
            allows_compression: false,
            start_position: None,
        }))
    }
}
