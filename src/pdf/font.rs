//! Font loading, text measurement, and PDF embedding
//!
//! All layout decisions in the summary and the header/footer stamp depend on
//! text width, so measurement and drawing must use the same face. This module
//! keeps them coupled: a [`BinderFont`] extracts a WinAnsi advance-width table
//! from the configured TrueType face at load time and that single table backs
//! both the width queries and the `/Widths` array of the embedded PDF font.
//! When the primary face cannot be loaded, a built-in Helvetica table is
//! substituted for both.

use std::fmt::Write as _;
use std::path::Path;

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

use crate::error::{Error, Result};

/// Name under which the binder font is registered in page resources.
///
/// Deliberately not `F1`: fiche pages arrive with their own font resources and
/// the stamp must not shadow them.
pub const FONT_RESOURCE: &str = "FB1";

/// Width measurement seam used by the summary planner.
///
/// The planner never draws, so a test can drive it with a stub that returns
/// fixed per-character widths.
pub trait TextMeasure {
    /// Rendered width of `text` at `size` points
    fn text_width(&self, text: &str, size: f32) -> f32;
}

/// Descriptor metrics of an embedded face, in 1000-units-per-em space
#[derive(Debug, Clone)]
struct FaceMetrics {
    ascent: i64,
    descent: i64,
    cap_height: i64,
    bbox: [i64; 4],
}

/// The single proportional face used for the summary and the stamp
#[derive(Debug, Clone)]
pub struct BinderFont {
    name: String,
    /// Advance widths for WinAnsi chars 32..=255, in 1000ths of the em square
    widths: Vec<u16>,
    /// TrueType data plus descriptor metrics; `None` means the built-in
    /// Helvetica fallback
    embedded: Option<(Vec<u8>, FaceMetrics)>,
}

impl BinderFont {
    /// Load a TrueType/OpenType face from a file
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)
            .map_err(|e| Error::Font(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_bytes(data)
    }

    /// Parse a face and extract its WinAnsi widths table
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        // The face borrows `data`; keep it scoped so the bytes can be moved
        // into the returned font afterwards
        let (name, widths, metrics) = {
            let face = rustybuzz::Face::from_slice(&data, 0).ok_or_else(|| {
                Error::Font("not a parsable TrueType/OpenType face".to_string())
            })?;

            let units = face.units_per_em() as f32;
            let to_milli = |v: f32| (v * 1000.0 / units).round() as i64;

            let widths: Vec<u16> = (32u8..=255)
                .map(|byte| {
                    face.glyph_index(winansi_to_char(byte))
                        .and_then(|gid| face.glyph_hor_advance(gid))
                        .map(|adv| (adv as f32 * 1000.0 / units).round() as u16)
                        .unwrap_or(0)
                })
                .collect();

            let name = face
                .names()
                .into_iter()
                .find(|n| n.name_id == rustybuzz::ttf_parser::name_id::FAMILY && n.is_unicode())
                .and_then(|n| n.to_string())
                .map(|family| family.replace(' ', ""))
                .unwrap_or_else(|| "EmbeddedFace".to_string());

            let bb = face.global_bounding_box();
            let metrics = FaceMetrics {
                ascent: to_milli(face.ascender() as f32),
                descent: to_milli(face.descender() as f32),
                cap_height: face
                    .capital_height()
                    .map(|h| to_milli(h as f32))
                    .unwrap_or(700),
                bbox: [
                    to_milli(bb.x_min as f32),
                    to_milli(bb.y_min as f32),
                    to_milli(bb.x_max as f32),
                    to_milli(bb.y_max as f32),
                ],
            };
            (name, widths, metrics)
        };

        Ok(Self {
            name,
            widths,
            embedded: Some((data, metrics)),
        })
    }

    /// Built-in Helvetica: one of the 14 standard PDF fonts, no embedding
    /// needed, approximate widths
    pub fn fallback() -> Self {
        Self {
            name: "Helvetica".to_string(),
            widths: helvetica_widths(),
            embedded: None,
        }
    }

    /// Load the configured face, substituting the fallback on any failure
    pub fn load_or_fallback(path: Option<&Path>) -> Self {
        match path {
            Some(p) => match Self::load(p) {
                Ok(font) => font,
                Err(e) => {
                    log::warn!("{} — substituting built-in Helvetica", e);
                    Self::fallback()
                }
            },
            None => Self::fallback(),
        }
    }

    /// Face name as it appears in the PDF
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register this font in `doc` and return its object id.
    ///
    /// The embedded variant writes a FontFile2 stream plus descriptor and a
    /// TrueType font dictionary with WinAnsiEncoding; the fallback writes a
    /// plain Type1 Helvetica dictionary.
    pub fn add_to_document(&self, doc: &mut Document) -> ObjectId {
        let Some((data, metrics)) = &self.embedded else {
            let mut font = Dictionary::new();
            font.set("Type", Object::Name(b"Font".to_vec()));
            font.set("Subtype", Object::Name(b"Type1".to_vec()));
            font.set("BaseFont", Object::Name(b"Helvetica".to_vec()));
            font.set("Encoding", Object::Name(b"WinAnsiEncoding".to_vec()));
            return doc.add_object(Object::Dictionary(font));
        };

        let mut stream_dict = Dictionary::new();
        stream_dict.set("Length1", Object::Integer(data.len() as i64));
        let font_stream = Stream {
            dict: stream_dict,
            content: data.clone(),
            allows_compression: true,
            start_position: None,
        };
        let font_stream_id = doc.add_object(Object::Stream(font_stream));

        let mut descriptor = Dictionary::new();
        descriptor.set("Type", Object::Name(b"FontDescriptor".to_vec()));
        descriptor.set("FontName", Object::Name(self.name.as_bytes().to_vec()));
        descriptor.set("Flags", Object::Integer(32)); // Nonsymbolic
        descriptor.set(
            "FontBBox",
            Object::Array(metrics.bbox.iter().map(|&v| Object::Integer(v)).collect()),
        );
        descriptor.set("ItalicAngle", Object::Integer(0));
        descriptor.set("Ascent", Object::Integer(metrics.ascent));
        descriptor.set("Descent", Object::Integer(metrics.descent));
        descriptor.set("CapHeight", Object::Integer(metrics.cap_height));
        descriptor.set("StemV", Object::Integer(80));
        descriptor.set("FontFile2", Object::Reference(font_stream_id));
        let descriptor_id = doc.add_object(Object::Dictionary(descriptor));

        // WinAnsiEncoding keeps text operators single-byte; the widths table
        // below is the same one text_width() measures with
        let mut font = Dictionary::new();
        font.set("Type", Object::Name(b"Font".to_vec()));
        font.set("Subtype", Object::Name(b"TrueType".to_vec()));
        font.set("BaseFont", Object::Name(self.name.as_bytes().to_vec()));
        font.set("Encoding", Object::Name(b"WinAnsiEncoding".to_vec()));
        font.set("FontDescriptor", Object::Reference(descriptor_id));
        font.set("FirstChar", Object::Integer(32));
        font.set("LastChar", Object::Integer(255));
        font.set(
            "Widths",
            Object::Array(
                self.widths
                    .iter()
                    .map(|&w| Object::Integer(w as i64))
                    .collect(),
            ),
        );

        doc.add_object(Object::Dictionary(font))
    }
}

impl TextMeasure for BinderFont {
    fn text_width(&self, text: &str, size: f32) -> f32 {
        let milli: f32 = text
            .chars()
            .map(|c| {
                let byte = char_to_winansi(c);
                if byte >= 32 {
                    self.widths[(byte - 32) as usize] as f32
                } else {
                    0.0
                }
            })
            .sum();
        milli * size / 1000.0
    }
}

/// Windows-1252 (WinAnsi) byte to Unicode char. Bytes 0x80-0x9F are remapped,
/// everything else maps directly.
fn winansi_to_char(byte: u8) -> char {
    match byte {
        0x80 => '\u{20AC}',
        0x82 => '\u{201A}',
        0x83 => '\u{0192}',
        0x84 => '\u{201E}',
        0x85 => '\u{2026}',
        0x86 => '\u{2020}',
        0x87 => '\u{2021}',
        0x88 => '\u{02C6}',
        0x89 => '\u{2030}',
        0x8A => '\u{0160}',
        0x8B => '\u{2039}',
        0x8C => '\u{0152}',
        0x8E => '\u{017D}',
        0x91 => '\u{2018}',
        0x92 => '\u{2019}',
        0x93 => '\u{201C}',
        0x94 => '\u{201D}',
        0x95 => '\u{2022}',
        0x96 => '\u{2013}',
        0x97 => '\u{2014}',
        0x98 => '\u{02DC}',
        0x99 => '\u{2122}',
        0x9A => '\u{0161}',
        0x9B => '\u{203A}',
        0x9C => '\u{0153}',
        0x9E => '\u{017E}',
        0x9F => '\u{0178}',
        _ => byte as char,
    }
}

/// Unicode char to its WinAnsi byte, or 0 if unmappable.
///
/// Unmappable characters are dropped when encoding and measured as zero
/// width, so measurement always matches what is drawn.
fn char_to_winansi(c: char) -> u8 {
    match c as u32 {
        0x0020..=0x007E => c as u8,
        0x00A0..=0x00FF => c as u8,
        0x20AC => 0x80,
        0x201A => 0x82,
        0x0192 => 0x83,
        0x201E => 0x84,
        0x2026 => 0x85,
        0x2020 => 0x86,
        0x2021 => 0x87,
        0x02C6 => 0x88,
        0x2030 => 0x89,
        0x0160 => 0x8A,
        0x2039 => 0x8B,
        0x0152 => 0x8C,
        0x017D => 0x8E,
        0x2018 => 0x91,
        0x2019 => 0x92,
        0x201C => 0x93,
        0x201D => 0x94,
        0x2022 => 0x95,
        0x2013 => 0x96,
        0x2014 => 0x97,
        0x02DC => 0x98,
        0x2122 => 0x99,
        0x0161 => 0x9A,
        0x203A => 0x9B,
        0x0153 => 0x9C,
        0x017E => 0x9E,
        0x0178 => 0x9F,
        _ => 0,
    }
}

/// Encode text as a PDF string literal: WinAnsi bytes with `\`, `(`, `)`
/// escaped and non-ASCII bytes written as octal escapes.
pub fn encode_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    for c in s.chars() {
        let byte = char_to_winansi(c);
        if byte < 32 {
            continue;
        }
        match byte {
            b'\\' => out.push_str("\\\\"),
            b'(' => out.push_str("\\("),
            b')' => out.push_str("\\)"),
            0x20..=0x7E => out.push(byte as char),
            _ => {
                let _ = write!(out, "\\{:03o}", byte);
            }
        }
    }
    out
}

/// Approximate Helvetica widths at 1000 units/em for WinAnsi chars 32..=255
fn helvetica_widths() -> Vec<u16> {
    (32u8..=255u8)
        .map(|b| match b {
            32 => 278,                          // space
            33..=47 => 333,                     // punctuation
            48..=57 => 556,                     // digits
            58..=64 => 333,                     // more punctuation
            73 | 74 => 278,                     // I J (narrow uppercase)
            77 => 833,                          // M (wide)
            65..=90 => 667,                     // uppercase A-Z (average)
            91..=96 => 333,                     // brackets etc.
            102 | 105 | 106 | 108 | 116 => 278, // narrow lowercase: f i j l t
            109 | 119 => 833,                   // m w (wide)
            97..=122 => 556,                    // lowercase a-z (average)
            _ => 556,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_measures_with_helvetica_table() {
        let font = BinderFont::fallback();
        // "00" = two digits at 556/1000 em
        let w = font.text_width("00", 10.0);
        assert!((w - 2.0 * 5.56).abs() < 1e-4);
        assert_eq!(font.name(), "Helvetica");
    }

    #[test]
    fn test_measurement_skips_unmappable_chars() {
        let font = BinderFont::fallback();
        let plain = font.text_width("ab", 10.0);
        // CJK is outside WinAnsi: dropped at encode time, zero width here
        let mixed = font.text_width("a\u{4E16}b", 10.0);
        assert!((plain - mixed).abs() < 1e-6);
        assert_eq!(encode_text("a\u{4E16}b"), "ab");
    }

    #[test]
    fn test_ellipsis_is_winansi() {
        assert_eq!(char_to_winansi('\u{2026}'), 0x85);
        assert_eq!(winansi_to_char(0x85), '\u{2026}');
        let font = BinderFont::fallback();
        assert!(font.text_width("\u{2026}", 10.0) > 0.0);
    }

    #[test]
    fn test_encode_text_escapes() {
        assert_eq!(encode_text(r"a\b"), r"a\\b");
        assert_eq!(encode_text("(x)"), r"\(x\)");
        // Non-ASCII WinAnsi bytes become octal escapes
        assert_eq!(encode_text("\u{2026}"), "\\205");
        assert_eq!(encode_text("é"), "\\351");
    }

    #[test]
    fn test_from_bytes_rejects_garbage() {
        let result = BinderFont::from_bytes(vec![0u8; 16]);
        assert!(matches!(result, Err(crate::error::Error::Font(_))));
    }
}
