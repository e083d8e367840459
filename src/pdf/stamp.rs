//! Header/footer stamping
//!
//! Second pass over the assembled document, run only once the total page
//! count is final: every page past the front matter gets a colored header
//! band (subject label left, owning fiche title centered) and a footer
//! (separator rule, page number, optional note). This pass only draws — no
//! page is added, removed, or reordered.
//!
//! Fiche pages arrive with arbitrary content streams; before the overlay is
//! appended, the existing content is bracketed in a `q`/`Q` pair so a
//! fragment's dangling coordinate transform cannot displace the stamp.

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

use crate::error::Result;
use crate::layout::{palette, BinderConfig, Rgb};
use crate::pdf::assemble::Assembled;
use crate::pdf::font::{encode_text, BinderFont, TextMeasure, FONT_RESOURCE};

/// Header band height in points
const BAND_HEIGHT: f32 = 36.0;
/// Header text baseline, measured from the page top
const HEADER_BASELINE_DROP: f32 = 24.0;
const HEADER_SIZE: f32 = 9.0;
/// Left/right margin of the header text and footer rule
const MARGIN: f32 = 20.0;
/// Footer rule height from the page bottom
const FOOTER_RULE_Y: f32 = 20.0;
/// Footer text baseline
const FOOTER_BASELINE: f32 = 7.0;
const FOOTER_SIZE: f32 = 8.0;

/// Resolve which fiche owns a 1-indexed page: the greatest start page at or
/// below it. Each fiche owns the contiguous range up to the next fiche's
/// start (or the end of the document).
pub fn owning_fiche(start_pages: &[usize], page_number: usize) -> Option<usize> {
    match start_pages.binary_search(&page_number) {
        Ok(index) => Some(index),
        Err(0) => None,
        Err(insertion) => Some(insertion - 1),
    }
}

/// Stamp headers and footers onto every non-front-matter page
pub fn stamp_pages(
    assembled: &mut Assembled,
    fiche_titles: &[String],
    subject: &str,
    font: &BinderFont,
    font_id: ObjectId,
    config: &BinderConfig,
) -> Result<()> {
    let total_pages = assembled.total_pages();
    let front_matter = assembled.front_matter_len();
    let start_pages = assembled.fiche_start_pages.clone();
    let page_ids: Vec<ObjectId> = assembled.pages[front_matter..].to_vec();
    let doc = &mut assembled.document;

    for (offset, page_id) in page_ids.into_iter().enumerate() {
        let page_number = front_matter + offset + 1;
        let (width, height) = page_size(doc, page_id, config);

        let mut ops = String::new();

        // Header band with the subject label
        ops.push_str(&format!(
            "{}\n0 {:.2} {:.2} {:.2} re\nf\n",
            palette::BAND.fill_op(),
            height - BAND_HEIGHT,
            width,
            BAND_HEIGHT
        ));
        let header_y = height - HEADER_BASELINE_DROP;
        ops.push_str(&text_op(MARGIN, header_y, HEADER_SIZE, palette::WHITE, subject));

        // Owning fiche title, centered in the band
        if let Some(index) = owning_fiche(&start_pages, page_number) {
            if let Some(title) = fiche_titles.get(index) {
                let title_width = font.text_width(title, HEADER_SIZE);
                ops.push_str(&text_op(
                    (width - title_width) / 2.0,
                    header_y,
                    HEADER_SIZE,
                    palette::WHITE,
                    title,
                ));
            }
        }

        // Footer: separator rule, then the page indicator right-aligned
        ops.push_str(&format!(
            "{}\n0.5 w\n{:.2} {:.2} m\n{:.2} {:.2} l\nS\n",
            palette::RULE.stroke_op(),
            MARGIN,
            FOOTER_RULE_Y,
            width - MARGIN,
            FOOTER_RULE_Y
        ));
        let page_text = if config.show_page_total {
            format!("Page {} of {}", page_number, total_pages)
        } else {
            page_number.to_string()
        };
        let page_text_width = font.text_width(&page_text, FOOTER_SIZE);
        ops.push_str(&text_op(
            width - MARGIN - page_text_width,
            FOOTER_BASELINE,
            FOOTER_SIZE,
            palette::GRAY,
            &page_text,
        ));
        if let Some(note) = &config.footer_note {
            let note_width = font.text_width(note, FOOTER_SIZE);
            ops.push_str(&text_op(
                (width - note_width) / 2.0,
                FOOTER_BASELINE,
                FOOTER_SIZE,
                palette::GRAY,
                note,
            ));
        }

        isolate_page_content(doc, page_id)?;
        let overlay_id = doc.add_object(Stream::new(Dictionary::new(), ops.into_bytes()));
        append_content_to_page(doc, page_id, overlay_id)?;
        add_font_to_page_resources(doc, page_id, font_id)?;
    }

    log::debug!(
        "stamped {} pages ({} front matter pages skipped)",
        total_pages - front_matter,
        front_matter
    );
    Ok(())
}

fn text_op(x: f32, y: f32, size: f32, color: Rgb, text: &str) -> String {
    format!(
        "BT\n{}\n/{} {} Tf\n1 0 0 1 {:.2} {:.2} Tm\n({}) Tj\nET\n",
        color.fill_op(),
        FONT_RESOURCE,
        size,
        x,
        y,
        encode_text(text)
    )
}

fn as_number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(v) => Some(*v as f32),
        Object::Real(v) => Some(*v),
        _ => None,
    }
}

/// Width and height from the page's MediaBox; copied pages keep their own
/// size, so this must be read per page. Falls back to the configured
/// generated-page size when the box is unreadable.
fn page_size(doc: &Document, page_id: ObjectId, config: &BinderConfig) -> (f32, f32) {
    let from_box = || -> Option<(f32, f32)> {
        let dict = doc.get_object(page_id).ok()?.as_dict().ok()?;
        let media_box = match dict.get(b"MediaBox").ok()? {
            Object::Array(values) => values.clone(),
            Object::Reference(id) => match doc.get_object(*id).ok()? {
                Object::Array(values) => values.clone(),
                _ => return None,
            },
            _ => return None,
        };
        if media_box.len() != 4 {
            return None;
        }
        let x0 = as_number(&media_box[0])?;
        let y0 = as_number(&media_box[1])?;
        let x1 = as_number(&media_box[2])?;
        let y1 = as_number(&media_box[3])?;
        Some((x1 - x0, y1 - y0))
    };
    from_box().unwrap_or_else(|| config.page.size_pt())
}

/// Bracket the page's existing content in a `q`/`Q` guard pair so its
/// graphics state cannot leak into streams appended afterwards.
fn isolate_page_content(doc: &mut Document, page_id: ObjectId) -> Result<()> {
    let contents = {
        let dict = doc.get_object(page_id)?.as_dict()?;
        dict.get(b"Contents").ok().cloned()
    };
    let existing = match contents {
        Some(Object::Reference(id)) => vec![Object::Reference(id)],
        Some(Object::Array(array)) => array,
        _ => return Ok(()),
    };

    let save_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    let restore_id = doc.add_object(Stream::new(Dictionary::new(), b"Q\n".to_vec()));

    let mut guarded = Vec::with_capacity(existing.len() + 2);
    guarded.push(Object::Reference(save_id));
    guarded.extend(existing);
    guarded.push(Object::Reference(restore_id));

    if let Ok(Object::Dictionary(ref mut dict)) = doc.get_object_mut(page_id) {
        dict.set("Contents", Object::Array(guarded));
    }
    Ok(())
}

/// Append a content stream after the page's existing content so the overlay
/// draws on top
fn append_content_to_page(doc: &mut Document, page_id: ObjectId, content_id: ObjectId) -> Result<()> {
    let page = doc.get_object_mut(page_id)?;
    if let Object::Dictionary(ref mut dict) = page {
        let existing = dict.get(b"Contents").ok().cloned();
        match existing {
            Some(Object::Reference(id)) => {
                dict.set(
                    "Contents",
                    Object::Array(vec![
                        Object::Reference(id),
                        Object::Reference(content_id),
                    ]),
                );
            }
            Some(Object::Array(mut array)) => {
                array.push(Object::Reference(content_id));
                dict.set("Contents", Object::Array(array));
            }
            _ => {
                dict.set("Contents", Object::Array(vec![Object::Reference(content_id)]));
            }
        }
    }
    Ok(())
}

/// Register the binder font in the page's resources.
///
/// Resources (and their Font subdictionary) may be indirect and shared
/// between pages; both are resolved and written back as a direct copy so
/// other pages are unaffected.
pub(crate) fn add_font_to_page_resources(
    doc: &mut Document,
    page_id: ObjectId,
    font_id: ObjectId,
) -> Result<()> {
    let resolve = |doc: &Document, object: &Object| -> Dictionary {
        match object {
            Object::Dictionary(dict) => dict.clone(),
            Object::Reference(id) => doc
                .get_object(*id)
                .ok()
                .and_then(|o| o.as_dict().ok())
                .cloned()
                .unwrap_or_else(Dictionary::new),
            _ => Dictionary::new(),
        }
    };

    let (mut resources, mut fonts) = {
        let dict = doc.get_object(page_id)?.as_dict()?;
        let resources = dict
            .get(b"Resources")
            .map(|object| resolve(doc, object))
            .unwrap_or_else(|_| Dictionary::new());
        let fonts = resources
            .get(b"Font")
            .map(|object| resolve(doc, object))
            .unwrap_or_else(|_| Dictionary::new());
        (resources, fonts)
    };

    fonts.set(FONT_RESOURCE, Object::Reference(font_id));
    resources.set("Font", Object::Dictionary(fonts));

    if let Ok(Object::Dictionary(ref mut dict)) = doc.get_object_mut(page_id) {
        dict.set("Resources", Object::Dictionary(resources));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owning_fiche_boundaries() {
        let starts = vec![4, 5, 8];
        // Exact start pages resolve to their own fiche
        assert_eq!(owning_fiche(&starts, 4), Some(0));
        assert_eq!(owning_fiche(&starts, 5), Some(1));
        assert_eq!(owning_fiche(&starts, 8), Some(2));
        // Interior pages belong to the fiche whose range covers them
        assert_eq!(owning_fiche(&starts, 6), Some(1));
        assert_eq!(owning_fiche(&starts, 7), Some(1));
        // Everything past the last start belongs to the last fiche
        assert_eq!(owning_fiche(&starts, 9), Some(2));
        assert_eq!(owning_fiche(&starts, 100), Some(2));
        // Front matter resolves to nothing
        assert_eq!(owning_fiche(&starts, 1), None);
        assert_eq!(owning_fiche(&starts, 3), None);
    }

    #[test]
    fn test_owning_fiche_single() {
        assert_eq!(owning_fiche(&[2], 2), Some(0));
        assert_eq!(owning_fiche(&[2], 5), Some(0));
        assert_eq!(owning_fiche(&[2], 1), None);
        assert_eq!(owning_fiche(&[], 1), None);
    }

    #[test]
    fn test_as_number() {
        assert_eq!(as_number(&Object::Integer(612)), Some(612.0));
        assert_eq!(as_number(&Object::Real(595.28)), Some(595.28));
        assert_eq!(as_number(&Object::Null), None);
    }
}
