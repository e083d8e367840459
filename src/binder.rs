//! Binder orchestration
//!
//! The full pipeline for one request: validate, decode every fragment,
//! assemble the page sequence (which resolves the fiche start pages), lay out
//! and draw the summary against those start pages, stamp headers/footers over
//! the final page count, then serialize. The strict ordering matters: summary
//! references and footer numbering both depend on the final per-fiche offsets
//! and total, which exist only once every page has been appended.
//!
//! Any failure aborts before serialization; a partially stamped or partially
//! summarized document is never returned.

use lopdf::ObjectId;

use crate::error::{Error, FragmentRef, Result};
use crate::layout::{BinderConfig, OverflowPolicy};
use crate::pdf::{
    draw_summary, load_fragment, plan_summary, stamp_pages, Assembler, BinderFont, CoverImage,
    SummaryItem,
};
use crate::request::{decode_base64, BinderRequest};

/// Result of a successful build
#[derive(Debug)]
pub struct BinderOutput {
    /// Serialized PDF bytes
    pub pdf: Vec<u8>,
    pub total_pages: usize,
    pub fiches_count: usize,
}

/// Build one binder. Stateless: everything is scoped to this call and
/// discarded afterwards.
pub fn bind(request: &BinderRequest, config: &BinderConfig) -> Result<BinderOutput> {
    request.validate()?;

    // Decode every fragment up front so a bad payload fails the request
    // before any assembly work
    let cover = request
        .cover
        .as_deref()
        .map(|payload| {
            let bytes = decode_base64(payload, FragmentRef::Cover)?;
            CoverImage::decode(&bytes)
        })
        .transpose()?;

    let copyright = request
        .copyright
        .as_deref()
        .map(|payload| {
            let bytes = decode_base64(payload, FragmentRef::Copyright)?;
            load_fragment(&bytes, FragmentRef::Copyright)
        })
        .transpose()?;

    let mut fiche_docs = Vec::with_capacity(request.fiches.len());
    for (index, fiche) in request.fiches.iter().enumerate() {
        let bytes = decode_base64(&fiche.pdf, FragmentRef::Fiche(index))?;
        fiche_docs.push(load_fragment(&bytes, FragmentRef::Fiche(index))?);
    }

    let font = BinderFont::load_or_fallback(config.font_path.as_deref());
    log::debug!("binder: drawing with face {}", font.name());

    // Fixed fragment order: cover, copyright, reserved summary, fiches
    let mut assembler = Assembler::new(config.page);
    if let Some(cover) = &cover {
        assembler.push_cover(cover);
    }
    if let Some(copyright) = copyright {
        assembler.push_copyright(copyright);
    }
    assembler.reserve_summary(config.summary_page_count(request.fiches.len()));
    for doc in fiche_docs {
        assembler.push_fiche(doc);
    }
    let mut assembled = assembler.finish()?;
    debug_assert!(assembled
        .fiche_start_pages
        .windows(2)
        .all(|pair| pair[0] < pair[1]));

    // Summary layout against the resolved start pages
    let items: Vec<SummaryItem> = request
        .fiches
        .iter()
        .zip(&assembled.fiche_start_pages)
        .map(|(fiche, &start_page)| SummaryItem {
            title: fiche.title.clone(),
            theme: fiche.normalized_theme(),
            start_page,
        })
        .collect();
    let plan = plan_summary(&items, config, &font);
    if plan.dropped > 0 {
        match config.overflow {
            OverflowPolicy::Reject => {
                return Err(Error::SummaryOverflow {
                    dropped: plan.dropped,
                })
            }
            OverflowPolicy::Truncate => log::warn!(
                "summary full: {} of {} entries not listed (their pages are still bound and stamped)",
                plan.dropped,
                items.len()
            ),
        }
    }

    let font_id = font.add_to_document(&mut assembled.document);
    let summary_ids: Vec<ObjectId> = assembled.summary_page_ids().to_vec();
    draw_summary(&mut assembled.document, &summary_ids, &plan, font_id)?;

    // Stamping runs last, over the final page count
    let titles: Vec<String> = request
        .fiches
        .iter()
        .map(|fiche| fiche.title.clone())
        .collect();
    stamp_pages(
        &mut assembled,
        &titles,
        &request.subject_label,
        &font,
        font_id,
        config,
    )?;

    let total_pages = assembled.total_pages();
    let mut doc = assembled.document;
    doc.compress();
    let mut pdf = Vec::new();
    doc.save_to(&mut pdf)?;

    log::info!(
        "bound {} fiches into {} pages ({} bytes)",
        request.fiches.len(),
        total_pages,
        pdf.len()
    );
    Ok(BinderOutput {
        pdf,
        total_pages,
        fiches_count: request.fiches.len(),
    })
}
