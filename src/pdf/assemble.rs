//! Fragment assembly
//!
//! Builds the single output document by concatenating, in fixed order: the
//! cover page (if any), the copyright pages (if any), the reserved blank
//! summary pages, and every fiche's pages verbatim. The absolute 1-indexed
//! start page of each fiche is recorded as it is appended; everything
//! downstream (summary page numbers, header ownership) reads from that table.
//!
//! Object-id management follows the lopdf merge approach: each fragment is
//! renumbered past the accumulated `max_id`, its objects are moved into the
//! output document wholesale, and a flat page tree is built once at the end.
//! Pages are appended only, never reordered or deleted.

use std::ops::Range;

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

use crate::error::{Error, FragmentRef, Result};
use crate::layout::PageDimensions;
use crate::pdf::image::{CoverImage, COVER_RESOURCE};

/// Load one fragment's bytes as a PDF document.
///
/// Any parse failure (or a document without pages) aborts the whole request
/// with an error naming the offending fragment.
pub fn load_fragment(bytes: &[u8], fragment: FragmentRef) -> Result<Document> {
    let doc = Document::load_mem(bytes).map_err(|e| Error::FragmentDecode {
        fragment,
        reason: e.to_string(),
    })?;
    if doc.get_pages().is_empty() {
        return Err(Error::FragmentDecode {
            fragment,
            reason: "document has no pages".to_string(),
        });
    }
    Ok(doc)
}

/// The assembled page sequence, ready for summary fill and stamping
pub struct Assembled {
    pub document: Document,
    /// Page object ids in final page order
    pub pages: Vec<ObjectId>,
    /// 1-indexed start page per fiche, in input order
    pub fiche_start_pages: Vec<usize>,
    /// Zero-based index range of the reserved summary pages
    pub summary_pages: Range<usize>,
}

impl Assembled {
    pub fn total_pages(&self) -> usize {
        self.pages.len()
    }

    /// Pages before this index are front matter (cover, copyright, summary)
    /// and are never stamped.
    pub fn front_matter_len(&self) -> usize {
        self.summary_pages.end
    }

    /// Object ids of the reserved summary pages, in order
    pub fn summary_page_ids(&self) -> &[ObjectId] {
        &self.pages[self.summary_pages.clone()]
    }
}

/// Accumulates fragments into one document
pub struct Assembler {
    doc: Document,
    pages: Vec<ObjectId>,
    page_size: PageDimensions,
    fiche_start_pages: Vec<usize>,
    summary_pages: Range<usize>,
}

impl Assembler {
    pub fn new(page_size: PageDimensions) -> Self {
        Self {
            doc: Document::with_version("1.5"),
            pages: Vec::new(),
            page_size,
            fiche_start_pages: Vec::new(),
            summary_pages: 0..0,
        }
    }

    /// Append the cover as exactly one full-bleed generated page
    pub fn push_cover(&mut self, cover: &CoverImage) {
        let image_id = cover.add_to_document(&mut self.doc);
        let (w, h) = self.page_size.size_pt();
        let content = format!(
            "q\n{:.2} 0 0 {:.2} 0 0 cm\n/{} Do\nQ\n",
            w, h, COVER_RESOURCE
        );
        let content_id = self
            .doc
            .add_object(Stream::new(Dictionary::new(), content.into_bytes()));

        let mut xobjects = Dictionary::new();
        xobjects.set(COVER_RESOURCE, Object::Reference(image_id));
        let mut resources = Dictionary::new();
        resources.set("XObject", Object::Dictionary(xobjects));

        let page_id = self.generated_page(resources, Some(content_id));
        self.pages.push(page_id);
        log::debug!("assembler: cover page appended");
    }

    /// Append all copyright pages verbatim, preserving their order
    pub fn push_copyright(&mut self, src: Document) {
        let appended = self.append_fragment(src);
        log::debug!("assembler: {} copyright pages appended", appended);
    }

    /// Reserve `count` blank pages for the summary.
    ///
    /// Must run before the first fiche is appended: the reservation is a
    /// one-shot estimate, and growing it later would invalidate every start
    /// page already handed out.
    pub fn reserve_summary(&mut self, count: usize) {
        let start = self.pages.len();
        for _ in 0..count {
            let page_id = self.generated_page(Dictionary::new(), None);
            self.pages.push(page_id);
        }
        self.summary_pages = start..start + count;
        log::debug!("assembler: {} summary pages reserved", count);
    }

    /// Record the fiche's start page, then append its pages verbatim.
    /// Returns the recorded 1-indexed start page.
    pub fn push_fiche(&mut self, src: Document) -> usize {
        let start_page = self.pages.len() + 1;
        self.fiche_start_pages.push(start_page);
        self.append_fragment(src);
        start_page
    }

    /// Build the flat page tree and catalog over everything appended so far
    pub fn finish(mut self) -> Result<Assembled> {
        let pages_id = self.doc.new_object_id();

        let kids: Vec<Object> = self
            .pages
            .iter()
            .map(|&id| Object::Reference(id))
            .collect();

        let mut pages_object = Dictionary::new();
        pages_object.set("Type", Object::Name(b"Pages".to_vec()));
        pages_object.set("Count", Object::Integer(self.pages.len() as i64));
        pages_object.set("Kids", Object::Array(kids));

        let catalog_id = self.doc.new_object_id();
        let mut catalog = Dictionary::new();
        catalog.set("Type", Object::Name(b"Catalog".to_vec()));
        catalog.set("Pages", Object::Reference(pages_id));

        self.doc
            .objects
            .insert(catalog_id, Object::Dictionary(catalog));
        self.doc
            .objects
            .insert(pages_id, Object::Dictionary(pages_object));
        self.doc.trailer.set("Root", Object::Reference(catalog_id));

        // Reparent every page onto the new flat tree
        for &page_id in &self.pages {
            if let Ok(Object::Dictionary(ref mut dict)) = self.doc.get_object_mut(page_id) {
                dict.set("Parent", Object::Reference(pages_id));
            }
        }

        Ok(Assembled {
            document: self.doc,
            pages: self.pages,
            fiche_start_pages: self.fiche_start_pages,
            summary_pages: self.summary_pages,
        })
    }

    /// A blank page at the configured generated-page size
    fn generated_page(&mut self, resources: Dictionary, contents: Option<ObjectId>) -> ObjectId {
        let (w, h) = self.page_size.size_pt();
        let mut page = Dictionary::new();
        page.set("Type", Object::Name(b"Page".to_vec()));
        page.set(
            "MediaBox",
            Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(w),
                Object::Real(h),
            ]),
        );
        page.set("Resources", Object::Dictionary(resources));
        if let Some(content_id) = contents {
            page.set("Contents", Object::Reference(content_id));
        }
        self.doc.add_object(Object::Dictionary(page))
    }

    /// Move a fragment's objects into the output document and append its
    /// pages. Returns the number of pages appended.
    fn append_fragment(&mut self, mut src: Document) -> usize {
        // The flat tree built in finish() drops the fragment's intermediate
        // Pages nodes, so attributes inherited through them must be copied
        // onto each page first
        materialize_inherited_attributes(&mut src);

        src.renumber_objects_with(self.doc.max_id + 1);
        self.doc.max_id = src.max_id;

        let src_pages = src.get_pages();
        let appended = src_pages.len();
        self.pages.extend(src_pages.values().copied());
        self.doc.objects.extend(src.objects);
        appended
    }
}

/// Page-tree attributes a page may inherit from its ancestors
const INHERITABLE_KEYS: [&[u8]; 3] = [b"MediaBox", b"Resources", b"Rotate"];

/// Copy inherited attributes onto each page dictionary in place
fn materialize_inherited_attributes(doc: &mut Document) {
    let page_ids: Vec<ObjectId> = doc.get_pages().values().copied().collect();
    for page_id in page_ids {
        for key in INHERITABLE_KEYS {
            let present = doc
                .get_object(page_id)
                .ok()
                .and_then(|obj| obj.as_dict().ok())
                .map(|dict| dict.get(key).is_ok())
                .unwrap_or(true);
            if present {
                continue;
            }
            if let Some(value) = inherited_attribute(doc, page_id, key) {
                if let Ok(Object::Dictionary(ref mut dict)) = doc.get_object_mut(page_id) {
                    dict.set(key, value);
                }
            }
        }
    }
}

/// Walk the Parent chain looking for `key`
fn inherited_attribute(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<Object> {
    let mut current = page_id;
    // Parent chains are shallow; the bound guards against reference cycles
    for _ in 0..32 {
        let dict = doc.get_object(current).ok()?.as_dict().ok()?;
        if let Ok(value) = dict.get(key) {
            return Some(value.clone());
        }
        match dict.get(b"Parent") {
            Ok(Object::Reference(parent)) => current = *parent,
            _ => return None,
        }
    }
    None
}
