//! PDF metadata extraction

use std::path::Path;

use lopdf::{Document, Object};

use crate::error::{Error, Result};

/// Count pages by reading the Count field from the Pages dictionary.
/// More reliable than walking `get_pages()` for nested page trees.
fn count_pages_from_catalog(doc: &Document) -> Result<usize> {
    let catalog_ref = doc
        .trailer
        .get(b"Root")
        .map_err(|_| Error::Internal("no Root in trailer".to_string()))?;
    let catalog_id = match catalog_ref {
        Object::Reference(id) => *id,
        _ => return Err(Error::Internal("Root is not a reference".to_string())),
    };

    let catalog = doc.get_object(catalog_id)?.as_dict()?;
    let pages_id = match catalog.get(b"Pages") {
        Ok(Object::Reference(id)) => *id,
        _ => return Err(Error::Internal("no Pages reference in catalog".to_string())),
    };

    let pages = doc.get_object(pages_id)?.as_dict()?;
    match pages.get(b"Count") {
        Ok(Object::Integer(n)) => Ok(*n as usize),
        _ => Err(Error::Internal("no Count in Pages".to_string())),
    }
}

/// Document metadata, as shown by the `info` command
#[derive(Debug, Clone)]
pub struct PdfMetadata {
    /// Number of pages in the document
    pub page_count: usize,
    /// Document title (if present)
    pub title: Option<String>,
    /// Document author (if present)
    pub author: Option<String>,
}

/// Extract metadata from an in-memory document
pub fn document_metadata(doc: &Document) -> Result<PdfMetadata> {
    let page_count = count_pages_from_catalog(doc)?;

    let mut title = None;
    let mut author = None;
    if let Ok(Object::Reference(info_id)) = doc.trailer.get(b"Info") {
        if let Ok(Object::Dictionary(info)) = doc.get_object(*info_id) {
            if let Ok(value) = info.get(b"Title") {
                if let Ok(bytes) = value.as_str() {
                    title = String::from_utf8(bytes.to_vec()).ok();
                }
            }
            if let Ok(value) = info.get(b"Author") {
                if let Ok(bytes) = value.as_str() {
                    author = String::from_utf8(bytes.to_vec()).ok();
                }
            }
        }
    }

    Ok(PdfMetadata {
        page_count,
        title,
        author,
    })
}

/// Extract metadata from a PDF file
pub fn inspect_file(path: &Path) -> Result<PdfMetadata> {
    let doc = Document::load(path)?;
    document_metadata(&doc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inspect_nonexistent_file() {
        let result = inspect_file(Path::new("nonexistent.pdf"));
        assert!(result.is_err());
    }

    #[test]
    fn test_count_pages_needs_a_catalog() {
        let doc = Document::with_version("1.5");
        assert!(matches!(
            count_pages_from_catalog(&doc),
            Err(Error::Internal(_))
        ));
    }
}
