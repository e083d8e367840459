//! Integration tests for the fiche binder library
//!
//! Fixtures are tiny PDFs generated with lopdf, fed through the full
//! pipeline as base64 request payloads.

use std::io::Cursor;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use lopdf::{Dictionary, Document, Object, Stream};
use tempfile::TempDir;

use fiche_binder::{
    bind, BinderConfig, BinderRequest, Error, FicheRequest, FragmentRef, OverflowPolicy,
};

/// A minimal valid PDF with `page_count` US-Letter pages
fn sample_pdf_bytes(page_count: usize) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let kids: Vec<Object> = (0..page_count)
        .map(|i| {
            let content = Stream::new(
                Dictionary::new(),
                format!("BT (page {}) Tj ET", i).into_bytes(),
            );
            let content_id = doc.add_object(content);
            let mut page = Dictionary::new();
            page.set("Type", Object::Name(b"Page".to_vec()));
            page.set("Parent", Object::Reference(pages_id));
            page.set(
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(612),
                    Object::Integer(792),
                ]),
            );
            page.set("Contents", Object::Reference(content_id));
            Object::Reference(doc.add_object(Object::Dictionary(page)))
        })
        .collect();

    let mut pages = Dictionary::new();
    pages.set("Type", Object::Name(b"Pages".to_vec()));
    pages.set("Count", Object::Integer(page_count as i64));
    pages.set("Kids", Object::Array(kids));
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference(pages_id));
    let catalog_id = doc.add_object(Object::Dictionary(catalog));
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("serialize fixture");
    bytes
}

fn fiche(title: &str, theme: Option<&str>, page_count: usize) -> FicheRequest {
    FicheRequest {
        title: title.to_string(),
        theme: theme.map(str::to_string),
        pdf: BASE64.encode(sample_pdf_bytes(page_count)),
    }
}

fn request(fiches: Vec<FicheRequest>) -> BinderRequest {
    BinderRequest {
        subject_label: "Droit des obligations".to_string(),
        cover: None,
        copyright: None,
        fiches,
    }
}

fn cover_png() -> String {
    let img = image::RgbaImage::from_pixel(4, 4, image::Rgba([12, 150, 120, 255]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png)
        .expect("encode cover");
    BASE64.encode(out.into_inner())
}

#[test]
fn test_single_fiche_page_arithmetic() {
    // 1 fiche, no cover, no copyright: one reserved summary page plus the
    // fiche's own pages; the fiche starts right after the summary
    let result = bind(
        &request(vec![fiche("Introduction", None, 3)]),
        &BinderConfig::default(),
    )
    .expect("bind");

    assert_eq!(result.total_pages, 1 + 3);
    assert_eq!(result.fiches_count, 1);

    let doc = Document::load_mem(&result.pdf).expect("reload output");
    assert_eq!(doc.get_pages().len(), 4);
}

#[test]
fn test_total_pages_with_all_fragments() {
    let mut req = request(vec![
        fiche("La formation du contrat", Some("Contrats"), 2),
        fiche("La nullité", Some("Contrats"), 1),
        fiche("La responsabilité délictuelle", Some("Responsabilité"), 4),
    ]);
    req.cover = Some(cover_png());
    req.copyright = Some(BASE64.encode(sample_pdf_bytes(2)));

    let result = bind(&req, &BinderConfig::default()).expect("bind");

    // cover(1) + copyright(2) + summary(1) + fiches(2+1+4)
    assert_eq!(result.total_pages, 1 + 2 + 1 + 7);

    let doc = Document::load_mem(&result.pdf).expect("reload output");
    assert_eq!(doc.get_pages().len(), result.total_pages);
}

#[test]
fn test_thirty_fiches_reserve_two_summary_pages() {
    let fiches: Vec<FicheRequest> = (0..30)
        .map(|i| {
            let theme = if i < 15 { "Thème A" } else { "Thème B" };
            fiche(&format!("Fiche {}", i + 1), Some(theme), 1)
        })
        .collect();

    let result = bind(&request(fiches), &BinderConfig::default()).expect("bind");

    // ceil(30 / 25) = 2 reserved summary pages
    assert_eq!(result.total_pages, 2 + 30);
}

#[test]
fn test_empty_fiche_list_is_invalid() {
    let err = bind(&request(vec![]), &BinderConfig::default()).unwrap_err();
    assert!(matches!(err, Error::InvalidRequest(_)));
    assert!(err.is_invalid_input());
}

#[test]
fn test_malformed_base64_names_the_fiche() {
    let mut fiches = vec![fiche("ok", None, 1), fiche("broken", None, 1)];
    fiches[1].pdf = "%%%not-base64%%%".to_string();

    let err = bind(&request(fiches), &BinderConfig::default()).unwrap_err();
    match err {
        Error::FragmentDecode { fragment, .. } => {
            assert_eq!(fragment, FragmentRef::Fiche(1));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_undecodable_fiche_pdf_names_the_fiche() {
    let mut fiches = vec![fiche("ok", None, 1)];
    fiches.push(FicheRequest {
        title: "broken".to_string(),
        theme: None,
        pdf: BASE64.encode(b"this is not a pdf"),
    });

    let err = bind(&request(fiches), &BinderConfig::default()).unwrap_err();
    match err {
        Error::FragmentDecode { fragment, .. } => {
            assert_eq!(fragment, FragmentRef::Fiche(1));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_bad_copyright_aborts_everything() {
    let mut req = request(vec![fiche("ok", None, 1)]);
    req.copyright = Some(BASE64.encode(b"garbage"));

    let err = bind(&req, &BinderConfig::default()).unwrap_err();
    match err {
        Error::FragmentDecode { fragment, .. } => {
            assert_eq!(fragment, FragmentRef::Copyright);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_strict_policy_rejects_summary_overflow() {
    // A generous per-page estimate reserves a single summary page; forty
    // entries cannot fit on it
    let fiches: Vec<FicheRequest> = (0..40)
        .map(|i| fiche(&format!("Fiche {}", i + 1), None, 1))
        .collect();

    let strict = BinderConfig {
        entries_per_summary_page: 1000,
        overflow: OverflowPolicy::Reject,
        ..BinderConfig::default()
    };
    let err = bind(&request(fiches.clone()), &strict).unwrap_err();
    assert!(matches!(err, Error::SummaryOverflow { dropped } if dropped > 0));

    // The default policy binds the same request: surplus entries are simply
    // not listed, their pages still exist
    let lenient = BinderConfig {
        entries_per_summary_page: 1000,
        ..BinderConfig::default()
    };
    let result = bind(&request(fiches), &lenient).expect("bind");
    assert_eq!(result.total_pages, 1 + 40);
}

#[test]
fn test_output_is_loadable_from_disk() {
    let temp_dir = TempDir::new().expect("temp dir");
    let output_path = temp_dir.path().join("binder.pdf");

    let result = bind(
        &request(vec![
            fiche("Première fiche", Some("Thème"), 1),
            fiche("Deuxième fiche", Some("Thème"), 2),
        ]),
        &BinderConfig::default(),
    )
    .expect("bind");

    std::fs::write(&output_path, &result.pdf).expect("write output");
    let doc = Document::load(&output_path).expect("reload from disk");
    assert_eq!(doc.get_pages().len(), result.total_pages);
}

#[test]
fn test_fiche_pages_keep_their_size_and_get_stamped() {
    let result = bind(
        &request(vec![fiche("Une fiche", None, 1)]),
        &BinderConfig::default(),
    )
    .expect("bind");

    let doc = Document::load_mem(&result.pdf).expect("reload output");
    let pages: Vec<_> = doc.get_pages().into_values().collect();

    // Page 1 is the generated A4 summary, page 2 the copied Letter fiche
    let media_box = |id| {
        let dict = doc.get_object(id).unwrap().as_dict().unwrap();
        match dict.get(b"MediaBox").unwrap() {
            Object::Array(values) => values.clone(),
            other => panic!("unexpected MediaBox: {other:?}"),
        }
    };
    let width_of = |values: &[Object]| match &values[2] {
        Object::Real(v) => *v,
        Object::Integer(v) => *v as f32,
        _ => panic!("bad width"),
    };
    let summary_width = width_of(&media_box(pages[0]));
    assert!((summary_width - 595.28).abs() < 0.01);
    let fiche_width = width_of(&media_box(pages[1]));
    assert!((fiche_width - 612.0).abs() < 0.01);

    // The fiche page carries the stamp overlay: its content is now an array
    // (guard, original, overlay) and its resources hold the binder font
    let fiche_dict = doc.get_object(pages[1]).unwrap().as_dict().unwrap();
    match fiche_dict.get(b"Contents").unwrap() {
        Object::Array(streams) => assert!(streams.len() >= 3),
        other => panic!("expected stamped content array, got {other:?}"),
    }
    let resources = fiche_dict.get(b"Resources").unwrap().as_dict().unwrap();
    let fonts = resources.get(b"Font").unwrap().as_dict().unwrap();
    assert!(fonts.get(b"FB1").is_ok());

    // The summary page is front matter: no stamp, single content stream
    let summary_dict = doc.get_object(pages[0]).unwrap().as_dict().unwrap();
    assert!(matches!(
        summary_dict.get(b"Contents").unwrap(),
        Object::Reference(_)
    ));
}
