//! Request and response payloads
//!
//! The transport-agnostic shapes a wrapper (HTTP handler, queue worker, CLI)
//! exchanges with the core: base64 fragment payloads in, a base64 PDF plus
//! page counts out. Field names are camelCase on the wire.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::error::{Error, FragmentRef, Result};

/// One fiche in the request: title, optional theme, base64 PDF bytes
#[derive(Debug, Clone, Deserialize)]
pub struct FicheRequest {
    pub title: String,
    #[serde(default)]
    pub theme: Option<String>,
    pub pdf: String,
}

impl FicheRequest {
    /// Theme with empty/whitespace values collapsed to `None` (ungrouped)
    pub fn normalized_theme(&self) -> Option<String> {
        self.theme
            .as_deref()
            .map(str::trim)
            .filter(|theme| !theme.is_empty())
            .map(str::to_string)
    }
}

/// A binder build request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinderRequest {
    /// Subject/context label drawn on the left of every header band
    pub subject_label: String,
    /// Optional cover image (base64 PNG or JPEG bytes)
    #[serde(default)]
    pub cover: Option<String>,
    /// Optional copyright document (base64 PDF bytes)
    #[serde(default)]
    pub copyright: Option<String>,
    pub fiches: Vec<FicheRequest>,
}

impl BinderRequest {
    /// Reject requests no computation should be attempted for
    pub fn validate(&self) -> Result<()> {
        if self.subject_label.trim().is_empty() {
            return Err(Error::InvalidRequest(
                "subjectLabel must not be empty".to_string(),
            ));
        }
        if self.fiches.is_empty() {
            return Err(Error::InvalidRequest(
                "at least one fiche is required".to_string(),
            ));
        }
        Ok(())
    }
}

/// Successful build response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BinderResponse {
    /// The assembled binder, base64-encoded
    pub pdf: String,
    pub total_pages: usize,
    pub fiches_count: usize,
}

impl BinderResponse {
    pub fn new(pdf: &[u8], total_pages: usize, fiches_count: usize) -> Self {
        Self {
            pdf: BASE64.encode(pdf),
            total_pages,
            fiches_count,
        }
    }
}

/// Decode one fragment's base64 payload, naming the fragment on failure
pub(crate) fn decode_base64(payload: &str, fragment: FragmentRef) -> Result<Vec<u8>> {
    BASE64
        .decode(payload.trim())
        .map_err(|e| Error::FragmentDecode {
            fragment,
            reason: format!("invalid base64: {}", e),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_parses_camel_case() {
        let json = r#"{
            "subjectLabel": "Droit des obligations",
            "fiches": [
                { "title": "La formation du contrat", "theme": "Contrats", "pdf": "AAAA" },
                { "title": "La nullité", "pdf": "BBBB" }
            ]
        }"#;
        let request: BinderRequest = serde_json::from_str(json).expect("parse");
        assert_eq!(request.subject_label, "Droit des obligations");
        assert!(request.cover.is_none());
        assert!(request.copyright.is_none());
        assert_eq!(request.fiches.len(), 2);
        assert_eq!(request.fiches[1].theme, None);
    }

    #[test]
    fn test_validate_rejects_empty_fiche_list() {
        let request = BinderRequest {
            subject_label: "Droit".to_string(),
            cover: None,
            copyright: None,
            fiches: vec![],
        };
        let err = request.validate().unwrap_err();
        assert!(err.is_invalid_input());
        assert!(matches!(err, Error::InvalidRequest(_)));
    }

    #[test]
    fn test_validate_rejects_blank_subject() {
        let request = BinderRequest {
            subject_label: "  ".to_string(),
            cover: None,
            copyright: None,
            fiches: vec![FicheRequest {
                title: "t".to_string(),
                theme: None,
                pdf: "AAAA".to_string(),
            }],
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_normalized_theme() {
        let fiche = |theme: Option<&str>| FicheRequest {
            title: "t".to_string(),
            theme: theme.map(str::to_string),
            pdf: String::new(),
        };
        assert_eq!(fiche(None).normalized_theme(), None);
        assert_eq!(fiche(Some("")).normalized_theme(), None);
        assert_eq!(fiche(Some("  ")).normalized_theme(), None);
        assert_eq!(
            fiche(Some(" Contrats ")).normalized_theme(),
            Some("Contrats".to_string())
        );
    }

    #[test]
    fn test_decode_base64_names_the_fragment() {
        let err = decode_base64("not-base64!!!", FragmentRef::Fiche(1)).unwrap_err();
        match err {
            Error::FragmentDecode { fragment, reason } => {
                assert_eq!(fragment, FragmentRef::Fiche(1));
                assert!(reason.contains("base64"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_response_encodes_pdf() {
        let response = BinderResponse::new(b"%PDF", 7, 3);
        assert_eq!(response.pdf, BASE64.encode(b"%PDF"));
        assert_eq!(response.total_pages, 7);
        let json = serde_json::to_value(&response).expect("serialize");
        assert!(json.get("totalPages").is_some());
        assert!(json.get("fichesCount").is_some());
    }
}
