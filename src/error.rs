//! Error types for the fiche binder library

use std::fmt;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Identifies which input fragment a decode failure refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentRef {
    Cover,
    Copyright,
    /// Zero-based index into the request's fiche list
    Fiche(usize),
}

impl fmt::Display for FragmentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FragmentRef::Cover => write!(f, "cover"),
            FragmentRef::Copyright => write!(f, "copyright"),
            FragmentRef::Fiche(i) => write!(f, "fiche #{}", i + 1),
        }
    }
}

/// Main error type for the fiche binder library
#[derive(Error, Debug)]
pub enum Error {
    /// Request rejected before any assembly was attempted
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A fragment payload could not be decoded into a document or image
    #[error("cannot decode {fragment}: {reason}")]
    FragmentDecode {
        fragment: FragmentRef,
        reason: String,
    },

    /// Summary entries exceeded the reserved pages under the strict policy
    #[error("summary overflow: {dropped} entries do not fit on the reserved pages")]
    SummaryOverflow { dropped: usize },

    /// PDF processing error
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Font error
    #[error("font error: {0}")]
    Font(String),

    /// Unexpected failure during assembly, layout, or serialization
    #[error("{0}")]
    Internal(String),
}

impl Error {
    /// Whether this failure is the caller's fault (bad request payload) rather
    /// than an internal one. Transports map this to their 4xx/5xx split.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            Error::InvalidRequest(_) | Error::FragmentDecode { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fragment_ref_display() {
        assert_eq!(FragmentRef::Cover.to_string(), "cover");
        assert_eq!(FragmentRef::Copyright.to_string(), "copyright");
        assert_eq!(FragmentRef::Fiche(2).to_string(), "fiche #3");
    }

    #[test]
    fn test_invalid_input_split() {
        assert!(Error::InvalidRequest("empty".into()).is_invalid_input());
        assert!(Error::FragmentDecode {
            fragment: FragmentRef::Fiche(0),
            reason: "bad base64".into(),
        }
        .is_invalid_input());
        assert!(!Error::Internal("boom".into()).is_invalid_input());
        assert!(!Error::SummaryOverflow { dropped: 3 }.is_invalid_input());
    }
}
