//! Fiche Binder Library
//!
//! Assembles a set of fiche study-card PDFs into a single binder document.
//! This library provides functionality to:
//! - Concatenate cover, copyright, and fiche fragments into one page sequence
//! - Compute each fiche's start page in a single pre-pass
//! - Lay out and draw a summary (table of contents) with theme grouping,
//!   truncated titles, and dotted leaders
//! - Stamp running headers and footers over the final page sequence
//!
//! # Example
//!
//! ```no_run
//! use fiche_binder::{bind, BinderConfig, BinderRequest};
//!
//! let request: BinderRequest = serde_json::from_str(r#"{
//!     "subjectLabel": "Droit des obligations",
//!     "fiches": [
//!         { "title": "La formation du contrat", "theme": "Contrats", "pdf": "..." }
//!     ]
//! }"#).expect("parse request");
//!
//! let output = bind(&request, &BinderConfig::default()).expect("bind");
//! std::fs::write("binder.pdf", &output.pdf).expect("write");
//! ```

pub mod binder;
pub mod error;
pub mod layout;
pub mod pdf;
pub mod request;

// Re-export commonly used items
pub use binder::{bind, BinderOutput};
pub use error::{Error, FragmentRef, Result};
pub use layout::{BinderConfig, OverflowPolicy, PageDimensions};
pub use request::{BinderRequest, BinderResponse, FicheRequest};
