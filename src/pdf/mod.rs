//! PDF assembly, layout, and stamping

pub mod assemble;
pub mod font;
pub mod image;
pub mod metadata;
pub mod stamp;
pub mod summary;

// Re-export commonly used items
pub use assemble::{load_fragment, Assembled, Assembler};
pub use font::{BinderFont, TextMeasure};
pub use image::CoverImage;
pub use metadata::{document_metadata, inspect_file, PdfMetadata};
pub use stamp::{owning_fiche, stamp_pages};
pub use summary::{draw_summary, plan_summary, truncate_title, SummaryItem, SummaryPlan};
