//! Page geometry and binder configuration

use std::path::PathBuf;

/// Simple length type in millimeters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Length(pub f64);

impl Length {
    /// Create a length from millimeters
    pub fn from_mm(mm: f64) -> Self {
        Length(mm)
    }

    /// Create a length from inches
    pub fn from_inches(inches: f64) -> Self {
        Length(inches * 25.4)
    }

    /// Get the value in millimeters
    pub fn mm(&self) -> f64 {
        self.0
    }

    /// Get the value in points (1/72 inch)
    pub fn pt(&self) -> f64 {
        self.0 * 72.0 / 25.4
    }
}

/// Dimensions used for every generated (non-copied) page.
///
/// Copied fragment pages keep whatever size they came with; only the cover
/// page and the reserved summary pages are created at this size.
#[derive(Debug, Clone, Copy)]
pub struct PageDimensions {
    pub width: Length,
    pub height: Length,
}

impl PageDimensions {
    /// A4 size (210mm × 297mm, 595.28pt × 841.89pt)
    pub fn a4() -> Self {
        Self {
            width: Length::from_mm(210.0),
            height: Length::from_mm(297.0),
        }
    }

    /// US Letter size (8.5" × 11")
    pub fn letter() -> Self {
        Self {
            width: Length::from_mm(215.9),
            height: Length::from_mm(279.4),
        }
    }

    /// Width and height in points, as used in content streams and MediaBox
    pub fn size_pt(&self) -> (f32, f32) {
        (self.width.pt() as f32, self.height.pt() as f32)
    }
}

/// An RGB color with components in 0..=1, as written into content streams.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// `rg` operator setting the fill color
    pub fn fill_op(&self) -> String {
        format!("{} {} {} rg", self.r, self.g, self.b)
    }

    /// `RG` operator setting the stroke color
    pub fn stroke_op(&self) -> String {
        format!("{} {} {} RG", self.r, self.g, self.b)
    }
}

/// Colors shared by the summary and the header/footer stamp.
pub mod palette {
    use super::Rgb;

    /// Header band fill
    pub const BAND: Rgb = Rgb::new(0.04, 0.60, 0.47);
    /// Body text on the summary and footer
    pub const GRAY: Rgb = Rgb::new(0.29, 0.29, 0.29);
    /// Separator rules and dotted leaders
    pub const RULE: Rgb = Rgb::new(0.85, 0.85, 0.85);
    /// Header text on the band
    pub const WHITE: Rgb = Rgb::new(1.0, 1.0, 1.0);
}

/// What to do when the summary entries exceed the reserved pages.
///
/// The reservation is a one-shot estimate made before any fiche page is
/// appended; growing it afterwards would invalidate every computed start page,
/// so the only choices are dropping the surplus entries or failing the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    /// Stop listing entries once the reserved pages are full (the surplus
    /// fiches keep their pages and their stamps, they are just not listed)
    #[default]
    Truncate,
    /// Fail the whole request with `Error::SummaryOverflow`
    Reject,
}

/// Configuration for one binder build
#[derive(Debug, Clone)]
pub struct BinderConfig {
    /// Size of every generated page (cover, summary)
    pub page: PageDimensions,
    /// Primary TrueType face; the built-in Helvetica is substituted when
    /// missing or unreadable
    pub font_path: Option<PathBuf>,
    /// Summary capacity estimate used to reserve placeholder pages
    pub entries_per_summary_page: usize,
    /// Visible characters kept when a summary title is truncated
    pub title_max_chars: usize,
    /// Overflow behavior when entries exceed the reserved summary pages
    pub overflow: OverflowPolicy,
    /// Footer shows "Page X of N" instead of the bare page number
    pub show_page_total: bool,
    /// Optional centered footer line (e.g. a copyright notice)
    pub footer_note: Option<String>,
}

impl Default for BinderConfig {
    fn default() -> Self {
        Self {
            page: PageDimensions::a4(),
            font_path: None,
            entries_per_summary_page: 25,
            title_max_chars: 62,
            overflow: OverflowPolicy::Truncate,
            show_page_total: false,
            footer_note: None,
        }
    }
}

impl BinderConfig {
    /// Number of blank summary pages reserved for `fiche_count` entries.
    /// Always at least one page.
    pub fn summary_page_count(&self, fiche_count: usize) -> usize {
        fiche_count.div_ceil(self.entries_per_summary_page).max(1)
    }
}
