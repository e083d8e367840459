//! Summary (table of contents) layout
//!
//! A single top-to-bottom cursor walks the reserved summary pages: theme
//! headers when the theme changes, one entry line per fiche with the title,
//! a dotted leader, and the fiche's start page right-aligned at the margin.
//!
//! The planner is pure: it consumes a [`TextMeasure`] and produces positioned
//! [`SummaryLine`] records without touching a document, so every layout rule
//! (truncation, leader arithmetic, spillover, exhaustion) is testable with a
//! stub measure. [`draw_summary`] then renders a plan onto the reserved blank
//! pages.

use lopdf::{Dictionary, Document, ObjectId, Stream};

use crate::error::Result;
use crate::layout::{palette, BinderConfig, Rgb};
use crate::pdf::font::{encode_text, TextMeasure, FONT_RESOURCE};
use crate::pdf::stamp::add_font_to_page_resources;

/// Left/right page margin of the summary block
const MARGIN: f32 = 50.0;
/// Centered heading on the first reserved page
const TITLE_TEXT: &str = "Sommaire";
const TITLE_SIZE: f32 = 24.0;
/// Heading baseline sits this far below the page top
const TITLE_DROP: f32 = 80.0;
/// First entry baseline on the first reserved page
const FIRST_PAGE_TOP: f32 = 130.0;
/// First entry baseline on continuation pages (no repeated heading)
const CONTINUATION_TOP: f32 = 60.0;
const THEME_SIZE: f32 = 11.0;
const ENTRY_SIZE: f32 = 9.5;
/// Vertical space consumed per entry line
const LINE_HEIGHT: f32 = 22.0;
/// Vertical space consumed per theme row
const THEME_HEIGHT: f32 = 30.0;
/// Minimum cursor height to start a theme row (room for the row plus an entry)
const THEME_FLOOR: f32 = 100.0;
/// Minimum cursor height to draw an entry line
const ENTRY_FLOOR: f32 = 60.0;
/// Entry lines are indented relative to theme labels
const ENTRY_INDENT: f32 = 12.0;
/// Clearance kept between the leader and the page number
const LEADER_GAP: f32 = 10.0;
/// One repetition of the dotted leader
const LEADER_UNIT: &str = " . ";

/// One fiche as the planner sees it
#[derive(Debug, Clone)]
pub struct SummaryItem {
    pub title: String,
    /// `None` means ungrouped: no theme row is drawn and the running theme is
    /// not reset
    pub theme: Option<String>,
    /// Resolved 1-indexed start page in the final document
    pub start_page: usize,
}

/// A positioned line of the summary, ready to draw
#[derive(Debug, Clone)]
pub enum SummaryLine {
    /// Centered heading on the first reserved page
    Title { page: usize, y: f32, x: f32, text: String },
    /// Thin separator rule
    Rule { page: usize, y: f32, x0: f32, x1: f32 },
    /// Theme group label
    Theme { page: usize, y: f32, label: String },
    /// One fiche entry: title, optional dotted leader, right-aligned page
    /// number
    Entry {
        page: usize,
        y: f32,
        title: String,
        leader: Option<String>,
        leader_x: f32,
        page_number: String,
        page_number_x: f32,
    },
}

impl SummaryLine {
    fn page(&self) -> usize {
        match *self {
            SummaryLine::Title { page, .. }
            | SummaryLine::Rule { page, .. }
            | SummaryLine::Theme { page, .. }
            | SummaryLine::Entry { page, .. } => page,
        }
    }
}

/// Result of the planning pass
#[derive(Debug)]
pub struct SummaryPlan {
    pub lines: Vec<SummaryLine>,
    /// Entries that did not fit on the reserved pages. The overflow policy
    /// decides whether this aborts the request or is merely logged.
    pub dropped: usize,
}

/// Explicit layout cursor threaded through the planning loop
struct Cursor {
    page: usize,
    y: f32,
    theme: Option<String>,
}

/// Truncate a title to `max_chars` visible characters plus an ellipsis.
/// Titles at or under the limit are returned unchanged.
pub fn truncate_title(title: &str, max_chars: usize) -> String {
    if title.chars().count() > max_chars {
        let mut out: String = title.chars().take(max_chars).collect();
        out.push('\u{2026}');
        out
    } else {
        title.to_string()
    }
}

/// Advance to the next reserved page when the cursor sits below `floor`.
/// Returns false once no reserved page remains.
fn ensure_room(cursor: &mut Cursor, floor: f32, reserved: usize, page_height: f32) -> bool {
    if cursor.y >= floor {
        return true;
    }
    if cursor.page + 1 >= reserved {
        return false;
    }
    cursor.page += 1;
    cursor.y = page_height - CONTINUATION_TOP;
    true
}

/// Lay out the summary for `items` over the reserved pages implied by
/// `config`. Items must carry their resolved start pages.
pub fn plan_summary(
    items: &[SummaryItem],
    config: &BinderConfig,
    measure: &dyn TextMeasure,
) -> SummaryPlan {
    let (width, height) = config.page.size_pt();
    let reserved = config.summary_page_count(items.len());
    let mut lines = Vec::with_capacity(items.len() + 4);
    let mut dropped = 0;

    let title_width = measure.text_width(TITLE_TEXT, TITLE_SIZE);
    lines.push(SummaryLine::Title {
        page: 0,
        y: height - TITLE_DROP,
        x: (width - title_width) / 2.0,
        text: TITLE_TEXT.to_string(),
    });
    lines.push(SummaryLine::Rule {
        page: 0,
        y: height - TITLE_DROP - 12.0,
        x0: MARGIN,
        x1: width - MARGIN,
    });

    let mut cursor = Cursor {
        page: 0,
        y: height - FIRST_PAGE_TOP,
        theme: None,
    };

    for (index, item) in items.iter().enumerate() {
        // A theme row only when the theme actually changes; ungrouped fiches
        // neither draw one nor reset the running theme
        if let Some(theme) = &item.theme {
            if cursor.theme.as_deref() != Some(theme.as_str()) {
                if !ensure_room(&mut cursor, THEME_FLOOR, reserved, height) {
                    dropped = items.len() - index;
                    break;
                }
                lines.push(SummaryLine::Theme {
                    page: cursor.page,
                    y: cursor.y,
                    label: theme.clone(),
                });
                lines.push(SummaryLine::Rule {
                    page: cursor.page,
                    y: cursor.y - 4.0,
                    x0: MARGIN,
                    x1: width - MARGIN,
                });
                cursor.theme = Some(theme.clone());
                cursor.y -= THEME_HEIGHT;
            }
        }

        if !ensure_room(&mut cursor, ENTRY_FLOOR, reserved, height) {
            dropped = items.len() - index;
            break;
        }

        // Truncate before measuring to bound the worst-case width
        let title = truncate_title(&item.title, config.title_max_chars);
        let title_width = measure.text_width(&title, ENTRY_SIZE);
        let page_number = item.start_page.to_string();
        let number_width = measure.text_width(&page_number, ENTRY_SIZE);

        let title_x = MARGIN + ENTRY_INDENT;
        let page_number_x = width - MARGIN - number_width;
        let available = page_number_x - (title_x + title_width) - LEADER_GAP;
        let unit_width = measure.text_width(LEADER_UNIT, ENTRY_SIZE);
        let leader = if available > 0.0 && unit_width > 0.0 {
            let repeats = (available / unit_width).floor() as usize;
            (repeats > 0).then(|| LEADER_UNIT.repeat(repeats))
        } else {
            None
        };

        lines.push(SummaryLine::Entry {
            page: cursor.page,
            y: cursor.y,
            title,
            leader,
            leader_x: title_x + title_width + 4.0,
            page_number,
            page_number_x,
        });
        cursor.y -= LINE_HEIGHT;
    }

    SummaryPlan { lines, dropped }
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

fn rule_op(x0: f32, x1: f32, y: f32, color: Rgb) -> String {
    format!(
        "{}\n0.5 w\n{:.2} {:.2} m\n{:.2} {:.2} l\nS\n",
        color.stroke_op(),
        x0,
        y,
        x1,
        y
    )
}

/// Render a plan onto the reserved summary pages.
///
/// Each page gets one generated content stream; the shared binder font is
/// registered in each page's resources.
pub fn draw_summary(
    doc: &mut Document,
    summary_page_ids: &[ObjectId],
    plan: &SummaryPlan,
    font_id: ObjectId,
) -> Result<()> {
    let mut streams: Vec<String> = vec![String::new(); summary_page_ids.len()];

    for line in &plan.lines {
        let Some(ops) = streams.get_mut(line.page()) else {
            continue;
        };
        match line {
            SummaryLine::Title { y, x, text, .. } => {
                ops.push_str(&text_op(*x, *y, TITLE_SIZE, palette::GRAY, text));
            }
            SummaryLine::Rule { y, x0, x1, .. } => {
                ops.push_str(&rule_op(*x0, *x1, *y, palette::RULE));
            }
            SummaryLine::Theme { y, label, .. } => {
                ops.push_str(&text_op(MARGIN, *y, THEME_SIZE, palette::GRAY, label));
            }
            SummaryLine::Entry {
                y,
                title,
                leader,
                leader_x,
                page_number,
                page_number_x,
                ..
            } => {
                ops.push_str(&text_op(
                    MARGIN + ENTRY_INDENT,
                    *y,
                    ENTRY_SIZE,
                    palette::GRAY,
                    title,
                ));
                if let Some(leader) = leader {
                    ops.push_str(&text_op(*leader_x, *y, ENTRY_SIZE, palette::RULE, leader));
                }
                ops.push_str(&text_op(
                    *page_number_x,
                    *y,
                    ENTRY_SIZE,
                    palette::GRAY,
                    page_number,
                ));
            }
        }
    }

    for (page_id, ops) in summary_page_ids.iter().zip(streams) {
        if ops.is_empty() {
            continue;
        }
        let stream_id = doc.add_object(Stream::new(Dictionary::new(), ops.into_bytes()));
        if let Ok(lopdf::Object::Dictionary(ref mut dict)) = doc.get_object_mut(*page_id) {
            dict.set("Contents", lopdf::Object::Reference(stream_id));
        }
        add_font_to_page_resources(doc, *page_id, font_id)?;
    }

    Ok(())
}
