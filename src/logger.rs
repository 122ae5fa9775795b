//! Terminal output for builds.
//!
//! - `log!` prints one line under a colored `[stage]` prefix
//! - [`report_warnings`] summarizes the [`Diagnostics`] of a collection
//! - [`ProgressBars`] shows parse progress, one bar per collection
//!
//! Everything is written to stderr; stdout carries the JSON of `json`/`diff`.
//!
//! # Example
//!
//! ```ignore
//! log!("parse"; "posts: {} html files", count);
//!
//! if let Some(progress) = ProgressBars::new_filtered(&[("posts", files.len())]) {
//!     progress.inc_by_name("posts");
//! } // bars are cleared on drop
//! ```

use crate::diagnostics::{Diagnostics, Side, Warning};
use colored::{ColoredString, Colorize};
use crossterm::{
    cursor, execute,
    terminal::{Clear, ClearType, size},
};
use rustc_hash::FxHashMap;
use std::{
    borrow::Cow,
    io::{Write, stderr},
    sync::{
        Mutex, OnceLock,
        atomic::{AtomicUsize, Ordering},
    },
};

/// Cached terminal width (fetched once on first use)
static TERMINAL_WIDTH: OnceLock<u16> = OnceLock::new();

/// Active progress bar count (for log coordination)
static BAR_COUNT: AtomicUsize = AtomicUsize::new(0);

// ============================================================================
// Layout Constants
// ============================================================================
//
// Progress bar format: "[posts] [████░░░░] 42/100"
//                       ^-----^ ^-------^ ^----^
//                       prefix  bar       count

/// Brackets and trailing space around a prefix: "[" "]" " "
const PREFIX_OVERHEAD: usize = 3;
/// Bar wrapper plus the space before the count: " [" "]" " "
const BAR_OVERHEAD: usize = 4;
const MIN_BAR_WIDTH: usize = 10;
const MAX_BAR_WIDTH: usize = 40;

fn get_terminal_width() -> u16 {
    *TERMINAL_WIDTH.get_or_init(|| size().map(|(w, _)| w).unwrap_or(120))
}

// ============================================================================
// Log Macro
// ============================================================================

/// Log a message with a colored stage prefix.
///
/// ```ignore
/// log!("stage"; "message with {} formatting", args);
/// ```
#[macro_export]
macro_rules! log {
    ($module:expr; $($arg:tt)*) => {{
        $crate::logger::log($module, &format!($($arg)*))
    }};
}

// ============================================================================
// Progress Bars
// ============================================================================

/// Progress bars drawn on the lines just above the cursor, one per label.
///
/// Rows are redrawn in place; a mutex keeps concurrent updates from rayon
/// workers from interleaving.
pub struct ProgressBars {
    bars: Vec<ProgressBar>,
    lock: Mutex<()>,
}

struct ProgressBar {
    label: String,
    prefix: ColoredString,
    total: usize,
    current: AtomicUsize,
    /// Row index within the progress area (0 = first bar)
    row: usize,
}

impl ProgressBars {
    fn new(labels: &[(&str, usize)]) -> Self {
        // Reserve terminal lines for progress bars
        let mut out = stderr().lock();
        for _ in labels {
            writeln!(out).ok();
        }
        out.flush().ok();

        BAR_COUNT.store(labels.len(), Ordering::SeqCst);

        let bars = labels
            .iter()
            .enumerate()
            .map(|(row, (label, total))| ProgressBar {
                label: (*label).to_owned(),
                prefix: colorize_prefix(label),
                total: *total,
                current: AtomicUsize::new(0),
                row,
            })
            .collect();

        Self {
            bars,
            lock: Mutex::new(()),
        }
    }

    /// Create bars for the labels that have work to count.
    ///
    /// Returns `None` when there is at most one item overall, since a bar
    /// would only flash.
    pub fn new_filtered(labels: &[(&str, usize)]) -> Option<Self> {
        let filtered = active_labels(labels)?;
        Some(Self::new(&filtered))
    }

    /// Advance the bar labelled `name` by one.
    pub fn inc_by_name(&self, name: &str) {
        if let Some(bar) = self.bars.iter().find(|bar| bar.label == name) {
            let current = bar.current.fetch_add(1, Ordering::Relaxed) + 1;
            self.display(bar, current);
        }
    }

    fn display(&self, bar: &ProgressBar, current: usize) {
        let _guard = self.lock.lock().ok();

        let progress_text = format!("{}/{}", current, bar.total);
        let overhead = bar.label.len() + PREFIX_OVERHEAD + BAR_OVERHEAD + progress_text.len();
        let (filled, empty) = bar_cells(current, bar.total, usize::from(get_terminal_width()), overhead);
        let cells = "█".repeat(filled) + &"░".repeat(empty);

        let mut out = stderr().lock();
        #[allow(clippy::cast_possible_truncation)] // Safe: bars count is always small
        let lines_up = (self.bars.len() - bar.row) as u16;
        execute!(out, cursor::MoveUp(lines_up)).ok();
        execute!(out, Clear(ClearType::CurrentLine)).ok();
        write!(out, "{} [{}] {}", bar.prefix, cells, progress_text).ok();
        execute!(out, cursor::MoveDown(lines_up)).ok();
        write!(out, "\r").ok();
        out.flush().ok();
    }

    /// Clear all progress bars from the terminal.
    #[allow(clippy::cast_possible_truncation)] // Safe: bars count is always small
    pub fn finish(&self) {
        BAR_COUNT.store(0, Ordering::SeqCst);
        let _guard = self.lock.lock().ok();

        let mut out = stderr().lock();
        let bars_len = self.bars.len() as u16;

        execute!(out, cursor::MoveUp(bars_len)).ok();
        for _ in &self.bars {
            execute!(out, Clear(ClearType::CurrentLine)).ok();
            execute!(out, cursor::MoveDown(1)).ok();
        }
        execute!(out, cursor::MoveUp(bars_len)).ok();
        out.flush().ok();
    }
}

impl Drop for ProgressBars {
    fn drop(&mut self) {
        self.finish();
    }
}

/// Labels with a non-zero count, or `None` if there is at most one item in total.
fn active_labels<'a>(labels: &[(&'a str, usize)]) -> Option<Vec<(&'a str, usize)>> {
    let filtered: Vec<_> = labels.iter().filter(|(_, count)| *count > 0).copied().collect();
    let total: usize = filtered.iter().map(|(_, count)| count).sum();
    (total > 1).then_some(filtered)
}

/// Filled and empty cell counts for a bar on a terminal `width` columns wide.
fn bar_cells(current: usize, total: usize, width: usize, overhead: usize) -> (usize, usize) {
    let bar_width = width.saturating_sub(overhead).clamp(MIN_BAR_WIDTH, MAX_BAR_WIDTH);
    let filled = if total > 0 {
        (current.min(total) * bar_width) / total
    } else {
        0
    };
    (filled, bar_width - filled)
}

// ============================================================================
// Logging
// ============================================================================

/// Log a message with a colored stage prefix.
///
/// Single-line messages are cut to the terminal width, except under the
/// `warn` and `error` stages whose lines carry page paths.
#[allow(clippy::cast_possible_truncation)] // Safe: bars count is always small
pub fn log(module: &str, message: &str) {
    let prefix = colorize_prefix(module);
    let width = usize::from(get_terminal_width());

    let mut out = stderr().lock();

    let bar_count = BAR_COUNT.load(Ordering::SeqCst);
    if bar_count > 0 {
        execute!(out, cursor::MoveUp(bar_count as u16)).ok();
        execute!(out, Clear(ClearType::FromCursorDown)).ok();
    } else {
        execute!(out, Clear(ClearType::UntilNewLine)).ok();
    }

    let message = if message.contains('\n') || keeps_full_line(module) {
        Cow::Borrowed(message)
    } else {
        fit_line(message, width.saturating_sub(module.len() + PREFIX_OVERHEAD))
    };
    writeln!(out, "{prefix} {message}").ok();

    for _ in 0..bar_count {
        writeln!(out).ok();
    }

    out.flush().ok();
}

/// Log the warnings of `collection`, repeated ones folded into a single line.
pub fn report_warnings(collection: &str, diagnostics: &Diagnostics) {
    if diagnostics.is_empty() {
        return;
    }
    for line in warning_lines(diagnostics) {
        log("warn", &format!("{collection}: {line}"));
    }
    log("warn", &format!("{collection}: {} warnings", diagnostics.len()));
}

/// What makes two warnings the same line in a report.
#[derive(PartialEq, Eq, Hash)]
enum WarningGroup<'a> {
    Attribute {
        element: &'a str,
        name: &'a str,
        side: Side,
    },
    Page(&'a str),
}

impl<'a> WarningGroup<'a> {
    fn of(warning: &'a Warning) -> Self {
        match warning {
            Warning::UnresolvedAttribute {
                element,
                name,
                side,
            } => Self::Attribute {
                element,
                name,
                side: *side,
            },
            Warning::UnmatchedNode { pathname, .. } => Self::Page(pathname),
        }
    }
}

/// One line per attribute drop and one per page, in first-seen order.
///
/// The same attribute is dropped once per merge, so a collection of many
/// pages repeats it; unmatched nodes of one page are shown by their first.
fn warning_lines(diagnostics: &Diagnostics) -> Vec<String> {
    let mut groups: Vec<(&Warning, usize)> = Vec::new();
    let mut index: FxHashMap<WarningGroup<'_>, usize> = FxHashMap::default();

    for warning in diagnostics {
        let slot = *index.entry(WarningGroup::of(warning)).or_insert_with(|| {
            groups.push((warning, 0));
            groups.len() - 1
        });
        groups[slot].1 += 1;
    }

    groups
        .into_iter()
        .map(|(warning, count)| match warning {
            _ if count == 1 => warning.to_string(),
            Warning::UnresolvedAttribute { .. } => format!("{warning} ({count} times)"),
            Warning::UnmatchedNode { .. } => format!("{warning} (+{} more)", count - 1),
        })
        .collect()
}

#[inline]
fn keeps_full_line(module: &str) -> bool {
    matches!(module.to_ascii_lowercase().as_str(), "warn" | "error")
}

fn colorize_prefix(module: &str) -> ColoredString {
    let prefix = format!("[{module}]");
    match module.to_ascii_lowercase().as_str() {
        "export" => prefix.bright_blue().bold(),
        "layout" => prefix.bright_green().bold(),
        "warn" => prefix.bright_magenta().bold(),
        "error" => prefix.bright_red().bold(),
        _ => prefix.bright_yellow().bold(),
    }
}

/// Cut `message` to `max` characters, marking the cut with `…`.
fn fit_line(message: &str, max: usize) -> Cow<'_, str> {
    if message.chars().count() <= max {
        return Cow::Borrowed(message);
    }
    let Some(keep) = max.checked_sub(1) else {
        return Cow::Borrowed("");
    };
    let end = message.char_indices().nth(keep).map_or(message.len(), |(i, _)| i);
    Cow::Owned(format!("{}…", &message[..end]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attribute(element: &str, name: &str, side: Side) -> Warning {
        Warning::UnresolvedAttribute {
            element: element.into(),
            name: name.into(),
            side,
        }
    }

    fn unmatched(pathname: &str, detail: &str) -> Warning {
        Warning::UnmatchedNode {
            pathname: pathname.into(),
            detail: detail.into(),
        }
    }

    #[test]
    fn test_fit_line_keeps_short_message() {
        assert!(matches!(fit_line("posts: 3 pages", 40), Cow::Borrowed("posts: 3 pages")));
    }

    #[test]
    fn test_fit_line_marks_cut() {
        assert_eq!(fit_line("posts: 12 html files", 8), "posts: …");
        assert_eq!(fit_line("abc", 0), "");
    }

    #[test]
    fn test_fit_line_counts_characters() {
        // "é" is two bytes but one column
        assert_eq!(fit_line("café menu", 5), "café…");
        assert_eq!(fit_line("café", 4), "café");
    }

    #[test]
    fn test_warn_and_error_are_not_cut() {
        assert!(keeps_full_line("warn"));
        assert!(keeps_full_line("ERROR"));
        assert!(!keeps_full_line("parse"));
    }

    #[test]
    fn test_warning_lines_fold_repeated_attribute() {
        let mut diagnostics = Diagnostics::new();
        for _ in 0..3 {
            diagnostics.push(attribute("img", "loading", Side::First));
        }
        diagnostics.push(attribute("img", "loading", Side::Second));

        let lines = warning_lines(&diagnostics);

        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("`loading`"));
        assert!(lines[0].ends_with("(3 times)"));
        assert!(lines[1].contains("second side"));
        assert!(!lines[1].contains("times"));
    }

    #[test]
    fn test_warning_lines_group_by_page() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.push(unmatched("b.html", "text \"y\" has no slot in the layout"));
        diagnostics.push(attribute("a", "target", Side::Second));
        diagnostics.push(unmatched("b.html", "<aside> has no slot in the layout"));
        diagnostics.push(unmatched("c.html", "layout expects <nav> which the page lacks"));

        let lines = warning_lines(&diagnostics);

        assert_eq!(
            lines,
            vec![
                "b.html: text \"y\" has no slot in the layout (+1 more)".to_owned(),
                "dropped attribute `target` on <a>: only present on the second side".to_owned(),
                "c.html: layout expects <nav> which the page lacks".to_owned(),
            ]
        );
    }

    #[test]
    fn test_active_labels_skip_empty_and_single() {
        assert_eq!(active_labels(&[("posts", 1)]), None);
        assert_eq!(active_labels(&[("posts", 0), ("pages", 0)]), None);
        assert_eq!(
            active_labels(&[("posts", 0), ("static", 4)]),
            Some(vec![("static", 4)])
        );
        assert!(ProgressBars::new_filtered(&[("posts", 1)]).is_none());
    }

    #[test]
    fn test_bar_cells_clamp_width() {
        // Narrow terminal still gets the minimum bar
        assert_eq!(bar_cells(5, 10, 20, 30), (5, 5));
        // Wide terminal is capped
        assert_eq!(bar_cells(10, 10, 500, 20), (MAX_BAR_WIDTH, 0));
        assert_eq!(bar_cells(3, 0, 80, 20), (0, MAX_BAR_WIDTH));
    }
}
