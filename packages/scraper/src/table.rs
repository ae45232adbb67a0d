//! Table scanner.
//!
//! Walks every `<tr>` in the document (across all tables, numbered from
//! 0) and every `<td>`/`<th>` inside it, yielding the tag-stripped cell
//! text. Matching is non-greedy and spans lines. Nothing is validated:
//! unbalanced markup just produces fewer cells.

use std::sync::LazyLock;

use regex::Regex;

static ROW_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<tr(?:\s[^>]*)?>.+?</tr").expect("valid regex"));

static CELL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<t[dh](?:\s[^>]*)?>(.*?)</t[dh]>").expect("valid regex")
});

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]+>").expect("valid regex"));

/// A single table cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    /// Zero-based row index across the whole document.
    pub row: usize,
    /// Zero-based column index within the row.
    pub col: usize,
    /// Inner content with all tags removed. Not trimmed.
    pub text: String,
}

/// Lazily scans `content` for table cells in document order.
///
/// Each call starts a fresh scan.
pub fn cells(content: &str) -> impl Iterator<Item = Cell> + '_ {
    ROW_RE
        .find_iter(content)
        .enumerate()
        .flat_map(|(row, row_match)| {
            CELL_RE
                .captures_iter(row_match.as_str())
                .enumerate()
                .map(move |(col, caps)| Cell {
                    row,
                    col,
                    text: strip_tags(caps.get(1).map_or("", |m| m.as_str())),
                })
        })
}

/// Removes every `<...>` tag from `fragment`.
#[must_use]
pub fn strip_tags(fragment: &str) -> String {
    TAG_RE.replace_all(fragment, "").into_owned()
}
