//! Notification extraction.
//!
//! Advisories are published as `<li>` items wrapping a link. Only links to
//! PDFs or to `.gov.in` hosts are kept; site-relative links are made
//! absolute against the configured source origin.

use std::sync::LazyLock;

use case_tracker_case_models::Notification;
use regex::Regex;

static LIST_ITEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<li(?:\s[^>]*)?>(.+?)</li>").expect("valid regex"));

static HREF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<a\s[^>]*?href\s*=\s*["']([^"']+)["']"#).expect("valid regex")
});

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]+>").expect("valid regex"));

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Extracts linked notices in document order.
///
/// `source_origin` (e.g. `https://www.mohfw.gov.in`) is prefixed to links
/// starting with `/`.
#[must_use]
pub fn extract_notifications(content: &str, source_origin: &str) -> Vec<Notification> {
    let notifications: Vec<Notification> = LIST_ITEM_RE
        .captures_iter(content)
        .filter_map(|caps| {
            let inner = caps.get(1)?.as_str();
            let href = HREF_RE.captures(inner)?.get(1)?.as_str().trim();

            if !is_allowed_link(href) {
                return None;
            }

            Some(Notification {
                title: title_text(inner),
                link: absolutize(href, source_origin),
            })
        })
        .collect();

    log::debug!("Extracted {} notifications", notifications.len());
    notifications
}

/// Whether a link points at a document worth surfacing.
#[must_use]
pub fn is_allowed_link(href: &str) -> bool {
    href.ends_with(".pdf") || href.contains(".gov.in")
}

fn title_text(inner_html: &str) -> String {
    let untagged = TAG_RE.replace_all(inner_html, " ");
    WHITESPACE_RE
        .replace_all(&untagged, " ")
        .trim()
        .to_string()
}

fn absolutize(href: &str, source_origin: &str) -> String {
    if href.starts_with('/') {
        format!("{}{href}", source_origin.trim_end_matches('/'))
    } else {
        href.to_string()
    }
}
