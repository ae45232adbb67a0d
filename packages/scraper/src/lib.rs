#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Scraping for the health-ministry bulletin page.
//!
//! Everything here works on the raw markup with a handful of regexes rather
//! than a full HTML parser. The page is known, the structures needed are
//! small ([`table`] rows and cells, `<li>` notices, one "as on ..." stamp),
//! and malformed markup should degrade to partial output instead of
//! failing.
//!
//! - [`table`]: yields `(row, col, text)` cells for every table row
//! - [`columns`]: maps header cells to [`RegionalField`]s
//! - [`cases`]: builds one [`RegionalRecord`] per table row
//! - [`origin`]: reads the upstream "as on" update time
//! - [`notifications`]: extracts linked notices
//! - [`fetch`]: retrieves the page
//!
//! [`RegionalField`]: case_tracker_case_models::RegionalField
//! [`RegionalRecord`]: case_tracker_case_models::RegionalRecord

pub mod cases;
pub mod columns;
pub mod fetch;
pub mod notifications;
pub mod origin;
pub mod table;

pub use cases::{extract_case_counts, validate_structure};
pub use fetch::{FetchedPage, HttpFetcher, PageFetcher};
pub use notifications::extract_notifications;
pub use origin::extract_origin_update;

/// Errors that can occur while fetching or scraping the bulletin.
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    /// An HTTP request failed before a response was received.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The extracted table does not look like the case-count table.
    #[error("Unexpected document structure: {reason}")]
    Structure {
        /// What the sanity check found.
        reason: String,
    },
}
