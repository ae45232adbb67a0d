#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Refresh pipeline for the official sources.
//!
//! A case-count refresh fetches the bulletin page, extracts the regional
//! table, origin update time, and notifications, records a historical
//! snapshot when the origin update is new, rebuilds the day series, and
//! publishes the cached views. Hospital-bed counts come from a separately
//! registered [`SourceRefresher`].
//!
//! Every refresh is a single best-effort attempt. Failures are returned to
//! the caller as a [`RefreshError`]; nothing is retried.

pub mod cache;
pub mod cases;
pub mod config;
pub mod history;
pub mod series;

use std::sync::Arc;

use async_trait::async_trait;
use case_tracker_scraper::ScrapeError;
use case_tracker_store::StoreError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use cases::CaseCountRefresher;
pub use config::{ConfigError, StoreConfig, TrackerConfig};

/// Status text reported when the bulletin table fails the sanity check.
pub const PARSE_FAILURE_STATUS: &str = "Failed to parse HTML";

/// Errors that can occur during a refresh.
#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    /// The source answered with a non-200 status.
    #[error("Source responded {code} {status}")]
    Upstream {
        /// HTTP status code.
        code: u16,
        /// Reason phrase.
        status: String,
        /// Response body, verbatim.
        body: String,
    },

    /// The page no longer looks like the bulletin.
    #[error("Failed to parse HTML: {reason}")]
    Parse {
        /// What the sanity check found.
        reason: String,
    },

    /// No response could be obtained from the source.
    #[error("Failed to fetch source: {0}")]
    Fetch(#[source] reqwest::Error),

    /// Reading or writing the store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The response body could not be serialized.
    #[error("Failed to serialize response: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<ScrapeError> for RefreshError {
    fn from(value: ScrapeError) -> Self {
        match value {
            ScrapeError::Http(e) => Self::Fetch(e),
            ScrapeError::Structure { reason } => Self::Parse { reason },
        }
    }
}

/// `error` object of a failed refresh response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Upstream status, or 500.
    pub code: u16,
    /// Reason phrase.
    pub status: String,
    /// Upstream body or error description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

/// Body returned for a failed refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Always `false`.
    pub success: bool,
    /// What went wrong.
    pub error: ErrorDetail,
}

impl RefreshError {
    /// Status to report: the upstream status for [`Self::Upstream`], 500
    /// otherwise.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Upstream { code, .. } => *code,
            Self::Parse { .. } | Self::Fetch(_) | Self::Store(_) | Self::Json(_) => 500,
        }
    }

    /// Structured error payload.
    #[must_use]
    pub fn to_error_body(&self) -> ErrorBody {
        let (status, body) = match self {
            Self::Upstream { status, body, .. } => (status.clone(), Some(body.clone())),
            Self::Parse { .. } => (PARSE_FAILURE_STATUS.to_string(), None),
            Self::Fetch(e) => ("Failed to fetch source".to_string(), Some(e.to_string())),
            Self::Store(e) => ("Store error".to_string(), Some(e.to_string())),
            Self::Json(e) => ("Internal error".to_string(), Some(e.to_string())),
        };

        ErrorBody {
            success: false,
            error: ErrorDetail {
                code: self.status_code(),
                status,
                body,
            },
        }
    }
}

/// Which official sources a refresh covers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RefreshTarget {
    /// Case counts, then hospital beds.
    #[default]
    All,
    /// Case counts only.
    Cases,
    /// Hospital beds only.
    Hospitals,
}

/// Parsed refresh flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshRequest {
    /// Skip cached-view writes and return the raw extracted records.
    pub debug: bool,
    /// Sources to refresh.
    pub target: RefreshTarget,
}

impl RefreshRequest {
    /// Reads flags from a request URL or query string.
    ///
    /// `debug` anywhere enables debug mode; `only=cases` and
    /// `only=hospitals` restrict the target, with `only=cases` taking
    /// precedence when both appear.
    #[must_use]
    pub fn from_query(url: &str) -> Self {
        let target = if url.contains("only=cases") {
            RefreshTarget::Cases
        } else if url.contains("only=hospitals") {
            RefreshTarget::Hospitals
        } else {
            RefreshTarget::All
        };

        Self {
            debug: url.contains("debug"),
            target,
        }
    }
}

/// One official source that can be refreshed.
#[async_trait]
pub trait SourceRefresher: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Runs one refresh and returns the response body.
    ///
    /// In debug mode cached views are left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`RefreshError`] if the refresh fails.
    async fn refresh(&self, debug: bool) -> Result<Value, RefreshError>;
}

/// The registered official-source refreshers.
#[derive(Clone)]
pub struct Refreshers {
    cases: Arc<dyn SourceRefresher>,
    hospitals: Option<Arc<dyn SourceRefresher>>,
}

impl std::fmt::Debug for Refreshers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Refreshers")
            .field("cases", &self.cases.name())
            .field("hospitals", &self.hospitals.as_ref().map(|h| h.name()))
            .finish()
    }
}

impl Refreshers {
    /// Refreshers with only the case-count source registered.
    #[must_use]
    pub fn new(cases: Arc<dyn SourceRefresher>) -> Self {
        Self {
            cases,
            hospitals: None,
        }
    }

    /// Registers the hospital-bed source.
    #[must_use]
    pub fn with_hospitals(mut self, hospitals: Arc<dyn SourceRefresher>) -> Self {
        self.hospitals = Some(hospitals);
        self
    }

    /// Runs the refresh described by `request`.
    ///
    /// [`RefreshTarget::All`] runs both sources even if the first fails,
    /// returning `{}` on success or the first error otherwise.
    ///
    /// # Errors
    ///
    /// Returns the [`RefreshError`] of the failing source.
    pub async fn refresh_official_sources(
        &self,
        request: RefreshRequest,
    ) -> Result<Value, RefreshError> {
        log::info!(
            "Refreshing {:?}{}",
            request.target,
            if request.debug { " (debug)" } else { "" }
        );

        match request.target {
            RefreshTarget::Cases => self.cases.refresh(request.debug).await,
            RefreshTarget::Hospitals => self.refresh_hospitals(request.debug).await,
            RefreshTarget::All => {
                let cases = self.cases.refresh(request.debug).await;
                if let Err(e) = &cases {
                    log::error!("{} refresh failed: {e}", self.cases.name());
                }

                let hospitals = self.refresh_hospitals(request.debug).await;
                if let Err(e) = &hospitals {
                    log::error!("Hospital-bed refresh failed: {e}");
                }

                cases?;
                hospitals?;
                Ok(Value::Object(serde_json::Map::new()))
            }
        }
    }

    async fn refresh_hospitals(&self, debug: bool) -> Result<Value, RefreshError> {
        match &self.hospitals {
            Some(hospitals) => hospitals.refresh(debug).await,
            None => {
                log::info!("No hospital-bed source registered, skipping");
                Ok(Value::Object(serde_json::Map::new()))
            }
        }
    }
}
