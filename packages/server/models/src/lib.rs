#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API response types for the case tracker server.
//!
//! Cached entries are served verbatim from the store and refresh responses
//! come from the refresh pipeline, so only the server's own responses are
//! defined here.

use serde::{Deserialize, Serialize};

/// Health check response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    /// Whether the service is healthy.
    pub healthy: bool,
    /// Service version.
    pub version: String,
}

/// `error` object of an [`ApiError`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    /// HTTP status code.
    pub code: u16,
    /// Reason phrase.
    pub status: String,
}

/// Error response for requests that never reached the refresh pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    /// Always `false`.
    pub success: bool,
    /// What went wrong.
    pub error: ApiErrorDetail,
}

impl ApiError {
    /// Builds an error response with `code` and `status`.
    #[must_use]
    pub fn new(code: u16, status: impl Into<String>) -> Self {
        Self {
            success: false,
            error: ApiErrorDetail {
                code,
                status: status.into(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_shape_matches_refresh_errors() {
        let json = serde_json::to_string(&ApiError::new(404, "Not Found")).unwrap();
        assert_eq!(
            json,
            r#"{"success":false,"error":{"code":404,"status":"Not Found"}}"#
        );
    }
}
