#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Cloudflare R2 backend for the case tracker key-value store.
//!
//! Keys map one-to-one to object keys in a single bucket. Listing uses
//! `ListObjectsV2` with the continuation token exposed as the store cursor.
//!
//! # Environment Variables
//!
//! | Variable | Required | Description |
//! |---|---|---|
//! | `CLOUDFLARE_ACCOUNT_ID` | Yes | Cloudflare account ID (builds the R2 endpoint) |
//! | `R2_ACCESS_KEY_ID` | Yes | S3-compatible access key for R2 |
//! | `R2_SECRET_ACCESS_KEY` | Yes | S3-compatible secret key for R2 |

use async_trait::async_trait;
use aws_config::Region;
use aws_sdk_s3::config::{Credentials, StalledStreamProtectionConfig};
use aws_sdk_s3::operation::get_object::GetObjectError;
use aws_sdk_s3::primitives::ByteStream;
use case_tracker_store::{DEFAULT_PAGE_SIZE, KeyInfo, KvStore, ListPage, StoreError};

/// Errors that can occur during R2 operations.
#[derive(Debug, thiserror::Error)]
pub enum R2Error {
    /// Missing required environment variable.
    #[error("Missing environment variable: {name}")]
    MissingEnv {
        /// Name of the missing environment variable.
        name: String,
    },

    /// S3 `GetObject` failed.
    #[error("Failed to read s3://{bucket}/{key}: {source}")]
    Get {
        /// Bucket name.
        bucket: String,
        /// Object key.
        key: String,
        /// Underlying SDK error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// S3 `PutObject` failed.
    #[error("Failed to write s3://{bucket}/{key}: {source}")]
    Put {
        /// Bucket name.
        bucket: String,
        /// Object key.
        key: String,
        /// Underlying SDK error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// S3 `ListObjectsV2` failed.
    #[error("Failed to list s3://{bucket}/{prefix}: {source}")]
    List {
        /// Bucket name.
        bucket: String,
        /// Key prefix.
        prefix: String,
        /// Underlying SDK error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Object body was not valid UTF-8.
    #[error("Object s3://{bucket}/{key} is not UTF-8 text")]
    NotText {
        /// Bucket name.
        bucket: String,
        /// Object key.
        key: String,
    },
}

impl From<R2Error> for StoreError {
    fn from(value: R2Error) -> Self {
        Self::Backend(Box::new(value))
    }
}

/// [`KvStore`] backed by an R2 bucket.
pub struct R2Store {
    client: aws_sdk_s3::Client,
    bucket: String,
    page_size: usize,
}

impl std::fmt::Debug for R2Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("R2Store")
            .field("bucket", &self.bucket)
            .field("page_size", &self.page_size)
            .finish_non_exhaustive()
    }
}

impl R2Store {
    /// Creates a store for `bucket` from environment variables.
    ///
    /// Reads `CLOUDFLARE_ACCOUNT_ID`, `R2_ACCESS_KEY_ID`, and
    /// `R2_SECRET_ACCESS_KEY` from the environment.
    ///
    /// # Errors
    ///
    /// Returns [`R2Error::MissingEnv`] if any required variable is unset.
    pub fn from_env(bucket: &str, page_size: Option<usize>) -> Result<Self, R2Error> {
        let account_id = require_env("CLOUDFLARE_ACCOUNT_ID")?;
        let access_key = require_env("R2_ACCESS_KEY_ID")?;
        let secret_key = require_env("R2_SECRET_ACCESS_KEY")?;

        let creds = Credentials::new(&access_key, &secret_key, None, None, "r2-env");

        let config = aws_sdk_s3::Config::builder()
            .endpoint_url(endpoint_for(&account_id))
            .region(Region::new("auto"))
            .credentials_provider(creds)
            .force_path_style(true)
            .stalled_stream_protection(StalledStreamProtectionConfig::disabled())
            .build();

        log::debug!("Using R2 bucket {bucket}");

        Ok(Self {
            client: aws_sdk_s3::Client::from_conf(config),
            bucket: bucket.to_string(),
            page_size: page_size.unwrap_or(DEFAULT_PAGE_SIZE),
        })
    }

    /// Bucket this store reads and writes.
    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn get_text(&self, key: &str) -> Result<Option<String>, R2Error> {
        let result = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await;

        let output = match result {
            Ok(output) => output,
            Err(err) => {
                if err
                    .as_service_error()
                    .is_some_and(GetObjectError::is_no_such_key)
                {
                    return Ok(None);
                }
                return Err(R2Error::Get {
                    bucket: self.bucket.clone(),
                    key: key.to_string(),
                    source: Box::new(err),
                });
            }
        };

        let bytes = output.body.collect().await.map_err(|e| R2Error::Get {
            bucket: self.bucket.clone(),
            key: key.to_string(),
            source: Box::new(e),
        })?;

        String::from_utf8(bytes.into_bytes().to_vec())
            .map(Some)
            .map_err(|_| R2Error::NotText {
                bucket: self.bucket.clone(),
                key: key.to_string(),
            })
    }

    async fn put_text(&self, key: &str, value: String) -> Result<(), R2Error> {
        log::debug!("Writing s3://{}/{key} ({} bytes)", self.bucket, value.len());

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(value.into_bytes()))
            .content_type("application/json")
            .send()
            .await
            .map_err(|e| R2Error::Put {
                bucket: self.bucket.clone(),
                key: key.to_string(),
                source: Box::new(e),
            })?;

        Ok(())
    }

    async fn list_page(&self, prefix: &str, cursor: Option<&str>) -> Result<ListPage, R2Error> {
        let mut request = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(prefix)
            .max_keys(i32::try_from(self.page_size).unwrap_or(i32::MAX));

        if let Some(token) = cursor {
            request = request.continuation_token(token);
        }

        let output = request.send().await.map_err(|e| R2Error::List {
            bucket: self.bucket.clone(),
            prefix: prefix.to_string(),
            source: Box::new(e),
        })?;

        let keys = output
            .contents()
            .iter()
            .filter_map(|obj| obj.key())
            .map(ToString::to_string)
            .collect();

        Ok(page_from_listing(
            keys,
            output.is_truncated() == Some(true),
            output.next_continuation_token(),
        ))
    }
}

#[async_trait]
impl KvStore for R2Store {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.get_text(key).await?)
    }

    async fn put(&self, key: &str, value: String) -> Result<(), StoreError> {
        Ok(self.put_text(key, value).await?)
    }

    async fn list(&self, prefix: &str, cursor: Option<&str>) -> Result<ListPage, StoreError> {
        Ok(self.list_page(prefix, cursor).await?)
    }
}

/// Builds a [`ListPage`] from one `ListObjectsV2` response.
fn page_from_listing(keys: Vec<String>, truncated: bool, next_token: Option<&str>) -> ListPage {
    ListPage {
        keys: keys.into_iter().map(|name| KeyInfo { name }).collect(),
        list_complete: !truncated,
        cursor: if truncated {
            next_token.map(String::from)
        } else {
            None
        },
    }
}

fn endpoint_for(account_id: &str) -> String {
    format!("https://{account_id}.r2.cloudflarestorage.com")
}

/// Reads a required environment variable.
fn require_env(name: &str) -> Result<String, R2Error> {
    std::env::var(name).map_err(|_| R2Error::MissingEnv {
        name: name.to_string(),
    })
}
