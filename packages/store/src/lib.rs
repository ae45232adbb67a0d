#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Key-value store contract used by the refresh pipeline.
//!
//! Values are strings (JSON in practice). Listing is paginated: each call
//! returns a batch of key names, a `list_complete` flag, and an opaque
//! cursor to pass back for the next batch. [`pagination::key_batches`]
//! turns that into a stream that ends on `list_complete`.
//!
//! Backends in this crate:
//! - [`memory::MemoryStore`]: process-local, for tests and dry runs
//! - [`fs::FsStore`]: one file per key under a root directory
//!
//! The R2 backend lives in `case_tracker_r2`.

pub mod fs;
pub mod memory;
pub mod pagination;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub use pagination::{key_batches, list_all_keys};

/// Default number of keys returned per listing call.
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// I/O error in a local backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored value could not be (de)serialized.
    #[error("JSON error for key {key}: {source}")]
    Json {
        /// Key being read or written.
        key: String,
        /// Underlying serde error.
        source: serde_json::Error,
    },

    /// The key cannot be represented by this backend.
    #[error("Invalid key: {key:?}")]
    InvalidKey {
        /// The rejected key.
        key: String,
    },

    /// A listing reported more keys but returned no cursor to fetch them.
    #[error("Listing of {prefix:?} is incomplete but no cursor was returned")]
    MissingCursor {
        /// Prefix being listed.
        prefix: String,
    },

    /// Remote backend failure.
    #[error("Store backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// A key returned by a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyInfo {
    /// Full key name, including the listed prefix.
    pub name: String,
}

/// One batch of a paginated listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListPage {
    /// Keys in this batch, in ascending order.
    pub keys: Vec<KeyInfo>,
    /// `true` when no further batches exist.
    pub list_complete: bool,
    /// Continuation token for the next batch, present unless complete.
    pub cursor: Option<String>,
}

/// A string-valued key-value store with paginated prefix listing.
///
/// Writes to distinct keys are independent and may be issued
/// concurrently. No durability or consistency guarantees beyond those of
/// the backend are assumed.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Reads the value stored at `key`, or `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend fails.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Writes `value` at `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend fails.
    async fn put(&self, key: &str, value: String) -> Result<(), StoreError>;

    /// Lists one batch of keys starting with `prefix`, continuing after
    /// `cursor` when given.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend fails.
    async fn list(&self, prefix: &str, cursor: Option<&str>) -> Result<ListPage, StoreError>;
}

/// Reads and deserializes a JSON value.
///
/// # Errors
///
/// Returns [`StoreError::Json`] if the stored text is not valid JSON for
/// `T`, or any backend error from [`KvStore::get`].
pub async fn get_json<T: DeserializeOwned>(
    store: &dyn KvStore,
    key: &str,
) -> Result<Option<T>, StoreError> {
    let Some(text) = store.get(key).await? else {
        return Ok(None);
    };

    serde_json::from_str(&text)
        .map(Some)
        .map_err(|source| StoreError::Json {
            key: key.to_string(),
            source,
        })
}

/// Serializes `value` as JSON and writes it.
///
/// # Errors
///
/// Returns [`StoreError::Json`] if serialization fails, or any backend
/// error from [`KvStore::put`].
pub async fn put_json<T: Serialize + Sync + ?Sized>(
    store: &dyn KvStore,
    key: &str,
    value: &T,
) -> Result<(), StoreError> {
    let text = serde_json::to_string(value).map_err(|source| StoreError::Json {
        key: key.to_string(),
        source,
    })?;
    store.put(key, text).await
}

/// Cuts one listing batch out of an ascending key sequence.
///
/// Keys not starting with `prefix`, or not strictly after `cursor`, are
/// skipped. The cursor of an incomplete page is its last key name.
#[must_use]
pub fn page_of<'a>(
    sorted_keys: impl IntoIterator<Item = &'a str>,
    prefix: &str,
    cursor: Option<&str>,
    page_size: usize,
) -> ListPage {
    let mut matching = sorted_keys
        .into_iter()
        .filter(|key| key.starts_with(prefix))
        .filter(|key| cursor.is_none_or(|after| *key > after));

    let keys: Vec<KeyInfo> = matching
        .by_ref()
        .take(page_size.max(1))
        .map(|name| KeyInfo {
            name: name.to_string(),
        })
        .collect();

    let list_complete = matching.next().is_none();
    let cursor = if list_complete {
        None
    } else {
        keys.last().map(|k| k.name.clone())
    };

    ListPage {
        keys,
        list_complete,
        cursor,
    }
}
