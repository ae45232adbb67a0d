//! Directory-backed store.
//!
//! Each key maps to a file under the root, with `/` in the key acting as a
//! directory separator (`case_counts/2020-03-15T03:30:00.000Z` becomes
//! `<root>/case_counts/2020-03-15T03:30:00.000Z`). Writes go to a temporary
//! sibling first and are renamed into place.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;

use crate::{DEFAULT_PAGE_SIZE, KvStore, ListPage, StoreError, page_of};

const TEMP_PREFIX: &str = ".tmp-";

/// Distinguishes temp files of concurrent writes to the same key.
static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// [`KvStore`] persisted as files under a root directory.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
    page_size: usize,
}

impl FsStore {
    /// Opens a store rooted at `root`. The directory is created on first
    /// write.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_page_size(root, DEFAULT_PAGE_SIZE)
    }

    /// Opens a store that lists at most `page_size` keys per call.
    #[must_use]
    pub fn with_page_size(root: impl Into<PathBuf>, page_size: usize) -> Self {
        Self {
            root: root.into(),
            page_size,
        }
    }

    /// Root directory of the store.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        let valid = !key.is_empty()
            && !key.contains('\\')
            && key.split('/').all(|segment| {
                !segment.is_empty()
                    && segment != "."
                    && segment != ".."
                    && !segment.starts_with(TEMP_PREFIX)
            });

        if valid {
            Ok(self.root.join(key))
        } else {
            Err(StoreError::InvalidKey {
                key: key.to_string(),
            })
        }
    }

    /// Every key under the root, sorted.
    async fn all_keys(&self) -> Result<Vec<String>, StoreError> {
        let mut keys = Vec::new();
        let mut pending = vec![(self.root.clone(), String::new())];

        while let Some((dir, key_prefix)) = pending.pop() {
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };

            while let Some(entry) = entries.next_entry().await? {
                let Ok(name) = entry.file_name().into_string() else {
                    log::warn!("Skipping non UTF-8 entry in {}", dir.display());
                    continue;
                };
                if name.starts_with(TEMP_PREFIX) {
                    continue;
                }

                let key = format!("{key_prefix}{name}");
                if entry.file_type().await?.is_dir() {
                    pending.push((entry.path(), format!("{key}/")));
                } else {
                    keys.push(key);
                }
            }
        }

        keys.sort_unstable();
        Ok(keys)
    }
}

#[async_trait]
impl KvStore for FsStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key)?;

        match tokio::fs::read_to_string(&path).await {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, key: &str, value: String) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        let (Some(parent), Some(file_name)) = (path.parent(), path.file_name()) else {
            return Err(StoreError::InvalidKey {
                key: key.to_string(),
            });
        };

        tokio::fs::create_dir_all(parent).await?;

        let temp = parent.join(format!(
            "{TEMP_PREFIX}{}-{}-{}",
            std::process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed),
            file_name.to_string_lossy()
        ));

        let written = match tokio::fs::write(&temp, value).await {
            Ok(()) => tokio::fs::rename(&temp, &path).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(e.into());
        }

        log::trace!("Wrote {}", path.display());
        Ok(())
    }

    async fn list(&self, prefix: &str, cursor: Option<&str>) -> Result<ListPage, StoreError> {
        let keys = self.all_keys().await?;
        Ok(page_of(
            keys.iter().map(String::as_str),
            prefix,
            cursor,
            self.page_size,
        ))
    }
}
