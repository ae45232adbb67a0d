//! Cursor-following listing.

use futures::{Stream, TryStreamExt as _};

use crate::{KeyInfo, KvStore, ListPage, StoreError};

/// Streams key batches under `prefix`, following the cursor until the
/// store reports `list_complete`.
///
/// The stream yields an error and ends if a page claims more keys exist
/// but carries no cursor.
pub fn key_batches<'a>(
    store: &'a dyn KvStore,
    prefix: &'a str,
) -> impl Stream<Item = Result<Vec<KeyInfo>, StoreError>> + Send + 'a {
    async_stream::try_stream! {
        let mut cursor: Option<String> = None;

        loop {
            let ListPage { keys, list_complete, cursor: next } =
                store.list(prefix, cursor.as_deref()).await?;

            log::trace!("Listed {} keys under {prefix:?}", keys.len());
            yield keys;

            if list_complete {
                break;
            }
            if next.is_none() {
                Err::<(), _>(StoreError::MissingCursor {
                    prefix: prefix.to_string(),
                })?;
            }
            cursor = next;
        }
    }
}

/// Collects every key name under `prefix`, in listing order.
///
/// # Errors
///
/// Returns the first [`StoreError`] raised while listing.
pub async fn list_all_keys(store: &dyn KvStore, prefix: &str) -> Result<Vec<String>, StoreError> {
    let batches = key_batches(store, prefix);
    futures::pin_mut!(batches);

    let mut names = Vec::new();
    while let Some(batch) = batches.try_next().await? {
        names.extend(batch.into_iter().map(|k| k.name));
    }

    Ok(names)
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::memory::MemoryStore;

    #[tokio::test]
    async fn follows_cursor_across_batches() {
        let store = MemoryStore::with_page_size(2);
        for i in 0..5 {
            store.put(&format!("p/{i}"), String::new()).await.unwrap();
        }
        store.put("other", String::new()).await.unwrap();

        let batches: Vec<Vec<KeyInfo>> = key_batches(&store, "p/").try_collect().await.unwrap();
        assert_eq!(
            batches.iter().map(Vec::len).collect::<Vec<_>>(),
            vec![2, 2, 1]
        );

        let names = list_all_keys(&store, "p/").await.unwrap();
        assert_eq!(names, vec!["p/0", "p/1", "p/2", "p/3", "p/4"]);
    }

    #[tokio::test]
    async fn empty_listing_yields_one_empty_batch() {
        let store = MemoryStore::new();
        let batches: Vec<Vec<KeyInfo>> = key_batches(&store, "p/").try_collect().await.unwrap();

        assert_eq!(batches, vec![Vec::<KeyInfo>::new()]);
    }

    struct CursorlessStore;

    #[async_trait]
    impl KvStore for CursorlessStore {
        async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Ok(None)
        }

        async fn put(&self, _key: &str, _value: String) -> Result<(), StoreError> {
            Ok(())
        }

        async fn list(&self, _prefix: &str, _cursor: Option<&str>) -> Result<ListPage, StoreError> {
            Ok(ListPage {
                keys: vec![KeyInfo {
                    name: "p/0".to_string(),
                }],
                list_complete: false,
                cursor: None,
            })
        }
    }

    #[tokio::test]
    async fn incomplete_page_without_cursor_is_an_error() {
        let result = list_all_keys(&CursorlessStore, "p/").await;
        assert!(matches!(result, Err(StoreError::MissingCursor { .. })));
    }
}
