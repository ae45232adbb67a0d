//! Historical snapshots.
//!
//! Each time the bulletin reports a newer origin update time, the raw
//! regional records are written once under `case_counts/<ISO timestamp>`.
//! Snapshots are never rewritten.

use case_tracker_case_models::keys::{historical_key, historical_prefix, timestamp_from_key};
use case_tracker_case_models::{HistoricalTimestamp, RegionalRecord};
use case_tracker_store::{KvStore, StoreError, list_all_keys, put_json};
use chrono::{DateTime, Utc};

/// Sorted timestamps of every stored snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotHistory {
    timestamps: Vec<HistoricalTimestamp>,
}

impl SnapshotHistory {
    /// Lists all snapshot keys, following the listing cursor to the end.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if listing fails.
    pub async fn load(store: &dyn KvStore) -> Result<Self, StoreError> {
        let keys = list_all_keys(store, &historical_prefix()).await?;
        let history = Self::from_timestamps(keys.iter().filter_map(|k| timestamp_from_key(k)));

        log::debug!("Found {} historical snapshots", history.timestamps.len());
        Ok(history)
    }

    /// Builds a history from timestamps in any order.
    #[must_use]
    pub fn from_timestamps(timestamps: impl IntoIterator<Item = HistoricalTimestamp>) -> Self {
        let mut timestamps: Vec<_> = timestamps.into_iter().collect();
        timestamps.sort_by(HistoricalTimestamp::chronological_cmp);
        timestamps.dedup();
        Self { timestamps }
    }

    /// All timestamps, oldest first.
    #[must_use]
    pub fn timestamps(&self) -> &[HistoricalTimestamp] {
        &self.timestamps
    }

    /// Most recent snapshot, if any.
    #[must_use]
    pub fn latest(&self) -> Option<&HistoricalTimestamp> {
        self.timestamps.last()
    }

    /// Whether a snapshot at `candidate` would be strictly newer than every
    /// stored one. Always `true` for an empty history.
    #[must_use]
    pub fn is_newer(&self, candidate: &HistoricalTimestamp) -> bool {
        self.latest().is_none_or(|latest| match (candidate.instant(), latest.instant()) {
            (Some(candidate), Some(latest)) => candidate > latest,
            _ => candidate.as_str() > latest.as_str(),
        })
    }

    /// Writes `regional` as a new snapshot when `origin_update` is known
    /// and newer than the latest stored one.
    ///
    /// Returns the timestamp written, or `None` when nothing was written.
    /// A written timestamp is appended so [`Self::timestamps`] reflects it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the write fails.
    pub async fn record_if_newer(
        &mut self,
        store: &dyn KvStore,
        origin_update: Option<DateTime<Utc>>,
        regional: &[RegionalRecord],
    ) -> Result<Option<HistoricalTimestamp>, StoreError> {
        let Some(origin_update) = origin_update else {
            log::info!("Origin update time unknown, no snapshot recorded");
            return Ok(None);
        };

        let timestamp = HistoricalTimestamp::from_datetime(&origin_update);
        if !self.is_newer(&timestamp) {
            log::info!(
                "Origin update {timestamp} is not newer than {}, no snapshot recorded",
                self.latest().map_or("-", HistoricalTimestamp::as_str)
            );
            return Ok(None);
        }

        put_json(store, &historical_key(&timestamp), regional).await?;
        log::info!("Recorded snapshot {timestamp} ({} records)", regional.len());

        self.timestamps.push(timestamp.clone());
        Ok(Some(timestamp))
    }
}

#[cfg(test)]
mod tests {
    use case_tracker_case_models::Count;
    use case_tracker_store::get_json;
    use case_tracker_store::memory::MemoryStore;
    use chrono::TimeZone;

    use super::*;

    fn ts(raw: &str) -> HistoricalTimestamp {
        HistoricalTimestamp::new(raw)
    }

    fn regional() -> Vec<RegionalRecord> {
        vec![RegionalRecord {
            location: Some("Kerala".to_string()),
            confirmed_domestic: Some(Count::Value(24)),
            confirmed_foreign: Some(Count::Value(2)),
            discharged: Some(Count::Value(3)),
            deaths: Some(Count::Value(0)),
        }]
    }

    #[test]
    fn timestamps_are_sorted_and_deduplicated() {
        let history = SnapshotHistory::from_timestamps([
            ts("2020-03-02T05:00:00.000Z"),
            ts("2020-03-01T10:00:00.000Z"),
            ts("2020-03-02T05:00:00.000Z"),
        ]);

        assert_eq!(
            history.timestamps(),
            &[ts("2020-03-01T10:00:00.000Z"), ts("2020-03-02T05:00:00.000Z")]
        );
        assert_eq!(history.latest(), Some(&ts("2020-03-02T05:00:00.000Z")));
    }

    #[test]
    fn only_strictly_newer_counts() {
        let history = SnapshotHistory::from_timestamps([ts("2020-03-01T10:00:00.000Z")]);

        assert!(history.is_newer(&ts("2020-03-01T10:00:00.001Z")));
        assert!(!history.is_newer(&ts("2020-03-01T10:00:00.000Z")));
        assert!(!history.is_newer(&ts("2020-02-28T10:00:00.000Z")));
        assert!(SnapshotHistory::default().is_newer(&ts("1970-01-01T00:00:00.000Z")));
    }

    #[test]
    fn comparison_uses_instants_across_precisions() {
        let history = SnapshotHistory::from_timestamps([
            ts("2020-03-01T10:00:00.500Z"),
            ts("2020-03-01T10:00:00Z"),
        ]);

        assert_eq!(history.latest(), Some(&ts("2020-03-01T10:00:00.500Z")));
        assert!(!history.is_newer(&ts("2020-03-01T10:00:00Z")));
        assert!(!history.is_newer(&ts("2020-03-01T10:00:00.500Z")));
        assert!(history.is_newer(&ts("2020-03-01T10:00:01Z")));
    }

    #[tokio::test]
    async fn load_follows_pagination() {
        let store = MemoryStore::with_page_size(2);
        for raw in [
            "2020-03-03T00:00:00.000Z",
            "2020-03-01T00:00:00.000Z",
            "2020-03-02T00:00:00.000Z",
        ] {
            store
                .put(&historical_key(&ts(raw)), "[]".to_string())
                .await
                .unwrap();
        }
        store
            .put("cached_case_counts", "{}".to_string())
            .await
            .unwrap();

        let history = SnapshotHistory::load(&store).await.unwrap();
        assert_eq!(history.timestamps().len(), 3);
        assert_eq!(history.latest(), Some(&ts("2020-03-03T00:00:00.000Z")));
    }

    #[tokio::test]
    async fn newer_origin_writes_snapshot() {
        let store = MemoryStore::new();
        let mut history = SnapshotHistory::default();
        let origin = Utc.with_ymd_and_hms(2020, 3, 15, 3, 30, 0).unwrap();

        let written = history
            .record_if_newer(&store, Some(origin), &regional())
            .await
            .unwrap();

        assert_eq!(written, Some(ts("2020-03-15T03:30:00.000Z")));
        assert_eq!(history.latest(), written.as_ref());

        let stored: Option<Vec<RegionalRecord>> =
            get_json(&store, "case_counts/2020-03-15T03:30:00.000Z")
                .await
                .unwrap();
        assert_eq!(stored, Some(regional()));
    }

    #[tokio::test]
    async fn stale_or_unknown_origin_writes_nothing() {
        let store = MemoryStore::new();
        let mut history = SnapshotHistory::from_timestamps([ts("2020-03-15T03:30:00.000Z")]);
        let same = Utc.with_ymd_and_hms(2020, 3, 15, 3, 30, 0).unwrap();

        assert_eq!(
            history
                .record_if_newer(&store, Some(same), &regional())
                .await
                .unwrap(),
            None
        );
        assert_eq!(
            history
                .record_if_newer(&store, None, &regional())
                .await
                .unwrap(),
            None
        );
        assert!(store.is_empty().await);
        assert_eq!(history.timestamps().len(), 1);
    }
}
