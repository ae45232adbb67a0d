//! Day series reconstruction.

use std::collections::BTreeMap;

use case_tracker_case_models::{
    CombinedRecord, DaySeriesEntry, HistoricalTimestamp, RegionalRecord,
};
use case_tracker_store::{KvStore, StoreError, get_json};
use futures::future::try_join_all;

/// Latest timestamp of each calendar day, ordered by day.
#[must_use]
pub fn latest_per_day(timestamps: &[HistoricalTimestamp]) -> Vec<&HistoricalTimestamp> {
    let mut by_day: BTreeMap<&str, &HistoricalTimestamp> = BTreeMap::new();

    for ts in timestamps {
        by_day
            .entry(ts.day())
            .and_modify(|current| {
                if ts > *current {
                    *current = ts;
                }
            })
            .or_insert(ts);
    }

    by_day.into_values().collect()
}

/// Loads the latest snapshot of each day and re-aggregates it.
///
/// Reads one snapshot per distinct day, concurrently. A listed snapshot
/// whose value has since disappeared is skipped.
///
/// # Errors
///
/// Returns [`StoreError`] if any read fails or a snapshot is not a valid
/// record array.
pub async fn build_day_series(
    store: &dyn KvStore,
    timestamps: &[HistoricalTimestamp],
) -> Result<Vec<DaySeriesEntry>, StoreError> {
    let days = latest_per_day(timestamps);

    let entries = try_join_all(days.into_iter().map(|ts| async move {
        let regional: Option<Vec<RegionalRecord>> = get_json(store, &ts.key()).await?;

        if regional.is_none() {
            log::warn!("Snapshot {ts} is listed but has no value, skipping");
        }

        Ok::<_, StoreError>(regional.map(|regional| DaySeriesEntry {
            day: ts.day().to_string(),
            record: CombinedRecord::from_regional(regional),
        }))
    }))
    .await?;

    let series: Vec<DaySeriesEntry> = entries.into_iter().flatten().collect();
    log::info!("Built day series with {} days", series.len());

    Ok(series)
}

#[cfg(test)]
mod tests {
    use case_tracker_case_models::Count;
    use case_tracker_store::memory::MemoryStore;
    use case_tracker_store::put_json;

    use super::*;

    fn ts(raw: &str) -> HistoricalTimestamp {
        HistoricalTimestamp::new(raw)
    }

    fn row(loc: &str, domestic: i64) -> RegionalRecord {
        RegionalRecord {
            location: Some(loc.to_string()),
            confirmed_domestic: Some(Count::Value(domestic)),
            confirmed_foreign: Some(Count::Value(0)),
            discharged: Some(Count::Value(0)),
            deaths: Some(Count::Value(0)),
        }
    }

    #[test]
    fn keeps_latest_timestamp_of_each_day() {
        let timestamps = [
            ts("2020-03-01T10:00:00Z"),
            ts("2020-03-01T18:00:00Z"),
            ts("2020-03-02T05:00:00Z"),
        ];

        assert_eq!(
            latest_per_day(&timestamps),
            vec![&timestamps[1], &timestamps[2]]
        );
    }

    #[test]
    fn input_order_does_not_matter() {
        let timestamps = [
            ts("2020-03-02T05:00:00.000Z"),
            ts("2020-03-01T18:00:00.000Z"),
            ts("2020-03-01T10:00:00.000Z"),
        ];

        let days: Vec<_> = latest_per_day(&timestamps)
            .into_iter()
            .map(HistoricalTimestamp::as_str)
            .collect();
        assert_eq!(
            days,
            vec!["2020-03-01T18:00:00.000Z", "2020-03-02T05:00:00.000Z"]
        );
    }

    #[test]
    fn empty_history_has_no_days() {
        assert!(latest_per_day(&[]).is_empty());
    }

    #[tokio::test]
    async fn series_reads_one_snapshot_per_day() {
        let store = MemoryStore::new();
        let timestamps = [
            ts("2020-03-01T10:00:00.000Z"),
            ts("2020-03-01T18:00:00.000Z"),
            ts("2020-03-02T05:00:00.000Z"),
        ];

        put_json(&store, &timestamps[0].key(), &[row("Delhi", 1)])
            .await
            .unwrap();
        put_json(&store, &timestamps[1].key(), &[row("Delhi", 4)])
            .await
            .unwrap();
        put_json(
            &store,
            &timestamps[2].key(),
            &[row("Delhi", 6), row("Kerala", 3)],
        )
        .await
        .unwrap();

        let series = build_day_series(&store, &timestamps).await.unwrap();

        assert_eq!(series.len(), 2);
        assert_eq!(series[0].day, "2020-03-01");
        assert_eq!(series[0].record.summary.total, Count::Value(4));
        assert_eq!(series[1].day, "2020-03-02");
        assert_eq!(series[1].record.summary.confirmed_domestic, Count::Value(9));
        assert_eq!(series[1].record.regional.len(), 2);
    }

    #[tokio::test]
    async fn missing_snapshot_is_skipped() {
        let store = MemoryStore::new();
        let timestamps = [
            ts("2020-03-01T10:00:00.000Z"),
            ts("2020-03-02T05:00:00.000Z"),
        ];
        put_json(&store, &timestamps[1].key(), &[row("Goa", 2)])
            .await
            .unwrap();

        let series = build_day_series(&store, &timestamps).await.unwrap();

        assert_eq!(series.len(), 1);
        assert_eq!(series[0].day, "2020-03-02");
    }
}
