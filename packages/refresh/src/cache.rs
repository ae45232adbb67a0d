//! Serving-ready cached views.

use case_tracker_case_models::keys::{
    CACHED_CASE_COUNTS, CACHED_CASE_COUNTS_HISTORY, CACHED_NOTIFICATIONS,
};
use case_tracker_case_models::{
    CachedEntry, CombinedRecord, DaySeriesEntry, Notification, NotificationsPayload,
};
use case_tracker_store::{KvStore, StoreError, put_json};
use chrono::{DateTime, Utc};

/// Views published by one case-count refresh.
#[derive(Debug, Clone)]
pub struct CachedViews {
    /// Current summary and regional rows.
    pub current: CombinedRecord,
    /// Notifications in document order.
    pub notifications: Vec<Notification>,
    /// Day series over all snapshots.
    pub history: Vec<DaySeriesEntry>,
}

/// Writes the three cached entries concurrently.
///
/// Each entry carries the same `lastRefreshed` and `lastOriginUpdate`
/// stamps.
///
/// # Errors
///
/// Returns the first [`StoreError`] among the writes.
pub async fn publish(
    store: &dyn KvStore,
    views: CachedViews,
    refreshed_at: &DateTime<Utc>,
    origin_update: &DateTime<Utc>,
) -> Result<(), StoreError> {
    let current = CachedEntry::new(views.current, refreshed_at, origin_update);
    let notifications = CachedEntry::new(
        NotificationsPayload {
            notifications: views.notifications,
        },
        refreshed_at,
        origin_update,
    );
    let history = CachedEntry::new(views.history, refreshed_at, origin_update);

    tokio::try_join!(
        put_json(store, CACHED_CASE_COUNTS, &current),
        put_json(store, CACHED_NOTIFICATIONS, &notifications),
        put_json(store, CACHED_CASE_COUNTS_HISTORY, &history),
    )?;

    log::info!(
        "Published {CACHED_CASE_COUNTS}, {CACHED_NOTIFICATIONS}, {CACHED_CASE_COUNTS_HISTORY}"
    );
    Ok(())
}
