//! Store keys.
//!
//! `cached_*` keys hold fully assembled responses that can be served
//! without parsing or assembly.

use crate::HistoricalTimestamp;

/// Namespace of the write-once historical snapshots (`case_counts/<ISO>`).
pub const CASE_COUNTS: &str = "case_counts";

/// Current summary + regional counts.
pub const CACHED_CASE_COUNTS: &str = "cached_case_counts";

/// Day series rebuilt from the historical snapshots.
pub const CACHED_CASE_COUNTS_HISTORY: &str = "cached_case_counts_history";

/// Hospital bed counts, written by the hospital-bed refresher.
pub const CACHED_HOSPITAL_BEDS_COUNT: &str = "cached_hospital_beds_count";

/// Helpline contacts.
pub const CACHED_CONTACTS: &str = "cached_contacts";

/// Notifications / advisories.
pub const CACHED_NOTIFICATIONS: &str = "cached_notifications";

/// Prefix for cached entries of unofficial sources.
pub const CACHED_UNOFFICIAL_SRC_PREFIX: &str = "cached_unofficial_src_";

/// Common prefix of every servable cached entry.
pub const CACHED_PREFIX: &str = "cached_";

/// Whether `key` names a cached entry (as opposed to a raw snapshot).
#[must_use]
pub fn is_cached_key(key: &str) -> bool {
    key.starts_with(CACHED_PREFIX)
}

/// Prefix shared by every historical snapshot key.
#[must_use]
pub fn historical_prefix() -> String {
    HistoricalTimestamp::prefix()
}

/// Store key of the snapshot taken at `timestamp`.
#[must_use]
pub fn historical_key(timestamp: &HistoricalTimestamp) -> String {
    timestamp.key()
}

/// Timestamp portion of a historical snapshot key.
#[must_use]
pub fn timestamp_from_key(key: &str) -> Option<HistoricalTimestamp> {
    HistoricalTimestamp::from_key(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn historical_key_helpers_agree() {
        let ts = HistoricalTimestamp::new("2020-03-15T03:30:00.000Z");
        let key = historical_key(&ts);

        assert_eq!(key, "case_counts/2020-03-15T03:30:00.000Z");
        assert!(key.starts_with(&historical_prefix()));
        assert_eq!(timestamp_from_key(&key), Some(ts));
    }

    #[test]
    fn only_cached_entries_are_cached_keys() {
        assert!(is_cached_key(CACHED_NOTIFICATIONS));
        assert!(is_cached_key("cached_unofficial_src_x"));
        assert!(!is_cached_key("case_counts/2020-03-15T03:30:00.000Z"));
    }
}
