#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Case-count record types shared across the case tracker.
//!
//! The scraper produces [`RegionalRecord`]s from the bulletin table, the
//! refresh pipeline folds them into [`SummaryRecord`]s and
//! [`DaySeriesEntry`]s, and the store persists everything as JSON. Field
//! names on the wire match the documents already present in the store
//! (`loc`, `confirmedCasesIndian`, ...), so historical snapshots written by
//! earlier deployments remain readable.

pub mod keys;

use std::cmp::Ordering;
use std::fmt;
use std::iter::Sum;
use std::ops::Add;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum_macros::{AsRefStr, Display};

/// Formats an instant the way the store expects: UTC, millisecond
/// precision, `Z` designator (e.g. `2020-03-15T03:30:00.000Z`).
///
/// Fixed width for years 0000-9999, so lexicographic order matches
/// chronological order.
#[must_use]
pub fn iso_timestamp(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// A numeric count read from a table cell.
///
/// `Invalid` is what an unparseable cell turns into. It is not an error:
/// it flows into sums the way `NaN` would, poisoning the affected summary
/// field, and serializes as `null`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Count {
    /// A successfully parsed integer.
    Value(i64),
    /// The cell text held no leading integer.
    Invalid,
}

impl Count {
    /// Parses the leading integer of `text` after trimming whitespace.
    ///
    /// An optional sign is accepted and parsing stops at the first
    /// non-digit, so `"12*"` reads as `12` and `"1,204"` as `1`. Text with
    /// no leading digits yields [`Count::Invalid`].
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let trimmed = text.trim();
        let (negative, unsigned) = match trimmed.as_bytes().first() {
            Some(b'-') => (true, &trimmed[1..]),
            Some(b'+') => (false, &trimmed[1..]),
            _ => (false, trimmed),
        };
        let end = unsigned
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(unsigned.len());

        unsigned[..end]
            .parse::<i64>()
            .map_or(Self::Invalid, |n| Self::Value(if negative { -n } else { n }))
    }

    /// Returns the parsed value, if any.
    #[must_use]
    pub const fn value(self) -> Option<i64> {
        match self {
            Self::Value(n) => Some(n),
            Self::Invalid => None,
        }
    }

    /// Whether this count holds a parsed value.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        matches!(self, Self::Value(_))
    }
}

impl Default for Count {
    fn default() -> Self {
        Self::Value(0)
    }
}

impl Add for Count {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        match (self, rhs) {
            (Self::Value(a), Self::Value(b)) => a.checked_add(b).map_or(Self::Invalid, Self::Value),
            _ => Self::Invalid,
        }
    }
}

impl Sum for Count {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::Value(0), Add::add)
    }
}

impl fmt::Display for Count {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(n) => write!(f, "{n}"),
            Self::Invalid => f.write_str("NaN"),
        }
    }
}

impl Serialize for Count {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Value(n) => serializer.serialize_i64(*n),
            Self::Invalid => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for Count {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Option::<i64>::deserialize(deserializer)?.map_or(Self::Invalid, Self::Value))
    }
}

/// Keeps an explicit `null` distinct from a missing key: `null` becomes
/// `Some(Count::Invalid)`, a missing key falls back to `None` via
/// `#[serde(default)]`.
fn present_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Count>, D::Error> {
    Count::deserialize(deserializer).map(Some)
}

/// Semantic role of a bulletin table column, in lookup priority order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, AsRefStr,
)]
pub enum RegionalField {
    /// Name of the state / union territory.
    #[strum(serialize = "loc")]
    Location,
    /// Confirmed cases among domestic nationals.
    #[strum(serialize = "confirmedCasesIndian")]
    ConfirmedDomestic,
    /// Confirmed cases among foreign nationals.
    #[strum(serialize = "confirmedCasesForeign")]
    ConfirmedForeign,
    /// Cured / discharged / migrated.
    #[strum(serialize = "discharged")]
    Discharged,
    /// Deaths.
    #[strum(serialize = "deaths")]
    Deaths,
}

impl RegionalField {
    /// Every field, in lookup priority order.
    pub const ALL: [Self; 5] = [
        Self::Location,
        Self::ConfirmedDomestic,
        Self::ConfirmedForeign,
        Self::Discharged,
        Self::Deaths,
    ];

    /// The numeric fields.
    pub const COUNTS: [Self; 4] = [
        Self::ConfirmedDomestic,
        Self::ConfirmedForeign,
        Self::Discharged,
        Self::Deaths,
    ];
}

/// Case counts for a single location, one per bulletin table row.
///
/// A field is `None` when the table had no column for it; that is kept
/// distinct from a present-but-unparseable cell ([`Count::Invalid`]).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionalRecord {
    /// Location name.
    #[serde(rename = "loc", default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Confirmed cases, domestic nationals.
    #[serde(
        rename = "confirmedCasesIndian",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present_count"
    )]
    pub confirmed_domestic: Option<Count>,
    /// Confirmed cases, foreign nationals.
    #[serde(
        rename = "confirmedCasesForeign",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present_count"
    )]
    pub confirmed_foreign: Option<Count>,
    /// Discharged.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present_count"
    )]
    pub discharged: Option<Count>,
    /// Deaths.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present_count"
    )]
    pub deaths: Option<Count>,
}

impl RegionalRecord {
    /// Stores raw cell text into `field`. Location text is trimmed; counts
    /// are parsed with [`Count::parse`].
    pub fn set(&mut self, field: RegionalField, text: &str) {
        match field {
            RegionalField::Location => self.location = Some(text.trim().to_string()),
            RegionalField::ConfirmedDomestic => self.confirmed_domestic = Some(Count::parse(text)),
            RegionalField::ConfirmedForeign => self.confirmed_foreign = Some(Count::parse(text)),
            RegionalField::Discharged => self.discharged = Some(Count::parse(text)),
            RegionalField::Deaths => self.deaths = Some(Count::parse(text)),
        }
    }

    /// Returns the count stored for a numeric field. Always `None` for
    /// [`RegionalField::Location`].
    #[must_use]
    pub const fn count(&self, field: RegionalField) -> Option<Count> {
        match field {
            RegionalField::Location => None,
            RegionalField::ConfirmedDomestic => self.confirmed_domestic,
            RegionalField::ConfirmedForeign => self.confirmed_foreign,
            RegionalField::Discharged => self.discharged,
            RegionalField::Deaths => self.deaths,
        }
    }

    /// Number of fields that were populated from a column, including
    /// counts whose cell text did not parse.
    #[must_use]
    pub fn populated_fields(&self) -> usize {
        usize::from(self.location.is_some())
            + RegionalField::COUNTS
                .iter()
                .filter(|f| self.count(**f).is_some())
                .count()
    }

    /// Numeric fields that are missing or unparseable.
    #[must_use]
    pub fn defects(&self) -> Vec<RegionalField> {
        RegionalField::COUNTS
            .into_iter()
            .filter(|f| !self.count(*f).is_some_and(Count::is_valid))
            .collect()
    }

    /// Whether every numeric field holds a parsed value.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.defects().is_empty()
    }
}

/// Country-wide totals derived from the regional records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryRecord {
    /// `confirmed_domestic + confirmed_foreign`.
    pub total: Count,
    /// Sum of domestic confirmed cases.
    #[serde(rename = "confirmedCasesIndian")]
    pub confirmed_domestic: Count,
    /// Sum of foreign confirmed cases.
    #[serde(rename = "confirmedCasesForeign")]
    pub confirmed_foreign: Count,
    /// Sum of discharged.
    pub discharged: Count,
    /// Sum of deaths.
    pub deaths: Count,
}

impl SummaryRecord {
    /// Sums each numeric field across `regional`.
    ///
    /// A missing or unparseable value anywhere in a column makes that
    /// summary field [`Count::Invalid`]; no attempt is made to skip it.
    #[must_use]
    pub fn aggregate(regional: &[RegionalRecord]) -> Self {
        let column = |field: RegionalField| -> Count {
            regional
                .iter()
                .map(|r| r.count(field).unwrap_or(Count::Invalid))
                .sum()
        };

        let confirmed_domestic = column(RegionalField::ConfirmedDomestic);
        let confirmed_foreign = column(RegionalField::ConfirmedForeign);

        Self {
            total: confirmed_domestic + confirmed_foreign,
            confirmed_domestic,
            confirmed_foreign,
            discharged: column(RegionalField::Discharged),
            deaths: column(RegionalField::Deaths),
        }
    }
}

/// Summary plus the regional rows it was computed from, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombinedRecord {
    /// Totals over `regional`.
    pub summary: SummaryRecord,
    /// Per-location rows.
    pub regional: Vec<RegionalRecord>,
}

impl CombinedRecord {
    /// Builds the combined record, computing the summary from `regional`.
    #[must_use]
    pub fn from_regional(regional: Vec<RegionalRecord>) -> Self {
        Self {
            summary: SummaryRecord::aggregate(&regional),
            regional,
        }
    }
}

/// An advisory or notice linked from the bulletin page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Link text with markup stripped and whitespace collapsed.
    pub title: String,
    /// Absolute URL.
    pub link: String,
}

/// Payload of the cached notifications entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationsPayload {
    /// Notifications in document order.
    pub notifications: Vec<Notification>,
}

/// The latest snapshot of one calendar day, re-aggregated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaySeriesEntry {
    /// `YYYY-MM-DD` (UTC).
    pub day: String,
    /// Summary and regional rows of that day's latest snapshot.
    #[serde(flatten)]
    pub record: CombinedRecord,
}

/// ISO-8601 UTC timestamp identifying a historical snapshot.
///
/// Kept as the exact string used in the store key. All values written by
/// this crate are fixed-width UTC with a `Z` designator, so the derived
/// string ordering is chronological and the first ten characters are the
/// calendar day.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistoricalTimestamp(String);

impl HistoricalTimestamp {
    /// Formats `instant` with [`iso_timestamp`].
    #[must_use]
    pub fn from_datetime(instant: &DateTime<Utc>) -> Self {
        Self(iso_timestamp(instant))
    }

    /// Wraps an already-formatted ISO timestamp.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Extracts the timestamp segment (between the first and second `/`)
    /// of a historical store key.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        key.split('/')
            .nth(1)
            .filter(|segment| !segment.is_empty())
            .map(Self::new)
    }

    /// Key prefix under which all snapshots live.
    #[must_use]
    pub fn prefix() -> String {
        format!("{}/", keys::CASE_COUNTS)
    }

    /// Store key of the snapshot taken at this timestamp.
    #[must_use]
    pub fn key(&self) -> String {
        format!("{}/{}", keys::CASE_COUNTS, self.0)
    }

    /// The `YYYY-MM-DD` day this timestamp falls on.
    #[must_use]
    pub fn day(&self) -> &str {
        self.0.get(..10).unwrap_or(&self.0)
    }

    /// Parses the timestamp into an instant.
    #[must_use]
    pub fn instant(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.0)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// Orders by instant when both sides parse, otherwise by the raw
    /// string. Keys written with and without fractional seconds compare
    /// correctly this way.
    #[must_use]
    pub fn chronological_cmp(&self, other: &Self) -> Ordering {
        match (self.instant(), other.instant()) {
            (Some(a), Some(b)) => a.cmp(&b).then_with(|| self.0.cmp(&other.0)),
            _ => self.0.cmp(&other.0),
        }
    }

    /// The raw ISO string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HistoricalTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Serving-ready cached blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedEntry<T> {
    /// Always `true` for entries written by a refresh.
    pub success: bool,
    /// The cached view.
    pub data: T,
    /// When this refresh ran.
    pub last_refreshed: String,
    /// Origin update time reported by the bulletin, epoch when unknown.
    pub last_origin_update: String,
}

impl<T> CachedEntry<T> {
    /// Wraps `data` with refresh metadata.
    #[must_use]
    pub fn new(data: T, refreshed_at: &DateTime<Utc>, origin_update: &DateTime<Utc>) -> Self {
        Self {
            success: true,
            data,
            last_refreshed: iso_timestamp(refreshed_at),
            last_origin_update: iso_timestamp(origin_update),
        }
    }
}
