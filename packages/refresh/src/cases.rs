//! Case-count refresh.

use std::sync::Arc;

use async_trait::async_trait;
use case_tracker_case_models::{CombinedRecord, RegionalRecord};
use case_tracker_scraper::cases::extract_case_counts_with;
use case_tracker_scraper::columns::ColumnMapper;
use case_tracker_scraper::{
    HttpFetcher, PageFetcher, extract_notifications, extract_origin_update, validate_structure,
};
use case_tracker_store::KvStore;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::cache::{self, CachedViews};
use crate::config::{ConfigError, TrackerConfig};
use crate::history::SnapshotHistory;
use crate::series::build_day_series;
use crate::{RefreshError, SourceRefresher};

/// Refreshes case counts and notifications from the bulletin page.
pub struct CaseCountRefresher {
    fetcher: Arc<dyn PageFetcher>,
    store: Arc<dyn KvStore>,
    source_url: String,
    source_origin: String,
    mapper: ColumnMapper,
}

impl std::fmt::Debug for CaseCountRefresher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaseCountRefresher")
            .field("source_url", &self.source_url)
            .field("source_origin", &self.source_origin)
            .finish_non_exhaustive()
    }
}

impl CaseCountRefresher {
    /// Creates a refresher reading `source_url` with `fetcher`.
    ///
    /// `source_origin` prefixes site-relative notification links.
    #[must_use]
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        store: Arc<dyn KvStore>,
        source_url: impl Into<String>,
        source_origin: impl Into<String>,
    ) -> Self {
        Self {
            fetcher,
            store,
            source_url: source_url.into(),
            source_origin: source_origin.into(),
            mapper: ColumnMapper::default(),
        }
    }

    /// Creates a refresher with an HTTP fetcher built from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the HTTP client cannot be built or the
    /// source origin cannot be derived.
    pub fn from_config(
        config: &TrackerConfig,
        store: Arc<dyn KvStore>,
    ) -> Result<Self, ConfigError> {
        let fetcher = HttpFetcher::new(&config.user_agent, config.request_timeout())?;

        Ok(Self::new(
            Arc::new(fetcher),
            store,
            config.source_url.clone(),
            config.source_origin()?,
        ))
    }

    /// Replaces the header classifier.
    #[must_use]
    pub fn with_column_mapper(mut self, mapper: ColumnMapper) -> Self {
        self.mapper = mapper;
        self
    }
}

#[async_trait]
impl SourceRefresher for CaseCountRefresher {
    fn name(&self) -> &str {
        "cases"
    }

    async fn refresh(&self, debug: bool) -> Result<Value, RefreshError> {
        let page = self.fetcher.fetch(&self.source_url).await?;
        if !page.is_ok() {
            log::error!(
                "Source answered HTTP {} {}",
                page.status,
                page.status_text
            );
            return Err(RefreshError::Upstream {
                code: page.status,
                status: page.status_text,
                body: page.body,
            });
        }

        let refreshed_at = Utc::now();
        let content = page.body;

        let regional = extract_case_counts_with(&content, &self.mapper);
        validate_structure(&regional)?;
        log_defects(&regional);
        log::info!("Extracted {} regional records", regional.len());

        let origin_update = extract_origin_update(&content);
        match &origin_update {
            Some(instant) => log::info!("Origin update time {instant}"),
            None => log::warn!("No origin update time found, treating as unknown"),
        }

        let notifications = extract_notifications(&content, &self.source_origin);

        let store = self.store.as_ref();
        let mut history = SnapshotHistory::load(store).await?;
        history
            .record_if_newer(store, origin_update, &regional)
            .await?;

        if debug {
            log::info!("Debug mode, cached views left untouched");
            return Ok(serde_json::to_value(&regional)?);
        }

        let series = build_day_series(store, history.timestamps()).await?;

        cache::publish(
            store,
            CachedViews {
                current: CombinedRecord::from_regional(regional),
                notifications,
                history: series,
            },
            &refreshed_at,
            &origin_update.unwrap_or(DateTime::UNIX_EPOCH),
        )
        .await?;

        Ok(Value::Object(serde_json::Map::new()))
    }
}

fn log_defects(regional: &[RegionalRecord]) {
    for record in regional {
        let defects = record.defects();
        if defects.is_empty() {
            continue;
        }

        let fields: Vec<String> = defects.iter().map(ToString::to_string).collect();
        log::warn!(
            "Record {:?} has missing or unparseable {}",
            record.location.as_deref().unwrap_or("?"),
            fields.join(", ")
        );
    }
}
