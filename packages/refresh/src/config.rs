//! Tracker configuration.
//!
//! Read from a TOML file (`CASE_TRACKER_CONFIG`, default
//! `case_tracker.toml`) when present, otherwise defaults, then overridden
//! by `SOURCE_URL` and `DATA_DIR`.
//!
//! ```toml
//! source_url = "https://www.mohfw.gov.in"
//! request_timeout_secs = 30
//!
//! [store]
//! type = "r2"
//! bucket = "case-tracker"
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use case_tracker_r2::{R2Error, R2Store};
use case_tracker_scraper::ScrapeError;
use case_tracker_store::fs::FsStore;
use case_tracker_store::memory::MemoryStore;
use case_tracker_store::{DEFAULT_PAGE_SIZE, KvStore};
use serde::{Deserialize, Serialize};

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "CASE_TRACKER_CONFIG";

/// Config file read when [`CONFIG_PATH_ENV`] is unset.
pub const DEFAULT_CONFIG_PATH: &str = "case_tracker.toml";

/// Bulletin page fetched when nothing else is configured.
pub const DEFAULT_SOURCE_URL: &str = "https://www.mohfw.gov.in";

/// Root of the default filesystem store.
pub const DEFAULT_DATA_DIR: &str = "data/store";

/// Errors that can occur while loading configuration or opening the store.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file exists but could not be read.
    #[error("Failed to read config {}: {source}", .path.display())]
    Read {
        /// Config file path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The config file is not valid TOML for [`TrackerConfig`].
    #[error("Failed to parse config {}: {source}", .path.display())]
    Parse {
        /// Config file path.
        path: PathBuf,
        /// Underlying TOML error.
        source: toml::de::Error,
    },

    /// The source URL has no usable origin.
    #[error("Invalid source URL {url:?}: {reason}")]
    InvalidUrl {
        /// The configured URL.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// R2 store setup failed.
    #[error(transparent)]
    R2(#[from] R2Error),

    /// HTTP client setup failed.
    #[error(transparent)]
    Scrape(#[from] ScrapeError),
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Bulletin page to fetch.
    pub source_url: String,
    /// Prefix for site-relative notification links. Derived from
    /// `source_url` when unset.
    pub source_origin: Option<String>,
    /// `User-Agent` sent with the fetch.
    pub user_agent: String,
    /// Whole-request timeout for the fetch.
    pub request_timeout_secs: u64,
    /// Storage backend.
    pub store: StoreConfig,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            source_url: DEFAULT_SOURCE_URL.to_string(),
            source_origin: None,
            user_agent: format!("case_tracker/{}", env!("CARGO_PKG_VERSION")),
            request_timeout_secs: 60,
            store: StoreConfig::default(),
        }
    }
}

/// Storage backend selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreConfig {
    /// Process-local store; nothing survives a restart.
    Memory {
        /// Keys per listing call.
        #[serde(default)]
        list_page_size: Option<usize>,
    },
    /// One file per key under `root`.
    Fs {
        /// Store directory.
        root: PathBuf,
        /// Keys per listing call.
        #[serde(default)]
        list_page_size: Option<usize>,
    },
    /// Cloudflare R2 bucket, credentials from the environment.
    R2 {
        /// Bucket name.
        bucket: String,
        /// Keys per listing call.
        #[serde(default)]
        list_page_size: Option<usize>,
    },
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::Fs {
            root: PathBuf::from(DEFAULT_DATA_DIR),
            list_page_size: None,
        }
    }
}

impl StoreConfig {
    /// Configured listing page size, if any.
    #[must_use]
    pub const fn list_page_size(&self) -> Option<usize> {
        match self {
            Self::Memory { list_page_size }
            | Self::Fs { list_page_size, .. }
            | Self::R2 { list_page_size, .. } => *list_page_size,
        }
    }

    /// Opens the configured backend.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::R2`] if R2 credentials are missing.
    pub fn open(&self) -> Result<Arc<dyn KvStore>, ConfigError> {
        let page_size = self.list_page_size().unwrap_or(DEFAULT_PAGE_SIZE);

        let store: Arc<dyn KvStore> = match self {
            Self::Memory { .. } => {
                log::warn!("Using the in-memory store, nothing will be persisted");
                Arc::new(MemoryStore::with_page_size(page_size))
            }
            Self::Fs { root, .. } => {
                log::info!("Using filesystem store at {}", root.display());
                Arc::new(FsStore::with_page_size(root.clone(), page_size))
            }
            Self::R2 { bucket, .. } => {
                log::info!("Using R2 store in bucket {bucket}");
                Arc::new(R2Store::from_env(bucket, Some(page_size))?)
            }
        };

        Ok(store)
    }
}

impl TrackerConfig {
    /// Loads the config file, falling back to defaults when the default
    /// path does not exist, then applies environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if an explicitly named file is missing, a
    /// file cannot be parsed, or the resulting source URL is unusable.
    pub fn load() -> Result<Self, ConfigError> {
        let explicit = std::env::var(CONFIG_PATH_ENV).ok();
        let path = PathBuf::from(explicit.as_deref().unwrap_or(DEFAULT_CONFIG_PATH));

        let mut config = match std::fs::read_to_string(&path) {
            Ok(text) => {
                log::info!("Loading config from {}", path.display());
                Self::from_toml_str(&text).map_err(|source| ConfigError::Parse {
                    path: path.clone(),
                    source,
                })?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && explicit.is_none() => {
                log::debug!("No config at {}, using defaults", path.display());
                Self::default()
            }
            Err(source) => return Err(ConfigError::Read { path, source }),
        };

        config.apply_env_overrides(|name| std::env::var(name).ok());
        config.source_origin()?;

        Ok(config)
    }

    /// Parses a config from TOML text. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns the TOML error if the text is malformed.
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Applies `SOURCE_URL` and `DATA_DIR` from `lookup`.
    ///
    /// `DATA_DIR` selects the filesystem store rooted there.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("SOURCE_URL").filter(|v| !v.is_empty()) {
            self.source_url = url;
        }

        if let Some(dir) = lookup("DATA_DIR").filter(|v| !v.is_empty()) {
            self.store = StoreConfig::Fs {
                root: PathBuf::from(dir),
                list_page_size: self.store.list_page_size(),
            };
        }
    }

    /// Origin used to absolutize site-relative notification links, without
    /// a trailing `/`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidUrl`] if no origin is configured and
    /// `source_url` does not parse to one.
    pub fn source_origin(&self) -> Result<String, ConfigError> {
        if let Some(origin) = &self.source_origin {
            return Ok(origin.trim_end_matches('/').to_string());
        }

        let invalid = |reason: String| ConfigError::InvalidUrl {
            url: self.source_url.clone(),
            reason,
        };

        let url = reqwest::Url::parse(&self.source_url).map_err(|e| invalid(e.to_string()))?;
        let origin = url.origin();
        if !origin.is_tuple() {
            return Err(invalid("URL has no host origin".to_string()));
        }

        Ok(origin.ascii_serialization())
    }

    /// Fetch timeout as a [`Duration`].
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Opens the configured store.
    ///
    /// # Errors
    ///
    /// See [`StoreConfig::open`].
    pub fn open_store(&self) -> Result<Arc<dyn KvStore>, ConfigError> {
        self.store.open()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = TrackerConfig::from_toml_str("").unwrap();

        assert_eq!(config, TrackerConfig::default());
        assert_eq!(config.source_url, DEFAULT_SOURCE_URL);
        assert_eq!(
            config.store,
            StoreConfig::Fs {
                root: PathBuf::from(DEFAULT_DATA_DIR),
                list_page_size: None
            }
        );
    }

    #[test]
    fn parses_r2_store() {
        let config = TrackerConfig::from_toml_str(
            r#"
            source_url = "https://example.gov.in/covid"
            request_timeout_secs = 5

            [store]
            type = "r2"
            bucket = "tracker"
            list_page_size = 100
            "#,
        )
        .unwrap();

        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert_eq!(
            config.store,
            StoreConfig::R2 {
                bucket: "tracker".to_string(),
                list_page_size: Some(100)
            }
        );
    }

    #[test]
    fn unknown_store_type_is_rejected() {
        assert!(TrackerConfig::from_toml_str("[store]\ntype = \"redis\"").is_err());
    }

    #[test]
    fn env_overrides_url_and_data_dir() {
        let mut config = TrackerConfig {
            store: StoreConfig::Memory {
                list_page_size: Some(7),
            },
            ..TrackerConfig::default()
        };

        config.apply_env_overrides(|name| match name {
            "SOURCE_URL" => Some("http://localhost:9000/page".to_string()),
            "DATA_DIR" => Some("/tmp/tracker".to_string()),
            _ => None,
        });

        assert_eq!(config.source_url, "http://localhost:9000/page");
        assert_eq!(
            config.store,
            StoreConfig::Fs {
                root: PathBuf::from("/tmp/tracker"),
                list_page_size: Some(7)
            }
        );
    }

    #[test]
    fn empty_env_values_are_ignored() {
        let mut config = TrackerConfig::default();
        config.apply_env_overrides(|_| Some(String::new()));

        assert_eq!(config, TrackerConfig::default());
    }

    #[test]
    fn origin_is_derived_from_source_url() {
        let config = TrackerConfig {
            source_url: "https://www.mohfw.gov.in/index.php?x=1".to_string(),
            ..TrackerConfig::default()
        };
        assert_eq!(config.source_origin().unwrap(), "https://www.mohfw.gov.in");

        let local = TrackerConfig {
            source_url: "http://127.0.0.1:8081/bulletin".to_string(),
            ..TrackerConfig::default()
        };
        assert_eq!(local.source_origin().unwrap(), "http://127.0.0.1:8081");
    }

    #[test]
    fn explicit_origin_wins() {
        let config = TrackerConfig {
            source_origin: Some("https://mirror.example/".to_string()),
            ..TrackerConfig::default()
        };
        assert_eq!(config.source_origin().unwrap(), "https://mirror.example");
    }

    #[test]
    fn unparseable_source_url_is_an_error() {
        let config = TrackerConfig {
            source_url: "not a url".to_string(),
            ..TrackerConfig::default()
        };
        assert!(matches!(
            config.source_origin(),
            Err(ConfigError::InvalidUrl { .. })
        ));
    }

    #[tokio::test]
    async fn memory_store_opens() {
        let store = StoreConfig::Memory {
            list_page_size: None,
        }
        .open()
        .unwrap();

        store.put("k", "v".to_string()).await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
    }
}
