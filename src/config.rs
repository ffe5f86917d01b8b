//! Configuration file parser for ~/.config/pagefeed/config.toml.
//!
//! The config file is optional: a missing file yields `Config::default()`.
//! Unknown keys are accepted by serde but logged as a warning, since they
//! are most likely typos.
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::feed::FilterCriteria;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("Invalid config value: {0}")]
    Invalid(String),
}

// ============================================================================
// Configuration
// ============================================================================

/// Language used when nothing else is configured.
pub const DEFAULT_LANGUAGE: &str = "en";

/// Category used when nothing else is configured.
pub const DEFAULT_CATEGORY: &str = "general";

/// Categories offered by the picker when the config does not list any.
pub const DEFAULT_CATEGORIES: &[&str] = &[
    "general",
    "business",
    "entertainment",
    "health",
    "science",
    "sports",
    "technology",
];

/// Top-level configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Category of the initial filter.
    pub category: String,

    /// Language of the initial filter.
    pub language: String,

    /// Categories accepted by the `filter` command.
    pub categories: Vec<String>,

    /// Articles per page served by the built-in source.
    pub page_size: usize,

    /// Page the initial load starts on (0 = first page).
    pub start_page: usize,

    /// Simulated latency per fetch, in milliseconds.
    pub latency_ms: u64,

    /// Fail every Nth fetch (0 = never). Useful to exercise retry.
    pub fail_every: u64,

    /// JSON fixture to serve instead of the generated demo corpus.
    pub fixture: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            category: DEFAULT_CATEGORY.to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
            categories: DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect(),
            page_size: 20,
            start_page: 0,
            latency_ms: 300,
            fail_every: 0,
            fixture: None,
        }
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: &'static [&'static str] = &[
        "category",
        "language",
        "categories",
        "page_size",
        "start_page",
        "latency_ms",
        "fail_every",
        "fixture",
    ];

    /// Default location: `$HOME/.config/pagefeed/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        let home = std::env::var_os("HOME")?;
        Some(
            PathBuf::from(home)
                .join(".config")
                .join("pagefeed")
                .join("config.toml"),
        )
    }

    /// Load configuration from a TOML file.
    ///
    /// A missing file yields the defaults; everything else goes through
    /// [`Config::parse`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let Some(content) = read_limited(path, Self::MAX_FILE_SIZE)? else {
            tracing::debug!(path = %path.display(), "No config file found, using defaults");
            return Ok(Self::default());
        };

        let config = Self::parse(&content)?;
        tracing::info!(
            path = %path.display(),
            category = %config.category,
            language = %config.language,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Parse and validate config text. Blank text yields the defaults.
    ///
    /// - Invalid TOML → `Err(ConfigError::Parse)`
    /// - `page_size = 0`, empty `categories` or blank `language` →
    ///   `Err(ConfigError::Invalid)`
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let table: toml::Table = content.parse()?;
        let unknown: Vec<&str> = table
            .keys()
            .map(String::as_str)
            .filter(|key| !Self::KNOWN_KEYS.contains(key))
            .collect();
        if !unknown.is_empty() {
            tracing::warn!(keys = ?unknown, "Unknown keys in config file, ignoring");
        }

        let config: Config = toml::Value::Table(table).try_into()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.page_size == 0 {
            return Err(ConfigError::Invalid("page_size must be at least 1".into()));
        }
        if self.categories.is_empty() {
            return Err(ConfigError::Invalid("categories must not be empty".into()));
        }
        if self.language.trim().is_empty() {
            return Err(ConfigError::Invalid("language must not be empty".into()));
        }
        Ok(())
    }

    /// Filter the feed starts with.
    pub fn initial_filter(&self) -> FilterCriteria {
        FilterCriteria::new(self.category.as_str(), self.language.as_str())
    }

    /// Whether `category` is one the picker offers.
    pub fn is_known_category(&self, category: &str) -> bool {
        self.categories.iter().any(|c| c == category)
    }
}

/// Read `path` as UTF-8, refusing anything over `max` bytes.
/// `Ok(None)` when the file does not exist.
fn read_limited(path: &Path, max: u64) -> Result<Option<String>, ConfigError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(ConfigError::Io(e)),
    };

    let mut content = String::new();
    file.take(max + 1).read_to_string(&mut content)?;
    if content.len() as u64 > max {
        return Err(ConfigError::TooLarge(format!("more than {max} bytes")));
    }
    Ok(Some(content))
}

// ============================================================================
// Tests
// ============================================================================
