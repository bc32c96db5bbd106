//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP and crawling behavior settings
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// SQLite database location
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Log filter used when `RUST_LOG` is unset
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.crawler.user_agent.trim().is_empty() {
            return Err(AppError::validation("crawler.user_agent is empty"));
        }
        if self.crawler.timeout_secs == 0 {
            return Err(AppError::validation("crawler.timeout_secs must be > 0"));
        }
        if let Err(e) = Url::parse(&self.crawler.top_page_url) {
            return Err(AppError::validation(format!(
                "crawler.top_page_url is not a valid URL: {e}"
            )));
        }
        if self.crawler.english_language_param.0.trim().is_empty() {
            return Err(AppError::validation(
                "crawler.english_language_param needs a parameter name",
            ));
        }
        if self.database.path.as_os_str().is_empty() {
            return Err(AppError::validation("database.path is empty"));
        }
        Ok(())
    }
}

/// HTTP client and crawling behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Delay between list fetches and between detail fetches in milliseconds
    #[serde(default = "defaults::request_delay")]
    pub request_delay_ms: u64,

    /// Root of the syllabus site; course list URLs are discovered from it
    #[serde(default = "defaults::top_page_url")]
    pub top_page_url: String,

    /// Query parameter (name, value) that selects the English page variant
    #[serde(default = "defaults::english_language_param")]
    pub english_language_param: (String, String),

    /// First academic year covered by a full sweep
    #[serde(default = "defaults::first_year")]
    pub first_year: i32,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            request_delay_ms: defaults::request_delay(),
            top_page_url: defaults::top_page_url(),
            english_language_param: defaults::english_language_param(),
            first_year: defaults::first_year(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "defaults::database_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: defaults::database_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    // Crawler defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; syllabus-crawler/0.1)".into()
    }
    pub fn timeout() -> u64 {
        15
    }
    pub fn request_delay() -> u64 {
        3000
    }
    pub fn top_page_url() -> String {
        "https://syllabus.s.isct.ac.jp".into()
    }
    pub fn english_language_param() -> (String, String) {
        ("hl".into(), "en".into())
    }
    pub fn first_year() -> i32 {
        2020
    }

    pub fn database_path() -> PathBuf {
        PathBuf::from("syllabus.db")
    }

    pub fn log_level() -> String {
        "info".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_user_agent() {
        let mut config = Config::default();
        config.crawler.user_agent = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_timeout() {
        let mut config = Config::default();
        config.crawler.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_top_page_url() {
        let mut config = Config::default();
        config.crawler.top_page_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_empty_database_path() {
        let mut config = Config::default();
        config.database.path = PathBuf::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let config: Config = toml::from_str(
            r#"
            [crawler]
            request_delay_ms = 500

            [database]
            path = "/tmp/test.db"
            "#,
        )
        .unwrap();
        assert_eq!(config.crawler.request_delay_ms, 500);
        assert_eq!(config.crawler.timeout_secs, 15);
        assert_eq!(config.crawler.top_page_url, "https://syllabus.s.isct.ac.jp");
        assert_eq!(config.database.path, PathBuf::from("/tmp/test.db"));
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn load_reads_file_and_reports_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[crawler]\nfirst_year = 2023\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.crawler.first_year, 2023);

        let missing = Config::load(dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(missing, AppError::Io(_)));
    }
}
