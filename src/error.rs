// src/error.rs

//! Unified error handling for the syllabus crawler.

use std::fmt;

use thiserror::Error;

/// Result type alias for crawler operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client failure that is not tied to a single page
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network failure while fetching a page
    #[error("fetch {url}: {message}")]
    Fetch { url: String, message: String },

    /// Non-2xx response
    #[error("unexpected status {status} for {url}")]
    Status { url: String, status: u16 },

    /// Markup that cannot be read as a document
    #[error("parse {context}: {message}")]
    Parse { context: String, message: String },

    /// Missing mandatory aggregate fields
    #[error("Validation error: {0}")]
    Validation(String),

    /// SQL failure; the enclosing transaction has been rolled back
    #[error("{step}: {source}")]
    Persistence {
        step: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    /// Repository operation intentionally left unimplemented
    #[error("not implemented: {0}")]
    NotImplemented(&'static str),

    /// The caller's cancellation signal fired
    #[error("operation cancelled")]
    Cancelled,
}

impl AppError {
    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a fetch error for a URL.
    pub fn fetch(url: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Fetch {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Create a parse error with context.
    pub fn parse(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Parse {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Whether this error is a clean stop requested by the caller.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Attach the failing step to a rusqlite error.
pub trait StepContext<T> {
    fn step(self, step: &'static str) -> Result<T>;
}

impl<T> StepContext<T> for std::result::Result<T, rusqlite::Error> {
    fn step(self, step: &'static str) -> Result<T> {
        self.map_err(|source| AppError::Persistence { step, source })
    }
}
