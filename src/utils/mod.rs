//! Utility functions and helpers.

pub mod cancel;
pub mod http;
pub mod log;
pub mod text;

use url::Url;

use crate::error::{AppError, Result};

/// Resolve a potentially relative URL against a base URL.
pub fn resolve_url(base: &Url, href: &str) -> String {
    base.join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// Parse a base URL for link resolution, reporting failures as parse errors.
pub fn parse_base_url(base: &str) -> Result<Url> {
    Url::parse(base.trim()).map_err(|e| AppError::parse(format!("base url {base}"), e))
}

/// Return `url` with query parameter `name` forced to `value`.
///
/// Any existing occurrence of the parameter is replaced; other parameters
/// keep their order.
pub fn with_query_param(url: &str, name: &str, value: &str) -> Result<String> {
    let mut parsed = Url::parse(url)?;
    let kept: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(k, _)| k != name)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    {
        let mut pairs = parsed.query_pairs_mut();
        pairs.clear();
        for (k, v) in &kept {
            pairs.append_pair(k, v);
        }
        pairs.append_pair(name, value);
    }
    Ok(parsed.to_string())
}
