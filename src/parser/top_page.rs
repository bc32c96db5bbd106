// src/parser/top_page.rs

use std::collections::HashSet;

use regex::Regex;

use crate::error::{AppError, Result};

/// Absolute `{top}/courses/{year}/...` URLs in page order, without repeats.
pub(super) fn list_course_pages(html: &str, top_page_url: &str, year: i32) -> Result<Vec<String>> {
    let prefix = format!("{}/courses/{}/", top_page_url.trim_end_matches('/'), year);
    let pattern = Regex::new(&format!("{}[^\"']*", regex::escape(&prefix)))
        .map_err(|e| AppError::parse("top page pattern", e))?;

    let mut seen = HashSet::new();
    let urls: Vec<String> = pattern
        .find_iter(html)
        .map(|m| m.as_str().to_string())
        .filter(|url| seen.insert(url.clone()))
        .collect();

    log::debug!("Found {} course list pages for {}", urls.len(), year);
    Ok(urls)
}
