// src/pipeline/crawl.rs

//! Syllabus crawling pipeline.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{Config, Lecture};
use crate::parser::HtmlParser;
use crate::services::{HttpFetcher, LectureScraper, LogProgressReporter};
use crate::storage::LectureRepository;
use crate::utils::cancel::CancelToken;
use crate::utils::log;

/// Wire the production fetcher, parser and progress log around `repository`.
pub fn build_scraper<R: LectureRepository>(
    config: &Config,
    repository: R,
    cancel: CancelToken,
) -> Result<LectureScraper<R>> {
    let fetcher = HttpFetcher::new(&config.crawler)?;
    let mut scraper = LectureScraper::new(
        Arc::new(fetcher),
        Arc::new(HtmlParser::new()),
        repository,
        &config.crawler,
    )
    .with_cancel_token(cancel);
    scraper.set_progress_reporter(Some(Arc::new(LogProgressReporter)));
    Ok(scraper)
}

/// Crawl one academic year from the top page.
pub async fn run_crawl<R: LectureRepository>(
    scraper: &mut LectureScraper<R>,
    year: i32,
) -> Result<usize> {
    let start_time = Utc::now();
    log::header(&format!("Crawling syllabus for {year}"));

    let lectures = scraper.scrape_top_page_and_save(year).await?;

    log::summary(
        "Crawl",
        &[
            ("Year", year.to_string()),
            ("Lectures stored", lectures.len().to_string()),
            ("Elapsed", elapsed(start_time)),
        ],
    );
    log::success("Crawl complete");
    Ok(lectures.len())
}

/// Crawl every year from `first_year` through `last_year`.
pub async fn run_crawl_all<R: LectureRepository>(
    scraper: &mut LectureScraper<R>,
    first_year: i32,
    last_year: i32,
) -> Result<usize> {
    let start_time = Utc::now();
    log::header(&format!("Crawling syllabus for {first_year}-{last_year}"));

    let stored = scraper.scrape_years(first_year, last_year).await?;

    log::summary(
        "Full crawl",
        &[
            ("Years", format!("{first_year}-{last_year}")),
            ("Lectures stored", stored.to_string()),
            ("Elapsed", elapsed(start_time)),
        ],
    );
    log::success("Full crawl complete");
    Ok(stored)
}

/// Crawl a single course list page.
pub async fn run_crawl_list<R: LectureRepository>(
    scraper: &mut LectureScraper<R>,
    list_url: &str,
    base_url: &str,
) -> Result<usize> {
    log::header(&format!("Crawling course list {list_url}"));
    let lectures = scraper.scrape_course_list_and_save(list_url, base_url).await?;
    for lecture in &lectures {
        log::sub_item(&format!("{} {}", lecture.code, lecture.title));
    }
    log::success(&format!("Stored {} lectures", lectures.len()));
    Ok(lectures.len())
}

/// Crawl and store a single course detail page.
pub async fn run_crawl_detail<R: LectureRepository>(
    scraper: &mut LectureScraper<R>,
    detail_url: &str,
) -> Result<Lecture> {
    log::header(&format!("Crawling course detail {detail_url}"));
    let lecture = scraper.scrape_course_detail_and_save(detail_url).await?;
    log::success(&format!(
        "Stored lecture {} ({} {})",
        lecture.id, lecture.code, lecture.title
    ));
    Ok(lecture)
}

fn elapsed(start_time: DateTime<Utc>) -> String {
    let seconds = (Utc::now() - start_time).num_milliseconds() as f64 / 1000.0;
    format!("{seconds:.1}s")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteStore;

    #[test]
    fn test_build_scraper_uses_given_token() {
        let cancel = CancelToken::new();
        let store = SqliteStore::in_memory().unwrap();
        let scraper = build_scraper(&Config::default(), store, cancel.clone()).unwrap();
        cancel.cancel();
        assert!(scraper.cancel_token().is_cancelled());
    }

    #[tokio::test]
    async fn test_run_crawl_detail_rejects_empty_url() {
        let store = SqliteStore::in_memory().unwrap();
        let mut scraper = build_scraper(&Config::default(), store, CancelToken::new()).unwrap();
        assert!(run_crawl_detail(&mut scraper, " ").await.is_err());
    }

    #[test]
    fn test_elapsed_format() {
        assert!(elapsed(Utc::now()).ends_with('s'));
    }
}
