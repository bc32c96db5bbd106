//! Service layer for the syllabus crawler.
//!
//! This module contains:
//! - Page fetching (`Fetcher`, `HttpFetcher`)
//! - Progress reporting (`ProgressReporter`, `LogProgressReporter`)
//! - Crawl orchestration (`LectureScraper`)

mod fetcher;
mod progress;
mod lecture_scraper;

pub use fetcher::{Fetcher, HttpFetcher};
pub use progress::{LogProgressReporter, ProgressReporter, ScrapeProgress};
pub use lecture_scraper::LectureScraper;
