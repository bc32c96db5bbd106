// src/services/lecture_scraper.rs

//! Crawl orchestration.
//!
//! One crawl walks top page → course lists → course details strictly in
//! sequence. Detail pages whose list metadata matches the stored lecture are
//! not fetched again. Each course list is persisted as one batch; related
//! course codes are resolved once the whole sweep is done.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{AppError, Result};
use crate::models::{CrawlerConfig, Lecture};
use crate::parser::{CourseListItem, PageParser};
use crate::services::{Fetcher, ProgressReporter, ScrapeProgress};
use crate::storage::LectureRepository;
use crate::utils::cancel::CancelToken;
use crate::utils::with_query_param;

/// Drives fetching, change detection and persistence.
pub struct LectureScraper<R> {
    fetcher: Arc<dyn Fetcher>,
    parser: Arc<dyn PageParser>,
    repository: R,
    top_page_url: String,
    english_param: (String, String),
    delay: Duration,
    cancel: CancelToken,
    reporter: Option<Arc<dyn ProgressReporter>>,
}

impl<R: LectureRepository> LectureScraper<R> {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        parser: Arc<dyn PageParser>,
        repository: R,
        config: &CrawlerConfig,
    ) -> Self {
        Self {
            fetcher,
            parser,
            repository,
            top_page_url: config.top_page_url.trim().to_string(),
            english_param: config.english_language_param.clone(),
            delay: Duration::from_millis(config.request_delay_ms),
            cancel: CancelToken::new(),
            reporter: None,
        }
    }

    /// Share a cancellation signal with the caller.
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn set_progress_reporter(&mut self, reporter: Option<Arc<dyn ProgressReporter>>) {
        self.reporter = reporter;
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn repository_mut(&mut self) -> &mut R {
        &mut self.repository
    }

    pub fn into_repository(self) -> R {
        self.repository
    }

    /// Fetch and parse one course list page.
    pub async fn scrape_course_list(
        &self,
        list_url: &str,
        base_url: &str,
    ) -> Result<Vec<CourseListItem>> {
        let list_url = list_url.trim();
        if list_url.is_empty() {
            return Err(AppError::validation("list url is required"));
        }

        let body = self.fetcher.fetch(list_url, &self.cancel).await?;
        self.parser.parse_course_list(&body, base_url)
    }

    /// Scrape every changed lecture of one course list and store them as a
    /// single batch. Returns the lectures that were stored.
    pub async fn scrape_course_list_and_save(
        &mut self,
        list_url: &str,
        base_url: &str,
    ) -> Result<Vec<Lecture>> {
        let items = unique_by_detail_url(self.scrape_course_list(list_url, base_url).await?);
        let total = items.len();
        self.report(ScrapeProgress {
            total,
            ..ScrapeProgress::default()
        });
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let mut lectures = Vec::with_capacity(total);
        let mut first_fetch = true;

        for (idx, item) in items.into_iter().enumerate() {
            self.cancel.check()?;
            self.report(ScrapeProgress {
                total,
                current: idx + 1,
                code: item.code.trim().to_string(),
                title: item.title.trim().to_string(),
            });

            let existing = self
                .repository
                .find_by_code(&item.code, &item.title, &item.open_term)?;
            if existing.is_some_and(|lecture| is_unchanged(&lecture, &item)) {
                log::debug!("Unchanged since last crawl: {} {}", item.code, item.title);
                continue;
            }

            if !first_fetch {
                self.pace().await?;
            }
            first_fetch = false;

            log::debug!("Scraping detail page: {} {}", item.code, item.title);
            let mut lecture = self.scrape_course_detail(&item.detail_url).await?;
            apply_list_metadata(&mut lecture, &item);
            lectures.push(lecture);
        }

        if lectures.is_empty() {
            return Ok(lectures);
        }

        self.repository.create_many(&mut lectures)?;
        log::info!("Saved {} of {} lectures from {}", lectures.len(), total, list_url.trim());
        Ok(lectures)
    }

    /// Fetch one detail page and enrich it with the English title.
    pub async fn scrape_course_detail(&self, detail_url: &str) -> Result<Lecture> {
        let detail_url = detail_url.trim();
        if detail_url.is_empty() {
            return Err(AppError::validation("detail url is required"));
        }

        let body = self.fetcher.fetch(detail_url, &self.cancel).await?;
        let mut lecture = self.parser.parse_course_detail(&body, detail_url)?;
        self.add_english_title(detail_url, &mut lecture).await?;
        Ok(lecture)
    }

    pub async fn scrape_course_detail_and_save(&mut self, detail_url: &str) -> Result<Lecture> {
        let mut lecture = self.scrape_course_detail(detail_url).await?;
        self.repository.create(&mut lecture)?;
        Ok(lecture)
    }

    /// Crawl every course list linked from the top page for `year`, then
    /// resolve related courses across everything stored so far.
    pub async fn scrape_top_page_and_save(&mut self, year: i32) -> Result<Vec<Lecture>> {
        let top_page_url = self.top_page_url.clone();
        let body = self.fetcher.fetch(&top_page_url, &self.cancel).await?;
        let list_urls = self.parser.list_course_pages(&body, &top_page_url, year)?;
        if list_urls.is_empty() {
            log::warn!("No course lists found for {year}");
            return Ok(Vec::new());
        }

        let mut seen = HashSet::new();
        let mut aggregated = Vec::new();
        let mut first_list = true;

        for list_url in list_urls {
            self.cancel.check()?;

            let list_url = list_url.trim();
            if list_url.is_empty() || !seen.insert(list_url.to_string()) {
                continue;
            }

            if !first_list {
                self.pace().await?;
            }
            first_list = false;

            let lectures = self
                .scrape_course_list_and_save(list_url, &top_page_url)
                .await
                .inspect_err(|e| {
                    if !e.is_cancelled() {
                        log::error!("scrape course list {list_url}: {e}");
                    }
                })?;
            aggregated.extend(lectures);
        }

        self.repository.migrate_related_courses()?;
        Ok(aggregated)
    }

    /// Crawl each year from `first_year` through `last_year`. Returns the
    /// number of lectures stored.
    pub async fn scrape_years(&mut self, first_year: i32, last_year: i32) -> Result<usize> {
        let mut stored = 0;
        for year in first_year..=last_year {
            self.cancel.check()?;
            if year != first_year {
                self.pace().await?;
            }
            log::info!("Crawling {year}");
            let lectures = self.scrape_top_page_and_save(year).await.inspect_err(|e| {
                if !e.is_cancelled() {
                    log::error!("scrape year {year}: {e}");
                }
            })?;
            stored += lectures.len();
        }
        Ok(stored)
    }

    /// Best effort: only cancellation escapes. The English page is paced like
    /// any other detail fetch.
    async fn add_english_title(&self, detail_url: &str, lecture: &mut Lecture) -> Result<()> {
        let (name, value) = &self.english_param;
        let english_url = match with_query_param(detail_url, name, value) {
            Ok(url) => url,
            Err(e) => {
                log::warn!("build english url for {detail_url}: {e}");
                return Ok(());
            }
        };

        self.pace().await?;
        match self.fetcher.fetch(&english_url, &self.cancel).await {
            Ok(body) => {
                if let Err(e) = self.parser.add_english_title(&body, lecture) {
                    log::warn!("add english title from {english_url}: {e}");
                }
            }
            Err(e) if e.is_cancelled() => return Err(e),
            Err(e) => log::warn!("fetch english title {english_url}: {e}"),
        }
        Ok(())
    }

    async fn pace(&self) -> Result<()> {
        if self.delay.is_zero() {
            return self.cancel.check();
        }
        self.cancel.sleep(self.delay).await
    }

    fn report(&self, progress: ScrapeProgress) {
        if let Some(reporter) = &self.reporter {
            reporter.report(&progress);
        }
    }
}

/// Keep the first row per trimmed detail URL; rows without one are dropped.
fn unique_by_detail_url(items: Vec<CourseListItem>) -> Vec<CourseListItem> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter_map(|mut item| {
            item.detail_url = item.detail_url.trim().to_string();
            (!item.detail_url.is_empty() && seen.insert(item.detail_url.clone())).then_some(item)
        })
        .collect()
}

/// Stored lecture matches the list row on title, code, open term and date.
fn is_unchanged(existing: &Lecture, item: &CourseListItem) -> bool {
    comparable(&existing.title) == comparable(&item.title)
        && comparable(&existing.code) == comparable(&item.code)
        && comparable(&existing.open_term) == comparable(&item.open_term)
        && existing.updated_at == item.updated_at
}

fn comparable(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// List values win for open term and date; code and title fill gaps.
fn apply_list_metadata(lecture: &mut Lecture, item: &CourseListItem) {
    if lecture.code.trim().is_empty() {
        lecture.code = item.code.trim().to_string();
    }
    if lecture.title.trim().is_empty() {
        lecture.title = item.title.trim().to_string();
    }
    let open_term = item.open_term.trim();
    if !open_term.is_empty() {
        lecture.open_term = open_term.to_string();
    }
    if item.updated_at.is_some() {
        lecture.updated_at = item.updated_at;
    }
}
