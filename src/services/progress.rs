// src/services/progress.rs

//! Crawl progress side channel.

use serde::Serialize;

/// Position within the current course list.
///
/// `current == 0` announces the batch size before any item is processed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScrapeProgress {
    pub total: usize,
    pub current: usize,
    pub code: String,
    pub title: String,
}

/// Receives progress updates. Reporting never affects the crawl.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, progress: &ScrapeProgress);
}

/// Writes progress through the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogProgressReporter;

impl ProgressReporter for LogProgressReporter {
    fn report(&self, progress: &ScrapeProgress) {
        if progress.current == 0 {
            log::info!("Course list has {} entries", progress.total);
        } else {
            log::info!(
                "[{}/{}] {} {}",
                progress.current,
                progress.total,
                progress.code,
                progress.title
            );
        }
    }
}
