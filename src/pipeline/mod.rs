//! Pipeline entry points for crawler operations.
//!
//! - `run_crawl`, `run_crawl_all`, `run_crawl_list`, `run_crawl_detail`:
//!   scrape the syllabus site into the store
//! - `expand_timetables`, `migrate_related`: post-processing over stored rows
//! - `search`, `show`: read back stored lectures

pub mod crawl;
pub mod maintenance;
pub mod query;

pub use crawl::{build_scraper, run_crawl, run_crawl_all, run_crawl_detail, run_crawl_list};
pub use maintenance::{expand_timetables, migrate_related};
pub use query::{search, show};
