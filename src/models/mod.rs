// src/models/mod.rs

//! Domain models for the syllabus crawler.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod lecture;
mod search;
mod timetable;

// Re-export all public types
pub use config::{Config, CrawlerConfig, DatabaseConfig, LoggingConfig};
pub use lecture::{Lecture, LecturePlan, LectureSummary, LectureType, Level, Teacher};
pub use search::{SearchQuery, Slot};
pub use timetable::{DayOfWeek, Room, Semester, TimeTable};

/// University name stored on every lecture from the supported site.
pub const UNIVERSITY: &str = "東京科学大学";
