//! Search filter contract.

use serde::{Deserialize, Serialize};

use super::{DayOfWeek, Level, Semester};

/// A day/period pair to match against a lecture's timetable rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub day_of_week: Option<DayOfWeek>,
    pub period: Option<u32>,
}

/// Structured search query; empty fields impose no constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchQuery {
    /// Substring of the primary or English title (case-insensitive)
    pub title: String,
    /// Exact keyword membership
    pub keywords: Vec<String>,
    pub departments: Vec<String>,
    /// 0 means any year
    pub year: i64,
    /// Substring of a teacher name (case-insensitive)
    pub teacher_name: String,
    /// Substring of a room name (case-insensitive)
    pub room: String,
    pub semesters: Vec<Semester>,
    pub timetables: Vec<Slot>,
    pub levels: Vec<Level>,
    /// Drop research seminars, theses and similar titles
    pub exclude_research: bool,
}

impl SearchQuery {
    /// Whether the query constrains nothing.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}
