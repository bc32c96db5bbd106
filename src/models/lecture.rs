//! Lecture aggregate and its owned child records.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::TimeTable;

/// Delivery format of a lecture.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LectureType {
    /// No delivery information on the page
    #[default]
    Unset,
    Offline,
    Live,
    Hyflex,
    Ondemand,
    Other,
}

impl LectureType {
    /// Stored representation; `None` for [`LectureType::Unset`].
    pub fn as_db(&self) -> Option<&'static str> {
        match self {
            LectureType::Unset => None,
            LectureType::Offline => Some("offline"),
            LectureType::Live => Some("live"),
            LectureType::Hyflex => Some("hyflex"),
            LectureType::Ondemand => Some("ondemand"),
            LectureType::Other => Some("other"),
        }
    }

    pub fn from_db(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("offline") => LectureType::Offline,
            Some("live") => LectureType::Live,
            Some("hyflex") => LectureType::Hyflex,
            Some("ondemand") => LectureType::Ondemand,
            Some("") | None => LectureType::Unset,
            Some(_) => LectureType::Other,
        }
    }
}

/// Course level: three bachelor years, two master years, doctor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Level {
    Bachelor1 = 1,
    Bachelor2 = 2,
    Bachelor3 = 3,
    Master1 = 4,
    Master2 = 5,
    Doctor = 6,
}

impl Level {
    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            1 => Some(Level::Bachelor1),
            2 => Some(Level::Bachelor2),
            3 => Some(Level::Bachelor3),
            4 => Some(Level::Master1),
            5 => Some(Level::Master2),
            6 => Some(Level::Doctor),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> i64 {
        *self as i64
    }
}

/// A teacher, shared between lectures.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Teacher {
    /// Database identifier (0 until stored)
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
}

impl Teacher {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            url: None,
        }
    }
}

/// One row of the weekly plan table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LecturePlan {
    pub count: i64,
    pub plan: String,
    pub assignment: String,
}

/// Lecture aggregate root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lecture {
    pub id: i64,
    pub university: String,
    pub title: String,
    pub english_title: String,
    pub department: String,
    pub lecture_type: LectureType,
    pub code: String,
    pub level: Option<Level>,
    pub credit: i64,
    pub year: i64,
    /// Open-term string as printed by the site, e.g. `2025 3Q`
    pub open_term: String,
    /// Last modification date reported by the site
    pub updated_at: Option<NaiveDate>,
    pub language: String,
    pub url: String,
    pub abstract_text: String,
    pub goal: String,
    pub experience: String,
    pub flow: String,
    pub out_of_class_work: String,
    pub textbook: String,
    pub reference_book: String,
    pub assessment: String,
    pub prerequisite: String,
    pub contact: String,
    pub office_hours: String,
    pub note: String,
    pub timetables: Vec<TimeTable>,
    pub teachers: Vec<Teacher>,
    pub lecture_plans: Vec<LecturePlan>,
    pub keywords: Vec<String>,
    /// Raw course codes as printed on the page
    pub related_course_codes: Vec<String>,
    /// Resolved lecture identifiers
    pub related_courses: Vec<i64>,
}

/// Search result row, enriched with timetables and teachers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LectureSummary {
    pub id: i64,
    pub university: String,
    pub title: String,
    pub english_title: String,
    pub department: String,
    pub code: String,
    pub level: Option<Level>,
    pub credit: i64,
    pub year: i64,
    pub timetables: Vec<TimeTable>,
    pub teachers: Vec<Teacher>,
}
