//! Timetable slots and the enums they are built from.

use serde::{Deserialize, Serialize};

/// Normalized teaching term, one per quarter of the academic year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Semester {
    Spring,
    Summer,
    Fall,
    Winter,
}

impl Semester {
    /// All semesters in calendar order.
    pub const ALL: [Semester; 4] = [
        Semester::Spring,
        Semester::Summer,
        Semester::Fall,
        Semester::Winter,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Semester::Spring => "spring",
            Semester::Summer => "summer",
            Semester::Fall => "fall",
            Semester::Winter => "winter",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "spring" => Some(Semester::Spring),
            "summer" => Some(Semester::Summer),
            "fall" | "autumn" => Some(Semester::Fall),
            "winter" => Some(Semester::Winter),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl DayOfWeek {
    pub fn as_str(&self) -> &'static str {
        match self {
            DayOfWeek::Monday => "monday",
            DayOfWeek::Tuesday => "tuesday",
            DayOfWeek::Wednesday => "wednesday",
            DayOfWeek::Thursday => "thursday",
            DayOfWeek::Friday => "friday",
            DayOfWeek::Saturday => "saturday",
            DayOfWeek::Sunday => "sunday",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "monday" | "mon" => Some(DayOfWeek::Monday),
            "tuesday" | "tue" => Some(DayOfWeek::Tuesday),
            "wednesday" | "wed" => Some(DayOfWeek::Wednesday),
            "thursday" | "thu" => Some(DayOfWeek::Thursday),
            "friday" | "fri" => Some(DayOfWeek::Friday),
            "saturday" | "sat" => Some(DayOfWeek::Saturday),
            "sunday" | "sun" => Some(DayOfWeek::Sunday),
            _ => None,
        }
    }

    /// Map the single-glyph day notation used on syllabus pages.
    pub fn from_glyph(glyph: &str) -> Option<Self> {
        match glyph {
            "月" => Some(DayOfWeek::Monday),
            "火" => Some(DayOfWeek::Tuesday),
            "水" => Some(DayOfWeek::Wednesday),
            "木" => Some(DayOfWeek::Thursday),
            "金" => Some(DayOfWeek::Friday),
            "土" => Some(DayOfWeek::Saturday),
            "日" => Some(DayOfWeek::Sunday),
            _ => None,
        }
    }
}

/// A classroom, deduplicated by exact name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    /// Database identifier (0 until stored)
    pub id: i64,
    pub name: String,
}

impl Room {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
        }
    }
}

/// One (semester, day, period, room) slot of a lecture.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeTable {
    pub lecture_id: i64,
    pub semester: Option<Semester>,
    pub day_of_week: Option<DayOfWeek>,
    pub period: Option<u32>,
    pub room: Option<Room>,
}
