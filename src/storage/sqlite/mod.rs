//! SQLite-backed lecture store.
//!
//! One [`SqliteStore`] owns one connection. Read operations borrow it;
//! write operations take `&mut self` and run inside a single transaction
//! that is rolled back when dropped uncommitted.

mod lectures;
mod search;
mod timetables;

use std::path::Path;

use rusqlite::Connection;

use crate::error::{Result, StepContext};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS lectures (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    university TEXT NOT NULL,
    title TEXT NOT NULL,
    english_title TEXT,
    department TEXT,
    lecture_type TEXT,
    code TEXT,
    level INTEGER,
    credit INTEGER,
    year INTEGER,
    open_term TEXT,
    updated_at TEXT,
    language TEXT,
    url TEXT,
    abstract TEXT,
    goal TEXT,
    experience TEXT,
    flow TEXT,
    out_of_class_work TEXT,
    textbook TEXT,
    reference_book TEXT,
    assessment TEXT,
    prerequisite TEXT,
    contact TEXT,
    office_hours TEXT,
    note TEXT
);
CREATE INDEX IF NOT EXISTS idx_lectures_code ON lectures(code);

CREATE TABLE IF NOT EXISTS teachers (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    url TEXT
);

CREATE TABLE IF NOT EXISTS lecture_teachers (
    lecture_id INTEGER NOT NULL REFERENCES lectures(id) ON DELETE CASCADE,
    teacher_id INTEGER NOT NULL REFERENCES teachers(id) ON DELETE CASCADE,
    PRIMARY KEY (lecture_id, teacher_id)
);

CREATE TABLE IF NOT EXISTS rooms (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS timetables (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    lecture_id INTEGER NOT NULL REFERENCES lectures(id) ON DELETE CASCADE,
    semester TEXT,
    room_id INTEGER REFERENCES rooms(id),
    day_of_week TEXT,
    period INTEGER
);
CREATE INDEX IF NOT EXISTS idx_timetables_lecture ON timetables(lecture_id);

CREATE TABLE IF NOT EXISTS lecture_plans (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    lecture_id INTEGER NOT NULL REFERENCES lectures(id) ON DELETE CASCADE,
    count INTEGER,
    plan TEXT,
    assignment TEXT
);

CREATE TABLE IF NOT EXISTS lecture_keywords (
    lecture_id INTEGER NOT NULL REFERENCES lectures(id) ON DELETE CASCADE,
    keyword TEXT NOT NULL,
    PRIMARY KEY (lecture_id, keyword)
);

CREATE TABLE IF NOT EXISTS related_courses (
    lecture_id INTEGER NOT NULL REFERENCES lectures(id) ON DELETE CASCADE,
    related_lecture_id INTEGER NOT NULL REFERENCES lectures(id) ON DELETE CASCADE,
    PRIMARY KEY (lecture_id, related_lecture_id)
);

CREATE TABLE IF NOT EXISTS related_course_codes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    lecture_id INTEGER NOT NULL REFERENCES lectures(id) ON DELETE CASCADE,
    code TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_related_course_codes_lecture ON related_course_codes(lecture_id);
";

/// Lecture store over one SQLite connection.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) a database file and make sure the schema exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        log::debug!("Opening database {}", path.display());
        let conn = Connection::open(path).step("open database")?;
        let mut store = Self { conn };
        store.bootstrap()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().step("open in-memory database")?;
        let mut store = Self { conn };
        store.bootstrap()?;
        Ok(store)
    }

    fn bootstrap(&mut self) -> Result<()> {
        self.conn
            .execute_batch("PRAGMA foreign_keys = ON;")
            .step("enable foreign keys")?;
        self.conn.execute_batch(SCHEMA).step("create schema")
    }
}

/// Empty text is stored as NULL.
fn non_empty(value: &str) -> Option<&str> {
    let value = value.trim();
    (!value.is_empty()).then_some(value)
}

/// Zero is stored as NULL.
fn non_zero(value: i64) -> Option<i64> {
    (value != 0).then_some(value)
}

/// `?, ?, ?` for an `IN (...)` list.
fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

/// Course codes compare trimmed and upper-cased.
fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}
