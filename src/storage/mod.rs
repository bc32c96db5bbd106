//! Storage abstractions for lecture persistence.
//!
//! The lecture aggregate is stored relationally:
//!
//! ```text
//! lectures ─┬─ lecture_teachers ── teachers
//!           ├─ timetables ── rooms
//!           ├─ lecture_plans
//!           ├─ lecture_keywords
//!           ├─ related_course_codes   (raw codes as printed)
//!           └─ related_courses        (resolved lecture → lecture edges)
//! ```
//!
//! Every write operation runs in a single transaction that rolls back on
//! any failure.

pub mod sqlite;

use crate::error::Result;
use crate::models::{Lecture, LectureSummary, SearchQuery, TimeTable};

// Re-export for convenience
pub use sqlite::SqliteStore;

/// Lecture aggregate repository.
pub trait LectureRepository {
    /// Load a full aggregate; `None` when the id does not exist.
    fn find_by_id(&self, id: i64) -> Result<Option<Lecture>>;

    /// Look a lecture up by its composite key (code, title, open term).
    fn find_by_code(&self, code: &str, title: &str, open_term: &str) -> Result<Option<Lecture>>;

    /// Summaries matching every constrained dimension of `query`.
    fn search(&self, query: &SearchQuery) -> Result<Vec<LectureSummary>>;

    /// Store one aggregate, filling in generated identifiers.
    fn create(&mut self, lecture: &mut Lecture) -> Result<()> {
        self.create_many(std::slice::from_mut(lecture))
    }

    /// Store a batch atomically and link related courses resolvable so far.
    fn create_many(&mut self, lectures: &mut [Lecture]) -> Result<()>;

    /// Not supported; always fails with [`crate::error::AppError::NotImplemented`].
    fn update(&mut self, lecture: &Lecture) -> Result<()>;

    /// Not supported; always fails with [`crate::error::AppError::NotImplemented`].
    fn delete(&mut self, id: i64) -> Result<()>;

    /// Resolve stored related-course codes into new edges. Returns the
    /// number of edges inserted.
    fn migrate_related_courses(&mut self) -> Result<usize>;
}

/// Timetable access and post-processing.
pub trait TimetableRepository {
    fn find_by_lecture_id(&self, lecture_id: i64) -> Result<Vec<TimeTable>>;

    /// Fill in periods omitted between two listed endpoints. Returns the
    /// number of rows inserted.
    fn expand_timetable_ranges(&mut self) -> Result<usize>;
}
