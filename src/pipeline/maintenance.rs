// src/pipeline/maintenance.rs

//! Post-processing passes over stored lectures.

use crate::error::Result;
use crate::storage::{LectureRepository, TimetableRepository};
use crate::utils::log;

/// Fill in timetable periods omitted between two listed endpoints.
pub fn expand_timetables<S: TimetableRepository>(store: &mut S) -> Result<usize> {
    let inserted = store.expand_timetable_ranges()?;
    log::success(&format!("Timetable expansion inserted {inserted} rows"));
    Ok(inserted)
}

/// Resolve stored related-course codes into lecture links.
pub fn migrate_related<S: LectureRepository>(store: &mut S) -> Result<usize> {
    log::header("Migrating related courses");
    let inserted = store.migrate_related_courses()?;
    log::success(&format!("Inserted {inserted} related course links"));
    Ok(inserted)
}
