// src/pipeline/query.rs

//! Read-side operations over stored lectures.

use crate::error::Result;
use crate::models::{Lecture, LectureSummary, SearchQuery, TimeTable};
use crate::storage::LectureRepository;
use crate::utils::log;

/// Run a structured search and list the matches.
pub fn search<S: LectureRepository>(store: &S, query: &SearchQuery) -> Result<Vec<LectureSummary>> {
    let results = store.search(query)?;
    for summary in &results {
        log::sub_item(&describe(summary));
    }
    log::summary("Search", &[("Matches", results.len().to_string())]);
    Ok(results)
}

/// Load one lecture aggregate.
pub fn show<S: LectureRepository>(store: &S, id: i64) -> Result<Option<Lecture>> {
    let lecture = store.find_by_id(id)?;
    if lecture.is_none() {
        ::log::warn!("Lecture {id} not found");
    }
    Ok(lecture)
}

/// One-line description: code, title, year, teachers and slots.
pub fn describe(summary: &LectureSummary) -> String {
    let mut line = format!("[{}] {} {}", summary.id, summary.code, summary.title);
    if summary.year > 0 {
        line.push_str(&format!(" ({})", summary.year));
    }
    if !summary.teachers.is_empty() {
        let names: Vec<&str> = summary.teachers.iter().map(|t| t.name.as_str()).collect();
        line.push_str(&format!(" / {}", names.join(", ")));
    }
    if !summary.timetables.is_empty() {
        let slots: Vec<String> = summary.timetables.iter().map(slot_label).collect();
        line.push_str(&format!(" / {}", slots.join(" ")));
    }
    line
}

fn slot_label(timetable: &TimeTable) -> String {
    let mut label = String::new();
    if let Some(semester) = timetable.semester {
        label.push_str(semester.as_str());
        label.push(' ');
    }
    if let Some(day) = timetable.day_of_week {
        label.push_str(&day.as_str()[..3]);
    }
    if let Some(period) = timetable.period {
        label.push_str(&period.to_string());
    }
    if let Some(room) = &timetable.room {
        label.push('@');
        label.push_str(&room.name);
    }
    label
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DayOfWeek, Room, Semester, Teacher};
    use crate::storage::SqliteStore;

    #[test]
    fn test_search_and_show() {
        let mut store = SqliteStore::in_memory().unwrap();
        let mut lecture = Lecture {
            university: "Test University".into(),
            code: "LAH.S101".into(),
            title: "哲学A".into(),
            year: 2025,
            ..Lecture::default()
        };
        store.create(&mut lecture).unwrap();

        let results = search(
            &store,
            &SearchQuery {
                title: "哲学".into(),
                ..SearchQuery::default()
            },
        )
        .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, lecture.id);

        assert_eq!(show(&store, lecture.id).unwrap().unwrap().code, "LAH.S101");
        assert!(show(&store, lecture.id + 100).unwrap().is_none());
    }

    #[test]
    fn test_describe() {
        let summary = LectureSummary {
            id: 7,
            code: "LAH.S101".into(),
            title: "哲学A".into(),
            year: 2025,
            teachers: vec![Teacher::named("山田 太郎")],
            timetables: vec![TimeTable {
                semester: Some(Semester::Fall),
                day_of_week: Some(DayOfWeek::Monday),
                period: Some(5),
                room: Some(Room::named("W241")),
                ..TimeTable::default()
            }],
            ..LectureSummary::default()
        };
        assert_eq!(
            describe(&summary),
            "[7] LAH.S101 哲学A (2025) / 山田 太郎 / fall mon5@W241"
        );
    }
}
