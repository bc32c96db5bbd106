//! Structured lecture search.

use rusqlite::types::Value;
use rusqlite::{Connection, params_from_iter};

use super::lectures::load_teachers;
use super::placeholders;
use super::timetables::load_timetables;
use crate::error::{Result, StepContext};
use crate::models::{LectureSummary, Level, SearchQuery};

/// Title fragments of research seminars, theses, internships and other
/// lectures that are not regular coursework.
const RESEARCH_MARKERS: &[&str] = &[
    "研究",
    "卒業",
    "修士",
    "博士",
    "実験",
    "実習",
    "輪講",
    "ゼミ",
    "演習",
    "講究",
    "B2D",
    "リカレント研修",
    "オフキャンパスプロジェクト",
    "国際派遣プロジェクト",
    "インターンシップ",
    "学外研修",
    "論文研究計画論",
    "プレゼンテーション実践",
    "国際プレゼンテーション",
    "チュートリアル",
    "留学",
    "国際研究",
    "キャリアディベロップメント",
    "キャリア開発",
    "キャリア特別",
    "派遣プロジェクト",
    "企画実践",
    "先端研究",
];

/// Placeholder teacher names such as 各教員 or 指導教員 mark supervised
/// research rather than a taught course.
const RESEARCH_TEACHER_MARKER: &str = "教員";

/// Accumulates `AND` clauses and their bound values.
#[derive(Default)]
struct Filter {
    clauses: Vec<String>,
    args: Vec<Value>,
}

impl Filter {
    fn push(&mut self, clause: impl Into<String>, args: impl IntoIterator<Item = Value>) {
        self.clauses.push(clause.into());
        self.args.extend(args);
    }

    fn sql(&self) -> String {
        let mut sql = String::from(
            "SELECT l.id, l.university, l.title, l.english_title, l.department, l.code, \
             l.level, l.credit, l.year FROM lectures l",
        );
        if !self.clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY l.year DESC, l.title ASC, l.id ASC");
        sql
    }
}

pub(super) fn search(conn: &Connection, query: &SearchQuery) -> Result<Vec<LectureSummary>> {
    let filter = build_filter(query);
    let sql = filter.sql();
    log::debug!("Search SQL: {sql}");

    let mut stmt = conn.prepare(&sql).step("prepare search")?;
    let rows = stmt
        .query_map(params_from_iter(filter.args.iter()), |row| {
            let text = |idx: usize| -> rusqlite::Result<String> {
                Ok(row.get::<_, Option<String>>(idx)?.unwrap_or_default())
            };
            Ok(LectureSummary {
                id: row.get(0)?,
                university: text(1)?,
                title: text(2)?,
                english_title: text(3)?,
                department: text(4)?,
                code: text(5)?,
                level: row.get::<_, Option<i64>>(6)?.and_then(Level::from_i64),
                credit: row.get::<_, Option<i64>>(7)?.unwrap_or_default(),
                year: row.get::<_, Option<i64>>(8)?.unwrap_or_default(),
                timetables: Vec::new(),
                teachers: Vec::new(),
            })
        })
        .step("search lectures")?;

    let mut summaries = Vec::new();
    for row in rows {
        let summary = row.step("read search result")?;
        if query.exclude_research && is_research_title(&summary.title) {
            continue;
        }
        summaries.push(summary);
    }

    let ids: Vec<i64> = summaries.iter().map(|s| s.id).collect();
    let mut teachers = load_teachers(conn, &ids)?;
    for summary in &mut summaries {
        summary.teachers = teachers.remove(&summary.id).unwrap_or_default();
    }
    if query.exclude_research {
        summaries.retain(|summary| !is_research_summary(summary));
    }

    let ids: Vec<i64> = summaries.iter().map(|s| s.id).collect();
    let mut timetables = load_timetables(conn, &ids)?;
    for summary in &mut summaries {
        summary.timetables = timetables.remove(&summary.id).unwrap_or_default();
    }
    Ok(summaries)
}

fn build_filter(query: &SearchQuery) -> Filter {
    let mut filter = Filter::default();

    let title = query.title.trim();
    if !title.is_empty() {
        let pattern = like_pattern(title);
        filter.push(
            "(LOWER(l.title) LIKE ? ESCAPE '\\' OR LOWER(IFNULL(l.english_title, '')) LIKE ? ESCAPE '\\')",
            [Value::Text(pattern.clone()), Value::Text(pattern)],
        );
    }

    let teacher = query.teacher_name.trim();
    if !teacher.is_empty() {
        filter.push(
            "EXISTS (SELECT 1 FROM lecture_teachers lt JOIN teachers t ON t.id = lt.teacher_id \
             WHERE lt.lecture_id = l.id AND LOWER(t.name) LIKE ? ESCAPE '\\')",
            [Value::Text(like_pattern(teacher))],
        );
    }

    let departments = texts(&query.departments, false);
    if !departments.is_empty() {
        filter.push(
            format!("l.department IN ({})", placeholders(departments.len())),
            departments,
        );
    }

    if query.year > 0 {
        filter.push("l.year = ?", [Value::Integer(query.year)]);
    }

    if !query.levels.is_empty() {
        filter.push(
            format!("l.level IN ({})", placeholders(query.levels.len())),
            query.levels.iter().map(|level| Value::Integer(level.as_i64())),
        );
    }

    if let Some((clause, args)) = timetable_clause(query) {
        filter.push(clause, args);
    }

    let keywords = texts(&query.keywords, true);
    if !keywords.is_empty() {
        filter.push(
            format!(
                "EXISTS (SELECT 1 FROM lecture_keywords lk WHERE lk.lecture_id = l.id AND LOWER(lk.keyword) IN ({}))",
                placeholders(keywords.len())
            ),
            keywords,
        );
    }

    filter
}

/// Room, semester and slot conditions, all of which one timetable row must
/// satisfy. A slot matches on day and period only.
fn timetable_clause(query: &SearchQuery) -> Option<(String, Vec<Value>)> {
    let mut conditions = Vec::new();
    let mut args = Vec::new();

    let room = query.room.trim();
    if !room.is_empty() {
        conditions.push("LOWER(r.name) LIKE ? ESCAPE '\\'".to_string());
        args.push(Value::Text(like_pattern(room)));
    }

    if !query.semesters.is_empty() {
        conditions.push(format!(
            "tt.semester IN ({})",
            placeholders(query.semesters.len())
        ));
        args.extend(
            query
                .semesters
                .iter()
                .map(|semester| Value::Text(semester.as_str().to_string())),
        );
    }

    let mut slots = Vec::new();
    for slot in &query.timetables {
        let mut parts = Vec::new();
        if let Some(day) = slot.day_of_week {
            parts.push("tt.day_of_week = ?");
            args.push(Value::Text(day.as_str().to_string()));
        }
        if let Some(period) = slot.period {
            parts.push("tt.period = ?");
            args.push(Value::Integer(i64::from(period)));
        }
        if !parts.is_empty() {
            slots.push(format!("({})", parts.join(" AND ")));
        }
    }
    if !slots.is_empty() {
        conditions.push(format!("({})", slots.join(" OR ")));
    }

    if conditions.is_empty() {
        return None;
    }
    let clause = format!(
        "EXISTS (SELECT 1 FROM timetables tt LEFT JOIN rooms r ON r.id = tt.room_id \
         WHERE tt.lecture_id = l.id AND {})",
        conditions.join(" AND ")
    );
    Some((clause, args))
}

/// Trimmed non-empty values, optionally lower-cased.
fn texts(values: &[String], lowercase: bool) -> Vec<Value> {
    values
        .iter()
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .map(|value| {
            Value::Text(if lowercase {
                value.to_ascii_lowercase()
            } else {
                value.to_string()
            })
        })
        .collect()
}

/// `%needle%` with LIKE wildcards in the needle escaped.
///
/// SQLite's `LOWER()` folds ASCII only, so the needle is folded the same way.
fn like_pattern(needle: &str) -> String {
    let mut pattern = String::from("%");
    for c in needle.to_ascii_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn is_research_title(title: &str) -> bool {
    RESEARCH_MARKERS.iter().any(|marker| title.contains(marker))
}

fn is_research_summary(summary: &LectureSummary) -> bool {
    summary
        .teachers
        .iter()
        .any(|teacher| teacher.name.contains(RESEARCH_TEACHER_MARKER))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DayOfWeek, Semester, Slot};
    use crate::storage::{LectureRepository, SqliteStore};

    fn seed(store: &SqliteStore) {
        store
            .conn
            .execute_batch(
                "INSERT INTO lectures (id, university, title, english_title, department, code, level, credit, year)
                    VALUES (1, 'Test University', 'Data Science Basics', 'Introduction to Data', 'Computer Science', 'CS100', 1, 2, 2025);
                 INSERT INTO lectures (id, university, title, department, code, level, credit, year)
                    VALUES (2, 'Test University', 'Quantum Mechanics', 'Physics', 'PH200', 2, 4, 2024);
                 INSERT INTO teachers (id, name, url) VALUES (1, 'Alice Smith', 'https://example.com/teachers/alice');
                 INSERT INTO teachers (id, name, url) VALUES (2, 'Bob Brown', 'https://example.com/teachers/bob');
                 INSERT INTO lecture_teachers (lecture_id, teacher_id) VALUES (1, 1), (2, 2);
                 INSERT INTO lecture_keywords (lecture_id, keyword) VALUES (1, 'science'), (1, 'data'), (2, 'physics');
                 INSERT INTO timetables (lecture_id, day_of_week, period) VALUES (1, 'monday', 1);
                 INSERT INTO timetables (lecture_id, day_of_week, period) VALUES (2, 'tuesday', 3);",
            )
            .unwrap();
    }

    fn titles(results: &[LectureSummary]) -> Vec<&str> {
        results.iter().map(|s| s.title.as_str()).collect()
    }

    #[test]
    fn test_search_applies_combined_filters() {
        let store = SqliteStore::in_memory().unwrap();
        seed(&store);

        let results = store
            .search(&SearchQuery {
                teacher_name: "alice".into(),
                keywords: vec!["science".into()],
                timetables: vec![Slot {
                    day_of_week: Some(DayOfWeek::Monday),
                    period: Some(1),
                }],
                title: "data".into(),
                departments: vec!["Computer Science".into()],
                year: 2025,
                levels: vec![Level::Bachelor1],
                ..SearchQuery::default()
            })
            .unwrap();

        assert_eq!(results.len(), 1);
        let summary = &results[0];
        assert_eq!(summary.title, "Data Science Basics");
        assert_eq!(summary.level, Some(Level::Bachelor1));
        assert_eq!(summary.credit, 2);
        assert_eq!(summary.year, 2025);
        assert_eq!(summary.teachers.len(), 1);
        assert_eq!(summary.teachers[0].name, "Alice Smith");
        assert_eq!(summary.timetables.len(), 1);
        assert_eq!(summary.timetables[0].period, Some(1));
    }

    #[test]
    fn test_empty_query_orders_by_year_then_title() {
        let store = SqliteStore::in_memory().unwrap();
        seed(&store);
        store
            .conn
            .execute(
                "INSERT INTO lectures (id, university, title, year) VALUES (3, 'Test University', 'Algebra', 2025)",
                [],
            )
            .unwrap();

        let results = store.search(&SearchQuery::default()).unwrap();
        assert_eq!(
            titles(&results),
            vec!["Algebra", "Data Science Basics", "Quantum Mechanics"]
        );
    }

    #[test]
    fn test_title_matches_english_title_and_japanese_substring() {
        let store = SqliteStore::in_memory().unwrap();
        seed(&store);
        store
            .conn
            .execute_batch(
                "INSERT INTO lectures (id, university, title) VALUES (3, 'Test University', '機械学習概論');
                 INSERT INTO teachers (id, name) VALUES (3, '山田 太郎');
                 INSERT INTO lecture_teachers (lecture_id, teacher_id) VALUES (3, 3);",
            )
            .unwrap();

        let by_english = store
            .search(&SearchQuery {
                title: "INTRODUCTION".into(),
                ..SearchQuery::default()
            })
            .unwrap();
        assert_eq!(titles(&by_english), vec!["Data Science Basics"]);

        let by_japanese = store
            .search(&SearchQuery {
                title: "機械".into(),
                ..SearchQuery::default()
            })
            .unwrap();
        assert_eq!(titles(&by_japanese), vec!["機械学習概論"]);

        let by_teacher = store
            .search(&SearchQuery {
                teacher_name: "山田".into(),
                ..SearchQuery::default()
            })
            .unwrap();
        assert_eq!(titles(&by_teacher), vec!["機械学習概論"]);
    }

    #[test]
    fn test_filters_by_room() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .conn
            .execute_batch(
                "INSERT INTO lectures (id, university, title) VALUES (1, 'Test University', '線形代数');
                 INSERT INTO lectures (id, university, title) VALUES (2, 'Test University', '物理学実験');
                 INSERT INTO rooms (id, name) VALUES (1, 'W101'), (2, '別館ホール');
                 INSERT INTO timetables (lecture_id, day_of_week, period, room_id) VALUES (1, 'monday', 1, 1);
                 INSERT INTO timetables (lecture_id, day_of_week, period, room_id) VALUES (2, 'friday', 3, 2);",
            )
            .unwrap();

        let results = store
            .search(&SearchQuery {
                room: "101".into(),
                ..SearchQuery::default()
            })
            .unwrap();
        assert_eq!(titles(&results), vec!["線形代数"]);

        let other = store
            .search(&SearchQuery {
                room: "別館".into(),
                ..SearchQuery::default()
            })
            .unwrap();
        assert_eq!(titles(&other), vec!["物理学実験"]);
    }

    #[test]
    fn test_filters_by_semester() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .conn
            .execute_batch(
                "INSERT INTO lectures (id, university, title) VALUES (1, 'Test University', 'Spring Course');
                 INSERT INTO lectures (id, university, title) VALUES (2, 'Test University', 'Fall Course');
                 INSERT INTO timetables (lecture_id, semester, day_of_week, period) VALUES (1, 'spring', 'monday', 1);
                 INSERT INTO timetables (lecture_id, semester, day_of_week, period) VALUES (2, 'fall', 'monday', 1);",
            )
            .unwrap();

        let spring = store
            .search(&SearchQuery {
                semesters: vec![Semester::Spring],
                ..SearchQuery::default()
            })
            .unwrap();
        assert_eq!(titles(&spring), vec!["Spring Course"]);
        assert_eq!(spring[0].timetables[0].semester, Some(Semester::Spring));

        let fall = store
            .search(&SearchQuery {
                semesters: vec![Semester::Fall],
                ..SearchQuery::default()
            })
            .unwrap();
        assert_eq!(titles(&fall), vec!["Fall Course"]);
    }

    #[test]
    fn test_slots_match_any_listed_pair() {
        let store = SqliteStore::in_memory().unwrap();
        seed(&store);

        let results = store
            .search(&SearchQuery {
                timetables: vec![
                    Slot {
                        day_of_week: Some(DayOfWeek::Friday),
                        period: Some(5),
                    },
                    Slot {
                        day_of_week: Some(DayOfWeek::Tuesday),
                        period: Some(3),
                    },
                ],
                ..SearchQuery::default()
            })
            .unwrap();
        assert_eq!(titles(&results), vec!["Quantum Mechanics"]);

        let day_only = store
            .search(&SearchQuery {
                timetables: vec![Slot {
                    day_of_week: Some(DayOfWeek::Monday),
                    period: None,
                }],
                ..SearchQuery::default()
            })
            .unwrap();
        assert_eq!(titles(&day_only), vec!["Data Science Basics"]);
    }

    #[test]
    fn test_no_matches_is_empty() {
        let store = SqliteStore::in_memory().unwrap();
        seed(&store);
        let results = store
            .search(&SearchQuery {
                title: "non-existent".into(),
                ..SearchQuery::default()
            })
            .unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_exclude_research_titles() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .conn
            .execute_batch(
                "INSERT INTO lectures (id, university, title, level, year) VALUES (1, 'Test University', 'Algorithms', 1, 2025);
                 INSERT INTO lectures (id, university, title, level, year) VALUES (2, 'Test University', '特定課題研究プロジェクト', 1, 2025);",
            )
            .unwrap();

        assert_eq!(store.search(&SearchQuery::default()).unwrap().len(), 2);

        let filtered = store
            .search(&SearchQuery {
                exclude_research: true,
                ..SearchQuery::default()
            })
            .unwrap();
        assert_eq!(titles(&filtered), vec!["Algorithms"]);
    }

    #[test]
    fn test_semester_and_slot_must_match_same_timetable_row() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .conn
            .execute_batch(
                "INSERT INTO lectures (id, university, title) VALUES (1, 'Test University', 'Split');
                 INSERT INTO timetables (lecture_id, semester, day_of_week, period) VALUES (1, 'fall', 'monday', 1);
                 INSERT INTO timetables (lecture_id, semester, day_of_week, period) VALUES (1, 'spring', 'tuesday', 3);",
            )
            .unwrap();
        let query = |semester: Semester, day: DayOfWeek, period: u32| SearchQuery {
            semesters: vec![semester],
            timetables: vec![Slot {
                day_of_week: Some(day),
                period: Some(period),
            }],
            ..SearchQuery::default()
        };

        let crossed = store.search(&query(Semester::Spring, DayOfWeek::Monday, 1)).unwrap();
        assert!(crossed.is_empty());

        let same_row = store.search(&query(Semester::Spring, DayOfWeek::Tuesday, 3)).unwrap();
        assert_eq!(titles(&same_row), vec!["Split"]);
    }

    #[test]
    fn test_room_and_slot_must_match_same_timetable_row() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .conn
            .execute_batch(
                "INSERT INTO lectures (id, university, title) VALUES (1, 'Test University', 'Two Rooms');
                 INSERT INTO rooms (id, name) VALUES (1, 'W101'), (2, 'S221');
                 INSERT INTO timetables (lecture_id, day_of_week, period, room_id) VALUES (1, 'monday', 1, 1);
                 INSERT INTO timetables (lecture_id, day_of_week, period, room_id) VALUES (1, 'thursday', 2, 2);",
            )
            .unwrap();
        let query = |room: &str| SearchQuery {
            room: room.into(),
            timetables: vec![Slot {
                day_of_week: Some(DayOfWeek::Monday),
                period: Some(1),
            }],
            ..SearchQuery::default()
        };

        assert!(store.search(&query("S221")).unwrap().is_empty());
        assert_eq!(titles(&store.search(&query("w101")).unwrap()), vec!["Two Rooms"]);
    }

    #[test]
    fn test_levels_are_ored() {
        let store = SqliteStore::in_memory().unwrap();
        seed(&store);

        let results = store
            .search(&SearchQuery {
                levels: vec![Level::Bachelor1, Level::Bachelor2],
                ..SearchQuery::default()
            })
            .unwrap();
        assert_eq!(titles(&results), vec!["Data Science Basics", "Quantum Mechanics"]);

        // No year constraint alongside a level constraint
        let bachelor2 = store
            .search(&SearchQuery {
                levels: vec![Level::Bachelor2],
                year: 0,
                ..SearchQuery::default()
            })
            .unwrap();
        assert_eq!(titles(&bachelor2), vec!["Quantum Mechanics"]);
    }

    #[test]
    fn test_departments_are_ored() {
        let store = SqliteStore::in_memory().unwrap();
        seed(&store);

        let results = store
            .search(&SearchQuery {
                departments: vec!["Computer Science".into(), "Physics".into()],
                ..SearchQuery::default()
            })
            .unwrap();
        assert_eq!(titles(&results), vec!["Data Science Basics", "Quantum Mechanics"]);

        // No level constraint alongside a year constraint
        let physics_2024 = store
            .search(&SearchQuery {
                departments: vec!["Computer Science".into(), "Physics".into()],
                year: 2024,
                ..SearchQuery::default()
            })
            .unwrap();
        assert_eq!(titles(&physics_2024), vec!["Quantum Mechanics"]);
    }

    #[test]
    fn test_keywords_are_ored_and_ascii_case_insensitive() {
        let store = SqliteStore::in_memory().unwrap();
        seed(&store);

        let results = store
            .search(&SearchQuery {
                keywords: vec!["DATA".into(), "physics".into()],
                ..SearchQuery::default()
            })
            .unwrap();
        assert_eq!(titles(&results), vec!["Data Science Basics", "Quantum Mechanics"]);
    }

    #[test]
    fn test_title_with_fullwidth_letters() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .conn
            .execute(
                "INSERT INTO lectures (id, university, title) VALUES (1, 'Test University', '法学（憲法）Ａ')",
                [],
            )
            .unwrap();

        let results = store
            .search(&SearchQuery {
                title: "憲法）Ａ".into(),
                ..SearchQuery::default()
            })
            .unwrap();
        assert_eq!(titles(&results), vec!["法学（憲法）Ａ"]);
    }

    #[test]
    fn test_exclude_research_placeholder_teachers() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .conn
            .execute_batch(
                "INSERT INTO lectures (id, university, title, year) VALUES (1, 'Test University', 'Algorithms', 2025);
                 INSERT INTO lectures (id, university, title, year) VALUES (2, 'Test University', 'Special Topics', 2025);
                 INSERT INTO teachers (id, name) VALUES (1, '山田 太郎'), (2, '各教員');
                 INSERT INTO lecture_teachers (lecture_id, teacher_id) VALUES (1, 1), (2, 2);",
            )
            .unwrap();

        assert_eq!(store.search(&SearchQuery::default()).unwrap().len(), 2);

        let filtered = store
            .search(&SearchQuery {
                exclude_research: true,
                ..SearchQuery::default()
            })
            .unwrap();
        assert_eq!(titles(&filtered), vec!["Algorithms"]);
        assert_eq!(filtered[0].teachers[0].name, "山田 太郎");
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("100%_A"), "%100\\%\\_a%");
        assert_eq!(like_pattern("Ａb"), "%Ａb%");
    }
}
