//! Lecture aggregate persistence and related-course resolution.

use std::collections::{BTreeSet, HashMap, HashSet};

use rusqlite::{Connection, OptionalExtension, Row, Transaction, params, params_from_iter};

use super::timetables::load_timetables;
use super::{SqliteStore, non_empty, non_zero, normalize_code, placeholders};
use crate::error::{AppError, Result, StepContext};
use crate::models::{Lecture, LecturePlan, LectureSummary, LectureType, Level, SearchQuery, Teacher};
use crate::storage::LectureRepository;

const LECTURE_COLUMNS: &str = "id, university, title, english_title, department, lecture_type, \
     code, level, credit, year, open_term, updated_at, language, url, abstract, goal, experience, \
     flow, out_of_class_work, textbook, reference_book, assessment, prerequisite, contact, \
     office_hours, note";

impl LectureRepository for SqliteStore {
    fn find_by_id(&self, id: i64) -> Result<Option<Lecture>> {
        let lecture = self
            .conn
            .query_row(
                &format!("SELECT {LECTURE_COLUMNS} FROM lectures WHERE id = ?1"),
                params![id],
                map_lecture,
            )
            .optional()
            .step("select lecture")?;

        let Some(mut lecture) = lecture else {
            return Ok(None);
        };
        load_children(&self.conn, &mut lecture)?;
        Ok(Some(lecture))
    }

    /// Rows sharing the key are revisions of one lecture; the latest wins.
    fn find_by_code(&self, code: &str, title: &str, open_term: &str) -> Result<Option<Lecture>> {
        let lecture = self
            .conn
            .query_row(
                &format!(
                    "SELECT {LECTURE_COLUMNS} FROM lectures
                     WHERE TRIM(code) = ?1 AND TRIM(title) = ?2 AND IFNULL(open_term, '') = ?3
                     ORDER BY id DESC LIMIT 1"
                ),
                params![code.trim(), title.trim(), open_term.trim()],
                map_lecture,
            )
            .optional()
            .step("select lecture by code")?;

        let Some(mut lecture) = lecture else {
            return Ok(None);
        };
        load_children(&self.conn, &mut lecture)?;
        Ok(Some(lecture))
    }

    fn search(&self, query: &SearchQuery) -> Result<Vec<LectureSummary>> {
        super::search::search(&self.conn, query)
    }

    fn create_many(&mut self, lectures: &mut [Lecture]) -> Result<()> {
        if lectures.is_empty() {
            return Ok(());
        }

        let tx = self.conn.transaction().step("begin create lectures")?;

        let mut teacher_ids = HashMap::new();
        let mut stored = Vec::with_capacity(lectures.len());
        for lecture in lectures.iter() {
            stored.push(Self::insert_lecture_tx(&tx, lecture, &mut teacher_ids)?);
        }
        Self::link_related_tx(&tx, &mut stored)?;

        tx.commit().step("commit create lectures")?;

        // Identifiers are only handed back once the batch is durable
        for (lecture, stored) in lectures.iter_mut().zip(stored) {
            *lecture = stored;
        }
        log::debug!("Stored {} lectures", lectures.len());
        Ok(())
    }

    fn update(&mut self, _lecture: &Lecture) -> Result<()> {
        Err(AppError::NotImplemented("update lecture"))
    }

    fn delete(&mut self, _id: i64) -> Result<()> {
        Err(AppError::NotImplemented("delete lecture"))
    }

    fn migrate_related_courses(&mut self) -> Result<usize> {
        let tx = self.conn.transaction().step("begin migrate related courses")?;

        let rows: Vec<(i64, String)> = {
            let mut stmt = tx
                .prepare("SELECT lecture_id, code FROM related_course_codes ORDER BY lecture_id, id")
                .step("select related course codes")?;
            let rows: Vec<(i64, String)> = stmt
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
                .step("select related course codes")?
                .collect::<rusqlite::Result<Vec<_>>>()
                .step("read related course codes")?;
            rows
        };

        let codes: BTreeSet<String> = rows
            .iter()
            .map(|(_, code)| normalize_code(code))
            .filter(|code| !code.is_empty())
            .collect();
        let code_to_id = lookup_codes(&tx, &codes)?;

        let mut inserted = 0;
        {
            let mut stmt = tx
                .prepare(
                    "INSERT OR IGNORE INTO related_courses (lecture_id, related_lecture_id) VALUES (?1, ?2)",
                )
                .step("prepare migrated related course insert")?;
            let mut seen = HashSet::new();
            for (lecture_id, code) in &rows {
                let Some(&related_id) = code_to_id.get(&normalize_code(code)) else {
                    continue;
                };
                if related_id == *lecture_id || !seen.insert((*lecture_id, related_id)) {
                    continue;
                }
                inserted += stmt
                    .execute(params![lecture_id, related_id])
                    .step("insert migrated related course")?;
            }
        }

        tx.commit().step("commit migrate related courses")?;
        log::info!("Migrated {inserted} related course links");
        Ok(inserted)
    }
}

impl SqliteStore {
    /// Insert one aggregate and return a copy carrying the generated ids.
    ///
    /// `teacher_ids` maps lower-cased teacher names to ids for the whole batch.
    fn insert_lecture_tx(
        tx: &Transaction<'_>,
        lecture: &Lecture,
        teacher_ids: &mut HashMap<String, i64>,
    ) -> Result<Lecture> {
        let mut stored = lecture.clone();
        stored.university = lecture.university.trim().to_string();
        stored.title = lecture.title.trim().to_string();
        stored.code = lecture.code.trim().to_string();
        stored.related_course_codes = sanitize_codes(&lecture.related_course_codes);

        if stored.university.is_empty() {
            return Err(AppError::validation(format!(
                "lecture {:?}: university is required",
                stored.code
            )));
        }
        if stored.title.is_empty() {
            return Err(AppError::validation(format!(
                "lecture {:?}: title is required",
                stored.code
            )));
        }

        tx.execute(
            "INSERT INTO lectures (university, title, english_title, department, lecture_type,
                code, level, credit, year, open_term, updated_at, language, url, abstract, goal,
                experience, flow, out_of_class_work, textbook, reference_book, assessment,
                prerequisite, contact, office_hours, note)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17,
                ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25)",
            params![
                stored.university,
                stored.title,
                non_empty(&stored.english_title),
                non_empty(&stored.department),
                stored.lecture_type.as_db(),
                non_empty(&stored.code),
                stored.level.map(|level| level.as_i64()),
                non_zero(stored.credit),
                non_zero(stored.year),
                non_empty(&stored.open_term),
                stored.updated_at,
                non_empty(&stored.language),
                non_empty(&stored.url),
                non_empty(&stored.abstract_text),
                non_empty(&stored.goal),
                non_empty(&stored.experience),
                non_empty(&stored.flow),
                non_empty(&stored.out_of_class_work),
                non_empty(&stored.textbook),
                non_empty(&stored.reference_book),
                non_empty(&stored.assessment),
                non_empty(&stored.prerequisite),
                non_empty(&stored.contact),
                non_empty(&stored.office_hours),
                non_empty(&stored.note),
            ],
        )
        .step("insert lecture")?;
        stored.id = tx.last_insert_rowid();

        stored.teachers = Self::insert_teachers_tx(tx, stored.id, &stored.teachers, teacher_ids)?;
        Self::insert_timetables_tx(tx, &mut stored)?;
        stored.lecture_plans = Self::insert_plans_tx(tx, stored.id, &stored.lecture_plans)?;
        stored.keywords = Self::insert_keywords_tx(tx, stored.id, &stored.keywords)?;
        Self::insert_related_codes_tx(tx, stored.id, &stored.related_course_codes)?;

        Ok(stored)
    }

    fn insert_teachers_tx(
        tx: &Transaction<'_>,
        lecture_id: i64,
        teachers: &[Teacher],
        teacher_ids: &mut HashMap<String, i64>,
    ) -> Result<Vec<Teacher>> {
        let mut seen = HashSet::new();
        let mut stored = Vec::with_capacity(teachers.len());

        for teacher in teachers {
            let name = teacher.name.trim();
            let key = name.to_lowercase();
            if name.is_empty() || !seen.insert(key.clone()) {
                continue;
            }
            let url = teacher.url.as_deref().and_then(non_empty);
            let id = match teacher_ids.get(&key) {
                Some(&id) => {
                    Self::refresh_teacher_url_tx(tx, id, url)?;
                    id
                }
                None => {
                    let id = Self::ensure_teacher_tx(tx, name, url)?;
                    teacher_ids.insert(key, id);
                    id
                }
            };

            tx.execute(
                "INSERT OR IGNORE INTO lecture_teachers (lecture_id, teacher_id) VALUES (?1, ?2)",
                params![lecture_id, id],
            )
            .step("link lecture teacher")?;

            stored.push(Teacher {
                id,
                name: name.to_string(),
                url: url.map(str::to_string),
            });
        }
        Ok(stored)
    }

    /// Reuse a teacher stored under exactly this name, refreshing its URL.
    fn ensure_teacher_tx(tx: &Transaction<'_>, name: &str, url: Option<&str>) -> Result<i64> {
        let existing: Option<i64> = tx
            .query_row("SELECT id FROM teachers WHERE name = ?1", params![name], |row| row.get(0))
            .optional()
            .step("select teacher")?;

        if let Some(id) = existing {
            Self::refresh_teacher_url_tx(tx, id, url)?;
            return Ok(id);
        }

        tx.execute("INSERT INTO teachers (name, url) VALUES (?1, ?2)", params![name, url])
            .step("insert teacher")?;
        Ok(tx.last_insert_rowid())
    }

    fn refresh_teacher_url_tx(tx: &Transaction<'_>, id: i64, url: Option<&str>) -> Result<()> {
        if let Some(url) = url {
            tx.execute("UPDATE teachers SET url = ?1 WHERE id = ?2", params![url, id])
                .step("update teacher url")?;
        }
        Ok(())
    }

    fn insert_timetables_tx(tx: &Transaction<'_>, lecture: &mut Lecture) -> Result<()> {
        for timetable in &mut lecture.timetables {
            timetable.lecture_id = lecture.id;

            let room_id = match timetable.room.as_mut() {
                Some(room) => match non_empty(&room.name) {
                    Some(name) => {
                        room.name = name.to_string();
                        room.id = Self::ensure_room_tx(tx, &room.name)?;
                        Some(room.id)
                    }
                    None => None,
                },
                None => None,
            };
            if room_id.is_none() {
                timetable.room = None;
            }

            tx.execute(
                "INSERT INTO timetables (lecture_id, semester, room_id, day_of_week, period)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    lecture.id,
                    timetable.semester.map(|s| s.as_str()),
                    room_id,
                    timetable.day_of_week.map(|d| d.as_str()),
                    timetable.period,
                ],
            )
            .step("insert timetable")?;
        }
        Ok(())
    }

    fn ensure_room_tx(tx: &Transaction<'_>, name: &str) -> Result<i64> {
        let existing: Option<i64> = tx
            .query_row("SELECT id FROM rooms WHERE name = ?1", params![name], |row| row.get(0))
            .optional()
            .step("select room")?;
        if let Some(id) = existing {
            return Ok(id);
        }

        tx.execute("INSERT OR IGNORE INTO rooms (name) VALUES (?1)", params![name])
            .step("insert room")?;
        tx.query_row("SELECT id FROM rooms WHERE name = ?1", params![name], |row| row.get(0))
            .step("select inserted room")
    }

    fn insert_plans_tx(
        tx: &Transaction<'_>,
        lecture_id: i64,
        plans: &[LecturePlan],
    ) -> Result<Vec<LecturePlan>> {
        let mut stored = Vec::with_capacity(plans.len());
        for plan in plans {
            let plan = LecturePlan {
                count: plan.count,
                plan: plan.plan.trim().to_string(),
                assignment: plan.assignment.trim().to_string(),
            };
            if plan.count == 0 && plan.plan.is_empty() && plan.assignment.is_empty() {
                continue;
            }
            tx.execute(
                "INSERT INTO lecture_plans (lecture_id, count, plan, assignment) VALUES (?1, ?2, ?3, ?4)",
                params![lecture_id, plan.count, non_empty(&plan.plan), non_empty(&plan.assignment)],
            )
            .step("insert lecture plan")?;
            stored.push(plan);
        }
        Ok(stored)
    }

    fn insert_keywords_tx(tx: &Transaction<'_>, lecture_id: i64, keywords: &[String]) -> Result<Vec<String>> {
        let mut seen = HashSet::new();
        let mut stored = Vec::new();
        for keyword in keywords {
            let keyword = keyword.trim();
            if keyword.is_empty() || !seen.insert(keyword.to_lowercase()) {
                continue;
            }
            tx.execute(
                "INSERT OR IGNORE INTO lecture_keywords (lecture_id, keyword) VALUES (?1, ?2)",
                params![lecture_id, keyword],
            )
            .step("insert lecture keyword")?;
            stored.push(keyword.to_string());
        }
        Ok(stored)
    }

    fn insert_related_codes_tx(tx: &Transaction<'_>, lecture_id: i64, codes: &[String]) -> Result<()> {
        let mut stmt = tx
            .prepare("INSERT INTO related_course_codes (lecture_id, code) VALUES (?1, ?2)")
            .step("prepare related course code insert")?;
        for code in codes {
            stmt.execute(params![lecture_id, code])
                .step("insert related course code")?;
        }
        Ok(())
    }

    /// Resolve related codes against this batch first, then the stored
    /// lectures, and insert the resulting edges.
    fn link_related_tx(tx: &Transaction<'_>, lectures: &mut [Lecture]) -> Result<()> {
        let mut code_to_id: HashMap<String, i64> = HashMap::new();
        for lecture in lectures.iter() {
            let code = normalize_code(&lecture.code);
            if !code.is_empty() {
                code_to_id.entry(code).or_insert(lecture.id);
            }
        }

        let pending: BTreeSet<String> = lectures
            .iter()
            .flat_map(|lecture| lecture.related_course_codes.iter())
            .map(|code| normalize_code(code))
            .filter(|code| !code.is_empty() && !code_to_id.contains_key(code))
            .collect();
        for (code, id) in lookup_codes(tx, &pending)? {
            code_to_id.entry(code).or_insert(id);
        }

        for lecture in lectures.iter_mut() {
            let mut related = Vec::new();
            for code in &lecture.related_course_codes {
                let Some(&related_id) = code_to_id.get(&normalize_code(code)) else {
                    continue;
                };
                if related_id == lecture.id || related.contains(&related_id) {
                    continue;
                }
                tx.execute(
                    "INSERT OR IGNORE INTO related_courses (lecture_id, related_lecture_id) VALUES (?1, ?2)",
                    params![lecture.id, related_id],
                )
                .step("insert related course")?;
                related.push(related_id);
            }
            lecture.related_courses = related;
        }
        Ok(())
    }
}

/// Trim, drop empties, and keep the first spelling of each code.
fn sanitize_codes(codes: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    codes
        .iter()
        .map(|code| code.trim())
        .filter(|code| !code.is_empty() && seen.insert(code.to_uppercase()))
        .map(str::to_string)
        .collect()
}

/// Map normalized codes to lecture ids; the lowest id wins on duplicates.
fn lookup_codes(conn: &Connection, codes: &BTreeSet<String>) -> Result<HashMap<String, i64>> {
    let mut found = HashMap::new();
    if codes.is_empty() {
        return Ok(found);
    }

    let sql = format!(
        "SELECT id, code FROM lectures WHERE UPPER(TRIM(code)) IN ({}) ORDER BY id",
        placeholders(codes.len())
    );
    let mut stmt = conn.prepare(&sql).step("prepare lecture code lookup")?;
    let rows = stmt
        .query_map(params_from_iter(codes.iter()), |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })
        .step("lookup lecture codes")?;
    for row in rows {
        let (id, code) = row.step("read lecture code")?;
        found.entry(normalize_code(&code)).or_insert(id);
    }
    Ok(found)
}

fn map_lecture(row: &Row<'_>) -> rusqlite::Result<Lecture> {
    let text = |idx: usize| -> rusqlite::Result<String> {
        Ok(row.get::<_, Option<String>>(idx)?.unwrap_or_default())
    };

    Ok(Lecture {
        id: row.get(0)?,
        university: text(1)?,
        title: text(2)?,
        english_title: text(3)?,
        department: text(4)?,
        lecture_type: LectureType::from_db(row.get::<_, Option<String>>(5)?.as_deref()),
        code: text(6)?,
        level: row.get::<_, Option<i64>>(7)?.and_then(Level::from_i64),
        credit: row.get::<_, Option<i64>>(8)?.unwrap_or_default(),
        year: row.get::<_, Option<i64>>(9)?.unwrap_or_default(),
        open_term: text(10)?,
        updated_at: row.get(11)?,
        language: text(12)?,
        url: text(13)?,
        abstract_text: text(14)?,
        goal: text(15)?,
        experience: text(16)?,
        flow: text(17)?,
        out_of_class_work: text(18)?,
        textbook: text(19)?,
        reference_book: text(20)?,
        assessment: text(21)?,
        prerequisite: text(22)?,
        contact: text(23)?,
        office_hours: text(24)?,
        note: text(25)?,
        ..Lecture::default()
    })
}

fn load_children(conn: &Connection, lecture: &mut Lecture) -> Result<()> {
    let id = lecture.id;
    lecture.timetables = load_timetables(conn, &[id])?.remove(&id).unwrap_or_default();
    lecture.teachers = load_teachers(conn, &[id])?.remove(&id).unwrap_or_default();
    lecture.lecture_plans = query_column(
        conn,
        "SELECT count, plan, assignment FROM lecture_plans WHERE lecture_id = ?1 ORDER BY count, id",
        id,
        |row| {
            Ok(LecturePlan {
                count: row.get::<_, Option<i64>>(0)?.unwrap_or_default(),
                plan: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                assignment: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
            })
        },
        "select lecture plans",
    )?;
    lecture.keywords = query_column(
        conn,
        "SELECT keyword FROM lecture_keywords WHERE lecture_id = ?1 ORDER BY keyword",
        id,
        |row| row.get(0),
        "select lecture keywords",
    )?;
    lecture.related_courses = query_column(
        conn,
        "SELECT related_lecture_id FROM related_courses WHERE lecture_id = ?1 ORDER BY related_lecture_id",
        id,
        |row| row.get(0),
        "select related courses",
    )?;
    lecture.related_course_codes = query_column(
        conn,
        "SELECT code FROM related_course_codes WHERE lecture_id = ?1 ORDER BY code",
        id,
        |row| row.get(0),
        "select related course codes",
    )?;
    Ok(())
}

fn query_column<T>(
    conn: &Connection,
    sql: &str,
    lecture_id: i64,
    map: impl FnMut(&Row<'_>) -> rusqlite::Result<T>,
    step: &'static str,
) -> Result<Vec<T>> {
    let mut stmt = conn.prepare(sql).step(step)?;
    let rows = stmt.query_map(params![lecture_id], map).step(step)?;
    rows.collect::<rusqlite::Result<Vec<_>>>().step(step)
}

/// Teachers per lecture, ordered by teacher id.
pub(super) fn load_teachers(conn: &Connection, lecture_ids: &[i64]) -> Result<HashMap<i64, Vec<Teacher>>> {
    let mut teachers: HashMap<i64, Vec<Teacher>> = HashMap::new();
    if lecture_ids.is_empty() {
        return Ok(teachers);
    }

    let sql = format!(
        "SELECT lt.lecture_id, t.id, t.name, t.url
         FROM lecture_teachers lt JOIN teachers t ON t.id = lt.teacher_id
         WHERE lt.lecture_id IN ({})
         ORDER BY lt.lecture_id, t.id",
        placeholders(lecture_ids.len())
    );
    let mut stmt = conn.prepare(&sql).step("prepare teacher lookup")?;
    let rows = stmt
        .query_map(params_from_iter(lecture_ids.iter()), |row| {
            Ok((
                row.get::<_, i64>(0)?,
                Teacher {
                    id: row.get(1)?,
                    name: row.get(2)?,
                    url: row.get(3)?,
                },
            ))
        })
        .step("select teachers")?;
    for row in rows {
        let (lecture_id, teacher) = row.step("read teacher")?;
        teachers.entry(lecture_id).or_default().push(teacher);
    }
    Ok(teachers)
}
