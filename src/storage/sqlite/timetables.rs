//! Timetable lookup and the period range expander.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use rusqlite::{Connection, params, params_from_iter};

use super::{SqliteStore, placeholders};
use crate::error::{Result, StepContext};
use crate::models::{DayOfWeek, Room, Semester, TimeTable};
use crate::storage::TimetableRepository;

/// Rows sharing lecture, semester, day and room form one block.
type BlockKey = (i64, Option<String>, Option<String>, Option<i64>);

impl TimetableRepository for SqliteStore {
    fn find_by_lecture_id(&self, lecture_id: i64) -> Result<Vec<TimeTable>> {
        Ok(load_timetables(&self.conn, &[lecture_id])?
            .remove(&lecture_id)
            .unwrap_or_default())
    }

    fn expand_timetable_ranges(&mut self) -> Result<usize> {
        let tx = self.conn.transaction().step("begin expand timetables")?;

        let mut blocks: BTreeMap<BlockKey, BTreeSet<i64>> = BTreeMap::new();
        {
            let mut stmt = tx
                .prepare(
                    "SELECT lecture_id, semester, day_of_week, room_id, period
                     FROM timetables WHERE period > 0",
                )
                .step("select timetable periods")?;
            let rows = stmt
                .query_map([], |row| -> rusqlite::Result<(BlockKey, i64)> {
                    Ok((
                        (row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?),
                        row.get::<_, i64>(4)?,
                    ))
                })
                .step("select timetable periods")?;
            for row in rows {
                let (key, period) = row.step("read timetable period")?;
                blocks.entry(key).or_default().insert(period);
            }
        }

        let mut inserted = 0;
        {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO timetables (lecture_id, semester, day_of_week, period, room_id)
                     SELECT ?1, ?2, ?3, ?4, ?5
                     WHERE NOT EXISTS (
                         SELECT 1 FROM timetables
                         WHERE lecture_id = ?1 AND semester IS ?2 AND day_of_week IS ?3
                           AND period = ?4 AND room_id IS ?5
                     )",
                )
                .step("prepare timetable expansion")?;

            for ((lecture_id, semester, day, room_id), periods) in &blocks {
                let Some((start, end)) = block_endpoints(periods) else {
                    continue;
                };
                for period in start + 1..end {
                    inserted += stmt
                        .execute(params![lecture_id, semester, day, period, room_id])
                        .step("insert expanded timetable")?;
                }
            }
        }

        tx.commit().step("commit expand timetables")?;
        log::info!("Expanded {inserted} timetable periods");
        Ok(inserted)
    }
}

/// Endpoints of a two-period listing that stands for a contiguous block:
/// odd start with even end, or the 2 to 4 special case.
fn block_endpoints(periods: &BTreeSet<i64>) -> Option<(i64, i64)> {
    if periods.len() != 2 {
        return None;
    }
    let mut iter = periods.iter().copied();
    let (start, end) = (iter.next()?, iter.next()?);
    if end <= start + 1 {
        return None;
    }
    let shorthand = (start % 2 == 1 && end % 2 == 0) || (start == 2 && end == 4);
    shorthand.then_some((start, end))
}

/// Timetables per lecture, ordered by semester, day and period.
pub(super) fn load_timetables(
    conn: &Connection,
    lecture_ids: &[i64],
) -> Result<HashMap<i64, Vec<TimeTable>>> {
    let mut timetables: HashMap<i64, Vec<TimeTable>> = HashMap::new();
    if lecture_ids.is_empty() {
        return Ok(timetables);
    }

    let sql = format!(
        "SELECT tt.lecture_id, tt.semester, tt.room_id, r.name, tt.day_of_week, tt.period
         FROM timetables tt LEFT JOIN rooms r ON r.id = tt.room_id
         WHERE tt.lecture_id IN ({})
         ORDER BY tt.lecture_id, tt.semester, tt.day_of_week, tt.period, tt.id",
        placeholders(lecture_ids.len())
    );
    let mut stmt = conn.prepare(&sql).step("prepare timetable lookup")?;
    let rows = stmt
        .query_map(params_from_iter(lecture_ids.iter()), |row| {
            let room_id: Option<i64> = row.get(2)?;
            let room_name: Option<String> = row.get(3)?;
            Ok(TimeTable {
                lecture_id: row.get(0)?,
                semester: row.get::<_, Option<String>>(1)?.as_deref().and_then(Semester::parse),
                day_of_week: row.get::<_, Option<String>>(4)?.as_deref().and_then(DayOfWeek::parse),
                period: row.get(5)?,
                room: room_id.map(|id| Room {
                    id,
                    name: room_name.unwrap_or_default(),
                }),
            })
        })
        .step("select timetables")?;

    for row in rows {
        let timetable = row.step("read timetable")?;
        timetables.entry(timetable.lecture_id).or_default().push(timetable);
    }
    Ok(timetables)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_lecture() -> SqliteStore {
        let store = SqliteStore::in_memory().unwrap();
        store
            .conn
            .execute_batch(
                "INSERT INTO lectures (id, university, title) VALUES (1, 'Test University', 'Lecture');
                 INSERT INTO rooms (id, name) VALUES (1, 'W241');",
            )
            .unwrap();
        store
    }

    fn insert_slot(store: &SqliteStore, semester: Option<&str>, day: &str, period: i64, room_id: Option<i64>) {
        store
            .conn
            .execute(
                "INSERT INTO timetables (lecture_id, semester, day_of_week, period, room_id) VALUES (1, ?1, ?2, ?3, ?4)",
                params![semester, day, period, room_id],
            )
            .unwrap();
    }

    fn periods(store: &SqliteStore) -> Vec<u32> {
        store
            .find_by_lecture_id(1)
            .unwrap()
            .into_iter()
            .filter_map(|t| t.period)
            .collect()
    }

    #[test]
    fn test_expands_odd_even_block() {
        let mut store = store_with_lecture();
        insert_slot(&store, Some("fall"), "monday", 5, Some(1));
        insert_slot(&store, Some("fall"), "monday", 8, Some(1));

        assert_eq!(store.expand_timetable_ranges().unwrap(), 2);
        assert_eq!(periods(&store), vec![5, 6, 7, 8]);

        let filled = store.find_by_lecture_id(1).unwrap();
        assert!(filled.iter().all(|t| t.semester == Some(Semester::Fall)));
        assert!(filled.iter().all(|t| t.day_of_week == Some(DayOfWeek::Monday)));
        assert!(filled.iter().all(|t| t.room.as_ref().map(|r| r.name.as_str()) == Some("W241")));

        assert_eq!(store.expand_timetable_ranges().unwrap(), 0);
        assert_eq!(periods(&store).len(), 4);
    }

    #[test]
    fn test_different_days_are_separate_blocks() {
        let mut store = store_with_lecture();
        insert_slot(&store, Some("fall"), "monday", 5, Some(1));
        insert_slot(&store, Some("fall"), "tuesday", 8, Some(1));
        assert_eq!(store.expand_timetable_ranges().unwrap(), 0);
    }

    #[test]
    fn test_two_to_four_special_case() {
        let mut store = store_with_lecture();
        insert_slot(&store, None, "wednesday", 2, None);
        insert_slot(&store, None, "wednesday", 4, None);
        assert_eq!(store.expand_timetable_ranges().unwrap(), 1);
        assert_eq!(periods(&store), vec![2, 3, 4]);
        assert_eq!(store.expand_timetable_ranges().unwrap(), 0);
    }

    #[test]
    fn test_more_than_two_periods_untouched() {
        let mut store = store_with_lecture();
        for period in [3, 4, 7, 8] {
            insert_slot(&store, Some("spring"), "thursday", period, Some(1));
        }
        assert_eq!(store.expand_timetable_ranges().unwrap(), 0);
    }

    #[test]
    fn test_block_endpoints() {
        let set = |p: &[i64]| p.iter().copied().collect::<BTreeSet<_>>();
        assert_eq!(block_endpoints(&set(&[1, 4])), Some((1, 4)));
        assert_eq!(block_endpoints(&set(&[5, 8])), Some((5, 8)));
        assert_eq!(block_endpoints(&set(&[2, 4])), Some((2, 4)));
        assert_eq!(block_endpoints(&set(&[1, 2])), None);
        assert_eq!(block_endpoints(&set(&[2, 5])), None);
        assert_eq!(block_endpoints(&set(&[1, 3])), None);
        assert_eq!(block_endpoints(&set(&[4])), None);
    }

    #[test]
    fn test_find_by_lecture_id_unknown() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(store.find_by_lecture_id(99).unwrap().is_empty());
    }
}
