// src/parser/timetable.rs

use unicode_segmentation::UnicodeSegmentation;

use crate::models::{DayOfWeek, Room, TimeTable};
use crate::utils::text::{normalize_whitespace, parse_integers, parse_quarter_to_semesters};

/// Parse a day/period/room block such as `月5-6(S3-215(S321))`.
///
/// Each line starts with a day glyph, optionally followed by periods and a
/// parenthesised room. A line without periods still yields one entry. The
/// semester is set only when `quarter` names exactly one semester; callers
/// expand multi-semester quarters themselves.
pub fn parse_timetable_block(raw: &str, quarter: &str) -> Vec<TimeTable> {
    let raw = normalize_whitespace(raw);
    if raw.is_empty() || raw == "-" {
        return Vec::new();
    }

    let semesters = parse_quarter_to_semesters(quarter);
    let semester = match semesters.as_slice() {
        [only] => Some(*only),
        _ => None,
    };

    let mut timetables = Vec::new();
    for line in raw.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let (entry, room) = split_room(line);
        let mut glyphs = entry.graphemes(true);
        let Some(day) = glyphs.next().and_then(DayOfWeek::from_glyph) else {
            log::debug!("Skipping timetable line without day glyph: {line}");
            continue;
        };
        let periods = parse_integers(glyphs.as_str());

        let slot = |period: Option<u32>| TimeTable {
            lecture_id: 0,
            semester,
            day_of_week: Some(day),
            period,
            room: room.clone().map(Room::named),
        };

        if periods.is_empty() {
            timetables.push(slot(None));
        } else {
            timetables.extend(periods.into_iter().map(|p| slot(Some(p))));
        }
    }
    timetables
}

/// Split `entry(room)` at the first `(` and the last `)`.
fn split_room(line: &str) -> (&str, Option<String>) {
    if let (Some(open), Some(close)) = (line.find('('), line.rfind(')')) {
        if close > open {
            let room = line[open + 1..close].trim();
            let room = (!room.is_empty()).then(|| room.to_string());
            return (line[..open].trim(), room);
        }
    }
    (line, None)
}
