// src/utils/text.rs

//! Deterministic text shaping shared by the page extractors.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::models::Semester;

static HORIZONTAL_WS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t\x0C\x0B]+").expect("valid whitespace regex"));

static DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("valid digits regex"));

static DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{4})\s*[/\-.年]\s*(\d{1,2})\s*[/\-.月]\s*(\d{1,2})").expect("valid date regex")
});

/// Separators accepted between list items, half- and full-width.
const LIST_SEPARATORS: &[char] = &[
    '/', '／', '・', ',', '，', '、', ';', '|', '\n', '\r',
];

/// Separators accepted between the two ends of a quarter range.
const RANGE_SEPARATORS: &[&str] = &["-", "～", "〜"];

/// Marker for a course running all year.
const FULL_YEAR: &str = "通年";

/// Collapse horizontal whitespace, trim every line, keep at most one blank
/// line between paragraphs and trim the edges.
pub fn normalize_whitespace(input: &str) -> String {
    if input.is_empty() {
        return String::new();
    }
    let unified = input.replace("\r\n", "\n").replace('\r', "\n");
    let collapsed = HORIZONTAL_WS.replace_all(&unified, " ");

    let mut lines: Vec<&str> = Vec::new();
    let mut last_empty = true;
    for line in collapsed.split('\n') {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            if !last_empty {
                lines.push("");
            }
            last_empty = true;
            continue;
        }
        last_empty = false;
        lines.push(trimmed);
    }
    lines.join("\n").trim().to_string()
}

/// Split a teacher or keyword list on any known separator.
pub fn split_delimited_list(raw: &str) -> Vec<String> {
    raw.replace('\u{3000}', " ")
        .split(LIST_SEPARATORS)
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

/// First run of decimal digits, or 0.
pub fn parse_first_integer(raw: &str) -> i64 {
    DIGITS
        .find(raw)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

/// Undo the x10 / x100 scaling the site applies to credit counts.
pub fn parse_credit(raw: &str) -> i64 {
    match parse_first_integer(raw) {
        v if v >= 100 && v % 100 == 0 => v / 100,
        v if v >= 10 && v % 10 == 0 => v / 10,
        v => v,
    }
}

/// All digit runs in order, used for period lists such as `3-4`.
pub fn parse_integers(raw: &str) -> Vec<u32> {
    DIGITS
        .find_iter(raw)
        .filter_map(|m| m.as_str().parse().ok())
        .collect()
}

/// First `YYYY/M/D`-like date in `raw` (also `-`, `.` or kanji separators).
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let caps = DATE.captures(raw)?;
    let year = caps[1].parse().ok()?;
    let month = caps[2].parse().ok()?;
    let day = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Map a quarter token or range to semesters in calendar order.
///
/// Invalid tokens and inverted ranges yield an empty list.
pub fn parse_quarter_to_semesters(quarter: &str) -> Vec<Semester> {
    let quarter = quarter.trim().replace(' ', "");
    if quarter.is_empty() {
        return Vec::new();
    }
    if quarter == FULL_YEAR {
        return Semester::ALL.to_vec();
    }

    for sep in RANGE_SEPARATORS {
        if let Some((start, end)) = quarter.split_once(sep) {
            let (Some(start), Some(end)) = (
                quarter_index(&with_quarter_suffix(start)),
                quarter_index(&with_quarter_suffix(end)),
            ) else {
                return Vec::new();
            };
            if end < start {
                return Vec::new();
            }
            return Semester::ALL[start..=end].to_vec();
        }
    }

    quarter_index(&with_quarter_suffix(&quarter))
        .map(|idx| vec![Semester::ALL[idx]])
        .unwrap_or_default()
}

fn with_quarter_suffix(part: &str) -> String {
    if !part.ends_with('Q') && part.contains(['1', '2', '3', '4']) {
        format!("{part}Q")
    } else {
        part.to_string()
    }
}

fn quarter_index(token: &str) -> Option<usize> {
    match token.trim() {
        "1Q" | "春学期" | "Spring" => Some(0),
        "2Q" | "夏学期" | "Summer" => Some(1),
        "3Q" | "秋学期" | "Autumn" | "Fall" => Some(2),
        "4Q" | "冬学期" | "Winter" => Some(3),
        _ => None,
    }
}
