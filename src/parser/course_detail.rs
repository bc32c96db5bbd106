// src/parser/course_detail.rs

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use super::{element_text, parse_selector, parse_timetable_block};
use crate::error::Result;
use crate::models::{Lecture, LecturePlan, LectureType, Level, Teacher, TimeTable, UNIVERSITY};
use crate::utils::text::{
    normalize_whitespace, parse_credit, parse_date, parse_first_integer,
    parse_quarter_to_semesters, split_delimited_list,
};

static COURSE_CODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Za-z]{2,5}\.[A-Za-z]{1,2}\d{3}[A-Za-z]?\b").expect("valid course code regex")
});

/// Selectors used on a detail page.
struct DetailSelectors {
    title: Selector,
    item: Selector,
    term: Selector,
    value: Selector,
    heading: Selector,
    plan_row: Selector,
    cell: Selector,
}

impl DetailSelectors {
    fn new() -> Result<Self> {
        Ok(Self {
            title: parse_selector("h1.c-h1")?,
            item: parse_selector("div.c-dl-2col__item")?,
            term: parse_selector("dt")?,
            value: parse_selector("dd")?,
            heading: parse_selector("h3.c-h3")?,
            plan_row: parse_selector("table#lecture_plans tbody tr")?,
            cell: parse_selector("td")?,
        })
    }
}

/// Build a lecture aggregate from a detail page.
pub(super) fn parse(document: &Html, detail_url: &str) -> Result<Lecture> {
    let sel = DetailSelectors::new()?;
    let page = DetailPage {
        document,
        sel: &sel,
    };

    let code = page.definition("科目コード");
    let quarter = page.definition("開講クォーター");

    let mut lecture = Lecture {
        university: UNIVERSITY.to_string(),
        title: page.title(),
        department: page.definition("開講元"),
        lecture_type: parse_lecture_type(&page.definition("授業形態")),
        level: level_from_code(&code),
        credit: parse_credit(&page.definition("単位数")),
        year: parse_first_integer(&page.definition("開講時期")),
        open_term: page.definition("開講時期"),
        updated_at: parse_date(&page.definition("更新日")),
        language: page.definition("使用言語"),
        url: detail_url.trim().to_string(),
        code,
        abstract_text: page.section("授業の目的（ねらい）、概要"),
        goal: page.section("到達目標"),
        experience: page.section("実務経験のある教員等による授業科目等"),
        flow: page.section("授業の進め方"),
        out_of_class_work: page.section("準備学修(事前学修・復習)等についての指示"),
        textbook: page.section("教科書"),
        reference_book: page.section("参考書、講義資料等"),
        assessment: page.section("成績評価の方法及び基準"),
        prerequisite: page.section("履修の条件・注意事項"),
        contact: page.section_starting_with("連絡先"),
        office_hours: page.section_starting_with("オフィスアワー"),
        note: page.section("その他"),
        keywords: split_delimited_list(&page.section("キーワード")),
        related_course_codes: related_codes(&page.section("関連する科目")),
        lecture_plans: page.lecture_plans(),
        ..Lecture::default()
    };

    lecture.teachers = split_delimited_list(&page.definition("担当教員"))
        .into_iter()
        .map(Teacher::named)
        .collect();

    lecture.timetables = expand_semesters(
        parse_timetable_block(&page.definition("曜日・時限"), &quarter),
        &quarter,
    );

    Ok(lecture)
}

/// Title of a detail page in either language.
pub(super) fn parse_title(document: &Html) -> Result<String> {
    let title = parse_selector("h1.c-h1")?;
    Ok(document
        .select(&title)
        .next()
        .map(element_text)
        .unwrap_or_default())
}

/// Classify the delivery format from its free-text label.
pub fn parse_lecture_type(raw: &str) -> LectureType {
    let contains_any = |words: &[&str]| words.iter().any(|w| raw.contains(w));
    if contains_any(&["対面", "教室"]) {
        LectureType::Offline
    } else if contains_any(&["ライブ", "リアルタイム"]) {
        LectureType::Live
    } else if contains_any(&["ハイフレックス", "ハイブリッド"]) {
        LectureType::Hyflex
    } else if contains_any(&["オンデマンド", "録画"]) {
        LectureType::Ondemand
    } else if raw.trim().is_empty() {
        LectureType::Unset
    } else {
        LectureType::Other
    }
}

/// Level from the first digit of the number part, e.g. `LAH.S101` is 1.
pub fn level_from_code(code: &str) -> Option<Level> {
    let number_part = code.rsplit_once('.').map_or(code, |(_, rest)| rest);
    number_part
        .chars()
        .find(char::is_ascii_digit)
        .and_then(|c| c.to_digit(10))
        .and_then(|d| Level::from_i64(i64::from(d)))
}

/// Course codes mentioned in the related-course section, in order.
fn related_codes(raw: &str) -> Vec<String> {
    let mut codes: Vec<String> = Vec::new();
    for m in COURSE_CODE.find_iter(raw) {
        let code = m.as_str().to_string();
        if !codes.iter().any(|c| c.eq_ignore_ascii_case(&code)) {
            codes.push(code);
        }
    }
    codes
}

/// One copy of every entry per semester when the quarter spans several.
fn expand_semesters(entries: Vec<TimeTable>, quarter: &str) -> Vec<TimeTable> {
    let semesters = parse_quarter_to_semesters(quarter);
    if semesters.len() < 2 {
        return entries;
    }
    semesters
        .iter()
        .flat_map(|semester| {
            entries.iter().cloned().map(move |mut entry| {
                entry.semester = Some(*semester);
                entry
            })
        })
        .collect()
}

struct DetailPage<'a> {
    document: &'a Html,
    sel: &'a DetailSelectors,
}

impl<'a> DetailPage<'a> {
    fn title(&self) -> String {
        self.document
            .select(&self.sel.title)
            .next()
            .map(element_text)
            .unwrap_or_default()
    }

    /// Value of the first definition whose term equals or contains `term`.
    fn definition(&self, term: &str) -> String {
        self.definition_value(term)
            .map(element_text)
            .unwrap_or_default()
    }

    fn definition_value(&self, term: &str) -> Option<ElementRef<'a>> {
        let sel = self.sel;
        self.document.select(&sel.item).find_map(|item| {
            let dt = item
                .select(&sel.term)
                .next()
                .map(|dt| normalize_whitespace(&dt.text().collect::<String>()))
                .unwrap_or_default();
            if dt.contains(term) {
                item.select(&sel.value).next()
            } else {
                None
            }
        })
    }

    fn section(&self, heading: &str) -> String {
        self.section_where(|h| h == heading)
    }

    fn section_starting_with(&self, prefix: &str) -> String {
        self.section_where(|h| h.starts_with(prefix))
    }

    /// Content between the first matching heading and the next heading.
    fn section_where(&self, matches: impl Fn(&str) -> bool) -> String {
        let Some(heading) = self
            .document
            .select(&self.sel.heading)
            .find(|h| matches(h.text().collect::<String>().trim()))
        else {
            return String::new();
        };

        let mut buf = String::new();
        for sibling in heading.next_siblings().filter_map(ElementRef::wrap) {
            if sibling.value().name() == "h3" {
                break;
            }
            buf.push_str(&element_text(sibling));
            buf.push('\n');
        }
        normalize_whitespace(&buf)
    }

    fn lecture_plans(&self) -> Vec<LecturePlan> {
        self.document
            .select(&self.sel.plan_row)
            .filter_map(|row| {
                let cells: Vec<_> = row.select(&self.sel.cell).collect();
                if cells.len() < 3 {
                    return None;
                }
                let plan = LecturePlan {
                    count: parse_first_integer(&cells[0].text().collect::<String>()),
                    plan: element_text(cells[1]),
                    assignment: element_text(cells[2]),
                };
                let is_blank = plan.count == 0 && plan.plan.is_empty() && plan.assignment.is_empty();
                (!is_blank).then_some(plan)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DayOfWeek, Semester};

    const DETAIL_HTML: &str = r#"
<html><body>
<h1 class="c-h1">法学（憲法）Ａ</h1>
<dl class="c-dl-2col">
  <div class="c-dl-2col__item"><dt>開講元</dt><dd>文系教養科目</dd></div>
  <div class="c-dl-2col__item"><dt>担当教員</dt><dd>篠島 正幸</dd></div>
  <div class="c-dl-2col__item"><dt>授業形態</dt><dd>講義 （対面型）</dd></div>
  <div class="c-dl-2col__item"><dt>曜日・時限(講義室)</dt><dd>月5-6 (S3-215(S321))</dd></div>
  <div class="c-dl-2col__item"><dt>科目コード</dt><dd>LAH.S101</dd></div>
  <div class="c-dl-2col__item"><dt>単位数</dt><dd>100</dd></div>
  <div class="c-dl-2col__item"><dt>開講時期</dt><dd>2025年度</dd></div>
  <div class="c-dl-2col__item"><dt>開講クォーター</dt><dd>3Q</dd></div>
  <div class="c-dl-2col__item"><dt>シラバス更新日</dt><dd>2025年3月19日</dd></div>
  <div class="c-dl-2col__item"><dt>使用言語</dt><dd>日本語</dd></div>
</dl>
<h3 class="c-h3">授業の目的（ねらい）、概要</h3>
<p>本講義では憲法の基本的人権について学ぶ。</p>
<p>統治機構にも触れる。</p>
<h3 class="c-h3">到達目標</h3>
<p>基本的人権の考え方を説明できる。</p>
<h3 class="c-h3">キーワード</h3>
<p>憲法、法律、人権、教養</p>
<h3 class="c-h3">授業計画・課題</h3>
<table id="lecture_plans">
  <tbody>
    <tr><td>第1回</td><td>講義ガイダンス</td><td>社会における法の役割を考える</td></tr>
    <tr><td>第2回</td><td>憲法の基本理念</td><td>憲法の条項を読む</td></tr>
    <tr><td></td><td></td><td></td></tr>
    <tr><td>short</td></tr>
  </tbody>
</table>
<h3 class="c-h3">関連する科目</h3>
<ul><li>LAH.S201 ： 法学（憲法）Ｂ</li><li>LAH.S301 ： 法学（民法）</li><li>lah.s201</li><li>LAH.S102 ： 法学（刑法）</li></ul>
<h3 class="c-h3">連絡先（メール、電話番号）</h3>
<p>金子晴彦: kaneko[at]c.titech.ac.jp</p>
<h3 class="c-h3">オフィスアワー</h3>
<p>メールで事前予約すること。</p>
<h3 class="c-h3">その他</h3>
<p>日本国憲法は最高法規である。</p>
</body></html>
"#;

    #[test]
    fn test_parse_detail_fields() {
        let lecture = parse(
            &Html::parse_document(DETAIL_HTML),
            " https://example.com/courses/2025/LAH.S101 ",
        )
        .unwrap();

        assert_eq!(lecture.university, "東京科学大学");
        assert_eq!(lecture.title, "法学（憲法）Ａ");
        assert_eq!(lecture.department, "文系教養科目");
        assert_eq!(lecture.lecture_type, LectureType::Offline);
        assert_eq!(lecture.code, "LAH.S101");
        assert_eq!(lecture.level, Some(Level::Bachelor1));
        assert_eq!(lecture.credit, 1);
        assert_eq!(lecture.year, 2025);
        assert_eq!(lecture.language, "日本語");
        assert_eq!(lecture.url, "https://example.com/courses/2025/LAH.S101");
        assert_eq!(
            lecture.updated_at,
            chrono::NaiveDate::from_ymd_opt(2025, 3, 19)
        );
        assert_eq!(lecture.teachers, vec![Teacher::named("篠島 正幸")]);
    }

    #[test]
    fn test_parse_detail_sections() {
        let lecture = parse(&Html::parse_document(DETAIL_HTML), "https://example.com").unwrap();

        assert!(lecture.abstract_text.contains("憲法の基本的人権"));
        assert!(lecture.abstract_text.contains("\n統治機構"));
        assert!(lecture.goal.contains("基本的人権"));
        assert_eq!(lecture.contact, "金子晴彦: kaneko[at]c.titech.ac.jp");
        assert_eq!(lecture.office_hours, "メールで事前予約すること。");
        assert!(lecture.note.starts_with("日本国憲法は"));
        assert_eq!(lecture.prerequisite, "");
        assert_eq!(lecture.keywords, vec!["憲法", "法律", "人権", "教養"]);
        assert_eq!(
            lecture.related_course_codes,
            vec!["LAH.S201", "LAH.S301", "LAH.S102"]
        );
    }

    #[test]
    fn test_parse_detail_plans_and_timetables() {
        let lecture = parse(&Html::parse_document(DETAIL_HTML), "https://example.com").unwrap();

        assert_eq!(lecture.lecture_plans.len(), 2);
        assert_eq!(lecture.lecture_plans[0].count, 1);
        assert_eq!(lecture.lecture_plans[0].plan, "講義ガイダンス");
        assert_eq!(lecture.lecture_plans[1].count, 2);
        assert!(lecture.lecture_plans[1].assignment.starts_with("憲法の条項"));

        assert_eq!(lecture.timetables.len(), 2);
        for (entry, period) in lecture.timetables.iter().zip([5, 6]) {
            assert_eq!(entry.semester, Some(Semester::Fall));
            assert_eq!(entry.day_of_week, Some(DayOfWeek::Monday));
            assert_eq!(entry.period, Some(period));
            assert_eq!(entry.room.as_ref().unwrap().name, "S3-215(S321)");
        }
    }

    #[test]
    fn test_parse_detail_missing_structure_yields_empty_fields() {
        let lecture = parse(
            &Html::parse_document("<html><body><p>maintenance</p></body></html>"),
            "https://example.com",
        )
        .unwrap();
        assert_eq!(lecture.title, "");
        assert_eq!(lecture.code, "");
        assert_eq!(lecture.credit, 0);
        assert_eq!(lecture.lecture_type, LectureType::Unset);
        assert_eq!(lecture.level, None);
        assert!(lecture.timetables.is_empty());
        assert!(lecture.lecture_plans.is_empty());
    }

    #[test]
    fn test_multi_quarter_is_cross_producted() {
        let html = r#"<html><body>
            <div class="c-dl-2col__item"><dt>曜日・時限</dt><dd>火1-2<br>金1-2</dd></div>
            <div class="c-dl-2col__item"><dt>開講クォーター</dt><dd>1-2Q</dd></div>
        </body></html>"#;
        let lecture = parse(&Html::parse_document(html), "https://example.com").unwrap();
        assert_eq!(lecture.timetables.len(), 8);
        assert_eq!(
            lecture
                .timetables
                .iter()
                .filter(|t| t.semester == Some(Semester::Summer))
                .count(),
            4
        );
    }

    #[test]
    fn test_parse_lecture_type_vocabulary() {
        assert_eq!(parse_lecture_type("講義（ライブ型）"), LectureType::Live);
        assert_eq!(parse_lecture_type("ハイブリッド"), LectureType::Hyflex);
        assert_eq!(parse_lecture_type("オンデマンド型"), LectureType::Ondemand);
        assert_eq!(parse_lecture_type("  "), LectureType::Unset);
        assert_eq!(parse_lecture_type("演習"), LectureType::Other);
    }

    #[test]
    fn test_level_from_code() {
        assert_eq!(level_from_code("MCS.M301"), Some(Level::Bachelor3));
        assert_eq!(level_from_code("MCS.T401"), Some(Level::Master1));
        assert_eq!(level_from_code("XYZ.A601"), Some(Level::Doctor));
        assert_eq!(level_from_code("XYZ.A701"), None);
        assert_eq!(level_from_code(""), None);
    }
}
