// src/parser/mod.rs

//! Page extraction for the syllabus site.
//!
//! Three page kinds are understood: the top page (links to per-department
//! course lists), course list pages, and course detail pages. Extraction is
//! pure; fetching lives in [`crate::services`].

mod course_detail;
mod course_list;
mod timetable;
mod top_page;

use chrono::NaiveDate;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::Lecture;
use crate::utils::text::normalize_whitespace;

pub use course_detail::{level_from_code, parse_lecture_type};
pub use timetable::parse_timetable_block;

/// One row of a course list page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseListItem {
    pub code: String,
    pub title: String,
    pub detail_url: String,
    /// Open term as printed in the list, e.g. `2025 3Q`
    pub open_term: String,
    pub updated_at: Option<NaiveDate>,
}

/// Extraction operations over raw page bodies.
pub trait PageParser: Send + Sync {
    /// Rows of a course list page, links resolved against `base_url`.
    fn parse_course_list(&self, body: &[u8], base_url: &str) -> Result<Vec<CourseListItem>>;

    /// A lecture aggregate from a course detail page.
    fn parse_course_detail(&self, body: &[u8], detail_url: &str) -> Result<Lecture>;

    /// Course list URLs for `year` linked from the top page.
    fn list_course_pages(&self, body: &[u8], top_page_url: &str, year: i32) -> Result<Vec<String>>;

    /// Copy the title of the English detail page onto `lecture`.
    fn add_english_title(&self, body: &[u8], lecture: &mut Lecture) -> Result<()>;
}

/// Production [`PageParser`] over the site's HTML layout.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlParser;

impl HtmlParser {
    pub fn new() -> Self {
        Self
    }
}

impl PageParser for HtmlParser {
    fn parse_course_list(&self, body: &[u8], base_url: &str) -> Result<Vec<CourseListItem>> {
        let html = decode(body, "course list")?;
        course_list::parse(&Html::parse_document(html), base_url)
    }

    fn parse_course_detail(&self, body: &[u8], detail_url: &str) -> Result<Lecture> {
        let html = decode(body, "course detail")?;
        course_detail::parse(&Html::parse_document(html), detail_url)
    }

    fn list_course_pages(&self, body: &[u8], top_page_url: &str, year: i32) -> Result<Vec<String>> {
        let html = decode(body, "top page")?;
        top_page::list_course_pages(html, top_page_url, year)
    }

    fn add_english_title(&self, body: &[u8], lecture: &mut Lecture) -> Result<()> {
        let html = decode(body, "english detail")?;
        let title = course_detail::parse_title(&Html::parse_document(html))?;
        if !title.is_empty() {
            lecture.english_title = title;
        }
        Ok(())
    }
}

/// Bodies that are not UTF-8 cannot be read as a document.
fn decode<'a>(body: &'a [u8], context: &str) -> Result<&'a str> {
    std::str::from_utf8(body).map_err(|e| AppError::parse(context, e))
}

/// Parse a CSS selector string.
fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| AppError::selector(selector, format!("{e:?}")))
}

/// Visible text of an element with line structure kept: `<br>` breaks the
/// line and block elements end one.
fn element_text(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    collect_text(element, &mut out);
    normalize_whitespace(&out)
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(child_element) = ElementRef::wrap(child) {
            match child_element.value().name() {
                "br" => out.push('\n'),
                "li" | "p" | "div" | "tr" => {
                    collect_text(child_element, out);
                    out.push('\n');
                }
                _ => collect_text(child_element, out),
            }
        } else if let Some(text) = child.value().as_text() {
            out.push_str(text);
        }
    }
}
