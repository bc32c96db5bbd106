// src/parser/course_list.rs

use scraper::Html;

use super::{CourseListItem, element_text, parse_selector};
use crate::error::Result;
use crate::utils::text::parse_date;
use crate::utils::{parse_base_url, resolve_url};

/// Rows with a code in the first cell and a link in the second.
pub(super) fn parse(document: &Html, base_url: &str) -> Result<Vec<CourseListItem>> {
    let base = parse_base_url(base_url)?;
    let row_sel = parse_selector("table.c-table tbody tr")?;
    let cell_sel = parse_selector("td")?;
    let link_sel = parse_selector("a")?;

    let mut items = Vec::new();
    for row in document.select(&row_sel) {
        let cells: Vec<_> = row.select(&cell_sel).collect();
        if cells.len() < 2 {
            continue;
        }

        let code = cells[0].text().collect::<String>().trim().to_string();
        let Some(link) = cells[1].select(&link_sel).next() else {
            continue;
        };
        let href = link.value().attr("href").map(str::trim).unwrap_or_default();
        if code.is_empty() || href.is_empty() {
            continue;
        }

        let cell_text = |idx: usize| {
            cells
                .get(idx)
                .map(|cell| element_text(*cell))
                .unwrap_or_default()
        };

        items.push(CourseListItem {
            code,
            title: element_text(link),
            detail_url: resolve_url(&base, href),
            open_term: cell_text(4),
            updated_at: parse_date(&cell_text(5)),
        });
    }

    log::debug!("Parsed {} course list rows", items.len());
    Ok(items)
}
