//! Excel desktop and Excel for the web.
//!
//! Copying a cell range can leave the clipboard fragment without its
//! enclosing `<tr>` or `<table>`; those are restored from the markup before
//! the fragment marker. Cells without borders get Excel's grid line.

use std::rc::Rc;
use std::sync::LazyLock;

use regex::Regex;
use weaver_content_model::{BoxFormat, Side, TableCellFormat};
use weaver_dom::{DomTree, NodeId, parse_html};
use weaver_editor_core::{BeforePasteEvent, TrustedHtmlHandler};

use crate::fragment::{import_children, split_html};

pub const DEFAULT_BORDER_STYLE: &str = "1px solid #d4d4d4";

static TD_END_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</\s*td\s*>").expect("BUG: invalid td end regex literal"));
static TR_END_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</\s*tr\s*>").expect("BUG: invalid tr end regex literal"));
static TABLE_END_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)</\s*table\s*>").expect("BUG: invalid table end regex literal")
});
static TR_START_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<tr[^>]*>[^<]*").expect("BUG: invalid tr regex literal"));
static TABLE_START_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<table[^>]*>[^<]*").expect("BUG: invalid table regex literal")
});

/// True when the last `close` tag in `html` is not followed by `outer`.
fn ends_inside(html: &str, close: &Regex, outer: &Regex) -> bool {
    let Some(last_close) = close.find_iter(html).last() else {
        return false;
    };
    outer
        .find_iter(html)
        .last()
        .is_none_or(|last_outer| last_outer.start() < last_close.start())
}

/// Wrap stray cells in the row and table they were copied from.
pub fn wrap_excel_fragment(html: &str, html_before: &str) -> String {
    let mut html = html.to_string();
    if ends_inside(&html, &TD_END_RE, &TR_END_RE) {
        let tr = TR_START_RE
            .find(html_before)
            .map_or("<tr>", |m| m.as_str());
        html = format!("{tr}{html}</tr>");
    }
    if ends_inside(&html, &TR_END_RE, &TABLE_END_RE) {
        let table = TABLE_START_RE
            .find(html_before)
            .map_or("<table>", |m| m.as_str());
        html = format!("{table}{html}</table>");
    }
    html
}

pub fn process(
    event: &mut BeforePasteEvent,
    trusted: &dyn TrustedHtmlHandler,
    allow_excel_no_border_table: bool,
) {
    if let Some(raw) = event.clipboard_data.raw_html.as_deref() {
        let fragment_html = split_html(raw).fragment;
        let wrapped = wrap_excel_fragment(fragment_html, &event.html_before);
        if wrapped != fragment_html {
            match parse_html(&trusted.trust(&wrapped)) {
                Ok(document) => {
                    tracing::debug!("rebuilt excel fragment around stray cells");
                    import_children(&mut event.fragment, &document.tree, document.body);
                }
                Err(error) => {
                    tracing::warn!(%error, "keeping original excel fragment");
                }
            }
        }
    }

    if !allow_excel_no_border_table {
        event
            .dom_to_model_option
            .additional_format_parsers
            .table_cell
            .push(Rc::new(
                |format: &mut TableCellFormat, _: &DomTree, _: NodeId| {
                    if !has_visible_border(format) {
                        for side in Side::ALL {
                            *format.border_mut(side) = Some(DEFAULT_BORDER_STYLE.into());
                        }
                    }
                },
            ));
    }
}

fn has_visible_border(format: &TableCellFormat) -> bool {
    Side::ALL.into_iter().any(|side| {
        format.border(side).is_some_and(|border| {
            !border
                .split_ascii_whitespace()
                .any(|part| part.eq_ignore_ascii_case("none") || part.eq_ignore_ascii_case("hidden"))
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stray_cells_are_wrapped() {
        let before = r#"<html><body><table border=0 style="border-collapse:collapse"><tr height=20>"#;
        let wrapped = wrap_excel_fragment("<td>a</td><td>b</td>", before);
        assert_eq!(
            wrapped,
            r#"<table border=0 style="border-collapse:collapse"><tr height=20><td>a</td><td>b</td></tr></table>"#
        );
    }

    #[test]
    fn test_stray_rows_get_default_table() {
        let wrapped = wrap_excel_fragment("<tr><td>a</td></tr>", "");
        assert_eq!(wrapped, "<table><tr><td>a</td></tr></table>");
    }

    #[test]
    fn test_complete_tables_untouched() {
        let html = "<table><tr><td>a</td></tr></table>";
        assert_eq!(wrap_excel_fragment(html, ""), html);
    }

    #[test]
    fn test_visible_border_detection() {
        let mut format = TableCellFormat::default();
        assert!(!has_visible_border(&format));
        format.border_top = Some("none".into());
        assert!(!has_visible_border(&format));
        format.border_left = Some(".5pt solid windowtext".into());
        assert!(has_visible_border(&format));
    }
}
