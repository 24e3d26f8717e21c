//! Classifying where clipboard content came from.

use std::fmt;

use weaver_dom::{DomTree, NodeId};
use weaver_editor_core::BeforePasteEvent;

const WORD_ATTRIBUTE_NAME: &str = "xmlns:w";
const WORD_ATTRIBUTE_VALUE: &str = "urn:schemas-microsoft-com:office:word";
const EXCEL_ATTRIBUTE_NAME: &str = "xmlns:x";
const EXCEL_ATTRIBUTE_VALUE: &str = "urn:schemas-microsoft-com:office:excel";
const PROG_ID_NAME: &str = "ProgId";
const GENERATOR_NAME: &str = "Generator";
const WORD_PROG_ID: &str = "Word.Document";
const EXCEL_PROG_ID: &str = "Excel.Sheet";
const POWERPOINT_PROG_ID: &str = "PowerPoint.Slide";
const EXCEL_GENERATOR_PREFIX: &str = "Microsoft Excel";
const GOOGLE_SHEETS_TAG: &str = "google-sheets-html-origin";

/// The application a paste came from, as far as its markup tells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PasteSource {
    WordDesktop,
    /// Word or PowerPoint for the web.
    WacComponents,
    ExcelOnline,
    ExcelDesktop,
    GoogleSheets,
    PowerPointDesktop,
    Default,
}

impl fmt::Display for PasteSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PasteSource::WordDesktop => "wordDesktop",
            PasteSource::WacComponents => "wacComponents",
            PasteSource::ExcelOnline => "excelOnline",
            PasteSource::ExcelDesktop => "excelDesktop",
            PasteSource::GoogleSheets => "googleSheets",
            PasteSource::PowerPointDesktop => "powerPointDesktop",
            PasteSource::Default => "default",
        };
        f.write_str(name)
    }
}

/// Classify a paste. Checks run in a fixed order and the first match wins;
/// a plain text paste is always [`PasteSource::Default`].
pub fn get_paste_source(event: &BeforePasteEvent, is_plain_text: bool) -> PasteSource {
    if is_plain_text {
        return PasteSource::Default;
    }
    let attributes = &event.html_attributes;
    let attribute = |name: &str| attributes.get(name).map(String::as_str);
    let prog_id = attribute(PROG_ID_NAME);

    if prog_id == Some(WORD_PROG_ID) || attribute(WORD_ATTRIBUTE_NAME) == Some(WORD_ATTRIBUTE_VALUE) {
        return PasteSource::WordDesktop;
    }
    let excel_generator = attribute(GENERATOR_NAME)
        .is_some_and(|generator| generator.starts_with(EXCEL_GENERATOR_PREFIX));
    if attribute(EXCEL_ATTRIBUTE_NAME) == Some(EXCEL_ATTRIBUTE_VALUE)
        || (prog_id == Some(EXCEL_PROG_ID) && excel_generator)
    {
        return PasteSource::ExcelDesktop;
    }
    if prog_id == Some(EXCEL_PROG_ID) {
        return PasteSource::ExcelOnline;
    }
    if prog_id == Some(POWERPOINT_PROG_ID) {
        return PasteSource::PowerPointDesktop;
    }

    let tree = &event.fragment.tree;
    let root = event.fragment.root;
    if tree.descendants(root).any(|node| is_wac_marker(tree, node)) {
        return PasteSource::WacComponents;
    }
    if tree
        .descendants(root)
        .any(|node| tree.has_tag(node, GOOGLE_SHEETS_TAG))
    {
        return PasteSource::GoogleSheets;
    }
    PasteSource::Default
}

fn is_wac_marker(tree: &DomTree, node: NodeId) -> bool {
    if tree.has_tag(node, "span")
        && (tree.has_class(node, "WACImageContainer") || tree.has_class(node, "WACImageBorder"))
    {
        return true;
    }
    if !tree.has_class(node, "OutlineElement") {
        return false;
    }
    let Some(parent) = tree.parent(node) else {
        return false;
    };
    let class_starts_with =
        |prefix: &str| tree.attribute(parent, "class").is_some_and(|c| c.starts_with(prefix));
    (tree.has_tag(parent, "ul") && class_starts_with("BulletListStyle"))
        || (tree.has_tag(parent, "ol") && class_starts_with("NumberListStyle"))
}

#[cfg(test)]
mod tests {
    use weaver_dom::parse_fragment_into;
    use weaver_editor_core::{ClipboardData, PasteFragment, PasteType};

    use super::*;

    fn event(attributes: &[(&str, &str)], html: &str) -> BeforePasteEvent {
        let mut fragment = PasteFragment::new();
        parse_fragment_into(&mut fragment.tree, fragment.root, html).unwrap();
        BeforePasteEvent {
            clipboard_data: ClipboardData::from_html(html, ""),
            fragment,
            html_before: String::new(),
            html_after: String::new(),
            html_attributes: attributes
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            sanitizing_option: Default::default(),
            dom_to_model_option: Default::default(),
            paste_type: PasteType::Normal,
        }
    }

    #[test]
    fn test_office_desktop_markers() {
        let word = event(&[("ProgId", "Word.Document")], "<p>x</p>");
        assert_eq!(get_paste_source(&word, false), PasteSource::WordDesktop);

        let word_ns = event(&[("xmlns:w", WORD_ATTRIBUTE_VALUE)], "<p>x</p>");
        assert_eq!(get_paste_source(&word_ns, false), PasteSource::WordDesktop);

        let excel = event(
            &[("ProgId", "Excel.Sheet"), ("Generator", "Microsoft Excel 15")],
            "<table></table>",
        );
        assert_eq!(get_paste_source(&excel, false), PasteSource::ExcelDesktop);

        let excel_online = event(&[("ProgId", "Excel.Sheet")], "<table></table>");
        assert_eq!(get_paste_source(&excel_online, false), PasteSource::ExcelOnline);

        let slide = event(&[("ProgId", "PowerPoint.Slide")], "<p>x</p>");
        assert_eq!(get_paste_source(&slide, false), PasteSource::PowerPointDesktop);
    }

    #[test]
    fn test_word_wins_over_excel_markers() {
        let both = event(
            &[("xmlns:w", WORD_ATTRIBUTE_VALUE), ("xmlns:x", EXCEL_ATTRIBUTE_VALUE)],
            "<p>x</p>",
        );
        assert_eq!(get_paste_source(&both, false), PasteSource::WordDesktop);
    }

    #[test]
    fn test_fragment_markers() {
        let wac = event(
            &[],
            r#"<ul class="BulletListStyle1"><li class="OutlineElement Ltr">x</li></ul>"#,
        );
        assert_eq!(get_paste_source(&wac, false), PasteSource::WacComponents);

        let wac_image = event(&[], r#"<span class="WACImageContainer"><img></span>"#);
        assert_eq!(get_paste_source(&wac_image, false), PasteSource::WacComponents);

        let loose_outline = event(&[], r#"<div class="OutlineElement">x</div>"#);
        assert_eq!(get_paste_source(&loose_outline, false), PasteSource::Default);

        let sheets = event(&[], "<google-sheets-html-origin><table></table></google-sheets-html-origin>");
        assert_eq!(get_paste_source(&sheets, false), PasteSource::GoogleSheets);
    }

    #[test]
    fn test_plain_text_is_always_default() {
        let word = event(&[("ProgId", "Word.Document")], "<p>x</p>");
        assert_eq!(get_paste_source(&word, true), PasteSource::Default);
    }
}
