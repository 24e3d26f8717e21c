//! Building the paste fragment from clipboard data.

use smol_str::SmolStr;
use weaver_content_model::SegmentFormat;
use weaver_dom::{DomError, DomTree, NodeId, ParsedHtml, parse_html};
use weaver_editor_core::{ClipboardData, PasteFragment, PasteType, TrustedHtmlHandler};

pub const START_FRAGMENT: &str = "<!--StartFragment-->";
pub const END_FRAGMENT: &str = "<!--EndFragment-->";

const NBSP: char = '\u{a0}';

/// Clipboard HTML cut at the Office fragment markers. Without markers the
/// whole input is the fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HtmlStrings<'a> {
    pub before: &'a str,
    pub fragment: &'a str,
    pub after: &'a str,
}

pub fn split_html(raw: &str) -> HtmlStrings<'_> {
    let start = raw.find(START_FRAGMENT);
    let end = raw.rfind(END_FRAGMENT);
    match (start, end) {
        (Some(start), Some(end)) if end >= start + START_FRAGMENT.len() => HtmlStrings {
            before: &raw[..start],
            fragment: &raw[start + START_FRAGMENT.len()..end],
            after: &raw[end + END_FRAGMENT.len()..],
        },
        _ => HtmlStrings {
            before: "",
            fragment: raw,
            after: "",
        },
    }
}

/// Parsed clipboard document plus what the normalizers read off it.
#[derive(Debug)]
pub struct HtmlInfo {
    pub document: ParsedHtml,
    pub html_before: String,
    pub html_after: String,
    pub first_level_child_tags: Vec<SmolStr>,
}

/// Parse clipboard HTML through the trusted handler.
pub fn retrieve_html_info(
    raw_html: &str,
    trusted: &dyn TrustedHtmlHandler,
) -> Result<HtmlInfo, DomError> {
    let strings = split_html(raw_html);
    let document = parse_html(&trusted.trust(raw_html))?;
    let first_level_child_tags = document
        .tree
        .element_children(document.body)
        .into_iter()
        .filter_map(|child| document.tree.tag_name(child).map(SmolStr::new))
        .collect();
    Ok(HtmlInfo {
        html_before: strings.before.to_string(),
        html_after: strings.after.to_string(),
        first_level_child_tags,
        document,
    })
}

/// Resolve what gets pasted: an image, the HTML body or the plain text, in
/// that order of preference.
pub fn create_paste_fragment(
    clipboard: &ClipboardData,
    paste_type: PasteType,
    document: Option<&ParsedHtml>,
) -> PasteFragment {
    let mut fragment = PasteFragment::new();
    let image = clipboard.image_data_uri.as_deref().filter(|_| {
        paste_type == PasteType::AsImage
            || (paste_type != PasteType::AsPlainText && clipboard.text.is_empty())
    });

    if let Some(uri) = image {
        tracing::debug!("pasting clipboard image");
        let img = fragment.tree.create_element("img");
        fragment.tree.set_attribute(img, "src", uri);
        fragment.tree.set_style_property(img, "max-width", "100%");
        fragment.tree.append_child(fragment.root, img);
    } else if let Some(document) = document.filter(|_| paste_type != PasteType::AsPlainText) {
        tracing::debug!("pasting clipboard html");
        import_children(&mut fragment, &document.tree, document.body);
    } else if !clipboard.text.is_empty() {
        tracing::debug!("pasting clipboard text");
        append_text_lines(&mut fragment.tree, fragment.root, &clipboard.text);
    }
    fragment
}

/// Replace the fragment's content with copies of `parent`'s children.
pub fn import_children(fragment: &mut PasteFragment, source: &DomTree, parent: NodeId) {
    fragment.tree.remove_all_children(fragment.root);
    for &child in source.children(parent) {
        let copy = fragment.tree.import(source, child);
        fragment.tree.append_child(fragment.root, copy);
    }
}

/// Lay plain text out as DOM. Two lines become `text<br>text`; with more,
/// the first and last lines stay bare and each middle line gets its own
/// `div`.
fn append_text_lines(tree: &mut DomTree, parent: NodeId, text: &str) {
    let lines: Vec<String> = text.split('\n').map(preserve_spaces).collect();
    let count = lines.len();
    for (index, line) in lines.into_iter().enumerate() {
        let is_middle = index > 0 && index + 1 < count;
        if is_middle {
            let div = tree.create_element("div");
            let content = if line.is_empty() {
                tree.create_element("br")
            } else {
                tree.create_text(line)
            };
            tree.append_child(div, content);
            tree.append_child(parent, div);
            continue;
        }
        if !line.is_empty() {
            let node = tree.create_text(line);
            tree.append_child(parent, node);
        }
        if count == 2 && index == 0 {
            let br = tree.create_element("br");
            tree.append_child(parent, br);
        }
    }
}

/// Keep runs of spaces visible once rendered.
fn preserve_spaces(line: &str) -> String {
    let line = match line.strip_prefix(' ') {
        Some(rest) => format!("{NBSP}{rest}"),
        None => line.to_string(),
    };
    line.replace('\r', "").replace("  ", &format!(" {NBSP}"))
}

/// Wrap the fragment in a span carrying the caret's visible format so the
/// pasted content inherits it.
pub fn wrap_with_format_span(fragment: &mut PasteFragment, format: &SegmentFormat) {
    let styles: Vec<(String, String)> = [
        ("font-family", &format.font_family),
        ("font-size", &format.font_size),
        ("color", &format.text_color),
        ("background-color", &format.background_color),
        ("letter-spacing", &format.letter_spacing),
    ]
    .into_iter()
    .filter_map(|(name, value)| value.as_ref().map(|v| (name.to_string(), v.to_string())))
    .collect();
    if styles.is_empty() || fragment.is_empty() {
        return;
    }
    let span = fragment.tree.create_element("span");
    fragment.tree.set_styles(span, &styles);
    fragment.tree.move_children(fragment.root, span);
    fragment.tree.append_child(fragment.root, span);
}

/// The part of the caret format a wrapper span can carry.
pub fn visible_format(format: &SegmentFormat) -> SegmentFormat {
    SegmentFormat {
        font_family: format.font_family.clone(),
        font_size: format.font_size.clone(),
        text_color: format.text_color.clone(),
        background_color: format.background_color.clone(),
        letter_spacing: format.letter_spacing.clone(),
        ..Default::default()
    }
}
