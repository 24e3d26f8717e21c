//! Built-in format parsers.

use weaver_dom::{DomTree, NodeId, expand_box_shorthand};

use crate::format::{
    BlockFormat, BoxFormat, LinkFormat, ListLevelFormat, ListThreadFormat, SegmentFormat, Side,
    TableCellFormat, TableFormat,
};

const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "body", "center", "dd", "div", "dl", "dt",
    "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6",
    "header", "hr", "li", "main", "nav", "ol", "p", "pre", "section", "table", "td", "th", "tr",
    "ul",
];

pub fn is_block_tag(tag: &str) -> bool {
    BLOCK_TAGS.iter().any(|t| t.eq_ignore_ascii_case(tag))
}

fn push_script(format: &mut SegmentFormat, kind: &str) {
    let sequence = match format.super_or_sub_script_sequence.take() {
        Some(existing) if !existing.is_empty() => format!("{existing} {kind}"),
        _ => kind.to_string(),
    };
    format.super_or_sub_script_sequence = Some(sequence);
}

pub(super) fn parse_segment(format: &mut SegmentFormat, tree: &DomTree, node: NodeId) {
    let Some(tag) = tree.tag_name(node) else {
        return;
    };
    match tag {
        "b" | "strong" => format.font_weight = Some("bold".into()),
        "i" | "em" => format.italic = Some(true),
        "u" | "ins" => format.underline = Some(true),
        "s" | "strike" | "del" => format.strikethrough = Some(true),
        "sup" => push_script(format, "super"),
        "sub" => push_script(format, "sub"),
        "font" => {
            if let Some(face) = tree.attribute(node, "face") {
                format.font_family = Some(face.to_string());
            }
            if let Some(color) = tree.attribute(node, "color") {
                format.text_color = Some(color.to_string());
            }
        }
        _ => {}
    }

    let inline = !is_block_tag(tag);
    for (name, value) in tree.styles(node) {
        match name.as_str() {
            "font-family" => format.font_family = Some(value),
            "font-size" => format.font_size = Some(value),
            "font-weight" => format.font_weight = Some(value),
            "font-style" => format.italic = Some(value == "italic" || value == "oblique"),
            "text-decoration" | "text-decoration-line" => {
                if value.contains("underline") {
                    format.underline = Some(true);
                }
                if value.contains("line-through") {
                    format.strikethrough = Some(true);
                }
                if value == "none" {
                    format.underline = Some(false);
                    format.strikethrough = Some(false);
                }
            }
            "color" => format.text_color = Some(value),
            "background-color" if inline => format.background_color = Some(value),
            "letter-spacing" => format.letter_spacing = Some(value),
            _ => {}
        }
    }
}

/// Box fields shared by every block-like format.
pub(super) fn parse_box<F: BoxFormat>(format: &mut F, tree: &DomTree, node: NodeId) {
    if let Some(dir) = tree.attribute(node, "dir") {
        *format.direction_mut() = Some(dir.to_ascii_lowercase());
    }
    if !tree.has_tag(node, "table") {
        if let Some(align) = tree.attribute(node, "align") {
            *format.text_align_mut() = Some(align.to_ascii_lowercase());
        }
    }
    if let Some(color) = tree.attribute(node, "bgcolor") {
        *format.background_color_mut() = Some(color.to_string());
    }

    for (name, value) in tree.styles(node) {
        match name.as_str() {
            "direction" => *format.direction_mut() = Some(value),
            "text-align" => *format.text_align_mut() = Some(value),
            "background-color" => *format.background_color_mut() = Some(value),
            "margin" | "padding" | "border" => {
                let sides = if name == "border" {
                    Some([value.clone(), value.clone(), value.clone(), value])
                } else {
                    expand_box_shorthand(&value)
                };
                let Some(sides) = sides else {
                    continue;
                };
                for (side, value) in Side::ALL.into_iter().zip(sides) {
                    let slot = match name.as_str() {
                        "margin" => format.margin_mut(side),
                        "padding" => format.padding_mut(side),
                        _ => format.border_mut(side),
                    };
                    *slot = Some(value);
                }
            }
            other => {
                let Some((kind, side)) = other.split_once('-') else {
                    continue;
                };
                let side = match side {
                    "top" => Side::Top,
                    "right" => Side::Right,
                    "bottom" => Side::Bottom,
                    "left" => Side::Left,
                    _ => continue,
                };
                match kind {
                    "margin" => *format.margin_mut(side) = Some(value),
                    "padding" => *format.padding_mut(side) = Some(value),
                    "border" => *format.border_mut(side) = Some(value),
                    _ => {}
                }
            }
        }
    }
}

pub(super) fn parse_block(format: &mut BlockFormat, tree: &DomTree, node: NodeId) {
    parse_box(format, tree, node);
    for (name, value) in tree.styles(node) {
        match name.as_str() {
            "line-height" => format.line_height = Some(value),
            "white-space" => format.white_space = Some(value),
            "text-indent" => format.text_indent = Some(value),
            _ => {}
        }
    }
}

/// Attribute dimensions are bare numbers; style ones carry units.
fn dimension_attribute(tree: &DomTree, node: NodeId, name: &str) -> Option<String> {
    let value = tree.attribute(node, name)?.trim();
    if value.is_empty() {
        return None;
    }
    if value.chars().all(|c| c.is_ascii_digit() || c == '.') {
        Some(format!("{value}px"))
    } else {
        Some(value.to_string())
    }
}

pub(super) fn parse_table(format: &mut TableFormat, tree: &DomTree, node: NodeId) {
    parse_box(format, tree, node);
    if let Some(width) = dimension_attribute(tree, node, "width") {
        format.width = Some(width);
    }
    for (name, value) in tree.styles(node) {
        match name.as_str() {
            "border-collapse" => format.border_collapse = Some(value == "collapse"),
            "width" => format.width = Some(value),
            "table-layout" => format.table_layout = Some(value),
            _ => {}
        }
    }
}

pub(super) fn parse_table_cell(format: &mut TableCellFormat, tree: &DomTree, node: NodeId) {
    parse_box(format, tree, node);
    if let Some(valign) = tree.attribute(node, "valign") {
        format.vertical_align = Some(valign.to_ascii_lowercase());
    }
    if let Some(width) = dimension_attribute(tree, node, "width") {
        format.width = Some(width);
    }
    if let Some(height) = dimension_attribute(tree, node, "height") {
        format.height = Some(height);
    }
    for (name, value) in tree.styles(node) {
        match name.as_str() {
            "vertical-align" => format.vertical_align = Some(value),
            "width" => format.width = Some(value),
            "height" => format.height = Some(value),
            _ => {}
        }
    }
}

fn list_style_from_type(kind: &str) -> Option<&'static str> {
    Some(match kind {
        "1" => "decimal",
        "a" => "lower-alpha",
        "A" => "upper-alpha",
        "i" => "lower-roman",
        "I" => "upper-roman",
        "disc" => "disc",
        "circle" => "circle",
        "square" => "square",
        _ => return None,
    })
}

pub(super) fn parse_list_level(format: &mut ListLevelFormat, tree: &DomTree, node: NodeId) {
    parse_box(format, tree, node);
    if let Some(start) = tree.attribute(node, "start").and_then(|s| s.trim().parse().ok()) {
        format.start_number_override = Some(start);
    }
    if let Some(style) = tree.attribute(node, "type").and_then(list_style_from_type) {
        format.list_style_type = Some(style.to_string());
    }
    if let Some(style) = tree.style_property(node, "list-style-type") {
        format.list_style_type = Some(style);
    }
}

pub(super) fn parse_list_thread(format: &mut ListThreadFormat, tree: &DomTree, node: NodeId) {
    if let Some(value) = tree.attribute(node, "value").and_then(|s| s.trim().parse().ok()) {
        format.start_number_override = Some(value);
    }
}

pub(super) fn parse_link(format: &mut LinkFormat, tree: &DomTree, node: NodeId) {
    for (name, slot) in [
        ("href", &mut format.href),
        ("target", &mut format.target),
        ("title", &mut format.title),
        ("rel", &mut format.rel),
    ] {
        if let Some(value) = tree.attribute(node, name) {
            *slot = Some(value.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weaver_dom::parse_fragment_into;

    fn element(html: &str) -> (DomTree, NodeId) {
        let mut tree = DomTree::new();
        let root = tree.create_fragment();
        parse_fragment_into(&mut tree, root, html).unwrap();
        let node = tree.first_child(root).unwrap();
        (tree, node)
    }

    #[test]
    fn test_segment_tags_and_styles() {
        let (tree, node) = element(r#"<b style="font-size: 12pt; color: red; background-color: yellow">x</b>"#);
        let mut format = SegmentFormat::default();
        parse_segment(&mut format, &tree, node);
        assert_eq!(format.font_weight.as_deref(), Some("bold"));
        assert_eq!(format.font_size.as_deref(), Some("12pt"));
        assert_eq!(format.text_color.as_deref(), Some("red"));
        assert_eq!(format.background_color.as_deref(), Some("yellow"));
    }

    #[test]
    fn test_block_background_stays_off_segments() {
        let (tree, node) = element(r#"<p style="background-color: yellow">x</p>"#);
        let mut segment = SegmentFormat::default();
        parse_segment(&mut segment, &tree, node);
        assert_eq!(segment.background_color, None);

        let mut block = BlockFormat::default();
        parse_block(&mut block, &tree, node);
        assert_eq!(block.background_color.as_deref(), Some("yellow"));
    }

    #[test]
    fn test_box_shorthand_expands() {
        let (tree, node) = element(r#"<div style="margin: 1px 2px; border-left: 1px solid red">x</div>"#);
        let mut format = BlockFormat::default();
        parse_block(&mut format, &tree, node);
        assert_eq!(format.margin_top.as_deref(), Some("1px"));
        assert_eq!(format.margin_right.as_deref(), Some("2px"));
        assert_eq!(format.margin_bottom.as_deref(), Some("1px"));
        assert_eq!(format.margin_left.as_deref(), Some("2px"));
        assert_eq!(format.border_left.as_deref(), Some("1px solid red"));
        assert_eq!(format.border_top, None);
    }

    #[test]
    fn test_nested_scripts_build_a_sequence() {
        let mut format = SegmentFormat::default();
        push_script(&mut format, "super");
        push_script(&mut format, "sub");
        assert_eq!(format.super_or_sub_script_sequence.as_deref(), Some("super sub"));
    }

    #[test]
    fn test_list_level_attributes() {
        let (tree, node) = element(r#"<ol start="3" type="a"><li>x</li></ol>"#);
        let mut format = ListLevelFormat::default();
        parse_list_level(&mut format, &tree, node);
        assert_eq!(format.start_number_override, Some(3));
        assert_eq!(format.list_style_type.as_deref(), Some("lower-alpha"));
    }

    #[test]
    fn test_cell_dimension_attributes_get_units() {
        let (tree, node) = element(r#"<td width="120" valign="TOP">x</td>"#);
        let mut format = TableCellFormat::default();
        parse_table_cell(&mut format, &tree, node);
        assert_eq!(format.width.as_deref(), Some("120px"));
        assert_eq!(format.vertical_align.as_deref(), Some("top"));
    }
}
