//! Format parsers and processors every paste gets.

use std::rc::Rc;

use weaver_content_model::{
    Block, BlockFormat, BoxFormat, DomToModelContext, DomToModelOption, LinkFormat,
    ListLevelFormat, Side, TableCellFormat, TableFormat,
};
use weaver_dom::{DomTree, NodeData, NodeId, parse_length_px, split_top_level};
use weaver_editor_core::{BeforePasteEvent, PasteType};

const SUPPORTED_LINK_SCHEMES: &[&str] = &["http:", "https:", "notes:", "mailto:", "onenote:"];

const BORDER_STYLES: &[&str] = &[
    "none", "hidden", "dotted", "dashed", "solid", "double", "groove", "ridge", "inset", "outset",
];

/// Register the parsers applied to pastes from any source.
pub fn add_universal_parsers(event: &mut BeforePasteEvent) {
    let parsers = &mut event.dom_to_model_option.additional_format_parsers;
    parsers.link.push(Rc::new(parse_link));
    parsers
        .table
        .push(Rc::new(parse_deprecated_border_color::<TableFormat>));
    parsers
        .table_cell
        .push(Rc::new(parse_deprecated_border_color::<TableCellFormat>));
    if event.paste_type == PasteType::MergeFormat {
        parsers.block.push(Rc::new(remove_background::<BlockFormat>));
        parsers
            .list_level
            .push(Rc::new(remove_background::<ListLevelFormat>));
    }
}

/// Drop links whose target is not an absolute URL with a supported scheme.
pub fn parse_link(format: &mut LinkFormat, tree: &DomTree, node: NodeId) {
    let Some(href) = tree.attribute(node, "href") else {
        return;
    };
    let href = href.trim().to_ascii_lowercase();
    if !SUPPORTED_LINK_SCHEMES.iter().any(|scheme| href.starts_with(scheme)) {
        tracing::trace!(href, "dropping unsupported link");
        format.href = None;
        format.target = None;
    }
}

/// Apply the legacy `bordercolor` attribute to borders already set.
pub fn parse_deprecated_border_color<F: BoxFormat>(format: &mut F, tree: &DomTree, node: NodeId) {
    let Some(color) = tree.attribute(node, "bordercolor").filter(|c| !c.trim().is_empty()) else {
        return;
    };
    for side in Side::ALL {
        let Some(border) = format.border(side).filter(|b| !b.is_empty()) else {
            continue;
        };
        let recolored = with_border_color(border, color.trim());
        *format.border_mut(side) = Some(recolored);
    }
}

fn with_border_color(border: &str, color: &str) -> String {
    let mut parts: Vec<&str> = split_top_level(border, ' ')
        .into_iter()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    let is_color = |part: &str| {
        !BORDER_STYLES.contains(&part)
            && !matches!(part, "thin" | "medium" | "thick")
            && parse_length_px(part).is_none()
    };
    match parts.iter().position(|part| is_color(part)) {
        Some(index) => parts[index] = color,
        None => parts.push(color),
    }
    parts.join(" ")
}

fn remove_background<F: BoxFormat>(format: &mut F, _tree: &DomTree, _node: NodeId) {
    *format.background_color_mut() = None;
}

/// Install the `table` processor that only converts well-formed tables.
pub fn override_table_processor(option: &mut DomToModelOption) {
    option.override_processor("table", Rc::new(process_pasted_table));
}

/// Tables with stray content between their rows and cells become plain
/// block content instead of a table.
fn process_pasted_table(group: &mut Vec<Block>, node: NodeId, context: &mut DomToModelContext<'_>) {
    if is_well_formed_table(context.tree, node) {
        context.run_default("table", group, node);
    } else {
        tracing::debug!(%node, "converting malformed table as block content");
        context.run_default("div", group, node);
    }
}

fn is_well_formed_table(tree: &DomTree, table: NodeId) -> bool {
    tree.children(table).iter().all(|&child| match tree.tag_name(child) {
        Some("thead" | "tbody" | "tfoot") => tree.children(child).iter().all(|&row| {
            is_ignorable(tree, row) || (tree.has_tag(row, "tr") && is_well_formed_row(tree, row))
        }),
        Some("tr") => is_well_formed_row(tree, child),
        Some("caption" | "colgroup" | "col") => true,
        Some(_) => false,
        None => is_ignorable(tree, child),
    })
}

fn is_well_formed_row(tree: &DomTree, row: NodeId) -> bool {
    tree.children(row).iter().all(|&cell| {
        is_ignorable(tree, cell) || tree.has_tag(cell, "td") || tree.has_tag(cell, "th")
    })
}

fn is_ignorable(tree: &DomTree, node: NodeId) -> bool {
    match tree.data(node) {
        NodeData::Text(text) => text.trim().is_empty(),
        NodeData::Comment(_) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use weaver_content_model::{DomToModelSeed, dom_to_content_model};
    use weaver_dom::parse_fragment_into;

    use super::*;

    fn tree_of(html: &str) -> (DomTree, NodeId) {
        let mut tree = DomTree::new();
        let root = tree.create_element("div");
        parse_fragment_into(&mut tree, root, html).unwrap();
        (tree, root)
    }

    #[test]
    fn test_unsupported_links_lose_href_and_target() {
        let (tree, root) = tree_of(
            r#"<a href="javascript:x()" target="_blank">a</a><a href="https://x.y" target="_blank">b</a><a href="/relative">c</a>"#,
        );
        let links: Vec<NodeId> = tree.element_children(root);
        let parse = |node| {
            let mut format = LinkFormat {
                href: tree.attribute(node, "href").map(str::to_string),
                target: tree.attribute(node, "target").map(str::to_string),
                ..Default::default()
            };
            parse_link(&mut format, &tree, node);
            format
        };
        assert_eq!(parse(links[0]).href, None);
        assert_eq!(parse(links[0]).target, None);
        assert_eq!(parse(links[1]).href.as_deref(), Some("https://x.y"));
        assert_eq!(parse(links[1]).target.as_deref(), Some("_blank"));
        assert_eq!(parse(links[2]).href, None);
    }

    #[test]
    fn test_bordercolor_recolors_existing_borders() {
        let (tree, root) = tree_of(r#"<table bordercolor="red"></table>"#);
        let table = tree.element_children(root)[0];
        let mut format = TableFormat {
            border_top: Some("1px solid black".into()),
            border_left: Some("2px dashed".into()),
            ..Default::default()
        };
        parse_deprecated_border_color(&mut format, &tree, table);
        assert_eq!(format.border_top.as_deref(), Some("1px solid red"));
        assert_eq!(format.border_left.as_deref(), Some("2px dashed red"));
        assert_eq!(format.border_right, None);

        let mut cell = TableCellFormat::default();
        parse_deprecated_border_color(&mut cell, &tree, table);
        assert!(cell.is_empty());
    }

    #[test]
    fn test_malformed_table_becomes_blocks() {
        let mut option = DomToModelOption::default();
        override_table_processor(&mut option);

        let (tree, root) = tree_of("<table><tr><td>a</td></tr></table>");
        let model = dom_to_content_model(&tree, root, &option, &DomToModelSeed::default());
        assert!(matches!(model.blocks[0], Block::Table(_)));

        let (tree, root) = tree_of("<table><div>loose</div><tr><td>a</td></tr></table>");
        let model = dom_to_content_model(&tree, root, &option, &DomToModelSeed::default());
        assert!(!model.blocks.iter().any(|b| matches!(b, Block::Table(_))));
    }
}
