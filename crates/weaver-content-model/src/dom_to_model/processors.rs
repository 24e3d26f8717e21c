//! Default element processors.

use smol_str::SmolStr;
use weaver_dom::{DomTree, NodeId, inner_html, parse_length_px};

use super::DomToModelContext;
use super::parsers::is_block_tag;
use crate::entity::{ZERO_WIDTH_SPACE, parse_entity_format};
use crate::format::TableCellFormat;
use crate::model::{
    Block, BlockGroup, Divider, Entity, FormatContainer, GeneralElement, GeneralSegment, Image,
    ListItem, ListLevel, ListType, Paragraph, ParagraphDecorator, Segment, Table, TableCell,
    TableRow, Text, WrapperHandle,
};
use crate::normalize::normalize_blocks;

pub(super) type ProcessorFn = fn(&mut Vec<Block>, NodeId, &mut DomToModelContext<'_>);

pub(super) fn default_processor(key: &str) -> ProcessorFn {
    match key {
        "entity" => process_entity,
        "delimiter" => process_delimiter,
        "blockEntityContainer" | "html" | "body" => process_children_only,
        "br" => process_br,
        "img" => process_image,
        "hr" => process_divider,
        "blockquote" => process_format_container,
        "ul" | "ol" => process_list,
        "li" => process_list_item,
        "table" => process_table,
        "script" | "style" | "head" | "meta" | "title" | "link" | "template" | "noscript"
        | "colgroup" | "col" => process_nothing,
        "svg" | "math" | "iframe" | "object" | "embed" | "video" | "audio" | "canvas" => {
            process_general_segment
        }
        tag if is_block_tag(tag) => process_block,
        _ => process_inline,
    }
}

fn tag_of(tree: &DomTree, node: NodeId) -> SmolStr {
    SmolStr::new(tree.tag_name(node).unwrap_or("span"))
}

fn process_nothing(_group: &mut Vec<Block>, _node: NodeId, _context: &mut DomToModelContext<'_>) {}

fn process_children_only(group: &mut Vec<Block>, node: NodeId, context: &mut DomToModelContext<'_>) {
    context.process_children(group, node);
}

// === Text ===

enum Boundary {
    Caret,
    Start,
    End,
}

fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for c in text.chars() {
        if matches!(c, ' ' | '\t' | '\n' | '\r' | '\x0C') {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}

pub(super) fn process_text(group: &mut Vec<Block>, node: NodeId, context: &mut DomToModelContext<'_>) {
    let Some(raw) = context.tree.text(node) else {
        return;
    };
    let text: Vec<char> = if context.in_delimiter {
        raw.chars().filter(|&c| c != ZERO_WIDTH_SPACE).collect()
    } else {
        raw.chars().collect()
    };

    let mut cuts: Vec<(usize, Boundary)> = Vec::new();
    if let Some(selection) = context.selection {
        if selection.is_collapsed() {
            if selection.start.node == node {
                cuts.push((selection.start.offset, Boundary::Caret));
            }
        } else {
            if selection.start.node == node {
                cuts.push((selection.start.offset, Boundary::Start));
            }
            if selection.end.node == node {
                cuts.push((selection.end.offset, Boundary::End));
            }
        }
    }
    cuts.sort_by_key(|(offset, _)| *offset);

    let mut from = 0;
    for (offset, boundary) in cuts {
        let offset = offset.clamp(from, text.len());
        add_text(group, &text[from..offset], context);
        from = offset;
        match boundary {
            Boundary::Caret => {
                let marker = Segment::marker(context.segment_format.clone());
                context.add_segment(group, marker);
            }
            Boundary::Start => context.is_in_selection = true,
            Boundary::End => context.is_in_selection = false,
        }
    }
    add_text(group, &text[from..], context);
}

fn add_text(group: &mut Vec<Block>, chars: &[char], context: &mut DomToModelContext<'_>) {
    if chars.is_empty() {
        return;
    }
    let mut text: String = chars.iter().collect();
    let preformatted = context
        .block_format
        .white_space
        .as_deref()
        .is_some_and(|w| w.starts_with("pre"));
    if !preformatted {
        text = collapse_whitespace(&text);
        if context.is_paragraph_empty(group) {
            text = text.trim_start().to_string();
        }
    }
    if text.is_empty() {
        return;
    }

    if let Some(Block::Paragraph(paragraph)) = group.last_mut() {
        if let Some(Segment::Text(last)) = paragraph.segments.last_mut() {
            if last.format == context.segment_format
                && last.link == context.link
                && last.is_selected == context.is_in_selection
            {
                last.text.push_str(&text);
                return;
            }
        }
    }
    let segment = Segment::Text(Text {
        text,
        format: context.segment_format.clone(),
        link: context.link.clone(),
        is_selected: false,
    });
    context.add_segment(group, segment);
}

// === Inline ===

fn process_inline(group: &mut Vec<Block>, node: NodeId, context: &mut DomToModelContext<'_>) {
    let format = context.parse_segment_format(node);
    let saved_format = std::mem::replace(&mut context.segment_format, format);
    let saved_link = context.link.clone();
    if context.tree.has_tag(node, "a") && context.tree.has_attribute(node, "href") {
        context.link = Some(context.parse_link_format(node));
    }

    context.process_children(group, node);

    context.segment_format = saved_format;
    context.link = saved_link;
}

fn process_br(group: &mut Vec<Block>, _node: NodeId, context: &mut DomToModelContext<'_>) {
    let br = Segment::br(context.segment_format.clone());
    context.add_segment(group, br);
}

fn process_image(group: &mut Vec<Block>, node: NodeId, context: &mut DomToModelContext<'_>) {
    let tree = context.tree;
    let Some(src) = tree.attribute(node, "src") else {
        return;
    };
    let image = Segment::Image(Image {
        src: src.to_string(),
        alt: tree.attribute(node, "alt").map(str::to_string),
        format: context.segment_format.clone(),
        link: context.link.clone(),
        is_selected: false,
    });
    context.add_segment(group, image);
}

fn process_general_segment(group: &mut Vec<Block>, node: NodeId, context: &mut DomToModelContext<'_>) {
    let tree = context.tree;
    let segment = Segment::General(GeneralSegment {
        element: GeneralElement {
            tag: tag_of(tree, node),
            attributes: tree
                .attributes(node)
                .iter()
                .map(|a| (a.name.clone(), a.value.clone()))
                .collect(),
        },
        html: inner_html(tree, node),
        format: context.segment_format.clone(),
        is_selected: false,
    });
    context.add_segment(group, segment);
    context.collapse_selection_inside(group, node);
}

// === Blocks ===

fn process_block(group: &mut Vec<Block>, node: NodeId, context: &mut DomToModelContext<'_>) {
    let tag = tag_of(context.tree, node);
    let mut format = context.parse_block_format(node);
    if tag == "pre" && format.white_space.is_none() {
        format.white_space = Some("pre".into());
    }
    let segment_format = context.parse_segment_format(node);
    let saved_segment = std::mem::replace(&mut context.segment_format, segment_format);
    let saved_block = std::mem::replace(
        &mut context.block_format,
        DomToModelContext::inheritable(&format),
    );

    let mut paragraph = Paragraph::new(false, format);
    if matches!(tag.as_str(), "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "pre") {
        paragraph.decorator = Some(ParagraphDecorator {
            tag: tag.clone(),
            format: Default::default(),
        });
    }
    context.add_block(group, Block::Paragraph(paragraph));
    context.process_children(group, node);

    context.segment_format = saved_segment;
    context.block_format = saved_block;
    let trailing = Paragraph::new(true, context.block_format.clone());
    context.add_block(group, Block::Paragraph(trailing));
}

fn process_divider(group: &mut Vec<Block>, node: NodeId, context: &mut DomToModelContext<'_>) {
    let divider = Divider {
        tag: tag_of(context.tree, node),
        format: context.parse_block_format(node),
        is_selected: context.is_in_selection,
    };
    context.add_block(group, Block::Divider(divider));
}

fn process_format_container(group: &mut Vec<Block>, node: NodeId, context: &mut DomToModelContext<'_>) {
    let mut container = FormatContainer {
        tag: tag_of(context.tree, node),
        blocks: Vec::new(),
        format: context.parse_container_format(node),
    };
    let segment_format = context.parse_segment_format(node);
    let saved_segment = std::mem::replace(&mut context.segment_format, segment_format);
    let inherited = DomToModelContext::inheritable(&context.parse_block_format(node));
    let saved_block = std::mem::replace(&mut context.block_format, inherited);

    context.process_children(&mut container.blocks, node);

    context.segment_format = saved_segment;
    context.block_format = saved_block;
    context.add_block(group, Block::BlockGroup(BlockGroup::FormatContainer(container)));
}

// === Lists ===

fn process_list(group: &mut Vec<Block>, node: NodeId, context: &mut DomToModelContext<'_>) {
    let list_type = if context.tree.has_tag(node, "ol") {
        ListType::Ordered
    } else {
        ListType::Unordered
    };
    let mut level = ListLevel::new(list_type);
    level.format = context.parse_list_level_format(node);

    let segment_format = context.parse_segment_format(node);
    let saved_segment = std::mem::replace(&mut context.segment_format, segment_format);
    let saved_levels = context.list_format.levels.clone();
    context.list_format.levels.push(level);

    context.process_children(group, node);

    context.list_format.levels = saved_levels;
    context.segment_format = saved_segment;
}

fn process_list_item(group: &mut Vec<Block>, node: NodeId, context: &mut DomToModelContext<'_>) {
    if context.list_format.levels.is_empty() {
        return process_block(group, node, context);
    }

    let segment_format = context.parse_segment_format(node);
    let thread = context.parse_list_thread_format(node);
    let mut levels = context.list_format.levels.clone();
    if let (Some(start), Some(last)) = (thread.start_number_override, levels.last_mut()) {
        last.format.start_number_override = Some(start);
    }
    // a list's start number only applies to its first item
    if let Some(last) = context.list_format.levels.last_mut() {
        last.format.start_number_override = None;
    }

    let mut item = ListItem::new(levels, segment_format.clone());
    item.format = context.parse_block_format(node);

    let saved_segment = std::mem::replace(&mut context.segment_format, segment_format);
    let inherited = DomToModelContext::inheritable(&item.format);
    let saved_block = std::mem::replace(&mut context.block_format, inherited);

    let mut blocks = Vec::new();
    context.process_children(&mut blocks, node);

    context.segment_format = saved_segment;
    context.block_format = saved_block;

    let (nested, own): (Vec<Block>, Vec<Block>) = blocks
        .into_iter()
        .partition(|b| matches!(b, Block::BlockGroup(BlockGroup::ListItem(_))));
    item.blocks = own;
    context.add_block(group, Block::BlockGroup(BlockGroup::ListItem(item)));
    group.extend(nested);
}

// === Tables ===

fn table_rows(tree: &DomTree, table: NodeId) -> Vec<NodeId> {
    let mut rows = Vec::new();
    for child in tree.element_children(table) {
        match tree.tag_name(child) {
            Some("tr") => rows.push(child),
            Some("thead" | "tbody" | "tfoot") => rows.extend(
                tree.element_children(child)
                    .into_iter()
                    .filter(|&r| tree.has_tag(r, "tr")),
            ),
            _ => {}
        }
    }
    rows
}

fn column_widths(tree: &DomTree, table: NodeId) -> Vec<f32> {
    let mut widths = Vec::new();
    let owned_cols = tree.descendants(table).filter(|&n| {
        tree.has_tag(n, "col") && tree.closest(n, |t, a| t.has_tag(a, "table")) == Some(table)
    });
    for col in owned_cols {
        let width = tree
            .style_property(col, "width")
            .as_deref()
            .or(tree.attribute(col, "width"))
            .and_then(parse_length_px)
            .unwrap_or_default();
        let span = tree
            .attribute(col, "span")
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(1)
            .max(1);
        widths.extend(std::iter::repeat_n(width, span));
    }
    widths
}

fn span_attribute(tree: &DomTree, node: NodeId, name: &str) -> usize {
    tree.attribute(node, name)
        .and_then(|s| s.trim().parse::<usize>().ok())
        .unwrap_or(1)
        .max(1)
}

/// Rowspan coverage of one column: rows still covered, and whether the
/// column is inside a colspan too.
#[derive(Clone, Copy, Default)]
struct Coverage {
    rows_left: usize,
    span_left: bool,
}

fn push_covered(cells: &mut Vec<TableCell>, cover: &mut Coverage) {
    cover.rows_left -= 1;
    cells.push(TableCell::new(cover.span_left, true, false, TableCellFormat::default()));
}

fn process_table(group: &mut Vec<Block>, node: NodeId, context: &mut DomToModelContext<'_>) {
    let tree = context.tree;
    let mut table = Table {
        rows: Vec::new(),
        widths: column_widths(tree, node),
        format: context.parse_table_format(node),
    };

    let segment_format = context.parse_segment_format(node);
    let saved_segment = std::mem::replace(&mut context.segment_format, segment_format);
    let saved_block = std::mem::take(&mut context.block_format);

    let mut coverage: Vec<Coverage> = Vec::new();
    for tr in table_rows(tree, node) {
        let mut row = TableRow {
            cells: Vec::new(),
            format: context.parse_block_format(tr),
            height: tree
                .style_property(tr, "height")
                .as_deref()
                .or(tree.attribute(tr, "height"))
                .and_then(parse_length_px)
                .unwrap_or_default(),
        };
        let mut col = 0;
        for td in tree.element_children(tr) {
            let is_header = match tree.tag_name(td) {
                Some("th") => true,
                Some("td") => false,
                _ => continue,
            };
            while let Some(cover) = coverage.get_mut(col).filter(|c| c.rows_left > 0) {
                push_covered(&mut row.cells, cover);
                col += 1;
            }

            let mut cell = TableCell::new(false, false, is_header, context.parse_table_cell_format(td));
            let cell_segment_format = context.parse_segment_format(td);
            let outer_segment = std::mem::replace(&mut context.segment_format, cell_segment_format);
            let selected_before = context.is_in_selection;
            context.process_children(&mut cell.blocks, td);
            cell.is_selected = selected_before && context.is_in_selection;
            context.segment_format = outer_segment;

            normalize_blocks(&mut cell.blocks);
            if cell.blocks.is_empty() {
                cell.blocks = TableCell::with_br(false, TableCellFormat::default()).blocks;
            }

            let colspan = span_attribute(tree, td, "colspan");
            let rowspan = span_attribute(tree, td, "rowspan");
            row.cells.push(cell);
            for _ in 1..colspan {
                row.cells.push(TableCell::new(true, false, is_header, TableCellFormat::default()));
            }
            if rowspan > 1 {
                if coverage.len() < col + colspan {
                    coverage.resize(col + colspan, Coverage::default());
                }
                for (offset, cover) in coverage[col..col + colspan].iter_mut().enumerate() {
                    *cover = Coverage {
                        rows_left: rowspan - 1,
                        span_left: offset > 0,
                    };
                }
            }
            col += colspan;
        }

        // columns still covered from above after the last real cell
        let covered_until = coverage
            .iter()
            .rposition(|c| c.rows_left > 0)
            .map_or(0, |i| i + 1);
        while col < covered_until {
            match coverage.get_mut(col).filter(|c| c.rows_left > 0) {
                Some(cover) => push_covered(&mut row.cells, cover),
                None => row.cells.push(TableCell::with_br(false, TableCellFormat::default())),
            }
            col += 1;
        }
        table.rows.push(row);
    }

    let columns = table.column_count();
    for row in &mut table.rows {
        while row.cells.len() < columns {
            row.cells.push(TableCell::with_br(false, TableCellFormat::default()));
        }
    }

    context.segment_format = saved_segment;
    context.block_format = saved_block;
    if !table.rows.is_empty() {
        context.add_block(group, Block::Table(table));
    }
}

// === Entities ===

fn process_entity(group: &mut Vec<Block>, node: NodeId, context: &mut DomToModelContext<'_>) {
    let tree = context.tree;
    let wrapper_tag = tag_of(tree, node);
    let entity = Entity {
        wrapper: context
            .known_wrappers
            .get(&node)
            .copied()
            .unwrap_or_else(WrapperHandle::next),
        wrapper_tag: wrapper_tag.clone(),
        entity_format: parse_entity_format(tree, node),
        format: context.segment_format.clone(),
        html: inner_html(tree, node),
        is_selected: context.is_in_selection,
    };
    tracing::trace!(
        entity_type = ?entity.entity_format.entity_type,
        wrapper = entity.wrapper.raw(),
        "entity wrapper"
    );
    if is_block_tag(&wrapper_tag) {
        context.add_block(group, Block::Entity(entity));
    } else {
        context.add_segment(group, Segment::Entity(entity));
    }
    context.collapse_selection_inside(group, node);
}

fn process_delimiter(group: &mut Vec<Block>, node: NodeId, context: &mut DomToModelContext<'_>) {
    let only_zws = context
        .tree
        .text_content(node)
        .chars()
        .all(|c| c == ZERO_WIDTH_SPACE);
    if only_zws {
        context.collapse_selection_inside(group, node);
        return;
    }
    let saved = std::mem::replace(&mut context.in_delimiter, true);
    process_inline(group, node, context);
    context.in_delimiter = saved;
}
