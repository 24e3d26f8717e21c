//! Merging a pasted model into the document at the caret.
//!
//! The pasted model is consumed block by block. Its first paragraph joins the
//! caret paragraph; every later paragraph splits the caret paragraph so the
//! text after the caret ends up after the pasted content. Non-paragraph
//! blocks are inserted between the two halves of a split. A single pasted
//! table dropped into a table cell can instead overwrite cells in place.

use std::fmt;
use std::rc::Rc;

use crate::context::FormatContentModelContext;
use crate::delete_selection::delete_selection;
use crate::format::{BlockFormat, SegmentFormat, TableCellFormat};
use crate::model::{
    Block, BlockGroup, ContentModelDocument, Image, ListItem, Paragraph, PathStep, Segment, Table,
    TableCell, TableRow, blocks_at_mut, collect_entities,
};
use crate::normalize::normalize_blocks;
use crate::selection::{InsertPoint, clear_selection, find_insert_point};

/// How the caret's format is overlaid onto pasted segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MergeFormat {
    /// Pasted segments keep their own format untouched.
    #[default]
    None,
    /// Caret format, then only bold/italic/underline from the source.
    KeepSourceEmphasisFormat,
    /// Caret format, then the full source format on top.
    MergeAll,
}

pub type CustomMerge = Rc<
    dyn Fn(
        &mut ContentModelDocument,
        ContentModelDocument,
        Option<&mut FormatContentModelContext>,
    ) -> Option<InsertPoint>,
>;

#[derive(Clone, Default)]
pub struct MergeModelOptions {
    pub merge_format: MergeFormat,
    /// Overwrite table cells when the source is a single table and the caret
    /// sits in a table.
    pub merge_table: bool,
    /// Replaces the whole merge policy when set.
    pub custom_merge: Option<CustomMerge>,
}

impl fmt::Debug for MergeModelOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MergeModelOptions")
            .field("merge_format", &self.merge_format)
            .field("merge_table", &self.merge_table)
            .field("custom_merge", &self.custom_merge.is_some())
            .finish()
    }
}

/// Drop the trailing empty line browsers add after a copied table, then
/// report whether the source is exactly one table.
pub fn should_merge_table(source: &mut ContentModelDocument) -> bool {
    if source.blocks.len() == 2
        && matches!(source.blocks[0], Block::Table(_))
        && matches!(
            &source.blocks[1],
            Block::Paragraph(p) if p.segments.len() == 1 && matches!(p.segments[0], Segment::Br(_))
        )
    {
        source.blocks.truncate(1);
    }
    source.blocks.len() == 1 && matches!(source.blocks[0], Block::Table(_))
}

/// Merge `source` into `target` at its selection, returning the caret after
/// the pasted content.
pub fn merge_model(
    target: &mut ContentModelDocument,
    mut source: ContentModelDocument,
    mut context: Option<&mut FormatContentModelContext>,
    options: &MergeModelOptions,
) -> Option<InsertPoint> {
    if let Some(custom) = &options.custom_merge {
        return custom(target, source, context);
    }

    let mut insert = delete_selection(&mut target.blocks, context.as_deref_mut()).insert_point?;
    clear_selection(&mut source.blocks);

    if options.merge_format != MergeFormat::None {
        let default_format = target.format.merged(&insert.marker.format);
        apply_default_format(&mut source.blocks, &default_format, options.merge_format);
    }

    if let Some(context) = context.as_deref_mut() {
        context
            .new_entities
            .extend(collect_entities(&source.blocks).into_iter().cloned());
        collect_images(&source.blocks, &mut context.new_images);
    }

    let merge_single_table = options.merge_table && should_merge_table(&mut source);
    tracing::debug!(
        blocks = source.blocks.len(),
        merge_single_table,
        merge_format = ?options.merge_format,
        "merging pasted model"
    );

    for (index, block) in source.blocks.into_iter().enumerate() {
        match block {
            Block::Paragraph(paragraph) => {
                merge_paragraph(&mut target.blocks, &mut insert, paragraph, index == 0)
            }
            Block::Table(table) if merge_single_table && insert.table_context.is_some() => {
                merge_table(&mut target.blocks, &mut insert, table)
            }
            Block::BlockGroup(BlockGroup::ListItem(item)) => {
                merge_list(&mut target.blocks, &mut insert, item)
            }
            block => insert_block(&mut target.blocks, &mut insert, block),
        }
    }

    normalize_blocks(&mut target.blocks);
    find_insert_point(&target.blocks)
}

fn semantic_format(format: &SegmentFormat) -> SegmentFormat {
    SegmentFormat {
        font_weight: format
            .font_weight
            .clone()
            .filter(|weight| weight != "normal"),
        italic: format.italic.filter(|italic| *italic),
        underline: format.underline.filter(|underline| *underline),
        ..Default::default()
    }
}

fn merge_segment_format(
    default_format: &SegmentFormat,
    source: &SegmentFormat,
    merge_format: MergeFormat,
) -> SegmentFormat {
    match merge_format {
        MergeFormat::MergeAll => default_format.merged(source),
        _ => default_format.merged(&semantic_format(source)),
    }
}

/// Overlay the caret format onto every pasted segment.
fn apply_default_format(blocks: &mut [Block], default_format: &SegmentFormat, merge_format: MergeFormat) {
    let keep_emphasis = merge_format == MergeFormat::KeepSourceEmphasisFormat;
    for block in blocks {
        match block {
            Block::Paragraph(paragraph) => {
                if keep_emphasis {
                    paragraph.format.background_color = None;
                }
                if let Some(decorator) = &mut paragraph.decorator {
                    decorator.format = merge_segment_format(default_format, &decorator.format, merge_format);
                }
                for segment in &mut paragraph.segments {
                    if matches!(segment, Segment::Entity(_)) {
                        continue;
                    }
                    let merged = merge_segment_format(default_format, segment.format(), merge_format);
                    *segment.format_mut() = merged;
                }
            }
            Block::BlockGroup(group) => {
                match group {
                    BlockGroup::ListItem(item) => {
                        if keep_emphasis {
                            item.format.background_color = None;
                        }
                        item.format_holder.format =
                            merge_segment_format(default_format, &item.format_holder.format, merge_format);
                    }
                    BlockGroup::FormatContainer(container) if keep_emphasis => {
                        container.format.background_color = None;
                    }
                    _ => {}
                }
                apply_default_format(group.blocks_mut(), default_format, merge_format);
            }
            Block::Table(table) => {
                for cell in table.rows.iter_mut().flat_map(|r| r.cells.iter_mut()) {
                    apply_default_format(&mut cell.blocks, default_format, merge_format);
                }
            }
            Block::Entity(_) | Block::Divider(_) => {}
        }
    }
}

fn collect_images(blocks: &[Block], out: &mut Vec<Image>) {
    for block in blocks {
        match block {
            Block::Paragraph(paragraph) => out.extend(paragraph.segments.iter().filter_map(|s| match s {
                Segment::Image(image) => Some(image.clone()),
                _ => None,
            })),
            Block::BlockGroup(group) => collect_images(group.blocks(), out),
            Block::Table(table) => {
                for cell in table.rows.iter().flat_map(|r| r.cells.iter()) {
                    collect_images(&cell.blocks, out);
                }
            }
            Block::Entity(_) | Block::Divider(_) => {}
        }
    }
}

/// Move everything from the caret onward into a new paragraph right after
/// the caret paragraph and point `insert` at it.
fn split_paragraph(blocks: &mut Vec<Block>, insert: &mut InsertPoint, format: &BlockFormat) {
    let Some(list) = blocks_at_mut(blocks, &insert.path) else {
        return;
    };
    let Some(paragraph) = list.get_mut(insert.paragraph).and_then(Block::as_paragraph_mut) else {
        return;
    };
    let at = paragraph.marker_index().unwrap_or(paragraph.segments.len());

    let mut tail = Paragraph::new(false, paragraph.format.merged(format));
    tail.segment_format = paragraph.segment_format.clone();
    tail.decorator = paragraph.decorator.clone();
    tail.segments = paragraph.segments.split_off(at);
    if paragraph.segments.is_empty() {
        paragraph.segments.push(Segment::br(insert.marker.format.clone()));
    }

    list.insert(insert.paragraph + 1, Block::Paragraph(tail));
    insert.paragraph += 1;
}

fn merge_paragraph(
    blocks: &mut Vec<Block>,
    insert: &mut InsertPoint,
    source: Paragraph,
    merge_to_current: bool,
) {
    if !merge_to_current {
        split_paragraph(blocks, insert, &source.format);
    }
    let Some(paragraph) = insert.paragraph_mut(blocks) else {
        return;
    };
    if !merge_to_current {
        paragraph.decorator = source.decorator;
    }
    let at = paragraph.marker_index().unwrap_or(paragraph.segments.len());
    paragraph.segments.splice(
        at..at,
        source
            .segments
            .into_iter()
            .filter(|s| !matches!(s, Segment::SelectionMarker(_))),
    );
}

/// Insert a whole block at the caret, splitting the caret paragraph around it.
fn insert_block(blocks: &mut Vec<Block>, insert: &mut InsertPoint, block: Block) {
    split_paragraph(blocks, insert, &BlockFormat::default());
    if let Some(list) = blocks_at_mut(blocks, &insert.path) {
        list.insert(insert.paragraph, block);
        insert.paragraph += 1;
    }
}

/// Splice a pasted list item into the list around the caret, or insert it as
/// a block when the caret is not directly inside a list item.
fn merge_list(blocks: &mut Vec<Block>, insert: &mut InsertPoint, mut item: ListItem) {
    let Some((&PathStep::Group(item_index), parent_path)) = insert.path.split_last() else {
        return insert_block(blocks, insert, Block::BlockGroup(BlockGroup::ListItem(item)));
    };
    let parent_path = parent_path.to_vec();
    let Some(parent) = blocks_at_mut(blocks, &parent_path) else {
        return;
    };
    let Some(Block::BlockGroup(BlockGroup::ListItem(current))) = parent.get_mut(item_index) else {
        return insert_block(blocks, insert, Block::BlockGroup(BlockGroup::ListItem(item)));
    };

    for (depth, level) in current.levels.iter().enumerate() {
        match item.levels.get_mut(depth) {
            Some(slot) => *slot = level.clone(),
            None => item.levels.push(level.clone()),
        }
    }

    // Split the current item at the caret.
    let mut tail_blocks = current.blocks.split_off(insert.paragraph);
    let mut tail_item = ListItem {
        levels: current.levels.clone(),
        blocks: Vec::new(),
        format_holder: current.format_holder.clone(),
        format: current.format.clone(),
    };
    if let Some(Block::Paragraph(caret_paragraph)) = tail_blocks.first_mut() {
        let at = caret_paragraph
            .marker_index()
            .unwrap_or(caret_paragraph.segments.len());
        let head_segments: Vec<Segment> = caret_paragraph.segments.drain(..at).collect();
        if !head_segments.is_empty() {
            let mut head = caret_paragraph.clone();
            head.segments = head_segments;
            current.blocks.push(Block::Paragraph(head));
        }
    }
    tail_item.blocks = tail_blocks;
    let head_is_empty = current
        .blocks
        .iter()
        .all(|b| b.as_paragraph().is_some_and(Paragraph::is_visually_empty));

    let pasted = Block::BlockGroup(BlockGroup::ListItem(item));
    let tail = Block::BlockGroup(BlockGroup::ListItem(tail_item));
    let tail_index = if head_is_empty {
        parent[item_index] = pasted;
        item_index + 1
    } else {
        parent.insert(item_index + 1, pasted);
        item_index + 2
    };
    parent.insert(tail_index, tail);

    insert.path = parent_path;
    insert.path.push(PathStep::Group(tail_index));
    insert.paragraph = 0;
}

/// Overwrite cells of the caret's table with the pasted table, starting at
/// the caret cell and growing the table as needed.
fn merge_table(blocks: &mut Vec<Block>, insert: &mut InsertPoint, source: Table) {
    let Some(table_context) = insert.table_context.clone() else {
        return insert_block(blocks, insert, Block::Table(source));
    };
    let Some(Block::Table(table)) = blocks_at_mut(blocks, &table_context.table_path)
        .and_then(|list| list.get_mut(table_context.table_index))
    else {
        return insert_block(blocks, insert, Block::Table(source));
    };
    let (row_index, col_index) = (table_context.row, table_context.col);
    let marker_format = insert.marker.format.clone();
    let source_widths = source.widths.clone();

    for (i, row) in source.rows.into_iter().enumerate() {
        for (j, mut new_cell) in row.cells.into_iter().enumerate() {
            let col = col_index + j;
            let row_at = row_index + i;

            if i == 0 && col >= table.column_count() {
                for target_row in &mut table.rows {
                    while target_row.cells.len() <= col {
                        let left = target_row.cells.last();
                        let cell = TableCell::with_br(
                            left.is_some_and(|c| c.is_header),
                            left.map(|c| c.format.clone()).unwrap_or_default(),
                        );
                        target_row.cells.push(cell);
                    }
                }
            }

            if j == 0 && row_at >= table.rows.len() {
                let width = table.column_count();
                while table.rows.len() <= row_at {
                    let above = table.rows.last();
                    let cells = (0..width)
                        .map(|k| {
                            let above_cell = above.and_then(|r| r.cells.get(k));
                            TableCell::with_br(
                                above_cell.is_some_and(|c| c.is_header),
                                above_cell
                                    .map(|c| c.format.clone())
                                    .unwrap_or_else(TableCellFormat::default),
                            )
                        })
                        .collect();
                    let new_row = TableRow {
                        cells,
                        format: above.map(|r| r.format.clone()).unwrap_or_default(),
                        height: 0.0,
                    };
                    table.rows.push(new_row);
                }
            }

            let Some(target_row) = table.rows.get_mut(row_at) else {
                continue;
            };
            while target_row.cells.len() <= col {
                target_row.cells.push(TableCell::with_br(false, TableCellFormat::default()));
            }
            if new_cell.blocks.is_empty() {
                new_cell = TableCell {
                    blocks: TableCell::with_br(false, TableCellFormat::default()).blocks,
                    ..new_cell
                };
            }
            if i == 0 && j == 0 {
                add_marker(&mut new_cell, marker_format.clone());
            }
            target_row.cells[col] = new_cell;
        }
    }

    let columns = table.column_count();
    if !table.widths.is_empty() {
        while table.widths.len() < columns {
            let offset = table.widths.len().saturating_sub(col_index);
            let width = source_widths
                .get(offset)
                .or(table.widths.last())
                .copied()
                .unwrap_or_default();
            table.widths.push(width);
        }
    }

    if let Some(point) = find_insert_point(blocks) {
        *insert = point;
    }
}

fn add_marker(cell: &mut TableCell, format: SegmentFormat) {
    match cell.blocks.last_mut() {
        Some(Block::Paragraph(paragraph)) => {
            let at = match paragraph.segments.last() {
                Some(Segment::Br(_)) => paragraph.segments.len() - 1,
                _ => paragraph.segments.len(),
            };
            paragraph.segments.insert(at, Segment::marker(format));
        }
        _ => {
            let mut paragraph = Paragraph::new(true, BlockFormat::default());
            paragraph.segments.push(Segment::marker(format));
            cell.blocks.push(Block::Paragraph(paragraph));
        }
    }
}
