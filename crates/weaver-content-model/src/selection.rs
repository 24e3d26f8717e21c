//! Selection inside the model.
//!
//! The caret is a [`SelectionMarker`] segment; an expanded selection is the
//! run of segments flagged `is_selected`. This module locates the caret as an
//! [`InsertPoint`] and converts selections to and from a [`SelectionPath`],
//! the position form stored with undo snapshots.

use serde::{Deserialize, Serialize};

use crate::format::SegmentFormat;
use crate::model::{
    Block, Paragraph, PathStep, Segment, SelectionMarker, Text, blocks_at, blocks_at_mut,
    paragraph_locations,
};

/// The table cell enclosing a caret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSelectionContext {
    /// Group path of the block list holding the table.
    pub table_path: Vec<PathStep>,
    /// Index of the table in that list.
    pub table_index: usize,
    pub row: usize,
    pub col: usize,
}

/// Where the caret is: the paragraph holding the selection marker.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertPoint {
    /// Group path of the block list holding the paragraph.
    pub path: Vec<PathStep>,
    pub paragraph: usize,
    /// Copy of the marker; its format is the caret format.
    pub marker: SelectionMarker,
    pub table_context: Option<TableSelectionContext>,
}

impl InsertPoint {
    pub fn paragraph<'a>(&self, blocks: &'a [Block]) -> Option<&'a Paragraph> {
        blocks_at(blocks, &self.path)?
            .get(self.paragraph)?
            .as_paragraph()
    }

    pub fn paragraph_mut<'a>(&self, blocks: &'a mut Vec<Block>) -> Option<&'a mut Paragraph> {
        blocks_at_mut(blocks, &self.path)?
            .get_mut(self.paragraph)?
            .as_paragraph_mut()
    }
}

fn table_context_for(path: &[PathStep]) -> Option<TableSelectionContext> {
    let index = path
        .iter()
        .rposition(|step| matches!(step, PathStep::Cell { .. }))?;
    let PathStep::Cell { block, row, col } = path[index] else {
        return None;
    };
    Some(TableSelectionContext {
        table_path: path[..index].to_vec(),
        table_index: block,
        row,
        col,
    })
}

/// First selection marker in document order.
pub fn find_insert_point(blocks: &[Block]) -> Option<InsertPoint> {
    for (path, index) in paragraph_locations(blocks) {
        let Some(paragraph) = blocks_at(blocks, &path).and_then(|b| b[index].as_paragraph()) else {
            continue;
        };
        for segment in &paragraph.segments {
            if let Segment::SelectionMarker(marker) = segment {
                return Some(InsertPoint {
                    table_context: table_context_for(&path),
                    path,
                    paragraph: index,
                    marker: marker.clone(),
                });
            }
        }
    }
    None
}

/// True when any non-marker content is selected.
pub fn has_expanded_selection(blocks: &[Block]) -> bool {
    blocks.iter().any(|block| match block {
        Block::Paragraph(p) => p
            .segments
            .iter()
            .any(|s| s.is_selected() && !matches!(s, Segment::SelectionMarker(_))),
        Block::Entity(e) => e.is_selected,
        Block::Divider(d) => d.is_selected,
        Block::BlockGroup(group) => has_expanded_selection(group.blocks()),
        Block::Table(table) => table
            .rows
            .iter()
            .flat_map(|r| r.cells.iter())
            .any(|c| c.is_selected || has_expanded_selection(&c.blocks)),
    })
}

// === Selection paths ===

/// A position as paragraph location plus offset in segment units.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelPosition {
    pub path: Vec<PathStep>,
    pub paragraph: usize,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SelectionPath {
    pub start: ModelPosition,
    pub end: ModelPosition,
}

impl SelectionPath {
    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }
}

/// Extract the current selection as positions.
pub fn get_selection_path(blocks: &[Block]) -> Option<SelectionPath> {
    let mut start: Option<ModelPosition> = None;
    let mut end: Option<ModelPosition> = None;
    for (path, index) in paragraph_locations(blocks) {
        let Some(paragraph) = blocks_at(blocks, &path).and_then(|b| b[index].as_paragraph()) else {
            continue;
        };
        let mut offset = 0;
        for segment in &paragraph.segments {
            let width = segment.offset_len();
            if segment.is_selected() {
                let position = |offset| ModelPosition {
                    path: path.clone(),
                    paragraph: index,
                    offset,
                };
                if start.is_none() {
                    start = Some(position(offset));
                }
                end = Some(position(offset + width));
            }
            offset += width;
        }
    }
    let start = start?;
    let end = end.unwrap_or_else(|| start.clone());
    Some(SelectionPath { start, end })
}

/// Remove every marker and selection flag.
pub fn clear_selection(blocks: &mut [Block]) {
    for block in blocks {
        match block {
            Block::Paragraph(p) => {
                p.segments
                    .retain(|s| !matches!(s, Segment::SelectionMarker(_)));
                for segment in &mut p.segments {
                    segment.set_selected(false);
                }
            }
            Block::Entity(e) => e.is_selected = false,
            Block::Divider(d) => d.is_selected = false,
            Block::BlockGroup(group) => clear_selection(group.blocks_mut()),
            Block::Table(table) => {
                for cell in table.rows.iter_mut().flat_map(|r| r.cells.iter_mut()) {
                    cell.is_selected = false;
                    clear_selection(&mut cell.blocks);
                }
            }
        }
    }
}

/// Split the paragraph so a segment boundary falls at `offset`; returns the
/// index of the first segment at or after it.
pub fn split_at_offset(paragraph: &mut Paragraph, offset: usize) -> usize {
    let mut consumed = 0;
    for index in 0..paragraph.segments.len() {
        if consumed == offset {
            return index;
        }
        let width = paragraph.segments[index].offset_len();
        if consumed + width > offset {
            if let Segment::Text(text) = &mut paragraph.segments[index] {
                let split_at = offset - consumed;
                let byte = text
                    .text
                    .char_indices()
                    .nth(split_at)
                    .map(|(b, _)| b)
                    .unwrap_or(text.text.len());
                let tail = Text {
                    text: text.text.split_off(byte),
                    format: text.format.clone(),
                    link: text.link.clone(),
                    is_selected: text.is_selected,
                };
                paragraph.segments.insert(index + 1, Segment::Text(tail));
                return index + 1;
            }
            return index + 1;
        }
        consumed += width;
    }
    paragraph.segments.len()
}

fn marker_format_near(paragraph: &Paragraph, index: usize) -> SegmentFormat {
    index
        .checked_sub(1)
        .and_then(|i| paragraph.segments.get(i))
        .or_else(|| paragraph.segments.get(index))
        .map(|s| s.format().clone())
        .or_else(|| paragraph.segment_format.clone())
        .unwrap_or_default()
}

/// Replace the current selection with `selection`. Positions that no longer
/// resolve are ignored.
pub fn set_selection(blocks: &mut Vec<Block>, selection: &SelectionPath) -> bool {
    clear_selection(blocks);
    if selection.is_collapsed() {
        let position = &selection.start;
        let Some(paragraph) = blocks_at_mut(blocks, &position.path)
            .and_then(|b| b.get_mut(position.paragraph))
            .and_then(Block::as_paragraph_mut)
        else {
            return false;
        };
        let index = split_at_offset(paragraph, position.offset);
        let format = marker_format_near(paragraph, index);
        paragraph.segments.insert(index, Segment::marker(format));
        return true;
    }

    let locations = paragraph_locations(blocks);
    let start_key = (selection.start.path.clone(), selection.start.paragraph);
    let end_key = (selection.end.path.clone(), selection.end.paragraph);
    let Some(first) = locations.iter().position(|l| *l == start_key) else {
        return false;
    };
    let Some(last) = locations.iter().position(|l| *l == end_key) else {
        return false;
    };
    for (i, (path, index)) in locations.iter().enumerate().take(last + 1).skip(first) {
        let Some(paragraph) = blocks_at_mut(blocks, path)
            .and_then(|b| b.get_mut(*index))
            .and_then(Block::as_paragraph_mut)
        else {
            continue;
        };
        let from = if i == first {
            split_at_offset(paragraph, selection.start.offset)
        } else {
            0
        };
        let to = if i == last {
            split_at_offset(paragraph, selection.end.offset)
        } else {
            paragraph.segments.len()
        };
        for segment in paragraph.segments.iter_mut().take(to).skip(from) {
            segment.set_selected(true);
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ContentModelDocument, Table, TableCell, TableRow};

    fn text(s: &str) -> Segment {
        Segment::text(s, SegmentFormat::default())
    }

    fn doc_with(segments: Vec<Segment>) -> ContentModelDocument {
        ContentModelDocument::with_blocks(vec![Block::Paragraph(Paragraph::with_segments(segments))])
    }

    #[test]
    fn test_find_insert_point_in_table_cell() {
        let mut cell = TableCell::default();
        cell.blocks.push(Block::Paragraph(Paragraph::with_segments(vec![
            text("a"),
            Segment::marker(SegmentFormat::default()),
        ])));
        let doc = ContentModelDocument::with_blocks(vec![Block::Table(Table {
            rows: vec![TableRow {
                cells: vec![TableCell::default(), cell],
                ..Default::default()
            }],
            ..Default::default()
        })]);

        let point = find_insert_point(&doc.blocks).unwrap();
        assert_eq!(point.paragraph, 0);
        let context = point.table_context.unwrap();
        assert_eq!((context.table_index, context.row, context.col), (0, 0, 1));
        assert!(context.table_path.is_empty());
    }

    #[test]
    fn test_collapsed_selection_path_round_trip() {
        let mut doc = doc_with(vec![
            text("hello"),
            Segment::marker(SegmentFormat::default()),
            text(" world"),
        ]);
        let path = get_selection_path(&doc.blocks).unwrap();
        assert!(path.is_collapsed());
        assert_eq!(path.start.offset, 5);

        clear_selection(&mut doc.blocks);
        assert!(find_insert_point(&doc.blocks).is_none());

        assert!(set_selection(&mut doc.blocks, &path));
        let paragraph = doc.blocks[0].as_paragraph().unwrap();
        assert_eq!(paragraph.marker_index(), Some(1));
    }

    #[test]
    fn test_set_selection_splits_text_inside_segment() {
        let mut doc = doc_with(vec![text("abcdef")]);
        let position = ModelPosition {
            path: vec![],
            paragraph: 0,
            offset: 2,
        };
        set_selection(
            &mut doc.blocks,
            &SelectionPath {
                start: position.clone(),
                end: ModelPosition { offset: 4, ..position },
            },
        );
        let paragraph = doc.blocks[0].as_paragraph().unwrap();
        let parts: Vec<(String, bool)> = paragraph
            .segments
            .iter()
            .map(|s| match s {
                Segment::Text(t) => (t.text.clone(), t.is_selected),
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(
            parts,
            vec![
                ("ab".to_string(), false),
                ("cd".to_string(), true),
                ("ef".to_string(), false)
            ]
        );
        assert!(has_expanded_selection(&doc.blocks));
        let path = get_selection_path(&doc.blocks).unwrap();
        assert_eq!((path.start.offset, path.end.offset), (2, 4));
    }
}
