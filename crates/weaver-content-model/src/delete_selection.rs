//! Removing the selected content from a model.

use crate::context::{DeletedEntity, EntityRemovalOperation, FormatContentModelContext};
use crate::model::{Block, Entity, Paragraph, PathStep, Segment, blocks_at_mut, paragraph_locations};
use crate::selection::{InsertPoint, find_insert_point, has_expanded_selection};

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteSelectionResult {
    /// Caret after deletion, `None` when the model has no selection at all.
    pub insert_point: Option<InsertPoint>,
    pub deleted_anything: bool,
}

/// Delete the expanded selection and leave a collapsed caret where it began.
///
/// Selected text in the first and last paragraph is cut and, when both live
/// in the same block list, the remainder of the last paragraph joins the
/// first. Selected dividers, block entities and fully selected tables are
/// removed. A collapsed selection is left as is.
pub fn delete_selection(
    blocks: &mut Vec<Block>,
    mut context: Option<&mut FormatContentModelContext>,
) -> DeleteSelectionResult {
    if !has_expanded_selection(blocks) {
        return DeleteSelectionResult {
            insert_point: find_insert_point(blocks),
            deleted_anything: false,
        };
    }

    let mut removed_entities: Vec<Entity> = Vec::new();
    let earliest_block_removal = delete_selected_segments(blocks, &mut removed_entities);
    let earliest_block_removal =
        delete_selected_blocks(blocks, &mut removed_entities).or(earliest_block_removal);

    if find_insert_point(blocks).is_none() {
        let (path, index) = earliest_block_removal.unwrap_or((Vec::new(), blocks.len()));
        if let Some(list) = blocks_at_mut(blocks, &path) {
            let mut paragraph = Paragraph::new(false, Default::default());
            paragraph.segments.push(Segment::marker(Default::default()));
            paragraph.segments.push(Segment::br(Default::default()));
            list.insert(index.min(list.len()), Block::Paragraph(paragraph));
        }
    }

    tracing::trace!(entities = removed_entities.len(), "deleted selection");
    if let Some(context) = context.as_deref_mut() {
        context
            .deleted_entities
            .extend(removed_entities.into_iter().map(|entity| DeletedEntity {
                entity,
                operation: EntityRemovalOperation::Overwrite,
            }));
    }

    DeleteSelectionResult {
        insert_point: find_insert_point(blocks),
        deleted_anything: true,
    }
}

/// Returns the location of the first paragraph that was removed entirely.
fn delete_selected_segments(
    blocks: &mut Vec<Block>,
    removed_entities: &mut Vec<Entity>,
) -> Option<(Vec<PathStep>, usize)> {
    let mut first: Option<(Vec<PathStep>, usize)> = None;
    let mut carried: Vec<Segment> = Vec::new();
    let mut to_remove: Vec<(Vec<PathStep>, usize)> = Vec::new();

    for (path, index) in paragraph_locations(blocks) {
        let Some(paragraph) = blocks_at_mut(blocks, &path)
            .and_then(|b| b.get_mut(index))
            .and_then(Block::as_paragraph_mut)
        else {
            continue;
        };
        let Some(first_selected) = paragraph.segments.iter().position(Segment::is_selected) else {
            continue;
        };

        let marker_format = paragraph.segments[first_selected].format().clone();
        let mut kept = Vec::with_capacity(paragraph.segments.len());
        let mut insert_at = None;
        for (i, segment) in std::mem::take(&mut paragraph.segments).into_iter().enumerate() {
            if i == first_selected {
                insert_at = Some(kept.len());
            }
            if segment.is_selected() {
                if let Segment::Entity(entity) = segment {
                    removed_entities.push(entity);
                }
            } else {
                kept.push(segment);
            }
        }

        match &first {
            None => {
                kept.insert(insert_at.unwrap_or(0), Segment::marker(marker_format));
                paragraph.segments = kept;
                first = Some((path, index));
            }
            Some((first_path, _)) if *first_path == path => {
                carried.extend(kept);
                to_remove.push((path, index));
            }
            Some(_) => {
                let now_empty = kept.is_empty();
                paragraph.segments = kept;
                if now_empty {
                    to_remove.push((path, index));
                }
            }
        }
    }

    if let Some((path, index)) = &first {
        if let Some(paragraph) = blocks_at_mut(blocks, path)
            .and_then(|b| b.get_mut(*index))
            .and_then(Block::as_paragraph_mut)
        {
            paragraph.segments.extend(carried);
        }
    }

    for (path, index) in to_remove.iter().rev() {
        if let Some(list) = blocks_at_mut(blocks, path) {
            if *index < list.len() {
                list.remove(*index);
            }
        }
    }
    to_remove.into_iter().next()
}

fn is_fully_selected_table(block: &Block) -> bool {
    match block {
        Block::Table(table) => {
            let mut cells = table.rows.iter().flat_map(|r| r.cells.iter()).peekable();
            cells.peek().is_some() && cells.all(|c| c.is_selected)
        }
        _ => false,
    }
}

fn collect_selected_blocks(
    blocks: &[Block],
    path: &mut Vec<PathStep>,
    out: &mut Vec<(Vec<PathStep>, usize)>,
) {
    for (index, block) in blocks.iter().enumerate() {
        match block {
            Block::Divider(d) if d.is_selected => out.push((path.clone(), index)),
            Block::Entity(e) if e.is_selected => out.push((path.clone(), index)),
            block if is_fully_selected_table(block) => out.push((path.clone(), index)),
            Block::Table(table) => {
                for (row_index, row) in table.rows.iter().enumerate() {
                    for (col_index, cell) in row.cells.iter().enumerate() {
                        path.push(PathStep::Cell {
                            block: index,
                            row: row_index,
                            col: col_index,
                        });
                        collect_selected_blocks(&cell.blocks, path, out);
                        path.pop();
                    }
                }
            }
            Block::BlockGroup(group) => {
                path.push(PathStep::Group(index));
                collect_selected_blocks(group.blocks(), path, out);
                path.pop();
            }
            _ => {}
        }
    }
}

fn collect_entities_of(block: Block, out: &mut Vec<Entity>) {
    match block {
        Block::Entity(entity) => out.push(entity),
        Block::Paragraph(paragraph) => {
            out.extend(paragraph.segments.into_iter().filter_map(|s| match s {
                Segment::Entity(entity) => Some(entity),
                _ => None,
            }))
        }
        Block::Table(table) => {
            for cell in table.rows.into_iter().flat_map(|r| r.cells) {
                for block in cell.blocks {
                    collect_entities_of(block, out);
                }
            }
        }
        Block::BlockGroup(group) => {
            for block in group.blocks().to_vec() {
                collect_entities_of(block, out);
            }
        }
        Block::Divider(_) => {}
    }
}

fn delete_selected_blocks(
    blocks: &mut Vec<Block>,
    removed_entities: &mut Vec<Entity>,
) -> Option<(Vec<PathStep>, usize)> {
    let mut selected = Vec::new();
    collect_selected_blocks(blocks, &mut Vec::new(), &mut selected);
    for (path, index) in selected.iter().rev() {
        if let Some(list) = blocks_at_mut(blocks, path) {
            if *index < list.len() {
                let block = list.remove(*index);
                collect_entities_of(block, removed_entities);
            }
        }
    }
    selected.into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::SegmentFormat;
    use crate::model::{ContentModelDocument, Divider, EntityFormat, Text};

    fn selected_text(s: &str) -> Segment {
        Segment::Text(Text {
            text: s.into(),
            is_selected: true,
            ..Default::default()
        })
    }

    fn text(s: &str) -> Segment {
        Segment::text(s, SegmentFormat::default())
    }

    fn para(segments: Vec<Segment>) -> Block {
        Block::Paragraph(Paragraph::with_segments(segments))
    }

    #[test]
    fn test_collapsed_selection_is_untouched() {
        let mut doc = ContentModelDocument::with_blocks(vec![para(vec![
            text("a"),
            Segment::marker(SegmentFormat::default()),
        ])]);
        let before = doc.clone();
        let result = delete_selection(&mut doc.blocks, None);
        assert!(!result.deleted_anything);
        assert_eq!(result.insert_point.unwrap().paragraph, 0);
        assert_eq!(doc, before);
    }

    #[test]
    fn test_cross_paragraph_selection_joins() {
        let mut doc = ContentModelDocument::with_blocks(vec![
            para(vec![text("ab"), selected_text("cd")]),
            para(vec![selected_text("middle")]),
            para(vec![selected_text("ef"), text("gh")]),
        ]);
        let result = delete_selection(&mut doc.blocks, None);
        assert!(result.deleted_anything);
        assert_eq!(doc.blocks.len(), 1);
        let paragraph = doc.blocks[0].as_paragraph().unwrap();
        assert_eq!(paragraph.text(), "abgh");
        assert_eq!(paragraph.marker_index(), Some(1));
        assert_eq!(result.insert_point.unwrap().paragraph, 0);
    }

    #[test]
    fn test_selected_entities_are_reported() {
        let mut entity = Entity::new(
            "span",
            EntityFormat {
                entity_type: Some("mention".into()),
                ..Default::default()
            },
            "@me",
        );
        entity.is_selected = true;
        let mut block_entity = Entity::new("div", EntityFormat::default(), "");
        block_entity.is_selected = true;
        let mut doc = ContentModelDocument::with_blocks(vec![
            para(vec![text("x"), Segment::Entity(entity)]),
            Block::Entity(block_entity),
            Block::Divider(Divider {
                tag: "hr".into(),
                format: Default::default(),
                is_selected: true,
            }),
        ]);
        let mut context = FormatContentModelContext::default();
        delete_selection(&mut doc.blocks, Some(&mut context));

        assert_eq!(context.deleted_entities.len(), 2);
        assert_eq!(doc.blocks.len(), 1);
        assert_eq!(doc.blocks[0].as_paragraph().unwrap().marker_index(), Some(1));
    }
}
