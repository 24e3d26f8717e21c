use std::collections::HashMap;

use weaver_content_model::entity::{DELIMITER_AFTER, is_block_entity_container, is_entity_wrapper};
use weaver_content_model::model::{blocks_at_mut, collect_entities, for_each_entity_mut};
use weaver_content_model::{
    Block, EntityFormat, Paragraph, PathStep, Segment, WrapperHandle, clear_selection,
    find_insert_point, normalize_blocks,
};
use weaver_dom::{DomPosition, NodeId};

use super::delimiter::{delimiter_entity, is_entity_delimiter, normalize_delimiters};
use super::state::EntityEntry;
use crate::editor::{Editor, FormatContentModelOptions};
use crate::events::{ChangeSource, EntityOperation, EntityOperationEvent, PluginEvent, RawEvent};
use crate::keys::{Key, KeyboardEvent};
use crate::plugin::EditorPlugin;

/// Tracks entities through their lifecycle and keeps delimiters intact.
///
/// After every content change the plugin diffs the entities in the model
/// against its registry: missing ones are marked deleted (`Overwrite`), new
/// ones get a unique id and a `NewEntity` operation. Typing at a delimiter
/// is redirected so text never ends up inside one.
#[derive(Debug, Default)]
pub struct EntityPlugin;

impl EntityPlugin {
    pub fn new() -> Self {
        Self
    }
}

impl EditorPlugin for EntityPlugin {
    fn name(&self) -> &'static str {
        "Entity"
    }

    fn on_plugin_event(&mut self, editor: &mut Editor, event: &mut PluginEvent) {
        match event {
            PluginEvent::ContentChanged(_) => {
                scan_entities(editor);
                normalize_live_delimiters(editor);
            }
            PluginEvent::Input => normalize_live_delimiters(editor),
            PluginEvent::KeyDown(key_event) if !key_event.is_composing => {
                handle_delimiter_key_down(editor, key_event)
            }
            PluginEvent::MouseUp { target } => handle_click(editor, *target),
            PluginEvent::BeforeDispose => editor.entities.clear(),
            _ => {}
        }
    }
}

fn normalize_live_delimiters(editor: &mut Editor) {
    let root = editor.root;
    if normalize_delimiters(&mut editor.dom, root) {
        editor.dom_dirty = true;
    }
}

fn scan_entities(editor: &mut Editor) {
    editor.sync_model();
    let present: Vec<(WrapperHandle, EntityFormat)> = collect_entities(&editor.model.blocks)
        .into_iter()
        .filter(|e| !e.entity_format.is_fake_entity)
        .map(|e| (e.wrapper, e.entity_format.clone()))
        .collect();
    let handles: Vec<WrapperHandle> = present.iter().map(|(h, _)| *h).collect();

    let removed = editor.entities.mark_missing(&handles);
    let mut renamed = HashMap::new();
    let mut added = Vec::new();
    for (wrapper, format) in present {
        let entity_type = format.entity_type.clone().unwrap_or_default();
        let current_id = format.id.clone().unwrap_or_default();
        let id = editor.entities.ensure_unique_id(&entity_type, &current_id, wrapper);
        if id != current_id {
            renamed.insert(wrapper, id.clone());
        }
        match editor.entities.get_mut(&id) {
            Some(entry) => {
                if entry.is_deleted {
                    tracing::debug!(id = %entry.id, "entity is back in the document");
                    entry.is_deleted = false;
                }
            }
            None => {
                let entry = EntityEntry {
                    id,
                    entity_type,
                    wrapper,
                    is_readonly: format.is_readonly,
                    can_persist: false,
                    is_deleted: false,
                };
                added.push(entry.info());
                editor.entities.insert(entry);
            }
        }
    }

    if !renamed.is_empty() {
        tracing::debug!(count = renamed.len(), "assigning entity ids");
        let result = editor.mutate_model_direct(|model| {
            for_each_entity_mut(&mut model.blocks, &mut |entity| {
                if let Some(id) = renamed.get(&entity.wrapper) {
                    entity.entity_format.id = Some(id.clone());
                }
            })
        });
        if let Err(error) = result {
            tracing::warn!(%error, "failed to write entity ids");
        }
    }

    for info in removed {
        editor.trigger_event(PluginEvent::EntityOperation(EntityOperationEvent::new(
            EntityOperation::Overwrite,
            info,
        )));
    }
    for info in added {
        let id = info.id.clone();
        let result = editor.trigger_event(PluginEvent::EntityOperation(EntityOperationEvent::new(
            EntityOperation::NewEntity,
            info,
        )));
        if let PluginEvent::EntityOperation(event) = result {
            if let Some(entry) = editor.entities.get_mut(&id) {
                entry.can_persist = event.should_persist;
            }
        }
    }
}

fn handle_click(editor: &mut Editor, target: NodeId) {
    let Some(wrapper) = editor.dom.closest(target, is_entity_wrapper) else {
        return;
    };
    let Some(info) = editor
        .wrapper_handle(wrapper)
        .and_then(|handle| editor.entities.by_wrapper(handle))
        .map(EntityEntry::info)
    else {
        return;
    };
    let event = EntityOperationEvent::new(EntityOperation::Click, info)
        .with_raw_event(RawEvent::MouseUp { target });
    editor.trigger_event(PluginEvent::EntityOperation(event));
}

fn focused_delimiter(editor: &Editor, position: DomPosition) -> Option<NodeId> {
    let element = position.container_element(&editor.dom)?;
    editor.dom.closest(element, is_entity_delimiter)
}

fn handle_delimiter_key_down(editor: &mut Editor, event: &mut KeyboardEvent) {
    let is_enter = event.key == Key::Enter;
    if !is_enter && !event.is_character_value() {
        return;
    }
    let Some(selection) = editor.selection else {
        return;
    };
    let Some(delimiter) = focused_delimiter(editor, selection.start) else {
        return;
    };
    let Some(wrapper) = delimiter_entity(&editor.dom, delimiter) else {
        return;
    };
    let Some(handle) = editor.wrapper_handle(wrapper) else {
        return;
    };
    let is_after = editor.dom.has_class(delimiter, DELIMITER_AFTER);
    let in_block_container = editor.dom.closest(delimiter, is_block_entity_container).is_some();

    if in_block_container {
        if is_enter {
            event.prevent_default();
        }
        insert_paragraph_beside(editor, handle, is_after);
    } else if is_enter {
        event.prevent_default();
        split_paragraph_at_caret(editor);
    } else {
        if let Err(error) = editor.take_snapshot() {
            tracing::warn!(%error, "failed to take snapshot before delimiter input");
        }
        editor.schedule_frame(
            "preventTypeInDelimiter",
            Box::new(move |editor| prevent_type_in_delimiter(editor, delimiter)),
        );
    }
}

fn find_block_entity(
    blocks: &[Block],
    wrapper: WrapperHandle,
    path: &mut Vec<PathStep>,
) -> Option<(Vec<PathStep>, usize)> {
    for (index, block) in blocks.iter().enumerate() {
        match block {
            Block::Entity(entity) if entity.wrapper == wrapper => {
                return Some((path.clone(), index));
            }
            Block::BlockGroup(group) => {
                path.push(PathStep::Group(index));
                let found = find_block_entity(group.blocks(), wrapper, path);
                path.pop();
                if found.is_some() {
                    return found;
                }
            }
            Block::Table(table) => {
                for (row_index, row) in table.rows.iter().enumerate() {
                    for (col_index, cell) in row.cells.iter().enumerate() {
                        path.push(PathStep::Cell {
                            block: index,
                            row: row_index,
                            col: col_index,
                        });
                        let found = find_block_entity(&cell.blocks, wrapper, path);
                        path.pop();
                        if found.is_some() {
                            return found;
                        }
                    }
                }
            }
            _ => {}
        }
    }
    None
}

/// Put an empty line with the caret before or after a block entity.
fn insert_paragraph_beside(editor: &mut Editor, wrapper: WrapperHandle, is_after: bool) {
    let result = editor.format_content_model(
        FormatContentModelOptions::new("handleKeyDownInBlockDelimiter", ChangeSource::Keyboard),
        move |_, model, context| {
            let marker_format = find_insert_point(&model.blocks)
                .map(|insert| insert.marker.format)
                .unwrap_or_default();
            let Some((path, index)) = find_block_entity(&model.blocks, wrapper, &mut Vec::new())
            else {
                return false;
            };
            clear_selection(&mut model.blocks);
            let Some(blocks) = blocks_at_mut(&mut model.blocks, &path) else {
                return false;
            };
            let mut paragraph = Paragraph::new(false, Default::default());
            paragraph.segments.push(Segment::marker(marker_format.clone()));
            paragraph.segments.push(Segment::br(marker_format.clone()));
            blocks.insert(if is_after { index + 1 } else { index }, Block::Paragraph(paragraph));
            // drops the implicit paragraph the caret was parsed into
            normalize_blocks(&mut model.blocks);
            if !marker_format.is_empty() {
                context.new_pending_format = Some(marker_format);
            }
            true
        },
    );
    if let Err(error) = result {
        tracing::warn!(%error, "failed to add line beside block entity");
    }
}

/// Enter next to an inline entity: split the paragraph at the caret.
fn split_paragraph_at_caret(editor: &mut Editor) {
    let result = editor.format_content_model(
        FormatContentModelOptions::new("handleEnterInlineEntity", ChangeSource::Keyboard),
        |_, model, _| {
            let Some(insert) = find_insert_point(&model.blocks) else {
                return false;
            };
            let Some(blocks) = blocks_at_mut(&mut model.blocks, &insert.path) else {
                return false;
            };
            let Some(Block::Paragraph(paragraph)) = blocks.get_mut(insert.paragraph) else {
                return false;
            };
            let Some(marker) = paragraph.marker_index() else {
                return false;
            };

            let tail = paragraph.segments.split_off(marker);
            let mut next = Paragraph::new(false, paragraph.format.clone());
            next.decorator = paragraph.decorator.clone();
            next.segment_format = paragraph.segment_format.clone();
            let filler = insert.marker.format.clone();

            paragraph.is_implicit = false;
            if paragraph
                .segments
                .iter()
                .all(|s| matches!(s, Segment::SelectionMarker(_) | Segment::Br(_)))
            {
                paragraph.segments.push(Segment::br(filler.clone()));
            }
            let tail_is_empty = tail.iter().all(|s| matches!(s, Segment::SelectionMarker(_)));
            next.segments.extend(tail);
            if tail_is_empty {
                next.segments.push(Segment::br(filler));
            }
            blocks.insert(insert.paragraph + 1, Block::Paragraph(next));
            true
        },
    );
    if let Err(error) = result {
        tracing::warn!(%error, "failed to split paragraph at inline entity");
    }
}

/// Move text typed into a delimiter out of it.
fn prevent_type_in_delimiter(editor: &mut Editor, delimiter: NodeId) {
    let root = editor.root;
    if !editor.dom.contains(root, delimiter) || delimiter_entity(&editor.dom, delimiter).is_none() {
        tracing::trace!("delimiter gone before correction ran");
        return;
    }
    editor.dom_dirty = true;
    let options = FormatContentModelOptions::new("preventTypeInDelimiter", ChangeSource::Delimiter);
    let result = editor.format_content_model(options, |_, model, context| {
        let Some(insert) = find_insert_point(&model.blocks) else {
            return false;
        };
        if let Some(paragraph) = insert.paragraph_mut(&mut model.blocks) {
            for segment in &mut paragraph.segments {
                if let Segment::Text(text) = segment {
                    text.text.retain(|c| c != '\u{200B}');
                }
            }
        }
        context.skip_undo_snapshot = true;
        true
    });
    if let Err(error) = result {
        tracing::warn!(%error, "failed to move text out of delimiter");
    }
}
