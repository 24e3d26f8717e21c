//! Undo snapshots and the bounded history that holds them.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use weaver_content_model::model::{blocks_at_mut, paragraph_locations};
use weaver_content_model::{
    Block, ContentModelDocument, EntityState, Segment, SelectionPath, clear_selection,
    get_selection_path, set_selection,
};

use crate::error::EditorError;
use crate::options::DEFAULT_MAX_SNAPSHOT_SIZE;

/// A restorable document state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// The model as JSON, with the selection removed.
    pub content: String,
    /// Selection inside `content`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection: Option<SelectionPath>,
    /// Text and background colors used in the content.
    #[serde(default)]
    pub known_colors: Vec<String>,
    /// This snapshot was taken right before an auto-complete and may be
    /// restored by a single backspace.
    #[serde(default)]
    pub is_auto_complete_snapshot: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_states: Option<Vec<EntityState>>,
}

impl Snapshot {
    pub fn capture(
        model: &ContentModelDocument,
        is_auto_complete_snapshot: bool,
        entity_states: Option<Vec<EntityState>>,
    ) -> Result<Self, EditorError> {
        let selection = get_selection_path(&model.blocks);
        let mut content = model.clone();
        clear_selection(&mut content.blocks);
        join_adjacent_text(&mut content.blocks);
        let known_colors = collect_colors(&content.blocks);

        Ok(Self {
            content: serde_json::to_string(&content).map_err(EditorError::SnapshotEncode)?,
            selection,
            known_colors,
            is_auto_complete_snapshot,
            entity_states,
        })
    }

    /// Rebuild the model, selection included.
    pub fn decode(&self) -> Result<ContentModelDocument, EditorError> {
        let mut model: ContentModelDocument =
            serde_json::from_str(&self.content).map_err(EditorError::SnapshotDecode)?;
        if let Some(selection) = &self.selection {
            if !set_selection(&mut model.blocks, selection) {
                tracing::warn!(?selection, "snapshot selection no longer resolves");
            }
        }
        Ok(model)
    }

    /// Bytes counted against the history budget.
    pub fn size(&self) -> usize {
        self.content.len()
    }
}

/// Text segments split only by a removed marker would make otherwise equal
/// content compare unequal.
fn join_adjacent_text(blocks: &mut Vec<Block>) {
    for (path, index) in paragraph_locations(blocks) {
        let Some(paragraph) = blocks_at_mut(blocks, &path)
            .and_then(|b| b.get_mut(index))
            .and_then(Block::as_paragraph_mut)
        else {
            continue;
        };
        let segments = std::mem::take(&mut paragraph.segments);
        for segment in segments {
            if let (Some(Segment::Text(previous)), Segment::Text(next)) =
                (paragraph.segments.last_mut(), &segment)
            {
                if previous.format == next.format && previous.link == next.link {
                    previous.text.push_str(&next.text);
                    continue;
                }
            }
            paragraph.segments.push(segment);
        }
    }
}

fn collect_colors(blocks: &[Block]) -> Vec<String> {
    let mut colors = BTreeSet::new();
    let mut visit = |segment: &Segment| {
        let format = segment.format();
        colors.extend(format.text_color.iter().cloned());
        colors.extend(format.background_color.iter().cloned());
    };
    for (path, index) in paragraph_locations(blocks) {
        let paragraph = weaver_content_model::model::blocks_at(blocks, &path)
            .and_then(|b| b.get(index))
            .and_then(Block::as_paragraph);
        if let Some(paragraph) = paragraph {
            paragraph.segments.iter().for_each(&mut visit);
        }
    }
    colors.into_iter().collect()
}

/// Bounded undo history.
///
/// `current_index` points at the snapshot matching the document when
/// `has_new_content` is false. Snapshots after it are the redo stack.
#[derive(Debug, Clone)]
pub struct SnapshotsManager {
    snapshots: Vec<Snapshot>,
    current_index: Option<usize>,
    total_size: usize,
    max_size: usize,
    has_new_content: bool,
    auto_complete_index: Option<usize>,
}

impl Default for SnapshotsManager {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SNAPSHOT_SIZE)
    }
}

impl SnapshotsManager {
    pub fn new(max_size: usize) -> Self {
        Self {
            snapshots: Vec::new(),
            current_index: None,
            total_size: 0,
            max_size,
            has_new_content: false,
            auto_complete_index: None,
        }
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    pub fn current(&self) -> Option<&Snapshot> {
        self.snapshots.get(self.current_index?)
    }

    pub fn total_size(&self) -> usize {
        self.total_size
    }

    pub fn has_new_content(&self) -> bool {
        self.has_new_content
    }

    pub fn set_has_new_content(&mut self, value: bool) {
        self.has_new_content = value;
    }

    fn target_index(&self, step: isize) -> Option<usize> {
        let current = self.current_index? as isize;
        let target = current.checked_add(step)?;
        (target >= 0 && (target as usize) < self.snapshots.len()).then_some(target as usize)
    }

    pub fn can_move(&self, step: isize) -> bool {
        self.target_index(step).is_some()
    }

    /// Move through history, returning the snapshot now current.
    pub fn move_by(&mut self, step: isize) -> Option<Snapshot> {
        let target = self.target_index(step)?;
        self.current_index = Some(target);
        self.auto_complete_index = None;
        self.snapshots.get(target).cloned()
    }

    /// Record a snapshot. Content identical to the current snapshot only
    /// refreshes its selection and metadata.
    pub fn add_snapshot(&mut self, snapshot: Snapshot, is_auto_complete: bool) {
        let same_as_current = self.current().is_some_and(|current| {
            current.content == snapshot.content
                && current.entity_states.is_none()
                && snapshot.entity_states.is_none()
        });

        if let (true, Some(index)) = (same_as_current, self.current_index) {
            self.snapshots[index] = snapshot;
        } else {
            self.clear_redo();
            self.total_size += snapshot.size();
            self.snapshots.push(snapshot);
            self.current_index = Some(self.snapshots.len() - 1);
            self.evict();
        }

        if is_auto_complete {
            self.auto_complete_index = self.current_index;
        }
        self.has_new_content = false;
    }

    /// Drop the oldest snapshots until the history fits. The newest one is
    /// always kept.
    fn evict(&mut self) {
        let mut remove = 0;
        while remove + 1 < self.snapshots.len() && self.total_size > self.max_size {
            self.total_size -= self.snapshots[remove].size();
            remove += 1;
        }
        if remove == 0 {
            return;
        }
        tracing::debug!(removed = remove, total_size = self.total_size, "evicted undo snapshots");
        self.snapshots.drain(..remove);
        self.current_index = self.current_index.and_then(|i| i.checked_sub(remove));
        self.auto_complete_index = self.auto_complete_index.and_then(|i| i.checked_sub(remove));
    }

    /// Forget everything after the current snapshot.
    pub fn clear_redo(&mut self) {
        let Some(current) = self.current_index else {
            return;
        };
        if current + 1 >= self.snapshots.len() {
            return;
        }
        let removed: usize = self.snapshots[current + 1..].iter().map(Snapshot::size).sum();
        self.snapshots.truncate(current + 1);
        self.total_size -= removed;
        self.auto_complete_index = None;
    }

    /// The last edit was an auto-complete and the caret has not moved since.
    pub fn can_undo_auto_complete(&self, selection: Option<&SelectionPath>) -> bool {
        let (Some(auto_complete), Some(current)) = (self.auto_complete_index, self.current_index)
        else {
            return false;
        };
        current == auto_complete + 1
            && self.snapshots[current].selection.as_ref() == selection
    }

    pub fn clear(&mut self) {
        self.snapshots.clear();
        self.current_index = None;
        self.total_size = 0;
        self.has_new_content = false;
        self.auto_complete_index = None;
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use weaver_content_model::{Paragraph, SegmentFormat};

    use super::*;

    fn snapshot(content: &str) -> Snapshot {
        Snapshot {
            content: content.to_string(),
            selection: None,
            known_colors: Vec::new(),
            is_auto_complete_snapshot: false,
            entity_states: None,
        }
    }

    fn contents(manager: &SnapshotsManager) -> Vec<&str> {
        manager.snapshots.iter().map(|s| s.content.as_str()).collect()
    }

    #[test]
    fn test_add_and_move() {
        let mut manager = SnapshotsManager::default();
        assert!(!manager.can_move(-1));
        manager.add_snapshot(snapshot("a"), false);
        manager.add_snapshot(snapshot("b"), false);
        assert!(manager.can_move(-1));
        assert!(!manager.can_move(1));
        assert_eq!(manager.move_by(-1).map(|s| s.content), Some("a".to_string()));
        assert!(manager.can_move(1));
        assert_eq!(manager.move_by(-1), None);
    }

    #[test]
    fn test_identical_content_replaces_current() {
        let mut manager = SnapshotsManager::default();
        manager.add_snapshot(snapshot("a"), false);
        let mut again = snapshot("a");
        again.known_colors.push("red".into());
        manager.add_snapshot(again, false);
        assert_eq!(manager.len(), 1);
        assert_eq!(manager.current().unwrap().known_colors, vec!["red".to_string()]);
    }

    #[test]
    fn test_new_snapshot_clears_redo() {
        let mut manager = SnapshotsManager::default();
        for content in ["a", "b", "c"] {
            manager.add_snapshot(snapshot(content), false);
        }
        manager.move_by(-2);
        manager.add_snapshot(snapshot("d"), false);
        assert_eq!(contents(&manager), vec!["a", "d"]);
        assert_eq!(manager.total_size(), 2);
        assert!(!manager.can_move(1));
    }

    #[test]
    fn test_eviction_keeps_newest() {
        let mut manager = SnapshotsManager::new(5);
        manager.add_snapshot(snapshot("aaa"), false);
        manager.add_snapshot(snapshot("bbb"), false);
        assert_eq!(contents(&manager), vec!["bbb"]);
        assert_eq!(manager.current_index(), Some(0));

        manager.add_snapshot(snapshot("cccccccc"), false);
        assert_eq!(contents(&manager), vec!["cccccccc"]);
        assert_eq!(manager.total_size(), 8);
    }

    #[test]
    fn test_auto_complete_is_single_shot() {
        let mut manager = SnapshotsManager::default();
        manager.add_snapshot(snapshot("before"), true);
        manager.add_snapshot(snapshot("after"), false);
        assert!(manager.can_undo_auto_complete(None));
        manager.move_by(-1);
        manager.move_by(1);
        assert!(!manager.can_undo_auto_complete(None));
    }

    #[test]
    fn test_capture_strips_selection_and_restores_it() {
        let model = ContentModelDocument::with_blocks(vec![Block::Paragraph(
            Paragraph::with_segments(vec![
                Segment::text("ab", SegmentFormat::default()),
                Segment::marker(SegmentFormat::default()),
                Segment::text("c", SegmentFormat::default()),
            ]),
        )]);
        let captured = Snapshot::capture(&model, false, None).unwrap();
        assert!(!captured.content.contains("SelectionMarker"));
        assert!(captured.content.contains("\"abc\""));

        let restored = captured.decode().unwrap();
        assert_eq!(restored.blocks[0].as_paragraph().unwrap().marker_index(), Some(1));
        assert_eq!(get_selection_path(&restored.blocks), captured.selection);
    }

    #[test]
    fn test_known_colors_are_collected() {
        let red = SegmentFormat {
            text_color: Some("red".into()),
            background_color: Some("yellow".into()),
            ..Default::default()
        };
        let model = ContentModelDocument::with_blocks(vec![Block::Paragraph(
            Paragraph::with_segments(vec![Segment::text("x", red.clone()), Segment::text("y", red)]),
        )]);
        let captured = Snapshot::capture(&model, false, None).unwrap();
        assert_eq!(captured.known_colors, vec!["red".to_string(), "yellow".to_string()]);
    }

    #[test]
    fn test_garbage_content_fails_to_decode() {
        assert!(matches!(
            snapshot("not json").decode(),
            Err(EditorError::SnapshotDecode(_))
        ));
    }
}
