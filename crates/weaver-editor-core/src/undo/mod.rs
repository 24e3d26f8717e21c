//! Undo/redo over model snapshots.
//!
//! Provides:
//! - `Snapshot` and `SnapshotsManager` - the bounded history
//! - `UndoManager` trait, implemented by [`Editor`]
//! - `UndoPlugin` - decides when typing and deleting take snapshots

mod plugin;
mod snapshots;

pub use plugin::UndoPlugin;
pub use snapshots::{Snapshot, SnapshotsManager};

use weaver_content_model::EntityState;

use crate::editor::Editor;
use crate::error::EditorError;
use crate::events::{ChangeSource, ContentChangedEvent, EntityOperation, PluginEvent};

/// Trait for managing undo/redo operations.
pub trait UndoManager {
    /// Check if undo is available.
    fn can_undo(&self) -> bool;

    /// Check if redo is available.
    fn can_redo(&self) -> bool;

    /// Perform undo. Returns true if a snapshot was restored.
    fn undo(&mut self) -> Result<bool, EditorError>;

    /// Perform redo. Returns true if a snapshot was restored.
    fn redo(&mut self) -> Result<bool, EditorError>;

    /// Clear all undo/redo history.
    fn clear_history(&mut self);
}

/// Undo state owned by the editor.
#[derive(Debug, Default)]
pub struct UndoState {
    pub snapshots: SnapshotsManager,
    /// Set while a snapshot is being restored, so the change it causes is
    /// not recorded as a new edit.
    pub is_restoring: bool,
}

impl UndoManager for Editor {
    fn can_undo(&self) -> bool {
        self.undo.snapshots.has_new_content() || self.undo.snapshots.can_move(-1)
    }

    fn can_redo(&self) -> bool {
        self.undo.snapshots.can_move(1)
    }

    fn undo(&mut self) -> Result<bool, EditorError> {
        if self.undo.snapshots.has_new_content() {
            self.take_snapshot()?;
        }
        let Some(snapshot) = self.undo.snapshots.move_by(-1) else {
            return Ok(false);
        };
        self.restore_snapshot(&snapshot, ChangeSource::Undo)?;
        Ok(true)
    }

    fn redo(&mut self) -> Result<bool, EditorError> {
        let Some(snapshot) = self.undo.snapshots.move_by(1) else {
            return Ok(false);
        };
        self.restore_snapshot(&snapshot, ChangeSource::Redo)?;
        Ok(true)
    }

    fn clear_history(&mut self) {
        self.undo.snapshots.clear();
    }
}

impl Editor {
    pub fn snapshots(&self) -> &SnapshotsManager {
        &self.undo.snapshots
    }

    pub fn snapshots_mut(&mut self) -> &mut SnapshotsManager {
        &mut self.undo.snapshots
    }

    pub fn is_restoring(&self) -> bool {
        self.undo.is_restoring
    }

    /// Capture the current document without recording it.
    pub fn create_snapshot(&mut self) -> Result<Snapshot, EditorError> {
        self.sync_model();
        Snapshot::capture(&self.model, false, None)
    }

    /// Record the current document in the undo history.
    pub fn take_snapshot(&mut self) -> Result<Snapshot, EditorError> {
        self.add_undo_snapshot(false, None)
    }

    pub(crate) fn add_undo_snapshot(
        &mut self,
        is_auto_complete: bool,
        entity_states: Option<Vec<EntityState>>,
    ) -> Result<Snapshot, EditorError> {
        self.sync_model();
        let snapshot = Snapshot::capture(&self.model, is_auto_complete, entity_states)?;
        tracing::trace!(
            size = snapshot.size(),
            is_auto_complete,
            history = self.undo.snapshots.len(),
            "adding undo snapshot"
        );
        self.undo.snapshots.add_snapshot(snapshot.clone(), is_auto_complete);
        Ok(snapshot)
    }

    /// Replace the document with `snapshot`.
    ///
    /// Entities with stored state get an `UpdateEntityState` operation, then
    /// a `ContentChanged` with `source` is broadcast. The undo plugin ignores
    /// changes made while restoring.
    pub fn restore_snapshot(
        &mut self,
        snapshot: &Snapshot,
        source: ChangeSource,
    ) -> Result<(), EditorError> {
        let model = snapshot.decode()?;
        tracing::debug!(?source, size = snapshot.size(), "restoring snapshot");

        self.undo.is_restoring = true;
        self.model = model;
        self.clear_pending_format();
        let rendered = self.render();
        if rendered.is_ok() {
            for state in snapshot.entity_states.iter().flatten() {
                if let Some(mut event) =
                    self.entity_operation_event(EntityOperation::UpdateEntityState, &state.id)
                {
                    event.state = Some(state.state.clone());
                    self.trigger_event(PluginEvent::EntityOperation(event));
                }
            }
            self.trigger_event(PluginEvent::ContentChanged(ContentChangedEvent::new(source)));
        }
        self.undo.is_restoring = false;
        self.undo.snapshots.set_has_new_content(false);
        rendered
    }
}
