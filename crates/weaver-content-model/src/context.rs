//! Per-transaction side channel for model edits.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::format::SegmentFormat;
use crate::model::{Entity, Image};

/// Why an entity left the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityRemovalOperation {
    /// Replaced or deleted as part of a larger edit.
    Overwrite,
    /// Removed by a backspace from after it.
    RemoveFromEnd,
    /// Removed by a delete from before it.
    RemoveFromStart,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeletedEntity {
    pub entity: Entity,
    pub operation: EntityRemovalOperation,
}

/// Host-provided state for an entity, restored alongside undo snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityState {
    pub id: SmolStr,
    pub entity_type: SmolStr,
    pub state: String,
}

/// Mutable context handed to every model transaction callback.
///
/// Callbacks record what they did here; the editor reads it back after the
/// callback returns to decide on undo snapshots, pending format and entity
/// bookkeeping.
#[derive(Debug, Clone, Default)]
pub struct FormatContentModelContext {
    pub new_entities: Vec<Entity>,
    pub deleted_entities: Vec<DeletedEntity>,
    pub new_images: Vec<Image>,
    /// Format to apply to the next typed text at the caret.
    pub new_pending_format: Option<SegmentFormat>,
    pub skip_undo_snapshot: bool,
    /// The pre-change snapshot may be restored by a single backspace.
    pub can_undo_by_backspace: bool,
    pub entity_states: Option<Vec<EntityState>>,
}
