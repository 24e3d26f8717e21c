//! Events broadcast to plugins.

use smol_str::SmolStr;
use weaver_content_model::WrapperHandle;
use weaver_dom::NodeId;

use crate::clipboard::{BeforePasteEvent, ClipboardData};
use crate::keys::KeyboardEvent;

/// What caused a content change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeSource {
    Format,
    Paste,
    SetContent,
    Keyboard,
    Input,
    Undo,
    Redo,
    /// Correction applied around an entity delimiter.
    Delimiter,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChangeData {
    Clipboard(Box<ClipboardData>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContentChangedEvent {
    pub source: ChangeSource,
    pub data: Option<ChangeData>,
    pub skip_undo: bool,
    /// The change already recorded its own undo snapshot.
    pub snapshot_taken: bool,
}

impl ContentChangedEvent {
    pub fn new(source: ChangeSource) -> Self {
        Self {
            source,
            data: None,
            skip_undo: false,
            snapshot_taken: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityOperation {
    NewEntity,
    Overwrite,
    RemoveFromStart,
    RemoveFromEnd,
    UpdateEntityState,
    Click,
    /// The editor is about to export; entities should swap temporary content
    /// for their persistent form.
    ReplaceTemporaryContent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityInfo {
    pub id: SmolStr,
    pub entity_type: SmolStr,
    pub is_readonly: bool,
    pub wrapper: WrapperHandle,
}

/// Host input an entity operation was raised for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawEvent {
    MouseUp { target: NodeId },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityOperationEvent {
    pub operation: EntityOperation,
    pub entity: EntityInfo,
    /// State to restore, for `UpdateEntityState`.
    pub state: Option<String>,
    /// Set by the owner of a new entity to keep it across exports.
    pub should_persist: bool,
    /// Replacement inner HTML, for `ReplaceTemporaryContent`.
    pub html: Option<String>,
    /// The input behind a `Click`.
    pub raw_event: Option<RawEvent>,
}

impl EntityOperationEvent {
    pub fn new(operation: EntityOperation, entity: EntityInfo) -> Self {
        Self {
            operation,
            entity,
            state: None,
            should_persist: false,
            html: None,
            raw_event: None,
        }
    }

    pub fn with_raw_event(mut self, raw_event: RawEvent) -> Self {
        self.raw_event = Some(raw_event);
        self
    }
}

#[derive(Debug, Clone)]
pub enum PluginEvent {
    EditorReady,
    BeforeDispose,
    KeyDown(KeyboardEvent),
    Input,
    CompositionEnd,
    MouseUp { target: NodeId },
    ContentChanged(ContentChangedEvent),
    BeforePaste(Box<BeforePasteEvent>),
    EntityOperation(EntityOperationEvent),
}

impl PluginEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            PluginEvent::EditorReady => "editorReady",
            PluginEvent::BeforeDispose => "beforeDispose",
            PluginEvent::KeyDown(_) => "keyDown",
            PluginEvent::Input => "input",
            PluginEvent::CompositionEnd => "compositionEnd",
            PluginEvent::MouseUp { .. } => "mouseUp",
            PluginEvent::ContentChanged(_) => "contentChanged",
            PluginEvent::BeforePaste(_) => "beforePaste",
            PluginEvent::EntityOperation(_) => "entityOperation",
        }
    }
}
