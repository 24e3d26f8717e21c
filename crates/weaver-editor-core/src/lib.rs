//! weaver-editor-core: the editor runtime around the content model.
//!
//! This crate provides:
//! - `Editor` - owns the model and its rendered DOM, runs transactions
//!   (`format_content_model`) and broadcasts plugin events
//! - `EditorPlugin` - the extension point; undo and entity handling are
//!   built-in plugins
//! - `UndoManager` - snapshot-based undo/redo
//! - clipboard and event types shared with the paste pipeline
//!
//! The host feeds DOM-level input (`handle_key_down`, `handle_input`, ...)
//! and edits the DOM natively through `dom_mut`; the model is rebuilt from
//! the DOM before its next use.

pub mod clipboard;
pub mod editor;
pub mod entity;
pub mod error;
pub mod events;
pub mod keys;
pub mod options;
pub mod plugin;
pub mod scheduler;
pub mod trusted;
pub mod undo;

pub use clipboard::{
    BeforePasteEvent, ClipboardData, ImageData, PasteFragment, PasteType, SanitizingOption,
    ValueSanitizer,
};
pub use editor::{Editor, FormatContentModelOptions, PendingFormat};
pub use entity::{EntityEntry, EntityPlugin, EntityPluginState};
pub use error::EditorError;
pub use events::{
    ChangeData, ChangeSource, ContentChangedEvent, EntityInfo, EntityOperation,
    EntityOperationEvent, PluginEvent, RawEvent,
};
pub use keys::{Key, KeyboardEvent, KeydownResult, Modifiers};
pub use options::{DEFAULT_MAX_SNAPSHOT_SIZE, EditorOptions};
pub use plugin::EditorPlugin;
pub use scheduler::{FrameTask, Scheduler, TaskId};
pub use smol_str::SmolStr;
pub use trusted::{PassThroughHtml, TrustedHtmlHandler};
pub use undo::{Snapshot, SnapshotsManager, UndoManager, UndoPlugin};
