//! Error types for editor operations.

use miette::Diagnostic;
use weaver_dom::DomError;

/// Failures surfaced by the editor.
///
/// Policy situations (undo past the first snapshot, id collisions, stale
/// delimiters) are handled in place and never show up here.
#[derive(thiserror::Error, Debug, Diagnostic)]
#[non_exhaustive]
pub enum EditorError {
    /// A transaction callback tried to open another transaction.
    #[error("format_content_model called while a transaction is already running")]
    #[diagnostic(
        code(weaver::editor::reentrant_transaction),
        help("schedule follow-up edits with Scheduler::schedule_frame instead")
    )]
    ReentrantTransaction,

    /// A snapshot's serialized model could not be read back.
    #[error("failed to decode undo snapshot: {0}")]
    #[diagnostic(code(weaver::editor::snapshot_decode))]
    SnapshotDecode(#[source] serde_json::Error),

    /// A model could not be serialized into a snapshot.
    #[error("failed to encode undo snapshot: {0}")]
    #[diagnostic(code(weaver::editor::snapshot_encode))]
    SnapshotEncode(#[source] serde_json::Error),

    /// Editor options JSON did not match the expected shape.
    #[error("invalid editor options: {0}")]
    #[diagnostic(code(weaver::editor::options))]
    InvalidOptions(#[source] serde_json::Error),

    /// HTML handed to the editor could not be parsed.
    #[error(transparent)]
    #[diagnostic_source]
    Dom(#[from] DomError),
}
