//! Error types for the paste pipeline.

use miette::Diagnostic;
use weaver_dom::DomError;
use weaver_editor_core::EditorError;

/// Failures a paste can report.
///
/// Unrecognised sources, empty clipboards and content that needs no
/// normalizing are not errors; the paste simply does less.
#[derive(thiserror::Error, Debug, Diagnostic)]
#[non_exhaustive]
pub enum PasteError {
    /// Clipboard HTML could not be parsed.
    #[error("failed to parse clipboard html")]
    #[diagnostic(
        code(weaver::paste::html),
        help("the trusted html handler should reject markup it cannot vouch for")
    )]
    Html(#[from] DomError),

    /// The editor rejected the paste transaction or its snapshot.
    #[error(transparent)]
    #[diagnostic_source]
    Editor(#[from] EditorError),
}
