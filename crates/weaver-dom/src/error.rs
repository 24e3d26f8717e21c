//! Error types for DOM parsing.

use miette::Diagnostic;

/// Failure to turn an HTML string into a DOM tree.
///
/// The parser is lenient (unbalanced tags, unknown entities and stray `&` are
/// all recovered from), so this only surfaces for input the tokenizer cannot
/// make sense of at all.
#[derive(thiserror::Error, Debug, Diagnostic)]
#[non_exhaustive]
pub enum DomError {
    /// The tokenizer gave up on the input.
    #[error("malformed html at byte {position}: {message}")]
    #[diagnostic(
        code(weaver::dom::parse),
        help("the markup could not be tokenized even in lenient mode")
    )]
    Parse { position: u64, message: String },

    /// A node handle that does not belong to this tree was used.
    #[error("node {0} is not part of this tree")]
    #[diagnostic(code(weaver::dom::unknown_node))]
    UnknownNode(u32),
}
