//! weaver-content-model: the editor's structured document model.
//!
//! This crate provides:
//! - `ContentModelDocument` - blocks, segments, entities and their formats
//! - `dom_to_content_model` / `content_model_to_dom` - conversion both ways
//! - `merge_model` - merging a pasted model into the document at the caret
//! - selection helpers, deletion and normalization used by every edit

pub mod context;
pub mod delete_selection;
pub mod dom_to_model;
pub mod entity;
pub mod format;
pub mod merge;
pub mod model;
pub mod model_to_dom;
pub mod normalize;
pub mod selection;

pub use context::{DeletedEntity, EntityRemovalOperation, EntityState, FormatContentModelContext};
pub use delete_selection::{DeleteSelectionResult, delete_selection};
pub use dom_to_model::{
    DomToModelContext, DomToModelOption, DomToModelSeed, ElementProcessor, FormatParser,
    FormatParsers, dom_to_content_model, is_block_tag,
};
pub use format::{
    BlockFormat, BoxFormat, ContainerFormat, LinkFormat, ListLevelFormat, ListThreadFormat,
    SegmentFormat, Side, TableCellFormat, TableFormat,
};
pub use merge::{CustomMerge, MergeFormat, MergeModelOptions, merge_model, should_merge_table};
pub use model::{
    Block, BlockGroup, Br, ContentModelDocument, Divider, Entity, EntityFormat, FormatContainer,
    GeneralBlock, GeneralElement, GeneralSegment, Image, ListItem, ListLevel, ListType, Paragraph,
    ParagraphDecorator, PathStep, Segment, SelectionMarker, Table, TableCell, TableRow, Text,
    WrapperHandle,
};
pub use model_to_dom::{ModelToDomOption, ModelToDomResult, content_model_to_dom};
pub use normalize::{normalize_blocks, normalize_paragraph};
pub use selection::{
    InsertPoint, ModelPosition, SelectionPath, TableSelectionContext, clear_selection,
    find_insert_point, get_selection_path, has_expanded_selection, set_selection,
};
