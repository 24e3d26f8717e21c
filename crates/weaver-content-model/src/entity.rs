//! Entity wrapper and delimiter markup conventions.
//!
//! An entity wrapper is an element carrying `_Entity` plus `_EType_<type>`,
//! `_EId_<id>` and `_EReadonly_<0|1>` classes. Read-only inline wrappers are
//! flanked by delimiter spans holding a single zero-width space so the caret
//! has somewhere to go on either side.

use smol_str::SmolStr;
use weaver_dom::{DomTree, NodeId};

use crate::model::EntityFormat;

pub const ENTITY_INFO_NAME: &str = "_Entity";
pub const ENTITY_TYPE_PREFIX: &str = "_EType_";
pub const ENTITY_ID_PREFIX: &str = "_EId_";
pub const ENTITY_READONLY_PREFIX: &str = "_EReadonly_";
pub const DELIMITER_BEFORE: &str = "entityDelimiterBefore";
pub const DELIMITER_AFTER: &str = "entityDelimiterAfter";
pub const BLOCK_ENTITY_CONTAINER: &str = "_E_EBlockEntityContainer";
pub const ZERO_WIDTH_SPACE: char = '\u{200B}';

/// Class attribute value for a wrapper with this format.
pub fn generate_entity_class_names(format: &EntityFormat) -> String {
    if format.is_fake_entity {
        return String::new();
    }
    let mut classes = format!(
        "{ENTITY_INFO_NAME} {ENTITY_TYPE_PREFIX}{}",
        format.entity_type.as_deref().unwrap_or_default()
    );
    if let Some(id) = &format.id {
        classes.push(' ');
        classes.push_str(ENTITY_ID_PREFIX);
        classes.push_str(id);
    }
    classes.push(' ');
    classes.push_str(ENTITY_READONLY_PREFIX);
    classes.push(if format.is_readonly { '1' } else { '0' });
    classes
}

pub fn is_entity_wrapper(tree: &DomTree, node: NodeId) -> bool {
    tree.is_element(node) && tree.has_class(node, ENTITY_INFO_NAME)
}

/// Read an [`EntityFormat`] back from a wrapper's classes.
pub fn parse_entity_format(tree: &DomTree, node: NodeId) -> EntityFormat {
    let mut format = EntityFormat::default();
    let mut is_entity = false;
    for class in tree.class_list(node) {
        if class == ENTITY_INFO_NAME {
            is_entity = true;
        } else if let Some(entity_type) = class.strip_prefix(ENTITY_TYPE_PREFIX) {
            if !entity_type.is_empty() {
                format.entity_type = Some(SmolStr::new(entity_type));
            }
        } else if let Some(id) = class.strip_prefix(ENTITY_ID_PREFIX) {
            format.id = Some(SmolStr::new(id));
        } else if let Some(readonly) = class.strip_prefix(ENTITY_READONLY_PREFIX) {
            format.is_readonly = readonly == "1";
        }
    }
    if tree.attribute(node, "contenteditable") == Some("false") {
        format.is_readonly = true;
    }
    if !is_entity || format.entity_type.is_none() {
        format.is_fake_entity = true;
    }
    format
}

pub fn is_delimiter(tree: &DomTree, node: NodeId) -> bool {
    tree.is_element(node)
        && (tree.has_class(node, DELIMITER_BEFORE) || tree.has_class(node, DELIMITER_AFTER))
}

pub fn is_block_entity_container(tree: &DomTree, node: NodeId) -> bool {
    tree.is_element(node) && tree.has_class(node, BLOCK_ENTITY_CONTAINER)
}

/// Create a delimiter span with its zero-width space.
pub fn create_delimiter(tree: &mut DomTree, is_before: bool) -> NodeId {
    let span = tree.create_element("span");
    tree.set_attribute(
        span,
        "class",
        if is_before { DELIMITER_BEFORE } else { DELIMITER_AFTER },
    );
    let text = tree.create_text(ZERO_WIDTH_SPACE.to_string());
    tree.append_child(span, text);
    span
}
