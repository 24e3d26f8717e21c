//! Delimiter spans around read-only inline entities.
//!
//! Browsers cannot place a caret next to a non-editable inline element, so
//! every read-only inline entity wrapper is flanked by
//! `<span class="entityDelimiterBefore">ZWSP</span>` and its `After`
//! counterpart. After every change:
//!
//! 1. a delimiter sits directly next to an entity wrapper on its own side,
//! 2. a delimiter holds nothing but the zero-width space,
//! 3. every read-only inline wrapper has both delimiters.
//!
//! Native typing can break these; [`normalize_delimiters`] repairs the DOM.

use weaver_content_model::entity::{
    DELIMITER_AFTER, DELIMITER_BEFORE, ZERO_WIDTH_SPACE, create_delimiter, is_entity_wrapper,
    parse_entity_format,
};
use weaver_content_model::is_block_tag;
use weaver_dom::{DomTree, NodeId};

fn is_delimiter_element(tree: &DomTree, node: NodeId) -> bool {
    tree.is_element(node)
        && (tree.has_class(node, DELIMITER_BEFORE) || tree.has_class(node, DELIMITER_AFTER))
}

/// A well-formed delimiter: delimiter class and only the zero-width space.
pub fn is_entity_delimiter(tree: &DomTree, node: NodeId) -> bool {
    tree.has_tag(node, "span")
        && is_delimiter_element(tree, node)
        && tree.text_content(node) == ZERO_WIDTH_SPACE.to_string()
}

/// The wrapper a delimiter belongs to, if it is in place.
pub fn delimiter_entity(tree: &DomTree, delimiter: NodeId) -> Option<NodeId> {
    let sibling = if tree.has_class(delimiter, DELIMITER_AFTER) {
        tree.previous_element_sibling(delimiter)
    } else {
        tree.next_element_sibling(delimiter)
    }?;
    is_entity_wrapper(tree, sibling).then_some(sibling)
}

/// Delimiter-classed elements with no entity wrapper on their side.
pub fn find_invalid_delimiters(tree: &DomTree, root: NodeId) -> Vec<NodeId> {
    tree.descendants(root)
        .filter(|&node| is_delimiter_element(tree, node) && delimiter_entity(tree, node).is_none())
        .collect()
}

/// Read-only inline wrappers missing one of their delimiters.
pub fn find_undelimited_entities(tree: &DomTree, root: NodeId) -> Vec<NodeId> {
    tree.descendants(root)
        .filter(|&node| needs_delimiters(tree, node))
        .filter(|&node| {
            let before = tree
                .previous_element_sibling(node)
                .is_some_and(|n| tree.has_class(n, DELIMITER_BEFORE));
            let after = tree
                .next_element_sibling(node)
                .is_some_and(|n| tree.has_class(n, DELIMITER_AFTER));
            !(before && after)
        })
        .collect()
}

fn needs_delimiters(tree: &DomTree, node: NodeId) -> bool {
    if !is_entity_wrapper(tree, node) {
        return false;
    }
    let format = parse_entity_format(tree, node);
    format.is_readonly
        && !format.is_fake_entity
        && tree.tag_name(node).is_some_and(|tag| !is_block_tag(tag))
}

/// Remove stale delimiters. Untouched ones go away entirely; ones the user
/// typed into lose their delimiter class and zero-width space but keep the
/// typed text.
pub fn remove_invalid_delimiters(tree: &mut DomTree, nodes: &[NodeId]) {
    for &node in nodes {
        if is_entity_delimiter(tree, node) {
            tree.detach(node);
            continue;
        }
        tree.remove_class(node, DELIMITER_BEFORE);
        tree.remove_class(node, DELIMITER_AFTER);
        strip_zero_width_spaces(tree, node);
    }
}

fn strip_zero_width_spaces(tree: &mut DomTree, node: NodeId) {
    let texts: Vec<NodeId> = tree.descendants(node).filter(|&n| tree.is_text(n)).collect();
    for text in texts {
        let Some(value) = tree.text(text) else {
            continue;
        };
        if value.contains(ZERO_WIDTH_SPACE) {
            let stripped = value.replace(ZERO_WIDTH_SPACE, "");
            tree.set_text(text, stripped);
        }
    }
}

/// Insert the delimiters read-only inline wrappers are missing. Returns the
/// number of delimiters added.
pub fn add_delimiters_if_needed(tree: &mut DomTree, root: NodeId) -> usize {
    let mut added = 0;
    for wrapper in find_undelimited_entities(tree, root) {
        let Some(parent) = tree.parent(wrapper) else {
            continue;
        };
        let has_before = tree
            .previous_element_sibling(wrapper)
            .is_some_and(|n| tree.has_class(n, DELIMITER_BEFORE));
        if !has_before {
            let delimiter = create_delimiter(tree, true);
            tree.insert_before(parent, delimiter, Some(wrapper));
            added += 1;
        }
        let has_after = tree
            .next_element_sibling(wrapper)
            .is_some_and(|n| tree.has_class(n, DELIMITER_AFTER));
        if !has_after {
            let delimiter = create_delimiter(tree, false);
            tree.insert_after(wrapper, delimiter);
            added += 1;
        }
    }
    added
}

/// Restore the delimiter invariants under `root`. Returns whether the DOM
/// changed.
pub fn normalize_delimiters(tree: &mut DomTree, root: NodeId) -> bool {
    let invalid = find_invalid_delimiters(tree, root);
    if !invalid.is_empty() {
        tracing::warn!(count = invalid.len(), "removing stale entity delimiters");
        remove_invalid_delimiters(tree, &invalid);
    }
    let added = add_delimiters_if_needed(tree, root);
    !invalid.is_empty() || added > 0
}
