//! Arena-backed DOM tree.
//!
//! Nodes live in a single `Vec` owned by [`DomTree`] and are addressed by
//! [`NodeId`]. Detaching a node never frees its slot, so ids stay valid for
//! the lifetime of the tree; a detached subtree simply has no parent.
//!
//! Provides:
//! - `DomTree` - node creation, structural mutation, traversal
//! - attribute, class and inline-style helpers on elements
//! - `Descendants` - pre-order traversal iterator

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::style::{parse_style, serialize_style};

/// Opaque handle to a node inside a [`DomTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(u32);

impl NodeId {
    /// Raw index, mostly for diagnostics.
    pub fn index(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A single attribute. Names are stored lowercased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: SmolStr,
    pub value: String,
}

/// Element payload: tag name (lowercased) plus attributes in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementData {
    pub tag: SmolStr,
    pub attrs: Vec<Attribute>,
}

impl ElementData {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
            .map(|a| a.value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    Document,
    Fragment,
    Element(ElementData),
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone)]
struct Node {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Tags that never have children or a closing tag.
pub const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

pub fn is_void_tag(tag: &str) -> bool {
    VOID_TAGS.iter().any(|t| t.eq_ignore_ascii_case(tag))
}

/// Arena DOM. Node `0` is always the document node.
#[derive(Debug, Clone)]
pub struct DomTree {
    nodes: Vec<Node>,
}

impl Default for DomTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DomTree {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                data: NodeData::Document,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    pub fn document(&self) -> NodeId {
        NodeId(0)
    }

    /// Number of allocated node slots, detached ones included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1 && self.nodes[0].children.is_empty()
    }

    pub fn contains_id(&self, id: NodeId) -> bool {
        (id.0 as usize) < self.nodes.len()
    }

    fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0 as usize]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0 as usize]
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            data,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    // === Creation ===

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(NodeData::Element(ElementData {
            tag: SmolStr::new(tag.to_ascii_lowercase()),
            attrs: Vec::new(),
        }))
    }

    pub fn create_element_with_attrs<N, V>(
        &mut self,
        tag: &str,
        attrs: impl IntoIterator<Item = (N, V)>,
    ) -> NodeId
    where
        N: AsRef<str>,
        V: Into<String>,
    {
        let id = self.create_element(tag);
        for (name, value) in attrs {
            self.set_attribute(id, name.as_ref(), value);
        }
        id
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeData::Text(text.into()))
    }

    pub fn create_comment(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeData::Comment(text.into()))
    }

    pub fn create_fragment(&mut self) -> NodeId {
        self.push(NodeData::Fragment)
    }

    // === Node inspection ===

    pub fn data(&self, id: NodeId) -> &NodeData {
        &self.node(id).data
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        match &self.node(id).data {
            NodeData::Element(e) => Some(e),
            _ => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        match &mut self.node_mut(id).data {
            NodeData::Element(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.node(id).data, NodeData::Element(_))
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.node(id).data, NodeData::Text(_))
    }

    /// Lowercased tag name, `None` for non-elements.
    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|e| e.tag.as_str())
    }

    pub fn has_tag(&self, id: NodeId, tag: &str) -> bool {
        self.tag_name(id).is_some_and(|t| t.eq_ignore_ascii_case(tag))
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).data {
            NodeData::Text(t) => Some(t),
            _ => None,
        }
    }

    /// Replace the data of a text or comment node. No-op for other kinds.
    pub fn set_text(&mut self, id: NodeId, value: impl Into<String>) {
        match &mut self.node_mut(id).data {
            NodeData::Text(t) | NodeData::Comment(t) => *t = value.into(),
            _ => {}
        }
    }

    // === Tree navigation ===

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).children.first().copied()
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).children.last().copied()
    }

    /// Position of `id` among its parent's children.
    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        self.children(parent).get(index + 1).copied()
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        index
            .checked_sub(1)
            .and_then(|i| self.children(parent).get(i).copied())
    }

    pub fn next_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let mut current = self.next_sibling(id);
        while let Some(node) = current {
            if self.is_element(node) {
                return Some(node);
            }
            current = self.next_sibling(node);
        }
        None
    }

    pub fn previous_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let mut current = self.previous_sibling(id);
        while let Some(node) = current {
            if self.is_element(node) {
                return Some(node);
            }
            current = self.previous_sibling(node);
        }
        None
    }

    /// Element children only.
    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|&c| self.is_element(c))
            .collect()
    }

    /// Ancestors from the parent up to the root.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&n| self.parent(n))
    }

    /// Inclusive containment check.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        node == ancestor || self.ancestors(node).any(|a| a == ancestor)
    }

    /// Closest inclusive ancestor matching `pred`.
    pub fn closest(&self, id: NodeId, pred: impl Fn(&DomTree, NodeId) -> bool) -> Option<NodeId> {
        std::iter::once(id)
            .chain(self.ancestors(id))
            .find(|&n| pred(self, n))
    }

    /// Pre-order traversal of everything below `root` (exclusive).
    pub fn descendants(&self, root: NodeId) -> Descendants<'_> {
        let mut stack: Vec<NodeId> = self.children(root).to_vec();
        stack.reverse();
        Descendants { tree: self, stack }
    }

    pub fn find_descendant(
        &self,
        root: NodeId,
        pred: impl Fn(&DomTree, NodeId) -> bool,
    ) -> Option<NodeId> {
        self.descendants(root).find(|&n| pred(self, n))
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self, id: NodeId) -> String {
        if let Some(text) = self.text(id) {
            return text.to_string();
        }
        self.descendants(id)
            .filter_map(|n| self.text(n))
            .collect::<String>()
    }

    // === Structural mutation ===

    /// Remove `id` from its parent. The node and its subtree stay allocated.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.node(id).parent {
            self.node_mut(parent).children.retain(|&c| c != id);
            self.node_mut(id).parent = None;
        }
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        debug_assert!(!self.contains(child, parent), "cycle in dom tree");
        self.detach(child);
        self.node_mut(parent).children.push(child);
        self.node_mut(child).parent = Some(parent);
    }

    /// Insert `child` under `parent` before `reference`, or at the end when
    /// `reference` is `None` or not a child of `parent`.
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) {
        self.detach(child);
        let index = reference
            .and_then(|r| self.children(parent).iter().position(|&c| c == r))
            .unwrap_or(self.children(parent).len());
        self.node_mut(parent).children.insert(index, child);
        self.node_mut(child).parent = Some(parent);
    }

    /// Insert `node` as the next sibling of `reference`.
    pub fn insert_after(&mut self, reference: NodeId, node: NodeId) {
        let Some(parent) = self.parent(reference) else {
            return;
        };
        let next = self.next_sibling(reference);
        self.insert_before(parent, node, next);
    }

    /// Put `new` where `old` is, detaching `old`.
    pub fn replace_with(&mut self, old: NodeId, new: NodeId) {
        if old == new {
            return;
        }
        let Some(parent) = self.parent(old) else {
            return;
        };
        self.insert_before(parent, new, Some(old));
        self.detach(old);
    }

    /// Move every child of `from` to the end of `to`, keeping order.
    pub fn move_children(&mut self, from: NodeId, to: NodeId) {
        let children = std::mem::take(&mut self.node_mut(from).children);
        for child in children {
            self.node_mut(child).parent = None;
            self.append_child(to, child);
        }
    }

    pub fn remove_all_children(&mut self, id: NodeId) {
        let children = std::mem::take(&mut self.node_mut(id).children);
        for child in children {
            self.node_mut(child).parent = None;
        }
    }

    /// Replace an element by its children.
    pub fn unwrap_node(&mut self, id: NodeId) {
        let Some(parent) = self.parent(id) else {
            return;
        };
        let children = std::mem::take(&mut self.node_mut(id).children);
        for child in children {
            self.node_mut(child).parent = None;
            self.insert_before(parent, child, Some(id));
        }
        self.detach(id);
    }

    /// Put `wrapper` in place of `node` and move `node` inside it.
    pub fn wrap(&mut self, node: NodeId, wrapper: NodeId) {
        if let Some(parent) = self.parent(node) {
            self.insert_before(parent, wrapper, Some(node));
        }
        self.append_child(wrapper, node);
    }

    /// Deep copy of a subtree. The copy is detached.
    pub fn deep_clone(&mut self, id: NodeId) -> NodeId {
        let data = self.node(id).data.clone();
        let copy = self.push(data);
        let children = self.node(id).children.clone();
        for child in children {
            let child_copy = self.deep_clone(child);
            self.append_child(copy, child_copy);
        }
        copy
    }

    /// Copy a subtree from another tree into this one. The copy is detached.
    pub fn import(&mut self, other: &DomTree, id: NodeId) -> NodeId {
        let data = match &other.node(id).data {
            NodeData::Document => NodeData::Fragment,
            data => data.clone(),
        };
        let copy = self.push(data);
        for &child in other.children(id) {
            let child_copy = self.import(other, child);
            self.append_child(copy, child_copy);
        }
        copy
    }

    // === Attributes ===

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).and_then(|e| e.attribute(name))
    }

    pub fn has_attribute(&self, id: NodeId, name: &str) -> bool {
        self.attribute(id, name).is_some()
    }

    pub fn attributes(&self, id: NodeId) -> &[Attribute] {
        self.element(id).map(|e| e.attrs.as_slice()).unwrap_or(&[])
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: impl Into<String>) {
        let Some(element) = self.element_mut(id) else {
            return;
        };
        let value = value.into();
        match element
            .attrs
            .iter_mut()
            .find(|a| a.name.eq_ignore_ascii_case(name))
        {
            Some(attr) => attr.value = value,
            None => element.attrs.push(Attribute {
                name: SmolStr::new(name.to_ascii_lowercase()),
                value,
            }),
        }
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Option<String> {
        let element = self.element_mut(id)?;
        let index = element
            .attrs
            .iter()
            .position(|a| a.name.eq_ignore_ascii_case(name))?;
        Some(element.attrs.remove(index).value)
    }

    // === Classes ===

    pub fn class_list(&self, id: NodeId) -> Vec<&str> {
        self.attribute(id, "class")
            .map(|c| c.split_ascii_whitespace().collect())
            .unwrap_or_default()
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.class_list(id).contains(&class)
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) {
        if self.has_class(id, class) {
            return;
        }
        let mut classes: Vec<String> = self.class_list(id).into_iter().map(String::from).collect();
        classes.push(class.to_string());
        self.set_attribute(id, "class", classes.join(" "));
    }

    pub fn remove_class(&mut self, id: NodeId, class: &str) {
        if !self.has_class(id, class) {
            return;
        }
        let classes: Vec<String> = self
            .class_list(id)
            .into_iter()
            .filter(|c| *c != class)
            .map(String::from)
            .collect();
        if classes.is_empty() {
            self.remove_attribute(id, "class");
        } else {
            self.set_attribute(id, "class", classes.join(" "));
        }
    }

    // === Inline style ===

    /// Declarations of the `style` attribute in source order.
    pub fn styles(&self, id: NodeId) -> Vec<(String, String)> {
        self.attribute(id, "style").map(parse_style).unwrap_or_default()
    }

    pub fn style_property(&self, id: NodeId, name: &str) -> Option<String> {
        self.styles(id)
            .into_iter()
            .rev()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    pub fn set_style_property(&mut self, id: NodeId, name: &str, value: &str) {
        let mut styles = self.styles(id);
        styles.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        styles.push((name.to_ascii_lowercase(), value.to_string()));
        self.set_styles(id, &styles);
    }

    pub fn remove_style_property(&mut self, id: NodeId, name: &str) -> Option<String> {
        let mut styles = self.styles(id);
        let removed = styles
            .iter()
            .rev()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.clone())?;
        styles.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        self.set_styles(id, &styles);
        Some(removed)
    }

    /// Overwrite the `style` attribute, dropping it when `styles` is empty.
    pub fn set_styles(&mut self, id: NodeId, styles: &[(String, String)]) {
        if styles.is_empty() {
            self.remove_attribute(id, "style");
        } else {
            self.set_attribute(id, "style", serialize_style(styles));
        }
    }
}

/// Pre-order iterator returned by [`DomTree::descendants`].
pub struct Descendants<'a> {
    tree: &'a DomTree,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let next = self.stack.pop()?;
        self.stack
            .extend(self.tree.children(next).iter().rev().copied());
        Some(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_tree() -> (DomTree, NodeId, NodeId, NodeId) {
        let mut tree = DomTree::new();
        let div = tree.create_element("DIV");
        let a = tree.create_text("a");
        let b = tree.create_element("b");
        tree.append_child(tree.document(), div);
        tree.append_child(div, a);
        tree.append_child(div, b);
        (tree, div, a, b)
    }

    #[test]
    fn test_tag_names_are_lowercased() {
        let (tree, div, _, _) = make_tree();
        assert_eq!(tree.tag_name(div), Some("div"));
        assert!(tree.has_tag(div, "DIV"));
    }

    #[test]
    fn test_siblings() {
        let (tree, div, a, b) = make_tree();
        assert_eq!(tree.next_sibling(a), Some(b));
        assert_eq!(tree.previous_sibling(b), Some(a));
        assert_eq!(tree.previous_sibling(a), None);
        assert_eq!(tree.next_element_sibling(a), Some(b));
        assert_eq!(tree.index_in_parent(b), Some(1));
        assert_eq!(tree.parent(a), Some(div));
    }

    #[test]
    fn test_append_moves_existing_child() {
        let (mut tree, div, a, b) = make_tree();
        tree.append_child(div, a);
        assert_eq!(tree.children(div), &[b, a]);
    }

    #[test]
    fn test_unwrap_keeps_children_in_place() {
        let mut tree = DomTree::new();
        let root = tree.create_element("div");
        let span = tree.create_element("span");
        let x = tree.create_text("x");
        let y = tree.create_text("y");
        let tail = tree.create_text("tail");
        tree.append_child(root, span);
        tree.append_child(root, tail);
        tree.append_child(span, x);
        tree.append_child(span, y);

        tree.unwrap_node(span);

        assert_eq!(tree.children(root), &[x, y, tail]);
        assert_eq!(tree.parent(span), None);
    }

    #[test]
    fn test_classes() {
        let (mut tree, div, _, _) = make_tree();
        tree.add_class(div, "one");
        tree.add_class(div, "two");
        tree.add_class(div, "one");
        assert_eq!(tree.attribute(div, "class"), Some("one two"));
        tree.remove_class(div, "one");
        assert_eq!(tree.class_list(div), vec!["two"]);
        tree.remove_class(div, "two");
        assert!(!tree.has_attribute(div, "class"));
    }

    #[test]
    fn test_style_properties() {
        let (mut tree, div, _, _) = make_tree();
        tree.set_attribute(div, "style", "color: red; FONT-WEIGHT: bold");
        assert_eq!(tree.style_property(div, "font-weight").as_deref(), Some("bold"));
        tree.set_style_property(div, "color", "blue");
        assert_eq!(tree.style_property(div, "color").as_deref(), Some("blue"));
        assert_eq!(tree.remove_style_property(div, "font-weight").as_deref(), Some("bold"));
        assert_eq!(tree.attribute(div, "style"), Some("color: blue"));
    }

    #[test]
    fn test_descendants_preorder() {
        let (mut tree, div, a, b) = make_tree();
        let c = tree.create_text("c");
        tree.append_child(b, c);
        let order: Vec<_> = tree.descendants(tree.document()).collect();
        assert_eq!(order, vec![div, a, b, c]);
        assert_eq!(tree.text_content(div), "ac");
    }

    #[test]
    fn test_import_and_clone() {
        let (tree, div, _, _) = make_tree();
        let mut other = DomTree::new();
        let copy = other.import(&tree, div);
        assert_eq!(other.tag_name(copy), Some("div"));
        assert_eq!(other.children(copy).len(), 2);
        let again = other.deep_clone(copy);
        assert_ne!(again, copy);
        assert_eq!(other.text_content(again), "a");
    }
}
