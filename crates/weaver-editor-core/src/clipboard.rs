//! Clipboard payloads and the before-paste event handed to paste plugins.
//!
//! [`BeforePasteEvent`] is the documented mutation surface of the paste
//! pipeline: handlers may rewrite `fragment`, `sanitizing_option` and
//! `dom_to_model_option`, everything else is informational.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use weaver_content_model::DomToModelOption;
use weaver_dom::{DomTree, NodeId};

use crate::undo::Snapshot;

/// How the user asked to paste.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PasteType {
    #[default]
    Normal,
    AsImage,
    AsPlainText,
    /// Paste keeping only the source's emphasis, taking the rest from the
    /// destination.
    MergeFormat,
}

/// Raw image bytes from the clipboard.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ImageData {
    pub mime_type: SmolStr,
    pub bytes: Vec<u8>,
}

/// Everything the host read from the clipboard for one paste.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClipboardData {
    /// MIME types present on the clipboard.
    pub types: Vec<String>,
    pub raw_html: Option<String>,
    pub text: String,
    pub image: Option<ImageData>,
    pub image_data_uri: Option<String>,
    /// Host specific values keyed by MIME type.
    pub custom_values: BTreeMap<String, String>,
    /// Document state before the first paste of this payload. Pasting the
    /// same payload again restores it first.
    pub snapshot_before_paste: Option<Snapshot>,
    /// Tag names of the top-level children of the pasted fragment.
    pub html_first_level_child_tags: Vec<SmolStr>,
}

impl ClipboardData {
    pub fn from_html(html: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            types: vec!["text/html".into(), "text/plain".into()],
            raw_html: Some(html.into()),
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            types: vec!["text/plain".into()],
            text: text.into(),
            ..Default::default()
        }
    }
}

/// Rewrites or rejects an attribute or style value. Receives the value and
/// the tag of its element; `None` drops the value.
pub type ValueSanitizer = Rc<dyn Fn(&str, &str) -> Option<String>>;

/// Per-paste adjustments to the sanitizer's allowlists.
#[derive(Clone, Default)]
pub struct SanitizingOption {
    pub additional_allowed_tags: Vec<SmolStr>,
    pub additional_disallowed_tags: Vec<SmolStr>,
    pub additional_allowed_attributes: Vec<SmolStr>,
    /// Class names kept on sanitized elements; all others are removed.
    pub allowed_custom_classes: Vec<String>,
    pub style_sanitizers: HashMap<SmolStr, ValueSanitizer>,
    pub attribute_sanitizers: HashMap<SmolStr, ValueSanitizer>,
}

impl fmt::Debug for SanitizingOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys = |map: &HashMap<SmolStr, ValueSanitizer>| {
            let mut keys: Vec<&str> = map.keys().map(SmolStr::as_str).collect();
            keys.sort_unstable();
            keys.join(",")
        };
        f.debug_struct("SanitizingOption")
            .field("additional_allowed_tags", &self.additional_allowed_tags)
            .field("additional_disallowed_tags", &self.additional_disallowed_tags)
            .field("additional_allowed_attributes", &self.additional_allowed_attributes)
            .field("allowed_custom_classes", &self.allowed_custom_classes)
            .field("style_sanitizers", &keys(&self.style_sanitizers))
            .field("attribute_sanitizers", &keys(&self.attribute_sanitizers))
            .finish()
    }
}

/// The pasted content as a detached DOM subtree.
#[derive(Debug, Clone)]
pub struct PasteFragment {
    pub tree: DomTree,
    pub root: NodeId,
}

impl PasteFragment {
    pub fn new() -> Self {
        let mut tree = DomTree::new();
        let root = tree.create_fragment();
        Self { tree, root }
    }

    pub fn is_empty(&self) -> bool {
        self.tree.children(self.root).is_empty()
    }
}

impl Default for PasteFragment {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct BeforePasteEvent {
    pub clipboard_data: ClipboardData,
    pub fragment: PasteFragment,
    /// Markup before `<!--StartFragment-->`.
    pub html_before: String,
    /// Markup after `<!--EndFragment-->`.
    pub html_after: String,
    /// `<html>` attributes and named `<meta>` values of the pasted document.
    pub html_attributes: BTreeMap<String, String>,
    pub sanitizing_option: SanitizingOption,
    pub dom_to_model_option: DomToModelOption,
    pub paste_type: PasteType,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_fragment() {
        let mut fragment = PasteFragment::new();
        assert!(fragment.is_empty());
        let p = fragment.tree.create_element("p");
        fragment.tree.append_child(fragment.root, p);
        assert!(!fragment.is_empty());
    }

    #[test]
    fn test_sanitizing_option_debug_lists_keys() {
        let mut option = SanitizingOption::default();
        option
            .style_sanitizers
            .insert("caret-color".into(), Rc::new(|_: &str, _: &str| None));
        let debug = format!("{option:?}");
        assert!(debug.contains("caret-color"));
    }
}
