//! Allowlist sanitizer for pasted fragments.
//!
//! Elements fall into three groups: allowed ones are kept with their
//! attributes filtered, dangerous ones are removed along with everything
//! inside them, and anything else is unwrapped so its text survives.
//! [`SanitizingOption`] widens or narrows the lists for one paste.

use std::rc::Rc;

use weaver_content_model::entity::{
    BLOCK_ENTITY_CONTAINER, DELIMITER_AFTER, DELIMITER_BEFORE, ENTITY_ID_PREFIX, ENTITY_INFO_NAME,
    ENTITY_READONLY_PREFIX, ENTITY_TYPE_PREFIX,
};
use weaver_dom::{DomTree, NodeData, NodeId};
use weaver_editor_core::{BeforePasteEvent, PasteFragment, SanitizingOption};

const ALLOWED_TAGS: &[&str] = &[
    "a", "abbr", "address", "article", "aside", "b", "bdi", "bdo", "big", "blockquote", "br",
    "caption", "center", "cite", "code", "col", "colgroup", "dd", "del", "details", "dfn", "div",
    "dl", "dt", "em", "figcaption", "figure", "font", "footer", "h1", "h2", "h3", "h4", "h5",
    "h6", "header", "hgroup", "hr", "i", "img", "ins", "kbd", "label", "li", "main", "mark",
    "nav", "ol", "p", "pre", "q", "rp", "rt", "ruby", "s", "samp", "section", "small", "span",
    "strike", "strong", "sub", "summary", "sup", "table", "tbody", "td", "tfoot", "th", "thead",
    "time", "tr", "tt", "u", "ul", "var", "wbr",
];

/// Removed together with their content.
const DISALLOWED_TAGS: &[&str] = &[
    "applet", "audio", "base", "basefont", "button", "canvas", "embed", "form", "frame",
    "frameset", "head", "iframe", "input", "link", "math", "meta", "noscript", "object",
    "option", "script", "select", "style", "svg", "template", "textarea", "title", "video",
    "xml",
];

const ALLOWED_ATTRIBUTES: &[&str] = &[
    "abbr", "align", "alt", "bgcolor", "border", "bordercolor", "cellpadding", "cellspacing",
    "cite", "class", "color", "colspan", "contenteditable", "datetime", "dir", "face", "headers",
    "height", "href", "id", "lang", "name", "rel", "reversed", "role", "rowspan", "scope", "size",
    "span", "src", "start", "style", "target", "title", "type", "valign", "value", "width",
];

const URL_ATTRIBUTES: &[&str] = &["href", "src", "cite"];

const DISALLOWED_STYLES: &[&str] = &["position", "behavior", "-moz-binding", "-webkit-binding"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagPolicy {
    Keep,
    Drop,
    Unwrap,
}

/// The options every paste starts from: entity and delimiter classes are
/// kept, and the caret color pasted content carries is dropped.
pub fn default_sanitizing_option() -> SanitizingOption {
    let mut option = SanitizingOption {
        allowed_custom_classes: vec![
            ENTITY_INFO_NAME.to_string(),
            format!("{ENTITY_TYPE_PREFIX}*"),
            format!("{ENTITY_ID_PREFIX}*"),
            format!("{ENTITY_READONLY_PREFIX}*"),
            BLOCK_ENTITY_CONTAINER.to_string(),
            DELIMITER_BEFORE.to_string(),
            DELIMITER_AFTER.to_string(),
        ],
        ..Default::default()
    };
    option
        .style_sanitizers
        .insert("caret-color".into(), Rc::new(|_: &str, _: &str| None));
    option
}

/// Sanitize the event's fragment with its own options.
pub fn sanitize(event: &mut BeforePasteEvent) {
    sanitize_fragment(&mut event.fragment, &event.sanitizing_option);
}

pub fn sanitize_fragment(fragment: &mut PasteFragment, option: &SanitizingOption) {
    let root = fragment.root;
    sanitize_children(&mut fragment.tree, root, option);
}

fn sanitize_children(tree: &mut DomTree, parent: NodeId, option: &SanitizingOption) {
    let children = tree.children(parent).to_vec();
    for child in children {
        match tree.data(child) {
            NodeData::Comment(_) | NodeData::Document => tree.detach(child),
            NodeData::Fragment => {
                sanitize_children(tree, child, option);
                tree.unwrap_node(child);
            }
            NodeData::Element(_) => sanitize_element(tree, child, option),
            NodeData::Text(_) => {}
        }
    }
}

fn sanitize_element(tree: &mut DomTree, node: NodeId, option: &SanitizingOption) {
    let tag = tree.tag_name(node).unwrap_or_default().to_string();
    match tag_policy(&tag, option) {
        TagPolicy::Drop => {
            tracing::trace!(tag, "dropping disallowed element");
            tree.detach(node);
        }
        TagPolicy::Keep => {
            sanitize_attributes(tree, node, &tag, option);
            sanitize_children(tree, node, option);
        }
        TagPolicy::Unwrap => {
            sanitize_children(tree, node, option);
            tree.unwrap_node(node);
        }
    }
}

fn tag_policy(tag: &str, option: &SanitizingOption) -> TagPolicy {
    if option.additional_allowed_tags.iter().any(|t| t == tag) {
        TagPolicy::Keep
    } else if DISALLOWED_TAGS.contains(&tag)
        || option.additional_disallowed_tags.iter().any(|t| t == tag)
    {
        TagPolicy::Drop
    } else if ALLOWED_TAGS.contains(&tag) {
        TagPolicy::Keep
    } else {
        TagPolicy::Unwrap
    }
}

fn sanitize_attributes(tree: &mut DomTree, node: NodeId, tag: &str, option: &SanitizingOption) {
    let attributes = tree.attributes(node).to_vec();
    for attribute in attributes {
        let name = attribute.name.as_str();
        match name {
            "style" => sanitize_style(tree, node, tag, option),
            "class" => sanitize_class(tree, node, &attribute.value, option),
            _ if is_allowed_attribute(name, option) => {
                let value = sanitize_attribute_value(name, &attribute.value, tag, option);
                match value {
                    Some(value) if value != attribute.value => tree.set_attribute(node, name, value),
                    Some(_) => {}
                    None => {
                        tree.remove_attribute(node, name);
                    }
                }
            }
            _ => {
                tree.remove_attribute(node, name);
            }
        }
    }
}

fn is_allowed_attribute(name: &str, option: &SanitizingOption) -> bool {
    if name.starts_with("on") {
        return false;
    }
    ALLOWED_ATTRIBUTES.contains(&name)
        || name.starts_with("data-")
        || name.starts_with("aria-")
        || option.additional_allowed_attributes.iter().any(|a| a == name)
}

fn sanitize_attribute_value(
    name: &str,
    value: &str,
    tag: &str,
    option: &SanitizingOption,
) -> Option<String> {
    if URL_ATTRIBUTES.contains(&name) && !is_safe_url(value, tag) {
        return None;
    }
    match option.attribute_sanitizers.get(name) {
        Some(sanitizer) => sanitizer(value, tag),
        None => Some(value.to_string()),
    }
}

fn is_safe_url(value: &str, tag: &str) -> bool {
    let value: String = value
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect::<String>()
        .to_ascii_lowercase();
    if value.starts_with("javascript:") || value.starts_with("vbscript:") {
        return false;
    }
    if value.starts_with("data:") {
        return tag == "img" && value.starts_with("data:image/");
    }
    true
}

fn sanitize_style(tree: &mut DomTree, node: NodeId, tag: &str, option: &SanitizingOption) {
    let styles = tree.styles(node);
    let mut kept = Vec::with_capacity(styles.len());
    for (name, value) in styles {
        let name = name.to_ascii_lowercase();
        if DISALLOWED_STYLES.contains(&name.as_str()) || is_dangerous_style_value(&value) {
            continue;
        }
        let value = match option.style_sanitizers.get(name.as_str()) {
            Some(sanitizer) => sanitizer(&value, tag),
            None => Some(value),
        };
        if let Some(value) = value {
            kept.push((name, value));
        }
    }
    tree.set_styles(node, &kept);
}

fn is_dangerous_style_value(value: &str) -> bool {
    let value = value.to_ascii_lowercase();
    value.contains("expression(") || value.contains("javascript:") || value.contains("vbscript:")
}

fn sanitize_class(tree: &mut DomTree, node: NodeId, classes: &str, option: &SanitizingOption) {
    let kept: Vec<&str> = classes
        .split_ascii_whitespace()
        .filter(|class| is_allowed_class(class, &option.allowed_custom_classes))
        .collect();
    if kept.is_empty() {
        tree.remove_attribute(node, "class");
    } else {
        tree.set_attribute(node, "class", kept.join(" "));
    }
}

/// A pattern ending in `*` matches every class with that prefix.
pub fn is_allowed_class(class: &str, allowed: &[String]) -> bool {
    allowed.iter().any(|pattern| match pattern.strip_suffix('*') {
        Some(prefix) => class.starts_with(prefix),
        None => class == pattern,
    })
}

#[cfg(test)]
mod tests {
    use weaver_dom::{inner_html, parse_fragment_into};

    use super::*;

    fn sanitized(html: &str, option: &SanitizingOption) -> String {
        let mut fragment = PasteFragment::new();
        parse_fragment_into(&mut fragment.tree, fragment.root, html).unwrap();
        sanitize_fragment(&mut fragment, option);
        inner_html(&fragment.tree, fragment.root)
    }

    #[test]
    fn test_dangerous_elements_go_with_content() {
        let html = sanitized(
            "<p>a<script>alert(1)</script><style>p{}</style>b</p>",
            &SanitizingOption::default(),
        );
        assert_eq!(html, "<p>ab</p>");
    }

    #[test]
    fn test_unknown_elements_are_unwrapped() {
        let html = sanitized("<p><o:p>x</o:p><custom>y</custom></p>", &SanitizingOption::default());
        assert_eq!(html, "<p>xy</p>");
    }

    #[test]
    fn test_event_handlers_and_script_urls_are_removed() {
        let html = sanitized(
            r#"<a href="javascript:alert(1)" onclick="x()" title="t">l</a><img src="data:image/png;base64,AA" onerror="x()">"#,
            &SanitizingOption::default(),
        );
        insta::assert_snapshot!(html, @r#"<a title="t">l</a><img src="data:image/png;base64,AA">"#);
    }

    #[test]
    fn test_classes_filtered_by_allowlist() {
        let option = default_sanitizing_option();
        let html = sanitized(
            r#"<span class="_Entity _EType_mention _EId_m1 _EReadonly_1 MsoNormal">@</span>"#,
            &option,
        );
        assert_eq!(
            html,
            r#"<span class="_Entity _EType_mention _EId_m1 _EReadonly_1">@</span>"#
        );
    }

    #[test]
    fn test_style_sanitizers_and_blocked_properties() {
        let option = default_sanitizing_option();
        let html = sanitized(
            r#"<span style="color: red; caret-color: blue; position: absolute; width: expression(alert(1))">x</span>"#,
            &option,
        );
        assert_eq!(html, r#"<span style="color: red">x</span>"#);
    }

    #[test]
    fn test_additional_tag_lists() {
        let mut option = SanitizingOption::default();
        option.additional_allowed_tags.push("google-sheets-html-origin".into());
        option.additional_disallowed_tags.push("font".into());
        let html = sanitized(
            "<google-sheets-html-origin><font>gone</font>kept</google-sheets-html-origin>",
            &option,
        );
        insta::assert_snapshot!(html, @"<google-sheets-html-origin>kept</google-sheets-html-origin>");
    }

    #[test]
    fn test_class_prefix_patterns() {
        let allowed = vec!["Table*".to_string(), "exact".to_string()];
        assert!(is_allowed_class("TableGrid", &allowed));
        assert!(is_allowed_class("exact", &allowed));
        assert!(!is_allowed_class("exactly", &allowed));
    }
}
