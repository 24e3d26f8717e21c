//! Lenient HTML parsing on top of `quick-xml`.
//!
//! Clipboard HTML is rarely well formed: unquoted attributes, unclosed `<p>`
//! and `<li>`, stray `&` and `<`, Office downlevel-revealed conditionals.
//! [`normalize_markup`] first rewrites the input into markup the reader
//! tokenizes the way a browser would, the reader is configured to tolerate
//! the rest and the tree builder fills in the implied end tags the HTML
//! grammar would.

use std::collections::BTreeMap;

use quick_xml::Reader;
use quick_xml::escape::resolve_html5_entity;
use quick_xml::events::{BytesStart, Event};

use crate::error::DomError;
use crate::markup::normalize_markup;
use crate::node::{DomTree, NodeData, NodeId, is_void_tag};

/// Result of parsing a full HTML document.
#[derive(Debug, Clone)]
pub struct ParsedHtml {
    pub tree: DomTree,
    pub html: Option<NodeId>,
    pub head: Option<NodeId>,
    /// Always present: synthesized when the markup has no `<body>`.
    pub body: NodeId,
    /// Attributes of `<html>` plus `name -> content` of every named `<meta>`.
    pub html_attributes: BTreeMap<String, String>,
}

/// Parse a complete (or partial) HTML document.
pub fn parse_html(html: &str) -> Result<ParsedHtml, DomError> {
    let mut tree = DomTree::new();
    let document = tree.document();
    parse_into(&mut tree, document, html)?;

    let html_el = tree.find_descendant(document, |t, n| t.has_tag(n, "html"));
    let head = tree.find_descendant(document, |t, n| t.has_tag(n, "head"));
    let body = match tree.find_descendant(document, |t, n| t.has_tag(n, "body")) {
        Some(body) => body,
        None => synthesize_body(&mut tree, html_el.unwrap_or(document)),
    };
    let html_attributes = collect_html_attributes(&tree, html_el);

    tracing::trace!(
        nodes = tree.len(),
        attributes = html_attributes.len(),
        "parsed html document"
    );

    Ok(ParsedHtml {
        tree,
        html: html_el,
        head,
        body,
        html_attributes,
    })
}

/// Parse `html` and append the resulting nodes under `parent`.
pub fn parse_fragment_into(tree: &mut DomTree, parent: NodeId, html: &str) -> Result<(), DomError> {
    parse_into(tree, parent, html)
}

fn synthesize_body(tree: &mut DomTree, container: NodeId) -> NodeId {
    let body = tree.create_element("body");
    let children: Vec<NodeId> = tree.children(container).to_vec();
    for child in children {
        if tree.has_tag(child, "head") || tree.has_tag(child, "html") {
            continue;
        }
        tree.append_child(body, child);
    }
    tree.append_child(container, body);
    body
}

fn collect_html_attributes(tree: &DomTree, html: Option<NodeId>) -> BTreeMap<String, String> {
    let mut result = BTreeMap::new();
    if let Some(html) = html {
        for attr in tree.attributes(html) {
            result.insert(attr.name.to_string(), attr.value.clone());
        }
    }
    for meta in tree
        .descendants(tree.document())
        .filter(|&n| tree.has_tag(n, "meta"))
    {
        if let (Some(name), Some(content)) =
            (tree.attribute(meta, "name"), tree.attribute(meta, "content"))
        {
            if !name.is_empty() {
                result.insert(name.to_string(), content.to_string());
            }
        }
    }
    result
}

struct TreeBuilder<'t> {
    tree: &'t mut DomTree,
    /// Open elements; index 0 is the container passed in and is never popped.
    stack: Vec<NodeId>,
}

impl TreeBuilder<'_> {
    fn current(&self) -> NodeId {
        *self.stack.last().unwrap_or(&self.stack[0])
    }

    fn open_tag(&self, depth_from_top: usize) -> Option<&str> {
        let index = self.stack.len().checked_sub(1 + depth_from_top)?;
        if index == 0 {
            return None;
        }
        self.tree.tag_name(self.stack[index])
    }

    /// Pop up to and including the nearest open `tag`, unless one of
    /// `boundaries` is found first.
    fn close_nearest(&mut self, tags: &[&str], boundaries: &[&str]) {
        for depth in 0..self.stack.len().saturating_sub(1) {
            let Some(open) = self.open_tag(depth) else {
                return;
            };
            if tags.contains(&open) {
                self.stack.truncate(self.stack.len() - depth - 1);
                return;
            }
            if boundaries.contains(&open) {
                return;
            }
        }
    }

    fn close_implied(&mut self, tag: &str) {
        match tag {
            "li" => self.close_nearest(&["li"], &["ul", "ol", "table"]),
            "tr" => self.close_nearest(&["tr"], &["table", "tbody", "thead", "tfoot"]),
            "td" | "th" => self.close_nearest(&["td", "th"], &["tr", "table"]),
            "tbody" | "thead" | "tfoot" => {
                self.close_nearest(&["tbody", "thead", "tfoot"], &["table"])
            }
            "p" | "div" | "ul" | "ol" | "table" | "blockquote" | "pre" | "h1" | "h2" | "h3"
            | "h4" | "h5" | "h6" | "hr" => {
                if self.open_tag(0) == Some("p") {
                    self.stack.pop();
                }
            }
            _ => {}
        }
    }

    fn element(&mut self, start: &BytesStart<'_>) -> NodeId {
        let name = String::from_utf8_lossy(start.name().as_ref()).to_ascii_lowercase();
        self.close_implied(&name);
        let id = self.tree.create_element(&name);
        for attr in start.html_attributes().with_checks(false).flatten() {
            let key = String::from_utf8_lossy(attr.key.as_ref()).to_ascii_lowercase();
            let value = decode_references(&String::from_utf8_lossy(&attr.value));
            self.tree.set_attribute(id, &key, value);
        }
        let parent = self.current();
        self.tree.append_child(parent, id);
        id
    }

    fn start(&mut self, start: &BytesStart<'_>) {
        let id = self.element(start);
        let is_void = self.tree.tag_name(id).is_some_and(is_void_tag);
        if !is_void {
            self.stack.push(id);
        }
    }

    fn end(&mut self, name: &[u8]) {
        let name = String::from_utf8_lossy(name).to_ascii_lowercase();
        let found = (1..self.stack.len())
            .rev()
            .find(|&i| self.tree.has_tag(self.stack[i], &name));
        match found {
            Some(index) => self.stack.truncate(index),
            None => tracing::trace!(tag = %name, "ignoring unmatched end tag"),
        }
    }

    fn text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let parent = self.current();
        if let Some(last) = self.tree.last_child(parent) {
            if let NodeData::Text(existing) = self.tree.data(last) {
                let merged = format!("{existing}{text}");
                self.tree.set_text(last, merged);
                return;
            }
        }
        let node = self.tree.create_text(text);
        self.tree.append_child(parent, node);
    }

    fn comment(&mut self, text: &str) {
        let node = self.tree.create_comment(text);
        let parent = self.current();
        self.tree.append_child(parent, node);
    }
}

/// Resolve the name of a `&name;` reference into its text.
fn resolve_reference(name: &str) -> String {
    if let Some(number) = name.strip_prefix('#') {
        let code = match number.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => number.parse::<u32>().ok(),
        };
        return code
            .and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_else(|| format!("&{name};"));
    }
    resolve_html5_entity(name)
        .map(String::from)
        .unwrap_or_else(|| format!("&{name};"))
}

/// Replace `&name;` references in `raw`; an `&` that starts no reference
/// stays as is.
fn decode_references(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp + 1..];
        let name = rest
            .find(';')
            .map(|end| &rest[..end])
            .filter(|name| {
                !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '#')
            });
        match name {
            Some(name) => {
                out.push_str(&resolve_reference(name));
                rest = &rest[name.len() + 1..];
            }
            None => out.push('&'),
        }
    }
    out.push_str(rest);
    out
}

fn parse_into(tree: &mut DomTree, container: NodeId, html: &str) -> Result<(), DomError> {
    let source = normalize_markup(html);
    let mut reader = Reader::from_str(&source);
    {
        let config = reader.config_mut();
        config.trim_text(false);
        config.check_end_names = false;
        config.allow_unmatched_ends = true;
        config.allow_dangling_amp = true;
    }

    let mut builder = TreeBuilder {
        tree,
        stack: vec![container],
    };

    loop {
        let position = reader.buffer_position();
        let event = reader.read_event().map_err(|e| DomError::Parse {
            position: position as u64,
            message: e.to_string(),
        })?;
        match event {
            Event::Start(e) => builder.start(&e),
            Event::Empty(e) => {
                builder.element(&e);
            }
            Event::End(e) => builder.end(e.name().as_ref()),
            Event::Text(e) => builder.text(&String::from_utf8_lossy(e.as_ref())),
            Event::CData(e) => builder.text(&String::from_utf8_lossy(e.as_ref())),
            Event::GeneralRef(e) => {
                let name = String::from_utf8_lossy(e.as_ref()).to_string();
                builder.text(&resolve_reference(&name));
            }
            Event::Comment(e) => builder.comment(&String::from_utf8_lossy(e.as_ref())),
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialize::inner_html;

    #[test]
    fn test_body_is_found() {
        let parsed = parse_html("<html><head></head><body><p>hi</p></body></html>").unwrap();
        assert_eq!(inner_html(&parsed.tree, parsed.body), "<p>hi</p>");
        assert!(parsed.head.is_some());
    }

    #[test]
    fn test_body_is_synthesized_for_bare_fragments() {
        let parsed = parse_html("hello <b>world</b>").unwrap();
        assert_eq!(inner_html(&parsed.tree, parsed.body), "hello <b>world</b>");
        assert_eq!(parsed.html, None);
    }

    #[test]
    fn test_html_attributes_from_root_and_meta() {
        let parsed = parse_html(
            r#"<html xmlns:w="urn:schemas-microsoft-com:office:word"><head><meta name=ProgId content=Word.Document><meta http-equiv="x" content="y"></head><body>a</body></html>"#,
        )
        .unwrap();
        assert_eq!(
            parsed.html_attributes.get("xmlns:w").map(String::as_str),
            Some("urn:schemas-microsoft-com:office:word")
        );
        assert_eq!(
            parsed.html_attributes.get("ProgId").map(String::as_str),
            Some("Word.Document")
        );
        assert_eq!(parsed.html_attributes.len(), 2);
    }

    #[test]
    fn test_void_and_implied_end_tags() {
        let parsed = parse_html("<ul><li>one<li>two<br>three</ul><p>a<p>b").unwrap();
        assert_eq!(
            inner_html(&parsed.tree, parsed.body),
            "<ul><li>one</li><li>two<br>three</li></ul><p>a</p><p>b</p>"
        );
    }

    #[test]
    fn test_entities_and_dangling_amp() {
        let parsed =
            parse_html("<p title=\"a &amp; b\">x&nbsp;y &copy; A & B</p><p>&#65;&#x42;</p>").unwrap();
        let p = parsed.tree.first_child(parsed.body).unwrap();
        assert_eq!(parsed.tree.attribute(p, "title"), Some("a & b"));
        assert_eq!(parsed.tree.text_content(p), "x\u{a0}y \u{a9} A & B");
        let second = parsed.tree.next_sibling(p).unwrap();
        assert_eq!(parsed.tree.text_content(second), "AB");
    }

    #[test]
    fn test_office_conditionals_are_dropped() {
        let parsed = parse_html(
            "<p><![if !supportLists]><span>1.</span><![endif]>text<!--[if gte mso 9]><xml></xml><![endif]--></p>",
        )
        .unwrap();
        let p = parsed.tree.first_child(parsed.body).unwrap();
        assert_eq!(parsed.tree.text_content(p), "1.text");
    }

    #[test]
    fn test_stray_lt_stays_text() {
        let parsed = parse_html("<p>if a<3 then</p>").unwrap();
        let p = parsed.tree.first_child(parsed.body).unwrap();
        assert_eq!(parsed.tree.text_content(p), "if a<3 then");

        let parsed = parse_html("1 < 2 <b>x</b>").unwrap();
        assert_eq!(parsed.tree.text_content(parsed.body), "1 < 2 x");
        assert_eq!(inner_html(&parsed.tree, parsed.body), "1 &lt; 2 <b>x</b>");
    }

    #[test]
    fn test_script_content_does_not_swallow_following_text() {
        let parsed = parse_html("<script>if (a<b) {}</script>ok").unwrap();
        let script = parsed.tree.first_child(parsed.body).unwrap();
        assert!(parsed.tree.has_tag(script, "script"));
        assert_eq!(parsed.tree.text_content(script), "if (a<b) {}");
        let after = parsed.tree.next_sibling(script).unwrap();
        assert_eq!(parsed.tree.text(after), Some("ok"));
    }

    #[test]
    fn test_quote_inside_unquoted_attribute() {
        let parsed = parse_html(r#"<p class=a"b>z</p>"#).unwrap();
        let p = parsed.tree.first_child(parsed.body).unwrap();
        assert_eq!(parsed.tree.attribute(p, "class"), Some("a\"b"));
        assert_eq!(parsed.tree.text_content(p), "z");
    }

    #[test]
    fn test_unterminated_attribute_value_recovers() {
        let parsed = parse_html(r#"<a href="x>y</a>"#).unwrap();
        assert_eq!(inner_html(&parsed.tree, parsed.body), r#"<a href="x">y</a>"#);
    }

    #[test]
    fn test_unterminated_comment_runs_to_end() {
        let parsed = parse_html("a<!--b").unwrap();
        let text = parsed.tree.first_child(parsed.body).unwrap();
        assert_eq!(parsed.tree.text(text), Some("a"));
        let comment = parsed.tree.next_sibling(text).unwrap();
        assert!(matches!(parsed.tree.data(comment), NodeData::Comment(c) if c == "b"));
    }

    #[test]
    fn test_dangling_amp_in_attribute() {
        let parsed = parse_html(r#"<a href="?a=1&b=2&amp;c=&#51;">x</a>"#).unwrap();
        let a = parsed.tree.first_child(parsed.body).unwrap();
        assert_eq!(parsed.tree.attribute(a, "href"), Some("?a=1&b=2&c=3"));
    }

    #[test]
    fn test_unmatched_end_tags_are_ignored() {
        let parsed = parse_html("<div>a</span></b>b</div>").unwrap();
        assert_eq!(inner_html(&parsed.tree, parsed.body), "<div>ab</div>");
    }

    #[test]
    fn test_fragment_into_existing_parent() {
        let mut tree = DomTree::new();
        let div = tree.create_element("div");
        parse_fragment_into(&mut tree, div, "<i>x</i>y").unwrap();
        assert_eq!(inner_html(&tree, div), "<i>x</i>y");
    }
}
