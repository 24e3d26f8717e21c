//! HTML serialization of a [`DomTree`] subtree.

use quick_xml::escape::{escape, partial_escape};

use crate::node::{DomTree, NodeData, NodeId, is_void_tag};

/// Serialize `id` including its own tag.
pub fn outer_html(tree: &DomTree, id: NodeId) -> String {
    let mut out = String::new();
    write_node(tree, id, &mut out);
    out
}

/// Serialize the children of `id`.
pub fn inner_html(tree: &DomTree, id: NodeId) -> String {
    let mut out = String::new();
    for &child in tree.children(id) {
        write_node(tree, child, &mut out);
    }
    out
}

fn write_node(tree: &DomTree, id: NodeId, out: &mut String) {
    match tree.data(id) {
        NodeData::Document | NodeData::Fragment => {
            for &child in tree.children(id) {
                write_node(tree, child, out);
            }
        }
        NodeData::Text(text) => out.push_str(&partial_escape(text.as_str())),
        NodeData::Comment(text) => {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        }
        NodeData::Element(element) => {
            out.push('<');
            out.push_str(&element.tag);
            for attr in &element.attrs {
                out.push(' ');
                out.push_str(&attr.name);
                out.push_str("=\"");
                out.push_str(&escape(attr.value.as_str()));
                out.push('"');
            }
            out.push('>');
            if is_void_tag(&element.tag) {
                return;
            }
            for &child in tree.children(id) {
                write_node(tree, child, out);
            }
            out.push_str("</");
            out.push_str(&element.tag);
            out.push('>');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escaping() {
        let mut tree = DomTree::new();
        let a = tree.create_element_with_attrs("a", [("href", "x?a=1&b=\"2\"")]);
        let text = tree.create_text("1 < 2 & 3");
        tree.append_child(a, text);
        insta::assert_snapshot!(outer_html(&tree, a), @r#"<a href="x?a=1&amp;b=&quot;2&quot;">1 &lt; 2 &amp; 3</a>"#);
    }

    #[test]
    fn test_void_elements_have_no_end_tag() {
        let mut tree = DomTree::new();
        let div = tree.create_element("div");
        let br = tree.create_element("br");
        let img = tree.create_element_with_attrs("img", [("src", "a.png")]);
        tree.append_child(div, br);
        tree.append_child(div, img);
        assert_eq!(outer_html(&tree, div), "<div><br><img src=\"a.png\"></div>");
    }

    #[test]
    fn test_comments_round_trip() {
        let mut tree = DomTree::new();
        let frag = tree.create_fragment();
        let comment = tree.create_comment("StartFragment");
        tree.append_child(frag, comment);
        assert_eq!(inner_html(&tree, frag), "<!--StartFragment-->");
    }
}
