//! Markup pass run ahead of the XML tokenizer.
//!
//! Browsers accept markup an XML tokenizer rejects or misreads. This pass
//! rewrites the input so the tokenizer sees what a browser would:
//!
//! - a `<` that opens no tag, end tag or comment is text
//! - the content of raw text elements (`script`, `style`, `textarea`, ...)
//!   is text up to the matching end tag
//! - start tags are re-emitted with every attribute value quoted; a quoted
//!   value with no closing quote ends at the next `>`
//! - a comment with no `-->` runs to the end of the input
//! - doctypes, processing instructions and bogus comments such as Office's
//!   `<![if !supportLists]>` or `<?xml:namespace ...>` are dropped

use std::fmt::Write as _;

/// Elements whose content is never markup.
const RAW_TEXT_TAGS: &[&str] = &[
    "script", "style", "xmp", "iframe", "noembed", "noframes", "noscript",
];

/// Like [`RAW_TEXT_TAGS`], but character references still apply.
const ESCAPABLE_RAW_TEXT_TAGS: &[&str] = &["textarea", "title"];

enum Step {
    /// Bytes consumed, counted from the `<`.
    Consumed(usize),
    /// The construct runs to the end of the input.
    End,
}

pub(crate) fn normalize_markup(html: &str) -> String {
    let mut out = String::with_capacity(html.len() + 16);
    let mut pos = 0;
    while let Some(found) = html[pos..].find('<') {
        let lt = pos + found;
        out.push_str(&html[pos..lt]);
        let rest = &html[lt..];
        let bytes = rest.as_bytes();
        let step = match bytes.get(1) {
            _ if rest.starts_with("<!--") => comment(rest, &mut out),
            Some(b'!' | b'?') => bogus_comment(rest),
            Some(b'/') => end_tag(rest, &mut out),
            Some(b) if b.is_ascii_alphabetic() => start_tag(rest, &mut out),
            _ => {
                out.push_str("&lt;");
                Step::Consumed(1)
            }
        };
        match step {
            Step::Consumed(len) => pos = lt + len,
            Step::End => return out,
        }
    }
    out.push_str(&html[pos..]);
    out
}

fn comment(rest: &str, out: &mut String) -> Step {
    match rest[4..].find("-->") {
        Some(end) => {
            let len = 4 + end + 3;
            out.push_str(&rest[..len]);
            Step::Consumed(len)
        }
        None => {
            tracing::trace!("closing unterminated comment at end of input");
            out.push_str(rest);
            out.push_str("-->");
            Step::End
        }
    }
}

fn bogus_comment(rest: &str) -> Step {
    match rest.find('>') {
        Some(end) => Step::Consumed(end + 1),
        None => Step::End,
    }
}

fn end_tag(rest: &str, out: &mut String) -> Step {
    let bytes = rest.as_bytes();
    match bytes.get(2) {
        None => {
            out.push_str("&lt;/");
            Step::Consumed(2)
        }
        Some(b'>') => Step::Consumed(3),
        Some(b) if b.is_ascii_alphabetic() => {
            let name_end = scan(bytes, 2, |b| !is_tag_delimiter(b));
            let Some(close) = rest[name_end..].find('>') else {
                return Step::End;
            };
            let name = tag_name(&rest[2..name_end]);
            let _ = write!(out, "</{name}>");
            Step::Consumed(name_end + close + 1)
        }
        Some(_) => bogus_comment(rest),
    }
}

fn start_tag(rest: &str, out: &mut String) -> Step {
    let bytes = rest.as_bytes();
    let mut i = scan(bytes, 1, |b| !is_tag_delimiter(b));
    let name = tag_name(&rest[1..i]);
    let mut attributes: Vec<(String, &str)> = Vec::new();

    loop {
        i = scan(bytes, i, |b| b.is_ascii_whitespace() || b == b'/');
        match bytes.get(i) {
            None => return Step::End,
            Some(b'>') => {
                i += 1;
                break;
            }
            Some(_) => {}
        }

        // a leading `=` belongs to the name
        let name_start = i;
        i = scan(bytes, i + 1, |b| !is_tag_delimiter(b) && b != b'=');
        let attribute = rest[name_start..i].to_ascii_lowercase();
        i = scan(bytes, i, |b| b.is_ascii_whitespace());

        let mut value = "";
        if bytes.get(i) == Some(&b'=') {
            i = scan(bytes, i + 1, |b| b.is_ascii_whitespace());
            match bytes.get(i) {
                None => return Step::End,
                Some(&quote @ (b'"' | b'\'')) => {
                    let start = i + 1;
                    match rest[start..].find(quote as char) {
                        Some(len) => {
                            value = &rest[start..start + len];
                            i = start + len + 1;
                        }
                        None => {
                            let Some(len) = rest[start..].find('>') else {
                                return Step::End;
                            };
                            tracing::trace!(%attribute, "closing unterminated attribute value");
                            value = &rest[start..start + len];
                            i = start + len;
                        }
                    }
                }
                Some(_) => {
                    let start = i;
                    i = scan(bytes, i, |b| !b.is_ascii_whitespace() && b != b'>');
                    value = &rest[start..i];
                }
            }
        }

        let duplicate = attributes.iter().any(|(existing, _)| *existing == attribute);
        if is_valid_attribute_name(&attribute) && !duplicate {
            attributes.push((attribute, value));
        }
    }

    out.push('<');
    out.push_str(&name);
    for (attribute, value) in &attributes {
        let _ = write!(out, " {attribute}=\"{}\"", escape_attribute(value));
    }
    out.push('>');

    let raw = RAW_TEXT_TAGS.contains(&name.as_str());
    if !raw && !ESCAPABLE_RAW_TEXT_TAGS.contains(&name.as_str()) {
        return Step::Consumed(i);
    }
    let content = &rest[i..];
    match find_end_tag(content, &name) {
        Some(len) => {
            escape_raw_text(&content[..len], raw, out);
            Step::Consumed(i + len)
        }
        None => {
            escape_raw_text(content, raw, out);
            Step::End
        }
    }
}

fn scan(bytes: &[u8], mut i: usize, keep: impl Fn(u8) -> bool) -> usize {
    while i < bytes.len() && keep(bytes[i]) {
        i += 1;
    }
    i
}

fn is_tag_delimiter(b: u8) -> bool {
    b.is_ascii_whitespace() || b == b'/' || b == b'>'
}

fn tag_name(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ':' | '-' | '_' | '.'))
        .collect::<String>()
        .to_ascii_lowercase()
}

fn is_valid_attribute_name(name: &str) -> bool {
    !name.is_empty()
        && !name
            .chars()
            .any(|c| c.is_control() || matches!(c, '"' | '\'' | '<' | '='))
}

fn escape_attribute(value: &str) -> String {
    value
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_raw_text(text: &str, raw: bool, out: &mut String) {
    for c in text.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '&' if raw => out.push_str("&amp;"),
            _ => out.push(c),
        }
    }
}

/// Offset of the `</name` closing a raw text element.
fn find_end_tag(content: &str, name: &str) -> Option<usize> {
    // ASCII lowercasing keeps byte offsets
    let lower = content.to_ascii_lowercase();
    let needle = format!("</{name}");
    let mut from = 0;
    while let Some(found) = lower[from..].find(&needle) {
        let at = from + found;
        let next = lower.as_bytes().get(at + needle.len()).copied();
        if next.is_none_or(is_tag_delimiter) {
            return Some(at);
        }
        from = at + needle.len();
    }
    None
}
