//! Inline CSS declaration helpers.
//!
//! Only the `style` attribute grammar is handled: `name: value` pairs split
//! on `;`, with parentheses and quotes respected so `url(a;b)` and
//! `font-family: "a;b"` survive.

/// Split a `style` attribute into lowercased-name / trimmed-value pairs.
///
/// Declarations without a colon or with an empty name are dropped.
pub fn parse_style(style: &str) -> Vec<(String, String)> {
    split_top_level(style, ';')
        .into_iter()
        .filter_map(|decl| {
            let (name, value) = decl.split_once(':')?;
            let name = name.trim();
            let value = value.trim();
            if name.is_empty() {
                return None;
            }
            Some((name.to_ascii_lowercase(), value.to_string()))
        })
        .collect()
}

pub fn serialize_style(styles: &[(String, String)]) -> String {
    styles
        .iter()
        .map(|(n, v)| format!("{n}: {v}"))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Split on `sep` outside of parentheses and quotes.
pub fn split_top_level(input: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, c) in input.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => depth = depth.saturating_sub(1),
            (None, c) if c == sep && depth == 0 => {
                parts.push(&input[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);
    parts.retain(|p| !p.trim().is_empty());
    parts
}

/// Expand a 1-4 value box shorthand (`margin`, `padding`, `border-color`...)
/// into `[top, right, bottom, left]`.
pub fn expand_box_shorthand(value: &str) -> Option<[String; 4]> {
    let parts = split_top_level(value.trim(), ' ');
    let parts: Vec<String> = parts.iter().map(|p| p.trim().to_string()).collect();
    match parts.as_slice() {
        [all] => Some([all.clone(), all.clone(), all.clone(), all.clone()]),
        [v, h] => Some([v.clone(), h.clone(), v.clone(), h.clone()]),
        [t, h, b] => Some([t.clone(), h.clone(), b.clone(), h.clone()]),
        [t, r, b, l] => Some([t.clone(), r.clone(), b.clone(), l.clone()]),
        _ => None,
    }
}

/// Parse a CSS length into pixels. Supports `px`, `pt`, `in`, `cm`, `mm`
/// and unitless numbers; anything else yields `None`.
pub fn parse_length_px(value: &str) -> Option<f32> {
    let value = value.trim().to_ascii_lowercase();
    let (number, factor) = if let Some(n) = value.strip_suffix("px") {
        (n, 1.0)
    } else if let Some(n) = value.strip_suffix("pt") {
        (n, 4.0 / 3.0)
    } else if let Some(n) = value.strip_suffix("in") {
        (n, 96.0)
    } else if let Some(n) = value.strip_suffix("cm") {
        (n, 96.0 / 2.54)
    } else if let Some(n) = value.strip_suffix("mm") {
        (n, 96.0 / 25.4)
    } else {
        (value.as_str(), 1.0)
    };
    number.trim().parse::<f32>().ok().map(|n| n * factor)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_parse_style_respects_parens_and_quotes() {
        let styles = parse_style(
            "background: url(a;b.png); font-family: \"x;y\", serif;; Color : Red ;bogus",
        );
        assert_eq!(
            styles,
            vec![
                ("background".to_string(), "url(a;b.png)".to_string()),
                ("font-family".to_string(), "\"x;y\", serif".to_string()),
                ("color".to_string(), "Red".to_string()),
            ]
        );
    }

    #[test]
    fn test_serialize_style() {
        let styles = vec![
            ("color".to_string(), "red".to_string()),
            ("margin".to_string(), "0px".to_string()),
        ];
        assert_eq!(serialize_style(&styles), "color: red; margin: 0px");
    }

    #[test]
    fn test_expand_box_shorthand() {
        assert_eq!(
            expand_box_shorthand("1px 2px"),
            Some(["1px", "2px", "1px", "2px"].map(String::from))
        );
        assert_eq!(
            expand_box_shorthand("1px 2px 3px"),
            Some(["1px", "2px", "3px", "2px"].map(String::from))
        );
        assert_eq!(expand_box_shorthand(""), None);
    }

    #[test]
    fn test_parse_length_px() {
        assert_eq!(parse_length_px("12px"), Some(12.0));
        let pt = parse_length_px("12pt").unwrap();
        assert!((pt - 16.0).abs() < 0.01);
        assert_eq!(parse_length_px("40"), Some(40.0));
        assert_eq!(parse_length_px("auto"), None);
    }
}
