//! Word desktop content.
//!
//! Word has no real lists in its clipboard HTML. Each list item is a
//! paragraph tagged `mso-list: lN levelM lfoK`, preceded by a bullet span
//! tagged `mso-list: Ignore`, and the list's numbering format lives in
//! `@list lN:levelM { ... }` rules in the document head. This normalizer
//! turns those paragraphs back into list items and drops Word's comment
//! markup.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::LazyLock;

use regex::Regex;
use smol_str::SmolStr;
use weaver_content_model::{
    Block, BlockGroup, BoxFormat, ContainerFormat, DomToModelContext, ListLevel, ListLevelFormat,
    ListType, Side, TableFormat,
};
use weaver_dom::{DomTree, NodeId, parse_length_px};
use weaver_editor_core::BeforePasteEvent;

use super::{allow_classes, fallback_element_processor, process_with_fallback};

static LIST_DEFINITION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)@list\s+(l\d+):level(\d+)\s*\{([^}]*)\}")
        .expect("BUG: invalid list definition regex literal")
});

static MSO_LIST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(l\d+)\s+level(\d+)\s+(lfo\d+)").expect("BUG: invalid mso-list regex literal")
});

static NUMBERED_BULLET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\(?([0-9]+|[a-z]|[ivxlcdm]+)[.)]$")
        .expect("BUG: invalid numbered bullet regex literal")
});

const COMMENT_CLASSES: &[&str] = &["MsoCommentReference", "msocomtxt", "msocomanchor"];

/// Numbering format of one `@list` level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordListDefinition {
    pub list_type: ListType,
    pub style_type: Option<String>,
    pub start_at: Option<u32>,
}

/// Parse the `@list lN:levelM` rules out of the clipboard document's styles.
pub fn parse_list_definitions(html: &str) -> HashMap<(SmolStr, u32), WordListDefinition> {
    LIST_DEFINITION_RE
        .captures_iter(html)
        .filter_map(|captures| {
            let list = SmolStr::new(captures[1].to_ascii_lowercase());
            let level = captures[2].parse().ok()?;
            Some(((list, level), parse_definition(&captures[3])))
        })
        .collect()
}

fn parse_definition(body: &str) -> WordListDefinition {
    let mut number_format = None;
    let mut start_at = None;
    for declaration in body.split(';') {
        let Some((name, value)) = declaration.split_once(':') else {
            continue;
        };
        let value = value.trim().trim_matches('"');
        match name.trim().to_ascii_lowercase().as_str() {
            "mso-level-number-format" => number_format = Some(value.to_ascii_lowercase()),
            "mso-level-start-at" => start_at = value.parse().ok(),
            _ => {}
        }
    }
    let (list_type, style_type) = match number_format.as_deref() {
        Some("bullet" | "image") => (ListType::Unordered, None),
        Some(format) => (ListType::Ordered, style_type_for(format).map(str::to_string)),
        None => (ListType::Ordered, None),
    };
    WordListDefinition {
        list_type,
        style_type,
        start_at,
    }
}

fn style_type_for(number_format: &str) -> Option<&'static str> {
    Some(match number_format {
        "alpha-lower" => "lower-alpha",
        "alpha-upper" => "upper-alpha",
        "roman-lower" => "lower-roman",
        "roman-upper" => "upper-roman",
        "arabic-leading-zero" => "decimal-leading-zero",
        _ => return None,
    })
}

/// Numbering progress of every list thread seen so far in one paste.
#[derive(Debug, Default)]
struct WordListState {
    definitions: HashMap<(SmolStr, u32), WordListDefinition>,
    /// Items emitted per (thread, level).
    counters: HashMap<(SmolStr, u32), u32>,
    last_thread: Option<SmolStr>,
}

struct MsoList {
    list: SmolStr,
    level: u32,
    thread: SmolStr,
}

fn mso_list(tree: &DomTree, node: NodeId) -> Option<MsoList> {
    let value = tree.style_property(node, "mso-list")?;
    let captures = MSO_LIST_RE.captures(&value)?;
    Some(MsoList {
        list: SmolStr::new(captures[1].to_ascii_lowercase()),
        level: captures[2].parse().ok().filter(|level| *level > 0)?,
        thread: SmolStr::new(captures[3].to_ascii_lowercase()),
    })
}

fn is_list_ignore(tree: &DomTree, node: NodeId) -> bool {
    tree.style_property(node, "mso-list")
        .is_some_and(|value| value.trim().eq_ignore_ascii_case("ignore"))
}

fn is_word_comment(tree: &DomTree, node: NodeId) -> bool {
    COMMENT_CLASSES.iter().any(|class| tree.has_class(node, class))
        || tree
            .style_property(node, "mso-element")
            .is_some_and(|value| value.trim().starts_with("comment"))
}

pub fn process(event: &mut BeforePasteEvent) {
    allow_classes(
        &mut event.sanitizing_option.allowed_custom_classes,
        COMMENT_CLASSES,
    );

    let state = Rc::new(RefCell::new(WordListState {
        definitions: parse_list_definitions(&event.html_before),
        ..Default::default()
    }));
    let option = &mut event.dom_to_model_option;
    let fallback = fallback_element_processor(option);
    option.override_processor(
        "element",
        Rc::new(
            move |group: &mut Vec<Block>, node: NodeId, context: &mut DomToModelContext<'_>| {
                let tree = context.tree;
                if is_list_ignore(tree, node) || is_word_comment(tree, node) {
                    tracing::trace!(%node, "skipping word-only element");
                    return;
                }
                match mso_list(tree, node) {
                    Some(list) => process_list_paragraph(&state, list, group, node, context),
                    None => process_with_fallback(fallback.as_ref(), group, node, context),
                }
            },
        ),
    );

    let parsers = &mut option.additional_format_parsers;
    parsers.list_level.push(Rc::new(
        |format: &mut ListLevelFormat, _: &DomTree, _: NodeId| {
            for side in Side::ALL {
                *format.margin_mut(side) = None;
                *format.padding_mut(side) = None;
            }
        },
    ));
    parsers.container.push(Rc::new(
        |format: &mut ContainerFormat, _: &DomTree, _: NodeId| {
            let negative = format
                .margin(Side::Left)
                .and_then(parse_length_px)
                .is_some_and(|px| px < 0.0);
            if negative {
                *format.margin_mut(Side::Left) = Some("0px".into());
            }
        },
    ));
    parsers
        .table
        .push(Rc::new(|format: &mut TableFormat, _: &DomTree, _: NodeId| {
            format.margin_left = None;
        }));
}

fn process_list_paragraph(
    state: &RefCell<WordListState>,
    list: MsoList,
    group: &mut Vec<Block>,
    node: NodeId,
    context: &mut DomToModelContext<'_>,
) {
    let levels = {
        let mut state = state.borrow_mut();
        let continuing =
            follows_list_item(group) && state.last_thread.as_ref() == Some(&list.thread);
        let start_override = next_start_override(&mut state, &list, continuing);
        state.last_thread = Some(list.thread.clone());
        (1..=list.level)
            .map(|level| {
                let definition = state
                    .definitions
                    .get(&(list.list.clone(), level))
                    .cloned()
                    .unwrap_or_else(|| guess_definition(context.tree, node));
                let mut list_level = ListLevel::new(definition.list_type);
                list_level.format.list_style_type = definition.style_type;
                if level == list.level && list_level.list_type == ListType::Ordered {
                    list_level.format.start_number_override = start_override;
                }
                list_level
            })
            .collect::<Vec<_>>()
    };
    tracing::trace!(%node, thread = %list.thread, level = list.level, "word list paragraph");

    let saved = std::mem::replace(&mut context.list_format.levels, levels);
    context.run_default("li", group, node);
    context.list_format.levels = saved;

    // the paragraph's hanging indent belongs to Word's fake bullet
    if let Some(Block::BlockGroup(BlockGroup::ListItem(item))) = group.last_mut() {
        for side in Side::ALL {
            *item.format.margin_mut(side) = None;
        }
        item.format.text_indent = None;
    }
}

/// Ordered threads number from their `mso-level-start-at`. A thread picked up
/// again after other content continues from its last number.
fn next_start_override(state: &mut WordListState, list: &MsoList, continuing: bool) -> Option<u32> {
    let key = (list.thread.clone(), list.level);
    let seen = state.counters.get(&key).copied();
    state.counters.insert(key, seen.unwrap_or(0) + 1);
    // a parent item restarts its nested levels
    state
        .counters
        .retain(|(thread, level), _| thread != &list.thread || *level <= list.level);

    match seen {
        None => {
            let start_at = state
                .definitions
                .get(&(list.list.clone(), list.level))
                .and_then(|definition| definition.start_at);
            Some(start_at.unwrap_or(1))
        }
        Some(count) if !continuing => Some(count + 1),
        Some(_) => None,
    }
}

fn follows_list_item(group: &[Block]) -> bool {
    group
        .iter()
        .rev()
        .find(|block| !matches!(block, Block::Paragraph(p) if p.segments.is_empty()))
        .is_some_and(|block| matches!(block, Block::BlockGroup(BlockGroup::ListItem(_))))
}

/// Without an `@list` rule, read the list type off the bullet text.
fn guess_definition(tree: &DomTree, node: NodeId) -> WordListDefinition {
    let bullet = tree
        .find_descendant(node, is_list_ignore)
        .map(|span| tree.text_content(span))
        .unwrap_or_default();
    let bullet: String = bullet
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{a0}')
        .collect();
    let list_type = if NUMBERED_BULLET_RE.is_match(&bullet) {
        ListType::Ordered
    } else {
        ListType::Unordered
    };
    WordListDefinition {
        list_type,
        style_type: None,
        start_at: None,
    }
}
