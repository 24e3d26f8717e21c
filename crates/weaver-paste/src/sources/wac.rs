//! Word and PowerPoint for the web.
//!
//! The web apps put every list item in its own `ul`/`ol` and record nesting
//! in `data-aria-level`, so lists are rebuilt from that attribute. Editing
//! handles and comment highlights the apps leave in copied HTML are dropped.

use std::cell::RefCell;
use std::rc::Rc;

use weaver_content_model::{
    Block, BlockFormat, BoxFormat, DomToModelContext, ListLevel, ListType, SegmentFormat, Side,
};
use weaver_dom::{DomTree, NodeId};
use weaver_editor_core::BeforePasteEvent;

use super::{allow_classes, fallback_element_processor, process_with_fallback};

const TEMP_ELEMENT_CLASSES: &[&str] = &[
    "TableInsertRowGapBlank",
    "TableColumnResizeHandle",
    "TableCellTopBorderHandle",
    "TableCellLeftBorderHandle",
    "TableHoverColumnHandle",
    "TableHoverRowHandle",
    "ListMarkerWrappingSpan",
];

const COMMENT_HIGHLIGHT_CLASSES: &[&str] = &["CommentHighlightRest", "CommentHighlightClicked"];

/// Classes the sanitizer has to keep for the processors below to see them.
const WAC_CLASSES: &[&str] = &[
    "OutlineElement",
    "ListContainerWrapper",
    "BulletListStyle*",
    "NumberListStyle*",
    "WACImageContainer",
    "WACImageBorder",
];

/// Open list levels and the number the next item at each level would get.
#[derive(Debug, Default)]
struct WacListState {
    levels: Vec<ListLevel>,
    next_numbers: Vec<u32>,
}

impl WacListState {
    /// Move to `depth` (1-based) with `level` as the innermost list and
    /// return the start override the item needs.
    fn enter(&mut self, depth: usize, mut level: ListLevel, start: Option<u32>) -> Option<u32> {
        if depth > self.levels.len() {
            while self.levels.len() < depth {
                self.levels.push(level.clone());
                self.next_numbers.push(1);
            }
        } else {
            self.levels.truncate(depth);
            self.next_numbers.truncate(depth);
            let index = depth - 1;
            if self.levels[index].list_type != level.list_type {
                self.next_numbers[index] = 1;
            }
        }

        let index = depth - 1;
        let expected = self.next_numbers[index];
        let start_override = match (level.list_type, start) {
            (ListType::Ordered, Some(start)) if start != expected => Some(start),
            _ => None,
        };
        self.next_numbers[index] = start_override.unwrap_or(expected) + 1;
        level.format.start_number_override = start_override;
        self.levels[index] = level;
        start_override
    }
}

pub fn process(event: &mut BeforePasteEvent) {
    let sanitizing = &mut event.sanitizing_option;
    allow_classes(&mut sanitizing.allowed_custom_classes, TEMP_ELEMENT_CLASSES);
    allow_classes(&mut sanitizing.allowed_custom_classes, COMMENT_HIGHLIGHT_CLASSES);
    allow_classes(&mut sanitizing.allowed_custom_classes, WAC_CLASSES);

    let option = &mut event.dom_to_model_option;
    let fallback = fallback_element_processor(option);
    option.override_processor(
        "element",
        Rc::new(
            move |group: &mut Vec<Block>, node: NodeId, context: &mut DomToModelContext<'_>| {
                if is_temp_element(context.tree, node) {
                    tracing::trace!(%node, "skipping web app editing handle");
                    return;
                }
                process_with_fallback(fallback.as_ref(), group, node, context);
            },
        ),
    );

    let state = Rc::new(RefCell::new(WacListState::default()));
    option.override_processor(
        "li",
        Rc::new(
            move |group: &mut Vec<Block>, node: NodeId, context: &mut DomToModelContext<'_>| {
                process_list_item(&state, group, node, context);
            },
        ),
    );

    let parsers = &mut option.additional_format_parsers;
    parsers.segment.push(Rc::new(
        |format: &mut SegmentFormat, tree: &DomTree, node: NodeId| {
            let Some(align) = tree.style_property(node, "vertical-align") else {
                return;
            };
            let kind = match align.trim() {
                "super" => "super",
                "sub" => "sub",
                _ => return,
            };
            let sequence = match format.super_or_sub_script_sequence.take() {
                Some(existing) if !existing.is_empty() => format!("{existing} {kind}"),
                _ => kind.to_string(),
            };
            format.super_or_sub_script_sequence = Some(sequence);
        },
    ));
    parsers.segment.push(Rc::new(
        |format: &mut SegmentFormat, tree: &DomTree, node: NodeId| {
            if COMMENT_HIGHLIGHT_CLASSES
                .iter()
                .any(|class| tree.has_class(node, class))
            {
                format.background_color = None;
            }
        },
    ));
    parsers
        .block
        .push(Rc::new(|format: &mut BlockFormat, tree: &DomTree, node: NodeId| {
            if tree.has_tag(node, "li") {
                for side in Side::ALL {
                    *format.margin_mut(side) = None;
                }
            }
        }));
}

fn is_temp_element(tree: &DomTree, node: NodeId) -> bool {
    TEMP_ELEMENT_CLASSES
        .iter()
        .any(|class| tree.has_class(node, class))
}

fn process_list_item(
    state: &RefCell<WacListState>,
    group: &mut Vec<Block>,
    node: NodeId,
    context: &mut DomToModelContext<'_>,
) {
    let tree = context.tree;
    let depth = tree
        .attribute(node, "data-aria-level")
        .and_then(|level| level.trim().parse::<usize>().ok())
        .filter(|depth| *depth > 0);
    let (Some(depth), Some(current)) = (depth, context.list_format.levels.last()) else {
        context.run_default("li", group, node);
        return;
    };

    let mut level = current.clone();
    level.format.start_number_override = None;
    let start = tree
        .parent(node)
        .filter(|&list| tree.has_tag(list, "ol"))
        .and_then(|list| tree.attribute(list, "start"))
        .and_then(|start| start.trim().parse().ok());

    let levels = {
        let mut state = state.borrow_mut();
        let start_override = state.enter(depth, level, start);
        tracing::trace!(%node, depth, ?start_override, "web app list item");
        state.levels.clone()
    };

    let saved = std::mem::replace(&mut context.list_format.levels, levels);
    context.run_default("li", group, node);
    context.list_format.levels = saved;
    if let Some(last) = context.list_format.levels.last_mut() {
        last.format.start_number_override = None;
    }
}
