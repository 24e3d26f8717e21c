//! Normalizers for content copied from specific applications.
//!
//! Each normalizer adjusts a [`BeforePasteEvent`](weaver_editor_core::BeforePasteEvent)
//! in place: it registers format parsers and element processors, rewrites
//! the fragment, or widens the sanitizer allowlists.

pub mod excel;
pub mod google_sheets;
pub mod power_point;
pub mod wac;
pub mod word_desktop;

use weaver_content_model::{Block, DomToModelContext, DomToModelOption, ElementProcessor};
use weaver_dom::NodeId;

/// The processor currently registered for every element, so a new
/// `element` override can hand elements it does not handle back to it.
pub(crate) fn fallback_element_processor(option: &DomToModelOption) -> Option<ElementProcessor> {
    option.processor_override.get("element").cloned()
}

pub(crate) fn process_with_fallback(
    fallback: Option<&ElementProcessor>,
    group: &mut Vec<Block>,
    node: NodeId,
    context: &mut DomToModelContext<'_>,
) {
    match fallback {
        Some(processor) => processor(group, node, context),
        None => context.process_element_default(group, node),
    }
}

pub(crate) fn allow_classes(classes: &mut Vec<String>, extra: &[&str]) {
    for class in extra {
        if !classes.iter().any(|c| c == class) {
            classes.push(class.to_string());
        }
    }
}
