//! The paste pipeline.
//!
//! One paste is one transaction:
//!
//! 1. build a fragment from the clipboard (image, HTML body or text)
//! 2. wrap it in the caret's visible format
//! 3. let plugins normalize it through `BeforePaste` (skipped for plain text)
//! 4. sanitize, convert to a model and merge it at the caret
//!
//! Pasting the same [`ClipboardData`] again first restores the document as
//! it was before the previous paste of that payload.

use weaver_content_model::{
    ContentModelDocument, DomToModelOption, DomToModelSeed, FormatContentModelContext, MergeFormat,
    MergeModelOptions, SegmentFormat, dom_to_content_model, find_insert_point, merge_model,
};
use weaver_editor_core::{
    BeforePasteEvent, ChangeData, ChangeSource, ClipboardData, Editor, FormatContentModelOptions,
    PasteFragment, PasteType, PluginEvent,
};

use crate::error::PasteError;
use crate::fragment::{
    HtmlInfo, create_paste_fragment, retrieve_html_info, visible_format, wrap_with_format_span,
};
use crate::parsers::override_table_processor;
use crate::sanitizer::{default_sanitizing_option, sanitize};

/// Paste `clipboard_data` at the current selection.
///
/// Records the pre-paste document in `clipboard_data.snapshot_before_paste`
/// on first use.
pub fn paste(
    editor: &mut Editor,
    clipboard_data: &mut ClipboardData,
    paste_type: PasteType,
) -> Result<(), PasteError> {
    match &clipboard_data.snapshot_before_paste {
        Some(snapshot) => {
            tracing::debug!("restoring document before re-paste");
            editor.restore_snapshot(snapshot, ChangeSource::SetContent)?;
        }
        None => clipboard_data.snapshot_before_paste = Some(editor.create_snapshot()?),
    }
    editor.focus();

    let html_info = match clipboard_data.raw_html.as_deref() {
        Some(raw) if paste_type != PasteType::AsPlainText => {
            let trusted = editor.trusted_html_handler();
            Some(retrieve_html_info(raw, &*trusted)?)
        }
        _ => None,
    };
    if let Some(info) = &html_info {
        clipboard_data.html_first_level_child_tags = info.first_level_child_tags.clone();
    }

    let clipboard = clipboard_data.clone();
    let allowed_entity_classes = editor.options().allowed_entity_classes.clone();
    let options = FormatContentModelOptions::new("paste", ChangeSource::Paste)
        .with_data(ChangeData::Clipboard(Box::new(clipboard.clone())));

    editor.format_content_model(options, move |editor, model, context| {
        let current_format = current_format(model);
        let mut event =
            create_before_paste_event(clipboard, paste_type, html_info.as_ref(), &allowed_entity_classes);
        event.fragment = create_paste_fragment(
            &event.clipboard_data,
            paste_type,
            html_info.as_ref().map(|info| &info.document),
        );
        wrap_with_format_span(&mut event.fragment, &current_format);

        if paste_type != PasteType::AsPlainText {
            event = match editor.trigger_event(PluginEvent::BeforePaste(Box::new(event))) {
                PluginEvent::BeforePaste(event) => *event,
                other => {
                    tracing::warn!(kind = other.kind(), "before-paste handler replaced the event");
                    return false;
                }
            };
        }

        sanitize(&mut event);
        let pasted = dom_to_content_model(
            &event.fragment.tree,
            event.fragment.root,
            &event.dom_to_model_option,
            &DomToModelSeed::default(),
        );
        merge_paste_content(model, context, pasted, paste_type)
    })?;
    Ok(())
}

/// The caret's visible format, or the document default without a caret.
fn current_format(model: &ContentModelDocument) -> SegmentFormat {
    let caret = find_insert_point(&model.blocks)
        .map(|insert| insert.marker.format)
        .unwrap_or_default();
    visible_format(&model.format.merged(&caret))
}

fn create_before_paste_event(
    clipboard_data: ClipboardData,
    paste_type: PasteType,
    html_info: Option<&HtmlInfo>,
    allowed_entity_classes: &[String],
) -> BeforePasteEvent {
    let mut sanitizing_option = default_sanitizing_option();
    sanitizing_option
        .allowed_custom_classes
        .extend(allowed_entity_classes.iter().cloned());
    let mut dom_to_model_option = DomToModelOption::default();
    override_table_processor(&mut dom_to_model_option);

    BeforePasteEvent {
        clipboard_data,
        fragment: PasteFragment::new(),
        html_before: html_info.map(|i| i.html_before.clone()).unwrap_or_default(),
        html_after: html_info.map(|i| i.html_after.clone()).unwrap_or_default(),
        html_attributes: html_info
            .map(|i| i.document.html_attributes.clone())
            .unwrap_or_default(),
        sanitizing_option,
        dom_to_model_option,
        paste_type,
    }
}

/// Merge the pasted model at the caret and set the format the next typed
/// text gets.
fn merge_paste_content(
    model: &mut ContentModelDocument,
    context: &mut FormatContentModelContext,
    pasted: ContentModelDocument,
    paste_type: PasteType,
) -> bool {
    let options = MergeModelOptions {
        merge_format: match paste_type {
            PasteType::MergeFormat => MergeFormat::KeepSourceEmphasisFormat,
            _ => MergeFormat::None,
        },
        merge_table: true,
        custom_merge: None,
    };
    let Some(insert) = merge_model(model, pasted, Some(&mut *context), &options) else {
        tracing::debug!("no insertion point for paste");
        return false;
    };
    let pending = SegmentFormat::default()
        .merged(&model.format)
        .merged(&insert.marker.format);
    context.new_pending_format = Some(pending);
    true
}
