//! The editor: a content model, the live DOM rendered from it, and the
//! transaction that keeps the two in step.
//!
//! The model is the source of truth. Every committed transaction re-renders
//! the DOM from it. Native edits the host applies to the DOM (typing, IME)
//! only mark the DOM dirty; the model is rebuilt from the DOM the next time
//! anything reads it.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::rc::Rc;

use weaver_content_model::model::{for_each_entity_mut, paragraph_locations, blocks_at_mut};
use weaver_content_model::{
    Block, ContentModelDocument, DomToModelOption, DomToModelSeed, EntityRemovalOperation,
    FormatContentModelContext, ModelToDomOption, Paragraph, Segment, SegmentFormat, SelectionPath,
    Text, WrapperHandle, clear_selection, content_model_to_dom, dom_to_content_model,
    find_insert_point, get_selection_path,
};
use weaver_dom::{DomSelection, DomTree, NodeId, inner_html, parse_fragment_into};

use crate::entity::{EntityPlugin, EntityPluginState};
use crate::error::EditorError;
use crate::events::{
    ChangeData, ChangeSource, ContentChangedEvent, EntityOperation, EntityOperationEvent,
    PluginEvent,
};
use crate::keys::{KeyboardEvent, KeydownResult};
use crate::options::EditorOptions;
use crate::plugin::EditorPlugin;
use crate::scheduler::Scheduler;
use crate::trusted::{PassThroughHtml, TrustedHtmlHandler};
use crate::undo::{SnapshotsManager, UndoPlugin, UndoState};

type PluginCell = Rc<RefCell<Box<dyn EditorPlugin>>>;

/// Format the next typed text at `selection` should get.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingFormat {
    pub format: SegmentFormat,
    pub selection: SelectionPath,
}

/// Describes one [`Editor::format_content_model`] call.
#[derive(Debug, Clone)]
pub struct FormatContentModelOptions {
    /// Name of the calling operation, for logs.
    pub api_name: &'static str,
    pub change_source: ChangeSource,
    pub change_data: Option<ChangeData>,
}

impl FormatContentModelOptions {
    pub fn new(api_name: &'static str, change_source: ChangeSource) -> Self {
        Self {
            api_name,
            change_source,
            change_data: None,
        }
    }

    pub fn with_data(mut self, data: ChangeData) -> Self {
        self.change_data = Some(data);
        self
    }
}

pub struct Editor {
    pub(crate) model: ContentModelDocument,
    pub(crate) dom: DomTree,
    pub(crate) root: NodeId,
    pub(crate) selection: Option<DomSelection>,
    /// Wrapper element of each entity in the current DOM.
    pub(crate) wrappers: HashMap<WrapperHandle, NodeId>,
    pub(crate) dom_dirty: bool,
    pub(crate) undo: UndoState,
    pub(crate) entities: EntityPluginState,
    pub(crate) scheduler: Scheduler,
    plugins: Vec<PluginCell>,
    /// Events for plugins that were busy when the event was raised.
    deferred: VecDeque<(usize, PluginEvent)>,
    in_transaction: bool,
    options: EditorOptions,
    pending_format: Option<PendingFormat>,
    trusted: Rc<dyn TrustedHtmlHandler>,
    focused: bool,
}

impl fmt::Debug for Editor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plugins: Vec<&'static str> = self
            .plugins
            .iter()
            .map(|p| p.try_borrow().map_or("<busy>", |p| p.name()))
            .collect();
        f.debug_struct("Editor")
            .field("root", &self.root)
            .field("selection", &self.selection)
            .field("dom_dirty", &self.dom_dirty)
            .field("plugins", &plugins)
            .field("in_transaction", &self.in_transaction)
            .field("snapshots", &self.undo.snapshots.len())
            .field("entities", &self.entities.len())
            .finish_non_exhaustive()
    }
}

fn empty_model(format: &SegmentFormat) -> ContentModelDocument {
    let mut paragraph = Paragraph::new(false, Default::default());
    paragraph.segments.push(Segment::marker(format.clone()));
    paragraph.segments.push(Segment::br(format.clone()));
    ContentModelDocument {
        blocks: vec![Block::Paragraph(paragraph)],
        format: format.clone(),
    }
}

/// Put a caret at the end of the last paragraph when the model has none.
fn ensure_caret(model: &mut ContentModelDocument) {
    if find_insert_point(&model.blocks).is_some() {
        return;
    }
    let Some((path, index)) = paragraph_locations(&model.blocks).pop() else {
        let format = model.format.clone();
        model.blocks.extend(empty_model(&format).blocks);
        return;
    };
    let Some(paragraph) = blocks_at_mut(&mut model.blocks, &path)
        .and_then(|blocks| blocks.get_mut(index))
        .and_then(Block::as_paragraph_mut)
    else {
        return;
    };
    let format = paragraph
        .segments
        .last()
        .map(|s| s.format().clone())
        .unwrap_or_default();
    let at = match paragraph.segments.last() {
        Some(Segment::Br(_)) => paragraph.segments.len() - 1,
        _ => paragraph.segments.len(),
    };
    paragraph.segments.insert(at, Segment::marker(format));
}

impl Editor {
    /// Create an editor with an empty document.
    ///
    /// The undo and entity plugins are always installed ahead of `plugins`.
    /// Plugins are initialized in order, then `EditorReady` is broadcast.
    pub fn new(options: EditorOptions, plugins: Vec<Box<dyn EditorPlugin>>) -> Self {
        let mut dom = DomTree::new();
        let root = dom.create_element("div");
        dom.set_attribute(root, "contenteditable", "true");

        let mut all: Vec<Box<dyn EditorPlugin>> =
            vec![Box::new(UndoPlugin::new()), Box::new(EntityPlugin::new())];
        all.extend(plugins);

        let mut editor = Self {
            model: empty_model(&options.default_segment_format),
            dom,
            root,
            selection: None,
            wrappers: HashMap::new(),
            dom_dirty: false,
            undo: UndoState {
                snapshots: SnapshotsManager::new(options.max_snapshot_size),
                is_restoring: false,
            },
            entities: EntityPluginState::default(),
            scheduler: Scheduler::default(),
            plugins: all
                .into_iter()
                .map(|p| Rc::new(RefCell::new(p)))
                .collect(),
            deferred: VecDeque::new(),
            in_transaction: false,
            options,
            pending_format: None,
            trusted: Rc::new(PassThroughHtml),
            focused: false,
        };

        if let Err(error) = editor.render() {
            tracing::error!(%error, "initial render failed");
        }
        for plugin in editor.plugins.clone() {
            if let Ok(mut plugin) = plugin.try_borrow_mut() {
                tracing::debug!(plugin = plugin.name(), "initializing plugin");
                plugin.initialize(&mut editor);
            }
        }
        editor.trigger_event(PluginEvent::EditorReady);
        editor
    }

    pub fn with_trusted_html_handler(mut self, handler: impl TrustedHtmlHandler + 'static) -> Self {
        self.trusted = Rc::new(handler);
        self
    }

    pub fn options(&self) -> &EditorOptions {
        &self.options
    }

    pub fn trusted_html_handler(&self) -> Rc<dyn TrustedHtmlHandler> {
        self.trusted.clone()
    }

    // === Content ===

    /// Replace the document with `html`, run through the trusted HTML handler.
    pub fn set_content(&mut self, html: &str) -> Result<(), EditorError> {
        let trusted = self.trusted.trust(html);
        let mut scratch = DomTree::new();
        let root = scratch.create_fragment();
        parse_fragment_into(&mut scratch, root, &trusted)?;

        let seed = DomToModelSeed {
            default_format: self.options.default_segment_format.clone(),
            ..Default::default()
        };
        let mut model = dom_to_content_model(&scratch, root, &DomToModelOption::default(), &seed);
        ensure_caret(&mut model);

        self.model = model;
        self.pending_format = None;
        self.render()?;
        self.trigger_event(PluginEvent::ContentChanged(ContentChangedEvent::new(
            ChangeSource::SetContent,
        )));
        Ok(())
    }

    /// The current model, rebuilt from the DOM first if the host edited it.
    pub fn get_content_model(&mut self) -> &ContentModelDocument {
        self.sync_model();
        &self.model
    }

    /// Serialize the document for saving: no delimiters, no selection, and
    /// entities swapped to their persistent content.
    pub fn export_html(&mut self) -> Result<String, EditorError> {
        self.sync_model();
        let mut model = self.model.clone();
        clear_selection(&mut model.blocks);

        let live: Vec<_> = self
            .entities
            .iter()
            .filter(|e| !e.is_deleted)
            .map(|e| e.info())
            .collect();
        let mut replacements = HashMap::new();
        for info in live {
            let wrapper = info.wrapper;
            let event = self.trigger_event(PluginEvent::EntityOperation(EntityOperationEvent::new(
                EntityOperation::ReplaceTemporaryContent,
                info,
            )));
            if let PluginEvent::EntityOperation(EntityOperationEvent { html: Some(html), .. }) = event {
                replacements.insert(wrapper, html);
            }
        }
        for_each_entity_mut(&mut model.blocks, &mut |entity| {
            if let Some(html) = replacements.get(&entity.wrapper) {
                entity.html = html.clone();
            }
        });

        let mut tree = DomTree::new();
        let root = tree.create_element("div");
        content_model_to_dom(&model, &mut tree, root, &ModelToDomOption { add_delimiters: false })?;
        Ok(inner_html(&tree, root))
    }

    /// Apply `f` to the model and re-render, outside any transaction: no
    /// snapshot, no events.
    pub fn mutate_model_direct(
        &mut self,
        f: impl FnOnce(&mut ContentModelDocument),
    ) -> Result<(), EditorError> {
        self.sync_model();
        f(&mut self.model);
        self.render()
    }

    // === DOM and selection ===

    pub fn dom(&self) -> &DomTree {
        &self.dom
    }

    /// Mutable access for native edits. The model is rebuilt from the DOM
    /// before its next use.
    pub fn dom_mut(&mut self) -> &mut DomTree {
        self.dom_dirty = true;
        &mut self.dom
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn selection(&self) -> Option<DomSelection> {
        self.selection
    }

    pub fn set_dom_selection(&mut self, selection: Option<DomSelection>) {
        if self.selection != selection {
            self.pending_format = None;
        }
        self.selection = selection;
        self.dom_dirty = true;
    }

    /// Selection as a model path.
    pub fn selection_path(&mut self) -> Option<SelectionPath> {
        self.sync_model();
        get_selection_path(&self.model.blocks)
    }

    pub fn wrapper_node(&self, wrapper: WrapperHandle) -> Option<NodeId> {
        self.wrappers.get(&wrapper).copied()
    }

    pub fn wrapper_handle(&self, node: NodeId) -> Option<WrapperHandle> {
        self.wrappers
            .iter()
            .find_map(|(handle, n)| (*n == node).then_some(*handle))
    }

    pub fn focus(&mut self) {
        self.focused = true;
    }

    pub fn has_focus(&self) -> bool {
        self.focused
    }

    pub fn pending_format(&self) -> Option<&PendingFormat> {
        self.pending_format.as_ref()
    }

    pub(crate) fn clear_pending_format(&mut self) {
        self.pending_format = None;
    }

    pub fn entities(&self) -> &EntityPluginState {
        &self.entities
    }

    // === Host input ===

    pub fn handle_key_down(&mut self, event: KeyboardEvent) -> KeydownResult {
        match self.trigger_event(PluginEvent::KeyDown(event)) {
            PluginEvent::KeyDown(event) if event.default_prevented => KeydownResult::Handled,
            _ => KeydownResult::NotHandled,
        }
    }

    /// The host applied a native edit to the DOM. `data` is the inserted
    /// text, if any; it takes the pending format.
    pub fn handle_input(&mut self, data: Option<&str>) {
        self.dom_dirty = true;
        if let Some(data) = data.filter(|_| self.pending_format.is_some()) {
            if let Err(error) = self.apply_pending_format(data) {
                tracing::warn!(%error, "failed to apply pending format");
            }
        }
        self.trigger_event(PluginEvent::Input);
    }

    pub fn handle_composition_end(&mut self) {
        self.dom_dirty = true;
        self.trigger_event(PluginEvent::CompositionEnd);
    }

    pub fn handle_click(&mut self, target: NodeId) {
        self.trigger_event(PluginEvent::MouseUp { target });
    }

    /// Broadcast `BeforeDispose` and tear plugins down.
    pub fn dispose(&mut self) {
        self.trigger_event(PluginEvent::BeforeDispose);
        for plugin in std::mem::take(&mut self.plugins) {
            if let Ok(mut plugin) = plugin.try_borrow_mut() {
                plugin.dispose(self);
            }
        }
        self.deferred.clear();
    }

    fn apply_pending_format(&mut self, data: &str) -> Result<(), EditorError> {
        let Some(pending) = self.pending_format.take() else {
            return Ok(());
        };
        let typed = data.chars().count();
        if typed == 0 {
            return Ok(());
        }
        self.format_content_model(
            FormatContentModelOptions::new("applyPendingFormat", ChangeSource::Format),
            move |_, model, context| {
                let Some(insert) = find_insert_point(&model.blocks) else {
                    return false;
                };
                if insert.path != pending.selection.start.path
                    || insert.paragraph != pending.selection.start.paragraph
                {
                    return false;
                }
                let Some(paragraph) = insert.paragraph_mut(&mut model.blocks) else {
                    return false;
                };
                let Some(index) = paragraph.marker_index().and_then(|m| m.checked_sub(1)) else {
                    return false;
                };
                let Segment::Text(text) = &mut paragraph.segments[index] else {
                    return false;
                };
                let length = text.text.chars().count();
                if length < typed {
                    return false;
                }
                let format = text.format.merged(&pending.format);
                let byte = text
                    .text
                    .char_indices()
                    .nth(length - typed)
                    .map_or(text.text.len(), |(b, _)| b);
                if byte == 0 {
                    text.format = format.clone();
                } else {
                    let tail = Text {
                        text: text.text.split_off(byte),
                        format: format.clone(),
                        link: text.link.clone(),
                        is_selected: false,
                    };
                    paragraph.segments.insert(index + 1, Segment::Text(tail));
                }
                if let Some(marker) = paragraph
                    .segments
                    .iter_mut()
                    .find(|s| matches!(s, Segment::SelectionMarker(_)))
                {
                    *marker.format_mut() = format;
                }
                context.skip_undo_snapshot = true;
                true
            },
        )?;
        Ok(())
    }

    // === Model/DOM sync ===

    /// Rebuild the model from the DOM if the host changed it.
    pub(crate) fn sync_model(&mut self) {
        if !self.dom_dirty {
            return;
        }
        let root = self.root;
        self.wrappers.retain(|_, node| self.dom.contains(root, *node));
        let seed = DomToModelSeed {
            selection: self.selection,
            known_wrappers: self.wrappers.iter().map(|(h, n)| (*n, *h)).collect(),
            default_format: self.options.default_segment_format.clone(),
        };
        self.model = dom_to_content_model(&self.dom, root, &DomToModelOption::default(), &seed);
        self.dom_dirty = false;
        tracing::trace!(blocks = self.model.blocks.len(), "rebuilt model from dom");
    }

    /// Render the model into the live DOM, replacing what was there.
    pub(crate) fn render(&mut self) -> Result<(), EditorError> {
        let result =
            content_model_to_dom(&self.model, &mut self.dom, self.root, &ModelToDomOption::default())?;
        self.selection = result.selection;
        self.wrappers = result.entities.into_iter().collect();
        self.dom_dirty = false;
        Ok(())
    }

    // === Transactions ===

    /// Run `f` as one atomic edit of the model.
    ///
    /// `f` gets the editor (with an empty model while it runs), the model to
    /// edit and a context to report side effects in. Returning `false`
    /// discards every change. Returning `true` commits: an undo snapshot of
    /// the prior state is recorded, the model is rendered, deleted entities
    /// are reported, a snapshot of the new state is recorded and
    /// `ContentChanged` is broadcast.
    ///
    /// Calling this from inside `f` fails with
    /// [`EditorError::ReentrantTransaction`].
    pub fn format_content_model<F>(
        &mut self,
        options: FormatContentModelOptions,
        f: F,
    ) -> Result<bool, EditorError>
    where
        F: FnOnce(&mut Editor, &mut ContentModelDocument, &mut FormatContentModelContext) -> bool,
    {
        if self.in_transaction {
            tracing::warn!(api = options.api_name, "rejected nested format_content_model");
            return Err(EditorError::ReentrantTransaction);
        }

        self.sync_model();
        let before = self.model.clone();
        let mut model = std::mem::take(&mut self.model);
        let mut context = FormatContentModelContext::default();

        self.in_transaction = true;
        let changed = f(self, &mut model, &mut context);
        self.in_transaction = false;

        if !changed {
            tracing::debug!(api = options.api_name, "transaction made no change");
            self.model = before;
            return Ok(false);
        }

        let add_snapshots = !context.skip_undo_snapshot && !self.undo.is_restoring;
        if add_snapshots {
            let snapshot = crate::undo::Snapshot::capture(&before, context.can_undo_by_backspace, None)?;
            self.undo
                .snapshots
                .add_snapshot(snapshot, context.can_undo_by_backspace);
        }

        self.model = model;
        self.render()?;

        if let Some(format) = context.new_pending_format.take() {
            self.pending_format =
                get_selection_path(&self.model.blocks).map(|selection| PendingFormat {
                    format,
                    selection,
                });
        }

        for deleted in std::mem::take(&mut context.deleted_entities) {
            let Some(info) = self.entities.mark_deleted(deleted.entity.wrapper) else {
                continue;
            };
            let operation = match deleted.operation {
                EntityRemovalOperation::Overwrite => EntityOperation::Overwrite,
                EntityRemovalOperation::RemoveFromStart => EntityOperation::RemoveFromStart,
                EntityRemovalOperation::RemoveFromEnd => EntityOperation::RemoveFromEnd,
            };
            self.trigger_event(PluginEvent::EntityOperation(EntityOperationEvent::new(
                operation, info,
            )));
        }

        if add_snapshots {
            self.add_undo_snapshot(false, context.entity_states.take())?;
        }

        tracing::debug!(
            api = options.api_name,
            source = ?options.change_source,
            new_entities = context.new_entities.len(),
            "committed transaction"
        );
        self.trigger_event(PluginEvent::ContentChanged(ContentChangedEvent {
            source: options.change_source,
            data: options.change_data,
            skip_undo: context.skip_undo_snapshot,
            snapshot_taken: add_snapshots,
        }));
        Ok(true)
    }

    pub fn is_in_transaction(&self) -> bool {
        self.in_transaction
    }

    // === Events ===

    /// Broadcast `event` to every plugin in order and return it as the
    /// plugins left it.
    ///
    /// A plugin that is still handling an earlier event when this one is
    /// raised receives it right after that handler returns; changes it makes
    /// to its deferred copy are not reflected in the return value.
    pub fn trigger_event(&mut self, mut event: PluginEvent) -> PluginEvent {
        let plugins = self.plugins.clone();
        for (index, plugin) in plugins.iter().enumerate() {
            match plugin.try_borrow_mut() {
                Ok(mut plugin) => {
                    plugin.on_plugin_event(self, &mut event);
                    self.flush_deferred(index, &mut plugin);
                }
                Err(_) => {
                    tracing::trace!(index, kind = event.kind(), "deferring event for busy plugin");
                    self.deferred.push_back((index, event.clone()));
                }
            }
        }
        event
    }

    fn flush_deferred(&mut self, index: usize, plugin: &mut Box<dyn EditorPlugin>) {
        while let Some(position) = self.deferred.iter().position(|(i, _)| *i == index) {
            if let Some((_, mut event)) = self.deferred.remove(position) {
                plugin.on_plugin_event(self, &mut event);
            }
        }
    }

    /// Build an entity operation event for a tracked entity.
    pub fn entity_operation_event(
        &self,
        operation: EntityOperation,
        id: &str,
    ) -> Option<EntityOperationEvent> {
        let entry = self.entities.get(id)?;
        Some(EntityOperationEvent::new(operation, entry.info()))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use weaver_dom::inner_html;

    use super::*;
    use crate::undo::UndoManager;

    fn editor() -> Editor {
        Editor::new(EditorOptions::default(), Vec::new())
    }

    fn first_text(model: &ContentModelDocument) -> String {
        model.blocks[0].as_paragraph().map(|p| p.text()).unwrap_or_default()
    }

    #[test]
    fn test_new_editor_has_caret_line() {
        let editor = editor();
        assert_eq!(inner_html(editor.dom(), editor.root()), "<div><br></div>");
        assert!(editor.selection().is_some_and(|s| s.is_collapsed()));
    }

    #[test]
    fn test_set_content_renders_and_places_caret() {
        let mut editor = editor();
        editor.set_content("<p>hello</p>").unwrap();
        assert_eq!(first_text(editor.get_content_model()), "hello");
        assert!(find_insert_point(&editor.get_content_model().blocks).is_some());
    }

    #[test]
    fn test_declined_transaction_changes_nothing() {
        let mut editor = editor();
        editor.set_content("<div>keep</div>").unwrap();
        let history = editor.snapshots().len();
        let committed = editor
            .format_content_model(
                FormatContentModelOptions::new("test", ChangeSource::Format),
                |_, model, _| {
                    model.blocks.clear();
                    false
                },
            )
            .unwrap();
        assert!(!committed);
        assert_eq!(first_text(editor.get_content_model()), "keep");
        assert_eq!(editor.snapshots().len(), history);
    }

    #[test]
    fn test_nested_transaction_is_rejected() {
        let mut editor = editor();
        let mut nested = None;
        editor
            .format_content_model(
                FormatContentModelOptions::new("outer", ChangeSource::Format),
                |editor, _, _| {
                    nested = Some(editor.format_content_model(
                        FormatContentModelOptions::new("inner", ChangeSource::Format),
                        |_, _, _| true,
                    ));
                    false
                },
            )
            .unwrap();
        assert!(matches!(nested, Some(Err(EditorError::ReentrantTransaction))));
        assert!(!editor.is_in_transaction());
    }

    #[test]
    fn test_commit_records_undo_step() {
        let mut editor = editor();
        editor.set_content("<div>one</div>").unwrap();
        editor
            .format_content_model(
                FormatContentModelOptions::new("test", ChangeSource::Format),
                |_, model, _| {
                    model.blocks[0] = Block::Paragraph(Paragraph::with_segments(vec![
                        Segment::text("two", SegmentFormat::default()),
                        Segment::marker(SegmentFormat::default()),
                    ]));
                    true
                },
            )
            .unwrap();
        assert_eq!(first_text(editor.get_content_model()), "two");
        assert!(editor.undo().unwrap());
        assert_eq!(first_text(editor.get_content_model()), "one");
        assert!(editor.redo().unwrap());
        assert_eq!(first_text(editor.get_content_model()), "two");
    }

    #[test]
    fn test_native_edit_is_picked_up() {
        let mut editor = editor();
        editor.set_content("<div>a</div>").unwrap();
        let root = editor.root();
        let div = editor.dom().first_child(root).unwrap();
        let text = editor.dom().first_child(div).unwrap();
        editor.dom_mut().set_text(text, "ab");
        editor.handle_input(Some("b"));
        assert_eq!(first_text(editor.get_content_model()), "ab");
    }

    fn set_bold_pending(editor: &mut Editor) {
        editor
            .format_content_model(
                FormatContentModelOptions::new("test", ChangeSource::Format),
                |_, _, context| {
                    context.new_pending_format = Some(SegmentFormat {
                        font_weight: Some("bold".into()),
                        ..Default::default()
                    });
                    true
                },
            )
            .unwrap();
    }

    #[test]
    fn test_pending_format_applies_to_typed_text() {
        let mut editor = editor();
        editor.set_content("<div>a</div>").unwrap();
        set_bold_pending(&mut editor);
        assert!(editor.pending_format().is_some());

        let root = editor.root();
        let div = editor.dom().first_child(root).unwrap();
        let text = editor.dom().first_child(div).unwrap();
        editor.dom_mut().set_text(text, "ab");
        editor.handle_input(Some("b"));

        assert!(editor.pending_format().is_none());
        let model = editor.get_content_model();
        let paragraph = model.blocks[0].as_paragraph().unwrap();
        let weights: Vec<(String, Option<String>)> = paragraph
            .segments
            .iter()
            .filter_map(|s| match s {
                Segment::Text(t) => Some((t.text.clone(), t.format.font_weight.clone())),
                _ => None,
            })
            .collect();
        assert_eq!(
            weights,
            vec![
                ("a".to_string(), None),
                ("b".to_string(), Some("bold".to_string()))
            ]
        );
    }

    #[test]
    fn test_moving_caret_drops_pending_format() {
        let mut editor = editor();
        editor.set_content("<div>abc</div>").unwrap();
        set_bold_pending(&mut editor);
        let root = editor.root();
        let div = editor.dom().first_child(root).unwrap();
        let text = editor.dom().first_child(div).unwrap();
        editor.set_dom_selection(Some(DomSelection::collapsed(weaver_dom::DomPosition::new(text, 1))));
        assert!(editor.pending_format().is_none());
    }

    #[test]
    fn test_export_drops_delimiters_and_selection() {
        let mut editor = editor();
        editor
            .set_content(r#"a<span class="_Entity _EType_m _EReadonly_1">@x</span>"#)
            .unwrap();
        assert!(inner_html(editor.dom(), editor.root()).contains("entityDelimiterBefore"));
        let exported = editor.export_html().unwrap();
        assert!(!exported.contains("entityDelimiter"));
        assert!(exported.contains("_EId_m"));
    }
}
