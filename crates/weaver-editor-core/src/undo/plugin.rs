use crate::editor::Editor;
use crate::events::{ChangeSource, ContentChangedEvent, PluginEvent};
use crate::keys::{Key, KeyboardEvent};
use crate::plugin::EditorPlugin;
use crate::undo::UndoManager;

/// Takes undo snapshots at edit boundaries.
///
/// Typing a run of characters is one undo step. A snapshot is taken before
/// deleting (when the selection is expanded, the deletion key changes, or a
/// word deletion is requested), on space after a word, on Enter, at
/// composition end, and when the caret moves away from new content.
#[derive(Debug, Default)]
pub struct UndoPlugin {
    last_key_press: Option<Key>,
}

impl UndoPlugin {
    pub fn new() -> Self {
        Self::default()
    }

    fn add_undo_snapshot(&self, editor: &mut Editor) {
        if let Err(error) = editor.take_snapshot() {
            tracing::warn!(%error, "failed to take undo snapshot");
        }
    }

    fn clear_redo_for_input(&mut self, editor: &mut Editor) {
        let snapshots = editor.snapshots_mut();
        snapshots.clear_redo();
        snapshots.set_has_new_content(true);
        self.last_key_press = None;
    }

    fn selection_is_expanded(editor: &Editor) -> bool {
        editor.selection().is_some_and(|s| !s.is_collapsed())
    }

    fn on_key_down(&mut self, editor: &mut Editor, event: &mut KeyboardEvent) {
        let is_backspace = event.key == Key::Backspace && !event.modifiers.alt;
        if is_backspace || event.key == Key::Delete {
            if is_backspace {
                let current = editor.selection_path();
                if editor.snapshots().can_undo_auto_complete(current.as_ref()) {
                    event.prevent_default();
                    if let Err(error) = editor.undo() {
                        tracing::warn!(%error, "failed to undo auto-complete");
                    }
                    self.last_key_press = Some(event.key.clone());
                    return;
                }
            }

            if !event.default_prevented
                && (Self::selection_is_expanded(editor)
                    || self.last_key_press.as_ref() != Some(&event.key)
                    || event.modifiers.ctrl_or_meta())
            {
                self.add_undo_snapshot(editor);
            }
            // Deleted content is always new content.
            editor.snapshots_mut().set_has_new_content(true);
            self.last_key_press = Some(event.key.clone());
        } else if event.key.is_navigation() {
            if editor.snapshots().has_new_content() {
                self.add_undo_snapshot(editor);
            }
            self.last_key_press = None;
        } else if matches!(self.last_key_press, Some(Key::Backspace | Key::Delete))
            && editor.snapshots().has_new_content()
        {
            self.add_undo_snapshot(editor);
        }

        if event.key.produces_input() && !event.modifiers.ctrl_or_meta() && !event.default_prevented
        {
            self.on_key_press(editor, &event.key);
        }
    }

    fn on_key_press(&mut self, editor: &mut Editor, key: &Key) {
        let space_after_word =
            *key == Key::Space && self.last_key_press.as_ref() != Some(&Key::Space);
        if Self::selection_is_expanded(editor) || space_after_word || *key == Key::Enter {
            self.add_undo_snapshot(editor);
            if *key == Key::Enter {
                // Undo right after Enter goes back to before it.
                editor.snapshots_mut().set_has_new_content(true);
            }
        } else {
            self.clear_redo_for_input(editor);
        }
        self.last_key_press = Some(key.clone());
    }

    fn on_content_changed(&mut self, editor: &mut Editor, event: &ContentChangedEvent) {
        if editor.is_restoring() || matches!(event.source, ChangeSource::Undo | ChangeSource::Redo) {
            return;
        }
        if event.snapshot_taken {
            self.last_key_press = None;
        } else if event.skip_undo {
            self.clear_redo_for_input(editor);
        } else {
            self.add_undo_snapshot(editor);
            self.last_key_press = None;
        }
    }
}

impl EditorPlugin for UndoPlugin {
    fn name(&self) -> &'static str {
        "Undo"
    }

    fn on_plugin_event(&mut self, editor: &mut Editor, event: &mut PluginEvent) {
        match event {
            PluginEvent::EditorReady => {
                if editor.snapshots().is_empty() {
                    self.add_undo_snapshot(editor);
                }
            }
            PluginEvent::KeyDown(key_event) if !key_event.is_composing => {
                self.on_key_down(editor, key_event)
            }
            PluginEvent::CompositionEnd => {
                self.clear_redo_for_input(editor);
                self.add_undo_snapshot(editor);
            }
            PluginEvent::ContentChanged(changed) => self.on_content_changed(editor, changed),
            _ => {}
        }
    }
}
