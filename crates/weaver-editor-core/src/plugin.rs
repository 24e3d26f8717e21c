//! Plugin trait.

use crate::editor::Editor;
use crate::events::PluginEvent;

/// An editor extension driven by [`PluginEvent`]s.
///
/// Plugins receive every event in registration order and may mutate the
/// event in place (prevent a keydown, rewrite a before-paste fragment).
/// Events a plugin raises while handling another are queued and delivered
/// after the current dispatch finishes.
pub trait EditorPlugin {
    fn name(&self) -> &'static str;

    fn initialize(&mut self, _editor: &mut Editor) {}

    fn dispose(&mut self, _editor: &mut Editor) {}

    fn on_plugin_event(&mut self, editor: &mut Editor, event: &mut PluginEvent);
}
