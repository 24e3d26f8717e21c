//! Editor plugin applying the source normalizers to every rich paste.

use weaver_editor_core::{
    BeforePasteEvent, Editor, EditorPlugin, PasteType, PluginEvent, TrustedHtmlHandler,
};

use crate::options::PasteOptions;
use crate::parsers::add_universal_parsers;
use crate::source::{PasteSource, get_paste_source};
use crate::sources::{excel, google_sheets, power_point, wac, word_desktop};

#[derive(Debug, Default)]
pub struct PastePlugin {
    options: PasteOptions,
}

impl PastePlugin {
    pub fn new(options: PasteOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &PasteOptions {
        &self.options
    }
}

impl EditorPlugin for PastePlugin {
    fn name(&self) -> &'static str {
        "Paste"
    }

    fn on_plugin_event(&mut self, editor: &mut Editor, event: &mut PluginEvent) {
        let PluginEvent::BeforePaste(event) = event else {
            return;
        };
        let trusted = editor.trusted_html_handler();
        normalize_paste(event, &*trusted, &self.options);
    }
}

/// Classify the paste and run the matching normalizer, then register the
/// parsers every paste gets.
pub fn normalize_paste(
    event: &mut BeforePasteEvent,
    trusted: &dyn TrustedHtmlHandler,
    options: &PasteOptions,
) -> PasteSource {
    let source = get_paste_source(event, event.paste_type == PasteType::AsPlainText);
    tracing::debug!(%source, paste_type = ?event.paste_type, "normalizing paste");

    match source {
        PasteSource::WordDesktop => word_desktop::process(event),
        PasteSource::WacComponents => wac::process(event),
        PasteSource::ExcelDesktop | PasteSource::ExcelOnline => {
            if matches!(event.paste_type, PasteType::Normal | PasteType::MergeFormat) {
                excel::process(event, trusted, options.allow_excel_no_border_table);
            }
        }
        PasteSource::PowerPointDesktop => power_point::process(event, trusted),
        PasteSource::GoogleSheets => google_sheets::process(event),
        PasteSource::Default => {}
    }
    add_universal_parsers(event);
    source
}
