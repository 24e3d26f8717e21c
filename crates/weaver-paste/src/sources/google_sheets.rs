//! Google Sheets marks its clipboard HTML with a custom root element the
//! sanitizer would otherwise unwrap.

use weaver_editor_core::BeforePasteEvent;

pub const GOOGLE_SHEETS_ROOT: &str = "google-sheets-html-origin";

pub fn process(event: &mut BeforePasteEvent) {
    let tags = &mut event.sanitizing_option.additional_allowed_tags;
    if !tags.iter().any(|tag| tag == GOOGLE_SHEETS_ROOT) {
        tags.push(GOOGLE_SHEETS_ROOT.into());
    }
}
