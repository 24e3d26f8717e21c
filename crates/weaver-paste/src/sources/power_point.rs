//! PowerPoint desktop.

use weaver_dom::parse_html;
use weaver_editor_core::{BeforePasteEvent, TrustedHtmlHandler};

use crate::fragment::import_children;

/// PowerPoint copies slides as an image plus HTML without plain text, which
/// the fragment builder resolves to the image. The HTML is preferred.
pub fn process(event: &mut BeforePasteEvent, trusted: &dyn TrustedHtmlHandler) {
    let clipboard = &event.clipboard_data;
    let Some(html) = clipboard.raw_html.as_deref() else {
        return;
    };
    let has_image = clipboard.image.is_some() || clipboard.image_data_uri.is_some();
    if !clipboard.text.is_empty() || !has_image {
        return;
    }
    match parse_html(&trusted.trust(html)) {
        Ok(document) => {
            tracing::debug!("using powerpoint html instead of its image");
            import_children(&mut event.fragment, &document.tree, document.body);
        }
        Err(error) => tracing::warn!(%error, "keeping powerpoint image"),
    }
}
