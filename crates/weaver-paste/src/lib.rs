//! weaver-paste: turning clipboard content into editor content.
//!
//! This crate provides:
//! - `paste` - the paste transaction: fragment, normalize, sanitize, merge
//! - `PastePlugin` - classifies rich pastes and applies source normalizers
//!   for Word, the Office web apps, Excel, PowerPoint and Google Sheets
//! - the allowlist sanitizer and fragment helpers the pipeline is built from

pub mod error;
pub mod fragment;
pub mod options;
pub mod parsers;
pub mod paste;
pub mod plugin;
pub mod sanitizer;
pub mod source;
pub mod sources;

pub use error::PasteError;
pub use options::PasteOptions;
pub use paste::paste;
pub use plugin::{PastePlugin, normalize_paste};
pub use sanitizer::{default_sanitizing_option, sanitize, sanitize_fragment};
pub use source::{PasteSource, get_paste_source};
