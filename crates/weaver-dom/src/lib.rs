//! weaver-dom: a small DOM for clipboard and editor content.
//!
//! This crate provides:
//! - `DomTree` - arena DOM addressed by opaque `NodeId` handles
//! - `parse_html` / `parse_fragment_into` - lenient HTML parsing
//! - `outer_html` / `inner_html` - serialization
//! - inline style helpers and DOM selection positions

pub mod error;
mod markup;
pub mod node;
pub mod parse;
pub mod selection;
pub mod serialize;
pub mod style;

pub use error::DomError;
pub use node::{Attribute, Descendants, DomTree, ElementData, NodeData, NodeId, VOID_TAGS, is_void_tag};
pub use parse::{ParsedHtml, parse_fragment_into, parse_html};
pub use selection::{DomPosition, DomSelection};
pub use serialize::{inner_html, outer_html};
pub use smol_str::SmolStr;
pub use style::{expand_box_shorthand, parse_length_px, parse_style, serialize_style, split_top_level};
