//! Format maps attached to model nodes.
//!
//! Every format is a plain value struct with all-optional fields. The `⊕`
//! overlay used throughout paste and merge is [`merge_from`](SegmentFormat::merge_from):
//! fields set on the right-hand side win, unset ones leave the left side alone.
//!
//! Block-like formats (block, container, table, table cell, list level) share
//! the same box fields and implement [`BoxFormat`] so border/margin/background
//! parsers can be written once.

use serde::{Deserialize, Serialize};

/// One edge of a box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Top,
    Right,
    Bottom,
    Left,
}

impl Side {
    pub const ALL: [Side; 4] = [Side::Top, Side::Right, Side::Bottom, Side::Left];

    pub fn css_name(self) -> &'static str {
        match self {
            Side::Top => "top",
            Side::Right => "right",
            Side::Bottom => "bottom",
            Side::Left => "left",
        }
    }
}

/// Shared access to the box fields of block-like formats.
pub trait BoxFormat {
    fn direction_mut(&mut self) -> &mut Option<String>;
    fn text_align_mut(&mut self) -> &mut Option<String>;
    fn background_color_mut(&mut self) -> &mut Option<String>;
    fn margin_mut(&mut self, side: Side) -> &mut Option<String>;
    fn padding_mut(&mut self, side: Side) -> &mut Option<String>;
    fn border_mut(&mut self, side: Side) -> &mut Option<String>;
    fn direction(&self) -> Option<&str>;
    fn text_align(&self) -> Option<&str>;
    fn background_color(&self) -> Option<&str>;
    fn border(&self, side: Side) -> Option<&str>;
    fn margin(&self, side: Side) -> Option<&str>;
    fn padding(&self, side: Side) -> Option<&str>;
}

macro_rules! format_struct {
    (@box $(#[$meta:meta])* $name:ident { $($rest:tt)* }) => {
        format_struct!($(#[$meta])* $name {
            direction: String,
            text_align: String,
            background_color: String,
            margin_top: String,
            margin_right: String,
            margin_bottom: String,
            margin_left: String,
            padding_top: String,
            padding_right: String,
            padding_bottom: String,
            padding_left: String,
            border_top: String,
            border_right: String,
            border_bottom: String,
            border_left: String,
            $($rest)*
        });

        impl BoxFormat for $name {
            fn direction_mut(&mut self) -> &mut Option<String> {
                &mut self.direction
            }
            fn text_align_mut(&mut self) -> &mut Option<String> {
                &mut self.text_align
            }
            fn background_color_mut(&mut self) -> &mut Option<String> {
                &mut self.background_color
            }
            fn margin_mut(&mut self, side: Side) -> &mut Option<String> {
                match side {
                    Side::Top => &mut self.margin_top,
                    Side::Right => &mut self.margin_right,
                    Side::Bottom => &mut self.margin_bottom,
                    Side::Left => &mut self.margin_left,
                }
            }
            fn padding_mut(&mut self, side: Side) -> &mut Option<String> {
                match side {
                    Side::Top => &mut self.padding_top,
                    Side::Right => &mut self.padding_right,
                    Side::Bottom => &mut self.padding_bottom,
                    Side::Left => &mut self.padding_left,
                }
            }
            fn border_mut(&mut self, side: Side) -> &mut Option<String> {
                match side {
                    Side::Top => &mut self.border_top,
                    Side::Right => &mut self.border_right,
                    Side::Bottom => &mut self.border_bottom,
                    Side::Left => &mut self.border_left,
                }
            }
            fn direction(&self) -> Option<&str> {
                self.direction.as_deref()
            }
            fn text_align(&self) -> Option<&str> {
                self.text_align.as_deref()
            }
            fn background_color(&self) -> Option<&str> {
                self.background_color.as_deref()
            }
            fn border(&self, side: Side) -> Option<&str> {
                match side {
                    Side::Top => self.border_top.as_deref(),
                    Side::Right => self.border_right.as_deref(),
                    Side::Bottom => self.border_bottom.as_deref(),
                    Side::Left => self.border_left.as_deref(),
                }
            }
            fn margin(&self, side: Side) -> Option<&str> {
                match side {
                    Side::Top => self.margin_top.as_deref(),
                    Side::Right => self.margin_right.as_deref(),
                    Side::Bottom => self.margin_bottom.as_deref(),
                    Side::Left => self.margin_left.as_deref(),
                }
            }
            fn padding(&self, side: Side) -> Option<&str> {
                match side {
                    Side::Top => self.padding_top.as_deref(),
                    Side::Right => self.padding_right.as_deref(),
                    Side::Bottom => self.padding_bottom.as_deref(),
                    Side::Left => self.padding_left.as_deref(),
                }
            }
        }
    };

    ($(#[$meta:meta])* $name:ident { $($field:ident : $ty:ty),* $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(default, rename_all = "camelCase")]
        pub struct $name {
            $(
                #[serde(skip_serializing_if = "Option::is_none")]
                pub $field: Option<$ty>,
            )*
        }

        impl $name {
            /// Right-biased overlay: every field set on `other` replaces ours.
            pub fn merge_from(&mut self, other: &Self) {
                $(
                    if other.$field.is_some() {
                        self.$field = other.$field.clone();
                    }
                )*
            }

            /// `self ⊕ other` as a new value.
            pub fn merged(&self, other: &Self) -> Self {
                let mut result = self.clone();
                result.merge_from(other);
                result
            }

            pub fn is_empty(&self) -> bool {
                true $(&& self.$field.is_none())*
            }
        }
    };
}

format_struct!(
    /// Character-level formatting of a segment.
    SegmentFormat {
        font_family: String,
        font_size: String,
        font_weight: String,
        italic: bool,
        underline: bool,
        strikethrough: bool,
        text_color: String,
        background_color: String,
        letter_spacing: String,
        super_or_sub_script_sequence: String,
    }
);

format_struct!(@box
    /// Paragraph-level formatting.
    BlockFormat {
        line_height: String,
        white_space: String,
        text_indent: String,
    }
);

format_struct!(@box
    /// Formatting of a format container (`blockquote`, wrapping `div`).
    ContainerFormat {}
);

format_struct!(@box
    TableFormat {
        border_collapse: bool,
        width: String,
        table_layout: String,
    }
);

format_struct!(@box
    TableCellFormat {
        vertical_align: String,
        width: String,
        height: String,
    }
);

format_struct!(@box
    /// Formatting of one list level (`ol` / `ul`).
    ListLevelFormat {
        start_number_override: u32,
        list_style_type: String,
    }
);

format_struct!(
    /// Numbering thread information carried by a list item.
    ListThreadFormat {
        start_number_override: u32,
    }
);

format_struct!(
    LinkFormat {
        href: String,
        target: String,
        title: String,
        rel: String,
    }
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_is_right_biased() {
        let mut left = SegmentFormat {
            font_family: Some("Arial".into()),
            font_size: Some("10pt".into()),
            ..Default::default()
        };
        let right = SegmentFormat {
            font_size: Some("12pt".into()),
            italic: Some(true),
            ..Default::default()
        };
        left.merge_from(&right);
        assert_eq!(left.font_family.as_deref(), Some("Arial"));
        assert_eq!(left.font_size.as_deref(), Some("12pt"));
        assert_eq!(left.italic, Some(true));
    }

    #[test]
    fn test_merge_with_empty_is_identity() {
        let format = BlockFormat {
            text_align: Some("center".into()),
            ..Default::default()
        };
        assert_eq!(format.merged(&BlockFormat::default()), format);
        assert!(BlockFormat::default().is_empty());
        assert!(!format.is_empty());
    }

    #[test]
    fn test_box_format_sides() {
        let mut cell = TableCellFormat::default();
        *cell.border_mut(Side::Left) = Some("1px solid red".into());
        assert_eq!(cell.border(Side::Left), Some("1px solid red"));
        assert_eq!(cell.border_left.as_deref(), Some("1px solid red"));
        assert_eq!(cell.border(Side::Top), None);
    }

    #[test]
    fn test_serialization_skips_unset_fields() {
        let format = SegmentFormat {
            font_weight: Some("bold".into()),
            ..Default::default()
        };
        let json = serde_json::to_string(&format).unwrap();
        assert_eq!(json, r#"{"fontWeight":"bold"}"#);
        let back: SegmentFormat = serde_json::from_str(&json).unwrap();
        assert_eq!(back, format);
    }
}
