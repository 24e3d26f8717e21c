//! Content model node types.
//!
//! The model is a plain owned tree: a document holds blocks, blocks hold
//! segments or nested block lists. Nothing here points into a DOM; entity
//! wrappers are referenced through [`WrapperHandle`], resolved by whichever
//! DOM the model is rendered into.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::format::{
    BlockFormat, ContainerFormat, LinkFormat, ListLevelFormat, SegmentFormat, TableCellFormat,
    TableFormat,
};

static NEXT_WRAPPER_HANDLE: AtomicU64 = AtomicU64::new(1);

/// Stable identity of an entity wrapper element across re-renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WrapperHandle(u64);

impl WrapperHandle {
    /// Mint a handle that has never been handed out before.
    pub fn next() -> Self {
        Self(NEXT_WRAPPER_HANDLE.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

// === Document ===

/// Root of the model. `format` is the document default segment format.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentModelDocument {
    pub blocks: Vec<Block>,
    #[serde(default)]
    pub format: SegmentFormat,
}

impl ContentModelDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_blocks(blocks: Vec<Block>) -> Self {
        Self {
            blocks,
            format: SegmentFormat::default(),
        }
    }
}

// === Blocks ===

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Block {
    Paragraph(Paragraph),
    Table(Table),
    Entity(Entity),
    Divider(Divider),
    BlockGroup(BlockGroup),
}

impl Block {
    pub fn as_paragraph(&self) -> Option<&Paragraph> {
        match self {
            Block::Paragraph(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_paragraph_mut(&mut self) -> Option<&mut Paragraph> {
        match self {
            Block::Paragraph(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&Table> {
        match self {
            Block::Table(t) => Some(t),
            _ => None,
        }
    }

    /// Nested block list for block groups, `None` otherwise.
    pub fn child_blocks_mut(&mut self) -> Option<&mut Vec<Block>> {
        match self {
            Block::BlockGroup(group) => Some(group.blocks_mut()),
            _ => None,
        }
    }

    /// Paragraph-level format of the block, for those that carry one.
    pub fn block_format_mut(&mut self) -> Option<&mut BlockFormat> {
        match self {
            Block::Paragraph(p) => Some(&mut p.format),
            Block::Divider(d) => Some(&mut d.format),
            Block::BlockGroup(BlockGroup::ListItem(item)) => Some(&mut item.format),
            Block::BlockGroup(BlockGroup::General(general)) => Some(&mut general.format),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paragraph {
    pub segments: Vec<Segment>,
    #[serde(default)]
    pub format: BlockFormat,
    /// Format applied to the paragraph as a whole (for example an empty
    /// line's font), independent of its segments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segment_format: Option<SegmentFormat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decorator: Option<ParagraphDecorator>,
    /// Created to hold stray inline content, not backed by a block element.
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_implicit: bool,
}

impl Paragraph {
    pub fn new(is_implicit: bool, format: BlockFormat) -> Self {
        Self {
            segments: Vec::new(),
            format,
            segment_format: None,
            decorator: None,
            is_implicit,
        }
    }

    pub fn with_segments(segments: Vec<Segment>) -> Self {
        Self {
            segments,
            ..Self::default()
        }
    }

    pub fn marker_index(&self) -> Option<usize> {
        self.segments
            .iter()
            .position(|s| matches!(s, Segment::SelectionMarker(_)))
    }

    /// True when there is nothing but selection markers and line breaks.
    pub fn is_visually_empty(&self) -> bool {
        self.segments
            .iter()
            .all(|s| matches!(s, Segment::SelectionMarker(_) | Segment::Br(_)))
    }

    /// Concatenated text of the text segments.
    pub fn text(&self) -> String {
        self.segments
            .iter()
            .filter_map(|s| match s {
                Segment::Text(t) => Some(t.text.as_str()),
                _ => None,
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParagraphDecorator {
    pub tag: SmolStr,
    #[serde(default)]
    pub format: SegmentFormat,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Divider {
    pub tag: SmolStr,
    #[serde(default)]
    pub format: BlockFormat,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_selected: bool,
}

// === Tables ===

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    pub rows: Vec<TableRow>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub widths: Vec<f32>,
    #[serde(default)]
    pub format: TableFormat,
}

impl Table {
    pub fn column_count(&self) -> usize {
        self.rows.iter().map(|r| r.cells.len()).max().unwrap_or(0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableRow {
    pub cells: Vec<TableCell>,
    #[serde(default)]
    pub format: BlockFormat,
    #[serde(default)]
    pub height: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableCell {
    pub blocks: Vec<Block>,
    #[serde(default)]
    pub format: TableCellFormat,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_header: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_selected: bool,
    /// Covered by the cell to the left (colspan).
    #[serde(default, skip_serializing_if = "is_false")]
    pub span_left: bool,
    /// Covered by the cell above (rowspan).
    #[serde(default, skip_serializing_if = "is_false")]
    pub span_above: bool,
}

impl TableCell {
    pub fn new(span_left: bool, span_above: bool, is_header: bool, format: TableCellFormat) -> Self {
        Self {
            blocks: Vec::new(),
            format,
            is_header,
            is_selected: false,
            span_left,
            span_above,
        }
    }

    /// Empty cell holding a single line break, the shape editors expect.
    pub fn with_br(is_header: bool, format: TableCellFormat) -> Self {
        let mut cell = Self::new(false, false, is_header, format);
        cell.blocks.push(Block::Paragraph(Paragraph::with_segments(vec![
            Segment::Br(Br::default()),
        ])));
        cell
    }
}

// === Block groups ===

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BlockGroup {
    FormatContainer(FormatContainer),
    ListItem(ListItem),
    General(GeneralBlock),
}

impl BlockGroup {
    pub fn blocks(&self) -> &[Block] {
        match self {
            BlockGroup::FormatContainer(c) => &c.blocks,
            BlockGroup::ListItem(l) => &l.blocks,
            BlockGroup::General(g) => &g.blocks,
        }
    }

    pub fn blocks_mut(&mut self) -> &mut Vec<Block> {
        match self {
            BlockGroup::FormatContainer(c) => &mut c.blocks,
            BlockGroup::ListItem(l) => &mut l.blocks,
            BlockGroup::General(g) => &mut g.blocks,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatContainer {
    pub tag: SmolStr,
    pub blocks: Vec<Block>,
    #[serde(default)]
    pub format: ContainerFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ListType {
    Ordered,
    Unordered,
}

impl ListType {
    pub fn tag(self) -> &'static str {
        match self {
            ListType::Ordered => "ol",
            ListType::Unordered => "ul",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListLevel {
    pub list_type: ListType,
    #[serde(default)]
    pub format: ListLevelFormat,
}

impl ListLevel {
    pub fn new(list_type: ListType) -> Self {
        Self {
            list_type,
            format: ListLevelFormat::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListItem {
    /// Outermost level first.
    pub levels: Vec<ListLevel>,
    pub blocks: Vec<Block>,
    /// Carries the list marker's font.
    pub format_holder: SelectionMarker,
    #[serde(default)]
    pub format: BlockFormat,
}

impl ListItem {
    pub fn new(levels: Vec<ListLevel>, format_holder: SegmentFormat) -> Self {
        Self {
            levels,
            blocks: Vec::new(),
            format_holder: SelectionMarker {
                format: format_holder,
                is_selected: false,
            },
            format: BlockFormat::default(),
        }
    }
}

/// An element the model does not interpret, kept by tag and attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneralElement {
    pub tag: SmolStr,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<(SmolStr, String)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneralBlock {
    pub element: GeneralElement,
    pub blocks: Vec<Block>,
    #[serde(default)]
    pub format: BlockFormat,
}

// === Entities ===

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityFormat {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<SmolStr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<SmolStr>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_readonly: bool,
    /// Wrapper looked like an entity but carried no entity type.
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_fake_entity: bool,
}

/// Opaque host-owned content, either a block or an inline segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub wrapper: WrapperHandle,
    /// Tag of the wrapper element (`span` inline, `div` for blocks).
    pub wrapper_tag: SmolStr,
    pub entity_format: EntityFormat,
    #[serde(default)]
    pub format: SegmentFormat,
    /// Inner HTML of the wrapper.
    #[serde(default)]
    pub html: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_selected: bool,
}

impl Entity {
    pub fn new(wrapper_tag: &str, entity_format: EntityFormat, html: impl Into<String>) -> Self {
        Self {
            wrapper: WrapperHandle::next(),
            wrapper_tag: SmolStr::new(wrapper_tag),
            entity_format,
            format: SegmentFormat::default(),
            html: html.into(),
            is_selected: false,
        }
    }
}

// === Segments ===

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Segment {
    Text(Text),
    SelectionMarker(SelectionMarker),
    Br(Br),
    Image(Image),
    Entity(Entity),
    General(GeneralSegment),
}

impl Segment {
    pub fn text(text: impl Into<String>, format: SegmentFormat) -> Self {
        Segment::Text(Text {
            text: text.into(),
            format,
            link: None,
            is_selected: false,
        })
    }

    pub fn marker(format: SegmentFormat) -> Self {
        Segment::SelectionMarker(SelectionMarker {
            format,
            is_selected: true,
        })
    }

    pub fn br(format: SegmentFormat) -> Self {
        Segment::Br(Br {
            format,
            is_selected: false,
        })
    }

    pub fn format(&self) -> &SegmentFormat {
        match self {
            Segment::Text(s) => &s.format,
            Segment::SelectionMarker(s) => &s.format,
            Segment::Br(s) => &s.format,
            Segment::Image(s) => &s.format,
            Segment::Entity(s) => &s.format,
            Segment::General(s) => &s.format,
        }
    }

    pub fn format_mut(&mut self) -> &mut SegmentFormat {
        match self {
            Segment::Text(s) => &mut s.format,
            Segment::SelectionMarker(s) => &mut s.format,
            Segment::Br(s) => &mut s.format,
            Segment::Image(s) => &mut s.format,
            Segment::Entity(s) => &mut s.format,
            Segment::General(s) => &mut s.format,
        }
    }

    pub fn is_selected(&self) -> bool {
        match self {
            Segment::Text(s) => s.is_selected,
            Segment::SelectionMarker(s) => s.is_selected,
            Segment::Br(s) => s.is_selected,
            Segment::Image(s) => s.is_selected,
            Segment::Entity(s) => s.is_selected,
            Segment::General(s) => s.is_selected,
        }
    }

    pub fn set_selected(&mut self, selected: bool) {
        match self {
            Segment::Text(s) => s.is_selected = selected,
            Segment::SelectionMarker(s) => s.is_selected = selected,
            Segment::Br(s) => s.is_selected = selected,
            Segment::Image(s) => s.is_selected = selected,
            Segment::Entity(s) => s.is_selected = selected,
            Segment::General(s) => s.is_selected = selected,
        }
    }

    pub fn link_mut(&mut self) -> Option<&mut Option<LinkFormat>> {
        match self {
            Segment::Text(s) => Some(&mut s.link),
            Segment::Image(s) => Some(&mut s.link),
            _ => None,
        }
    }

    /// Width of the segment in selection offsets: characters for text,
    /// zero for markers, one for everything else.
    pub fn offset_len(&self) -> usize {
        match self {
            Segment::Text(t) => t.text.chars().count(),
            Segment::SelectionMarker(_) => 0,
            _ => 1,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Text {
    pub text: String,
    #[serde(default)]
    pub format: SegmentFormat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<LinkFormat>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_selected: bool,
}

/// Caret position. Carries the format typing would use there.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionMarker {
    #[serde(default)]
    pub format: SegmentFormat,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_selected: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Br {
    #[serde(default)]
    pub format: SegmentFormat,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_selected: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub src: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
    #[serde(default)]
    pub format: SegmentFormat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<LinkFormat>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_selected: bool,
}

/// Inline foreign element (`svg`, `iframe`, ...) kept as raw markup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneralSegment {
    pub element: GeneralElement,
    /// Inner HTML of the element.
    #[serde(default)]
    pub html: String,
    #[serde(default)]
    pub format: SegmentFormat,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_selected: bool,
}

// === Paths ===

/// One step from a block list into a nested block list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PathStep {
    /// The block group at this index.
    Group(usize),
    /// A cell of the table at `block`.
    Cell { block: usize, row: usize, col: usize },
}

/// Resolve a path of steps into the nested block list it addresses.
pub fn blocks_at<'a>(blocks: &'a [Block], path: &[PathStep]) -> Option<&'a [Block]> {
    let Some((step, rest)) = path.split_first() else {
        return Some(blocks);
    };
    let child: &[Block] = match step {
        PathStep::Group(i) => match blocks.get(*i)? {
            Block::BlockGroup(group) => group.blocks(),
            _ => return None,
        },
        PathStep::Cell { block, row, col } => match blocks.get(*block)? {
            Block::Table(table) => &table.rows.get(*row)?.cells.get(*col)?.blocks,
            _ => return None,
        },
    };
    blocks_at(child, rest)
}

/// Mutable variant of [`blocks_at`].
pub fn blocks_at_mut<'a>(blocks: &'a mut Vec<Block>, path: &[PathStep]) -> Option<&'a mut Vec<Block>> {
    let Some((step, rest)) = path.split_first() else {
        return Some(blocks);
    };
    let child = match step {
        PathStep::Group(i) => match blocks.get_mut(*i)? {
            Block::BlockGroup(group) => group.blocks_mut(),
            _ => return None,
        },
        PathStep::Cell { block, row, col } => match blocks.get_mut(*block)? {
            Block::Table(table) => &mut table.rows.get_mut(*row)?.cells.get_mut(*col)?.blocks,
            _ => return None,
        },
    };
    blocks_at_mut(child, rest)
}

/// Every paragraph in document order as `(group path, index)`.
pub fn paragraph_locations(blocks: &[Block]) -> Vec<(Vec<PathStep>, usize)> {
    let mut result = Vec::new();
    collect_paragraphs(blocks, &mut Vec::new(), &mut result);
    result
}

fn collect_paragraphs(
    blocks: &[Block],
    path: &mut Vec<PathStep>,
    out: &mut Vec<(Vec<PathStep>, usize)>,
) {
    for (index, block) in blocks.iter().enumerate() {
        match block {
            Block::Paragraph(_) => out.push((path.clone(), index)),
            Block::BlockGroup(group) => {
                path.push(PathStep::Group(index));
                collect_paragraphs(group.blocks(), path, out);
                path.pop();
            }
            Block::Table(table) => {
                for (row_index, row) in table.rows.iter().enumerate() {
                    for (col_index, cell) in row.cells.iter().enumerate() {
                        path.push(PathStep::Cell {
                            block: index,
                            row: row_index,
                            col: col_index,
                        });
                        collect_paragraphs(&cell.blocks, path, out);
                        path.pop();
                    }
                }
            }
            Block::Entity(_) | Block::Divider(_) => {}
        }
    }
}

/// Visit every entity (block and inline) mutably, in document order.
pub fn for_each_entity_mut(blocks: &mut [Block], f: &mut dyn FnMut(&mut Entity)) {
    for block in blocks {
        match block {
            Block::Entity(entity) => f(entity),
            Block::Paragraph(paragraph) => {
                for segment in &mut paragraph.segments {
                    if let Segment::Entity(entity) = segment {
                        f(entity);
                    }
                }
            }
            Block::BlockGroup(group) => for_each_entity_mut(group.blocks_mut(), f),
            Block::Table(table) => {
                for row in &mut table.rows {
                    for cell in &mut row.cells {
                        for_each_entity_mut(&mut cell.blocks, f);
                    }
                }
            }
            Block::Divider(_) => {}
        }
    }
}

/// All entities in document order.
pub fn collect_entities(blocks: &[Block]) -> Vec<&Entity> {
    let mut out = Vec::new();
    collect_entities_into(blocks, &mut out);
    out
}

fn collect_entities_into<'a>(blocks: &'a [Block], out: &mut Vec<&'a Entity>) {
    for block in blocks {
        match block {
            Block::Entity(entity) => out.push(entity),
            Block::Paragraph(paragraph) => {
                out.extend(paragraph.segments.iter().filter_map(|s| match s {
                    Segment::Entity(entity) => Some(entity),
                    _ => None,
                }))
            }
            Block::BlockGroup(group) => collect_entities_into(group.blocks(), out),
            Block::Table(table) => {
                for cell in table.rows.iter().flat_map(|r| r.cells.iter()) {
                    collect_entities_into(&cell.blocks, out);
                }
            }
            Block::Divider(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_doc() -> ContentModelDocument {
        let mut cell = TableCell::default();
        cell.blocks.push(Block::Paragraph(Paragraph::with_segments(vec![
            Segment::text("cell", SegmentFormat::default()),
        ])));
        let table = Table {
            rows: vec![TableRow {
                cells: vec![cell],
                ..Default::default()
            }],
            ..Default::default()
        };
        let mut item = ListItem::new(vec![ListLevel::new(ListType::Ordered)], SegmentFormat::default());
        item.blocks.push(Block::Paragraph(Paragraph::with_segments(vec![
            Segment::text("item", SegmentFormat::default()),
        ])));
        ContentModelDocument::with_blocks(vec![
            Block::Paragraph(Paragraph::with_segments(vec![Segment::text(
                "top",
                SegmentFormat::default(),
            )])),
            Block::Table(table),
            Block::BlockGroup(BlockGroup::ListItem(item)),
        ])
    }

    #[test]
    fn test_paragraph_locations_in_document_order() {
        let doc = make_doc();
        let locations = paragraph_locations(&doc.blocks);
        assert_eq!(
            locations,
            vec![
                (vec![], 0),
                (vec![PathStep::Cell { block: 1, row: 0, col: 0 }], 0),
                (vec![PathStep::Group(2)], 0),
            ]
        );
    }

    #[test]
    fn test_blocks_at_resolves_paths() {
        let mut doc = make_doc();
        let cell = blocks_at(&doc.blocks, &[PathStep::Cell { block: 1, row: 0, col: 0 }]).unwrap();
        assert_eq!(cell[0].as_paragraph().unwrap().text(), "cell");

        let item = blocks_at_mut(&mut doc.blocks, &[PathStep::Group(2)]).unwrap();
        item.push(Block::Paragraph(Paragraph::default()));
        assert_eq!(blocks_at(&doc.blocks, &[PathStep::Group(2)]).unwrap().len(), 2);

        assert!(blocks_at(&doc.blocks, &[PathStep::Group(0)]).is_none());
    }

    #[test]
    fn test_wrapper_handles_are_unique() {
        let a = WrapperHandle::next();
        let b = WrapperHandle::next();
        assert_ne!(a, b);
    }

    #[test]
    fn test_model_json_round_trip() {
        let doc = make_doc();
        let json = serde_json::to_string(&doc).unwrap();
        let back: ContentModelDocument = serde_json::from_str(&json).unwrap();
        pretty_assertions::assert_eq!(back, doc);
    }
}
