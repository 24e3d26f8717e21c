//! DOM to content model conversion.
//!
//! Conversion walks the DOM below a root node. Every element is dispatched to
//! an element processor by key: `entity` for entity wrappers, `delimiter` for
//! entity delimiters, `blockEntityContainer` for block entity containers, and
//! the lowercase tag name otherwise. Callers can replace processors per key
//! through [`DomToModelOption::processor_override`]; an override registered
//! under `element` sees every element that has no key-specific override.
//!
//! Format parsers read formats off elements. Built-in parsers always run
//! first, then [`DomToModelOption::additional_format_parsers`] in order.

mod parsers;
mod processors;

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use smol_str::SmolStr;
use weaver_dom::{DomPosition, DomSelection, DomTree, NodeData, NodeId};

use crate::entity::{is_block_entity_container, is_delimiter, is_entity_wrapper};
use crate::format::{
    BlockFormat, ContainerFormat, LinkFormat, ListLevelFormat, ListThreadFormat, SegmentFormat,
    TableCellFormat, TableFormat,
};
use crate::model::{Block, ContentModelDocument, ListLevel, Paragraph, Segment, WrapperHandle};
use crate::normalize::normalize_blocks;

pub use parsers::is_block_tag;

/// Reads one kind of format off an element.
pub type FormatParser<F> = Rc<dyn Fn(&mut F, &DomTree, NodeId)>;

/// Converts one element, appending what it produces to the block list.
pub type ElementProcessor = Rc<dyn Fn(&mut Vec<Block>, NodeId, &mut DomToModelContext<'_>)>;

/// Extra parsers per format category, applied after the built-in ones.
#[derive(Clone, Default)]
pub struct FormatParsers {
    pub segment: Vec<FormatParser<SegmentFormat>>,
    pub block: Vec<FormatParser<BlockFormat>>,
    pub table: Vec<FormatParser<TableFormat>>,
    pub table_cell: Vec<FormatParser<TableCellFormat>>,
    pub list_level: Vec<FormatParser<ListLevelFormat>>,
    pub list_item_thread: Vec<FormatParser<ListThreadFormat>>,
    pub container: Vec<FormatParser<ContainerFormat>>,
    pub link: Vec<FormatParser<LinkFormat>>,
}

impl FormatParsers {
    pub fn is_empty(&self) -> bool {
        self.segment.is_empty()
            && self.block.is_empty()
            && self.table.is_empty()
            && self.table_cell.is_empty()
            && self.list_level.is_empty()
            && self.list_item_thread.is_empty()
            && self.container.is_empty()
            && self.link.is_empty()
    }
}

impl fmt::Debug for FormatParsers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormatParsers")
            .field("segment", &self.segment.len())
            .field("block", &self.block.len())
            .field("table", &self.table.len())
            .field("table_cell", &self.table_cell.len())
            .field("list_level", &self.list_level.len())
            .field("list_item_thread", &self.list_item_thread.len())
            .field("container", &self.container.len())
            .field("link", &self.link.len())
            .finish()
    }
}

#[derive(Clone, Default)]
pub struct DomToModelOption {
    pub additional_format_parsers: FormatParsers,
    pub processor_override: HashMap<SmolStr, ElementProcessor>,
}

impl fmt::Debug for DomToModelOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&str> = self.processor_override.keys().map(SmolStr::as_str).collect();
        keys.sort_unstable();
        f.debug_struct("DomToModelOption")
            .field("additional_format_parsers", &self.additional_format_parsers)
            .field("processor_override", &keys)
            .finish()
    }
}

impl DomToModelOption {
    pub fn override_processor(&mut self, key: &str, processor: ElementProcessor) {
        self.processor_override.insert(SmolStr::new(key), processor);
    }
}

/// Inputs that seed a conversion of a live DOM.
#[derive(Debug, Clone, Default)]
pub struct DomToModelSeed {
    pub selection: Option<DomSelection>,
    /// Wrapper handles already assigned to entity wrappers in this DOM.
    pub known_wrappers: HashMap<NodeId, WrapperHandle>,
    /// Becomes the document default format.
    pub default_format: SegmentFormat,
}

/// List levels currently open while walking nested `ul`/`ol`.
#[derive(Debug, Clone, Default)]
pub struct ListFormatContext {
    pub levels: Vec<ListLevel>,
}

/// Mutable state threaded through conversion.
pub struct DomToModelContext<'a> {
    pub tree: &'a DomTree,
    pub option: &'a DomToModelOption,
    /// Format inherited by segments created at this point.
    pub segment_format: SegmentFormat,
    /// Inheritable paragraph format (direction, alignment, line height, white space).
    pub block_format: BlockFormat,
    pub link: Option<LinkFormat>,
    pub list_format: ListFormatContext,
    pub is_in_selection: bool,
    pub selection: Option<DomSelection>,
    pub known_wrappers: HashMap<NodeId, WrapperHandle>,
    /// Inside an entity delimiter that picked up typed text.
    pub in_delimiter: bool,
}

impl<'a> DomToModelContext<'a> {
    pub fn new(tree: &'a DomTree, option: &'a DomToModelOption) -> Self {
        Self {
            tree,
            option,
            segment_format: SegmentFormat::default(),
            block_format: BlockFormat::default(),
            link: None,
            list_format: ListFormatContext::default(),
            is_in_selection: false,
            selection: None,
            known_wrappers: HashMap::new(),
            in_delimiter: false,
        }
    }

    pub fn with_seed(tree: &'a DomTree, option: &'a DomToModelOption, seed: &DomToModelSeed) -> Self {
        let mut context = Self::new(tree, option);
        context.selection = seed.selection;
        context.known_wrappers = seed.known_wrappers.clone();
        context
    }

    /// Processor key for an element.
    pub fn processor_key(&self, node: NodeId) -> SmolStr {
        if is_entity_wrapper(self.tree, node) {
            SmolStr::new_static("entity")
        } else if is_delimiter(self.tree, node) {
            SmolStr::new_static("delimiter")
        } else if is_block_entity_container(self.tree, node) {
            SmolStr::new_static("blockEntityContainer")
        } else {
            self.tree
                .tag_name(node)
                .map(SmolStr::new)
                .unwrap_or_else(|| SmolStr::new_static("element"))
        }
    }

    /// Convert the children of `parent` into `group`, honouring selection
    /// boundaries that fall between them.
    pub fn process_children(&mut self, group: &mut Vec<Block>, parent: NodeId) {
        let children: Vec<NodeId> = self.tree.children(parent).to_vec();
        for (index, &child) in children.iter().enumerate() {
            self.check_selection_at(group, DomPosition::new(parent, index));
            match self.tree.data(child) {
                NodeData::Element(_) => self.process_element(group, child),
                NodeData::Text(_) => processors::process_text(group, child, self),
                NodeData::Fragment => self.process_children(group, child),
                NodeData::Comment(_) | NodeData::Document => {}
            }
        }
        self.check_selection_at(group, DomPosition::new(parent, children.len()));
    }

    /// Dispatch an element to its override or default processor.
    pub fn process_element(&mut self, group: &mut Vec<Block>, node: NodeId) {
        let key = self.processor_key(node);
        let processor = self
            .option
            .processor_override
            .get(&key)
            .or_else(|| self.option.processor_override.get("element"))
            .cloned();
        match processor {
            Some(processor) => processor(group, node, self),
            None => self.run_default(&key, group, node),
        }
    }

    /// Run the built-in processor for `key`, bypassing overrides.
    pub fn run_default(&mut self, key: &str, group: &mut Vec<Block>, node: NodeId) {
        processors::default_processor(key)(group, node, self)
    }

    /// Built-in processor for the element's own key, bypassing overrides.
    pub fn process_element_default(&mut self, group: &mut Vec<Block>, node: NodeId) {
        let key = self.processor_key(node);
        self.run_default(&key, group, node);
    }

    /// Append a segment to the last paragraph of `group`, creating an
    /// implicit paragraph when the last block is not one.
    pub fn add_segment(&mut self, group: &mut Vec<Block>, mut segment: Segment) {
        if !matches!(segment, Segment::SelectionMarker(_)) {
            segment.set_selected(self.is_in_selection);
        }
        if !matches!(group.last(), Some(Block::Paragraph(_))) {
            let format = self.block_format.clone();
            group.push(Block::Paragraph(Paragraph::new(true, format)));
        }
        if let Some(Block::Paragraph(paragraph)) = group.last_mut() {
            paragraph.segments.push(segment);
        }
    }

    pub fn add_block(&mut self, group: &mut Vec<Block>, block: Block) {
        group.push(block);
    }

    /// True when the paragraph text would go into has no segments yet.
    pub fn is_paragraph_empty(&self, group: &[Block]) -> bool {
        match group.last() {
            Some(Block::Paragraph(paragraph)) => paragraph
                .segments
                .iter()
                .all(|s| matches!(s, Segment::SelectionMarker(_))),
            _ => true,
        }
    }

    fn check_selection_at(&mut self, group: &mut Vec<Block>, position: DomPosition) {
        let Some(selection) = self.selection else {
            return;
        };
        if selection.is_collapsed() {
            if selection.start == position {
                let marker = Segment::marker(self.segment_format.clone());
                self.add_segment(group, marker);
            }
            return;
        }
        if selection.start == position {
            self.is_in_selection = true;
        }
        if selection.end == position {
            self.is_in_selection = false;
        }
    }

    /// Treat any selection boundary inside `node` as sitting right here.
    pub fn collapse_selection_inside(&mut self, group: &mut Vec<Block>, node: NodeId) {
        let Some(selection) = self.selection else {
            return;
        };
        let inside = |position: DomPosition| self.tree.contains(node, position.node);
        if selection.is_collapsed() {
            if inside(selection.start) {
                let marker = Segment::marker(self.segment_format.clone());
                self.add_segment(group, marker);
            }
            return;
        }
        if inside(selection.start) {
            self.is_in_selection = true;
        }
        if inside(selection.end) {
            self.is_in_selection = false;
        }
    }

    // === Format parsing ===

    /// Segment format for content inside `node`: the current format with the
    /// element's own formatting layered on.
    pub fn parse_segment_format(&self, node: NodeId) -> SegmentFormat {
        let mut format = self.segment_format.clone();
        parsers::parse_segment(&mut format, self.tree, node);
        self.run_additional(&mut format, node, &self.option.additional_format_parsers.segment);
        format
    }

    /// Paragraph format for a block element, starting from the inherited one.
    pub fn parse_block_format(&self, node: NodeId) -> BlockFormat {
        let mut format = self.block_format.clone();
        parsers::parse_block(&mut format, self.tree, node);
        self.run_additional(&mut format, node, &self.option.additional_format_parsers.block);
        format
    }

    pub fn parse_table_format(&self, node: NodeId) -> TableFormat {
        let mut format = TableFormat::default();
        parsers::parse_table(&mut format, self.tree, node);
        self.run_additional(&mut format, node, &self.option.additional_format_parsers.table);
        format
    }

    pub fn parse_table_cell_format(&self, node: NodeId) -> TableCellFormat {
        let mut format = TableCellFormat::default();
        parsers::parse_table_cell(&mut format, self.tree, node);
        self.run_additional(&mut format, node, &self.option.additional_format_parsers.table_cell);
        format
    }

    pub fn parse_list_level_format(&self, node: NodeId) -> ListLevelFormat {
        let mut format = ListLevelFormat::default();
        parsers::parse_list_level(&mut format, self.tree, node);
        self.run_additional(&mut format, node, &self.option.additional_format_parsers.list_level);
        format
    }

    pub fn parse_list_thread_format(&self, node: NodeId) -> ListThreadFormat {
        let mut format = ListThreadFormat::default();
        parsers::parse_list_thread(&mut format, self.tree, node);
        self.run_additional(
            &mut format,
            node,
            &self.option.additional_format_parsers.list_item_thread,
        );
        format
    }

    pub fn parse_container_format(&self, node: NodeId) -> ContainerFormat {
        let mut format = ContainerFormat::default();
        parsers::parse_box(&mut format, self.tree, node);
        self.run_additional(&mut format, node, &self.option.additional_format_parsers.container);
        format
    }

    pub fn parse_link_format(&self, node: NodeId) -> LinkFormat {
        let mut format = LinkFormat::default();
        parsers::parse_link(&mut format, self.tree, node);
        self.run_additional(&mut format, node, &self.option.additional_format_parsers.link);
        format
    }

    fn run_additional<F>(&self, format: &mut F, node: NodeId, parsers: &[FormatParser<F>]) {
        for parser in parsers {
            parser(format, self.tree, node);
        }
    }

    /// The subset of a block format that nested paragraphs inherit.
    pub fn inheritable(format: &BlockFormat) -> BlockFormat {
        BlockFormat {
            direction: format.direction.clone(),
            text_align: format.text_align.clone(),
            line_height: format.line_height.clone(),
            white_space: format.white_space.clone(),
            ..Default::default()
        }
    }
}

/// Convert the children of `root` into a content model.
pub fn dom_to_content_model(
    tree: &DomTree,
    root: NodeId,
    option: &DomToModelOption,
    seed: &DomToModelSeed,
) -> ContentModelDocument {
    let mut context = DomToModelContext::with_seed(tree, option, seed);
    let mut blocks = Vec::new();
    context.process_children(&mut blocks, root);
    normalize_blocks(&mut blocks);

    tracing::trace!(blocks = blocks.len(), root = %root, "converted dom to model");
    ContentModelDocument {
        blocks,
        format: seed.default_format.clone(),
    }
}
