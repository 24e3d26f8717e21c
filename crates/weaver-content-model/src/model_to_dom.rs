//! Content model to DOM rendering.
//!
//! The renderer replaces the children of a target element with markup for a
//! model. Paragraph, list and table structure comes out in the shape the DOM
//! converter reads back, so `dom -> model -> dom` settles after one pass.

use weaver_dom::{DomError, DomPosition, DomSelection, DomTree, NodeId, parse_fragment_into};

use crate::entity::{BLOCK_ENTITY_CONTAINER, create_delimiter, generate_entity_class_names};
use crate::format::{BlockFormat, BoxFormat, LinkFormat, SegmentFormat, Side};
use crate::model::{
    Block, BlockGroup, ContentModelDocument, Entity, ListItem, ListType, Paragraph, Segment,
    Table, WrapperHandle,
};

#[derive(Debug, Clone)]
pub struct ModelToDomOption {
    /// Flank read-only inline entities with delimiter spans.
    pub add_delimiters: bool,
}

impl Default for ModelToDomOption {
    fn default() -> Self {
        Self {
            add_delimiters: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ModelToDomResult {
    /// Selection recovered from markers and selected segments.
    pub selection: Option<DomSelection>,
    /// Wrapper element created for each entity.
    pub entities: Vec<(WrapperHandle, NodeId)>,
}

struct Renderer<'a> {
    tree: &'a mut DomTree,
    option: &'a ModelToDomOption,
    start: Option<DomPosition>,
    end: Option<DomPosition>,
    entities: Vec<(WrapperHandle, NodeId)>,
    /// Open list elements, outermost first.
    list_stack: Vec<OpenList>,
}

struct OpenList {
    element: NodeId,
    list_type: ListType,
    style_type: Option<String>,
}

/// Render `model` into `target`, replacing its children.
pub fn content_model_to_dom(
    model: &ContentModelDocument,
    tree: &mut DomTree,
    target: NodeId,
    option: &ModelToDomOption,
) -> Result<ModelToDomResult, DomError> {
    if !tree.contains_id(target) {
        return Err(DomError::UnknownNode(target.index()));
    }
    tree.remove_all_children(target);

    let mut renderer = Renderer {
        tree,
        option,
        start: None,
        end: None,
        entities: Vec::new(),
        list_stack: Vec::new(),
    };
    renderer.render_blocks(&model.blocks, target)?;

    let selection = match (renderer.start, renderer.end) {
        (Some(start), Some(end)) => Some(DomSelection { start, end }),
        (Some(start), None) => Some(DomSelection::collapsed(start)),
        _ => None,
    };
    tracing::trace!(
        blocks = model.blocks.len(),
        entities = renderer.entities.len(),
        has_selection = selection.is_some(),
        "rendered model to dom"
    );
    Ok(ModelToDomResult {
        selection,
        entities: renderer.entities,
    })
}

impl Renderer<'_> {
    fn mark_start(&mut self, position: DomPosition) {
        if self.start.is_none() {
            self.start = Some(position);
        }
    }

    fn child_end(&self, parent: NodeId) -> DomPosition {
        DomPosition::new(parent, self.tree.children(parent).len())
    }

    fn render_blocks(&mut self, blocks: &[Block], parent: NodeId) -> Result<(), DomError> {
        for block in blocks {
            if !matches!(block, Block::BlockGroup(BlockGroup::ListItem(_))) {
                self.list_stack.clear();
            }
            match block {
                Block::Paragraph(paragraph) => self.render_paragraph(paragraph, parent)?,
                Block::Table(table) => self.render_table(table, parent)?,
                Block::Entity(entity) => self.render_block_entity(entity, parent)?,
                Block::Divider(divider) => {
                    let hr = self.tree.create_element(&divider.tag);
                    set_styles(self.tree, hr, block_styles(&divider.format));
                    self.tree.append_child(parent, hr);
                    self.track_selected(divider.is_selected, hr);
                }
                Block::BlockGroup(BlockGroup::ListItem(item)) => self.render_list_item(item, parent)?,
                Block::BlockGroup(BlockGroup::FormatContainer(container)) => {
                    let element = self.tree.create_element(&container.tag);
                    set_styles(self.tree, element, box_styles(&container.format));
                    self.tree.append_child(parent, element);
                    self.render_nested(&container.blocks, element)?;
                }
                Block::BlockGroup(BlockGroup::General(general)) => {
                    let element = self.tree.create_element(&general.element.tag);
                    for (name, value) in &general.element.attributes {
                        self.tree.set_attribute(element, name, value.clone());
                    }
                    self.tree.append_child(parent, element);
                    self.render_nested(&general.blocks, element)?;
                }
            }
        }
        Ok(())
    }

    /// Nested block lists keep their own list numbering.
    fn render_nested(&mut self, blocks: &[Block], parent: NodeId) -> Result<(), DomError> {
        let saved = std::mem::take(&mut self.list_stack);
        let result = self.render_blocks(blocks, parent);
        self.list_stack = saved;
        result
    }

    // === Paragraphs ===

    fn render_paragraph(&mut self, paragraph: &Paragraph, parent: NodeId) -> Result<(), DomError> {
        let bare = paragraph.is_implicit
            && paragraph.format.is_empty()
            && paragraph.decorator.is_none();
        let container = if bare {
            parent
        } else {
            let tag = paragraph
                .decorator
                .as_ref()
                .map(|d| d.tag.as_str())
                .unwrap_or("div");
            let element = self.tree.create_element(tag);
            let mut styles = block_styles(&paragraph.format);
            if let Some(decorator) = &paragraph.decorator {
                styles.extend(segment_styles(&decorator.format));
            }
            set_styles(self.tree, element, styles);
            self.tree.append_child(parent, element);
            element
        };

        for segment in &paragraph.segments {
            self.render_segment(segment, container)?;
        }
        Ok(())
    }

    fn render_segment(&mut self, segment: &Segment, parent: NodeId) -> Result<(), DomError> {
        match segment {
            Segment::SelectionMarker(marker) => {
                if marker.is_selected {
                    let position = self.child_end(parent);
                    self.mark_start(position);
                    self.end = Some(position);
                }
            }
            Segment::Text(text) => {
                let node = self.tree.create_text(text.text.clone());
                let outer = wrap_inline(self.tree, node, &text.format, text.link.as_ref());
                self.tree.append_child(parent, outer);
                if text.is_selected {
                    self.mark_start(DomPosition::new(node, 0));
                    self.end = Some(DomPosition::new(node, text.text.chars().count()));
                }
            }
            Segment::Br(br) => {
                let node = self.tree.create_element("br");
                let outer = wrap_inline(self.tree, node, &br.format, None);
                self.tree.append_child(parent, outer);
                self.track_selected(br.is_selected, outer);
            }
            Segment::Image(image) => {
                let img = self.tree.create_element("img");
                self.tree.set_attribute(img, "src", image.src.clone());
                if let Some(alt) = &image.alt {
                    self.tree.set_attribute(img, "alt", alt.clone());
                }
                let outer = wrap_inline(self.tree, img, &SegmentFormat::default(), image.link.as_ref());
                self.tree.append_child(parent, outer);
                self.track_selected(image.is_selected, outer);
            }
            Segment::Entity(entity) => self.render_inline_entity(entity, parent)?,
            Segment::General(general) => {
                let element = self.tree.create_element(&general.element.tag);
                for (name, value) in &general.element.attributes {
                    self.tree.set_attribute(element, name, value.clone());
                }
                parse_fragment_into(self.tree, element, &general.html)?;
                self.tree.append_child(parent, element);
                self.track_selected(general.is_selected, element);
            }
        }
        Ok(())
    }

    fn track_selected(&mut self, selected: bool, node: NodeId) {
        if !selected {
            return;
        }
        if let Some(before) = DomPosition::before(self.tree, node) {
            self.mark_start(before);
        }
        self.end = DomPosition::after(self.tree, node);
    }

    // === Entities ===

    fn entity_wrapper(&mut self, entity: &Entity) -> Result<NodeId, DomError> {
        let wrapper = self.tree.create_element(&entity.wrapper_tag);
        let classes = generate_entity_class_names(&entity.entity_format);
        if !classes.is_empty() {
            self.tree.set_attribute(wrapper, "class", classes);
        }
        if entity.entity_format.is_readonly {
            self.tree.set_attribute(wrapper, "contenteditable", "false");
        }
        parse_fragment_into(self.tree, wrapper, &entity.html)?;
        self.entities.push((entity.wrapper, wrapper));
        Ok(wrapper)
    }

    fn needs_delimiters(&self, entity: &Entity) -> bool {
        self.option.add_delimiters
            && entity.entity_format.is_readonly
            && !entity.entity_format.is_fake_entity
    }

    fn render_inline_entity(&mut self, entity: &Entity, parent: NodeId) -> Result<(), DomError> {
        let wrapper = self.entity_wrapper(entity)?;
        let delimiters = self.needs_delimiters(entity);
        if delimiters {
            let before = create_delimiter(self.tree, true);
            self.tree.append_child(parent, before);
        }
        self.tree.append_child(parent, wrapper);
        self.track_selected(entity.is_selected, wrapper);
        if delimiters {
            let after = create_delimiter(self.tree, false);
            self.tree.append_child(parent, after);
        }
        Ok(())
    }

    fn render_block_entity(&mut self, entity: &Entity, parent: NodeId) -> Result<(), DomError> {
        let wrapper = self.entity_wrapper(entity)?;
        if !self.needs_delimiters(entity) {
            self.tree.append_child(parent, wrapper);
            self.track_selected(entity.is_selected, wrapper);
            return Ok(());
        }
        let container = self.tree.create_element("div");
        self.tree.set_attribute(container, "class", BLOCK_ENTITY_CONTAINER);
        let before = create_delimiter(self.tree, true);
        let after = create_delimiter(self.tree, false);
        self.tree.append_child(container, before);
        self.tree.append_child(container, wrapper);
        self.tree.append_child(container, after);
        self.tree.append_child(parent, container);
        self.track_selected(entity.is_selected, container);
        Ok(())
    }

    // === Lists ===

    fn render_list_item(&mut self, item: &ListItem, parent: NodeId) -> Result<(), DomError> {
        // Reuse open levels while they still match.
        let mut depth = 0;
        while depth < item.levels.len() && depth < self.list_stack.len() {
            let level = &item.levels[depth];
            let open = &self.list_stack[depth];
            let same = open.list_type == level.list_type
                && open.style_type == level.format.list_style_type
                && level.format.start_number_override.is_none();
            if !same {
                break;
            }
            depth += 1;
        }
        self.list_stack.truncate(depth);

        for level in &item.levels[depth..] {
            let list = self.tree.create_element(level.list_type.tag());
            if let Some(start) = level.format.start_number_override {
                self.tree.set_attribute(list, "start", start.to_string());
            }
            let mut styles = box_styles(&level.format);
            if let Some(style_type) = &level.format.list_style_type {
                styles.push(("list-style-type".into(), style_type.clone()));
            }
            set_styles(self.tree, list, styles);

            let host = match self.list_stack.last() {
                // nested lists live inside the parent list's last item
                Some(open) => self
                    .tree
                    .last_child(open.element)
                    .filter(|&li| self.tree.has_tag(li, "li"))
                    .unwrap_or(open.element),
                None => parent,
            };
            self.tree.append_child(host, list);
            self.list_stack.push(OpenList {
                element: list,
                list_type: level.list_type,
                style_type: level.format.list_style_type.clone(),
            });
        }

        let Some(list) = self.list_stack.last().map(|open| open.element) else {
            // an item with no levels renders as its blocks
            return self.render_nested(&item.blocks, parent);
        };
        let li = self.tree.create_element("li");
        let mut styles = block_styles(&item.format);
        styles.extend(segment_styles(&item.format_holder.format));
        set_styles(self.tree, li, styles);
        self.tree.append_child(list, li);
        self.render_nested(&item.blocks, li)
    }

    // === Tables ===

    fn render_table(&mut self, table: &Table, parent: NodeId) -> Result<(), DomError> {
        let element = self.tree.create_element("table");
        let format = &table.format;
        let mut styles = box_styles(format);
        if format.border_collapse == Some(true) {
            styles.push(("border-collapse".into(), "collapse".into()));
        }
        push_opt(&mut styles, "width", format.width.as_deref());
        push_opt(&mut styles, "table-layout", format.table_layout.as_deref());
        set_styles(self.tree, element, styles);
        self.tree.append_child(parent, element);

        if !table.widths.is_empty() {
            let colgroup = self.tree.create_element("colgroup");
            for width in &table.widths {
                let col = self.tree.create_element("col");
                self.tree.set_attribute(col, "style", format!("width: {width}px"));
                self.tree.append_child(colgroup, col);
            }
            self.tree.append_child(element, colgroup);
        }

        let tbody = self.tree.create_element("tbody");
        self.tree.append_child(element, tbody);
        for (row_index, row) in table.rows.iter().enumerate() {
            let tr = self.tree.create_element("tr");
            let mut styles = block_styles(&row.format);
            if row.height > 0.0 {
                styles.push(("height".into(), format!("{}px", row.height)));
            }
            set_styles(self.tree, tr, styles);
            self.tree.append_child(tbody, tr);

            for (col_index, cell) in row.cells.iter().enumerate() {
                if cell.span_left || cell.span_above {
                    continue;
                }
                let td = self.tree.create_element(if cell.is_header { "th" } else { "td" });
                let colspan = 1 + row.cells[col_index + 1..]
                    .iter()
                    .take_while(|c| c.span_left)
                    .count();
                let rowspan = 1 + table.rows[row_index + 1..]
                    .iter()
                    .take_while(|r| r.cells.get(col_index).is_some_and(|c| c.span_above))
                    .count();
                if colspan > 1 {
                    self.tree.set_attribute(td, "colspan", colspan.to_string());
                }
                if rowspan > 1 {
                    self.tree.set_attribute(td, "rowspan", rowspan.to_string());
                }

                let cell_format = &cell.format;
                let mut styles = box_styles(cell_format);
                push_opt(&mut styles, "vertical-align", cell_format.vertical_align.as_deref());
                push_opt(&mut styles, "width", cell_format.width.as_deref());
                push_opt(&mut styles, "height", cell_format.height.as_deref());
                set_styles(self.tree, td, styles);
                self.tree.append_child(tr, td);
                self.render_nested(&cell.blocks, td)?;
            }
        }
        Ok(())
    }
}

// === Styles ===

fn push_opt(styles: &mut Vec<(String, String)>, name: &str, value: Option<&str>) {
    if let Some(value) = value {
        styles.push((name.to_string(), value.to_string()));
    }
}

fn set_styles(tree: &mut DomTree, node: NodeId, styles: Vec<(String, String)>) {
    if !styles.is_empty() {
        tree.set_styles(node, &styles);
    }
}

fn box_styles<F: BoxFormat>(format: &F) -> Vec<(String, String)> {
    let mut styles = Vec::new();
    push_opt(&mut styles, "direction", format.direction());
    push_opt(&mut styles, "text-align", format.text_align());
    push_opt(&mut styles, "background-color", format.background_color());
    for side in Side::ALL {
        let name = side.css_name();
        push_opt(&mut styles, &format!("margin-{name}"), format.margin(side));
        push_opt(&mut styles, &format!("padding-{name}"), format.padding(side));
        push_opt(&mut styles, &format!("border-{name}"), format.border(side));
    }
    styles
}

fn block_styles(format: &BlockFormat) -> Vec<(String, String)> {
    let mut styles = box_styles(format);
    push_opt(&mut styles, "line-height", format.line_height.as_deref());
    push_opt(&mut styles, "white-space", format.white_space.as_deref());
    push_opt(&mut styles, "text-indent", format.text_indent.as_deref());
    styles
}

fn segment_styles(format: &SegmentFormat) -> Vec<(String, String)> {
    let mut styles = Vec::new();
    push_opt(&mut styles, "font-family", format.font_family.as_deref());
    push_opt(&mut styles, "font-size", format.font_size.as_deref());
    push_opt(&mut styles, "font-weight", format.font_weight.as_deref());
    if let Some(italic) = format.italic {
        styles.push(("font-style".into(), if italic { "italic" } else { "normal" }.into()));
    }
    let mut decorations = Vec::new();
    if format.underline == Some(true) {
        decorations.push("underline");
    }
    if format.strikethrough == Some(true) {
        decorations.push("line-through");
    }
    if !decorations.is_empty() {
        styles.push(("text-decoration".into(), decorations.join(" ")));
    }
    push_opt(&mut styles, "color", format.text_color.as_deref());
    push_opt(&mut styles, "background-color", format.background_color.as_deref());
    push_opt(&mut styles, "letter-spacing", format.letter_spacing.as_deref());
    styles
}

/// Wrap an inline node in its styling span, script elements and link,
/// returning the outermost node.
fn wrap_inline(
    tree: &mut DomTree,
    node: NodeId,
    format: &SegmentFormat,
    link: Option<&LinkFormat>,
) -> NodeId {
    let mut outer = node;
    let styles = segment_styles(format);
    if !styles.is_empty() {
        let span = tree.create_element("span");
        tree.set_styles(span, &styles);
        tree.append_child(span, outer);
        outer = span;
    }
    if let Some(sequence) = &format.super_or_sub_script_sequence {
        // the sequence lists the outermost script first
        for kind in sequence.split_whitespace().rev() {
            let tag = match kind {
                "super" => "sup",
                "sub" => "sub",
                _ => continue,
            };
            let script = tree.create_element(tag);
            tree.append_child(script, outer);
            outer = script;
        }
    }
    if let Some(link) = link {
        let a = tree.create_element("a");
        for (name, value) in [
            ("href", &link.href),
            ("target", &link.target),
            ("title", &link.title),
            ("rel", &link.rel),
        ] {
            if let Some(value) = value {
                tree.set_attribute(a, name, value.clone());
            }
        }
        tree.append_child(a, outer);
        outer = a;
    }
    outer
}
