//! Structural cleanup run after every model edit.

use crate::model::{Block, BlockGroup, Paragraph, Segment};

/// Normalize a block list in place.
///
/// - empty, unselected text segments are dropped
/// - non-implicit paragraphs holding only markers get a `Br` so they keep a line
/// - a trailing `Br` after visible content is dropped
/// - paragraphs left with no segments at all are removed
/// - list items and format containers left empty are removed
pub fn normalize_blocks(blocks: &mut Vec<Block>) {
    for block in blocks.iter_mut() {
        match block {
            Block::Paragraph(paragraph) => normalize_paragraph(paragraph),
            Block::BlockGroup(group) => normalize_blocks(group.blocks_mut()),
            Block::Table(table) => {
                for cell in table.rows.iter_mut().flat_map(|r| r.cells.iter_mut()) {
                    normalize_blocks(&mut cell.blocks);
                }
            }
            Block::Entity(_) | Block::Divider(_) => {}
        }
    }

    blocks.retain(|block| match block {
        Block::Paragraph(p) => !p.segments.is_empty(),
        Block::BlockGroup(BlockGroup::ListItem(item)) => !item.blocks.is_empty(),
        Block::BlockGroup(BlockGroup::FormatContainer(container)) => !container.blocks.is_empty(),
        _ => true,
    });
}

pub fn normalize_paragraph(paragraph: &mut Paragraph) {
    paragraph
        .segments
        .retain(|s| !matches!(s, Segment::Text(t) if t.text.is_empty() && !t.is_selected));

    let only_markers = !paragraph.segments.is_empty()
        && paragraph
            .segments
            .iter()
            .all(|s| matches!(s, Segment::SelectionMarker(_)));
    if only_markers && !paragraph.is_implicit {
        let format = paragraph.segments[0].format().clone();
        paragraph.segments.push(Segment::br(format));
        return;
    }

    let Some(Segment::Br(_)) = paragraph.segments.last() else {
        return;
    };
    let mut before = paragraph.segments[..paragraph.segments.len() - 1]
        .iter()
        .rev()
        .filter(|s| !matches!(s, Segment::SelectionMarker(_)));
    if let Some(previous) = before.next() {
        if !matches!(previous, Segment::Br(_)) {
            paragraph.segments.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::SegmentFormat;
    use crate::model::{ListItem, ListLevel, ListType};

    fn text(s: &str) -> Segment {
        Segment::text(s, SegmentFormat::default())
    }

    #[test]
    fn test_marker_only_paragraph_gets_br() {
        let mut blocks = vec![Block::Paragraph(Paragraph::with_segments(vec![Segment::marker(
            SegmentFormat::default(),
        )]))];
        normalize_blocks(&mut blocks);
        let paragraph = blocks[0].as_paragraph().unwrap();
        assert!(matches!(paragraph.segments[1], Segment::Br(_)));
    }

    #[test]
    fn test_trailing_br_after_text_is_removed() {
        let mut paragraph = Paragraph::with_segments(vec![
            text("a"),
            Segment::marker(SegmentFormat::default()),
            Segment::br(SegmentFormat::default()),
        ]);
        normalize_paragraph(&mut paragraph);
        assert_eq!(paragraph.segments.len(), 2);

        let mut blank_line = Paragraph::with_segments(vec![
            text("a"),
            Segment::br(SegmentFormat::default()),
            Segment::br(SegmentFormat::default()),
        ]);
        normalize_paragraph(&mut blank_line);
        assert_eq!(blank_line.segments.len(), 3);
    }

    #[test]
    fn test_empty_groups_and_paragraphs_are_removed() {
        let mut item = ListItem::new(vec![ListLevel::new(ListType::Unordered)], SegmentFormat::default());
        item.blocks.push(Block::Paragraph(Paragraph::with_segments(vec![text("")])));
        let mut blocks = vec![
            Block::Paragraph(Paragraph::with_segments(vec![text("keep")])),
            Block::BlockGroup(BlockGroup::ListItem(item)),
        ];
        normalize_blocks(&mut blocks);
        assert_eq!(blocks.len(), 1);
    }
}
