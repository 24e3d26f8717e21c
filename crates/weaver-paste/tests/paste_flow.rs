// Paste pipeline end to end: re-paste, table merging, merge-format,
// classification, source normalizers and the plain text path.
//
// Editors here run the real undo and entity plugins alongside the paste
// plugin, so every paste goes through the full transaction.

use std::cell::Cell;
use std::rc::Rc;

use pretty_assertions::assert_eq;
use weaver_content_model::{
    Block, BlockGroup, ListItem, ListType, Paragraph, Segment, SegmentFormat, Table,
};
use weaver_dom::{DomPosition, DomSelection, NodeId};
use weaver_editor_core::{
    BeforePasteEvent, ClipboardData, Editor, EditorOptions, EditorPlugin, PassThroughHtml,
    PasteType, PluginEvent,
};
use weaver_paste::fragment::{create_paste_fragment, retrieve_html_info};
use weaver_paste::{PasteOptions, PastePlugin, PasteSource, get_paste_source, paste};

/// Counts `BeforePaste` broadcasts and the link parsers registered by then.
struct BeforePasteCounter {
    seen: Rc<Cell<usize>>,
    link_parsers: Rc<Cell<usize>>,
}

impl EditorPlugin for BeforePasteCounter {
    fn name(&self) -> &'static str {
        "BeforePasteCounter"
    }

    fn on_plugin_event(&mut self, _editor: &mut Editor, event: &mut PluginEvent) {
        if let PluginEvent::BeforePaste(event) = event {
            self.seen.set(self.seen.get() + 1);
            self.link_parsers
                .set(event.dom_to_model_option.additional_format_parsers.link.len());
        }
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn paste_editor(options: EditorOptions, paste_options: PasteOptions, html: &str) -> Editor {
    init_tracing();
    let mut editor = Editor::new(options, vec![Box::new(PastePlugin::new(paste_options))]);
    editor.set_content(html).unwrap();
    editor
}

fn editor(html: &str) -> Editor {
    paste_editor(EditorOptions::default(), PasteOptions::default(), html)
}

fn text_node(editor: &Editor, text: &str) -> NodeId {
    let tree = editor.dom();
    tree.find_descendant(editor.root(), |t, n| t.text(n) == Some(text))
        .unwrap()
}

fn first_paragraph_text(editor: &mut Editor) -> String {
    editor
        .get_content_model()
        .blocks
        .iter()
        .find_map(Block::as_paragraph)
        .map(Paragraph::text)
        .unwrap_or_default()
}

fn tables(blocks: &[Block]) -> Vec<&Table> {
    blocks
        .iter()
        .filter_map(|b| match b {
            Block::Table(table) => Some(table),
            _ => None,
        })
        .collect()
}

fn list_items(blocks: &[Block]) -> Vec<&ListItem> {
    blocks
        .iter()
        .filter_map(|b| match b {
            Block::BlockGroup(BlockGroup::ListItem(item)) => Some(item),
            _ => None,
        })
        .collect()
}

fn cell_texts(table: &Table) -> Vec<Vec<String>> {
    table
        .rows
        .iter()
        .map(|row| {
            row.cells
                .iter()
                .map(|cell| {
                    cell.blocks
                        .iter()
                        .filter_map(Block::as_paragraph)
                        .map(Paragraph::text)
                        .collect()
                })
                .collect()
        })
        .collect()
}

fn pasted_segments(editor: &mut Editor) -> Vec<Segment> {
    editor
        .get_content_model()
        .blocks
        .iter()
        .filter_map(Block::as_paragraph)
        .flat_map(|p| p.segments.iter().cloned())
        .collect()
}

fn has_image(segments: &[Segment]) -> bool {
    segments.iter().any(|s| matches!(s, Segment::Image(_)))
}

fn event_for(raw: &str) -> BeforePasteEvent {
    let clipboard = ClipboardData::from_html(raw, "");
    let info = retrieve_html_info(raw, &PassThroughHtml).unwrap();
    let fragment = create_paste_fragment(&clipboard, PasteType::Normal, Some(&info.document));
    BeforePasteEvent {
        clipboard_data: clipboard,
        fragment,
        html_before: info.html_before,
        html_after: info.html_after,
        html_attributes: info.document.html_attributes.clone(),
        sanitizing_option: Default::default(),
        dom_to_model_option: Default::default(),
        paste_type: PasteType::Normal,
    }
}

#[test]
fn test_repaste_restores_document_first() {
    let mut editor = editor("<div>start</div>");
    let mut clipboard = ClipboardData::from_html("<b>bold</b>", "bold");

    paste(&mut editor, &mut clipboard, PasteType::Normal).unwrap();
    assert!(clipboard.snapshot_before_paste.is_some());
    assert_eq!(first_paragraph_text(&mut editor), "startbold");
    let once = editor.export_html().unwrap();

    paste(&mut editor, &mut clipboard, PasteType::Normal).unwrap();
    assert_eq!(first_paragraph_text(&mut editor), "startbold");
    assert_eq!(editor.export_html().unwrap(), once);
}

#[test]
fn test_repaste_as_plain_text_replaces_previous_paste() {
    let mut editor = editor("<div>start</div>");
    let mut clipboard = ClipboardData::from_html("<b>bold</b>", "bold");

    paste(&mut editor, &mut clipboard, PasteType::Normal).unwrap();
    paste(&mut editor, &mut clipboard, PasteType::AsPlainText).unwrap();

    assert_eq!(first_paragraph_text(&mut editor), "startbold");
    let model = editor.get_content_model();
    let paragraph = model.blocks[0].as_paragraph().unwrap();
    assert!(
        paragraph
            .segments
            .iter()
            .all(|s| s.format().font_weight.is_none())
    );
}

#[test]
fn test_single_table_merges_into_cells() {
    let mut editor = editor(
        "<table><tr><td>a</td><td>b</td></tr><tr><td>c</td><td>d</td></tr></table>",
    );
    let a = text_node(&editor, "a");
    editor.set_dom_selection(Some(DomSelection::collapsed(DomPosition::new(a, 0))));

    let mut clipboard =
        ClipboardData::from_html("<table><tr><td>X</td><td>Y</td></tr></table><br>", "X\tY");
    paste(&mut editor, &mut clipboard, PasteType::Normal).unwrap();

    let model = editor.get_content_model();
    let tables = tables(&model.blocks);
    assert_eq!(tables.len(), 1);
    assert_eq!(
        cell_texts(tables[0]),
        vec![vec!["X".to_string(), "Y".to_string()], vec!["c".to_string(), "d".to_string()]]
    );
}

#[test]
fn test_merge_format_keeps_caret_format() {
    let options = EditorOptions {
        default_segment_format: SegmentFormat {
            font_family: Some("Calibri".into()),
            text_color: Some("#000".into()),
            ..Default::default()
        },
        ..Default::default()
    };
    let mut editor = paste_editor(
        options,
        PasteOptions::default(),
        r#"<div><span style="font-family: Arial; font-size: 1pt">x</span></div>"#,
    );
    let mut clipboard = ClipboardData::from_html(
        r#"<span style="font-size: 100px; background-color: black; font-weight: bold">y</span>"#,
        "y",
    );
    paste(&mut editor, &mut clipboard, PasteType::MergeFormat).unwrap();

    let pending = editor.pending_format().unwrap().format.clone();
    assert_eq!(
        pending,
        SegmentFormat {
            font_family: Some("Arial".into()),
            font_size: Some("1pt".into()),
            text_color: Some("#000".into()),
            ..Default::default()
        }
    );

    let model = editor.get_content_model();
    let pasted = model.blocks[0]
        .as_paragraph()
        .unwrap()
        .segments
        .iter()
        .find_map(|s| match s {
            Segment::Text(text) if text.text == "y" => Some(text.format.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(pasted.font_size.as_deref(), Some("1pt"));
    assert_eq!(pasted.font_weight.as_deref(), Some("bold"));
    assert_eq!(pasted.background_color, None);
}

#[test]
fn test_classification_is_deterministic() {
    let cases = [
        (
            r#"<html xmlns:w="urn:schemas-microsoft-com:office:word"><head><meta name="ProgId" content="Word.Document"></head><body><p>x</p></body></html>"#,
            PasteSource::WordDesktop,
        ),
        (
            r#"<html xmlns:x="urn:schemas-microsoft-com:office:excel"><body><table><tr><td>1</td></tr></table></body></html>"#,
            PasteSource::ExcelDesktop,
        ),
        (
            r#"<html><head><meta name="ProgId" content="Excel.Sheet"></head><body><table><tr><td>1</td></tr></table></body></html>"#,
            PasteSource::ExcelOnline,
        ),
        (
            r#"<google-sheets-html-origin><table><tr><td>1</td></tr></table></google-sheets-html-origin>"#,
            PasteSource::GoogleSheets,
        ),
        ("<p>x</p>", PasteSource::Default),
    ];
    for (raw, expected) in cases {
        let event = event_for(raw);
        assert_eq!(get_paste_source(&event, false), expected, "{raw}");
        assert_eq!(get_paste_source(&event, false), expected, "{raw}");
        assert_eq!(get_paste_source(&event, true), PasteSource::Default, "{raw}");
    }
}

#[test]
fn test_plain_text_skips_before_paste() {
    init_tracing();
    let seen = Rc::new(Cell::new(0));
    let link_parsers = Rc::new(Cell::new(0));
    let mut editor = Editor::new(
        EditorOptions::default(),
        vec![
            Box::new(PastePlugin::default()),
            Box::new(BeforePasteCounter {
                seen: seen.clone(),
                link_parsers: link_parsers.clone(),
            }),
        ],
    );
    editor.set_content("<div>x</div>").unwrap();
    let word = r#"<html><head><meta name="ProgId" content="Word.Document"></head><body><p><b>rich</b></p></body></html>"#;
    let mut clipboard = ClipboardData::from_html(word, "rich");

    paste(&mut editor, &mut clipboard, PasteType::AsPlainText).unwrap();
    assert_eq!(seen.get(), 0);
    assert_eq!(first_paragraph_text(&mut editor), "xrich");
    let model = editor.get_content_model();
    assert!(
        model.blocks[0]
            .as_paragraph()
            .unwrap()
            .segments
            .iter()
            .all(|s| s.format().font_weight.is_none())
    );

    paste(&mut editor, &mut clipboard, PasteType::Normal).unwrap();
    assert_eq!(seen.get(), 1);
    assert_eq!(link_parsers.get(), 1);
    assert_eq!(first_paragraph_text(&mut editor), "xrich");
}

#[test]
fn test_plain_text_lines_become_paragraphs() {
    let mut editor = editor("");
    let mut clipboard = ClipboardData::from_text("one\ntwo\nthree");
    paste(&mut editor, &mut clipboard, PasteType::AsPlainText).unwrap();

    let texts: Vec<String> = editor
        .get_content_model()
        .blocks
        .iter()
        .filter_map(Block::as_paragraph)
        .map(Paragraph::text)
        .filter(|t| !t.is_empty())
        .collect();
    assert_eq!(texts, vec!["one", "two", "three"]);
}

#[test]
fn test_word_list_paragraphs_become_list_items() {
    let mut editor = editor("");
    let html = concat!(
        r#"<html xmlns:w="urn:schemas-microsoft-com:office:word"><head><style>"#,
        r#"@list l0:level1 { mso-level-number-format:bullet; }"#,
        r#"@list l1:level1 { mso-level-start-at:4; }"#,
        r#"</style></head><body><!--StartFragment-->"#,
        r#"<p style="margin-left:.5in;text-indent:-.25in;mso-list:l0 level1 lfo1"><span style="mso-list:Ignore">*</span>one</p>"#,
        r#"<p style="mso-list:l0 level1 lfo1"><span style="mso-list:Ignore">*</span>two</p>"#,
        r#"<p style="mso-list:l1 level1 lfo2"><span style="mso-list:Ignore">4.</span>four</p>"#,
        r#"<!--EndFragment--></body></html>"#,
    );
    let mut clipboard = ClipboardData::from_html(html, "one\ntwo\nfour");
    paste(&mut editor, &mut clipboard, PasteType::Normal).unwrap();

    let model = editor.get_content_model();
    let items = list_items(&model.blocks);
    assert_eq!(items.len(), 3);

    let texts: Vec<String> = items
        .iter()
        .map(|item| {
            item.blocks
                .iter()
                .filter_map(Block::as_paragraph)
                .map(Paragraph::text)
                .collect()
        })
        .collect();
    assert_eq!(texts, vec!["one", "two", "four"]);

    assert_eq!(items[0].levels.len(), 1);
    assert_eq!(items[0].levels[0].list_type, ListType::Unordered);
    assert_eq!(items[0].format.margin_left, None);
    assert_eq!(items[2].levels[0].list_type, ListType::Ordered);
    assert_eq!(items[2].levels[0].format.start_number_override, Some(4));
}

#[test]
fn test_excel_cells_get_default_border() {
    let html = r#"<html xmlns:x="urn:schemas-microsoft-com:office:excel"><body><table><!--StartFragment--><tr><td>1</td></tr><!--EndFragment--></table></body></html>"#;

    let mut editor = editor("");
    let mut clipboard = ClipboardData::from_html(html, "1");
    paste(&mut editor, &mut clipboard, PasteType::Normal).unwrap();
    let model = editor.get_content_model();
    let table = tables(&model.blocks)[0];
    assert_eq!(
        table.rows[0].cells[0].format.border_top.as_deref(),
        Some("1px solid #d4d4d4")
    );

    let mut editor = paste_editor(
        EditorOptions::default(),
        PasteOptions {
            allow_excel_no_border_table: true,
        },
        "",
    );
    let mut clipboard = ClipboardData::from_html(html, "1");
    paste(&mut editor, &mut clipboard, PasteType::Normal).unwrap();
    let model = editor.get_content_model();
    let table = tables(&model.blocks)[0];
    assert_eq!(table.rows[0].cells[0].format.border_top, None);
}

#[test]
fn test_paste_as_image() {
    let mut editor = editor("<div>x</div>");
    let mut clipboard = ClipboardData::from_text("ignored");
    clipboard.image_data_uri = Some("data:image/png;base64,AAAA".into());
    paste(&mut editor, &mut clipboard, PasteType::AsImage).unwrap();

    let model = editor.get_content_model();
    let image = model.blocks[0]
        .as_paragraph()
        .unwrap()
        .segments
        .iter()
        .find_map(|s| match s {
            Segment::Image(image) => Some(image.src.clone()),
            _ => None,
        });
    assert_eq!(image.as_deref(), Some("data:image/png;base64,AAAA"));
}

#[test]
fn test_script_in_clipboard_never_reaches_document() {
    let mut editor = editor("<div>x</div>");
    let mut clipboard = ClipboardData::from_html(
        r#"<p onclick="evil()">safe<script>evil()</script><a href="javascript:evil()">link</a></p>"#,
        "safe",
    );
    paste(&mut editor, &mut clipboard, PasteType::Normal).unwrap();
    let html = editor.export_html().unwrap();
    assert!(!html.contains("evil"), "{html}");
    assert!(html.contains("safe"), "{html}");
}

#[test]
fn test_browser_tolerated_markup_pastes_as_text() {
    let mut editor = editor("<div>x</div>");
    let mut clipboard = ClipboardData::from_html("<p>if a<3 then</p>", "if a<3 then");
    paste(&mut editor, &mut clipboard, PasteType::Normal).unwrap();
    assert_eq!(first_paragraph_text(&mut editor), "xif a<3 then");

    let mut editor = crate::editor("<div>x</div>");
    let mut clipboard = ClipboardData::from_html(r#"<a href="x>y</a>"#, "y");
    paste(&mut editor, &mut clipboard, PasteType::Normal).unwrap();
    assert_eq!(first_paragraph_text(&mut editor), "xy");
}

#[test]
fn test_web_app_drops_handles_and_comment_highlights() {
    let mut editor = editor("");
    let html = concat!(
        r#"<div><span class="TableColumnResizeHandle">handle</span>s"#,
        r#"<span style="vertical-align: super">2</span>"#,
        r#"<span class="CommentHighlightRest" style="background-color: yellow">c</span></div>"#,
        r#"<ul class="BulletListStyle1"><li class="OutlineElement" data-aria-level="1">x</li></ul>"#,
    );
    let mut clipboard = ClipboardData::from_html(html, "s2c\nx");
    paste(&mut editor, &mut clipboard, PasteType::Normal).unwrap();

    let segments = pasted_segments(&mut editor);
    let text = |wanted: &str| {
        segments
            .iter()
            .find_map(|s| match s {
                Segment::Text(text) if text.text == wanted => Some(text.format.clone()),
                _ => None,
            })
            .unwrap()
    };
    assert_eq!(text("2").super_or_sub_script_sequence.as_deref(), Some("super"));
    assert_eq!(text("c").background_color, None);

    let exported = editor.export_html().unwrap();
    assert!(!exported.contains("handle"), "{exported}");
    assert!(exported.contains("<sup>2</sup>"), "{exported}");
}

#[test]
fn test_powerpoint_prefers_html_over_slide_image() {
    let mut editor = editor("<div>s</div>");
    let html = r#"<html><head><meta name="ProgId" content="PowerPoint.Slide"></head><body><p>slide</p></body></html>"#;
    let mut clipboard = ClipboardData::from_html(html, "");
    clipboard.image_data_uri = Some("data:image/png;base64,AAAA".into());
    paste(&mut editor, &mut clipboard, PasteType::Normal).unwrap();

    assert_eq!(first_paragraph_text(&mut editor), "sslide");
    assert!(!has_image(&pasted_segments(&mut editor)));
}

#[test]
fn test_excel_as_image_skips_table_normalization() {
    let html = r#"<html xmlns:x="urn:schemas-microsoft-com:office:excel"><body><table><!--StartFragment--><tr><td>1</td></tr><!--EndFragment--></table></body></html>"#;
    let mut editor = editor("<div>x</div>");
    let mut clipboard = ClipboardData::from_html(html, "1");
    clipboard.image_data_uri = Some("data:image/png;base64,AAAA".into());
    paste(&mut editor, &mut clipboard, PasteType::AsImage).unwrap();

    let model = editor.get_content_model();
    assert!(tables(&model.blocks).is_empty());
    assert!(has_image(&pasted_segments(&mut editor)));
}
