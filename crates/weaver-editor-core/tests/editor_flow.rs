// End-to-end editor behaviour: undo gating, entity ids and delimiters.
//
// The host side is simulated: native typing is a `dom_mut` edit followed by
// `handle_input`, the way a browser mutates the DOM before the input event.

use pretty_assertions::assert_eq;
use weaver_content_model::{
    Block, ContentModelDocument, Entity, EntityFormat, ModelToDomOption, Paragraph, Segment,
    SegmentFormat, content_model_to_dom,
};
use weaver_dom::{DomTree, NodeId, inner_html};
use weaver_editor_core::entity::{find_invalid_delimiters, find_undelimited_entities};
use weaver_editor_core::{
    ChangeSource, Editor, EditorOptions, FormatContentModelOptions, Key, KeyboardEvent,
    KeydownResult, UndoManager,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn editor(html: &str) -> Editor {
    init_tracing();
    let mut editor = Editor::new(EditorOptions::default(), Vec::new());
    editor.set_content(html).unwrap();
    editor
}

fn first_text_node(editor: &Editor) -> NodeId {
    let tree = editor.dom();
    tree.find_descendant(editor.root(), |t, n| t.is_text(n)).unwrap()
}

fn type_char(editor: &mut Editor, c: &str) {
    editor.handle_key_down(KeyboardEvent::new(Key::character(c)));
    let node = first_text_node(editor);
    let text = format!("{}{c}", editor.dom().text(node).unwrap_or_default());
    editor.dom_mut().set_text(node, text);
    editor.handle_input(Some(c));
}

fn paragraph_text(editor: &mut Editor) -> String {
    editor.get_content_model().blocks[0]
        .as_paragraph()
        .map(Paragraph::text)
        .unwrap_or_default()
}

#[test]
fn test_typing_run_takes_no_snapshot_until_caret_moves() {
    let mut editor = editor("<div>x</div>");
    let before = editor.snapshots().len();

    for _ in 0..3 {
        type_char(&mut editor, "a");
    }
    assert_eq!(editor.snapshots().len(), before);
    assert_eq!(paragraph_text(&mut editor), "xaaa");

    editor.handle_key_down(KeyboardEvent::new(Key::ArrowLeft));
    assert_eq!(editor.snapshots().len(), before + 1);
    assert!(!editor.snapshots().has_new_content());

    // nothing new since the flush
    editor.handle_key_down(KeyboardEvent::new(Key::ArrowLeft));
    assert_eq!(editor.snapshots().len(), before + 1);
}

#[test]
fn test_undo_after_typing_run_restores_text() {
    let mut editor = editor("<div>x</div>");
    for c in ["a", "b"] {
        type_char(&mut editor, c);
    }
    assert!(editor.undo().unwrap());
    assert_eq!(paragraph_text(&mut editor), "x");
    assert!(editor.redo().unwrap());
    assert_eq!(paragraph_text(&mut editor), "xab");
}

#[test]
fn test_backspace_undoes_auto_complete_once() {
    let mut editor = editor("<div>teh</div>");
    editor
        .format_content_model(
            FormatContentModelOptions::new("autoCorrect", ChangeSource::Format),
            |_, model, context| {
                let Some(paragraph) = model.blocks[0].as_paragraph_mut() else {
                    return false;
                };
                for segment in &mut paragraph.segments {
                    if let Segment::Text(text) = segment {
                        text.text = "the".into();
                    }
                }
                context.can_undo_by_backspace = true;
                true
            },
        )
        .unwrap();
    assert_eq!(paragraph_text(&mut editor), "the");

    let result = editor.handle_key_down(KeyboardEvent::new(Key::Backspace));
    assert_eq!(result, KeydownResult::Handled);
    assert_eq!(paragraph_text(&mut editor), "teh");

    let result = editor.handle_key_down(KeyboardEvent::new(Key::Backspace));
    assert_eq!(result, KeydownResult::NotHandled);
}

#[test]
fn test_colliding_entities_get_numbered_ids() {
    let entity = r#"<span class="_Entity _EType_foo _EReadonly_1">@</span>"#;
    let mut editor = editor(&format!("<div>{entity}{entity}{entity}</div>"));

    let ids: Vec<&str> = editor.entities().iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["foo", "foo_1", "foo_2"]);

    let html = editor.export_html().unwrap();
    assert!(html.contains("_EId_foo_1"), "{html}");
    assert!(html.contains("_EId_foo_2"), "{html}");
}

#[test]
fn test_explicit_duplicate_ids_are_renamed() {
    let entity = r#"<span class="_Entity _EType_card _EId_card _EReadonly_1">c</span>"#;
    let editor = editor(&format!("<div>{entity}</div><div>{entity}</div>"));
    let ids: Vec<&str> = editor.entities().iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["card", "card_1"]);
}

#[test]
fn test_rendered_inline_entity_has_valid_delimiters() {
    let entity = Entity::new(
        "span",
        EntityFormat {
            id: Some("m1".into()),
            entity_type: Some("mention".into()),
            is_readonly: true,
            is_fake_entity: false,
        },
        "@someone",
    );
    let model = ContentModelDocument::with_blocks(vec![Block::Paragraph(Paragraph::with_segments(
        vec![
            Segment::text("hi ", SegmentFormat::default()),
            Segment::Entity(entity),
        ],
    ))]);

    let mut tree = DomTree::new();
    let root = tree.create_element("div");
    content_model_to_dom(&model, &mut tree, root, &ModelToDomOption::default()).unwrap();

    assert!(find_invalid_delimiters(&tree, root).is_empty());
    assert!(find_undelimited_entities(&tree, root).is_empty());
    assert_eq!(
        inner_html(&tree, root).matches("entityDelimiter").count(),
        2
    );
}

#[test]
fn test_undo_brings_deleted_entity_back() {
    let mut editor = editor(r#"<div><span class="_Entity _EType_m _EReadonly_1">@x</span></div>"#);
    assert!(editor.entities().get("m").is_some_and(|e| !e.is_deleted));

    editor.set_content("<div>gone</div>").unwrap();
    assert!(editor.entities().get("m").is_some_and(|e| e.is_deleted));

    assert!(editor.undo().unwrap());
    assert!(editor.entities().get("m").is_some_and(|e| !e.is_deleted));
    assert_eq!(editor.entities().len(), 1);
}
