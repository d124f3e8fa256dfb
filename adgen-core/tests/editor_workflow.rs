//! Editor Workflow Integration Tests
//!
//! Tests the editor as a caller drives it:
//! - Add / undo / redo round trips
//! - Duplicate and layer reordering
//! - Guideline loading, format switching and compliance
//! - Saving and reloading projects

use adgen_core::guidelines::SafeZone;
use adgen_core::{
    CanvasFormat, EditorState, Element, ElementId, ElementPatch, GuidelineRules, ProjectStore,
    Severity, ViolationKind, MAX_HISTORY,
};

// ============================================================================
// History
// ============================================================================

#[test]
fn test_add_text_undo_redo() {
    let mut editor = EditorState::new();
    let index_before = editor.history_index();

    let id = editor
        .add_element(Element::text("Summer Sale", 48.0).at(120.0, 90.0))
        .expect("add");
    assert!(editor.can_undo());

    assert!(editor.undo());
    assert!(editor.elements().is_empty());
    assert_eq!(editor.history_index(), Some(0));
    assert!(index_before.is_none());
    assert!(!editor.can_undo());
    assert!(editor.can_redo());

    assert!(editor.redo());
    assert_eq!(editor.elements().len(), 1);
    assert_eq!(editor.elements()[0].id, id);
    assert!(!editor.can_redo());
}

#[test]
fn test_new_action_after_undo_drops_redo() {
    let mut editor = EditorState::new();
    editor.add_element(Element::text("one", 20.0)).expect("add");
    editor.add_element(Element::text("two", 20.0)).expect("add");

    assert!(editor.undo());
    assert!(editor.can_redo());

    editor.set_background("#ff0000");
    assert!(!editor.can_redo());
    assert_eq!(editor.elements().len(), 1);
    assert_eq!(editor.background(), "#ff0000");
}

#[test]
fn test_undo_at_start_is_noop() {
    let mut editor = EditorState::new();
    assert!(!editor.undo());
    assert!(!editor.redo());
    assert!(editor.elements().is_empty());
}

#[test]
fn test_full_history_undoes_every_step() {
    let mut editor = EditorState::new();
    for i in 0..MAX_HISTORY {
        editor
            .add_element(Element::text(format!("line {i}"), 14.0))
            .expect("add");
    }

    let mut undone = 0;
    while editor.undo() {
        undone += 1;
    }
    assert_eq!(undone, MAX_HISTORY);
    assert!(editor.elements().is_empty());
    assert_eq!(editor.history_index(), Some(0));
}

#[test]
fn test_history_past_the_cap_keeps_latest_steps() {
    let mut editor = EditorState::new();
    let ids: Vec<ElementId> = (0..MAX_HISTORY + 10)
        .map(|i| {
            editor
                .add_element(Element::text(format!("line {i}"), 14.0))
                .expect("add")
        })
        .collect();
    // the live state plus one entry per reachable undo
    assert_eq!(editor.history().len(), MAX_HISTORY + 1);
    assert_eq!(editor.history_index(), Some(MAX_HISTORY));

    let mut undone = 0;
    while editor.undo() {
        undone += 1;
    }
    assert_eq!(undone, MAX_HISTORY);
    let remaining: Vec<ElementId> = editor.elements().iter().map(|e| e.id.clone()).collect();
    assert_eq!(remaining, ids[..10].to_vec());

    while editor.redo() {}
    assert_eq!(editor.elements().len(), MAX_HISTORY + 10);
}

// ============================================================================
// Elements and layers
// ============================================================================

#[test]
fn test_duplicate_then_reorder() {
    let mut editor = EditorState::new();
    let logo = editor
        .add_element(Element::image("https://cdn.example/logo.png").at(600.0, 40.0))
        .expect("add");
    let copy = editor.duplicate_element(&logo).expect("duplicate");

    let top = editor.render_order().last().map(|e| e.id.clone());
    assert_eq!(top, Some(copy.clone()));

    editor.send_to_back(&copy).expect("send to back");
    let bottom = editor.render_order().first().map(|e| e.id.clone());
    assert_eq!(bottom, Some(copy.clone()));

    editor.bring_to_front(&copy).expect("bring to front");
    let top = editor.render_order().last().map(|e| e.id.clone());
    assert_eq!(top, Some(copy));
}

#[test]
fn test_patch_then_undo_restores_all_fields() {
    let mut editor = EditorState::new();
    let id = editor
        .add_element(Element::text("Hello", 24.0).at(10.0, 10.0))
        .expect("add");
    let before = editor.element(&id).cloned().expect("element");

    editor
        .update_element(
            &id,
            ElementPatch {
                x: Some(300.0),
                rotation: Some(30.0),
                scale_x: Some(-1.0),
                font_size: Some(12.0),
                fill: Some("#00539F".into()),
                ..ElementPatch::default()
            },
        )
        .expect("update");
    assert_ne!(editor.element(&id), Some(&before));

    assert!(editor.undo());
    assert_eq!(editor.element(&id), Some(&before));
}

// ============================================================================
// Guidelines and compliance
// ============================================================================

fn retailer_rules() -> GuidelineRules {
    GuidelineRules::from_value(serde_json::json!({
        "retailer_name": "Tesco",
        "ad_formats": [
            { "type": "Square", "width_px": 1080, "height_px": 1080, "aspect_ratio": "1:1" }
        ],
        "safe_zone": { "top": 10, "bottom": 10, "left": 10, "right": 10 },
        "text_requirements": { "min_font_size": 24, "max_characters": 40 },
        "file_size_max_kb": 500
    }))
    .expect("rules")
}

#[test]
fn test_guidelines_switch_format_and_check() {
    let mut editor = EditorState::new();
    let headline = editor
        .add_element(Element::text("Fresh", 18.0).at(400.0, 300.0))
        .expect("add");

    editor.set_guidelines(retailer_rules()).expect("guidelines");
    assert_eq!(editor.format().label, "Square (1080x1080)");

    // centered on 800x600 stays centered on 1080x1080
    let moved = editor.element(&headline).expect("headline");
    assert!((moved.transform.x - 540.0).abs() < 1e-3);
    assert!((moved.transform.y - 540.0).abs() < 1e-3);

    let violations = editor.check_compliance().to_vec();
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].kind, ViolationKind::Text);
    assert_eq!(violations[0].severity, Severity::Warning);
    assert_eq!(editor.warning_count(), 1);
    assert_eq!(editor.error_count(), 0);
}

#[test]
fn test_corner_image_left_and_top_only() {
    let mut editor = EditorState::new();
    editor
        .set_guidelines(GuidelineRules {
            safe_zone: Some(SafeZone::uniform(10.0)),
            ..GuidelineRules::default()
        })
        .expect("guidelines");
    editor
        .add_element(Element::image("a.png").at(0.0, 0.0).with_size(50.0, 50.0))
        .expect("add");

    let violations = editor.check_compliance();
    let messages: Vec<_> = violations.iter().map(|v| v.message.as_str()).collect();
    assert_eq!(
        messages,
        vec![
            "Element \"Image\" extends into left safe zone",
            "Element \"Image\" extends into top safe zone",
        ]
    );
}

#[test]
fn test_format_switch_is_not_reversible_by_inverse() {
    let mut editor = EditorState::new();
    let id = editor
        .add_element(Element::text("Edge", 20.0).at(250.0, 100.0))
        .expect("add");

    editor
        .set_format(CanvasFormat::new(1920.0, 600.0, "Wide"))
        .expect("wide");
    editor.set_format(CanvasFormat::default()).expect("back");

    // 250/800 is near-left, so x is kept both ways; y likewise
    let element = editor.element(&id).expect("element");
    assert!((element.transform.x - 250.0).abs() < 1e-3);
    // scale compounds: min(2.4, 1.0) then min(1/2.4, 1.0)
    assert!((element.transform.scale_x - 1.0 / 2.4).abs() < 1e-4);
}

// ============================================================================
// Persistence
// ============================================================================

#[test]
fn test_save_and_reload_project() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = ProjectStore::open(dir.path()).expect("store");

    let mut editor = EditorState::new();
    editor.set_project_name("Autumn Launch");
    editor.set_guidelines(retailer_rules()).expect("guidelines");
    editor
        .add_element(Element::text("Autumn", 32.0).at(300.0, 300.0))
        .expect("add");
    store
        .save_project(editor.to_saved_project(1_700_000_000_000))
        .expect("save");
    store.save_state(&editor.persisted_state()).expect("autosave");

    let project = store
        .find_project("Autumn Launch")
        .expect("find")
        .expect("present");
    let mut reloaded = EditorState::new();
    reloaded.load_project(project);

    assert_eq!(reloaded.elements(), editor.elements());
    assert_eq!(reloaded.format(), editor.format());
    assert_eq!(
        reloaded.guidelines().and_then(|g| g.retailer_name.as_deref()),
        Some("Tesco")
    );
    assert!(!reloaded.can_undo());

    let autosaved = store.load_state().expect("load").expect("present");
    let restored = EditorState::restore(autosaved);
    assert_eq!(restored.project_name(), "Autumn Launch");
    assert_eq!(restored.elements().len(), 1);
}
