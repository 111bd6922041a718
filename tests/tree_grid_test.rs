//! Tests for TreeGridHandler
//!
//! The fixture graph has a shared object below two parents, see `common::sample_graph`.

mod common;

use std::sync::{Arc, Mutex};

use rstest::rstest;

use common::{displayed, expanded_handler, node_at, path, persisted, sample_graph, tree_handler, tree_handler_with};
use gridsync::application::GridHandler;
use gridsync::config::GridSettings;
use gridsync::domain::{ContextPosition, DomainError, StructureEvent, ViewportState};
use gridsync::infrastructure::InMemoryGraph;

// ============================================================
// Construction and expansion
// ============================================================

#[test]
fn given_sample_graph_when_built_then_top_level_rows_displayed() {
    let graph = sample_graph();

    let handler = tree_handler(&graph);

    assert_eq!(displayed(&handler), vec!["a", "b", "c"]);
    assert!(!handler.is_invalid());
}

#[test]
fn given_sample_graph_when_expand_all_then_shared_object_shown_twice() {
    let graph = sample_graph();

    let handler = expanded_handler(&graph);

    assert_eq!(
        displayed(&handler),
        vec!["a", "a1", "a2", "b", "shared", "c", "shared"]
    );
    assert_eq!(handler.store().nodes_for(&persisted("shared")).len(), 2);
}

#[test]
fn given_visible_root_when_built_then_root_is_first_row() {
    let graph = sample_graph();
    let settings = GridSettings {
        root_visible: true,
        ..Default::default()
    };

    let handler = tree_handler_with(&graph, settings);

    assert_eq!(displayed(&handler), vec!["root", "a", "b", "c"]);
}

#[test]
fn given_unbounded_graph_when_expand_all_then_refused() {
    let graph = sample_graph();
    graph.set_unbounded(true);
    let mut handler = tree_handler(&graph);

    let result = handler.expand_all();

    assert_eq!(result, Err(DomainError::UnboundedTree));
}

#[test]
fn given_cyclic_graph_when_expand_all_then_terminates() {
    let graph = Arc::new(InMemoryGraph::from_edges(
        "root",
        &[("root", "p"), ("p", "x"), ("x", "p")],
    ));
    let mut handler = tree_handler(&graph);

    handler.expand_all().unwrap();

    // the repeated p is shown but not expanded again
    assert_eq!(displayed(&handler), vec!["p", "x", "p"]);
}

// ============================================================
// Structural updates
// ============================================================

#[test]
fn given_new_child_when_update_row_model_then_row_inserted_in_model_order() {
    let graph = sample_graph();
    let mut handler = expanded_handler(&graph);
    graph.insert_child("a", 1, "a15");

    let diff = handler.update_row_model(&"a".to_string()).unwrap();

    assert_eq!(diff.added, vec!["a15"]);
    assert!(diff.removed.is_empty());
    assert_eq!(
        displayed(&handler),
        vec!["a", "a1", "a15", "a2", "b", "shared", "c", "shared"]
    );
}

#[test]
fn given_removed_edge_when_update_row_model_then_only_that_occurrence_removed() {
    let graph = sample_graph();
    let mut handler = expanded_handler(&graph);
    graph.remove_child("b", "shared");

    let diff = handler.update_row_model(&"shared".to_string()).unwrap();

    assert_eq!(diff.removed, vec!["shared"]);
    assert_eq!(handler.store().nodes_for(&persisted("shared")).len(), 1);
    assert_eq!(displayed(&handler), vec!["a", "a1", "a2", "b", "c", "shared"]);
    assert!(handler.store().verify_index().is_ok());
}

#[test]
fn given_collapsed_parent_when_child_added_then_row_appears_on_expand() {
    let graph = sample_graph();
    let mut handler = tree_handler(&graph);
    graph.add_child("a", "a3");

    let diff = handler.update_row_model(&"a".to_string()).unwrap();
    let a = node_at(&handler, &["root", "a"]);
    handler.expand(a).unwrap();

    assert!(diff.is_empty());
    assert_eq!(displayed(&handler), vec!["a", "a1", "a2", "a3", "b", "c"]);
}

#[test]
fn given_deleted_object_when_update_row_model_then_all_occurrences_removed() {
    let graph = sample_graph();
    let mut handler = expanded_handler(&graph);
    graph.delete("shared");

    handler.update_row_model(&"b".to_string()).unwrap();
    handler.update_row_model(&"c".to_string()).unwrap();

    assert!(handler.store().nodes_for(&persisted("shared")).is_empty());
    assert_eq!(displayed(&handler), vec!["a", "a1", "a2", "b", "c"]);
}

#[test]
fn given_changed_leaf_when_receive_model_changed_then_children_loaded() {
    let graph = sample_graph();
    let mut handler = expanded_handler(&graph);
    graph.add_child("a1", "z");

    let diff = handler.receive_model_changed(&"a1".to_string()).unwrap();

    assert_eq!(diff.added, vec!["z"]);
    assert_eq!(handler.store().nodes_for(&persisted("z")).len(), 1);
}

#[test]
fn given_externally_created_object_when_handle_creations_then_row_added() {
    let graph = sample_graph();
    let mut handler = expanded_handler(&graph);
    graph.add_child("b", "n");

    let diff = handler.handle_creations(&["n".to_string()]).unwrap();

    assert_eq!(diff.added, vec!["n"]);
    assert_eq!(
        displayed(&handler),
        vec!["a", "a1", "a2", "b", "shared", "n", "c", "shared"]
    );
}

#[test]
fn given_listener_when_row_added_then_event_received() {
    let graph = sample_graph();
    let mut handler = expanded_handler(&graph);
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    handler.on_structure_change(move |event| {
        if let StructureEvent::Added { row, .. } = event {
            sink.lock().unwrap().push(row.to_string());
        }
    });
    graph.add_child("c", "x");

    handler.update_row_model(&"c".to_string()).unwrap();

    assert_eq!(*events.lock().unwrap(), vec!["x"]);
}

// ============================================================
// Viewport preservation
// ============================================================

#[test]
fn given_anchor_below_change_when_row_added_then_anchor_shifts() {
    let graph = sample_graph();
    let mut handler = expanded_handler(&graph);
    handler.set_viewport(ViewportState::anchored_at(5));
    graph.add_child("a", "a3");

    handler.update_row_model(&"a".to_string()).unwrap();

    assert_eq!(handler.viewport().row_anchor.index, 6);
}

#[test]
fn given_anchor_above_change_when_row_added_then_anchor_kept() {
    let graph = sample_graph();
    let mut handler = expanded_handler(&graph);
    handler.set_viewport(ViewportState::anchored_at(2));
    graph.add_child("c", "x");

    handler.update_row_model(&"c".to_string()).unwrap();

    assert_eq!(handler.viewport().row_anchor.index, 2);
}

#[test]
fn given_anchor_below_change_when_rows_removed_then_anchor_moves_up() {
    let graph = sample_graph();
    let mut handler = expanded_handler(&graph);
    handler.set_viewport(ViewportState::anchored_at(5));
    graph.set_children("a", &["a2"]);

    handler.update_row_model(&"a".to_string()).unwrap();

    assert_eq!(handler.viewport().row_anchor.index, 4);
}

// ============================================================
// Row creation
// ============================================================

#[rstest]
#[case(ContextPosition::Start, vec!["a", "new", "a1", "a2"])]
#[case(ContextPosition::End, vec!["a", "a1", "a2", "new"])]
#[case(ContextPosition::Before("a2".to_string()), vec!["a", "a1", "new", "a2"])]
#[case(ContextPosition::After("a1".to_string()), vec!["a", "a1", "new", "a2"])]
fn given_position_when_create_row_then_row_placed_accordingly(
    #[case] position: ContextPosition<String>,
    #[case] expected: Vec<&str>,
) {
    let graph = sample_graph();
    let mut handler = tree_handler(&graph);

    handler
        .create_row(Some(&"a".to_string()), &position, persisted("new"))
        .unwrap();

    let rows = displayed(&handler);
    assert_eq!(rows[..4], expected[..]);
}

#[test]
fn given_shared_context_when_create_row_then_context_not_unique() {
    let graph = sample_graph();
    let mut handler = expanded_handler(&graph);

    let result = handler.create_row(
        Some(&"shared".to_string()),
        &ContextPosition::Auto,
        persisted("new"),
    );

    assert!(matches!(
        result,
        Err(DomainError::ContextNotUnique { count: 2, .. })
    ));
}

#[test]
fn given_unknown_context_when_create_row_then_no_context_object() {
    let graph = sample_graph();
    let mut handler = tree_handler(&graph);

    let result = handler.create_row(
        Some(&"nowhere".to_string()),
        &ContextPosition::Auto,
        persisted("new"),
    );

    assert!(matches!(result, Err(DomainError::NoContextObject { .. })));
}

#[test]
fn given_missing_sibling_when_create_row_before_then_position_not_found() {
    let graph = sample_graph();
    let mut handler = tree_handler(&graph);

    let result = handler.create_row(
        Some(&"a".to_string()),
        &ContextPosition::Before("b".to_string()),
        persisted("new"),
    );

    assert!(matches!(result, Err(DomainError::PositionNotFound { .. })));
}

// ============================================================
// Removal and revalidation
// ============================================================

#[test]
fn given_root_row_when_removed_then_grid_invalidated() {
    let graph = sample_graph();
    let mut handler = tree_handler(&graph);

    handler.remove_row(&persisted("root")).unwrap();

    assert!(handler.is_invalid());
}

#[test]
fn given_invalid_grid_when_revalidate_then_expansion_and_selection_restored() {
    let graph = sample_graph();
    let mut handler = tree_handler(&graph);
    let c = node_at(&handler, &["root", "c"]);
    handler.expand(c).unwrap();
    handler
        .set_selection(vec![path(&["root", "c", "shared"])])
        .unwrap();
    handler.invalidate();

    handler.revalidate().unwrap();

    assert!(!handler.is_invalid());
    assert_eq!(displayed(&handler), vec!["a", "b", "c", "shared"]);
    let selected = handler.selected_nodes().to_vec();
    assert_eq!(selected, vec![node_at(&handler, &["root", "c", "shared"])]);
}

#[test]
fn given_invalid_grid_with_stale_selection_when_revalidate_then_path_dropped() {
    let graph = sample_graph();
    let mut handler = expanded_handler(&graph);
    handler
        .set_selection(vec![path(&["root", "b", "shared"])])
        .unwrap();
    graph.remove_child("b", "shared");
    handler.invalidate();

    handler.revalidate().unwrap();

    assert!(handler.selected_nodes().is_empty());
    assert!(handler.selection_paths().is_empty());
}

#[test]
fn given_selected_root_when_root_hidden_then_selection_stale_until_revalidated() {
    let graph = sample_graph();
    let settings = GridSettings {
        root_visible: true,
        multi_selection: true,
        ..Default::default()
    };
    let mut handler = tree_handler_with(&graph, settings);
    let root = handler.store().root();
    let a = node_at(&handler, &["root", "a"]);
    handler
        .set_selection(vec![path(&["root"]), path(&["root", "a"])])
        .unwrap();
    assert_eq!(handler.selected_nodes(), &[root, a]);

    handler.set_root_visible(false).unwrap();

    assert_eq!(handler.selected_nodes(), &[a]);
    assert!(!handler.is_selection_valid());

    let nodes = handler.revalidate_selection().unwrap();

    assert_eq!(nodes, vec![a]);
    assert!(handler.is_selection_valid());
    assert_eq!(handler.selection_paths().len(), 2);

    handler.set_root_visible(true).unwrap();
    let nodes = handler.revalidate_selection().unwrap();

    assert_eq!(nodes, vec![root, a]);
}

// ============================================================
// Ordering and expansion state
// ============================================================

#[test]
fn given_rows_when_sort_rows_then_display_order() {
    let graph = sample_graph();
    let handler = expanded_handler(&graph);

    let sorted = handler.sort_rows(&[persisted("c"), persisted("a2"), persisted("b")]);

    assert_eq!(sorted, vec![persisted("a2"), persisted("b"), persisted("c")]);
}

#[test]
fn given_expanded_nodes_when_expansion_state_then_hidden_root_excluded() {
    let graph = sample_graph();
    let mut handler = tree_handler(&graph);
    let b = node_at(&handler, &["root", "b"]);
    handler.expand(b).unwrap();

    let state = handler.expansion_state();

    assert_eq!(state, vec!["b"]);
}

#[test]
fn given_expansion_state_when_applied_then_matching_nodes_expanded() {
    let graph = sample_graph();
    let mut handler = tree_handler(&graph);

    handler
        .set_expansion_state(&["a".to_string(), "c".to_string()])
        .unwrap();

    assert_eq!(displayed(&handler), vec!["a", "a1", "a2", "b", "c", "shared"]);
}
