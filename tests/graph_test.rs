//! Tests for the in-memory graph and its collaborators

use std::fs;
use std::sync::Arc;

use tempfile::TempDir;

use gridsync::domain::{BusinessModel, CreateError, CreateHandler, EditBuffer, UnitOfWork};
use gridsync::infrastructure::{GraphCreateHandler, InMemoryGraph, InMemoryUnitOfWork, InfraError};

const GRAPH: &str = r#"
root = "root"

[[objects]]
id = "root"
children = ["a", "b"]

[[objects]]
id = "a"
children = ["x"]

[[objects]]
id = "b"
children = ["x", "old"]

[[objects]]
id = "old"
deleted = true
"#;

// ============================================================
// Loading
// ============================================================

#[test]
fn given_toml_file_when_loaded_then_edges_and_deletions_read() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("graph.toml");
    fs::write(&file, GRAPH).unwrap();

    let graph = InMemoryGraph::load(&file).unwrap();

    assert_eq!(graph.root(), "root");
    assert_eq!(graph.children_of(&"b".to_string()), vec!["x"]);
    assert_eq!(graph.parents_of(&"x".to_string()), vec!["a", "b"]);
    assert!(!graph.is_valid(&"old".to_string()));
    assert!(graph.can_expand_all());
}

#[test]
fn given_missing_file_when_loaded_then_io_error() {
    let temp = TempDir::new().unwrap();

    let result = InMemoryGraph::load(&temp.path().join("missing.toml"));

    assert!(matches!(result, Err(InfraError::Io { .. })));
}

#[test]
fn given_broken_toml_when_parsed_then_parse_error() {
    let result = InMemoryGraph::parse("root = [", "inline");

    assert!(matches!(result, Err(InfraError::Parse { ref path, .. }) if path == "inline"));
}

#[test]
fn given_unbounded_flag_when_parsed_then_expand_all_not_allowed() {
    let graph = InMemoryGraph::parse("root = \"r\"\nunbounded = true\n", "inline").unwrap();

    assert!(!graph.can_expand_all());
}

// ============================================================
// Mutation
// ============================================================

#[test]
fn given_graph_when_edges_changed_then_model_reflects_changes() {
    let graph = InMemoryGraph::from_edges("r", &[("r", "a"), ("r", "b")]);

    graph.insert_child("r", 1, "m");
    assert_eq!(graph.children_of(&"r".to_string()), vec!["a", "m", "b"]);

    assert!(graph.remove_child("r", "a"));
    assert!(!graph.remove_child("r", "a"));
    graph.set_children("b", &["b1", "b2"]);

    assert_eq!(graph.children_of(&"r".to_string()), vec!["m", "b"]);
    assert_eq!(graph.objects(), vec!["b", "b1", "b2", "m", "r"]);
}

#[test]
fn given_deleted_object_when_queried_then_gone_everywhere() {
    let graph = InMemoryGraph::from_edges("r", &[("r", "a"), ("a", "x"), ("r", "x")]);

    graph.delete("x");

    assert!(graph.children_of(&"a".to_string()).is_empty());
    assert!(graph.parents_of(&"x".to_string()).is_empty());
    assert!(!graph.is_valid(&"x".to_string()));
}

#[test]
fn given_other_graph_when_replace_with_then_content_taken_over() {
    let graph = InMemoryGraph::from_edges("r", &[("r", "a")]);
    let other = InMemoryGraph::from_edges("r", &[("r", "b")]);

    graph.replace_with(&other);

    assert_eq!(graph.children_of(&"r".to_string()), vec!["b"]);
}

// ============================================================
// Collaborators
// ============================================================

#[test]
fn given_name_when_created_then_added_below_container() {
    let graph = Arc::new(InMemoryGraph::from_edges("r", &[("r", "a")]));
    let handler = GraphCreateHandler::new(graph.clone());
    let mut values = EditBuffer::new();
    values.set("name", "n");

    let created = handler.create(Some(&"r".to_string()), None, &values).unwrap();

    assert_eq!(created, "n");
    assert_eq!(graph.children_of(&"r".to_string()), vec!["a", "n"]);
}

#[test]
fn given_no_name_when_created_then_id_generated() {
    let graph = Arc::new(InMemoryGraph::from_edges("r", &[]));
    let handler = GraphCreateHandler::new(graph.clone());

    let created = handler
        .create(Some(&"r".to_string()), None, &EditBuffer::new())
        .unwrap();

    assert_eq!(created.len(), 36);
    assert_eq!(graph.children_of(&"r".to_string()), vec![created]);
}

#[test]
fn given_no_container_when_created_then_rejected() {
    let graph = Arc::new(InMemoryGraph::from_edges("r", &[]));
    let handler = GraphCreateHandler::new(graph);

    let result = handler.create(None, None, &EditBuffer::new());

    assert_eq!(result, Err(CreateError::MissingContainer));
}

#[test]
fn given_unit_of_work_when_transactions_end_then_counted() {
    let uow = InMemoryUnitOfWork::new();

    uow.begin_transaction().unwrap().commit().unwrap();
    uow.begin_transaction().unwrap().rollback();
    uow.set_fail_commit(true);
    let failed = uow.begin_transaction().unwrap().commit();

    assert!(failed.is_err());
    assert_eq!(uow.commits(), 1);
    assert_eq!(uow.rollbacks(), 1);
}
