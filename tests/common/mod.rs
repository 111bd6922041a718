//! Shared fixtures for integration tests
#![allow(dead_code)]

use std::sync::Arc;

use gridsync::application::services::TreeGridHandler;
use gridsync::config::GridSettings;
use gridsync::domain::{BusinessModel, NodeId, RowPayload, SelectionPath};
use gridsync::infrastructure::InMemoryGraph;
use gridsync::util::testing;

/// root -> a, b, c; a -> a1, a2; b -> shared; c -> shared
///
/// Fully expanded with a hidden root the rows are:
/// `a(0) a1(1) a2(2) b(3) shared(4) c(5) shared(6)`
pub fn sample_graph() -> Arc<InMemoryGraph> {
    testing::init_test_setup();
    Arc::new(InMemoryGraph::from_edges(
        "root",
        &[
            ("root", "a"),
            ("root", "b"),
            ("root", "c"),
            ("a", "a1"),
            ("a", "a2"),
            ("b", "shared"),
            ("c", "shared"),
        ],
    ))
}

pub fn tree_handler(graph: &Arc<InMemoryGraph>) -> TreeGridHandler<String> {
    tree_handler_with(graph, GridSettings::default())
}

pub fn tree_handler_with(graph: &Arc<InMemoryGraph>, settings: GridSettings) -> TreeGridHandler<String> {
    let model: Arc<dyn BusinessModel<String>> = graph.clone();
    TreeGridHandler::new(model, graph.root(), settings).unwrap()
}

pub fn expanded_handler(graph: &Arc<InMemoryGraph>) -> TreeGridHandler<String> {
    let mut handler = tree_handler(graph);
    handler.expand_all().unwrap();
    handler
}

pub fn persisted(id: &str) -> RowPayload<String> {
    RowPayload::Persisted(id.to_string())
}

pub fn path(ids: &[&str]) -> SelectionPath<String> {
    SelectionPath::from_rows(ids.iter().map(|s| s.to_string()))
}

/// Labels of the rows on screen, in order.
pub fn displayed(handler: &TreeGridHandler<String>) -> Vec<String> {
    let store = handler.store();
    store
        .displayed_rows()
        .into_iter()
        .filter_map(|n| store.payload(n).map(|p| p.to_string()))
        .collect()
}

/// Node for `id` under the parent chain `ids`, e.g. `["root", "c", "shared"]`.
pub fn node_at(handler: &TreeGridHandler<String>, ids: &[&str]) -> NodeId {
    let store = handler.store();
    let wanted: Vec<RowPayload<String>> = ids.iter().map(|s| persisted(s)).collect();
    let leaf = wanted.last().unwrap();
    store
        .nodes_for(leaf)
        .iter()
        .copied()
        .find(|&n| store.row_path(n) == wanted)
        .unwrap_or_else(|| panic!("no node at {ids:?}"))
}
