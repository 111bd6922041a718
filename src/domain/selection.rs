//! Selection as root-to-leaf object paths.
//!
//! A business object may be displayed at several tree positions, so the object alone does
//! not say which row is selected. Paths do, as long as the graph does not change under them.

use std::collections::HashSet;
use std::fmt;

use itertools::Itertools;
use tracing::{debug, instrument, trace};

use crate::domain::arena::{NodeId, NodeStore};
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::model::BusinessModel;
use crate::domain::payload::{RowObject, RowPayload};

/// Objects from the root down to the selected one. The last element is the selection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SelectionPath<R>(Vec<RowPayload<R>>);

impl<R> SelectionPath<R> {
    pub fn new(elements: Vec<RowPayload<R>>) -> Self {
        Self(elements)
    }

    pub fn from_rows(rows: impl IntoIterator<Item = R>) -> Self {
        Self(rows.into_iter().map(RowPayload::Persisted).collect())
    }

    pub fn elements(&self) -> &[RowPayload<R>] {
        &self.0
    }

    pub fn leaf(&self) -> Option<&RowPayload<R>> {
        self.0.last()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<RowPayload<R>> {
        self.0
    }
}

impl<R: PartialEq> SelectionPath<R> {
    pub fn contains(&self, row: &RowPayload<R>) -> bool {
        self.0.contains(row)
    }
}

impl<R: Clone + PartialEq> SelectionPath<R> {
    /// Replaces every occurrence of `old` with `new`, leaving the rest of the path as is.
    pub fn replace(&mut self, old: &RowPayload<R>, new: &RowPayload<R>) -> bool {
        let mut replaced = false;
        for element in self.0.iter_mut().filter(|e| *e == old) {
            *element = new.clone();
            replaced = true;
        }
        replaced
    }
}

impl<R: fmt::Display> fmt::Display for SelectionPath<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.iter().join(" / "))
    }
}

/// Builds a path ending in `row`.
///
/// Walks up through the business model until it hits an object that already has a node,
/// whose tree path then completes the result. With several parents, the first one not yet
/// on the path is taken. Fails if every parent is already on the path.
#[instrument(level = "debug", skip(store, model))]
pub fn build_path<R: RowObject>(
    store: &NodeStore<R>,
    model: &dyn BusinessModel<R>,
    row: &RowPayload<R>,
) -> DomainResult<SelectionPath<R>> {
    let mut seen: HashSet<RowPayload<R>> = HashSet::new();
    let mut reversed: Vec<RowPayload<R>> = Vec::new();
    let mut current = row.clone();

    loop {
        seen.insert(current.clone());
        if let Some(node) = store.first_node_for(&current) {
            reversed.extend(store.row_path(node).into_iter().rev());
            break;
        }
        reversed.push(current.clone());

        let parents: Vec<RowPayload<R>> = match &current {
            RowPayload::Persisted(r) => model
                .parents_of(r)
                .into_iter()
                .map(RowPayload::Persisted)
                .collect(),
            RowPayload::Transient(p) => p
                .container()
                .cloned()
                .map(RowPayload::Persisted)
                .into_iter()
                .collect(),
        };
        if parents.is_empty() {
            trace!("reached top-level object");
            break;
        }
        match parents.into_iter().find(|p| !seen.contains(p)) {
            Some(parent) => current = parent,
            None => {
                return Err(DomainError::CycleDetected {
                    object: format!("{:?}", current),
                    path: format!("{:?}", reversed.iter().rev().collect::<Vec<_>>()),
                })
            }
        }
    }

    reversed.reverse();
    Ok(SelectionPath(reversed))
}

/// Maps stored paths to nodes.
///
/// A node whose tree path equals the stored path wins. If no node of the leaf matches,
/// some other node of the same object is selected instead, unless that object is already
/// selected through an exact match. Leaves without nodes are dropped.
#[instrument(level = "debug", skip_all, fields(paths = paths.len()))]
pub fn resolve_paths<R: RowObject>(store: &NodeStore<R>, paths: &[SelectionPath<R>]) -> Vec<NodeId> {
    let mut exact: Vec<NodeId> = Vec::new();
    let mut fallbacks: Vec<(RowPayload<R>, NodeId)> = Vec::new();

    for path in paths {
        let Some(leaf) = path.leaf() else {
            continue;
        };
        let mut matched = false;
        let mut different = None;
        for &node in store.nodes_for(leaf) {
            if store.row_path(node) == path.elements() {
                if !exact.contains(&node) {
                    exact.push(node);
                }
                matched = true;
            } else {
                different = Some(node);
            }
        }
        if let (false, Some(node)) = (matched, different) {
            match fallbacks.iter_mut().find(|(row, _)| row == leaf) {
                Some(entry) => entry.1 = node,
                None => fallbacks.push((leaf.clone(), node)),
            }
        }
    }

    let exact_rows: HashSet<&RowPayload<R>> = exact.iter().filter_map(|&n| store.payload(n)).collect();
    let fallback_nodes: Vec<NodeId> = fallbacks
        .iter()
        .filter(|(row, _)| !exact_rows.contains(row))
        .map(|&(_, node)| node)
        .collect();
    if !fallback_nodes.is_empty() {
        debug!(count = fallback_nodes.len(), "selecting nodes with different paths");
    }
    for node in fallback_nodes {
        if !exact.contains(&node) {
            exact.push(node);
        }
    }
    exact
}

/// Whether `path` may be applied as a selection.
pub fn is_valid_path<R: RowObject>(model: &dyn BusinessModel<R>, path: &SelectionPath<R>) -> bool {
    let elements = path.elements();
    let Some(last) = elements.last() else {
        return false;
    };
    if let RowPayload::Persisted(row) = last {
        if !model.is_valid(row) || !model.supports_row(row) {
            return false;
        }
    }
    if elements.len() == 1 {
        return true;
    }

    let is_persisted_valid = |e: &RowPayload<R>| e.persisted().is_some_and(|r| model.is_valid(r));
    let inner = &elements[1..elements.len() - 1];
    if !is_persisted_valid(&elements[0]) || !inner.iter().all(is_persisted_valid) {
        return false;
    }

    elements.iter().tuple_windows().all(|(parent, child)| match (parent, child) {
        (RowPayload::Persisted(parent), RowPayload::Persisted(child)) => {
            model.parents_of(child).contains(parent)
        }
        // only a trailing placeholder gets here, its container is not a model parent yet
        _ => true,
    })
}

/// Recomputes selection paths after the set of selected objects changed.
///
/// Paths whose leaf stays selected are kept; newly selected objects get a path from
/// `build`. Returns `None` when the selected objects did not change.
pub fn merge_object_selection<R, F>(
    current: &[SelectionPath<R>],
    selected: &[RowPayload<R>],
    mut build: F,
) -> DomainResult<Option<Vec<SelectionPath<R>>>>
where
    R: RowObject,
    F: FnMut(&RowPayload<R>) -> DomainResult<SelectionPath<R>>,
{
    if selected.is_empty() {
        return Ok(if current.is_empty() { None } else { Some(Vec::new()) });
    }

    let mut kept: Vec<SelectionPath<R>> = Vec::new();
    let mut kept_leaves: HashSet<&RowPayload<R>> = HashSet::new();
    let mut deselected = false;
    for path in current {
        match path.leaf() {
            Some(leaf) if selected.contains(leaf) => {
                kept.push(path.clone());
                kept_leaves.insert(leaf);
            }
            _ => deselected = true,
        }
    }
    if !deselected && selected.iter().all(|s| kept_leaves.contains(s)) {
        return Ok(None);
    }

    for row in selected.iter().unique() {
        if !kept_leaves.contains(row) {
            kept.push(build(row)?);
        }
    }
    Ok(Some(kept))
}

/// Current selection paths plus whether they still match the node store.
#[derive(Debug, Clone)]
pub struct SelectionTracker<R> {
    paths: Vec<SelectionPath<R>>,
    valid: bool,
}

impl<R> Default for SelectionTracker<R> {
    fn default() -> Self {
        Self {
            paths: Vec::new(),
            valid: true,
        }
    }
}

impl<R: Clone + PartialEq> SelectionTracker<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn paths(&self) -> &[SelectionPath<R>] {
        &self.paths
    }

    pub fn set_paths(&mut self, paths: Vec<SelectionPath<R>>) {
        self.paths = paths;
        self.valid = true;
    }

    pub fn clear(&mut self) {
        self.set_paths(Vec::new());
    }

    /// Marks the paths as possibly stale. They are kept for revalidation.
    pub fn invalidate(&mut self) {
        self.valid = false;
    }

    pub fn mark_valid(&mut self) {
        self.valid = true;
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn leaves(&self) -> impl Iterator<Item = &RowPayload<R>> {
        self.paths.iter().filter_map(SelectionPath::leaf)
    }

    /// Rewrites `old` to `new` inside every path; returns the number of paths touched.
    pub fn replace_object(&mut self, old: &RowPayload<R>, new: &RowPayload<R>) -> usize {
        self.paths
            .iter_mut()
            .map(|path| path.replace(old, new))
            .filter(|&replaced| replaced)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;

    struct Edges(Vec<(&'static str, &'static str)>);

    impl BusinessModel<String> for Edges {
        fn parents_of(&self, row: &String) -> Vec<String> {
            self.0
                .iter()
                .filter(|(_, c)| c == row)
                .map(|(p, _)| p.to_string())
                .collect()
        }

        fn children_of(&self, row: &String) -> Vec<String> {
            self.0
                .iter()
                .filter(|(p, _)| p == row)
                .map(|(_, c)| c.to_string())
                .collect()
        }

        fn is_valid(&self, row: &String) -> bool {
            row != "deleted"
        }
    }

    fn p(s: &str) -> RowPayload<String> {
        RowPayload::from(s.to_string())
    }

    fn path(rows: &[&str]) -> SelectionPath<String> {
        SelectionPath::from_rows(rows.iter().map(|s| s.to_string()))
    }

    fn setup() -> (Arc<Edges>, NodeStore<String>) {
        let model = Arc::new(Edges(vec![
            ("root", "a"),
            ("root", "b"),
            ("a", "x"),
            ("b", "x"),
            ("root", "deleted"),
        ]));
        let mut store = NodeStore::with_model(model.clone(), p("root"), false);
        store.expand_all().unwrap();
        (model, store)
    }

    #[test]
    fn given_displayed_object_when_building_path_then_uses_tree_path() {
        let (model, store) = setup();
        let built = build_path(&store, &*model, &p("x")).unwrap();
        assert_eq!(built, path(&["root", "a", "x"]));
        assert_eq!(resolve_paths(&store, &[built]), vec![store.nodes_for(&p("x"))[0]]);
    }

    #[test]
    fn given_stale_path_when_resolving_then_falls_back_to_same_object() {
        let (_model, store) = setup();
        let nodes = resolve_paths(&store, &[path(&["root", "c", "x"])]);
        assert_eq!(nodes.len(), 1);
        assert_eq!(store.payload(nodes[0]), Some(&p("x")));
    }

    #[test]
    fn given_exact_and_stale_path_for_same_leaf_when_resolving_then_only_exact() {
        let (_model, store) = setup();
        let nodes = resolve_paths(&store, &[path(&["root", "c", "x"]), path(&["root", "b", "x"])]);
        assert_eq!(nodes, vec![store.nodes_for(&p("x"))[1]]);
    }

    #[test]
    fn given_paths_when_validated_then_checks_parent_links_and_validity() {
        let (model, _store) = setup();
        assert!(is_valid_path(&*model, &path(&["root", "b", "x"])));
        assert!(!is_valid_path(&*model, &path(&["root", "x"])));
        assert!(!is_valid_path(&*model, &path(&["root", "deleted"])));
        assert!(!is_valid_path(&*model, &path(&[])));
    }

    #[test]
    fn given_unchanged_objects_when_merging_then_none() {
        let (model, store) = setup();
        let current = vec![path(&["root", "b", "x"])];
        let build = |row: &RowPayload<String>| build_path(&store, &*model, row);
        let merged = merge_object_selection(&current, &[p("x")], build).unwrap();
        assert_eq!(merged, None);

        let merged = merge_object_selection(&current, &[p("x"), p("a")], build)
            .unwrap()
            .unwrap();
        assert_eq!(merged, vec![path(&["root", "b", "x"]), path(&["root", "a"])]);
    }

    #[test]
    fn given_tracker_when_replacing_object_then_paths_rewritten_in_place() {
        let mut tracker = SelectionTracker::new();
        tracker.set_paths(vec![path(&["root", "a", "x"]), path(&["root", "b"])]);
        assert_eq!(tracker.replace_object(&p("a"), &p("n")), 1);
        assert_eq!(tracker.paths()[0], path(&["root", "n", "x"]));

        let leaves: HashMap<_, _> = tracker.leaves().map(|l| (l.to_string(), ())).collect();
        assert!(leaves.contains_key("x") && leaves.contains_key("b"));
    }
}
