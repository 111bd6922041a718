use generational_arena::{Arena, Index};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument, trace, warn};

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::index::RowIndex;
use crate::domain::model::BusinessModel;
use crate::domain::payload::{RowObject, RowPayload};
use crate::domain::position::ContextPosition;

/// Handle of a node in the [`NodeStore`]. Stale handles never alias new nodes.
pub type NodeId = Index;

/// Tree node wrapping one row payload at one tree position.
#[derive(Debug)]
pub struct GridNode<R> {
    pub(crate) payload: RowPayload<R>,
    /// Index of parent node in the arena, None for the root
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    /// Children have been loaded from the business model
    pub(crate) initialized: bool,
    pub(crate) expanded: bool,
}

impl<R> GridNode<R> {
    pub fn payload(&self) -> &RowPayload<R> {
        &self.payload
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn is_expanded(&self) -> bool {
        self.expanded
    }
}

/// Builds nodes and lazily supplies their children.
pub trait NodeFactory<R>: Send + Sync {
    fn create_node(&self, payload: RowPayload<R>, parent: Option<NodeId>) -> GridNode<R> {
        GridNode {
            payload,
            parent,
            children: Vec::new(),
            initialized: false,
            expanded: false,
        }
    }

    /// Child objects of `payload` in display order.
    fn load_children(&self, payload: &RowPayload<R>) -> Vec<R>;

    /// Finite stores may be expanded completely.
    fn is_finite(&self) -> bool {
        true
    }
}

/// Loads children straight from the business model.
pub struct ModelNodeFactory<R> {
    model: Arc<dyn BusinessModel<R>>,
}

impl<R> ModelNodeFactory<R> {
    pub fn new(model: Arc<dyn BusinessModel<R>>) -> Self {
        Self { model }
    }
}

impl<R: RowObject> NodeFactory<R> for ModelNodeFactory<R> {
    fn load_children(&self, payload: &RowPayload<R>) -> Vec<R> {
        match payload {
            RowPayload::Transient(_) => Vec::new(),
            RowPayload::Persisted(row) if self.model.is_leaf(row) => Vec::new(),
            RowPayload::Persisted(row) => self.model.children_of(row),
        }
    }

    fn is_finite(&self) -> bool {
        self.model.can_expand_all()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructureEvent<R> {
    Added { node: NodeId, row: RowPayload<R> },
    Removed { node: NodeId, row: RowPayload<R> },
    /// The whole store was rebuilt or its row numbering changed.
    Invalidated,
}

pub type StructureListener<R> = Box<dyn FnMut(&StructureEvent<R>) + Send>;

/// Arena-backed tree of grid nodes with its [`RowIndex`].
///
/// Every structural mutation updates the index in the same call, so the two never
/// drift apart outside of a method body. Children are materialized on first expansion.
pub struct NodeStore<R: RowObject> {
    arena: Arena<GridNode<R>>,
    root: NodeId,
    root_visible: bool,
    index: RowIndex<R>,
    factory: Box<dyn NodeFactory<R>>,
    listeners: Vec<StructureListener<R>>,
}

impl<R: RowObject> fmt::Debug for NodeStore<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeStore")
            .field("root", &self.root)
            .field("root_visible", &self.root_visible)
            .field("nodes", &self.arena.len())
            .field("indexed_rows", &self.index.len())
            .finish_non_exhaustive()
    }
}

impl<R: RowObject> NodeStore<R> {
    pub fn new(factory: Box<dyn NodeFactory<R>>, root: RowPayload<R>, root_visible: bool) -> Self {
        let mut arena = Arena::new();
        let root = arena.insert(factory.create_node(root, None));
        let mut store = Self {
            arena,
            root,
            root_visible,
            index: RowIndex::new(),
            factory,
            listeners: Vec::new(),
        };
        store.prepare_root();
        store
    }

    pub fn with_model(
        model: Arc<dyn BusinessModel<R>>,
        root: RowPayload<R>,
        root_visible: bool,
    ) -> Self {
        Self::new(Box::new(ModelNodeFactory::new(model)), root, root_visible)
    }

    fn prepare_root(&mut self) {
        let root = self.root;
        let Some(node) = self.arena.get_mut(root) else {
            return;
        };
        node.expanded = !self.root_visible;
        self.index.index_node(node.payload.clone(), root);
        if !self.root_visible {
            // Invisible roots are always expanded and thus need their children.
            if let Err(e) = self.ensure_initialized(root) {
                warn!(error = %e, "cannot load children of root");
            }
        }
    }

    /// Drops every node and starts over with a fresh root. Listeners stay registered.
    #[instrument(level = "debug", skip(self))]
    pub fn reset(&mut self, root: RowPayload<R>) {
        self.arena.clear();
        self.index.clear();
        self.root = self.arena.insert(self.factory.create_node(root, None));
        self.prepare_root();
        self.notify(StructureEvent::Invalidated);
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn is_root_visible(&self) -> bool {
        self.root_visible
    }

    pub fn is_finite(&self) -> bool {
        self.factory.is_finite()
    }

    pub fn get(&self, id: NodeId) -> Option<&GridNode<R>> {
        self.arena.get(id)
    }

    fn node(&self, id: NodeId) -> DomainResult<&GridNode<R>> {
        self.arena
            .get(id)
            .ok_or_else(|| DomainError::NodeNotFound(format!("{:?}", id)))
    }

    fn node_mut(&mut self, id: NodeId) -> DomainResult<&mut GridNode<R>> {
        self.arena
            .get_mut(id)
            .ok_or_else(|| DomainError::NodeNotFound(format!("{:?}", id)))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.arena.contains(id)
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub fn payload(&self, id: NodeId) -> Option<&RowPayload<R>> {
        self.arena.get(id).map(|n| &n.payload)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.arena.get(id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.arena
            .get(id)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn child_index(&self, parent: NodeId, child: NodeId) -> Option<usize> {
        self.children(parent).iter().position(|&c| c == child)
    }

    pub fn index(&self) -> &RowIndex<R> {
        &self.index
    }

    pub fn nodes_for(&self, row: &RowPayload<R>) -> &[NodeId] {
        self.index.nodes_for(row)
    }

    pub fn first_node_for(&self, row: &RowPayload<R>) -> Option<NodeId> {
        self.index.first_node_for(row)
    }

    pub fn on_structure_change(&mut self, listener: impl FnMut(&StructureEvent<R>) + Send + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub(crate) fn notify(&mut self, event: StructureEvent<R>) {
        for listener in self.listeners.iter_mut() {
            listener(&event);
        }
    }

    /// Loads the children of `id` from the factory on first access.
    ///
    /// Lazily materialized nodes are not reported to structure listeners.
    #[instrument(level = "trace", skip(self))]
    pub fn ensure_initialized(&mut self, id: NodeId) -> DomainResult<()> {
        let node = self.node(id)?;
        if node.initialized {
            return Ok(());
        }
        let payload = node.payload.clone();
        let rows = self.factory.load_children(&payload);
        trace!(children = rows.len(), "materializing children");

        let mut children = Vec::with_capacity(rows.len());
        for row in rows {
            let payload = RowPayload::Persisted(row);
            let child = self.arena.insert(self.factory.create_node(payload.clone(), Some(id)));
            self.index.index_node(payload, child);
            children.push(child);
        }
        let node = self.node_mut(id)?;
        node.children = children;
        node.initialized = true;
        Ok(())
    }

    pub fn set_expanded(&mut self, id: NodeId, expanded: bool) -> DomainResult<()> {
        if !expanded && id == self.root && !self.root_visible {
            return Ok(());
        }
        if expanded {
            self.ensure_initialized(id)?;
        }
        self.node_mut(id)?.expanded = expanded;
        Ok(())
    }

    pub fn is_expanded(&self, id: NodeId) -> bool {
        self.arena.get(id).is_some_and(|n| n.expanded)
    }

    /// Expands every node reachable from the root.
    ///
    /// Nodes whose row already occurs among their ancestors stay collapsed, so cyclic
    /// graphs terminate.
    #[instrument(level = "debug", skip(self))]
    pub fn expand_all(&mut self) -> DomainResult<()> {
        if !self.factory.is_finite() {
            return Err(DomainError::UnboundedTree);
        }
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            let payload = self.node(id)?.payload.clone();
            let repeats_ancestor = self
                .ancestors(id)
                .any(|ancestor| self.payload(ancestor) == Some(&payload));
            if repeats_ancestor {
                continue;
            }
            self.ensure_initialized(id)?;
            let node = self.node_mut(id)?;
            if !node.children.is_empty() {
                node.expanded = true;
            }
            stack.extend(node.children.iter().rev().copied());
        }
        Ok(())
    }

    #[instrument(level = "debug", skip(self))]
    pub fn collapse_all(&mut self) {
        let root = self.root;
        let keep_root = !self.root_visible;
        for (id, node) in self.arena.iter_mut() {
            if !(keep_root && id == root) {
                node.expanded = false;
            }
        }
    }

    fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&p| self.parent(p))
    }

    fn attach(&mut self, parent: NodeId, payload: RowPayload<R>, at: usize) -> DomainResult<NodeId> {
        let node = self.factory.create_node(payload.clone(), Some(parent));
        let child = self.arena.insert(node);
        let siblings = &mut self.node_mut(parent)?.children;
        let at = at.min(siblings.len());
        siblings.insert(at, child);
        self.index.index_node(payload.clone(), child);
        self.notify(StructureEvent::Added {
            node: child,
            row: payload,
        });
        Ok(child)
    }

    /// Creates and indexes a child of `parent` at `position`.
    #[instrument(level = "debug", skip(self))]
    pub fn create_child(
        &mut self,
        parent: NodeId,
        payload: RowPayload<R>,
        position: &ContextPosition<R>,
    ) -> DomainResult<NodeId> {
        if let ContextPosition::Before(context) | ContextPosition::After(context) = position {
            self.check_sibling(parent, context)?;
        }
        self.ensure_initialized(parent)?;
        let at = match position {
            ContextPosition::Start => 0,
            ContextPosition::End => self.children(parent).len(),
            ContextPosition::Before(context) => self.sibling_index(parent, context)?,
            ContextPosition::After(context) => self.sibling_index(parent, context)? + 1,
            ContextPosition::Auto => self.auto_index(parent, &payload)?,
        };
        let child = self.attach(parent, payload, at)?;
        debug!(?child, at, "created child");
        Ok(child)
    }

    fn sibling_index(&self, parent: NodeId, context: &R) -> DomainResult<usize> {
        self.children(parent)
            .iter()
            .position(|&c| self.payload(c).and_then(RowPayload::persisted) == Some(context))
            .ok_or_else(|| self.position_not_found(parent, context))
    }

    /// Fails when `context` is not a child of `parent`, without materializing the children.
    fn check_sibling(&self, parent: NodeId, context: &R) -> DomainResult<()> {
        let node = self.node(parent)?;
        if node.initialized {
            return self.sibling_index(parent, context).map(|_| ());
        }
        if self.factory.load_children(&node.payload).contains(context) {
            Ok(())
        } else {
            Err(self.position_not_found(parent, context))
        }
    }

    fn position_not_found(&self, parent: NodeId, context: &R) -> DomainError {
        DomainError::PositionNotFound {
            parent: self
                .payload(parent)
                .map(|p| format!("{:?}", p))
                .unwrap_or_default(),
            context: format!("{:?}", context),
        }
    }

    /// Insert position following the model's child order; unknown rows go to the end.
    fn auto_index(&self, parent: NodeId, payload: &RowPayload<R>) -> DomainResult<usize> {
        let siblings = self.children(parent);
        let Some(row) = payload.persisted() else {
            return Ok(siblings.len());
        };
        let order = self.factory.load_children(&self.node(parent)?.payload);
        let Some(target) = order.iter().position(|r| r == row) else {
            return Ok(siblings.len());
        };
        let at = siblings.iter().position(|&sibling| {
            self.payload(sibling)
                .and_then(RowPayload::persisted)
                .and_then(|r| order.iter().position(|o| o == r))
                .is_some_and(|i| i > target)
        });
        Ok(at.unwrap_or(siblings.len()))
    }

    /// Detaches the `index`-th child of `parent` and deindexes its whole subtree.
    #[instrument(level = "debug", skip(self))]
    pub fn remove_child(&mut self, parent: NodeId, index: usize) -> DomainResult<RowPayload<R>> {
        let siblings = &mut self.node_mut(parent)?.children;
        if index >= siblings.len() {
            return Err(DomainError::NodeNotFound(format!(
                "child {} of {:?}",
                index, parent
            )));
        }
        let child = siblings.remove(index);

        let subtree: Vec<NodeId> = self.iter_postorder_from(child).map(|(id, _)| id).collect();
        let mut removed_payload = None;
        for id in subtree {
            if let Some(node) = self.arena.remove(id) {
                self.index.deindex_node(&node.payload, id);
                if id == child {
                    removed_payload = Some(node.payload);
                }
            }
        }
        let row = removed_payload.ok_or_else(|| DomainError::NodeNotFound(format!("{:?}", child)))?;
        self.notify(StructureEvent::Removed {
            node: child,
            row: row.clone(),
        });
        Ok(row)
    }

    /// Removes `id` from its parent. Returns `false` for the root, which cannot be removed.
    pub fn remove_node(&mut self, id: NodeId) -> DomainResult<bool> {
        let Some(parent) = self.node(id)?.parent else {
            return Ok(false);
        };
        let index = self
            .child_index(parent, id)
            .ok_or_else(|| DomainError::IndexDesync(format!("{:?} missing in its parent", id)))?;
        self.remove_child(parent, index)?;
        Ok(true)
    }

    /// Swaps the payload of `id` keeping node identity, children and expansion.
    #[instrument(level = "debug", skip(self))]
    pub fn replace_payload(&mut self, id: NodeId, payload: RowPayload<R>) -> DomainResult<RowPayload<R>> {
        let node = self.node_mut(id)?;
        let old = std::mem::replace(&mut node.payload, payload.clone());
        if old.is_transient() && node.children.is_empty() {
            // The persisted object may bring its own children.
            node.initialized = false;
            node.expanded = false;
        }
        self.index.deindex_node(&old, id);
        self.index.index_node(payload, id);
        Ok(old)
    }

    pub fn set_root_visible(&mut self, visible: bool) -> DomainResult<()> {
        if self.root_visible == visible {
            return Ok(());
        }
        self.root_visible = visible;
        if !visible {
            let root = self.root;
            self.set_expanded(root, true)?;
        }
        self.notify(StructureEvent::Invalidated);
        Ok(())
    }

    /// Whether `id` currently has a row on screen.
    pub fn is_displayed(&self, id: NodeId) -> bool {
        if !self.contains(id) {
            return false;
        }
        self.ancestors(id).all(|a| self.is_expanded(a))
    }

    fn own_rows(&self, id: NodeId) -> usize {
        usize::from(id != self.root || self.root_visible)
    }

    /// Number of rows `id` and its expanded descendants occupy.
    pub fn visible_subtree_size(&self, id: NodeId) -> usize {
        let mut size = 0;
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(node) = self.arena.get(current) else {
                continue;
            };
            size += self.own_rows(current);
            if node.expanded && node.initialized {
                stack.extend(node.children.iter().copied());
            }
        }
        size
    }

    pub fn visible_row_count(&self) -> usize {
        self.visible_subtree_size(self.root)
    }

    /// Row number at which the subtree of `id` starts.
    pub fn row_position(&self, id: NodeId) -> usize {
        let mut position = 0;
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            let preceding: usize = self
                .children(parent)
                .iter()
                .take_while(|&&c| c != current)
                .map(|&c| self.visible_subtree_size(c))
                .sum();
            position += self.own_rows(parent) + preceding;
            current = parent;
        }
        position
    }

    /// Nodes currently on screen, in row order.
    pub fn displayed_rows(&self) -> Vec<NodeId> {
        let mut rows = Vec::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            let Some(node) = self.arena.get(id) else {
                continue;
            };
            if self.own_rows(id) == 1 {
                rows.push(id);
            }
            if node.expanded {
                stack.extend(node.children.iter().rev().copied());
            }
        }
        rows
    }

    /// Node ids from the root down to `id`.
    pub fn path_to_root(&self, id: NodeId) -> Vec<NodeId> {
        if !self.contains(id) {
            return Vec::new();
        }
        let mut path: Vec<NodeId> = std::iter::once(id).chain(self.ancestors(id)).collect();
        path.reverse();
        path
    }

    /// Row payloads from the root down to `id`.
    pub fn row_path(&self, id: NodeId) -> Vec<RowPayload<R>> {
        self.path_to_root(id)
            .into_iter()
            .filter_map(|n| self.payload(n).cloned())
            .collect()
    }

    pub fn iter_preorder(&self) -> TreeIterator<'_, R> {
        TreeIterator::new(self, self.root)
    }

    pub fn iter_postorder_from(&self, start: NodeId) -> PostOrderIterator<'_, R> {
        PostOrderIterator::new(self, start)
    }

    /// Height of the materialized tree.
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut stack = vec![(self.root, 1)];
        while let Some((id, level)) = stack.pop() {
            let Some(node) = self.get(id) else {
                continue;
            };
            depth = depth.max(level);
            stack.extend(node.children.iter().map(|&child| (child, level + 1)));
        }
        depth
    }

    /// Checks that the index holds exactly the nodes of the arena.
    pub fn verify_index(&self) -> DomainResult<()> {
        for (id, node) in self.arena.iter() {
            if !self.index.nodes_for(&node.payload).contains(&id) {
                return Err(DomainError::IndexDesync(format!(
                    "node {:?} for {:?} not indexed",
                    id, node.payload
                )));
            }
        }
        let mut seen = HashSet::new();
        for (payload, nodes) in self.index.iter() {
            for &id in nodes {
                match self.arena.get(id) {
                    Some(node) if &node.payload == payload => {}
                    _ => {
                        return Err(DomainError::IndexDesync(format!(
                            "stale index entry {:?} for {:?}",
                            id, payload
                        )))
                    }
                }
                if !seen.insert(id) {
                    return Err(DomainError::IndexDesync(format!("{:?} indexed twice", id)));
                }
            }
        }
        Ok(())
    }
}

pub struct TreeIterator<'a, R: RowObject> {
    store: &'a NodeStore<R>,
    stack: Vec<NodeId>,
}

impl<'a, R: RowObject> TreeIterator<'a, R> {
    fn new(store: &'a NodeStore<R>, start: NodeId) -> Self {
        Self {
            store,
            stack: vec![start],
        }
    }
}

impl<'a, R: RowObject> Iterator for TreeIterator<'a, R> {
    type Item = (NodeId, &'a GridNode<R>);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(current) = self.stack.pop() {
            if let Some(node) = self.store.get(current) {
                // Push children in reverse order for left-to-right traversal
                self.stack.extend(node.children.iter().rev().copied());
                return Some((current, node));
            }
        }
        None
    }
}

pub struct PostOrderIterator<'a, R: RowObject> {
    store: &'a NodeStore<R>,
    stack: Vec<(NodeId, bool)>,
}

impl<'a, R: RowObject> PostOrderIterator<'a, R> {
    fn new(store: &'a NodeStore<R>, start: NodeId) -> Self {
        Self {
            store,
            stack: vec![(start, false)],
        }
    }
}

impl<'a, R: RowObject> Iterator for PostOrderIterator<'a, R> {
    type Item = (NodeId, &'a GridNode<R>);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((current, visited)) = self.stack.pop() {
            if let Some(node) = self.store.get(current) {
                if visited {
                    return Some((current, node));
                }
                self.stack.push((current, true));
                for &child in node.children.iter().rev() {
                    self.stack.push((child, false));
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct Edges(HashMap<&'static str, Vec<&'static str>>);

    impl BusinessModel<String> for Edges {
        fn parents_of(&self, row: &String) -> Vec<String> {
            self.0
                .iter()
                .filter(|(_, children)| children.contains(&row.as_str()))
                .map(|(p, _)| p.to_string())
                .collect()
        }

        fn children_of(&self, row: &String) -> Vec<String> {
            self.0
                .get(row.as_str())
                .map(|c| c.iter().map(|s| s.to_string()).collect())
                .unwrap_or_default()
        }
    }

    fn store(root_visible: bool) -> NodeStore<String> {
        let edges = Edges(HashMap::from([
            ("root", vec!["a", "b"]),
            ("a", vec!["a1", "a2", "a3"]),
        ]));
        NodeStore::with_model(Arc::new(edges), RowPayload::from("root".to_string()), root_visible)
    }

    fn row(s: &str) -> RowPayload<String> {
        RowPayload::from(s.to_string())
    }

    fn child_rows(store: &NodeStore<String>, id: NodeId) -> Vec<String> {
        store
            .children(id)
            .iter()
            .filter_map(|&c| store.payload(c))
            .map(|p| p.to_string())
            .collect()
    }

    #[test]
    fn given_invisible_root_when_created_then_root_expanded_and_children_loaded() {
        let store = store(false);
        assert!(store.is_expanded(store.root()));
        assert_eq!(child_rows(&store, store.root()), vec!["a", "b"]);
        assert_eq!(store.visible_row_count(), 2);
        assert!(store.verify_index().is_ok());
    }

    #[test]
    fn given_collapsed_node_when_expanded_then_children_materialized() {
        let mut store = store(true);
        assert_eq!(store.len(), 1);
        store.set_expanded(store.root(), true).unwrap();
        let a = store.first_node_for(&row("a")).unwrap();
        assert!(!store.get(a).unwrap().is_initialized());

        store.set_expanded(a, true).unwrap();
        assert_eq!(child_rows(&store, a), vec!["a1", "a2", "a3"]);
        // root, a, a1, a2, a3, b
        assert_eq!(store.visible_row_count(), 6);
        assert_eq!(store.row_position(store.first_node_for(&row("b")).unwrap()), 5);
    }

    #[test]
    fn given_unknown_sibling_when_creating_below_collapsed_node_then_children_not_loaded() {
        let mut store = store(false);
        let a = store.first_node_for(&row("a")).unwrap();

        let result = store.create_child(a, row("n"), &ContextPosition::After("zz".to_string()));

        assert!(matches!(result, Err(DomainError::PositionNotFound { .. })));
        assert!(!store.get(a).unwrap().is_initialized());
        assert_eq!(store.len(), 3);

        store
            .create_child(a, row("n"), &ContextPosition::Before("a2".to_string()))
            .unwrap();
        assert_eq!(child_rows(&store, a), vec!["a1", "n", "a2", "a3"]);
    }

    /// n0 -> n1 -> ... -> n{len}
    struct Chain(usize);

    impl BusinessModel<String> for Chain {
        fn parents_of(&self, row: &String) -> Vec<String> {
            match row[1..].parse::<usize>() {
                Ok(i) if i > 0 => vec![format!("n{}", i - 1)],
                _ => Vec::new(),
            }
        }

        fn children_of(&self, row: &String) -> Vec<String> {
            match row[1..].parse::<usize>() {
                Ok(i) if i < self.0 => vec![format!("n{}", i + 1)],
                _ => Vec::new(),
            }
        }
    }

    #[test]
    fn given_very_deep_chain_when_measured_then_no_recursion_limit() {
        let len = 100_000;
        let mut store = NodeStore::with_model(Arc::new(Chain(len)), row("n0"), true);
        let mut id = store.root();
        for _ in 0..len {
            store.set_expanded(id, true).unwrap();
            id = store.children(id)[0];
        }

        assert_eq!(store.visible_row_count(), len + 1);
        assert_eq!(store.row_position(id), len);
        assert_eq!(store.depth(), len + 1);
    }

    #[test]
    fn given_positions_when_creating_children_then_inserted_accordingly() {
        let mut store = store(false);
        let a = store.first_node_for(&row("a")).unwrap();
        store.set_expanded(a, true).unwrap();
        store.remove_child(a, 1).unwrap(); // drop a2

        store.create_child(a, row("s"), &ContextPosition::Start).unwrap();
        store.create_child(a, row("e"), &ContextPosition::End).unwrap();
        store
            .create_child(a, row("b1"), &ContextPosition::Before("a3".to_string()))
            .unwrap();
        store
            .create_child(a, row("x"), &ContextPosition::After("a1".to_string()))
            .unwrap();
        store.create_child(a, row("a2"), &ContextPosition::Auto).unwrap();

        assert_eq!(
            child_rows(&store, a),
            vec!["s", "a1", "x", "b1", "a2", "a3", "e"]
        );
        assert!(store.verify_index().is_ok());
    }

    #[test]
    fn given_unknown_context_when_creating_before_then_position_not_found() {
        let mut store = store(false);
        let root = store.root();
        let result = store.create_child(root, row("n"), &ContextPosition::Before("zz".to_string()));
        assert!(matches!(result, Err(DomainError::PositionNotFound { .. })));
        assert_eq!(child_rows(&store, root), vec!["a", "b"]);
    }

    #[test]
    fn given_subtree_when_removed_then_all_descendants_deindexed_once() {
        let mut store = store(false);
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        store.on_structure_change(move |e| sink.lock().unwrap().push(e.clone()));

        let a = store.first_node_for(&row("a")).unwrap();
        store.set_expanded(a, true).unwrap();
        assert!(store.remove_node(a).unwrap());

        assert!(store.nodes_for(&row("a1")).is_empty());
        assert!(store.nodes_for(&row("a")).is_empty());
        assert!(!store.contains(a));
        assert!(store.verify_index().is_ok());
        let events = events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], StructureEvent::Removed { row, .. } if row == &RowPayload::from("a".to_string())));
    }

    #[test]
    fn given_root_when_removed_then_refused() {
        let mut store = store(false);
        let root = store.root();
        assert!(!store.remove_node(root).unwrap());
        assert!(store.contains(root));
    }

    #[test]
    fn given_expanded_tree_when_collapsed_all_then_invisible_root_stays_expanded() {
        let mut store = store(false);
        store.expand_all().unwrap();
        assert_eq!(store.visible_row_count(), 5);
        store.collapse_all();
        assert!(store.is_expanded(store.root()));
        assert_eq!(store.visible_row_count(), 2);
    }

    #[test]
    fn given_tree_when_iterated_then_preorder_and_postorder() {
        let mut store = store(true);
        store.expand_all().unwrap();
        let pre: Vec<String> = store
            .iter_preorder()
            .map(|(_, n)| n.payload().to_string())
            .collect();
        assert_eq!(pre, vec!["root", "a", "a1", "a2", "a3", "b"]);
        let post: Vec<String> = store
            .iter_postorder_from(store.root())
            .map(|(_, n)| n.payload().to_string())
            .collect();
        assert_eq!(post, vec!["a1", "a2", "a3", "a", "b", "root"]);
        assert_eq!(store.depth(), 3);
    }
}
