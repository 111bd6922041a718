//! Tree grid handler
//!
//! Keeps a lazily expanded tree of grid nodes in sync with a business graph in which
//! objects may have several parents.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use itertools::Itertools;
use tracing::{debug, info, instrument, trace};

use crate::application::grid_handler::GridHandler;
use crate::config::GridSettings;
use crate::domain::{
    build_path, is_valid_path, preserve_viewport, resolve_paths, update_children,
    update_old_parent, BusinessModel, ChildDiff, ContextPosition, DomainError, DomainResult,
    NodeId, NodeStore, RowObject, RowPayload, SelectionPath, SelectionTracker, StructureEvent,
    ViewportState,
};

/// Grid handler backed by a [`NodeStore`] tree.
pub struct TreeGridHandler<R: RowObject> {
    model: Arc<dyn BusinessModel<R>>,
    root: RowPayload<R>,
    store: NodeStore<R>,
    settings: GridSettings,
    selection: SelectionTracker<R>,
    selected: Vec<NodeId>,
    viewport: ViewportState,
    invalid: bool,
}

fn reconcile<R: RowObject>(
    store: &mut NodeStore<R>,
    model: &dyn BusinessModel<R>,
    node: NodeId,
) -> DomainResult<ChildDiff<R>> {
    let mut diff = update_children(store, model, node)?;
    if store.contains(node) {
        diff.extend(update_old_parent(store, model, node)?);
    }
    Ok(diff)
}

impl<R: RowObject> TreeGridHandler<R> {
    pub fn new(
        model: Arc<dyn BusinessModel<R>>,
        root_row: R,
        settings: GridSettings,
    ) -> DomainResult<Self> {
        Self::with_root(model, RowPayload::Persisted(root_row), settings)
    }

    /// Grid whose root may also be a placeholder, e.g. while a new top-level object is created.
    pub fn with_root(
        model: Arc<dyn BusinessModel<R>>,
        root: RowPayload<R>,
        settings: GridSettings,
    ) -> DomainResult<Self> {
        let store = NodeStore::with_model(Arc::clone(&model), root.clone(), settings.root_visible);
        let mut handler = Self {
            model,
            root,
            store,
            settings,
            selection: SelectionTracker::new(),
            selected: Vec::new(),
            viewport: ViewportState::default(),
            invalid: false,
        };
        handler.expand_root()?;
        Ok(handler)
    }

    fn expand_root(&mut self) -> DomainResult<()> {
        if self.settings.expand_root {
            let root = self.store.root();
            self.store.set_expanded(root, true)?;
        }
        Ok(())
    }

    pub fn store(&self) -> &NodeStore<R> {
        &self.store
    }

    pub fn settings(&self) -> &GridSettings {
        &self.settings
    }

    pub fn root_row(&self) -> &RowPayload<R> {
        &self.root
    }

    pub fn viewport(&self) -> ViewportState {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: ViewportState) {
        self.viewport = viewport;
    }

    pub fn on_structure_change(
        &mut self,
        listener: impl FnMut(&StructureEvent<R>) + Send + 'static,
    ) {
        self.store.on_structure_change(listener);
    }

    /// Whether the stored selection paths still match the selected nodes.
    pub fn is_selection_valid(&self) -> bool {
        self.selection.is_valid()
    }

    /// Reconciles every node of `row` and of its current parents with the model.
    #[instrument(level = "debug", skip(self))]
    pub fn update_row_model(&mut self, row: &R) -> DomainResult<ChildDiff<R>> {
        if !self.model.supports_row(row) {
            trace!("row not supported by grid");
            return Ok(ChildDiff::default());
        }
        let model = Arc::clone(&self.model);
        let mut diff = self.update_new_parents(row)?;

        let nodes = self.store.nodes_for(&RowPayload::Persisted(row.clone())).to_vec();
        for node in nodes {
            if !self.store.contains(node) {
                continue;
            }
            let node_diff = if self.store.is_displayed(node) {
                preserve_viewport(&mut self.store, &mut self.viewport, node, |store| {
                    reconcile(store, model.as_ref(), node)
                })?
            } else {
                reconcile(&mut self.store, model.as_ref(), node)?
            };
            diff.extend(node_diff);
        }
        self.drop_removed_from_selection();
        Ok(diff)
    }

    fn update_new_parents(&mut self, row: &R) -> DomainResult<ChildDiff<R>> {
        let model = Arc::clone(&self.model);
        let mut diff = ChildDiff::default();
        for parent in model.parents_of(row) {
            let nodes = self.store.nodes_for(&RowPayload::Persisted(parent)).to_vec();
            for node in nodes {
                if self.store.contains(node) {
                    diff.extend(update_children(&mut self.store, model.as_ref(), node)?);
                }
            }
        }
        Ok(diff)
    }

    pub fn update_row_models(&mut self, rows: &[R]) -> DomainResult<ChildDiff<R>> {
        let mut diff = ChildDiff::default();
        for row in rows {
            diff.extend(self.update_row_model(row)?);
        }
        Ok(diff)
    }

    /// Handles a change notification for `changed`.
    pub fn receive_model_changed(&mut self, changed: &R) -> DomainResult<ChildDiff<R>> {
        let rows = self.model.nodes_to_update(changed);
        self.update_row_models(&rows)
    }

    /// Handles objects created outside of the grid.
    pub fn handle_creations(&mut self, created: &[R]) -> DomainResult<ChildDiff<R>> {
        let mut diff = ChildDiff::default();
        for object in created {
            let rows = self.model.nodes_to_update(object);
            diff.extend(self.update_row_models(&rows)?);
            if self
                .store
                .nodes_for(&RowPayload::Persisted(object.clone()))
                .is_empty()
            {
                diff.extend(self.update_row_model(object)?);
            }
        }
        Ok(diff)
    }

    fn add_new_row_guarded(&mut self, row: &R, visiting: &mut HashSet<R>) -> DomainResult<bool> {
        if !visiting.insert(row.clone()) {
            return Ok(false);
        }
        let mut created = false;
        for parent in self.model.parents_of(row) {
            created |= self.add_to_parent(&parent, row, visiting)?;
        }
        Ok(created)
    }

    fn add_to_parent(&mut self, parent: &R, row: &R, visiting: &mut HashSet<R>) -> DomainResult<bool> {
        let parent_payload = RowPayload::Persisted(parent.clone());
        if self.store.nodes_for(&parent_payload).is_empty() {
            self.add_new_row_guarded(parent, visiting)?;
        }

        let mut created = false;
        let payload = RowPayload::Persisted(row.clone());
        for node in self.store.nodes_for(&parent_payload).to_vec() {
            let Some(parent_node) = self.store.get(node) else {
                continue;
            };
            // Uninitialized parents pick the row up when they are expanded.
            if !parent_node.is_initialized() {
                continue;
            }
            let present = parent_node
                .children()
                .iter()
                .any(|&c| self.store.payload(c) == Some(&payload));
            if !present {
                self.store.create_child(node, payload.clone(), &ContextPosition::Auto)?;
                created = true;
            }
        }
        Ok(created)
    }

    pub fn expand(&mut self, node: NodeId) -> DomainResult<()> {
        self.store.set_expanded(node, true)
    }

    /// Collapses `node`, moving selected descendants to the collapsed node if configured.
    pub fn collapse(&mut self, node: NodeId) -> DomainResult<()> {
        let displayed = self.store.is_displayed(node);
        self.store.set_expanded(node, false)?;
        if !self.settings.adjust_selection_when_collapsing || !displayed {
            return Ok(());
        }

        let mut adjusted = false;
        let mut selected = Vec::with_capacity(self.selected.len());
        for &sel in &self.selected {
            let hidden = sel != node && self.store.path_to_root(sel).contains(&node);
            let target = if hidden {
                adjusted = true;
                self.nearest_valid_ancestor(node)
            } else {
                Some(sel)
            };
            if let Some(target) = target {
                if !selected.contains(&target) {
                    selected.push(target);
                }
            }
        }
        if adjusted {
            debug!(count = selected.len(), "moved selection to collapsed node");
            let paths = selected
                .iter()
                .map(|&n| SelectionPath::new(self.store.row_path(n)))
                .collect();
            self.selection.set_paths(paths);
            self.selected = selected;
        }
        Ok(())
    }

    fn nearest_valid_ancestor(&self, start: NodeId) -> Option<NodeId> {
        let mut path = self.store.path_to_root(start);
        path.reverse();
        path.into_iter().find(|&n| {
            let selectable = n != self.store.root() || self.store.is_root_visible();
            selectable
                && match self.store.payload(n) {
                    Some(RowPayload::Persisted(row)) => self.model.is_valid(row),
                    Some(RowPayload::Transient(_)) => true,
                    None => false,
                }
        })
    }

    pub fn expand_all(&mut self) -> DomainResult<()> {
        self.store.expand_all()
    }

    pub fn collapse_all(&mut self) {
        self.store.collapse_all();
    }

    /// Shows or hides the root row. Row numbering changes, so the selection is re-checked.
    pub fn set_root_visible(&mut self, visible: bool) -> DomainResult<()> {
        self.settings.root_visible = visible;
        self.store.set_root_visible(visible)?;
        self.selection.invalidate();
        if !visible {
            let root = self.store.root();
            self.selected.retain(|&n| n != root);
        }
        Ok(())
    }

    /// Re-resolves stored paths against the current nodes, dropping invalid ones.
    pub fn revalidate_selection(&mut self) -> DomainResult<Vec<NodeId>> {
        let paths: Vec<SelectionPath<R>> = self
            .selection
            .paths()
            .iter()
            .filter(|p| is_valid_path(self.model.as_ref(), p))
            .cloned()
            .collect();
        self.set_selection(paths)
    }

    /// Switches the grid to a different root object; takes effect on revalidation.
    pub fn set_root_row(&mut self, root: RowPayload<R>) {
        self.root = root;
        self.invalidate();
    }

    fn drop_removed_from_selection(&mut self) {
        let before = self.selected.len();
        let store = &self.store;
        self.selected.retain(|&n| store.contains(n));
        if self.selected.len() != before {
            debug!("selected node removed, selection needs revalidation");
            self.selection.invalidate();
        }
    }
}

impl<R: RowObject> GridHandler<R> for TreeGridHandler<R> {
    type Node = NodeId;

    fn model(&self) -> &Arc<dyn BusinessModel<R>> {
        &self.model
    }

    fn add_new_row(&mut self, row: &R) -> DomainResult<bool> {
        let mut visiting = HashSet::new();
        self.add_new_row_guarded(row, &mut visiting)
    }

    #[instrument(level = "debug", skip(self))]
    fn remove_row(&mut self, row: &RowPayload<R>) -> DomainResult<()> {
        for node in self.store.nodes_for(row).to_vec() {
            if !self.store.contains(node) {
                continue;
            }
            if !self.store.remove_node(node)? {
                info!("root row removed, invalidating grid");
                self.invalidate();
            }
        }
        self.drop_removed_from_selection();
        Ok(())
    }

    #[instrument(level = "debug", skip(self, row))]
    fn create_row(
        &mut self,
        context: Option<&R>,
        position: &ContextPosition<R>,
        row: RowPayload<R>,
    ) -> DomainResult<NodeId> {
        let parents: &[NodeId] = match context {
            Some(context) => self.store.nodes_for(&RowPayload::Persisted(context.clone())),
            None => &[],
        };
        let parent = match parents {
            [] => {
                return Err(DomainError::NoContextObject {
                    context: context.map(|c| format!("{:?}", c)),
                })
            }
            [parent] => *parent,
            _ => {
                return Err(DomainError::ContextNotUnique {
                    context: format!("{:?}", context),
                    count: parents.len(),
                })
            }
        };
        let node = self.store.create_child(parent, row, position)?;
        self.store.set_expanded(parent, true)?;
        Ok(node)
    }

    fn update_row(&mut self, row: &R, structure_change: bool) -> DomainResult<()> {
        if structure_change {
            self.update_row_model(row)?;
        }
        Ok(())
    }

    fn nodes_for_row(&self, row: &RowPayload<R>) -> Vec<NodeId> {
        self.store.nodes_for(row).to_vec()
    }

    fn row_of(&self, node: &NodeId) -> Option<RowPayload<R>> {
        self.store.payload(*node).cloned()
    }

    fn path_of(&self, node: &NodeId) -> SelectionPath<R> {
        SelectionPath::new(self.store.row_path(*node))
    }

    fn build_path(&self, row: &RowPayload<R>) -> DomainResult<SelectionPath<R>> {
        build_path(&self.store, self.model.as_ref(), row)
    }

    #[instrument(level = "debug", skip_all, fields(paths = paths.len()))]
    fn set_selection(&mut self, mut paths: Vec<SelectionPath<R>>) -> DomainResult<Vec<NodeId>> {
        if !self.settings.multi_selection {
            paths.truncate(1);
        }
        let mut nodes = resolve_paths(&self.store, &paths);
        if !self.store.is_root_visible() {
            let root = self.store.root();
            nodes.retain(|&n| n != root);
        }
        if !self.settings.multi_selection {
            nodes.truncate(1);
        }

        for &node in &nodes {
            let ancestors = self.store.path_to_root(node);
            for &ancestor in ancestors.iter().take(ancestors.len().saturating_sub(1)) {
                self.store.set_expanded(ancestor, true)?;
            }
            if self.settings.expand_selected {
                self.store.set_expanded(node, true)?;
            }
        }

        self.selection.set_paths(paths);
        self.selected = nodes.clone();
        Ok(nodes)
    }

    fn selected_nodes(&self) -> &[NodeId] {
        &self.selected
    }

    fn selection_paths(&self) -> &[SelectionPath<R>] {
        self.selection.paths()
    }

    #[instrument(level = "debug", skip(self))]
    fn replace_row(&mut self, old: &RowPayload<R>, new: RowPayload<R>) -> DomainResult<()> {
        for node in self.store.nodes_for(old).to_vec() {
            self.store.replace_payload(node, new.clone())?;
        }
        let rewritten = self.selection.replace_object(old, &new);
        trace!(rewritten, "rewrote selection paths");
        if old == &self.root {
            self.root = new;
        }
        debug_assert!(self.store.verify_index().is_ok());
        Ok(())
    }

    fn sort_rows(&self, rows: &[RowPayload<R>]) -> Vec<RowPayload<R>> {
        let mut order: HashMap<&RowPayload<R>, usize> = HashMap::new();
        for (position, (_, node)) in self.store.iter_preorder().enumerate() {
            order.entry(node.payload()).or_insert(position);
        }
        rows.iter()
            .sorted_by_key(|row| order.get(row).copied().unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }

    fn expansion_state(&self) -> Vec<R> {
        let root = self.store.root();
        let hidden_root = !self.store.is_root_visible();
        self.store
            .iter_preorder()
            .filter(|(id, node)| node.is_expanded() && !(hidden_root && *id == root))
            .filter_map(|(_, node)| node.payload().persisted().cloned())
            .unique()
            .collect()
    }

    fn set_expansion_state(&mut self, expanded: &[R]) -> DomainResult<()> {
        let wanted: HashSet<&R> = expanded.iter().collect();
        let mut stack = vec![self.store.root()];
        while let Some(node) = stack.pop() {
            let Some(payload) = self.store.payload(node) else {
                continue;
            };
            let expand = payload.persisted().is_some_and(|r| wanted.contains(r));
            let path = self.store.row_path(node);
            let repeats_ancestor = path[..path.len().saturating_sub(1)].contains(payload);
            if repeats_ancestor {
                continue;
            }
            if expand {
                self.store.set_expanded(node, true)?;
            }
            if self.store.is_expanded(node) {
                stack.extend(self.store.children(node).iter().rev().copied());
            }
        }
        Ok(())
    }

    fn invalidate(&mut self) {
        self.invalid = true;
        self.selection.invalidate();
    }

    fn is_invalid(&self) -> bool {
        self.invalid
    }

    #[instrument(level = "debug", skip(self))]
    fn revalidate(&mut self) -> DomainResult<()> {
        let expansion = self.expansion_state();
        let paths = self.selection.paths().to_vec();

        self.store.reset(self.root.clone());
        self.selected.clear();
        self.expand_root()?;
        self.set_expansion_state(&expansion)?;

        let model = Arc::clone(&self.model);
        let valid = paths
            .into_iter()
            .filter(|p| is_valid_path(model.as_ref(), p))
            .collect();
        self.invalid = false;
        self.set_selection(valid)?;
        info!(rows = self.store.visible_row_count(), "grid rebuilt");
        Ok(())
    }
}
