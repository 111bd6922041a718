//! Reconciles materialized child nodes with the business model.
//!
//! Only additions and removals are detected. Children that are still present keep their
//! node and their position even when the model reports them in a different order.

use std::collections::HashMap;

use tracing::{debug, instrument, trace};

use crate::domain::arena::{NodeId, NodeStore};
use crate::domain::error::DomainResult;
use crate::domain::model::BusinessModel;
use crate::domain::payload::{RowObject, RowPayload};
use crate::domain::position::ContextPosition;
use crate::domain::viewport::{RowIndexAnchor, ViewportState};

/// Rows added and removed below one node by a reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildDiff<R> {
    pub added: Vec<R>,
    pub removed: Vec<R>,
}

impl<R> Default for ChildDiff<R> {
    fn default() -> Self {
        Self {
            added: Vec::new(),
            removed: Vec::new(),
        }
    }
}

impl<R> ChildDiff<R> {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }

    pub fn extend(&mut self, other: ChildDiff<R>) {
        self.added.extend(other.added);
        self.removed.extend(other.removed);
    }
}

/// Brings the children of `node` in line with `model.children_of`.
///
/// Nodes not yet initialized are skipped; their children are loaded fresh on expansion.
/// Transient children have no business key and are left untouched.
#[instrument(level = "debug", skip(store, model))]
pub fn update_children<R: RowObject>(
    store: &mut NodeStore<R>,
    model: &dyn BusinessModel<R>,
    node: NodeId,
) -> DomainResult<ChildDiff<R>> {
    let mut diff = ChildDiff::default();
    let Some(grid_node) = store.get(node) else {
        return Ok(diff);
    };
    if !grid_node.is_initialized() {
        trace!("node not initialized, nothing to reconcile");
        return Ok(diff);
    }
    let Some(parent_row) = grid_node.payload().persisted().cloned() else {
        return Ok(diff);
    };

    let mut old_children: HashMap<R, NodeId> = HashMap::new();
    let mut old_order: Vec<R> = Vec::new();
    for &child in grid_node.children() {
        if let Some(row) = store.payload(child).and_then(RowPayload::persisted) {
            if old_children.insert(row.clone(), child).is_none() {
                old_order.push(row.clone());
            }
        }
    }

    let mut added = Vec::new();
    for row in model.children_of(&parent_row) {
        if old_children.remove(&row).is_none() {
            added.push(row);
        }
    }

    for row in old_order {
        if let Some(child) = old_children.remove(&row) {
            store.remove_node(child)?;
            diff.removed.push(row);
        }
    }

    for row in added {
        store.create_child(node, RowPayload::Persisted(row.clone()), &ContextPosition::Auto)?;
        diff.added.push(row);
    }

    if !diff.is_empty() {
        debug!(
            added = diff.added.len(),
            removed = diff.removed.len(),
            "reconciled children"
        );
    }
    debug_assert!(store.verify_index().is_ok());
    Ok(diff)
}

/// Reconciles the parent of `node`, dropping the edge if the model no longer reports it.
pub fn update_old_parent<R: RowObject>(
    store: &mut NodeStore<R>,
    model: &dyn BusinessModel<R>,
    node: NodeId,
) -> DomainResult<ChildDiff<R>> {
    match store.parent(node) {
        Some(parent) => update_children(store, model, parent),
        None => Ok(ChildDiff::default()),
    }
}

/// Runs `change` and keeps the viewport anchored on the same content.
///
/// The anchor only moves when the subtree of `node` lies completely above it; it then
/// shifts by the change in the subtree's visible size, clamped at the first row.
pub fn preserve_viewport<R, T, F>(
    store: &mut NodeStore<R>,
    viewport: &mut ViewportState,
    node: NodeId,
    change: F,
) -> DomainResult<T>
where
    R: RowObject,
    F: FnOnce(&mut NodeStore<R>) -> DomainResult<T>,
{
    let anchor = viewport.row_anchor;
    let changed_row = store.row_position(node);
    let size_before = store.visible_subtree_size(node);
    let scroll_update_required = changed_row + size_before <= anchor.index;

    let result = change(store)?;

    if scroll_update_required {
        let size_after = if store.contains(node) {
            store.visible_subtree_size(node)
        } else {
            0
        };
        let top = anchor.index as i64 + size_after as i64 - size_before as i64;
        viewport.row_anchor = if top < 0 {
            RowIndexAnchor::new(0, 0)
        } else {
            RowIndexAnchor::new(top as usize, anchor.pixel_offset)
        };
        if viewport.row_anchor != anchor {
            trace!(from = anchor.index, to = viewport.row_anchor.index, "moved viewport anchor");
        }
    }
    Ok(result)
}
