//! Reverse index from row payload to the grid nodes displaying it.

use std::collections::HashMap;
use std::hash::Hash;

use generational_arena::Index;
use tracing::instrument;

use crate::domain::payload::RowPayload;

/// Maps each payload to all nodes showing it.
///
/// A payload appears once per path under which the business graph reaches it.
/// Entries are never empty: the last node removed drops the key.
#[derive(Debug)]
pub struct RowIndex<R> {
    entries: HashMap<RowPayload<R>, Vec<Index>>,
}

impl<R> Default for RowIndex<R> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<R> RowIndex<R>
where
    R: Eq + Hash + std::fmt::Debug,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// All nodes for `row` in insertion order, empty if the row is not displayed.
    pub fn nodes_for(&self, row: &RowPayload<R>) -> &[Index] {
        self.entries.get(row).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn first_node_for(&self, row: &RowPayload<R>) -> Option<Index> {
        self.nodes_for(row).first().copied()
    }

    pub fn contains(&self, row: &RowPayload<R>) -> bool {
        self.entries.contains_key(row)
    }

    #[instrument(level = "trace", skip(self))]
    pub fn index_node(&mut self, row: RowPayload<R>, node: Index) {
        let nodes = self.entries.entry(row).or_default();
        if !nodes.contains(&node) {
            nodes.push(node);
        }
    }

    #[instrument(level = "trace", skip(self))]
    pub fn deindex_node(&mut self, row: &RowPayload<R>, node: Index) -> bool {
        let Some(nodes) = self.entries.get_mut(row) else {
            return false;
        };
        let before = nodes.len();
        nodes.retain(|&n| n != node);
        let removed = nodes.len() != before;
        if nodes.is_empty() {
            self.entries.remove(row);
        }
        removed
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RowPayload<R>, &[Index])> {
        self.entries.iter().map(|(k, v)| (k, v.as_slice()))
    }
}
