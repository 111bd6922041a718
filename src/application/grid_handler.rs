//! Operations surface the owning grid component works against.

use std::fmt;
use std::sync::Arc;

use crate::domain::{
    is_valid_path, merge_object_selection, BusinessModel, ContextPosition, DomainError,
    DomainResult, RowObject, RowPayload, SelectionPath,
};

/// Keeps the displayed rows of one grid in line with the business model.
///
/// Implemented by [`TreeGridHandler`](crate::application::services::TreeGridHandler) and,
/// treating every row as its own node, by
/// [`TableGridHandler`](crate::application::services::TableGridHandler).
pub trait GridHandler<R: RowObject> {
    /// Handle of one displayed row.
    type Node: Clone + PartialEq + fmt::Debug;

    fn model(&self) -> &Arc<dyn BusinessModel<R>>;

    /// Displays `row` below every displayed parent. Returns whether a row was created.
    fn add_new_row(&mut self, row: &R) -> DomainResult<bool>;

    /// Removes every node of `row`; removing the root invalidates the grid instead.
    fn remove_row(&mut self, row: &RowPayload<R>) -> DomainResult<()>;

    /// Inserts `row` into the single node displaying `context`.
    fn create_row(
        &mut self,
        context: Option<&R>,
        position: &ContextPosition<R>,
        row: RowPayload<R>,
    ) -> DomainResult<Self::Node>;

    fn update_row(&mut self, row: &R, structure_change: bool) -> DomainResult<()>;

    fn nodes_for_row(&self, row: &RowPayload<R>) -> Vec<Self::Node>;

    fn first_node_for_row(&self, row: &RowPayload<R>) -> Option<Self::Node> {
        self.nodes_for_row(row).into_iter().next()
    }

    fn row_of(&self, node: &Self::Node) -> Option<RowPayload<R>>;

    fn path_of(&self, node: &Self::Node) -> SelectionPath<R>;

    fn build_path(&self, row: &RowPayload<R>) -> DomainResult<SelectionPath<R>>;

    /// Replaces the selection and returns the nodes it resolved to.
    fn set_selection(&mut self, paths: Vec<SelectionPath<R>>) -> DomainResult<Vec<Self::Node>>;

    fn selected_nodes(&self) -> &[Self::Node];

    fn selection_paths(&self) -> &[SelectionPath<R>];

    fn is_valid_path(&self, path: &SelectionPath<R>) -> bool {
        is_valid_path(self.model().as_ref(), path)
    }

    /// Applies externally supplied paths, rejecting the whole change if one is invalid.
    fn accept_selection_paths(
        &mut self,
        paths: Vec<SelectionPath<R>>,
    ) -> DomainResult<Vec<Self::Node>> {
        if let Some(invalid) = paths.iter().find(|p| !self.is_valid_path(p)) {
            return Err(DomainError::InvalidSelectionPath(format!(
                "{:?}",
                invalid.elements()
            )));
        }
        self.set_selection(paths)
    }

    /// Selects exactly `objects`, keeping the current path of objects that stay selected.
    /// Returns whether the selection changed.
    fn select_objects(&mut self, objects: &[RowPayload<R>]) -> DomainResult<bool> {
        let merged = merge_object_selection(self.selection_paths(), objects, |row| {
            self.build_path(row)
        })?;
        match merged {
            Some(paths) => {
                self.set_selection(paths)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Swaps `old` for `new` in place, keeping nodes and rewriting selection paths.
    fn replace_row(&mut self, old: &RowPayload<R>, new: RowPayload<R>) -> DomainResult<()>;

    /// Orders `rows` the way they are displayed; unknown rows go last.
    fn sort_rows(&self, rows: &[RowPayload<R>]) -> Vec<RowPayload<R>>;

    /// Objects whose nodes are expanded.
    fn expansion_state(&self) -> Vec<R>;

    fn set_expansion_state(&mut self, expanded: &[R]) -> DomainResult<()>;

    /// Marks the whole grid for rebuilding.
    fn invalidate(&mut self);

    fn is_invalid(&self) -> bool;

    /// Rebuilds the rows and reapplies expansion and selection.
    fn revalidate(&mut self) -> DomainResult<()>;
}
