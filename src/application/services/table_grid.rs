//! Flat table handler
//!
//! Every row is its own node and its own one-element selection path.

use std::sync::Arc;

use itertools::Itertools;
use tracing::{debug, instrument};

use crate::application::grid_handler::GridHandler;
use crate::config::GridSettings;
use crate::domain::{
    is_valid_path, BusinessModel, ContextPosition, DomainError, DomainResult, RowObject,
    RowPayload, SelectionPath, SelectionTracker,
};

/// Grid handler for a flat list of the children of one container object.
pub struct TableGridHandler<R: RowObject> {
    model: Arc<dyn BusinessModel<R>>,
    container: Option<R>,
    rows: Vec<RowPayload<R>>,
    settings: GridSettings,
    selection: SelectionTracker<R>,
    selected: Vec<RowPayload<R>>,
    invalid: bool,
}

impl<R: RowObject> TableGridHandler<R> {
    /// Table listing the children of `container`; without a container the table starts empty.
    pub fn new(model: Arc<dyn BusinessModel<R>>, container: Option<R>, settings: GridSettings) -> Self {
        let mut handler = Self {
            model,
            container,
            rows: Vec::new(),
            settings,
            selection: SelectionTracker::new(),
            selected: Vec::new(),
            invalid: false,
        };
        handler.rows = handler.load_rows();
        handler
    }

    fn load_rows(&self) -> Vec<RowPayload<R>> {
        let Some(container) = &self.container else {
            return Vec::new();
        };
        self.model
            .children_of(container)
            .into_iter()
            .filter(|row| self.displays(row))
            .map(RowPayload::Persisted)
            .collect()
    }

    fn displays(&self, row: &R) -> bool {
        self.model.supports_row(row) && self.model.is_valid(row)
    }

    /// A row belongs in the table while the model lists it below the container.
    fn is_member(&self, row: &R) -> bool {
        match &self.container {
            Some(container) => {
                self.displays(row) && self.model.children_of(container).contains(row)
            }
            None => false,
        }
    }

    pub fn container(&self) -> Option<&R> {
        self.container.as_ref()
    }

    pub fn rows(&self) -> &[RowPayload<R>] {
        &self.rows
    }

    fn position_of(&self, row: &RowPayload<R>) -> Option<usize> {
        self.rows.iter().position(|r| r == row)
    }

    fn context_index(&self, context: &R) -> DomainResult<usize> {
        self.position_of(&RowPayload::Persisted(context.clone()))
            .ok_or_else(|| DomainError::PositionNotFound {
                parent: format!("{:?}", self.container),
                context: format!("{:?}", context),
            })
    }
}

impl<R: RowObject> GridHandler<R> for TableGridHandler<R> {
    type Node = RowPayload<R>;

    fn model(&self) -> &Arc<dyn BusinessModel<R>> {
        &self.model
    }

    fn add_new_row(&mut self, row: &R) -> DomainResult<bool> {
        let payload = RowPayload::Persisted(row.clone());
        if !self.is_member(row) || self.position_of(&payload).is_some() {
            return Ok(false);
        }
        self.rows.push(payload);
        Ok(true)
    }

    fn remove_row(&mut self, row: &RowPayload<R>) -> DomainResult<()> {
        self.rows.retain(|r| r != row);
        let before = self.selected.len();
        self.selected.retain(|r| r != row);
        if self.selected.len() != before {
            self.selection.invalidate();
        }
        Ok(())
    }

    #[instrument(level = "debug", skip(self, row))]
    fn create_row(
        &mut self,
        context: Option<&R>,
        position: &ContextPosition<R>,
        row: RowPayload<R>,
    ) -> DomainResult<RowPayload<R>> {
        match context {
            None => return Err(DomainError::NoContextObject { context: None }),
            Some(context) if Some(context) != self.container.as_ref() => {
                return Err(DomainError::NoContextObject {
                    context: Some(format!("{:?}", context)),
                })
            }
            Some(_) => {}
        }
        let at = match position {
            ContextPosition::Start => 0,
            ContextPosition::End | ContextPosition::Auto => self.rows.len(),
            ContextPosition::Before(context) => self.context_index(context)?,
            ContextPosition::After(context) => self.context_index(context)? + 1,
        };
        self.rows.insert(at, row.clone());
        debug!(at, "created table row");
        Ok(row)
    }

    fn update_row(&mut self, row: &R, _structure_change: bool) -> DomainResult<()> {
        let payload = RowPayload::Persisted(row.clone());
        match (self.is_member(row), self.position_of(&payload).is_some()) {
            (true, false) => {
                self.add_new_row(row)?;
            }
            (false, true) => self.remove_row(&payload)?,
            _ => {}
        }
        Ok(())
    }

    fn nodes_for_row(&self, row: &RowPayload<R>) -> Vec<RowPayload<R>> {
        self.position_of(row).map(|_| row.clone()).into_iter().collect()
    }

    fn row_of(&self, node: &RowPayload<R>) -> Option<RowPayload<R>> {
        self.position_of(node).map(|_| node.clone())
    }

    fn path_of(&self, node: &RowPayload<R>) -> SelectionPath<R> {
        SelectionPath::new(vec![node.clone()])
    }

    fn build_path(&self, row: &RowPayload<R>) -> DomainResult<SelectionPath<R>> {
        Ok(self.path_of(row))
    }

    fn set_selection(&mut self, mut paths: Vec<SelectionPath<R>>) -> DomainResult<Vec<RowPayload<R>>> {
        if !self.settings.multi_selection {
            paths.truncate(1);
        }
        let nodes: Vec<RowPayload<R>> = paths
            .iter()
            .filter_map(SelectionPath::leaf)
            .filter(|leaf| self.position_of(leaf).is_some())
            .unique()
            .cloned()
            .collect();
        self.selection.set_paths(paths);
        self.selected = nodes.clone();
        Ok(nodes)
    }

    fn selected_nodes(&self) -> &[RowPayload<R>] {
        &self.selected
    }

    fn selection_paths(&self) -> &[SelectionPath<R>] {
        self.selection.paths()
    }

    fn replace_row(&mut self, old: &RowPayload<R>, new: RowPayload<R>) -> DomainResult<()> {
        for row in self.rows.iter_mut().chain(self.selected.iter_mut()) {
            if row == old {
                *row = new.clone();
            }
        }
        self.selection.replace_object(old, &new);
        Ok(())
    }

    fn sort_rows(&self, rows: &[RowPayload<R>]) -> Vec<RowPayload<R>> {
        rows.iter()
            .sorted_by_key(|row| self.position_of(row).unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }

    fn expansion_state(&self) -> Vec<R> {
        Vec::new()
    }

    fn set_expansion_state(&mut self, _expanded: &[R]) -> DomainResult<()> {
        Ok(())
    }

    fn invalidate(&mut self) {
        self.invalid = true;
        self.selection.invalidate();
    }

    fn is_invalid(&self) -> bool {
        self.invalid
    }

    fn revalidate(&mut self) -> DomainResult<()> {
        self.rows = self.load_rows();
        let model = Arc::clone(&self.model);
        let valid = self
            .selection
            .paths()
            .iter()
            .filter(|p| is_valid_path(model.as_ref(), p))
            .cloned()
            .collect();
        self.invalid = false;
        self.set_selection(valid)?;
        Ok(())
    }
}
