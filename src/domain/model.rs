//! Contracts the grid consumes from the surrounding application.
//!
//! The grid never owns business objects; it asks a [`BusinessModel`] for structure
//! and hands creation to a [`CreateHandler`] inside a [`UnitOfWork`].

use thiserror::Error;

use crate::domain::edit::{EditBuffer, ValidationReport};
use crate::domain::payload::RowPayload;

/// Structural view onto the business object graph.
///
/// Implementations must be cheap to query; the grid calls them on every update.
pub trait BusinessModel<R>: Send + Sync {
    /// Parents of `row` in the business graph, empty for top-level objects.
    fn parents_of(&self, row: &R) -> Vec<R>;

    /// Children of `row` in model order.
    fn children_of(&self, row: &R) -> Vec<R>;

    fn is_leaf(&self, row: &R) -> bool {
        self.children_of(row).is_empty()
    }

    /// Whether expanding the whole tree terminates.
    fn can_expand_all(&self) -> bool {
        true
    }

    /// Whether `row` may be displayed by this grid at all.
    fn supports_row(&self, _row: &R) -> bool {
        true
    }

    /// False once `row` has been deleted.
    fn is_valid(&self, _row: &R) -> bool {
        true
    }

    /// Objects whose rows have to be refreshed when `changed` is modified.
    fn nodes_to_update(&self, changed: &R) -> Vec<R>
    where
        R: Clone,
    {
        let mut result = vec![changed.clone()];
        result.extend(self.parents_of(changed));
        result
    }

    /// Type names whose changes the grid listens to.
    fn types_to_observe(&self) -> Vec<String> {
        Vec::new()
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CreateError {
    #[error("creation rejected: {0}")]
    Rejected(String),

    #[error("missing container for new object")]
    MissingContainer,

    #[error("object already exists: {0}")]
    AlreadyExists(String),
}

/// Materializes a new business object from the values collected while the row was transient.
pub trait CreateHandler<R>: Send + Sync {
    fn create(
        &self,
        container: Option<&R>,
        create_context: Option<&R>,
        values: &EditBuffer,
    ) -> Result<R, CreateError>;
}

pub trait Validator<R>: Send + Sync {
    fn check(&self, row: &RowPayload<R>, values: &EditBuffer) -> ValidationReport;
}

/// Accepts everything.
pub struct NoValidation;

impl<R> Validator<R> for NoValidation {
    fn check(&self, _row: &RowPayload<R>, _values: &EditBuffer) -> ValidationReport {
        ValidationReport::ok()
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnitOfWorkError {
    #[error("cannot begin transaction: {0}")]
    Begin(String),

    #[error("commit failed: {0}")]
    Commit(String),
}

pub trait UnitOfWork: Send + Sync {
    fn begin_transaction(&self) -> Result<Box<dyn Transaction>, UnitOfWorkError>;
}

pub trait Transaction {
    fn commit(self: Box<Self>) -> Result<(), UnitOfWorkError>;
    fn rollback(self: Box<Self>);
}

/// Exclusive edit permission for the grid's data set.
pub trait EditToken: Send + Sync {
    fn is_held(&self) -> bool;
}
