//! Application services
//!
//! Concrete grid handlers and the row creation protocol built on the domain algorithms.

mod creation;
mod table_grid;
mod tree_grid;

pub use creation::{
    begin_edit, CommitContext, CommitOutcome, CreationRequest, CreationState, TransientCreation,
};
pub use table_grid::TableGridHandler;
pub use tree_grid::TreeGridHandler;
