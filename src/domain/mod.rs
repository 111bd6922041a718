//! Domain layer: grid structure, row index and selection algorithms
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod arena;
pub mod differ;
pub mod edit;
pub mod error;
pub mod index;
pub mod model;
pub mod payload;
pub mod position;
pub mod selection;
pub mod viewport;

pub use arena::{GridNode, ModelNodeFactory, NodeFactory, NodeId, NodeStore, StructureEvent};
pub use differ::{preserve_viewport, update_children, update_old_parent, ChildDiff};
pub use edit::{EditBuffer, FieldError, FieldWarning, ValidationReport};
pub use error::{DomainError, DomainResult};
pub use index::RowIndex;
pub use model::{
    BusinessModel, CreateError, CreateHandler, EditToken, NoValidation, Transaction, UnitOfWork,
    UnitOfWorkError, Validator,
};
pub use payload::{Placeholder, RowObject, RowPayload};
pub use position::ContextPosition;
pub use selection::{
    build_path, is_valid_path, merge_object_selection, resolve_paths, SelectionPath,
    SelectionTracker,
};
pub use viewport::{RowIndexAnchor, ViewportState};
