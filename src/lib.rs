//! Row synchronization engine for editable tree and table grids.
//!
//! A grid displays rows for business objects from a mutable object graph. The
//! [`application::services::TreeGridHandler`] keeps a lazily expanded node tree in sync with
//! the graph, the [`application::services::TableGridHandler`] does the same for a flat list,
//! and both preserve the selection as paths across structural changes.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod tree_traits;
pub mod util;
