//! Infrastructure layer: concrete collaborators and file loading
//!
//! This layer implements the collaborator traits the grid handlers depend on.

pub mod error;
pub mod graph;

pub use error::{InfraError, InfraResult};
pub use graph::{
    GraphCreateHandler, GraphSpec, InMemoryGraph, InMemoryUnitOfWork, ObjectSpec, StaticEditToken,
};
