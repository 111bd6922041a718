//! Application layer: grid handlers and use cases
//!
//! This layer orchestrates domain logic and depends on collaborator traits only.

pub mod error;
pub mod grid_handler;
pub mod services;

pub use error::{ApplicationError, ApplicationResult};
pub use grid_handler::GridHandler;
