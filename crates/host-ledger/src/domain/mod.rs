//! # Domain Layer (Inner Hexagon)
//!
//! Ledger entities, value objects, the execution context and error types.
//! No keeper logic lives here.

pub mod context;
pub mod entities;
pub mod errors;
pub mod services;
pub mod value_objects;

pub use context::*;
pub use entities::*;
pub use errors::*;
pub use services::*;
pub use value_objects::*;
