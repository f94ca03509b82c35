//! Cart lines as actor-managed entities.

pub mod entity;
pub mod error;

pub use entity::*;
pub use error::*;
