//! Order-specific domain logic: rating, delivery progress and courier details.

mod actions;
pub mod entity;
pub mod error;

pub use actions::*;
pub use entity::*;
pub use error::*;
