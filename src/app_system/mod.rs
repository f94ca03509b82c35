//! System orchestration, startup, and shutdown logic.

pub mod error;
pub mod storefront_system;
pub mod tracing;

pub use error::*;
pub use storefront_system::*;
pub use self::tracing::*;
