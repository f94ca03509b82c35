//! Typed clients handed to callers. Each wraps a `ResourceClient` or a
//! loaded source and adds the domain-level operations.

pub mod macros;
pub mod cart_client;
pub mod catalog_client;
pub mod order_client;

pub use cart_client::*;
pub use catalog_client::*;
pub use order_client::*;
