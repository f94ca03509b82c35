use thiserror::Error;

use crate::actor_framework::FrameworkError;

/// Errors that can occur during cart operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CartError {
    #[error("Cart line not found: {0}")]
    LineNotFound(String),
    #[error("Invalid price for {name}: {price}")]
    InvalidPrice { name: String, price: f64 },
    #[error(transparent)]
    Framework(#[from] FrameworkError),
}
