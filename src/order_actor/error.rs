use thiserror::Error;

use crate::actor_framework::FrameworkError;
use crate::domain::OrderStatus;

/// Errors that can occur during order operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum OrderError {
    #[error("Order not found: {0}")]
    NotFound(String),
    #[error("Rating must be between 1 and 5, got {0}")]
    InvalidRating(u8),
    #[error("Order {id} cannot be rated while {status}")]
    NotDelivered { id: String, status: OrderStatus },
    #[error("Delivery personnel information is not available yet for order {0}")]
    DeliveryContactUnavailable(String),
    #[error("Order validation error: {0}")]
    ValidationError(String),
    #[error(transparent)]
    Framework(#[from] FrameworkError),
}
