use thiserror::Error;

use crate::cart_actor::CartError;
use crate::fulfillment::FulfillmentError;
use crate::order_actor::OrderError;

/// Errors that can occur while turning the cart into orders.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CheckoutError {
    #[error("Cart is empty")]
    EmptyCart,
    #[error("Cash on delivery is not available for orders above {limit} (total {total})")]
    CodLimitExceeded { total: f64, limit: f64 },
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),
    #[error("Order error: {0}")]
    Order(#[from] OrderError),
    #[error("Fulfillment error: {0}")]
    Fulfillment(#[from] FulfillmentError),
}

/// Errors raised while starting or stopping the storefront.
#[derive(Debug, Error)]
pub enum SystemError {
    #[error("Storage error: {0}")]
    Storage(#[from] crate::storage::StorageError),
    #[error("Catalog error: {0}")]
    Catalog(#[from] crate::catalog::CatalogError),
    #[error("Fulfillment error: {0}")]
    Fulfillment(#[from] FulfillmentError),
    #[error("Actor task failed: {0}")]
    ActorTask(#[from] tokio::task::JoinError),
}
