//! Import of a browser local-storage dump into the keyed stores.
//!
//! The dump is the object a browser hands out for the storefront origin:
//! `{"cart": "<json text>", "orders": "<json text>"}`, where each slot holds
//! the serialized array as a string. Slots that are missing or unreadable
//! count as empty.

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::actor_framework::ImportOutcome;
use crate::cart_actor::CartError;
use crate::clients::{CartClient, OrderClient};
use crate::domain::{Order, Product};
use crate::order_actor::OrderError;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum LegacyError {
    #[error("Malformed dump: {0}")]
    Malformed(String),
    #[error("Cart import failed: {0}")]
    Cart(#[from] CartError),
    #[error("Order import failed: {0}")]
    Order(#[from] OrderError),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportSummary {
    pub cart_entries: usize,
    pub orders: usize,
    /// Orders whose id was already present.
    pub duplicate_orders: usize,
    /// Records that could not be read, or broke order rules, and were left out.
    pub skipped: usize,
}

/// Appends the dump's cart to the cart and its orders to the order store.
/// Orders keep their ids and status.
#[instrument(skip_all)]
pub async fn import_dump(dump: &str, cart: &CartClient, orders: &OrderClient) -> Result<ImportSummary, LegacyError> {
    let root: Value = serde_json::from_str(dump).map_err(|e| LegacyError::Malformed(e.to_string()))?;
    let Value::Object(slots) = root else {
        return Err(LegacyError::Malformed("expected an object of storage slots".to_string()));
    };

    let mut summary = ImportSummary::default();

    let (products, skipped) = read_slot::<Product>(slots.get("cart"), "cart");
    summary.skipped += skipped;
    for product in products {
        cart.add_to_cart(product).await?;
        summary.cart_entries += 1;
    }

    let (legacy_orders, skipped) = read_slot::<Order>(slots.get("orders"), "orders");
    summary.skipped += skipped;
    let ImportOutcome {
        imported,
        duplicates,
        invalid,
    } = orders.import(legacy_orders).await?;
    summary.orders = imported;
    summary.duplicate_orders = duplicates;
    summary.skipped += invalid;

    info!(
        cart_entries = summary.cart_entries,
        orders = summary.orders,
        skipped = summary.skipped,
        "Legacy dump imported"
    );
    Ok(summary)
}

/// Reads one slot as an array of `T`. Returns the readable records and how
/// many were dropped.
fn read_slot<T: DeserializeOwned>(slot: Option<&Value>, name: &str) -> (Vec<T>, usize) {
    let parsed = match slot {
        None | Some(Value::Null) => return (Vec::new(), 0),
        Some(Value::String(text)) => serde_json::from_str::<Value>(text),
        Some(other) => Ok(other.clone()),
    };

    let items = match parsed {
        Ok(Value::Array(items)) => items,
        Ok(_) => {
            warn!(slot = name, "Slot is not an array, treating as empty");
            return (Vec::new(), 0);
        }
        Err(e) => {
            warn!(slot = name, error = %e, "Slot could not be parsed, treating as empty");
            return (Vec::new(), 0);
        }
    };

    let total = items.len();
    let records: Vec<T> = items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(slot = name, error = %e, "Skipping unreadable record");
                None
            }
        })
        .collect();
    let skipped = total - records.len();
    (records, skipped)
}
