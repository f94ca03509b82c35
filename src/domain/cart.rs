use serde::{Deserialize, Serialize};

use super::Product;

/// One line in the cart: a snapshot of the product at the time it was added.
///
/// There is no quantity. Adding the same product twice yields two lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartEntry {
    pub line_id: String,
    #[serde(flatten)]
    pub product: Product,
}

/// Sum of the prices of all given entries.
pub fn cart_total(entries: &[CartEntry]) -> f64 {
    entries.iter().map(|entry| entry.product.price).sum()
}
