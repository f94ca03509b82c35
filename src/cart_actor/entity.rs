use std::sync::atomic::{AtomicU64, Ordering};

use crate::actor_framework::Entity;
use crate::domain::{CartEntry, Product};
use super::CartError;

impl Entity for CartEntry {
    type Id = String;
    type CreateParams = Product;
    type Action = ();
    type ActionResult = ();
    type Error = CartError;

    const NAMESPACE: &'static str = "cart";

    fn id(&self) -> &String {
        &self.line_id
    }

    /// Snapshots the product into a new cart line.
    ///
    /// # Errors
    /// Rejects negative or non-finite prices, which would corrupt the total.
    fn from_create_params(line_id: String, product: Product) -> Result<Self, CartError> {
        if !product.price.is_finite() || product.price < 0.0 {
            return Err(CartError::InvalidPrice {
                name: product.name,
                price: product.price,
            });
        }
        Ok(Self { line_id, product })
    }

    /// Cart lines have no actions; they are only added and removed.
    fn handle_action(&mut self, _action: ()) -> Result<(), CartError> {
        Ok(())
    }
}

/// Line ids `line_1`, `line_2`, ... The actor skips ids already in use, so
/// the counter may restart from 1 after a reload.
pub fn line_id_generator() -> impl Fn() -> String + Send + Sync + 'static {
    let counter = AtomicU64::new(1);
    move || format!("line_{}", counter.fetch_add(1, Ordering::SeqCst))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Category;

    #[test]
    fn test_negative_price_is_rejected() {
        let product = Product::new(7, "Refund", -10.0, Category::Material);
        let result = CartEntry::from_create_params("line_1".into(), product);
        assert!(matches!(result, Err(CartError::InvalidPrice { .. })));
    }

    #[test]
    fn test_line_ids_count_up() {
        let next = line_id_generator();
        assert_eq!(next(), "line_1");
        assert_eq!(next(), "line_2");
    }
}
