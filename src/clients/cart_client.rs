use tracing::{debug, info, instrument};

use crate::actor_framework::ResourceClient;
use crate::cart_actor::CartError;
use crate::domain::{cart_total, CartEntry, Product};
use crate::impl_basic_client;

/// Client for the Cart store.
///
/// Every add appends a full copy of the product; there is no quantity.
#[derive(Clone)]
pub struct CartClient {
    inner: ResourceClient<CartEntry>,
}

impl CartClient {
    /// Appends the product and returns the new line id.
    #[instrument(skip(self, product), fields(product_id = product.id, name = %product.name))]
    pub async fn add_to_cart(&self, product: Product) -> Result<String, CartError> {
        let line_id = self.inner.create(product).await?;
        info!(%line_id, "Added to cart");
        Ok(line_id)
    }

    /// Removes every line holding `product_id`. Returns how many were removed.
    #[instrument(skip(self))]
    pub async fn remove_product(&self, product_id: u64) -> Result<usize, CartError> {
        let lines: Vec<String> = self
            .inner
            .list()
            .await?
            .into_iter()
            .filter(|entry| entry.product.id == product_id)
            .map(|entry| entry.line_id)
            .collect();

        for line_id in &lines {
            self.inner.delete(line_id.clone()).await?;
        }
        debug!(removed = lines.len(), "Removed from cart");
        Ok(lines.len())
    }

    /// Removes a single line.
    #[instrument(skip(self))]
    pub async fn remove_line(&self, line_id: String) -> Result<(), CartError> {
        match self.inner.get(line_id.clone()).await? {
            Some(_) => self.inner.delete(line_id).await,
            None => Err(CartError::LineNotFound(line_id)),
        }
    }

    /// Removes exactly these lines in one request. Lines that are already
    /// gone are ignored.
    #[instrument(skip(self, line_ids), fields(lines = line_ids.len()))]
    pub async fn remove_lines(&self, line_ids: Vec<String>) -> Result<usize, CartError> {
        let removed = self.inner.delete_many(line_ids).await?;
        debug!(removed, "Lines removed");
        Ok(removed)
    }

    pub async fn count(&self) -> Result<usize, CartError> {
        Ok(self.inner.list().await?.len())
    }

    pub async fn total(&self) -> Result<f64, CartError> {
        Ok(cart_total(&self.inner.list().await?))
    }

    pub async fn contains(&self, product_id: u64) -> Result<bool, CartError> {
        Ok(self
            .inner
            .list()
            .await?
            .iter()
            .any(|entry| entry.product.id == product_id))
    }

    /// Empties the cart in a single request.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<usize, CartError> {
        let removed = self.inner.clear().await?;
        debug!(removed, "Cart cleared");
        Ok(removed)
    }
}

impl_basic_client!(CartClient, CartEntry, CartError, entry, entries);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor_framework::ResourceActor;
    use crate::cart_actor::line_id_generator;
    use crate::domain::Category;
    use crate::mock_framework::{create_mock_client, expect_delete, expect_get};
    use crate::storage::StorageService;
    use std::sync::Arc;

    fn cart() -> CartClient {
        let storage = Arc::new(StorageService::in_memory());
        let (actor, client) = ResourceActor::<CartEntry>::new(16, storage, line_id_generator());
        tokio::spawn(actor.run());
        CartClient::new(client)
    }

    #[tokio::test]
    async fn test_duplicates_are_separate_lines() {
        let cart = cart();
        let cement = Product::new(1, "Cement", 500.0, Category::Material);

        cart.add_to_cart(cement.clone()).await.unwrap();
        cart.add_to_cart(cement).await.unwrap();
        cart.add_to_cart(Product::new(2, "Bricks", 8.0, Category::Material))
            .await
            .unwrap();

        assert_eq!(cart.count().await.unwrap(), 3);
        assert_eq!(cart.total().await.unwrap(), 1_008.0);
        assert!(cart.contains(1).await.unwrap());

        let ids: Vec<String> = cart.list_entries().await.unwrap().into_iter().map(|e| e.line_id).collect();
        assert_eq!(ids, vec!["line_1", "line_2", "line_3"]);
    }

    #[tokio::test]
    async fn test_remove_product_drops_every_copy() {
        let cart = cart();
        let cement = Product::new(1, "Cement", 500.0, Category::Material);
        cart.add_to_cart(cement.clone()).await.unwrap();
        cart.add_to_cart(Product::new(2, "Bricks", 8.0, Category::Material))
            .await
            .unwrap();
        cart.add_to_cart(cement).await.unwrap();

        assert_eq!(cart.remove_product(1).await.unwrap(), 2);
        assert!(!cart.contains(1).await.unwrap());
        assert_eq!(cart.remove_product(1).await.unwrap(), 0);

        let remaining = cart.list_entries().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].product.name, "Bricks");
    }

    #[tokio::test]
    async fn test_remove_line_and_clear() {
        let cart = cart();
        let line = cart
            .add_to_cart(Product::new(6, "Mason", 900.0, Category::Worker))
            .await
            .unwrap();
        cart.add_to_cart(Product::new(7, "Electrician", 1_200.0, Category::Worker))
            .await
            .unwrap();

        cart.remove_line(line.clone()).await.unwrap();
        assert_eq!(cart.remove_line(line.clone()).await, Err(CartError::LineNotFound(line)));

        assert_eq!(cart.clear().await.unwrap(), 1);
        assert_eq!(cart.total().await.unwrap(), 0.0);
    }

    #[tokio::test]
    async fn test_remove_lines_keeps_other_lines() {
        let cart = cart();
        let mason = cart
            .add_to_cart(Product::new(6, "Mason", 900.0, Category::Worker))
            .await
            .unwrap();
        cart.add_to_cart(Product::new(7, "Electrician", 1_200.0, Category::Worker))
            .await
            .unwrap();

        assert_eq!(cart.remove_lines(vec![mason.clone(), "line_42".to_string()]).await.unwrap(), 1);
        assert_eq!(cart.remove_lines(vec![mason]).await.unwrap(), 0);

        let remaining = cart.list_entries().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].product.name, "Electrician");
    }

    #[tokio::test]
    async fn test_remove_line_checks_then_deletes() {
        let (client, mut receiver) = create_mock_client::<CartEntry>(4);
        let cart = CartClient::new(client);

        let task = tokio::spawn(async move { cart.remove_line("line_3".to_string()).await });

        let (id, responder) = expect_get(&mut receiver).await.expect("Expected Get request");
        assert_eq!(id, "line_3");
        let entry = CartEntry {
            line_id: id,
            product: Product::new(1, "Cement", 500.0, Category::Material),
        };
        responder.send(Ok(Some(entry))).unwrap();

        let (id, responder) = expect_delete(&mut receiver).await.expect("Expected Delete request");
        assert_eq!(id, "line_3");
        responder.send(Ok(())).unwrap();

        assert_eq!(task.await.unwrap(), Ok(()));
    }
}
