use std::sync::Arc;

use tracing::{info, instrument};

use crate::catalog::{CatalogError, CatalogQuery, CatalogSource, CategorizedProducts};
use crate::domain::Product;

/// Read-only view of the catalog, loaded once from its source.
#[derive(Clone)]
pub struct CatalogClient {
    products: Arc<Vec<Product>>,
}

impl CatalogClient {
    #[instrument(skip(source))]
    pub async fn load(source: &dyn CatalogSource) -> Result<Self, CatalogError> {
        let products = source.fetch_products().await?;
        info!(count = products.len(), "Catalog loaded");
        Ok(Self {
            products: Arc::new(products),
        })
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn product(&self, id: u64) -> Result<Product, CatalogError> {
        self.products
            .iter()
            .find(|product| product.id == id)
            .cloned()
            .ok_or(CatalogError::NotFound(id))
    }

    pub fn search(&self, query: &CatalogQuery) -> Vec<Product> {
        query.apply(self.products.iter())
    }

    /// The browsing view: filtered, sorted, then split into sections.
    pub fn browse(&self, query: &CatalogQuery) -> CategorizedProducts {
        CategorizedProducts::group(self.search(query))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{PriceSort, SampleCatalog};
    use crate::domain::Category;

    #[tokio::test]
    async fn test_sample_catalog_browsing() {
        let catalog = CatalogClient::load(&SampleCatalog).await.unwrap();

        let cement = catalog.product(1).unwrap();
        assert_eq!(cement.name, "Cement");
        assert_eq!(cement.price, 500.0);
        assert_eq!(catalog.product(999), Err(CatalogError::NotFound(999)));

        let view = catalog.browse(&CatalogQuery {
            sort: PriceSort::HighToLow,
            ..Default::default()
        });
        let machines: Vec<&str> = view.get(Category::Machine).iter().map(|p| p.name.as_str()).collect();
        assert_eq!(machines, vec!["Excavator", "Concrete Mixer"]);
    }
}
