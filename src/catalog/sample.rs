use async_trait::async_trait;

use super::{CatalogError, CatalogSource};
use crate::domain::{Category, Product};

/// Built-in products served when no catalog file is configured.
#[derive(Debug, Clone, Default)]
pub struct SampleCatalog;

#[async_trait]
impl CatalogSource for SampleCatalog {
    async fn fetch_products(&self) -> Result<Vec<Product>, CatalogError> {
        Ok(vec![
            Product::new(1, "Cement", 500.0, Category::Material)
                .with_description("50 kg bag of OPC 53 grade cement")
                .with_rating(4.5),
            Product::new(2, "Red Bricks", 8.0, Category::Material)
                .with_description("Standard clay brick")
                .with_rating(4.0),
            Product::new(3, "TMT Steel Bars", 65_000.0, Category::Material)
                .with_description("One tonne of Fe 500D bars")
                .with_rating(4.6),
            Product::new(4, "Concrete Mixer", 45_000.0, Category::Machine)
                .with_description("Half-bag diesel mixer")
                .with_rating(4.2),
            Product::new(5, "Excavator", 150_000.0, Category::Machine)
                .with_description("Mini excavator, one week rental")
                .with_rating(4.8),
            Product::new(6, "Mason", 900.0, Category::Worker)
                .with_description("Skilled mason, per day")
                .with_rating(4.3),
            Product::new(7, "Electrician", 1_200.0, Category::Worker)
                .with_description("Licensed electrician, per day")
                .with_rating(3.8),
        ])
    }
}
