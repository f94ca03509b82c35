//! Product catalog: where products come from and how the browsing view
//! narrows them down.

mod sample;

use async_trait::async_trait;
use std::cmp::Ordering;
use std::path::PathBuf;
use thiserror::Error;

use crate::domain::{Category, Product};

pub use sample::SampleCatalog;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CatalogError {
    #[error("Catalog unavailable: {0}")]
    Unavailable(String),
    #[error("Malformed catalog: {0}")]
    Malformed(String),
    #[error("Product not found: {0}")]
    NotFound(u64),
}

/// Anything that can list the products on offer.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn fetch_products(&self) -> Result<Vec<Product>, CatalogError>;
}

/// Reads a JSON array of products from disk on every fetch.
pub struct JsonFileCatalog {
    path: PathBuf,
}

impl JsonFileCatalog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CatalogSource for JsonFileCatalog {
    async fn fetch_products(&self) -> Result<Vec<Product>, CatalogError> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| CatalogError::Unavailable(format!("{}: {}", self.path.display(), e)))?;
        serde_json::from_slice(&bytes).map_err(|e| CatalogError::Malformed(e.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PriceSort {
    #[default]
    Default,
    LowToHigh,
    HighToLow,
}

/// Filters applied by the browsing view.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogQuery {
    /// Case-insensitive substring of the product name.
    pub search: Option<String>,
    pub category: Option<Category>,
    pub min_rating: Option<f64>,
    pub sort: PriceSort,
}

impl CatalogQuery {
    pub fn matches(&self, product: &Product) -> bool {
        if let Some(search) = &self.search {
            if !product.name.to_lowercase().contains(&search.to_lowercase()) {
                return false;
            }
        }
        if let Some(category) = self.category {
            if product.category != category {
                return false;
            }
        }
        if let Some(min_rating) = self.min_rating {
            if product.rating < min_rating {
                return false;
            }
        }
        true
    }

    /// Filters, then sorts by price. The default order is the catalog order.
    pub fn apply<'a>(&self, products: impl IntoIterator<Item = &'a Product>) -> Vec<Product> {
        let mut selected: Vec<Product> = products
            .into_iter()
            .filter(|product| self.matches(product))
            .cloned()
            .collect();

        let by_price = |a: &Product, b: &Product| a.price.partial_cmp(&b.price).unwrap_or(Ordering::Equal);
        match self.sort {
            PriceSort::Default => {}
            PriceSort::LowToHigh => selected.sort_by(by_price),
            PriceSort::HighToLow => selected.sort_by(|a, b| by_price(b, a)),
        }
        selected
    }
}

/// Products grouped into catalog sections, in [`Category::ALL`] order.
#[derive(Debug, Clone, PartialEq)]
pub struct CategorizedProducts {
    sections: Vec<(Category, Vec<Product>)>,
}

impl CategorizedProducts {
    pub fn group(products: Vec<Product>) -> Self {
        let mut sections: Vec<(Category, Vec<Product>)> =
            Category::ALL.into_iter().map(|category| (category, Vec::new())).collect();
        for product in products {
            if let Some((_, section)) = sections.iter_mut().find(|(category, _)| *category == product.category) {
                section.push(product);
            }
        }
        Self { sections }
    }

    pub fn get(&self, category: Category) -> &[Product] {
        self.sections
            .iter()
            .find(|(section, _)| *section == category)
            .map(|(_, products)| products.as_slice())
            .unwrap_or_default()
    }

    pub fn sections(&self) -> impl Iterator<Item = (Category, &[Product])> {
        self.sections.iter().map(|(category, products)| (*category, products.as_slice()))
    }
}
