use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Catalog section a product is listed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Material,
    Machine,
    Worker,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Material, Category::Machine, Category::Worker];
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Material => write!(f, "material"),
            Category::Machine => write!(f, "machine"),
            Category::Worker => write!(f, "worker"),
        }
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|category| category.to_string().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown category: {}", s))
    }
}

/// Represents a product listed in the catalog.
///
/// Products are immutable once loaded; the cart keeps its own copies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: u64,
    pub name: String,
    pub price: f64,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub description: String,
    pub category: Category,
    #[serde(default)]
    pub rating: f64,
}

impl Product {
    pub fn new(id: u64, name: impl Into<String>, price: f64, category: Category) -> Self {
        Self {
            id,
            name: name.into(),
            price,
            image: String::new(),
            description: String::new(),
            category,
            rating: 0.0,
        }
    }

    pub fn with_rating(mut self, rating: f64) -> Self {
        self.rating = rating;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}
