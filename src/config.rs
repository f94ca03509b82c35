//! Storefront configuration, loaded from TOML.
//!
//! Every section and field has a default, so an empty file (or no file at
//! all) yields a working configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::domain::OrderStatus;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Configuration error: {0}")]
    Parse(String),
    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct StorefrontConfig {
    pub storage: StorageConfig,
    pub checkout: CheckoutConfig,
    pub fulfillment: FulfillmentConfig,
    pub catalog: CatalogConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackendKind {
    Memory,
    File,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackendKind,
    /// Root directory for the file backend.
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackendKind::File,
            path: PathBuf::from(".storefront"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CheckoutConfig {
    /// Largest cart total accepted with cash on delivery.
    pub cod_limit: f64,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self { cod_limit: 100_000.0 }
    }
}

/// Delays of the order status sequence, each measured from the previous step.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct FulfillmentConfig {
    pub preparing_after_ms: u64,
    pub out_for_delivery_after_ms: u64,
    pub delivered_after_ms: u64,
}

impl Default for FulfillmentConfig {
    fn default() -> Self {
        Self {
            preparing_after_ms: 4_000,
            out_for_delivery_after_ms: 2_000,
            delivered_after_ms: 2_000,
        }
    }
}

impl FulfillmentConfig {
    /// How long an order waits in the previous status before reaching `stage`.
    pub fn delay_before(&self, stage: OrderStatus) -> Duration {
        let millis = match stage {
            OrderStatus::Preparing => self.preparing_after_ms,
            OrderStatus::OutForDelivery => self.out_for_delivery_after_ms,
            OrderStatus::Delivered => self.delivered_after_ms,
            OrderStatus::Placed | OrderStatus::Unknown => 0,
        };
        Duration::from_millis(millis)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// JSON product list. The built-in sample catalog is used when unset.
    pub path: Option<PathBuf>,
}

impl StorefrontConfig {
    /// Loads a configuration file.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = tokio::fs::read_to_string(path).await?;
        content.parse()
    }

    /// Loads a configuration file, or the defaults when it does not exist.
    pub async fn from_file_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => content.parse(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !self.checkout.cod_limit.is_finite() || self.checkout.cod_limit < 0.0 {
            return Err(ConfigError::Validation(format!(
                "checkout.cod_limit must be a non-negative number, got {}",
                self.checkout.cod_limit
            )));
        }
        if self.storage.backend == StorageBackendKind::File && self.storage.path.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "storage.path is required for the file backend".into(),
            ));
        }
        Ok(())
    }
}

impl FromStr for StorefrontConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let config: StorefrontConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: StorefrontConfig = "".parse().unwrap();
        assert_eq!(config, StorefrontConfig::default());
        assert_eq!(config.checkout.cod_limit, 100_000.0);
        assert_eq!(config.fulfillment.delay_before(OrderStatus::Preparing), Duration::from_secs(4));
        assert_eq!(config.storage.backend, StorageBackendKind::File);
    }

    #[test]
    fn test_partial_sections() {
        let config: StorefrontConfig = r#"
            [storage]
            backend = "memory"

            [fulfillment]
            delivered_after_ms = 50

            [catalog]
            path = "products.json"
        "#
        .parse()
        .unwrap();

        assert_eq!(config.storage.backend, StorageBackendKind::Memory);
        assert_eq!(config.fulfillment.preparing_after_ms, 4_000);
        assert_eq!(config.fulfillment.delay_before(OrderStatus::Delivered), Duration::from_millis(50));
        assert_eq!(config.catalog.path, Some(PathBuf::from("products.json")));
    }

    #[test]
    fn test_negative_cod_limit_is_rejected() {
        let result = "[checkout]\ncod_limit = -1.0".parse::<StorefrontConfig>();
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_unknown_backend_is_a_parse_error() {
        let result = "[storage]\nbackend = \"redis\"".parse::<StorefrontConfig>();
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[tokio::test]
    async fn test_missing_file_falls_back_to_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = StorefrontConfig::from_file_or_default(dir.path().join("absent.toml"))
            .await
            .unwrap();
        assert_eq!(config, StorefrontConfig::default());

        assert!(StorefrontConfig::from_file(dir.path().join("absent.toml")).await.is_err());
    }
}
