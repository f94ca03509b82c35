//! Persisted key-value storage for the storefront stores.
//!
//! Records are kept as JSON envelopes carrying a version number. Writers pass
//! the version they last observed, so a second writer working from a stale
//! copy gets [`StorageError::VersionConflict`] instead of silently clobbering
//! the newer record.

pub mod file;
pub mod memory;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::warn;

pub use file::FileStorage;
pub use memory::MemoryStorage;

/// Errors raised by storage backends and the typed storage service.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StorageError {
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Backend error: {0}")]
    Backend(String),
    #[error("Version conflict on {key}: expected {expected}, found {found}")]
    VersionConflict { key: String, expected: u64, found: u64 },
}

/// Raw byte storage. Implementations only move bytes around; versioning and
/// serialization live in [`StorageService`].
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Returns `None` when the key has never been written.
    async fn get_bytes(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError>;

    /// Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;
}

/// A record as it sits in storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Versioned<T> {
    pub version: u64,
    pub value: T,
}

#[derive(Deserialize)]
struct Envelope {
    version: u64,
    value: serde_json::Value,
}

/// Outcome of reading a record that might be missing or unreadable.
#[derive(Debug, Clone, PartialEq)]
pub enum Loaded<T> {
    Missing,
    /// The bytes exist but do not parse as the expected type.
    Corrupt { version: u64, reason: String },
    Present(Versioned<T>),
}

/// Typed, versioned access to a [`StorageBackend`].
pub struct StorageService {
    backend: Box<dyn StorageBackend>,
    // Serializes compare-and-set within this process.
    write_lock: Mutex<()>,
}

fn key_for(namespace: &str, id: &str) -> String {
    format!("{}:{}", namespace, id)
}

/// Item keys always carry `:` after the namespace, so no id maps here.
fn index_key(namespace: &str) -> String {
    format!("{}#index", namespace)
}

impl StorageService {
    pub fn new(backend: Box<dyn StorageBackend>) -> Self {
        Self {
            backend,
            write_lock: Mutex::new(()),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryStorage::new()))
    }

    /// Reads a record, distinguishing a missing key from an unreadable one.
    pub async fn load<T: DeserializeOwned>(
        &self,
        namespace: &str,
        id: &str,
    ) -> Result<Loaded<T>, StorageError> {
        self.load_key(&key_for(namespace, id)).await
    }

    async fn load_key<T: DeserializeOwned>(&self, key: &str) -> Result<Loaded<T>, StorageError> {
        let Some(bytes) = self.backend.get_bytes(key).await? else {
            return Ok(Loaded::Missing);
        };
        let envelope: Envelope = match serde_json::from_slice(&bytes) {
            Ok(envelope) => envelope,
            Err(e) => {
                return Ok(Loaded::Corrupt {
                    version: 0,
                    reason: e.to_string(),
                })
            }
        };
        match serde_json::from_value(envelope.value) {
            Ok(value) => Ok(Loaded::Present(Versioned {
                version: envelope.version,
                value,
            })),
            Err(e) => Ok(Loaded::Corrupt {
                version: envelope.version,
                reason: e.to_string(),
            }),
        }
    }

    /// Reads the id list of `namespace` and falls back to `T::default()` when
    /// it is missing or cannot be parsed. The returned version is still the
    /// stored one, so the next write replaces the bad record instead of
    /// conflicting with it.
    pub async fn load_index<T: DeserializeOwned + Default>(&self, namespace: &str) -> Result<Versioned<T>, StorageError> {
        let key = index_key(namespace);
        match self.load_key(&key).await? {
            Loaded::Missing => Ok(Versioned {
                version: 0,
                value: T::default(),
            }),
            Loaded::Corrupt { version, reason } => {
                warn!(%key, %reason, "Unreadable index, using default");
                Ok(Versioned {
                    version,
                    value: T::default(),
                })
            }
            Loaded::Present(record) => Ok(record),
        }
    }

    /// Writes `value` if the stored version still equals `expected`.
    /// Returns the new version.
    pub async fn store<T: Serialize>(
        &self,
        namespace: &str,
        id: &str,
        value: &T,
        expected: u64,
    ) -> Result<u64, StorageError> {
        self.store_key(key_for(namespace, id), value, expected).await
    }

    /// Writes the id list of `namespace` under compare-and-set.
    pub async fn store_index<T: Serialize>(&self, namespace: &str, value: &T, expected: u64) -> Result<u64, StorageError> {
        self.store_key(index_key(namespace), value, expected).await
    }

    async fn store_key<T: Serialize>(&self, key: String, value: &T, expected: u64) -> Result<u64, StorageError> {
        let _guard = self.write_lock.lock().await;

        let found = self.current_version(&key).await?;
        if found != expected {
            return Err(StorageError::VersionConflict {
                key,
                expected,
                found,
            });
        }

        let version = expected + 1;
        let bytes = serde_json::to_vec(&Versioned { version, value })
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.backend.set_bytes(&key, bytes).await?;
        Ok(version)
    }

    /// Deletes a record if the stored version still equals `expected`.
    pub async fn remove(&self, namespace: &str, id: &str, expected: u64) -> Result<(), StorageError> {
        let key = key_for(namespace, id);
        let _guard = self.write_lock.lock().await;

        let found = self.current_version(&key).await?;
        if found != expected {
            return Err(StorageError::VersionConflict {
                key,
                expected,
                found,
            });
        }
        self.backend.delete(&key).await
    }

    /// Missing records are version 0; so are records whose envelope is unreadable.
    async fn current_version(&self, key: &str) -> Result<u64, StorageError> {
        let Some(bytes) = self.backend.get_bytes(key).await? else {
            return Ok(0);
        };
        Ok(serde_json::from_slice::<Envelope>(&bytes)
            .map(|envelope| envelope.version)
            .unwrap_or(0))
    }
}
