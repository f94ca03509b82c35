use std::collections::HashMap;
use std::fmt::{Debug, Display};
use std::hash::Hash;
use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, instrument, warn};

use crate::storage::{Loaded, StorageError, StorageService, Versioned};

const MAX_ID_ATTEMPTS: usize = 32;

// =============================================================================
// 1. THE ABSTRACTION (Traits with Hooks, Params, and Actions)
// =============================================================================

/// Trait that any domain entity must implement to be managed by ResourceActor
pub trait Entity: Clone + PartialEq + Send + Sync + Serialize + DeserializeOwned + 'static {
    type Id: Eq + Hash + Clone + Send + Sync + Display + Debug + Serialize + DeserializeOwned;
    type CreateParams: Send + Sync + Debug;
    type Action: Send + Sync + Debug;
    type ActionResult: Send + Sync + Debug;
    type Error: std::error::Error + From<FrameworkError> + Send + Sync + 'static;

    /// Storage namespace, e.g. `orders`.
    const NAMESPACE: &'static str;

    fn id(&self) -> &Self::Id;

    /// Construct the full Entity from the ID and creation parameters
    fn from_create_params(id: Self::Id, params: Self::CreateParams) -> Result<Self, Self::Error>;

    // --- Lifecycle Hooks ---

    fn on_create(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
    fn on_delete(&self) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Checks an entity that was built elsewhere, such as an imported record.
    fn validate(&self) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Handle a custom domain-specific action. The actor only persists the
    /// entity when the action actually changed it.
    fn handle_action(&mut self, action: Self::Action) -> Result<Self::ActionResult, Self::Error>;
}

/// Failures that belong to the actor machinery rather than to a domain.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FrameworkError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("No free id after {0} attempts")]
    IdsExhausted(usize),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Actor closed")]
    ActorClosed,
    #[error("Actor dropped")]
    ActorDropped,
}

// =============================================================================
// 2. THE GENERIC MESSAGES
// =============================================================================

pub type Response<T, E> = oneshot::Sender<Result<T, E>>;

/// What an import did with each offered item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportOutcome {
    pub imported: usize,
    /// Id already stored, or repeated within the batch.
    pub duplicates: usize,
    /// Rejected by [`Entity::validate`].
    pub invalid: usize,
}

#[derive(Debug)]
pub enum ResourceRequest<T: Entity> {
    Create {
        params: T::CreateParams,
        respond_to: Response<T::Id, T::Error>,
    },
    /// Creates all items or none, appended in the given order.
    CreateMany {
        params: Vec<T::CreateParams>,
        respond_to: Response<Vec<T>, T::Error>,
    },
    /// Inserts pre-built items, skipping ids already present and items that
    /// fail validation.
    Import {
        items: Vec<T>,
        respond_to: Response<ImportOutcome, T::Error>,
    },
    Get {
        id: T::Id,
        respond_to: Response<Option<T>, T::Error>,
    },
    List {
        respond_to: Response<Vec<T>, T::Error>,
    },
    Action {
        id: T::Id,
        action: T::Action,
        respond_to: Response<T::ActionResult, T::Error>,
    },
    Delete {
        id: T::Id,
        respond_to: Response<(), T::Error>,
    },
    /// Deletes the listed ids in one index write. Ids that are already gone
    /// are skipped; responds with how many were removed.
    DeleteMany {
        ids: Vec<T::Id>,
        respond_to: Response<usize, T::Error>,
    },
    Clear {
        respond_to: Response<usize, T::Error>,
    },
}

// =============================================================================
// 3. THE GENERIC ACTOR SERVER
// =============================================================================

/// Owns one namespace of storage. Items live in memory keyed by id; every
/// mutation is written through to storage before it becomes visible.
///
/// The persisted index is authoritative: items are written before they are
/// indexed and unindexed before they are deleted, so a failure part way
/// leaves at worst an unreferenced record behind.
pub struct ResourceActor<T: Entity> {
    receiver: mpsc::Receiver<ResourceRequest<T>>,
    storage: Arc<StorageService>,
    store: HashMap<T::Id, Versioned<T>>,
    index: Versioned<Vec<T::Id>>,
    next_id_fn: Box<dyn Fn() -> T::Id + Send + Sync>,
}

impl<T: Entity> ResourceActor<T> {
    pub fn new(
        buffer_size: usize,
        storage: Arc<StorageService>,
        next_id_fn: impl Fn() -> T::Id + Send + Sync + 'static,
    ) -> (Self, ResourceClient<T>) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let actor = Self {
            receiver,
            storage,
            store: HashMap::new(),
            index: Versioned {
                version: 0,
                value: Vec::new(),
            },
            next_id_fn: Box::new(next_id_fn),
        };
        let client = ResourceClient::new(sender);
        (actor, client)
    }

    #[instrument(name = "resource_actor", skip(self), fields(namespace = T::NAMESPACE))]
    pub async fn run(mut self) {
        self.restore().await;
        info!(items = self.index.value.len(), "Actor starting");

        while let Some(msg) = self.receiver.recv().await {
            match msg {
                ResourceRequest::Create { params, respond_to } => {
                    let result = self.handle_create_many(vec![params]).await.and_then(|mut items| {
                        items
                            .pop()
                            .map(|item| item.id().clone())
                            .ok_or_else(|| FrameworkError::NotFound("created item".to_string()).into())
                    });
                    let _ = respond_to.send(result);
                }
                ResourceRequest::CreateMany { params, respond_to } => {
                    let _ = respond_to.send(self.handle_create_many(params).await);
                }
                ResourceRequest::Import { items, respond_to } => {
                    let _ = respond_to.send(self.handle_import(items).await);
                }
                ResourceRequest::Get { id, respond_to } => {
                    let item = self.store.get(&id).map(|record| record.value.clone());
                    let _ = respond_to.send(Ok(item));
                }
                ResourceRequest::List { respond_to } => {
                    let _ = respond_to.send(Ok(self.ordered_items()));
                }
                ResourceRequest::Action { id, action, respond_to } => {
                    let _ = respond_to.send(self.handle_action(id, action).await);
                }
                ResourceRequest::Delete { id, respond_to } => {
                    let _ = respond_to.send(self.handle_delete(id).await);
                }
                ResourceRequest::DeleteMany { ids, respond_to } => {
                    let _ = respond_to.send(self.handle_delete_many(ids).await);
                }
                ResourceRequest::Clear { respond_to } => {
                    let _ = respond_to.send(self.handle_clear().await);
                }
            }
        }

        info!("Actor stopped");
    }

    /// Loads the index and every indexed item. Anything unreadable is dropped
    /// with a warning rather than failing the actor.
    async fn restore(&mut self) {
        let index: Versioned<Vec<T::Id>> = match self.storage.load_index(T::NAMESPACE).await {
            Ok(index) => index,
            Err(e) => {
                error!(error = %e, "Failed to read index, starting empty");
                return;
            }
        };

        let mut kept = Vec::with_capacity(index.value.len());
        for id in index.value {
            if self.store.contains_key(&id) {
                continue;
            }
            match self.storage.load::<T>(T::NAMESPACE, &id.to_string()).await {
                Ok(Loaded::Present(record)) => {
                    kept.push(id.clone());
                    self.store.insert(id, record);
                }
                Ok(Loaded::Missing) => warn!(%id, "Indexed item missing, dropping"),
                Ok(Loaded::Corrupt { reason, .. }) => warn!(%id, %reason, "Unreadable item, dropping"),
                Err(e) => warn!(%id, error = %e, "Failed to read item, dropping"),
            }
        }

        self.index = Versioned {
            version: index.version,
            value: kept,
        };
    }

    fn ordered_items(&self) -> Vec<T> {
        self.index
            .value
            .iter()
            .filter_map(|id| self.store.get(id).map(|record| record.value.clone()))
            .collect()
    }

    fn allocate_id(&self, pending: &[T]) -> Result<T::Id, FrameworkError> {
        for _ in 0..MAX_ID_ATTEMPTS {
            let id = (self.next_id_fn)();
            if !self.store.contains_key(&id) && !pending.iter().any(|item| item.id() == &id) {
                return Ok(id);
            }
            debug!(%id, "Generated id already taken, retrying");
        }
        Err(FrameworkError::IdsExhausted(MAX_ID_ATTEMPTS))
    }

    async fn handle_create_many(&mut self, params: Vec<T::CreateParams>) -> Result<Vec<T>, T::Error> {
        let mut created = Vec::with_capacity(params.len());
        for params in params {
            let id = self.allocate_id(&created)?;
            let mut item = T::from_create_params(id, params)?;
            item.on_create()?;
            created.push(item);
        }
        self.persist_new(&created).await?;
        debug!(count = created.len(), "Items created");
        Ok(created)
    }

    async fn handle_import(&mut self, items: Vec<T>) -> Result<ImportOutcome, T::Error> {
        let mut outcome = ImportOutcome::default();
        let mut fresh: Vec<T> = Vec::with_capacity(items.len());
        for item in items {
            if self.store.contains_key(item.id()) || fresh.iter().any(|other| other.id() == item.id()) {
                debug!(id = %item.id(), "Skipping existing item");
                outcome.duplicates += 1;
                continue;
            }
            if let Err(e) = item.validate() {
                warn!(id = %item.id(), error = %e, "Skipping invalid item");
                outcome.invalid += 1;
                continue;
            }
            fresh.push(item);
        }
        self.persist_new(&fresh).await?;
        outcome.imported = fresh.len();
        Ok(outcome)
    }

    async fn persist_new(&mut self, items: &[T]) -> Result<(), FrameworkError> {
        if items.is_empty() {
            return Ok(());
        }

        let mut versions = Vec::with_capacity(items.len());
        for item in items {
            let version = self
                .storage
                .store(T::NAMESPACE, &item.id().to_string(), item, 0)
                .await?;
            versions.push(version);
        }

        let mut index = self.index.value.clone();
        index.extend(items.iter().map(|item| item.id().clone()));
        self.write_index(index).await?;

        for (item, version) in items.iter().zip(versions) {
            self.store.insert(
                item.id().clone(),
                Versioned {
                    version,
                    value: item.clone(),
                },
            );
        }
        Ok(())
    }

    async fn handle_action(&mut self, id: T::Id, action: T::Action) -> Result<T::ActionResult, T::Error> {
        let Some(record) = self.store.get(&id) else {
            return Err(FrameworkError::NotFound(id.to_string()).into());
        };

        let mut item = record.value.clone();
        let result = item.handle_action(action)?;

        if item != record.value {
            let version = self
                .storage
                .store(T::NAMESPACE, &id.to_string(), &item, record.version)
                .await
                .map_err(FrameworkError::from)?;
            self.store.insert(id, Versioned { version, value: item });
        }
        Ok(result)
    }

    async fn handle_delete(&mut self, id: T::Id) -> Result<(), T::Error> {
        let Some(record) = self.store.get(&id) else {
            return Err(FrameworkError::NotFound(id.to_string()).into());
        };
        record.value.on_delete()?;
        let version = record.version;

        let index = self.index.value.iter().filter(|other| **other != id).cloned().collect();
        self.write_index(index).await?;
        self.store.remove(&id);

        if let Err(e) = self.storage.remove(T::NAMESPACE, &id.to_string(), version).await {
            warn!(%id, error = %e, "Unindexed item could not be removed");
        }
        Ok(())
    }

    async fn handle_delete_many(&mut self, ids: Vec<T::Id>) -> Result<usize, T::Error> {
        let mut doomed: Vec<(T::Id, u64)> = Vec::with_capacity(ids.len());
        for id in ids {
            if doomed.iter().any(|(other, _)| *other == id) {
                continue;
            }
            let Some(record) = self.store.get(&id) else {
                debug!(%id, "Already gone, skipping");
                continue;
            };
            record.value.on_delete()?;
            doomed.push((id, record.version));
        }
        if doomed.is_empty() {
            return Ok(0);
        }

        let index = self
            .index
            .value
            .iter()
            .filter(|id| !doomed.iter().any(|(other, _)| other == *id))
            .cloned()
            .collect();
        self.write_index(index).await?;

        for (id, version) in &doomed {
            self.store.remove(id);
            if let Err(e) = self.storage.remove(T::NAMESPACE, &id.to_string(), *version).await {
                warn!(%id, error = %e, "Unindexed item could not be removed");
            }
        }
        debug!(count = doomed.len(), "Items deleted");
        Ok(doomed.len())
    }

    async fn handle_clear(&mut self) -> Result<usize, T::Error> {
        self.write_index(Vec::new()).await?;

        let removed: Vec<(T::Id, Versioned<T>)> = self.store.drain().collect();
        for (id, record) in &removed {
            if let Err(e) = self.storage.remove(T::NAMESPACE, &id.to_string(), record.version).await {
                warn!(%id, error = %e, "Unindexed item could not be removed");
            }
        }
        debug!(count = removed.len(), "Store cleared");
        Ok(removed.len())
    }

    async fn write_index(&mut self, ids: Vec<T::Id>) -> Result<(), FrameworkError> {
        let version = self
            .storage
            .store_index(T::NAMESPACE, &ids, self.index.version)
            .await?;
        self.index = Versioned { version, value: ids };
        Ok(())
    }
}

// =============================================================================
// 4. THE GENERIC CLIENT
// =============================================================================

#[derive(Clone)]
pub struct ResourceClient<T: Entity> {
    sender: mpsc::Sender<ResourceRequest<T>>,
}

impl<T: Entity> ResourceClient<T> {
    pub(crate) fn new(sender: mpsc::Sender<ResourceRequest<T>>) -> Self {
        Self { sender }
    }

    async fn request<R>(
        &self,
        build: impl FnOnce(Response<R, T::Error>) -> ResourceRequest<T>,
    ) -> Result<R, T::Error> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(build(respond_to))
            .await
            .map_err(|_| FrameworkError::ActorClosed)?;
        response.await.map_err(|_| FrameworkError::ActorDropped)?
    }

    pub async fn create(&self, params: T::CreateParams) -> Result<T::Id, T::Error> {
        self.request(|respond_to| ResourceRequest::Create { params, respond_to }).await
    }

    pub async fn create_many(&self, params: Vec<T::CreateParams>) -> Result<Vec<T>, T::Error> {
        self.request(|respond_to| ResourceRequest::CreateMany { params, respond_to }).await
    }

    pub async fn import(&self, items: Vec<T>) -> Result<ImportOutcome, T::Error> {
        self.request(|respond_to| ResourceRequest::Import { items, respond_to }).await
    }

    pub async fn get(&self, id: T::Id) -> Result<Option<T>, T::Error> {
        self.request(|respond_to| ResourceRequest::Get { id, respond_to }).await
    }

    pub async fn list(&self) -> Result<Vec<T>, T::Error> {
        self.request(|respond_to| ResourceRequest::List { respond_to }).await
    }

    pub async fn perform_action(&self, id: T::Id, action: T::Action) -> Result<T::ActionResult, T::Error> {
        self.request(|respond_to| ResourceRequest::Action { id, action, respond_to }).await
    }

    pub async fn delete(&self, id: T::Id) -> Result<(), T::Error> {
        self.request(|respond_to| ResourceRequest::Delete { id, respond_to }).await
    }

    pub async fn delete_many(&self, ids: Vec<T::Id>) -> Result<usize, T::Error> {
        self.request(|respond_to| ResourceRequest::DeleteMany { ids, respond_to }).await
    }

    pub async fn clear(&self) -> Result<usize, T::Error> {
        self.request(|respond_to| ResourceRequest::Clear { respond_to }).await
    }
}

// =============================================================================
// 5. EXAMPLE USAGE (Test)
// =============================================================================
