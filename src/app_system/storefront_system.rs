use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{error, info};

use super::SystemError;
use crate::actor_framework::ResourceActor;
use crate::cart_actor::line_id_generator;
use crate::catalog::{CatalogSource, JsonFileCatalog, SampleCatalog};
use crate::clients::{CartClient, CatalogClient, OrderClient};
use crate::config::{StorageBackendKind, StorefrontConfig};
use crate::domain::{CartEntry, Order};
use crate::fulfillment::{batch_id_generator, Clock, FulfillmentHandle, FulfillmentSchedule, FulfillmentTracker, MonotonicClock};
use crate::order_actor::order_id_generator;
use crate::storage::{FileStorage, MemoryStorage, StorageService};

const ACTOR_BUFFER: usize = 32;

/// The storefront: every actor, wired together.
///
/// Responsible for starting up actors, wiring them together, resuming
/// interrupted fulfillment, and handling shutdown.
pub struct StorefrontSystem {
    pub cart_client: CartClient,
    pub order_client: OrderClient,
    pub catalog_client: CatalogClient,
    /// Batches left unfinished by an earlier session that are now running again.
    pub resumed: Vec<FulfillmentHandle>,
    tracker: FulfillmentTracker,
    handles: Vec<JoinHandle<()>>,
}

impl StorefrontSystem {
    pub async fn start(config: &StorefrontConfig) -> Result<Self, SystemError> {
        Self::start_with_clock(config, Arc::new(MonotonicClock::new())).await
    }

    pub async fn start_with_clock(config: &StorefrontConfig, clock: Arc<dyn Clock>) -> Result<Self, SystemError> {
        let storage = Arc::new(match config.storage.backend {
            StorageBackendKind::Memory => StorageService::new(Box::new(MemoryStorage::new())),
            StorageBackendKind::File => StorageService::new(Box::new(FileStorage::open(&config.storage.path).await?)),
        });
        info!(backend = ?config.storage.backend, "Storage ready");

        // 1. Cart store
        let (cart_actor, cart_resource_client) =
            ResourceActor::<CartEntry>::new(ACTOR_BUFFER, storage.clone(), line_id_generator());
        let cart_client = CartClient::new(cart_resource_client);
        let cart_handle = tokio::spawn(cart_actor.run());

        // 2. Order store
        let (order_actor, order_resource_client) =
            ResourceActor::<Order>::new(ACTOR_BUFFER, storage.clone(), order_id_generator());
        let order_handle = tokio::spawn(order_actor.run());

        // 3. Fulfillment schedules
        let (schedule_actor, schedule_resource_client) =
            ResourceActor::<FulfillmentSchedule>::new(ACTOR_BUFFER, storage, batch_id_generator());
        let schedule_handle = tokio::spawn(schedule_actor.run());

        let tracker = FulfillmentTracker::new(
            schedule_resource_client,
            order_resource_client.clone(),
            config.fulfillment.clone(),
            clock,
        );
        let order_client = OrderClient::new(order_resource_client, cart_client.clone(), tracker.clone(), &config.checkout);

        // 4. Catalog
        let source: Box<dyn CatalogSource> = match &config.catalog.path {
            Some(path) => Box::new(JsonFileCatalog::new(path)),
            None => Box::new(SampleCatalog),
        };
        let catalog_client = CatalogClient::load(source.as_ref()).await?;

        let resumed = tracker.resume_pending().await?;
        if !resumed.is_empty() {
            info!(batches = resumed.len(), "Resumed unfinished fulfillment");
        }

        Ok(Self {
            cart_client,
            order_client,
            catalog_client,
            resumed,
            tracker,
            handles: vec![cart_handle, order_handle, schedule_handle],
        })
    }

    /// Stops fulfillment tasks, then lets every actor drain and exit.
    ///
    /// Unfinished batches keep their persisted schedule and continue on the
    /// next start.
    pub async fn shutdown(self) -> Result<(), SystemError> {
        info!("Shutting down system...");
        self.tracker.shutdown().await;

        // Actors stop once every client handle is gone.
        drop(self.order_client);
        drop(self.cart_client);
        drop(self.tracker);

        for handle in self.handles {
            if let Err(e) = handle.await {
                error!("Actor task failed: {:?}", e);
                return Err(e.into());
            }
        }

        info!("System shutdown complete.");
        Ok(())
    }
}
