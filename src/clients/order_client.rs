use tracing::{error, info, instrument, warn};

use crate::actor_framework::{FrameworkError, ImportOutcome, ResourceClient};
use crate::app_system::CheckoutError;
use crate::clients::CartClient;
use crate::config::CheckoutConfig;
use crate::domain::{
    cart_total, DeliveryAssignment, DeliveryPersonnel, Order, OrderCreate, PaymentMethod, TrackingInfo,
};
use crate::fulfillment::{FulfillmentHandle, FulfillmentTracker};
use crate::impl_client_methods;
use crate::order_actor::{OrderAction, OrderError};

/// Result of a successful checkout.
#[derive(Debug)]
pub struct CheckoutReceipt {
    pub batch_id: String,
    pub order_ids: Vec<String>,
    pub total: f64,
    pub payment_method: PaymentMethod,
    /// Last order of the batch.
    pub latest_order: Order,
    pub fulfillment: FulfillmentHandle,
}

/// Client for interacting with the Order actor.
///
/// This client handles the checkout orchestration: it reads the cart, applies
/// the payment policy, creates the orders, empties the cart and starts
/// fulfillment of the new batch.
#[derive(Clone)]
pub struct OrderClient {
    inner: ResourceClient<Order>,
    cart_client: CartClient,
    tracker: FulfillmentTracker,
    cod_limit: f64,
}

impl OrderClient {
    pub fn new(
        inner: ResourceClient<Order>,
        cart_client: CartClient,
        tracker: FulfillmentTracker,
        checkout: &CheckoutConfig,
    ) -> Self {
        Self {
            inner,
            cart_client,
            tracker,
            cod_limit: checkout.cod_limit,
        }
    }

    #[instrument(skip(self))]
    pub async fn checkout(&self, payment_method: PaymentMethod) -> Result<CheckoutReceipt, CheckoutError> {
        info!("Processing checkout request (Client Side)");

        // Step 1: Read the cart
        let entries = self.cart_client.list_entries().await?;
        if entries.is_empty() {
            warn!("Checkout attempted with an empty cart");
            return Err(CheckoutError::EmptyCart);
        }
        let total = cart_total(&entries);

        // Step 2: Payment policy
        if payment_method == PaymentMethod::CashOnDelivery && total > self.cod_limit {
            warn!(
                total,
                limit = self.cod_limit,
                "Cash on Delivery is not available for orders above {}",
                self.cod_limit
            );
            return Err(CheckoutError::CodLimitExceeded {
                total,
                limit: self.cod_limit,
            });
        }

        // Step 3: One order per cart line, in cart order
        let params = entries
            .iter()
            .map(|entry| OrderCreate::single(entry.product.name.clone()))
            .collect();
        let orders = self.inner.create_many(params).await.map_err(|e| {
            error!(error = %e, "Order creation failed");
            e
        })?;
        let Some(latest_order) = orders.last().cloned() else {
            return Err(CheckoutError::EmptyCart);
        };
        info!(count = orders.len(), total, "Orders placed");

        // Step 4: Remove the lines that were checked out; lines added since
        // step 1 stay in the cart
        let line_ids = entries.into_iter().map(|entry| entry.line_id).collect();
        self.cart_client.remove_lines(line_ids).await?;

        // Step 5: Start the status sequence
        let fulfillment = self.tracker.start(&orders).await.map_err(|e| {
            error!(error = %e, "Fulfillment could not be started");
            e
        })?;

        Ok(CheckoutReceipt {
            batch_id: fulfillment.batch_id().to_string(),
            order_ids: orders.iter().map(|order| order.id.clone()).collect(),
            total,
            payment_method,
            latest_order,
            fulfillment,
        })
    }

    /// Sets the rating of a delivered order. Rating the same value again
    /// leaves the stored order untouched.
    #[instrument(skip(self))]
    pub async fn rate_order(&self, id: String, rating: u8) -> Result<Order, OrderError> {
        let order = self
            .inner
            .perform_action(id, OrderAction::Rate(rating))
            .await
            .map_err(refine)?
            .into_order();
        info!(order_id = %order.id, rating, "Order rated");
        Ok(order)
    }

    /// The most recently placed order, if any.
    pub async fn latest_order(&self) -> Result<Option<Order>, OrderError> {
        Ok(self.inner.list().await?.pop())
    }

    /// Tracking details. While the batch is still moving, the status comes
    /// from its fulfillment schedule.
    #[instrument(skip(self))]
    pub async fn track_order(&self, id: String) -> Result<TrackingInfo, OrderError> {
        let order = self.require(id).await?;
        let mut info = order.tracking_info();
        if !order.status.is_terminal() {
            match self.tracker.stage_of(&order.id).await {
                Ok(Some(stage)) => info.status = stage,
                Ok(None) => {}
                Err(e) => warn!(error = %e, "Fulfillment stage unavailable"),
            }
        }
        Ok(info)
    }

    #[instrument(skip(self))]
    pub async fn contact_delivery(&self, id: String) -> Result<DeliveryPersonnel, OrderError> {
        let order = self.require(id).await?;
        order
            .delivery_personnel
            .ok_or(OrderError::DeliveryContactUnavailable(order.id))
    }

    #[instrument(skip(self))]
    pub async fn assign_delivery(&self, id: String, assignment: DeliveryAssignment) -> Result<Order, OrderError> {
        let order = self
            .inner
            .perform_action(id, OrderAction::AssignDelivery(assignment))
            .await
            .map_err(refine)?
            .into_order();
        info!(order_id = %order.id, "Delivery details attached");
        Ok(order)
    }

    /// Restores orders from an older dump, keeping their ids.
    pub(crate) async fn import(&self, orders: Vec<Order>) -> Result<ImportOutcome, OrderError> {
        self.inner.import(orders).await
    }

    async fn require(&self, id: String) -> Result<Order, OrderError> {
        self.inner.get(id.clone()).await?.ok_or(OrderError::NotFound(id))
    }
}

impl_client_methods!(OrderClient, Order, OrderError, order, orders);

fn refine(e: OrderError) -> OrderError {
    match e {
        OrderError::Framework(FrameworkError::NotFound(id)) => OrderError::NotFound(id),
        other => other,
    }
}
