//! Simulated fulfillment of a checked-out batch.
//!
//! A batch moves Placed -> Preparing -> Out for Delivery -> Delivered on fixed
//! delays. Progress is kept in a durable [`FulfillmentSchedule`] holding the
//! time the next transition is due, so a restarted process picks up where the
//! previous one stopped.

pub mod clock;
pub mod tracker;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::actor_framework::{Entity, FrameworkError};
use crate::domain::{Order, OrderStatus};
use crate::order_actor::OrderError;

pub use clock::{Clock, MonotonicClock};
pub use tracker::{FulfillmentHandle, FulfillmentTracker};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum FulfillmentError {
    #[error("Cannot move batch from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
    #[error("Cannot schedule an empty batch")]
    EmptyBatch,
    #[error("Order update failed: {0}")]
    Order(#[from] OrderError),
    #[error(transparent)]
    Framework(#[from] FrameworkError),
}

/// Durable progress of one batch through the status sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FulfillmentSchedule {
    pub batch_id: String,
    pub order_ids: Vec<String>,
    /// Snapshot of the newest order of the batch, kept in step with `stage`.
    pub latest_order: Order,
    pub stage: OrderStatus,
    /// Unix milliseconds; `None` once the batch is delivered.
    pub next_transition_due_at_ms: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct ScheduleCreate {
    pub order_ids: Vec<String>,
    pub latest_order: Order,
    pub first_due_at_ms: u64,
}

#[derive(Debug, Clone)]
pub enum ScheduleAction {
    Advance {
        to: OrderStatus,
        next_due_at_ms: Option<u64>,
    },
}

impl Entity for FulfillmentSchedule {
    type Id = String;
    type CreateParams = ScheduleCreate;
    type Action = ScheduleAction;
    type ActionResult = FulfillmentSchedule;
    type Error = FulfillmentError;

    const NAMESPACE: &'static str = "fulfillment";

    fn id(&self) -> &String {
        &self.batch_id
    }

    fn from_create_params(batch_id: String, params: ScheduleCreate) -> Result<Self, FulfillmentError> {
        if params.order_ids.is_empty() {
            return Err(FulfillmentError::EmptyBatch);
        }
        Ok(Self {
            batch_id,
            order_ids: params.order_ids,
            stage: params.latest_order.status,
            latest_order: params.latest_order,
            next_transition_due_at_ms: Some(params.first_due_at_ms),
        })
    }

    /// Only single forward steps are accepted.
    fn handle_action(&mut self, action: ScheduleAction) -> Result<FulfillmentSchedule, FulfillmentError> {
        match action {
            ScheduleAction::Advance { to, next_due_at_ms } => {
                if self.stage.next() != Some(to) {
                    return Err(FulfillmentError::InvalidTransition { from: self.stage, to });
                }
                self.stage = to;
                self.latest_order.status = to;
                self.next_transition_due_at_ms = next_due_at_ms;
                Ok(self.clone())
            }
        }
    }
}

/// Batch ids: `batch-` followed by an order-style time and random id.
pub fn batch_id_generator() -> impl Fn() -> String + Send + Sync + 'static {
    let next = crate::order_actor::order_id_generator();
    move || format!("batch-{}", next())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::OrderCreate;

    fn schedule() -> FulfillmentSchedule {
        let order = Order::from_create_params("o2".into(), OrderCreate::single("Cement")).unwrap();
        FulfillmentSchedule::from_create_params(
            "batch-1".into(),
            ScheduleCreate {
                order_ids: vec!["o1".into(), "o2".into()],
                latest_order: order,
                first_due_at_ms: 4_000,
            },
        )
        .unwrap()
    }

    #[test]
    fn test_advance_moves_one_step() {
        let mut schedule = schedule();
        let advanced = schedule
            .handle_action(ScheduleAction::Advance {
                to: OrderStatus::Preparing,
                next_due_at_ms: Some(6_000),
            })
            .unwrap();
        assert_eq!(advanced.stage, OrderStatus::Preparing);
        assert_eq!(advanced.latest_order.status, OrderStatus::Preparing);
        assert_eq!(advanced.next_transition_due_at_ms, Some(6_000));
    }

    #[test]
    fn test_skipping_a_stage_is_rejected() {
        let mut schedule = schedule();
        let result = schedule.handle_action(ScheduleAction::Advance {
            to: OrderStatus::Delivered,
            next_due_at_ms: None,
        });
        assert_eq!(
            result,
            Err(FulfillmentError::InvalidTransition {
                from: OrderStatus::Placed,
                to: OrderStatus::Delivered
            })
        );
        assert_eq!(schedule.stage, OrderStatus::Placed);
    }

    #[test]
    fn test_empty_batch_is_rejected() {
        let order = Order::from_create_params("o1".into(), OrderCreate::single("Cement")).unwrap();
        let result = FulfillmentSchedule::from_create_params(
            "batch-1".into(),
            ScheduleCreate {
                order_ids: vec![],
                latest_order: order,
                first_due_at_ms: 0,
            },
        );
        assert_eq!(result, Err(FulfillmentError::EmptyBatch));
    }
}
