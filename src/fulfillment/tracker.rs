use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn, Instrument};

use super::{Clock, FulfillmentError, FulfillmentSchedule, ScheduleAction, ScheduleCreate};
use crate::actor_framework::{FrameworkError, ResourceClient};
use crate::config::FulfillmentConfig;
use crate::domain::{Order, OrderStatus};
use crate::order_actor::{OrderAction, OrderError};

/// What the customer sees for a batch in progress.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackingUpdate {
    pub batch_id: String,
    pub status: OrderStatus,
    pub message: &'static str,
    pub latest_order: Order,
}

impl From<&FulfillmentSchedule> for TrackingUpdate {
    fn from(schedule: &FulfillmentSchedule) -> Self {
        Self {
            batch_id: schedule.batch_id.clone(),
            status: schedule.stage,
            message: schedule.stage.progress_message(),
            latest_order: schedule.latest_order.clone(),
        }
    }
}

/// Owned view of a running batch.
///
/// Dropping the handle does not stop the batch; call [`FulfillmentHandle::cancel`].
#[derive(Debug)]
pub struct FulfillmentHandle {
    batch_id: String,
    updates: watch::Receiver<TrackingUpdate>,
    cancel: Arc<Notify>,
}

impl FulfillmentHandle {
    pub fn batch_id(&self) -> &str {
        &self.batch_id
    }

    /// The latest order of the batch as last reported.
    pub fn latest(&self) -> TrackingUpdate {
        self.updates.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<TrackingUpdate> {
        self.updates.clone()
    }

    /// Stops further transitions. The persisted schedule stays behind and is
    /// picked up again by [`FulfillmentTracker::resume_pending`].
    pub fn cancel(&self) {
        self.cancel.notify_one();
    }

    /// Waits until the batch is delivered or its task stops, and returns the
    /// last update seen.
    pub async fn wait_until_finished(&mut self) -> TrackingUpdate {
        loop {
            if self.updates.borrow_and_update().status.is_terminal() {
                break;
            }
            if self.updates.changed().await.is_err() {
                break;
            }
        }
        self.latest()
    }
}

struct RunningBatch {
    cancel: Arc<Notify>,
    task: JoinHandle<()>,
}

/// Drives batches through the status sequence.
///
/// Intermediate stages are recorded on the schedule and reported through the
/// handle. Reaching Delivered also rewrites every order of the batch in the
/// order store.
#[derive(Clone)]
pub struct FulfillmentTracker {
    schedules: ResourceClient<FulfillmentSchedule>,
    orders: ResourceClient<Order>,
    config: FulfillmentConfig,
    clock: Arc<dyn Clock>,
    running: Arc<Mutex<HashMap<String, RunningBatch>>>,
}

impl FulfillmentTracker {
    pub fn new(
        schedules: ResourceClient<FulfillmentSchedule>,
        orders: ResourceClient<Order>,
        config: FulfillmentConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            schedules,
            orders,
            config,
            clock,
            running: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Persists a schedule for a freshly created batch and starts it.
    #[instrument(skip(self, batch), fields(orders = batch.len()))]
    pub async fn start(&self, batch: &[Order]) -> Result<FulfillmentHandle, FulfillmentError> {
        let Some(latest) = batch.last() else {
            return Err(FulfillmentError::EmptyBatch);
        };

        let params = ScheduleCreate {
            order_ids: batch.iter().map(|order| order.id.clone()).collect(),
            latest_order: latest.clone(),
            first_due_at_ms: self.clock.now_unix_ms() + millis(self.config.delay_before(OrderStatus::Preparing)),
        };
        let schedule = self
            .schedules
            .create_many(vec![params])
            .await?
            .pop()
            .ok_or_else(|| FrameworkError::NotFound("created schedule".to_string()))?;

        info!(batch_id = %schedule.batch_id, "Fulfillment scheduled");
        Ok(self.spawn(schedule))
    }

    /// Continues every schedule left behind by an earlier session.
    ///
    /// Transitions that fell due while nothing was running are applied right
    /// away, one stage at a time. Batches that are still in progress get a
    /// task and a handle.
    #[instrument(skip(self))]
    pub async fn resume_pending(&self) -> Result<Vec<FulfillmentHandle>, FulfillmentError> {
        let mut handles = Vec::new();

        for mut schedule in self.schedules.list().await? {
            if self.lock_running().contains_key(&schedule.batch_id) {
                continue;
            }

            let now = self.clock.now_unix_ms();
            while !schedule.stage.is_terminal()
                && schedule.next_transition_due_at_ms.map_or(true, |due| due <= now)
            {
                schedule = self.advance(&schedule).await?;
            }

            if schedule.stage.is_terminal() {
                self.finish(&schedule.batch_id).await;
            } else {
                info!(batch_id = %schedule.batch_id, status = %schedule.stage, "Resuming fulfillment");
                handles.push(self.spawn(schedule));
            }
        }

        Ok(handles)
    }

    /// Cancels every running batch and waits for the tasks to stop.
    pub async fn shutdown(&self) {
        let running: Vec<RunningBatch> = self.lock_running().drain().map(|(_, batch)| batch).collect();
        for batch in &running {
            batch.cancel.notify_one();
        }
        for batch in running {
            if let Err(e) = batch.task.await {
                error!(error = %e, "Fulfillment task failed");
            }
        }
    }

    /// Stage of the unfinished batch that holds `order_id`, if there is one.
    pub async fn stage_of(&self, order_id: &str) -> Result<Option<OrderStatus>, FulfillmentError> {
        let schedules = self.schedules.list().await?;
        Ok(schedules
            .into_iter()
            .find(|schedule| schedule.order_ids.iter().any(|id| id == order_id))
            .map(|schedule| schedule.stage))
    }

    pub fn running_batches(&self) -> usize {
        self.lock_running().len()
    }

    fn lock_running(&self) -> MutexGuard<'_, HashMap<String, RunningBatch>> {
        self.running.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn spawn(&self, schedule: FulfillmentSchedule) -> FulfillmentHandle {
        let batch_id = schedule.batch_id.clone();
        let cancel = Arc::new(Notify::new());
        let (updates_tx, updates_rx) = watch::channel(TrackingUpdate::from(&schedule));

        let tracker = self.clone();
        let task_cancel = cancel.clone();
        let span = tracing::info_span!("fulfillment", batch_id = %batch_id);

        // Held across the spawn so the task cannot deregister before it is registered.
        let mut running = self.lock_running();
        let task = tokio::spawn(tracker.drive(schedule, updates_tx, task_cancel).instrument(span));
        running.insert(
            batch_id.clone(),
            RunningBatch {
                cancel: cancel.clone(),
                task,
            },
        );
        drop(running);

        FulfillmentHandle {
            batch_id,
            updates: updates_rx,
            cancel,
        }
    }

    async fn drive(
        self,
        mut schedule: FulfillmentSchedule,
        updates: watch::Sender<TrackingUpdate>,
        cancel: Arc<Notify>,
    ) {
        while !schedule.stage.is_terminal() {
            let now = self.clock.now_unix_ms();
            let due = schedule.next_transition_due_at_ms.unwrap_or(now);
            let wait = Duration::from_millis(due.saturating_sub(now));
            debug!(status = %schedule.stage, wait_ms = wait.as_millis() as u64, "Waiting for next transition");

            tokio::select! {
                biased;
                _ = cancel.notified() => {
                    info!(status = %schedule.stage, "Fulfillment cancelled");
                    self.lock_running().remove(&schedule.batch_id);
                    return;
                }
                _ = tokio::time::sleep(wait) => {}
            }

            match self.advance(&schedule).await {
                Ok(advanced) => {
                    schedule = advanced;
                    updates.send_replace(TrackingUpdate::from(&schedule));
                }
                Err(e) => {
                    error!(error = %e, "Fulfillment stopped");
                    self.lock_running().remove(&schedule.batch_id);
                    return;
                }
            }
        }

        self.finish(&schedule.batch_id).await;
        self.lock_running().remove(&schedule.batch_id);
    }

    /// Applies the next transition and persists it with the following due time.
    /// Due times chain from the previous due time, not from now.
    async fn advance(&self, schedule: &FulfillmentSchedule) -> Result<FulfillmentSchedule, FulfillmentError> {
        let Some(next) = schedule.stage.next() else {
            return Ok(schedule.clone());
        };
        let due = schedule
            .next_transition_due_at_ms
            .unwrap_or_else(|| self.clock.now_unix_ms());

        if next == OrderStatus::Delivered {
            self.deliver_batch(&schedule.order_ids).await?;
        }

        let next_due_at_ms = next.next().map(|after| due + millis(self.config.delay_before(after)));
        let advanced = self
            .schedules
            .perform_action(
                schedule.batch_id.clone(),
                ScheduleAction::Advance {
                    to: next,
                    next_due_at_ms,
                },
            )
            .await?;

        info!(batch_id = %advanced.batch_id, status = %next, "{}", next.progress_message());
        Ok(advanced)
    }

    /// Marks every order of the batch delivered. Orders that no longer exist
    /// are skipped; any other failure leaves the schedule where it was.
    async fn deliver_batch(&self, order_ids: &[String]) -> Result<(), FulfillmentError> {
        for id in order_ids {
            match self.orders.perform_action(id.clone(), OrderAction::MarkDelivered).await {
                Ok(_) => {}
                Err(OrderError::Framework(FrameworkError::NotFound(_))) => {
                    warn!(order_id = %id, "Order vanished before delivery");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    async fn finish(&self, batch_id: &str) {
        if let Err(e) = self.schedules.delete(batch_id.to_string()).await {
            warn!(batch_id, error = %e, "Finished schedule could not be removed");
        }
    }
}

fn millis(duration: Duration) -> u64 {
    duration.as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor_framework::ResourceActor;
    use crate::domain::OrderCreate;
    use crate::fulfillment::{batch_id_generator, MonotonicClock};
    use crate::order_actor::order_id_generator;
    use crate::storage::StorageService;
    use tokio::time::Instant;

    struct Harness {
        orders: ResourceClient<Order>,
        schedules: ResourceClient<FulfillmentSchedule>,
        // One wall clock shared by every simulated session.
        clock: Arc<MonotonicClock>,
    }

    impl Harness {
        fn new() -> Self {
            let storage = Arc::new(StorageService::in_memory());
            let (order_actor, orders) = ResourceActor::<Order>::new(32, storage.clone(), order_id_generator());
            let (schedule_actor, schedules) =
                ResourceActor::<FulfillmentSchedule>::new(32, storage, batch_id_generator());
            tokio::spawn(order_actor.run());
            tokio::spawn(schedule_actor.run());
            Self {
                orders,
                schedules,
                clock: Arc::new(MonotonicClock::new()),
            }
        }

        fn tracker(&self) -> FulfillmentTracker {
            FulfillmentTracker::new(
                self.schedules.clone(),
                self.orders.clone(),
                FulfillmentConfig::default(),
                self.clock.clone(),
            )
        }

        async fn place(&self, names: &[&str]) -> Vec<Order> {
            let params = names.iter().map(|name| OrderCreate::single(*name)).collect();
            self.orders.create_many(params).await.unwrap()
        }

        async fn statuses(&self) -> Vec<OrderStatus> {
            self.orders.list().await.unwrap().into_iter().map(|o| o.status).collect()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_walks_through_every_status() {
        let harness = Harness::new();
        let tracker = harness.tracker();
        let batch = harness.place(&["Cement", "Bricks"]).await;

        let handle = tracker.start(&batch).await.unwrap();
        let mut updates = handle.subscribe();

        let mut seen = vec![updates.borrow_and_update().status];
        while updates.changed().await.is_ok() {
            seen.push(updates.borrow_and_update().status);
        }

        assert_eq!(
            seen,
            vec![
                OrderStatus::Placed,
                OrderStatus::Preparing,
                OrderStatus::OutForDelivery,
                OrderStatus::Delivered
            ]
        );
        assert_eq!(handle.latest().latest_order.id, batch[1].id);
        assert_eq!(harness.statuses().await, vec![OrderStatus::Delivered; 2]);
        assert!(harness.schedules.list().await.unwrap().is_empty());
        assert_eq!(tracker.running_batches(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transitions_follow_configured_delays() {
        let harness = Harness::new();
        let tracker = harness.tracker();
        let batch = harness.place(&["Cement"]).await;

        let handle = tracker.start(&batch).await.unwrap();

        tokio::time::sleep(Duration::from_millis(3_900)).await;
        assert_eq!(handle.latest().status, OrderStatus::Placed);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(handle.latest().status, OrderStatus::Preparing);
        // Intermediate stages live on the schedule only.
        assert_eq!(harness.statuses().await, vec![OrderStatus::Placed]);

        tokio::time::sleep(Duration::from_millis(2_000)).await;
        assert_eq!(handle.latest().status, OrderStatus::OutForDelivery);

        tokio::time::sleep(Duration::from_millis(2_000)).await;
        assert_eq!(handle.latest().status, OrderStatus::Delivered);
        assert_eq!(harness.statuses().await, vec![OrderStatus::Delivered]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_keeps_schedule_for_later() {
        let harness = Harness::new();
        let tracker = harness.tracker();
        let batch = harness.place(&["Cement"]).await;

        let mut handle = tracker.start(&batch).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5_000)).await;
        handle.cancel();

        let last = handle.wait_until_finished().await;
        assert_eq!(last.status, OrderStatus::Preparing);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(harness.statuses().await, vec![OrderStatus::Placed]);

        let schedules = harness.schedules.list().await.unwrap();
        assert_eq!(schedules.len(), 1);
        assert_eq!(schedules[0].stage, OrderStatus::Preparing);
        assert_eq!(tracker.stage_of(&batch[0].id).await.unwrap(), Some(OrderStatus::Preparing));
        assert_eq!(tracker.stage_of("elsewhere").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resume_catches_up_overdue_transitions() {
        let harness = Harness::new();
        let batch = harness.place(&["Cement", "Steel"]).await;

        let first_session = harness.tracker();
        let mut handle = first_session.start(&batch).await.unwrap();
        tokio::time::sleep(Duration::from_millis(4_500)).await;
        handle.cancel();
        handle.wait_until_finished().await;

        // Long after everything should have been delivered.
        tokio::time::sleep(Duration::from_secs(60)).await;

        let second_session = harness.tracker();
        let resumed = second_session.resume_pending().await.unwrap();
        assert!(resumed.is_empty());
        assert_eq!(harness.statuses().await, vec![OrderStatus::Delivered; 2]);
        assert!(harness.schedules.list().await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_resume_keeps_original_deadline() {
        let harness = Harness::new();
        let batch = harness.place(&["Cement"]).await;
        let started = Instant::now();

        let first_session = harness.tracker();
        let mut handle = first_session.start(&batch).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5_000)).await;
        handle.cancel();
        handle.wait_until_finished().await;

        let second_session = harness.tracker();
        let mut resumed = second_session.resume_pending().await.unwrap();
        assert_eq!(resumed.len(), 1);
        assert_eq!(resumed[0].latest().status, OrderStatus::Preparing);

        let finished = resumed[0].wait_until_finished().await;
        assert_eq!(finished.status, OrderStatus::Delivered);
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(8_000), "finished early: {:?}", elapsed);
        assert!(elapsed < Duration::from_millis(8_100), "finished late: {:?}", elapsed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_running_batches() {
        let harness = Harness::new();
        let tracker = harness.tracker();
        let batch = harness.place(&["Cement"]).await;

        let mut handle = tracker.start(&batch).await.unwrap();
        assert_eq!(tracker.running_batches(), 1);

        tracker.shutdown().await;
        assert_eq!(tracker.running_batches(), 0);
        assert_eq!(handle.wait_until_finished().await.status, OrderStatus::Placed);
    }

    #[tokio::test]
    async fn test_empty_batch_is_rejected() {
        let harness = Harness::new();
        let result = harness.tracker().start(&[]).await;
        assert!(matches!(result, Err(FulfillmentError::EmptyBatch)));
    }
}
