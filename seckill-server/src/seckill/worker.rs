//! Order Worker - drains the order queue into persistent orders
//!
//! Single consumer loop:
//!
//! 1. On startup, re-handle this consumer's pending (read, unacknowledged)
//!    entries left over from a previous run.
//! 2. Block on new entries, handle each, acknowledge.
//! 3. After any failure, fall back to draining the pending list until it is
//!    empty, then resume step 2. A failed read also re-creates the consumer
//!    group, since the stream key may have been deleted.
//!
//! An entry is acknowledged once it has been handled, whatever the business
//! outcome (created, duplicate, out of stock, lease busy). Corrupt entries are
//! copied to the dead-letter stream and acknowledged. Infrastructure failures
//! leave the entry pending so it is retried.
//!
//! A busy buyer lease drops a first delivery, but a redelivered entry stays
//! pending and is retried with backoff: its lease may belong to the consumer
//! that crashed before acknowledging it, and expires on its own.

use super::materializer::{Materialized, OrderMaterializer};
use super::queue::{OrderEntry, OrderQueue};
use crate::error::QueueError;
use crate::store::StreamEntry;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const RETRY_BASE_DELAY_MS: u64 = 20;
const RETRY_MAX_DELAY_MS: u64 = 2_000;

/// Where an entry was read from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delivery {
    First,
    Redelivery,
}

pub struct OrderWorker {
    queue: OrderQueue,
    materializer: Arc<OrderMaterializer>,
    shutdown: CancellationToken,
}

impl OrderWorker {
    pub fn new(
        queue: OrderQueue,
        materializer: Arc<OrderMaterializer>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            queue,
            materializer,
            shutdown,
        }
    }

    /// Run until the shutdown token is cancelled
    pub async fn run(self) {
        tracing::info!(stream = %self.queue.stream(), "OrderWorker started");

        if !self.init_group().await {
            return;
        }

        // Leftovers from a previous run go first
        self.drain_pending().await;

        let mut read_failures = 0;
        loop {
            let read = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                read = self.queue.consume() => read,
            };

            match read {
                Ok(entries) => {
                    read_failures = 0;
                    for entry in entries {
                        if let Err(e) = self.handle(&entry, Delivery::First).await {
                            tracing::error!(entry_id = %entry.id, error = %e, "Failed to handle order entry");
                            self.drain_pending().await;
                        }
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, attempt = read_failures, "Failed to read order queue");
                    if !self.backoff(read_failures).await {
                        break;
                    }
                    read_failures = read_failures.saturating_add(1);
                    // NOGROUP after the stream key was deleted
                    if let Err(e) = self.queue.init().await {
                        tracing::warn!(error = %e, "Failed to re-create consumer group");
                    }
                    self.drain_pending().await;
                }
            }
        }

        tracing::info!("OrderWorker stopped");
    }

    /// Create the consumer group, retrying until it works or shutdown
    async fn init_group(&self) -> bool {
        let mut attempt = 0;
        loop {
            match self.queue.init().await {
                Ok(()) => return true,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to create consumer group");
                    if !self.backoff(attempt).await {
                        return false;
                    }
                    attempt += 1;
                }
            }
        }
    }

    /// Re-handle pending entries until none are left (or shutdown)
    async fn drain_pending(&self) {
        let mut attempt = 0;
        loop {
            if self.shutdown.is_cancelled() {
                return;
            }

            let failure = match self.queue.consume_pending().await {
                Ok(entries) if entries.is_empty() => return,
                Ok(entries) => {
                    let mut failure = None;
                    for entry in entries {
                        tracing::info!(entry_id = %entry.id, "Redelivering pending order entry");
                        if let Err(e) = self.handle(&entry, Delivery::Redelivery).await {
                            failure = Some(e);
                            break;
                        }
                    }
                    failure
                }
                Err(e) => Some(e.into()),
            };

            match failure {
                None => attempt = 0,
                Some(e) => {
                    tracing::error!(error = %e, attempt, "Pending order entry failed again");
                    if !self.backoff(attempt).await {
                        return;
                    }
                    attempt += 1;
                }
            }
        }
    }

    /// Sleep before the next retry; false if shutdown was requested meanwhile
    async fn backoff(&self, attempt: u32) -> bool {
        let delay_ms = (RETRY_BASE_DELAY_MS * 2u64.pow(attempt.min(16))).min(RETRY_MAX_DELAY_MS);
        tokio::select! {
            _ = self.shutdown.cancelled() => false,
            _ = tokio::time::sleep(Duration::from_millis(delay_ms)) => true,
        }
    }

    /// Handle one delivered entry; `Err` leaves it pending
    async fn handle(&self, entry: &StreamEntry, delivery: Delivery) -> Result<(), QueueError> {
        let order = match OrderEntry::from_stream(entry) {
            Ok(order) => order,
            Err(QueueError::CorruptEntry { entry_id, reason }) => {
                tracing::error!(entry_id = %entry_id, reason = %reason, "Corrupt order entry, dead-lettering");
                self.queue.dead_letter(entry, &reason).await?;
                self.queue.acknowledge(&entry.id).await?;
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let outcome = self.materializer.materialize(&order).await?;
        match outcome {
            Materialized::Created => {
                tracing::info!(order_id = order.order_id, user_id = order.user_id, voucher_id = order.voucher_id, "Order created");
            }
            Materialized::Duplicate => {
                tracing::info!(order_id = order.order_id, user_id = order.user_id, "Order already exists, skipping");
            }
            Materialized::OutOfStock => {
                tracing::warn!(order_id = order.order_id, voucher_id = order.voucher_id, "Voucher stock exhausted at materialization");
            }
            Materialized::LockBusy if delivery == Delivery::Redelivery => {
                return Err(QueueError::LeaseBusy {
                    user_id: order.user_id,
                });
            }
            Materialized::LockBusy => {}
        }

        self.queue.acknowledge(&entry.id).await?;
        Ok(())
    }
}
