use std::{sync::Arc, time::Duration};

use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::events::{EventDispatcher, HandlerResult, UpdateEnvelope};
use crate::transport::{ChatTransport, Destination, TransportError};

/// Inbound side of the transport boundary: yields batches of updates.
///
/// `Ok(None)` means the source is exhausted and the runner should stop;
/// only scripted test sources ever close, the HTTP source long-polls
/// forever and returns empty batches when nothing happened.
#[async_trait]
pub trait UpdateSource: Send + Sync {
    async fn poll_updates(&self) -> Result<Option<Vec<UpdateEnvelope>>, TransportError>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_retries: 5, base_delay_ms: 250, max_delay_ms: 5_000 }
    }
}

impl RetryPolicy {
    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(16);
        let multiplier = 1_u64 << exponent;
        let delay_ms = self.base_delay_ms.saturating_mul(multiplier).min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }
}

/// Long-poll event loop: pulls update batches, dispatches them one at a
/// time, and delivers handler replies through the outbound transport.
/// Each event runs to completion before the next is processed.
pub struct PollingRunner {
    source: Arc<dyn UpdateSource>,
    transport: Arc<dyn ChatTransport>,
    dispatcher: EventDispatcher,
    retry_policy: RetryPolicy,
}

impl PollingRunner {
    pub fn new(
        source: Arc<dyn UpdateSource>,
        transport: Arc<dyn ChatTransport>,
        dispatcher: EventDispatcher,
        retry_policy: RetryPolicy,
    ) -> Self {
        Self { source, transport, dispatcher, retry_policy }
    }

    /// Runs until the source closes. Only consecutive poll failures count
    /// toward the retry bound; any successful cycle resets it, so a daemon
    /// that recovers between transient outages keeps polling indefinitely.
    pub async fn start(&self) -> Result<()> {
        info!("opening update stream");
        let mut consecutive_failures = 0u32;

        loop {
            match self.source.poll_updates().await {
                Ok(Some(batch)) => {
                    consecutive_failures = 0;
                    self.dispatch_batch(batch).await;
                }
                Ok(None) => {
                    info!("update stream closed");
                    return Ok(());
                }
                Err(transport_error) => {
                    warn!(
                        consecutive_failures,
                        max_retries = self.retry_policy.max_retries,
                        error = %transport_error,
                        "update polling failed"
                    );

                    if consecutive_failures >= self.retry_policy.max_retries {
                        warn!(
                            max_retries = self.retry_policy.max_retries,
                            "update polling retries exhausted; continuing process without crash"
                        );
                        return Ok(());
                    }

                    let delay = self.retry_policy.backoff(consecutive_failures);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    consecutive_failures += 1;
                }
            }
        }
    }

    async fn dispatch_batch(&self, batch: Vec<UpdateEnvelope>) {
        for envelope in batch {
            debug!(
                event_name = "ingress.telegram.update_received",
                update_id = envelope.update_id,
                event_type = ?envelope.event.event_type(),
                "received update"
            );

            match self.dispatcher.dispatch(&envelope).await {
                Ok(HandlerResult::Replied(reply)) => {
                    let destination = Destination::from(reply.destination);
                    if let Err(error) =
                        self.transport.send_message(&destination, &reply.text).await
                    {
                        warn!(
                            update_id = envelope.update_id,
                            chat_id = %reply.destination,
                            error = %error,
                            "failed to deliver reply"
                        );
                    }
                }
                Ok(HandlerResult::Processed | HandlerResult::Ignored) => {}
                Err(error) => {
                    warn!(
                        update_id = envelope.update_id,
                        error = %error,
                        "update dispatch failed; continuing polling loop"
                    );
                }
            }
        }
    }
}
