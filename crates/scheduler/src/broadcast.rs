use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use tracing::{info, warn};

use dreampoll_core::polls::PollSpec;
use dreampoll_core::registry::ChatId;
use dreampoll_core::schedule::next_morning_run;
use dreampoll_telegram::transport::{ChatTransport, Destination};

use crate::jobs::{JobAction, JobQueue};

/// Repeat period of the broadcast schedule: one calendar day.
pub const BROADCAST_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnableOutcome {
    /// Whether an existing schedule for the same chat was superseded; the
    /// command handler phrases its confirmation off this.
    pub replaced: bool,
    pub first_run_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DisableOutcome {
    pub removed: bool,
}

/// Owns the per-destination recurring job that re-sends the dream-recall
/// poll to the channel every morning. Jobs are keyed by the stringified
/// chat id of whoever enabled them, so each chat controls one schedule.
///
/// Broadcast firings never touch the poll registry: channel polls are
/// fire-and-forget and are not tracked for quorum close.
pub struct BroadcastScheduler {
    queue: Arc<JobQueue>,
    transport: Arc<dyn ChatTransport>,
    channel: Destination,
    offset: FixedOffset,
    hour: u32,
}

impl BroadcastScheduler {
    pub fn new(
        queue: Arc<JobQueue>,
        transport: Arc<dyn ChatTransport>,
        channel: Destination,
        offset: FixedOffset,
        hour: u32,
    ) -> Self {
        Self { queue, transport, channel, offset, hour }
    }

    /// Schedules the daily broadcast for `chat`, superseding any schedule
    /// it already had. The first firing lands at the configured hour on the
    /// next calendar day in the fixed reference offset.
    pub fn enable(&self, chat: ChatId) -> EnableOutcome {
        let now = Utc::now();
        let first_run_at = next_morning_run(now, self.offset, self.hour);
        let first_run_in = (first_run_at - now).to_std().unwrap_or(Duration::ZERO);

        let action = Arc::new(SendChannelPoll {
            transport: self.transport.clone(),
            channel: self.channel.clone(),
            offset: self.offset,
        });
        let replaced =
            self.queue.run_repeating(&chat.to_string(), first_run_in, BROADCAST_INTERVAL, action);

        info!(
            event_name = "scheduler.broadcast.enabled",
            chat_id = %chat,
            first_run_at = %first_run_at,
            replaced,
            "recurring channel poll scheduled"
        );

        EnableOutcome { replaced, first_run_at }
    }

    /// Cancels the daily broadcast for `chat` if one is scheduled.
    pub fn disable(&self, chat: ChatId) -> DisableOutcome {
        let removed = self.queue.remove_jobs_by_name(&chat.to_string());

        info!(
            event_name = "scheduler.broadcast.disabled",
            chat_id = %chat,
            removed,
            "recurring channel poll cancellation requested"
        );

        DisableOutcome { removed }
    }
}

/// The fire action: build today's dream-recall poll and send it to the
/// channel. A failed send is logged and swallowed so the schedule survives
/// transient transport trouble.
struct SendChannelPoll {
    transport: Arc<dyn ChatTransport>,
    channel: Destination,
    offset: FixedOffset,
}

#[async_trait]
impl JobAction for SendChannelPoll {
    async fn run(&self) {
        let today = Utc::now().with_timezone(&self.offset).date_naive();
        let poll = PollSpec::dream_recall(today);

        if let Err(error) = self.transport.send_poll(&self.channel, &poll).await {
            warn!(
                channel = %self.channel,
                error = %error,
                "scheduled channel poll send failed"
            );
        }
    }
}
