use std::sync::Arc;

use async_trait::async_trait;
use chrono::{FixedOffset, Utc};
use tracing::{debug, info};

use dreampoll_core::polls::PollSpec;
use dreampoll_core::registry::PollRegistry;
use dreampoll_core::summary;
use dreampoll_scheduler::BroadcastScheduler;
use dreampoll_telegram::commands::{
    help_text, start_text, BotCommandService, CommandPayload, CommandRouteError,
};
use dreampoll_telegram::events::{EventHandlerError, PollAnswerEvent, PollAnswerService};
use dreampoll_telegram::transport::{ChatTransport, Destination, TransportError};

/// The real service behind the command surface and the poll-answer stream:
/// wires the transport, the poll registry, and the broadcast scheduler
/// together. Cheap to clone; all state is shared by handle.
#[derive(Clone)]
pub struct BotService {
    transport: Arc<dyn ChatTransport>,
    registry: Arc<PollRegistry>,
    scheduler: Arc<BroadcastScheduler>,
    channel: Destination,
    offset: FixedOffset,
}

impl BotService {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        registry: Arc<PollRegistry>,
        scheduler: Arc<BroadcastScheduler>,
        channel: Destination,
        offset: FixedOffset,
    ) -> Self {
        Self { transport, registry, scheduler, channel, offset }
    }
}

fn service_failure(error: TransportError) -> CommandRouteError {
    CommandRouteError::Service(error.to_string())
}

#[async_trait]
impl BotCommandService for BotService {
    async fn start(&self, _payload: &CommandPayload) -> Result<Option<String>, CommandRouteError> {
        Ok(Some(start_text().to_owned()))
    }

    async fn help(&self, _payload: &CommandPayload) -> Result<Option<String>, CommandRouteError> {
        Ok(Some(help_text().to_owned()))
    }

    async fn send_interactive_poll(
        &self,
        payload: &CommandPayload,
    ) -> Result<Option<String>, CommandRouteError> {
        let poll = PollSpec::how_are_you();
        let destination = Destination::from(payload.chat);
        let sent =
            self.transport.send_poll(&destination, &poll).await.map_err(service_failure)?;

        info!(
            event_name = "poll.interactive.created",
            poll_id = %sent.poll_id,
            chat_id = %payload.chat,
            "interactive poll sent and registered"
        );
        self.registry.create(sent.poll_id, poll.options, payload.chat, sent.message_id);

        // The poll message itself is the response.
        Ok(None)
    }

    async fn send_channel_poll(
        &self,
        _payload: &CommandPayload,
    ) -> Result<Option<String>, CommandRouteError> {
        let today = Utc::now().with_timezone(&self.offset).date_naive();
        let poll = PollSpec::dream_recall(today);
        // Ad hoc channel polls bypass the registry: they are fire-and-forget
        // like their scheduled counterpart.
        self.transport.send_poll(&self.channel, &poll).await.map_err(service_failure)?;
        Ok(None)
    }

    async fn enable_polling(
        &self,
        payload: &CommandPayload,
    ) -> Result<Option<String>, CommandRouteError> {
        let outcome = self.scheduler.enable(payload.chat);

        let mut text = "Polling successfully scheduled!".to_owned();
        if outcome.replaced {
            text.push_str(" Old polling was removed.");
        }
        Ok(Some(text))
    }

    async fn disable_polling(
        &self,
        payload: &CommandPayload,
    ) -> Result<Option<String>, CommandRouteError> {
        let outcome = self.scheduler.disable(payload.chat);

        let text = if outcome.removed {
            "Polling job successfully cancelled!"
        } else {
            "You have no active pollings."
        };
        Ok(Some(text.to_owned()))
    }
}

#[async_trait]
impl PollAnswerService for BotService {
    async fn handle_poll_answer(&self, event: &PollAnswerEvent) -> Result<(), EventHandlerError> {
        let outcome = match self.registry.record_answer(&event.poll_id) {
            Ok(outcome) => outcome,
            Err(unknown) => {
                // Expected after restarts and for foreign polls; nothing is
                // surfaced to any user.
                debug!(poll_id = %unknown.0, "answer for an untracked poll; dropping");
                return Ok(());
            }
        };

        let labels = summary::selected_labels(&outcome.session.options, &event.selected);
        let text = summary::voter_summary(&event.voter, &labels);
        let origin = Destination::from(outcome.session.origin_chat);
        self.transport
            .send_message(&origin, &text)
            .await
            .map_err(|error| EventHandlerError::PollAnswer(error.to_string()))?;

        if outcome.should_close {
            self.transport
                .stop_poll(&origin, outcome.session.origin_message)
                .await
                .map_err(|error| EventHandlerError::PollAnswer(error.to_string()))?;
            info!(
                event_name = "poll.interactive.closed",
                poll_id = %event.poll_id,
                chat_id = %outcome.session.origin_chat,
                answer_count = outcome.session.answer_count,
                "poll closed at quorum"
            );
        }

        Ok(())
    }
}
