use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

use dreampoll_core::errors::ApplicationError;
use dreampoll_core::registry::PollId;

use crate::commands::{
    BotCommandService, CommandPayload, CommandRouteError, CommandRouter, Reply,
};

/// One update pulled from the transport, tagged with Telegram's monotonic
/// update id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpdateEnvelope {
    pub update_id: i64,
    pub event: TelegramEvent,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TelegramEvent {
    Command(CommandPayload),
    PollAnswer(PollAnswerEvent),
    Unsupported { kind: String },
}

impl TelegramEvent {
    pub fn event_type(&self) -> TelegramEventType {
        match self {
            Self::Command(_) => TelegramEventType::Command,
            Self::PollAnswer(_) => TelegramEventType::PollAnswer,
            Self::Unsupported { .. } => TelegramEventType::Unsupported,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TelegramEventType {
    Command,
    PollAnswer,
    Unsupported,
}

/// A voter answered (or retracted an answer to) some poll. `selected`
/// carries option indices in the order Telegram delivered them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PollAnswerEvent {
    pub poll_id: PollId,
    pub voter: String,
    pub selected: Vec<usize>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandlerResult {
    Replied(Reply),
    Processed,
    Ignored,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventHandlerError {
    #[error(transparent)]
    Route(#[from] CommandRouteError),
    #[error("poll answer handler failure: {0}")]
    PollAnswer(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error(transparent)]
    Handler(#[from] EventHandlerError),
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    fn event_type(&self) -> TelegramEventType;
    async fn handle(&self, envelope: &UpdateEnvelope) -> Result<HandlerResult, EventHandlerError>;
}

#[derive(Default)]
pub struct EventDispatcher {
    handlers: HashMap<TelegramEventType, Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H>(&mut self, handler: H)
    where
        H: EventHandler + 'static,
    {
        self.handlers.insert(handler.event_type(), Arc::new(handler));
    }

    pub async fn dispatch(
        &self,
        envelope: &UpdateEnvelope,
    ) -> Result<HandlerResult, DispatchError> {
        let Some(handler) = self.handlers.get(&envelope.event.event_type()) else {
            return Ok(HandlerResult::Ignored);
        };

        handler.handle(envelope).await.map_err(DispatchError::from)
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

pub struct CommandEventHandler<S> {
    router: CommandRouter<S>,
}

impl<S> CommandEventHandler<S>
where
    S: BotCommandService,
{
    pub fn new(service: S) -> Self {
        Self { router: CommandRouter::new(service) }
    }
}

#[async_trait]
impl<S> EventHandler for CommandEventHandler<S>
where
    S: BotCommandService + 'static,
{
    fn event_type(&self) -> TelegramEventType {
        TelegramEventType::Command
    }

    async fn handle(&self, envelope: &UpdateEnvelope) -> Result<HandlerResult, EventHandlerError> {
        let TelegramEvent::Command(payload) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        match self.router.route(payload).await {
            Ok(Some(reply)) => Ok(HandlerResult::Replied(reply)),
            Ok(None) => Ok(HandlerResult::Processed),
            Err(CommandRouteError::Service(message)) => {
                // Best-effort messaging: the failure is logged with its
                // cause and the user gets a short generic reply instead of
                // a stack of transport detail.
                warn!(
                    chat_id = %payload.chat,
                    error = %message,
                    "command handling failed"
                );
                let failure = ApplicationError::Transport(message);
                Ok(HandlerResult::Replied(Reply {
                    destination: payload.chat,
                    text: failure.user_message().to_owned(),
                }))
            }
        }
    }
}

/// Consumer of poll-answer events; the real implementation lives in the
/// server crate, next to the registry and the transport.
#[async_trait]
pub trait PollAnswerService: Send + Sync {
    async fn handle_poll_answer(&self, event: &PollAnswerEvent) -> Result<(), EventHandlerError>;
}

pub struct PollAnswerHandler<S> {
    service: S,
}

impl<S> PollAnswerHandler<S>
where
    S: PollAnswerService,
{
    pub fn new(service: S) -> Self {
        Self { service }
    }
}

#[async_trait]
impl<S> EventHandler for PollAnswerHandler<S>
where
    S: PollAnswerService + 'static,
{
    fn event_type(&self) -> TelegramEventType {
        TelegramEventType::PollAnswer
    }

    async fn handle(&self, envelope: &UpdateEnvelope) -> Result<HandlerResult, EventHandlerError> {
        let TelegramEvent::PollAnswer(event) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        self.service.handle_poll_answer(event).await?;
        Ok(HandlerResult::Processed)
    }
}

#[derive(Default)]
pub struct NoopPollAnswerService;

#[async_trait]
impl PollAnswerService for NoopPollAnswerService {
    async fn handle_poll_answer(&self, _event: &PollAnswerEvent) -> Result<(), EventHandlerError> {
        Ok(())
    }
}

pub fn default_dispatcher() -> EventDispatcher {
    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(CommandEventHandler::new(crate::commands::NoopBotCommandService));
    dispatcher.register(PollAnswerHandler::new(NoopPollAnswerService));
    dispatcher
}
