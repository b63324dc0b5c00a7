use async_trait::async_trait;
use thiserror::Error;

use dreampoll_core::registry::{ChatId, MessageId};

/// An inbound `/command` message, already reduced to the fields the router
/// cares about.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandPayload {
    pub text: String,
    pub chat: ChatId,
    pub sender: String,
    pub message_id: MessageId,
}

/// The bot's command surface, mapped 1:1 onto lifecycle operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BotCommand {
    Start,
    Help,
    Poll,
    PollToChannel,
    EnablePolling,
    DisablePolling,
    Unknown { name: String },
}

/// Parses the leading token of a message as a bot command. Telegram appends
/// `@BotName` to commands issued in groups; the suffix is stripped before
/// matching. Returns `None` for plain messages.
pub fn parse_bot_command(text: &str) -> Option<BotCommand> {
    let first = text.trim().split_whitespace().next()?;
    let name = first.strip_prefix('/')?;
    let name = name.split('@').next().unwrap_or(name).to_ascii_lowercase();

    Some(match name.as_str() {
        "start" => BotCommand::Start,
        "help" => BotCommand::Help,
        "poll" => BotCommand::Poll,
        "poll_to_channel" => BotCommand::PollToChannel,
        "enable_polling" => BotCommand::EnablePolling,
        "disable_polling" => BotCommand::DisablePolling,
        _ => BotCommand::Unknown { name },
    })
}

pub fn start_text() -> &'static str {
    "Please select /poll to get a Poll, /poll_to_channel to send The Poll to The Channel. \
     You can also /enable_polling or /disable_polling to The Channel"
}

pub fn help_text() -> &'static str {
    "Use /poll, /poll_to_channel to test this bot. \
     You can also /enable_polling or /disable_polling to The Channel"
}

/// A plain-text reply addressed back at a chat.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reply {
    pub destination: ChatId,
    pub text: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandRouteError {
    #[error("command service failed: {0}")]
    Service(String),
}

/// Operations behind the command surface. Each method returns the reply
/// text for the invoking chat, or `None` when the operation's own side
/// effect (a poll appearing) is the whole response.
#[async_trait]
pub trait BotCommandService: Send + Sync {
    async fn start(&self, payload: &CommandPayload) -> Result<Option<String>, CommandRouteError>;

    async fn help(&self, payload: &CommandPayload) -> Result<Option<String>, CommandRouteError>;

    /// Sends the interactive mood poll to the invoking chat and registers
    /// it for quorum tracking.
    async fn send_interactive_poll(
        &self,
        payload: &CommandPayload,
    ) -> Result<Option<String>, CommandRouteError>;

    /// Sends the dream-recall poll to the configured channel immediately,
    /// outside the recurring schedule and untracked.
    async fn send_channel_poll(
        &self,
        payload: &CommandPayload,
    ) -> Result<Option<String>, CommandRouteError>;

    async fn enable_polling(
        &self,
        payload: &CommandPayload,
    ) -> Result<Option<String>, CommandRouteError>;

    async fn disable_polling(
        &self,
        payload: &CommandPayload,
    ) -> Result<Option<String>, CommandRouteError>;
}

pub struct CommandRouter<S> {
    service: S,
}

impl<S> CommandRouter<S>
where
    S: BotCommandService,
{
    pub fn new(service: S) -> Self {
        Self { service }
    }

    pub async fn route(
        &self,
        payload: &CommandPayload,
    ) -> Result<Option<Reply>, CommandRouteError> {
        let Some(command) = parse_bot_command(&payload.text) else {
            return Ok(None);
        };

        let text = match command {
            BotCommand::Start => self.service.start(payload).await?,
            BotCommand::Help => self.service.help(payload).await?,
            BotCommand::Poll => self.service.send_interactive_poll(payload).await?,
            BotCommand::PollToChannel => self.service.send_channel_poll(payload).await?,
            BotCommand::EnablePolling => self.service.enable_polling(payload).await?,
            BotCommand::DisablePolling => self.service.disable_polling(payload).await?,
            BotCommand::Unknown { name } => {
                Some(format!("Unsupported command `/{name}`. Try /help."))
            }
        };

        Ok(text.map(|text| Reply { destination: payload.chat, text }))
    }
}

/// Stand-in service used for wiring and dispatcher tests; replies with the
/// informational texts and confirms the stateful commands without touching
/// any transport.
#[derive(Default)]
pub struct NoopBotCommandService;

#[async_trait]
impl BotCommandService for NoopBotCommandService {
    async fn start(&self, _payload: &CommandPayload) -> Result<Option<String>, CommandRouteError> {
        Ok(Some(start_text().to_owned()))
    }

    async fn help(&self, _payload: &CommandPayload) -> Result<Option<String>, CommandRouteError> {
        Ok(Some(help_text().to_owned()))
    }

    async fn send_interactive_poll(
        &self,
        _payload: &CommandPayload,
    ) -> Result<Option<String>, CommandRouteError> {
        Ok(None)
    }

    async fn send_channel_poll(
        &self,
        _payload: &CommandPayload,
    ) -> Result<Option<String>, CommandRouteError> {
        Ok(None)
    }

    async fn enable_polling(
        &self,
        _payload: &CommandPayload,
    ) -> Result<Option<String>, CommandRouteError> {
        Ok(Some("Polling successfully scheduled!".to_owned()))
    }

    async fn disable_polling(
        &self,
        _payload: &CommandPayload,
    ) -> Result<Option<String>, CommandRouteError> {
        Ok(Some("You have no active pollings.".to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use dreampoll_core::registry::{ChatId, MessageId};

    use super::{
        parse_bot_command, BotCommand, CommandPayload, CommandRouter, NoopBotCommandService,
    };

    fn payload(text: &str) -> CommandPayload {
        CommandPayload {
            text: text.to_owned(),
            chat: ChatId(100),
            sender: "Dana".to_owned(),
            message_id: MessageId(1),
        }
    }

    #[test]
    fn commands_parse_by_name() {
        assert_eq!(parse_bot_command("/poll"), Some(BotCommand::Poll));
        assert_eq!(parse_bot_command("/enable_polling"), Some(BotCommand::EnablePolling));
        assert_eq!(parse_bot_command("/disable_polling"), Some(BotCommand::DisablePolling));
        assert_eq!(parse_bot_command("/poll_to_channel"), Some(BotCommand::PollToChannel));
    }

    #[test]
    fn bot_name_suffix_is_stripped() {
        assert_eq!(parse_bot_command("/poll@DreamPollBot"), Some(BotCommand::Poll));
        assert_eq!(parse_bot_command("/HELP@DreamPollBot extra words"), Some(BotCommand::Help));
    }

    #[test]
    fn plain_messages_are_not_commands() {
        assert_eq!(parse_bot_command("good morning"), None);
        assert_eq!(parse_bot_command("  "), None);
    }

    #[test]
    fn unrecognized_commands_classify_as_unknown() {
        assert_eq!(
            parse_bot_command("/unsubscribe"),
            Some(BotCommand::Unknown { name: "unsubscribe".to_owned() })
        );
    }

    #[tokio::test]
    async fn router_replies_with_start_text() {
        let router = CommandRouter::new(NoopBotCommandService);

        let reply = router
            .route(&payload("/start"))
            .await
            .expect("routing succeeds")
            .expect("start produces a reply");

        assert_eq!(reply.destination, ChatId(100));
        assert!(reply.text.contains("/poll"));
    }

    #[tokio::test]
    async fn router_guides_unknown_commands() {
        let router = CommandRouter::new(NoopBotCommandService);

        let reply = router
            .route(&payload("/frobnicate"))
            .await
            .expect("routing succeeds")
            .expect("unknown command produces guidance");

        assert!(reply.text.contains("/frobnicate"));
        assert!(reply.text.contains("/help"));
    }

    #[tokio::test]
    async fn router_ignores_non_command_text() {
        let router = CommandRouter::new(NoopBotCommandService);
        let reply = router.route(&payload("hello there")).await.expect("routing succeeds");
        assert_eq!(reply, None);
    }
}
