use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

use dreampoll_core::polls::PollSpec;
use dreampoll_core::registry::{ChatId, MessageId, PollId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("transport request failed: {0}")]
    Request(String),
    #[error("telegram rejected the call: {0}")]
    Api(String),
    #[error("transport returned a malformed response: {0}")]
    Decode(String),
}

/// Where an outbound call is addressed. The Bot API accepts either a
/// numeric chat id or a public `@channelname`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Destination {
    Chat(ChatId),
    Channel(String),
}

impl Destination {
    /// Interprets a configured destination string: anything that parses as
    /// an integer is a chat id, everything else is treated as a channel
    /// username.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.parse::<i64>() {
            Ok(id) => Self::Chat(ChatId(id)),
            Err(_) => Self::Channel(trimmed.to_owned()),
        }
    }
}

impl From<ChatId> for Destination {
    fn from(chat: ChatId) -> Self {
        Self::Chat(chat)
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Chat(chat) => write!(f, "{chat}"),
            Self::Channel(name) => f.write_str(name),
        }
    }
}

/// Identifiers Telegram assigns to a freshly sent poll message; both are
/// needed later: the poll id keys answer events, the message id addresses
/// the stop-poll instruction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentPoll {
    pub poll_id: PollId,
    pub message_id: MessageId,
}

/// Outbound boundary with the chat transport. The bot never retries a
/// failed send; errors propagate to the invoking handler.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send_message(
        &self,
        destination: &Destination,
        text: &str,
    ) -> Result<(), TransportError>;

    async fn send_poll(
        &self,
        destination: &Destination,
        poll: &PollSpec,
    ) -> Result<SentPoll, TransportError>;

    async fn stop_poll(
        &self,
        destination: &Destination,
        message: MessageId,
    ) -> Result<(), TransportError>;
}

#[derive(Default)]
pub struct NoopChatTransport;

#[async_trait]
impl ChatTransport for NoopChatTransport {
    async fn send_message(
        &self,
        _destination: &Destination,
        _text: &str,
    ) -> Result<(), TransportError> {
        Ok(())
    }

    async fn send_poll(
        &self,
        _destination: &Destination,
        _poll: &PollSpec,
    ) -> Result<SentPoll, TransportError> {
        Ok(SentPoll { poll_id: PollId("noop-poll".to_owned()), message_id: MessageId(0) })
    }

    async fn stop_poll(
        &self,
        _destination: &Destination,
        _message: MessageId,
    ) -> Result<(), TransportError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use dreampoll_core::registry::ChatId;

    use super::Destination;

    #[test]
    fn numeric_destinations_parse_as_chat_ids() {
        assert_eq!(Destination::parse("-1001234567890"), Destination::Chat(ChatId(-1001234567890)));
        assert_eq!(Destination::parse(" 42 "), Destination::Chat(ChatId(42)));
    }

    #[test]
    fn usernames_parse_as_channels() {
        assert_eq!(Destination::parse("@dreamlog"), Destination::Channel("@dreamlog".to_owned()));
    }

    #[test]
    fn display_round_trips_both_forms() {
        assert_eq!(Destination::parse("@dreamlog").to_string(), "@dreamlog");
        assert_eq!(Destination::from(ChatId(7)).to_string(), "7");
    }
}
