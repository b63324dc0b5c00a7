use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};

use dreampoll_core::polls::PollSpec;
use dreampoll_core::registry::{ChatId, MessageId, PollId};

use crate::commands::CommandPayload;
use crate::events::{PollAnswerEvent, TelegramEvent, UpdateEnvelope};
use crate::transport::{ChatTransport, Destination, SentPoll, TransportError};
use crate::updates::UpdateSource;

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Long-poll window passed to `getUpdates`, in seconds.
const LONG_POLL_TIMEOUT_SECS: u32 = 50;

/// HTTP client for the Telegram Bot API. One instance serves both
/// directions of the boundary: outbound sends ([`ChatTransport`]) and the
/// inbound update stream ([`UpdateSource`]).
pub struct BotApi {
    client: Client,
    base_url: String,
    token: SecretString,
    next_offset: AtomicI64,
}

impl BotApi {
    pub fn new(token: SecretString) -> Self {
        Self::with_base_url(token, TELEGRAM_API_BASE)
    }

    /// Points the client at an alternative API host, e.g. a local Bot API
    /// server.
    pub fn with_base_url(token: SecretString, base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            token,
            next_offset: AtomicI64::new(0),
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.base_url, self.token.expose_secret())
    }

    async fn call<T>(&self, method: &str, payload: Value) -> Result<T, TransportError>
    where
        T: serde::de::DeserializeOwned,
    {
        let response = self
            .client
            .post(self.method_url(method))
            .json(&payload)
            .send()
            .await
            .map_err(|error| TransportError::Request(error.to_string()))?;

        let envelope: ApiEnvelope<T> = response
            .json()
            .await
            .map_err(|error| TransportError::Decode(error.to_string()))?;

        envelope.into_result()
    }
}

/// Standard Bot API response wrapper: `{"ok": true, "result": ...}` on
/// success, `{"ok": false, "description": ...}` on rejection.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: serde::Deserialize<'de>"))]
struct ApiEnvelope<T> {
    ok: bool,
    #[serde(default)]
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
}

impl<T> ApiEnvelope<T> {
    fn into_result(self) -> Result<T, TransportError> {
        if self.ok {
            self.result.ok_or_else(|| {
                TransportError::Decode("response envelope is missing `result`".to_owned())
            })
        } else {
            Err(TransportError::Api(
                self.description.unwrap_or_else(|| "no description given".to_owned()),
            ))
        }
    }
}

fn destination_value(destination: &Destination) -> Value {
    match destination {
        Destination::Chat(chat) => json!(chat.0),
        Destination::Channel(name) => json!(name),
    }
}

/// Bot API 7.3 turned `sendPoll` options into `InputPollOption` objects;
/// bare label strings are rejected with a 400.
fn input_poll_options(options: &[String]) -> Value {
    Value::Array(options.iter().map(|label| json!({ "text": label })).collect())
}

#[async_trait]
impl ChatTransport for BotApi {
    async fn send_message(
        &self,
        destination: &Destination,
        text: &str,
    ) -> Result<(), TransportError> {
        let payload = json!({
            "chat_id": destination_value(destination),
            "text": text,
        });
        self.call::<WireMessage>("sendMessage", payload).await?;
        Ok(())
    }

    async fn send_poll(
        &self,
        destination: &Destination,
        poll: &PollSpec,
    ) -> Result<SentPoll, TransportError> {
        let payload = json!({
            "chat_id": destination_value(destination),
            "question": poll.question,
            "options": input_poll_options(&poll.options),
            "is_anonymous": poll.is_anonymous,
            "allows_multiple_answers": poll.allows_multiple_answers,
        });
        let message: WireMessage = self.call("sendPoll", payload).await?;

        let poll_id = message.poll.map(|poll| PollId(poll.id)).ok_or_else(|| {
            TransportError::Decode("sendPoll response carried no poll object".to_owned())
        })?;
        Ok(SentPoll { poll_id, message_id: MessageId(message.message_id) })
    }

    async fn stop_poll(
        &self,
        destination: &Destination,
        message: MessageId,
    ) -> Result<(), TransportError> {
        let payload = json!({
            "chat_id": destination_value(destination),
            "message_id": message.0,
        });
        self.call::<Value>("stopPoll", payload).await?;
        Ok(())
    }
}

#[async_trait]
impl UpdateSource for BotApi {
    async fn poll_updates(&self) -> Result<Option<Vec<UpdateEnvelope>>, TransportError> {
        let payload = json!({
            "offset": self.next_offset.load(Ordering::SeqCst),
            "timeout": LONG_POLL_TIMEOUT_SECS,
            "allowed_updates": ["message", "poll_answer"],
        });
        let updates: Vec<WireUpdate> = self.call("getUpdates", payload).await?;

        if let Some(max_id) = updates.iter().map(|update| update.update_id).max() {
            self.next_offset.store(max_id + 1, Ordering::SeqCst);
        }

        Ok(Some(updates.into_iter().map(envelope_from_update).collect()))
    }
}

#[derive(Debug, Deserialize)]
struct WireUpdate {
    update_id: i64,
    #[serde(default)]
    message: Option<WireMessage>,
    #[serde(default)]
    poll_answer: Option<WirePollAnswer>,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    message_id: i64,
    #[serde(default)]
    chat: Option<WireChat>,
    #[serde(default)]
    from: Option<WireUser>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    poll: Option<WirePoll>,
}

#[derive(Debug, Deserialize)]
struct WireChat {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct WireUser {
    first_name: String,
    #[serde(default)]
    last_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WirePoll {
    id: String,
}

#[derive(Debug, Deserialize)]
struct WirePollAnswer {
    poll_id: String,
    user: WireUser,
    option_ids: Vec<usize>,
}

fn display_name(user: &WireUser) -> String {
    match &user.last_name {
        Some(last_name) => format!("{} {last_name}", user.first_name),
        None => user.first_name.clone(),
    }
}

/// Classifies one wire update into the event model. Anything that is not a
/// command message or a poll answer is surfaced as `Unsupported` so the
/// dispatcher can drop it without guessing.
fn envelope_from_update(update: WireUpdate) -> UpdateEnvelope {
    let event = if let Some(answer) = update.poll_answer {
        TelegramEvent::PollAnswer(PollAnswerEvent {
            poll_id: PollId(answer.poll_id),
            voter: display_name(&answer.user),
            selected: answer.option_ids,
        })
    } else if let Some(message) = update.message {
        match (message.chat, message.text) {
            (Some(chat), Some(text)) if text.trim_start().starts_with('/') => {
                TelegramEvent::Command(CommandPayload {
                    text,
                    chat: ChatId(chat.id),
                    sender: message
                        .from
                        .as_ref()
                        .map(display_name)
                        .unwrap_or_else(|| "someone".to_owned()),
                    message_id: MessageId(message.message_id),
                })
            }
            _ => TelegramEvent::Unsupported { kind: "message".to_owned() },
        }
    } else {
        TelegramEvent::Unsupported { kind: "update".to_owned() }
    };

    UpdateEnvelope { update_id: update.update_id, event }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use dreampoll_core::registry::{ChatId, PollId};

    use super::{envelope_from_update, input_poll_options, ApiEnvelope, WireMessage, WireUpdate};
    use crate::events::TelegramEvent;
    use crate::transport::TransportError;

    #[test]
    fn command_updates_map_to_command_events() {
        let update: WireUpdate = serde_json::from_value(json!({
            "update_id": 42,
            "message": {
                "message_id": 7,
                "chat": { "id": -100200, "type": "group" },
                "from": { "id": 1, "is_bot": false, "first_name": "Dana", "last_name": "K" },
                "text": "/poll@DreamPollBot"
            }
        }))
        .expect("wire update decodes");

        let envelope = envelope_from_update(update);

        assert_eq!(envelope.update_id, 42);
        let TelegramEvent::Command(payload) = envelope.event else {
            panic!("expected a command event");
        };
        assert_eq!(payload.chat, ChatId(-100200));
        assert_eq!(payload.sender, "Dana K");
        assert_eq!(payload.text, "/poll@DreamPollBot");
    }

    #[test]
    fn poll_answer_updates_map_to_answer_events() {
        let update: WireUpdate = serde_json::from_value(json!({
            "update_id": 43,
            "poll_answer": {
                "poll_id": "5876231839281",
                "user": { "id": 2, "is_bot": false, "first_name": "Lev" },
                "option_ids": [3, 0]
            }
        }))
        .expect("wire update decodes");

        let envelope = envelope_from_update(update);

        let TelegramEvent::PollAnswer(event) = envelope.event else {
            panic!("expected a poll answer event");
        };
        assert_eq!(event.poll_id, PollId("5876231839281".to_owned()));
        assert_eq!(event.voter, "Lev");
        assert_eq!(event.selected, vec![3, 0]);
    }

    #[test]
    fn plain_messages_are_unsupported() {
        let update: WireUpdate = serde_json::from_value(json!({
            "update_id": 44,
            "message": {
                "message_id": 8,
                "chat": { "id": 5 },
                "text": "good morning"
            }
        }))
        .expect("wire update decodes");

        let envelope = envelope_from_update(update);

        assert!(matches!(envelope.event, TelegramEvent::Unsupported { .. }));
    }

    #[test]
    fn poll_options_serialize_as_input_poll_option_objects() {
        let options = vec!["Good".to_owned(), "Really good".to_owned()];

        assert_eq!(
            input_poll_options(&options),
            json!([{ "text": "Good" }, { "text": "Really good" }])
        );
    }

    #[test]
    fn rejected_calls_surface_the_api_description() {
        let envelope: ApiEnvelope<WireMessage> = serde_json::from_value(json!({
            "ok": false,
            "error_code": 400,
            "description": "Bad Request: chat not found"
        }))
        .expect("error envelope decodes");

        let error = envelope.into_result().expect_err("not-ok envelope is an error");

        assert_eq!(error, TransportError::Api("Bad Request: chat not found".to_owned()));
    }

    #[test]
    fn successful_send_poll_response_decodes() {
        let envelope: ApiEnvelope<WireMessage> = serde_json::from_value(json!({
            "ok": true,
            "result": {
                "message_id": 99,
                "chat": { "id": 5 },
                "poll": {
                    "id": "5876231839282",
                    "question": "How are you?",
                    "total_voter_count": 0
                }
            }
        }))
        .expect("success envelope decodes");

        let message = envelope.into_result().expect("ok envelope carries a result");

        assert_eq!(message.message_id, 99);
        assert_eq!(message.poll.map(|poll| poll.id).as_deref(), Some("5876231839282"));
    }
}
