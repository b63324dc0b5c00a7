use thiserror::Error;

/// Failure taxonomy for the bot's command surface. Unknown-poll answer
/// events are not part of it: those are a typed registry outcome the caller
/// swallows, never a user-visible failure.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

impl ApplicationError {
    /// Short reply text safe to send back to the chat. Command handlers
    /// have no structured error channel beyond this string.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Transport(_) => {
                "Sorry, that did not go through to Telegram. Please try again."
            }
            Self::Configuration(_) => {
                "The bot is misconfigured. Ask the operator to check the logs."
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ApplicationError;

    #[test]
    fn transport_failures_surface_a_generic_retry_hint() {
        let error = ApplicationError::Transport("connection reset".to_owned());
        assert_eq!(
            error.user_message(),
            "Sorry, that did not go through to Telegram. Please try again."
        );
    }

    #[test]
    fn display_keeps_the_underlying_cause_for_logs() {
        let error = ApplicationError::Transport("connection reset".to_owned());
        assert_eq!(error.to_string(), "transport failure: connection reset");
    }
}
