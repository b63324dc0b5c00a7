//! Fixed poll content: the interactive mood poll and the daily dream-recall
//! broadcast poll.

use chrono::NaiveDate;

/// Question prefix of the broadcast poll; the current date is appended as
/// `DD.MM` at send time.
pub const DREAM_QUESTION_PREFIX: &str = "Сегодняшние сновидения";

/// The seven dream-recall categories of the broadcast poll.
pub const DREAM_POLL_OPTIONS: [&str; 7] = [
    "Не помню",
    "Без снов",
    "Нейтральный сон",
    "Приятное сновидение",
    "Неприятное сновидение / кошмар",
    "Несуразный бред",
    "Смешанные эмоции",
];

/// Everything the transport needs to send one poll.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PollSpec {
    pub question: String,
    pub options: Vec<String>,
    pub is_anonymous: bool,
    pub allows_multiple_answers: bool,
}

impl PollSpec {
    /// The interactive mood poll sent on `/poll`: named voters, multiple
    /// answers allowed, tracked for quorum close.
    pub fn how_are_you() -> Self {
        Self {
            question: "How are you?".to_owned(),
            options: vec![
                "Good".to_owned(),
                "Really good".to_owned(),
                "Fantastic".to_owned(),
                "Great".to_owned(),
            ],
            is_anonymous: false,
            allows_multiple_answers: true,
        }
    }

    /// The daily dream-recall broadcast poll: anonymous, single answer,
    /// question dated with the local calendar day it is sent on.
    pub fn dream_recall(local_date: NaiveDate) -> Self {
        Self {
            question: format!("{DREAM_QUESTION_PREFIX} {}", local_date.format("%d.%m")),
            options: DREAM_POLL_OPTIONS.iter().map(|option| (*option).to_owned()).collect(),
            is_anonymous: true,
            allows_multiple_answers: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{PollSpec, DREAM_POLL_OPTIONS};

    #[test]
    fn mood_poll_is_named_and_multi_answer() {
        let poll = PollSpec::how_are_you();
        assert_eq!(poll.question, "How are you?");
        assert_eq!(poll.options.len(), 4);
        assert!(!poll.is_anonymous);
        assert!(poll.allows_multiple_answers);
    }

    #[test]
    fn dream_poll_is_anonymous_and_single_answer() {
        let date = NaiveDate::from_ymd_opt(2026, 8, 6).expect("valid date");
        let poll = PollSpec::dream_recall(date);
        assert!(poll.is_anonymous);
        assert!(!poll.allows_multiple_answers);
        assert_eq!(poll.options.len(), DREAM_POLL_OPTIONS.len());
    }

    #[test]
    fn dream_poll_question_embeds_zero_padded_date() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 5).expect("valid date");
        let poll = PollSpec::dream_recall(date);
        assert_eq!(poll.question, "Сегодняшние сновидения 05.03");
    }
}
