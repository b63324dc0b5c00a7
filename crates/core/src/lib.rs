//! Core domain logic for dreampoll: poll lifecycle tracking, broadcast
//! content, schedule math, and configuration.
//!
//! No I/O lives here. The Telegram transport and the job timer are injected
//! at trait seams by the `dreampoll-telegram` and `dreampoll-scheduler`
//! crates, which keeps everything in this crate testable without a network.

pub mod config;
pub mod errors;
pub mod polls;
pub mod registry;
pub mod schedule;
pub mod summary;

pub use errors::ApplicationError;
pub use polls::PollSpec;
pub use registry::{
    AnswerOutcome, ChatId, MessageId, PollId, PollRegistry, PollSession, UnknownPoll,
    TOTAL_VOTER_COUNT,
};
