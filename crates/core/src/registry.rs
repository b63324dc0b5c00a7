use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use thiserror::Error;

/// Number of distinct voters after which an interactive poll is closed.
pub const TOTAL_VOTER_COUNT: u32 = 3;

/// Poll identifier assigned by Telegram when the poll message is sent.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PollId(pub String);

impl fmt::Display for PollId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Telegram chat id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChatId(pub i64);

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Telegram message id (numeric, unique within a chat).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageId(pub i64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One interactive poll awaiting answers.
///
/// `answer_count` is monotonically non-decreasing for the life of the
/// session. A session is logically closed once the count reaches
/// [`TOTAL_VOTER_COUNT`]; closed sessions stay in the registry as inert
/// entries and are never evicted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PollSession {
    pub options: Vec<String>,
    pub origin_chat: ChatId,
    pub origin_message: MessageId,
    pub answer_count: u32,
}

/// An answer event referenced a poll id this process never created, e.g.
/// the poll predates process start. Callers drop the event silently.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("unknown poll `{0}`")]
pub struct UnknownPoll(pub PollId);

/// Result of recording one answer event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnswerOutcome {
    /// Snapshot of the session after the increment.
    pub session: PollSession,
    /// True exactly once: on the event where the running count first
    /// equals the quorum. Equality (not `>=`) is the documented policy, so
    /// late answers after close never re-trigger a close instruction.
    pub should_close: bool,
}

/// In-memory store of every interactive poll this process has sent.
///
/// Single source of truth for which polls are open and what has been
/// recorded. Owned for the process lifetime, injected by handle into every
/// handler, and internally synchronized; the lock is held only for map
/// operations, never across an await point.
#[derive(Default)]
pub struct PollRegistry {
    sessions: Mutex<HashMap<PollId, PollSession>>,
}

impl PollRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a fresh session with a zero answer count. A duplicate poll
    /// id is a silent no-op: Telegram assigns poll ids, so a collision is a
    /// programming invariant rather than a runtime error path.
    pub fn create(
        &self,
        poll_id: PollId,
        options: Vec<String>,
        origin_chat: ChatId,
        origin_message: MessageId,
    ) {
        let mut sessions = self.lock();
        sessions.entry(poll_id).or_insert(PollSession {
            options,
            origin_chat,
            origin_message,
            answer_count: 0,
        });
    }

    /// Snapshot lookup. `None` means the poll was never created by this
    /// process; the caller must ignore the corresponding event.
    pub fn get(&self, poll_id: &PollId) -> Option<PollSession> {
        self.lock().get(poll_id).cloned()
    }

    /// Records one voter's answer: increments the distinct-voter count and
    /// reports whether this event crossed the quorum. The registry is left
    /// untouched when the poll id is unknown.
    pub fn record_answer(&self, poll_id: &PollId) -> Result<AnswerOutcome, UnknownPoll> {
        let mut sessions = self.lock();
        let session =
            sessions.get_mut(poll_id).ok_or_else(|| UnknownPoll(poll_id.clone()))?;
        session.answer_count += 1;
        let should_close = session.answer_count == TOTAL_VOTER_COUNT;
        Ok(AnswerOutcome { session: session.clone(), should_close })
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PollId, PollSession>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
