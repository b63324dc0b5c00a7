//! Recurring broadcast scheduling for dreampoll:
//! - **Job queue** (`jobs`) - named repeating tasks on the tokio timer,
//!   with cancel-by-name and replace-on-reschedule semantics
//! - **Broadcast** (`broadcast`) - the daily dream-recall poll job,
//!   enabled and disabled per destination chat
//!
//! Schedules live only in memory; a process restart loses them, which is an
//! accepted property of the design.

pub mod broadcast;
pub mod jobs;

pub use broadcast::{BroadcastScheduler, DisableOutcome, EnableOutcome};
pub use jobs::{JobAction, JobQueue};
