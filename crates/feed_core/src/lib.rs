//! Feed core: pure ingestion types, delay policy and the poll-cycle state machine.
mod cycle;
mod item;
mod rate_limit;
mod stats;

pub use cycle::{settle_delay, CycleOutcome, PollState};
pub use item::{Item, StoredItem};
pub use rate_limit::{compute_delay, DelayPolicy, RateLimitSnapshot, BASELINE_DELAY};
pub use stats::{FeedStats, PostsPage};
