//! Saved-topic matching
//!
//! When a new item lands, every saved topic for its section is recompiled
//! in the owner's scope and folded into one filters aggregation, so the
//! whole batch costs a single store round-trip however many topics exist.
//! Topics that no longer compile (deleted owner, revoked products) are
//! skipped; one bad topic never aborts a batch.

mod matcher;
mod repository;

pub use matcher::{SkipReason, TopicMatcher};
pub use repository::{InMemoryTopicStore, TopicRepository};
