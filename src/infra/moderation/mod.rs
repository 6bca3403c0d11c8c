// Infra implementations of the moderation ports.

pub mod channel_notifier;
pub mod in_memory;
pub mod sqlite_store;

pub use channel_notifier::QueueNotifier;
pub use in_memory::{InMemoryOffenderStore, InMemoryRecordStore};
pub use sqlite_store::SqliteModerationStore;
