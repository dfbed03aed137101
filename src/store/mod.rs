//! Local fallback persistence.
//!
//! Holds whatever the remote store doesn't: records created while the remote
//! service was unconfigured or unreachable. See [`storage::FallbackStore`]
//! for the contract.

mod storage;

pub use storage::{FallbackStore, JsonFileStore, MemoryStore, NOTIFS_FILE, POSTS_FILE};
