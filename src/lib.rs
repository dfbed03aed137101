//! Dual-mode persistence client for a content/broadcast system.
//!
//! Records live in a hosted PostgREST-style store when one is configured and
//! reachable, and in a durable local JSON fallback otherwise. The [`api::Api`]
//! façade is the only surface callers use; it routes each operation, merges
//! results from both stores (remote wins on id collision), and normalizes
//! every remote failure to a human-readable message.

pub mod api;
pub mod config;
pub mod remote;
pub mod store;
pub mod types;

pub use api::Api;
pub use config::Config;
