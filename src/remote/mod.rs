//! Remote store adapter: HTTP client, wire-row translation, error
//! normalization.

mod client;
pub mod error;
pub mod rows;

pub use client::RemoteClient;
