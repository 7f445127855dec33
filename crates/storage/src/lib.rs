//! Access layer for the hierarchical SingPath document store.
//!
//! The migration engine only ever talks to the store through the
//! [`RemoteClient`] trait. Two backends ship with this crate:
//! [`RestClient`] speaks the store's `<root>/<path>.json` REST dialect, and
//! [`MemoryStore`] keeps the whole tree in memory for tests and dry runs.

pub mod conformance;
mod error;
mod memory;
pub mod path;
mod push_id;
mod query;
mod rest;
mod traits;

pub use error::StoreError;
pub use memory::{MemoryStore, WriteRecord};
pub use push_id::PushIdGenerator;
pub use query::{server_timestamp, Query, QueryLog, WriteEvent};
pub use rest::RestClient;
pub use traits::RemoteClient;
