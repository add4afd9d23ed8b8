//! Data layer module
//!
//! Everything between the remote store and the services:
//! - Remote store adapter (REST) behind the `RemoteStore` trait
//! - Explicit row schemas per collection
//! - Domain models
//! - The immutable in-memory snapshot and its handle

mod models;
mod rows;
mod snapshot;
mod store;

pub use models::*;
pub use rows::*;
pub use snapshot::{RawTables, Snapshot, SnapshotHandle};
pub use store::{decode_rows, Filter, Order, RemoteStore, RestStore};

#[cfg(test)]
pub use store::MockRemoteStore;
