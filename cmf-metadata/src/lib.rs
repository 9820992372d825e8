//! CMF Metadata
//!
//! The metadata merge/reconciliation engine and the local store it writes to.
//!
//! - `db` / `repository`: SQLite-backed store adapter
//! - `resolver`: decides whether an incoming entity already exists
//! - `service::merge`: applies a hierarchical document to a store
//! - `service::export`: reads a pipeline subgraph back out as a document
//! - `service::transfer`: push/pull against the aggregation server

pub mod config;
pub mod db;
pub mod error;
pub mod repository;
pub mod resolver;
pub mod service;

#[cfg(test)]
mod test_support;

pub use config::TransferConfig;
pub use error::{MetadataError, Result};
pub use service::transfer::{TransferCoordinator, TransferResult};
