//! Data Transfer Objects
//!
//! The hierarchical metadata document and the request/response types
//! exchanged between a local store and the aggregation server.

pub mod document;
pub mod summary;
pub mod transfer;
