//! Core domain types
//!
//! These types represent entities as they live in a metadata store, keyed by
//! the store's own numeric ids. They are shared between the merge engine
//! (which persists them) and the server (which serves them).

pub mod artifact;
pub mod event;
pub mod execution;
pub mod pipeline;
pub mod properties;
pub mod stage;
