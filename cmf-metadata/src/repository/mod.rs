//! Repository Module
//!
//! Data access layer for a metadata store.
//! Each repository handles SQL for one entity kind. Functions take a plain
//! connection so callers decide the transaction scope.

pub mod artifact;
pub mod event;
pub mod execution;
pub mod pipeline;
pub mod stage;

// Re-export for convenience
pub use artifact as artifact_repository;
pub use event as event_repository;
pub use execution as execution_repository;
pub use pipeline as pipeline_repository;
pub use stage as stage_repository;
