//! Service Module
//!
//! Business logic over a metadata store.

pub mod export;
pub mod merge;
pub mod transfer;

// Re-export for convenience
pub use export as export_service;
pub use merge as merge_service;
pub use transfer as transfer_service;
