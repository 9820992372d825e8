//! CMF Core
//!
//! Core types for tracking ML pipeline provenance.
//!
//! This crate contains:
//! - Domain types: Pipeline, Stage, Execution, Artifact and Event as stored
//! - DTOs: The hierarchical metadata document exchanged between stores

pub mod domain;
pub mod dto;
