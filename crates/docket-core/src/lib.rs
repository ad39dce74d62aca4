//! # docket-core
//!
//! Core types shared across all Docket crates:
//! - Entity structs for the work hierarchy (epics, features, tasks, task history)
//! - Status enums and the strategy/discovery option enums
//! - Key grammar (`E04`, `E04-F07`, `T-E04-F07-001`) parsing and formatting
//! - ID prefix constants for store-generated identifiers
//! - Cross-cutting error types

pub mod entities;
pub mod enums;
pub mod errors;
pub mod ids;
pub mod keys;
