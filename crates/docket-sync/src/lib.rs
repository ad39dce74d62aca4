//! # docket-sync
//!
//! Keeps markdown work-item files and the Docket store consistent.
//!
//! A sync pass runs, in order:
//! 1. optional epic/feature discovery ([`discovery`])
//! 2. file scanning with pattern classification ([`scanner`], [`patterns`])
//! 3. incremental filtering against the last sync time ([`incremental`])
//! 4. metadata extraction and key generation ([`metadata`], [`keygen`])
//! 5. conflict detection and resolution ([`conflict`], [`resolver`])
//! 6. one transactional write of every planned change ([`engine`])
//!
//! The outcome is a serializable [`report::RunReport`].

pub mod conflict;
pub mod discovery;
pub mod engine;
pub mod error;
pub mod incremental;
pub mod keygen;
pub mod metadata;
pub mod patterns;
pub mod report;
pub mod resolver;
pub mod scanner;

mod plan;
mod text;

pub use discovery::DiscoveryOptions;
pub use engine::{RunOptions, SyncEngine};
pub use error::{SyncError, SyncFailure};
pub use report::RunReport;
pub use resolver::ResolutionStrategy;
