//! ID prefix constants.
//!
//! Store identifiers are `{prefix}-{8 hex chars}`, generated by `docket-db`.

pub const PREFIX_EPIC: &str = "epc";
pub const PREFIX_FEATURE: &str = "fea";
pub const PREFIX_TASK: &str = "tsk";
pub const PREFIX_HISTORY: &str = "hst";
