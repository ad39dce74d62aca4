//! Partial-update structs for repo `update_*` methods.
//!
//! Every field is `Option`: `None` leaves the column alone. Nullable columns
//! use `Option<Option<T>>` so callers can clear them.

pub mod plan;
pub mod task;
