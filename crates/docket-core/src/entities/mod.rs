//! Entity structs for the Docket work hierarchy.
//!
//! Each entity maps to a table in the libSQL store (`docket-db/migrations`).
//! All structs derive `Serialize`, `Deserialize`, and `JsonSchema` for JSON
//! output and schema validation.

mod epic;
mod feature;
mod history;
mod task;

pub use epic::Epic;
pub use feature::Feature;
pub use history::TaskHistory;
pub use task::Task;
