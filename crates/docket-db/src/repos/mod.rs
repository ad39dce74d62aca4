//! Repository modules implementing store operations for Docket entities.
//!
//! Each module adds methods to `DocketService` via `impl DocketService` blocks.

pub mod epic;
pub mod feature;
pub mod history;
pub mod stats;
pub mod sync_state;
pub mod task;

/// Build the `SET` fragments shared by the metadata updates of every entity.
///
/// Returns the fragments, their bound values, and the next free parameter index.
fn metadata_sets(
    title: Option<&String>,
    description: Option<&Option<String>>,
    file_path: Option<&Option<String>>,
) -> (Vec<String>, Vec<libsql::Value>, usize) {
    let mut sets = Vec::new();
    let mut params: Vec<libsql::Value> = Vec::new();
    let mut idx = 1usize;

    if let Some(title) = title {
        sets.push(format!("title = ?{idx}"));
        params.push(title.clone().into());
        idx += 1;
    }
    if let Some(description) = description {
        sets.push(format!("description = ?{idx}"));
        params.push(description.clone().map_or(libsql::Value::Null, Into::into));
        idx += 1;
    }
    if let Some(file_path) = file_path {
        sets.push(format!("file_path = ?{idx}"));
        params.push(file_path.clone().map_or(libsql::Value::Null, Into::into));
        idx += 1;
    }

    (sets, params, idx)
}
