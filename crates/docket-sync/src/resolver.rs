//! Conflict resolution strategies.
//!
//! Resolution starts from the stored record and overwrites only the
//! conflicting fields whose winning side is the file. Operational fields
//! (status, priority, agent, dependencies, timestamps) are never touched.

use std::collections::VecDeque;
use std::fmt;
use std::io::{BufRead, Write};
use std::sync::{Arc, Mutex};

use docket_core::entities::Task;
use docket_core::enums::{ConflictField, ConflictStrategyKind};

use crate::conflict::FieldConflict;
use crate::error::SyncError;
use crate::metadata::ParsedMetadata;

/// Winning side of one conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    File,
    Store,
}

/// Decides conflicts for [`ResolutionStrategy::Manual`].
pub trait ConflictChooser: Send + Sync {
    /// Pick the winning side for `conflict`.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Prompt` if no decision can be obtained.
    fn choose_side(&self, conflict: &FieldConflict) -> Result<Side, SyncError>;
}

#[derive(Clone)]
pub enum ResolutionStrategy {
    FileWins,
    StoreWins,
    /// File wins when its mtime is strictly later than the record's `updated_at`.
    NewerWins,
    Manual(Arc<dyn ConflictChooser>),
}

impl ResolutionStrategy {
    #[must_use]
    pub const fn kind(&self) -> ConflictStrategyKind {
        match self {
            Self::FileWins => ConflictStrategyKind::FileWins,
            Self::StoreWins => ConflictStrategyKind::StoreWins,
            Self::NewerWins => ConflictStrategyKind::NewerWins,
            Self::Manual(_) => ConflictStrategyKind::Manual,
        }
    }

    /// Build a strategy from its name. `chooser` is only called for `manual`.
    pub fn from_kind(
        kind: ConflictStrategyKind,
        chooser: impl FnOnce() -> Arc<dyn ConflictChooser>,
    ) -> Self {
        match kind {
            ConflictStrategyKind::FileWins => Self::FileWins,
            ConflictStrategyKind::StoreWins => Self::StoreWins,
            ConflictStrategyKind::NewerWins => Self::NewerWins,
            ConflictStrategyKind::Manual => Self::Manual(chooser()),
        }
    }
}

impl fmt::Debug for ResolutionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResolutionStrategy({})", self.kind())
    }
}

/// Merge `conflicts` into a copy of `record` according to `strategy`.
///
/// # Errors
///
/// Returns `SyncError::Prompt` if a manual chooser fails.
pub fn resolve(
    conflicts: &[FieldConflict],
    meta: &ParsedMetadata,
    record: &Task,
    strategy: &ResolutionStrategy,
) -> Result<Task, SyncError> {
    let mut merged = record.clone();
    for conflict in conflicts {
        let side = match strategy {
            ResolutionStrategy::FileWins => Side::File,
            ResolutionStrategy::StoreWins => Side::Store,
            ResolutionStrategy::NewerWins => {
                if meta.modified_at > record.updated_at {
                    Side::File
                } else {
                    Side::Store
                }
            }
            ResolutionStrategy::Manual(chooser) => chooser.choose_side(conflict)?,
        };
        tracing::debug!(
            key = %conflict.key,
            field = %conflict.field,
            winner = ?side,
            "conflict resolved"
        );
        if side == Side::File {
            take_file_value(&mut merged, conflict);
        }
    }
    Ok(merged)
}

fn take_file_value(task: &mut Task, conflict: &FieldConflict) {
    let value = conflict.file_value.clone();
    match conflict.field {
        ConflictField::Title => task.title = value,
        ConflictField::Description => task.description = Some(value),
        ConflictField::FilePath => task.file_path = Some(value),
    }
}

/// Interactive chooser that asks on `output` and reads answers from `input`.
pub struct PromptChooser<R, W> {
    io: Mutex<(R, W)>,
}

impl<R, W> PromptChooser<R, W> {
    pub const fn new(input: R, output: W) -> Self {
        Self {
            io: Mutex::new((input, output)),
        }
    }
}

fn parse_choice(answer: &str) -> Option<Side> {
    match answer.to_ascii_lowercase().as_str() {
        "file" | "f" => Some(Side::File),
        "store" | "s" | "db" | "database" => Some(Side::Store),
        _ => None,
    }
}

fn prompt_io(e: std::io::Error) -> SyncError {
    SyncError::Prompt(e.to_string())
}

impl<R, W> ConflictChooser for PromptChooser<R, W>
where
    R: BufRead + Send,
    W: Write + Send,
{
    fn choose_side(&self, conflict: &FieldConflict) -> Result<Side, SyncError> {
        let mut guard = self
            .io
            .lock()
            .map_err(|_| SyncError::Prompt("prompt state poisoned".to_string()))?;
        let (input, output) = &mut *guard;

        writeln!(output, "\nConflict in {} ({}):", conflict.key, conflict.field).map_err(prompt_io)?;
        writeln!(output, "  file:  {}", conflict.file_value).map_err(prompt_io)?;
        writeln!(output, "  store: {}", conflict.store_value).map_err(prompt_io)?;

        loop {
            write!(output, "Choose resolution (file/store): ").map_err(prompt_io)?;
            output.flush().map_err(prompt_io)?;

            let mut line = String::new();
            if input.read_line(&mut line).map_err(prompt_io)? == 0 {
                return Err(SyncError::Prompt(format!(
                    "input ended before a choice was made for {} ({})",
                    conflict.key, conflict.field
                )));
            }
            match parse_choice(line.trim()) {
                Some(side) => return Ok(side),
                None => writeln!(output, "Please answer 'file' or 'store'.").map_err(prompt_io)?,
            }
        }
    }
}

/// Chooser that replays a fixed sequence of answers.
pub struct ScriptedChooser {
    answers: Mutex<VecDeque<Side>>,
}

impl ScriptedChooser {
    pub fn new(answers: impl IntoIterator<Item = Side>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
        }
    }
}

impl ConflictChooser for ScriptedChooser {
    fn choose_side(&self, conflict: &FieldConflict) -> Result<Side, SyncError> {
        self.answers
            .lock()
            .map_err(|_| SyncError::Prompt("scripted answers poisoned".to_string()))?
            .pop_front()
            .ok_or_else(|| {
                SyncError::Prompt(format!(
                    "no scripted answer left for {} ({})",
                    conflict.key, conflict.field
                ))
            })
    }
}
