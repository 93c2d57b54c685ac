//! Terminal-related data types for session history.

use serde::{Deserialize, Serialize};

/// Kind of a history entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// Submitted command line
    Command,
    /// Plain output
    Output,
    /// Error message
    Error,
}

/// A single line of a terminal session's history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub kind: EntryKind,
    pub content: String,
    /// Unix milliseconds
    pub timestamp: i64,
}

impl HistoryEntry {
    pub fn command(content: impl Into<String>) -> Self {
        Self::new(EntryKind::Command, content)
    }

    pub fn output(content: impl Into<String>) -> Self {
        Self::new(EntryKind::Output, content)
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self::new(EntryKind::Error, content)
    }

    fn new(kind: EntryKind, content: impl Into<String>) -> Self {
        Self {
            kind,
            content: content.into(),
            timestamp: crate::utils::now_millis(),
        }
    }
}

/// Run state of a session.
///
/// `Idle -> Running -> {Succeeded, Failed}`; the next submission starts over.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecState {
    #[default]
    Idle,
    Running,
    Succeeded,
    Failed,
}

/// Arrow-key direction for command recall.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecallDirection {
    /// Toward older commands
    Up,
    /// Toward newer commands
    Down,
}
