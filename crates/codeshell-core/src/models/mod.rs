//! Data models and types for the shell.
//!
//! Contains domain types for:
//! - [`FileNode`], [`NodeKind`], [`NodeType`] - Virtual filesystem representation
//! - [`HistoryEntry`], [`ExecState`] - Terminal session types

mod filesystem;
mod terminal;

pub use filesystem::{FileNode, FileRevision, NodeKind, NodeType, language_for, new_id};
pub use terminal::{EntryKind, ExecState, HistoryEntry, RecallDirection};
