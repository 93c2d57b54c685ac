//! Core logic of the shell.
//!
//! This module provides:
//! - [`VirtualFileTree`] in-memory nodes and [`Workspace`] persisted mutations
//! - [`parse`] for command lines and [`execute`] against a [`TerminalSession`]
//! - [`SessionManager`] for independent terminals
//! - [`autocomplete`] and [`get_hint`] for tab completion

mod autocomplete;
pub mod commands;
pub mod env;
pub mod error;
pub mod filesystem;
pub mod parser;
pub mod path;
pub mod session;
mod sessions;
pub mod store;
pub mod workspace;

pub use autocomplete::{AutocompleteResult, autocomplete, hint as get_hint};
pub use commands::{Command, ExecOutcome, execute};
pub use error::{ErrorKind, PersistenceError, ShellError, ShellResult};
pub use filesystem::VirtualFileTree;
pub use parser::{ParsedCommand, parse, parse_with_env};
pub use path::resolve;
pub use session::TerminalSession;
pub use sessions::SessionManager;
pub use store::{FileRecord, FolderRecord, MemoryStore, PersistenceStore, StoreOp, StoreSnapshot};
pub use workspace::Workspace;
