//! Error types for the shell core.
//!
//! - [`ShellError`] - every failure a filesystem action or command can produce
//! - [`ErrorKind`] - its `Copy` discriminant, reported by command execution
//! - [`PersistenceError`] - failures of a [`PersistenceStore`](super::PersistenceStore)

use thiserror::Error;

use super::parser::ParseError;

pub type ShellResult<T> = Result<T, ShellError>;

/// Filesystem, command and session errors.
#[derive(Debug, Error)]
pub enum ShellError {
    #[error("no such file or directory: {0}")]
    PathNotFound(String),

    #[error("file exists: {0}")]
    PathExists(String),

    #[error("not a directory: {0}")]
    NotADirectory(String),

    #[error("not a file: {0}")]
    NotAFile(String),

    #[error("directory not empty: {0}")]
    DirectoryNotEmpty(String),

    #[error("command not found: {0}")]
    UnknownCommand(String),

    #[error("{command}: missing {operand} operand")]
    MissingArgument {
        command: &'static str,
        operand: &'static str,
    },

    #[error("{command}: invalid option '{option}'")]
    InvalidOption {
        command: &'static str,
        option: String,
    },

    /// A streaming command is still running in the session
    #[error("busy: '{active}' is still running (press Ctrl+C to stop it)")]
    Busy { active: String },

    #[error("persistence failed: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("invalid name: '{0}'")]
    InvalidName(String),

    #[error("cannot move '{path}' into itself: {target}")]
    InvalidMove { path: String, target: String },

    #[error("locked: {0}")]
    NodeLocked(String),

    #[error("invalid pattern: {0}")]
    InvalidPattern(String),

    #[error("invalid variable name: '{0}'")]
    InvalidVariableName(String),

    /// Multi-segment relative paths containing `.` or `..`
    #[error("unsupported path: {0}")]
    UnsupportedPath(String),

    #[error("syntax error: {0}")]
    Syntax(#[from] ParseError),

    #[error("no such session: {0}")]
    SessionNotFound(String),

    #[error("invalid workspace: {0}")]
    InvalidWorkspace(String),
}

/// Discriminant of [`ShellError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    PathNotFound,
    PathExists,
    NotADirectory,
    NotAFile,
    DirectoryNotEmpty,
    UnknownCommand,
    MissingArgument,
    InvalidOption,
    Busy,
    Persistence,
    InvalidName,
    InvalidMove,
    NodeLocked,
    InvalidPattern,
    InvalidVariableName,
    UnsupportedPath,
    Syntax,
    SessionNotFound,
    InvalidWorkspace,
}

impl ShellError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::PathNotFound(_) => ErrorKind::PathNotFound,
            Self::PathExists(_) => ErrorKind::PathExists,
            Self::NotADirectory(_) => ErrorKind::NotADirectory,
            Self::NotAFile(_) => ErrorKind::NotAFile,
            Self::DirectoryNotEmpty(_) => ErrorKind::DirectoryNotEmpty,
            Self::UnknownCommand(_) => ErrorKind::UnknownCommand,
            Self::MissingArgument { .. } => ErrorKind::MissingArgument,
            Self::InvalidOption { .. } => ErrorKind::InvalidOption,
            Self::Busy { .. } => ErrorKind::Busy,
            Self::Persistence(_) => ErrorKind::Persistence,
            Self::InvalidName(_) => ErrorKind::InvalidName,
            Self::InvalidMove { .. } => ErrorKind::InvalidMove,
            Self::NodeLocked(_) => ErrorKind::NodeLocked,
            Self::InvalidPattern(_) => ErrorKind::InvalidPattern,
            Self::InvalidVariableName(_) => ErrorKind::InvalidVariableName,
            Self::UnsupportedPath(_) => ErrorKind::UnsupportedPath,
            Self::Syntax(_) => ErrorKind::Syntax,
            Self::SessionNotFound(_) => ErrorKind::SessionNotFound,
            Self::InvalidWorkspace(_) => ErrorKind::InvalidWorkspace,
        }
    }

    /// Whether the message already names its origin and should not be
    /// prefixed with the failing command in terminal output.
    pub(crate) fn is_self_describing(&self) -> bool {
        matches!(
            self,
            Self::UnknownCommand(_)
                | Self::MissingArgument { .. }
                | Self::InvalidOption { .. }
                | Self::Busy { .. }
                | Self::Syntax(_)
        )
    }
}

/// Failures of the persistence backend.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("store backend: {0}")]
    Backend(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(
            ShellError::PathNotFound("/src/x".into()).to_string(),
            "no such file or directory: /src/x"
        );
        assert_eq!(
            ShellError::MissingArgument {
                command: "mkdir",
                operand: "directory",
            }
            .to_string(),
            "mkdir: missing directory operand"
        );
        assert_eq!(
            ShellError::UnknownCommand("foo".into()).to_string(),
            "command not found: foo"
        );
        assert_eq!(
            ShellError::InvalidOption {
                command: "grep",
                option: "-v".into(),
            }
            .to_string(),
            "grep: invalid option '-v'"
        );
    }

    #[test]
    fn test_kind_from_conversion() {
        let err: ShellError = PersistenceError::Backend("disk full".into()).into();
        assert_eq!(err.kind(), ErrorKind::Persistence);
        assert!(err.to_string().contains("disk full"));

        let err: ShellError = ParseError::Empty.into();
        assert_eq!(err.kind(), ErrorKind::Syntax);
        assert!(err.is_self_describing());
    }
}
