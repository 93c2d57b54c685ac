//! Command execution result types.

use crate::core::error::ErrorKind;

/// Result of running a single command.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandResult {
    /// Output lines, printed or fed to the next pipe stage
    pub output: Vec<String>,
    /// Lines to emit one per tick instead of at once
    pub stream: Option<Vec<String>>,
}

impl CommandResult {
    /// Create a result with just output.
    pub fn output(lines: Vec<String>) -> Self {
        Self {
            output: lines,
            stream: None,
        }
    }

    /// Create a single-line result.
    pub fn line(line: impl Into<String>) -> Self {
        Self::output(vec![line.into()])
    }

    /// Create a result that streams `lines`.
    pub fn stream(lines: Vec<String>) -> Self {
        Self {
            output: Vec::new(),
            stream: Some(lines),
        }
    }

    /// Create an empty result.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Output as one text, as written by a redirect or read by a pipe.
    pub fn text(&self) -> String {
        match &self.stream {
            Some(lines) => lines.join("\n"),
            None => self.output.join("\n"),
        }
    }
}

/// Outcome of submitting one command line to a session.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExecOutcome {
    /// Output lines appended to history by this submission
    pub output_lines: Vec<String>,
    pub error: Option<ErrorKind>,
    /// Whether the session now streams output and wants ticks
    pub streaming: bool,
}

impl ExecOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub(crate) fn failed(kind: ErrorKind) -> Self {
        Self {
            error: Some(kind),
            ..Self::default()
        }
    }
}
