//! Command parsing and execution.
//!
//! This module provides:
//! - `Command` enum for parsed terminal commands
//! - `CommandResult` and `ExecOutcome` for execution results
//! - `execute` for running a full command line against a session
//!
//! # Architecture
//!
//! A line is parsed into a [`ParsedCommand`](crate::core::parser::ParsedCommand)
//! chain. Each stage is turned into a [`Command`] and executed in order; the
//! text output of one stage is the piped input of the next, and a stage with
//! a redirect writes its output to a file instead of passing it on.

mod execute;
mod filters;
mod result;

pub use execute::execute;
pub use result::{CommandResult, ExecOutcome};

use std::fmt;

use crate::config::pipe_filters;
use crate::core::error::{ShellError, ShellResult};

// =============================================================================
// Path Argument Type
// =============================================================================

/// A path argument passed to a command (e.g., `cd src`, `cat App.jsx`).
///
/// Stored as written; resolution against the working directory happens
/// during execution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathArg(String);

impl PathArg {
    /// Create a new path argument from a string.
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// Get the path as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PathArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PathArg {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl PartialEq<&str> for PathArg {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

// =============================================================================
// Command Enum
// =============================================================================

/// Parsed terminal command
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Help,
    Clear,
    Ls(Option<PathArg>),
    Pwd,
    Echo(String),
    Date,
    Mkdir {
        paths: Vec<PathArg>,
        /// `-p`: create missing parents, accept existing folders
        parents: bool,
    },
    Touch(Vec<PathArg>),
    /// `None` changes to `$HOME`
    Cd(Option<PathArg>),
    Rm {
        paths: Vec<PathArg>,
        recursive: bool,
    },
    Mv {
        sources: Vec<PathArg>,
        destination: PathArg,
    },
    Cp {
        sources: Vec<PathArg>,
        destination: PathArg,
    },
    /// `None` reads piped input
    Cat(Option<PathArg>),
    Grep {
        pattern: String,
        file: Option<PathArg>,
        ignore_case: bool,
    },
    Head {
        lines: usize,
        file: Option<PathArg>,
    },
    Tail {
        lines: usize,
        file: Option<PathArg>,
    },
    Wc(Option<PathArg>),
    Export(Vec<String>),
    Unset(Vec<String>),
    Env,
    History,
    NpmStart,
    GitStatus,
}

impl Command {
    /// Get all available command names for autocomplete.
    pub fn names() -> &'static [&'static str] {
        &[
            "cat", "cd", "clear", "cp", "date", "echo", "env", "export", "git", "grep", "head",
            "help", "history", "ls", "mkdir", "mv", "npm", "pwd", "rm", "tail", "touch", "unset",
            "wc",
        ]
    }

    /// Parse command from name and arguments. Names are case-insensitive.
    pub fn parse(name: &str, args: &[String]) -> ShellResult<Self> {
        let name = name.to_lowercase();
        if let Some((command, flags)) = accepted_flags(&name) {
            reject_unknown_flags(args, command, flags)?;
        }
        let command = match name.as_str() {
            "help" | "?" => Self::Help,
            "clear" | "cls" => Self::Clear,
            "ls" => Self::Ls(operands(args).next().map(PathArg::from)),
            "pwd" => Self::Pwd,
            "echo" => Self::Echo(args.join(" ")),
            "date" => Self::Date,
            "mkdir" => {
                let paths = required(args, "mkdir", "directory")?;
                Self::Mkdir {
                    paths,
                    parents: has_flag(args, MKDIR_FLAGS),
                }
            }
            "touch" => Self::Touch(required(args, "touch", "file")?),
            "cd" => Self::Cd(args.first().map(|a| PathArg::from(a.as_str()))),
            "rm" => Self::Rm {
                paths: required(args, "rm", "path")?,
                recursive: has_flag(args, RM_FLAGS),
            },
            "mv" => {
                let (sources, destination) = source_and_destination(args, "mv")?;
                Self::Mv {
                    sources,
                    destination,
                }
            }
            "cp" => {
                let (sources, destination) = source_and_destination(args, "cp")?;
                Self::Cp {
                    sources,
                    destination,
                }
            }
            "cat" => Self::Cat(operands(args).next().map(PathArg::from)),
            "grep" => {
                let mut rest = operands(args);
                let pattern = rest.next().ok_or(ShellError::MissingArgument {
                    command: "grep",
                    operand: "pattern",
                })?;
                Self::Grep {
                    pattern: pattern.to_string(),
                    file: rest.next().map(PathArg::from),
                    ignore_case: has_flag(args, GREP_FLAGS),
                }
            }
            "head" => {
                let (lines, file) = count_and_file(args, "head", pipe_filters::DEFAULT_HEAD_LINES)?;
                Self::Head { lines, file }
            }
            "tail" => {
                let (lines, file) = count_and_file(args, "tail", pipe_filters::DEFAULT_TAIL_LINES)?;
                Self::Tail { lines, file }
            }
            "wc" => Self::Wc(operands(args).next().map(PathArg::from)),
            "export" => Self::Export(args.to_vec()),
            "unset" => {
                if args.is_empty() {
                    return Err(ShellError::MissingArgument {
                        command: "unset",
                        operand: "variable name",
                    });
                }
                Self::Unset(args.to_vec())
            }
            "env" => Self::Env,
            "history" => Self::History,
            "npm" => match args.first().map(|a| a.to_lowercase()) {
                None => {
                    return Err(ShellError::MissingArgument {
                        command: "npm",
                        operand: "script",
                    });
                }
                Some(script) if script == "start" => Self::NpmStart,
                Some(_) => {
                    return Err(ShellError::UnknownCommand(format!("npm {}", args.join(" "))));
                }
            },
            "git" => match args.first().map(|a| a.to_lowercase()) {
                Some(sub) if sub == "status" => Self::GitStatus,
                _ => {
                    let line = std::iter::once("git")
                        .chain(args.iter().map(String::as_str))
                        .collect::<Vec<_>>()
                        .join(" ");
                    return Err(ShellError::UnknownCommand(line));
                }
            },
            _ => return Err(ShellError::UnknownCommand(name.clone())),
        };
        Ok(command)
    }
}

// =============================================================================
// Argument Helpers
// =============================================================================

const MKDIR_FLAGS: &[&str] = &["-p", "--parents"];
const RM_FLAGS: &[&str] = &["-r", "-R", "-rf", "-fr", "-Rf", "--recursive"];
const GREP_FLAGS: &[&str] = &["-i", "--ignore-case"];

/// Flags understood by commands taking path operands. Commands not listed
/// here pass their arguments through unchecked.
fn accepted_flags(name: &str) -> Option<(&'static str, &'static [&'static str])> {
    let entry: (&'static str, &'static [&'static str]) = match name {
        "ls" => ("ls", &[]),
        "mkdir" => ("mkdir", MKDIR_FLAGS),
        "touch" => ("touch", &[]),
        "rm" => ("rm", RM_FLAGS),
        "mv" => ("mv", &[]),
        "cp" => ("cp", &[]),
        "cat" => ("cat", &[]),
        "grep" => ("grep", GREP_FLAGS),
        "wc" => ("wc", &[]),
        _ => return None,
    };
    Some(entry)
}

fn reject_unknown_flags(
    args: &[String],
    command: &'static str,
    flags: &[&str],
) -> ShellResult<()> {
    match args.iter().find(|a| is_flag(a) && !flags.contains(&a.as_str())) {
        Some(option) => Err(ShellError::InvalidOption {
            command,
            option: option.clone(),
        }),
        None => Ok(()),
    }
}

fn is_flag(arg: &str) -> bool {
    arg.starts_with('-') && arg != "-"
}

/// Arguments that are not flags.
fn operands(args: &[String]) -> impl Iterator<Item = &str> {
    args.iter()
        .map(String::as_str)
        .filter(|a| !is_flag(a))
}

fn has_flag(args: &[String], flags: &[&str]) -> bool {
    args.iter().any(|a| flags.contains(&a.as_str()))
}

fn required(
    args: &[String],
    command: &'static str,
    operand: &'static str,
) -> ShellResult<Vec<PathArg>> {
    let paths: Vec<PathArg> = operands(args).map(PathArg::from).collect();
    if paths.is_empty() {
        return Err(ShellError::MissingArgument { command, operand });
    }
    Ok(paths)
}

fn source_and_destination(
    args: &[String],
    command: &'static str,
) -> ShellResult<(Vec<PathArg>, PathArg)> {
    let mut paths: Vec<PathArg> = operands(args).map(PathArg::from).collect();
    let missing = match paths.len() {
        0 => "source",
        1 => "destination",
        _ => {
            let destination = paths.remove(paths.len() - 1);
            return Ok((paths, destination));
        }
    };
    Err(ShellError::MissingArgument {
        command,
        operand: missing,
    })
}

/// Parse `[-n N | -nN | -N] [file]`.
fn count_and_file(
    args: &[String],
    command: &'static str,
    default: usize,
) -> ShellResult<(usize, Option<PathArg>)> {
    let missing = || ShellError::MissingArgument {
        command,
        operand: "line count",
    };
    let mut count = default;
    let mut file = None;
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "-n" {
            let value = iter.next().ok_or_else(missing)?;
            count = value.parse().map_err(|_| missing())?;
        } else if let Some(value) = arg.strip_prefix("-n") {
            count = value.parse().map_err(|_| missing())?;
        } else if let Some(value) = arg.strip_prefix('-') {
            count = value.parse().map_err(|_| ShellError::InvalidOption {
                command,
                option: arg.clone(),
            })?;
        } else if file.is_none() {
            file = Some(PathArg::from(arg.as_str()));
        }
    }
    Ok((count, file))
}
