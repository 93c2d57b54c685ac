//! Command-line parser with quoting, variables, pipes and redirection.
//!
//! Supports:
//! - Quote handling: `"string with spaces"`, `'literal string'`
//! - Variable expansion: `$VAR`, `${VAR}` via [`parse_with_env`]
//! - Pipe operator: `cmd1 | cmd2 | cmd3`
//! - Redirection: `cmd > file`, `cmd >> file`

mod lexer;

pub use lexer::{Lexer, Token};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// Parse Error
// =============================================================================

/// Structured error type for parsing failures. Positions are token indices.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Blank input
    #[error("empty command")]
    Empty,
    /// Pipe at the beginning of a stage: `| grep foo`, `ls | | wc`
    #[error("unexpected '|' at token {}", .position + 1)]
    UnexpectedPipe { position: usize },
    /// Pipe at the end with no following command: `ls |`
    #[error("unexpected end after '|' at token {}", .position + 1)]
    TrailingPipe { position: usize },
    /// `>` or `>>` not followed by a word: `echo hi >`
    #[error("missing redirect target after token {}", .position + 1)]
    MissingRedirectTarget { position: usize },
    /// Redirect without a command: `> out.txt`
    #[error("missing command before token {}", .position + 1)]
    MissingCommand { position: usize },
}

// =============================================================================
// Command Representation
// =============================================================================

/// How a redirect writes its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RedirectMode {
    /// `>`: replace the content
    Truncate,
    /// `>>`: append to the content
    Append,
}

/// Output redirection of a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub mode: RedirectMode,
    /// As written; resolved against the working directory on execution
    pub target: String,
}

/// A parsed command line: a command, its arguments, and optionally the
/// command its output is piped into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub command: String,
    pub args: Vec<String>,
    pub pipe: Option<Box<ParsedCommand>>,
    pub redirect: Option<Redirect>,
}

impl ParsedCommand {
    /// The stages of the pipe chain, left to right.
    pub fn stages(&self) -> Stages<'_> {
        Stages {
            next: Some(self),
        }
    }
}

/// Iterator over a pipe chain.
pub struct Stages<'a> {
    next: Option<&'a ParsedCommand>,
}

impl<'a> Iterator for Stages<'a> {
    type Item = &'a ParsedCommand;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.pipe.as_deref();
        Some(current)
    }
}

// =============================================================================
// Parser
// =============================================================================

/// Parse a command line, leaving `$VAR` references as written.
pub fn parse(line: &str) -> Result<ParsedCommand, ParseError> {
    parse_tokens(Lexer::new(line).tokenize(), 0)
}

/// Parse a command line, expanding `$VAR` references from `env`.
pub fn parse_with_env(
    line: &str,
    env: &BTreeMap<String, String>,
) -> Result<ParsedCommand, ParseError> {
    parse_tokens(Lexer::new(line).with_env(env).tokenize(), 0)
}

/// `offset` is the index of `tokens[0]` in the full line.
fn parse_tokens(mut tokens: Vec<Token>, offset: usize) -> Result<ParsedCommand, ParseError> {
    if tokens.is_empty() {
        return Err(ParseError::Empty);
    }

    let pipe = match tokens.iter().position(|t| *t == Token::Pipe) {
        Some(0) => return Err(ParseError::UnexpectedPipe { position: offset }),
        Some(idx) => {
            let right = tokens.split_off(idx + 1);
            tokens.pop();
            if right.is_empty() {
                return Err(ParseError::TrailingPipe {
                    position: offset + idx,
                });
            }
            Some(Box::new(parse_tokens(right, offset + idx + 1)?))
        }
        None => None,
    };

    let mut words = Vec::new();
    let mut redirect = None;
    let mut iter = tokens.into_iter().enumerate();
    while let Some((idx, token)) = iter.next() {
        match token {
            Token::Word(word) => words.push(word),
            Token::Redirect(mode) => match iter.next() {
                Some((_, Token::Word(target))) => redirect = Some(Redirect { mode, target }),
                _ => {
                    return Err(ParseError::MissingRedirectTarget {
                        position: offset + idx,
                    });
                }
            },
            // split off above
            Token::Pipe => {}
        }
    }

    let mut words = words.into_iter();
    let command = words
        .next()
        .ok_or(ParseError::MissingCommand { position: offset })?;

    Ok(ParsedCommand {
        command,
        args: words.collect(),
        pipe,
        redirect,
    })
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_command() {
        let cmd = parse("ls -la /src").unwrap();
        assert_eq!(cmd.command, "ls");
        assert_eq!(cmd.args, vec!["-la", "/src"]);
        assert!(cmd.pipe.is_none());
        assert!(cmd.redirect.is_none());
    }

    #[test]
    fn test_parse_pipeline() {
        let cmd = parse("cat App.jsx | grep use | head -5").unwrap();
        let names: Vec<_> = cmd.stages().map(|c| c.command.as_str()).collect();
        assert_eq!(names, vec!["cat", "grep", "head"]);
        let grep = cmd.pipe.as_deref().unwrap();
        assert_eq!(grep.args, vec!["use"]);
        assert_eq!(grep.pipe.as_deref().unwrap().args, vec!["-5"]);
    }

    #[test]
    fn test_redirects() {
        let cmd = parse("echo hello world > out.txt").unwrap();
        assert_eq!(cmd.args, vec!["hello", "world"]);
        assert_eq!(
            cmd.redirect,
            Some(Redirect {
                mode: RedirectMode::Truncate,
                target: "out.txt".to_string(),
            })
        );

        let cmd = parse("echo more >> ../notes.txt").unwrap();
        let redirect = cmd.redirect.unwrap();
        assert_eq!(redirect.mode, RedirectMode::Append);
        assert_eq!(redirect.target, "../notes.txt");
    }

    #[test]
    fn test_redirect_belongs_to_its_stage() {
        let cmd = parse("echo a > x | cat").unwrap();
        assert!(cmd.redirect.is_some());
        assert!(cmd.pipe.unwrap().redirect.is_none());

        let cmd = parse("cat a | grep b > hits.txt").unwrap();
        assert!(cmd.redirect.is_none());
        assert_eq!(cmd.pipe.unwrap().redirect.unwrap().target, "hits.txt");
    }

    #[test]
    fn test_syntax_errors() {
        assert_eq!(parse("   "), Err(ParseError::Empty));
        assert_eq!(parse("| grep x"), Err(ParseError::UnexpectedPipe { position: 0 }));
        assert_eq!(parse("ls |"), Err(ParseError::TrailingPipe { position: 1 }));
        assert_eq!(
            parse("ls | | wc"),
            Err(ParseError::UnexpectedPipe { position: 2 })
        );
        assert_eq!(
            parse("echo hi >"),
            Err(ParseError::MissingRedirectTarget { position: 2 })
        );
        assert_eq!(
            parse("echo hi > | cat"),
            Err(ParseError::MissingRedirectTarget { position: 2 })
        );
        assert_eq!(
            parse("> out.txt"),
            Err(ParseError::MissingCommand { position: 0 })
        );
    }

    #[test]
    fn test_parse_with_env() {
        let env = BTreeMap::from([("DIR".to_string(), "/public".to_string())]);
        let cmd = parse_with_env("ls $DIR", &env).unwrap();
        assert_eq!(cmd.args, vec!["/public"]);
        let cmd = parse("ls $DIR").unwrap();
        assert_eq!(cmd.args, vec!["$DIR"]);
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            ParseError::TrailingPipe { position: 1 }.to_string(),
            "unexpected end after '|' at token 2"
        );
    }
}
