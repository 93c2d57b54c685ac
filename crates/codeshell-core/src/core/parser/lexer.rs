//! Lexer for tokenizing shell input.
//!
//! Handles:
//! - Word tokenization on whitespace
//! - Pipe (`|`) and redirect (`>`, `>>`) operators, also when attached to words
//! - Quote handling (`'literal'`, `"expanded"` with `\n` and `\t` escapes)
//! - Variable references (`$VAR`, `${VAR}`) when an environment is attached

use std::collections::BTreeMap;

use super::RedirectMode;

// =============================================================================
// Token Types
// =============================================================================

/// Token types produced by the lexer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// A word (command name or argument), quotes removed
    Word(String),
    /// Pipe operator `|`
    Pipe,
    /// Redirect operator `>` or `>>`
    Redirect(RedirectMode),
}

// =============================================================================
// Lexer
// =============================================================================

/// Lexer for tokenizing shell input
pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    env: Option<&'a BTreeMap<String, String>>,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given input. Variables are left as written.
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            env: None,
        }
    }

    /// Expand `$VAR` references from `env` while tokenizing.
    /// Unset variables expand to the empty string.
    pub fn with_env(mut self, env: &'a BTreeMap<String, String>) -> Self {
        self.env = Some(env);
        self
    }

    /// Tokenize the entire input into a vector
    pub fn tokenize(self) -> Vec<Token> {
        self.collect()
    }

    fn current_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.current_char()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.current_char() {
            if !c.is_whitespace() {
                break;
            }
            self.pos += c.len_utf8();
        }
    }

    fn parse_redirect(&mut self) -> Token {
        self.pos += 1;
        if self.current_char() == Some('>') {
            self.pos += 1;
            Token::Redirect(RedirectMode::Append)
        } else {
            Token::Redirect(RedirectMode::Truncate)
        }
    }

    /// Read one word. Returns `None` when the word expanded to nothing and
    /// contained no quotes.
    fn parse_word(&mut self) -> Option<Token> {
        let mut word = String::new();
        let mut quoted = false;

        while let Some(c) = self.current_char() {
            match c {
                c if c.is_whitespace() => break,
                '|' | '>' => break,
                '\'' => {
                    self.pos += 1;
                    quoted = true;
                    self.read_single_quoted(&mut word);
                }
                '"' => {
                    self.pos += 1;
                    quoted = true;
                    self.read_double_quoted(&mut word);
                }
                '\\' => {
                    self.pos += 1;
                    if let Some(escaped) = self.bump() {
                        word.push(escaped);
                    }
                    quoted = true;
                }
                '$' => {
                    self.pos += 1;
                    self.read_variable(&mut word);
                }
                _ => {
                    self.pos += c.len_utf8();
                    word.push(c);
                }
            }
        }

        if word.is_empty() && !quoted {
            None
        } else {
            Some(Token::Word(word))
        }
    }

    fn read_single_quoted(&mut self, word: &mut String) {
        while let Some(c) = self.bump() {
            if c == '\'' {
                return;
            }
            word.push(c);
        }
    }

    fn read_double_quoted(&mut self, word: &mut String) {
        while let Some(c) = self.bump() {
            match c {
                '"' => return,
                '\\' => match self.bump() {
                    Some('n') => word.push('\n'),
                    Some('t') => word.push('\t'),
                    Some(other @ ('"' | '\\' | '$')) => word.push(other),
                    Some(other) => {
                        word.push('\\');
                        word.push(other);
                    }
                    None => word.push('\\'),
                },
                '$' => self.read_variable(word),
                _ => word.push(c),
            }
        }
    }

    /// Read a variable reference after the `$` has been consumed.
    fn read_variable(&mut self, word: &mut String) {
        let start = self.pos;
        let name = if self.current_char() == Some('{') {
            self.pos += 1;
            match self.input[self.pos..].find('}') {
                Some(len) => {
                    let name = &self.input[self.pos..self.pos + len];
                    self.pos += len + 1;
                    name
                }
                None => {
                    // Unclosed brace stays literal
                    word.push('$');
                    return;
                }
            }
        } else {
            let len = self.input[self.pos..]
                .find(|c: char| !c.is_alphanumeric() && c != '_')
                .unwrap_or(self.input.len() - self.pos);
            let name = &self.input[self.pos..self.pos + len];
            self.pos += len;
            name
        };

        if name.is_empty() {
            word.push('$');
            word.push_str(&self.input[start..self.pos]);
            return;
        }

        match self.env {
            Some(env) => {
                if let Some(value) = env.get(name) {
                    word.push_str(value);
                }
            }
            None => {
                word.push('$');
                word.push_str(&self.input[start..self.pos]);
            }
        }
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.skip_whitespace();
            match self.current_char()? {
                '|' => {
                    self.pos += 1;
                    return Some(Token::Pipe);
                }
                '>' => return Some(self.parse_redirect()),
                _ => {
                    if let Some(token) = self.parse_word() {
                        return Some(token);
                    }
                }
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
