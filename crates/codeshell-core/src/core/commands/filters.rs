//! Text filters shared by file operands and piped input (grep, head, tail, wc).

use regex::{Regex, RegexBuilder};

use crate::core::error::{ShellError, ShellResult};

/// Compile a `grep` pattern.
pub fn compile_pattern(pattern: &str, ignore_case: bool) -> ShellResult<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(ignore_case)
        .build()
        .map_err(|_| ShellError::InvalidPattern(pattern.to_string()))
}

/// Lines of `text` matching `pattern`.
pub fn grep(pattern: &Regex, text: &str) -> Vec<String> {
    text.lines()
        .filter(|line| pattern.is_match(line))
        .map(str::to_string)
        .collect()
}

/// First `n` lines.
pub fn head(text: &str, n: usize) -> Vec<String> {
    text.lines().take(n).map(str::to_string).collect()
}

/// Last `n` lines.
pub fn tail(text: &str, n: usize) -> Vec<String> {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].iter().map(|s| s.to_string()).collect()
}

/// Line, word and byte counts.
pub fn word_count(text: &str) -> (usize, usize, usize) {
    (
        text.lines().count(),
        text.split_whitespace().count(),
        text.len(),
    )
}
