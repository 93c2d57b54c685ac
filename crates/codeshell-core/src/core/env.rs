//! Session environment variables.
//!
//! Each terminal session owns its own [`Environment`], seeded with `HOME`,
//! `USER`, `SHELL` and `PWD` and changed with `export`/`unset`/`cd`.

use std::collections::BTreeMap;

use crate::config::{APP_NAME, ShellConfig};
use crate::core::error::{ShellError, ShellResult};

/// Variable name to value, sorted by name.
pub type Environment = BTreeMap<String, String>;

/// Check if a variable name is valid.
///
/// Valid names must:
/// - Not be empty
/// - Start with a letter or underscore
/// - Contain only alphanumeric characters and underscores
pub fn is_valid_var_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };

    if !first.is_ascii_alphabetic() && first != '_' {
        return false;
    }

    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Initial environment of a new session.
pub fn default_env(config: &ShellConfig, cwd: &str) -> Environment {
    let mut env = Environment::new();
    env.insert("HOME".to_string(), config.home.clone());
    env.insert("USER".to_string(), config.user.clone());
    env.insert("SHELL".to_string(), format!("/bin/{}", APP_NAME));
    env.insert("PWD".to_string(), cwd.to_string());
    env
}

/// Split an `export` operand into name and value.
///
/// `KEY=value` sets `value`; a bare `KEY` keeps the current value (or empty).
pub fn parse_assignment(operand: &str, env: &Environment) -> ShellResult<(String, String)> {
    let (name, value) = match operand.split_once('=') {
        Some((name, value)) => (name, value.to_string()),
        None => (operand, env.get(operand).cloned().unwrap_or_default()),
    };
    if !is_valid_var_name(name) {
        return Err(ShellError::InvalidVariableName(name.to_string()));
    }
    Ok((name.to_string(), value))
}

/// `export` with no operands: one `declare -x` line per variable.
pub fn format_export_output(env: &Environment) -> Vec<String> {
    env.iter()
        .map(|(key, value)| format!("declare -x {}=\"{}\"", key, value))
        .collect()
}

/// `env`: one `KEY=value` line per variable.
pub fn format_env_output(env: &Environment) -> Vec<String> {
    env.iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect()
}
