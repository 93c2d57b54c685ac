//! Shell configuration.
//!
//! Centralizes the constants used throughout the crate. Text assets are
//! loaded at compile time using `include_str!`. Values a host may want to
//! change at runtime live in [`ShellConfig`].

use std::time::Duration;

use serde::{Deserialize, Serialize};

// =============================================================================
// Text Assets (loaded at compile time)
// =============================================================================

/// Help text for the `help` command.
pub const HELP_TEXT: &str = include_str!("../assets/text/help.txt");

/// Canned output of `git status`.
pub const GIT_STATUS_TEXT: &str = include_str!("../assets/text/git_status.txt");

/// Banner streamed line by line by `npm start`.
pub const NPM_START_BANNER: &str = include_str!("../assets/text/npm_start.txt");

/// First history entry of every new terminal.
pub const WELCOME_TEXT: &str = include_str!("../assets/text/welcome.txt");

// =============================================================================
// Application Metadata
// =============================================================================

/// Application name, used in prompts and the default `SHELL` variable.
pub const APP_NAME: &str = "codeshell";

// =============================================================================
// Filesystem Configuration
// =============================================================================

/// Working directory of a freshly created terminal.
pub const DEFAULT_CWD: &str = "/src";

/// Default value of `$HOME`, the target of a bare `cd`.
pub const DEFAULT_HOME: &str = "/src";

/// Default value of `$USER`.
pub const DEFAULT_USER: &str = "developer";

/// Maximum number of saved revisions kept per file.
pub const MAX_FILE_HISTORY: usize = 50;

// =============================================================================
// Terminal Configuration
// =============================================================================

/// Maximum number of terminal history entries kept per session.
pub const MAX_TERMINAL_HISTORY: usize = 1000;

/// Maximum number of submitted command lines kept for arrow-key recall.
pub const MAX_COMMAND_LOG: usize = 50;

/// Delay between two streamed lines of `npm start`, in milliseconds.
pub const STREAM_INTERVAL_MS: u64 = 250;

/// Pipe filter defaults.
pub mod pipe_filters {
    /// Default number of lines for `head`.
    pub const DEFAULT_HEAD_LINES: usize = 10;
    /// Default number of lines for `tail`.
    pub const DEFAULT_TAIL_LINES: usize = 10;
}

// =============================================================================
// Runtime Configuration
// =============================================================================

/// Runtime settings for sessions.
///
/// Every field has a default, so a host can deserialize a partial TOML or
/// JSON document and get the compiled-in values for the rest.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    /// Working directory of new sessions.
    pub default_cwd: String,
    /// Value of `$HOME`.
    pub home: String,
    /// Value of `$USER`.
    pub user: String,
    /// Welcome line seeded into new sessions.
    pub welcome: String,
    /// Milliseconds between streamed lines.
    pub stream_interval_ms: u64,
    /// History entries kept per session.
    pub max_history: usize,
    /// Command lines kept for recall.
    pub max_command_log: usize,
}

impl ShellConfig {
    pub fn stream_interval(&self) -> Duration {
        Duration::from_millis(self.stream_interval_ms)
    }
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            default_cwd: DEFAULT_CWD.to_string(),
            home: DEFAULT_HOME.to_string(),
            user: DEFAULT_USER.to_string(),
            welcome: WELCOME_TEXT.trim_end().to_string(),
            stream_interval_ms: STREAM_INTERVAL_MS,
            max_history: MAX_TERMINAL_HISTORY,
            max_command_log: MAX_COMMAND_LOG,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_matches_constants() {
        let config = ShellConfig::default();
        assert_eq!(config.default_cwd, "/src");
        assert_eq!(config.max_command_log, 50);
        assert_eq!(config.stream_interval(), Duration::from_millis(250));
        assert!(!config.welcome.ends_with('\n'));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: ShellConfig =
            serde_json::from_str(r#"{"home": "/workspace", "stream_interval_ms": 5}"#).unwrap();
        assert_eq!(config.home, "/workspace");
        assert_eq!(config.stream_interval_ms, 5);
        assert_eq!(config.user, DEFAULT_USER);
    }

    #[test]
    fn test_banner_is_multiline() {
        assert!(NPM_START_BANNER.lines().count() > 3);
        assert!(HELP_TEXT.contains("grep"));
    }
}
