//! Optional TOML settings file.
//!
//! ```toml
//! log_level = "codeshell_core=debug"
//!
//! [shell]
//! home = "/src"
//! stream_interval_ms = 100
//! ```

use std::path::{Path, PathBuf};

use anyhow::Context;
use codeshell_core::config::ShellConfig;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Store document, used when `--store` is not given
    pub store: Option<PathBuf>,
    /// Tracing filter, used when neither `--log-level` nor the environment
    /// sets one
    pub log_level: Option<String>,
    pub shell: ShellConfig,
}

impl Settings {
    /// Read `path`, or the defaults when no file is given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read settings {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("invalid settings {}", path.display()))
    }

    pub fn parse(text: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_settings() {
        let settings = Settings::parse(
            r#"
            log_level = "debug"

            [shell]
            stream_interval_ms = 10
            "#,
        )
        .unwrap();
        assert_eq!(settings.log_level.as_deref(), Some("debug"));
        assert_eq!(settings.shell.stream_interval_ms, 10);
        assert_eq!(settings.shell.default_cwd, "/src");
        assert!(settings.store.is_none());
    }

    #[test]
    fn test_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        let err = Settings::load(Some(missing.as_path())).unwrap_err();
        assert!(err.to_string().contains("failed to read settings"));
    }

    #[test]
    fn test_no_file_is_default() {
        let settings = Settings::load(None).unwrap();
        assert_eq!(settings.shell, ShellConfig::default());
    }
}
