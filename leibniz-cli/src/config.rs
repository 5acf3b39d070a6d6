//! Configuration from `leibniz.toml`.
//!
//! Discovered by walking up from the current directory. CLI flags override
//! file values, which override derived defaults.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Workspace-level defaults for worker counts and the remote transport.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LeibnizConfig {
    /// Default worker counts.
    #[serde(default)]
    pub defaults: DefaultsConfig,
    /// Remote backend settings.
    #[serde(default)]
    pub remote: RemoteConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Thread count for the thread backends.
    #[serde(default)]
    pub threads: Option<usize>,
    /// Process count for the process-queue backend.
    #[serde(default)]
    pub processes: Option<usize>,
}

/// `[remote]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Path of the worker executable on the remote hosts
    /// (default: this binary's own path).
    #[serde(default)]
    pub program: Option<String>,
}

impl LeibnizConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Ok(toml::from_str(&content)?)
    }

    /// Walk up from the current directory looking for `leibniz.toml`.
    pub fn discover() -> Option<Self> {
        let mut dir = std::env::current_dir().ok()?;
        loop {
            let candidate = dir.join("leibniz.toml");
            if candidate.exists() {
                return Self::load(&candidate).ok();
            }
            if !dir.pop() {
                break;
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_is_all_defaults() {
        let config: LeibnizConfig = toml::from_str("").unwrap();
        assert!(config.defaults.threads.is_none());
        assert!(config.defaults.processes.is_none());
        assert!(config.remote.program.is_none());
    }

    #[test]
    fn partial_sections_fill_in() {
        let config: LeibnizConfig = toml::from_str(
            r#"
            [defaults]
            threads = 8

            [remote]
            program = "/usr/local/bin/leibniz"
        "#,
        )
        .unwrap();
        assert_eq!(config.defaults.threads, Some(8));
        assert_eq!(config.defaults.processes, None);
        assert_eq!(config.remote.program.as_deref(), Some("/usr/local/bin/leibniz"));
    }
}
