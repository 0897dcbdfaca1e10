//! Configuration management for Wraith

use crate::session::SessionRegistry;
use crate::{Error, Result};
use serde::Deserialize;
use std::env;

/// Client construction options
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Agent executable to spawn
    pub executable: String,

    /// Additional arguments passed to the agent
    pub args: Vec<String>,

    /// Per-operation deadline in milliseconds
    pub timeout: u64,

    /// Maximum time to wait for the agent to report ready, in milliseconds
    pub startup_timeout: u64,

    /// Registry the session is tracked in, if any
    #[serde(skip)]
    pub registry: Option<SessionRegistry>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            executable: "wraith-agent".to_string(),
            args: vec![],
            timeout: 30_000,
            startup_timeout: 10_000,
            registry: None,
        }
    }
}

impl Options {
    /// Load options from environment variables
    pub fn from_env() -> Result<Self> {
        let mut options = Options::default();

        if let Ok(executable) = env::var("WRAITH_EXECUTABLE") {
            options.executable = executable;
        }

        if let Ok(args) = env::var("WRAITH_ARGS") {
            options.args = args.split_whitespace().map(String::from).collect();
        }

        if let Ok(timeout) = env::var("WRAITH_TIMEOUT") {
            options.timeout = timeout
                .parse()
                .map_err(|_| Error::configuration("Invalid WRAITH_TIMEOUT"))?;
        }

        if let Ok(startup_timeout) = env::var("WRAITH_STARTUP_TIMEOUT") {
            options.startup_timeout = startup_timeout
                .parse()
                .map_err(|_| Error::configuration("Invalid WRAITH_STARTUP_TIMEOUT"))?;
        }

        Ok(options)
    }

    /// Load options from a TOML file
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::configuration(format!("Failed to read config file: {}", e)))?;

        let options: Options = toml::from_str(&content)
            .map_err(|e| Error::configuration(format!("Failed to parse config: {}", e)))?;

        Ok(options)
    }

    /// Set the per-operation deadline in milliseconds
    pub fn with_timeout(mut self, ms: u64) -> Self {
        self.timeout = ms;
        self
    }

    /// Track the session in the given registry
    pub fn with_registry(mut self, registry: SessionRegistry) -> Self {
        self.registry = Some(registry);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = Options::default();
        assert_eq!(options.timeout, 30_000);
        assert_eq!(options.startup_timeout, 10_000);
        assert!(options.registry.is_none());
    }

    #[test]
    fn test_parse_toml() {
        let options: Options =
            toml::from_str("executable = \"phantom-agent\"\ntimeout = 5000\n").unwrap();
        assert_eq!(options.executable, "phantom-agent");
        assert_eq!(options.timeout, 5000);
        assert_eq!(options.startup_timeout, 10_000);
    }

    #[test]
    fn test_with_timeout() {
        let options = Options::default().with_timeout(250);
        assert_eq!(options.timeout, 250);
    }
}
