//! Optional settings file for the supervisor, `~/.memex/config.toml`.
//!
//! Every key has a default; a missing file means "all defaults". A file
//! that exists but does not parse is a hard error rather than a silent
//! fallback.

use std::{fs, io, path::PathBuf, time::Duration};

use serde::Deserialize;
use thiserror::Error;

use crate::paths;

pub const DEFAULT_COMMAND: &str = "memex-api";
pub const DEFAULT_PREFERRED_PORT: u16 = 50000;
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(300);
pub const DEFAULT_STOP_GRACE: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read settings file '{path}': {source}")]
    ReadFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone)]
pub struct Settings {
    /// Executable spawned as the background API server.
    pub command: String,
    /// Port tried first before falling back to an ephemeral one.
    pub preferred_port: u16,
    /// Overall budget for the server to pass its readiness probe.
    pub ready_timeout: Duration,
    /// How long a stopping server gets between SIGTERM and SIGKILL.
    pub stop_grace: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            command: DEFAULT_COMMAND.to_string(),
            preferred_port: DEFAULT_PREFERRED_PORT,
            ready_timeout: DEFAULT_READY_TIMEOUT,
            stop_grace: DEFAULT_STOP_GRACE,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawSettings {
    server: RawServer,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawServer {
    command: Option<String>,
    preferred_port: Option<u16>,
    ready_timeout_secs: Option<u64>,
    stop_grace_secs: Option<u64>,
}

pub fn load() -> Result<Settings, ConfigError> {
    let path = paths::config_file_path();
    if !path.exists() {
        return Ok(Settings::default());
    }

    let contents = fs::read_to_string(&path).map_err(|source| ConfigError::ReadFailure {
        path: path.clone(),
        source,
    })?;
    load_from_str(&contents)
}

fn load_from_str(contents: &str) -> Result<Settings, ConfigError> {
    let raw: RawSettings = toml::from_str(contents)?;
    let defaults = Settings::default();
    Ok(Settings {
        command: raw.server.command.unwrap_or(defaults.command),
        preferred_port: raw.server.preferred_port.unwrap_or(defaults.preferred_port),
        ready_timeout: raw
            .server
            .ready_timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(defaults.ready_timeout),
        stop_grace: raw
            .server
            .stop_grace_secs
            .map(Duration::from_secs)
            .unwrap_or(defaults.stop_grace),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_settings_resolve_to_defaults() {
        let settings = load_from_str("").expect("settings parsed");
        assert_eq!(settings.command, DEFAULT_COMMAND);
        assert_eq!(settings.preferred_port, DEFAULT_PREFERRED_PORT);
        assert_eq!(settings.ready_timeout, DEFAULT_READY_TIMEOUT);
        assert_eq!(settings.stop_grace, DEFAULT_STOP_GRACE);
    }

    #[test]
    fn partial_settings_keep_defaults_for_missing_keys() {
        let toml = r#"
[server]
command = "memex-api-dev"
ready_timeout_secs = 30
"#;

        let settings = load_from_str(toml).expect("settings parsed");
        assert_eq!(settings.command, "memex-api-dev");
        assert_eq!(settings.preferred_port, DEFAULT_PREFERRED_PORT);
        assert_eq!(settings.ready_timeout, Duration::from_secs(30));
        assert_eq!(settings.stop_grace, DEFAULT_STOP_GRACE);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let toml = r#"
[server]
comand = "typo"
"#;

        assert!(matches!(load_from_str(toml), Err(ConfigError::Parse(_))));
    }
}
