//! Fixed on-disk locations for supervisor state, all under one
//! per-user directory. Writers create missing parents themselves.

use std::{env, path::PathBuf};

/// Overrides the default `~/.memex` state directory.
pub const HOME_ENV: &str = "MEMEX_HOME";

pub fn state_dir() -> PathBuf {
    if let Some(home) = env::var_os(HOME_ENV) {
        return PathBuf::from(home);
    }
    dirs::home_dir()
        .map(|home| home.join(".memex"))
        .unwrap_or_else(|| PathBuf::from(".memex"))
}

pub fn state_file_path() -> PathBuf {
    state_dir().join("server.json")
}

pub fn server_log_path() -> PathBuf {
    state_dir().join("server.log")
}

pub fn lock_file_path() -> PathBuf {
    state_dir().join("server.lock")
}

pub fn config_file_path() -> PathBuf {
    state_dir().join("config.toml")
}
