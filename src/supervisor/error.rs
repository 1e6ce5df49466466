use std::{io, path::PathBuf, time::Duration};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("no usable port on 127.0.0.1: {0}")]
    PortAllocation(#[source] io::Error),
    #[error(
        "service executable `{command}` was not found; install it or point \
         server.command at it in config.toml"
    )]
    LauncherMissing { command: String },
    #[error("failed to launch `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to open server log at '{path}': {source}")]
    LogSink {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("service did not become ready within {timeout:?}")]
    ReadyTimeout { timeout: Duration },
    #[error("failed to signal pid {pid}: {source}")]
    Signal {
        pid: u32,
        #[source]
        source: nix::Error,
    },
    #[error("failed to persist service state: {0}")]
    Store(#[source] io::Error),
    #[error("failed to take the server start lock: {0}")]
    Lock(#[source] io::Error),
}

pub type SupervisorResult<T> = Result<T, SupervisorError>;
