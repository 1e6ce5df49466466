use std::{io, path::Path, process::Stdio};

use tokio::process::{Child, Command};

use super::error::{SupervisorError, SupervisorResult};
use crate::logging;

/// Handle to a freshly spawned server process, live until it either
/// passes its readiness probe (and is detached) or is shut down.
#[derive(Debug)]
pub(crate) struct ServiceChild {
    child: Child,
    pid: u32,
}

impl ServiceChild {
    pub(crate) fn pid(&self) -> u32 {
        self.pid
    }

    /// Forcibly terminate and reap the child. Used on every failed
    /// launch path so no orphan survives an `ensure` attempt.
    pub(crate) async fn shutdown(mut self) {
        if let Err(error) = self.child.kill().await {
            tracing::warn!(%error, pid = self.pid, "failed to kill launched server");
        }
    }
}

/// Spawn `<command> --host 127.0.0.1 --port <port>` with both output
/// streams appended to the shared log sink.
pub(crate) fn spawn_service(
    command: &str,
    port: u16,
    log_path: &Path,
) -> SupervisorResult<ServiceChild> {
    let log_sink_error = |source: io::Error| SupervisorError::LogSink {
        path: log_path.to_path_buf(),
        source,
    };
    let mut sink = logging::open_log_sink(log_path).map_err(log_sink_error)?;
    if let Err(error) = logging::append_run_marker(&mut sink, command, port) {
        tracing::warn!(%error, "failed to write run marker to server log");
    }
    let stderr_sink = sink.try_clone().map_err(log_sink_error)?;

    let mut launcher = Command::new(command);
    launcher
        .arg("--host")
        .arg("127.0.0.1")
        .arg("--port")
        .arg(port.to_string())
        .stdin(Stdio::null())
        .stdout(Stdio::from(sink))
        .stderr(Stdio::from(stderr_sink));

    let child = launcher.spawn().map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            SupervisorError::LauncherMissing {
                command: command.to_string(),
            }
        } else {
            SupervisorError::Spawn {
                command: command.to_string(),
                source,
            }
        }
    })?;

    let pid = child.id().ok_or_else(|| SupervisorError::Spawn {
        command: command.to_string(),
        source: io::Error::other("process exited before its pid was observed"),
    })?;

    Ok(ServiceChild { child, pid })
}
