//! Lifecycle supervision for the local memex API server.
//!
//! One long-lived background process is started, health-checked,
//! tracked through a durable `{pid, port}` record, and stopped on
//! request. Invocations are short-lived CLI processes; the record file
//! is the only shared state between them, and a health probe is always
//! the final word on whether a recorded instance is actually serving.

mod error;
mod launch;
mod lock;
mod ports;
pub(crate) mod probe;
mod store;

use std::{path::PathBuf, sync::Arc, time::Duration};

use nix::{
    errno::Errno,
    sys::signal::{Signal, kill},
    unistd::Pid,
};
use tokio::time::{Instant, sleep};

use crate::{config::Settings, paths};

pub use error::{SupervisorError, SupervisorResult};
pub use store::{FileStore, ServiceRecord, StateStore};

const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(200);
const KILL_REAP_GRACE: Duration = Duration::from_secs(2);

/// Transient address of a live server instance; derived from a record
/// that just passed a probe, never persisted.
#[derive(Debug, Clone)]
pub struct EndpointDescriptor {
    pub host: String,
    pub port: u16,
}

impl EndpointDescriptor {
    pub fn local(port: u16) -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    NotRunning,
    Running(ServiceRecord),
    /// The server answered its identity probe but the record vanished
    /// between the liveness check and the report.
    RunningUnrecorded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    Stopped,
    /// The recorded process was already gone; the stale record was
    /// cleaned up. Counts as success, not an error.
    StaleRecord,
    NotRunning,
}

pub struct Supervisor {
    store: Arc<dyn StateStore>,
    settings: Settings,
    lock_path: PathBuf,
    log_path: PathBuf,
}

impl Supervisor {
    pub fn new(settings: Settings) -> Self {
        Self {
            store: Arc::new(FileStore::new(paths::state_file_path())),
            settings,
            lock_path: paths::lock_file_path(),
            log_path: paths::server_log_path(),
        }
    }

    /// True only when a record exists and the recorded port answers the
    /// identity probe. Total and side-effect free.
    pub async fn is_alive(&self) -> bool {
        match self.store.load() {
            Some(record) => probe::probe_identity(record.port).await,
            None => false,
        }
    }

    /// Bring the server up if it is not already serving, and return the
    /// record of the live instance.
    ///
    /// The whole check-then-launch sequence runs under an advisory file
    /// lock, so concurrent invocations serialize instead of racing to a
    /// double launch. On any failure path the launched child (if any)
    /// is killed and no record is left behind.
    pub async fn ensure(&self) -> SupervisorResult<ServiceRecord> {
        let _guard = lock::StartLock::acquire(&self.lock_path).map_err(SupervisorError::Lock)?;

        if let Some(record) = self.store.load() {
            if probe::probe_identity(record.port).await {
                return Ok(record);
            }
            tracing::info!(
                pid = record.pid,
                port = record.port,
                "recorded server is not answering; starting a fresh instance"
            );
        }

        let port = ports::allocate_port(self.settings.preferred_port)
            .map_err(SupervisorError::PortAllocation)?;
        let child = launch::spawn_service(&self.settings.command, port, &self.log_path)?;

        if let Err(error) = probe::wait_until_ready(port, self.settings.ready_timeout).await {
            child.shutdown().await;
            return Err(error);
        }

        let record = ServiceRecord {
            pid: child.pid(),
            port,
        };
        if let Err(error) = self.store.save(&record) {
            child.shutdown().await;
            return Err(SupervisorError::Store(error));
        }

        // Detach: the server outlives this invocation.
        drop(child);
        Ok(record)
    }

    /// Terminate the recorded instance, gracefully first. The record is
    /// cleared on every path out of here.
    pub async fn stop(&self) -> SupervisorResult<StopOutcome> {
        let Some(record) = self.store.load() else {
            return Ok(StopOutcome::NotRunning);
        };

        let outcome = match send_signal(record.pid, Signal::SIGTERM)? {
            SignalDelivery::Gone => StopOutcome::StaleRecord,
            SignalDelivery::Delivered => {
                if !wait_for_process_exit(record.pid, self.settings.stop_grace).await {
                    tracing::warn!(
                        pid = record.pid,
                        "server ignored SIGTERM; escalating to SIGKILL"
                    );
                    let _ = send_signal(record.pid, Signal::SIGKILL)?;
                    wait_for_process_exit(record.pid, KILL_REAP_GRACE).await;
                }
                StopOutcome::Stopped
            }
        };

        self.store.clear().map_err(SupervisorError::Store)?;
        Ok(outcome)
    }

    /// `stop()` then `ensure()`; either half's error aborts the
    /// sequence unchanged.
    pub async fn restart(&self) -> SupervisorResult<ServiceRecord> {
        self.stop().await?;
        self.ensure().await
    }

    /// Read-only report of the current state; never mutates the record,
    /// even when it is stale.
    pub async fn status(&self) -> Status {
        if !self.is_alive().await {
            return Status::NotRunning;
        }
        match self.store.load() {
            Some(record) => Status::Running(record),
            None => Status::RunningUnrecorded,
        }
    }

    /// Live endpoint for the gateway, starting the server if needed.
    pub async fn endpoint(&self) -> SupervisorResult<EndpointDescriptor> {
        let record = self.ensure().await?;
        Ok(EndpointDescriptor::local(record.port))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SignalDelivery {
    Delivered,
    Gone,
}

fn send_signal(pid: u32, signal: Signal) -> SupervisorResult<SignalDelivery> {
    match kill(Pid::from_raw(pid as i32), signal) {
        Ok(()) => Ok(SignalDelivery::Delivered),
        Err(Errno::ESRCH) => Ok(SignalDelivery::Gone),
        Err(source) => Err(SupervisorError::Signal { pid, source }),
    }
}

fn process_exists(pid: u32) -> bool {
    kill(Pid::from_raw(pid as i32), None).is_ok()
}

async fn wait_for_process_exit(pid: u32, grace: Duration) -> bool {
    let deadline = Instant::now() + grace;
    loop {
        if !process_exists(pid) {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        sleep(EXIT_POLL_INTERVAL).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::path::Path;
    use std::process::Command as StdCommand;

    use crate::supervisor::probe::tests::{identity_body, spawn_stub_server};
    use crate::supervisor::store::MemoryStore;

    fn test_supervisor(dir: &Path, settings: Settings) -> (Supervisor, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let supervisor = Supervisor {
            store: store.clone(),
            settings,
            lock_path: dir.join("server.lock"),
            log_path: dir.join("server.log"),
        };
        (supervisor, store)
    }

    /// Spawn a real child and reap it from a background thread so that
    /// once signalled it disappears instead of lingering as a zombie.
    fn spawn_reaped(command: &str, args: &[&str]) -> u32 {
        let mut child = StdCommand::new(command)
            .args(args)
            .spawn()
            .expect("spawn test child");
        let pid = child.id();
        std::thread::spawn(move || {
            let _ = child.wait();
        });
        pid
    }

    #[tokio::test]
    async fn stop_without_a_record_is_a_no_op() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (supervisor, store) = test_supervisor(dir.path(), Settings::default());

        let outcome = supervisor.stop().await.expect("stop");
        assert_eq!(outcome, StopOutcome::NotRunning);
        assert_eq!(store.load(), None);
    }

    #[tokio::test]
    async fn stop_with_a_dead_pid_cleans_up_the_stale_record() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (supervisor, store) = test_supervisor(dir.path(), Settings::default());

        // A process that has already exited and been reaped.
        let pid = spawn_reaped("true", &[]);
        std::thread::sleep(Duration::from_millis(200));

        store
            .save(&ServiceRecord { pid, port: 50000 })
            .expect("seed record");

        let outcome = supervisor.stop().await.expect("stop");
        assert_eq!(outcome, StopOutcome::StaleRecord);
        assert_eq!(store.load(), None);
    }

    #[tokio::test]
    async fn stop_terminates_a_live_process_and_clears_the_record() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (supervisor, store) = test_supervisor(dir.path(), Settings::default());

        let pid = spawn_reaped("sleep", &["300"]);
        store
            .save(&ServiceRecord { pid, port: 50000 })
            .expect("seed record");

        let outcome = supervisor.stop().await.expect("stop");
        assert_eq!(outcome, StopOutcome::Stopped);
        assert_eq!(store.load(), None);
        assert!(!process_exists(pid));
    }

    #[tokio::test]
    async fn ensure_returns_the_existing_record_when_the_server_answers() {
        let dir = tempfile::tempdir().expect("tempdir");
        let port = spawn_stub_server("HTTP/1.1 200 OK", identity_body()).await;

        // A nonsense launcher proves no launch is even attempted.
        let settings = Settings {
            command: "memex-api-should-never-run".to_string(),
            ..Settings::default()
        };
        let (supervisor, store) = test_supervisor(dir.path(), settings);
        let record = ServiceRecord { pid: 12345, port };
        store.save(&record).expect("seed record");

        assert!(supervisor.is_alive().await);
        let first = supervisor.ensure().await.expect("first ensure");
        let second = supervisor.ensure().await.expect("second ensure");
        assert_eq!(first, record);
        assert_eq!(second, record);
        assert_eq!(store.load(), Some(record));
    }

    #[tokio::test]
    async fn restart_surfaces_the_start_half_error_unchanged() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (supervisor, store) = test_supervisor(
            dir.path(),
            Settings {
                command: "memex-api-definitely-not-installed".to_string(),
                ..Settings::default()
            },
        );

        // Nothing to stop, so restart reduces to the ensure half.
        let result = supervisor.restart().await;
        assert!(matches!(
            result,
            Err(SupervisorError::LauncherMissing { .. })
        ));
        assert_eq!(store.load(), None);
    }

    #[tokio::test]
    async fn ensure_with_a_stale_record_attempts_a_fresh_launch() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (supervisor, store) = test_supervisor(
            dir.path(),
            Settings {
                command: "memex-api-definitely-not-installed".to_string(),
                ..Settings::default()
            },
        );

        // Record a port nothing listens on: not alive, so ensure must
        // try to launch and surface the launcher error.
        let probe = std::net::TcpListener::bind(("127.0.0.1", 0)).expect("bind");
        let dead_port = probe.local_addr().expect("addr").port();
        drop(probe);
        store
            .save(&ServiceRecord {
                pid: 1,
                port: dead_port,
            })
            .expect("seed record");

        assert!(!supervisor.is_alive().await);
        let result = supervisor.ensure().await;
        assert!(matches!(
            result,
            Err(SupervisorError::LauncherMissing { .. })
        ));
    }

    #[tokio::test]
    async fn failed_readiness_leaves_no_record_and_no_process() {
        let dir = tempfile::tempdir().expect("tempdir");
        // `sleep` exits immediately on the server argv, so the probe
        // can never succeed; a tiny budget keeps the test fast.
        let (supervisor, store) = test_supervisor(
            dir.path(),
            Settings {
                command: "sleep".to_string(),
                ready_timeout: Duration::from_millis(10),
                ..Settings::default()
            },
        );

        let result = supervisor.ensure().await;
        assert!(matches!(result, Err(SupervisorError::ReadyTimeout { .. })));
        assert_eq!(store.load(), None);
    }

    #[tokio::test]
    async fn status_reports_not_running_without_a_record() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (supervisor, _store) = test_supervisor(dir.path(), Settings::default());
        assert_eq!(supervisor.status().await, Status::NotRunning);
    }

    #[tokio::test]
    async fn status_reports_the_record_of_a_live_server() {
        let dir = tempfile::tempdir().expect("tempdir");
        let port = spawn_stub_server("HTTP/1.1 200 OK", identity_body()).await;
        let (supervisor, store) = test_supervisor(dir.path(), Settings::default());

        let record = ServiceRecord { pid: 4242, port };
        store.save(&record).expect("seed record");

        assert_eq!(supervisor.status().await, Status::Running(record));
        // Read-only even though the record could be considered stale.
        assert_eq!(store.load(), Some(record));
    }

    #[test]
    fn endpoint_descriptor_builds_a_localhost_url() {
        let endpoint = EndpointDescriptor::local(50000);
        assert_eq!(endpoint.base_url(), "http://127.0.0.1:50000");
    }
}
