//! HTTP readiness and liveness probing for the supervised server.

use std::time::Duration;

use once_cell::sync::Lazy;
use serde::Deserialize;
use tokio::time::{Instant, sleep};

use super::error::{SupervisorError, SupervisorResult};

/// Body the health endpoint must return before the server counts as up.
pub(crate) const IDENTITY_MESSAGE: &str = "Memex API is running";

pub(crate) const POLL_INTERVAL: Duration = Duration::from_millis(300);
const PROBE_TIMEOUT: Duration = Duration::from_secs(1);

/// Shared short-timeout client so a hung network layer cannot stall a
/// poll loop beyond one interval.
static PROBE_CLIENT: Lazy<reqwest::Client> = Lazy::new(|| {
    reqwest::Client::builder()
        .timeout(PROBE_TIMEOUT)
        .build()
        .expect("probe http client")
});

#[derive(Debug, Deserialize)]
struct HealthBody {
    message: String,
}

/// One single-shot probe against `GET /` on the given port.
///
/// Total over all inputs: connection refused, timeouts, bad status,
/// unparseable bodies and identity mismatches all read as `false`.
pub(crate) async fn probe_identity(port: u16) -> bool {
    let url = format!("http://127.0.0.1:{port}/");
    let response = match PROBE_CLIENT.get(&url).send().await {
        Ok(response) if response.status().is_success() => response,
        _ => return false,
    };

    match response.json::<HealthBody>().await {
        Ok(body) => body.message == IDENTITY_MESSAGE,
        Err(_) => false,
    }
}

/// Poll until the server answers with its identity or the budget runs
/// out. Callers own cleanup of whatever process they launched; this
/// loop holds no resources across returns.
pub(crate) async fn wait_until_ready(port: u16, timeout: Duration) -> SupervisorResult<()> {
    let deadline = Instant::now() + timeout;
    loop {
        if probe_identity(port).await {
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(SupervisorError::ReadyTimeout { timeout });
        }
        sleep(POLL_INTERVAL).await;
    }
}
