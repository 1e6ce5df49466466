use thiserror::Error;

/// Failures on the HTTP path to the memex service, split into the two
/// levels callers care about: could the service be reached at all, and
/// if so, did it report a failure.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Connect, timeout, or body-decoding failures; the service never
    /// produced a usable answer.
    #[error("request to the memex service failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// The service answered with a non-success status.
    #[error("memex service returned {status}: {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },
}

pub type GatewayResult<T> = Result<T, GatewayError>;
