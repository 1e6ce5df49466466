//! HTTP client for the supervised server's API: the only sanctioned
//! path from caller code to the service once it is up. Each domain
//! operation is exactly one HTTP call against a live endpoint.

mod error;
mod types;

use std::time::Duration;

use futures_util::{Stream, StreamExt};

use crate::supervisor::EndpointDescriptor;

pub use error::{GatewayError, GatewayResult};
pub use types::{CortexCreated, CortexList, CortexSelector, CortexSummary, StoreInitReport};

use types::{CreateCortexRequest, QueryRequest};

/// Generous budget reflecting potentially slow backend work (indexing,
/// query synthesis). Retry and backoff are the caller's business.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

pub struct GatewayClient {
    http: reqwest::Client,
    base_url: String,
}

impl GatewayClient {
    pub fn new(endpoint: &EndpointDescriptor) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("gateway http client");
        Self {
            http,
            base_url: endpoint.base_url(),
        }
    }

    pub async fn list_cortices(&self) -> GatewayResult<CortexList> {
        let response = self
            .http
            .get(format!("{}/cortex/list", self.base_url))
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    pub async fn get_cortex(&self, selector: &CortexSelector) -> GatewayResult<serde_json::Value> {
        let response = self
            .http
            .get(format!("{}/cortex", self.base_url))
            .query(&[selector.query_pair()])
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    pub async fn create_cortex(&self, path: &str, name: &str) -> GatewayResult<CortexCreated> {
        let response = self
            .http
            .post(format!("{}/cortex/create", self.base_url))
            .json(&CreateCortexRequest { path, name })
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    pub async fn index_cortex(
        &self,
        selector: &CortexSelector,
    ) -> GatewayResult<serde_json::Value> {
        let response = self
            .http
            .post(format!("{}/cortex/index", self.base_url))
            .query(&[selector.query_pair()])
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    pub async fn query(&self, query: &str) -> GatewayResult<serde_json::Value> {
        let response = self
            .http
            .post(format!("{}/query/query", self.base_url))
            .json(&QueryRequest { query })
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    /// Open one long-lived request and expose the response body as a
    /// lazy, forward-only sequence of text chunks. The sequence ends
    /// when the server closes the stream or errors; dropping it is the
    /// only cancellation.
    pub async fn query_stream(
        &self,
        query: &str,
    ) -> GatewayResult<impl Stream<Item = GatewayResult<String>> + use<>> {
        let response = self
            .http
            .post(format!("{}/query/query_stream", self.base_url))
            .json(&QueryRequest { query })
            .send()
            .await?;
        let response = check(response).await?;

        Ok(response.bytes_stream().map(|chunk| match chunk {
            Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
            Err(error) => Err(GatewayError::Transport(error)),
        }))
    }

    pub async fn system_init(&self) -> GatewayResult<StoreInitReport> {
        let response = self
            .http
            .post(format!("{}/system/init", self.base_url))
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }
}

/// Normalize any non-success response into the application-level error
/// kind, preserving the body text for the message.
async fn check(response: reqwest::Response) -> GatewayResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(GatewayError::Api { status, body })
}
