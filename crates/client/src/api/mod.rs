//! RepeaterBook export API wire layer.
//!
//! ### Endpoints
//!
//! - **North America**: `GET {base}/api/export.php`
//! - **Rest of world**: `GET {base}/api/exportROW.php`
//! - **Parameters**: repeated query parameters, one pair per value.
//! - **Identification**: the service asks for `User-Agent: {app name} <{email}>`.
//! - **Body**: `{"count": n, "results": [...]}` or `{"status": "error", "message": ...}`.

pub mod error;
pub mod response;

pub use error::TransportError;
pub use response::{
    CommonFields, ExportPage, MAX_COUNT, NorthAmericaRecord, RawRecord, RawValue, WorldRecord, parse_envelope,
};

use std::time::{Duration, Instant};

use bytes::Bytes;
use reqwest::header;
use url::Url;

use rptrbook_core::{AppConfig, Endpoint, Error};

/// Fetches raw response bodies.
///
/// The seam between the fetcher and the network; tests substitute an
/// in-process implementation.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// GET `url` and return the body of a successful response.
    async fn get(&self, url: &Url) -> Result<Bytes, TransportError>;
}

/// reqwest-backed transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    user_agent: String,
}

impl HttpTransport {
    pub fn new(user_agent: impl Into<String>, timeout: Duration) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Setup(e.to_string()))?;
        Ok(Self { http, user_agent: user_agent.into() })
    }

    /// Build a transport identified and timed out per `config`.
    pub fn from_config(config: &AppConfig) -> Result<Self, TransportError> {
        Self::new(config.user_agent(), config.timeout())
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &Url) -> Result<Bytes, TransportError> {
        let start = Instant::now();
        tracing::debug!(%url, "requesting export");

        let response = self
            .http
            .get(url.clone())
            .header(header::USER_AGENT, &self.user_agent)
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            return Err(TransportError::HttpError { status: status.as_u16() });
        }

        let bytes = response.bytes().await?;
        tracing::debug!(
            %url,
            %status,
            bytes = bytes.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "export received"
        );
        Ok(bytes)
    }
}

/// Full request URL for `endpoint` under `base` with repeated `params`.
///
/// # Errors
///
/// Returns `Error::InvalidQuery` if `base` cannot be joined with the endpoint path.
pub fn build_url(base: &Url, endpoint: Endpoint, params: &[(&str, String)]) -> Result<Url, Error> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }

    let mut url = base
        .join(endpoint.path())
        .map_err(|e| Error::InvalidQuery(format!("cannot build URL for {endpoint}: {e}")))?;
    if !params.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in params {
            pairs.append_pair(key, value);
        }
    }
    Ok(url)
}
