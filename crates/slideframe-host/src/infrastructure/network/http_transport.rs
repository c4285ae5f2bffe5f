//! `reqwest`-backed [`HttpTransport`].
//!
//! One `reqwest::Client` (and therefore one connection pool) is shared by all
//! deliveries.  The per-request timeout covers connect, send and the wait
//! for the response headers; the body is never read.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};

use super::dispatcher::{DispatchRequest, HttpTransport, TransportError};

/// HTTP/1.1 transport for remote-frame requests.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Builds a transport whose requests give up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns the `reqwest` error if the client cannot be constructed.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;
        Ok(Self { client })
    }

    /// Full URL for `request`, without the query string.
    fn url(request: &DispatchRequest) -> Result<Url, TransportError> {
        let raw = format!("{}{}", request.device.base_url(), request.path);
        Url::parse(&raw).map_err(|e| TransportError::InvalidRequest(format!("{raw}: {e}")))
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: &DispatchRequest) -> Result<u16, TransportError> {
        let url = Self::url(request)?;
        let response = self
            .client
            .get(url)
            .query(&request.query)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        Ok(response.status().as_u16())
    }
}

fn map_reqwest_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else if e.is_connect() {
        TransportError::Connect(e.to_string())
    } else if e.is_builder() {
        TransportError::InvalidRequest(e.to_string())
    } else {
        TransportError::Network(e.to_string())
    }
}
