//! HTTP transport.
//!
//! Everything above this layer talks to `Transport`, so the token state
//! machine and the dispatcher can be driven by a scripted transport in
//! tests. The real implementation is a blocking reqwest client with a
//! bounded timeout; a stalled call delays only the current pass.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::AUTHORIZATION;
use serde_json::Value;

use crate::error::{GridError, GridResult};

/// Status and body of a completed HTTP exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == 200
    }

    pub fn json(&self) -> GridResult<Value> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

/// POSTs JSON documents. A returned response may carry any status;
/// `Err` means no response was received.
pub trait Transport {
    fn post_json(
        &self,
        url: &str,
        body: &Value,
        authorization: Option<&str>,
    ) -> GridResult<HttpResponse>;
}

/// Blocking reqwest transport.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> GridResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(10)))
            .build()
            .map_err(|e| GridError::Transport(format!("client build failed: {}", e)))?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn post_json(
        &self,
        url: &str,
        body: &Value,
        authorization: Option<&str>,
    ) -> GridResult<HttpResponse> {
        let mut request = self.client.post(url).json(body);
        if let Some(auth) = authorization {
            request = request.header(AUTHORIZATION, auth);
        }

        let response = request
            .send()
            .map_err(|e| GridError::Transport(format!("POST {} failed: {}", url, e)))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .map_err(|e| GridError::Transport(format!("reading body from {} failed: {}", url, e)))?;

        log::debug!("HTTP_POST url={} status={} bytes={}", url, status, body.len());
        Ok(HttpResponse { status, body })
    }
}
