//! HTTP transport over reqwest

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method};
use tracing::{debug, warn};

use super::{OutboundRequest, Transport, TransportError, TransportResponse};
use crate::config::EndpointsConfig;
use crate::domain::HttpMethod;

/// Delivers queued items over HTTP
///
/// Relative target URLs are resolved against the configured base URL.
pub struct HttpTransport {
    http: Client,
    base_url: Option<String>,
    timeout: Duration,
}

impl HttpTransport {
    /// Create a transport with an optional base URL and a per-call timeout
    pub fn new(base_url: Option<String>, timeout: Duration) -> Result<Self, TransportError> {
        debug!(?base_url, ?timeout, "HttpTransport::new: called");
        let http = Client::builder().timeout(timeout).build().map_err(TransportError::Network)?;
        Ok(Self {
            http,
            base_url: base_url.map(|b| b.trim_end_matches('/').to_string()),
            timeout,
        })
    }

    /// Create a transport from endpoint configuration
    pub fn from_config(config: &EndpointsConfig) -> Result<Self, TransportError> {
        Self::new(Some(config.base_url.clone()), config.timeout())
    }

    /// Resolve a target URL against the base URL
    pub fn resolve_url(&self, url: &str) -> Result<String, TransportError> {
        if url.starts_with("http://") || url.starts_with("https://") {
            return Ok(url.to_string());
        }
        match &self.base_url {
            Some(base) => Ok(format!("{}/{}", base, url.trim_start_matches('/'))),
            None => Err(TransportError::InvalidRequest(format!(
                "relative URL '{}' without a base URL",
                url
            ))),
        }
    }
}

fn to_reqwest_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: OutboundRequest) -> Result<TransportResponse, TransportError> {
        let url = self.resolve_url(&request.url)?;
        debug!(method = %request.method, %url, "HttpTransport::send: called");

        let mut builder = self.http.request(to_reqwest_method(request.method), &url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout(self.timeout)
            } else if e.is_connect() {
                TransportError::Unreachable(e.to_string())
            } else {
                TransportError::Network(e)
            }
        })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            warn!(%url, status = status.as_u16(), "Endpoint rejected request");
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        debug!(%url, status = status.as_u16(), "HttpTransport::send: delivered");
        Ok(TransportResponse {
            status: status.as_u16(),
            body,
        })
    }
}
