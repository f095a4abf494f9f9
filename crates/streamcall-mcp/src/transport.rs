//! HTTP transport for the streamable MCP endpoint.
//!
//! A transport performs exactly one HTTP round-trip. Header policy, session
//! tracking and payload decoding live in the client.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::HeaderMap;
use reqwest::{Client, Method, StatusCode};
use std::time::Duration;
use tracing::debug;

use crate::error::{McpError, McpResult};

/// HTTP methods used against the MCP endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Post,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Post => "POST",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl From<HttpMethod> for Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Post => Method::POST,
            HttpMethod::Delete => Method::DELETE,
        }
    }
}

/// One outgoing request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub headers: HeaderMap,
    pub body: Option<String>,
}

/// A fully received response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

/// Transport trait for MCP communication.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one request and read the whole response.
    async fn send(&self, request: HttpRequest) -> McpResult<HttpResponse>;

    /// The endpoint this transport talks to.
    fn endpoint(&self) -> &str;
}

/// reqwest-backed transport.
pub struct ReqwestTransport {
    url: String,
    client: Client,
}

impl ReqwestTransport {
    /// Create a transport for `url`.
    ///
    /// `timeout` bounds each round-trip at the socket level; `None` waits
    /// indefinitely.
    pub fn new(url: impl Into<String>, timeout: Option<Duration>) -> McpResult<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| {
            McpError::connection_failed(format!("Failed to create HTTP client: {e}"))
        })?;

        Ok(Self {
            url: url.into(),
            client,
        })
    }

    /// Read the body chunk by chunk; SSE replies may stream for a while.
    async fn read_body(response: reqwest::Response) -> McpResult<String> {
        let mut stream = response.bytes_stream();
        let mut buffer = Vec::new();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| {
                if e.is_timeout() {
                    McpError::Timeout
                } else {
                    McpError::connection_failed(format!("Stream error: {e}"))
                }
            })?;
            buffer.extend_from_slice(&chunk);
        }

        Ok(body_text(buffer))
    }
}

/// Body bytes as text. Invalid UTF-8 is replaced, and logged.
fn body_text(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => {
            debug!(
                valid_up_to = e.utf8_error().valid_up_to(),
                "Response body is not valid UTF-8, replacing invalid bytes"
            );
            String::from_utf8_lossy(e.as_bytes()).into_owned()
        }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> McpResult<HttpResponse> {
        debug!(method = request.method.as_str(), url = %self.url, "Sending HTTP request");

        let mut builder = self
            .client
            .request(request.method.into(), &self.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                McpError::Timeout
            } else if e.is_connect() {
                McpError::connection_failed(format!("Connection failed: {e}"))
            } else {
                McpError::Http(e)
            }
        })?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = Self::read_body(response).await?;

        debug!(%status, bytes = body.len(), "Received HTTP response");

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }

    fn endpoint(&self) -> &str {
        &self.url
    }
}
