//! MCP client implementation.

use futures::future::BoxFuture;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::ClientConfig;
use crate::error::{McpError, McpResult};
use crate::negotiate::{self, ResponsePayload};
use crate::protocol::{
    ClientCapabilities, InitializeParams, InitializeResult, JsonRpcNotification, JsonRpcRequest,
    ToolCallResult,
};
use crate::session::SessionState;
use crate::transport::{HttpMethod, HttpRequest, HttpResponse, ReqwestTransport, Transport};

const ACCEPT_VALUE: &str = "application/json, text/event-stream";

/// Lifecycle of a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClientState {
    #[default]
    Uninitialized,
    Initializing,
    Ready,
    Closed,
}

impl ClientState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientState::Uninitialized => "uninitialized",
            ClientState::Initializing => "initializing",
            ClientState::Ready => "ready",
            ClientState::Closed => "closed",
        }
    }
}

impl fmt::Display for ClientState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a successful handshake.
#[derive(Debug, Clone)]
pub struct InitializeAck {
    /// Decoded `initialize` response.
    pub payload: ResponsePayload,
    /// Typed `result`, when the server sent a well-formed one.
    pub result: Option<InitializeResult>,
    /// Session id held once the handshake completed.
    pub session_id: Option<String>,
}

/// Client for one MCP session over the streamable HTTP transport.
///
/// Every operation takes `&mut self`: one call is in flight at a time and
/// session updates never interleave.
pub struct McpClient {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    session: SessionState,
    state: ClientState,
    /// Request ID counter.
    next_id: u64,
    base_headers: HeaderMap,
    cancel: Option<CancellationToken>,
}

impl McpClient {
    /// Create a client talking to `config.url` over HTTP.
    pub fn new(config: ClientConfig) -> McpResult<Self> {
        config.validate()?;
        let transport = ReqwestTransport::new(config.url.clone(), config.timeout())?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Create a client on top of an existing transport.
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> McpResult<Self> {
        let mut base_headers = HeaderMap::new();
        for (key, value) in &config.headers {
            let name = HeaderName::from_bytes(key.as_bytes())
                .map_err(|e| McpError::config(format!("Invalid header name {key:?}: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| McpError::config(format!("Invalid value for header {key}: {e}")))?;
            base_headers.insert(name, value);
        }
        base_headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_VALUE));

        Ok(Self {
            config,
            transport,
            session: SessionState::new(),
            state: ClientState::Uninitialized,
            next_id: 1,
            base_headers,
            cancel: None,
        })
    }

    /// Abort in-flight round-trips once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ClientState {
        self.state
    }

    /// Session id currently held, if any.
    pub fn session_id(&self) -> Option<&str> {
        self.session.id()
    }

    /// The endpoint this client talks to.
    pub fn endpoint(&self) -> &str {
        self.transport.endpoint()
    }

    fn next_request_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn invalid_state(&self, operation: &'static str) -> McpError {
        McpError::InvalidState {
            operation,
            state: self.state.as_str(),
        }
    }

    /// Perform the two-step handshake.
    ///
    /// Sends `initialize`, then `notifications/initialized`, and enters
    /// [`ClientState::Ready`]. A transport error or failing status on either
    /// request is reported as [`McpError::Handshake`] and leaves the client in
    /// [`ClientState::Initializing`]; call [`close`](Self::close) afterwards.
    /// An `initialize` body that does not decode is kept as
    /// [`ResponsePayload::RawText`] (or [`ResponsePayload::EmptyBody`]).
    pub async fn initialize(&mut self) -> McpResult<InitializeAck> {
        if self.state != ClientState::Uninitialized {
            return Err(self.invalid_state("initialize"));
        }
        self.state = ClientState::Initializing;
        info!(url = %self.endpoint(), "Initializing MCP session");

        let params = InitializeParams {
            protocol_version: self.config.protocol_version.clone(),
            capabilities: ClientCapabilities::default(),
            client_info: self.config.client_info.clone(),
        };
        let request = JsonRpcRequest::initialize(self.next_request_id(), &params)?;
        let body = serde_json::to_string(&request)?;
        let response = self
            .exchange(HttpMethod::Post, Some(body))
            .await
            .map_err(McpError::handshake)?;

        // Only a failing status aborts the handshake. An unusable body still
        // gets the notification and is kept as text.
        let decoded = negotiate::decode(response.status, &response.headers, &response.body);
        let payload = match decoded {
            Ok(payload) => payload,
            Err(e @ McpError::HttpStatus { .. }) => return Err(McpError::handshake(e)),
            Err(e) => {
                warn!(error = %e, "Unusable initialize response, continuing handshake");
                if response.body.trim().is_empty() {
                    ResponsePayload::EmptyBody
                } else {
                    ResponsePayload::RawText(response.body)
                }
            }
        };

        let body = serde_json::to_string(&JsonRpcNotification::initialized())?;
        let response = self
            .exchange(HttpMethod::Post, Some(body))
            .await
            .map_err(McpError::handshake)?;
        match negotiate::decode(response.status, &response.headers, &response.body) {
            Err(e @ McpError::HttpStatus { .. }) => return Err(McpError::handshake(e)),
            Err(e) => debug!(error = %e, "Ignoring undecodable initialized reply"),
            Ok(_) => {}
        }

        let result = payload
            .result()
            .and_then(|r| serde_json::from_value::<InitializeResult>(r.clone()).ok());
        if let Some(ref result) = result {
            debug!(
                protocol_version = %result.protocol_version,
                server_name = %result.server_info.name,
                "MCP server initialized"
            );
        }
        if !self.session.is_active() {
            debug!("Server issued no session id during handshake");
        }

        self.state = ClientState::Ready;
        info!(session_id = ?self.session.id(), "MCP session ready");

        Ok(InitializeAck {
            payload,
            result,
            session_id: self.session.id().map(str::to_string),
        })
    }

    /// Call a tool and return the decoded payload as-is.
    ///
    /// A payload without `result.content` is still a successful call; use
    /// [`ToolCallResult::from_payload`] to interpret it.
    pub async fn call_tool(
        &mut self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> McpResult<ResponsePayload> {
        if self.state != ClientState::Ready {
            return Err(self.invalid_state("call tool"));
        }

        let id = self.next_request_id();
        debug!(tool = name, id, "Calling MCP tool");

        let request = JsonRpcRequest::call_tool(id, name, arguments)?;
        let payload = self.post(&request).await?;

        if ToolCallResult::from_payload(&payload).is_none() {
            debug!(tool = name, "Tool response carries no result.content");
        }
        Ok(payload)
    }

    /// Tear the session down. Never fails.
    ///
    /// Without a held session id no request is sent. Otherwise a `DELETE`
    /// carrying the session header is issued; failures are logged. The
    /// `DELETE` ignores the cancellation token and is bounded by the
    /// configured timeout only. The session id is cleared and the client is
    /// [`ClientState::Closed`] afterwards in every case.
    pub async fn close(&mut self) {
        let Some(session_id) = self.session.id().map(str::to_string) else {
            debug!(state = %self.state, "No MCP session to close");
            self.state = ClientState::Closed;
            return;
        };

        let request = self.build_request(HttpMethod::Delete, None);
        let outcome = match self.transport.send(request).await {
            Ok(response) => {
                negotiate::decode(response.status, &response.headers, &response.body).map(|_| ())
            }
            Err(e) => Err(e),
        };
        match outcome {
            Ok(()) => info!(session_id = %session_id, "MCP session closed"),
            Err(e) => {
                let err = McpError::teardown(e);
                error!(session_id = %session_id, error = %err, "Teardown failed");
            }
        }

        self.session.clear();
        self.state = ClientState::Closed;
    }

    /// Run `f` inside an initialized session, closing it on every exit path.
    ///
    /// ```no_run
    /// # use streamcall_mcp::{ClientConfig, McpClient};
    /// # async fn example() -> streamcall_mcp::McpResult<()> {
    /// let mut client = McpClient::new(ClientConfig::default())?;
    /// let _payload = client
    ///     .scoped(|client| {
    ///         Box::pin(async move { client.call_tool("echo", Default::default()).await })
    ///     })
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn scoped<T, F>(&mut self, f: F) -> McpResult<T>
    where
        F: for<'a> FnOnce(&'a mut McpClient) -> BoxFuture<'a, McpResult<T>>,
    {
        match self.initialize().await {
            Ok(_) => {}
            Err(e @ McpError::InvalidState { .. }) => return Err(e),
            Err(e) => {
                self.close().await;
                return Err(e);
            }
        }

        let result = f(self).await;
        self.close().await;
        result
    }

    async fn post<T: Serialize>(&mut self, envelope: &T) -> McpResult<ResponsePayload> {
        let body = serde_json::to_string(envelope)?;
        self.round_trip(HttpMethod::Post, Some(body)).await
    }

    fn build_request(&self, method: HttpMethod, body: Option<String>) -> HttpRequest {
        let mut headers = self.base_headers.clone();
        if body.is_some() {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        HttpRequest {
            method,
            headers: self.session.attach_headers(headers),
            body,
        }
    }

    async fn round_trip(
        &mut self,
        method: HttpMethod,
        body: Option<String>,
    ) -> McpResult<ResponsePayload> {
        let response = self.exchange(method, body).await?;
        negotiate::decode(response.status, &response.headers, &response.body)
    }

    /// One request/response exchange, updating the session from the reply.
    async fn exchange(
        &mut self,
        method: HttpMethod,
        body: Option<String>,
    ) -> McpResult<HttpResponse> {
        let request = self.build_request(method, body);
        let response = self.dispatch(request).await?;

        // Taken from every response, failing statuses included.
        if let Some(id) = negotiate::session_id(&response.headers) {
            self.session.update(id);
        }
        Ok(response)
    }

    async fn dispatch(&self, request: HttpRequest) -> McpResult<HttpResponse> {
        let send = self.transport.send(request);
        match &self.cancel {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => Err(McpError::Cancelled),
                response = send => response,
            },
            None => send.await,
        }
    }
}

impl Drop for McpClient {
    fn drop(&mut self) {
        // Teardown is async and cannot run here.
        if let Some(id) = self.session.id() {
            warn!(session_id = %id, "MCP client dropped with an open session; call close() first");
        }
    }
}
