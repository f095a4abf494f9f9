//! In-memory transport that replays canned responses and records requests.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::StatusCode;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::error::{McpError, McpResult};
use crate::negotiate::SESSION_HEADER;
use crate::transport::{HttpRequest, HttpResponse, Transport};

#[derive(Default)]
pub(crate) struct ScriptedTransport {
    responses: Mutex<VecDeque<McpResult<HttpResponse>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&self, response: McpResult<HttpResponse>) -> &Self {
        self.responses.lock().unwrap().push_back(response);
        self
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Bodies of all recorded requests, parsed as JSON (`Null` when absent).
    pub(crate) fn bodies(&self) -> Vec<Value> {
        self.requests()
            .iter()
            .map(|r| {
                r.body
                    .as_deref()
                    .map(|b| serde_json::from_str(b).unwrap())
                    .unwrap_or(Value::Null)
            })
            .collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> McpResult<HttpResponse> {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(McpError::connection_failed("no scripted response")))
    }

    fn endpoint(&self) -> &str {
        "scripted://mcp"
    }
}

pub(crate) fn response(
    status: u16,
    content_type: Option<&str>,
    session_id: Option<&str>,
    body: &str,
) -> McpResult<HttpResponse> {
    let mut headers = HeaderMap::new();
    if let Some(content_type) = content_type {
        headers.insert(CONTENT_TYPE, HeaderValue::from_str(content_type).unwrap());
    }
    if let Some(id) = session_id {
        headers.insert(SESSION_HEADER, HeaderValue::from_str(id).unwrap());
    }
    Ok(HttpResponse {
        status: StatusCode::from_u16(status).unwrap(),
        headers,
        body: body.to_string(),
    })
}

pub(crate) fn json(session_id: Option<&str>, body: Value) -> McpResult<HttpResponse> {
    response(200, Some("application/json"), session_id, &body.to_string())
}

pub(crate) fn sse(session_id: Option<&str>, body: &str) -> McpResult<HttpResponse> {
    response(200, Some("text/event-stream"), session_id, body)
}

pub(crate) fn accepted() -> McpResult<HttpResponse> {
    response(202, None, None, "")
}
