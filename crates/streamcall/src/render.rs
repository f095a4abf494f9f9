//! Caller-facing wrapper: one tool call in its own session, rendered as text.
//!
//! Failures never escape as errors here; they degrade into a printable
//! `Error: ...` line.

use anyhow::{bail, Context};
use serde_json::{Map, Value};
use streamcall_mcp::{ClientConfig, McpClient, ResponsePayload, ToolCallResult};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

/// Rendered when the tool reply has no `result.content`.
pub const NO_RESULT: &str = "No result from tool";

/// How a tool reply is printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Content texts joined with spaces.
    Text,
    /// The decoded payload as pretty JSON.
    Raw,
}

/// Parse `--args` into a JSON object.
pub fn parse_arguments(raw: &str) -> anyhow::Result<Map<String, Value>> {
    let value: Value = serde_json::from_str(raw).context("Tool arguments must be valid JSON")?;
    match value {
        Value::Object(map) => Ok(map),
        other => bail!("Tool arguments must be a JSON object, got {other}"),
    }
}

/// Initialize a session, call `tool`, close the session and render the reply.
pub async fn run_tool(
    config: ClientConfig,
    tool: &str,
    arguments: Map<String, Value>,
    format: OutputFormat,
    cancel: Option<CancellationToken>,
) -> String {
    let mut client = match McpClient::new(config) {
        Ok(client) => client,
        Err(e) => return format!("Error: {e}"),
    };
    if let Some(token) = cancel {
        client = client.with_cancellation(token);
    }

    debug!(tool, url = %client.endpoint(), "Calling tool");
    let tool = tool.to_string();
    let result = client
        .scoped(move |client| Box::pin(async move { client.call_tool(&tool, arguments).await }))
        .await;

    match result {
        Ok(payload) => render(&payload, format),
        Err(e) => {
            error!(error = %e, "MCP error");
            format!("Error: {e}")
        }
    }
}

/// Render a decoded tool reply.
pub fn render(payload: &ResponsePayload, format: OutputFormat) -> String {
    match format {
        OutputFormat::Raw => match payload {
            ResponsePayload::JsonDocument(value) => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            }
            ResponsePayload::RawText(text) => text.clone(),
            ResponsePayload::EmptyBody => String::new(),
        },
        OutputFormat::Text => {
            if let Some(result) = ToolCallResult::from_payload(payload) {
                if result.is_error {
                    warn!("Tool reported an error result");
                }
                return result.text();
            }
            if let Some(err) = payload.rpc_error() {
                return format!("Error: {} ({})", err.message, err.code);
            }
            warn!(?payload, "No result returned by tool");
            NO_RESULT.to_string()
        }
    }
}
