//! Model Context Protocol (MCP) client for the streamable HTTP transport.
//!
//! One [`McpClient`] owns one server session: it performs the
//! `initialize` handshake, invokes tools and tears the session down again.
//! Replies may arrive as a JSON body or as a Server-Sent-Events stream; both
//! are decoded into a single [`ResponsePayload`].
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐     ┌────────────┐     ┌───────────┐     ┌────────────┐
//! │  caller  │────▶│ McpClient  │────▶│ Transport │────▶│ MCP server │
//! │          │◀────│ (session)  │◀────│  (HTTP)   │◀────│            │
//! └──────────┘     └────────────┘     └───────────┘     └────────────┘
//!                        │ decode
//!                        ▼
//!                  ResponsePayload
//! ```
//!
//! # Example
//!
//! ```no_run
//! use streamcall_mcp::{ClientConfig, McpClient, ToolCallResult};
//!
//! # async fn example() -> streamcall_mcp::McpResult<()> {
//! let mut client = McpClient::new(ClientConfig::new("http://localhost:3000/mcp"))?;
//! client.initialize().await?;
//!
//! let mut args = serde_json::Map::new();
//! args.insert("message".into(), "hello".into());
//! let payload = client.call_tool("echo", args).await;
//!
//! client.close().await;
//!
//! if let Some(result) = ToolCallResult::from_payload(&payload?) {
//!     println!("{}", result.text());
//! }
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod error;
pub mod negotiate;
pub mod protocol;
mod session;
#[cfg(test)]
mod testing;
pub mod transport;

pub use client::{ClientState, InitializeAck, McpClient};
pub use config::{ClientConfig, DEFAULT_URL};
pub use error::{McpError, McpResult};
pub use negotiate::{ResponsePayload, SESSION_HEADER};
pub use protocol::{ToolCallResult, ToolContent, PROTOCOL_VERSION};
pub use session::SessionState;
pub use transport::{HttpMethod, HttpRequest, HttpResponse, ReqwestTransport, Transport};
