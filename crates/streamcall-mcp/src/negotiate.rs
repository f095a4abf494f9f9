//! Response decoding for the streamable HTTP transport.
//!
//! The same logical reply may come back as a plain JSON body or as an SSE
//! stream. [`decode`] collapses both (plus the no-body and plain-text cases)
//! into one [`ResponsePayload`].

use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::StatusCode;
use serde_json::Value;

use crate::error::{McpError, McpResult};
use crate::protocol::JsonRpcError;

/// Header carrying the server-assigned session id.
pub const SESSION_HEADER: &str = "mcp-session-id";

const JSON_CONTENT_TYPE: &str = "application/json";
const SSE_CONTENT_TYPE: &str = "text/event-stream";

/// Logical result of decoding an HTTP response.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponsePayload {
    /// A JSON document, from a JSON body or the selected SSE event.
    JsonDocument(Value),
    /// Accepted with no payload.
    EmptyBody,
    /// Any other non-empty body.
    RawText(String),
}

impl ResponsePayload {
    /// The JSON document, if any.
    pub fn json(&self) -> Option<&Value> {
        match self {
            Self::JsonDocument(value) => Some(value),
            _ => None,
        }
    }

    /// The JSON-RPC `result` field, if present.
    pub fn result(&self) -> Option<&Value> {
        self.json()?.get("result")
    }

    /// The JSON-RPC `error` object, if present and well-formed.
    pub fn rpc_error(&self) -> Option<JsonRpcError> {
        let error = self.json()?.get("error")?;
        serde_json::from_value(error.clone()).ok()
    }

    /// Whether the payload carries nothing.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::EmptyBody)
    }
}

/// Extract the session id from response headers.
///
/// Header lookup is case-insensitive. Values that are not valid text are
/// ignored.
pub fn session_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(SESSION_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

/// Decode an HTTP response into a [`ResponsePayload`].
pub fn decode(status: StatusCode, headers: &HeaderMap, body: &str) -> McpResult<ResponsePayload> {
    if status == StatusCode::ACCEPTED || status == StatusCode::NO_CONTENT {
        return Ok(ResponsePayload::EmptyBody);
    }

    if !status.is_success() {
        return Err(McpError::HttpStatus {
            status,
            body: body.to_string(),
        });
    }

    let content_type = match headers.get(CONTENT_TYPE) {
        Some(value) => value
            .to_str()
            .map_err(|_| McpError::UnsupportedContentType(format!("{value:?}")))?
            .to_ascii_lowercase(),
        None => String::new(),
    };

    if content_type.contains(JSON_CONTENT_TYPE) {
        decode_json(body)
    } else if content_type.contains(SSE_CONTENT_TYPE) {
        decode_sse(body)
    } else if body.is_empty() {
        Ok(ResponsePayload::EmptyBody)
    } else {
        Ok(ResponsePayload::RawText(body.to_string()))
    }
}

fn decode_json(body: &str) -> McpResult<ResponsePayload> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Err(McpError::MalformedJson {
            body: body.to_string(),
        });
    }
    serde_json::from_str(trimmed)
        .map(ResponsePayload::JsonDocument)
        .map_err(|_| McpError::MalformedJson {
            body: body.to_string(),
        })
}

fn decode_sse(body: &str) -> McpResult<ResponsePayload> {
    let raw = last_sse_data(body).ok_or(McpError::EmptySseStream)?;
    serde_json::from_str(raw)
        .map(ResponsePayload::JsonDocument)
        .map_err(|_| McpError::MalformedSse {
            raw: raw.to_string(),
        })
}

/// Select the last non-empty `data:` value of an SSE body.
///
/// Accepts frames separated by blank lines as well as back-to-back `data:`
/// lines. `event:`, `id:` and comment lines are skipped.
pub fn last_sse_data(body: &str) -> Option<&str> {
    body.lines()
        .rev()
        .filter_map(|line| line.trim_start().strip_prefix("data:"))
        .map(str::trim)
        .find(|data| !data.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderName, HeaderValue};
    use serde_json::json;

    fn headers(content_type: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_str(content_type).unwrap());
        headers
    }

    #[test]
    fn test_accepted_and_no_content_are_empty() {
        for status in [StatusCode::ACCEPTED, StatusCode::NO_CONTENT] {
            for content_type in ["application/json", "text/event-stream", "text/plain"] {
                let payload = decode(status, &headers(content_type), "garbage").unwrap();
                assert_eq!(payload, ResponsePayload::EmptyBody);
            }
        }
    }

    #[test]
    fn test_non_success_status_fails_before_decoding() {
        let err = decode(
            StatusCode::INTERNAL_SERVER_ERROR,
            &headers("application/json"),
            "not json",
        )
        .unwrap_err();
        match err {
            McpError::HttpStatus { status, body } => {
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
                assert_eq!(body, "not json");
            }
            other => panic!("Expected HttpStatus, got {other:?}"),
        }
    }

    #[test]
    fn test_json_body() {
        let body = r#"{"jsonrpc":"2.0","id":1,"result":{"nested":[1,2,{"a":null}]}}"#;
        let payload = decode(StatusCode::OK, &headers("application/json"), body).unwrap();
        assert_eq!(
            payload,
            ResponsePayload::JsonDocument(serde_json::from_str(body).unwrap())
        );
    }

    #[test]
    fn test_content_type_is_case_insensitive_substring() {
        let payload = decode(
            StatusCode::OK,
            &headers("Application/JSON; charset=utf-8"),
            r#"{"ok":true}"#,
        )
        .unwrap();
        assert_eq!(payload, ResponsePayload::JsonDocument(json!({"ok": true})));
    }

    #[test]
    fn test_empty_json_body_is_malformed() {
        let err = decode(StatusCode::OK, &headers("application/json"), "  \n").unwrap_err();
        assert!(matches!(err, McpError::MalformedJson { .. }));
    }

    #[test]
    fn test_invalid_json_body_is_malformed() {
        let err = decode(StatusCode::OK, &headers("application/json"), "{oops").unwrap_err();
        match err {
            McpError::MalformedJson { body } => assert_eq!(body, "{oops"),
            other => panic!("Expected MalformedJson, got {other:?}"),
        }
    }

    #[test]
    fn test_sse_selects_last_block() {
        let body = "data: {\"result\":{\"content\":[{\"text\":\"a\"}]}}\n\n\
                    data: {\"result\":{\"content\":[{\"text\":\"b\"}]}}\n\n";
        let payload = decode(StatusCode::OK, &headers("text/event-stream"), body).unwrap();
        assert_eq!(payload.result().unwrap()["content"][0]["text"], json!("b"));
    }

    #[test]
    fn test_sse_single_line_frame() {
        let body = "event: message\ndata: {\"id\":1}\n";
        let payload = decode(StatusCode::OK, &headers("text/event-stream"), body).unwrap();
        assert_eq!(payload, ResponsePayload::JsonDocument(json!({"id": 1})));
    }

    #[test]
    fn test_sse_back_to_back_lines_and_crlf() {
        let body = ": keepalive\r\ndata: {\"progress\":1}\r\ndata:{\"done\":true}\r\ndata:\r\n";
        assert_eq!(last_sse_data(body), Some("{\"done\":true}"));
    }

    #[test]
    fn test_sse_without_data_is_empty_stream() {
        let body = "event: ping\n\n: comment\n\n";
        let err = decode(StatusCode::OK, &headers("text/event-stream"), body).unwrap_err();
        assert!(matches!(err, McpError::EmptySseStream));
    }

    #[test]
    fn test_sse_invalid_data_is_malformed() {
        let body = "data: {\"ok\":true}\n\ndata: not-json\n\n";
        let err = decode(StatusCode::OK, &headers("text/event-stream"), body).unwrap_err();
        match err {
            McpError::MalformedSse { raw } => assert_eq!(raw, "not-json"),
            other => panic!("Expected MalformedSse, got {other:?}"),
        }
    }

    #[test]
    fn test_plain_text_body() {
        let payload = decode(StatusCode::OK, &headers("text/plain"), "pong").unwrap();
        assert_eq!(payload, ResponsePayload::RawText("pong".to_string()));
    }

    #[test]
    fn test_missing_content_type() {
        let payload = decode(StatusCode::OK, &HeaderMap::new(), "").unwrap();
        assert_eq!(payload, ResponsePayload::EmptyBody);
        let payload = decode(StatusCode::OK, &HeaderMap::new(), "hello").unwrap();
        assert_eq!(payload, ResponsePayload::RawText("hello".to_string()));
    }

    #[test]
    fn test_unreadable_content_type() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_bytes(b"text/\xffjson").unwrap());
        let err = decode(StatusCode::OK, &headers, "{}").unwrap_err();
        assert!(matches!(err, McpError::UnsupportedContentType(_)));
    }

    #[test]
    fn test_session_id_lookup_is_case_insensitive() {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_bytes(b"Mcp-Session-Id").unwrap(),
            HeaderValue::from_static("abc123"),
        );
        assert_eq!(session_id(&headers), Some("abc123".to_string()));
        assert_eq!(session_id(&HeaderMap::new()), None);
    }

    #[test]
    fn test_payload_accessors() {
        let payload = ResponsePayload::JsonDocument(json!({
            "jsonrpc": "2.0",
            "id": 3,
            "error": {"code": -32601, "message": "Method not found"}
        }));
        assert!(payload.result().is_none());
        let error = payload.rpc_error().unwrap();
        assert_eq!(error.code, -32601);
        assert_eq!(error.message, "Method not found");
        assert!(ResponsePayload::EmptyBody.is_empty());
        assert!(ResponsePayload::RawText("x".into()).json().is_none());
    }
}
