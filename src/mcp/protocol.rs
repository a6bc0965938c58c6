/// JSON-RPC message structures for the tool protocol
///
/// This module defines the JSON-RPC 2.0 message format clients use to talk to
/// the habit tracker server, plus the tool-call envelope carried inside it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Protocol version we support
pub const MCP_VERSION: &str = "2024-11-05";

/// JSON-RPC 2.0 request message
///
/// A request without an `id` is a notification and gets no response.
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    /// JSON-RPC version (always "2.0")
    pub jsonrpc: String,
    /// Identifier echoed back in the response
    #[serde(default)]
    pub id: Option<Value>,
    /// The method to call (e.g., "tools/call")
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

/// JSON-RPC 2.0 response message
///
/// Contains either a successful result or an error.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// JSON-RPC version (always "2.0")
    pub jsonrpc: String,
    /// Request ID that we're responding to
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC error information
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Parameters of a `tools/call` request
#[derive(Debug, Deserialize)]
pub struct ToolCallParams {
    /// Name of the tool to call (e.g., "habit_create")
    pub name: String,
    /// Arguments, deserialized into the tool's own parameter type
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

/// Result of running a tool
///
/// Tool failures are reported here with `is_error` set rather than as
/// JSON-RPC errors.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallResult {
    pub content: Vec<ToolContent>,
    #[serde(default)]
    pub is_error: bool,
}

/// Content returned by a tool
#[derive(Debug, Serialize, Deserialize)]
pub struct ToolContent {
    /// Type of content (always "text" here)
    #[serde(rename = "type")]
    pub content_type: String,
    pub text: String,
}

/// A tool the server offers
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON schema generated from the tool's parameter type
    pub input_schema: Value,
}

#[derive(Debug, Serialize)]
pub struct ServerCapabilities {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<ToolsCapability>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolsCapability {
    pub list_changed: bool,
}

/// Parameters of the `initialize` request
///
/// Only used for logging, so everything is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InitializeParams {
    pub protocol_version: Option<String>,
    pub client_info: Option<ClientInfo>,
}

#[derive(Debug, Deserialize)]
pub struct ClientInfo {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    pub protocol_version: String,
    pub capabilities: ServerCapabilities,
    pub server_info: ServerInfo,
}

#[derive(Debug, Serialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

// JSON-RPC error codes (standard codes)
pub mod error_codes {
    /// Invalid JSON was received by the server
    pub const PARSE_ERROR: i32 = -32700;
    /// The JSON sent is not a valid Request object
    pub const INVALID_REQUEST: i32 = -32600;
    /// The requested method doesn't exist
    pub const METHOD_NOT_FOUND: i32 = -32601;
    /// Method exists but parameters are wrong
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Value, code: i32, message: String, data: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(JsonRpcError { code, message, data }),
        }
    }
}

impl ToolCallResult {
    /// A successful tool result with text content
    pub fn success(text: String) -> Self {
        Self {
            content: vec![ToolContent {
                content_type: "text".to_string(),
                text,
            }],
            is_error: false,
        }
    }

    pub fn error(error_message: String) -> Self {
        Self {
            content: vec![ToolContent {
                content_type: "text".to_string(),
                text: format!("Error: {}", error_message),
            }],
            is_error: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_without_id_is_notification() {
        let request: JsonRpcRequest = serde_json::from_value(json!({
            "jsonrpc": "2.0",
            "method": "notifications/initialized",
        }))
        .unwrap();

        assert!(request.id.is_none());
        assert!(request.params.is_none());
    }

    #[test]
    fn test_error_response_shape() {
        let response = JsonRpcResponse::error(json!(7), error_codes::METHOD_NOT_FOUND, "nope".to_string(), None);
        let value = serde_json::to_value(&response).unwrap();

        assert_eq!(value["id"], json!(7));
        assert_eq!(value["error"]["code"], json!(-32601));
        assert!(value.get("result").is_none());
    }

    #[test]
    fn test_tool_result_uses_wire_names() {
        let value = serde_json::to_value(ToolCallResult::error("boom".to_string())).unwrap();
        assert_eq!(value["isError"], json!(true));
        assert_eq!(value["content"][0]["type"], json!("text"));
        assert_eq!(value["content"][0]["text"], json!("Error: boom"));
    }
}
