//! Protocol frames exchanged with the controller.
//!
//! Each frame is one JSON object on its own line, following JSON-RPC 2.0:
//! positional `params`, and either `result` or `error` in the response.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::method::Method;

/// Protocol version tag carried by every frame.
pub const JSONRPC_VERSION: &str = "2.0";

fn default_version() -> String {
    JSONRPC_VERSION.to_string()
}

/// A call request sent by the controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    #[serde(default = "default_version")]
    pub jsonrpc: String,

    /// Correlation id, echoed back in the response
    #[serde(default)]
    pub id: Value,

    /// Wire name of the method to call
    pub method: String,

    /// Positional arguments
    #[serde(default)]
    pub params: Vec<Value>,
}

impl Request {
    /// Creates a request for a known method.
    pub fn new(id: impl Into<Value>, method: Method, params: Vec<Value>) -> Self {
        Self {
            jsonrpc: default_version(),
            id: id.into(),
            method: method.wire_name().to_string(),
            params,
        }
    }
}

/// Transport-level error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// The frame is not valid JSON
    ParseError,
    /// The frame is JSON but not a request
    InvalidRequest,
    /// No endpoint with the requested name
    MethodNotFound,
    /// The call completed but its result has no wire form
    InternalError,
}

impl ErrorCode {
    pub fn code(&self) -> i64 {
        match self {
            ErrorCode::ParseError => -32700,
            ErrorCode::InvalidRequest => -32600,
            ErrorCode::MethodNotFound => -32601,
            ErrorCode::InternalError => -32603,
        }
    }
}

/// Error object of a failed response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

impl RpcError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code.code(),
            message: message.into(),
        }
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(
            ErrorCode::MethodNotFound,
            format!("method \"{method}\" is not supported"),
        )
    }
}

/// A response sent back to the controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub jsonrpc: String,

    pub id: Value,

    /// Serialized result envelope
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl Response {
    /// Creates a successful response carrying a serialized envelope.
    pub fn result(id: Value, envelope: Value) -> Self {
        Self {
            jsonrpc: default_version(),
            id,
            result: Some(envelope),
            error: None,
        }
    }

    /// Creates an error response.
    pub fn error(id: Value, error: RpcError) -> Self {
        Self {
            jsonrpc: default_version(),
            id,
            result: None,
            error: Some(error),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_serialization() {
        let request = Request::new(7, Method::GetModulePath, vec![json!("mod"), json!([]), json!([])]);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            json!({"jsonrpc": "2.0", "id": 7, "method": "getModulePath", "params": ["mod", [], []]})
        );
    }

    #[test]
    fn test_request_defaults() {
        let request: Request = serde_json::from_str(r#"{"method":"getRobotVersion"}"#).unwrap();
        assert_eq!(request.jsonrpc, JSONRPC_VERSION);
        assert_eq!(request.id, Value::Null);
        assert!(request.params.is_empty());
    }

    #[test]
    fn test_result_response_shape() {
        let response = Response::result(json!(1), json!({"result": null, "exception": null}));
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(
            json,
            json!({"jsonrpc": "2.0", "id": 1, "result": {"result": null, "exception": null}})
        );
        assert!(!response.is_error());
    }

    #[test]
    fn test_error_response_shape() {
        let response = Response::error(json!("a"), RpcError::method_not_found("nope"));
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["error"]["code"], json!(-32601));
        assert!(json.get("result").is_none());
        assert!(response.is_error());
    }
}
