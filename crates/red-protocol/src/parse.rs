//! Parsing of incoming request frames.

use serde_json::Value;
use thiserror::Error;

use crate::message::{ErrorCode, Request, Response, RpcError, JSONRPC_VERSION};

/// Errors found while parsing a request frame.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProtocolError {
    /// The frame is not valid JSON
    #[error("malformed frame: {0}")]
    Malformed(String),

    /// The frame is valid JSON but not a valid request
    #[error("invalid request: {reason}")]
    InvalidRequest { id: Value, reason: String },
}

impl ProtocolError {
    /// Builds the error response reported back to the sender.
    pub fn to_response(&self) -> Response {
        match self {
            ProtocolError::Malformed(_) => Response::error(
                Value::Null,
                RpcError::new(ErrorCode::ParseError, self.to_string()),
            ),
            ProtocolError::InvalidRequest { id, .. } => Response::error(
                id.clone(),
                RpcError::new(ErrorCode::InvalidRequest, self.to_string()),
            ),
        }
    }
}

/// Parses one request frame.
pub fn parse_request(frame: &str) -> Result<Request, ProtocolError> {
    let json: Value =
        serde_json::from_str(frame).map_err(|e| ProtocolError::Malformed(e.to_string()))?;

    let id = json.get("id").cloned().unwrap_or(Value::Null);
    let request: Request =
        serde_json::from_value(json).map_err(|e| ProtocolError::InvalidRequest {
            id: id.clone(),
            reason: e.to_string(),
        })?;

    if request.jsonrpc != JSONRPC_VERSION {
        return Err(ProtocolError::InvalidRequest {
            id,
            reason: format!("unsupported protocol version \"{}\"", request.jsonrpc),
        });
    }

    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_valid_request() {
        let request =
            parse_request(r#"{"jsonrpc":"2.0","id":3,"method":"getVariables","params":["/a.py",["x"]]}"#)
                .unwrap();
        assert_eq!(request.id, json!(3));
        assert_eq!(request.method, "getVariables");
        assert_eq!(request.params, vec![json!("/a.py"), json!(["x"])]);
    }

    #[test]
    fn test_parse_malformed_json() {
        let err = parse_request("{not json").unwrap_err();
        assert!(matches!(err, ProtocolError::Malformed(_)));
        let response = err.to_response();
        assert_eq!(response.id, Value::Null);
        assert_eq!(response.error.unwrap().code, -32700);
    }

    #[test]
    fn test_parse_params_must_be_array() {
        let err = parse_request(r#"{"id":9,"method":"getModulePath","params":{"name":"x"}}"#)
            .unwrap_err();
        let response = err.to_response();
        assert_eq!(response.id, json!(9));
        assert_eq!(response.error.unwrap().code, -32600);
    }

    #[test]
    fn test_parse_missing_method() {
        let err = parse_request(r#"{"id":1}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidRequest { .. }));
    }

    #[test]
    fn test_parse_wrong_version() {
        let err = parse_request(r#"{"jsonrpc":"1.0","id":1,"method":"getRobotVersion"}"#)
            .unwrap_err();
        assert!(err.to_string().contains("unsupported protocol version"));
    }

    #[test]
    fn test_parse_non_object() {
        let err = parse_request("[1,2]").unwrap_err();
        assert_eq!(err.to_response().id, Value::Null);
    }
}
