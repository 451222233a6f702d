use std::{fmt::Display, io};

pub use jsonrpsee::types::error::ErrorCode;
use jsonrpsee::types::ErrorObjectOwned;

/// Errors produced while serving MCP requests. Protocol errors map onto JSON-RPC error codes (see
/// [`McpError::code`]), and are returned to the client. The remaining variants are local
/// failures that end the message loop.
#[derive(Debug, thiserror::Error)]
pub enum McpError {
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Unknown method or tool. The message is sent to the client as is.
    #[error("{0}")]
    MethodNotFound(String),

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Transport error: {0}")]
    Transport(#[from] io::Error),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl McpError {
    /// A tool was called that no one registered.
    pub fn tool_not_found(name: impl Display) -> Self {
        Self::MethodNotFound(format!("Tool not found: {name}"))
    }

    /// A tool is known, but has no implementation behind it.
    pub fn tool_implementation_required(name: impl Display) -> Self {
        Self::MethodNotFound(format!("Tool implementation required: {name}"))
    }

    /// JSON-RPC code reported to the client for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            McpError::ParseError(_) | McpError::Json(_) => ErrorCode::ParseError,
            McpError::InvalidRequest(_) => ErrorCode::InvalidRequest,
            McpError::MethodNotFound(_) => ErrorCode::MethodNotFound,
            McpError::InvalidParams(_) => ErrorCode::InvalidParams,
            McpError::InternalError(_) | McpError::Transport(_) | McpError::ConnectionClosed => {
                ErrorCode::InternalError
            }
        }
    }
}

impl From<McpError> for ErrorObjectOwned {
    fn from(error: McpError) -> Self {
        Self::owned(error.code().code(), error.to_string(), None::<()>)
    }
}
