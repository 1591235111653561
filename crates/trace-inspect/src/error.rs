use thiserror::Error;
use trace_core::TraceError;

#[derive(Error, Debug)]
pub enum InspectError {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Trace error: {0}")]
    Trace(#[from] TraceError),

    #[error("Source snapshot error: {0}")]
    Source(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl InspectError {
    /// JSON-RPC error code reported for this error
    pub fn code(&self) -> i32 {
        match self {
            InspectError::Parse(_) => -32700,
            InspectError::InvalidRequest(_) => -32600,
            InspectError::InvalidParams(_) | InspectError::Serialization(_) => -32602,
            InspectError::Trace(TraceError::TraceTooLong) => -32001,
            InspectError::Trace(TraceError::Cancelled) => -32002,
            _ => -32000,
        }
    }
}

pub type Result<T> = std::result::Result<T, InspectError>;
