//! Error types for Trace Core

use thiserror::Error;

/// A string could not be parsed into an account identifier or a hash.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot parse {kind} from {input:?}: {reason}")]
pub struct ParseError {
    pub kind: &'static str,
    pub input: String,
    pub reason: String,
}

impl ParseError {
    pub fn new(kind: &'static str, input: &str, reason: impl Into<String>) -> Self {
        Self {
            kind,
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum TraceError {
    /// Raised by tree builders when a trace grows past an acceptable size.
    #[error("trace is too long")]
    TraceTooLong,

    #[error("Information source error: {0}")]
    InformationSource(String),

    #[error("Additional info collection cancelled")]
    Cancelled,
}

pub type TraceResult<T> = Result<T, TraceError>;
