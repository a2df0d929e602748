use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure of a single tool invocation.
///
/// These travel inside the conversation history as error-flagged tool results, so
/// they must stay cloneable and serializable rather than wrapping source errors.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Deserialize, Serialize)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Tool execution failed: {0}")]
    ExecutionError(String),

    #[error("Tool server unreachable: {0}")]
    Transport(String),
}

pub type ToolResult<T> = Result<T, ToolError>;
