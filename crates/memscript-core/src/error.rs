//! Error types for memscript

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("script error: {0}")]
    Script(String),

    #[error("undefined name: {0}")]
    UndefinedName(String),

    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("invalid tool argument for {tool}: {message}")]
    ToolArgument { tool: String, message: String },

    #[error("timed out after {0} ms")]
    Timeout(u64),

    #[error("graph file error: {0}")]
    GraphFile(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: message.into(),
        }
    }

    pub fn script(message: impl Into<String>) -> Self {
        Self::Script(message.into())
    }

    pub fn tool_argument(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ToolArgument {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Whether this error is the budget expiring rather than a script fault.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}
