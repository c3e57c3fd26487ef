//! Messages exchanged with clients.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Text frame telling a WebSocket client to close the connection.
pub const CLOSE_CMD: &str = "close cmd";

/// Output of a served function: one per HTTP call, one or more per
/// WebSocket request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Output {
    /// Returned value, coerced to the function's result type.
    pub result: Value,
    /// Error text; empty on success.
    pub error: String,
    /// Text the function printed through its context.
    #[serde(default)]
    pub stdout: String,
}

impl Output {
    /// A streamed token.
    pub fn token(token: impl Into<String>) -> Self {
        Self {
            result: Value::String(token.into()),
            error: String::new(),
            stdout: String::new(),
        }
    }

    /// Whether this output reports a failure.
    pub fn is_error(&self) -> bool {
        !self.error.is_empty()
    }
}

/// Question sent to the client while a function waits for a human answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HumanPrompt {
    /// The question text.
    pub prompt: String,
}
