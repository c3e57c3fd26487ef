//! Execution mode classification.

use crate::annotation::TypeAnnotation;
use serde::{Deserialize, Serialize};

/// Name of the sentinel return type marking externally-streaming functions.
pub const STREAMING_RESPONSE: &str = "StreamingResponse";

/// How a function produces its output, fixed once at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Returns a single value on completion.
    Simple,
    /// Returns a finite lazy sequence; each element is one output message.
    LazySequence,
    /// Pushes tokens through the streaming handles it is handed; the
    /// return value is ignored.
    ExternallyStreaming,
}

impl ExecutionMode {
    /// Classify a function from its return annotation.
    ///
    /// One `Result<T, E>` layer is looked through, so `Result<StreamingResponse, E>`
    /// is externally-streaming like `StreamingResponse` itself.
    pub fn classify(returns: Option<&TypeAnnotation>) -> Self {
        let Some(returns) = returns else {
            return Self::Simple;
        };

        let outcome = returns.outcome();
        if outcome.peel().name() == STREAMING_RESPONSE {
            Self::ExternallyStreaming
        } else if returns.sequence_item().is_some() || outcome.sequence_item().is_some() {
            Self::LazySequence
        } else {
            Self::Simple
        }
    }

    /// Whether this mode needs a duplex connection.
    pub fn is_streaming(self) -> bool {
        !matches!(self, Self::Simple)
    }
}

/// Sentinel return type of externally-streaming functions.
///
/// A function declared as returning `StreamingResponse` receives its output
/// channel through [`Context`](crate::Context) and pushes tokens itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamingResponse;
