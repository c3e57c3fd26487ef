//! Error taxonomy shared by the registry, the handlers and the gateway.

use std::{any::Any, fmt::Display};

/// Errors raised while registering or invoking a served function.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The client payload does not match the input schema.
    #[error("{0}")]
    Validation(String),

    /// The served function failed while running.
    #[error("{0}")]
    Execution(String),

    /// The connection to the client broke down.
    #[error("transport error: {0}")]
    Transport(String),

    /// A function could not be registered.
    #[error("registration failed: {0}")]
    Registration(String),

    /// The capability is not available on the current transport.
    #[error("{0}")]
    Unsupported(String),
}

impl Error {
    /// Whether the error leaves the connection unusable.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Convert the error a served function returned.
    ///
    /// A transport error raised inside the function keeps its kind, anything
    /// else becomes an execution failure.
    pub fn returned<E: Display + 'static>(e: E) -> Self {
        match (&e as &dyn Any).downcast_ref::<Self>() {
            Some(Self::Transport(reason)) => Self::Transport(reason.clone()),
            _ => Self::Execution(e.to_string()),
        }
    }
}

/// Result alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
