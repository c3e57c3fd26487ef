//! Per-call capabilities handed to served functions.
//!
//! Functions that declare a [`Context`] parameter receive one per call. It
//! replaces process-global rebinding of input and output primitives with
//! explicit handles: environment lookup, captured stdout, a human-ask
//! handle bound to the caller's connection, and the streaming handles of
//! externally-streaming functions.

use crate::{Error, Result, env::Envs};
use futures_core::future::BoxFuture;
use parking_lot::Mutex;
use std::{fmt, sync::Arc};
use tokio::{
    runtime::Handle,
    sync::{mpsc, oneshot},
};

/// Capability to ask the human on the other end of a connection.
pub trait Asker: Send + Sync {
    /// Send `prompt` and wait for the raw answer text.
    fn ask<'a>(&'a self, prompt: String) -> BoxFuture<'a, Result<String>>;
}

/// Handle for asking the connected human a question mid-call.
#[derive(Clone, Default)]
pub struct Human {
    asker: Option<Arc<dyn Asker>>,
}

impl Human {
    /// A handle backed by `asker`.
    pub fn new(asker: Arc<dyn Asker>) -> Self {
        Self { asker: Some(asker) }
    }

    /// Whether a human is reachable from this call.
    pub fn is_available(&self) -> bool {
        self.asker.is_some()
    }

    /// Ask `prompt` and wait for the answer.
    pub async fn ask(&self, prompt: impl Into<String>) -> Result<String> {
        let Some(asker) = &self.asker else {
            return Err(Error::Unsupported(
                "human input is only available over websocket".into(),
            ));
        };
        asker.ask(prompt.into()).await
    }

    /// Blocking form of [`Human::ask`] for synchronous function bodies.
    ///
    /// Synchronous functions run on the blocking pool, where this parks the
    /// thread until the answer arrives. Calling it from async code panics.
    pub fn ask_blocking(&self, prompt: impl Into<String>) -> Result<String> {
        let handle = Handle::try_current()
            .map_err(|_| Error::Unsupported("blocking ask outside of a runtime".into()))?;
        let (tx, rx) = oneshot::channel();
        let human = self.clone();
        let prompt = prompt.into();
        handle.spawn(async move {
            let _ = tx.send(human.ask(prompt).await);
        });
        rx.blocking_recv()
            .map_err(|_| Error::Transport("human ask was cancelled".into()))?
    }
}

impl fmt::Debug for Human {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Human")
            .field("available", &self.is_available())
            .finish()
    }
}

/// Captured output text of one call.
#[derive(Debug, Clone, Default)]
pub struct Stdout(Arc<Mutex<String>>);

impl Stdout {
    /// Append `text` as is.
    pub fn print(&self, text: &str) {
        self.0.lock().push_str(text);
    }

    /// Append `line` followed by a newline.
    pub fn println(&self, line: &str) {
        let mut buf = self.0.lock();
        buf.push_str(line);
        buf.push('\n');
    }

    /// Drain the captured text as lines joined by `\n`, without a trailing
    /// newline.
    pub fn take(&self) -> String {
        let text = std::mem::take(&mut *self.0.lock());
        text.lines().collect::<Vec<_>>().join("\n")
    }
}

/// Pushes tokens from synchronous function bodies.
#[derive(Debug, Clone)]
pub struct StreamingHandler {
    tokens: Option<mpsc::Sender<String>>,
}

impl StreamingHandler {
    /// Push one token, blocking while the stream buffer is full.
    ///
    /// Like [`Human::ask_blocking`], must not be called from async code.
    pub fn push(&self, token: impl Into<String>) -> Result<()> {
        let tokens = streaming(&self.tokens)?;
        tokens
            .blocking_send(token.into())
            .map_err(|_| Error::Transport("token stream closed".into()))
    }
}

/// Pushes tokens from async function bodies.
#[derive(Debug, Clone)]
pub struct AsyncStreamingHandler {
    tokens: Option<mpsc::Sender<String>>,
}

impl AsyncStreamingHandler {
    /// Push one token, waiting while the stream buffer is full.
    pub async fn push(&self, token: impl Into<String>) -> Result<()> {
        let tokens = streaming(&self.tokens)?;
        tokens
            .send(token.into())
            .await
            .map_err(|_| Error::Transport("token stream closed".into()))
    }
}

fn streaming(tokens: &Option<mpsc::Sender<String>>) -> Result<&mpsc::Sender<String>> {
    tokens.as_ref().ok_or_else(|| {
        Error::Unsupported("streaming is only available to functions returning StreamingResponse".into())
    })
}

/// Capabilities of one function call.
#[derive(Debug, Default)]
pub struct Context {
    envs: Envs,
    stdout: Stdout,
    human: Human,
    tokens: Option<mpsc::Sender<String>>,
}

impl Context {
    /// A context carrying the request's environment overrides.
    pub fn new(envs: Envs) -> Self {
        Self {
            envs,
            ..Self::default()
        }
    }

    /// Bind the human-ask handle.
    pub fn with_human(mut self, human: Human) -> Self {
        self.human = human;
        self
    }

    /// Bind the token channel drained by the protocol engine.
    pub fn with_tokens(mut self, tokens: mpsc::Sender<String>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    /// Look up an environment variable, request overrides first.
    pub fn env(&self, key: &str) -> Option<String> {
        match self.envs.get(key) {
            Some(value) => Some(value.to_owned()),
            None => std::env::var(key).ok(),
        }
    }

    /// The request's environment overrides.
    pub fn envs(&self) -> &Envs {
        &self.envs
    }

    /// Handle to this call's captured output.
    pub fn stdout(&self) -> Stdout {
        self.stdout.clone()
    }

    /// Capture `text` into the call's `stdout`.
    pub fn print(&self, text: impl AsRef<str>) {
        self.stdout.print(text.as_ref());
    }

    /// Capture `line` and a newline into the call's `stdout`.
    pub fn println(&self, line: impl AsRef<str>) {
        self.stdout.println(line.as_ref());
    }

    /// The human-ask handle.
    pub fn human(&self) -> &Human {
        &self.human
    }

    /// Ask the connected human `prompt` and wait for the answer.
    pub async fn ask(&self, prompt: impl Into<String>) -> Result<String> {
        self.human.ask(prompt).await
    }

    /// Blocking form of [`Context::ask`] for synchronous function bodies.
    pub fn ask_blocking(&self, prompt: impl Into<String>) -> Result<String> {
        self.human.ask_blocking(prompt)
    }

    /// Token pusher for synchronous code.
    pub fn streaming_handler(&self) -> StreamingHandler {
        StreamingHandler {
            tokens: self.tokens.clone(),
        }
    }

    /// Token pusher for async code.
    pub fn async_streaming_handler(&self) -> AsyncStreamingHandler {
        AsyncStreamingHandler {
            tokens: self.tokens.clone(),
        }
    }
}
