//! The WebSocket protocol engine.
//!
//! One engine drives one session for one route. It loops over client
//! requests, validates each against the route's input schema, and
//! dispatches on the route's execution mode:
//!
//! - simple: one output per request;
//! - lazy sequence: one output per element, then the close signal;
//! - externally streaming: one output per pushed token.
//!
//! While a function runs the engine does not receive; a function asking the
//! human takes the session's receive token for exactly one answer.

use crate::{config::InvokeConfig, session::Session};
use fcore::{
    Context, EnvScope, Error, ExecutionMode, Human, Invocation, Output, Reply, Result, Route,
    Sequence, Stdout, env, guarded,
};
use serde_json::Value;
use std::{future::Future, sync::Arc};
use tokio::sync::mpsc;

/// What the session does after a dispatch.
enum Flow {
    Continue,
    Close,
}

/// Drives one session.
pub struct Engine {
    route: Route,
    session: Arc<Session>,
    scope: EnvScope,
    stream_buffer: usize,
}

impl Engine {
    /// An engine serving `route` over `session`.
    pub fn new(route: Route, session: Arc<Session>, invoke: &InvokeConfig) -> Self {
        Self {
            route,
            session,
            scope: invoke.env_scope,
            stream_buffer: invoke.stream_buffer(),
        }
    }

    /// Run until the peer disconnects or the session is closed.
    ///
    /// Returns an error only when the connection broke down.
    pub async fn run(self) -> Result<()> {
        loop {
            let Some(text) = self.session.recv().await else {
                tracing::debug!("{}: peer disconnected", self.route.name());
                return Ok(());
            };

            let invocation = match self.validate(&text) {
                Ok(invocation) => invocation,
                Err(e) => {
                    tracing::warn!("{}: rejected request: {e}", self.route.name());
                    let output = self.route.output().failure(e.to_string(), String::new());
                    self.session.send_json(&output)?;
                    continue;
                }
            };

            match self.dispatch(invocation).await? {
                Flow::Continue => {}
                Flow::Close => {
                    tracing::debug!("{}: closing session", self.route.name());
                    self.session.close();
                    return Ok(());
                }
            }
        }
    }

    fn validate(&self, text: &str) -> Result<Invocation> {
        let body: Value = serde_json::from_str(text)
            .map_err(|e| Error::Validation(format!("request: invalid JSON: {e}")))?;
        self.route.input().validate(&body)
    }

    async fn dispatch(&self, invocation: Invocation) -> Result<Flow> {
        let Invocation { args, envs } = invocation;
        let ctx = Context::new(envs.clone()).with_human(Human::new(self.session.clone()));
        let stdout = ctx.stdout();
        tracing::debug!("{}: invoking ({:?})", self.route.name(), self.route.mode());

        env::scoped(self.scope, &envs, async {
            let reply = match self.route.mode() {
                ExecutionMode::ExternallyStreaming => {
                    let (tx, rx) = mpsc::channel(self.stream_buffer);
                    let call = guarded(self.route.call(args, ctx.with_tokens(tx)));
                    self.drain(call, rx).await?
                }
                _ => guarded(self.route.call(args, ctx)).await,
            };
            self.respond(reply, &stdout).await
        })
        .await
    }

    /// Forward pushed tokens while `call` runs, then flush the rest.
    async fn drain<F>(&self, call: F, mut tokens: mpsc::Receiver<String>) -> Result<Result<Reply>>
    where
        F: Future<Output = Result<Reply>>,
    {
        tokio::pin!(call);
        let reply = loop {
            tokio::select! {
                biased;
                Some(token) = tokens.recv() => self.session.send_json(&Output::token(token))?,
                reply = &mut call => break reply,
            }
        };

        while let Ok(token) = tokens.try_recv() {
            self.session.send_json(&Output::token(token))?;
        }
        Ok(reply)
    }

    async fn respond(&self, reply: Result<Reply>, stdout: &Stdout) -> Result<Flow> {
        let output = self.route.output();
        let closes = self.route.mode() == ExecutionMode::LazySequence;

        match reply {
            Ok(Reply::Value(value)) => {
                self.session.send_json(&output.success(value, stdout.take()))?;
            }
            Ok(Reply::Sequence(sequence)) => return self.sequence(sequence, stdout).await,
            Ok(Reply::Streamed) => {}
            Err(e) if e.is_transport() => return Err(e),
            Err(e) => {
                tracing::debug!("{}: call failed: {e}", self.route.name());
                self.session
                    .send_json(&output.failure(e.to_string(), stdout.take()))?;
            }
        }

        Ok(if closes { Flow::Close } else { Flow::Continue })
    }

    /// Send one output per element; any failure ends the sequence.
    async fn sequence(&self, mut sequence: Sequence, stdout: &Stdout) -> Result<Flow> {
        let output = self.route.output();
        loop {
            let element = match guarded(async { Ok(sequence.next().await) }).await {
                Ok(Some(element)) => element,
                Ok(None) => return Ok(Flow::Close),
                Err(e) => Err(e),
            };

            let message = match element {
                Ok(value) => output.success(value, stdout.take()),
                Err(e) if e.is_transport() => return Err(e),
                Err(e) => output.failure(e.to_string(), stdout.take()),
            };
            self.session.send_json(&message)?;
            if message.is_error() {
                return Ok(Flow::Close);
            }
        }
    }
}
