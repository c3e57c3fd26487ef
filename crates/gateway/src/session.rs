//! A duplex session as seen by the protocol engine.
//!
//! The engine never touches a socket. It receives text through an inbound
//! channel and queues [`Frame`]s on an outbound channel drained by a single
//! writer, so frames reach the client in the order they were queued.

use fcore::{Asker, CLOSE_CMD, Error, HumanPrompt, Result};
use futures_util::future::BoxFuture;
use serde::Serialize;
use std::{sync::Arc, time::Duration};
use tokio::sync::{Mutex, mpsc};

/// An outbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A text message.
    Text(String),
    /// The close frame; nothing is written after it.
    Close,
}

/// One client connection.
pub struct Session {
    outbound: mpsc::UnboundedSender<Frame>,
    /// Holding the lock is the receive token: at most one receive at a time.
    inbound: Mutex<mpsc::Receiver<String>>,
    human_timeout: Option<Duration>,
}

impl Session {
    /// Wrap the two halves of a connection.
    pub fn new(
        outbound: mpsc::UnboundedSender<Frame>,
        inbound: mpsc::Receiver<String>,
        human_timeout: Option<Duration>,
    ) -> Arc<Self> {
        Arc::new(Self {
            outbound,
            inbound: Mutex::new(inbound),
            human_timeout,
        })
    }

    /// Receive the next text message, `None` once the peer is gone.
    pub async fn recv(&self) -> Option<String> {
        self.inbound.lock().await.recv().await
    }

    /// Queue a text message.
    pub fn send_text(&self, text: impl Into<String>) -> Result<()> {
        self.outbound
            .send(Frame::Text(text.into()))
            .map_err(|_| Error::Transport("connection closed".into()))
    }

    /// Queue `message` serialized as JSON text.
    pub fn send_json<T: Serialize>(&self, message: &T) -> Result<()> {
        let text = serde_json::to_string(message)
            .map_err(|e| Error::Transport(format!("failed to serialize message: {e}")))?;
        self.send_text(text)
    }

    /// Tell the client to close, then close.
    pub fn close(&self) {
        let _ = self.send_text(CLOSE_CMD);
        let _ = self.outbound.send(Frame::Close);
    }
}

/// With a human timeout, an expired ask fails the call and the failure
/// output withdraws the prompt. The session then reads the next message as a
/// request, so an answer sent after the withdrawal is validated as one.
impl Asker for Session {
    fn ask<'a>(&'a self, prompt: String) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move {
            self.send_json(&HumanPrompt { prompt })?;

            let answer = async { self.inbound.lock().await.recv().await };
            let answer = match self.human_timeout {
                Some(limit) => tokio::time::timeout(limit, answer).await.map_err(|_| {
                    Error::Execution(format!(
                        "prompt withdrawn: no answer from the human within {}s",
                        limit.as_secs()
                    ))
                })?,
                None => answer.await,
            };

            answer.ok_or_else(|| {
                Error::Transport("peer disconnected while waiting for an answer".into())
            })
        })
    }
}
