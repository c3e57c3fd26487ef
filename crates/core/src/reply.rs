//! What a handler hands back to the transport.

use crate::{Error, Result};
use futures_core::{Stream, stream::BoxStream};
use futures_util::{FutureExt, StreamExt};
use serde::Serialize;
use serde_json::Value;
use std::{any::Any, fmt, fmt::Display, future::Future, panic::AssertUnwindSafe};
use tokio::sync::mpsc;

/// Output of one invocation, shaped by the function's execution mode.
#[derive(Debug)]
pub enum Reply {
    /// A single value.
    Value(Value),
    /// A lazy sequence of values.
    Sequence(Sequence),
    /// The function pushed its output through streaming handles.
    Streamed,
}

impl Reply {
    /// Serialize a returned value.
    pub fn value<T: Serialize>(value: T) -> Result<Self> {
        serde_json::to_value(value)
            .map(Self::Value)
            .map_err(|e| Error::Execution(format!("failed to serialize result: {e}")))
    }

    /// Serialize the `Ok` value of a fallible function, or turn its error
    /// into an execution error.
    pub fn from_result<T: Serialize, E: Display + 'static>(
        result: std::result::Result<T, E>,
    ) -> Result<Self> {
        match result {
            Ok(value) => Self::value(value),
            Err(e) => Err(Error::returned(e)),
        }
    }

    /// Forward the elements of an async stream.
    pub fn stream<S>(stream: S) -> Result<Self>
    where
        S: Stream + Send + 'static,
        S::Item: Serialize,
    {
        Ok(Self::Sequence(Sequence::from_stream(stream)))
    }

    /// Run a synchronous iterator-producing closure on the blocking pool and
    /// forward the elements it yields.
    pub fn iter_blocking<F, I>(produce: F) -> Result<Self>
    where
        F: FnOnce() -> I + Send + 'static,
        I: IntoIterator,
        I::Item: Serialize,
    {
        Ok(Self::Sequence(Sequence::from_iter_blocking(produce)))
    }

    /// The function finished pushing tokens.
    pub fn streamed() -> Result<Self> {
        Ok(Self::Streamed)
    }

    /// [`Reply::streamed`] for fallible externally-streaming functions.
    pub fn streamed_result<T, E: Display + 'static>(
        result: std::result::Result<T, E>,
    ) -> Result<Self> {
        result
            .map(|_| Self::Streamed)
            .map_err(Error::returned)
    }

    /// Name of the variant, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Value(_) => "value",
            Self::Sequence(_) => "sequence",
            Self::Streamed => "stream",
        }
    }
}

/// A lazy sequence of serialized elements, pulled by the protocol engine.
pub struct Sequence(BoxStream<'static, Result<Value>>);

impl fmt::Debug for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sequence").finish_non_exhaustive()
    }
}

impl Sequence {
    /// Wrap an async stream.
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: Stream + Send + 'static,
        S::Item: Serialize,
    {
        Self(
            stream
                .map(|item| {
                    serde_json::to_value(item)
                        .map_err(|e| Error::Execution(format!("failed to serialize element: {e}")))
                })
                .boxed(),
        )
    }

    /// Drive a synchronous iterator on the blocking pool.
    ///
    /// Elements are handed over one at a time, so the iterator only advances
    /// when the previous element has been taken; dropping the sequence stops
    /// the iteration at the next element.
    pub fn from_iter_blocking<F, I>(produce: F) -> Self
    where
        F: FnOnce() -> I + Send + 'static,
        I: IntoIterator,
        I::Item: Serialize,
    {
        let (tx, mut rx) = mpsc::channel::<Result<Value>>(1);
        let worker = tokio::task::spawn_blocking(move || {
            for item in produce() {
                let value = serde_json::to_value(item)
                    .map_err(|e| Error::Execution(format!("failed to serialize element: {e}")));
                let failed = value.is_err();
                if tx.blocking_send(value).is_err() || failed {
                    break;
                }
            }
        });

        Self(
            async_stream::stream! {
                while let Some(item) = rx.recv().await {
                    yield item;
                }
                match worker.await {
                    Err(e) if e.is_panic() => {
                        yield Err(Error::Execution(panic_message(e.into_panic())));
                    }
                    _ => {}
                }
            }
            .boxed(),
        )
    }

    /// Pull the next element.
    pub async fn next(&mut self) -> Option<Result<Value>> {
        self.0.next().await
    }
}

/// Run a synchronous function body on the blocking pool.
///
/// A panic in `body` becomes an execution error.
pub async fn run_blocking<F, T>(body: F) -> Result<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(body).await.map_err(|e| {
        if e.is_panic() {
            Error::Execution(panic_message(e.into_panic()))
        } else {
            Error::Execution("function was cancelled".into())
        }
    })
}

/// Await `call`, turning a panic into an execution error.
pub async fn guarded<F, T>(call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    AssertUnwindSafe(call)
        .catch_unwind()
        .await
        .unwrap_or_else(|payload| Err(Error::Execution(panic_message(payload))))
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".into());
    format!("function panicked: {detail}")
}
