//! Per-call environment overrides.
//!
//! Requests may carry an `envs` map. Under [`EnvScope::Context`] the
//! overrides only live in the call's [`Context`](crate::Context); under
//! [`EnvScope::Process`] they are written into the process environment for
//! the duration of the call and restored afterwards, with every call in the
//! process serialized behind one lock.

use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    ffi::OsString,
    future::Future,
    sync::LazyLock,
};
use tokio::sync::Mutex;

/// Serializes invocations while overrides are applied process-wide.
static SINGLE_FLIGHT: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

/// Where request-supplied environment overrides are applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvScope {
    /// Overrides are visible through [`Context::env`](crate::Context::env) only.
    #[default]
    Context,
    /// Overrides are written into the process environment; calls run one at
    /// a time.
    Process,
}

/// Environment overrides supplied with one request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Envs(BTreeMap<String, String>);

impl Envs {
    /// An empty set of overrides.
    pub fn new() -> Self {
        Self::default()
    }

    /// The override for `key`, if any.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Add or replace an override.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Iterate over `(key, value)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of overrides.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no overrides.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<BTreeMap<String, String>> for Envs {
    fn from(map: BTreeMap<String, String>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Envs {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Applies overrides to the process environment and restores the previous
/// values when dropped, including on unwinding and future cancellation.
///
/// Keys that were absent before are removed again.
#[must_use = "overrides are restored as soon as the guard is dropped"]
pub struct EnvGuard {
    saved: Vec<(String, Option<OsString>)>,
}

impl EnvGuard {
    /// Write `envs` into the process environment.
    ///
    /// Callers must ensure no other thread reads or writes the environment
    /// while the guard is alive; [`scoped`] does so with a process-wide lock.
    pub fn apply(envs: &Envs) -> Self {
        let mut saved = Vec::with_capacity(envs.len());
        for (key, value) in envs.iter() {
            saved.push((key.to_owned(), std::env::var_os(key)));
            // SAFETY: invocations holding an `EnvGuard` are serialized by
            // `SINGLE_FLIGHT`, the only writer of the environment.
            unsafe { std::env::set_var(key, value) };
        }
        Self { saved }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, previous) in self.saved.drain(..).rev() {
            // SAFETY: see `EnvGuard::apply`.
            unsafe {
                match previous {
                    Some(value) => std::env::set_var(&key, value),
                    None => std::env::remove_var(&key),
                }
            }
        }
    }
}

/// Run `body` with `envs` applied according to `scope`.
///
/// Under [`EnvScope::Context`] this is just `body.await`. Under
/// [`EnvScope::Process`] the call waits for the single-flight lock, applies
/// the overrides, and restores them when `body` finishes or is dropped.
pub async fn scoped<F: Future>(scope: EnvScope, envs: &Envs, body: F) -> F::Output {
    match scope {
        EnvScope::Context => body.await,
        EnvScope::Process => {
            let _flight = SINGLE_FLIGHT.lock().await;
            let _guard = EnvGuard::apply(envs);
            body.await
        }
    }
}

/// Synchronous form of [`scoped`] for process-wide overrides: apply `envs`,
/// run `body`, restore.
///
/// Does not take the single-flight lock; callers that may run concurrently
/// with other invocations must serialize themselves.
pub fn with_env<T>(envs: &Envs, body: impl FnOnce() -> T) -> T {
    let _guard = EnvGuard::apply(envs);
    body()
}
