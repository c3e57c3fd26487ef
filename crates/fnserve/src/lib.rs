//! Serve plain Rust functions over HTTP and WebSocket.
//!
//! ```rust,ignore
//! use fnserve::{Context, GatewayConfig, Registry, serving};
//!
//! /// Greet someone.
//! #[serving]
//! fn greet(name: &str) -> String {
//!     format!("hello, {name}")
//! }
//!
//! /// Count to `n`, one message per number.
//! #[serving(websocket)]
//! fn count(n: u32) -> impl Iterator<Item = u32> {
//!     1..=n
//! }
//!
//! /// Ask the caller for their name.
//! #[serving(websocket)]
//! async fn hello(ctx: Context) -> fnserve::Result<String> {
//!     let name = ctx.ask("what is your name?").await?;
//!     Ok(format!("hello, {name}"))
//! }
//!
//! # async fn run() -> anyhow::Result<()> {
//! let mut registry = Registry::new();
//! registry.register(greet::serving());
//! registry.register(count::serving());
//! registry.register(hello::serving());
//!
//! let handle = fnserve::serve(registry, &GatewayConfig::default()).await?;
//! # handle.shutdown().await
//! # }
//! ```
//!
//! `POST /greet {"name": "Ann"}` answers
//! `{"result": "hello, Ann", "error": "", "stdout": ""}`; `GET /count`
//! upgrades to a WebSocket session that answers `{"n": 3}` with three
//! outputs and then asks the client to close.

pub use codegen::serving;
pub use fcore::*;
pub use gateway::{self, GatewayConfig, InvokeConfig, ServeHandle, serve};
