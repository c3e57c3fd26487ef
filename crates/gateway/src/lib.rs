//! fnserve gateway: serves a [`Registry`](fcore::Registry) over HTTP and
//! WebSocket.
//!
//! HTTP routes answer `POST /{name}` with one output. WebSocket routes
//! upgrade `GET /{name}` into a session driven by the protocol [`Engine`],
//! which interleaves streamed outputs with human-in-the-loop prompts on the
//! same connection.

pub use config::{GatewayConfig, InvokeConfig, ServerConfig};
pub use engine::Engine;
pub use router::router;
pub use serve::{ServeHandle, serve};
pub use session::{Frame, Session};
pub use state::Gateway;

pub mod config;
mod engine;
mod http;
mod router;
mod serve;
mod session;
mod state;
pub mod utils;
mod ws;
