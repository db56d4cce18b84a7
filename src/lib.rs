//! # tsu-log
//!
//! Access logging for tsu services: one line per request, in the Common or
//! Combined Log Format that every log analyser already understands.
//!
//! ## How it works
//!
//! A handler writes its body through the [`Response`]'s
//! [`ResponseWriter`]. The [`AccessLog`] middleware swaps that writer for a
//! [`LogWriter`] which keeps a copy of every byte on its way out. When the
//! response is closed, the formatter turns the request, the final response
//! and the captured body into one line, and the injected [`AccessLogger`]
//! records it. Nothing is logged per write; nothing is shared between
//! requests.
//!
//! What this crate intentionally leaves to someone else:
//!
//! - **Rotation and shipping** — logrotate, journald, your log collector
//! - **Levels and filtering** — the `tracing` subscriber
//! - **Structured / JSON logs** — `tracing` fields, not access log lines
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use tsu_log::{AccessLog, BoxedHandler, Request, Response, Server, TracingLogger};
//!
//! #[tokio::main]
//! async fn main() {
//!     tracing_subscriber::fmt::init();
//!
//!     let app = BoxedHandler::new(hello).layer(&AccessLog::combined(TracingLogger));
//!
//!     Server::bind(([0, 0, 0, 0], 3000)).serve(app).await.unwrap();
//! }
//!
//! fn hello(res: &mut Response, req: &Request) {
//!     // 127.0.0.1 - - [19/Oct/2026:10:00:00 +0000] "GET /hello HTTP/1.1" 200 11 "" "curl/8.5.0"
//!     if let Err(e) = res.text(&format!("hi {}", req.path())) {
//!         tracing::warn!(path = req.path(), "failed to write response: {e}");
//!     }
//! }
//! ```

mod error;
mod handler;
mod request;
mod response;
mod server;
mod writer;

pub mod middleware;

pub use error::Error;
pub use handler::{BoxedHandler, Handler, Middleware};
pub use middleware::{AccessLog, AccessLogger, Format, Formatter, LogWriter, TracingLogger, WriterLogger};
pub use request::Request;
pub use response::{ContentType, Response};
pub use server::Server;
pub use writer::ResponseWriter;
