//! Middleware layer.
//!
//! Middleware intercepts requests and responses and is the right place for
//! cross-cutting concerns. The one shipped here is the access log:
//!
//! - [`AccessLog`] — captures each response and emits one line per request
//!   in common or combined log format
//! - [`format`] — the formatters, usable on their own
//! - [`AccessLogger`] — where the lines go ([`TracingLogger`],
//!   [`WriterLogger`], or any `Fn(&str)`)

mod access_log;
pub mod format;
mod logger;

pub use access_log::{AccessLog, LogWriter};
pub use format::{Format, Formatter};
pub use logger::{AccessLogger, TracingLogger, WriterLogger};
