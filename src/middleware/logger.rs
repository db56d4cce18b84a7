//! Destinations for access log lines.

use std::io::Write;
use std::sync::{Mutex, PoisonError};

/// Receives one finished access log line per request.
///
/// Implementations are shared by every request the middleware sees, hence
/// `Send + Sync`. A logger has no way to fail the request: whatever goes
/// wrong while recording a line stays inside the logger.
pub trait AccessLogger: Send + Sync + 'static {
    fn log(&self, line: &str);
}

impl<F> AccessLogger for F
where
    F: Fn(&str) + Send + Sync + 'static,
{
    fn log(&self, line: &str) {
        self(line)
    }
}

/// Emits each line as an INFO event on the `access_log` target.
///
/// Lets the subscriber decide where access logs end up, e.g. with
/// `RUST_LOG=access_log=info`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingLogger;

impl AccessLogger for TracingLogger {
    fn log(&self, line: &str) {
        tracing::info!(target: "access_log", "{line}");
    }
}

/// Appends each line, newline-terminated, to a writer such as
/// [`std::io::stdout`] or an open file.
pub struct WriterLogger<W> {
    writer: Mutex<W>,
}

impl<W: Write + Send + 'static> WriterLogger<W> {
    pub fn new(writer: W) -> Self {
        Self { writer: Mutex::new(writer) }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<W: Write + Send + 'static> AccessLogger for WriterLogger<W> {
    fn log(&self, line: &str) {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = write_line(&mut *writer, line) {
            tracing::warn!("failed to write access log line: {e}");
        }
    }
}

fn write_line(writer: &mut impl Write, line: &str) -> std::io::Result<()> {
    writer.write_all(line.as_bytes())?;
    writer.write_all(b"\n")?;
    writer.flush()
}
