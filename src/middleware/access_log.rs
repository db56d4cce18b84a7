//! Access log middleware.
//!
//! [`AccessLog`] installs a [`LogWriter`] in front of every response. The
//! writer keeps a copy of the body as it streams past and, when the response
//! is closed, turns the request, the response and that copy into one line
//! for the [`AccessLogger`].

use std::io;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Local};

use crate::handler::{BoxedHandler, Handler, Middleware};
use crate::middleware::format::{self, Format, Formatter};
use crate::middleware::logger::AccessLogger;
use crate::request::Request;
use crate::response::Response;
use crate::writer::ResponseWriter;

/// Response writer that keeps the body in memory for the access log.
///
/// Owned by a single request. Writes are forwarded untouched; the log line
/// is produced once, on [`close`](ResponseWriter::close).
pub struct LogWriter {
    now: DateTime<FixedOffset>,
    request: Request,
    writer: Box<dyn ResponseWriter>,
    body: Vec<u8>,
    formatter: Formatter,
    logger: Arc<dyn AccessLogger>,
}

impl LogWriter {
    /// Starts the clock for `request`. `writer` receives the actual output.
    pub fn new(
        writer: Box<dyn ResponseWriter>,
        request: Request,
        formatter: Formatter,
        logger: Arc<dyn AccessLogger>,
    ) -> Self {
        Self {
            now: Local::now().into(),
            request,
            writer,
            body: Vec::new(),
            formatter,
            logger,
        }
    }

    /// Everything written so far.
    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

impl ResponseWriter for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.body.extend_from_slice(buf);
        self.writer.write(buf)
    }

    fn close(&mut self, response: &Response) -> io::Result<()> {
        let line = (self.formatter)(self.now, response, &self.request, &self.body);
        self.logger.log(&line);
        self.writer.close(response)
    }
}

/// Middleware writing one access log line per request.
///
/// ```rust
/// use tsu_log::{AccessLog, BoxedHandler, Request, Response, TracingLogger};
///
/// fn hello(res: &mut Response, _req: &Request) {
///     res.text("hello").unwrap();
/// }
///
/// let app = BoxedHandler::new(hello).layer(&AccessLog::combined(TracingLogger));
/// ```
#[derive(Clone)]
pub struct AccessLog {
    formatter: Formatter,
    logger: Arc<dyn AccessLogger>,
}

impl AccessLog {
    pub fn new(formatter: Formatter, logger: impl AccessLogger) -> Self {
        Self { formatter, logger: Arc::new(logger) }
    }

    /// Common Log Format.
    pub fn common(logger: impl AccessLogger) -> Self {
        Self::new(format::common, logger)
    }

    /// Combined Log Format.
    pub fn combined(logger: impl AccessLogger) -> Self {
        Self::new(format::combined, logger)
    }

    pub fn with_format(format: Format, logger: impl AccessLogger) -> Self {
        Self::new(format.formatter(), logger)
    }
}

impl Middleware for AccessLog {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        let formatter = self.formatter;
        let logger = Arc::clone(&self.logger);

        BoxedHandler::new(move |res: &mut Response, req: &Request| {
            let logger = Arc::clone(&logger);
            res.wrap_writer(|writer| Box::new(LogWriter::new(writer, req.clone(), formatter, logger)));
            next.call(res, req);
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use bytes::Bytes;
    use http::StatusCode;

    use super::*;

    #[derive(Clone, Default)]
    struct Lines(Arc<Mutex<Vec<String>>>);

    impl Lines {
        fn get(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }
    }

    impl AccessLogger for Lines {
        fn log(&self, line: &str) {
            self.0.lock().unwrap().push(line.to_owned());
        }
    }

    /// Accepts at most `limit` bytes per call, then fails once `budget` runs out.
    struct Stingy {
        limit: usize,
        budget: usize,
    }

    impl ResponseWriter for Stingy {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.budget == 0 {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "peer went away"));
            }
            let n = buf.len().min(self.limit).min(self.budget);
            self.budget -= n;
            Ok(n)
        }
    }

    /// Fails on close, like a connection torn down before the final flush.
    struct FailingClose;

    impl ResponseWriter for FailingClose {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            Ok(buf.len())
        }

        fn close(&mut self, _response: &Response) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset"))
        }
    }

    fn get(path: &str) -> Request {
        http::Request::builder().uri(path).body(Bytes::new()).unwrap().into()
    }

    fn writer(inner: impl ResponseWriter + 'static, formatter: Formatter, lines: &Lines) -> LogWriter {
        LogWriter::new(Box::new(inner), get("/"), formatter, Arc::new(lines.clone()))
    }

    fn body_formatter(_: DateTime<FixedOffset>, _: &Response, _: &Request, body: &[u8]) -> String {
        String::from_utf8_lossy(body).into_owned()
    }

    #[test]
    fn buffer_is_the_concatenation_of_writes_in_order() {
        let lines = Lines::default();
        let mut w = writer(Vec::new(), body_formatter, &lines);

        let chunks: [&[u8]; 6] = [b"GET", b" ", b"", b"/index.html", b" ", b"\x00\xff"];
        for chunk in chunks {
            assert_eq!(w.write(chunk).unwrap(), chunk.len());
        }
        assert_eq!(w.body(), b"GET /index.html \x00\xff");
    }

    #[test]
    fn line_is_emitted_at_close_not_per_write() {
        let lines = Lines::default();
        let mut w = writer(Vec::new(), body_formatter, &lines);

        w.write(b"one ").unwrap();
        w.write(b"two").unwrap();
        assert!(lines.get().is_empty());

        w.close(&Response::new(Vec::new())).unwrap();
        assert_eq!(lines.get(), ["one two"]);
    }

    #[test]
    fn inner_byte_count_and_error_pass_through() {
        let lines = Lines::default();
        let mut w = writer(Stingy { limit: 2, budget: 3 }, body_formatter, &lines);

        assert_eq!(w.write(b"abcd").unwrap(), 2);
        assert_eq!(w.write(b"cd").unwrap(), 1);
        let err = w.write(b"d").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
        assert_eq!(err.to_string(), "peer went away");

        // The log keeps what the caller asked to write, retries included.
        assert_eq!(w.body(), b"abcdcdd");
    }

    #[test]
    fn closing_over_a_writer_without_close_is_ok() {
        let lines = Lines::default();
        let mut w = writer(Vec::new(), body_formatter, &lines);
        assert!(w.close(&Response::new(Vec::new())).is_ok());
        assert_eq!(lines.get().len(), 1);
    }

    #[test]
    fn close_error_is_propagated_after_logging() {
        let lines = Lines::default();
        let mut w = writer(FailingClose, body_formatter, &lines);

        let err = w.close(&Response::new(Vec::new())).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionReset);
        assert_eq!(lines.get().len(), 1);
    }

    #[test]
    fn formatter_runs_once_per_request() {
        static CALLS: AtomicUsize = AtomicUsize::new(0);

        fn counting(_: DateTime<FixedOffset>, _: &Response, _: &Request, _: &[u8]) -> String {
            CALLS.fetch_add(1, Ordering::SeqCst);
            String::new()
        }

        fn handler(res: &mut Response, _req: &Request) {
            res.write_all(b"a").unwrap();
            res.write_all(b"b").unwrap();
        }

        let lines = Lines::default();
        let app = BoxedHandler::new(handler).layer(&AccessLog::new(counting, lines.clone()));

        let mut res = Response::new(Vec::new());
        app.call(&mut res, &get("/"));
        assert_eq!(CALLS.load(Ordering::SeqCst), 0);

        res.close().unwrap();
        res.close().unwrap();
        assert_eq!(CALLS.load(Ordering::SeqCst), 1);
        assert_eq!(lines.get().len(), 1);
    }

    #[test]
    fn get_root_logs_one_common_line() {
        fn noop(_res: &mut Response, _req: &Request) {}

        let lines = Lines::default();
        let app = BoxedHandler::new(noop).layer(&AccessLog::common(lines.clone()));

        let mut res = Response::new(Vec::new());
        app.call(&mut res, &get("/"));
        res.close().unwrap();

        let logged = lines.get();
        assert_eq!(logged.len(), 1);
        let line = &logged[0];
        assert!(line.starts_with("- - - ["), "{line}");
        assert!(line.ends_with(r#"] "GET / HTTP/1.1" 200 0"#), "{line}");

        // [dd/Mon/yyyy:HH:MM:SS +zzzz]
        let open = line.find('[').unwrap();
        let close = line.find(']').unwrap();
        let stamp = &line[open + 1..close];
        assert!(DateTime::parse_from_str(stamp, format::TIMESTAMP_FORMAT).is_ok(), "{stamp}");
    }

    #[test]
    fn body_reaches_the_client_and_the_log() {
        fn hello(res: &mut Response, _req: &Request) {
            res.set_status(StatusCode::CREATED);
            res.text("hello").unwrap();
        }

        let lines = Lines::default();
        let app = BoxedHandler::new(hello).layer(&AccessLog::new(body_formatter, lines.clone()));

        let client = Arc::new(Mutex::new(Vec::new()));
        struct Shared(Arc<Mutex<Vec<u8>>>);
        impl ResponseWriter for Shared {
            fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
                self.0.lock().unwrap().extend_from_slice(buf);
                Ok(buf.len())
            }
        }

        let mut res = Response::new(Shared(Arc::clone(&client)));
        app.call(&mut res, &get("/"));
        res.close().unwrap();

        assert_eq!(*client.lock().unwrap(), b"hello");
        assert_eq!(lines.get(), ["hello"]);
    }

    #[test]
    fn sequential_requests_log_independently() {
        fn stamp(now: DateTime<FixedOffset>, _: &Response, req: &Request, body: &[u8]) -> String {
            format!("{} {} {}", now.to_rfc3339(), req.path(), body.len())
        }

        fn echo_path(res: &mut Response, req: &Request) {
            res.write_all(req.path().as_bytes()).unwrap();
        }

        let lines = Lines::default();
        let app = BoxedHandler::new(echo_path).layer(&AccessLog::new(stamp, lines.clone()));

        for path in ["/first", "/second/path"] {
            let mut res = Response::new(Vec::new());
            app.call(&mut res, &get(path));
            res.close().unwrap();
        }

        let logged = lines.get();
        assert_eq!(logged.len(), 2);
        let (first, second): (Vec<_>, Vec<_>) =
            (logged[0].split(' ').collect(), logged[1].split(' ').collect());
        assert_eq!(&first[1..], ["/first", "6"]);
        assert_eq!(&second[1..], ["/second/path", "12"]);

        let t1 = DateTime::parse_from_rfc3339(first[0]).unwrap();
        let t2 = DateTime::parse_from_rfc3339(second[0]).unwrap();
        assert!(t1 <= t2);
    }

    #[test]
    fn with_format_picks_the_preset() {
        fn noop(_res: &mut Response, _req: &Request) {}

        let lines = Lines::default();
        let app = BoxedHandler::new(noop).layer(&AccessLog::with_format(Format::Combined, lines.clone()));

        let mut res = Response::new(Vec::new());
        app.call(&mut res, &get("/"));
        res.close().unwrap();

        assert!(lines.get()[0].ends_with(r#" 200 0 "" """#));
    }
}
