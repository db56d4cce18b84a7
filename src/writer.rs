//! The response output capability.
//!
//! A [`Response`] does not own a socket. It owns a [`ResponseWriter`], and
//! middleware is free to replace that writer with one that wraps it. Every
//! writer can be closed: writers with nothing to release simply keep the
//! default no-op [`close`](ResponseWriter::close).

use std::io;

use crate::response::Response;

/// Destination for the bytes of a response body.
///
/// `write` follows [`std::io::Write::write`]: it returns how many bytes were
/// accepted, which may be fewer than given.
///
/// `close` runs once, after the handler chain has finished writing. It
/// receives the finished [`Response`] so that decorators can inspect the
/// final status and headers.
pub trait ResponseWriter: Send {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;

    fn close(&mut self, _response: &Response) -> io::Result<()> {
        Ok(())
    }
}

/// In-memory body. Handy in tests and for hosts that send the body in one go.
impl ResponseWriter for Vec<u8> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.extend_from_slice(buf);
        Ok(buf.len())
    }
}

/// Discards everything.
impl ResponseWriter for io::Sink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(buf.len())
    }
}

impl<W: ResponseWriter + ?Sized> ResponseWriter for Box<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        (**self).write(buf)
    }

    fn close(&mut self, response: &Response) -> io::Result<()> {
        (**self).close(response)
    }
}
