//! Handler and middleware traits.
//!
//! A handler is anything callable as `Fn(&mut Response, &Request)`. The
//! server stores one type-erased [`BoxedHandler`] and calls it once per
//! request. Middleware takes the next handler in the chain and returns a new
//! handler that runs around it:
//!
//! ```text
//! fn hello(res: &mut Response, req: &Request) { … }   ← user writes this
//!        ↓ BoxedHandler::new(hello)
//! Arc::new(hello)                                     ← one heap allocation, at startup
//!        ↓ .layer(&AccessLog::common(logger))
//! BoxedHandler(Arc<closure capturing next>)           ← the middleware's handler
//!        ↓
//! handler.call(&mut res, &req)  at request time       ← one virtual call per layer
//! ```

use std::sync::Arc;

use crate::request::Request;
use crate::response::Response;

/// Implemented for every valid request handler.
///
/// You rarely implement this yourself: it is satisfied by any function or
/// closure with the signature
///
/// ```text
/// fn name(res: &mut Response, req: &Request)
/// ```
///
/// Closures need their argument types spelled out so that they accept
/// references of any lifetime: `|res: &mut Response, req: &Request| { … }`.
///
/// Handlers are synchronous and the server calls them directly on a tokio
/// worker thread. They must not block: move slow or blocking work out of
/// the request path, for instance with `tokio::task::spawn_blocking` before
/// the response is built.
pub trait Handler: Send + Sync + 'static {
    fn call(&self, res: &mut Response, req: &Request);
}

impl<F> Handler for F
where
    F: Fn(&mut Response, &Request) + Send + Sync + 'static,
{
    fn call(&self, res: &mut Response, req: &Request) {
        self(res, req)
    }
}

/// A type-erased handler shared across concurrent requests.
///
/// Cloning is one atomic reference-count increment.
#[derive(Clone)]
pub struct BoxedHandler(Arc<dyn Handler>);

impl BoxedHandler {
    pub fn new(handler: impl Handler) -> Self {
        Self(Arc::new(handler))
    }

    /// Wraps `self` in `middleware`. Layers added later run first.
    pub fn layer(self, middleware: &impl Middleware) -> Self {
        middleware.wrap(self)
    }
}

impl Handler for BoxedHandler {
    fn call(&self, res: &mut Response, req: &Request) {
        self.0.call(res, req)
    }
}

/// Runs around the next handler in the chain.
///
/// `wrap` is called once, when the chain is assembled. The handler it
/// returns is called per request and must not keep per-request state
/// between calls.
pub trait Middleware: Send + Sync + 'static {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler;
}
