//! Middleware layer.
//!
//! Middleware intercepts requests and responses and is the right place for
//! cross-cutting concerns: tracing, request-id injection, header inspection.
//!
//! A chain `[m1, m2, m3]` around handler `h` executes as
//!
//! ```text
//! m1 → m2 → m3 → h → m3 → m2 → m1
//! ```
//!
//! Each middleware receives the request and a [`Next`] standing for the rest
//! of the chain. Calling [`Next::run`] hands the request inward; returning
//! without calling it short-circuits everything inside.

use std::sync::Arc;

use crate::error::Error;
use crate::handler::{BoxedHandler, ErasedHandler};
use crate::request::Request;
use crate::response::Response;

/// A request/response interceptor.
///
/// Implemented for any `Fn(Request, Next<'_>) -> Result<Response, Error>`,
/// so closures qualify:
///
/// ```rust
/// use hearth::{Error, Next, Request, Response};
///
/// let powered_by = |req: Request, next: Next<'_>| -> Result<Response, Error> {
///     Ok(next.run(req)?.with_header("x-powered-by", "hearth"))
/// };
/// # let _ = powered_by;
/// ```
pub trait Middleware: Send + Sync + 'static {
    fn process(&self, req: Request, next: Next<'_>) -> Result<Response, Error>;
}

impl<F> Middleware for F
where
    F: Fn(Request, Next<'_>) -> Result<Response, Error> + Send + Sync + 'static,
{
    fn process(&self, req: Request, next: Next<'_>) -> Result<Response, Error> {
        self(req, next)
    }
}

/// Shared, type-erased middleware.
pub type BoxedMiddleware = Arc<dyn Middleware>;

/// The remainder of a middleware chain.
///
/// Walking the slice one element per call is the right fold of the
/// middleware sequence over the endpoint, without building closures.
pub struct Next<'a> {
    chain: &'a [BoxedMiddleware],
    endpoint: &'a BoxedHandler,
}

impl<'a> Next<'a> {
    pub(crate) fn new(chain: &'a [BoxedMiddleware], endpoint: &'a BoxedHandler) -> Self {
        Self { chain, endpoint }
    }

    /// Invokes the next middleware, or the endpoint once the chain is exhausted.
    pub fn run(self, req: Request) -> Result<Response, Error> {
        match self.chain.split_first() {
            Some((head, rest)) => head.process(req, Next { chain: rest, endpoint: self.endpoint }),
            None => self.endpoint.call(req),
        }
    }
}

impl std::fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Next").field("remaining", &self.chain.len()).finish()
    }
}
