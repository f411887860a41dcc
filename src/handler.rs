//! Handler trait, type erasure and named endpoints.
//!
//! # How handlers are stored
//!
//! The router holds handlers of different types in one table, so each one is
//! hidden behind a trait object:
//!
//! ```text
//! fn hello(req: Request) -> &'static str { … }   ← user writes this
//!        ↓ app.get("/", hello, None)
//! hello.into_boxed_handler()                      ← Handler blanket impl
//!        ↓
//! Arc::new(FnHandler(hello))                      ← stored as BoxedHandler
//!        ↓
//! handler.call(req)  at request time              ← one vtable dispatch
//! ```
//!
//! A route may instead name its handler with a `"Type::method"` string. The
//! name is looked up in the [`Handlers`] table when the route is matched, so
//! routes can be declared before (or without knowing) the code serving them.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::Error;
use crate::request::Request;
use crate::response::{Responder, Response};

/// Internal dispatch interface.
///
/// `#[doc(hidden)] pub` because it appears in the return type of the public
/// `Handler` trait's `into_boxed_handler` method.
#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, req: Request) -> Result<Response, Error>;
}

/// A type-erased handler shared across requests.
#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

/// Implemented for every valid route handler.
///
/// Automatically satisfied for any function or closure with the signature
/// `Fn(Request) -> impl Responder`. The trait is sealed.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

mod private {
    pub trait Sealed {}
}

impl<F, R> private::Sealed for F
where
    F: Fn(Request) -> R + Send + Sync + 'static,
    R: Responder,
{
}

impl<F, R> Handler for F
where
    F: Fn(Request) -> R + Send + Sync + 'static,
    R: Responder,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

struct FnHandler<F>(F);

impl<F, R> ErasedHandler for FnHandler<F>
where
    F: Fn(Request) -> R + Send + Sync,
    R: Responder,
{
    fn call(&self, req: Request) -> Result<Response, Error> {
        (self.0)(req).respond()
    }
}

// ── Endpoint ──────────────────────────────────────────────────────────────────

/// The target of a route: a callable, or the id of one registered with
/// [`App::handler`](crate::App::handler).
#[derive(Clone)]
pub enum Endpoint {
    Callable(BoxedHandler),
    Named(String),
}

impl std::fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Callable(_) => f.write_str("Endpoint::Callable"),
            Self::Named(id) => write!(f, "Endpoint::Named({id:?})"),
        }
    }
}

/// Conversion into an [`Endpoint`]: strings name a handler, anything
/// implementing [`Handler`] is used directly.
pub trait IntoEndpoint {
    fn into_endpoint(self) -> Endpoint;
}

impl IntoEndpoint for Endpoint {
    fn into_endpoint(self) -> Endpoint { self }
}

impl IntoEndpoint for &str {
    fn into_endpoint(self) -> Endpoint { Endpoint::Named(self.to_owned()) }
}

impl IntoEndpoint for String {
    fn into_endpoint(self) -> Endpoint { Endpoint::Named(self) }
}

impl<H: Handler> IntoEndpoint for H {
    fn into_endpoint(self) -> Endpoint { Endpoint::Callable(self.into_boxed_handler()) }
}

// ── Handlers ──────────────────────────────────────────────────────────────────

/// Table of handlers addressable by `"Type::method"` id.
#[derive(Default)]
pub struct Handlers {
    table: HashMap<String, BoxedHandler>,
}

impl Handlers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` under `id`, replacing any previous entry.
    pub fn insert(&mut self, id: impl Into<String>, handler: impl Handler) {
        self.table.insert(id.into(), handler.into_boxed_handler());
    }

    pub fn contains(&self, id: &str) -> bool {
        self.table.contains_key(id)
    }

    /// Resolves an endpoint to something callable.
    pub(crate) fn resolve(&self, endpoint: &Endpoint) -> Result<BoxedHandler, Error> {
        match endpoint {
            Endpoint::Callable(h) => Ok(Arc::clone(h)),
            Endpoint::Named(id) => self
                .table
                .get(id)
                .map(Arc::clone)
                .ok_or_else(|| Error::UnresolvedHandler(id.clone())),
        }
    }
}

impl std::fmt::Debug for Handlers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.table.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::{DefaultFactory, Factory};
    use crate::method::Method;

    fn text_view(_req: Request) -> &'static str {
        "text"
    }

    #[test]
    fn named_endpoint_resolves_through_table() {
        let mut handlers = Handlers::new();
        handlers.insert("TestController::text_view", text_view);

        let endpoint = "TestController::text_view".into_endpoint();
        let handler = handlers.resolve(&endpoint).unwrap();
        let req = DefaultFactory.request(Method::Get, "/").unwrap();

        assert_eq!(handler.call(req).unwrap().body(), b"text");
    }

    #[test]
    fn unknown_name_is_unresolved() {
        let handlers = Handlers::new();
        let err = handlers.resolve(&"Missing::view".into_endpoint()).err().unwrap();
        assert!(matches!(err, Error::UnresolvedHandler(id) if id == "Missing::view"));
    }
}
