//! Incoming HTTP request type.

use std::collections::HashMap;

use bytes::Bytes;
use http::{Extensions, HeaderMap};

use crate::method::Method;

/// An incoming HTTP request.
///
/// Built by a [`Factory`](crate::Factory); the router fills in path
/// parameters after matching. Middleware can attach typed values for
/// handlers further down the chain through [`extensions_mut`](Self::extensions_mut).
#[derive(Debug)]
pub struct Request {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) query: Option<String>,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Bytes,
    pub(crate) params: HashMap<String, String>,
    pub(crate) extensions: Extensions,
}

impl Request {
    pub(crate) fn new(
        method: Method,
        path: String,
        query: Option<String>,
        headers: HeaderMap,
        body: Bytes,
    ) -> Self {
        Self {
            method,
            path,
            query,
            headers,
            body,
            params: HashMap::new(),
            extensions: Extensions::new(),
        }
    }

    pub fn method(&self) -> Method { self.method }
    pub fn path(&self) -> &str { &self.path }
    pub fn query(&self) -> Option<&str> { self.query.as_deref() }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn headers_mut(&mut self) -> &mut HeaderMap { &mut self.headers }
    pub fn body(&self) -> &[u8] { &self.body }
    pub fn extensions(&self) -> &Extensions { &self.extensions }
    pub fn extensions_mut(&mut self) -> &mut Extensions { &mut self.extensions }

    /// Case-insensitive header lookup. Non-UTF-8 values read as `None`.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/albums/{name}`, `req.param("name")` on `/albums/symbolic`
    /// returns `Some("symbolic")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub(crate) fn set_params(&mut self, params: HashMap<String, String>) {
        self.params = params;
    }
}
