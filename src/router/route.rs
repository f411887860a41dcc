//! Route and group definitions.

use std::fmt;
use std::sync::Arc;

use crate::handler::{Endpoint, IntoEndpoint};
use crate::method::Method;
use crate::middleware::{BoxedMiddleware, Middleware};

/// A single route: pattern, endpoint, optional name and method.
///
/// `method` is `None` for routes that answer any method.
#[derive(Clone)]
pub struct Route {
    pub(crate) method: Option<Method>,
    pub(crate) pattern: String,
    pub(crate) endpoint: Endpoint,
    pub(crate) name: Option<String>,
    pub(crate) middleware: Vec<BoxedMiddleware>,
}

macro_rules! method_route {
    ($fn_name:ident, $method:ident) => {
        #[doc = concat!("A route answering only `", stringify!($method), "` requests.")]
        pub fn $fn_name<'a>(
            pattern: &str,
            endpoint: impl IntoEndpoint,
            name: impl Into<Option<&'a str>>,
        ) -> Self {
            Self::with_method(Some(Method::$method), pattern, endpoint, name)
        }
    };
}

impl Route {
    /// A route answering any method.
    pub fn new<'a>(pattern: &str, endpoint: impl IntoEndpoint, name: impl Into<Option<&'a str>>) -> Self {
        Self::with_method(None, pattern, endpoint, name)
    }

    method_route!(get, Get);
    method_route!(post, Post);
    method_route!(put, Put);
    method_route!(patch, Patch);
    method_route!(delete, Delete);
    method_route!(head, Head);
    method_route!(options, Options);

    pub(crate) fn with_method<'a>(
        method: Option<Method>,
        pattern: &str,
        endpoint: impl IntoEndpoint,
        name: impl Into<Option<&'a str>>,
    ) -> Self {
        Self {
            method,
            pattern: pattern.to_owned(),
            endpoint: endpoint.into_endpoint(),
            name: name.into().map(str::to_owned),
            middleware: Vec::new(),
        }
    }

    /// Attaches middleware that runs for this route only, inside any
    /// app-level and group middleware.
    pub fn middleware(mut self, m: impl Middleware) -> Self {
        self.middleware.push(Arc::new(m));
        self
    }

    pub fn method(&self) -> Option<Method> { self.method }
    pub fn pattern(&self) -> &str { &self.pattern }
    pub fn name(&self) -> Option<&str> { self.name.as_deref() }
    pub fn endpoint(&self) -> &Endpoint { &self.endpoint }
    pub fn get_middleware(&self) -> &[BoxedMiddleware] { &self.middleware }
}

/// Routes sharing a path prefix, a name prefix and middleware.
///
/// ```rust
/// use hearth::{Group, Route};
///
/// let mut group = Group::new("/albums", "albums:");
/// group.add_route(Route::get("/{name}", "AlbumController::show", "name"));
/// ```
///
/// Registered with the router, the child above becomes `GET /albums/{name}`
/// named `albums:name`.
#[derive(Default)]
pub struct Group {
    prefix: String,
    name_prefix: String,
    routes: Vec<Route>,
    middleware: Vec<BoxedMiddleware>,
}

macro_rules! method_group_route {
    ($fn_name:ident) => {
        pub fn $fn_name<'a>(
            &mut self,
            pattern: &str,
            endpoint: impl IntoEndpoint,
            name: impl Into<Option<&'a str>>,
        ) -> &mut Self {
            self.add_route(Route::$fn_name(pattern, endpoint, name))
        }
    };
}

impl Group {
    pub fn new<'a>(prefix: &str, name_prefix: impl Into<Option<&'a str>>) -> Self {
        Self {
            prefix: prefix.to_owned(),
            name_prefix: name_prefix.into().unwrap_or_default().to_owned(),
            routes: Vec::new(),
            middleware: Vec::new(),
        }
    }

    pub fn add_route(&mut self, route: Route) -> &mut Self {
        self.routes.push(route);
        self
    }

    /// Adds an any-method child route.
    pub fn route<'a>(
        &mut self,
        pattern: &str,
        endpoint: impl IntoEndpoint,
        name: impl Into<Option<&'a str>>,
    ) -> &mut Self {
        self.add_route(Route::new(pattern, endpoint, name))
    }

    method_group_route!(get);
    method_group_route!(post);
    method_group_route!(put);
    method_group_route!(patch);
    method_group_route!(delete);
    method_group_route!(head);
    method_group_route!(options);

    /// Attaches middleware applied to every route of the group.
    pub fn middleware(&mut self, m: impl Middleware) -> &mut Self {
        self.middleware.push(Arc::new(m));
        self
    }

    pub fn prefix(&self) -> &str { &self.prefix }
    pub fn name_prefix(&self) -> &str { &self.name_prefix }
    pub fn routes(&self) -> &[Route] { &self.routes }

    /// Flattens the group into routes with prefixed patterns and names.
    /// Group middleware runs before each route's own middleware.
    pub(crate) fn into_routes(self) -> impl Iterator<Item = Route> {
        let Self { prefix, name_prefix, routes, middleware } = self;
        routes.into_iter().map(move |route| {
            let mut chain = middleware.clone();
            chain.extend(route.middleware);
            Route {
                method: route.method,
                pattern: format!("{prefix}{}", route.pattern),
                endpoint: route.endpoint,
                name: route.name.map(|n| format!("{name_prefix}{n}")),
                middleware: chain,
            }
        })
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("pattern", &self.pattern)
            .field("endpoint", &self.endpoint)
            .field("name", &self.name)
            .field("middleware", &self.middleware.len())
            .finish()
    }
}

impl fmt::Debug for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Group")
            .field("prefix", &self.prefix)
            .field("name_prefix", &self.name_prefix)
            .field("routes", &self.routes)
            .field("middleware", &self.middleware.len())
            .finish()
    }
}
