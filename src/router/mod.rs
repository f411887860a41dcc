//! Radix-tree request router.
//!
//! One tree per HTTP method plus one for routes that answer any method.
//! O(path-length) lookup via [`matchit`]. Routes and static directories can
//! be named; [`Router::route_url`] and [`Router::static_url`] turn names back
//! into paths.
//!
//! The router is registered into the [`Registry`](crate::Registry) as the
//! same `Arc` the app dispatches through, so handlers can resolve it to build
//! links. Its tables sit behind a read/write lock for that reason; writes only
//! happen during setup.

mod assets;
mod route;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use matchit::Router as MatchitRouter;
use parking_lot::RwLock;
use thiserror::Error;
use tracing::debug;

use crate::error::HttpError;
use crate::handler::IntoEndpoint;
use crate::method::Method;

pub(crate) use assets::serve_file;
pub use route::{Group, Route};

#[derive(Debug, Error)]
pub enum RouterError {
    #[error("no route named `{0}`")]
    UnknownRoute(String),

    #[error("route `{route}` needs parameter `{param}`")]
    MissingParam { route: String, param: String },

    #[error("no static route named `{0}`")]
    UnknownStatic(String),
}

/// Outcome of a successful lookup.
#[derive(Debug)]
pub enum Match {
    Route { route: Arc<Route>, params: HashMap<String, String> },
    Static(PathBuf),
}

#[derive(Debug)]
struct StaticRoute {
    prefix: String,
    root: PathBuf,
}

#[derive(Default)]
struct Tables {
    routes: Vec<Arc<Route>>,
    trees: HashMap<Option<Method>, MatchitRouter<usize>>,
    names: HashMap<String, usize>,
    statics: Vec<StaticRoute>,
    static_names: HashMap<String, usize>,
}

/// The application router.
#[derive(Default)]
pub struct Router {
    tables: RwLock<Tables>,
}

macro_rules! method_helper {
    ($fn_name:ident, $method:ident) => {
        #[doc = concat!("Registers a `", stringify!($method), "` route.")]
        pub fn $fn_name<'a>(
            &self,
            pattern: &str,
            endpoint: impl IntoEndpoint,
            name: impl Into<Option<&'a str>>,
        ) {
            self.add_route(Route::with_method(Some(Method::$method), pattern, endpoint, name));
        }
    };
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a pre-built route.
    ///
    /// # Panics
    ///
    /// Panics if the pattern is rejected by the radix tree (conflicting or
    /// malformed) or the route's name is already taken. Both are setup bugs.
    pub fn add_route(&self, route: Route) {
        let mut tables = self.tables.write();
        let index = tables.routes.len();

        if let Some(name) = &route.name {
            if tables.names.contains_key(name) {
                panic!("duplicate route name `{name}`");
            }
            tables.names.insert(name.clone(), index);
        }

        let pattern = route.pattern.clone();
        tables
            .trees
            .entry(route.method)
            .or_default()
            .insert(pattern.as_str(), index)
            .unwrap_or_else(|e| panic!("invalid route `{pattern}`: {e}"));

        debug!(
            method = route.method.map_or("*", Method::as_str),
            pattern = %pattern,
            name = route.name.as_deref().unwrap_or(""),
            "route added"
        );
        tables.routes.push(Arc::new(route));
    }

    /// Registers every route of `group`, prefixed.
    pub fn add_group(&self, group: Group) {
        for route in group.into_routes() {
            self.add_route(route);
        }
    }

    /// Registers a route answering any method.
    pub fn route<'a>(&self, pattern: &str, endpoint: impl IntoEndpoint, name: impl Into<Option<&'a str>>) {
        self.add_route(Route::new(pattern, endpoint, name));
    }

    method_helper!(get, Get);
    method_helper!(post, Post);
    method_helper!(put, Put);
    method_helper!(patch, Patch);
    method_helper!(delete, Delete);
    method_helper!(head, Head);
    method_helper!(options, Options);

    /// Maps `prefix` to the directory `root`. Unnamed mappings are looked up
    /// by their prefix. The directory is not touched until a request needs it.
    pub fn static_route<'a>(&self, prefix: &str, root: impl AsRef<Path>, name: impl Into<Option<&'a str>>) {
        let mut tables = self.tables.write();
        let prefix = prefix.trim_end_matches('/').to_owned();
        let name = name.into().map_or_else(|| prefix.clone(), str::to_owned);
        let index = tables.statics.len();

        debug!(prefix = %prefix, name = %name, "static route added");
        tables.static_names.insert(name, index);
        tables.statics.push(StaticRoute { prefix, root: root.as_ref().to_path_buf() });
    }

    /// Finds what serves `method path`.
    ///
    /// Paths that are not absolute or contain control characters are a
    /// [`HttpError::BadRequest`]; a path matched only under other methods is
    /// [`HttpError::MethodNotAllowed`]; otherwise no match is
    /// [`HttpError::NotFound`].
    pub fn match_request(&self, method: Method, path: &str) -> Result<Match, HttpError> {
        if !path.starts_with('/') || path.chars().any(char::is_control) {
            return Err(HttpError::BadRequest);
        }

        let tables = self.tables.read();

        for key in [Some(method), None] {
            if let Some(found) = tables.trees.get(&key).and_then(|tree| tree.at(path).ok()) {
                let route = Arc::clone(&tables.routes[*found.value]);
                let params = found.params.iter()
                    .map(|(k, v)| (k.to_owned(), v.to_owned()))
                    .collect();
                return Ok(Match::Route { route, params });
            }
        }

        if matches!(method, Method::Get | Method::Head) {
            if let Some(file) = assets::resolve(&tables.statics, path)? {
                return Ok(Match::Static(file));
            }
        }

        let elsewhere = tables.trees.iter()
            .any(|(key, tree)| *key != Some(method) && tree.at(path).is_ok());
        if elsewhere {
            Err(HttpError::MethodNotAllowed)
        } else {
            Err(HttpError::NotFound)
        }
    }

    /// Builds the path of the route named `name`, substituting `{param}`
    /// placeholders (and `{*catch_all}` segments) from `params`.
    pub fn route_url(&self, name: &str, params: &[(&str, &str)]) -> Result<String, RouterError> {
        let tables = self.tables.read();
        let index = tables.names.get(name).ok_or_else(|| RouterError::UnknownRoute(name.to_owned()))?;
        fill_pattern(name, &tables.routes[*index].pattern, params)
    }

    /// Builds the public URL of `file` below the static route named `name`.
    pub fn static_url(&self, name: &str, file: &str) -> Result<String, RouterError> {
        let tables = self.tables.read();
        let index = tables.static_names.get(name).ok_or_else(|| RouterError::UnknownStatic(name.to_owned()))?;
        Ok(format!("{}/{}", tables.statics[*index].prefix, file.trim_start_matches('/')))
    }

    /// Number of registered routes.
    pub fn len(&self) -> usize {
        self.tables.read().routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tables = self.tables.read();
        f.debug_struct("Router")
            .field("routes", &tables.routes)
            .field("statics", &tables.statics)
            .finish()
    }
}

/// Substitutes placeholders in a matchit pattern. `{{` and `}}` are literal braces.
fn fill_pattern(route: &str, pattern: &str, params: &[(&str, &str)]) -> Result<String, RouterError> {
    let mut url = String::with_capacity(pattern.len());
    let mut chars = pattern.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                url.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                url.push('}');
            }
            '{' => {
                let key: String = chars.by_ref().take_while(|&c| c != '}').collect();
                let key = key.trim_start_matches('*');
                let value = params.iter()
                    .find(|(k, _)| *k == key)
                    .map(|(_, v)| *v)
                    .ok_or_else(|| RouterError::MissingParam {
                        route: route.to_owned(),
                        param: key.to_owned(),
                    })?;
                url.push_str(value);
            }
            other => url.push(other),
        }
    }

    Ok(url)
}
