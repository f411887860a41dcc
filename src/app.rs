//! The application object: setup surface and dispatch path.
//!
//! Setup happens through `&mut self` helpers (register services, add
//! routes, append middleware, load plugins). Dispatch happens through
//! `&self`: [`App::handle`] turns a request into a response, and
//! [`App::run`] does the same and writes the response to stdout.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use tracing::{Dispatch, debug, debug_span, error, info};

use crate::config::Config;
use crate::error::{Error, HttpError};
use crate::factory::Factory;
use crate::handler::{Handler, Handlers, IntoEndpoint};
use crate::logger::Logger;
use crate::method::Method;
use crate::middleware::{BoxedMiddleware, Middleware, Next};
use crate::plugin::Plugin;
use crate::registry::{Container, Id, Registration, Registry, RegistryError};
use crate::request::Request;
use crate::response::{Framing, Response};
use crate::router::{Group, Match, Route, Router, serve_file};

/// An HTTP application.
///
/// ```rust
/// use hearth::{App, Config, DefaultFactory, Factory, Method, Request};
///
/// let mut app = App::create(DefaultFactory, Config::default());
/// app.get("/albums/{name}", |req: Request| format!("album {}", req.param("name").unwrap_or("")), "album");
///
/// let req = app.factory().request(Method::Get, "/albums/symbolic").unwrap();
/// let res = app.handle(req).unwrap();
/// assert_eq!(res.body(), b"album symbolic");
/// assert_eq!(app.router().route_url("album", &[("name", "x")]).unwrap(), "/albums/x");
/// ```
pub struct App {
    registry: Registry,
    router: Arc<Router>,
    factory: Arc<dyn Factory>,
    config: Arc<Config>,
    middleware: Vec<BoxedMiddleware>,
    handlers: Handlers,
    logger: Option<Dispatch>,
}

macro_rules! method_helper {
    ($fn_name:ident) => {
        #[doc = concat!("Registers a route through [`Router::", stringify!($fn_name), "`].")]
        pub fn $fn_name<'a>(
            &mut self,
            pattern: &str,
            endpoint: impl IntoEndpoint,
            name: impl Into<Option<&'a str>>,
        ) -> &mut Self {
            self.router.$fn_name(pattern, endpoint, name);
            self
        }
    };
}

impl App {
    /// Builds an app around `factory` and `config`.
    ///
    /// The registry starts out holding the config (as `Config`), the router
    /// (as `Router`), and the factory both as `Arc<dyn Factory>` and as its
    /// concrete type.
    pub fn create<F: Factory>(factory: F, config: Config) -> Self {
        Self::build(Registry::new(), factory, config)
    }

    /// Like [`create`](Self::create), with `container` backing the registry
    /// for ids it does not hold itself.
    pub fn with_container<F: Factory>(factory: F, config: Config, container: impl Container + 'static) -> Self {
        Self::build(Registry::with_container(container), factory, config)
    }

    fn build<F: Factory>(mut registry: Registry, factory: F, config: Config) -> Self {
        let config = Arc::new(config);
        let router = Arc::new(Router::new());
        let concrete = Arc::new(factory);
        let factory: Arc<dyn Factory> = concrete.clone();

        registry.add_arc(Id::of::<Config>(), Arc::clone(&config));
        registry.add_arc(Id::of::<Router>(), Arc::clone(&router));
        registry.add_arc(Id::of::<F>(), concrete);
        registry.add(Id::of::<Arc<dyn Factory>>(), Arc::clone(&factory));

        debug!(app = %config.app, env = %config.env, "app created");
        Self {
            registry,
            router,
            factory,
            config,
            middleware: Vec::new(),
            handlers: Handlers::new(),
            logger: None,
        }
    }

    pub fn registry(&self) -> &Registry { &self.registry }
    pub fn router(&self) -> &Router { &self.router }
    pub fn factory(&self) -> &dyn Factory { self.factory.as_ref() }
    pub fn config(&self) -> &Config { &self.config }

    // ── Registry helpers ──────────────────────────────────────────────────────

    /// Registers `value` under `id`.
    pub fn register<T>(&mut self, id: impl Into<Id>, value: T) -> Registration<'_>
    where
        T: std::any::Any + Send + Sync,
    {
        self.registry.add(id, value)
    }

    /// Registers a lazily invoked factory under `id`.
    pub fn register_factory<T, F>(&mut self, id: impl Into<Id>, factory: F) -> Registration<'_>
    where
        T: std::any::Any + Send + Sync,
        F: Fn(&Registry) -> Result<T, RegistryError> + Send + Sync + 'static,
    {
        self.registry.add_factory(id, factory)
    }

    pub fn alias(&mut self, id: impl Into<Id>, target: impl Into<Id>) -> Registration<'_> {
        self.registry.alias(id, target)
    }

    /// Makes `handler` reachable from routes naming `id` (e.g. `"AlbumController::show"`).
    pub fn handler(&mut self, id: impl Into<String>, handler: impl Handler) -> &mut Self {
        self.handlers.insert(id, handler);
        self
    }

    // ── Routing helpers ───────────────────────────────────────────────────────

    /// Registers a route answering any method.
    pub fn route<'a>(
        &mut self,
        pattern: &str,
        endpoint: impl IntoEndpoint,
        name: impl Into<Option<&'a str>>,
    ) -> &mut Self {
        self.router.route(pattern, endpoint, name);
        self
    }

    method_helper!(get);
    method_helper!(post);
    method_helper!(put);
    method_helper!(patch);
    method_helper!(delete);
    method_helper!(head);
    method_helper!(options);

    pub fn add_route(&mut self, route: Route) -> &mut Self {
        self.router.add_route(route);
        self
    }

    pub fn add_group(&mut self, group: Group) -> &mut Self {
        self.router.add_group(group);
        self
    }

    /// Builds a group under `prefix`, lets `build` fill it, then registers it.
    pub fn group<'a>(
        &mut self,
        prefix: &str,
        build: impl FnOnce(&mut Group),
        name_prefix: impl Into<Option<&'a str>>,
    ) -> &mut Self {
        let mut group = Group::new(prefix, name_prefix);
        build(&mut group);
        self.add_group(group)
    }

    /// Hands the router to `build` for bulk registration.
    pub fn routes(&mut self, build: impl FnOnce(&Router)) -> &mut Self {
        build(&self.router);
        self
    }

    pub fn static_route<'a>(
        &mut self,
        prefix: &str,
        root: impl AsRef<Path>,
        name: impl Into<Option<&'a str>>,
    ) -> &mut Self {
        self.router.static_route(prefix, root, name);
        self
    }

    // ── Middleware, logger, plugins ───────────────────────────────────────────

    /// Appends `m`. The first middleware added is the outermost.
    pub fn middleware(&mut self, m: impl Middleware) -> &mut Self {
        self.middleware.push(Arc::new(m));
        self
    }

    pub fn get_middleware(&self) -> &[BoxedMiddleware] {
        &self.middleware
    }

    /// Registers the app logger under `Dispatch`'s type id.
    ///
    /// A factory is invoked here, once; the registry only ever holds the
    /// resulting instance.
    pub fn logger(&mut self, logger: Logger) -> &mut Self {
        let dispatch = logger.into_dispatch();
        self.registry.add(Id::of::<Dispatch>(), dispatch.clone());
        self.logger = Some(dispatch);
        self
    }

    /// Runs `plugin.load(self)`. Errors propagate unchanged.
    pub fn load(&mut self, plugin: impl Plugin) -> Result<&mut Self, Error> {
        plugin.load(self)?;
        info!(plugin = std::any::type_name_of_val(&plugin), "plugin loaded");
        Ok(self)
    }

    // ── Dispatch ──────────────────────────────────────────────────────────────

    /// Routes `req` through the middleware chain and returns the response.
    ///
    /// [`HttpError`]s, whether from routing or raised by handlers and
    /// middleware, become their status response. Any other error is returned.
    pub fn handle(&self, req: Request) -> Result<Response, Error> {
        match &self.logger {
            Some(dispatch) => tracing::dispatcher::with_default(dispatch, || self.dispatch(req)),
            None => self.dispatch(req),
        }
    }

    /// [`handle`](Self::handle)s `req` and writes the response to stdout.
    pub fn run(&self, req: Request) -> Result<(), Error> {
        let stdout = std::io::stdout();
        self.run_to(req, &mut stdout.lock())
    }

    /// [`handle`](Self::handle)s `req` and writes the response to `out` as
    /// HTTP/1.1. Nothing is written when dispatch fails with a non-HTTP
    /// error. Answers to `HEAD` carry headers only.
    pub fn run_to<W: Write>(&self, req: Request, out: &mut W) -> Result<(), Error> {
        let include_body = req.method() != Method::Head;
        let res = self.handle(req)?;
        res.emit(out, Framing::Http, include_body)?;
        Ok(())
    }

    /// Builds the inbound request from the process environment through the
    /// factory, runs it, and writes a CGI response to stdout.
    pub fn run_server_request(&self) -> Result<(), Error> {
        let stdout = std::io::stdout();
        self.run_server_request_to(&mut stdout.lock())
    }

    /// Like [`run_server_request`](Self::run_server_request), writing to
    /// `out`. The response starts with a `Status:` header, as CGI hosts
    /// expect. An environment the factory rejects with an [`HttpError`] is
    /// answered with that error's response.
    pub fn run_server_request_to<W: Write>(&self, out: &mut W) -> Result<(), Error> {
        let (res, include_body) = match self.factory.server_request() {
            Ok(req) => {
                let include_body = req.method() != Method::Head;
                (self.handle(req)?, include_body)
            }
            Err(Error::Http(e)) => {
                debug!(status = e.code(), "server request rejected");
                (self.error_response(e), true)
            }
            Err(e) => return Err(e),
        };
        res.emit(out, Framing::Cgi, include_body)?;
        Ok(())
    }

    fn dispatch(&self, req: Request) -> Result<Response, Error> {
        let span = debug_span!("dispatch", method = %req.method(), path = %req.path());
        let _guard = span.enter();

        match self.call_route(req) {
            Ok(res) => {
                debug!(status = res.status_code(), "response");
                Ok(res)
            }
            Err(Error::Http(e)) => {
                debug!(status = e.code(), "http error");
                Ok(self.error_response(e))
            }
            Err(e) => {
                error!("dispatch failed: {e}");
                Err(e)
            }
        }
    }

    fn call_route(&self, mut req: Request) -> Result<Response, Error> {
        match self.router.match_request(req.method(), req.path())? {
            Match::Route { route, params } => {
                let endpoint = self.handlers.resolve(route.endpoint())?;
                req.set_params(params);
                if route.get_middleware().is_empty() {
                    Next::new(&self.middleware, &endpoint).run(req)
                } else {
                    let chain: Vec<BoxedMiddleware> = self.middleware.iter()
                        .chain(route.get_middleware())
                        .cloned()
                        .collect();
                    Next::new(&chain, &endpoint).run(req)
                }
            }
            Match::Static(file) => {
                let endpoint = (move |_req: Request| serve_file(&file)).into_boxed_handler();
                Next::new(&self.middleware, &endpoint).run(req)
            }
        }
    }

    fn error_response(&self, e: HttpError) -> Response {
        if self.config.debug {
            Response::builder().status(e.status()).text(e.to_string())
        } else {
            e.into_response()
        }
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("router", &self.router)
            .field("middleware", &self.middleware.len())
            .field("handlers", &self.handlers)
            .finish()
    }
}
