//! # hearth
//!
//! A small application core for HTTP services: a service registry, a named
//! router, a middleware chain, and a plugin hook, wired together by [`App`].
//!
//! An app is assembled once, synchronously, and then dispatches requests
//! through `&self`. The same app can answer requests handed to it directly
//! ([`App::handle`]), read from the process environment and written to
//! stdout ([`App::run_server_request`]), or served over HTTP/1.1 and HTTP/2
//! by [`Server`].
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use hearth::{App, Config, DefaultFactory, HttpError, Logger, Request, Response, Server, Status};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), hearth::Error> {
//!     let config = Config::load("hearth.toml")?;
//!     let mut app = App::create(DefaultFactory, config.clone());
//!     app.logger(Logger::from_config(&config));
//!
//!     app.get("/albums/{name}", show_album, "album");
//!     app.post("/albums", create_album, "albums:create");
//!
//!     Server::from_config(&config)?.serve(app).await
//! }
//!
//! fn show_album(req: Request) -> Response {
//!     Response::text(format!("album {}", req.param("name").unwrap_or("")))
//! }
//!
//! fn create_album(req: Request) -> Result<Response, HttpError> {
//!     if req.body().is_empty() {
//!         return Err(HttpError::BadRequest);
//!     }
//!     Ok(Response::builder()
//!         .status(Status::Created)
//!         .header("location", "/albums/new")
//!         .no_body())
//! }
//! ```

mod app;
mod config;
mod error;
mod factory;
mod handler;
mod logger;
mod method;
mod plugin;
mod registry;
mod request;
mod response;
mod router;
mod server;
mod status;

pub mod health;
pub mod middleware;

pub use app::App;
pub use config::{Config, ConfigError};
pub use error::{Error, HttpError};
pub use factory::{DefaultFactory, Factory};
pub use handler::{Endpoint, Handler, Handlers, IntoEndpoint};
pub use logger::Logger;
pub use method::{Method, UnknownMethod};
pub use middleware::{BoxedMiddleware, Middleware, Next};
pub use plugin::Plugin;
pub use registry::{Constructor, Container, Id, Registration, Registry, RegistryError};
pub use request::Request;
pub use response::{ContentType, IntoResponse, Responder, Response, ResponseBuilder};
pub use router::{Group, Match, Route, Router, RouterError};
pub use server::Server;
pub use status::Status;
