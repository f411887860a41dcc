#![allow(dead_code)]

use std::any::Any;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use hearth::{
    App, Config, Container, DefaultFactory, Error, Factory, HttpError, Method, Request, Response,
};
use tracing::span;
use tracing::{Event, Metadata, Subscriber};

pub fn app() -> App {
    App::create(DefaultFactory, Config::new("test"))
}

pub fn debug_app() -> App {
    App::create(DefaultFactory, Config { debug: true, ..Config::new("test") })
}

pub fn request(app: &App, method: Method, target: &str) -> Request {
    app.factory().request(method, target).unwrap()
}

pub fn send(app: &App, method: Method, target: &str) -> Response {
    app.handle(request(app, method, target)).unwrap()
}

pub fn body(res: &Response) -> &str {
    std::str::from_utf8(res.body()).unwrap()
}

/// A fresh directory under the system temp dir, unique per test.
pub fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("hearth-{name}-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// A factory whose inbound request comes from fixed CGI variables.
pub struct CgiFactory {
    pub vars: Vec<(String, String)>,
    pub body: &'static [u8],
}

impl CgiFactory {
    pub fn new(vars: &[(&str, &str)], body: &'static [u8]) -> Self {
        let vars = vars.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect();
        Self { vars, body }
    }
}

impl Factory for CgiFactory {
    fn request(&self, method: Method, target: &str) -> Result<Request, HttpError> {
        DefaultFactory.request(method, target)
    }

    fn server_request(&self) -> Result<Request, Error> {
        DefaultFactory::from_cgi(self.vars.clone(), self.body)
    }
}

/// Stand-in for a third-party container.
#[derive(Default)]
pub struct MapContainer {
    pub values: HashMap<String, Arc<dyn Any + Send + Sync>>,
}

impl MapContainer {
    pub fn with(mut self, id: &str, value: impl Any + Send + Sync) -> Self {
        self.values.insert(id.to_owned(), Arc::new(value));
        self
    }
}

impl Container for MapContainer {
    fn has(&self, id: &str) -> bool {
        self.values.contains_key(id)
    }

    fn get(&self, id: &str) -> Option<Arc<dyn Any + Send + Sync>> {
        self.values.get(id).cloned()
    }
}

/// A subscriber that only counts the events it sees.
pub struct Counting {
    pub id: &'static str,
    pub events: Arc<AtomicUsize>,
}

impl Counting {
    pub fn new(id: &'static str) -> Self {
        Self { id, events: Arc::new(AtomicUsize::new(0)) }
    }
}

impl Subscriber for Counting {
    fn enabled(&self, _: &Metadata<'_>) -> bool {
        true
    }

    fn new_span(&self, _: &span::Attributes<'_>) -> span::Id {
        span::Id::from_u64(1)
    }

    fn record(&self, _: &span::Id, _: &span::Record<'_>) {}

    fn record_follows_from(&self, _: &span::Id, _: &span::Id) {}

    fn event(&self, _: &Event<'_>) {
        self.events.fetch_add(1, Ordering::SeqCst);
    }

    fn enter(&self, _: &span::Id) {}

    fn exit(&self, _: &span::Id) {}
}
