//! Application logger.
//!
//! The app's logger is a [`tracing::Dispatch`]. Registering one with
//! [`App::logger`](crate::App::logger) stores it in the registry and makes
//! every dispatch run with it as the default subscriber, so handler and
//! middleware events land there without touching the global subscriber.

use std::fmt;

use tracing::Dispatch;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// A logger instance, or a factory producing one.
pub enum Logger {
    Instance(Dispatch),
    Factory(Box<dyn FnOnce() -> Dispatch + Send>),
}

impl Logger {
    pub fn instance(dispatch: impl Into<Dispatch>) -> Self {
        Self::Instance(dispatch.into())
    }

    pub fn factory<F, D>(f: F) -> Self
    where
        F: FnOnce() -> D + Send + 'static,
        D: Into<Dispatch>,
    {
        Self::Factory(Box::new(move || f().into()))
    }

    /// A `fmt` subscriber on stderr filtered by `RUST_LOG`, falling back to
    /// `config.log_level`.
    pub fn from_config(config: &Config) -> Self {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .finish();
        Self::Instance(Dispatch::new(subscriber))
    }

    /// Produces the dispatch, invoking the factory if there is one.
    pub(crate) fn into_dispatch(self) -> Dispatch {
        match self {
            Self::Instance(dispatch) => dispatch,
            Self::Factory(f) => f(),
        }
    }
}

impl From<Dispatch> for Logger {
    fn from(dispatch: Dispatch) -> Self {
        Self::Instance(dispatch)
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Instance(d) => f.debug_tuple("Logger::Instance").field(d).finish(),
            Self::Factory(_) => f.write_str("Logger::Factory"),
        }
    }
}
