//! Error types.
//!
//! Two families live here. [`HttpError`] is the set of failures that have a
//! well-defined HTTP answer: the dispatcher catches them and turns them into
//! a status response. [`Error`] is everything a fallible operation can
//! return; its non-HTTP variants are not recovered by the dispatcher and
//! surface to whoever called [`App::run`](crate::App::run).

use thiserror::Error;

use crate::config::ConfigError;
use crate::registry::RegistryError;
use crate::response::Response;
use crate::router::RouterError;
use crate::status::Status;

/// A failure that maps to a fixed status code and reason phrase.
///
/// Return one from a handler or middleware (directly, or as the `Err` of a
/// `Result`) and the client receives the matching status response.
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
pub enum HttpError {
    #[error("400 Bad Request")]
    BadRequest,
    #[error("401 Unauthorized")]
    Unauthorized,
    #[error("403 Forbidden")]
    Forbidden,
    #[error("404 Not Found")]
    NotFound,
    #[error("405 Method Not Allowed")]
    MethodNotAllowed,
    #[error("500 Internal Server Error")]
    ServerError,
}

impl HttpError {
    pub fn status(self) -> Status {
        match self {
            Self::BadRequest       => Status::BadRequest,
            Self::Unauthorized     => Status::Unauthorized,
            Self::Forbidden        => Status::Forbidden,
            Self::NotFound         => Status::NotFound,
            Self::MethodNotAllowed => Status::MethodNotAllowed,
            Self::ServerError      => Status::InternalServerError,
        }
    }

    pub fn code(self) -> u16 {
        self.status().code()
    }

    pub fn message(self) -> &'static str {
        self.status().reason()
    }

    /// Plain-text response carrying the status and its reason phrase.
    pub fn into_response(self) -> Response {
        Response::builder().status(self.status()).text(self.message())
    }
}

/// The error type returned by hearth's fallible operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Http(#[from] HttpError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Router(#[from] RouterError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A route refers to a `"Type::method"` id that was never registered.
    #[error("no handler registered for `{0}`")]
    UnresolvedHandler(String),

    #[error("invalid socket address `{0}`")]
    Addr(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// Any other failure raised by application code.
    #[error(transparent)]
    Handler(Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl Error {
    /// Wraps an arbitrary application error.
    pub fn handler(e: impl Into<Box<dyn std::error::Error + Send + Sync + 'static>>) -> Self {
        Self::Handler(e.into())
    }

    /// The HTTP error carried by this value, if any.
    pub fn as_http(&self) -> Option<HttpError> {
        match self {
            Self::Http(e) => Some(*e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_errors_carry_code_and_message() {
        assert_eq!(HttpError::BadRequest.code(), 400);
        assert_eq!(HttpError::BadRequest.message(), "Bad Request");
        assert_eq!(HttpError::NotFound.code(), 404);
        assert_eq!(HttpError::NotFound.message(), "Not Found");
        assert_eq!(HttpError::NotFound.to_string(), "404 Not Found");
    }

    #[test]
    fn into_response_uses_reason_as_body() {
        let res = HttpError::NotFound.into_response();
        assert_eq!(res.status_code(), 404);
        assert_eq!(res.body(), b"Not Found");
    }

    #[test]
    fn only_http_variant_is_recoverable() {
        assert_eq!(Error::from(HttpError::Forbidden).as_http(), Some(HttpError::Forbidden));
        assert!(Error::handler("boom").as_http().is_none());
    }
}
