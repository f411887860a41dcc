//! Request/response factory.
//!
//! The app never constructs messages itself; it asks the registered
//! [`Factory`]. [`DefaultFactory`] covers the three ways a request reaches
//! the app: built by hand (`request`), converted from a hyper request
//! (`from_http`), or read from the process environment the way a CGI host
//! hands it over (`server_request`).

use std::io::Read;

use bytes::Bytes;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use http::{HeaderMap, HeaderName, HeaderValue, Uri};
use tracing::debug;

use crate::error::{Error, HttpError};
use crate::method::Method;
use crate::request::Request;
use crate::response::Response;
use crate::status::Status;

/// Produces request and response values.
pub trait Factory: Send + Sync + 'static {
    /// A request for `method` on `target` (`/path?query`, or an absolute URI).
    fn request(&self, method: Method, target: &str) -> Result<Request, HttpError>;

    /// The inbound request of the current process.
    fn server_request(&self) -> Result<Request, Error>;

    /// An empty response with `status`.
    fn response(&self, status: Status) -> Response {
        Response::status(status)
    }

    /// Converts a request received by the HTTP server.
    fn from_http(&self, req: http::Request<Bytes>) -> Result<Request, HttpError> {
        let (parts, body) = req.into_parts();
        let method = Method::try_from(&parts.method).map_err(|_| HttpError::BadRequest)?;
        let (path, query) = split_uri(&parts.uri);
        Ok(Request::new(method, path, query, parts.headers, body))
    }
}

/// The stock factory.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultFactory;

impl Factory for DefaultFactory {
    fn request(&self, method: Method, target: &str) -> Result<Request, HttpError> {
        let uri: Uri = target.parse().map_err(|_| HttpError::BadRequest)?;
        let (path, query) = split_uri(&uri);
        Ok(Request::new(method, path, query, HeaderMap::new(), Bytes::new()))
    }

    fn server_request(&self) -> Result<Request, Error> {
        Self::from_cgi(std::env::vars(), std::io::stdin().lock())
    }
}

impl DefaultFactory {
    /// Builds a request from CGI meta-variables and a body reader.
    ///
    /// `REQUEST_METHOD` is required. The target comes from `REQUEST_URI`, or
    /// `PATH_INFO` plus `QUERY_STRING`. `HTTP_*` variables become headers
    /// (`HTTP_X_REQUEST_ID` is `x-request-id`), as do `CONTENT_TYPE` and
    /// `CONTENT_LENGTH`. Exactly `CONTENT_LENGTH` bytes are read from `body`.
    pub fn from_cgi<I, R>(vars: I, body: R) -> Result<Request, Error>
    where
        I: IntoIterator<Item = (String, String)>,
        R: Read,
    {
        let mut method = None;
        let mut request_uri = None;
        let mut path_info = None;
        let mut query_string = None;
        let mut headers = HeaderMap::new();

        for (key, value) in vars {
            let name = match key.as_str() {
                "REQUEST_METHOD" => { method = Some(value); continue; }
                "REQUEST_URI"    => { request_uri = Some(value); continue; }
                "PATH_INFO"      => { path_info = Some(value); continue; }
                "QUERY_STRING"   => { query_string = Some(value); continue; }
                "CONTENT_TYPE"   => CONTENT_TYPE,
                "CONTENT_LENGTH" => CONTENT_LENGTH,
                _ => match key.strip_prefix("HTTP_") {
                    Some(raw) => header_name(raw)?,
                    None => continue,
                },
            };
            let value = HeaderValue::try_from(value).map_err(|_| HttpError::BadRequest)?;
            headers.append(name, value);
        }

        let method: Method = method
            .ok_or(HttpError::BadRequest)?
            .parse()
            .map_err(|_| HttpError::BadRequest)?;

        let target = request_uri.unwrap_or_else(|| {
            let path = path_info.unwrap_or_else(|| "/".to_owned());
            match query_string.filter(|q| !q.is_empty()) {
                Some(q) => format!("{path}?{q}"),
                None => path,
            }
        });
        let uri: Uri = target.parse().map_err(|_| HttpError::BadRequest)?;
        let (path, query) = split_uri(&uri);

        let length = match headers.get(CONTENT_LENGTH) {
            Some(v) => v
                .to_str()
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .ok_or(HttpError::BadRequest)?,
            None => 0,
        };
        let mut buf = Vec::new();
        body.take(length).read_to_end(&mut buf)?;

        debug!(method = %method, path = %path, body_len = buf.len(), "server request built");
        Ok(Request::new(method, path, query, headers, Bytes::from(buf)))
    }
}

fn header_name(cgi: &str) -> Result<HeaderName, HttpError> {
    let name = cgi.to_ascii_lowercase().replace('_', "-");
    HeaderName::try_from(name).map_err(|_| HttpError::BadRequest)
}

fn split_uri(uri: &Uri) -> (String, Option<String>) {
    let path = match uri.path() {
        "" => "/".to_owned(),
        p => p.to_owned(),
    };
    (path, uri.query().map(str::to_owned))
}
