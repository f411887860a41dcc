//! Outgoing HTTP response type and the conversion traits handlers return through.
//!
//! Build a [`Response`] in your handler and return it, or return anything
//! that implements [`Responder`]: strings, a [`Status`], an
//! [`HttpError`], or a `Result` whose error converts into [`Error`].

use std::io::Write;

use bytes::Bytes;
use http_body_util::Full;

use crate::error::{Error, HttpError};
use crate::status::{Status, reason_phrase};

// ── ContentType ───────────────────────────────────────────────────────────────

/// Common content-type values for use with [`ResponseBuilder::bytes`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ContentType {
    Css,          // text/css
    Csv,          // text/csv
    Html,         // text/html; charset=utf-8
    JavaScript,   // text/javascript
    Json,         // application/json
    OctetStream,  // application/octet-stream  (binary / file download)
    Pdf,          // application/pdf
    Png,          // image/png
    Svg,          // image/svg+xml
    Text,         // text/plain; charset=utf-8
    Xml,          // application/xml
}

impl ContentType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Css         => "text/css",
            Self::Csv         => "text/csv",
            Self::Html        => "text/html; charset=utf-8",
            Self::JavaScript  => "text/javascript",
            Self::Json        => "application/json",
            Self::OctetStream => "application/octet-stream",
            Self::Pdf         => "application/pdf",
            Self::Png         => "image/png",
            Self::Svg         => "image/svg+xml",
            Self::Text        => "text/plain; charset=utf-8",
            Self::Xml         => "application/xml",
        }
    }

    /// Guess from a file extension (without the dot). Unknown extensions are
    /// served as `application/octet-stream`.
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "css"          => Self::Css,
            "csv"          => Self::Csv,
            "htm" | "html" => Self::Html,
            "js" | "mjs"   => Self::JavaScript,
            "json"         => Self::Json,
            "pdf"          => Self::Pdf,
            "png"          => Self::Png,
            "svg"          => Self::Svg,
            "txt"          => Self::Text,
            "xml"          => Self::Xml,
            _              => Self::OctetStream,
        }
    }
}

// ── Response ─────────────────────────────────────────────────────────────────

/// An outgoing HTTP response.
///
/// ```rust
/// use hearth::{ContentType, Response, Status};
///
/// Response::json(br#"{"id":1}"#.to_vec());
/// Response::text("hello");
/// Response::status(Status::NoContent);
///
/// Response::builder()
///     .status(Status::Created)
///     .header("location", "/albums/42")
///     .bytes(ContentType::Xml, b"<ok/>".to_vec());
/// ```
#[derive(Clone, Debug)]
pub struct Response {
    pub(crate) body: Vec<u8>,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) status: u16,
}

impl Response {
    /// `200 OK`, `application/json`.
    pub fn json(body: Vec<u8>) -> Self {
        Self::bytes_raw("application/json", body)
    }

    /// `200 OK`, `text/plain; charset=utf-8`.
    pub fn text(body: impl Into<String>) -> Self {
        Self::bytes_raw("text/plain; charset=utf-8", body.into().into_bytes())
    }

    /// `200 OK`, `text/html; charset=utf-8`.
    pub fn html(body: impl Into<String>) -> Self {
        Self::bytes_raw("text/html; charset=utf-8", body.into().into_bytes())
    }

    /// Response with no body.
    pub fn status(code: Status) -> Self {
        Self { body: Vec::new(), headers: Vec::new(), status: code.code() }
    }

    /// Builder for responses that need a custom status or extra headers.
    pub fn builder() -> ResponseBuilder {
        ResponseBuilder { headers: Vec::new(), status: Status::Ok.code() }
    }

    fn bytes_raw(content_type: &str, body: Vec<u8>) -> Self {
        Self {
            body,
            headers: vec![("content-type".to_owned(), content_type.to_owned())],
            status: Status::Ok.code(),
        }
    }

    pub fn status_code(&self) -> u16 { self.status }
    pub fn body(&self) -> &[u8] { &self.body }
    pub fn headers(&self) -> &[(String, String)] { &self.headers }

    /// Case-insensitive header lookup; first match wins.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Appends a header. Middleware use this on the way out.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    /// Serialises an HTTP/1.1 status line, headers and body onto `writer`.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        self.emit(writer, Framing::Http, true)
    }

    /// Serialises the response in CGI form: a `Status:` header instead of
    /// a status line.
    pub fn write_cgi_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        self.emit(writer, Framing::Cgi, true)
    }

    /// Writes the response. Headers that are not valid HTTP tokens are
    /// dropped with a warning, and `content-length` is always the computed
    /// one. With `include_body` off the body is omitted but still counted.
    pub(crate) fn emit<W: Write>(
        &self,
        writer: &mut W,
        framing: Framing,
        include_body: bool,
    ) -> std::io::Result<()> {
        let reason = reason_phrase(self.status);
        match framing {
            Framing::Http => write!(writer, "HTTP/1.1 {} {reason}\r\n", self.status)?,
            Framing::Cgi => write!(writer, "Status: {} {reason}\r\n", self.status)?,
        }
        write!(writer, "content-length: {}\r\n", self.body.len())?;
        for (name, value) in self.valid_headers() {
            if name == http::header::CONTENT_LENGTH {
                continue;
            }
            writer.write_all(name.as_str().as_bytes())?;
            writer.write_all(b": ")?;
            writer.write_all(value.as_bytes())?;
            writer.write_all(b"\r\n")?;
        }
        writer.write_all(b"\r\n")?;
        if include_body {
            writer.write_all(&self.body)?;
        }
        writer.flush()
    }

    /// Headers parsed into their `http` types. Invalid ones are skipped with
    /// a warning.
    fn valid_headers(&self) -> impl Iterator<Item = (http::HeaderName, http::HeaderValue)> + '_ {
        self.headers.iter().filter_map(|(name, value)| {
            match (
                http::HeaderName::from_bytes(name.as_bytes()),
                http::HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => Some((name, value)),
                _ => {
                    tracing::warn!(header = %name, "dropping invalid response header");
                    None
                }
            }
        })
    }

    /// Converts into the `http` representation hyper serves.
    ///
    /// Headers that are not valid HTTP tokens are dropped with a warning.
    pub(crate) fn into_http(self) -> http::Response<Full<Bytes>> {
        let mut builder = http::Response::builder().status(self.status);
        for (name, value) in self.valid_headers() {
            builder = builder.header(name, value);
        }
        builder.body(Full::new(Bytes::from(self.body))).unwrap_or_else(|e| {
            tracing::error!("building response: {e}");
            let mut res = http::Response::new(Full::new(Bytes::new()));
            *res.status_mut() = http::StatusCode::INTERNAL_SERVER_ERROR;
            res
        })
    }
}

/// Wire form of an emitted response.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Framing {
    Http,
    Cgi,
}

// ── ResponseBuilder ───────────────────────────────────────────────────────────

/// Fluent builder for [`Response`].
///
/// Obtain via [`Response::builder()`]. Defaults to `Status::Ok` (200).
/// Terminated by a typed body method.
#[derive(Debug)]
pub struct ResponseBuilder {
    headers: Vec<(String, String)>,
    status: u16,
}

impl ResponseBuilder {
    pub fn status(mut self, code: Status) -> Self {
        self.status = code.code();
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    /// Terminate with a JSON body (`application/json`).
    pub fn json(self, body: Vec<u8>) -> Response {
        self.finish("application/json", body)
    }

    /// Terminate with a plain-text body (`text/plain; charset=utf-8`).
    pub fn text(self, body: impl Into<String>) -> Response {
        self.finish("text/plain; charset=utf-8", body.into().into_bytes())
    }

    /// Terminate with a typed body.
    pub fn bytes(self, content_type: ContentType, body: Vec<u8>) -> Response {
        self.finish(content_type.as_str(), body)
    }

    /// Terminate with no body (e.g. `Status::NoContent`, `Status::SeeOther`).
    pub fn no_body(self) -> Response {
        Response { body: Vec::new(), headers: self.headers, status: self.status }
    }

    fn finish(self, content_type: &str, body: Vec<u8>) -> Response {
        let mut headers = vec![("content-type".to_owned(), content_type.to_owned())];
        headers.extend(self.headers);
        Response { body, headers, status: self.status }
    }
}

// ── IntoResponse ──────────────────────────────────────────────────────────────

/// Infallible conversion into an HTTP [`Response`].
pub trait IntoResponse {
    fn into_response(self) -> Response;
}

impl IntoResponse for Response {
    fn into_response(self) -> Response { self }
}

impl IntoResponse for &'static str {
    fn into_response(self) -> Response { Response::text(self) }
}

impl IntoResponse for String {
    fn into_response(self) -> Response { Response::text(self) }
}

/// Return a [`Status`] directly from a handler: `return Status::NoContent`
impl IntoResponse for Status {
    fn into_response(self) -> Response { Response::status(self) }
}

// ── Responder ─────────────────────────────────────────────────────────────────

/// What a handler may return.
///
/// Anything [`IntoResponse`] is a successful response. An [`HttpError`], or
/// the `Err` side of a `Result`, short-circuits the chain; the dispatcher
/// decides whether that error becomes a status response or propagates.
pub trait Responder {
    fn respond(self) -> Result<Response, Error>;
}

impl Responder for Response {
    fn respond(self) -> Result<Response, Error> { Ok(self) }
}

impl Responder for &'static str {
    fn respond(self) -> Result<Response, Error> { Ok(self.into_response()) }
}

impl Responder for String {
    fn respond(self) -> Result<Response, Error> { Ok(self.into_response()) }
}

impl Responder for Status {
    fn respond(self) -> Result<Response, Error> { Ok(self.into_response()) }
}

impl Responder for HttpError {
    fn respond(self) -> Result<Response, Error> { Err(self.into()) }
}

impl<T, E> Responder for Result<T, E>
where
    T: IntoResponse,
    E: Into<Error>,
{
    fn respond(self) -> Result<Response, Error> {
        self.map(IntoResponse::into_response).map_err(Into::into)
    }
}
