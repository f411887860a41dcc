//! HTTP status codes as a typed enum.
//!
//! Use [`Status`] anywhere a status code is accepted: `Response::status()`,
//! `Response::builder().status()`, or as a bare handler return value.
//!
//! ```rust
//! use hearth::{Response, Status};
//!
//! Response::status(Status::NoContent);
//!
//! Response::builder()
//!     .status(Status::Created)
//!     .header("location", "/albums/42")
//!     .text("created");
//! ```

/// The status codes the framework produces or handlers commonly return.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Status {
    // ── 2xx Success ───────────────────────────────────────────────────────────
    Ok,                  // 200
    Created,             // 201
    Accepted,            // 202
    NoContent,           // 204

    // ── 3xx Redirection ───────────────────────────────────────────────────────
    MovedPermanently,    // 301
    Found,               // 302
    SeeOther,            // 303
    NotModified,         // 304
    TemporaryRedirect,   // 307
    PermanentRedirect,   // 308

    // ── 4xx Client errors ─────────────────────────────────────────────────────
    BadRequest,          // 400
    Unauthorized,        // 401
    Forbidden,           // 403
    NotFound,            // 404
    MethodNotAllowed,    // 405
    Conflict,            // 409
    Gone,                // 410
    UnprocessableContent, // 422
    TooManyRequests,     // 429

    // ── 5xx Server errors ─────────────────────────────────────────────────────
    InternalServerError, // 500
    NotImplemented,      // 501
    BadGateway,          // 502
    ServiceUnavailable,  // 503
}

impl Status {
    /// Numeric status code.
    pub fn code(self) -> u16 {
        match self {
            Self::Ok                   => 200,
            Self::Created              => 201,
            Self::Accepted             => 202,
            Self::NoContent            => 204,
            Self::MovedPermanently     => 301,
            Self::Found                => 302,
            Self::SeeOther             => 303,
            Self::NotModified          => 304,
            Self::TemporaryRedirect    => 307,
            Self::PermanentRedirect    => 308,
            Self::BadRequest           => 400,
            Self::Unauthorized         => 401,
            Self::Forbidden            => 403,
            Self::NotFound             => 404,
            Self::MethodNotAllowed     => 405,
            Self::Conflict             => 409,
            Self::Gone                 => 410,
            Self::UnprocessableContent => 422,
            Self::TooManyRequests      => 429,
            Self::InternalServerError  => 500,
            Self::NotImplemented       => 501,
            Self::BadGateway           => 502,
            Self::ServiceUnavailable   => 503,
        }
    }

    /// Canonical reason phrase, as written on the status line.
    pub fn reason(self) -> &'static str {
        reason_phrase(self.code())
    }
}

impl From<Status> for u16 {
    fn from(s: Status) -> u16 {
        s.code()
    }
}

/// Reason phrase for any numeric code. Unknown codes map to `""`.
pub(crate) fn reason_phrase(code: u16) -> &'static str {
    match code {
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        204 => "No Content",
        301 => "Moved Permanently",
        302 => "Found",
        303 => "See Other",
        304 => "Not Modified",
        307 => "Temporary Redirect",
        308 => "Permanent Redirect",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        409 => "Conflict",
        410 => "Gone",
        422 => "Unprocessable Content",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        _   => "",
    }
}
