//! Built-in health-check endpoints.
//!
//! | Probe | Path | Route name |
//! |---|---|---|
//! | **Liveness** | `/healthz` | `health:liveness` |
//! | **Readiness** | `/readyz` | `health:readiness` |
//!
//! Load them as a plugin:
//!
//! ```rust
//! use hearth::{App, Config, DefaultFactory, Factory, Method, health::Health};
//!
//! let mut app = App::create(DefaultFactory, Config::default());
//! app.load(Health::default()).unwrap();
//!
//! let req = app.factory().request(Method::Get, "/readyz").unwrap();
//! assert_eq!(app.handle(req).unwrap().body(), b"ready");
//! ```
//!
//! Or register the handlers yourself, for example to gate readiness on
//! dependency availability:
//!
//! ```rust
//! use hearth::{App, Config, DefaultFactory, Request, Response, Status, health};
//!
//! fn readiness(_req: Request) -> Response {
//!     if dependencies_are_healthy() {
//!         Response::text("ready")
//!     } else {
//!         Response::status(Status::ServiceUnavailable)
//!     }
//! }
//!
//! fn dependencies_are_healthy() -> bool { true }
//!
//! let mut app = App::create(DefaultFactory, Config::default());
//! app.get("/healthz", health::liveness, None);
//! app.get("/readyz", readiness, None);
//! ```

use crate::app::App;
use crate::error::Error;
use crate::plugin::Plugin;
use crate::request::Request;
use crate::response::Response;

/// Liveness probe handler. Always `200 OK` with body `"ok"`.
pub fn liveness(_req: Request) -> Response {
    Response::text("ok")
}

/// Readiness probe handler. `200 OK` with body `"ready"`.
pub fn readiness(_req: Request) -> Response {
    Response::text("ready")
}

/// Plugin registering [`liveness`] and [`readiness`] as `GET` routes.
#[derive(Clone, Debug)]
pub struct Health {
    pub liveness_path: String,
    pub readiness_path: String,
}

impl Default for Health {
    fn default() -> Self {
        Self {
            liveness_path: "/healthz".to_owned(),
            readiness_path: "/readyz".to_owned(),
        }
    }
}

impl Plugin for Health {
    fn load(&self, app: &mut App) -> Result<(), Error> {
        app.get(&self.liveness_path, liveness, "health:liveness")
            .get(&self.readiness_path, readiness, "health:readiness");
        Ok(())
    }
}
