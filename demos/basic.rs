//! Minimal hearth example: an album catalogue with a route group, a named
//! controller handler, request-logging middleware and health checks.
//!
//! Run with:
//!   RUST_LOG=debug cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/albums/symbolic
//!   curl -X POST http://localhost:3000/albums -d 'name=leprosy'
//!   curl http://localhost:3000/admin/stats -H 'x-admin: yes'
//!   curl http://localhost:3000/healthz

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use hearth::health::Health;
use hearth::{
    App, Config, DefaultFactory, Error, HttpError, Logger, Next, Request, Response, Server, Status,
};

#[derive(Default)]
struct Stats {
    served: AtomicUsize,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let config = Config::from_toml_str(
        r#"
        app = "albums"
        env = "development"
        debug = true
        listen = "0.0.0.0:3000"
        log_level = "debug"
        "#,
    )?;

    let mut app = App::create(DefaultFactory, config.clone());
    app.logger(Logger::from_config(&config));
    app.register("stats", Stats::default());

    let stats = app.registry().get::<Stats>("stats")?;
    app.middleware(move |req: Request, next: Next<'_>| {
        stats.served.fetch_add(1, Ordering::Relaxed);
        tracing::info!(method = %req.method(), path = %req.path(), "request");
        next.run(req)
    });

    app.handler("AlbumController::show", show_album)
        .get("/albums/{name}", "AlbumController::show", "album")
        .post("/albums", create_album, "albums:create");

    let registry_stats: Arc<Stats> = app.registry().get("stats")?;
    app.group(
        "/admin",
        move |group| {
            group
                .middleware(require_admin)
                .get("/stats", move |_req: Request| {
                    format!("served {}", registry_stats.served.load(Ordering::Relaxed))
                }, "stats");
        },
        "admin:",
    );

    app.load(Health::default())?;

    Server::from_config(&config)?.serve(app).await
}

// GET /albums/{name}
fn show_album(req: Request) -> Response {
    let name = req.param("name").unwrap_or("unknown");
    Response::json(format!(r#"{{"name":"{name}"}}"#).into_bytes())
}

// POST /albums → 201 with a link to the new album
fn create_album(req: Request) -> Result<Response, HttpError> {
    let body = std::str::from_utf8(req.body()).map_err(|_| HttpError::BadRequest)?;
    let name = body.strip_prefix("name=").ok_or(HttpError::BadRequest)?;

    Ok(Response::builder()
        .status(Status::Created)
        .header("location", &format!("/albums/{name}"))
        .no_body())
}

fn require_admin(req: Request, next: Next<'_>) -> Result<Response, Error> {
    match req.header("x-admin") {
        Some("yes") => next.run(req),
        _ => Err(HttpError::Forbidden.into()),
    }
}
