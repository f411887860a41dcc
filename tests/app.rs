mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;

use common::{CgiFactory, Counting, MapContainer, app, body, debug_app, request, send, temp_dir};
use hearth::{
    App, Config, Constructor, DefaultFactory, Error, Factory, Group, HttpError, Id, Logger,
    Method, Next, Request, Response, Route, Router, Status,
};
use parking_lot::Mutex;
use tracing::Dispatch;

fn text(s: &'static str) -> impl Fn(Request) -> &'static str + Send + Sync + 'static {
    move |_req: Request| s
}

#[test]
fn create_registers_core_services() {
    let app = app();
    let registry = app.registry();

    assert_eq!(registry.resolve::<Config>().unwrap().app, "test");
    assert!(registry.has(Id::of::<Router>()));
    assert!(registry.has(Id::of::<DefaultFactory>()));
    assert!(registry.has(Id::of::<Arc<dyn Factory>>()));
}

#[test]
fn accessors_share_the_registered_instances() {
    let app = app();

    let router = app.registry().resolve::<Router>().unwrap();
    assert!(std::ptr::eq(Arc::as_ptr(&router), app.router()));

    let config = app.registry().resolve::<Config>().unwrap();
    assert!(std::ptr::eq(Arc::as_ptr(&config), app.config()));

    let factory = app.registry().resolve::<Arc<dyn Factory>>().unwrap();
    assert_eq!(factory.request(Method::Get, "/x").unwrap().path(), "/x");
}

#[test]
fn router_resolved_from_registry_sees_later_routes() {
    let mut app = app();
    let router = app.registry().resolve::<Router>().unwrap();

    app.get("/albums", text("albums"), "albums");
    assert_eq!(router.route_url("albums", &[]).unwrap(), "/albums");
}

#[test]
fn third_party_container_backs_the_registry() {
    let container = MapContainer::default().with("external", 42_u32);
    let mut app = App::with_container(DefaultFactory, Config::new("test"), container);
    app.register("local", 7_u32);

    assert!(app.registry().has("external"));
    assert_eq!(*app.registry().get::<u32>("external").unwrap(), 42);
    assert_eq!(*app.registry().get::<u32>("local").unwrap(), 7);
    assert!(!app.registry().has("missing"));
}

#[test]
fn register_as_is_returns_the_factory_itself() {
    let mut app = app();
    app.register_factory("answer", |_| Ok(42_u8)).as_is();
    app.register_factory("built", |_| Ok(42_u8));

    let ctor = app.registry().get::<Constructor<u8>>("answer").unwrap();
    assert_eq!(ctor(app.registry()).unwrap(), 42);
    assert_eq!(*app.registry().get::<u8>("built").unwrap(), 42);
}

#[test]
fn alias_resolves_to_target() {
    let mut app = app();
    app.register("db.primary", String::from("postgres://primary"));
    app.alias("db", "db.primary");

    assert_eq!(*app.registry().get::<String>("db").unwrap(), "postgres://primary");
}

#[test]
fn middleware_helper_appends() {
    let mut app = app();
    app.middleware(|req: Request, next: Next<'_>| next.run(req))
        .middleware(|req: Request, next: Next<'_>| next.run(req));

    assert_eq!(app.get_middleware().len(), 2);
}

#[test]
fn static_routes_build_urls_and_serve_files() {
    let dir = temp_dir("app-static");
    std::fs::write(dir.join("test.json"), br#"{"ok":true}"#).unwrap();

    let mut app = app();
    app.static_route("/static", &dir, "static")
        .static_route("/unnamedstatic/", &dir, None);

    assert_eq!(app.router().static_url("static", "test.json").unwrap(), "/static/test.json");
    assert_eq!(
        app.router().static_url("/unnamedstatic", "test.json").unwrap(),
        "/unnamedstatic/test.json"
    );

    let res = send(&app, Method::Get, "/static/test.json");
    assert_eq!(res.status_code(), 200);
    assert_eq!(res.header("content-type"), Some("application/json"));
    assert_eq!(body(&res), r#"{"ok":true}"#);

    assert_eq!(send(&app, Method::Get, "/static/missing.json").status_code(), 404);
    assert_eq!(send(&app, Method::Get, "/static/../secret").status_code(), 400);
}

#[test]
fn run_writes_the_response() {
    let mut app = app();
    app.get("/", text("text"), None);

    let mut out = Vec::new();
    app.run_to(request(&app, Method::Get, "/"), &mut out).unwrap();
    let out = String::from_utf8(out).unwrap();

    assert!(out.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(out.ends_with("\r\n\r\ntext"));
}

#[test]
fn add_route_and_add_group() {
    let mut app = app();
    app.add_route(Route::get("/albums", text("index"), "albums"));

    let mut group = Group::new("/albums", "albums:");
    group.get("/{name}", |req: Request| format!("album {}", req.param("name").unwrap_or("")), "name");
    app.add_group(group);

    assert_eq!(app.router().route_url("albums", &[]).unwrap(), "/albums");
    assert_eq!(
        app.router().route_url("albums:name", &[("name", "symbolic")]).unwrap(),
        "/albums/symbolic"
    );
    assert_eq!(body(&send(&app, Method::Get, "/albums/symbolic")), "album symbolic");
}

#[test]
fn route_helpers_register_per_method() {
    let mut app = app();
    app.route("/any", text("any"), "any")
        .get("/albums", text("get"), "get")
        .post("/albums", text("post"), "post")
        .put("/albums", text("put"), "put")
        .patch("/albums", text("patch"), "patch")
        .delete("/albums", text("delete"), "delete")
        .head("/albums", text("head"), "head")
        .options("/albums", text("options"), "options")
        .routes(|router| router.get("/bulk", text("bulk"), "bulk"));

    for (method, expected) in [
        (Method::Get, "get"),
        (Method::Post, "post"),
        (Method::Put, "put"),
        (Method::Patch, "patch"),
        (Method::Delete, "delete"),
        (Method::Head, "head"),
        (Method::Options, "options"),
    ] {
        assert_eq!(body(&send(&app, method, "/albums")), expected);
        assert_eq!(body(&send(&app, method, "/any")), "any");
    }

    assert_eq!(body(&send(&app, Method::Get, "/bulk")), "bulk");
    assert_eq!(app.router().route_url("bulk", &[]).unwrap(), "/bulk");
    assert_eq!(app.router().len(), 9);
}

#[test]
fn group_helper_prefixes_patterns_and_names() {
    let mut app = app();
    app.group(
        "/albums",
        |group| {
            group.get("/{name}", text("album"), "name");
        },
        "albums:",
    );

    assert_eq!(
        app.router().route_url("albums:name", &[("name", "symbolic")]).unwrap(),
        "/albums/symbolic"
    );
}

#[test]
fn logger_instance_is_registered_and_used() {
    let counting = Counting::new("instance");
    let events = Arc::clone(&counting.events);

    let mut app = app();
    app.logger(Logger::instance(counting));
    app.get("/", text("ok"), None);

    let dispatch = app.registry().resolve::<Dispatch>().unwrap();
    assert_eq!(dispatch.downcast_ref::<Counting>().unwrap().id, "instance");

    send(&app, Method::Get, "/");
    assert!(events.load(Ordering::SeqCst) > 0);
}

#[test]
fn logger_factory_is_invoked() {
    let mut app = app();
    app.logger(Logger::factory(|| Counting::new("factory")));

    let dispatch = app.registry().resolve::<Dispatch>().unwrap();
    assert_eq!(dispatch.downcast_ref::<Counting>().unwrap().id, "factory");
}

#[test]
fn plugins_register_into_the_app() {
    let mut app = app();
    app.load(|app: &mut App| -> Result<(), Error> {
        app.register("test-id", "test-value");
        Ok(())
    })
    .unwrap();

    assert_eq!(*app.registry().get::<&str>("test-id").unwrap(), "test-value");
}

#[test]
fn plugin_errors_propagate() {
    let mut app = app();
    let err = app
        .load(|_: &mut App| -> Result<(), Error> { Err(Error::handler("plugin failed")) })
        .unwrap_err();

    assert_eq!(err.to_string(), "plugin failed");
}

#[test]
fn routing_failures_become_status_responses() {
    let mut app = app();
    app.get("/albums", text("albums"), None);

    let res = send(&app, Method::Get, "/missing");
    assert_eq!(res.status_code(), 404);
    assert_eq!(body(&res), "Not Found");

    let res = send(&app, Method::Post, "/albums");
    assert_eq!(res.status_code(), 405);
    assert_eq!(body(&res), "Method Not Allowed");
}

#[test]
fn debug_mode_shows_the_status_line() {
    let app = debug_app();

    let res = send(&app, Method::Get, "/missing");
    assert_eq!(res.status_code(), 404);
    assert_eq!(body(&res), "404 Not Found");
}

#[test]
fn http_errors_raised_by_handlers_are_responses() {
    let mut app = app();
    app.get("/private", |_req: Request| HttpError::Forbidden, None)
        .post("/albums", |req: Request| -> Result<Response, HttpError> {
            if req.body().is_empty() {
                return Err(HttpError::BadRequest);
            }
            Ok(Response::status(Status::Created))
        }, None);

    let res = send(&app, Method::Get, "/private");
    assert_eq!(res.status_code(), 403);
    assert_eq!(body(&res), "Forbidden");

    assert_eq!(send(&app, Method::Post, "/albums").status_code(), 400);
}

#[test]
fn other_errors_propagate_and_write_nothing() {
    let mut app = app();
    app.get("/", |_req: Request| -> Result<Response, Error> {
        Err(Error::handler("database unavailable"))
    }, None);

    let err = app.handle(request(&app, Method::Get, "/")).unwrap_err();
    assert!(matches!(err, Error::Handler(_)));
    assert_eq!(err.to_string(), "database unavailable");

    let mut out = Vec::new();
    assert!(app.run_to(request(&app, Method::Get, "/"), &mut out).is_err());
    assert!(out.is_empty());
}

#[test]
fn middleware_runs_in_registration_order_around_the_handler() {
    let log = Arc::new(Mutex::new(Vec::new()));

    let mut app = app();
    for tag in ["app-1", "app-2"] {
        let log = Arc::clone(&log);
        app.middleware(move |req: Request, next: Next<'_>| -> Result<Response, Error> {
            log.lock().push(format!("{tag} in"));
            let res = next.run(req);
            log.lock().push(format!("{tag} out"));
            res
        });
    }

    let route_log = Arc::clone(&log);
    let handler_log = Arc::clone(&log);
    app.add_route(
        Route::get("/", move |_req: Request| {
            handler_log.lock().push("handler".to_owned());
            "ok"
        }, None)
        .middleware(move |req: Request, next: Next<'_>| -> Result<Response, Error> {
            route_log.lock().push("route".to_owned());
            next.run(req)
        }),
    );

    assert_eq!(body(&send(&app, Method::Get, "/")), "ok");
    assert_eq!(
        *log.lock(),
        ["app-1 in", "app-2 in", "route", "handler", "app-2 out", "app-1 out"]
    );
}

#[test]
fn group_middleware_runs_between_app_and_route_middleware() {
    let log = Arc::new(Mutex::new(Vec::new()));

    let mut app = app();
    let app_log = Arc::clone(&log);
    app.middleware(move |req: Request, next: Next<'_>| -> Result<Response, Error> {
        app_log.lock().push("app in".to_owned());
        let res = next.run(req);
        app_log.lock().push("app out".to_owned());
        res
    });

    let group_log = Arc::clone(&log);
    let route_log = Arc::clone(&log);
    let handler_log = Arc::clone(&log);
    app.group(
        "/admin",
        move |group| {
            group
                .middleware(move |req: Request, next: Next<'_>| -> Result<Response, Error> {
                    group_log.lock().push("group".to_owned());
                    next.run(req)
                })
                .add_route(
                    Route::get("/stats", move |_req: Request| {
                        handler_log.lock().push("handler".to_owned());
                        "stats"
                    }, "stats")
                    .middleware(move |req: Request, next: Next<'_>| -> Result<Response, Error> {
                        route_log.lock().push("route".to_owned());
                        next.run(req)
                    }),
                );
        },
        "admin:",
    );

    assert_eq!(body(&send(&app, Method::Get, "/admin/stats")), "stats");
    assert_eq!(*log.lock(), ["app in", "group", "route", "handler", "app out"]);
}

#[test]
fn emitted_headers_cannot_be_split() {
    let mut app = app();
    app.get("/", |_req: Request| {
        Response::text("ok").with_header("x-echo", "a\r\nset-cookie: pwn=1")
    }, None);

    let mut out = Vec::new();
    app.run_to(request(&app, Method::Get, "/"), &mut out).unwrap();
    let out = String::from_utf8(out).unwrap();

    assert!(!out.contains("set-cookie"));
    assert!(out.ends_with("\r\n\r\nok"));
}

#[test]
fn head_responses_carry_no_body() {
    let dir = temp_dir("app-head");
    std::fs::write(dir.join("a.txt"), b"hello").unwrap();

    let mut app = app();
    app.static_route("/s", &dir, None);

    let mut out = Vec::new();
    app.run_to(request(&app, Method::Head, "/s/a.txt"), &mut out).unwrap();
    let out = String::from_utf8(out).unwrap();

    assert!(out.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(out.contains("content-length: 5\r\n"));
    assert!(out.ends_with("\r\n\r\n"));
    assert!(!out.contains("hello"));
}

#[test]
fn server_request_is_answered_in_cgi_form() {
    let factory = CgiFactory::new(
        &[("REQUEST_METHOD", "POST"), ("REQUEST_URI", "/albums"), ("CONTENT_LENGTH", "8")],
        b"symbolic",
    );
    let mut app = App::create(factory, Config::new("test"));
    app.post("/albums", |req: Request| {
        Response::builder()
            .status(Status::Created)
            .text(String::from_utf8_lossy(req.body()).into_owned())
    }, None);

    let mut out = Vec::new();
    app.run_server_request_to(&mut out).unwrap();
    let out = String::from_utf8(out).unwrap();

    assert!(out.starts_with("Status: 201 Created\r\n"));
    assert!(!out.contains("HTTP/1.1"));
    assert!(out.ends_with("\r\n\r\nsymbolic"));
}

#[test]
fn malformed_server_request_is_a_bad_request() {
    let factory = CgiFactory::new(&[("REQUEST_URI", "/albums")], b"");
    let app = App::create(factory, Config::new("test"));

    let mut out = Vec::new();
    app.run_server_request_to(&mut out).unwrap();
    let out = String::from_utf8(out).unwrap();

    assert!(out.starts_with("Status: 400 Bad Request\r\n"));
    assert!(out.ends_with("\r\n\r\nBad Request"));
}

#[test]
fn middleware_can_short_circuit() {
    let mut app = app();
    app.middleware(|req: Request, next: Next<'_>| -> Result<Response, Error> {
        match req.header("authorization") {
            Some(_) => next.run(req),
            None => Err(HttpError::Unauthorized.into()),
        }
    });
    app.get("/", text("secret"), None);

    assert_eq!(send(&app, Method::Get, "/").status_code(), 401);

    let mut req = request(&app, Method::Get, "/");
    req.headers_mut().insert("authorization", "Bearer x".parse().unwrap());
    assert_eq!(body(&app.handle(req).unwrap()), "secret");
}

#[test]
fn named_handlers_resolve_at_dispatch() {
    let mut app = app();
    app.handler("AlbumController::show", |req: Request| {
        format!("show {}", req.param("name").unwrap_or(""))
    })
    .get("/albums/{name}", "AlbumController::show", "album")
    .get("/missing", "MissingController::index", None);

    assert_eq!(body(&send(&app, Method::Get, "/albums/symbolic")), "show symbolic");

    let err = app.handle(request(&app, Method::Get, "/missing")).unwrap_err();
    assert!(matches!(err, Error::UnresolvedHandler(id) if id == "MissingController::index"));
}

#[test]
fn route_params_reach_the_handler() {
    let mut app = app();
    app.get("/files/{*path}", |req: Request| req.param("path").unwrap_or("").to_owned(), None);

    assert_eq!(body(&send(&app, Method::Get, "/files/a/b/c.txt")), "a/b/c.txt");
}
