mod common;

use std::sync::{Arc, Mutex};

use brrtchain::chain::{Control, Handler};
use brrtchain::error::RoutingError;
use brrtchain::router::{RouteSpec, Router, RouterOptions};
use brrtchain::server::Response;
use common::completion::{assert_no_more, channel, wait};
use common::recorder::Recorder;
use common::test_server::{request, setup_may_runtime};
use http::Method;

fn zoo_router(rec: &Recorder) -> Router {
    let mut router = Router::new(RouterOptions::default());
    let routes = [
        ("root_handler", Method::GET, "/"),
        ("get_animals", Method::GET, "/zoo/animals"),
        ("create_animal", Method::POST, "/zoo/animals"),
        ("get_animal", Method::GET, "/zoo/animals/:id"),
        ("update_animal", Method::PUT, "/zoo/animals/:id"),
        ("delete_animal", Method::DELETE, "/zoo/animals/:id"),
        ("health_check", Method::HEAD, "/zoo/health"),
    ];
    for (name, method, path) in routes {
        router
            .mount(RouteSpec::new(name, method, path), vec![rec.proceed(name)])
            .unwrap();
    }
    router
}

fn lookup(router: &Router, method: Method, uri: &str) -> (Control, Response) {
    setup_may_runtime();
    let req = request(method, uri);
    let res = Response::new();
    let (done, rx) = channel();
    router.lookup(&req, &res, done);
    let control = wait(&rx);
    assert_no_more(&rx);
    (control, res)
}

fn routing_error(control: &Control) -> RoutingError {
    control
        .error()
        .and_then(|e| e.downcast_ref::<RoutingError>())
        .cloned()
        .expect("expected a routing error")
}

fn assert_route_match(router: &Router, method: Method, path: &str, expected_handler: &str) {
    match router.route(&method, path) {
        Some(m) => assert_eq!(
            m.route.name, expected_handler,
            "Handler mismatch for {method} {path}"
        ),
        None => assert_eq!(
            expected_handler, "<none>",
            "Expected route to match for {method} {path}"
        ),
    }
}

#[test]
fn test_router_verbs() {
    let router = zoo_router(&Recorder::new());
    assert_route_match(&router, Method::GET, "/", "root_handler");
    assert_route_match(&router, Method::GET, "/zoo/animals", "get_animals");
    assert_route_match(&router, Method::POST, "/zoo/animals", "create_animal");
    assert_route_match(&router, Method::GET, "/zoo/animals/123", "get_animal");
    assert_route_match(&router, Method::PUT, "/zoo/animals/123", "update_animal");
    assert_route_match(&router, Method::DELETE, "/zoo/animals/123", "delete_animal");
    assert_route_match(&router, Method::HEAD, "/zoo/health", "health_check");
    assert_route_match(&router, Method::PATCH, "/zoo/animals/123", "<none>");
    assert_route_match(&router, Method::GET, "/zoo/unknown", "<none>");
}

#[test]
fn test_lookup_runs_matched_chain() {
    let rec = Recorder::new();
    let router = zoo_router(&rec);
    let (control, _res) = lookup(&router, Method::GET, "/");
    assert!(control.is_proceed());
    assert_eq!(rec.calls(), vec!["root_handler"]);
}

#[test]
fn test_lookup_sets_route_and_params() {
    setup_may_runtime();
    let rec = Recorder::new();
    let router = zoo_router(&rec);
    let req = request(Method::GET, "/zoo/animals/42?expand=true");
    req.set_param("id", "stale");
    req.set_param("expand", "true");
    let res = Response::new();
    let (done, rx) = channel();
    router.lookup(&req, &res, done);

    assert!(wait(&rx).is_proceed());
    assert_eq!(req.param("id").as_deref(), Some("42"));
    assert_eq!(req.param("expand").as_deref(), Some("true"));
    assert_eq!(req.route().map(|r| r.name.clone()).as_deref(), Some("get_animal"));
    assert_eq!(rec.calls(), vec!["get_animal"]);
}

#[test]
fn test_method_not_allowed_sets_allow_header() {
    let rec = Recorder::new();
    let router = zoo_router(&rec);

    let (control, res) = lookup(&router, Method::POST, "/");
    let err = routing_error(&control);
    assert_eq!(err.status().as_u16(), 405);
    assert_eq!(res.header("Allow").as_deref(), Some("GET"));

    let (control, res) = lookup(&router, Method::PATCH, "/zoo/animals/7");
    assert_eq!(routing_error(&control).status().as_u16(), 405);
    assert_eq!(res.header("allow").as_deref(), Some("GET, PUT, DELETE"));
    assert!(rec.calls().is_empty());
}

#[test]
fn test_unmounted_path_is_not_found() {
    let router = zoo_router(&Recorder::new());
    for method in [Method::GET, Method::POST, Method::DELETE] {
        let (control, res) = lookup(&router, method, "/nowhere");
        let err = routing_error(&control);
        assert_eq!(err.status().as_u16(), 404);
        assert_eq!(err.code(), "ResourceNotFound");
        assert!(res.header("Allow").is_none());
    }
}

#[test]
fn test_options_star_is_answered() {
    let router = zoo_router(&Recorder::new());
    let (control, res) = lookup(&router, Method::OPTIONS, "*");
    assert!(control.is_proceed());
    assert_eq!(res.status(), 200);
    assert!(res.is_sent());
}

#[test]
fn test_lookup_by_name() {
    setup_may_runtime();
    let rec = Recorder::new();
    let router = zoo_router(&rec);
    let req = request(Method::GET, "/anything");
    let res = Response::new();
    let (done, rx) = channel();
    router.lookup_by_name("get_animals", &req, &res, done);

    assert!(wait(&rx).is_proceed());
    assert_eq!(rec.calls(), vec!["get_animals"]);
    assert_eq!(req.route().map(|r| r.name.clone()).as_deref(), Some("get_animals"));
}

#[test]
fn test_lookup_by_unknown_name_uses_default_route() {
    setup_may_runtime();
    let rec = Recorder::new();
    let router = zoo_router(&rec);
    let req = request(Method::POST, "/zoo/animals/1");
    let res = Response::new();
    let (done, rx) = channel();
    router.lookup_by_name("no_such_route", &req, &res, done);

    // The default route ran: it answered for the request path, no route chain did
    assert_eq!(res.header("Allow").as_deref(), Some("GET, PUT, DELETE"));
    assert!(rec.calls().is_empty());
    assert!(req.route().is_none());
    if let Ok(control) = rx.recv_timeout(common::completion::COMPLETION_TIMEOUT) {
        assert_eq!(routing_error(&control).status().as_u16(), 405);
    }
}

#[test]
fn test_not_found_never_echoes_markup() {
    let router = zoo_router(&Recorder::new());
    let (control, res) = lookup(&router, Method::GET, "/search/'onmouseover=alert(1)'&x");
    res.send_error(control.error().expect("expected an error"));

    assert_eq!(res.status(), 404);
    let body = res.body().to_string();
    assert!(!body.contains("'onmouseover"), "raw path echoed: {body}");
    assert!(body.contains("&#x27;onmouseover=alert(1)&#x27;&amp;x"));
}

#[test]
fn test_routed_observer_sees_match() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut router = Router::new(RouterOptions::default());
    let sink = Arc::clone(&seen);
    router.on_routed(move |req, _res, route| {
        sink.lock()
            .unwrap()
            .push(format!("{} {} -> {}", req.method(), req.path(), route.name));
    });
    router
        .mount(
            RouteSpec::new("get_user", Method::GET, "/users/:id"),
            vec![Handler::new(|_req, _res, next| next.proceed())],
        )
        .unwrap();

    let (control, _res) = lookup(&router, Method::GET, "/users/42");
    assert!(control.is_proceed());
    let (control, _res) = lookup(&router, Method::GET, "/missing");
    assert!(control.is_error());

    assert_eq!(*seen.lock().unwrap(), vec!["GET /users/42 -> get_user".to_string()]);
}

#[test]
fn test_route_chain_error_handlers() {
    let rec = Recorder::new();
    let mut router = Router::new(RouterOptions::default());
    router
        .mount(
            RouteSpec::new("fragile", Method::GET, "/fragile"),
            vec![rec.fail("load", "db down"), rec.proceed("render"), rec.recover("fallback")],
        )
        .unwrap();

    let (control, _res) = lookup(&router, Method::GET, "/fragile");
    assert!(control.is_proceed());
    assert_eq!(rec.calls(), vec!["load", "fallback: db down"]);
}

#[test]
fn test_router_options_reach_route_chains() {
    let mut router = Router::new(RouterOptions {
        once_next: true,
        ..RouterOptions::default()
    });
    let rec = Recorder::new();
    let inner = rec.clone();
    router
        .mount(
            RouteSpec::new("double", Method::GET, "/double"),
            vec![
                Handler::new(move |_req, _res, next| {
                    inner.push("double");
                    next.proceed();
                    next.proceed();
                }),
                rec.proceed("after"),
            ],
        )
        .unwrap();

    let (control, _res) = lookup(&router, Method::GET, "/double");
    assert!(control.is_proceed());
    assert_eq!(rec.calls(), vec!["double", "after"]);
}

#[test]
fn test_debug_info_serializes() {
    let router = zoo_router(&Recorder::new());
    let info = router.debug_info();
    assert_eq!(info.len(), 7);
    let json = serde_json::to_value(&info["update_animal"]).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "name": "update_animal",
            "method": "put",
            "path": "/zoo/animals/:id",
            "handlers": ["update_animal"],
        })
    );
}
