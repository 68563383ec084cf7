use std::hint::black_box;

use brrtchain::chain::Handler;
use brrtchain::router::{RouteSpec, Router, RouterOptions};
use criterion::{criterion_group, criterion_main, Criterion};
use http::Method;

fn zoo_routes() -> Vec<(&'static str, Method, &'static str)> {
    vec![
        ("root_handler", Method::GET, "/"),
        ("get_animals", Method::GET, "/zoo/animals"),
        ("create_animal", Method::POST, "/zoo/animals"),
        ("get_animal", Method::GET, "/zoo/animals/:id"),
        ("update_animal", Method::PUT, "/zoo/animals/:id"),
        ("patch_animal", Method::PATCH, "/zoo/animals/:id"),
        ("delete_animal", Method::DELETE, "/zoo/animals/:id"),
        ("animal_toy", Method::GET, "/zoo/animals/:id/toys/:toy_id"),
        (
            "habitat_section",
            Method::GET,
            "/zoo/:category/animals/:id/habitats/:habitat_id/sections/:section_id",
        ),
        (
            "post_item_batch",
            Method::POST,
            "/inventory/:warehouse_id/feeds/:feed_id/items/:item_id/batches/:batch_id",
        ),
        (
            "complex_many_params",
            Method::GET,
            "/complex/:a/:b/:c/:d/:e/:f/:g/:h/:i",
        ),
        ("flight", Method::GET, "/flights/:from-:to"),
        ("asset", Method::GET, "/assets/*"),
        ("health_check", Method::HEAD, "/zoo/health"),
        ("supported_ops", Method::OPTIONS, "/zoo/health"),
        ("trace_route", Method::TRACE, "/zoo/health"),
    ]
}

fn build_router() -> Router {
    let mut router = Router::new(RouterOptions::default());
    for (name, method, path) in zoo_routes() {
        router
            .mount(
                RouteSpec::new(name, method, path),
                vec![Handler::new(|_req, _res, next| next.proceed())],
            )
            .expect("failed to mount route");
    }
    router
}

fn bench_route_throughput(c: &mut Criterion) {
    let router = build_router();
    c.bench_function("route_match", |b| {
        let test_paths = [
            (Method::GET, "/zoo/animals/123"),
            (Method::GET, "/zoo/animals/123/toys/456"),
            (Method::GET, "/zoo/cats/animals/123/habitats/88/sections/5"),
            (Method::POST, "/inventory/1/feeds/2/items/3/batches/4"),
            (Method::GET, "/complex/1/2/3/4/5/6/7/8/9"),
            (Method::GET, "/flights/LHR-JFK"),
            (Method::GET, "/assets/css/site.css"),
        ];
        b.iter(|| {
            for (method, path) in test_paths.iter() {
                let res = router.route(method, path);
                black_box(&res);
            }
        })
    });

    c.bench_function("route_miss_405_probe", |b| {
        b.iter(|| {
            let res = router.route(&Method::POST, black_box("/zoo/animals/123"));
            black_box(&res);
        })
    });
}

criterion_group!(benches, bench_route_throughput);
criterion_main!(benches);
