use criterion::{Criterion, criterion_group, criterion_main};
use http::{Method, Request};
use std::hint::black_box;
use tokio::runtime::Runtime;
use trellis_http::protocol::ReqBody;
use trellis_web::{App, Dispatcher, HandlerResult, Next, PathPattern, RequestContext, ResponseContext, handler_fn};

async fn pass(_req: &mut RequestContext, _resp: &mut ResponseContext) -> HandlerResult {
    Ok(Next::Continue)
}

async fn show_user(req: &mut RequestContext, resp: &mut ResponseContext) -> HandlerResult {
    resp.send(req.param("id").unwrap_or_default().to_string())?;
    Ok(Next::Halt)
}

fn dispatcher(route_count: usize) -> Dispatcher {
    let mut app = App::new();
    app.use_middleware(handler_fn(pass)).unwrap();
    app.use_at("/api", handler_fn(pass)).unwrap();
    for i in 0..route_count {
        app.get(&format!("/resource{i}/:id"), handler_fn(show_user)).unwrap();
    }
    app.get("/users/:id", handler_fn(show_user)).unwrap();
    app.into_dispatcher()
}

fn get(target: &str) -> Request<ReqBody> {
    Request::builder().method(Method::GET).uri(target).body(ReqBody::empty()).unwrap()
}

fn bench_pattern(c: &mut Criterion) {
    let pattern = PathPattern::compile("/users/:user_id/posts/:post_id").unwrap();

    c.bench_function("pattern_match_two_params", |b| {
        b.iter(|| black_box(pattern.matches(black_box("/users/42/posts/7"))));
    });

    c.bench_function("pattern_miss", |b| {
        b.iter(|| black_box(pattern.matches(black_box("/users/42/comments/7"))));
    });
}

fn bench_dispatch(c: &mut Criterion) {
    let runtime = Runtime::new().unwrap();

    let small = dispatcher(0);
    c.bench_function("dispatch_first_route", |b| {
        b.to_async(&runtime).iter(|| async { black_box(small.handle(get("/users/7")).await) });
    });

    let large = dispatcher(50);
    c.bench_function("dispatch_after_50_routes", |b| {
        b.to_async(&runtime).iter(|| async { black_box(large.handle(get("/users/7")).await) });
    });

    c.bench_function("dispatch_not_found", |b| {
        b.to_async(&runtime).iter(|| async { black_box(large.handle(get("/missing")).await) });
    });
}

criterion_group!(benches, bench_pattern, bench_dispatch);
criterion_main!(benches);
