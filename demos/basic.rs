//! Minimal nagare example — a routed request pipeline with ambient context.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! The pipeline plays the role an HTTP layer normally does: it feeds request
//! descriptors into `run_with` (one fresh `Manager` per request) and prints
//! the response descriptors that come back.

use std::collections::HashMap;
use std::sync::LazyLock;

use nagare::{Cell, Manager, Next, Pipeline, Request, Response, middleware, route, use_cell};

static REQUEST_ID: LazyLock<Cell<u64>> = LazyLock::new(|| Cell::new(0));

#[tokio::main]
async fn main() -> nagare::Result<()> {
    tracing_subscriber::fmt::init();

    let app = Pipeline::new()
        .with(middleware::trace())
        .with(tag_request)
        .with(route("/hello", hello))
        .with(route("/users", route("/admin", admin)))
        .with(not_found);

    for req in [
        Request::get("/hello")
            .with_query(HashMap::from([("name".to_owned(), "Bill".to_owned())])),
        Request::get("/users/admin/7"),
        Request::get("/nope"),
    ] {
        let res = app.run_with(req, Manager::new()).await?;
        println!("{} {:?}", res.status_code(), res.body());
    }

    Ok(())
}

// Writes a per-request id early; any later middleware can read it back via
// use_cell(&REQUEST_ID) without it being threaded through signatures.
async fn tag_request(req: Request, next: Next<Request, Response>) -> nagare::Result<Response> {
    use_cell(&REQUEST_ID)?.set(rand_ish(req.pathname()));
    next.call_with(req).await
}

async fn hello(req: Request, _next: Next<Request, Response>) -> nagare::Result<Response> {
    let name = req.query_param("name").unwrap_or("stranger");
    Ok(Response::text(format!("Hello {name}")))
}

async fn admin(req: Request, _next: Next<Request, Response>) -> nagare::Result<Response> {
    let id = use_cell(&REQUEST_ID)?.get()?;
    Ok(Response::json(serde_json::json!({
        "pathname": req.pathname(),
        "request_id": id,
    })))
}

async fn not_found(_req: Request, _next: Next<Request, Response>) -> nagare::Result<Response> {
    Ok(Response::status(404))
}

// Good enough for a demo id.
fn rand_ish(seed: &str) -> u64 {
    seed.bytes().fold(17u64, |acc, b| acc.wrapping_mul(31).wrapping_add(u64::from(b)))
}
