//! Per-request tracing middleware.

use std::time::Instant;

use tracing::{Instrument, error, info, info_span};

use crate::counter::Next;
use crate::middleware::Middleware;
use crate::request::Request;
use crate::response::Response;

/// Middleware that wraps the rest of the chain in a per-request span
/// (method, path) and logs status and latency on the way back out.
///
/// Put it first so the span covers every other middleware:
///
/// ```rust
/// use nagare::{middleware, Pipeline, Next, Request, Response};
///
/// let pipeline = Pipeline::new()
///     .with(middleware::trace())
///     .with(|_req: Request, _next: Next<Request, Response>| async move {
///         Ok(Response::status(204))
///     });
/// ```
pub fn trace() -> impl Middleware<Request, Response> {
    |req: Request, next: Next<Request, Response>| {
        let span = info_span!("request", method = %req.method(), path = %req.pathname());
        async move {
            let started = Instant::now();
            let outcome = next.call_with(req).await;
            let elapsed_ms = started.elapsed().as_millis() as u64;
            match &outcome {
                Ok(response) => {
                    info!(status = response.status_code(), elapsed_ms, "request completed");
                }
                Err(e) => {
                    error!(elapsed_ms, error = %e, "request failed");
                }
            }
            outcome
        }
        .instrument(span)
    }
}
