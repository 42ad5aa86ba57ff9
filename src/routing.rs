//! Path-prefix routing over the ambient basename stack.
//!
//! [`route`] turns any `Request -> Response` middleware into one that only
//! fires for pathnames under a prefix. While the wrapped middleware runs,
//! the prefix sits on the basenames stack — a [`Cell`] holding the prefixes
//! stripped so far, oldest first — so nested routers can reconstruct where
//! they are mounted. Stack discipline is strictly LIFO per logical request:
//! the prior stack is restored once the wrapped middleware settles, whether
//! it returned or failed.

use std::sync::{Arc, LazyLock};

use crate::ambient::{use_cell_value, use_manager};
use crate::cell::Cell;
use crate::counter::Next;
use crate::error::Result;
use crate::middleware::{BoxedMiddleware, Middleware};
use crate::request::Request;
use crate::response::Response;

static BASENAMES: LazyLock<Cell<Vec<String>>> = LazyLock::new(|| Cell::new(Vec::new()));

/// The cell holding the prefixes stripped from the current request's
/// pathname, oldest first.
pub fn basenames() -> &'static Cell<Vec<String>> {
    &BASENAMES
}

/// Hook shortcut for reading [`basenames`] in the ambient manager.
pub fn use_basenames() -> Result<Vec<String>> {
    use_cell_value(&BASENAMES)
}

/// Wraps `middleware` so it only fires for pathnames starting with `prefix`.
///
/// On a match the prefix is stripped from the pathname (an exact match
/// rewrites it to `/`), pushed onto the basenames stack, and the wrapped
/// middleware runs against the rewritten request with the same downstream
/// continuation. On a miss the request passes to `next` untouched — the
/// route never fires.
///
/// Routes nest: `route("/base", route("/detail", handler))` hands `handler`
/// a pathname with both prefixes stripped and a basenames stack of
/// `["/base", "/detail"]`.
pub fn route(
    prefix: impl Into<String>,
    middleware: impl Middleware<Request, Response>,
) -> impl Middleware<Request, Response> {
    let prefix: Arc<str> = Arc::from(prefix.into());
    let inner: BoxedMiddleware<Request, Response> = middleware.into_boxed_middleware();

    move |req: Request, next: Next<Request, Response>| {
        let prefix = Arc::clone(&prefix);
        let inner = Arc::clone(&inner);
        async move {
            let rest = req
                .pathname()
                .strip_prefix(prefix.as_ref())
                .map(|rest| if rest.is_empty() { "/".to_owned() } else { rest.to_owned() });
            let Some(rest) = rest else {
                return next.call_with(req).await;
            };
            let stripped = req.with_pathname(rest);

            let manager = use_manager()?;
            let saved = manager.read(&BASENAMES)?;
            let mut pushed = saved.clone();
            pushed.push(prefix.to_string());
            manager.write(&BASENAMES, pushed);

            let outcome = inner.call(stripped, next).await;

            // Restore runs on success and error alike.
            manager.write(&BASENAMES, saved);
            outcome
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::manager::Manager;
    use crate::pipeline::Pipeline;

    async fn whoami(req: Request, _next: Next<Request, Response>) -> Result<Response> {
        let stack = use_basenames()?;
        Ok(Response::text(format!("{}|{}", stack.join(","), req.pathname())))
    }

    #[tokio::test]
    async fn misses_pass_through_untouched() {
        let pipeline = Pipeline::new()
            .with(route("/a", whoami))
            .with(|req: Request, _next: Next<Request, Response>| async move {
                Ok(Response::text(format!("fell through {}", req.pathname())))
            });

        let res = pipeline.run_with(Request::get("/b/a"), Manager::new()).await.unwrap();
        assert_eq!(res.text_body(), Some("fell through /b/a"));
    }

    #[tokio::test]
    async fn matches_strip_the_prefix_and_push_the_basename() {
        let pipeline = Pipeline::new().with(route("/a", whoami));

        let res = pipeline.run_with(Request::get("/a/x"), Manager::new()).await.unwrap();
        assert_eq!(res.text_body(), Some("/a|/x"));
    }

    #[tokio::test]
    async fn exact_match_rewrites_the_pathname_to_root() {
        let pipeline = Pipeline::new().with(route("/a", whoami));

        let res = pipeline.run_with(Request::get("/a"), Manager::new()).await.unwrap();
        assert_eq!(res.text_body(), Some("/a|/"));
    }

    #[tokio::test]
    async fn stack_is_restored_after_the_route_returns() {
        let pipeline = Pipeline::new()
            .with(route("/a", whoami))
            .with(|_req: Request, _next: Next<Request, Response>| async move {
                // Runs after the route middleware settled on a miss only;
                // on a hit the route short-circuits, so reach here via /b.
                Ok(Response::status(204))
            });

        let manager = Manager::new();
        pipeline.run_with(Request::get("/a/x"), manager.clone()).await.unwrap();
        assert_eq!(manager.read(basenames()).unwrap(), Vec::<String>::new());
    }

    #[tokio::test]
    async fn stack_is_restored_after_the_route_fails() {
        async fn explode(_req: Request, _next: Next<Request, Response>) -> Result<Response> {
            Err(Error::other("downstream collaborator failed"))
        }

        let pipeline = Pipeline::new().with(route("/a", explode));

        let manager = Manager::new();
        let outcome = pipeline.run_with(Request::get("/a/x"), manager.clone()).await;
        assert!(outcome.is_err());
        assert_eq!(manager.read(basenames()).unwrap(), Vec::<String>::new());
    }

    #[tokio::test]
    async fn nested_routes_accumulate_then_unwind() {
        let pipeline = Pipeline::new().with(route("/base", route("/detail", whoami)));

        let manager = Manager::new();
        let res =
            pipeline.run_with(Request::get("/base/detail/5"), manager.clone()).await.unwrap();
        assert_eq!(res.text_body(), Some("/base,/detail|/5"));
        assert_eq!(manager.read(basenames()).unwrap(), Vec::<String>::new());
    }
}
