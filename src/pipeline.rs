//! Pipeline composition and the run extent.

use std::fmt;
use std::sync::Arc;

use crate::ambient;
use crate::cell::ContextStorage;
use crate::counter::Counter;
use crate::error::Result;
use crate::manager::Manager;
use crate::middleware::{BoxedMiddleware, Middleware};

/// Configuration for [`Pipeline::with_options`].
pub struct PipelineOptions<O> {
    /// Returned when the chain runs off the end without producing a value.
    /// `None` turns exhaustion into [`Error::Exhausted`](crate::Error::Exhausted).
    pub default_output: Option<O>,
    /// Seeds the pipeline's default manager.
    pub storage: ContextStorage,
}

impl<O> Default for PipelineOptions<O> {
    fn default() -> Self {
        Self { default_output: None, storage: ContextStorage::new() }
    }
}

/// An ordered middleware chain plus its default per-run context.
///
/// Within one run, middleware execute toward `next` in list order and after
/// `next` resolves in reverse order — onion composition. Across independent
/// runs there is no ordering guarantee.
///
/// ```rust
/// use nagare::{Next, Pipeline, Request, Response};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> nagare::Result<()> {
/// let pipeline = Pipeline::new()
///     .with(|req: Request, next: Next<Request, Response>| async move {
///         if req.pathname() == "/ping" {
///             return Ok(Response::text("pong"));
///         }
///         next.call().await
///     })
///     .with(|_req: Request, _next: Next<Request, Response>| async move {
///         Ok(Response::status(404))
///     });
///
/// let res = pipeline.run(Request::get("/ping")).await?;
/// assert_eq!(res.text_body(), Some("pong"));
/// # Ok(())
/// # }
/// ```
pub struct Pipeline<I, O> {
    middleware: Vec<BoxedMiddleware<I, O>>,
    manager: Manager,
    default_output: Option<O>,
}

impl<I, O> Pipeline<I, O>
where
    I: Clone + Send + Sync + 'static,
    O: Clone + Send + Sync + 'static,
{
    /// An empty pipeline with default options.
    pub fn new() -> Self {
        Self::with_options(PipelineOptions::default())
    }

    pub fn with_options(options: PipelineOptions<O>) -> Self {
        Self {
            middleware: Vec::new(),
            manager: Manager::with_storage(options.storage),
            default_output: options.default_output,
        }
    }

    /// Appends `middleware` to the chain.
    ///
    /// A run resolves against the snapshot taken when it started, so appends
    /// never affect a run already in flight. (`add` borrows `&mut self`
    /// while `run` borrows `&self`, so the borrow checker enforces the same
    /// rule at compile time.)
    pub fn add(&mut self, middleware: impl Middleware<I, O>) -> &mut Self {
        self.middleware.push(middleware.into_boxed_middleware());
        self
    }

    /// Builder-style [`add`](Pipeline::add). Returns `self` so registrations
    /// chain naturally.
    pub fn with(mut self, middleware: impl Middleware<I, O>) -> Self {
        self.add(middleware);
        self
    }

    /// Runs `input` through the chain under the pipeline's default manager.
    ///
    /// Every `run` of this pipeline shares that one manager. For per-request
    /// isolation — one inbound HTTP call, one context — construct a fresh
    /// [`Manager`] per call and use [`run_with`](Pipeline::run_with).
    pub async fn run(&self, input: I) -> Result<O> {
        self.run_with(input, self.manager.clone()).await
    }

    /// Runs `input` through the chain with `manager` ambient for the full
    /// extent of the dispatch.
    ///
    /// This is also the nesting entry point: an outer middleware that wants
    /// an inner pipeline to execute under the *outer* request's context
    /// passes its own manager down.
    pub async fn run_with(&self, input: I, manager: Manager) -> Result<O> {
        tracing::debug!(middleware = self.middleware.len(), "pipeline run");
        let counter =
            Counter::new(Arc::from(self.middleware.as_slice()), self.default_output.clone());
        ambient::bind(manager, counter.start(input)).await
    }

    /// The pipeline's default manager — the one bare [`run`](Pipeline::run)
    /// binds.
    pub fn manager(&self) -> &Manager {
        &self.manager
    }
}

impl<I, O> Default for Pipeline<I, O>
where
    I: Clone + Send + Sync + 'static,
    O: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<I, O> fmt::Debug for Pipeline<I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline").field("middleware", &self.middleware.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::LazyLock;

    use parking_lot::Mutex;

    use super::*;
    use crate::ambient::{use_cell_value, use_manager};
    use crate::cell::Cell;
    use crate::counter::Next;
    use crate::error::Error;

    #[tokio::test]
    async fn onion_ordering_descends_then_ascends() {
        let log: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));

        let wrap = |name_in: &'static str, name_out: &'static str, log: Arc<Mutex<Vec<&'static str>>>| {
            move |i: i32, next: Next<i32, i32>| {
                let log = Arc::clone(&log);
                async move {
                    log.lock().push(name_in);
                    let out = next.call_with(i).await;
                    log.lock().push(name_out);
                    out
                }
            }
        };

        let pipeline = Pipeline::new()
            .with(wrap("a>", "a<", Arc::clone(&log)))
            .with(wrap("b>", "b<", Arc::clone(&log)))
            .with(|i: i32, _next: Next<i32, i32>| async move { Ok(i) });

        pipeline.run(0).await.unwrap();
        assert_eq!(*log.lock(), ["a>", "b>", "b<", "a<"]);
    }

    #[tokio::test]
    async fn terminal_value_comes_back_through_unconditional_forwarders() {
        let pipeline = Pipeline::new()
            .with(|_i: i32, next: Next<i32, i32>| async move { next.call().await })
            .with(|_i: i32, next: Next<i32, i32>| async move { next.call().await })
            .with(|_i: i32, _next: Next<i32, i32>| async move { Ok(42) });
        assert_eq!(pipeline.run(0).await.unwrap(), 42);
    }

    #[tokio::test]
    async fn exhaustion_uses_the_configured_default_output() {
        let pipeline: Pipeline<i32, i32> = Pipeline::with_options(PipelineOptions {
            default_output: Some(-1),
            ..PipelineOptions::default()
        })
        .with(|_i: i32, next: Next<i32, i32>| async move { next.call().await });
        assert_eq!(pipeline.run(0).await.unwrap(), -1);
    }

    #[tokio::test]
    async fn exhaustion_without_default_output_errors() {
        let pipeline: Pipeline<i32, i32> =
            Pipeline::new().with(|_i: i32, next: Next<i32, i32>| async move { next.call().await });
        assert!(matches!(pipeline.run(0).await, Err(Error::Exhausted)));
    }

    #[tokio::test]
    async fn add_is_visible_to_later_runs_only() {
        let mut pipeline: Pipeline<i32, i32> =
            Pipeline::new().with(|_i: i32, next: Next<i32, i32>| async move { next.call().await });
        assert!(matches!(pipeline.run(0).await, Err(Error::Exhausted)));

        pipeline.add(|i: i32, _next: Next<i32, i32>| async move { Ok(i + 1) });
        assert_eq!(pipeline.run(1).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn bare_run_binds_the_pipeline_manager() {
        static SLOT: LazyLock<Cell<u32>> = LazyLock::new(|| Cell::new(0));

        let pipeline = Pipeline::new().with(|_i: i32, _next: Next<i32, i32>| async move {
            use_manager()?.write(&SLOT, 5);
            Ok(0)
        });

        pipeline.run(0).await.unwrap();
        assert_eq!(pipeline.manager().read(&SLOT).unwrap(), 5);
    }

    #[tokio::test]
    async fn run_with_isolates_per_request_managers() {
        static SLOT: LazyLock<Cell<i32>> = LazyLock::new(|| Cell::new(0));

        let pipeline = Pipeline::new().with(|i: i32, _next: Next<i32, i32>| async move {
            use_manager()?.write(&SLOT, i);
            for _ in 0..3 {
                tokio::task::yield_now().await;
            }
            use_cell_value(&SLOT)
        });

        // Interleaved in one task; each run's manager keeps its own write.
        let (a, b) = tokio::join!(
            pipeline.run_with(1, Manager::new()),
            pipeline.run_with(2, Manager::new()),
        );
        assert_eq!((a.unwrap(), b.unwrap()), (1, 2));
    }

    #[tokio::test]
    async fn nested_run_restores_the_outer_manager() {
        static SLOT: LazyLock<Cell<i32>> = LazyLock::new(|| Cell::new(0));

        let inner: Arc<Pipeline<i32, i32>> = Arc::new(Pipeline::new().with(
            |i: i32, _next: Next<i32, i32>| async move {
                use_manager()?.write(&SLOT, i);
                use_cell_value(&SLOT)
            },
        ));

        let inner_for_outer = Arc::clone(&inner);
        let outer = Pipeline::new().with(move |i: i32, _next: Next<i32, i32>| {
            let inner = Arc::clone(&inner_for_outer);
            async move {
                use_manager()?.write(&SLOT, i);
                // Inner run under its own fresh manager...
                let nested = inner.run_with(i * 10, Manager::new()).await?;
                assert_eq!(nested, i * 10);
                // ...and the outer binding is back afterwards.
                Ok(use_cell_value(&SLOT)?)
            }
        });

        assert_eq!(outer.run_with(3, Manager::new()).await.unwrap(), 3);
    }
}
