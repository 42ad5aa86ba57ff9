//! Index-driven middleware dispatch.
//!
//! The [`Counter`] invokes a chain snapshot by index: `start(input)` is
//! dispatch at index 0, and dispatching index `i` hands the middleware a
//! [`Next`] bound to index `i + 1` and to the input received at `i`.
//! Dispatch state is purely parametric — an index and a bound input, never a
//! shared cursor — which is what makes `next` reentrant: sibling invocations
//! cannot interfere, so a middleware may fan out over several `next` calls
//! and gather the results.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::middleware::{BoxFuture, BoxedMiddleware};

/// Dispatches a middleware chain by index, starting at 0.
///
/// Holds the snapshot taken at run start plus the pipeline's fallback
/// outcome for running off the end of the list. The counter carries the
/// fallback but does not interpret it — policy belongs to the pipeline.
pub(crate) struct Counter<I, O> {
    chain: Arc<[BoxedMiddleware<I, O>]>,
    fallback: Arc<Option<O>>,
}

impl<I, O> Counter<I, O>
where
    I: Clone + Send + Sync + 'static,
    O: Clone + Send + Sync + 'static,
{
    pub(crate) fn new(chain: Arc<[BoxedMiddleware<I, O>]>, fallback: Option<O>) -> Self {
        Self { chain, fallback: Arc::new(fallback) }
    }

    /// Dispatches `input` at index 0.
    pub(crate) async fn start(&self, input: I) -> Result<O> {
        let root = Next {
            chain: Arc::clone(&self.chain),
            fallback: Arc::clone(&self.fallback),
            index: 0,
            input: input.clone(),
        };
        root.dispatch(input).await
    }
}

// ── Next ──────────────────────────────────────────────────────────────────────

/// The continuation handed to each middleware.
///
/// [`call`](Next::call) forwards the *unchanged* input the surrounding
/// middleware received; [`call_with`](Next::call_with) overrides it. Both
/// take `&self` and a `Next` is `Clone`, so a middleware may invoke its
/// continuation zero, one, or many times — each invocation independently
/// re-executes the downstream suffix.
pub struct Next<I, O> {
    chain: Arc<[BoxedMiddleware<I, O>]>,
    fallback: Arc<Option<O>>,
    index: usize,
    input: I,
}

impl<I, O> Next<I, O>
where
    I: Clone + Send + Sync + 'static,
    O: Clone + Send + Sync + 'static,
{
    /// Forwards the same input the surrounding middleware received.
    pub async fn call(&self) -> Result<O> {
        self.dispatch(self.input.clone()).await
    }

    /// Forwards `input` instead.
    pub async fn call_with(&self, input: I) -> Result<O> {
        self.dispatch(input).await
    }

    fn dispatch(&self, input: I) -> BoxFuture<Result<O>> {
        match self.chain.get(self.index) {
            Some(middleware) => {
                tracing::trace!(index = self.index, "dispatching middleware");
                let next = Next {
                    chain: Arc::clone(&self.chain),
                    fallback: Arc::clone(&self.fallback),
                    index: self.index + 1,
                    input: input.clone(),
                };
                middleware.call(input, next)
            }
            None => match &*self.fallback {
                Some(output) => {
                    let output = output.clone();
                    Box::pin(async move { Ok(output) })
                }
                None => Box::pin(async move { Err(Error::Exhausted) }),
            },
        }
    }
}

impl<I: Clone, O> Clone for Next<I, O> {
    fn clone(&self) -> Self {
        Self {
            chain: Arc::clone(&self.chain),
            fallback: Arc::clone(&self.fallback),
            index: self.index,
            input: self.input.clone(),
        }
    }
}
