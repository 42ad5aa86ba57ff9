//! Middleware trait and type erasure.
//!
//! # How async middleware are stored
//!
//! A pipeline holds middleware of *different* concrete types in a single
//! `Vec`. Rust collections can only hold one concrete type, so we use
//! **trait objects** (`dyn ErasedMiddleware`) to hide the concrete type
//! behind a common interface and store everything uniformly.
//!
//! The chain from user code to vtable call is:
//!
//! ```text
//! async fn auth(req: I, next: Next<I, O>) -> Result<O> { … }   ← user writes this
//!        ↓ pipeline.add(auth)
//! auth.into_boxed_middleware()                    ← Middleware blanket impl
//!        ↓
//! Arc::new(FnMiddleware(auth))                    ← heap-allocated wrapper
//!        ↓  stored as BoxedMiddleware = Arc<dyn ErasedMiddleware>
//! mw.call(input, next)  at dispatch time          ← one vtable dispatch
//!        ↓
//! Box::pin(auth(input, next))                     ← BoxFuture
//! ```
//!
//! The only runtime cost per invocation is **one Arc clone** (atomic inc) +
//! **one virtual call** — negligible next to the work middleware do.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::counter::Next;
use crate::error::Result;

mod trace;

pub use trace::trace;

// ── Internal types ────────────────────────────────────────────────────────────

/// A heap-allocated, type-erased future.
///
/// `Pin<Box<…>>` is required because the async runtime must be able to poll
/// the future in-place — it cannot move it in memory after the first poll.
/// `Send + 'static` let tokio move the future across threads safely.
#[doc(hidden)]
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// Internal dispatch interface.
///
/// `#[doc(hidden)] pub` rather than `pub(crate)` because it appears in the
/// return type of the public `Middleware` trait's `into_boxed_middleware`
/// method. External crates cannot usefully interact with this trait.
#[doc(hidden)]
pub trait ErasedMiddleware<I, O>: Send + Sync {
    fn call(&self, input: I, next: Next<I, O>) -> BoxFuture<Result<O>>;
}

/// A heap-allocated, type-erased middleware shared across concurrent runs.
///
/// `#[doc(hidden)] pub` for the same reason as `ErasedMiddleware`.
/// `Arc` gives cheap, thread-safe shared ownership (one atomic reference
/// count increment per dispatch) without copying the middleware.
#[doc(hidden)]
pub type BoxedMiddleware<I, O> = Arc<dyn ErasedMiddleware<I, O> + 'static>;

// ── Public Middleware trait ───────────────────────────────────────────────────

/// Implemented for every valid middleware.
///
/// You never implement this yourself. It is automatically satisfied for any
/// `async fn` (or closure returning a future) with the signature:
///
/// ```text
/// async fn name(input: I, next: Next<I, O>) -> nagare::Result<O>
/// ```
///
/// The middleware decides whether to produce an output itself, delegate via
/// [`Next::call`]/[`Next::call_with`], or both (wrapping the downstream
/// result on the way back out — classic onion composition).
///
/// The trait is **sealed** (via the private `Sealed` supertrait): only the
/// blanket impl below can satisfy it. This prevents accidental misuse and
/// keeps the API surface stable across versions.
pub trait Middleware<I, O>: private::Sealed<I, O> + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_middleware(self) -> BoxedMiddleware<I, O>;
}

/// The sealing module. Because `Sealed` is private, external crates cannot
/// name it and therefore cannot implement `Middleware` on their own types.
mod private {
    pub trait Sealed<I, O> {}
}

// ── Blanket implementations ───────────────────────────────────────────────────

impl<F, Fut, I, O> private::Sealed<I, O> for F
where
    F: Fn(I, Next<I, O>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<O>> + Send + 'static,
{
}

/// Implement `Middleware` for any function with the right signature.
///
/// `Fn(I, Next<I, O>) -> Fut` covers:
///   - named `async fn` items
///   - closures that build and return an `async move` block
///   - any struct that implements `Fn`
impl<F, Fut, I, O> Middleware<I, O> for F
where
    F: Fn(I, Next<I, O>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<O>> + Send + 'static,
    I: Send + 'static,
    O: Send + 'static,
{
    fn into_boxed_middleware(self) -> BoxedMiddleware<I, O> {
        Arc::new(FnMiddleware(self))
    }
}

// ── Concrete wrapper ──────────────────────────────────────────────────────────

/// Newtype wrapper that holds a concrete middleware `F` and implements
/// [`ErasedMiddleware`], bridging the typed world to the trait-object world.
struct FnMiddleware<F>(F);

impl<F, Fut, I, O> ErasedMiddleware<I, O> for FnMiddleware<F>
where
    F: Fn(I, Next<I, O>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<O>> + Send + 'static,
{
    fn call(&self, input: I, next: Next<I, O>) -> BoxFuture<Result<O>> {
        Box::pin((self.0)(input, next))
    }
}
