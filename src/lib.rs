//! # nagare
//!
//! A minimal middleware-composition engine with ambient per-request context.
//! Nothing more. Nothing less.
//!
//! ## The contract
//!
//! The HTTP layer owns sockets, wire parsing, and response serialization.
//! nagare does not — by design. What's left is the part every framework
//! feature sits on top of:
//!
//! - **Onion dispatch** — an ordered middleware chain invoked through a
//!   reentrant [`Next`] continuation; call it zero, one, or many times
//! - **Ambient context** — per-request state ([`Cell`]/[`Manager`])
//!   resolvable from arbitrary call depth via [`use_cell`]/[`use_manager`],
//!   isolated across concurrently in-flight runs and correct across `await`
//! - **Prefix routing** — [`route`] nests sub-pipelines under pathname
//!   prefixes with a LIFO basename stack
//!
//! ## Quick start
//!
//! ```rust
//! use nagare::{Next, Pipeline, Request, Response};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> nagare::Result<()> {
//! let app = Pipeline::new()
//!     .with(|req: Request, next: Next<Request, Response>| async move {
//!         match req.query_param("name") {
//!             Some(name) => Ok(Response::text(format!("Hello {name}"))),
//!             None => next.call().await,
//!         }
//!     })
//!     .with(|_req: Request, _next: Next<Request, Response>| async move {
//!         Ok(Response::status(404))
//!     });
//!
//! let res = app.run(Request::get("/hello")).await?;
//! assert_eq!(res.status_code(), 404);
//! # Ok(())
//! # }
//! ```
//!
//! ## Ambient context
//!
//! State a middleware writes early is readable at any depth later — no
//! parameter threading, no globals. One [`Manager`] per logical request is
//! the isolation boundary:
//!
//! ```rust
//! use std::sync::LazyLock;
//! use nagare::{use_cell, use_cell_value, Cell, Manager, Next, Pipeline, Request, Response};
//!
//! static REQUEST_ID: LazyLock<Cell<u64>> = LazyLock::new(|| Cell::new(0));
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> nagare::Result<()> {
//! let app = Pipeline::new()
//!     .with(|req: Request, next: Next<Request, Response>| async move {
//!         use_cell(&REQUEST_ID)?.set(7);
//!         next.call_with(req).await
//!     })
//!     .with(|_req: Request, _next: Next<Request, Response>| async move {
//!         // Arbitrarily deep in the chain, same logical request:
//!         Ok(Response::text(format!("id={}", use_cell_value(&REQUEST_ID)?)))
//!     });
//!
//! let res = app.run_with(Request::get("/"), Manager::new()).await?;
//! assert_eq!(res.text_body(), Some("id=7"));
//! # Ok(())
//! # }
//! ```

mod ambient;
mod cell;
mod counter;
mod error;
mod manager;
mod pipeline;
mod request;
mod response;
mod routing;

pub mod middleware;

pub use ambient::{use_cell, use_cell_value, use_manager};
pub use cell::{Cell, CellId, ContextStorage};
pub use counter::Next;
pub use error::{Error, Result};
pub use manager::{CellHandle, Manager};
pub use middleware::Middleware;
pub use pipeline::{Pipeline, PipelineOptions};
pub use request::{Method, Request};
pub use response::{Body, Response, ResponseBuilder};
pub use routing::{basenames, route, use_basenames};
