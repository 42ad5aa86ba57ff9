//! Ambient propagation of the active [`Manager`].
//!
//! Middleware never pass the manager down the call stack. Deeply nested code
//! calls the parameter-free hooks in this module — [`use_manager`],
//! [`use_cell`], [`use_cell_value`] — and resolves the manager belonging to
//! the `run` whose logical call chain is currently executing.
//!
//! # How the binding works, and exactly what it guarantees
//!
//! The binding is a [`tokio::task_local!`] scope, not a global. When a
//! pipeline runs, the entire dispatch future is wrapped in
//! `scope(manager, fut)`; tokio enters the value every time that future is
//! polled and exits it when the poll returns. State therefore follows the
//! *causal chain* of the run, not wall-clock call order:
//!
//! - **Interleaving** — two `run` futures joined in one task each see their
//!   own manager: the binding is per poll, and only one of them is ever
//!   being polled at a given instant.
//! - **Suspension** — a middleware that awaits gives other manager-bound
//!   work room to execute; when the middleware resumes, its own manager is
//!   back in place for the rest of its body.
//! - **Nesting** — an inner `run` invoked from within an outer middleware
//!   pushes a new scope for the inner extent; the outer binding is restored
//!   when the inner future completes. Restoration is drop-based, so it holds
//!   on every exit path — a value return, an `Err`, or an unwind.
//!
//! Two limits, by construction:
//!
//! - The binding does **not** cross [`tokio::spawn`]. A spawned task is a new
//!   causal chain; hand it its manager explicitly via
//!   [`Pipeline::run_with`](crate::Pipeline::run_with).
//! - A hook evaluated outside any `run` extent fails with
//!   [`Error::OutsideRun`]. There is no silent default manager.

use std::future::Future;

use tokio::task_local;

use crate::cell::Cell;
use crate::error::{Error, Result};
use crate::manager::{CellHandle, Manager};

task_local! {
    static ACTIVE: Manager;
}

/// Runs `fut` with `manager` ambient for the future's entire extent.
pub(crate) async fn bind<F>(manager: Manager, fut: F) -> F::Output
where
    F: Future,
{
    ACTIVE.scope(manager, fut).await
}

/// The manager of the currently executing run.
///
/// Evaluated synchronously inside a middleware body, this always yields the
/// manager of the caller's own logical request — never a concurrently
/// executing request's manager, and never "no manager" while inside any
/// active run.
pub fn use_manager() -> Result<Manager> {
    ACTIVE.try_with(Manager::clone).map_err(|_| Error::OutsideRun)
}

/// Get/set access to `cell` in the ambient manager.
pub fn use_cell<T>(cell: &Cell<T>) -> Result<CellHandle<T>>
where
    T: Clone + Send + Sync + 'static,
{
    Ok(CellHandle::new(cell.clone(), use_manager()?))
}

/// The current value of `cell` in the ambient manager.
pub fn use_cell_value<T>(cell: &Cell<T>) -> Result<T>
where
    T: Clone + Send + Sync + 'static,
{
    use_manager()?.read(cell)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hooks_fail_outside_any_run() {
        assert!(matches!(use_manager(), Err(Error::OutsideRun)));

        let cell = Cell::new(0u32);
        assert!(matches!(use_cell(&cell), Err(Error::OutsideRun)));
        assert!(matches!(use_cell_value(&cell), Err(Error::OutsideRun)));
    }

    #[tokio::test]
    async fn bind_makes_the_manager_ambient() {
        let cell = Cell::new(0u32);
        let manager = Manager::new();
        manager.write(&cell, 41);

        let seen = bind(manager, async { use_cell_value(&cell) }).await.unwrap();
        assert_eq!(seen, 41);
    }

    #[tokio::test]
    async fn binding_survives_suspension_points() {
        let cell = Cell::new(0u32);
        let manager = Manager::new();
        manager.write(&cell, 1);

        bind(manager, async {
            assert_eq!(use_cell_value(&cell).unwrap(), 1);
            tokio::task::yield_now().await;
            assert_eq!(use_cell_value(&cell).unwrap(), 1);
        })
        .await;
    }

    #[tokio::test]
    async fn nested_binds_restore_the_outer_manager() {
        let cell = Cell::new(0u32);
        let outer = Manager::new();
        outer.write(&cell, 1);
        let inner = Manager::new();
        inner.write(&cell, 2);

        bind(outer, async {
            assert_eq!(use_cell_value(&cell).unwrap(), 1);
            bind(inner, async {
                assert_eq!(use_cell_value(&cell).unwrap(), 2);
            })
            .await;
            assert_eq!(use_cell_value(&cell).unwrap(), 1);
        })
        .await;
    }

    #[tokio::test]
    async fn outer_manager_is_restored_after_an_inner_error() {
        let cell = Cell::new(0u32);
        let outer = Manager::new();
        outer.write(&cell, 1);

        bind(outer, async {
            let failed: Result<()> =
                bind(Manager::new(), async { Err(Error::Exhausted) }).await;
            assert!(failed.is_err());
            assert_eq!(use_cell_value(&cell).unwrap(), 1);
        })
        .await;
    }

    #[tokio::test]
    async fn interleaved_binds_never_cross_observe() {
        let cell = Cell::new(0u32);

        // Both futures poll in the same task; yields force interleaving at
        // every step. Each side must keep seeing its own write.
        let run = |value: u32| {
            let cell = cell.clone();
            async move {
                let manager = Manager::new();
                manager.write(&cell, value);
                bind(manager, async move {
                    for _ in 0..4 {
                        tokio::task::yield_now().await;
                        assert_eq!(use_cell_value(&cell).unwrap(), value);
                    }
                    use_cell_value(&cell).unwrap()
                })
                .await
            }
        };

        let (a, b) = tokio::join!(run(1), run(2));
        assert_eq!((a, b), (1, 2));
    }

    #[tokio::test]
    async fn no_binding_leaks_once_the_scope_ends() {
        bind(Manager::new(), async {}).await;
        assert!(matches!(use_manager(), Err(Error::OutsideRun)));
    }
}
