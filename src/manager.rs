//! Per-request context container.
//!
//! One [`Manager`] exists per logical request. It owns the mapping from cell
//! identity to current value; the [`Cell`] object graph itself carries only
//! defaults. That split is what isolates concurrently in-flight requests:
//! two independently constructed managers never observe each other's writes,
//! even for cells sharing an id.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::cell::{Cell, CellId, ContextStorage};
use crate::error::{Error, Result};

/// The per-request context container: cell identity → current value.
///
/// `Manager` is a cheap handle — clones share the same underlying map and
/// stand for the same logical request. Construct a fresh one per request
/// (optionally seeded from a [`ContextStorage`]) and pass it to
/// [`Pipeline::run_with`](crate::Pipeline::run_with); release is implicit
/// when the last handle drops.
///
/// Isolation covers what goes through [`write`](Manager::write). A value
/// with interior mutability (say an `Arc<Mutex<_>>`) stored in a cell and
/// mutated directly is shared state like any other — don't reuse such a
/// cell's value across concurrently active managers.
#[derive(Clone)]
pub struct Manager {
    slots: Arc<RwLock<HashMap<CellId, Arc<dyn Any + Send + Sync>>>>,
}

impl Manager {
    /// An empty manager.
    pub fn new() -> Self {
        Self { slots: Arc::new(RwLock::new(HashMap::new())) }
    }

    /// A manager pre-populated from `storage`.
    pub fn with_storage(storage: ContextStorage) -> Self {
        Self { slots: Arc::new(RwLock::new(storage.into_entries())) }
    }

    /// The current value of `cell`'s slot, or the cell's own embedded value
    /// if this manager has never written the slot.
    ///
    /// Guard: a stored value that does not downcast to `T` means two cells
    /// of different types ended up sharing an id — rejected as
    /// [`Error::CellTypeMismatch`] rather than silently defaulted.
    pub fn read<T>(&self, cell: &Cell<T>) -> Result<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let stored = self.slots.read().get(&cell.id()).cloned();
        let value = match stored {
            Some(any) => any
                .downcast::<T>()
                .map_err(|_| Error::CellTypeMismatch { id: cell.id() })?,
            None => cell.initial_arc(),
        };
        Ok((*value).clone())
    }

    /// Installs a fresh value in `cell`'s slot.
    ///
    /// Copy-on-write: the slot is repointed at `cell.create(value)`; the
    /// previously stored value is never mutated in place, so anything still
    /// holding it keeps an unchanged snapshot.
    pub fn write<T>(&self, cell: &Cell<T>, value: T)
    where
        T: Send + Sync + 'static,
    {
        let fresh = cell.create(value);
        self.slots.write().insert(fresh.id(), fresh.initial_arc());
    }
}

impl Default for Manager {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Manager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Manager").field("slots", &self.slots.read().len()).finish()
    }
}

// ── CellHandle ────────────────────────────────────────────────────────────────

/// Get/set view of one cell inside one manager — what
/// [`use_cell`](crate::use_cell) returns.
pub struct CellHandle<T> {
    cell: Cell<T>,
    manager: Manager,
}

impl<T> CellHandle<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub(crate) fn new(cell: Cell<T>, manager: Manager) -> Self {
        Self { cell, manager }
    }

    /// The current value.
    pub fn get(&self) -> Result<T> {
        self.manager.read(&self.cell)
    }

    /// Installs `value` in the slot.
    pub fn set(&self, value: T) {
        self.manager.write(&self.cell, value);
    }
}

impl<T> fmt::Debug for CellHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CellHandle").field("cell", &self.cell).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_falls_back_to_the_embedded_value() {
        let cell = Cell::new(7u32);
        let manager = Manager::new();
        assert_eq!(manager.read(&cell).unwrap(), 7);
    }

    #[test]
    fn write_then_read_round_trips() {
        let cell = Cell::new(0u32);
        let manager = Manager::new();
        manager.write(&cell, 41);
        assert_eq!(manager.read(&cell).unwrap(), 41);
    }

    #[test]
    fn writes_never_touch_the_cell_itself() {
        let cell = Cell::new(0u32);
        let manager = Manager::new();
        manager.write(&cell, 41);
        assert_eq!(*cell.initial(), 0);
    }

    #[test]
    fn independent_managers_are_isolated() {
        // The per-manager map, not the cell graph, provides isolation.
        let cell = Cell::new(0u32);
        let a = Manager::new();
        let b = Manager::new();
        a.write(&cell, 1);
        b.write(&cell, 2);
        assert_eq!(a.read(&cell).unwrap(), 1);
        assert_eq!(b.read(&cell).unwrap(), 2);
    }

    #[test]
    fn clones_share_the_container() {
        let cell = Cell::new(0u32);
        let a = Manager::new();
        let b = a.clone();
        a.write(&cell, 5);
        assert_eq!(b.read(&cell).unwrap(), 5);
    }

    #[test]
    fn storage_seeds_are_visible() {
        let cell = Cell::new(0u32);
        let manager = Manager::with_storage(ContextStorage::new().with(&cell, 9));
        assert_eq!(manager.read(&cell).unwrap(), 9);
    }

    #[test]
    fn handle_get_set_round_trips() {
        let cell = Cell::new(String::new());
        let manager = Manager::new();
        let handle = CellHandle::new(cell, manager);
        handle.set("hi".to_owned());
        assert_eq!(handle.get().unwrap(), "hi");
    }
}
