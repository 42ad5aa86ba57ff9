//! Identity-stable, replaceable value slots.
//!
//! A [`Cell`] is the unit of per-request state: a value paired with a stable
//! identity. The value is replaceable — [`Cell::create`] stamps a new value
//! onto the *same* identity — but the identity never changes. Two cells are
//! the same slot iff their ids are equal, independent of what they hold.
//!
//! Cells carry defaults; a [`Manager`](crate::Manager) carries the per-request
//! values. Reading a cell a manager has never written falls back to the
//! cell's own embedded value, so an unseeded slot always has a sane answer.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_CELL_ID: AtomicU64 = AtomicU64::new(0);

/// Opaque, process-unique identity of a cell slot.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct CellId(u64);

impl CellId {
    fn next() -> Self {
        Self(NEXT_CELL_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// An identity-stable, replaceable value slot.
///
/// Create one per piece of per-request state, usually in a `static`:
///
/// ```rust
/// use std::sync::LazyLock;
/// use nagare::Cell;
///
/// static REQUEST_ID: LazyLock<Cell<u64>> = LazyLock::new(|| Cell::new(0));
/// ```
///
/// Clones share the identity and the embedded value. The embedded value is
/// only a default — per-request values live in the
/// [`Manager`](crate::Manager), which is what keeps concurrently in-flight
/// requests isolated from each other.
pub struct Cell<T> {
    id: CellId,
    value: Arc<T>,
}

impl<T> Cell<T>
where
    T: Send + Sync + 'static,
{
    /// A new slot with a fresh identity, holding `value` as its default.
    pub fn new(value: T) -> Self {
        Self { id: CellId::next(), value: Arc::new(value) }
    }

    /// Stamps `value` onto the same identity.
    ///
    /// This is how [`Manager::write`](crate::Manager::write) installs values:
    /// the old cell is never mutated in place, a fresh one replaces it.
    pub fn create(&self, value: T) -> Self {
        Self { id: self.id, value: Arc::new(value) }
    }

    /// The slot's identity.
    pub fn id(&self) -> CellId {
        self.id
    }

    /// The cell's own embedded value — what [`Manager::read`](crate::Manager::read)
    /// falls back to when the slot has never been written.
    pub fn initial(&self) -> &T {
        &self.value
    }

    pub(crate) fn initial_arc(&self) -> Arc<T> {
        Arc::clone(&self.value)
    }
}

impl<T> Clone for Cell<T> {
    fn clone(&self) -> Self {
        Self { id: self.id, value: Arc::clone(&self.value) }
    }
}

impl<T> fmt::Debug for Cell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Cell").field(&self.id).finish()
    }
}

// ── ContextStorage ────────────────────────────────────────────────────────────

/// A seed set of cell values used to pre-populate a [`Manager`](crate::Manager).
///
/// The HTTP layer builds one per inbound request — headers cell, cookies
/// cell, parsed-query cell — and hands it to
/// [`Manager::with_storage`](crate::Manager::with_storage):
///
/// ```rust
/// use nagare::{Cell, ContextStorage, Manager};
///
/// let greeting = Cell::new(String::new());
/// let manager = Manager::with_storage(
///     ContextStorage::new().with(&greeting, "hello".to_owned()),
/// );
/// assert_eq!(manager.read(&greeting).unwrap(), "hello");
/// ```
#[derive(Default)]
pub struct ContextStorage {
    entries: HashMap<CellId, Arc<dyn Any + Send + Sync>>,
}

impl ContextStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds `cell`'s slot with `value`. Returns `self` for chaining.
    pub fn with<T>(mut self, cell: &Cell<T>, value: T) -> Self
    where
        T: Send + Sync + 'static,
    {
        let seeded = cell.create(value);
        self.entries.insert(seeded.id(), seeded.initial_arc());
        self
    }

    pub(crate) fn into_entries(self) -> HashMap<CellId, Arc<dyn Any + Send + Sync>> {
        self.entries
    }
}

impl fmt::Debug for ContextStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextStorage").field("entries", &self.entries.len()).finish()
    }
}
