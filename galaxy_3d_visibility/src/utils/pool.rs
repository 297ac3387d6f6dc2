/// Free-list pool of reusable objects.
///
/// Partitions allocate their per-node and per-entity lists from pools so
/// that steady-state indexing does not hit the heap: a released list keeps
/// its capacity and is handed out again on the next allocation.
/// Pools only grow. Nothing is freed until the pool itself is dropped.
///
/// # Example
///
/// ```ignore
/// let mut pool: Pool<Vec<u32>> = Pool::new();
/// let mut list = pool.allocate();   // fresh
/// list.push(7);
/// pool.release(list);               // cleared, kept
/// let list = pool.allocate();       // same allocation, empty
/// ```
pub struct Pool<T: Poolable> {
    free_list: Vec<T>,
    in_use: usize,
    created: usize,
}

/// Objects that can be recycled by a `Pool`
pub trait Poolable: Default {
    /// Bring the object back to its freshly-created observable state.
    ///
    /// Called on every release. Stale data surviving this call would leak
    /// into the next user of the object.
    fn reset(&mut self);
}

impl<T> Poolable for Vec<T> {
    fn reset(&mut self) {
        self.clear();
    }
}

impl<T: Poolable> Pool<T> {
    /// Create a new empty pool
    pub fn new() -> Self {
        Self {
            free_list: Vec::new(),
            in_use: 0,
            created: 0,
        }
    }

    /// Pop a free object, or create one when the free list is exhausted
    pub fn allocate(&mut self) -> T {
        self.in_use += 1;
        self.free_list.pop().unwrap_or_else(|| {
            self.created += 1;
            T::default()
        })
    }

    /// Reset an object and push it back on the free list
    pub fn release(&mut self, mut item: T) {
        debug_assert!(self.in_use > 0, "releasing more objects than allocated");
        item.reset();
        self.in_use = self.in_use.saturating_sub(1);
        self.free_list.push(item);
    }

    /// Number of objects handed out and not yet released
    pub fn in_use(&self) -> usize {
        self.in_use
    }

    /// Number of objects waiting on the free list
    pub fn free_count(&self) -> usize {
        self.free_list.len()
    }

    /// Total number of objects this pool ever created
    pub fn created(&self) -> usize {
        self.created
    }
}

impl<T: Poolable> Default for Pool<T> {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
