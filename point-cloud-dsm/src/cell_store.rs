//! Worker-private "highest point so far" slots with one lock per cell.

use crate::point::Point;
use parking_lot::Mutex;

/// Dense array of cell slots, each behind its own guard so updates to
/// different cells never contend.
pub struct CellStore {
    slots: Vec<Mutex<Point>>,
}

impl CellStore {
    /// All slots start as [`Point::SENTINEL`].
    pub fn new(cell_count: usize) -> Self {
        Self {
            slots: (0..cell_count).map(|_| Mutex::new(Point::SENTINEL)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Replace the slot at `index` when `candidate` is strictly higher.
    /// The guard is dropped on every path, replaced or not.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.len()`; callers resolve indices through
    /// [`GridGeometry::locate`](crate::geometry::GridGeometry::locate).
    #[inline]
    pub fn try_update(&self, index: usize, candidate: Point) {
        let mut slot = self.slots[index].lock();
        if candidate.outranks(&slot) {
            *slot = candidate;
        }
    }

    /// Copy of the current slot content.
    pub fn snapshot(&self, index: usize) -> Point {
        *self.slots[index].lock()
    }

    /// Unwrap the slots once no stage holds a reference any more.
    pub fn into_points(self) -> Vec<Point> {
        self.slots.into_iter().map(Mutex::into_inner).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_store_is_all_sentinel() {
        let store = CellStore::new(4);
        assert_eq!(store.len(), 4);
        assert!(store.into_points().iter().all(Point::is_sentinel));
    }

    #[test]
    fn test_higher_point_replaces() {
        let store = CellStore::new(1);
        store.try_update(0, Point::new(0.0, 0.0, 5.0, 1));
        store.try_update(0, Point::new(0.0, 0.0, 10.0, 2));
        assert_eq!(store.snapshot(0).label, 2);
    }

    #[test]
    fn test_lower_point_is_ignored() {
        let store = CellStore::new(1);
        store.try_update(0, Point::new(0.0, 0.0, 10.0, 2));
        store.try_update(0, Point::new(0.0, 0.0, 5.0, 1));
        assert_eq!(store.snapshot(0).z, 10.0);
        assert_eq!(store.snapshot(0).label, 2);
    }

    #[test]
    fn test_equal_elevation_keeps_incumbent() {
        let store = CellStore::new(1);
        store.try_update(0, Point::new(0.0, 0.0, 3.0, 1));
        store.try_update(0, Point::new(0.5, 0.5, 3.0, 9));
        assert_eq!(store.snapshot(0).label, 1);
    }

    #[test]
    fn test_guard_released_when_not_replaced() {
        let store = CellStore::new(1);
        store.try_update(0, Point::new(0.0, 0.0, 3.0, 1));
        store.try_update(0, Point::new(0.0, 0.0, 1.0, 2));
        // A leaked guard would deadlock here.
        store.try_update(0, Point::new(0.0, 0.0, 4.0, 3));
        assert_eq!(store.snapshot(0).label, 3);
    }

    #[test]
    fn test_concurrent_writers_keep_maximum() {
        let store = CellStore::new(2);
        std::thread::scope(|scope| {
            for writer in 0..4u32 {
                let store = &store;
                scope.spawn(move || {
                    for step in 0..1_000u32 {
                        let z = f64::from(step * 4 + writer);
                        store.try_update((step % 2) as usize, Point::new(0.0, 0.0, z, writer));
                    }
                });
            }
        });

        let points = store.into_points();
        // Cell 0 sees even steps (max step 998), cell 1 odd steps (max 999).
        assert_eq!(points[0].z, 998.0 * 4.0 + 3.0);
        assert_eq!(points[1].z, 999.0 * 4.0 + 3.0);
        assert_eq!(points[1].label, 3);
    }
}
