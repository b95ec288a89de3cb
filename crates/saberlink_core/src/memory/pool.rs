//! # Object Pool
//!
//! Fixed-capacity pool of reusable objects. Unlike an allocator, slots are
//! never empty: every object exists for the pool's whole lifetime and is
//! either active (in use) or lazy (free to be picked up again).

/// Object that can live in an [`ObjectPool`].
pub trait Poolable {
    /// Whether the object is currently in use.
    fn is_active(&self) -> bool;
}

/// Handle to a pooled object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PoolHandle {
    index: usize,
}

impl PoolHandle {
    /// Slot index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.index
    }
}

/// A pool of pre-built objects.
///
/// The number of simultaneously active objects can never exceed the
/// capacity: a request when nothing is lazy returns `None` and is counted.
///
/// # Example
///
/// ```rust,ignore
/// let mut pool = ObjectPool::from_fn(20, |_| Note::default());
///
/// if let Some(note) = pool.acquire() {
///     note.start(lane, layer);
/// }
/// ```
#[derive(Debug)]
pub struct ObjectPool<T> {
    slots: Box<[T]>,
    /// Acquire requests that found no lazy object.
    dropped: u64,
}

impl<T: Poolable> ObjectPool<T> {
    /// Builds every object up front.
    ///
    /// # Arguments
    ///
    /// * `capacity` - Number of objects
    /// * `build` - Called once per slot with its index
    #[must_use]
    pub fn from_fn(capacity: usize, build: impl FnMut(usize) -> T) -> Self {
        Self {
            slots: (0..capacity).map(build).collect(),
            dropped: 0,
        }
    }

    /// Returns the total capacity.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of active objects.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_active()).count()
    }

    /// Number of lazy objects.
    #[must_use]
    pub fn free_count(&self) -> usize {
        self.capacity() - self.active_count()
    }

    /// Acquire requests that found the pool exhausted.
    #[inline]
    #[must_use]
    pub const fn dropped(&self) -> u64 {
        self.dropped
    }

    /// First lazy object, in slot order.
    ///
    /// The caller must activate it; until then the same object is returned
    /// again.
    ///
    /// # Returns
    ///
    /// `None` if every object is active.
    pub fn acquire(&mut self) -> Option<(PoolHandle, &mut T)> {
        let found = self
            .slots
            .iter_mut()
            .enumerate()
            .find(|(_, slot)| !slot.is_active())
            .map(|(index, slot)| (PoolHandle { index }, slot));
        if found.is_none() {
            self.dropped += 1;
        }
        found
    }

    /// Lazy objects, in slot order.
    pub fn lazy(&mut self) -> impl Iterator<Item = &mut T> {
        self.slots.iter_mut().filter(|s| !s.is_active())
    }

    /// Gets a pooled object.
    #[inline]
    #[must_use]
    pub fn get(&self, handle: PoolHandle) -> Option<&T> {
        self.slots.get(handle.index)
    }

    /// Gets a pooled object mutably.
    #[inline]
    pub fn get_mut(&mut self, handle: PoolHandle) -> Option<&mut T> {
        self.slots.get_mut(handle.index)
    }

    /// Iterates over all objects, active or not.
    pub fn iter(&self) -> impl Iterator<Item = (PoolHandle, &T)> {
        self.slots
            .iter()
            .enumerate()
            .map(|(index, v)| (PoolHandle { index }, v))
    }

    /// Iterates mutably over all objects, active or not.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (PoolHandle, &mut T)> {
        self.slots
            .iter_mut()
            .enumerate()
            .map(|(index, v)| (PoolHandle { index }, v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Slot {
        active: bool,
    }

    impl Poolable for Slot {
        fn is_active(&self) -> bool {
            self.active
        }
    }

    #[test]
    fn test_acquire_until_exhausted() {
        let mut pool = ObjectPool::from_fn(3, |_| Slot::default());

        for expected in 0..3 {
            let (handle, slot) = pool.acquire().unwrap();
            assert_eq!(handle.index(), expected);
            slot.active = true;
        }

        assert!(pool.acquire().is_none());
        assert!(pool.acquire().is_none());
        assert_eq!(pool.active_count(), 3);
        assert_eq!(pool.dropped(), 2);
    }

    #[test]
    fn test_unactivated_acquire_returns_same_slot() {
        let mut pool = ObjectPool::from_fn(2, |_| Slot::default());
        let first = pool.acquire().unwrap().0;
        let second = pool.acquire().unwrap().0;
        assert_eq!(first, second);
    }

    #[test]
    fn test_deactivated_slot_is_reused() {
        let mut pool = ObjectPool::from_fn(2, |_| Slot::default());
        for slot in pool.lazy() {
            slot.active = true;
        }
        assert_eq!(pool.free_count(), 0);

        let handle = PoolHandle { index: 1 };
        pool.get_mut(handle).unwrap().active = false;

        assert_eq!(pool.acquire().unwrap().0, handle);
        assert_eq!(pool.lazy().count(), 1);
    }
}
