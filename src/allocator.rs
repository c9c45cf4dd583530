//! Monotonic identifier allocation, one allocator per entity kind.

use tracing::warn;

// ---

/// Issues unique, increasing integer ids.
///
/// Each repository owns its own allocator. After hydrating persisted
/// records, call [`IdAllocator::reinitialize`] before the first
/// [`IdAllocator::next`] so new ids never collide with stored ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdAllocator {
    next: u64,
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the current counter value and advance it.
    ///
    /// The counter saturates at `u64::MAX`; once there, every call returns
    /// that same id.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> u64 {
        let id = self.next;
        match id.checked_add(1) {
            Some(next) => self.next = next,
            None => warn!(id, "Id allocator exhausted, reissuing the last id"),
        }
        id
    }

    /// The id the next call to [`IdAllocator::next`] will return.
    pub fn peek(&self) -> u64 {
        self.next
    }

    /// Reset the counter to one past the largest existing id, or 1 when
    /// there are none.
    pub fn reinitialize<I>(&mut self, existing: I)
    where
        I: IntoIterator<Item = u64>,
    {
        self.next = existing.into_iter().max().map_or(1, |max| {
            max.checked_add(1).unwrap_or_else(|| {
                warn!(max, "Stored id is at the counter limit, allocator saturated");
                max
            })
        });
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_starts_at_one_and_increments() {
        // ---
        let mut ids = IdAllocator::new();
        assert_eq!(ids.next(), 1);
        assert_eq!(ids.next(), 2);
        assert_eq!(ids.peek(), 3);
    }

    #[test]
    fn test_reinitialize_empty() {
        // ---
        let mut ids = IdAllocator::new();
        ids.next();
        ids.next();

        ids.reinitialize(Vec::new());
        assert_eq!(ids.next(), 1);
    }

    #[test]
    fn test_reinitialize_uses_max_not_last() {
        // ---
        let mut ids = IdAllocator::new();
        ids.reinitialize([5, 2]);
        assert_eq!(ids.next(), 6);
    }

    #[test]
    fn test_allocators_are_independent() {
        // ---
        let mut sensors = IdAllocator::new();
        let mut readings = IdAllocator::new();
        readings.reinitialize([40]);

        assert_eq!(sensors.next(), 1);
        assert_eq!(readings.next(), 41);
    }

    #[test]
    fn test_saturates_at_the_counter_limit() {
        // ---
        let mut ids = IdAllocator::new();
        ids.reinitialize([3, u64::MAX]);
        assert_eq!(ids.peek(), u64::MAX);

        assert_eq!(ids.next(), u64::MAX);
        assert_eq!(ids.next(), u64::MAX);
        assert_eq!(ids.peek(), u64::MAX);
    }
}
