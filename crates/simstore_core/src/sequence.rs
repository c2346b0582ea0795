//! Monotonic id sequences.

use crate::types::{EntityKind, RecordId};

/// Per-entity-kind counters minting record ids.
///
/// Counters only ever grow; an id handed out is never handed out again.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SequenceAllocator {
    data_record: u64,
    user: u64,
    user_group: u64,
}

impl SequenceAllocator {
    /// Creates an allocator with all counters at zero.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            data_record: 0,
            user: 0,
            user_group: 0,
        }
    }

    /// Creates an allocator from persisted counter values.
    #[must_use]
    pub const fn with_values(data_record: u64, user: u64, user_group: u64) -> Self {
        Self {
            data_record,
            user,
            user_group,
        }
    }

    fn counter_mut(&mut self, kind: EntityKind) -> &mut u64 {
        match kind {
            EntityKind::DataRecord => &mut self.data_record,
            EntityKind::User => &mut self.user,
            EntityKind::Group => &mut self.user_group,
        }
    }

    /// Advances the counter and returns the new value.
    pub fn next(&mut self, kind: EntityKind) -> u64 {
        let counter = self.counter_mut(kind);
        *counter += 1;
        *counter
    }

    /// Advances the counter and returns the new value as an id.
    pub fn next_id(&mut self, kind: EntityKind) -> RecordId {
        RecordId::new(self.next(kind))
    }

    /// Returns the current value of a counter.
    #[must_use]
    pub const fn current(&self, kind: EntityKind) -> u64 {
        match kind {
            EntityKind::DataRecord => self.data_record,
            EntityKind::User => self.user,
            EntityKind::Group => self.user_group,
        }
    }

    /// Raises a counter to `value` if it is behind.
    ///
    /// Restoring never lowers a counter, so ids minted before a restore
    /// cannot be minted again.
    pub fn restore(&mut self, kind: EntityKind, value: u64) {
        let counter = self.counter_mut(kind);
        *counter = (*counter).max(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn counters_are_independent() {
        let mut seq = SequenceAllocator::new();
        assert_eq!(seq.next(EntityKind::DataRecord), 1);
        assert_eq!(seq.next(EntityKind::DataRecord), 2);
        assert_eq!(seq.next(EntityKind::User), 1);
        assert_eq!(seq.next_id(EntityKind::Group).to_string(), "1.1");
        assert_eq!(seq.current(EntityKind::DataRecord), 2);
    }

    #[test]
    fn restore_never_lowers() {
        let mut seq = SequenceAllocator::with_values(5, 0, 0);
        seq.restore(EntityKind::DataRecord, 3);
        assert_eq!(seq.current(EntityKind::DataRecord), 5);
        seq.restore(EntityKind::User, 9);
        assert_eq!(seq.next(EntityKind::User), 10);
    }

    proptest! {
        #[test]
        fn ids_strictly_increase(n in 1usize..200) {
            let mut seq = SequenceAllocator::new();
            let ids: Vec<RecordId> = (0..n).map(|_| seq.next_id(EntityKind::DataRecord)).collect();
            prop_assert!(ids.windows(2).all(|w| w[0] < w[1]));
        }
    }
}
