use crate::bloom::BloomFilter;
use crate::error::{Error, Result};
use crate::iterator::{MergeIterator, RunIterator};
use crate::memtable::MemRun;
use crate::types::{KVPair, Key, Value};

/// Lifecycle of one buffer slot. A slot is destroyed (removed from the
/// tier) once its contents have been committed to disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SlotState {
    Empty,
    Filling,
    Sealed,
}

/// A memory run paired with its membership filter.
pub(crate) struct BufferSlot<K, V> {
    run: MemRun<K, V>,
    filter: BloomFilter,
    state: SlotState,
}

impl<K: Key, V: Value> BufferSlot<K, V> {
    fn new(capacity: usize, fp_rate: f64) -> Self {
        BufferSlot {
            run: MemRun::new(capacity),
            filter: BloomFilter::new(capacity, fp_rate),
            state: SlotState::Empty,
        }
    }
}

/// The in-memory buffer tier (C0).
///
/// Slot order encodes recency: index 0 is the oldest. Writes go to the
/// first slot that is not sealed; a slot seals as soon as it holds
/// `elts_per_run` distinct keys. When every slot is sealed the tier is full
/// and the oldest slots must be flushed before the next write.
pub(crate) struct BufferTier<K, V> {
    slots: Vec<BufferSlot<K, V>>,
    num_slots: usize,
    elts_per_run: usize,
    fp_rate: f64,
}

impl<K: Key, V: Value> BufferTier<K, V> {
    pub(crate) fn new(num_slots: usize, elts_per_run: usize, fp_rate: f64) -> Self {
        BufferTier {
            slots: (0..num_slots)
                .map(|_| BufferSlot::new(elts_per_run, fp_rate))
                .collect(),
            num_slots,
            elts_per_run,
            fp_rate,
        }
    }

    /// Index of the slot the next write goes to, or None when the tier is full.
    pub(crate) fn write_target(&self) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| slot.state != SlotState::Sealed)
    }

    pub(crate) fn is_full(&self) -> bool {
        self.write_target().is_none()
    }

    pub(crate) fn insert(&mut self, key: K, value: V) -> Result<()> {
        let idx = self.write_target().ok_or(Error::CapacityExhausted)?;
        let slot = &mut self.slots[idx];
        slot.run.put(key, value);
        slot.filter.insert_key(&key);
        slot.state = if slot.run.is_full() {
            SlotState::Sealed
        } else {
            SlotState::Filling
        };
        Ok(())
    }

    /// Newest slot to oldest, skipping slots whose filter rules the key out.
    pub(crate) fn lookup(&self, key: &K) -> Option<V> {
        self.slots
            .iter()
            .rev()
            .filter(|slot| slot.state != SlotState::Empty)
            .filter(|slot| slot.filter.may_contain_key(key))
            .find_map(|slot| slot.run.get(key))
    }

    /// Merge the `count` oldest slots into one sorted, duplicate-free buffer.
    /// The slots themselves are left untouched.
    pub(crate) fn merge_oldest(&self, count: usize) -> Result<Vec<KVPair<K, V>>> {
        let count = count.min(self.slots.len());
        let sources: Vec<Box<dyn RunIterator<K, V> + '_>> = self.slots[..count]
            .iter()
            .rev()
            .map(|slot| Box::new(slot.run.iter()) as Box<dyn RunIterator<K, V> + '_>)
            .collect();
        MergeIterator::new(sources)?.collect_pairs()
    }

    /// Drop the `count` oldest slots and top the tier back up with empty ones.
    pub(crate) fn retire_oldest(&mut self, count: usize) {
        let count = count.min(self.slots.len());
        self.slots.drain(..count);
        while self.slots.len() < self.num_slots {
            let slot = BufferSlot::new(self.elts_per_run, self.fp_rate);
            self.slots.push(slot);
        }
    }

    /// Live elements across all slots.
    pub(crate) fn len(&self) -> usize {
        self.slots.iter().map(|slot| slot.run.len()).sum()
    }

    #[cfg(test)]
    pub(crate) fn states(&self) -> impl Iterator<Item = SlotState> + '_ {
        self.slots.iter().map(|slot| slot.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_seal_in_order() {
        let mut tier = BufferTier::<u32, u32>::new(3, 2, 0.01);
        assert_eq!(tier.write_target(), Some(0));

        tier.insert(1, 1).unwrap();
        assert_eq!(
            tier.states().collect::<Vec<_>>(),
            vec![SlotState::Filling, SlotState::Empty, SlotState::Empty]
        );

        tier.insert(2, 2).unwrap();
        assert_eq!(tier.write_target(), Some(1));

        for k in 3..=6 {
            tier.insert(k, k).unwrap();
        }
        assert!(tier.is_full());
        assert!(matches!(tier.insert(7, 7), Err(Error::CapacityExhausted)));
    }

    #[test]
    fn overwrite_does_not_consume_capacity() {
        let mut tier = BufferTier::<u32, u32>::new(2, 2, 0.01);
        tier.insert(1, 10).unwrap();
        tier.insert(1, 11).unwrap();
        assert_eq!(tier.write_target(), Some(0));
        assert_eq!(tier.lookup(&1), Some(11));
        assert_eq!(tier.len(), 1);
    }

    #[test]
    fn merge_prefers_newer_slot_and_retire_refills() {
        let mut tier = BufferTier::<u32, u32>::new(3, 2, 0.01);
        tier.insert(5, 1).unwrap();
        tier.insert(3, 1).unwrap();
        tier.insert(5, 2).unwrap(); // slot 0 is sealed, so this lands in slot 1
        tier.insert(1, 2).unwrap();

        let merged: Vec<_> = tier
            .merge_oldest(2)
            .unwrap()
            .into_iter()
            .map(KVPair::into_tuple)
            .collect();
        assert_eq!(merged, vec![(1, 2), (3, 1), (5, 2)]);

        tier.retire_oldest(2);
        assert_eq!(tier.len(), 0);
        assert_eq!(tier.states().count(), 3);
        assert_eq!(tier.write_target(), Some(0));
    }
}
