//! Capacity-bounded ban-slot pool.
//!
//! An ordered queue of ban channels whose ban lists serve as storage for
//! group-contact access grants. The order *is* the allocation policy:
//!
//! - the front slot is always the next assignment target;
//! - a slot that fills up rotates to the back;
//! - a slot that sheds a ban moves to the front, so freed capacity is
//!   reused before any other slot is touched.
//!
//! Front-biased filling packs grants onto already-busy channels before
//! touching idle ones, and keeps selection and reinsertion O(1). Only the
//! queue operations are exposed; there is no general ordered-map surface.

use std::collections::VecDeque;

use thiserror::Error;

/// Every slot in the pool is at capacity.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("every ban channel is at capacity ({capacity} bans)")]
pub struct SlotPoolExhausted {
    /// The shared per-channel capacity.
    pub capacity: usize,
}

/// One ban channel and its live ban count.
///
/// The count covers every ban on the channel; foreign bans occupy
/// capacity just like account bans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BanSlot {
    /// Casefolded channel name.
    pub channel: String,
    /// Live ban count.
    pub count: usize,
}

/// Ordered pool of capacity-bounded ban channels.
#[derive(Debug, Clone)]
pub struct SlotPool {
    slots: VecDeque<BanSlot>,
    capacity: usize,
}

impl SlotPool {
    /// Empty pool in configuration order.
    pub fn new(channels: impl IntoIterator<Item = String>, capacity: usize) -> Self {
        Self::from_counts(channels.into_iter().map(|channel| (channel, 0)), capacity)
    }

    /// Build from observed counts, ordered descending by count.
    ///
    /// The sort is stable: ties keep the order given, which callers supply
    /// in configuration order for deterministic assignment.
    pub fn from_counts(
        counts: impl IntoIterator<Item = (String, usize)>,
        capacity: usize,
    ) -> Self {
        let mut slots: Vec<BanSlot> = counts
            .into_iter()
            .map(|(channel, count)| BanSlot { channel, count })
            .collect();
        slots.sort_by(|a, b| b.count.cmp(&a.count));
        Self {
            slots: slots.into(),
            capacity,
        }
    }

    /// The shared per-channel capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of pooled channels.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the pool has no channels at all.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// The slot currently at the front of the preference order.
    pub fn front(&self) -> Option<&BanSlot> {
        self.slots.front()
    }

    /// Live count for a channel, if pooled.
    pub fn count_of(&self, channel: &str) -> Option<usize> {
        self.slots
            .iter()
            .find(|slot| slot.channel == channel)
            .map(|slot| slot.count)
    }

    /// Spare capacity summed over the pool. Slots above capacity
    /// contribute nothing.
    pub fn total_spare(&self) -> usize {
        self.slots
            .iter()
            .map(|slot| self.capacity.saturating_sub(slot.count))
            .sum()
    }

    /// Snapshot of the current order, front first.
    pub fn order(&self) -> impl Iterator<Item = &BanSlot> {
        self.slots.iter()
    }

    /// Bootstrap defragmentation: a single sweep rotating each at-capacity
    /// slot from the front to the back, stopping at the first slot with
    /// room. The order is not re-sorted afterwards; after `from_counts`
    /// the full slots form a prefix, so one sweep leaves the front with
    /// room whenever any slot has it.
    pub fn demote_full_prefix(&mut self) {
        for _ in 0..self.slots.len() {
            let full = self
                .slots
                .front()
                .is_some_and(|slot| slot.count >= self.capacity);
            if !full {
                break;
            }
            if let Some(slot) = self.slots.pop_front() {
                self.slots.push_back(slot);
            }
        }
    }

    /// Select the front slot for a new grant, count it, and rotate the
    /// slot to the back once it reaches capacity.
    ///
    /// Fails only when the front slot is full; under the queue discipline
    /// that means every slot is.
    pub fn assign(&mut self) -> Result<String, SlotPoolExhausted> {
        let capacity = self.capacity;
        let slot = self
            .slots
            .front_mut()
            .ok_or(SlotPoolExhausted { capacity })?;
        if slot.count >= capacity {
            return Err(SlotPoolExhausted { capacity });
        }
        slot.count += 1;
        let channel = slot.channel.clone();
        if slot.count >= capacity {
            if let Some(full) = self.slots.pop_front() {
                self.slots.push_back(full);
            }
        }
        Ok(channel)
    }

    /// Record a shed ban on `channel` and move it to the front of the
    /// preference order. Unknown channels are ignored.
    pub fn release(&mut self, channel: &str) {
        if let Some(idx) = self.slots.iter().position(|slot| slot.channel == channel) {
            if let Some(mut slot) = self.slots.remove(idx) {
                slot.count = slot.count.saturating_sub(1);
                self.slots.push_front(slot);
            }
        }
    }
}
