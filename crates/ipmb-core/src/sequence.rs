//! Sequence table: correlation slots for outstanding bus requests.
//!
//! Each outgoing request borrows one slot for its whole round trip. The slot
//! index is the 6-bit requester sequence number stamped into the frame; the
//! far end echoes it back, and that is how a response finds its waiter.
//!
//! # Slot lifecycle
//!
//! ```text
//!            allocate                complete
//!   ┌──────┐ ───────> ┌───────────┐ ───────> ┌──────────┐
//!   │ Free │          │ Allocated │          │ Signaled │
//!   └──────┘ <─────── └───────────┘          └──────────┘
//!      ^      release       │ timeout             │
//!      └────────────────────┴─────────────────────┘
//!                        release
//! ```
//!
//! There is no shared response buffer. Allocation hands back a
//! [`SlotLease`] holding the receiving half of a oneshot channel; completion
//! sends the payload through the sending half kept in the slot. Ownership of
//! the bytes moves to the waiter, so the collector and the waiter never alias
//! the same memory. A slot only returns to the free pool when its lease is
//! dropped or explicitly [released](SlotLease::release). Each allocation
//! bumps the slot's generation, and a release carrying a stale generation
//! is ignored, so one request can never free a slot another now owns.

use std::{
    sync::{Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use bytes::Bytes;
use ipmb_proto::SEQ_NUM_MAX;
use tokio::sync::oneshot;

use crate::error::SequenceError;

#[derive(Debug, Default)]
struct Slot {
    in_use: bool,
    /// Bumped on every allocation
    generation: u64,
    waiter: Option<oneshot::Sender<Bytes>>,
}

#[derive(Debug)]
struct Slots {
    /// Next index the round-robin search starts from
    cursor: usize,
    arena: Vec<Slot>,
}

/// Fixed pool of sequence slots for one bus.
///
/// All mutations happen under a single mutex. The lock is never held while
/// a waiter blocks or while a completion wakes it.
#[derive(Debug)]
pub struct SequenceTable {
    slots: Mutex<Slots>,
}

impl SequenceTable {
    /// Table with the full 64 sequence numbers.
    pub fn new() -> Self {
        Self::with_capacity(SEQ_NUM_MAX)
    }

    /// Table with `capacity` slots, clamped to `1..=64`.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.clamp(1, SEQ_NUM_MAX);
        let arena = (0..capacity).map(|_| Slot::default()).collect();
        Self { slots: Mutex::new(Slots { cursor: 0, arena }) }
    }

    fn lock(&self) -> MutexGuard<'_, Slots> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.lock().arena.len()
    }

    /// Number of allocated slots.
    pub fn outstanding(&self) -> usize {
        self.lock().arena.iter().filter(|slot| slot.in_use).count()
    }

    /// Whether `seq` is currently allocated.
    pub fn is_in_use(&self, seq: u8) -> bool {
        self.lock().arena.get(usize::from(seq)).is_some_and(|slot| slot.in_use)
    }

    /// Allocate the next free slot, searching round-robin from just past the
    /// last one issued.
    ///
    /// # Errors
    ///
    /// `Exhausted` if every slot is in use.
    pub fn allocate(&self) -> Result<SlotLease<'_>, SequenceError> {
        let mut slots = self.lock();
        let capacity = slots.arena.len();
        let start = slots.cursor;

        let index = (0..capacity)
            .map(|offset| (start + offset) % capacity)
            .find(|&index| !slots.arena[index].in_use)
            .ok_or(SequenceError::Exhausted { capacity })?;

        let (tx, rx) = oneshot::channel();
        let slot = &mut slots.arena[index];
        slot.in_use = true;
        slot.generation = slot.generation.wrapping_add(1);
        slot.waiter = Some(tx);
        let generation = slot.generation;
        slots.cursor = (index + 1) % capacity;

        Ok(SlotLease { table: self, seq: index as u8, generation, response: rx })
    }

    /// Deliver `payload` to whoever holds slot `seq`.
    ///
    /// The slot stays allocated; only its owner frees it.
    ///
    /// # Errors
    ///
    /// `NotWaiting` if the slot is free, was already completed, or its
    /// waiter has gone away. Nothing else is touched in that case.
    pub fn complete(&self, seq: u8, payload: Bytes) -> Result<(), SequenceError> {
        let waiter = {
            let mut slots = self.lock();
            slots
                .arena
                .get_mut(usize::from(seq))
                .filter(|slot| slot.in_use)
                .and_then(|slot| slot.waiter.take())
        };

        match waiter {
            Some(tx) => tx.send(payload).map_err(|_| SequenceError::NotWaiting(seq)),
            None => Err(SequenceError::NotWaiting(seq)),
        }
    }

    /// Return slot `seq` to the free pool if it is still the allocation
    /// identified by `generation`.
    fn release(&self, seq: u8, generation: u64) {
        let mut slots = self.lock();
        let Some(slot) = slots.arena.get_mut(usize::from(seq)) else {
            return;
        };
        if slot.in_use && slot.generation == generation {
            slot.in_use = false;
            slot.waiter = None;
        }
    }
}

impl Default for SequenceTable {
    fn default() -> Self {
        Self::new()
    }
}

/// An allocated sequence slot.
///
/// Dropping the lease releases the slot, whichever way the request ended.
#[derive(Debug)]
pub struct SlotLease<'a> {
    table: &'a SequenceTable,
    seq: u8,
    generation: u64,
    response: oneshot::Receiver<Bytes>,
}

impl SlotLease<'_> {
    /// Sequence number to stamp into the outgoing frame.
    pub fn seq(&self) -> u8 {
        self.seq
    }

    /// Give the slot back without waiting.
    pub fn release(self) {
        drop(self);
    }

    /// Wait up to `timeout` for the correlated response payload.
    ///
    /// Returns `None` on timeout. The slot is released when the lease is
    /// dropped at the end of this call.
    pub async fn wait(mut self, timeout: Duration) -> Option<Bytes> {
        match tokio::time::timeout(timeout, &mut self.response).await {
            Ok(Ok(payload)) => Some(payload),
            Ok(Err(_)) | Err(_) => None,
        }
    }
}

impl Drop for SlotLease<'_> {
    fn drop(&mut self) {
        self.table.release(self.seq, self.generation);
    }
}
