//! Model-based property tests for the sequence table.
//!
//! Random operation sequences run against both the real table and a plain
//! reference model; every result and the set of allocated slots must agree.

use std::{collections::BTreeSet, time::Duration};

use bytes::Bytes;
use ipmb_core::{SequenceError, SequenceTable, SlotLease};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Operation {
    Allocate,
    /// Drop the n-th held lease (modulo the number held)
    Drop(usize),
    Complete(u8),
}

fn operation_strategy() -> impl Strategy<Value = Operation> {
    prop_oneof![
        3 => Just(Operation::Allocate),
        2 => any::<usize>().prop_map(Operation::Drop),
        2 => (0u8..70).prop_map(Operation::Complete),
    ]
}

/// Reference model: round-robin over a fixed number of slots.
struct Model {
    capacity: usize,
    cursor: usize,
    in_use: BTreeSet<u8>,
    completed: BTreeSet<u8>,
}

impl Model {
    fn new(capacity: usize) -> Self {
        Self { capacity, cursor: 0, in_use: BTreeSet::new(), completed: BTreeSet::new() }
    }

    fn allocate(&mut self) -> Option<u8> {
        let index = (0..self.capacity)
            .map(|offset| (self.cursor + offset) % self.capacity)
            .find(|&index| !self.in_use.contains(&(index as u8)))?;
        self.cursor = (index + 1) % self.capacity;
        self.in_use.insert(index as u8);
        Some(index as u8)
    }

    fn release(&mut self, seq: u8) {
        self.in_use.remove(&seq);
        self.completed.remove(&seq);
    }

    fn complete(&mut self, seq: u8) -> bool {
        self.in_use.contains(&seq) && self.completed.insert(seq)
    }
}

proptest! {
    #[test]
    fn prop_table_matches_model(
        capacity in 1..=64usize,
        ops in prop::collection::vec(operation_strategy(), 0..200)
    ) {
        let table = SequenceTable::with_capacity(capacity);
        let mut model = Model::new(capacity);
        let mut held: Vec<SlotLease<'_>> = Vec::new();

        for (i, op) in ops.iter().enumerate() {
            match op {
                Operation::Allocate => {
                    let expected = model.allocate();
                    match table.allocate() {
                        Ok(lease) => {
                            prop_assert_eq!(Some(lease.seq()), expected, "op {}", i);
                            held.push(lease);
                        },
                        Err(e) => {
                            prop_assert_eq!(expected, None, "op {}", i);
                            prop_assert_eq!(e, SequenceError::Exhausted { capacity });
                        },
                    }
                },
                Operation::Drop(n) => {
                    if held.is_empty() {
                        continue;
                    }
                    let lease = held.swap_remove(n % held.len());
                    model.release(lease.seq());
                    drop(lease);
                },
                Operation::Complete(seq) => {
                    let expected = model.complete(*seq);
                    let actual = table.complete(*seq, Bytes::from_static(&[0x00]));
                    prop_assert_eq!(actual.is_ok(), expected, "op {}: complete({})", i, seq);
                },
            }

            prop_assert_eq!(table.outstanding(), model.in_use.len());
        }

        for seq in 0..64u8 {
            prop_assert_eq!(table.is_in_use(seq), model.in_use.contains(&seq));
        }

        drop(held);
        prop_assert_eq!(table.outstanding(), 0);
    }

    #[test]
    fn prop_waiters_only_see_their_own_payload(
        capacity in 2..=64usize,
        held in 2..=8usize,
        completions in prop::collection::vec(0u8..70, 0..40)
    ) {
        let runtime =
            tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap();
        let table = SequenceTable::with_capacity(capacity);
        let leases: Vec<_> =
            (0..held.min(capacity)).map(|_| table.allocate().unwrap()).collect();
        let owned: BTreeSet<u8> = leases.iter().map(SlotLease::seq).collect();

        // Every payload names the slot it was sent to
        let mut delivered = BTreeSet::new();
        for seq in completions {
            let accepted = table.complete(seq, Bytes::from(vec![seq])).is_ok();
            prop_assert_eq!(accepted, owned.contains(&seq) && delivered.insert(seq));
        }

        for lease in leases {
            let seq = lease.seq();
            let payload = runtime.block_on(lease.wait(Duration::from_millis(1)));
            if delivered.contains(&seq) {
                prop_assert_eq!(payload.as_deref(), Some(&[seq][..]));
            } else {
                prop_assert_eq!(payload, None);
            }
        }
        prop_assert_eq!(table.outstanding(), 0);
    }
}

#[tokio::test]
async fn completing_a_free_slot_does_not_reach_held_leases() {
    let table = SequenceTable::with_capacity(4);
    let first = table.allocate().unwrap();
    let second = table.allocate().unwrap();

    assert_eq!(
        table.complete(3, Bytes::from_static(b"stray")),
        Err(SequenceError::NotWaiting(3))
    );
    table.complete(second.seq(), Bytes::from_static(b"second")).unwrap();
    table.complete(first.seq(), Bytes::from_static(b"first")).unwrap();

    let wait = Duration::from_secs(1);
    assert_eq!(first.wait(wait).await.as_deref(), Some(&b"first"[..]));
    assert_eq!(second.wait(wait).await.as_deref(), Some(&b"second"[..]));
}
