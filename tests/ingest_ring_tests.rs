//! Ingestion ring: FIFO ordering, drop-on-full, fill accounting.

use std::collections::VecDeque;

use proptest::prelude::*;

use ssb_exciter::audio::{ingest_ring, AudioFrame};

fn frame(v: i16) -> AudioFrame {
    AudioFrame {
        l: v,
        r: v.wrapping_neg(),
    }
}

#[test]
fn pops_in_push_order() {
    let (mut tx, mut rx) = ingest_ring(16);
    for v in 0..10 {
        assert!(tx.push(frame(v)));
    }
    for v in 0..10 {
        assert_eq!(rx.pop(), Some(frame(v)));
    }
    assert_eq!(rx.pop(), None);
}

#[test]
fn full_ring_rejects_without_overwriting() {
    let (mut tx, mut rx) = ingest_ring(4);
    for v in 0..4 {
        assert!(tx.push(frame(v)));
    }
    assert!(tx.is_full());
    assert!(!tx.push(frame(99)));

    // The rejected frame must not have clobbered anything.
    for v in 0..4 {
        assert_eq!(rx.pop(), Some(frame(v)));
    }
    assert_eq!(rx.pop(), None);
}

#[test]
fn fill_tracks_push_and_pop() {
    let (mut tx, mut rx) = ingest_ring(8);
    assert_eq!(rx.fill(), 0);
    assert_eq!(rx.capacity(), 8);

    for v in 0..5 {
        tx.push(frame(v));
    }
    assert_eq!(rx.fill(), 5);

    rx.pop();
    rx.pop();
    assert_eq!(rx.fill(), 3);
}

proptest! {
    /// Any interleaving of pushes and pops behaves exactly like a bounded
    /// FIFO queue.
    #[test]
    fn matches_bounded_queue_model(ops in prop::collection::vec(any::<Option<i16>>(), 0..400)) {
        let (mut tx, mut rx) = ingest_ring(32);
        let mut model: VecDeque<AudioFrame> = VecDeque::new();

        for op in ops {
            match op {
                Some(v) => {
                    let accepted = tx.push(frame(v));
                    if model.len() < 32 {
                        prop_assert!(accepted);
                        model.push_back(frame(v));
                    } else {
                        prop_assert!(!accepted);
                    }
                }
                None => {
                    prop_assert_eq!(rx.pop(), model.pop_front());
                }
            }
            prop_assert_eq!(rx.fill(), model.len());
        }
    }
}
