//! Command block ring: slot ownership, ordering, and cross-thread handoff.

use std::thread;

use serial_test::serial;

use ssb_exciter::pipeline::{block_ring, SampleCommand, BLOCK_SAMPLES, NUM_BLOCKS};

fn tagged_block(tag: i32) -> [SampleCommand; BLOCK_SAMPLES] {
    let mut block = [SampleCommand::default(); BLOCK_SAMPLES];
    for (i, cmd) in block.iter_mut().enumerate() {
        cmd.freq_steps = tag * BLOCK_SAMPLES as i32 + i as i32;
    }
    block
}

#[test]
fn empty_ring_has_nothing_to_consume() {
    let (tx, mut rx) = block_ring();
    let mut out = [SampleCommand::default(); BLOCK_SAMPLES];
    assert!(!rx.try_consume(&mut out));
    assert_eq!(tx.ready_count(), 0);
}

#[test]
fn blocks_come_out_in_publish_order() {
    let (mut tx, mut rx) = block_ring();

    for tag in 0..NUM_BLOCKS as i32 {
        assert!(tx.slot_free());
        tx.publish(&tagged_block(tag));
    }
    // Every slot is now occupied.
    assert!(!tx.slot_free());
    assert_eq!(rx.ready_count(), NUM_BLOCKS);

    let mut out = [SampleCommand::default(); BLOCK_SAMPLES];
    for tag in 0..NUM_BLOCKS as i32 {
        assert!(rx.try_consume(&mut out));
        assert_eq!(out[0].freq_steps, tag * BLOCK_SAMPLES as i32);
        assert_eq!(
            out[BLOCK_SAMPLES - 1].freq_steps,
            tag * BLOCK_SAMPLES as i32 + BLOCK_SAMPLES as i32 - 1
        );
    }
    assert!(!rx.try_consume(&mut out));
}

#[test]
fn draining_one_slot_frees_exactly_one_publish() {
    let (mut tx, mut rx) = block_ring();
    for tag in 0..NUM_BLOCKS as i32 {
        tx.publish(&tagged_block(tag));
    }
    assert!(!tx.slot_free());

    let mut out = [SampleCommand::default(); BLOCK_SAMPLES];
    assert!(rx.try_consume(&mut out));
    assert!(tx.slot_free());
    tx.publish(&tagged_block(99));
    assert!(!tx.slot_free());
}

#[test]
#[serial]
fn cross_thread_handoff_preserves_order_and_content() {
    let (mut tx, mut rx) = block_ring();
    const TOTAL: i32 = 200;

    let producer = thread::spawn(move || {
        for tag in 0..TOTAL {
            while !tx.slot_free() {
                std::hint::spin_loop();
            }
            tx.publish(&tagged_block(tag));
        }
    });

    let mut out = [SampleCommand::default(); BLOCK_SAMPLES];
    for tag in 0..TOTAL {
        while !rx.try_consume(&mut out) {
            std::hint::spin_loop();
        }
        for (i, cmd) in out.iter().enumerate() {
            assert_eq!(cmd.freq_steps, tag * BLOCK_SAMPLES as i32 + i as i32);
        }
    }

    producer.join().unwrap();
}
