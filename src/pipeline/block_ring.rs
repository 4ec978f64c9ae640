//! Cross-core command block handoff.
//!
//! A fixed ring of fixed-size command blocks, each slot independently
//! marked ready. The producer writes only the slot at its production index
//! and only after observing ready == false; the consumer reads only the
//! slot at its consumption index and only after observing ready == true.
//! Data is copied in/out under those observations, so a slot is owned by
//! exactly one side at any flag value; the flag stores use release
//! ordering and the loads acquire, making the copy visible before the
//! ownership transfer.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::rf::sx1280::PWR_MIN_DBM;

/// Commands per block; one block is 32 ms of real time at 8 kHz.
pub const BLOCK_SAMPLES: usize = 256;

/// Blocks in the ring.
pub const NUM_BLOCKS: usize = 8;

/// The unit of RF control for one internal-rate sample period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleCommand {
    /// Absolute synthesizer step count (carrier + modulation offset).
    pub freq_steps: i32,
    /// Chip-native transmit power in dBm.
    pub power_dbm: i8,
    pub tx_on: bool,
}

impl Default for SampleCommand {
    fn default() -> Self {
        Self {
            freq_steps: 0,
            power_dbm: PWR_MIN_DBM,
            tx_on: false,
        }
    }
}

struct Slot {
    ready: AtomicBool,
    cmds: UnsafeCell<[SampleCommand; BLOCK_SAMPLES]>,
}

// The ready-flag protocol above guarantees exclusive access to `cmds`.
unsafe impl Sync for Slot {}

impl Slot {
    fn new() -> Self {
        Self {
            ready: AtomicBool::new(false),
            cmds: UnsafeCell::new([SampleCommand::default(); BLOCK_SAMPLES]),
        }
    }
}

struct BlockRing {
    slots: Vec<Slot>,
}

impl BlockRing {
    fn ready_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| s.ready.load(Ordering::Acquire))
            .count()
    }
}

/// Create a connected producer/consumer handle pair over a fresh ring.
/// The handle types enforce the single-writer/single-reader discipline.
pub fn block_ring() -> (BlockProducer, BlockConsumer) {
    let ring = Arc::new(BlockRing {
        slots: (0..NUM_BLOCKS).map(|_| Slot::new()).collect(),
    });
    (
        BlockProducer {
            ring: Arc::clone(&ring),
            index: 0,
        },
        BlockConsumer { ring, index: 0 },
    )
}

/// Writer half, owned by the producer core.
pub struct BlockProducer {
    ring: Arc<BlockRing>,
    index: usize,
}

impl BlockProducer {
    /// Whether the slot at the production index may be written.
    pub fn slot_free(&self) -> bool {
        !self.ring.slots[self.index].ready.load(Ordering::Acquire)
    }

    /// Copy a finished block into the current slot, mark it ready and
    /// advance. Callers must have observed `slot_free()`; the producer
    /// never overwrites a block the consumer has not drained.
    pub fn publish(&mut self, cmds: &[SampleCommand; BLOCK_SAMPLES]) {
        let slot = &self.ring.slots[self.index];
        debug_assert!(!slot.ready.load(Ordering::Acquire), "publish into ready slot");
        unsafe {
            *slot.cmds.get() = *cmds;
        }
        slot.ready.store(true, Ordering::Release);
        self.index = (self.index + 1) % NUM_BLOCKS;
    }

    /// Blocks currently ready for the consumer.
    pub fn ready_count(&self) -> usize {
        self.ring.ready_count()
    }
}

/// Reader half, owned by the apply-loop core.
pub struct BlockConsumer {
    ring: Arc<BlockRing>,
    index: usize,
}

impl BlockConsumer {
    /// Copy out the block at the consumption index if it is ready,
    /// clearing the flag strictly after the copy. Returns false on
    /// underrun (slot not yet filled) without advancing.
    pub fn try_consume(&mut self, out: &mut [SampleCommand; BLOCK_SAMPLES]) -> bool {
        let slot = &self.ring.slots[self.index];
        if !slot.ready.load(Ordering::Acquire) {
            return false;
        }
        unsafe {
            *out = *slot.cmds.get();
        }
        slot.ready.store(false, Ordering::Release);
        self.index = (self.index + 1) % NUM_BLOCKS;
        true
    }

    pub fn ready_count(&self) -> usize {
        self.ring.ready_count()
    }
}
