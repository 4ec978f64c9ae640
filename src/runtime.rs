//! Cross-thread shared scalars.
//!
//! Every field has a single writer domain and is read lock-free; values that
//! gate another loop's behavior (start flag, CW test mode) use
//! acquire/release ordering, plain tunables use relaxed loads on the hot
//! paths.

use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU32, AtomicU64, Ordering};

use crate::rf::sx1280::{self, PWR_MAX_DBM, PWR_MIN_DBM};

pub const BASE_FREQ_HZ: u32 = 2_400_400_000;
pub const FREQ_MIN_HZ: u32 = 2_400_000_000;
pub const FREQ_MAX_HZ: u32 = 2_500_000_000;
pub const JITTER_MAX_US: u32 = 30;

/// Shared runtime state for both pipeline threads and the console.
#[derive(Debug)]
pub struct RuntimeShared {
    center_freq_hz: AtomicU32,
    /// PPM correction, f32 stored as raw bits.
    ppm_bits: AtomicU32,
    jitter_us: AtomicU32,
    tx_power_dbm: AtomicI32,
    host_rate_hz: AtomicU32,

    /// Bench CW mode: the apply loop must idle off the bus while set.
    cw_test: AtomicBool,
    /// Raised by the producer once the pre-buffering quota is filled.
    consumer_start: AtomicBool,

    underruns: AtomicU32,
    frames_dropped: AtomicU64,

    /// Diagnostics gauges, refreshed by the producer once per block.
    ingest_fill: AtomicU32,
    blocks_ready: AtomicU32,
}

impl RuntimeShared {
    pub fn new() -> Self {
        Self {
            center_freq_hz: AtomicU32::new(BASE_FREQ_HZ),
            ppm_bits: AtomicU32::new(0.0_f32.to_bits()),
            jitter_us: AtomicU32::new(0),
            tx_power_dbm: AtomicI32::new(PWR_MAX_DBM as i32),
            host_rate_hz: AtomicU32::new(48_000),
            cw_test: AtomicBool::new(false),
            consumer_start: AtomicBool::new(false),
            underruns: AtomicU32::new(0),
            frames_dropped: AtomicU64::new(0),
            ingest_fill: AtomicU32::new(0),
            blocks_ready: AtomicU32::new(0),
        }
    }

    pub fn center_freq_hz(&self) -> u32 {
        self.center_freq_hz.load(Ordering::Relaxed)
    }

    pub fn set_center_freq_hz(&self, hz: u32) {
        self.center_freq_hz
            .store(hz.clamp(FREQ_MIN_HZ, FREQ_MAX_HZ), Ordering::Relaxed);
    }

    pub fn ppm(&self) -> f32 {
        f32::from_bits(self.ppm_bits.load(Ordering::Relaxed))
    }

    pub fn set_ppm(&self, ppm: f32) {
        self.ppm_bits
            .store(ppm.clamp(-100.0, 100.0).to_bits(), Ordering::Relaxed);
    }

    pub fn jitter_us(&self) -> u32 {
        self.jitter_us.load(Ordering::Relaxed)
    }

    pub fn set_jitter_us(&self, us: u32) {
        self.jitter_us.store(us.min(JITTER_MAX_US), Ordering::Relaxed);
    }

    pub fn tx_power_dbm(&self) -> i8 {
        self.tx_power_dbm.load(Ordering::Relaxed) as i8
    }

    pub fn set_tx_power_dbm(&self, dbm: i8) {
        self.tx_power_dbm
            .store(dbm.clamp(PWR_MIN_DBM, PWR_MAX_DBM) as i32, Ordering::Relaxed);
    }

    pub fn host_rate_hz(&self) -> u32 {
        self.host_rate_hz.load(Ordering::Relaxed)
    }

    pub fn set_host_rate_hz(&self, hz: u32) {
        if hz > 0 {
            self.host_rate_hz.store(hz, Ordering::Relaxed);
        }
    }

    /// Carrier step count with the current frequency and PPM applied.
    pub fn base_steps(&self) -> u32 {
        sx1280::hz_to_steps(self.center_freq_hz(), self.ppm())
    }

    pub fn cw_test(&self) -> bool {
        self.cw_test.load(Ordering::Acquire)
    }

    pub fn set_cw_test(&self, on: bool) {
        self.cw_test.store(on, Ordering::Release);
    }

    pub fn consumer_started(&self) -> bool {
        self.consumer_start.load(Ordering::Acquire)
    }

    pub fn signal_consumer_start(&self) {
        self.consumer_start.store(true, Ordering::Release);
    }

    pub fn underruns(&self) -> u32 {
        self.underruns.load(Ordering::Relaxed)
    }

    pub fn count_underrun(&self) -> u32 {
        self.underruns.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn frames_dropped(&self) -> u64 {
        self.frames_dropped.load(Ordering::Relaxed)
    }

    pub fn count_dropped_frames(&self, n: u64) {
        self.frames_dropped.fetch_add(n, Ordering::Relaxed);
    }

    pub fn record_fill_levels(&self, ingest_fill: u32, blocks_ready: u32) {
        self.ingest_fill.store(ingest_fill, Ordering::Relaxed);
        self.blocks_ready.store(blocks_ready, Ordering::Relaxed);
    }

    pub fn ingest_fill(&self) -> u32 {
        self.ingest_fill.load(Ordering::Relaxed)
    }

    pub fn blocks_ready(&self) -> u32 {
        self.blocks_ready.load(Ordering::Relaxed)
    }
}

impl Default for RuntimeShared {
    fn default() -> Self {
        Self::new()
    }
}
