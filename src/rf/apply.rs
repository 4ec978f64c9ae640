//! Hard-timed RF apply loop.
//!
//! Drains command blocks and writes each sample's frequency, power and
//! carrier state to the chip on a 125 µs cadence. Writes are delta-elided
//! (a field is only re-sent when it changed) and each deadline can be
//! offset by a small pseudo-random jitter to decorrelate the quantization
//! dither from the sample clock. On underrun the last command is held for
//! one period and a counter is bumped; bench CW mode parks the loop off
//! the bus entirely.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossbeam::utils::Backoff;
use tracing::{error, info, warn};

use crate::pipeline::block_ring::{BlockConsumer, SampleCommand, BLOCK_SAMPLES};
use crate::rf::sx1280::{RadioBus, StandbyMode, Sx1280};
use crate::runtime::RuntimeShared;

/// One internal-rate sample period.
pub const SAMPLE_PERIOD_US: u64 = 125;

/// Busy-wait granularity inside one period.
const WAIT_SUBSTEPS: u64 = 4;

/// Underrun warnings are rate limited to one per this many events.
const UNDERRUN_WARN_EVERY: u32 = 64;

/// Monotonic microsecond source. Abstracted so tests can drive the loop
/// with a deterministic clock.
pub trait MonoClock {
    fn now_us(&self) -> u64;
}

/// Wall clock anchored at construction time.
pub struct StdClock {
    origin: Instant,
}

impl StdClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonoClock for StdClock {
    fn now_us(&self) -> u64 {
        self.origin.elapsed().as_micros() as u64
    }
}

/// Advance a 16-bit Galois LFSR (taps 0xB400, full period 65535).
pub fn lfsr_next(state: &mut u16) -> u16 {
    let lsb = *state & 1;
    *state >>= 1;
    if lsb != 0 {
        *state ^= 0xB400;
    }
    *state
}

pub struct ApplyLoop<B: RadioBus, C: MonoClock> {
    radio: Sx1280<B>,
    clock: C,
    blocks: BlockConsumer,
    shared: Arc<RuntimeShared>,

    last_steps: i32,
    last_dbm: i8,
    last_tx_on: bool,
    lfsr: u16,
    warned_at: u32,
}

impl<B: RadioBus, C: MonoClock> ApplyLoop<B, C> {
    pub fn new(
        radio: Sx1280<B>,
        clock: C,
        blocks: BlockConsumer,
        shared: Arc<RuntimeShared>,
    ) -> Self {
        Self {
            radio,
            clock,
            blocks,
            shared,
            // Sentinels force a full write on the first command.
            last_steps: i32::MAX,
            last_dbm: i8::MAX,
            last_tx_on: false,
            lfsr: 0xACE1,
            warned_at: 0,
        }
    }

    /// Bring the chip to a known state: standby on crystal, GFSK packet
    /// engine (required before CW), PA off.
    pub fn init_radio(&mut self) -> Result<()> {
        self.radio.set_standby(StandbyMode::Xosc)?;
        self.radio.set_packet_type_gfsk()?;
        info!("📡 APPLY: radio initialized, standing by");
        Ok(())
    }

    /// Park until the producer signals that pre-buffering is complete.
    pub fn wait_for_start(&self) {
        let backoff = Backoff::new();
        while !self.shared.consumer_started() {
            backoff.snooze();
        }
    }

    /// Drain and apply one block, or handle one idle/underrun period.
    /// Returns the number of commands written to the bus.
    pub fn run_once(&mut self) -> Result<usize> {
        if self.shared.cw_test() {
            // Bench CW owns the bus; stay off it and poll lazily.
            thread::sleep(Duration::from_millis(10));
            return Ok(0);
        }

        let mut block = [SampleCommand::default(); BLOCK_SAMPLES];
        if !self.blocks.try_consume(&mut block) {
            let n = self.shared.count_underrun();
            if n >= self.warned_at + UNDERRUN_WARN_EVERY || n == 1 {
                self.warned_at = n;
                warn!("📡 APPLY: block underrun #{n}, holding last command");
            }
            let deadline = self.clock.now_us() + SAMPLE_PERIOD_US;
            self.wait_until(deadline);
            return Ok(0);
        }

        let jitter_scale = self.shared.jitter_us() as i64;
        let start = self.clock.now_us();

        for (i, cmd) in block.iter().enumerate() {
            let nominal = start + (i as u64 + 1) * SAMPLE_PERIOD_US;
            let deadline = if jitter_scale > 0 {
                let r = lfsr_next(&mut self.lfsr);
                let offset = (((r & 0x1F) as i64) - 16) * jitter_scale / 16;
                nominal.saturating_add_signed(offset)
            } else {
                nominal
            };

            self.apply_deltas(cmd)?;
            self.wait_until(deadline);
        }

        Ok(BLOCK_SAMPLES)
    }

    /// Write only the fields that differ from the last applied command.
    /// Keying order: frequency and power are programmed before the
    /// carrier turns on, and the carrier is dropped before anything else
    /// when turning off.
    fn apply_deltas(&mut self, cmd: &SampleCommand) -> Result<()> {
        if !cmd.tx_on && self.last_tx_on {
            self.radio.set_standby(StandbyMode::Xosc)?;
            self.last_tx_on = false;
        }

        if cmd.freq_steps != self.last_steps {
            self.radio.set_rf_frequency_steps(cmd.freq_steps as u32)?;
            self.last_steps = cmd.freq_steps;
        }

        if cmd.power_dbm != self.last_dbm {
            self.radio.set_tx_power(cmd.power_dbm)?;
            self.last_dbm = cmd.power_dbm;
        }

        if cmd.tx_on && !self.last_tx_on {
            self.radio.start_tx_continuous_wave()?;
            self.last_tx_on = true;
        }

        Ok(())
    }

    /// Busy wait with spin hints; sleeping is too coarse at this period.
    fn wait_until(&self, deadline_us: u64) {
        let step = SAMPLE_PERIOD_US / WAIT_SUBSTEPS;
        loop {
            let now = self.clock.now_us();
            if now >= deadline_us {
                return;
            }
            let mut spins = if deadline_us - now > step { 64 } else { 8 };
            while spins > 0 {
                std::hint::spin_loop();
                spins -= 1;
            }
        }
    }

    pub fn run(mut self) -> ! {
        if let Err(e) = self.init_radio() {
            error!("📡 APPLY: radio init failed: {e:#}");
        }
        self.wait_for_start();
        info!("📡 APPLY: start flag raised, entering timed loop");
        loop {
            if let Err(e) = self.run_once() {
                error!("📡 APPLY: bus write failed: {e:#}");
                thread::sleep(Duration::from_millis(100));
            }
        }
    }

    pub fn radio_mut(&mut self) -> &mut Sx1280<B> {
        &mut self.radio
    }
}
