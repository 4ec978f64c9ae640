//! Core-A production loop: resample → shape → modulate, one command block
//! at a time.
//!
//! Configuration changes are picked up between blocks only; sustained
//! silence triggers exactly one reset of all filter, Hilbert and dither
//! state so long pauses cannot accumulate drift. After filling half the
//! block ring the producer raises the start flag that releases the apply
//! loop.

use std::sync::Arc;

use crossbeam::utils::Backoff;
use tracing::{debug, info};

use crate::audio::{IngestReader, Resampler};
use crate::config::{AudioConfig, SharedConfig, INTERNAL_RATE};
use crate::dsp::ShapingChain;
use crate::modulator::SsbModulator;
use crate::pipeline::block_ring::{BlockProducer, SampleCommand, BLOCK_SAMPLES, NUM_BLOCKS};
use crate::runtime::RuntimeShared;

/// Consecutive sub-threshold samples before the one-shot state reset.
const SILENCE_SAMPLES: u32 = INTERNAL_RATE * 2;

/// Magnitude below which a resampled sample counts as silence.
const SILENCE_THRESHOLD: f32 = 1e-5;

/// Blocks to fill before releasing the consumer.
const PREBUFFER_BLOCKS: u32 = (NUM_BLOCKS / 2) as u32;

pub struct PipelineProducer {
    reader: IngestReader,
    resampler: Resampler,
    chain: ShapingChain,
    modulator: SsbModulator,
    blocks: BlockProducer,
    config: Arc<SharedConfig>,
    shared: Arc<RuntimeShared>,

    silence_ctr: u32,
    prebuffered: u32,
    blocks_produced: u64,
}

impl PipelineProducer {
    pub fn new(
        reader: IngestReader,
        blocks: BlockProducer,
        config: Arc<SharedConfig>,
        shared: Arc<RuntimeShared>,
    ) -> Self {
        let fs = INTERNAL_RATE as f32;
        Self {
            reader,
            resampler: Resampler::new(),
            chain: ShapingChain::new(config.snapshot(), fs),
            modulator: SsbModulator::new(fs),
            blocks,
            config,
            shared,
            silence_ctr: 0,
            prebuffered: 0,
            blocks_produced: 0,
        }
    }

    /// The sanitized configuration currently driving the chain.
    pub fn config(&self) -> &AudioConfig {
        self.chain.config()
    }

    pub fn blocks_produced(&self) -> u64 {
        self.blocks_produced
    }

    /// Fill and publish exactly one command block, spinning first if the
    /// slot has not been drained yet (the producer never overwrites).
    pub fn produce_block(&mut self) {
        let backoff = Backoff::new();
        while !self.blocks.slot_free() {
            backoff.snooze();
        }

        // Config pickup happens on block boundaries only.
        if let Some(cfg) = self.config.take_if_dirty() {
            self.chain.apply_config(cfg);
            debug!("🎛️ PRODUCER: applied configuration update");
        }

        let base_steps = self.shared.base_steps() as i32;
        let pwr_max = self.shared.tx_power_dbm();
        let host_rate = self.shared.host_rate_hz();

        let mut block = [SampleCommand::default(); BLOCK_SAMPLES];
        for cmd in block.iter_mut() {
            let raw = self.resampler.next(&mut self.reader, host_rate);
            let x = raw as f32 / 32768.0;

            self.track_silence(x);

            let shaped = self.chain.process(x);
            *cmd = self
                .modulator
                .modulate(shaped, base_steps, pwr_max, self.chain.config());
        }

        self.blocks.publish(&block);
        self.blocks_produced += 1;
        self.shared
            .record_fill_levels(self.reader.fill() as u32, self.blocks.ready_count() as u32);

        if !self.shared.consumer_started() {
            self.prebuffered += 1;
            if self.prebuffered >= PREBUFFER_BLOCKS {
                self.shared.signal_consumer_start();
                info!(
                    "🎛️ PRODUCER: pre-buffered {} blocks, releasing apply loop",
                    self.prebuffered
                );
            }
        }
    }

    /// Run forever; there is no cancellation concept in the pipeline.
    pub fn run(mut self) -> ! {
        info!("🎛️ PRODUCER: starting (internal rate {} Hz)", INTERNAL_RATE);
        loop {
            self.produce_block();
        }
    }

    /// Count sub-threshold samples; at the silence window boundary reset
    /// DSP, Hilbert and dither state exactly once. The counter saturates
    /// one past the window so the reset cannot re-fire until audio
    /// returns.
    fn track_silence(&mut self, x: f32) {
        if x.abs() < SILENCE_THRESHOLD {
            if self.silence_ctr < SILENCE_SAMPLES {
                self.silence_ctr += 1;
            }
        } else {
            self.silence_ctr = 0;
            return;
        }

        if self.silence_ctr == SILENCE_SAMPLES {
            self.chain.reset_states();
            self.modulator.reset();
            self.silence_ctr = SILENCE_SAMPLES + 1;
            debug!("🎛️ PRODUCER: silence re-sync, DSP state cleared");
        }
    }
}
