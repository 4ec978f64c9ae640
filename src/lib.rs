//! Phasing-CW SSB exciter.
//!
//! Turns a host audio stream into a hard-timed command stream for an
//! SX1280 RF synthesizer: per 125 µs sample, one frequency step count,
//! one integer dBm power and one carrier on/off decision. Single sideband
//! comes out of steering an unmodulated carrier, not from an IQ DAC.
//!
//! The pipeline runs as two loops mirroring a two-core split:
//!
//! * the producer resamples host audio to 8 kHz, shapes it (EQ, compressor,
//!   bandpass cascade) and modulates it into 256-command blocks;
//! * the apply loop drains those blocks and writes delta-elided chip
//!   commands on a deadline schedule.
//!
//! Blocks cross between them through a lock-free flag-per-slot ring.

pub mod audio;
pub mod config;
pub mod console;
pub mod dsp;
pub mod modulator;
pub mod pipeline;
pub mod rf;
pub mod runtime;

pub use config::{AudioConfig, SharedConfig, INTERNAL_RATE};
pub use pipeline::{block_ring, PipelineProducer, SampleCommand, BLOCK_SAMPLES, NUM_BLOCKS};
pub use rf::{ApplyLoop, LoggingBus, StdClock, Sx1280};
pub use runtime::RuntimeShared;
