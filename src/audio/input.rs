//! Host PCM boundary: reads signed 16-bit little-endian stereo frames from
//! a byte stream and pushes them into the ingestion ring at the declared
//! host rate.
//!
//! This stands in for the USB audio-class endpoint: it is the ring's single
//! writer and runs outside the real-time producer loop, so coarse
//! `thread::sleep` pacing is fine here.

use std::io::Read;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use tracing::{debug, info};

use crate::audio::ingest::{AudioFrame, IngestWriter};
use crate::runtime::RuntimeShared;

/// Frames read and pushed per pacing quantum.
const CHUNK_FRAMES: usize = 256;

/// Stream `source` into the ring until EOF. Frames that arrive while the
/// ring is full are dropped and counted, never blocked on.
pub fn run_pcm_boundary<R: Read>(
    mut source: R,
    mut writer: IngestWriter,
    shared: Arc<RuntimeShared>,
) -> Result<()> {
    let rate = shared.host_rate_hz();
    info!("🎙️ PCM_BOUNDARY: streaming s16le stereo at {} Hz", rate);

    let mut buf = vec![0u8; CHUNK_FRAMES * 4];
    let started = Instant::now();
    let mut frames_total: u64 = 0;

    loop {
        let mut filled = 0;
        while filled < buf.len() {
            match source.read(&mut buf[filled..])? {
                0 => break,
                n => filled += n,
            }
        }
        let frames = filled / 4;
        if frames == 0 {
            info!(
                "🎙️ PCM_BOUNDARY: end of stream after {} frames ({} dropped)",
                frames_total,
                shared.frames_dropped()
            );
            return Ok(());
        }

        let mut dropped = 0u64;
        for chunk in buf[..frames * 4].chunks_exact(4) {
            let frame = AudioFrame {
                l: i16::from_le_bytes([chunk[0], chunk[1]]),
                r: i16::from_le_bytes([chunk[2], chunk[3]]),
            };
            if !writer.push(frame) {
                dropped += 1;
            }
        }
        if dropped > 0 {
            shared.count_dropped_frames(dropped);
            debug!("🎙️ PCM_BOUNDARY: ring full, dropped {} frames", dropped);
        }

        frames_total += frames as u64;

        // Pace delivery to the declared host rate.
        let rate = shared.host_rate_hz().max(1);
        let due = Duration::from_micros(frames_total * 1_000_000 / rate as u64);
        let elapsed = started.elapsed();
        if due > elapsed {
            thread::sleep(due - elapsed);
        }
    }
}
