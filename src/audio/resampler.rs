//! Adaptive sample-rate conversion: host rate (typically 44.1/48 kHz) down
//! to the fixed 8 kHz internal rate.
//!
//! Q16.16 fixed-point phase accumulation with cubic Hermite interpolation
//! over a four-frame history. The step size tracks the ring fill level so
//! the converter absorbs host clock drift without overflow or underflow,
//! and the applied step is low-pass smoothed toward that target so the
//! correction never lands as an audible pitch jump.

use crate::audio::ingest::{AudioFrame, IngestReader};
use crate::config::INTERNAL_RATE;

const PHASE_ONE: u32 = 1 << 16;

/// Per-output-sample fraction of the remaining step error to absorb.
const SMOOTH_SHIFT: u32 = 8;

/// Fill-deviation correction divisor: full deviation moves the step by at
/// most base/10.
const FILL_CORRECTION_DIV: u64 = 10;

#[derive(Debug)]
pub struct Resampler {
    src_rate: u32,
    base_step_q16: u32,
    smooth_step_q16: u32,
    phase_q16: u32,
    /// hist[0] = x[-1], hist[1] = x[0], hist[2] = x[1], hist[3] = x[2];
    /// interpolation runs between hist[1] and hist[2].
    hist: [AudioFrame; 4],
    primed: bool,
}

impl Resampler {
    pub fn new() -> Self {
        Self {
            src_rate: 0,
            base_step_q16: 0,
            smooth_step_q16: 0,
            phase_q16: 0,
            hist: [AudioFrame::default(); 4],
            primed: false,
        }
    }

    /// Produce the next internal-rate mono sample.
    ///
    /// Never blocks: an empty ring holds the most recent frame instead of
    /// stalling. A changed `declared_rate` recomputes the base step here.
    pub fn next(&mut self, ring: &mut IngestReader, declared_rate: u32) -> i16 {
        let sr = if declared_rate == 0 { 48_000 } else { declared_rate };

        if sr != self.src_rate || self.base_step_q16 == 0 {
            self.src_rate = sr;
            self.base_step_q16 = (((sr as u64) << 16) / INTERNAL_RATE as u64) as u32;
            self.smooth_step_q16 = self.base_step_q16;
        }

        let target_step = self.target_step(ring);

        // Exponential approach: move 1/256 of the remaining distance per
        // output sample, with a +1 floor so it always converges.
        if self.smooth_step_q16 < target_step {
            let diff = target_step - self.smooth_step_q16;
            self.smooth_step_q16 += (diff >> SMOOTH_SHIFT) + 1;
            if self.smooth_step_q16 > target_step {
                self.smooth_step_q16 = target_step;
            }
        } else if self.smooth_step_q16 > target_step {
            let diff = self.smooth_step_q16 - target_step;
            self.smooth_step_q16 -= (diff >> SMOOTH_SHIFT) + 1;
            if self.smooth_step_q16 < target_step {
                self.smooth_step_q16 = target_step;
            }
        }

        if !self.primed {
            for slot in self.hist.iter_mut() {
                *slot = ring.pop().unwrap_or_default();
            }
            self.phase_q16 = 0;
            self.primed = true;
        }

        self.phase_q16 = self.phase_q16.wrapping_add(self.smooth_step_q16);
        while self.phase_q16 >= PHASE_ONE {
            self.phase_q16 -= PHASE_ONE;
            self.hist[0] = self.hist[1];
            self.hist[1] = self.hist[2];
            self.hist[2] = self.hist[3];
            // Hold the last frame if the ring ran dry.
            self.hist[3] = ring.pop().unwrap_or(self.hist[2]);
        }

        let t = self.phase_q16 as f32 / PHASE_ONE as f32;
        let mono = 0.5 * (self.hermite(t, |f| f.l as f32) + self.hermite(t, |f| f.r as f32));
        clamp16(mono.round() as i32)
    }

    /// Fill-dependent target step: above half-capacity consume faster,
    /// below consume slower, proportional to the deviation.
    fn target_step(&self, ring: &IngestReader) -> u32 {
        let fill = ring.fill() as u64;
        let capacity = ring.capacity() as u64;
        let half = capacity / 2;
        let base = self.base_step_q16 as u64;

        let step = if fill > half {
            base + base * (fill - half) / (capacity * FILL_CORRECTION_DIV)
        } else {
            base - base * (half - fill) / (capacity * FILL_CORRECTION_DIV)
        };
        step as u32
    }

    fn hermite(&self, t: f32, ch: impl Fn(&AudioFrame) -> f32) -> f32 {
        let t2 = t * t;
        let t3 = t2 * t;

        let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
        let h10 = t3 - 2.0 * t2 + t;
        let h01 = -2.0 * t3 + 3.0 * t2;
        let h11 = t3 - t2;

        let xm1 = ch(&self.hist[0]);
        let x0 = ch(&self.hist[1]);
        let x1 = ch(&self.hist[2]);
        let x2 = ch(&self.hist[3]);

        let m0 = 0.5 * (x1 - xm1);
        let m1 = 0.5 * (x2 - x0);

        h00 * x0 + h10 * m0 + h01 * x1 + h11 * m1
    }
}

impl Default for Resampler {
    fn default() -> Self {
        Self::new()
    }
}

#[inline]
fn clamp16(x: i32) -> i16 {
    x.clamp(i16::MIN as i32, i16::MAX as i32) as i16
}
