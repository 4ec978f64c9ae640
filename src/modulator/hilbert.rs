//! FIR Hilbert transformer.
//!
//! Hamming-windowed ideal Hilbert taps (2/πk for odd k, zero elsewhere)
//! over an odd tap count; the center-tap delayed input supplies the
//! in-phase component at exactly the filter's group delay.

use std::f32::consts::PI;

pub const HILBERT_TAPS: usize = 247;

const CENTER: usize = (HILBERT_TAPS - 1) / 2;

#[derive(Debug)]
pub struct HilbertFir {
    taps: [f32; HILBERT_TAPS],
    buf: [f32; HILBERT_TAPS],
    idx: usize,
}

impl HilbertFir {
    pub fn new() -> Self {
        let mut taps = [0.0f32; HILBERT_TAPS];
        for (n, tap) in taps.iter_mut().enumerate() {
            let k = n as i32 - CENTER as i32;
            let ideal = if k != 0 && k % 2 != 0 {
                2.0 / (PI * k as f32)
            } else {
                0.0
            };
            let window =
                0.54 - 0.46 * (2.0 * PI * n as f32 / (HILBERT_TAPS - 1) as f32).cos();
            *tap = ideal * window;
        }

        Self {
            taps,
            buf: [0.0; HILBERT_TAPS],
            idx: 0,
        }
    }

    /// Push one sample; returns (delayed in-phase, quadrature).
    #[inline]
    pub fn process(&mut self, x: f32) -> (f32, f32) {
        self.buf[self.idx] = x;

        let mut q = 0.0f32;
        let mut pos = self.idx;
        for tap in self.taps.iter() {
            q += tap * self.buf[pos];
            pos = if pos == 0 { HILBERT_TAPS - 1 } else { pos - 1 };
        }

        let delayed = self.buf[(self.idx + HILBERT_TAPS - CENTER) % HILBERT_TAPS];

        self.idx += 1;
        if self.idx >= HILBERT_TAPS {
            self.idx = 0;
        }

        (delayed, q)
    }

    /// Zero the delay line (silence re-sync).
    pub fn reset(&mut self) {
        self.buf = [0.0; HILBERT_TAPS];
        self.idx = 0;
    }
}

impl Default for HilbertFir {
    fn default() -> Self {
        Self::new()
    }
}
