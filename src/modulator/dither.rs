//! First-order error-feedback (noise-shaped) quantization.
//!
//! The fractional part of each quantization step is carried forward in a
//! running accumulator; whenever it reaches unity the output is bumped by
//! one grid unit and the accumulator decremented. The long-run average of
//! the quantized sequence therefore tracks the continuous target with no
//! steady-state bias.

/// Running fractional error, persisted sample-to-sample.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorFeedback {
    acc: f32,
}

impl ErrorFeedback {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulate `frac` (expected in [0, 1)) and report whether the output
    /// should carry one extra grid unit this sample.
    #[inline]
    pub fn step(&mut self, frac: f32) -> bool {
        self.acc += frac;
        if self.acc >= 1.0 {
            self.acc -= 1.0;
            true
        } else {
            false
        }
    }

    /// Residual error currently carried, for diagnostics and tests.
    pub fn residual(&self) -> f32 {
        self.acc
    }

    pub fn reset(&mut self) {
        self.acc = 0.0;
    }
}
