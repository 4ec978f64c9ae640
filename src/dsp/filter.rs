//! Biquad IIR sections: Butterworth-characteristic low/high-pass for the
//! bandpass cascade and shelving filters with a slope parameter for the
//! equalizer. All derivations are pure functions of (corner, sample rate,
//! gain, slope) and are re-run in full whenever configuration changes.

use std::f32::consts::{PI, SQRT_2};

use super::flush_denormal;

/// Shelf Q term under the square root. Large gains combined with steep
/// slopes drive it negative, which would turn every coefficient NaN;
/// floor it so alpha stays real and the poles stay strictly inside the
/// unit circle.
#[inline]
fn shelf_radicand(a: f32, slope: f32) -> f32 {
    ((a + 1.0 / a) * (1.0 / slope - 1.0) + 2.0).max(1e-3)
}

/// Second-order section, transposed direct form II.
#[derive(Debug, Clone)]
pub struct Biquad {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
    z1: f32,
    z2: f32,
}

impl Biquad {
    /// Unity pass-through; placeholder for not-yet-derived cascade slots.
    pub fn identity() -> Self {
        Self {
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            z1: 0.0,
            z2: 0.0,
        }
    }

    /// 12 dB/octave Butterworth low-pass.
    pub fn lowpass(fc: f32, fs: f32) -> Self {
        let k = (PI * fc / fs).tan();
        let k2 = k * k;
        let norm = 1.0 / (1.0 + SQRT_2 * k + k2);

        let b0 = k2 * norm;
        Self {
            b0,
            b1: 2.0 * b0,
            b2: b0,
            a1: 2.0 * (k2 - 1.0) * norm,
            a2: (1.0 - SQRT_2 * k + k2) * norm,
            z1: 0.0,
            z2: 0.0,
        }
    }

    /// 12 dB/octave Butterworth high-pass.
    pub fn highpass(fc: f32, fs: f32) -> Self {
        let k = (PI * fc / fs).tan();
        let k2 = k * k;
        let norm = 1.0 / (1.0 + SQRT_2 * k + k2);

        let b0 = norm;
        Self {
            b0,
            b1: -2.0 * b0,
            b2: b0,
            a1: 2.0 * (k2 - 1.0) * norm,
            a2: (1.0 - SQRT_2 * k + k2) * norm,
            z1: 0.0,
            z2: 0.0,
        }
    }

    /// Low shelf; `slope` controls knee steepness (1.0 = standard 12 dB/oct).
    pub fn low_shelf(fc: f32, fs: f32, gain_db: f32, slope: f32) -> Self {
        let a = 10.0_f32.powf(gain_db / 40.0);
        let w0 = 2.0 * PI * fc / fs;
        let cw = w0.cos();
        let sw = w0.sin();
        let alpha = sw * 0.5 * shelf_radicand(a, slope).sqrt();
        let sq = a.sqrt();

        let b0 = a * ((a + 1.0) - (a - 1.0) * cw + 2.0 * sq * alpha);
        let b1 = 2.0 * a * ((a - 1.0) - (a + 1.0) * cw);
        let b2 = a * ((a + 1.0) - (a - 1.0) * cw - 2.0 * sq * alpha);
        let a0 = (a + 1.0) + (a - 1.0) * cw + 2.0 * sq * alpha;
        let a1 = -2.0 * ((a - 1.0) + (a + 1.0) * cw);
        let a2 = (a + 1.0) + (a - 1.0) * cw - 2.0 * sq * alpha;

        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
            z1: 0.0,
            z2: 0.0,
        }
    }

    /// High shelf, same slope semantics as `low_shelf`.
    pub fn high_shelf(fc: f32, fs: f32, gain_db: f32, slope: f32) -> Self {
        let a = 10.0_f32.powf(gain_db / 40.0);
        let w0 = 2.0 * PI * fc / fs;
        let cw = w0.cos();
        let sw = w0.sin();
        let alpha = sw * 0.5 * shelf_radicand(a, slope).sqrt();
        let sq = a.sqrt();

        let b0 = a * ((a + 1.0) + (a - 1.0) * cw + 2.0 * sq * alpha);
        let b1 = -2.0 * a * ((a - 1.0) + (a + 1.0) * cw);
        let b2 = a * ((a + 1.0) + (a - 1.0) * cw - 2.0 * sq * alpha);
        let a0 = (a + 1.0) - (a - 1.0) * cw + 2.0 * sq * alpha;
        let a1 = 2.0 * ((a - 1.0) - (a + 1.0) * cw);
        let a2 = (a + 1.0) - (a - 1.0) * cw - 2.0 * sq * alpha;

        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
            z1: 0.0,
            z2: 0.0,
        }
    }

    #[inline]
    pub fn process(&mut self, x: f32) -> f32 {
        let y = self.b0 * x + self.z1;
        self.z1 = flush_denormal(self.b1 * x - self.a1 * y + self.z2);
        self.z2 = flush_denormal(self.b2 * x - self.a2 * y);
        y
    }

    /// Zero the delay cells; coefficients are untouched.
    pub fn reset(&mut self) {
        self.z1 = 0.0;
        self.z2 = 0.0;
    }

    /// Both poles strictly inside the unit circle.
    pub fn is_stable(&self) -> bool {
        self.a2.abs() < 1.0 && self.a1.abs() < 1.0 + self.a2
    }
}
