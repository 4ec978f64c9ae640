//! SSB modulator: one shaped real audio sample in, one discrete RF command
//! out, with phase continuity and amplitude fidelity maintained across
//! calls.
//!
//! Quadrature comes from the Hilbert FIR; a static IQ imbalance correction
//! (quadrature gain plus rotation) is applied before the envelope and
//! instantaneous-frequency discriminator. Frequency steps, integer dBm and
//! sub-gate TX duty are all quantized through first-order error feedback so
//! their long-run averages track the continuous targets.

use std::f32::consts::PI;

use crate::config::AudioConfig;
use crate::modulator::{ErrorFeedback, HilbertFir};
use crate::pipeline::block_ring::SampleCommand;
use crate::rf::sx1280::{PLL_STEP_HZ, PWR_MIN_DBM};

/// Carrier steering limit per sample; bounds discriminator glitches on
/// transients.
pub const F_OFF_LIMIT_HZ: f32 = 3500.0;

/// Static IQ imbalance correction.
const IQ_GAIN_CORR: f32 = 1.0;
const IQ_PHASE_CORR_DEG: f32 = 0.0;

#[derive(Debug)]
pub struct SsbModulator {
    fs: f32,
    hilbert: HilbertFir,
    theta_prev: f32,
    cos_phi: f32,
    sin_phi: f32,
    iq_gain: f32,
    freq_frac: ErrorFeedback,
    power_frac: ErrorFeedback,
    duty_frac: ErrorFeedback,
}

impl SsbModulator {
    pub fn new(fs: f32) -> Self {
        let phi = IQ_PHASE_CORR_DEG * PI / 180.0;
        Self {
            fs,
            hilbert: HilbertFir::new(),
            theta_prev: 0.0,
            cos_phi: phi.cos(),
            sin_phi: phi.sin(),
            iq_gain: IQ_GAIN_CORR,
            freq_frac: ErrorFeedback::new(),
            power_frac: ErrorFeedback::new(),
            duty_frac: ErrorFeedback::new(),
        }
    }

    /// Convert one shaped audio sample into an RF command.
    ///
    /// `base_steps` is the carrier's step count (frequency + PPM already
    /// applied); `pwr_max_dbm` the configured maximum transmit power.
    pub fn modulate(
        &mut self,
        x: f32,
        base_steps: i32,
        pwr_max_dbm: i8,
        cfg: &AudioConfig,
    ) -> SampleCommand {
        let (i_raw, q_raw) = self.hilbert.process(x);
        let q_scaled = q_raw * self.iq_gain;

        let i = i_raw * self.cos_phi - q_scaled * self.sin_phi;
        let q = i_raw * self.sin_phi + q_scaled * self.cos_phi;

        let envelope = (i * i + q * q).sqrt();
        let theta = q.atan2(i);

        // Wrapped phase difference → instantaneous frequency offset.
        let mut dtheta = theta - self.theta_prev;
        if dtheta > PI {
            dtheta -= 2.0 * PI;
        }
        if dtheta < -PI {
            dtheta += 2.0 * PI;
        }
        self.theta_prev = theta;

        let f_off = (dtheta * self.fs / (2.0 * PI)).clamp(-F_OFF_LIMIT_HZ, F_OFF_LIMIT_HZ);

        // Integer step plus error-fed fraction.
        let want_steps = f_off / PLL_STEP_HZ;
        let whole = want_steps.floor();
        let chosen = if self.freq_frac.step(want_steps - whole) {
            whole as i32 + 1
        } else {
            whole as i32
        };
        let freq_steps = base_steps + chosen;

        let duty = duty_fraction(envelope, cfg);

        let (power_dbm, tx_on) = if duty < 1.0 {
            // Sub-gate amplitude: pulse-density gate the carrier at minimum
            // power. Frequency modulation continues uninterrupted.
            (PWR_MIN_DBM, self.duty_frac.step(duty))
        } else {
            let a_eff = (envelope * cfg.amp_gain).max(cfg.amp_min_a);
            let desired = (pwr_max_dbm as f32 + 20.0 * a_eff.log10())
                .clamp(PWR_MIN_DBM as f32, pwr_max_dbm as f32);

            let low = (desired.floor() as i32).max(PWR_MIN_DBM as i32) as i8;
            let high = ((low as i32) + 1).min(pwr_max_dbm as i32) as i8;
            let frac = (desired - low as f32).clamp(0.0, 1.0);

            let dbm = if high != low && self.power_frac.step(frac) {
                high
            } else {
                low
            };
            (dbm, true)
        };

        SampleCommand {
            freq_steps,
            power_dbm,
            tx_on,
        }
    }

    /// Zero the Hilbert delay line, phase tracker and all three dither
    /// accumulators (silence re-sync).
    pub fn reset(&mut self) {
        self.hilbert.reset();
        self.theta_prev = 0.0;
        self.freq_frac.reset();
        self.power_frac.reset();
        self.duty_frac.reset();
    }

    /// Residuals of the three accumulators, for tests and diagnostics.
    pub fn dither_residuals(&self) -> (f32, f32, f32) {
        (
            self.freq_frac.residual(),
            self.power_frac.residual(),
            self.duty_frac.residual(),
        )
    }
}

/// Envelope → TX duty fraction in [0, 1]; 1.0 means continuously on.
fn duty_fraction(envelope: f32, cfg: &AudioConfig) -> f32 {
    if envelope <= 0.0 {
        return 0.0;
    }
    let ratio = envelope / cfg.gate_ref;
    if ratio >= 1.0 {
        return 1.0;
    }
    if cfg.gate_sq {
        ratio * ratio
    } else {
        ratio
    }
}
