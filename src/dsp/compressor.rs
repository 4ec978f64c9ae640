//! Feed-forward dynamic range compressor with a soft knee.
//!
//! Linear-domain envelope follower with independent attack/release decay
//! coefficients; gain computed in the log domain from threshold, ratio and
//! knee width (quadratic inside the knee), then a fixed linear makeup gain.
//! The output hard limit lives in the shaping chain.

use super::flush_denormal;
use crate::config::AudioConfig;

#[derive(Debug, Clone)]
pub struct Compressor {
    envelope: f32,
    attack_coeff: f32,
    release_coeff: f32,
    threshold_db: f32,
    ratio: f32,
    makeup_lin: f32,
    knee_db: f32,
}

impl Compressor {
    /// Derive all cached coefficients from a sanitized configuration.
    pub fn from_config(cfg: &AudioConfig, fs: f32) -> Self {
        let attack_s = (cfg.comp_attack_ms * 0.001).max(1e-4);
        let release_s = (cfg.comp_release_ms * 0.001).max(1e-4);

        Self {
            envelope: 0.0,
            attack_coeff: (-1.0 / (attack_s * fs)).exp(),
            release_coeff: (-1.0 / (release_s * fs)).exp(),
            threshold_db: cfg.comp_thr_db,
            ratio: cfg.comp_ratio.max(1.0),
            makeup_lin: 10.0_f32.powf(cfg.comp_makeup_db / 20.0),
            knee_db: cfg.comp_knee_db.max(0.0),
        }
    }

    /// Gain in dB for a given input level; ≤ 0 above the knee, 0 below it.
    fn gain_db(&self, in_db: f32) -> f32 {
        let thr = self.threshold_db;

        if self.knee_db <= 0.0 {
            if in_db <= thr {
                return 0.0;
            }
            let out_db = thr + (in_db - thr) / self.ratio;
            return out_db - in_db;
        }

        let knee_lo = thr - self.knee_db * 0.5;
        let knee_hi = thr + self.knee_db * 0.5;

        if in_db <= knee_lo {
            return 0.0;
        }
        if in_db >= knee_hi {
            let out_db = thr + (in_db - thr) / self.ratio;
            return out_db - in_db;
        }

        // Quadratic interpolation from 0 dB gain at the knee entry to the
        // linear-slope gain at the knee exit.
        let t = (in_db - knee_lo) / (knee_hi - knee_lo);
        let exit_gain = (thr + (knee_hi - thr) / self.ratio) - knee_hi;
        exit_gain * t * t
    }

    #[inline]
    pub fn process(&mut self, x: f32) -> f32 {
        let level = x.abs();
        let coeff = if level > self.envelope {
            self.attack_coeff
        } else {
            self.release_coeff
        };
        self.envelope = flush_denormal(coeff * self.envelope + (1.0 - coeff) * level);

        let in_db = 20.0 * self.envelope.max(1e-8).log10();
        let gain = 10.0_f32.powf(self.gain_db(in_db) / 20.0) * self.makeup_lin;

        x * gain
    }

    /// Reset the envelope follower (silence re-sync).
    pub fn reset(&mut self) {
        self.envelope = 0.0;
    }
}
