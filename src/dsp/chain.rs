//! The per-sample shaping chain: shelving EQ → compressor with hard limit
//! → Butterworth bandpass cascade, each stage gated by its enable flag.
//!
//! Cascade storage is a fixed-size array indexed by the sanitized stage
//! count, keeping per-sample cost and memory deterministic.

use crate::config::{AudioConfig, MAX_BP_STAGES};
use crate::dsp::{Biquad, Compressor};

#[derive(Debug)]
pub struct ShapingChain {
    fs: f32,
    cfg: AudioConfig,
    eq_low: Biquad,
    eq_high: Biquad,
    comp: Compressor,
    bp_hp: [Biquad; MAX_BP_STAGES],
    bp_lp: [Biquad; MAX_BP_STAGES],
}

impl ShapingChain {
    pub fn new(cfg: AudioConfig, fs: f32) -> Self {
        let mut chain = Self {
            fs,
            cfg: AudioConfig::default(),
            eq_low: Biquad::identity(),
            eq_high: Biquad::identity(),
            comp: Compressor::from_config(&AudioConfig::default(), fs),
            bp_hp: std::array::from_fn(|_| Biquad::identity()),
            bp_lp: std::array::from_fn(|_| Biquad::identity()),
        };
        chain.apply_config(cfg);
        chain
    }

    /// Sanitize a replacement configuration and re-derive every dependent
    /// filter and compressor coefficient. Filter histories restart at zero.
    pub fn apply_config(&mut self, mut cfg: AudioConfig) {
        cfg.sanitize(self.fs);

        for stage in 0..MAX_BP_STAGES {
            self.bp_hp[stage] = Biquad::highpass(cfg.bp_lo_hz, self.fs);
            self.bp_lp[stage] = Biquad::lowpass(cfg.bp_hi_hz, self.fs);
        }
        self.eq_low = Biquad::low_shelf(cfg.eq_low_hz, self.fs, cfg.eq_low_db, cfg.eq_slope);
        self.eq_high = Biquad::high_shelf(cfg.eq_high_hz, self.fs, cfg.eq_high_db, cfg.eq_slope);
        self.comp = Compressor::from_config(&cfg, self.fs);

        self.cfg = cfg;
    }

    /// The sanitized configuration currently in effect.
    pub fn config(&self) -> &AudioConfig {
        &self.cfg
    }

    #[inline]
    pub fn process(&mut self, mut x: f32) -> f32 {
        if self.cfg.enable_eq {
            x = self.eq_low.process(x);
            x = self.eq_high.process(x);
        }

        if self.cfg.enable_comp {
            x = self.comp.process(x);
            x = x.clamp(-self.cfg.comp_out_limit, self.cfg.comp_out_limit);
        }

        if self.cfg.enable_bandpass {
            for stage in 0..self.cfg.bp_stages {
                x = self.bp_hp[stage].process(x);
            }
            for stage in 0..self.cfg.bp_stages {
                x = self.bp_lp[stage].process(x);
            }
        }

        x
    }

    /// Zero all filter histories and the compressor envelope (silence
    /// re-sync). Coefficients are untouched.
    pub fn reset_states(&mut self) {
        self.eq_low.reset();
        self.eq_high.reset();
        self.comp.reset();
        for stage in 0..MAX_BP_STAGES {
            self.bp_hp[stage].reset();
            self.bp_lp[stage].reset();
        }
    }

    /// Every derived section has its poles inside the unit circle.
    pub fn is_stable(&self) -> bool {
        self.eq_low.is_stable()
            && self.eq_high.is_stable()
            && self.bp_hp.iter().all(Biquad::is_stable)
            && self.bp_lp.iter().all(Biquad::is_stable)
    }
}
