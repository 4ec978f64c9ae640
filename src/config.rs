//! Runtime-tunable DSP/SSB configuration.
//!
//! One process-wide snapshot with a dirty flag: the console commits a full
//! replacement, the producer picks it up between command blocks, sanitizes
//! it and re-derives all dependent filter state. The apply loop never
//! touches this structure.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Internal pipeline sample rate in Hz.
pub const INTERNAL_RATE: u32 = 8000;

/// Compile-time bound on bandpass cascade depth (12 dB/octave per stage).
pub const MAX_BP_STAGES: usize = 10;

/// All runtime-tunable audio shaping and SSB mapping parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioConfig {
    pub enable_bandpass: bool,
    pub enable_eq: bool,
    pub enable_comp: bool,

    pub bp_lo_hz: f32,
    pub bp_hi_hz: f32,
    /// Active cascade stages, 1..=MAX_BP_STAGES.
    pub bp_stages: usize,

    pub eq_low_hz: f32,
    pub eq_low_db: f32,
    pub eq_high_hz: f32,
    pub eq_high_db: f32,
    /// Shelf slope: 0.3 = very gentle, 2.0 = very steep.
    pub eq_slope: f32,

    pub comp_thr_db: f32,
    pub comp_ratio: f32,
    pub comp_attack_ms: f32,
    pub comp_release_ms: f32,
    pub comp_makeup_db: f32,
    pub comp_knee_db: f32,
    pub comp_out_limit: f32,

    /// Envelope-to-power mapping gain applied before the log conversion.
    pub amp_gain: f32,
    /// Floor for the log conversion input.
    pub amp_min_a: f32,
    /// Envelope reference below which TX is duty-cycle gated.
    pub gate_ref: f32,
    /// Square the duty fraction for a steeper gate curve.
    pub gate_sq: bool,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            enable_bandpass: true,
            enable_eq: true,
            enable_comp: true,

            bp_lo_hz: 50.0,
            bp_hi_hz: 2900.0,
            bp_stages: MAX_BP_STAGES,

            eq_low_hz: 180.0,
            eq_low_db: 0.0,
            eq_high_hz: 2380.0,
            eq_high_db: 24.0,
            eq_slope: 2.0,

            comp_thr_db: -2.5,
            comp_ratio: 14.0,
            comp_attack_ms: 161.3,
            comp_release_ms: 1595.0,
            comp_makeup_db: 1.0,
            comp_knee_db: 1.0,
            comp_out_limit: 0.976,

            amp_gain: 2.28,
            amp_min_a: 2e-6,
            gate_ref: 0.01,
            gate_sq: false,
        }
    }
}

/// Clamp a float to [lo, hi]. Infinities land on the nearest bound; NaN
/// falls back to `lo`.
#[inline]
fn clamp_finite(v: f32, lo: f32, hi: f32) -> f32 {
    if v.is_nan() {
        lo
    } else {
        v.clamp(lo, hi)
    }
}

impl AudioConfig {
    /// Clamp every field to its valid range and enforce ordering invariants.
    ///
    /// Invalid values are never rejected, only pulled to the nearest bound:
    /// a sanitized best-effort configuration beats a hard failure.
    pub fn sanitize(&mut self, fs: f32) {
        let corner_max = fs * 0.45;

        self.bp_lo_hz = clamp_finite(self.bp_lo_hz, 50.0, corner_max);
        self.bp_hi_hz = clamp_finite(self.bp_hi_hz, 50.0, corner_max);
        // Keep the high corner at least 50 Hz above the low corner.
        if self.bp_hi_hz <= self.bp_lo_hz + 50.0 {
            self.bp_hi_hz = self.bp_lo_hz + 50.0;
        }
        self.bp_stages = self.bp_stages.clamp(1, MAX_BP_STAGES);

        self.eq_low_hz = clamp_finite(self.eq_low_hz, 50.0, corner_max);
        self.eq_high_hz = clamp_finite(self.eq_high_hz, 50.0, corner_max);
        self.eq_low_db = clamp_finite(self.eq_low_db, -40.0, 40.0);
        self.eq_high_db = clamp_finite(self.eq_high_db, -40.0, 40.0);
        self.eq_slope = clamp_finite(self.eq_slope, 0.3, 2.0);

        self.comp_thr_db = clamp_finite(self.comp_thr_db, -60.0, 0.0);
        self.comp_ratio = clamp_finite(self.comp_ratio, 1.0, 100.0);
        self.comp_attack_ms = clamp_finite(self.comp_attack_ms, 0.1, 10_000.0);
        self.comp_release_ms = clamp_finite(self.comp_release_ms, 1.0, 60_000.0);
        self.comp_makeup_db = clamp_finite(self.comp_makeup_db, -20.0, 40.0);
        self.comp_knee_db = clamp_finite(self.comp_knee_db, 0.0, 24.0);
        self.comp_out_limit = clamp_finite(self.comp_out_limit, 0.05, 0.999);

        self.amp_gain = clamp_finite(self.amp_gain, 0.01, 100.0);
        self.amp_min_a = clamp_finite(self.amp_min_a, 1e-9, 1.0);
        self.gate_ref = clamp_finite(self.gate_ref, 1e-4, 1.0);
    }

    /// Set one field by console key. Returns false for an unknown key.
    pub fn set_field(&mut self, key: &str, value: f32) -> bool {
        let key = key.to_ascii_lowercase();
        match key.as_str() {
            "bp_lo" => self.bp_lo_hz = value,
            "bp_hi" => self.bp_hi_hz = value,
            "bp_stages" => self.bp_stages = value.max(0.0) as usize,
            "eq_low_hz" => self.eq_low_hz = value,
            "eq_low_db" => self.eq_low_db = value,
            "eq_high_hz" => self.eq_high_hz = value,
            "eq_high_db" => self.eq_high_db = value,
            "eq_slope" => self.eq_slope = value,
            "comp_thr" => self.comp_thr_db = value,
            "comp_ratio" => self.comp_ratio = value,
            "comp_att" => self.comp_attack_ms = value,
            "comp_rel" => self.comp_release_ms = value,
            "comp_makeup" => self.comp_makeup_db = value,
            "comp_knee" => self.comp_knee_db = value,
            "comp_outlim" => self.comp_out_limit = value,
            "amp_gain" => self.amp_gain = value,
            "amp_min_a" => self.amp_min_a = value,
            "gate_ref" => self.gate_ref = value,
            "gate_sq" => self.gate_sq = value != 0.0,
            _ => return false,
        }
        true
    }
}

/// Shared configuration cell: single writer domain (console), single reader
/// domain (producer loop). The snapshot-and-clear pair in `take_if_dirty`
/// is atomic with respect to `commit`, so a reader never observes a
/// partially replaced configuration.
#[derive(Debug)]
pub struct SharedConfig {
    inner: Mutex<AudioConfig>,
    dirty: AtomicBool,
}

impl SharedConfig {
    /// Starts dirty so the producer derives filter state on its first block.
    pub fn new(cfg: AudioConfig) -> Self {
        Self {
            inner: Mutex::new(cfg),
            dirty: AtomicBool::new(true),
        }
    }

    /// Current committed configuration (not necessarily sanitized yet).
    pub fn snapshot(&self) -> AudioConfig {
        self.inner.lock().unwrap().clone()
    }

    /// Publish a full replacement and mark it pending.
    pub fn commit(&self, cfg: AudioConfig) {
        *self.inner.lock().unwrap() = cfg;
        self.dirty.store(true, Ordering::Release);
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// Snapshot and clear the dirty flag, or None when nothing changed.
    pub fn take_if_dirty(&self) -> Option<AudioConfig> {
        if !self.dirty.load(Ordering::Acquire) {
            return None;
        }
        let snap = self.inner.lock().unwrap().clone();
        self.dirty.store(false, Ordering::Release);
        Some(snap)
    }
}

impl Default for SharedConfig {
    fn default() -> Self {
        Self::new(AudioConfig::default())
    }
}
