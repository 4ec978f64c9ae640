pub mod apply;
pub mod sx1280;

pub use apply::{lfsr_next, ApplyLoop, MonoClock, StdClock, SAMPLE_PERIOD_US};
pub use sx1280::{
    hz_to_steps, ChipMode, LoggingBus, RadioBus, StandbyMode, Sx1280, PLL_STEP_HZ, PWR_MAX_DBM,
    PWR_MIN_DBM,
};

use anyhow::Result;
use tracing::{info, warn};

/// Key an unmodulated bench carrier at the given frequency and power.
/// The caller must have suspended the apply loop first.
pub fn bench_cw_start<B: RadioBus>(
    radio: &mut Sx1280<B>,
    freq_hz: u32,
    ppm: f32,
    power_dbm: i8,
) -> Result<()> {
    radio.set_standby(StandbyMode::Xosc)?;
    radio.set_packet_type_gfsk()?;
    radio.set_rf_frequency_steps(hz_to_steps(freq_hz, ppm))?;
    radio.set_tx_power(power_dbm)?;
    radio.start_tx_continuous_wave()?;

    let mode = radio.chip_mode()?;
    if mode == ChipMode::Tx {
        info!("📡 BENCH: CW keyed at {freq_hz} Hz, {power_dbm} dBm");
    } else {
        warn!("📡 BENCH: CW requested but chip reports {mode:?}");
    }
    Ok(())
}

/// Drop the bench carrier and return the chip to standby.
pub fn bench_cw_stop<B: RadioBus>(radio: &mut Sx1280<B>) -> Result<()> {
    radio.set_standby(StandbyMode::Xosc)?;
    info!("📡 BENCH: CW released");
    Ok(())
}
