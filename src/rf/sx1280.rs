//! SX1280 command encoding and a thin typed driver over a pluggable bus.
//!
//! Only the command subset this transmitter needs is modeled: standby,
//! packet type, RF frequency, TX parameters, continuous wave and status.
//! Payload encoding follows the chip's native formats (24-bit big-endian
//! PLL step counts, offset-binary power bytes).

use anyhow::Result;
use tracing::trace;

/// Crystal frequency divided by the 18-bit PLL divider, about 198.36 Hz
/// per step.
pub const PLL_STEP_HZ: f32 = 52_000_000.0 / 262_144.0;

/// Chip transmit power range in dBm.
pub const PWR_MIN_DBM: i8 = -18;
pub const PWR_MAX_DBM: i8 = 13;

/// PA ramp time code: 20 µs.
pub const RAMP_20_US: u8 = 0xE0;

pub const OP_SET_STANDBY: u8 = 0x80;
pub const OP_SET_PACKET_TYPE: u8 = 0x8A;
pub const OP_SET_RF_FREQUENCY: u8 = 0x86;
pub const OP_SET_TX_PARAMS: u8 = 0x8E;
pub const OP_SET_TX_CONTINUOUS_WAVE: u8 = 0xD1;
pub const OP_GET_STATUS: u8 = 0xC0;

const PACKET_TYPE_GFSK: u8 = 0x00;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandbyMode {
    /// 13 MHz RC oscillator, lowest power.
    Rc,
    /// Crystal oscillator kept running, fast TX turnaround.
    Xosc,
}

impl StandbyMode {
    fn code(self) -> u8 {
        match self {
            StandbyMode::Rc => 0x00,
            StandbyMode::Xosc => 0x01,
        }
    }
}

/// Circuit mode field of the status byte (bits 7:5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChipMode {
    StdbyRc,
    StdbyXosc,
    Fs,
    Rx,
    Tx,
    Unknown(u8),
}

impl ChipMode {
    pub fn from_status(status: u8) -> Self {
        match (status >> 5) & 0x07 {
            0x2 => ChipMode::StdbyRc,
            0x3 => ChipMode::StdbyXosc,
            0x4 => ChipMode::Fs,
            0x5 => ChipMode::Rx,
            0x6 => ChipMode::Tx,
            other => ChipMode::Unknown(other),
        }
    }
}

/// Carrier frequency in Hz (with PPM correction applied) to the chip's
/// PLL step count, rounded to the nearest step.
pub fn hz_to_steps(freq_hz: u32, ppm: f32) -> u32 {
    let corrected = freq_hz as f64 * (1.0 + ppm as f64 * 1e-6);
    let steps = corrected * 262_144.0 / 52_000_000.0;
    steps.round() as u32
}

/// Inverse of `hz_to_steps` at zero PPM, for diagnostics.
pub fn steps_to_hz(steps: u32) -> u32 {
    (steps as f64 * 52_000_000.0 / 262_144.0).round() as u32
}

/// dBm to the chip's offset-binary power byte, clamping into range.
pub fn encode_power(dbm: i8) -> u8 {
    (dbm.clamp(PWR_MIN_DBM, PWR_MAX_DBM) as i16 + 18) as u8
}

/// Transport abstraction: one command write with parameters, one status
/// read. Implemented by the real SPI bus on hardware and by loggers and
/// recorders on the bench.
pub trait RadioBus {
    fn command(&mut self, opcode: u8, params: &[u8]) -> Result<()>;
    fn read_status(&mut self) -> Result<u8>;
}

/// Typed command layer over a [`RadioBus`].
pub struct Sx1280<B: RadioBus> {
    bus: B,
}

impl<B: RadioBus> Sx1280<B> {
    pub fn new(bus: B) -> Self {
        Self { bus }
    }

    pub fn set_standby(&mut self, mode: StandbyMode) -> Result<()> {
        self.bus.command(OP_SET_STANDBY, &[mode.code()])
    }

    pub fn set_packet_type_gfsk(&mut self) -> Result<()> {
        self.bus.command(OP_SET_PACKET_TYPE, &[PACKET_TYPE_GFSK])
    }

    /// Program the synthesizer to an absolute step count. Only the low
    /// 24 bits are significant; 2.4 GHz sits near 12.1 million steps.
    pub fn set_rf_frequency_steps(&mut self, steps: u32) -> Result<()> {
        let params = [
            ((steps >> 16) & 0xFF) as u8,
            ((steps >> 8) & 0xFF) as u8,
            (steps & 0xFF) as u8,
        ];
        self.bus.command(OP_SET_RF_FREQUENCY, &params)
    }

    pub fn set_tx_power(&mut self, dbm: i8) -> Result<()> {
        self.bus
            .command(OP_SET_TX_PARAMS, &[encode_power(dbm), RAMP_20_US])
    }

    /// Key the PA with an unmodulated carrier at the programmed frequency
    /// and power.
    pub fn start_tx_continuous_wave(&mut self) -> Result<()> {
        self.bus.command(OP_SET_TX_CONTINUOUS_WAVE, &[])
    }

    pub fn chip_mode(&mut self) -> Result<ChipMode> {
        let status = self.bus.read_status()?;
        Ok(ChipMode::from_status(status))
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }
}

/// Bus stand-in for running without hardware: every command becomes a
/// trace event, status always reads back standby.
#[derive(Debug, Default)]
pub struct LoggingBus;

impl RadioBus for LoggingBus {
    fn command(&mut self, opcode: u8, params: &[u8]) -> Result<()> {
        trace!("📡 SX1280: cmd 0x{opcode:02X} params {params:02X?}");
        Ok(())
    }

    fn read_status(&mut self) -> Result<u8> {
        Ok(0x2 << 5)
    }
}
