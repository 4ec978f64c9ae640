//! Chip command encoding: bit-exact payloads, power clamping, frequency
//! step conversion and status decoding.

use anyhow::Result;

use ssb_exciter::rf::sx1280::{
    encode_power, hz_to_steps, steps_to_hz, ChipMode, RadioBus, StandbyMode, Sx1280,
    OP_SET_PACKET_TYPE, OP_SET_RF_FREQUENCY, OP_SET_STANDBY, OP_SET_TX_CONTINUOUS_WAVE,
    OP_SET_TX_PARAMS, PLL_STEP_HZ, PWR_MAX_DBM, PWR_MIN_DBM,
};

#[derive(Default)]
struct RecordingBus {
    commands: Vec<(u8, Vec<u8>)>,
    status: u8,
}

impl RadioBus for RecordingBus {
    fn command(&mut self, opcode: u8, params: &[u8]) -> Result<()> {
        self.commands.push((opcode, params.to_vec()));
        Ok(())
    }

    fn read_status(&mut self) -> Result<u8> {
        Ok(self.status)
    }
}

#[test]
fn power_byte_is_offset_binary() {
    assert_eq!(encode_power(PWR_MAX_DBM), 31);
    assert_eq!(encode_power(PWR_MIN_DBM), 0);
    assert_eq!(encode_power(0), 18);
    // Out-of-range requests clamp instead of wrapping.
    assert_eq!(encode_power(20), 31);
    assert_eq!(encode_power(-30), 0);
}

#[test]
fn pll_step_is_crystal_over_divider() {
    assert!((PLL_STEP_HZ - 198.364).abs() < 0.01);
}

#[test]
fn frequency_round_trips_within_one_step() {
    for &hz in &[2_400_000_000u32, 2_400_400_000, 2_450_000_000, 2_500_000_000] {
        let steps = hz_to_steps(hz, 0.0);
        let back = steps_to_hz(steps);
        let err = (back as i64 - hz as i64).abs();
        assert!(err as f32 <= PLL_STEP_HZ, "{hz} Hz round-trips {err} Hz off");
    }
}

#[test]
fn ppm_correction_moves_steps_proportionally() {
    let hz = 2_400_000_000u32;
    let base = hz_to_steps(hz, 0.0);
    let high = hz_to_steps(hz, 10.0);
    let low = hz_to_steps(hz, -10.0);

    // 10 ppm of 2.4 GHz is 24 kHz, about 121 PLL steps.
    let expect = (2.4e9 * 10e-6 / PLL_STEP_HZ as f64) as i64;
    assert!((high as i64 - base as i64 - expect).abs() <= 1);
    assert!((base as i64 - low as i64 - expect).abs() <= 1);
}

#[test]
fn command_payloads_are_bit_exact() {
    let mut radio = Sx1280::new(RecordingBus::default());

    radio.set_standby(StandbyMode::Rc).unwrap();
    radio.set_standby(StandbyMode::Xosc).unwrap();
    radio.set_packet_type_gfsk().unwrap();
    radio.set_rf_frequency_steps(0x12_3456).unwrap();
    radio.set_tx_power(5).unwrap();
    radio.start_tx_continuous_wave().unwrap();

    let cmds = &radio.bus_mut().commands;
    assert_eq!(cmds[0], (OP_SET_STANDBY, vec![0x00]));
    assert_eq!(cmds[1], (OP_SET_STANDBY, vec![0x01]));
    assert_eq!(cmds[2], (OP_SET_PACKET_TYPE, vec![0x00]));
    assert_eq!(cmds[3], (OP_SET_RF_FREQUENCY, vec![0x12, 0x34, 0x56]));
    assert_eq!(cmds[4], (OP_SET_TX_PARAMS, vec![23, 0xE0]));
    assert_eq!(cmds[5], (OP_SET_TX_CONTINUOUS_WAVE, vec![]));
}

#[test]
fn status_byte_decodes_chip_mode() {
    assert_eq!(ChipMode::from_status(0x2 << 5), ChipMode::StdbyRc);
    assert_eq!(ChipMode::from_status(0x3 << 5), ChipMode::StdbyXosc);
    assert_eq!(ChipMode::from_status(0x4 << 5), ChipMode::Fs);
    assert_eq!(ChipMode::from_status(0x6 << 5), ChipMode::Tx);
    // Low bits are command status and must not affect the mode.
    assert_eq!(ChipMode::from_status((0x6 << 5) | 0x1F), ChipMode::Tx);
    assert_eq!(ChipMode::from_status(0x0), ChipMode::Unknown(0));
}

#[test]
fn chip_mode_reads_through_the_bus() {
    let mut radio = Sx1280::new(RecordingBus {
        status: 0x6 << 5,
        ..Default::default()
    });
    assert_eq!(radio.chip_mode().unwrap(), ChipMode::Tx);
}
