//! Console: every verb, range rejection versus clamping, and the
//! configuration dirty-flag handshake.

use std::sync::Arc;

use ssb_exciter::config::SharedConfig;
use ssb_exciter::console::{Console, ConsoleAction, ConsoleError};
use ssb_exciter::runtime::RuntimeShared;

fn console() -> (Console, Arc<RuntimeShared>, Arc<SharedConfig>) {
    let shared = Arc::new(RuntimeShared::new());
    let config = Arc::new(SharedConfig::default());
    // Drain the initial dirty flag so tests observe only their own commits.
    config.take_if_dirty();
    (Console::new(shared.clone(), config.clone()), shared, config)
}

#[test]
fn empty_line_is_ok() {
    let (c, _, _) = console();
    let reply = c.handle_line("   ").unwrap();
    assert_eq!(reply.text, "OK");
    assert_eq!(reply.action, ConsoleAction::None);
}

#[test]
fn unknown_verb_is_rejected() {
    let (c, _, _) = console();
    assert!(matches!(
        c.handle_line("explode"),
        Err(ConsoleError::UnknownCommand(_))
    ));
}

#[test]
fn freq_in_range_is_applied_exactly() {
    let (c, shared, _) = console();
    c.handle_line("freq 2450000000").unwrap();
    assert_eq!(shared.center_freq_hz(), 2_450_000_000);
}

#[test]
fn freq_out_of_range_is_rejected_not_clamped() {
    let (c, shared, _) = console();
    let before = shared.center_freq_hz();
    assert!(matches!(
        c.handle_line("freq 100"),
        Err(ConsoleError::FrequencyOutOfRange(100))
    ));
    assert_eq!(shared.center_freq_hz(), before);
}

#[test]
fn ppm_validates_its_range() {
    let (c, shared, _) = console();
    c.handle_line("ppm -12.5").unwrap();
    assert_eq!(shared.ppm(), -12.5);
    assert!(matches!(
        c.handle_line("ppm 500"),
        Err(ConsoleError::PpmOutOfRange(_))
    ));
}

#[test]
fn jitter_and_txpwr_clamp_instead_of_rejecting() {
    let (c, shared, _) = console();
    c.handle_line("jitter 1000").unwrap();
    assert_eq!(shared.jitter_us(), 30);
    c.handle_line("txpwr 50").unwrap();
    assert_eq!(shared.tx_power_dbm(), 13);
    c.handle_line("txpwr -50").unwrap();
    assert_eq!(shared.tx_power_dbm(), -18);
}

#[test]
fn cw_and_stop_toggle_the_test_flag_with_actions() {
    let (c, shared, _) = console();
    let reply = c.handle_line("cw").unwrap();
    assert_eq!(reply.action, ConsoleAction::StartCw);
    assert!(shared.cw_test());

    let reply = c.handle_line("stop").unwrap();
    assert_eq!(reply.action, ConsoleAction::StopCw);
    assert!(!shared.cw_test());
}

#[test]
fn enable_toggles_commit_and_raise_dirty() {
    let (c, _, config) = console();
    assert!(!config.is_dirty());

    c.handle_line("enable comp off").unwrap();
    assert!(config.is_dirty());
    let cfg = config.take_if_dirty().unwrap();
    assert!(!cfg.enable_comp);
    assert!(cfg.enable_bandpass);

    assert!(matches!(
        c.handle_line("enable reverb on"),
        Err(ConsoleError::UnknownSection(_))
    ));
}

#[test]
fn set_updates_one_field_and_rejects_unknown_keys() {
    let (c, _, config) = console();
    c.handle_line("set bp_lo 120").unwrap();
    let cfg = config.take_if_dirty().unwrap();
    assert_eq!(cfg.bp_lo_hz, 120.0);

    assert!(matches!(
        c.handle_line("set reverb 1"),
        Err(ConsoleError::UnknownKey(_))
    ));
    assert!(!config.is_dirty());
}

#[test]
fn set_is_case_insensitive() {
    let (c, _, config) = console();
    c.handle_line("SET COMP_RATIO 8").unwrap();
    let cfg = config.take_if_dirty().unwrap();
    assert_eq!(cfg.comp_ratio, 8.0);
}

#[test]
fn missing_arguments_are_reported() {
    let (c, _, _) = console();
    assert!(matches!(
        c.handle_line("freq"),
        Err(ConsoleError::MissingArgument("freq"))
    ));
    assert!(matches!(
        c.handle_line("set bp_lo"),
        Err(ConsoleError::MissingArgument("set"))
    ));
    assert!(matches!(
        c.handle_line("freq abc"),
        Err(ConsoleError::BadNumber(_))
    ));
}

#[test]
fn get_reports_config_and_rf_state() {
    let (c, shared, _) = console();
    shared.set_center_freq_hz(2_410_000_000);
    let reply = c.handle_line("get").unwrap();
    assert!(reply.text.contains("2410000000"));
    assert!(reply.text.contains("bp:"));
    assert!(reply.text.contains("comp:"));
}

#[test]
fn diag_reports_counters_and_requests_chip_status() {
    let (c, shared, _) = console();
    shared.count_underrun();
    shared.count_dropped_frames(7);
    let reply = c.handle_line("diag").unwrap();
    assert_eq!(reply.action, ConsoleAction::QueryChip);
    assert!(reply.text.contains("underruns 1"));
    assert!(reply.text.contains("dropped_frames 7"));
}

#[test]
fn help_lists_every_verb() {
    let (c, _, _) = console();
    let text = c.handle_line("help").unwrap().text;
    for verb in ["get", "diag", "cw", "stop", "freq", "ppm", "jitter", "txpwr", "enable", "set"] {
        assert!(text.contains(verb), "help is missing '{verb}'");
    }
}
