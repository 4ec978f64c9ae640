//! Line-oriented control console.
//!
//! Parses one command line at a time against the shared runtime state and
//! configuration cell. Replies are plain text ("OK ..." / "ERR: ...");
//! commands that need the radio bus (bench CW, chip status) come back as
//! actions for the bus-owning caller to execute, since the console itself
//! never touches the bus.

use std::fmt::Write as _;
use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::config::SharedConfig;
use crate::runtime::{RuntimeShared, FREQ_MAX_HZ, FREQ_MIN_HZ, JITTER_MAX_US};

#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error("unknown command '{0}', try 'help'")]
    UnknownCommand(String),
    #[error("missing argument for '{0}'")]
    MissingArgument(&'static str),
    #[error("bad number '{0}'")]
    BadNumber(String),
    #[error("frequency {0} Hz out of range {FREQ_MIN_HZ}..{FREQ_MAX_HZ}")]
    FrequencyOutOfRange(u32),
    #[error("ppm {0} out of range -100..100")]
    PpmOutOfRange(f32),
    #[error("unknown config key '{0}'")]
    UnknownKey(String),
    #[error("unknown section '{0}', expected bp, eq or comp")]
    UnknownSection(String),
}

/// Side effect the caller must carry out after a successful command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleAction {
    None,
    /// Suspend the apply loop and key a bench carrier.
    StartCw,
    /// Release the bench carrier and resume the apply loop.
    StopCw,
    /// Read and report chip status.
    QueryChip,
}

#[derive(Debug)]
pub struct ConsoleReply {
    pub text: String,
    pub action: ConsoleAction,
}

impl ConsoleReply {
    fn ok(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            action: ConsoleAction::None,
        }
    }

    fn with_action(text: impl Into<String>, action: ConsoleAction) -> Self {
        Self {
            text: text.into(),
            action,
        }
    }
}

pub struct Console {
    shared: Arc<RuntimeShared>,
    config: Arc<SharedConfig>,
}

impl Console {
    pub fn new(shared: Arc<RuntimeShared>, config: Arc<SharedConfig>) -> Self {
        Self { shared, config }
    }

    /// Handle one input line. Empty lines reply with an empty OK.
    pub fn handle_line(&self, line: &str) -> Result<ConsoleReply, ConsoleError> {
        let mut parts = line.split_whitespace();
        let verb = match parts.next() {
            Some(v) => v.to_ascii_lowercase(),
            None => return Ok(ConsoleReply::ok("OK")),
        };

        match verb.as_str() {
            "help" => Ok(ConsoleReply::ok(HELP_TEXT)),
            "get" => Ok(ConsoleReply::ok(self.render_config())),
            "diag" => Ok(ConsoleReply::with_action(
                self.render_diag(),
                ConsoleAction::QueryChip,
            )),
            "cw" => {
                self.shared.set_cw_test(true);
                info!("🖥️ CONSOLE: bench CW requested");
                Ok(ConsoleReply::with_action(
                    "OK cw test on",
                    ConsoleAction::StartCw,
                ))
            }
            "stop" => {
                self.shared.set_cw_test(false);
                info!("🖥️ CONSOLE: bench CW released");
                Ok(ConsoleReply::with_action(
                    "OK cw test off",
                    ConsoleAction::StopCw,
                ))
            }
            "freq" => {
                let hz = parse_u32(parts.next().ok_or(ConsoleError::MissingArgument("freq"))?)?;
                if !(FREQ_MIN_HZ..=FREQ_MAX_HZ).contains(&hz) {
                    return Err(ConsoleError::FrequencyOutOfRange(hz));
                }
                self.shared.set_center_freq_hz(hz);
                Ok(ConsoleReply::ok(format!("OK freq {hz} Hz")))
            }
            "ppm" => {
                let ppm = parse_f32(parts.next().ok_or(ConsoleError::MissingArgument("ppm"))?)?;
                if !ppm.is_finite() || !(-100.0..=100.0).contains(&ppm) {
                    return Err(ConsoleError::PpmOutOfRange(ppm));
                }
                self.shared.set_ppm(ppm);
                Ok(ConsoleReply::ok(format!("OK ppm {ppm}")))
            }
            "jitter" => {
                let us =
                    parse_u32(parts.next().ok_or(ConsoleError::MissingArgument("jitter"))?)?;
                self.shared.set_jitter_us(us);
                Ok(ConsoleReply::ok(format!(
                    "OK jitter {} us",
                    self.shared.jitter_us().min(JITTER_MAX_US)
                )))
            }
            "txpwr" => {
                let dbm =
                    parse_f32(parts.next().ok_or(ConsoleError::MissingArgument("txpwr"))?)?;
                self.shared.set_tx_power_dbm(dbm as i8);
                Ok(ConsoleReply::ok(format!(
                    "OK txpwr {} dBm",
                    self.shared.tx_power_dbm()
                )))
            }
            "enable" => {
                let section = parts
                    .next()
                    .ok_or(ConsoleError::MissingArgument("enable"))?
                    .to_ascii_lowercase();
                let on = parse_bool(
                    parts.next().ok_or(ConsoleError::MissingArgument("enable"))?,
                )?;
                let mut cfg = self.config.snapshot();
                match section.as_str() {
                    "bp" => cfg.enable_bandpass = on,
                    "eq" => cfg.enable_eq = on,
                    "comp" => cfg.enable_comp = on,
                    other => return Err(ConsoleError::UnknownSection(other.to_string())),
                }
                self.config.commit(cfg);
                Ok(ConsoleReply::ok(format!(
                    "OK {section} {}",
                    if on { "on" } else { "off" }
                )))
            }
            "set" => {
                let key = parts
                    .next()
                    .ok_or(ConsoleError::MissingArgument("set"))?
                    .to_ascii_lowercase();
                let value =
                    parse_f32(parts.next().ok_or(ConsoleError::MissingArgument("set"))?)?;
                let mut cfg = self.config.snapshot();
                if !cfg.set_field(&key, value) {
                    return Err(ConsoleError::UnknownKey(key));
                }
                self.config.commit(cfg);
                Ok(ConsoleReply::ok(format!("OK {key} = {value}")))
            }
            other => Err(ConsoleError::UnknownCommand(other.to_string())),
        }
    }

    fn render_config(&self) -> String {
        let cfg = self.config.snapshot();
        let mut out = String::new();
        let _ = writeln!(
            out,
            "bp: {} {:.0}..{:.0} Hz x{}",
            onoff(cfg.enable_bandpass),
            cfg.bp_lo_hz,
            cfg.bp_hi_hz,
            cfg.bp_stages
        );
        let _ = writeln!(
            out,
            "eq: {} low {:.0} Hz {:+.1} dB, high {:.0} Hz {:+.1} dB, slope {:.1}",
            onoff(cfg.enable_eq),
            cfg.eq_low_hz,
            cfg.eq_low_db,
            cfg.eq_high_hz,
            cfg.eq_high_db,
            cfg.eq_slope
        );
        let _ = writeln!(
            out,
            "comp: {} thr {:.1} dB ratio {:.1}:1 att {:.1} ms rel {:.1} ms makeup {:.1} dB knee {:.1} dB outlim {:.3}",
            onoff(cfg.enable_comp),
            cfg.comp_thr_db,
            cfg.comp_ratio,
            cfg.comp_attack_ms,
            cfg.comp_release_ms,
            cfg.comp_makeup_db,
            cfg.comp_knee_db,
            cfg.comp_out_limit
        );
        let _ = writeln!(
            out,
            "amp: gain {:.2} min_a {:.1e} gate_ref {:.4} gate_sq {}",
            cfg.amp_gain,
            cfg.amp_min_a,
            cfg.gate_ref,
            onoff(cfg.gate_sq)
        );
        let _ = write!(
            out,
            "rf: freq {} Hz ppm {:.2} txpwr {} dBm jitter {} us",
            self.shared.center_freq_hz(),
            self.shared.ppm(),
            self.shared.tx_power_dbm(),
            self.shared.jitter_us()
        );
        out
    }

    fn render_diag(&self) -> String {
        format!(
            "underruns {} dropped_frames {} ingest_fill {} blocks_ready {} cw_test {} started {}",
            self.shared.underruns(),
            self.shared.frames_dropped(),
            self.shared.ingest_fill(),
            self.shared.blocks_ready(),
            onoff(self.shared.cw_test()),
            onoff(self.shared.consumer_started())
        )
    }
}

fn onoff(b: bool) -> &'static str {
    if b {
        "on"
    } else {
        "off"
    }
}

fn parse_u32(s: &str) -> Result<u32, ConsoleError> {
    s.parse().map_err(|_| ConsoleError::BadNumber(s.to_string()))
}

fn parse_f32(s: &str) -> Result<f32, ConsoleError> {
    s.parse().map_err(|_| ConsoleError::BadNumber(s.to_string()))
}

fn parse_bool(s: &str) -> Result<bool, ConsoleError> {
    match s.to_ascii_lowercase().as_str() {
        "1" | "on" | "true" => Ok(true),
        "0" | "off" | "false" => Ok(false),
        other => Err(ConsoleError::BadNumber(other.to_string())),
    }
}

const HELP_TEXT: &str = "\
commands:
  get                    show configuration and RF state
  diag                   show pipeline counters and chip status
  cw                     key a bench carrier (suspends the pipeline)
  stop                   release the bench carrier
  freq <hz>              center frequency, 2.4e9..2.5e9
  ppm <f>                crystal correction, -100..100
  jitter <us>            apply-timing jitter, 0..30
  txpwr <dbm>            max transmit power, -18..13
  enable bp|eq|comp 0|1  toggle a shaping stage
  set <key> <value>      tune one config field (see 'get' for keys)";
