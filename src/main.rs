use std::fs::File;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use ssb_exciter::config::SharedConfig;
use ssb_exciter::console::{Console, ConsoleAction};
use ssb_exciter::pipeline::{block_ring, PipelineProducer};
use ssb_exciter::rf::{bench_cw_start, bench_cw_stop, ApplyLoop, LoggingBus, StdClock, Sx1280};
use ssb_exciter::runtime::{RuntimeShared, BASE_FREQ_HZ};
use ssb_exciter::audio::{ingest_ring, input::run_pcm_boundary, INGEST_CAPACITY};

/// Phasing-CW SSB exciter: stream s16le stereo audio into a timed SX1280
/// command stream.
#[derive(Parser, Debug)]
#[command(name = "ssb-exciter", version)]
struct Args {
    /// Input PCM file (s16le stereo), or '-' for stdin.
    input: String,

    /// Host sample rate of the input stream in Hz.
    #[arg(long, default_value_t = 48_000)]
    rate: u32,

    /// Center frequency in Hz.
    #[arg(long, default_value_t = BASE_FREQ_HZ)]
    freq: u32,

    /// Crystal correction in PPM.
    #[arg(long, default_value_t = 0.0)]
    ppm: f32,

    /// Maximum transmit power in dBm.
    #[arg(long, default_value_t = 13)]
    txpwr: i8,

    /// Apply-timing jitter span in microseconds.
    #[arg(long, default_value_t = 0)]
    jitter: u32,

    /// Start with the bus suspended (bench/CW mode); audio still flows
    /// through the pipeline but nothing is keyed until 'stop'.
    #[arg(long)]
    mute: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();

    println!(
        "{}",
        "📻 ssb-exciter: phasing-CW SSB to SX1280".bold().cyan()
    );

    let shared = Arc::new(RuntimeShared::new());
    shared.set_host_rate_hz(args.rate);
    shared.set_center_freq_hz(args.freq);
    shared.set_ppm(args.ppm);
    shared.set_tx_power_dbm(args.txpwr);
    shared.set_jitter_us(args.jitter);
    if args.mute {
        shared.set_cw_test(true);
        info!("starting muted; 'stop' resumes the apply loop");
    }

    let config = Arc::new(SharedConfig::default());

    let (ingest_tx, ingest_rx) = ingest_ring(INGEST_CAPACITY);
    let (block_tx, block_rx) = block_ring();

    let console_on_stdin = args.input != "-";

    // Audio source thread (stands in for the USB endpoint).
    {
        let shared = Arc::clone(&shared);
        let input = args.input.clone();
        thread::Builder::new()
            .name("pcm-boundary".into())
            .spawn(move || {
                let result = if input == "-" {
                    run_pcm_boundary(io::stdin(), ingest_tx, shared)
                } else {
                    match File::open(&input).with_context(|| format!("open {input}")) {
                        Ok(f) => run_pcm_boundary(f, ingest_tx, shared),
                        Err(e) => Err(e),
                    }
                };
                if let Err(e) = result {
                    error!("🎙️ PCM_BOUNDARY: {e:#}");
                }
            })
            .context("spawn pcm-boundary")?;
    }

    // Producer loop (resample, shape, modulate).
    {
        let producer =
            PipelineProducer::new(ingest_rx, block_tx, Arc::clone(&config), Arc::clone(&shared));
        thread::Builder::new()
            .name("producer".into())
            .spawn(move || producer.run())
            .context("spawn producer")?;
    }

    // Timed apply loop with its own radio handle.
    {
        let apply = ApplyLoop::new(
            Sx1280::new(LoggingBus),
            StdClock::new(),
            block_rx,
            Arc::clone(&shared),
        );
        thread::Builder::new()
            .name("apply-loop".into())
            .spawn(move || apply.run())
            .context("spawn apply-loop")?;
    }

    if console_on_stdin {
        run_console(shared, config)
    } else {
        // Stdin feeds audio, so there is no console; run until killed.
        loop {
            thread::park();
        }
    }
}

/// Interactive console on stdin. Owns a bench radio handle for the CW and
/// status commands; the apply loop stays off the bus while CW test is set.
fn run_console(shared: Arc<RuntimeShared>, config: Arc<SharedConfig>) -> Result<()> {
    let console = Console::new(shared.clone(), config);
    let mut bench = Sx1280::new(LoggingBus);

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    print!("> ");
    stdout.flush()?;

    for line in stdin.lock().lines() {
        let line = line?;
        match console.handle_line(&line) {
            Ok(reply) => {
                if !reply.text.is_empty() {
                    println!("{}", reply.text);
                }
                match reply.action {
                    ConsoleAction::StartCw => {
                        // Let the apply loop notice the flag before we key.
                        thread::sleep(std::time::Duration::from_millis(20));
                        bench_cw_start(
                            &mut bench,
                            shared.center_freq_hz(),
                            shared.ppm(),
                            shared.tx_power_dbm(),
                        )?;
                    }
                    ConsoleAction::StopCw => bench_cw_stop(&mut bench)?,
                    ConsoleAction::QueryChip => match bench.chip_mode() {
                        Ok(mode) => println!("chip mode: {mode:?}"),
                        Err(e) => println!("{}", format!("ERR: status read: {e:#}").red()),
                    },
                    ConsoleAction::None => {}
                }
            }
            Err(e) => println!("{}", format!("ERR: {e}").red()),
        }
        print!("> ");
        stdout.flush()?;
    }

    info!("console closed, exiting");
    Ok(())
}
