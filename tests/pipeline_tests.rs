//! Producer loop: pre-buffer handshake, silence behavior and configuration
//! pickup on block boundaries.

use std::sync::Arc;

use ssb_exciter::audio::{ingest_ring, AudioFrame};
use ssb_exciter::config::SharedConfig;
use ssb_exciter::pipeline::{block_ring, PipelineProducer, SampleCommand, BLOCK_SAMPLES};
use ssb_exciter::rf::PWR_MIN_DBM;
use ssb_exciter::runtime::RuntimeShared;

fn fixture() -> (
    PipelineProducer,
    ssb_exciter::pipeline::BlockConsumer,
    ssb_exciter::audio::IngestWriter,
    Arc<RuntimeShared>,
    Arc<SharedConfig>,
) {
    let (tx, rx) = ingest_ring(8192);
    let (block_tx, block_rx) = block_ring();
    let shared = Arc::new(RuntimeShared::new());
    let config = Arc::new(SharedConfig::default());
    let producer = PipelineProducer::new(rx, block_tx, config.clone(), shared.clone());
    (producer, block_rx, tx, shared, config)
}

#[test]
fn prebuffering_raises_the_start_flag_once_half_full() {
    let (mut producer, _rx, _tx, shared, _cfg) = fixture();

    producer.produce_block();
    producer.produce_block();
    producer.produce_block();
    assert!(!shared.consumer_started());

    producer.produce_block();
    assert!(shared.consumer_started());
    assert_eq!(producer.blocks_produced(), 4);
}

#[test]
fn silence_produces_unkeyed_commands_at_base_frequency() {
    let (mut producer, mut rx, _tx, shared, _cfg) = fixture();
    let base = shared.base_steps() as i32;

    // Two seconds of silence: well past the state-reset window.
    for _ in 0..70 {
        producer.produce_block();
        let mut out = [SampleCommand::default(); BLOCK_SAMPLES];
        assert!(rx.try_consume(&mut out));
        for cmd in &out {
            assert!(!cmd.tx_on);
            assert_eq!(cmd.power_dbm, PWR_MIN_DBM);
            // Dither may wander one step around the carrier.
            assert!((cmd.freq_steps - base).abs() <= 1);
        }
    }
}

#[test]
fn config_commit_is_picked_up_on_the_next_block() {
    let (mut producer, mut rx, _tx, _shared, config) = fixture();

    producer.produce_block();
    assert_eq!(producer.config().bp_lo_hz, 50.0);

    let mut cfg = config.snapshot();
    cfg.bp_lo_hz = 150.0;
    cfg.bp_stages = 500; // sanitized down on pickup
    config.commit(cfg);

    let mut out = [SampleCommand::default(); BLOCK_SAMPLES];
    assert!(rx.try_consume(&mut out));
    producer.produce_block();

    assert_eq!(producer.config().bp_lo_hz, 150.0);
    assert_eq!(producer.config().bp_stages, 10);
}

#[test]
fn loud_audio_keys_the_carrier() {
    let (mut producer, mut rx, mut tx, _shared, _cfg) = fixture();

    // A sustained loud 1 kHz tone at the 48 kHz host rate.
    for n in 0..8192 {
        let v = (12_000.0
            * (2.0 * std::f32::consts::PI * 1000.0 * n as f32 / 48_000.0).sin())
            as i16;
        tx.push(AudioFrame { l: v, r: v });
    }

    let mut keyed = 0usize;
    let mut total = 0usize;
    for _ in 0..4 {
        producer.produce_block();
        let mut out = [SampleCommand::default(); BLOCK_SAMPLES];
        assert!(rx.try_consume(&mut out));
        for cmd in &out {
            total += 1;
            if cmd.tx_on {
                keyed += 1;
            }
        }
    }
    assert!(
        keyed * 2 > total,
        "a loud tone should key most samples, got {keyed}/{total}"
    );
}
