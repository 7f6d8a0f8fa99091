//! End-to-end pipeline tests over in-memory streams
//!
//! Run with: cargo test -p mastering-audio --test pipeline_e2e_test

use mastering_audio::test_utils::*;
use mastering_audio::{
    master_buffer, BufferSink, BufferSource, CancellationToken, MasteringPipeline, Pass,
    PipelineState,
};
use mastering_core::{
    EqSettings, MasteringConfig, MasteringError, Preset, SampleRate, SampleSource, StreamSpec,
};
use mastering_loudness::measure;
use std::sync::{Arc, Mutex};

const RATE: u32 = 44_100;

fn busy_config(chunk_duration_seconds: f64) -> MasteringConfig {
    let mut config = MasteringConfig {
        multiband: true,
        saturation: 15.0,
        exciter_drive: 0.4,
        stereo_width: 1.3,
        target_lufs: Some(-14.0),
        chunk_duration_seconds,
        ..MasteringConfig::default()
    };
    Preset::Dubstep.apply_to(&mut config);
    config
}

/// Stereo material with different left and right channels
fn program_material(seconds: f32) -> Vec<f32> {
    let sweep = generate_sine_sweep(40.0, 12_000.0, RATE, seconds, 0.4);
    let noise = generate_white_noise(RATE, seconds, 0.1, 42);
    sweep.iter().zip(&noise).map(|(s, n)| s + n).collect()
}

#[test]
fn chunking_does_not_change_output() {
    let input = program_material(4.0);
    let spec = StreamSpec::stereo(RATE);

    let (whole, whole_report) = master_buffer(busy_config(600.0), spec, input.clone()).unwrap();
    let (chunked, chunked_report) = master_buffer(busy_config(0.37), spec, input).unwrap();

    assert_eq!(whole_report.processing_blocks, 1);
    assert_eq!(chunked_report.processing_blocks, 11);
    assert!(
        (whole_report.measured_lufs().unwrap() - chunked_report.measured_lufs().unwrap()).abs()
            < 1e-6
    );

    let diff = max_abs_difference(&whole, &chunked);
    assert!(diff <= 1e-5, "max difference {diff}");
}

#[test]
fn neutral_settings_are_an_identity() {
    let input = generate_sine_wave(997.0, RATE, 1.0, 0.5);
    let config = MasteringConfig {
        eq: EqSettings::default(),
        exciter_drive: 0.0,
        stereo_width: 1.0,
        chunk_duration_seconds: 0.1,
        ..MasteringConfig::default()
    };

    let (output, report) = master_buffer(config, StreamSpec::stereo(RATE), input.clone()).unwrap();

    assert!(report.stages.is_empty());
    assert_eq!(report.limiter_reduction_db, 0.0);
    assert_eq!(output, input);
}

#[test]
fn silent_input_is_rejected_before_processing() {
    let mut source =
        BufferSource::new(StreamSpec::stereo(RATE), generate_silence(RATE, 2.0)).unwrap();
    let mut sink = BufferSink::new();
    let config = MasteringConfig {
        target_lufs: Some(-14.0),
        ..MasteringConfig::default()
    };
    let mut pipeline = MasteringPipeline::new(config).unwrap();

    let result = pipeline.run(&mut source, &mut sink);

    assert!(matches!(result, Err(MasteringError::SilentInput)));
    assert_eq!(pipeline.state(), PipelineState::Failed);
    assert_eq!(sink.blocks_written(), 0);
    assert!(sink.is_incomplete());
}

#[test]
fn signal_under_absolute_gate_is_silent() {
    // -90 dBFS sits well below the -70 LUFS gate
    let input = generate_sine_wave(1000.0, RATE, 2.0, 3.2e-5);
    let config = MasteringConfig {
        target_lufs: Some(-14.0),
        ..MasteringConfig::default()
    };
    assert!(matches!(
        master_buffer(config, StreamSpec::stereo(RATE), input),
        Err(MasteringError::SilentInput)
    ));
}

#[test]
fn silence_without_target_passes_through() {
    let input = generate_silence(RATE, 0.5);
    let (output, report) =
        master_buffer(MasteringConfig::default(), StreamSpec::stereo(RATE), input.clone()).unwrap();
    assert_eq!(output, input);
    assert!(report.output_peak_dbfs.is_infinite());
}

#[test]
fn empty_stream() {
    let (output, report) =
        master_buffer(MasteringConfig::default(), StreamSpec::stereo(RATE), Vec::new()).unwrap();
    assert!(output.is_empty());
    assert_eq!(report.frames_written, 0);

    let config = MasteringConfig {
        target_lufs: Some(-14.0),
        ..MasteringConfig::default()
    };
    assert!(matches!(
        master_buffer(config, StreamSpec::stereo(RATE), Vec::new()),
        Err(MasteringError::SilentInput)
    ));
}

#[test]
fn techno_master_of_ninety_second_sweep() {
    let input = generate_sine_sweep(20.0, 20_000.0, RATE, 90.0, 0.5);
    let mut config = MasteringConfig {
        compress: true,
        target_lufs: Some(-14.0),
        chunk_duration_seconds: 30.0,
        ..MasteringConfig::default()
    };
    Preset::Techno.apply_to(&mut config);
    let ceiling = config.limiter.ceiling_linear();

    let (output, report) = master_buffer(config, StreamSpec::stereo(RATE), input.clone()).unwrap();

    // Same duration and channel layout
    assert_eq!(output.len(), input.len());
    assert_eq!(report.frames_written, (input.len() / 2) as u64);
    assert_eq!(report.measuring_blocks, 3);
    assert_eq!(report.processing_blocks, 3);
    assert_eq!(report.stages, vec!["Equalizer", "Compressor"]);

    // Never above the ceiling
    let peak = calculate_peak(&output);
    assert!(f64::from(peak) <= ceiling + 1e-6, "peak {peak} > ceiling {ceiling}");

    // On target
    let loudness = measure(&output, RATE, 2).unwrap();
    assert!(
        (loudness.integrated_lufs - -14.0).abs() <= 0.5,
        "integrated {} LUFS",
        loudness.integrated_lufs
    );
}

#[test]
fn mono_stream_is_mastered() {
    let stereo = generate_sine_wave(220.0, RATE, 2.0, 0.3);
    let mono: Vec<f32> = stereo.iter().step_by(2).copied().collect();
    let config = MasteringConfig {
        stereo_width: 1.8,
        compress: true,
        target_lufs: Some(-16.0),
        ..MasteringConfig::default()
    };

    let spec = StreamSpec::new(SampleRate::CD_QUALITY, 1);
    let (output, report) = master_buffer(config, spec, mono.clone()).unwrap();

    assert_eq!(output.len(), mono.len());
    assert!(!report.stages.iter().any(|s| s == "Stereo Widener"));
    let loudness = measure(&output, RATE, 1).unwrap();
    assert!((loudness.integrated_lufs - -16.0).abs() <= 0.5);
}

#[test]
fn cancellation_mid_processing() {
    let token = CancellationToken::new();
    let handle = token.clone();
    let config = MasteringConfig {
        chunk_duration_seconds: 0.5,
        ..MasteringConfig::default()
    };
    let mut pipeline = MasteringPipeline::new(config)
        .unwrap()
        .with_cancellation(token)
        .with_progress(move |progress| {
            if progress.pass == Pass::Processing && progress.blocks_done == 2 {
                handle.cancel();
            }
        });

    let mut source =
        BufferSource::new(StreamSpec::stereo(RATE), generate_sine_wave(440.0, RATE, 3.0, 0.5))
            .unwrap();
    let mut sink = BufferSink::new();

    let result = pipeline.run(&mut source, &mut sink);

    assert!(matches!(result, Err(MasteringError::Cancelled)));
    assert_eq!(pipeline.state(), PipelineState::Cancelled);
    assert_eq!(sink.blocks_written(), 2);
    assert!(sink.is_incomplete());
    assert!(!sink.is_finished());
}

#[test]
fn cancelled_before_start() {
    let token = CancellationToken::new();
    token.cancel();
    let config = MasteringConfig {
        target_lufs: Some(-14.0),
        ..MasteringConfig::default()
    };
    let mut pipeline = MasteringPipeline::new(config)
        .unwrap()
        .with_cancellation(token);

    let mut source =
        BufferSource::new(StreamSpec::stereo(RATE), generate_sine_wave(440.0, RATE, 1.0, 0.5))
            .unwrap();
    let mut sink = BufferSink::new();

    assert!(matches!(
        pipeline.run(&mut source, &mut sink),
        Err(MasteringError::Cancelled)
    ));
    assert_eq!(sink.blocks_written(), 0);
    assert!(sink.is_incomplete());
}

#[test]
fn terminal_pipeline_refuses_to_run_again() {
    let config = MasteringConfig {
        target_lufs: Some(-14.0),
        ..MasteringConfig::default()
    };
    let mut pipeline = MasteringPipeline::new(config).unwrap();
    let mut silent =
        BufferSource::new(StreamSpec::stereo(RATE), generate_silence(RATE, 1.0)).unwrap();
    assert!(pipeline.run(&mut silent, &mut BufferSink::new()).is_err());
    assert_eq!(pipeline.state(), PipelineState::Failed);

    let mut loud =
        BufferSource::new(StreamSpec::stereo(RATE), generate_sine_wave(440.0, RATE, 1.0, 0.5))
            .unwrap();
    let mut sink = BufferSink::new();
    assert!(matches!(
        pipeline.run(&mut loud, &mut sink),
        Err(MasteringError::InvalidState(_))
    ));
    // Nothing ran: the source is untouched and the sink was not flagged
    assert_eq!(sink.blocks_written(), 0);
    assert!(!sink.is_incomplete());
    assert_eq!(loud.read_block(10).unwrap().unwrap().start_frame, 0);
}

#[test]
fn progress_reports_every_chunk() {
    let updates = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&updates);
    let config = MasteringConfig {
        compress: true,
        target_lufs: Some(-18.0),
        chunk_duration_seconds: 1.0,
        ..MasteringConfig::default()
    };
    let mut pipeline = MasteringPipeline::new(config)
        .unwrap()
        .with_progress(move |p| log.lock().unwrap().push(*p));

    let mut source = BufferSource::new(
        StreamSpec::stereo(RATE),
        generate_dynamic_test_signal(RATE, 5.0, 0.5, 0.05, 0.7),
    )
    .unwrap();
    pipeline.run(&mut source, &mut BufferSink::new()).unwrap();

    let updates = updates.lock().unwrap();
    assert_eq!(updates.len(), 10);
    for pass in [Pass::Measuring, Pass::Processing] {
        let fractions: Vec<f64> = updates
            .iter()
            .filter(|p| p.pass == pass)
            .map(|p| p.fraction)
            .collect();
        assert_eq!(fractions, vec![0.2, 0.4, 0.6, 0.8, 1.0]);
    }
    assert!(updates.windows(2).all(|w| w[1].overall > w[0].overall));
}

#[test]
fn loud_input_is_pulled_down_and_limited() {
    // Overs on the input; a 0 LUFS target puts the sine peaks right at full scale
    let input: Vec<f32> = generate_sine_wave(997.0, RATE, 3.0, 1.0)
        .iter()
        .map(|s| s * 1.4)
        .collect();
    let config = MasteringConfig {
        target_lufs: Some(0.0),
        ..MasteringConfig::default()
    };
    let ceiling = config.limiter.ceiling_linear();

    let (output, report) = master_buffer(config, StreamSpec::stereo(RATE), input).unwrap();

    assert!(report.gain_db < 0.0);
    assert!(report.limiter_reduction_db > 0.1);
    assert!(f64::from(calculate_peak(&output)) <= ceiling + 1e-6);
    assert!(report.output_peak_dbfs <= -0.3 + 1e-4);
}

#[test]
fn non_finite_input_samples_are_silenced() {
    let ceiling = MasteringConfig::default().limiter.ceiling_linear();

    for bad in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
        let mut input = generate_sine_wave(440.0, RATE, 2.0, 0.5);
        input[1000] = bad;

        for config in [
            MasteringConfig {
                compress: true,
                ..MasteringConfig::default()
            },
            MasteringConfig {
                target_lufs: Some(-14.0),
                ..MasteringConfig::default()
            },
        ] {
            let (output, report) =
                master_buffer(config, StreamSpec::stereo(RATE), input.clone()).unwrap();

            assert_eq!(output.len(), input.len());
            assert!(output.iter().all(|s| s.is_finite()), "{bad} leaked through");
            assert!(output.iter().all(|s| f64::from(s.abs()) <= ceiling + 1e-6));
            assert!(report.gain_db.is_finite());
        }
    }
}
