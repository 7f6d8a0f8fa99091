//! Batch mastering of real files on disk
//!
//! Run with: cargo test -p mastering-cli --test batch_test

use clap::Parser;
use mastering_audio::test_utils::{calculate_peak, generate_sine_sweep};
use mastering_audio::{marker_path, CancellationToken, COMPLETE_SUFFIX};
use mastering_cli::{plan_jobs, run_jobs, Cli, CliSettings, RunSettings};
use mastering_core::MasteringError;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const RATE: u32 = 44_100;

fn write_input(path: &Path, seconds: f32) {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: RATE,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for sample in generate_sine_sweep(60.0, 8_000.0, RATE, seconds, 0.5) {
        writer.write_sample(sample).unwrap();
    }
    writer.finalize().unwrap();
}

fn read_output(path: &Path) -> (hound::WavSpec, Vec<f32>) {
    let mut reader = hound::WavReader::open(path).unwrap();
    let spec = reader.spec();
    let samples = reader
        .samples::<i32>()
        .map(|s| s.unwrap() as f32 / 8_388_607.0)
        .collect();
    (spec, samples)
}

fn settings_for(args: &[String]) -> (Cli, CliSettings) {
    let cli = Cli::try_parse_from(std::iter::once("master".to_string()).chain(args.iter().cloned()))
        .unwrap();
    let settings = CliSettings::default().resolve(&cli).unwrap();
    (cli, settings)
}

#[test]
fn masters_a_batch_in_parallel() {
    let dir = TempDir::new().unwrap();
    let out_dir = dir.path().join("out");
    std::fs::create_dir(&out_dir).unwrap();

    let inputs: Vec<PathBuf> = (0..3)
        .map(|i| {
            let path = dir.path().join(format!("track{i}.wav"));
            write_input(&path, 1.5 + i as f32 * 0.5);
            path
        })
        .collect();

    let mut args: Vec<String> = inputs.iter().map(|p| p.display().to_string()).collect();
    args.extend(
        [
            "--output-dir",
            out_dir.to_str().unwrap(),
            "--preset",
            "pop",
            "--compress",
            "--lufs",
            "-14",
            "--chunk-seconds",
            "0.5",
            "--complete-flag",
            "--jobs",
            "2",
        ]
        .map(String::from),
    );
    let (cli, settings) = settings_for(&args);

    let jobs = plan_jobs(&cli, &settings).unwrap();
    let run_settings = RunSettings::from_settings(&settings).unwrap();
    let outcomes = run_jobs(&jobs, &run_settings, settings.jobs, &CancellationToken::new());

    assert_eq!(outcomes.len(), 3);
    for (i, outcome) in outcomes.iter().enumerate() {
        let expected = out_dir.join(format!("track{i}_mastered.wav"));
        assert_eq!(outcome.job.output, expected);

        let report = outcome.result.as_ref().unwrap();
        assert!(report.measured_lufs().is_some());

        let (spec, samples) = read_output(&expected);
        assert_eq!(spec.channels, 2);
        assert_eq!(spec.sample_rate, RATE);
        assert_eq!(spec.bits_per_sample, 24);
        assert_eq!(samples.len() as u64, report.frames_written * 2);
        let input_frames = ((1.5 + i as f64 * 0.5) * f64::from(RATE)).round() as u64;
        assert_eq!(report.frames_written, input_frames);

        assert!(f64::from(calculate_peak(&samples)) <= 10f64.powf(-0.3 / 20.0) + 1e-4);
        assert!(marker_path(&expected, COMPLETE_SUFFIX).exists());
    }
}

#[test]
fn one_bad_file_does_not_stop_the_batch() {
    let dir = TempDir::new().unwrap();
    let good = dir.path().join("good.wav");
    write_input(&good, 1.0);
    let missing = dir.path().join("missing.wav");
    let garbage = dir.path().join("garbage.mp3");
    std::fs::write(&garbage, b"definitely not audio").unwrap();

    let args: Vec<String> = [&missing, &garbage, &good]
        .iter()
        .map(|p| p.display().to_string())
        .collect();
    let (cli, settings) = settings_for(&args);

    let jobs = plan_jobs(&cli, &settings).unwrap();
    let run_settings = RunSettings::from_settings(&settings).unwrap();
    let outcomes = run_jobs(&jobs, &run_settings, 3, &CancellationToken::new());

    assert!(matches!(outcomes[0].result, Err(MasteringError::Io(_))));
    assert!(matches!(outcomes[1].result, Err(MasteringError::Io(_))));
    assert!(outcomes[2].result.is_ok());
    assert!(dir.path().join("good_mastered.wav").exists());
    assert!(!dir.path().join("missing_mastered.wav").exists());
}
