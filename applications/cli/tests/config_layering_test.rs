//! Configuration layering: defaults, TOML file, environment, flags
//!
//! Run with: cargo test -p mastering-cli --test config_layering_test

use clap::Parser;
use mastering_cli::{Cli, CliError, CliSettings};
use mastering_core::Preset;
use std::fs;
use tempfile::TempDir;

fn cli(args: &[&str]) -> Cli {
    Cli::try_parse_from(std::iter::once("master").chain(args.iter().copied())).unwrap()
}

fn env(vars: &[(&str, &str)]) -> Option<config::Map<String, String>> {
    Some(
        vars.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    )
}

fn write_config(dir: &TempDir, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join("master.toml");
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn file_values_override_defaults() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
preset = "dubstep"
jobs = 3

[mastering]
compress = true
target_lufs = -16.0
stereo_width = 1.4

[mastering.limiter]
ceiling_db = -1.0

[output]
format = "float32"
complete_flag = true
"#,
    );

    let settings = CliSettings::load_with_env(Some(&path), env(&[])).unwrap();

    assert_eq!(settings.preset, Some(Preset::Dubstep));
    assert_eq!(settings.jobs, 3);
    assert!(settings.mastering.compress);
    assert_eq!(settings.mastering.target_lufs, Some(-16.0));
    assert_eq!(settings.mastering.stereo_width, 1.4);
    assert_eq!(settings.mastering.limiter.ceiling_db, -1.0);
    // Unset fields keep their defaults
    assert_eq!(settings.mastering.limiter.lookahead_ms, 5.0);
    assert_eq!(settings.output.format, "float32");
    assert_eq!(settings.output.suffix, "_mastered");
    assert!(settings.output.complete_flag);
}

#[test]
fn environment_overrides_file() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[mastering]\ntarget_lufs = -16.0\n");

    let settings = CliSettings::load_with_env(
        Some(&path),
        env(&[
            ("MASTER_MASTERING__TARGET_LUFS", "-11"),
            ("MASTER_MASTERING__MULTIBAND", "true"),
            ("MASTER_JOBS", "2"),
            ("MASTER_OUTPUT__FORMAT", "pcm16"),
        ]),
    )
    .unwrap();

    assert_eq!(settings.mastering.target_lufs, Some(-11.0));
    assert!(settings.mastering.multiband);
    assert_eq!(settings.jobs, 2);
    assert_eq!(settings.output.format, "pcm16");
}

#[test]
fn flags_override_environment() {
    let settings = CliSettings::load_with_env(
        None,
        env(&[
            ("MASTER_MASTERING__TARGET_LUFS", "-11"),
            ("MASTER_PRESET", "rock"),
        ]),
    )
    .unwrap()
    .resolve(&cli(&["in.wav", "--lufs", "-9", "--treble", "0"]))
    .unwrap();

    assert_eq!(settings.mastering.target_lufs, Some(-9.0));
    let rock = Preset::Rock.eq();
    assert_eq!(settings.mastering.eq.bass_db, rock.bass_db);
    assert_eq!(settings.mastering.eq.treble_db, 0.0);
}

#[test]
fn missing_config_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let result = CliSettings::load_with_env(Some(&dir.path().join("nope.toml")), env(&[]));
    assert!(matches!(result, Err(CliError::Config(_))));
}

#[test]
fn malformed_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[mastering]\nstereo_width = \"wide\"\n");
    assert!(matches!(
        CliSettings::load_with_env(Some(&path), env(&[])),
        Err(CliError::Config(_))
    ));
}

#[test]
fn printed_config_reloads_to_the_same_settings() {
    let settings = CliSettings::default()
        .resolve(&cli(&[
            "in.wav",
            "--preset",
            "techno",
            "--multiband",
            "--lufs",
            "-14",
            "--saturation",
            "20",
            "--format",
            "pcm16",
        ]))
        .unwrap();

    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, &settings.to_toml().unwrap());

    let reloaded = CliSettings::load_with_env(Some(&path), env(&[]))
        .unwrap()
        .resolve(&cli(&["in.wav"]))
        .unwrap();

    assert_eq!(reloaded, settings);
}
