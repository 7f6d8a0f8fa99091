/// master - chunked audio mastering from the command line
use anyhow::bail;
use clap::Parser;
use mastering_audio::CancellationToken;
use mastering_cli::{plan_jobs, run_jobs, Cli, CliSettings, RunSettings};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    // Initialize tracing; the "master" directive also covers the mastering_* crates
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "master=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let settings = CliSettings::load(cli.config.as_deref())?.resolve(&cli)?;

    if cli.print_config {
        print!("{}", settings.to_toml()?);
        return Ok(());
    }

    let jobs = plan_jobs(&cli, &settings)?;
    if let Some(dir) = &settings.output.directory {
        std::fs::create_dir_all(dir)?;
    }
    let run_settings = RunSettings::from_settings(&settings)?;

    let cancellation = CancellationToken::new();
    let handler_token = cancellation.clone();
    ctrlc::set_handler(move || {
        tracing::warn!("Interrupted, stopping at the next chunk boundary");
        handler_token.cancel();
    })?;

    tracing::info!(files = jobs.len(), workers = settings.jobs, "Starting batch");
    let outcomes = run_jobs(&jobs, &run_settings, settings.jobs, &cancellation);

    let mut failed = 0;
    for outcome in &outcomes {
        match &outcome.result {
            Ok(report) => {
                let measured = report
                    .measured_lufs()
                    .map(|lufs| format!("{lufs:.1} LUFS"))
                    .unwrap_or_else(|| "not measured".to_string());
                println!(
                    "{} -> {} (input {measured}, gain {:+.2} dB, peak {:.2} dBFS, limiter {:.2} dB)",
                    outcome.job.input.display(),
                    outcome.job.output.display(),
                    report.gain_db,
                    report.output_peak_dbfs,
                    report.limiter_reduction_db,
                );
            }
            Err(e) => {
                failed += 1;
                if e.is_cancelled() {
                    tracing::warn!(input = %outcome.job.input.display(), "Cancelled");
                } else {
                    tracing::error!(input = %outcome.job.input.display(), error = %e, "Mastering failed");
                }
            }
        }
    }

    if failed > 0 {
        bail!("{failed} of {} file(s) were not mastered", outcomes.len());
    }
    Ok(())
}
