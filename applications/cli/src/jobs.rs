/// Batch mastering
///
/// Each input file becomes one `Job`. Workers pull jobs from a shared index on
/// scoped threads, so at most `jobs` files are decoded at once.
use crate::args::Cli;
use crate::config::CliSettings;
use crate::error::{CliError, Result};
use mastering_audio::{CancellationToken, MasteringPipeline, MasteringReport, OutputFormat};
use mastering_audio::{SymphoniaSource, WavSink};
use mastering_core::{MasteringConfig, MasteringError, SampleSource};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

/// One input file and where its master goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub input: PathBuf,
    pub output: PathBuf,
}

/// Everything a worker needs, shared by every job
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub config: MasteringConfig,
    pub format: OutputFormat,
    pub complete_flag: bool,
}

impl RunSettings {
    pub fn from_settings(settings: &CliSettings) -> Result<Self> {
        Ok(Self {
            config: settings.mastering.clone(),
            format: settings.output_format()?,
            complete_flag: settings.output.complete_flag,
        })
    }
}

/// Result of mastering one file
#[derive(Debug)]
pub struct JobOutcome {
    pub job: Job,
    pub result: std::result::Result<MasteringReport, MasteringError>,
}

/// `<dir>/<stem><suffix>.wav`, with `dir` defaulting to the input's directory
pub fn output_path_for(input: &Path, output_dir: Option<&Path>, suffix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let dir = output_dir
        .map(Path::to_path_buf)
        .or_else(|| input.parent().map(Path::to_path_buf))
        .unwrap_or_default();
    dir.join(format!("{stem}{suffix}.wav"))
}

/// Pair every input with its output path
pub fn plan_jobs(cli: &Cli, settings: &CliSettings) -> Result<Vec<Job>> {
    if cli.inputs.is_empty() {
        return Err(CliError::Arguments("no input files".to_string()));
    }

    let jobs: Vec<Job> = match &cli.output {
        Some(output) => {
            if cli.inputs.len() > 1 {
                return Err(CliError::Arguments(
                    "--output takes a single input; use --output-dir for batches".to_string(),
                ));
            }
            vec![Job {
                input: cli.inputs[0].clone(),
                output: output.clone(),
            }]
        }
        None => cli
            .inputs
            .iter()
            .map(|input| Job {
                input: input.clone(),
                output: output_path_for(
                    input,
                    settings.output.directory.as_deref(),
                    &settings.output.suffix,
                ),
            })
            .collect(),
    };

    let mut seen = HashSet::new();
    for job in &jobs {
        if job.output == job.input {
            return Err(CliError::Arguments(format!(
                "output would overwrite input {}",
                job.input.display()
            )));
        }
        if !seen.insert(&job.output) {
            return Err(CliError::Arguments(format!(
                "two inputs map to the same output {}",
                job.output.display()
            )));
        }
    }

    Ok(jobs)
}

/// Master every job on up to `workers` threads, returning outcomes in job order
pub fn run_jobs(
    jobs: &[Job],
    settings: &RunSettings,
    workers: usize,
    cancellation: &CancellationToken,
) -> Vec<JobOutcome> {
    run_with(jobs, workers, cancellation, |job| {
        master_file(job, settings, cancellation)
    })
}

/// Worker pool behind [`run_jobs`]
///
/// Every job gets exactly one outcome. Jobs claimed by a worker that panicked
/// are reported as failed.
fn run_with<F>(
    jobs: &[Job],
    workers: usize,
    cancellation: &CancellationToken,
    master: F,
) -> Vec<JobOutcome>
where
    F: Fn(&Job) -> std::result::Result<MasteringReport, MasteringError> + Sync,
{
    let next = AtomicUsize::new(0);
    let workers = workers.clamp(1, jobs.len().max(1));

    let mut outcomes: Vec<Option<JobOutcome>> = thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(|_| {
                scope.spawn(|| {
                    let mut done = Vec::new();
                    loop {
                        let index = next.fetch_add(1, Ordering::SeqCst);
                        let Some(job) = jobs.get(index) else {
                            break;
                        };
                        let result = if cancellation.is_cancelled() {
                            Err(MasteringError::Cancelled)
                        } else {
                            master(job)
                        };
                        done.push((
                            index,
                            JobOutcome {
                                job: job.clone(),
                                result,
                            },
                        ));
                    }
                    done
                })
            })
            .collect();

        let mut outcomes: Vec<Option<JobOutcome>> = jobs.iter().map(|_| None).collect();
        for handle in handles {
            match handle.join() {
                Ok(done) => {
                    for (index, outcome) in done {
                        outcomes[index] = Some(outcome);
                    }
                }
                Err(_) => tracing::error!("Mastering worker panicked"),
            }
        }
        outcomes
    });

    jobs.iter()
        .zip(outcomes.iter_mut())
        .map(|(job, outcome)| {
            outcome.take().unwrap_or_else(|| JobOutcome {
                job: job.clone(),
                result: Err(MasteringError::invalid_state(format!(
                    "worker mastering {} panicked",
                    job.input.display()
                ))),
            })
        })
        .collect()
}

/// Decode, master and write one file
pub fn master_file(
    job: &Job,
    settings: &RunSettings,
    cancellation: &CancellationToken,
) -> std::result::Result<MasteringReport, MasteringError> {
    let span = tracing::info_span!("file", input = %job.input.display());
    let _enter = span.enter();

    let mut source = SymphoniaSource::open(&job.input)?;
    let spec = source.spec();
    let mut sink = WavSink::create(&job.output, &spec, settings.format)?
        .with_complete_flag(settings.complete_flag);

    let name = job
        .input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut next_report = 0.1;

    let mut pipeline = MasteringPipeline::new(settings.config.clone())?
        .with_cancellation(cancellation.clone())
        .with_progress(move |progress| {
            if progress.overall + 1e-9 >= next_report {
                tracing::info!(
                    file = %name,
                    pass = %progress.pass,
                    percent = (progress.overall * 100.0).round(),
                    "Progress"
                );
                while next_report <= progress.overall + 1e-9 {
                    next_report += 0.1;
                }
            }
        });

    tracing::info!(
        output = %job.output.display(),
        sample_rate = spec.sample_rate.as_hz(),
        channels = spec.channels,
        "Mastering"
    );
    pipeline.run(&mut source, &mut sink)
}
