//! Mastering pipeline
//!
//! Drives a `SampleSource` through the effect chain, the loudness normalizer
//! and the limiter into a `SampleSink`, one chunk at a time:
//!
//! ```text
//! Configured ──► Measuring ──► Processing ──► Done
//!      │   (target set)  │           │
//!      └─────────────────┴───────────┴──► Failed | Cancelled
//! ```
//!
//! The measuring pass only runs when a loudness target is configured. Every
//! stage is reset and the source rewound between passes, so pass 2 sees the
//! same signal pass 1 measured.

mod progress;
mod state;

pub use progress::{CancellationToken, Pass, Progress, ProgressCallback};
pub use state::PipelineState;

use crate::effects::{build_chain, EffectChain};
use crate::stream::{BufferSink, BufferSource};
use mastering_core::{
    AudioBlock, MasteringConfig, MasteringError, Result, SampleSink, SampleSource, StreamSpec,
};
use mastering_loudness::{
    LoudnessAccumulator, LoudnessMeasurement, LookaheadLimiter, NormalizationGain,
};

/// Summary of a finished run
#[derive(Debug, Clone, PartialEq)]
pub struct MasteringReport {
    /// Pass 1 measurement (pre-limiter chain output), if normalizing
    pub measurement: Option<LoudnessMeasurement>,
    /// Normalization gain applied in pass 2, in dB
    pub gain_db: f64,
    /// Frames written to the sink
    pub frames_written: u64,
    /// Blocks read in the measuring pass
    pub measuring_blocks: u64,
    /// Blocks read in the processing pass
    pub processing_blocks: u64,
    /// Largest output sample, in dBFS
    pub output_peak_dbfs: f64,
    /// Largest gain reduction the limiter applied, in dB
    pub limiter_reduction_db: f64,
    /// Stages of the pre-limiter chain, in order
    pub stages: Vec<String>,
}

impl MasteringReport {
    /// Integrated loudness measured in pass 1
    pub fn measured_lufs(&self) -> Option<f64> {
        self.measurement.as_ref().map(|m| m.integrated_lufs)
    }
}

/// One-shot orchestrator for a single stream
///
/// # Example
///
/// ```
/// use mastering_audio::{BufferSink, BufferSource, MasteringPipeline, PipelineState};
/// use mastering_core::{MasteringConfig, StreamSpec};
///
/// let samples: Vec<f32> = (0..44_100)
///     .flat_map(|i| {
///         let s = (i as f32 * 0.05).sin() * 0.5;
///         [s, s]
///     })
///     .collect();
/// let mut source = BufferSource::new(StreamSpec::stereo(44_100), samples)?;
/// let mut sink = BufferSink::new();
///
/// let mut pipeline = MasteringPipeline::new(MasteringConfig::default())?;
/// let report = pipeline.run(&mut source, &mut sink)?;
/// assert_eq!(report.frames_written, 44_100);
/// assert_eq!(pipeline.state(), PipelineState::Done);
/// # Ok::<(), mastering_core::MasteringError>(())
/// ```
pub struct MasteringPipeline {
    config: MasteringConfig,
    state: PipelineState,
    cancellation: CancellationToken,
    progress: Option<ProgressCallback>,
}

/// Per-run values shared by both passes
struct RunContext {
    spec: StreamSpec,
    block_frames: usize,
    total_blocks: Option<u64>,
    passes: u32,
}

impl MasteringPipeline {
    /// Validate `config` and build a pipeline in the `Configured` state
    ///
    /// # Errors
    /// Returns `MasteringError::Config` for any out-of-range parameter
    pub fn new(config: MasteringConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            state: PipelineState::Configured,
            cancellation: CancellationToken::new(),
            progress: None,
        })
    }

    /// Use an externally owned cancellation token
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Observe progress, called at least once per chunk
    #[must_use]
    pub fn with_progress(mut self, callback: impl FnMut(&Progress) + Send + 'static) -> Self {
        self.progress = Some(Box::new(callback));
        self
    }

    /// Current state
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Configuration this pipeline runs with
    pub fn config(&self) -> &MasteringConfig {
        &self.config
    }

    /// Handle that cancels this pipeline
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Process the whole stream
    ///
    /// On error or cancellation the sink is flagged with `mark_incomplete` and
    /// the pipeline ends in `Failed` or `Cancelled`.
    ///
    /// # Errors
    /// - `InvalidState` if the pipeline already ran
    /// - `Config` if the stream shape conflicts with the configuration
    /// - `SilentInput` if normalizing and the chain output has no gated content
    /// - `Cancelled` if the token was cancelled
    /// - `Io` for decode or encode failures
    pub fn run(
        &mut self,
        source: &mut dyn SampleSource,
        sink: &mut dyn SampleSink,
    ) -> Result<MasteringReport> {
        if self.state != PipelineState::Configured {
            return Err(MasteringError::invalid_state(format!(
                "pipeline already ran (state: {})",
                self.state
            )));
        }

        match self.execute(source, sink) {
            Ok(report) => {
                self.state.transition(PipelineState::Done)?;
                tracing::info!(
                    frames = report.frames_written,
                    gain_db = report.gain_db,
                    peak_dbfs = report.output_peak_dbfs,
                    "Mastering complete"
                );
                Ok(report)
            }
            Err(err) => {
                let next = if err.is_cancelled() {
                    PipelineState::Cancelled
                } else {
                    PipelineState::Failed
                };
                self.state.transition(next)?;

                if let Err(mark_err) = sink.mark_incomplete() {
                    tracing::warn!("Failed to flag incomplete output: {mark_err}");
                }
                if err.is_cancelled() {
                    tracing::info!("Mastering cancelled");
                } else {
                    tracing::error!("Mastering failed: {err}");
                }
                Err(err)
            }
        }
    }

    fn execute(
        &mut self,
        source: &mut dyn SampleSource,
        sink: &mut dyn SampleSink,
    ) -> Result<MasteringReport> {
        let spec = source.spec();
        if spec.channels == 0 || spec.channels > StreamSpec::MAX_CHANNELS {
            return Err(MasteringError::config(format!(
                "unsupported channel count {} (mono or stereo only)",
                spec.channels
            )));
        }
        if spec.sample_rate.as_hz() == 0 {
            return Err(MasteringError::config("sample rate must be positive"));
        }
        self.config.validate_for_sample_rate(spec.sample_rate.as_hz())?;

        let block_frames = spec
            .sample_rate
            .frames_for(self.config.chunk_duration_seconds)
            .max(1);
        let mut ctx = RunContext {
            spec,
            block_frames,
            total_blocks: spec.block_count(block_frames),
            passes: if self.config.normalizes() { 2 } else { 1 },
        };

        let mut chain = build_chain(&self.config, &spec)?;
        let stages: Vec<String> = chain.names().into_iter().map(String::from).collect();

        let mut measuring_blocks = 0;
        let mut measurement = None;
        let gain = match self.config.target_lufs {
            Some(target) => {
                self.state.transition(PipelineState::Measuring)?;
                let (measured, blocks) = self.measure(source, &mut chain, &ctx)?;
                let gain = NormalizationGain::compute(target, &measured)?;

                tracing::info!(
                    measured_lufs = measured.integrated_lufs,
                    target_lufs = target,
                    gain_db = gain.gain_db,
                    "Loudness measured"
                );

                chain.reset();
                source.rewind()?;
                // Pass 1 counted the blocks even if the container did not report a length
                ctx.total_blocks = ctx.total_blocks.or(Some(blocks));
                measuring_blocks = blocks;
                measurement = Some(measured);
                gain
            }
            None => NormalizationGain::UNITY,
        };

        self.state.transition(PipelineState::Processing)?;
        let processed = self.process(source, sink, &mut chain, gain, &ctx)?;

        Ok(MasteringReport {
            measurement,
            gain_db: gain.gain_db,
            frames_written: processed.frames_written,
            measuring_blocks,
            processing_blocks: processed.blocks,
            output_peak_dbfs: amplitude_to_db(processed.peak),
            limiter_reduction_db: processed.limiter_reduction_db,
            stages,
        })
    }

    /// Pass 1: run the chain and accumulate loudness
    fn measure(
        &mut self,
        source: &mut dyn SampleSource,
        chain: &mut EffectChain,
        ctx: &RunContext,
    ) -> Result<(LoudnessMeasurement, u64)> {
        let span = tracing::info_span!("measuring", block_frames = ctx.block_frames);
        let _enter = span.enter();

        let mut accumulator = LoudnessAccumulator::new(
            ctx.spec.sample_rate.as_hz(),
            u32::from(ctx.spec.channels),
        )?;
        let mut blocks = 0;

        loop {
            self.check_cancelled()?;
            let Some(mut block) = source.read_block(ctx.block_frames)? else {
                break;
            };
            check_block(&block, &ctx.spec)?;

            chain.process(&mut block.samples);
            accumulator.add_frames(&block.samples)?;
            blocks += 1;

            tracing::debug!(block = blocks, start_frame = block.start_frame, "Measured block");
            self.report(Progress::new(Pass::Measuring, blocks, ctx.total_blocks, ctx.passes));
        }

        Ok((accumulator.finalize()?, blocks))
    }

    /// Pass 2: chain, fixed gain, limiter, write
    fn process(
        &mut self,
        source: &mut dyn SampleSource,
        sink: &mut dyn SampleSink,
        chain: &mut EffectChain,
        gain: NormalizationGain,
        ctx: &RunContext,
    ) -> Result<ProcessedStream> {
        let span = tracing::info_span!(
            "processing",
            block_frames = ctx.block_frames,
            gain_db = gain.gain_db
        );
        let _enter = span.enter();

        let channels = usize::from(ctx.spec.channels);
        let mut limiter = LookaheadLimiter::new(
            ctx.spec.sample_rate.as_hz(),
            channels,
            &self.config.limiter,
        );
        let mut output =
            Vec::with_capacity((ctx.block_frames + limiter.latency_frames()) * channels);
        let mut writer = BlockWriter::new(ctx.spec);
        let mut blocks = 0;

        loop {
            self.check_cancelled()?;
            let Some(mut block) = source.read_block(ctx.block_frames)? else {
                break;
            };
            check_block(&block, &ctx.spec)?;

            chain.process(&mut block.samples);
            gain.apply(&mut block.samples);

            output.clear();
            limiter.process(&block.samples, &mut output);
            writer.write(sink, &mut output)?;
            blocks += 1;

            tracing::debug!(block = blocks, start_frame = block.start_frame, "Processed block");
            self.report(Progress::new(Pass::Processing, blocks, ctx.total_blocks, ctx.passes));
        }

        // Latency compensation: the limiter still holds the last `lookahead` frames
        output.clear();
        limiter.flush(&mut output);
        writer.write(sink, &mut output)?;
        sink.finish()?;

        Ok(ProcessedStream {
            blocks,
            frames_written: writer.position,
            peak: writer.peak,
            limiter_reduction_db: limiter.max_reduction_db(),
        })
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancellation.is_cancelled() {
            return Err(MasteringError::Cancelled);
        }
        Ok(())
    }

    fn report(&mut self, progress: Progress) {
        if let Some(callback) = self.progress.as_mut() {
            callback(&progress);
        }
    }
}

struct ProcessedStream {
    blocks: u64,
    frames_written: u64,
    peak: f32,
    limiter_reduction_db: f64,
}

/// Wraps limiter output into consecutive blocks for the sink
struct BlockWriter {
    spec: StreamSpec,
    position: u64,
    peak: f32,
}

impl BlockWriter {
    fn new(spec: StreamSpec) -> Self {
        Self {
            spec,
            position: 0,
            peak: 0.0,
        }
    }

    fn write(&mut self, sink: &mut dyn SampleSink, samples: &mut Vec<f32>) -> Result<()> {
        if samples.is_empty() {
            return Ok(());
        }
        let block = AudioBlock::for_stream(std::mem::take(samples), &self.spec, self.position);
        sink.write_block(&block)?;

        self.peak = self.peak.max(block.peak());
        self.position = block.end_frame();
        // Hand the allocation back for the next block
        *samples = block.samples;
        Ok(())
    }
}

fn check_block(block: &AudioBlock, spec: &StreamSpec) -> Result<()> {
    if !block.matches(spec) {
        return Err(MasteringError::invalid_state(format!(
            "block at frame {} ({} ch, {} Hz) does not match stream ({} ch, {} Hz)",
            block.start_frame,
            block.channels,
            block.sample_rate.as_hz(),
            spec.channels,
            spec.sample_rate.as_hz()
        )));
    }
    if block.samples.len() % usize::from(spec.channels) != 0 {
        return Err(MasteringError::invalid_state(format!(
            "block at frame {} has a partial frame",
            block.start_frame
        )));
    }
    Ok(())
}

fn amplitude_to_db(amplitude: f32) -> f64 {
    if amplitude > 0.0 {
        20.0 * f64::from(amplitude).log10()
    } else {
        f64::NEG_INFINITY
    }
}

/// Master an interleaved buffer held in memory
///
/// # Errors
/// Same as [`MasteringPipeline::run`], plus `InvalidState` if `samples` is not a
/// whole number of frames
pub fn master_buffer(
    config: MasteringConfig,
    spec: StreamSpec,
    samples: Vec<f32>,
) -> Result<(Vec<f32>, MasteringReport)> {
    let mut source = BufferSource::new(spec, samples)?;
    let mut sink = BufferSink::new();
    let report = MasteringPipeline::new(config)?.run(&mut source, &mut sink)?;
    Ok((sink.into_samples(), report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::tests::generate_sine;
    use mastering_core::EqSettings;
    use std::sync::{Arc, Mutex};

    fn tone(seconds: f32, amplitude: f32) -> Vec<f32> {
        generate_sine(440.0, 44_100, seconds)
            .iter()
            .map(|s| s * amplitude)
            .collect()
    }

    #[test]
    fn output_length_matches_input() {
        let input = tone(1.3, 0.5);
        let config = MasteringConfig {
            chunk_duration_seconds: 0.25,
            ..MasteringConfig::default()
        };
        let (output, report) =
            master_buffer(config, StreamSpec::stereo(44_100), input.clone()).unwrap();

        assert_eq!(output.len(), input.len());
        assert_eq!(report.processing_blocks, 6);
        assert_eq!(report.measuring_blocks, 0);
        assert!(report.measurement.is_none());
    }

    #[test]
    fn normalizing_runs_two_passes() {
        let config = MasteringConfig {
            target_lufs: Some(-16.0),
            chunk_duration_seconds: 1.0,
            ..MasteringConfig::default()
        };
        let (_, report) = master_buffer(config, StreamSpec::stereo(44_100), tone(3.0, 0.1)).unwrap();

        assert_eq!(report.measuring_blocks, 3);
        assert_eq!(report.processing_blocks, 3);
        let measured = report.measured_lufs().unwrap();
        assert!((report.gain_db - (-16.0 - measured)).abs() < 1e-9);
    }

    #[test]
    fn second_run_is_rejected() {
        let mut pipeline = MasteringPipeline::new(MasteringConfig::default()).unwrap();
        let spec = StreamSpec::stereo(44_100);
        let mut source = BufferSource::new(spec, tone(0.1, 0.5)).unwrap();
        let mut sink = BufferSink::new();
        pipeline.run(&mut source, &mut sink).unwrap();

        source.rewind().unwrap();
        let result = pipeline.run(&mut source, &mut BufferSink::new());
        assert!(matches!(result, Err(MasteringError::InvalidState(_))));
        assert_eq!(pipeline.state(), PipelineState::Done);
    }

    #[test]
    fn invalid_config_rejected_at_construction() {
        let config = MasteringConfig {
            eq: EqSettings::new(30.0, 0.0, 0.0, 0.0),
            ..MasteringConfig::default()
        };
        assert!(matches!(
            MasteringPipeline::new(config),
            Err(MasteringError::Config(_))
        ));
    }

    #[test]
    fn crossover_above_nyquist_fails_run() {
        let config = MasteringConfig {
            multiband: true,
            crossovers_hz: vec![250.0, 6000.0],
            ..MasteringConfig::default()
        };
        let spec = StreamSpec::new(mastering_core::SampleRate::new(8000), 2);
        let mut source = BufferSource::new(spec, vec![0.1; 1600]).unwrap();
        let mut sink = BufferSink::new();
        let mut pipeline = MasteringPipeline::new(config).unwrap();

        assert!(matches!(
            pipeline.run(&mut source, &mut sink),
            Err(MasteringError::Config(_))
        ));
        assert_eq!(pipeline.state(), PipelineState::Failed);
        assert!(sink.is_incomplete());
    }

    #[test]
    fn progress_is_monotonic() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);
        let config = MasteringConfig {
            target_lufs: Some(-14.0),
            chunk_duration_seconds: 0.5,
            ..MasteringConfig::default()
        };
        let mut pipeline = MasteringPipeline::new(config)
            .unwrap()
            .with_progress(move |p| log.lock().unwrap().push(*p));

        let mut source = BufferSource::new(StreamSpec::stereo(44_100), tone(2.0, 0.2)).unwrap();
        pipeline.run(&mut source, &mut BufferSink::new()).unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 8);
        assert!(seen.windows(2).all(|w| w[1].overall > w[0].overall));
        assert_eq!(seen[3].pass, Pass::Measuring);
        assert_eq!(seen[4].pass, Pass::Processing);
        assert_eq!(seen.last().unwrap().overall, 1.0);
    }

    #[test]
    fn pipeline_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<MasteringPipeline>();
    }
}
