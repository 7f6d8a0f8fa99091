//! Mastering effects
//!
//! Stateful stages that make up the pre-limiter chain. All operate on
//! interleaved f32 blocks and carry their state across blocks.
//!
//! Stage order:
//! - **Saturator**: optional full-band tanh saturation
//! - **Equalizer**: bass/mid/presence/treble shelving and peaking bands
//! - **Exciter**: saturated high-pass copy mixed over the dry signal
//! - **StereoWidener**: mid/side width
//! - **MultibandCompressor**: crossover-split dynamics (or one full band)
//!
//! Stages whose settings make them an identity are not inserted.

mod chain;
mod compressor;
mod exciter;
mod filter_bank;
mod saturation;
mod stereo;

pub use chain::{AudioEffect, EffectChain};
pub use compressor::{BandCompressor, EnvelopeState, MultibandCompressor};
pub use exciter::{Exciter, EXCITER_CORNER_HZ};
pub use filter_bank::{
    eq_bands, BandShape, Biquad, BiquadCoefficients, Crossover, EqBand, Equalizer, FilterState,
    BUTTERWORTH_Q,
};
pub use saturation::Saturator;
pub use stereo::{channel_correlation, StereoWidener};

use mastering_core::{MasteringConfig, Result, StreamSpec};

/// Build the pre-limiter chain for one stream
///
/// # Errors
/// Returns `MasteringError::Config` if a stage rejects its settings
pub fn build_chain(config: &MasteringConfig, spec: &StreamSpec) -> Result<EffectChain> {
    let mut chain = EffectChain::new();
    let channels = usize::from(spec.channels);

    if config.saturation > 0.0 {
        chain.add_effect(Box::new(Saturator::new(config.saturation)));
    }
    if !config.eq.is_flat() {
        chain.add_effect(Box::new(Equalizer::new(&config.eq, spec)));
    }
    if config.exciter_drive > 0.0 {
        chain.add_effect(Box::new(Exciter::new(config.exciter_drive, spec)));
    }
    if config.stereo_width != 1.0 && channels == 2 {
        chain.add_effect(Box::new(StereoWidener::new(config.stereo_width, channels)?));
    }
    if config.compression_enabled() {
        chain.add_effect(Box::new(MultibandCompressor::from_config(config, spec)?));
    }

    tracing::debug!(stages = ?chain.names(), "Built effect chain");
    Ok(chain)
}
