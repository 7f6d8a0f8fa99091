//! Effect chain for the pre-limiter part of the mastering chain
//!
//! Stages run in insertion order over interleaved f32 blocks. Each stage owns
//! the state it needs to continue seamlessly into the next block.

/// A stateful processing stage
///
/// Implementers are bound to one stream (rate and channel count are fixed at
/// construction) and must only ever see consecutive blocks of that stream.
pub trait AudioEffect: Send {
    /// Process interleaved samples in place
    fn process(&mut self, buffer: &mut [f32]);

    /// Return to the freshly constructed state (start of stream)
    fn reset(&mut self);

    /// Stage name (for logging)
    fn name(&self) -> &str;
}

/// Chain of stages processed in order
pub struct EffectChain {
    effects: Vec<Box<dyn AudioEffect>>,
}

impl EffectChain {
    /// Create a new empty chain
    pub fn new() -> Self {
        Self {
            effects: Vec::new(),
        }
    }

    /// Add a stage to the end of the chain
    pub fn add_effect(&mut self, effect: Box<dyn AudioEffect>) {
        self.effects.push(effect);
    }

    /// Run a block through every stage
    pub fn process(&mut self, buffer: &mut [f32]) {
        for effect in &mut self.effects {
            effect.process(buffer);
        }
    }

    /// Reset every stage
    pub fn reset(&mut self) {
        for effect in &mut self.effects {
            effect.reset();
        }
    }

    /// Get number of stages in the chain
    pub fn len(&self) -> usize {
        self.effects.len()
    }

    /// Check if the chain is empty (an identity)
    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    /// Stage names in processing order
    pub fn names(&self) -> Vec<&str> {
        self.effects.iter().map(|e| e.name()).collect()
    }
}

impl Default for EffectChain {
    fn default() -> Self {
        Self::new()
    }
}
