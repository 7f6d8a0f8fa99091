/// Progress reporting and cancellation
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Which pass a progress update belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    /// Loudness measurement
    Measuring,
    /// Processing and writing
    Processing,
}

impl std::fmt::Display for Pass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Measuring => f.write_str("measuring"),
            Self::Processing => f.write_str("processing"),
        }
    }
}

/// Progress snapshot, sent at least once per chunk
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    /// Current pass
    pub pass: Pass,
    /// Blocks finished in this pass
    pub blocks_done: u64,
    /// Blocks in this pass, when the source length is known
    pub total_blocks: Option<u64>,
    /// Completion of this pass (0.0-1.0); 0 while the length is unknown
    pub fraction: f64,
    /// Completion across all passes of the run (0.0-1.0)
    pub overall: f64,
}

impl Progress {
    pub(crate) fn new(pass: Pass, blocks_done: u64, total_blocks: Option<u64>, passes: u32) -> Self {
        let fraction = match total_blocks {
            Some(0) => 1.0,
            Some(total) => (blocks_done as f64 / total as f64).min(1.0),
            None => 0.0,
        };
        let overall = match (pass, passes) {
            (Pass::Measuring, 2) => fraction / 2.0,
            (Pass::Processing, 2) => 0.5 + fraction / 2.0,
            _ => fraction,
        };
        Self {
            pass,
            blocks_done,
            total_blocks,
            fraction,
            overall,
        }
    }
}

/// Observer invoked with every progress update
pub type ProgressCallback = Box<dyn FnMut(&Progress) + Send>;

/// Cooperative cancellation flag, checked at chunk boundaries
///
/// Clones share one flag, so a Ctrl-C handler can hold one copy while the
/// pipeline holds another.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create an un-cancelled token
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
