//! Test utilities for mastering tests
//!
//! Signal generators and simple level analysis shared by unit tests,
//! integration tests and benchmarks.

pub mod analysis;
pub mod signals;

pub use analysis::*;
pub use signals::*;
