//! Termination classification.

pub mod verdict;

pub use verdict::{classify, RawStatus};
