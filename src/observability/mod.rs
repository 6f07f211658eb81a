//! Milestone log sink for the launcher lifecycle.

pub mod sink;

pub use sink::{EventSink, MemorySink, StdoutSink};
