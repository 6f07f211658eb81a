//! limitbox: a resource-limited launcher for untrusted child processes
//!
//! One invocation spawns exactly one child under enforced ceilings (CPU time,
//! address space, process count, file size) and reports how it terminated,
//! distinguishing a clean exit from a limit-triggered kill.
//!
//! # Architecture
//!
//! ## Configuration ([`config`])
//! - [`config::types`]: validated limit set, error taxonomy, outcome types
//! - [`config::validator`]: raw caller input to an immutable [`config::types::Limits`]
//!
//! ## Execution Control ([`exec`])
//! - [`exec::launcher`]: spawn/enforce/wait/classify loop for one child
//! - `exec::unix` / `exec::windows`: enforcement backends, selected at
//!   compile time behind one function surface (rlimits between fork and
//!   exec on POSIX, a job object bound before the first instruction on
//!   Windows)
//!
//! ## Verdict ([`verdict`])
//! - [`verdict::classify`]: pure mapping from a raw wait status plus the
//!   configured ceilings to a termination cause and limit hint
//!
//! ## Observability ([`observability`])
//! - [`observability::sink`]: injected milestone log sink; stdout by
//!   default, capturable in tests
//!
//! # Design Principles
//!
//! 1. **Ceilings before untrusted code** - limits are in force before the
//!    target image runs, on every backend
//! 2. **Never fail silently** - an unenforceable ceiling is logged as
//!    degraded, never dropped or mistaken for success
//! 3. **Evidence-backed hints** - a kill is attributed to a ceiling only
//!    when the wait status supports it; a memory kill stays a "possible"

// Configuration & validation
pub mod config;

// Execution control
pub mod exec;

// Termination classification
pub mod verdict;

// Milestone log sink
pub mod observability;

// CLI entrypoint wiring for the limitbox binary.
pub mod cli;

// Re-export commonly used types for convenience
pub use config::types::*;
pub use config::validator::validated_limits;
pub use exec::launcher::Launcher;
pub use exec::CommandSpec;
pub use observability::sink::{EventSink, MemorySink, StdoutSink};
