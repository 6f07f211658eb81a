//! Classification of a child's terminal wait status.
//!
//! `classify` is a pure, deterministic function: raw wait evidence plus the
//! ceilings configured for the run map to exactly one [`TerminationCause`].
//! A limit hint is attached only when the signal correlates with a ceiling
//! that was actually configured; the launcher never guesses beyond what the
//! wait status supports.

use crate::config::types::{LimitHint, Limits, TerminationCause};

/// Platform-neutral wait evidence handed over by the enforcement backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RawStatus {
    /// Child exited on its own
    Exited(i32),
    /// Child was terminated by this signal
    Signaled { signal: i32, core_dump: bool },
    /// Child was stopped rather than terminated
    Stopped(i32),
    /// Windows job object terminated the child (sentinel exit code)
    JobConstrained,
    /// Wait returned a status the backend does not recognize
    Unknown,
}

/// Map raw wait evidence to a termination cause.
pub fn classify(status: RawStatus, limits: &Limits) -> TerminationCause {
    match status {
        RawStatus::Exited(code) => TerminationCause::Exited { code },
        RawStatus::Signaled { signal, .. } => TerminationCause::Signaled {
            signal,
            hint: limit_hint(signal, limits),
        },
        RawStatus::Stopped(signal) => TerminationCause::Stopped { signal },
        RawStatus::JobConstrained => TerminationCause::JobConstrained,
        RawStatus::Unknown => TerminationCause::Unknown,
    }
}

/// Attribute a terminating signal to a configured ceiling.
///
/// SIGKILL only *suggests* a memory kill: the kernel sends no dedicated
/// signal for an address-space violation, so the hint stays
/// [`LimitHint::PossibleMemoryLimit`] and only when a memory ceiling was
/// configured for this run.
#[cfg(unix)]
fn limit_hint(signal: i32, limits: &Limits) -> LimitHint {
    match signal {
        s if s == libc::SIGXCPU && limits.cpu_seconds.is_some() => LimitHint::CpuLimit,
        s if s == libc::SIGXFSZ && limits.max_file_megabytes.is_some() => LimitHint::FileSizeLimit,
        s if s == libc::SIGKILL && limits.memory_megabytes.is_some() => {
            LimitHint::PossibleMemoryLimit
        }
        _ => LimitHint::UnknownSignal,
    }
}

#[cfg(not(unix))]
fn limit_hint(_signal: i32, _limits: &Limits) -> LimitHint {
    // The Windows backend never produces RawStatus::Signaled; a job kill
    // surfaces as RawStatus::JobConstrained instead.
    LimitHint::UnknownSignal
}
