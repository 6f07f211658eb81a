/// Core types for the limitbox launcher
use serde::Serialize;
use thiserror::Error;

/// Validated resource ceilings for one launcher invocation.
///
/// Each field is `None` when that dimension is unlimited. Values are
/// immutable once constructed; build one through
/// [`crate::config::validator::validated_limits`] so downstream enforcement
/// never has to re-check them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Limits {
    /// CPU time ceiling in seconds (RLIMIT_CPU / job user-time limit)
    pub cpu_seconds: Option<u64>,
    /// Address-space ceiling in megabytes (RLIMIT_AS / job process memory)
    pub memory_megabytes: Option<u64>,
    /// Ceiling on concurrently live processes (RLIMIT_NPROC)
    pub max_processes: Option<u64>,
    /// Ceiling on any single file the child writes, in megabytes (RLIMIT_FSIZE)
    pub max_file_megabytes: Option<u64>,
}

impl Limits {
    /// A configuration with every dimension unlimited.
    pub fn unlimited() -> Self {
        Self::default()
    }

    /// True when no ceiling is configured at all.
    pub fn is_unlimited(&self) -> bool {
        self.cpu_seconds.is_none()
            && self.memory_megabytes.is_none()
            && self.max_processes.is_none()
            && self.max_file_megabytes.is_none()
    }

    /// Memory ceiling in bytes, if configured. Saturates rather than
    /// wrapping: an absurdly large ceiling must stay effectively
    /// unlimited, never wrap into a tiny bogus one.
    pub fn memory_bytes(&self) -> Option<u64> {
        self.memory_megabytes.map(|mb| mb.saturating_mul(1024 * 1024))
    }

    /// File-size ceiling in bytes, if configured. Saturating, as above.
    pub fn file_size_bytes(&self) -> Option<u64> {
        self.max_file_megabytes
            .map(|mb| mb.saturating_mul(1024 * 1024))
    }
}

/// Best-effort attribution of a signal-based kill to a configured ceiling.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum LimitHint {
    /// SIGXCPU: the CPU-time ceiling fired
    CpuLimit,
    /// SIGXFSZ: the file-size ceiling fired
    FileSizeLimit,
    /// SIGKILL with a memory ceiling configured; the kernel gives no more
    /// specific signal for an address-space kill, so this stays a heuristic
    PossibleMemoryLimit,
    /// Signal does not correlate with any configured ceiling
    UnknownSignal,
}

/// How the child terminated, produced exactly once per invocation.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum TerminationCause {
    /// Child exited on its own with this code
    Exited { code: i32 },
    /// Child was terminated by a signal
    Signaled { signal: i32, hint: LimitHint },
    /// Child was stopped (traced/suspended) instead of terminating
    Stopped { signal: i32 },
    /// Windows backend: the kernel job object terminated the child; this
    /// backend cannot observe which specific ceiling fired
    JobConstrained,
    /// Wait reported a status the launcher does not recognize
    Unknown,
    /// The spawn itself failed; no child ever ran
    LaunchFailed { reason: String },
}

/// Result of one launcher invocation.
#[derive(Clone, Debug, Serialize)]
pub struct RunOutcome {
    /// Correlation id for this invocation
    pub run_id: String,
    /// Terminal classification of the child
    pub cause: TerminationCause,
    /// Pid of the child, when one was created
    pub pid: Option<u32>,
    /// Wall-clock duration in seconds; `None` when the wait degraded and
    /// the measurement is unknown
    pub wall_time_secs: Option<f64>,
}

impl RunOutcome {
    /// Exit code to hand back to the calling process: the child's own code
    /// on a normal exit, a fixed failure code for everything else. Callers
    /// needing the precise cause read the milestone log, not this code.
    pub fn exit_code(&self) -> i32 {
        match self.cause {
            TerminationCause::Exited { code } => code,
            _ => 1,
        }
    }
}

/// Error taxonomy for the launcher.
#[derive(Error, Debug)]
pub enum SandboxError {
    #[error("invalid {field} limit {value}: must be non-negative")]
    InvalidLimit { field: &'static str, value: i64 },

    #[error("failed to launch child process: {0}")]
    Launch(#[from] std::io::Error),

    #[error("could not apply {ceiling} ceiling: {reason}")]
    Enforcement { ceiling: &'static str, reason: String },

    #[error("wait on child failed: {0}")]
    Wait(String),
}

/// Result type alias for limitbox operations
pub type Result<T> = std::result::Result<T, SandboxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unlimited_limits_have_no_ceilings() {
        let limits = Limits::unlimited();
        assert!(limits.is_unlimited());
        assert_eq!(limits.memory_bytes(), None);
        assert_eq!(limits.file_size_bytes(), None);
    }

    #[test]
    fn megabyte_ceilings_convert_to_bytes() {
        let limits = Limits {
            memory_megabytes: Some(100),
            max_file_megabytes: Some(50),
            ..Limits::default()
        };
        assert_eq!(limits.memory_bytes(), Some(100 * 1024 * 1024));
        assert_eq!(limits.file_size_bytes(), Some(50 * 1024 * 1024));
        assert!(!limits.is_unlimited());
    }

    #[test]
    fn huge_megabyte_ceilings_saturate_instead_of_wrapping() {
        // A wrapped conversion would install a tiny ceiling and look like
        // successful enforcement; saturation keeps it effectively unlimited.
        let limits = Limits {
            memory_megabytes: Some(u64::MAX),
            max_file_megabytes: Some(i64::MAX as u64),
            ..Limits::default()
        };
        assert_eq!(limits.memory_bytes(), Some(u64::MAX));
        assert_eq!(limits.file_size_bytes(), Some(u64::MAX));
    }

    #[test]
    fn exit_code_passes_through_normal_exit_only() {
        let normal = RunOutcome {
            run_id: "test".to_string(),
            cause: TerminationCause::Exited { code: 42 },
            pid: Some(1234),
            wall_time_secs: Some(0.1),
        };
        assert_eq!(normal.exit_code(), 42);

        let killed = RunOutcome {
            cause: TerminationCause::Signaled {
                signal: 9,
                hint: LimitHint::PossibleMemoryLimit,
            },
            ..normal.clone()
        };
        assert_eq!(killed.exit_code(), 1);

        let failed = RunOutcome {
            cause: TerminationCause::LaunchFailed {
                reason: "no such file".to_string(),
            },
            ..normal
        };
        assert_eq!(failed.exit_code(), 1);
    }
}
