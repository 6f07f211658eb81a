//! The spawn/enforce/wait/classify loop.
//!
//! One `Launcher::run` call owns exactly one child for its whole lifetime:
//! no other component may wait on or signal it. The launcher keeps no state
//! across invocations, so concurrent runs are safe as long as each uses its
//! own launcher instance and the children do not collide on external
//! resources (a shared output file, say) - that sharing is the caller's
//! responsibility.
//!
//! The calling thread blocks on the child's termination. There is no
//! internal timeout and no cancellation: a child with no ceilings that
//! never exits blocks forever, and a caller wanting a hard wall-clock bound
//! configures the CPU ceiling or wraps the call itself.

use crate::config::types::{LimitHint, Limits, RunOutcome, SandboxError, TerminationCause};
use crate::exec::{backend, CommandSpec};
use crate::observability::sink::{EventSink, StdoutSink};
use crate::verdict::{classify, RawStatus};
use std::time::Instant;
use uuid::Uuid;

/// Resource-limited process launcher.
///
/// Generic over the milestone sink so tests can capture the log
/// deterministically; defaults to timestamped stdout.
pub struct Launcher<S: EventSink = StdoutSink> {
    sink: S,
}

impl Launcher<StdoutSink> {
    pub fn new() -> Self {
        Self {
            sink: StdoutSink::new(),
        }
    }
}

impl Default for Launcher<StdoutSink> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: EventSink> Launcher<S> {
    pub fn with_sink(sink: S) -> Self {
        Self { sink }
    }

    /// Recover the sink, for inspecting captured lines after a run.
    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Run `command` under `limits` and classify how the child terminated.
    ///
    /// Enforcement is in force before the target image runs; the call
    /// blocks until the child is gone. Every fatal and degraded condition
    /// along the way lands in the milestone log - "ceiling not enforced"
    /// is always observable, never silent.
    pub fn run(&mut self, command: &CommandSpec, limits: &Limits) -> RunOutcome {
        let run_id = Uuid::new_v4().to_string();
        log::debug!("run {run_id}: {} under {limits:?}", command.display());

        self.emit_limit_summary(limits);
        self.sink
            .emit(&format!("Starting command: {}", command.display()));

        let start = Instant::now();
        let handle = match backend::spawn(command, limits, &mut self.sink) {
            Ok(handle) => handle,
            Err(err) => return self.launch_failed(run_id, err),
        };
        let pid = handle.pid();

        let raw = match backend::wait(handle) {
            Ok(raw) => raw,
            Err(err) => {
                // The supervising call itself errored; classification and
                // duration degrade to unknown but the report still returns.
                log::warn!("run {run_id}: wait degraded: {err}");
                self.sink.emit(&format!("Wait on child failed: {err}"));
                self.sink.emit("Execution time unavailable");
                return RunOutcome {
                    run_id,
                    cause: TerminationCause::LaunchFailed {
                        reason: err.to_string(),
                    },
                    pid: Some(pid),
                    wall_time_secs: None,
                };
            }
        };
        let wall = start.elapsed().as_secs_f64();

        let cause = classify(raw, limits);
        self.emit_termination(&cause, raw, limits);
        self.sink
            .emit(&format!("Execution time: {wall:.3} seconds"));

        RunOutcome {
            run_id,
            cause,
            pid: Some(pid),
            wall_time_secs: Some(wall),
        }
    }

    fn launch_failed(&mut self, run_id: String, err: SandboxError) -> RunOutcome {
        let line = match &err {
            SandboxError::Enforcement { .. } => format!("Fatal: {err}"),
            _ => format!("Failed to launch child process: {err}"),
        };
        self.sink.emit(&line);
        RunOutcome {
            run_id,
            cause: TerminationCause::LaunchFailed {
                reason: err.to_string(),
            },
            pid: None,
            wall_time_secs: None,
        }
    }

    fn emit_limit_summary(&mut self, limits: &Limits) {
        if limits.is_unlimited() {
            self.sink.emit("No resource limits applied (unlimited)");
            return;
        }
        self.sink.emit("Active resource limits:");
        if let Some(secs) = limits.cpu_seconds {
            self.sink.emit(&format!("  CPU time: {secs} seconds"));
        }
        if let Some(mb) = limits.memory_megabytes {
            self.sink.emit(&format!("  Memory: {mb} MB"));
        }
        if let Some(count) = limits.max_processes {
            self.sink.emit(&format!("  Processes: {count}"));
        }
        if let Some(mb) = limits.max_file_megabytes {
            self.sink.emit(&format!("  File size: {mb} MB"));
        }
    }

    fn emit_termination(&mut self, cause: &TerminationCause, raw: RawStatus, limits: &Limits) {
        match cause {
            TerminationCause::Exited { code } => {
                self.sink
                    .emit(&format!("Process exited normally with status {code}"));
            }
            TerminationCause::Signaled { signal, hint } => {
                self.sink
                    .emit(&format!("Process terminated by signal {signal}"));
                self.emit_limit_violation(*hint, limits);
                if let RawStatus::Signaled {
                    core_dump: true, ..
                } = raw
                {
                    self.sink.emit("Core dump was created");
                }
            }
            TerminationCause::Stopped { signal } => {
                self.sink
                    .emit(&format!("Process stopped by signal {signal}"));
            }
            TerminationCause::JobConstrained => {
                self.sink.emit("Process terminated by job object limits");
            }
            TerminationCause::Unknown => {
                self.sink.emit("Process ended with unknown status");
            }
            TerminationCause::LaunchFailed { .. } => {
                // Handled before a wait ever happens.
            }
        }
    }

    fn emit_limit_violation(&mut self, hint: LimitHint, limits: &Limits) {
        match hint {
            LimitHint::CpuLimit => {
                self.sink
                    .emit("RESOURCE LIMIT VIOLATED: CPU time limit exceeded");
                if let Some(secs) = limits.cpu_seconds {
                    self.sink.emit(&format!(
                        "The process used more CPU time than the allowed {secs} seconds"
                    ));
                }
            }
            LimitHint::FileSizeLimit => {
                self.sink
                    .emit("RESOURCE LIMIT VIOLATED: file size limit exceeded");
                if let Some(mb) = limits.max_file_megabytes {
                    self.sink
                        .emit(&format!("File size limit was set to {mb} MB"));
                }
            }
            LimitHint::PossibleMemoryLimit => {
                self.sink
                    .emit("Process was killed (possibly by the memory limit)");
                if let Some(mb) = limits.memory_megabytes {
                    self.sink.emit(&format!("Memory limit was set to {mb} MB"));
                }
            }
            LimitHint::UnknownSignal => {}
        }
    }
}
