//! POSIX enforcement backend.
//!
//! Ceilings are applied in the child between fork and exec through a
//! `pre_exec` hook, so the target image never runs a single instruction
//! unconstrained. Per-ceiling policy:
//!
//! - CPU time and file size: load-bearing on every supported platform; a
//!   failed `setrlimit` aborts the child before exec.
//! - Address space: degrades to a stderr warning and the run continues,
//!   because at least one supported kernel (macOS) does not reliably honor
//!   `RLIMIT_AS`.
//! - Process count: fatal where `RLIMIT_NPROC` exists (failure there means
//!   a real problem, not platform degradation), a warning where it does not.
//!
//! The pre_exec hook runs after fork; only the errno of a fatal failure
//! crosses back to the parent through the exec pipe, so the child writes a
//! stderr line naming the ceiling before it dies.

use crate::config::types::{Limits, Result, SandboxError};
use crate::exec::CommandSpec;
use crate::observability::sink::EventSink;
use crate::verdict::RawStatus;
use nix::errno::Errno;
use nix::sys::resource::{setrlimit, Resource};
use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::Pid;
use std::io::Write;
use std::os::unix::process::CommandExt;
use std::process::{Child, Command};

#[cfg(any(
    target_os = "linux",
    target_os = "android",
    target_os = "macos",
    target_os = "freebsd"
))]
const NPROC_SUPPORTED: bool = true;
#[cfg(not(any(
    target_os = "linux",
    target_os = "android",
    target_os = "macos",
    target_os = "freebsd"
)))]
const NPROC_SUPPORTED: bool = false;

/// Exclusive supervision handle for one spawned child.
pub(crate) struct ChildHandle {
    child: Child,
}

impl ChildHandle {
    pub(crate) fn pid(&self) -> u32 {
        self.child.id()
    }
}

/// Fork the child with ceilings armed in its pre-exec hook, then exec the
/// target. Stdio is inherited from the caller.
pub(crate) fn spawn(
    spec: &CommandSpec,
    limits: &Limits,
    sink: &mut dyn EventSink,
) -> Result<ChildHandle> {
    let mut cmd = Command::new(spec.program());
    cmd.args(spec.args());

    let limits = *limits;
    unsafe {
        cmd.pre_exec(move || apply_ceilings(&limits));
    }

    let child = cmd.spawn().map_err(SandboxError::Launch)?;
    sink.emit(&format!("Child process created (PID: {})", child.id()));
    emit_degradation_notes(&limits, sink);
    Ok(ChildHandle { child })
}

/// Ceilings this backend knows it cannot enforce, reported up front so the
/// log never implies a limit is in force when it is not.
fn emit_degradation_notes(limits: &Limits, sink: &mut dyn EventSink) {
    if cfg!(target_os = "macos") && limits.memory_megabytes.is_some() {
        sink.emit("Warning: memory ceiling has limited enforcement on this platform");
    }
    if !NPROC_SUPPORTED && limits.max_processes.is_some() {
        sink.emit("Warning: process ceiling not supported on this platform; continuing without it");
    }
}

/// Block until the child terminates and capture the raw wait status.
///
/// Reaps through `waitpid` directly instead of `Child::wait` so stop
/// statuses stay observable and signal numbers come through untranslated.
pub(crate) fn wait(handle: ChildHandle) -> Result<RawStatus> {
    let pid = Pid::from_raw(handle.child.id() as i32);
    let status = waitpid(pid, None).map_err(|e| SandboxError::Wait(e.to_string()))?;
    Ok(match status {
        WaitStatus::Exited(_, code) => RawStatus::Exited(code),
        WaitStatus::Signaled(_, signal, core_dump) => RawStatus::Signaled {
            signal: signal as i32,
            core_dump,
        },
        WaitStatus::Stopped(_, signal) => RawStatus::Stopped(signal as i32),
        other => {
            log::warn!("unrecognized wait status for pid {pid}: {other:?}");
            RawStatus::Unknown
        }
    })
}

/// Runs in the child after fork, before exec.
fn apply_ceilings(limits: &Limits) -> std::io::Result<()> {
    if let Some(secs) = limits.cpu_seconds {
        setrlimit(Resource::RLIMIT_CPU, secs, secs)
            .map_err(|e| fatal_ceiling("RLIMIT_CPU", e))?;
    }

    if let Some(bytes) = limits.memory_bytes() {
        if let Err(e) = setrlimit(Resource::RLIMIT_AS, bytes, bytes) {
            degraded_ceiling("RLIMIT_AS", e);
        }
    }

    if let Some(count) = limits.max_processes {
        apply_process_ceiling(count)?;
    }

    if let Some(bytes) = limits.file_size_bytes() {
        setrlimit(Resource::RLIMIT_FSIZE, bytes, bytes)
            .map_err(|e| fatal_ceiling("RLIMIT_FSIZE", e))?;
    }

    Ok(())
}

#[cfg(any(
    target_os = "linux",
    target_os = "android",
    target_os = "macos",
    target_os = "freebsd"
))]
fn apply_process_ceiling(count: u64) -> std::io::Result<()> {
    setrlimit(Resource::RLIMIT_NPROC, count, count)
        .map_err(|e| fatal_ceiling("RLIMIT_NPROC", e))?;
    Ok(())
}

/// No process-count primitive here: warn and continue unconfined.
#[cfg(not(any(
    target_os = "linux",
    target_os = "android",
    target_os = "macos",
    target_os = "freebsd"
)))]
fn apply_process_ceiling(_count: u64) -> std::io::Result<()> {
    degraded_ceiling("RLIMIT_NPROC", Errno::ENOSYS);
    Ok(())
}

/// A load-bearing ceiling could not be applied: name it on stderr, then
/// hand the errno back so the child dies before the target image loads.
fn fatal_ceiling(name: &str, errno: Errno) -> std::io::Error {
    let _ = writeln!(
        std::io::stderr(),
        "[sandbox] fatal: could not apply {name}: {errno}"
    );
    std::io::Error::from_raw_os_error(errno as i32)
}

/// A ceiling this platform cannot honor: warn and run unconfined for that
/// dimension. Never silent, never fatal.
fn degraded_ceiling(name: &str, errno: Errno) {
    let _ = writeln!(
        std::io::stderr(),
        "[sandbox] warning: {name} not enforced ({errno}); continuing without it"
    );
}
