//! Windows enforcement backend.
//!
//! A kernel job object carries whichever of the CPU-time and memory
//! ceilings are configured. The child is created suspended, assigned to the
//! job, and only then resumed, so its first instruction already runs under
//! the ceilings. Process-count and file-size ceilings are not attempted on
//! this backend and are logged as unsupported.
//!
//! The job object cannot report which ceiling fired; a kill surfaces
//! through a reserved sentinel exit code and is classified as "terminated
//! under job constraints".

use crate::config::types::{Limits, Result, SandboxError};
use crate::exec::CommandSpec;
use crate::observability::sink::EventSink;
use crate::verdict::RawStatus;
use std::ffi::OsStr;
use std::os::windows::ffi::OsStrExt;
use std::ptr::null;
use windows_sys::Win32::Foundation::{
    CloseHandle, GetLastError, HANDLE, STILL_ACTIVE, WAIT_FAILED,
};
use windows_sys::Win32::System::JobObjects::{
    AssignProcessToJobObject, CreateJobObjectW, JobObjectExtendedLimitInformation,
    SetInformationJobObject, JOBOBJECT_EXTENDED_LIMIT_INFORMATION, JOB_OBJECT_LIMIT_JOB_TIME,
    JOB_OBJECT_LIMIT_PROCESS_MEMORY,
};
use windows_sys::Win32::System::Threading::{
    CreateProcessW, GetExitCodeProcess, ResumeThread, TerminateProcess, WaitForSingleObject,
    CREATE_SUSPENDED, INFINITE, PROCESS_INFORMATION, STARTUPINFOW,
};

/// Exit code the original tool treats as "terminated by the job object".
const JOB_KILL_SENTINEL: u32 = 0xFFFF_FFFF;

/// Job user-time limit is expressed in 100-nanosecond intervals.
const HUNDRED_NS_PER_SEC: i64 = 10_000_000;

/// Exclusive supervision handle for one spawned child.
pub(crate) struct ChildHandle {
    process: HANDLE,
    job: Option<HANDLE>,
    pid: u32,
}

impl ChildHandle {
    pub(crate) fn pid(&self) -> u32 {
        self.pid
    }
}

impl Drop for ChildHandle {
    fn drop(&mut self) {
        unsafe {
            CloseHandle(self.process);
            if let Some(job) = self.job {
                CloseHandle(job);
            }
        }
    }
}

/// Create the child suspended, bind the job object, then resume it.
pub(crate) fn spawn(
    spec: &CommandSpec,
    limits: &Limits,
    sink: &mut dyn EventSink,
) -> Result<ChildHandle> {
    let job = build_job(limits)?;

    let mut cmdline = wide_command_line(spec);
    let mut startup: STARTUPINFOW = unsafe { std::mem::zeroed() };
    startup.cb = std::mem::size_of::<STARTUPINFOW>() as u32;
    let mut info: PROCESS_INFORMATION = unsafe { std::mem::zeroed() };

    let created = unsafe {
        CreateProcessW(
            null(),
            cmdline.as_mut_ptr(),
            null(),
            null(),
            0,
            CREATE_SUSPENDED,
            null(),
            null(),
            &startup,
            &mut info,
        )
    };
    if created == 0 {
        let err = std::io::Error::from_raw_os_error(unsafe { GetLastError() } as i32);
        if let Some(job) = job {
            unsafe { CloseHandle(job) };
        }
        return Err(SandboxError::Launch(err));
    }

    sink.emit(&format!("Child process created (PID: {})", info.dwProcessId));
    if limits.max_processes.is_some() {
        sink.emit("Warning: process ceiling not supported on this platform; continuing without it");
    }
    if limits.max_file_megabytes.is_some() {
        sink.emit(
            "Warning: file-size ceiling not supported on this platform; continuing without it",
        );
    }

    // The child must never run unconstrained: bind the job while the child
    // is still suspended, and kill it if the binding fails.
    if let Some(job) = job {
        let assigned = unsafe { AssignProcessToJobObject(job, info.hProcess) };
        if assigned == 0 {
            let code = unsafe { GetLastError() };
            unsafe {
                TerminateProcess(info.hProcess, 1);
                CloseHandle(info.hThread);
                CloseHandle(info.hProcess);
                CloseHandle(job);
            }
            return Err(SandboxError::Enforcement {
                ceiling: "job object",
                reason: format!("AssignProcessToJobObject failed (error {code})"),
            });
        }
    }

    unsafe {
        ResumeThread(info.hThread);
        CloseHandle(info.hThread);
    }

    Ok(ChildHandle {
        process: info.hProcess,
        job,
        pid: info.dwProcessId,
    })
}

/// Block until the child exits and translate its exit code.
pub(crate) fn wait(handle: ChildHandle) -> Result<RawStatus> {
    let waited = unsafe { WaitForSingleObject(handle.process, INFINITE) };
    if waited == WAIT_FAILED {
        let code = unsafe { GetLastError() };
        return Err(SandboxError::Wait(format!(
            "WaitForSingleObject failed (error {code})"
        )));
    }

    let mut code: u32 = 0;
    let read = unsafe { GetExitCodeProcess(handle.process, &mut code) };
    if read == 0 {
        let err = unsafe { GetLastError() };
        return Err(SandboxError::Wait(format!(
            "GetExitCodeProcess failed (error {err})"
        )));
    }

    Ok(if code == STILL_ACTIVE as u32 {
        // Wait returned but the exit code claims the child still runs.
        log::warn!("child {} reported STILL_ACTIVE after wait", handle.pid);
        RawStatus::Unknown
    } else if code == JOB_KILL_SENTINEL && handle.job.is_some() {
        RawStatus::JobConstrained
    } else {
        RawStatus::Exited(code as i32)
    })
}

/// Build the job object for the subset of ceilings this backend enforces,
/// or `None` when neither applies. A failure here is fatal: without the
/// job the ceilings would be silently absent.
fn build_job(limits: &Limits) -> Result<Option<HANDLE>> {
    if limits.cpu_seconds.is_none() && limits.memory_megabytes.is_none() {
        return Ok(None);
    }

    let job = unsafe { CreateJobObjectW(null(), null()) };
    if job.is_null() {
        let code = unsafe { GetLastError() };
        return Err(SandboxError::Enforcement {
            ceiling: "job object",
            reason: format!("CreateJobObjectW failed (error {code})"),
        });
    }

    let mut info: JOBOBJECT_EXTENDED_LIMIT_INFORMATION = unsafe { std::mem::zeroed() };
    if let Some(secs) = limits.cpu_seconds {
        info.BasicLimitInformation.LimitFlags |= JOB_OBJECT_LIMIT_JOB_TIME;
        // Saturate: an absurd ceiling stays effectively unlimited instead
        // of wrapping into a tiny one.
        info.BasicLimitInformation.PerJobUserTimeLimit = i64::try_from(secs)
            .unwrap_or(i64::MAX)
            .saturating_mul(HUNDRED_NS_PER_SEC);
    }
    if let Some(bytes) = limits.memory_bytes() {
        info.BasicLimitInformation.LimitFlags |= JOB_OBJECT_LIMIT_PROCESS_MEMORY;
        info.ProcessMemoryLimit = usize::try_from(bytes).unwrap_or(usize::MAX);
    }

    let set = unsafe {
        SetInformationJobObject(
            job,
            JobObjectExtendedLimitInformation,
            &info as *const _ as *const _,
            std::mem::size_of::<JOBOBJECT_EXTENDED_LIMIT_INFORMATION>() as u32,
        )
    };
    if set == 0 {
        let code = unsafe { GetLastError() };
        unsafe { CloseHandle(job) };
        return Err(SandboxError::Enforcement {
            ceiling: "job object limits",
            reason: format!("SetInformationJobObject failed (error {code})"),
        });
    }

    Ok(Some(job))
}

/// NUL-terminated UTF-16 command line with each element quoted, the way
/// CreateProcessW expects a single string.
fn wide_command_line(spec: &CommandSpec) -> Vec<u16> {
    let mut line = String::new();
    append_quoted(&mut line, spec.program());
    for arg in spec.args() {
        line.push(' ');
        append_quoted(&mut line, arg);
    }
    OsStr::new(&line)
        .encode_wide()
        .chain(std::iter::once(0))
        .collect()
}

/// Quote one argument per the MSVCRT parsing rules: embedded quotes are
/// backslash-escaped, and backslashes are doubled only where they precede
/// a quote (including the closing one we add).
fn append_quoted(line: &mut String, arg: &str) {
    line.push('"');
    let mut pending_backslashes = 0usize;
    for ch in arg.chars() {
        match ch {
            '\\' => {
                pending_backslashes += 1;
                line.push('\\');
            }
            '"' => {
                // Double the run of backslashes before the quote, then
                // escape the quote itself.
                for _ in 0..pending_backslashes {
                    line.push('\\');
                }
                pending_backslashes = 0;
                line.push_str("\\\"");
            }
            other => {
                pending_backslashes = 0;
                line.push(other);
            }
        }
    }
    // Trailing backslashes would otherwise escape the closing quote.
    for _ in 0..pending_backslashes {
        line.push('\\');
    }
    line.push('"');
}
