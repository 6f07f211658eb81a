//! Integration tests for the launcher lifecycle.
//!
//! These use /bin/sh fixtures in place of compiled helpers: a tight loop
//! for the CPU ceiling, an unbounded file writer for the file-size ceiling.
//! Each run gets its own sink and its own scratch directory, so invocations
//! never collide on shared output files.

#![cfg(unix)]

use limitbox::{
    validated_limits, CommandSpec, Launcher, LimitHint, Limits, MemorySink, SandboxError,
    TerminationCause,
};

fn sh(script: &str) -> CommandSpec {
    CommandSpec::new("/bin/sh", vec!["-c".into(), script.into()])
}

fn run_captured(spec: &CommandSpec, limits: &Limits) -> (limitbox::RunOutcome, MemorySink) {
    let mut launcher = Launcher::with_sink(MemorySink::new());
    let outcome = launcher.run(spec, limits);
    (outcome, launcher.into_sink())
}

#[test]
fn normal_exit_passes_the_child_code_through() {
    let (outcome, sink) = run_captured(&sh("exit 7"), &Limits::unlimited());

    assert_eq!(outcome.cause, TerminationCause::Exited { code: 7 });
    assert_eq!(outcome.exit_code(), 7);
    assert!(outcome.pid.is_some());
    assert!(outcome.wall_time_secs.is_some());
    assert!(sink.contains("Process exited normally with status 7"));
}

#[test]
fn milestones_are_emitted_in_lifecycle_order() {
    let (_, sink) = run_captured(&sh("exit 0"), &Limits::unlimited());

    let position = |fragment: &str| {
        sink.lines()
            .iter()
            .position(|l| l.contains(fragment))
            .unwrap_or_else(|| panic!("missing milestone: {fragment}"))
    };
    let summary = position("No resource limits applied");
    let starting = position("Starting command: /bin/sh");
    let spawned = position("Child process created (PID:");
    let terminated = position("Process exited normally");
    let duration = position("Execution time:");
    assert!(summary < starting);
    assert!(starting < spawned);
    assert!(spawned < terminated);
    assert!(terminated < duration);
}

#[test]
fn configured_ceilings_are_summarized() {
    let limits = validated_limits(2, 100, 10, 50).unwrap();
    let (_, sink) = run_captured(&sh("exit 0"), &limits);

    assert!(sink.contains("Active resource limits:"));
    assert!(sink.contains("CPU time: 2 seconds"));
    assert!(sink.contains("Memory: 100 MB"));
    assert!(sink.contains("Processes: 10"));
    assert!(sink.contains("File size: 50 MB"));
}

#[test]
fn nonexistent_executable_is_a_launch_failure() {
    let spec = CommandSpec::new("/nonexistent/sandbox-target", Vec::new());
    let (outcome, sink) = run_captured(&spec, &Limits::unlimited());

    match &outcome.cause {
        TerminationCause::LaunchFailed { .. } => {}
        other => panic!("expected launch failure, got {other:?}"),
    }
    assert_eq!(outcome.pid, None);
    assert_eq!(outcome.wall_time_secs, None);
    assert_ne!(outcome.exit_code(), 0);
    assert!(sink.contains("Failed to launch child process"));
}

#[test]
fn cpu_ceiling_kills_a_tight_loop() {
    let limits = validated_limits(1, 0, 0, 0).unwrap();
    let (outcome, sink) = run_captured(&sh("while :; do :; done"), &limits);

    match outcome.cause {
        TerminationCause::Signaled { signal, hint } => {
            assert_eq!(signal, libc::SIGXCPU);
            assert_eq!(hint, LimitHint::CpuLimit);
        }
        other => panic!("expected a CPU-limit kill, got {other:?}"),
    }
    assert_eq!(outcome.exit_code(), 1);
    // A one-second ceiling should fire within a small bound above it.
    let wall = outcome.wall_time_secs.expect("duration should be measured");
    assert!(wall < 10.0, "CPU kill took too long: {wall}s");
    assert!(sink.contains("RESOURCE LIMIT VIOLATED: CPU time limit exceeded"));
}

#[test]
fn file_size_ceiling_kills_an_unbounded_writer() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("growing.dat");
    let spec = CommandSpec::new(
        "/bin/sh",
        vec![
            "-c".into(),
            r#"while :; do printf '%01000d' 0 >> "$0"; done"#.into(),
            target.to_string_lossy().into_owned(),
        ],
    );
    let limits = validated_limits(0, 0, 0, 1).unwrap();
    let (outcome, sink) = run_captured(&spec, &limits);

    match outcome.cause {
        TerminationCause::Signaled { signal, hint } => {
            assert_eq!(signal, libc::SIGXFSZ);
            assert_eq!(hint, LimitHint::FileSizeLimit);
        }
        other => panic!("expected a file-size kill, got {other:?}"),
    }
    assert!(sink.contains("RESOURCE LIMIT VIOLATED: file size limit exceeded"));
    assert!(sink.contains("File size limit was set to 1 MB"));

    // The writer was stopped at the ceiling, not far past it.
    let written = std::fs::metadata(&target).map(|m| m.len()).unwrap_or(0);
    assert!(written <= 2 * 1024 * 1024, "wrote {written} bytes");
}

#[test]
#[cfg(target_os = "linux")]
fn memory_ceiling_stops_a_runaway_allocator() {
    // A string that doubles thirty times wants roughly a gigabyte, far past
    // the 50 MB address-space ceiling. The shell either dies under SIGKILL
    // or fails the allocation and exits non-zero; what it must never do is
    // reach the final `exit 0`. Linux-only: RLIMIT_AS is degraded elsewhere.
    let limits = validated_limits(0, 50, 0, 0).unwrap();
    let script = r#"s=x; i=0; while [ "$i" -lt 30 ]; do s="$s$s"; i=$((i+1)); done; exit 0"#;
    let (outcome, sink) = run_captured(&sh(script), &limits);

    match outcome.cause {
        TerminationCause::Exited { code } => {
            assert_ne!(code, 0, "allocator ran to completion under the ceiling");
        }
        TerminationCause::Signaled { signal, hint } => {
            assert_eq!(signal, libc::SIGKILL);
            assert_eq!(hint, LimitHint::PossibleMemoryLimit);
        }
        other => panic!("expected a memory-constrained death, got {other:?}"),
    }
    assert!(sink.contains("Memory: 50 MB"));
}

#[test]
fn unconfigured_ceilings_let_the_same_fixture_finish() {
    // The writer that dies under a 1 MB ceiling runs to completion when no
    // ceiling is configured.
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("bounded.dat");
    let script = r#"i=0; while [ "$i" -lt 2048 ]; do printf '%01000d' 0 >> "$0"; i=$((i+1)); done"#;
    let spec = CommandSpec::new(
        "/bin/sh",
        vec![
            "-c".into(),
            script.into(),
            target.to_string_lossy().into_owned(),
        ],
    );
    let (outcome, _) = run_captured(&spec, &Limits::unlimited());

    assert_eq!(outcome.cause, TerminationCause::Exited { code: 0 });
    let written = std::fs::metadata(&target).map(|m| m.len()).unwrap_or(0);
    assert!(written >= 2_000_000, "fixture only wrote {written} bytes");
}

#[test]
fn generous_ceilings_do_not_disturb_a_well_behaved_child() {
    // High ceilings on every dimension: the rlimit calls all succeed and a
    // child staying far below them exits cleanly.
    let limits = validated_limits(60, 4096, 10_000, 100).unwrap();
    let (outcome, sink) = run_captured(&sh("exit 0"), &limits);

    assert_eq!(outcome.cause, TerminationCause::Exited { code: 0 });
    assert_eq!(outcome.exit_code(), 0);
    assert!(!sink.contains("RESOURCE LIMIT VIOLATED"));
}

#[test]
fn negative_limit_is_rejected_before_any_spawn() {
    let err = validated_limits(-2, 0, 0, 0).unwrap_err();
    match err {
        SandboxError::InvalidLimit { field, value } => {
            assert_eq!(field, "cpu");
            assert_eq!(value, -2);
        }
        other => panic!("expected InvalidLimit, got {other:?}"),
    }
}

#[test]
fn concurrent_invocations_do_not_interfere() {
    let first = std::thread::spawn(|| run_captured(&sh("exit 3"), &Limits::unlimited()));
    let second = std::thread::spawn(|| run_captured(&sh("exit 5"), &Limits::unlimited()));

    let (outcome_a, sink_a) = first.join().unwrap();
    let (outcome_b, sink_b) = second.join().unwrap();

    assert_eq!(outcome_a.cause, TerminationCause::Exited { code: 3 });
    assert_eq!(outcome_b.cause, TerminationCause::Exited { code: 5 });
    assert_ne!(outcome_a.run_id, outcome_b.run_id);
    assert!(sink_a.contains("status 3"));
    assert!(sink_b.contains("status 5"));
}

#[test]
fn outcome_serializes_for_downstream_consumers() {
    let (outcome, _) = run_captured(&sh("exit 0"), &Limits::unlimited());
    let json = serde_json::to_string(&outcome).unwrap();
    assert!(json.contains("\"Exited\""));
    assert!(json.contains("\"run_id\""));
}
