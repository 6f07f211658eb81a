//! Injected milestone sink.
//!
//! The launcher reports each lifecycle milestone (limits applied, child
//! spawned, termination cause, duration) through an [`EventSink`] supplied
//! by the caller. Tools that consume the launcher parse the line content,
//! not its formatting; the stdout sink adds a timestamp prefix and flushes
//! eagerly so an observer tailing the log sees milestones promptly even if
//! the child later crashes.

use std::io::Write;

/// Destination for launcher milestone lines, in invocation order.
pub trait EventSink {
    /// Record one milestone line.
    fn emit(&mut self, line: &str);
}

/// Default sink: timestamped lines on standard output, flushed per line.
#[derive(Debug, Default)]
pub struct StdoutSink;

impl StdoutSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for StdoutSink {
    fn emit(&mut self, line: &str) {
        let stamp = chrono::Local::now().format("%H:%M:%S");
        let mut stdout = std::io::stdout().lock();
        // Best-effort: a closed stdout must not abort the supervised run.
        let _ = writeln!(stdout, "[sandbox {stamp}] {line}");
        let _ = stdout.flush();
    }
}

/// Capturing sink for tests: stores raw lines so assertions can check
/// content and ordering deterministically.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Vec<String>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All lines emitted so far, oldest first.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// True when some emitted line contains the given fragment.
    pub fn contains(&self, fragment: &str) -> bool {
        self.lines.iter().any(|l| l.contains(fragment))
    }
}

impl EventSink for MemorySink {
    fn emit(&mut self, line: &str) {
        self.lines.push(line.to_string());
    }
}

impl<S: EventSink + ?Sized> EventSink for &mut S {
    fn emit(&mut self, line: &str) {
        (**self).emit(line);
    }
}
