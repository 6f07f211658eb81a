//! Execution control: one spawn/enforce/wait/classify lifecycle per call.
//!
//! The enforcement backend is chosen once at compile time; the launcher
//! depends only on the backend's function surface (`spawn`, `wait`,
//! `ChildHandle`), never on platform types, so adding a third backend does
//! not touch the supervise/classify loop.

use serde::Serialize;

pub mod launcher;

#[cfg(unix)]
pub(crate) mod unix;
#[cfg(unix)]
pub(crate) use unix as backend;

#[cfg(windows)]
pub(crate) mod windows;
#[cfg(windows)]
pub(crate) use windows as backend;

/// The executable path and argument vector for one invocation.
///
/// Owned by the caller and borrowed, never mutated, by the launcher. The
/// path is not validated up front; a missing executable surfaces naturally
/// from the spawn step.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CommandSpec {
    program: String,
    args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Split a raw argument vector into program and arguments.
    /// Returns `None` for an empty vector.
    pub fn from_argv(mut argv: Vec<String>) -> Option<Self> {
        if argv.is_empty() {
            return None;
        }
        let program = argv.remove(0);
        Some(Self {
            program,
            args: argv,
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// One-line rendering for the milestone log.
    pub fn display(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argv_splits_into_program_and_args() {
        let spec =
            CommandSpec::from_argv(vec!["/bin/echo".into(), "hello".into(), "world".into()])
                .unwrap();
        assert_eq!(spec.program(), "/bin/echo");
        assert_eq!(spec.args(), ["hello", "world"]);
        assert_eq!(spec.display(), "/bin/echo hello world");
    }

    #[test]
    fn empty_argv_is_rejected() {
        assert_eq!(CommandSpec::from_argv(Vec::new()), None);
    }
}
