//! CLI entrypoint for the limitbox binary.

use crate::config::validator::validated_limits;
use crate::exec::launcher::Launcher;
use crate::exec::CommandSpec;
use anyhow::{Context, Result};
use clap::Parser;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Execute a command in a sandbox with resource limits",
    long_about = "Execute a command in a sandbox with resource limits.\n\
                  The command runs as a child process with enforced constraints;\n\
                  the exit code is the child's own code on a normal exit and a\n\
                  fixed failure code otherwise."
)]
struct Cli {
    /// Limit CPU time in seconds (0 = unlimited)
    #[arg(long = "cpu", value_name = "SECONDS", default_value_t = 0)]
    cpu_seconds: i64,

    /// Limit memory in megabytes (0 = unlimited)
    #[arg(long = "mem", value_name = "MB", default_value_t = 0)]
    memory_megabytes: i64,

    /// Limit number of processes (0 = unlimited)
    #[arg(long = "procs", value_name = "COUNT", default_value_t = 0)]
    max_processes: i64,

    /// Limit file size in megabytes (0 = unlimited)
    #[arg(long = "fsize", value_name = "MB", default_value_t = 0)]
    max_file_megabytes: i64,

    /// Print the run outcome as JSON after the milestone log
    #[arg(long)]
    report_json: bool,

    /// Command and arguments to execute
    #[arg(
        required = true,
        trailing_var_arg = true,
        allow_hyphen_values = true,
        value_name = "COMMAND"
    )]
    command: Vec<String>,
}

pub fn run() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let limits = validated_limits(
        cli.cpu_seconds,
        cli.memory_megabytes,
        cli.max_processes,
        cli.max_file_megabytes,
    )?;
    let spec = CommandSpec::from_argv(cli.command).context("no command specified")?;

    let mut launcher = Launcher::new();
    let outcome = launcher.run(&spec, &limits);

    if cli.report_json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    }

    std::process::exit(outcome.exit_code());
}
