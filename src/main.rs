use anyhow::{Context as _, Result};
use clap::Parser;
use mshell::config::{Cli, Config, LOG_ENV};
use mshell::shell::Shell;
use mshell::signal;
use std::fs::File;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn init_tracing(cli: &Cli) -> Result<()> {
	let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
	match cli.log_file {
		Some(ref path) => {
			let file = File::create(path).with_context(|| format!("cannot create log file {}", path.display()))?;
			tracing_subscriber::fmt()
				.with_ansi(false)
				.with_env_filter(filter)
				.with_file(true)
				.with_line_number(true)
				.with_writer(Arc::new(file))
				.init();
		},
		None => {
			tracing_subscriber::fmt()
				.with_env_filter(filter)
				.with_writer(std::io::stderr)
				.init();
		},
	}
	Ok(())
}

fn run(cli: Cli) -> Result<i32> {
	signal::install().context("failed to install signal handlers")?;
	let mut shell = Shell::new(Config::from(&cli));
	match cli.command {
		Some(ref line) => Ok(shell.run_command(line)),
		None => shell.run(),
	}
}

fn main() -> ExitCode {
	let cli = Cli::parse();
	if let Err(err) = init_tracing(&cli) {
		eprintln!("mshell: {:#}", err);
		return ExitCode::FAILURE;
	}
	match run(cli) {
		Ok(code) => ExitCode::from(code as u8),
		Err(err) => {
			eprintln!("mshell: {:#}", err);
			ExitCode::FAILURE
		},
	}
}
