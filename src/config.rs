use clap::Parser;
use std::path::PathBuf;

pub const DEFAULT_PROMPT: &str = "mshell> ";
pub const LOG_ENV: &str = "MSHELL_LOG";

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
	/// Run one line and exit with its status
	#[arg(short, long)]
	pub command: Option<String>,

	/// Prompt printed before each line
	#[arg(long, default_value = DEFAULT_PROMPT)]
	pub prompt: String,

	/// Write logs to this file instead of stderr
	#[arg(long)]
	pub log_file: Option<PathBuf>,

	/// Do not print the welcome banner
	#[arg(short, long)]
	pub quiet: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
	pub prompt: String,
	pub banner: bool,
}

impl Default for Config {
	fn default() -> Config {
		Config { prompt: DEFAULT_PROMPT.to_string(), banner: true }
	}
}

impl From<&Cli> for Config {
	fn from(cli: &Cli) -> Config {
		Config { prompt: cli.prompt.clone(), banner: !cli.quiet }
	}
}
