use nix::errno::Errno;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShellError {
	#[error("expected filename after '{operator}'")]
	MissingRedirectionTarget { operator: &'static str },

	#[error("{path}: {source}")]
	RedirectionIo {
		path: String,
		#[source]
		source: nix::Error,
	},

	#[error("cannot create process: {0}")]
	ProcessCreation(#[source] nix::Error),

	#[error("empty command in pipeline stage {stage}")]
	EmptyPipelineStage { stage: usize },

	#[error("no such job: %{0}")]
	NoSuchJob(usize),

	#[error("usage: {0}")]
	Usage(&'static str),

	#[error("{program}: {}", .errno.desc())]
	Exec { program: String, errno: Errno },

	#[error("cannot signal process {pid}: {source}")]
	Signal {
		pid: i32,
		#[source]
		source: nix::Error,
	},

	#[error("wait failed for process {pid}: {source}")]
	Wait {
		pid: i32,
		#[source]
		source: nix::Error,
	},

	#[error("{0}")]
	Builtin(String),

	#[error("I/O error: {0}")]
	Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, ShellError>;

impl ShellError {
	/// Exit code a child uses when it cannot replace its image.
	pub fn exit_code(&self) -> i32 {
		match *self {
			ShellError::Exec { errno: Errno::ENOENT, .. } => 127,
			_ => 126,
		}
	}
}
