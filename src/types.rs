use libc::{STDIN_FILENO, STDOUT_FILENO};
use nix::sys::signal::Signal;
use std::fmt;
use std::os::unix::io::RawFd;

pub type ArgumentVector = Vec<String>;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum RedirectType { Input, Output }

impl RedirectType {
	pub fn operator(self) -> &'static str {
		match self {
			RedirectType::Input => "<",
			RedirectType::Output => ">",
		}
	}

	pub fn fd(self) -> RawFd {
		match self {
			RedirectType::Input => STDIN_FILENO,
			RedirectType::Output => STDOUT_FILENO,
		}
	}
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Redirect {
	pub typ: RedirectType,
	pub target: String,
}

#[derive(Debug, Default, PartialEq, Eq, Clone)]
pub struct Command {
	pub argv: ArgumentVector,
	pub redirects: Vec<Redirect>,
	pub missing_target: Option<RedirectType>,
}

#[derive(Debug, Default, PartialEq, Eq, Clone)]
pub struct Pipeline {
	pub commands: Vec<Command>,
	pub is_background: bool,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ExitStatus {
	Exited(i32),
	Signaled(Signal),
}

impl ExitStatus {
	pub fn code(self) -> i32 {
		match self {
			ExitStatus::Exited(code) => code,
			ExitStatus::Signaled(sig) => 128 + sig as i32,
		}
	}
}

impl fmt::Display for ExitStatus {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match *self {
			ExitStatus::Exited(code) => write!(f, "exit {}", code),
			ExitStatus::Signaled(sig) => write!(f, "killed by {}", sig),
		}
	}
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Flow { Continue, Exit }
