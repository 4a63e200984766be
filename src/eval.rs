use crate::error::{Result, ShellError};
use crate::job::{self, JobTable};
use crate::parser;
use crate::types::*;

use libc::{STDERR_FILENO, STDIN_FILENO, STDOUT_FILENO};
use nix::errno::Errno;
use nix::fcntl::{self, OFlag};
use nix::sys::signal::{self, SigHandler, Signal};
use nix::sys::stat::Mode;
use nix::unistd::{self, ForkResult, Pid};
use std::convert::Infallible;
use std::ffi::CString;
use std::io::{self, Write};
use std::os::unix::io::RawFd;
use tracing::{debug, warn};

#[derive(Debug, PartialEq, Eq)]
pub enum LaunchResult {
	Noop,
	Foreground(ExitStatus),
	Background { job_id: usize, pid: Pid },
	Pipeline(Vec<ExitStatus>),
}

impl LaunchResult {
	pub fn last_status(&self) -> Option<ExitStatus> {
		match *self {
			LaunchResult::Foreground(status) => Some(status),
			LaunchResult::Pipeline(ref statuses) => statuses.last().cloned(),
			_ => None,
		}
	}
}

fn report(e: &ShellError) {
	eprintln!("mshell: {}", e);
}

// Children write straight to the descriptor so they never touch the
// stdio locks another thread of the parent may have held at fork time.
fn child_report(e: &ShellError) {
	let msg = format!("mshell: {}\n", e);
	let _ = unistd::write(STDERR_FILENO, msg.as_bytes());
}

fn to_cstrings(argv: &[String]) -> Result<Vec<CString>> {
	argv.iter()
		.map(|arg| CString::new(arg.as_bytes()).map_err(|_| ShellError::Exec { program: argv[0].clone(), errno: Errno::EINVAL }))
		.collect()
}

/// Stops at the first target that cannot be opened.
pub fn apply_redirects(command: &Command) -> Result<()> {
	for redirect in &command.redirects {
		let (flags, mode) = match redirect.typ {
			RedirectType::Input => (OFlag::O_RDONLY, Mode::empty()),
			RedirectType::Output => (OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_TRUNC, Mode::from_bits_truncate(0o644)),
		};
		let io_err = |e: nix::Error| ShellError::RedirectionIo { path: redirect.target.clone(), source: e };
		let fd = fcntl::open(redirect.target.as_str(), flags, mode).map_err(io_err)?;
		unistd::dup2(fd, redirect.typ.fd()).map_err(io_err)?;
		unistd::close(fd).map_err(io_err)?;
	}
	match command.missing_target {
		Some(typ) => Err(ShellError::MissingRedirectionTarget { operator: typ.operator() }),
		None => Ok(()),
	}
}

pub fn exec_command(argv: &[CString]) -> Result<Infallible> {
	unistd::execvp(&argv[0], argv).map_err(|errno| ShellError::Exec {
		program: argv[0].to_string_lossy().into_owned(),
		errno: errno,
	})
}

#[derive(Debug, Default, Clone, Copy)]
struct Wiring {
	stdin: Option<RawFd>,
	stdout: Option<RawFd>,
	/// Read end of the stage's own output pipe, which belongs to the next stage.
	unused: Option<RawFd>,
}

fn run_child(command: &Command, argv: &[CString], wiring: Wiring) -> ! {
	// The Rust runtime ignores SIGPIPE, and ignored signals survive exec.
	unsafe {
		let _ = signal::signal(Signal::SIGPIPE, SigHandler::SigDfl);
	}
	if let Some(fd) = wiring.stdin {
		let _ = unistd::dup2(fd, STDIN_FILENO);
		let _ = unistd::close(fd);
	}
	if let Some(fd) = wiring.stdout {
		let _ = unistd::dup2(fd, STDOUT_FILENO);
		let _ = unistd::close(fd);
	}
	if let Some(fd) = wiring.unused {
		let _ = unistd::close(fd);
	}
	// A command whose redirects failed never runs.
	if let Err(e) = apply_redirects(command) {
		child_report(&e);
		unsafe { libc::_exit(1) }
	}
	let code = match exec_command(argv) {
		Ok(never) => match never {},
		Err(e) => {
			child_report(&e);
			e.exit_code()
		},
	};
	unsafe { libc::_exit(code) }
}

fn spawn(command: &Command, argv: &[CString], wiring: Wiring) -> Result<Pid> {
	match unsafe { unistd::fork() }.map_err(ShellError::ProcessCreation)? {
		ForkResult::Parent { child } => {
			debug!("spawned {} as {:?} ({:?})", child, command.argv, wiring);
			Ok(child)
		},
		ForkResult::Child => run_child(command, argv, wiring),
	}
}

/// A trailing `&` forces background mode whatever `background` says.
pub fn launch(jobs: &mut JobTable, mut args: ArgumentVector, background: bool) -> Result<LaunchResult> {
	let background = parser::strip_background(&mut args) || background;
	if args.is_empty() {
		return Ok(LaunchResult::Noop);
	}
	let command_text = args.join(" ");
	let command = parser::parse_redirects(&args);
	if command.argv.is_empty() {
		return Err(ShellError::Usage("redirection without a command"));
	}
	let argv = to_cstrings(&command.argv)?;
	let pid = spawn(&command, &argv, Wiring::default())?;

	if background {
		let job_id = jobs.add(pid, command_text);
		let _ = writeln!(io::stdout(), "[{}] {}", job_id, pid);
		return Ok(LaunchResult::Background { job_id: job_id, pid: pid });
	}
	Ok(LaunchResult::Foreground(job::wait_for_exit(pid)?))
}

struct Reaper {
	pending: Vec<(usize, Pid)>,
	done: Vec<(usize, ExitStatus)>,
}

impl Reaper {
	fn poll(&mut self) {
		let done = &mut self.done;
		self.pending.retain(|&(stage, pid)| match job::poll_exit(pid) {
			Ok(Some(status)) => {
				debug!("stage {} ({}) finished early: {}", stage, pid, status);
				done.push((stage, status));
				false
			},
			Ok(None) => true,
			Err(e) => {
				report(&e);
				false
			},
		});
	}

	fn wait_all(mut self) -> Vec<ExitStatus> {
		for (stage, pid) in self.pending.drain(..) {
			match job::wait_for_exit(pid) {
				Ok(status) => self.done.push((stage, status)),
				Err(e) => report(&e),
			}
		}
		self.done.sort_by_key(|&(stage, _)| stage);
		self.done.into_iter().map(|(_, status)| status).collect()
	}
}

/// An empty stage is reported and skipped, and the stages around it stay
/// connected. Pipelines always run in the foreground.
pub fn launch_pipeline(pipeline: &Pipeline) -> Result<LaunchResult> {
	if pipeline.commands.is_empty() {
		return Ok(LaunchResult::Noop);
	}
	if pipeline.is_background {
		warn!("background pipeline requested");
		eprintln!("mshell: pipelines cannot run in the background, running in the foreground");
	}

	let last = pipeline.commands.len() - 1;
	let mut reaper = Reaper { pending: vec![], done: vec![] };
	let mut prev_read: Option<RawFd> = None;

	for (i, command) in pipeline.commands.iter().enumerate() {
		if command.argv.is_empty() {
			report(&ShellError::EmptyPipelineStage { stage: i });
			continue;
		}
		let argv = match to_cstrings(&command.argv) {
			Ok(argv) => argv,
			Err(e) => {
				report(&e);
				continue;
			},
		};
		let pipe = if i < last {
			match unistd::pipe2(OFlag::O_CLOEXEC) {
				Ok(fds) => Some(fds),
				Err(e) => {
					report(&ShellError::ProcessCreation(e));
					break;
				},
			}
		} else {
			None
		};
		let wiring = Wiring {
			stdin: prev_read,
			stdout: pipe.map(|(_, write)| write),
			unused: pipe.map(|(read, _)| read),
		};
		let spawned = spawn(command, &argv, wiring);

		if let Some(fd) = wiring.stdout {
			let _ = unistd::close(fd);
		}
		if let Some(fd) = prev_read.take() {
			let _ = unistd::close(fd);
		}
		prev_read = wiring.unused;

		match spawned {
			Ok(pid) => reaper.pending.push((i, pid)),
			Err(e) => report(&e),
		}
		reaper.poll();
	}
	// Output of a stage with no live reader after it.
	if let Some(fd) = prev_read {
		let _ = unistd::close(fd);
	}

	Ok(LaunchResult::Pipeline(reaper.wait_all()))
}
