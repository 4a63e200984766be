use crate::config::Config;
use crate::dispatch;
use crate::global;
use crate::signal::{self, Pending};
use crate::types::Flow;

use anyhow::{Context as _, Result};
use libc::STDIN_FILENO;
use nix::errno::Errno;
use nix::unistd;
use std::io::{self, Write};
use std::os::unix::io::RawFd;
use tracing::{debug, info};

const BANNER: &str = "Welcome to mshell! Type 'exit' to quit.";
const STOP_NOTICE: &str = "mshell: stop signal ignored, the shell keeps running";

#[derive(Debug, PartialEq, Eq)]
pub enum ReadEvent {
	Line(String),
	Interrupted(Pending),
	Eof,
}

/// Reads lines straight from a descriptor so that an interrupted read
/// comes back to the loop instead of being retried.
#[derive(Debug)]
pub struct LineReader {
	fd: RawFd,
	buf: Vec<u8>,
}

impl LineReader {
	pub fn new(fd: RawFd) -> LineReader {
		LineReader { fd: fd, buf: vec![] }
	}

	fn take_line(&mut self, end: usize) -> String {
		let rest = self.buf.split_off(end);
		let mut line = std::mem::replace(&mut self.buf, rest);
		if line.last() == Some(&b'\n') {
			line.pop();
		}
		String::from_utf8_lossy(&line).into_owned()
	}

	/// Next line without its newline. Text after the last newline is
	/// returned as a line at end of input.
	pub fn read_line(&mut self) -> io::Result<ReadEvent> {
		let mut chunk = [0u8; 1024];
		loop {
			if let Some(pos) = self.buf.iter().position(|&c| c == b'\n') {
				return Ok(ReadEvent::Line(self.take_line(pos + 1)));
			}
			match unistd::read(self.fd, &mut chunk) {
				Ok(0) => {
					if self.buf.is_empty() {
						return Ok(ReadEvent::Eof);
					}
					let end = self.buf.len();
					return Ok(ReadEvent::Line(self.take_line(end)));
				},
				Ok(n) => self.buf.extend_from_slice(&chunk[.. n]),
				Err(Errno::EINTR) => {
					let pending = signal::take_pending();
					if pending.any() {
						self.buf.clear();
						return Ok(ReadEvent::Interrupted(pending));
					}
				},
				Err(e) => return Err(e.into()),
			}
		}
	}

	/// Like `read_line`, but a signal that landed before the read is
	/// reported first.
	pub fn next_event(&mut self) -> io::Result<ReadEvent> {
		let pending = signal::take_pending();
		if pending.any() {
			return Ok(ReadEvent::Interrupted(pending));
		}
		self.read_line()
	}
}

pub struct Shell {
	config: Config,
	state: global::State,
	reader: LineReader,
}

impl Shell {
	pub fn new(config: Config) -> Shell {
		Shell { config: config, state: global::State::new(), reader: LineReader::new(STDIN_FILENO) }
	}

	pub fn state(&self) -> &global::State {
		&self.state
	}

	pub fn run_line(&mut self, line: &str) -> Flow {
		match dispatch::eval_line(&mut self.state, line) {
			Ok(flow) => flow,
			Err(e) => {
				eprintln!("mshell: {}", e);
				Flow::Continue
			},
		}
	}

	fn report_finished_jobs(&mut self) {
		for (job, status) in self.state.job_table.reap_finished() {
			debug!("job [{}] done: {}", job.job_id, status);
			let _ = writeln!(io::stdout(), "[{}] Done {}", job.job_id, job.command_text);
		}
	}

	fn show_notices(&self, pending: Pending) -> io::Result<()> {
		let mut stdout = io::stdout();
		if pending.stop_notice {
			writeln!(stdout)?;
			writeln!(stdout, "{}", STOP_NOTICE)?;
		} else if pending.reprompt {
			writeln!(stdout)?;
		}
		Ok(())
	}

	fn prompt(&self) -> io::Result<()> {
		let mut stdout = io::stdout();
		stdout.write_all(self.config.prompt.as_bytes())?;
		stdout.flush()
	}

	pub fn run(&mut self) -> Result<i32> {
		if self.config.banner {
			let _ = writeln!(io::stdout(), "{}", BANNER);
		}
		loop {
			self.report_finished_jobs();
			self.prompt().context("failed to write prompt")?;
			let line = match self.reader.next_event().context("failed to read input")? {
				ReadEvent::Line(line) => line,
				ReadEvent::Interrupted(pending) => {
					self.show_notices(pending)?;
					continue;
				},
				ReadEvent::Eof => {
					let _ = writeln!(io::stdout());
					info!("end of input");
					return Ok(0);
				},
			};
			let flow = self.run_line(&line);
			// Signals that arrived while a command ran were meant for it.
			let _ = signal::take_pending();
			if flow == Flow::Exit {
				let _ = writeln!(io::stdout(), "byebye!");
				return Ok(0);
			}
		}
	}

	pub fn run_command(&mut self, line: &str) -> i32 {
		if self.run_line(line) == Flow::Exit {
			return 0;
		}
		self.report_finished_jobs();
		self.state.last_status
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use nix::sys::signal::{raise, Signal};

	fn reader_over(input: &[u8]) -> LineReader {
		let (read, write) = unistd::pipe().unwrap();
		unistd::write(write, input).unwrap();
		unistd::close(write).unwrap();
		LineReader::new(read)
	}

	#[test]
	fn reads_lines_without_newlines() {
		let mut reader = reader_over(b"echo hi\n\nls -l\npartial");
		assert_eq!(reader.read_line().unwrap(), ReadEvent::Line("echo hi".into()));
		assert_eq!(reader.read_line().unwrap(), ReadEvent::Line("".into()));
		assert_eq!(reader.read_line().unwrap(), ReadEvent::Line("ls -l".into()));
		assert_eq!(reader.read_line().unwrap(), ReadEvent::Line("partial".into()));
		assert_eq!(reader.read_line().unwrap(), ReadEvent::Eof);
	}

	#[test]
	fn signal_before_the_read_is_not_lost() {
		let _guard = signal::FLAGS_LOCK.lock().unwrap_or_else(|e| e.into_inner());
		signal::install().unwrap();
		let _ = signal::take_pending();
		let mut reader = reader_over(b"echo hi\n");

		raise(Signal::SIGINT).unwrap();
		assert_eq!(reader.next_event().unwrap(), ReadEvent::Interrupted(Pending { reprompt: true, stop_notice: false }));
		assert_eq!(reader.next_event().unwrap(), ReadEvent::Line("echo hi".into()));

		raise(Signal::SIGTSTP).unwrap();
		assert_eq!(reader.next_event().unwrap(), ReadEvent::Interrupted(Pending { reprompt: false, stop_notice: true }));
		assert_eq!(reader.next_event().unwrap(), ReadEvent::Eof);
	}

	#[test]
	fn run_command_returns_last_status() {
		let mut shell = Shell::new(Config::default());
		assert_eq!(shell.run_command("false"), 1);
		assert_eq!(shell.run_command("true"), 0);
		assert_eq!(shell.run_command("fg %3"), 0);
		assert_eq!(shell.run_command("exit"), 0);
		assert!(shell.state().job_table.is_empty());
	}

	#[test]
	fn errors_do_not_end_the_session() {
		let mut shell = Shell::new(Config::default());
		assert_eq!(shell.run_line("bg nope"), Flow::Continue);
		assert_eq!(shell.run_line("true <"), Flow::Continue);
		assert_eq!(shell.run_line("ls | | true"), Flow::Continue);
	}
}
