use crate::error::{Result, ShellError};
use crate::global;
use crate::job::{self, JobRecord};
use crate::types::Flow;

use std::env;
use std::io::{self, Write};
use tracing::debug;

pub type Builtin = fn(&mut global::State, &[String]) -> Result<Flow>;

const FG_USAGE: &str = "fg %<job>";
const BG_USAGE: &str = "bg %<job>";

pub fn builtin_cd(_: &mut global::State, args: &[String]) -> Result<Flow> {
	let dir = match args.get(1) {
		Some(dir) => dir.clone(),
		None => env::var("HOME").map_err(|_| ShellError::Builtin("expected argument to \"cd\"".to_string()))?,
	};
	env::set_current_dir(&dir).map_err(|e| ShellError::Builtin(format!("cd: {}: {}", dir, e)))?;
	Ok(Flow::Continue)
}

pub fn builtin_help(_: &mut global::State, _: &[String]) -> Result<Flow> {
	let mut out = io::stdout().lock();
	writeln!(out, "mshell: a small command interpreter")?;
	writeln!(out, "built-in commands:")?;
	writeln!(out, " cd [dir]   change directory")?;
	writeln!(out, " help       show this help message")?;
	writeln!(out, " exit       exit the shell")?;
	writeln!(out, " jobs       list background jobs")?;
	writeln!(out, " fg %N      continue job N and wait for it")?;
	writeln!(out, " bg %N      continue job N in the background")?;
	writeln!(out, "other commands are executed as system programs")?;
	Ok(Flow::Continue)
}

pub fn builtin_exit(_: &mut global::State, _: &[String]) -> Result<Flow> {
	Ok(Flow::Exit)
}

pub fn format_job(job: &JobRecord) -> String {
	format!("[{}] {} {} {}", job.job_id, job.pid, job.state(), job.command_text)
}

pub fn builtin_jobs(state: &mut global::State, _: &[String]) -> Result<Flow> {
	let mut out = io::stdout().lock();
	for job in state.job_table.list() {
		writeln!(out, "{}", format_job(job))?;
	}
	Ok(Flow::Continue)
}

pub fn parse_job_spec(args: &[String], usage: &'static str) -> Result<usize> {
	match args {
		[_, spec] => spec.strip_prefix('%')
			.and_then(|n| n.parse::<usize>().ok())
			.filter(|&n| n > 0)
			.ok_or(ShellError::Usage(usage)),
		_ => Err(ShellError::Usage(usage)),
	}
}

pub fn builtin_fg(state: &mut global::State, args: &[String]) -> Result<Flow> {
	let job_id = parse_job_spec(args, FG_USAGE)?;
	let job = state.job_table.find(job_id)?.clone();
	let _ = writeln!(io::stdout(), "{}", job.command_text);
	job::send_continue(job.pid)?;
	let waited = job::wait_for_exit(job.pid);
	state.job_table.remove(job.pid);
	let status = waited?;
	debug!("fg job [{}] finished: {}", job_id, status);
	state.last_status = status.code();
	Ok(Flow::Continue)
}

pub fn builtin_bg(state: &mut global::State, args: &[String]) -> Result<Flow> {
	let job_id = parse_job_spec(args, BG_USAGE)?;
	let pid = state.job_table.find(job_id)?.pid;
	job::send_continue(pid)?;
	state.job_table.set_stopped(job_id, false)?;
	Ok(Flow::Continue)
}

pub const BUILTINS: [(&str, Builtin); 6] = [
	("cd", builtin_cd),
	("help", builtin_help),
	("exit", builtin_exit),
	("jobs", builtin_jobs),
	("fg", builtin_fg),
	("bg", builtin_bg),
];

pub fn match_builtin(name: &str) -> Option<Builtin> {
	BUILTINS.iter().find(|&&(n, _)| n == name).map(|&(_, f)| f)
}
