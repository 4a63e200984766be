use crate::error::{Result, ShellError};
use crate::types::ExitStatus;
use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::sys::wait::{self, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;
use tracing::{debug, info};

pub(crate) trait WaitStatusExt {
	fn exit_status(self) -> Option<ExitStatus>;
}

impl WaitStatusExt for WaitStatus {
	fn exit_status(self) -> Option<ExitStatus> {
		match self {
			WaitStatus::Exited(_, code) => Some(ExitStatus::Exited(code)),
			WaitStatus::Signaled(_, sig, _) => Some(ExitStatus::Signaled(sig)),
			_ => None,
		}
	}
}

/// Blocks until `pid` exits or is killed. Stop reports do not end the wait.
pub fn wait_for_exit(pid: Pid) -> Result<ExitStatus> {
	loop {
		match wait::waitpid(pid, Some(WaitPidFlag::WUNTRACED)) {
			Ok(status) => {
				if let Some(exit) = status.exit_status() {
					debug!("process {} finished: {}", pid, exit);
					return Ok(exit);
				}
				debug!("process {} reported {:?}, still waiting", pid, status);
			},
			Err(Errno::EINTR) => continue,
			Err(e) => return Err(ShellError::Wait { pid: pid.as_raw(), source: e }),
		}
	}
}

pub fn poll_exit(pid: Pid) -> Result<Option<ExitStatus>> {
	match wait::waitpid(pid, Some(WaitPidFlag::WNOHANG)) {
		Ok(status) => Ok(status.exit_status()),
		Err(Errno::EINTR) => Ok(None),
		Err(e) => Err(ShellError::Wait { pid: pid.as_raw(), source: e }),
	}
}

pub fn send_continue(pid: Pid) -> Result<()> {
	debug!("sending SIGCONT to {}", pid);
	signal::kill(pid, Signal::SIGCONT).map_err(|e| ShellError::Signal { pid: pid.as_raw(), source: e })
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct JobRecord {
	pub job_id: usize,
	pub pid: Pid,
	pub command_text: String,
	pub is_stopped: bool,
}

impl JobRecord {
	pub fn state(&self) -> &'static str {
		if self.is_stopped { "Stopped" } else { "Running" }
	}
}

/// Job ids start at 1 and are never handed out twice.
#[derive(Debug)]
pub struct JobTable {
	jobs: Vec<JobRecord>,
	next_id: usize,
}

impl JobTable {
	pub fn new() -> JobTable {
		JobTable { jobs: vec![], next_id: 1 }
	}

	pub fn add(&mut self, pid: Pid, command_text: String) -> usize {
		if let Some(stale) = self.remove(pid) {
			debug!("replacing stale job [{}] for pid {}", stale.job_id, pid);
		}
		let job_id = self.next_id;
		self.next_id += 1;
		info!("job [{}] pid {}: {}", job_id, pid, command_text);
		self.jobs.push(JobRecord { job_id: job_id, pid: pid, command_text: command_text, is_stopped: false });
		job_id
	}

	pub fn find(&self, job_id: usize) -> Result<&JobRecord> {
		self.jobs.iter().find(|job| job.job_id == job_id).ok_or(ShellError::NoSuchJob(job_id))
	}

	pub fn remove(&mut self, pid: Pid) -> Option<JobRecord> {
		let idx = self.jobs.iter().position(|job| job.pid == pid)?;
		let job = self.jobs.remove(idx);
		debug!("removed job [{}] pid {}", job.job_id, pid);
		Some(job)
	}

	/// Most recently added first.
	pub fn list(&self) -> impl Iterator<Item = &JobRecord> {
		self.jobs.iter().rev()
	}

	pub fn set_stopped(&mut self, job_id: usize, is_stopped: bool) -> Result<()> {
		let job = self.jobs.iter_mut().find(|job| job.job_id == job_id).ok_or(ShellError::NoSuchJob(job_id))?;
		job.is_stopped = is_stopped;
		Ok(())
	}

	pub fn len(&self) -> usize {
		self.jobs.len()
	}

	pub fn is_empty(&self) -> bool {
		self.jobs.is_empty()
	}

	/// Only exits are observed. A stopped job stays in the table.
	pub fn reap_finished(&mut self) -> Vec<(JobRecord, ExitStatus)> {
		let mut finished = vec![];
		let pids: Vec<Pid> = self.jobs.iter().map(|job| job.pid).collect();
		for pid in pids {
			let status = match poll_exit(pid) {
				Ok(Some(status)) => status,
				Ok(None) => continue,
				// Already reaped elsewhere; nothing left to track.
				Err(ShellError::Wait { source: Errno::ECHILD, .. }) => ExitStatus::Exited(0),
				Err(e) => {
					debug!("{}", e);
					continue;
				},
			};
			if let Some(job) = self.remove(pid) {
				finished.push((job, status));
			}
		}
		finished
	}
}

impl Default for JobTable {
	fn default() -> JobTable {
		JobTable::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::process;

	fn init() {
		let _ = tracing_subscriber::fmt::try_init();
	}

	fn pid(n: i32) -> Pid {
		Pid::from_raw(n)
	}

	#[test]
	fn ids_increase_and_are_never_reused() {
		init();
		let mut table = JobTable::new();
		let a = table.add(pid(100), "sleep 5".into());
		let b = table.add(pid(101), "sleep 6".into());
		assert_eq!((a, b), (1, 2));
		table.remove(pid(101));
		table.remove(pid(100));
		assert!(table.is_empty());
		let c = table.add(pid(102), "sleep 7".into());
		assert_eq!(c, 3);
	}

	#[test]
	fn list_is_most_recent_first() {
		let mut table = JobTable::new();
		table.add(pid(10), "a".into());
		table.add(pid(11), "b".into());
		table.add(pid(12), "c".into());
		let ids: Vec<usize> = table.list().map(|job| job.job_id).collect();
		assert_eq!(ids, vec![3, 2, 1]);
	}

	#[test]
	fn one_record_per_pid() {
		let mut table = JobTable::new();
		table.add(pid(10), "old".into());
		let id = table.add(pid(10), "new".into());
		assert_eq!(table.len(), 1);
		assert_eq!(table.find(id).unwrap().command_text, "new");
		assert!(matches!(table.find(1), Err(ShellError::NoSuchJob(1))));
	}

	#[test]
	fn set_stopped_on_known_and_unknown_jobs() {
		let mut table = JobTable::new();
		let id = table.add(pid(10), "a".into());
		table.set_stopped(id, true).unwrap();
		assert_eq!(table.find(id).unwrap().state(), "Stopped");
		table.set_stopped(id, false).unwrap();
		assert!(!table.find(id).unwrap().is_stopped);
		assert!(matches!(table.set_stopped(9, true), Err(ShellError::NoSuchJob(9))));
	}

	#[test]
	fn wait_for_exit_reports_code() {
		init();
		let child = process::Command::new("sh").args(["-c", "exit 3"]).spawn().unwrap();
		let status = wait_for_exit(Pid::from_raw(child.id() as i32)).unwrap();
		assert_eq!(status, ExitStatus::Exited(3));
	}

	#[test]
	fn reap_finished_removes_only_exited_jobs() {
		init();
		let done = process::Command::new("true").spawn().unwrap();
		let mut running = process::Command::new("sleep").arg("5").spawn().unwrap();
		let done_pid = Pid::from_raw(done.id() as i32);
		let running_pid = Pid::from_raw(running.id() as i32);

		let mut table = JobTable::new();
		table.add(done_pid, "true".into());
		table.add(running_pid, "sleep 5".into());

		let mut finished = vec![];
		for _ in 0 .. 50 {
			finished.extend(table.reap_finished());
			if !finished.is_empty() { break; }
			std::thread::sleep(std::time::Duration::from_millis(20));
		}
		assert_eq!(finished.len(), 1);
		assert_eq!(finished[0].0.pid, done_pid);
		assert_eq!(finished[0].1, ExitStatus::Exited(0));
		assert_eq!(table.len(), 1);
		assert!(table.find(2).is_ok());

		running.kill().unwrap();
		running.wait().unwrap();
	}

	#[test]
	fn stop_reports_are_not_recorded() {
		init();
		let mut child = process::Command::new("sleep").arg("5").spawn().unwrap();
		let child_pid = Pid::from_raw(child.id() as i32);
		let mut table = JobTable::new();
		let id = table.add(child_pid, "sleep 5".into());

		signal::kill(child_pid, Signal::SIGSTOP).unwrap();
		assert!(table.reap_finished().is_empty());
		// Nothing watches for stops: the record still says running.
		assert!(!table.find(id).unwrap().is_stopped);

		send_continue(child_pid).unwrap();
		child.kill().unwrap();
		child.wait().unwrap();
	}
}
