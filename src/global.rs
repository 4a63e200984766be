use crate::job;

#[derive(Debug, Default)]
pub struct State {
	pub job_table: job::JobTable,
	pub last_status: i32,
}

impl State {
	pub fn new() -> State {
		State { job_table: job::JobTable::new(), last_status: 0 }
	}
}
