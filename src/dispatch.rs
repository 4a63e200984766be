use crate::builtin::{self, Builtin};
use crate::error::Result;
use crate::eval::{self, LaunchResult};
use crate::global;
use crate::parser;
use crate::types::{ArgumentVector, Flow};

pub enum Route {
	Empty,
	Builtin(Builtin),
	External,
}

pub fn route(args: &[String]) -> Route {
	match args.first() {
		None => Route::Empty,
		Some(name) => match builtin::match_builtin(name) {
			Some(f) => Route::Builtin(f),
			None => Route::External,
		},
	}
}

fn record(state: &mut global::State, result: &LaunchResult) {
	if let Some(status) = result.last_status() {
		state.last_status = status.code();
	}
}

pub fn dispatch(state: &mut global::State, args: ArgumentVector) -> Result<Flow> {
	match route(&args) {
		Route::Empty => Ok(Flow::Continue),
		Route::Builtin(f) => f(state, &args),
		Route::External => {
			let result = eval::launch(&mut state.job_table, args, false)?;
			record(state, &result);
			Ok(Flow::Continue)
		},
	}
}

/// Runs one input line. Lines containing `|` go through the pipeline path,
/// which never runs built-ins.
pub fn eval_line(state: &mut global::State, line: &str) -> Result<Flow> {
	if parser::is_pipeline(line) {
		let result = eval::launch_pipeline(&parser::parse_pipeline(line))?;
		record(state, &result);
		return Ok(Flow::Continue);
	}
	dispatch(state, parser::tokenize(line))
}
