use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

static PROMPT_PENDING: AtomicBool = AtomicBool::new(false);
static STOP_NOTICE_PENDING: AtomicBool = AtomicBool::new(false);

extern "C" fn handle_sigint(_: libc::c_int) {
	PROMPT_PENDING.store(true, Ordering::SeqCst);
}

extern "C" fn handle_sigtstp(_: libc::c_int) {
	STOP_NOTICE_PENDING.store(true, Ordering::SeqCst);
}

// SA_RESTART is left off so a blocking read returns EINTR.
pub fn install() -> nix::Result<()> {
	let int_action = SigAction::new(SigHandler::Handler(handle_sigint), SaFlags::empty(), SigSet::empty());
	let tstp_action = SigAction::new(SigHandler::Handler(handle_sigtstp), SaFlags::empty(), SigSet::empty());
	unsafe {
		sigaction(Signal::SIGINT, &int_action)?;
		sigaction(Signal::SIGTSTP, &tstp_action)?;
	}
	debug!("installed SIGINT and SIGTSTP handlers");
	Ok(())
}

#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
pub struct Pending {
	pub reprompt: bool,
	pub stop_notice: bool,
}

impl Pending {
	pub fn any(self) -> bool {
		self.reprompt || self.stop_notice
	}
}

pub fn take_pending() -> Pending {
	Pending {
		reprompt: PROMPT_PENDING.swap(false, Ordering::SeqCst),
		stop_notice: STOP_NOTICE_PENDING.swap(false, Ordering::SeqCst),
	}
}

// The flags are process-wide. Tests that raise signals hold this.
#[cfg(test)]
pub(crate) static FLAGS_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
