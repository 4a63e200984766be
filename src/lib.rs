pub mod builtin;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod eval;
pub mod global;
pub mod job;
pub mod parser;
pub mod shell;
pub mod signal;
pub mod types;

pub use error::{Result, ShellError};
