//! Mock Python REPL for tool-calling agents.
//!
//! [`PythonRepl`] runs Python source against a namespace that persists across
//! calls and returns whatever the code printed, or the error message if it
//! failed. [`ReplSession`] puts one on a worker thread behind an async handle.
//!
//! Executed code has the full capabilities of the host process. Only feed it
//! trusted input.

mod config;
mod execution;
mod session;
mod utils;

pub use config::Config;
pub use execution::{python::PythonRepl, ExecutionError, ExecutionResult};
pub use session::ReplSession;
pub use utils::sanitize_input;
