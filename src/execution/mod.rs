//! Execution engine: result and error types.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

mod capture;
mod convert;
pub mod python;

/// Failure raised by executed code. `Display` is the bare message, the same
/// text Python's `str(e)` gives.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExecutionError {
    #[error("{message}")]
    Syntax { message: String, line: u32, col: u32 },
    #[error("{message}")]
    Runtime { message: String, traceback: String },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    /// Everything printed before the call finished or failed.
    pub output: String,
    pub errors: Vec<String>,
    /// `repr` of each user-visible binding after the call.
    pub variables: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ExecutionError>,
}

impl ExecutionResult {
    /// Collapse into the single string `run` reports: the output on success,
    /// the error message otherwise.
    pub fn into_text(self) -> String {
        match self.error {
            Some(err) => err.to_string(),
            None => self.output,
        }
    }
}
