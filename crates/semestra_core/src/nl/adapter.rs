//! Output contract of the external language-model adapter.
//!
//! # Responsibility
//! - Define the tool-call shape the planner consumes and the trait concrete
//!   adapters implement.
//!
//! # Invariants
//! - Tool-call contents are untrusted input: every argument value requires
//!   its own validation downstream.
//! - Adapter failures are recoverable: callers degrade them to an empty
//!   tool-call list, never to a crash.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Locale hint passed to the model for Spanish-speaking users.
pub const DEFAULT_LOCALE: &str = "es-AR";

/// One candidate intent extracted from free text by the language model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Tool name, e.g. `create_subject`. Unknown names are reported as
    /// plan errors, not dropped.
    pub name: String,
    /// Raw argument bag; values are untyped until normalization.
    #[serde(default)]
    pub args: Map<String, Value>,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, args: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }
}

/// Failure reported by a language-model adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdapterError {
    /// The model call itself failed (network, quota, timeout).
    CallFailed(String),
    /// The model responded with output the adapter could not interpret.
    InvalidOutput(String),
}

impl Display for AdapterError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CallFailed(message) => write!(f, "language model call failed: {message}"),
            Self::InvalidOutput(message) => {
                write!(f, "language model returned unusable output: {message}")
            }
        }
    }
}

impl Error for AdapterError {}

/// Adapter seam for the deployed language model.
///
/// The core never learns which model is behind this trait; it only consumes
/// the `{name, args}` tool-call list. Implementations must apply their own
/// timeout so a slow upstream degrades instead of hanging the request.
pub trait LlmAdapter {
    fn get_tool_calls(&self, text: &str, locale: &str) -> Result<Vec<ToolCall>, AdapterError>;
}
