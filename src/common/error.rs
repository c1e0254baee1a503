//! Error types for the expect-test harness
//!
//! Every variant here is a harness-level failure and maps to exit code 1.
//! A test program that exits nonzero on its own is not an error; see
//! [`crate::harness::RunOutcome::ChildFailed`].

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the harness
#[derive(Error, Debug)]
pub enum Error {
    // === Build Errors ===
    #[error("Failed to build: {}", .errors.join("\n"))]
    Build { errors: Vec<String> },

    // === Marker Protocol Errors ===
    #[error("Marker protocol error at output line {line}: {message} (near: {context:?})")]
    Protocol {
        line: usize,
        message: String,
        context: String,
    },

    // === Patch Errors ===
    #[error("No call expression found at {}:{line}:{column}", .file.display())]
    PatchTargetNotFound {
        file: PathBuf,
        line: usize,
        column: usize,
    },

    // === External Tool Errors ===
    #[error("Tool '{0}' not found in PATH")]
    ToolNotFound(String),

    #[error("Tool '{tool}' failed: {message}")]
    ToolFailed { tool: String, message: String },

    #[error("Test program timed out after {0} seconds")]
    Timeout(u64),

    #[error("Failed to remove temporary file '{}': {error}", .path.display())]
    Cleanup { path: PathBuf, error: io::Error },

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    #[error("Failed to write file '{path}': {error}")]
    FileWrite { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Internal Errors ===
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a protocol error carrying the offending output line
    pub fn protocol(line: usize, message: &str, context: &str) -> Self {
        Self::Protocol {
            line,
            message: message.to_string(),
            context: context.to_string(),
        }
    }

    /// Create a tool failure error
    pub fn tool_failed(tool: &str, message: impl Into<String>) -> Self {
        Self::ToolFailed {
            tool: tool.to_string(),
            message: message.into(),
        }
    }

    /// Create a file read error
    pub fn file_read(path: &std::path::Path, error: &io::Error) -> Self {
        Self::FileRead {
            path: path.display().to_string(),
            error: error.to_string(),
        }
    }

    /// Create a file write error
    pub fn file_write(path: &std::path::Path, error: &io::Error) -> Self {
        Self::FileWrite {
            path: path.display().to_string(),
            error: error.to_string(),
        }
    }

    /// Process exit code for this failure
    pub fn exit_code(&self) -> i32 {
        1
    }
}
