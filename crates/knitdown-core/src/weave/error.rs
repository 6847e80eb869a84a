/*
 * weave/error.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Error types for weaving engines.
 */

//! Error types for weaving engines.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while an engine weaves a document.
#[derive(Debug, Error)]
pub enum WeaveError {
    /// The engine is available but the runtime it drives (R, ...) is not installed.
    #[error("Weaving runtime not found: {engine} requires {runtime}")]
    RuntimeNotFound {
        /// The engine that requires the runtime
        engine: String,
        /// The runtime that was not found
        runtime: String,
    },

    /// The engine cannot run on this system.
    #[error("The {engine} weaving engine is not available on this system")]
    Unavailable {
        /// The unavailable engine
        engine: String,
    },

    /// A required package is not installed.
    #[error("Missing package: {package}")]
    MissingPackage {
        /// The engine that requires the package
        engine: String,
        /// The missing package name
        package: String,
        /// Suggested installation command
        suggestion: Option<String>,
    },

    /// Code execution failed.
    #[error("Weaving failed in {engine}: {message}")]
    ExecutionFailed {
        /// The engine that failed
        engine: String,
        /// Error message from the engine
        message: String,
    },

    /// Code execution failed at specific source lines.
    #[error("Weaving failed in {engine} at lines {start_line}-{end_line}: {message}")]
    ExecutionFailedAtLines {
        /// The engine that failed
        engine: String,
        /// Error message from the engine
        message: String,
        /// Start line (1-indexed)
        start_line: usize,
        /// End line (1-indexed, inclusive)
        end_line: usize,
    },

    /// The engine's response could not be exchanged or understood.
    #[error("Engine protocol error: {message}")]
    Protocol {
        /// Description of what failed
        message: String,
        /// The path involved, if any
        path: Option<PathBuf>,
    },

    /// IO error during weaving.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Engine-specific error with custom message.
    #[error("{0}")]
    Other(String),
}

impl WeaveError {
    /// Create a "runtime not found" error.
    pub fn runtime_not_found(engine: impl Into<String>, runtime: impl Into<String>) -> Self {
        Self::RuntimeNotFound {
            engine: engine.into(),
            runtime: runtime.into(),
        }
    }

    /// Create an "engine unavailable" error.
    pub fn unavailable(engine: impl Into<String>) -> Self {
        Self::Unavailable {
            engine: engine.into(),
        }
    }

    /// Create an "execution failed" error.
    pub fn execution_failed(engine: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ExecutionFailed {
            engine: engine.into(),
            message: message.into(),
        }
    }

    /// Create an "execution failed at lines" error.
    pub fn execution_failed_at_lines(
        engine: impl Into<String>,
        message: impl Into<String>,
        start_line: usize,
        end_line: usize,
    ) -> Self {
        Self::ExecutionFailedAtLines {
            engine: engine.into(),
            message: message.into(),
            start_line,
            end_line,
        }
    }

    /// Create a "missing package" error.
    pub fn missing_package(
        engine: impl Into<String>,
        package: impl Into<String>,
        suggestion: Option<String>,
    ) -> Self {
        Self::MissingPackage {
            engine: engine.into(),
            package: package.into(),
            suggestion,
        }
    }

    /// Create a protocol error.
    pub fn protocol(message: impl Into<String>, path: Option<PathBuf>) -> Self {
        Self::Protocol {
            message: message.into(),
            path,
        }
    }

    /// Create an "other" error with a custom message.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}
