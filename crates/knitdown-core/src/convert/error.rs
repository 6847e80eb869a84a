/*
 * convert/error.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Error types for format conversion.
 */

use knitdown_system_runtime::RuntimeError;
use thiserror::Error;

/// Errors raised by a [`Converter`](super::Converter).
#[derive(Error, Debug)]
pub enum ConversionError {
    /// The converter binary could not be located.
    #[error("Converter not found: {hint}")]
    NotFound { hint: String },

    /// The converter exited with a non-zero status.
    #[error("{converter} exited with status {status}\n{diagnostics}")]
    Failed {
        converter: String,
        status: i32,
        /// Diagnostics the converter wrote to stderr, verbatim
        diagnostics: String,
    },

    /// `--version` output could not be understood.
    #[error("Could not determine {converter} version from: {output}")]
    UnknownVersion { converter: String, output: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Runtime(#[from] RuntimeError),
}

impl ConversionError {
    pub fn not_found(hint: impl Into<String>) -> Self {
        Self::NotFound { hint: hint.into() }
    }

    pub fn failed(converter: impl Into<String>, status: i32, diagnostics: impl Into<String>) -> Self {
        Self::Failed {
            converter: converter.into(),
            status,
            diagnostics: diagnostics.into(),
        }
    }

    /// The converter's diagnostics, when it ran and failed.
    pub fn diagnostics(&self) -> Option<&str> {
        match self {
            Self::Failed { diagnostics, .. } => Some(diagnostics),
            _ => None,
        }
    }
}
