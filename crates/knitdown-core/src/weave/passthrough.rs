/*
 * weave/passthrough.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Engine that returns its input unchanged.
 */

//! Passthrough engine (no code execution).

use super::context::{WeaveOutput, WeaveRequest};
use super::error::WeaveError;
use super::traits::WeaveEngine;

/// Engine that leaves code chunks unexecuted and returns the input text.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughEngine;

impl PassthroughEngine {
    pub fn new() -> Self {
        Self
    }
}

impl WeaveEngine for PassthroughEngine {
    fn name(&self) -> &str {
        "passthrough"
    }

    fn weave(&self, request: &WeaveRequest<'_>) -> Result<WeaveOutput, WeaveError> {
        Ok(WeaveOutput::passthrough(request.text))
    }
}
