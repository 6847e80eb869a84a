/*
 * weave/traits.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * WeaveEngine trait definition.
 */

//! WeaveEngine trait for executing code in literate documents.

use super::context::{WeaveOutput, WeaveRequest};
use super::error::WeaveError;

/// Engine that executes the code chunks of a literate document.
///
/// Weaving is text-in/text-out: the engine receives the document text and
/// returns markdown with chunk results substituted inline, along with any
/// [`DependencyMetadata`](super::DependencyMetadata) the executed code
/// produced. Engines write figures and caches relative to
/// [`WeaveRequest::base_dir`], using the paths in the request's config.
///
/// # Example
///
/// ```ignore
/// use knitdown_core::weave::{WeaveEngine, WeaveOutput, WeaveRequest, WeaveError};
///
/// struct UppercaseEngine;
///
/// impl WeaveEngine for UppercaseEngine {
///     fn name(&self) -> &str {
///         "uppercase"
///     }
///
///     fn weave(&self, request: &WeaveRequest<'_>) -> Result<WeaveOutput, WeaveError> {
///         Ok(WeaveOutput::passthrough(request.text.to_uppercase()))
///     }
/// }
/// ```
pub trait WeaveEngine: Send + Sync {
    /// Name used in log messages and diagnostics.
    fn name(&self) -> &str;

    /// Weave the document described by `request`.
    fn weave(&self, request: &WeaveRequest<'_>) -> Result<WeaveOutput, WeaveError>;

    /// Whether the runtime this engine drives is installed.
    ///
    /// Default: `true`
    fn is_available(&self) -> bool {
        true
    }
}
