/*
 * hooks/mod.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Pre- and post-processing hooks attached to output formats.
 */

//! Format hooks.
//!
//! An [`OutputFormat`](crate::format::OutputFormat) may carry a
//! [`PreProcessor`], run after weaving and before conversion, and a
//! [`PostProcessor`], run after conversion. Both are trait objects stored on
//! the resolved format; the coordinator calls them through these traits only.
//!
//! Hooks may write files (registering them as intermediates when they are not
//! outputs) but never touch the weaving configuration.

mod html;
mod markdown;

use std::path::{Path, PathBuf};

use knitdown_system_runtime::SystemRuntime;

pub use html::HtmlDependencyPreProcessor;
pub use markdown::PreserveYamlPostProcessor;

use crate::error::Result;
use crate::intermediates::IntermediateSet;
use crate::metadata::Metadata;
use crate::weave::{DependencyMetadata, RuntimeMode};

/// Inputs available to a pre-processor.
pub struct PreProcessContext<'a> {
    pub runtime: &'a dyn SystemRuntime,
    pub metadata: &'a Metadata,
    /// The woven (or normalized) text the converter will read
    pub woven_path: &'a Path,
    pub runtime_mode: RuntimeMode,
    pub dependencies: &'a DependencyMetadata,
    /// The `{stem}_files` directory next to the output
    pub files_dir: &'a Path,
    /// Directory the output is written to
    pub output_dir: &'a Path,
}

/// Inputs available to a post-processor.
pub struct PostProcessContext<'a> {
    pub runtime: &'a dyn SystemRuntime,
    pub metadata: &'a Metadata,
    pub woven_path: &'a Path,
    /// The file the converter produced
    pub output_path: &'a Path,
    /// Whether intermediates are cleaned up after the render
    pub clean: bool,
    pub quiet: bool,
}

/// Hook contributing converter arguments before conversion.
pub trait PreProcessor: Send + Sync {
    /// Name used in log messages.
    fn name(&self) -> &str;

    /// Return extra converter arguments, appended after the format's own.
    fn pre_process(
        &self,
        ctx: &PreProcessContext<'_>,
        intermediates: &mut IntermediateSet,
    ) -> Result<Vec<String>>;
}

/// Hook rewriting the converted output.
pub trait PostProcessor: Send + Sync {
    /// Name used in log messages.
    fn name(&self) -> &str;

    /// Return the final output path, which may differ from
    /// [`PostProcessContext::output_path`].
    fn post_process(&self, ctx: &PostProcessContext<'_>) -> Result<PathBuf>;
}
