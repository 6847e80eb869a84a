/*
 * weave/mod.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Weaving orchestration.
 */

//! Weaving orchestration.
//!
//! The orchestrator runs a [`WeaveEngine`] on a literate input:
//!
//! 1. Installs the options derived from the resolved output format in the
//!    caller's [`WeaveConfig`], inside a [`WeaveScope`] that restores the
//!    previous configuration when the stage ends, however it ends
//! 2. Runs the engine with a copy of the caller's [`ExecutionEnv`] extended
//!    by a `metadata` variable (unless the caller already defined one)
//! 3. Writes the woven text to `{stem}.knit.md` and registers it
//! 4. Logs each warning the engine collected, then checks that the woven
//!    content is compatible with the conversion target
//!
//! # Engines
//!
//! - [`KnitrEngine`] - executes R chunks through `Rscript`
//! - [`PassthroughEngine`] - executes nothing

pub mod config;
pub mod context;
pub mod error;
pub mod knitr;
pub mod passthrough;
pub mod traits;

use std::path::PathBuf;

use knitdown_system_runtime::SystemRuntime;
use tracing::{debug, warn};

pub use config::{WeaveConfig, WeaveScope};
pub use context::{
    DependencyMetadata, ExecutionEnv, HtmlDependency, RuntimeMode, WeaveOutput, WeaveRequest,
};
pub use error::WeaveError;
pub use knitr::KnitrEngine;
pub use passthrough::PassthroughEngine;
pub use traits::WeaveEngine;

use crate::error::{CompatibilityKind, RenderError, Result};
use crate::format::{OutputFormat, is_html_target};
use crate::intermediates::IntermediateSet;
use crate::metadata::Metadata;
use crate::normalize::NormalizedInput;

/// Name of the variable holding document metadata in the execution env.
pub const METADATA_VARIABLE: &str = "metadata";

/// Knit option carrying the conversion target.
pub const OPT_PANDOC_TO: &str = "rmarkdown.pandoc.to";
/// Knit option telling the engine a markdown sibling is kept.
pub const OPT_KEEP_MD: &str = "rmarkdown.keep_md";
/// Knit option carrying the internal protocol version.
pub const OPT_PROTOCOL_VERSION: &str = "rmarkdown.version";
/// Knit option carrying the resolved runtime mode.
pub const OPT_RUNTIME: &str = "rmarkdown.runtime";

/// Internal protocol version announced to engines.
pub const PROTOCOL_VERSION: u32 = 2;

/// Resolve the runtime mode: explicit values win, `Auto` defers to the
/// front matter `runtime` hint and defaults to static.
pub fn resolve_runtime_mode(requested: RuntimeMode, metadata: &Metadata) -> RuntimeMode {
    match requested {
        RuntimeMode::Auto => metadata
            .runtime
            .as_deref()
            .map(RuntimeMode::from_hint)
            .unwrap_or(RuntimeMode::Static),
        explicit => explicit,
    }
}

/// Check that woven content can be converted to `to`.
///
/// HTML-only content is checked before the runtime mode.
pub fn check_compatibility(
    to: &str,
    dependencies: &DependencyMetadata,
    runtime_mode: RuntimeMode,
) -> Result<()> {
    if is_html_target(to) {
        return Ok(());
    }
    if dependencies.has_html_content() {
        return Err(RenderError::compatibility(
            CompatibilityKind::HtmlContentNonHtmlTarget,
        ));
    }
    if !runtime_mode.is_static() {
        return Err(RenderError::compatibility(
            CompatibilityKind::NonStaticRuntimeNonHtmlTarget,
        ));
    }
    Ok(())
}

/// Options installed for one weaving invocation.
///
/// `files_stem` is the output file's base name; figure and cache paths are
/// relative to the weaving working directory.
pub fn weave_options(
    format: &OutputFormat,
    files_stem: &str,
    runtime_mode: RuntimeMode,
) -> WeaveConfig {
    let mut options = WeaveConfig::new();
    options.set_knit(OPT_PANDOC_TO, format.to.as_str());
    options.set_knit(OPT_KEEP_MD, format.flags.keep_woven);
    options.set_knit(OPT_PROTOCOL_VERSION, PROTOCOL_VERSION);
    options.set_knit(OPT_RUNTIME, runtime_mode.as_str());
    options.set_chunk(
        "fig.path",
        format!("{}_files/figure-{}/", files_stem, format.to),
    );
    options.set_chunk(
        "cache.path",
        format!("{}_cache/{}/", files_stem, format.to),
    );
    options.merge(&format.weave);
    options
}

/// Result of the weaving stage.
#[derive(Debug, Clone)]
pub struct WovenDocument {
    /// The `{stem}.knit.md` file
    pub path: PathBuf,
    /// Woven text
    pub text: String,
    /// Dependencies left for the hooks, warnings removed
    pub dependencies: DependencyMetadata,
    /// Non-fatal warnings surfaced during weaving
    pub warnings: Vec<String>,
}

/// Runs a weaving engine under a scoped configuration.
pub struct WeaveOrchestrator<'a> {
    runtime: &'a dyn SystemRuntime,
    engine: &'a dyn WeaveEngine,
}

impl<'a> WeaveOrchestrator<'a> {
    pub fn new(runtime: &'a dyn SystemRuntime, engine: &'a dyn WeaveEngine) -> Self {
        Self { runtime, engine }
    }

    /// Weave `text` (the content of `input.path`) for `format`.
    ///
    /// Figures and caches are named after `files_stem`, the base name of the
    /// final output file.
    pub fn weave(
        &self,
        config: &mut WeaveConfig,
        input: &NormalizedInput,
        files_stem: &str,
        text: &str,
        format: &OutputFormat,
        metadata: &Metadata,
        env: &ExecutionEnv,
        runtime_mode: RuntimeMode,
        quiet: bool,
        intermediates: &mut IntermediateSet,
    ) -> Result<WovenDocument> {
        let mut warnings = Vec::new();

        let mut env = env.clone();
        if env.contains(METADATA_VARIABLE) {
            let message = format!(
                "The execution environment already defines a variable named '{}'; \
                 document metadata will not be available through it",
                METADATA_VARIABLE
            );
            warn!("{}", message);
            warnings.push(message);
        } else {
            env.set(METADATA_VARIABLE, metadata.to_json()?);
        }

        let output = {
            let mut scope = WeaveScope::enter(config);
            scope.merge(&weave_options(format, files_stem, runtime_mode));
            debug!(
                "weaving {} with {} for {}",
                input.path.display(),
                self.engine.name(),
                format.to
            );

            let request = WeaveRequest {
                runtime: self.runtime,
                input: &input.path,
                text,
                base_dir: &input.base_dir,
                config: &scope,
                env: &env,
                runtime_mode,
                quiet,
            };
            self.engine.weave(&request)?
        };

        let woven_path = input
            .path
            .with_file_name(format!("{}.knit.md", input.output_stem));
        intermediates.write_file(&woven_path, output.markdown.as_bytes())?;

        let mut dependencies = output.dependencies;
        for warning in dependencies.take_warnings() {
            warn!("{}", warning);
            warnings.push(warning);
        }

        check_compatibility(&format.to, &dependencies, runtime_mode)?;

        Ok(WovenDocument {
            path: woven_path,
            text: output.markdown,
            dependencies,
            warnings,
        })
    }
}
