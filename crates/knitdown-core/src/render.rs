/*
 * render.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Render coordination.
 */

//! Render coordination.
//!
//! The [`Renderer`] drives one render pass per requested output format:
//!
//! ```text
//! Start -> Normalize -> Resolve -> Weave? -> PreProcess? -> Convert
//!       -> PostProcess? -> EmitAuxiliaryText? -> Cleanup -> Done
//! ```
//!
//! Any failure jumps to `Cleanup` and ends in `Failed`. Each pass owns its
//! own [`IntermediateSet`], so intermediates are deleted (when `clean` is set)
//! whether the pass succeeds or not.
//!
//! Several formats are rendered by running passes one after another, in
//! request order; the first failure stops the loop.

use std::fmt;
use std::path::{Path, PathBuf};

use knitdown_system_runtime::SystemRuntime;
use serde_json::Value;
use tracing::{debug, info};

use crate::convert::{ConversionRequest, Converter, IdentityConverter};
use crate::error::{RenderError, Result};
use crate::format::{DEFAULT_FORMAT, FormatRegistry, IDENTITY_TARGET, OutputFormat};
use crate::hooks::{PostProcessContext, PreProcessContext};
use crate::intermediates::IntermediateSet;
use crate::metadata::{Metadata, partition_front_matter};
use crate::normalize::{
    InputKind, InputNormalizer, NormalizedInput, SessionFacts, absolutize, decode_text,
};
use crate::resolve::{citeproc_required, resolve_format};
use crate::spin::{RoxygenSpinner, ScriptSpinner};
use crate::weave::{
    DependencyMetadata, ExecutionEnv, RuntimeMode, WeaveConfig, WeaveEngine, WeaveError,
    WeaveOrchestrator, resolve_runtime_mode,
};

/// Which output format(s) a render produces.
#[derive(Debug, Clone, Default)]
pub enum FormatRequest {
    /// The first format declared in the front matter, else `html_document`
    #[default]
    Default,
    /// A built-in format by name
    Named(String),
    /// A caller-built format, used as is
    Concrete(OutputFormat),
    /// Several built-in formats, rendered in order
    List(Vec<String>),
    /// Every format declared in the front matter
    All,
}

/// Parameters of one render call. Never modified by the renderer.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub input: PathBuf,
    pub format: FormatRequest,
    /// Output file name; ignored when several formats are rendered
    pub output_file: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    /// Format options layered over the front matter options
    pub output_options: Value,
    pub intermediates_dir: Option<PathBuf>,
    pub runtime_mode: RuntimeMode,
    /// Delete intermediates when the pass ends
    pub clean: bool,
    pub env: ExecutionEnv,
    pub quiet: bool,
    pub encoding: String,
}

impl RenderRequest {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            format: FormatRequest::Default,
            output_file: None,
            output_dir: None,
            output_options: Value::Null,
            intermediates_dir: None,
            runtime_mode: RuntimeMode::Auto,
            clean: true,
            env: ExecutionEnv::new(),
            quiet: false,
            encoding: "UTF-8".to_string(),
        }
    }

    pub fn with_format(mut self, format: FormatRequest) -> Self {
        self.format = format;
        self
    }

    pub fn with_output_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_file = Some(path.into());
        self
    }

    pub fn with_output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(path.into());
        self
    }

    pub fn with_output_options(mut self, options: Value) -> Self {
        self.output_options = options;
        self
    }

    pub fn with_runtime_mode(mut self, mode: RuntimeMode) -> Self {
        self.runtime_mode = mode;
        self
    }

    pub fn with_clean(mut self, clean: bool) -> Self {
        self.clean = clean;
        self
    }

    pub fn with_env(mut self, env: ExecutionEnv) -> Self {
        self.env = env;
        self
    }

    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }
}

/// Result of a render call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutput {
    Single(PathBuf),
    /// One path per requested format, in request order
    Multiple(Vec<PathBuf>),
}

impl RenderOutput {
    pub fn paths(&self) -> Vec<&Path> {
        match self {
            RenderOutput::Single(path) => vec![path.as_path()],
            RenderOutput::Multiple(paths) => paths.iter().map(PathBuf::as_path).collect(),
        }
    }
}

/// Stages of a render pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStage {
    Start,
    Normalize,
    Resolve,
    Weave,
    PreProcess,
    Convert,
    PostProcess,
    EmitAuxiliaryText,
    Cleanup,
    Done,
    Failed,
}

impl RenderStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderStage::Start => "start",
            RenderStage::Normalize => "normalize",
            RenderStage::Resolve => "resolve",
            RenderStage::Weave => "weave",
            RenderStage::PreProcess => "pre-process",
            RenderStage::Convert => "convert",
            RenderStage::PostProcess => "post-process",
            RenderStage::EmitAuxiliaryText => "emit-auxiliary-text",
            RenderStage::Cleanup => "cleanup",
            RenderStage::Done => "done",
            RenderStage::Failed => "failed",
        }
    }
}

impl fmt::Display for RenderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn is_identity_name(name: &str) -> bool {
    name.rsplit("::").next() == Some(IDENTITY_TARGET)
}

fn transition(stage: RenderStage) {
    debug!(stage = stage.as_str(), "render stage");
}

/// Outcome of a single successful pass.
#[derive(Debug, Clone)]
pub struct RenderPass {
    /// Absolute path of the final artifact
    pub output: PathBuf,
    /// Name of the format rendered
    pub format: String,
    /// Non-fatal warnings raised during the pass
    pub warnings: Vec<String>,
}

#[derive(Clone, Copy)]
enum FormatChoice<'r> {
    Default,
    Named(&'r str),
    Concrete(&'r OutputFormat),
}

/// Coordinates normalization, weaving, conversion and cleanup.
pub struct Renderer<'a> {
    runtime: &'a dyn SystemRuntime,
    engine: &'a dyn WeaveEngine,
    converter: &'a dyn Converter,
    identity: IdentityConverter,
    spinner: &'a dyn ScriptSpinner,
    facts: SessionFacts,
    registry: FormatRegistry,
    weave_config: WeaveConfig,
    passes: Vec<RenderPass>,
}

impl<'a> Renderer<'a> {
    pub fn new(
        runtime: &'a dyn SystemRuntime,
        engine: &'a dyn WeaveEngine,
        converter: &'a dyn Converter,
    ) -> Self {
        Self {
            runtime,
            engine,
            converter,
            identity: IdentityConverter,
            spinner: &RoxygenSpinner,
            facts: SessionFacts::current(runtime),
            registry: FormatRegistry::from_env(runtime),
            weave_config: WeaveConfig::new(),
            passes: Vec::new(),
        }
    }

    pub fn with_spinner(mut self, spinner: &'a dyn ScriptSpinner) -> Self {
        self.spinner = spinner;
        self
    }

    pub fn with_facts(mut self, facts: SessionFacts) -> Self {
        self.facts = facts;
        self
    }

    pub fn with_registry(mut self, registry: FormatRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Session-wide weaving options, restored after every weaving stage.
    pub fn weave_config(&self) -> &WeaveConfig {
        &self.weave_config
    }

    pub fn weave_config_mut(&mut self) -> &mut WeaveConfig {
        &mut self.weave_config
    }

    /// Passes completed by the most recent [`Renderer::render`] call.
    pub fn passes(&self) -> &[RenderPass] {
        &self.passes
    }

    /// Render `request`.
    ///
    /// An outdated converter, or a woven input whose engine is unavailable,
    /// fails the call before any file is written.
    pub fn render(&mut self, request: &RenderRequest) -> Result<RenderOutput> {
        self.passes.clear();
        let declared = match &request.format {
            FormatRequest::All => self.declared_formats(request)?,
            _ => Vec::new(),
        };
        self.check_converter(request, &declared)?;
        if InputKind::from_path(&request.input).is_woven() && !self.engine.is_available() {
            return Err(WeaveError::unavailable(self.engine.name()).into());
        }

        match &request.format {
            FormatRequest::Default => self
                .render_one(request, FormatChoice::Default, request.output_file.as_deref())
                .map(RenderOutput::Single),
            FormatRequest::Named(name) => self
                .render_one(
                    request,
                    FormatChoice::Named(name),
                    request.output_file.as_deref(),
                )
                .map(RenderOutput::Single),
            FormatRequest::Concrete(format) => self
                .render_one(
                    request,
                    FormatChoice::Concrete(format),
                    request.output_file.as_deref(),
                )
                .map(RenderOutput::Single),
            FormatRequest::List(names) => self.render_each(request, names),
            FormatRequest::All => self.render_each(request, &declared),
        }
    }

    /// Check that the converter is recent enough before touching any file.
    ///
    /// Skipped when every pass uses the identity format. `declared` holds the
    /// front matter formats of an `All` request.
    fn check_converter(&self, request: &RenderRequest, declared: &[String]) -> Result<()> {
        let identity_only = match &request.format {
            FormatRequest::Named(name) => is_identity_name(name),
            FormatRequest::Concrete(format) => format.is_identity(),
            FormatRequest::List(names) => {
                !names.is_empty() && names.iter().all(|n| is_identity_name(n))
            }
            FormatRequest::All => declared.iter().all(|n| is_identity_name(n)),
            // An unreadable input is reported by the pass itself
            FormatRequest::Default => self
                .declared_formats(request)
                .ok()
                .and_then(|names| names.first().map(|n| is_identity_name(n)))
                .unwrap_or(false),
        };
        if identity_only {
            debug!("identity output only, skipping the converter check");
            return Ok(());
        }

        let version = self.converter.version(self.runtime).map_err(|e| {
            RenderError::configuration(format!(
                "{} is required to render documents: {}",
                self.converter.name(),
                e
            ))
        })?;
        let minimum = self.converter.min_version();
        if version < minimum {
            return Err(RenderError::configuration(format!(
                "{} {} is too old; version {} or later is required",
                self.converter.name(),
                version,
                minimum
            )));
        }
        debug!("using {} {}", self.converter.name(), version);
        Ok(())
    }

    /// Formats declared in the input's front matter, or the default format.
    fn declared_formats(&self, request: &RenderRequest) -> Result<Vec<String>> {
        let input = absolutize(&self.runtime.cwd()?, &request.input);
        let bytes = self.runtime.file_read(&input)?;
        let mut text = decode_text(&bytes, &request.encoding)?;
        if InputKind::from_path(&input) == InputKind::Script {
            text = self.spinner.spin(&text);
        }
        let names = Metadata::from_text(&text)?.declared_format_names();
        if names.is_empty() {
            Ok(vec![DEFAULT_FORMAT.to_string()])
        } else {
            Ok(names)
        }
    }

    fn render_each(&mut self, request: &RenderRequest, names: &[String]) -> Result<RenderOutput> {
        if names.is_empty() {
            return Err(RenderError::configuration("No output formats requested"));
        }
        if request.output_file.is_some() {
            debug!("ignoring output file for a multi-format render");
        }

        let mut outputs = Vec::with_capacity(names.len());
        for name in names {
            outputs.push(self.render_one(request, FormatChoice::Named(name), None)?);
        }
        Ok(RenderOutput::Multiple(outputs))
    }

    fn render_one(
        &mut self,
        request: &RenderRequest,
        choice: FormatChoice<'_>,
        output_file: Option<&Path>,
    ) -> Result<PathBuf> {
        transition(RenderStage::Start);
        let mut intermediates = IntermediateSet::new(self.runtime, request.clean);
        let result = self.run_pass(request, choice, output_file, &mut intermediates);

        transition(RenderStage::Cleanup);
        intermediates.cleanup();

        match result {
            Ok(pass) => {
                transition(RenderStage::Done);
                info!("Output created: {}", pass.output.display());
                let output = pass.output.clone();
                self.passes.push(pass);
                Ok(output)
            }
            Err(e) => {
                transition(RenderStage::Failed);
                Err(e)
            }
        }
    }

    fn run_pass(
        &mut self,
        request: &RenderRequest,
        choice: FormatChoice<'_>,
        output_file: Option<&Path>,
        intermediates: &mut IntermediateSet,
    ) -> Result<RenderPass> {
        transition(RenderStage::Normalize);
        let input = InputNormalizer::new(self.runtime, self.spinner, &self.facts).normalize(
            &request.input,
            request.intermediates_dir.as_deref(),
            &request.encoding,
            intermediates,
        )?;

        transition(RenderStage::Resolve);
        // Spun scripts were written back as UTF-8
        let encoding = if input.kind == InputKind::Script {
            "UTF-8"
        } else {
            request.encoding.as_str()
        };
        let text = decode_text(&self.runtime.file_read(&input.path)?, encoding)?;
        let metadata = Metadata::from_text(&text)?;
        let format = match choice {
            FormatChoice::Concrete(format) => format.clone(),
            FormatChoice::Default => {
                resolve_format(&self.registry, None, &metadata, &request.output_options)?
            }
            FormatChoice::Named(name) => resolve_format(
                &self.registry,
                Some(name),
                &metadata,
                &request.output_options,
            )?,
        };
        let citeproc = citeproc_required(&metadata, partition_front_matter(&text).body);
        let runtime_mode = resolve_runtime_mode(request.runtime_mode, &metadata);
        let output_path = self.output_path(request, &input, &format, output_file)?;
        let output_dir = output_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| input.base_dir.clone());

        // Supporting files follow the output name, not the input name
        let files_stem = output_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(input.output_stem.as_str())
            .to_string();
        let files_dir = input.base_dir.join(format!("{}_files", files_stem));
        if format.flags.clean_supporting
            && request.clean
            && !self.runtime.path_exists(&files_dir, None)?
        {
            intermediates.register(&files_dir);
        }

        let mut warnings = Vec::new();
        let (convert_input, woven_text, dependencies) =
            if input.working_kind() == InputKind::Literate {
                transition(RenderStage::Weave);
                let woven = WeaveOrchestrator::new(self.runtime, self.engine).weave(
                    &mut self.weave_config,
                    &input,
                    &files_stem,
                    &text,
                    &format,
                    &metadata,
                    &request.env,
                    runtime_mode,
                    request.quiet,
                    intermediates,
                )?;
                warnings.extend(woven.warnings);
                (woven.path, woven.text, woven.dependencies)
            } else {
                (input.path.clone(), text.clone(), DependencyMetadata::default())
            };

        let mut args = format.args.clone();
        if let Some(pre) = &format.pre_processor {
            transition(RenderStage::PreProcess);
            let ctx = PreProcessContext {
                runtime: self.runtime,
                metadata: &metadata,
                woven_path: &convert_input,
                runtime_mode,
                dependencies: &dependencies,
                files_dir: &files_dir,
                output_dir: &output_dir,
            };
            let extra = pre.pre_process(&ctx, intermediates)?;
            debug!("{} added {} converter arguments", pre.name(), extra.len());
            args.extend(extra);
        }

        transition(RenderStage::Convert);
        let converter: &dyn Converter = if format.is_identity() {
            &self.identity
        } else {
            self.converter
        };
        if let Some(aux) = &format.flags.auxiliary {
            let aux_path = output_path.with_extension(&aux.extension);
            let aux_existed = self.runtime.path_exists(&aux_path, None)?;
            converter.convert(&ConversionRequest {
                runtime: self.runtime,
                input: &convert_input,
                output: &aux_path,
                from: &format.from,
                to: &aux.to,
                args: &args,
                citeproc,
                bibliography: &metadata.bibliography,
                cwd: &input.base_dir,
            })?;
            if !format.flags.keep_intermediate_source && !aux_existed {
                intermediates.register(&aux_path);
            }
        }
        converter.convert(&ConversionRequest {
            runtime: self.runtime,
            input: &convert_input,
            output: &output_path,
            from: &format.from,
            to: &format.to,
            args: &args,
            citeproc,
            bibliography: &metadata.bibliography,
            cwd: &input.base_dir,
        })?;

        let mut final_path = output_path.clone();
        if let Some(post) = &format.post_processor {
            transition(RenderStage::PostProcess);
            let ctx = PostProcessContext {
                runtime: self.runtime,
                metadata: &metadata,
                woven_path: &convert_input,
                output_path: &output_path,
                clean: request.clean,
                quiet: request.quiet,
            };
            final_path = post.post_process(&ctx)?;
        }

        if format.flags.keep_woven && input.kind.is_woven() {
            transition(RenderStage::EmitAuxiliaryText);
            let text_path = output_dir.join(format!("{}.md", files_stem));
            if text_path != final_path {
                let content = format!(
                    "{}{}",
                    metadata.markdown_header(),
                    partition_front_matter(&woven_text).body
                );
                self.runtime.file_write(&text_path, content.as_bytes())?;
            }
        }

        let final_path = absolutize(&self.runtime.cwd()?, &final_path);
        Ok(RenderPass {
            output: final_path,
            format: format.name.clone(),
            warnings,
        })
    }

    /// Absolute output path for a pass, creating its directory if needed.
    fn output_path(
        &self,
        request: &RenderRequest,
        input: &NormalizedInput,
        format: &OutputFormat,
        output_file: Option<&Path>,
    ) -> Result<PathBuf> {
        let cwd = self.runtime.cwd()?;
        let output_dir = request
            .output_dir
            .as_deref()
            .map(|dir| absolutize(&cwd, dir))
            .unwrap_or_else(|| input.base_dir.clone());

        let path = match output_file {
            Some(file) => absolutize(&output_dir, file),
            None => output_dir.join(format!("{}.{}", input.output_stem, format.extension)),
        };
        if path == input.original || path == input.path {
            return Err(RenderError::configuration(format!(
                "Output file {} would overwrite the input",
                path.display()
            )));
        }
        if let Some(parent) = path.parent()
            && !self.runtime.is_dir(parent)?
        {
            self.runtime.dir_create(parent, true)?;
        }
        Ok(path)
    }
}
