/*
 * render.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Render command implementation
 */

//! Render command implementation.
//!
//! Builds a [`RenderRequest`] from the command line and prints the path of
//! every produced output on stdout, one per line.
//!
//! - `--to` takes a format name, a comma-separated list, or `all`
//! - `-M KEY:VALUE` entries become format options
//! - `-P KEY:VALUE` entries become the `params` variable of the execution env

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use tracing::debug;

use knitdown_core::{
    ExecutionEnv, FormatRequest, KnitrEngine, PandocConverter, PassthroughEngine, RenderRequest,
    Renderer, RuntimeMode, WeaveEngine,
};
use knitdown_system_runtime::NativeRuntime;

use crate::EngineKind;

/// Arguments for the render command
#[derive(Debug)]
pub struct RenderArgs {
    pub input: String,
    pub to: Option<String>,
    pub output: Option<String>,
    pub output_dir: Option<String>,
    pub intermediates_dir: Option<String>,
    pub runtime: RuntimeMode,
    pub no_clean: bool,
    pub quiet: bool,
    /// Format options (KEY:VALUE)
    pub metadata: Vec<String>,
    /// Execution parameters (KEY:VALUE)
    pub params: Vec<String>,
    pub encoding: String,
    pub engine: EngineKind,
}

/// Execute the render command
pub fn execute(args: RenderArgs) -> Result<()> {
    let runtime = NativeRuntime::new();

    let knitr;
    let passthrough = PassthroughEngine::new();
    let engine: &dyn WeaveEngine = match args.engine {
        EngineKind::Knitr => {
            knitr = KnitrEngine::discover(&runtime);
            &knitr
        }
        EngineKind::Passthrough => &passthrough,
    };
    let pandoc = PandocConverter::discover(&runtime);

    let request = build_request(&args)?;
    debug!("render request: {:?}", request);

    let mut renderer = Renderer::new(&runtime, engine, &pandoc);
    let output = renderer
        .render(&request)
        .with_context(|| format!("Failed to render {}", args.input))?;

    for path in output.paths() {
        println!("{}", path.display());
    }
    Ok(())
}

/// Translate command-line arguments into a render request.
pub fn build_request(args: &RenderArgs) -> Result<RenderRequest> {
    let mut request = RenderRequest::new(&args.input)
        .with_format(parse_format_request(args.to.as_deref()))
        .with_runtime_mode(args.runtime)
        .with_clean(!args.no_clean)
        .with_quiet(args.quiet);
    request.output_file = args.output.as_ref().map(PathBuf::from);
    request.output_dir = args.output_dir.as_ref().map(PathBuf::from);
    request.intermediates_dir = args.intermediates_dir.as_ref().map(PathBuf::from);
    request.encoding = args.encoding.clone();

    if !args.metadata.is_empty() {
        request.output_options = Value::Object(parse_key_values(&args.metadata)?);
    }
    if !args.params.is_empty() {
        let params = parse_key_values(&args.params)?;
        request.env = ExecutionEnv::new().with_var("params", Value::Object(params));
    }
    Ok(request)
}

/// Parse a `--to` value.
pub fn parse_format_request(to: Option<&str>) -> FormatRequest {
    let Some(to) = to.map(str::trim).filter(|t| !t.is_empty()) else {
        return FormatRequest::Default;
    };
    if to == "all" {
        return FormatRequest::All;
    }
    let names: Vec<String> = to
        .split(',')
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .collect();
    match names.as_slice() {
        [single] => FormatRequest::Named(single.clone()),
        _ => FormatRequest::List(names),
    }
}

/// Parse `KEY:VALUE` entries; values are read as YAML scalars.
pub fn parse_key_values(entries: &[String]) -> Result<Map<String, Value>> {
    let mut map = Map::new();
    for entry in entries {
        let (key, raw) = entry
            .split_once(':')
            .with_context(|| format!("Expected KEY:VALUE, got '{}'", entry))?;
        let raw = raw.trim();
        let value = serde_yaml::from_str::<Value>(raw)
            .unwrap_or_else(|_| Value::String(raw.to_string()));
        map.insert(key.trim().to_string(), value);
    }
    Ok(map)
}
