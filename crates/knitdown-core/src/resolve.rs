/*
 * resolve.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Selection of the effective output format for a render pass.
 */

//! Output format resolution.
//!
//! The format name comes from the caller, else the first format declared in
//! the `output:` front matter, else [`DEFAULT_FORMAT`]. Options are layered
//! as JSON objects: built-in defaults, then the front matter options for that
//! format, then the caller's `output_options`.

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{RenderError, Result};
use crate::format::{DEFAULT_FORMAT, FormatRegistry, OutputFormat};
use crate::metadata::Metadata;

/// Pick the format name for a pass.
pub fn resolve_format_name(explicit: Option<&str>, metadata: &Metadata) -> String {
    explicit
        .map(str::to_string)
        .or_else(|| metadata.output.first().map(|f| f.name.clone()))
        .unwrap_or_else(|| DEFAULT_FORMAT.to_string())
}

/// Shallow-merge `overlay` into `base`. Non-object overlays are ignored.
pub fn merge_options(base: &mut Map<String, Value>, overlay: &Value) {
    if let Value::Object(map) = overlay {
        for (key, value) in map {
            base.insert(key.clone(), value.clone());
        }
    }
}

/// Resolve the output format for one pass.
pub fn resolve_format(
    registry: &FormatRegistry,
    explicit: Option<&str>,
    metadata: &Metadata,
    output_options: &Value,
) -> Result<OutputFormat> {
    if !output_options.is_null() && !output_options.is_object() {
        return Err(RenderError::configuration(
            "output options must be a map of option names to values",
        ));
    }

    let name = resolve_format_name(explicit, metadata);
    let mut options = Map::new();
    if let Some(declared) = metadata.format_options(&name) {
        merge_options(&mut options, declared);
    }
    merge_options(&mut options, output_options);

    debug!("resolved output format {} with {} options", name, options.len());
    registry.resolve(&name, &Value::Object(options))
}

/// Whether the converter must process citations.
///
/// Decided before weaving: the front matter declares `bibliography` or
/// `references`, or a body line starts with either key.
pub fn citeproc_required(metadata: &Metadata, body: &str) -> bool {
    if metadata.has_field("bibliography") || metadata.has_field("references") {
        return true;
    }
    body.lines().any(|line| {
        let line = line.trim_start();
        line.starts_with("bibliography:") || line.starts_with("references:")
    })
}
