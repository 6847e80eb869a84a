/*
 * weave/knitr/types.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Request/response types for knitr R communication.
 */

//! Request and response types for knitr R subprocess communication.
//!
//! The request is sent to `weave.R` on stdin; the driver writes its response
//! to the results file named in the request.
//!
//! # Request Format
//!
//! ```json
//! {
//!   "action": "weave",
//!   "params": {
//!     "input": "/project/report.Rmd",
//!     "markdown": "---\ntitle: Report\n---\n\n```{r}\n1+1\n```\n",
//!     "optsKnit": { "rmarkdown.pandoc.to": "html" },
//!     "optsChunk": { "fig.path": "report_files/figure-html/" },
//!     "knitHooks": {},
//!     "env": { "params": { "n": 3 } },
//!     "runtime": "static",
//!     "quiet": true
//!   },
//!   "results": "/tmp/knitdown-knitr-xxx/results.json",
//!   "wd": "/project"
//! }
//! ```
//!
//! # Response Format
//!
//! ```json
//! {
//!   "engine": "knitr",
//!   "markdown": "...",
//!   "dependencies": [{ "name": "d3", "version": "7.0", "src": "/lib/d3", "scripts": ["d3.js"] }],
//!   "htmlOnly": false,
//!   "warnings": ["NAs introduced by coercion"]
//! }
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::weave::context::{DependencyMetadata, HtmlDependency, RuntimeMode};

/// Parameters for the knitr weave action.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KnitrWeaveParams {
    /// Path to the input document
    pub input: PathBuf,

    /// Document text, front matter included
    pub markdown: String,

    /// Values for `knitr::opts_knit`
    pub opts_knit: BTreeMap<String, Value>,

    /// Values for `knitr::opts_chunk`
    pub opts_chunk: BTreeMap<String, Value>,

    /// Output hooks to install, by hook name
    pub knit_hooks: BTreeMap<String, String>,

    /// Variables assigned in the evaluation environment
    pub env: BTreeMap<String, Value>,

    pub runtime: RuntimeMode,

    pub quiet: bool,
}

/// Result from the knitr weave action.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnitrWeaveResult {
    /// Engine name (always "knitr")
    #[allow(dead_code)]
    pub engine: String,

    /// Woven markdown
    pub markdown: String,

    #[serde(default, deserialize_with = "deserialize_list")]
    pub dependencies: Vec<HtmlDependency>,

    #[serde(default)]
    pub html_only: bool,

    #[serde(default, deserialize_with = "deserialize_list")]
    pub warnings: Vec<String>,
}

impl KnitrWeaveResult {
    /// Split into woven text and dependency metadata.
    pub fn into_parts(self) -> (String, DependencyMetadata) {
        (
            self.markdown,
            DependencyMetadata {
                html_dependencies: self.dependencies,
                html_only: self.html_only,
                warnings: self.warnings,
            },
        )
    }
}

/// Accept `{}`, `null` and a lone value as well as a list.
///
/// jsonlite serializes an empty R list as `{}` and, with `auto_unbox`, a
/// length-one vector as a scalar.
fn deserialize_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    use serde::de::Error;

    let value: Value = Deserialize::deserialize(deserializer)?;
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Object(ref map) if map.is_empty() => Ok(Vec::new()),
        Value::Array(_) => serde_json::from_value(value).map_err(D::Error::custom),
        other => serde_json::from_value(other)
            .map(|item| vec![item])
            .map_err(D::Error::custom),
    }
}

/// Request wrapper sent to R via stdin.
#[derive(Debug, Clone, Serialize)]
pub struct KnitrRequest<T: Serialize> {
    /// Action to perform
    pub action: String,

    /// Action-specific parameters
    pub params: T,

    /// Path to write results JSON
    pub results: PathBuf,

    /// Working directory for R
    pub wd: PathBuf,
}

impl<T: Serialize> KnitrRequest<T> {
    pub fn new(action: impl Into<String>, params: T, results: PathBuf, wd: PathBuf) -> Self {
        Self {
            action: action.into(),
            params,
            results,
            wd,
        }
    }
}
