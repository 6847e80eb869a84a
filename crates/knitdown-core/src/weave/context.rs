/*
 * weave/context.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Request and result types for weaving engines.
 */

//! Request and result types for weaving engines.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use knitdown_system_runtime::SystemRuntime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::config::WeaveConfig;

/// Execution runtime of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeMode {
    /// Use the document's `runtime` hint, or static
    #[default]
    Auto,
    /// Code runs once at render time
    Static,
    /// The document supports interactive re-execution
    Interactive,
}

impl RuntimeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuntimeMode::Auto => "auto",
            RuntimeMode::Static => "static",
            RuntimeMode::Interactive => "interactive",
        }
    }

    /// Interpret a front matter `runtime` value. Anything but `static` is interactive.
    pub fn from_hint(hint: &str) -> Self {
        if hint.trim() == "static" {
            RuntimeMode::Static
        } else {
            RuntimeMode::Interactive
        }
    }

    pub fn is_static(&self) -> bool {
        matches!(self, RuntimeMode::Static)
    }
}

impl std::fmt::Display for RuntimeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for RuntimeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(RuntimeMode::Auto),
            "static" => Ok(RuntimeMode::Static),
            "interactive" | "shiny" => Ok(RuntimeMode::Interactive),
            _ => Err(format!("Unknown runtime mode: {}", s)),
        }
    }
}

/// Variables visible to executed code.
///
/// Owned by the caller; the orchestrator only ever reads it and hands the
/// engine an extended copy.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExecutionEnv {
    variables: BTreeMap<String, Value>,
}

impl ExecutionEnv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style variable assignment.
    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.variables.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    pub fn variables(&self) -> &BTreeMap<String, Value> {
        &self.variables
    }
}

/// An HTML dependency (a bundle of scripts and stylesheets) required by
/// woven content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HtmlDependency {
    pub name: String,
    pub version: String,
    /// Directory holding the dependency's files
    pub src: PathBuf,
    #[serde(default)]
    pub stylesheets: Vec<String>,
    #[serde(default)]
    pub scripts: Vec<String>,
}

impl HtmlDependency {
    /// Directory name used when staging into the supporting-files directory.
    pub fn staged_name(&self) -> String {
        if self.version.is_empty() {
            self.name.clone()
        } else {
            format!("{}-{}", self.name, self.version)
        }
    }
}

/// Side-channel data emitted by a weaving engine.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DependencyMetadata {
    pub html_dependencies: Vec<HtmlDependency>,
    /// Set when the engine produced output that only renders in HTML
    pub html_only: bool,
    /// Warnings raised while executing code
    pub warnings: Vec<String>,
}

impl DependencyMetadata {
    /// Whether any woven content requires an HTML target.
    pub fn has_html_content(&self) -> bool {
        self.html_only || !self.html_dependencies.is_empty()
    }

    /// Remove and return the collected warnings.
    pub fn take_warnings(&mut self) -> Vec<String> {
        std::mem::take(&mut self.warnings)
    }
}

/// Everything an engine needs to weave one document.
pub struct WeaveRequest<'a> {
    pub runtime: &'a dyn SystemRuntime,
    /// The normalized input file
    pub input: &'a Path,
    /// Text of the normalized input
    pub text: &'a str,
    /// Working directory for code execution
    pub base_dir: &'a Path,
    /// Options in effect for this invocation
    pub config: &'a WeaveConfig,
    /// Variables visible to executed code
    pub env: &'a ExecutionEnv,
    /// Resolved runtime mode
    pub runtime_mode: RuntimeMode,
    pub quiet: bool,
}

/// Result of weaving one document.
#[derive(Debug, Clone, Default)]
pub struct WeaveOutput {
    /// Woven markdown text
    pub markdown: String,
    pub dependencies: DependencyMetadata,
}

impl WeaveOutput {
    /// Output that returns the input unchanged with no dependencies.
    pub fn passthrough(text: impl Into<String>) -> Self {
        Self {
            markdown: text.into(),
            dependencies: DependencyMetadata::default(),
        }
    }
}
