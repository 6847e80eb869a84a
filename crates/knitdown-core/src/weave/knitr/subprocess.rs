/*
 * weave/knitr/subprocess.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * R subprocess management for the knitr engine.
 */

//! R subprocess management for the knitr engine.
//!
//! # Finding Rscript
//!
//! [`find_rscript`] checks the `KNITDOWN_R` environment variable (an R
//! installation directory or the Rscript binary itself), then `PATH`.
//!
//! # R Communication Protocol
//!
//! - The embedded driver script is written to a scratch directory
//! - The request JSON is written to the driver's stdin
//! - The driver writes its response to the results file named in the request

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use knitdown_system_runtime::{CommandSpec, RuntimeError, SystemRuntime};
use regex::Regex;
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::WEAVE_DRIVER;
use super::types::KnitrRequest;
use crate::weave::error::WeaveError;

/// Environment variable locating R.
pub const R_ENV_VAR: &str = "KNITDOWN_R";

/// Environment variable with extra comma-separated Rscript arguments.
pub const RSCRIPT_ARGS_ENV_VAR: &str = "KNITDOWN_RSCRIPT_ARGS";

const RSCRIPT_HINT: &str = "Rscript (install R from https://www.r-project.org/)";

static MISSING_PACKAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"there is no package called ['‘]([^'’]+)['’]").expect("valid regex")
});

static QUITTING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Quitting from lines\s+(\d+)-(\d+)\s*(?:\([^)]+\))?[:\s]*(.*)")
        .expect("valid regex")
});

static ANSI_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1b\[[0-9;]*m").expect("valid regex"));

static ERROR_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Error(?:\s+in\s+[^:]+)?\s*:\s*").expect("valid regex"));

/// Find the Rscript binary.
pub fn find_rscript(runtime: &dyn SystemRuntime) -> Option<PathBuf> {
    runtime.find_binary(rscript_name(), R_ENV_VAR)
}

/// Get the platform-appropriate Rscript binary name.
fn rscript_name() -> &'static str {
    #[cfg(windows)]
    {
        "Rscript.exe"
    }
    #[cfg(not(windows))]
    {
        "Rscript"
    }
}

/// Options for calling R.
#[derive(Debug, Clone, Default)]
pub struct CallROptions {
    /// Additional arguments to pass to Rscript.
    pub extra_args: Vec<String>,
}

impl CallROptions {
    /// Read extra Rscript arguments from `KNITDOWN_RSCRIPT_ARGS`,
    /// e.g. `--vanilla,--no-init-file`.
    pub fn from_env(runtime: &dyn SystemRuntime) -> Self {
        let raw = runtime
            .env_get(RSCRIPT_ARGS_ENV_VAR)
            .ok()
            .flatten()
            .unwrap_or_default();
        Self {
            extra_args: parse_args(&raw),
        }
    }
}

fn parse_args(raw: &str) -> Vec<String> {
    raw.split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.trim().to_string())
        .collect()
}

/// Run the embedded driver with `action` and `params`, returning its response.
pub fn call_r<P, R>(
    runtime: &dyn SystemRuntime,
    rscript: &Path,
    action: &str,
    params: &P,
    working_dir: &Path,
    options: &CallROptions,
) -> Result<R, WeaveError>
where
    P: Serialize,
    R: DeserializeOwned,
{
    let scratch = runtime.temp_dir("knitdown-knitr").map_err(|e| {
        WeaveError::protocol(format!("Failed to create scratch directory: {}", e), None)
    })?;

    let driver = scratch.path().join("weave.R");
    runtime
        .file_write(&driver, WEAVE_DRIVER.as_bytes())
        .map_err(|e| {
            WeaveError::protocol(
                format!("Failed to write R driver: {}", e),
                Some(driver.clone()),
            )
        })?;

    let results_path = scratch.path().join("results.json");
    let request = KnitrRequest::new(
        action,
        params,
        results_path.clone(),
        working_dir.to_path_buf(),
    );
    let request_json = serde_json::to_string(&request)
        .map_err(|e| WeaveError::other(format!("Failed to serialize request: {}", e)))?;

    let mut args = options.extra_args.clone();
    args.push(driver.display().to_string());

    let spec = CommandSpec::new(rscript)
        .args(args)
        .current_dir(working_dir)
        .stdin(request_json.as_bytes());

    let output = runtime.exec_command(&spec).map_err(|e| match e {
        RuntimeError::BinaryNotFound(_) => WeaveError::runtime_not_found("knitr", RSCRIPT_HINT),
        other => WeaveError::other(format!(
            "Failed to run Rscript ({}): {}",
            rscript.display(),
            other
        )),
    })?;

    if !output.success() {
        return Err(r_error_to_weave_error(&output.stderr_string()));
    }

    let results_json = runtime.file_read_string(&results_path).map_err(|e| {
        WeaveError::protocol(
            format!(
                "Failed to read results file ({}): {}",
                results_path.display(),
                e
            ),
            Some(results_path.clone()),
        )
    })?;

    serde_json::from_str(&results_json).map_err(|e| {
        WeaveError::protocol(
            format!(
                "Failed to parse R results: {}\nJSON: {}",
                e,
                truncate_for_error(&results_json, 500)
            ),
            Some(results_path),
        )
    })
}

/// Truncate a string for error messages.
fn truncate_for_error(s: &str, max_len: usize) -> &str {
    if s.len() <= max_len {
        return s;
    }
    let mut end = max_len;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Turn R's stderr into the most specific [`WeaveError`].
pub(crate) fn r_error_to_weave_error(stderr: &str) -> WeaveError {
    if let Some(caps) = MISSING_PACKAGE_RE.captures(stderr) {
        let package = caps[1].to_string();
        let suggestion = format!(
            "Install the package with: install.packages(\"{}\")",
            package
        );
        return WeaveError::missing_package("knitr", package, Some(suggestion));
    }

    if let Some(caps) = QUITTING_RE.captures(stderr) {
        let start: usize = caps[1].parse().unwrap_or(0);
        let end: usize = caps[2].parse().unwrap_or(start);
        let detail = caps[3].trim();
        let message = if detail.is_empty() {
            clean_error_message(stderr)
        } else {
            clean_error_message(detail)
        };
        return WeaveError::execution_failed_at_lines("knitr", message, start, end);
    }

    let message = clean_error_message(stderr);
    if message.is_empty() {
        WeaveError::execution_failed("knitr", "R process failed")
    } else {
        WeaveError::execution_failed("knitr", message)
    }
}

/// Strip ANSI codes and the `Error in f() :` prefix from an R message.
fn clean_error_message(message: &str) -> String {
    let cleaned = ANSI_RE.replace_all(message, "");
    ERROR_PREFIX_RE
        .replace(cleaned.trim(), "")
        .trim()
        .to_string()
}
