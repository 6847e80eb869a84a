/*
 * weave/knitr/mod.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Knitr engine for R code execution.
 */

//! Knitr engine for R code execution.
//!
//! This engine shells out to `Rscript` running an embedded driver script
//! (`resources/weave.R`) which applies the requested knitr options, knits the
//! document text and reports the woven markdown together with any HTML
//! dependencies and warnings the executed code produced.
//!
//! # Requirements
//!
//! - R must be installed (found through `KNITDOWN_R` or `PATH`)
//! - The `knitr` and `jsonlite` R packages must be installed

pub mod subprocess;
pub mod types;

use std::path::{Path, PathBuf};

use knitdown_system_runtime::SystemRuntime;
use tracing::debug;

pub use subprocess::{CallROptions, call_r, find_rscript};
pub use types::{KnitrRequest, KnitrWeaveParams, KnitrWeaveResult};

use super::context::{WeaveOutput, WeaveRequest};
use super::error::WeaveError;
use super::traits::WeaveEngine;

/// The R driver script, embedded at compile time.
pub const WEAVE_DRIVER: &str = include_str!("../../../resources/weave.R");

/// Knitr engine for R code execution.
#[derive(Debug, Clone, Default)]
pub struct KnitrEngine {
    /// Path to Rscript executable (discovered or configured)
    rscript_path: Option<PathBuf>,
}

impl KnitrEngine {
    /// Create an engine, looking for Rscript through `runtime`.
    pub fn discover(runtime: &dyn SystemRuntime) -> Self {
        Self {
            rscript_path: find_rscript(runtime),
        }
    }

    /// Create an engine using a known Rscript path.
    pub fn with_rscript(path: impl Into<PathBuf>) -> Self {
        Self {
            rscript_path: Some(path.into()),
        }
    }

    /// Get the path to Rscript, if found.
    pub fn rscript_path(&self) -> Option<&Path> {
        self.rscript_path.as_deref()
    }

    fn build_params(request: &WeaveRequest<'_>) -> KnitrWeaveParams {
        KnitrWeaveParams {
            input: request.input.to_path_buf(),
            markdown: request.text.to_string(),
            opts_knit: request.config.opts_knit.clone(),
            opts_chunk: request.config.opts_chunk.clone(),
            knit_hooks: request.config.knit_hooks.clone(),
            env: request.env.variables().clone(),
            runtime: request.runtime_mode,
            quiet: request.quiet,
        }
    }
}

impl WeaveEngine for KnitrEngine {
    fn name(&self) -> &str {
        "knitr"
    }

    fn weave(&self, request: &WeaveRequest<'_>) -> Result<WeaveOutput, WeaveError> {
        let rscript = self.rscript_path.as_deref().ok_or_else(|| {
            WeaveError::runtime_not_found(
                "knitr",
                "Rscript (install R from https://www.r-project.org/)",
            )
        })?;

        let params = Self::build_params(request);
        let options = CallROptions::from_env(request.runtime);
        debug!(
            "knitting {} with {}",
            request.input.display(),
            rscript.display()
        );

        let result: KnitrWeaveResult = call_r(
            request.runtime,
            rscript,
            "weave",
            &params,
            request.base_dir,
            &options,
        )?;

        let (markdown, dependencies) = result.into_parts();
        Ok(WeaveOutput {
            markdown,
            dependencies,
        })
    }

    fn is_available(&self) -> bool {
        self.rscript_path.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weave::{ExecutionEnv, RuntimeMode, WeaveConfig};
    use knitdown_system_runtime::NativeRuntime;

    #[test]
    fn test_driver_is_embedded() {
        assert!(WEAVE_DRIVER.contains("knitr::knit"));
        assert!(WEAVE_DRIVER.contains("jsonlite"));
    }

    #[test]
    fn test_unavailable_without_rscript() {
        let engine = KnitrEngine::default();
        assert!(!engine.is_available());
        assert_eq!(engine.name(), "knitr");

        let config = WeaveConfig::new();
        let env = ExecutionEnv::new();
        let request = WeaveRequest {
            runtime: &NativeRuntime,
            input: Path::new("/doc.Rmd"),
            text: "",
            base_dir: Path::new("/"),
            config: &config,
            env: &env,
            runtime_mode: RuntimeMode::Static,
            quiet: true,
        };
        let err = engine.weave(&request).unwrap_err();
        assert!(matches!(err, WeaveError::RuntimeNotFound { .. }));
    }

    #[test]
    fn test_build_params_carries_config_and_env() {
        let mut config = WeaveConfig::new();
        config.set_knit("rmarkdown.pandoc.to", "latex");
        config.set_chunk("fig.path", "doc_files/figure-latex/");
        let env = ExecutionEnv::new().with_var("params", serde_json::json!({"n": 1}));
        let request = WeaveRequest {
            runtime: &NativeRuntime,
            input: Path::new("/p/doc.Rmd"),
            text: "text",
            base_dir: Path::new("/p"),
            config: &config,
            env: &env,
            runtime_mode: RuntimeMode::Interactive,
            quiet: false,
        };

        let params = KnitrEngine::build_params(&request);
        assert_eq!(params.opts_knit["rmarkdown.pandoc.to"], "latex");
        assert_eq!(params.opts_chunk["fig.path"], "doc_files/figure-latex/");
        assert_eq!(params.env["params"]["n"], 1);
        assert_eq!(params.runtime, RuntimeMode::Interactive);
    }

    #[cfg(unix)]
    #[test]
    fn test_weave_through_fake_rscript() {
        use std::os::unix::fs::PermissionsExt;

        // A stand-in for Rscript that answers the protocol with a canned response
        let temp = tempfile::tempdir().unwrap();
        let fake = temp.path().join("Rscript");
        std::fs::write(
            &fake,
            "#!/bin/sh\n\
             req=$(cat)\n\
             results=$(printf '%s' \"$req\" | sed 's/.*\"results\":\"\\([^\"]*\\)\".*/\\1/')\n\
             printf '{\"engine\":\"knitr\",\"markdown\":\"woven\",\"warnings\":[\"w1\"]}' > \"$results\"\n",
        )
        .unwrap();
        std::fs::set_permissions(&fake, std::fs::Permissions::from_mode(0o755)).unwrap();

        let engine = KnitrEngine::with_rscript(&fake);
        let config = WeaveConfig::new();
        let env = ExecutionEnv::new();
        let request = WeaveRequest {
            runtime: &NativeRuntime,
            input: &temp.path().join("doc.Rmd"),
            text: "```{r}\n1\n```\n",
            base_dir: temp.path(),
            config: &config,
            env: &env,
            runtime_mode: RuntimeMode::Static,
            quiet: true,
        };

        let output = engine.weave(&request).unwrap();
        assert_eq!(output.markdown, "woven");
        assert_eq!(output.dependencies.warnings, vec!["w1"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_weave_failure_is_parsed() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempfile::tempdir().unwrap();
        let fake = temp.path().join("Rscript");
        std::fs::write(
            &fake,
            "#!/bin/sh\ncat > /dev/null\necho \"Error in library(knitr) : there is no package called 'knitr'\" >&2\nexit 1\n",
        )
        .unwrap();
        std::fs::set_permissions(&fake, std::fs::Permissions::from_mode(0o755)).unwrap();

        let engine = KnitrEngine::with_rscript(&fake);
        let config = WeaveConfig::new();
        let env = ExecutionEnv::new();
        let request = WeaveRequest {
            runtime: &NativeRuntime,
            input: &temp.path().join("doc.Rmd"),
            text: "",
            base_dir: temp.path(),
            config: &config,
            env: &env,
            runtime_mode: RuntimeMode::Static,
            quiet: true,
        };

        let err = engine.weave(&request).unwrap_err();
        assert!(matches!(err, WeaveError::MissingPackage { .. }));
    }
}
