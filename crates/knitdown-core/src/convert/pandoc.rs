/*
 * convert/pandoc.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Pandoc subprocess converter.
 */

use std::path::{Path, PathBuf};

use knitdown_system_runtime::{CommandSpec, SystemRuntime};
use tracing::debug;

use super::{ConversionError, ConversionRequest, Converter, ConverterVersion};

/// Environment variable locating pandoc.
pub const PANDOC_ENV_VAR: &str = "KNITDOWN_PANDOC";

const PANDOC_HINT: &str = "pandoc (install it from https://pandoc.org/installing.html)";

/// Runs the `pandoc` binary.
#[derive(Debug, Clone, Default)]
pub struct PandocConverter {
    pandoc_path: Option<PathBuf>,
}

impl PandocConverter {
    /// Look for pandoc through `KNITDOWN_PANDOC`, then `PATH`.
    pub fn discover(runtime: &dyn SystemRuntime) -> Self {
        Self {
            pandoc_path: runtime.find_binary("pandoc", PANDOC_ENV_VAR),
        }
    }

    pub fn with_pandoc(path: impl Into<PathBuf>) -> Self {
        Self {
            pandoc_path: Some(path.into()),
        }
    }

    pub fn pandoc_path(&self) -> Option<&Path> {
        self.pandoc_path.as_deref()
    }

    fn binary(&self) -> Result<&Path, ConversionError> {
        self.pandoc_path
            .as_deref()
            .ok_or_else(|| ConversionError::not_found(PANDOC_HINT))
    }

    /// Full pandoc argument list for a request.
    pub fn build_args(request: &ConversionRequest<'_>) -> Vec<String> {
        let mut args = vec![
            request.input.display().to_string(),
            "--from".to_string(),
            request.from.to_string(),
            "--to".to_string(),
            request.to.to_string(),
            "--output".to_string(),
            request.output.display().to_string(),
        ];
        args.extend(request.args.iter().cloned());
        if request.citeproc {
            args.push("--citeproc".to_string());
        }
        for bib in request.bibliography {
            args.push(format!("--bibliography={}", bib));
        }
        args
    }
}

impl Converter for PandocConverter {
    fn name(&self) -> &str {
        "pandoc"
    }

    fn version(&self, runtime: &dyn SystemRuntime) -> Result<ConverterVersion, ConversionError> {
        let pandoc = self.binary()?;
        let output = runtime.exec_command(&CommandSpec::new(pandoc).args(["--version"]))?;
        if !output.success() {
            return Err(ConversionError::failed(
                "pandoc",
                output.code,
                output.stderr_string(),
            ));
        }
        let stdout = output.stdout_string();
        ConverterVersion::parse(&stdout).ok_or_else(|| ConversionError::UnknownVersion {
            converter: "pandoc".to_string(),
            output: stdout.lines().next().unwrap_or_default().to_string(),
        })
    }

    fn convert(&self, request: &ConversionRequest<'_>) -> Result<(), ConversionError> {
        let pandoc = self.binary()?;
        let args = Self::build_args(request);
        debug!("pandoc {}", args.join(" "));

        let spec = CommandSpec::new(pandoc)
            .args(args)
            .current_dir(request.cwd);
        let output = request.runtime.exec_command(&spec)?;
        if !output.success() {
            return Err(ConversionError::failed(
                "pandoc",
                output.code,
                output.stderr_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use knitdown_system_runtime::NativeRuntime;

    fn request<'a>(
        input: &'a Path,
        output: &'a Path,
        args: &'a [String],
        bibliography: &'a [String],
        citeproc: bool,
    ) -> ConversionRequest<'a> {
        ConversionRequest {
            runtime: &NativeRuntime,
            input,
            output,
            from: "markdown",
            to: "html",
            args,
            citeproc,
            bibliography,
            cwd: Path::new("."),
        }
    }

    #[test]
    fn test_build_args_order() {
        let args = vec!["--standalone".to_string()];
        let bib = vec!["refs.bib".to_string()];
        let req = request(
            Path::new("doc.knit.md"),
            Path::new("doc.html"),
            &args,
            &bib,
            true,
        );
        assert_eq!(
            PandocConverter::build_args(&req),
            vec![
                "doc.knit.md",
                "--from",
                "markdown",
                "--to",
                "html",
                "--output",
                "doc.html",
                "--standalone",
                "--citeproc",
                "--bibliography=refs.bib",
            ]
        );
    }

    #[test]
    fn test_missing_pandoc() {
        let converter = PandocConverter::default();
        let err = converter.version(&NativeRuntime).unwrap_err();
        assert!(matches!(err, ConversionError::NotFound { .. }));
    }

    #[cfg(unix)]
    fn fake_pandoc(dir: &Path, script: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join("pandoc");
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[test]
    fn test_version_from_fake_binary() {
        let temp = tempfile::tempdir().unwrap();
        let pandoc = fake_pandoc(temp.path(), "#!/bin/sh\necho 'pandoc 3.1.2'\n");
        let version = PandocConverter::with_pandoc(pandoc)
            .version(&NativeRuntime)
            .unwrap();
        assert_eq!(version, ConverterVersion::new(3, 1, 2));
    }

    #[cfg(unix)]
    #[test]
    fn test_failure_surfaces_stderr() {
        let temp = tempfile::tempdir().unwrap();
        let pandoc = fake_pandoc(
            temp.path(),
            "#!/bin/sh\necho 'Could not find data file' >&2\nexit 97\n",
        );
        let input = temp.path().join("doc.md");
        let output = temp.path().join("doc.html");
        let req = ConversionRequest {
            runtime: &NativeRuntime,
            input: &input,
            output: &output,
            from: "markdown",
            to: "html",
            args: &[],
            citeproc: false,
            bibliography: &[],
            cwd: temp.path(),
        };

        let err = PandocConverter::with_pandoc(pandoc)
            .convert(&req)
            .unwrap_err();
        match err {
            ConversionError::Failed {
                status,
                diagnostics,
                ..
            } => {
                assert_eq!(status, 97);
                assert_eq!(diagnostics, "Could not find data file\n");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
