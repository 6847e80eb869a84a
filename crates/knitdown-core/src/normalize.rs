/*
 * normalize.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Input normalization before rendering.
 */

//! Input normalization.
//!
//! Produces a filesystem-safe view of the input document:
//!
//! - A file name containing whitespace is copied to a whitespace-free name
//!   (runs of whitespace become `-`), either in the intermediates directory or
//!   next to the input. The original file is never modified.
//! - The base directory for every later relative path is the directory of the
//!   original input, carried explicitly in [`NormalizedInput::base_dir`].
//! - A bare script is spun into a literate document (`{stem}.spin.Rmd`), with
//!   title, author and date front matter synthesized from [`SessionFacts`] for
//!   any of those keys the spun text did not declare itself.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use knitdown_system_runtime::SystemRuntime;
use serde_yaml::{Mapping, Value as YamlValue};
use tracing::debug;

use crate::error::{RenderError, Result};
use crate::intermediates::IntermediateSet;
use crate::metadata::partition_front_matter;
use crate::spin::ScriptSpinner;

/// Environment facts used when synthesizing metadata for spun scripts.
#[derive(Debug, Clone)]
pub struct SessionFacts {
    /// Current user identity
    pub user: String,
    /// Current time
    pub now: DateTime<Local>,
}

impl SessionFacts {
    pub fn new(user: impl Into<String>, now: DateTime<Local>) -> Self {
        Self {
            user: user.into(),
            now,
        }
    }

    /// Read the facts from the running system.
    pub fn current(runtime: &dyn SystemRuntime) -> Self {
        Self {
            user: runtime
                .current_user()
                .unwrap_or_else(|| "unknown".to_string()),
            now: Local::now(),
        }
    }

    /// Date string written into synthesized front matter.
    pub fn date_string(&self) -> String {
        self.now.format("%a %b %d %H:%M:%S %Y").to_string()
    }
}

/// Kind of input document, decided by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// Prose with executable code chunks (`.Rmd`, `.Rmarkdown`)
    Literate,
    /// Plain markdown or text, never woven
    PlainText,
    /// A bare script, spun into a literate document
    Script,
}

impl InputKind {
    pub fn from_path(path: &Path) -> Self {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        match ext {
            "Rmd" | "rmd" | "Rmarkdown" | "rmarkdown" => InputKind::Literate,
            "md" | "markdown" | "txt" => InputKind::PlainText,
            _ => InputKind::Script,
        }
    }

    /// Whether the weaving engine runs for this input.
    pub fn is_woven(&self) -> bool {
        !matches!(self, InputKind::PlainText)
    }
}

/// The normalized view of one render's input.
#[derive(Debug, Clone)]
pub struct NormalizedInput {
    /// The input path as given, made absolute
    pub original: PathBuf,
    /// The file the rest of the pipeline reads
    pub path: PathBuf,
    /// Directory every relative path resolves against
    pub base_dir: PathBuf,
    /// Kind of the original input
    pub kind: InputKind,
    /// Stem used to name outputs, `_files` and `_cache` directories
    pub output_stem: String,
}

impl NormalizedInput {
    /// Kind of the working file (spun scripts are literate).
    pub fn working_kind(&self) -> InputKind {
        match self.kind {
            InputKind::Script => InputKind::Literate,
            other => other,
        }
    }
}

/// Decode raw input bytes to canonical text.
///
/// Supports UTF-8 (a leading byte-order mark is removed) and Latin-1.
/// Line endings are normalized to `\n`.
pub fn decode_text(bytes: &[u8], encoding: &str) -> Result<String> {
    let normalized: String = encoding
        .chars()
        .filter(|c| !matches!(c, '-' | '_'))
        .flat_map(char::to_lowercase)
        .collect();

    let text = match normalized.as_str() {
        "utf8" | "nativeenc" => {
            let text = std::str::from_utf8(bytes).map_err(|e| {
                RenderError::configuration(format!("Input is not valid UTF-8: {}", e))
            })?;
            text.strip_prefix('\u{feff}').unwrap_or(text).to_string()
        }
        "latin1" | "iso88591" => bytes.iter().map(|&b| char::from(b)).collect(),
        _ => {
            return Err(RenderError::configuration(format!(
                "Unsupported input encoding: {}",
                encoding
            )));
        }
    };

    Ok(text.replace("\r\n", "\n"))
}

/// Replace each run of whitespace in a file name with `-`.
pub fn whitespace_free_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_space = false;
    for c in name.chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push('-');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}

/// Resolve `path` against `base` unless it is already absolute.
pub(crate) fn absolutize(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Normalizes render inputs.
pub struct InputNormalizer<'a> {
    runtime: &'a dyn SystemRuntime,
    spinner: &'a dyn ScriptSpinner,
    facts: &'a SessionFacts,
}

impl<'a> InputNormalizer<'a> {
    pub fn new(
        runtime: &'a dyn SystemRuntime,
        spinner: &'a dyn ScriptSpinner,
        facts: &'a SessionFacts,
    ) -> Self {
        Self {
            runtime,
            spinner,
            facts,
        }
    }

    /// Normalize `input`, registering every file created in `intermediates`.
    pub fn normalize(
        &self,
        input: &Path,
        intermediates_dir: Option<&Path>,
        encoding: &str,
        intermediates: &mut IntermediateSet,
    ) -> Result<NormalizedInput> {
        let cwd = self.runtime.cwd()?;
        let original = absolutize(&cwd, input);
        if !self.runtime.is_file(&original)? {
            return Err(RenderError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("Input file not found: {}", original.display()),
            )));
        }

        let base_dir = original
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| cwd.clone());
        let kind = InputKind::from_path(&original);
        let file_name = original
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                RenderError::configuration(format!(
                    "Input file name is not valid UTF-8: {}",
                    original.display()
                ))
            })?
            .to_string();

        let mut path = original.clone();
        if file_name.chars().any(char::is_whitespace) {
            let target_dir = match intermediates_dir {
                Some(dir) => absolutize(&cwd, dir),
                None => base_dir.clone(),
            };
            let target = target_dir.join(whitespace_free_name(&file_name));
            if self.runtime.path_exists(&target, None)? {
                return Err(RenderError::NameCollision { path: target });
            }
            if !self.runtime.is_dir(&target_dir)? {
                self.runtime.dir_create(&target_dir, true)?;
            }
            self.runtime.file_copy(&original, &target)?;
            intermediates.register(&target);
            debug!(
                "copied {} to whitespace-free {}",
                original.display(),
                target.display()
            );
            path = target;
        }

        let output_stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("output")
            .to_string();

        if kind == InputKind::Script {
            let bytes = self.runtime.file_read(&path)?;
            let script = decode_text(&bytes, encoding)?;
            let spun = self.spinner.spin(&script);
            let literate = self.with_synthesized_front_matter(&spun, &file_name)?;

            let spun_path = path.with_file_name(format!("{}.spin.Rmd", output_stem));
            if self.runtime.path_exists(&spun_path, None)? {
                return Err(RenderError::NameCollision { path: spun_path });
            }
            intermediates.write_file(&spun_path, literate.as_bytes())?;
            debug!("spun {} into {}", path.display(), spun_path.display());
            path = spun_path;
        }

        Ok(NormalizedInput {
            original,
            path,
            base_dir,
            kind,
            output_stem,
        })
    }

    /// Prepend title/author/date for keys the spun text does not declare.
    fn with_synthesized_front_matter(&self, spun: &str, file_name: &str) -> Result<String> {
        let front = partition_front_matter(spun);
        let declared: Mapping = match front.yaml {
            Some(yaml) => match serde_yaml::from_str::<YamlValue>(yaml)
                .map_err(|e| RenderError::Metadata(e.to_string()))?
            {
                YamlValue::Mapping(map) => map,
                _ => Mapping::new(),
            },
            None => Mapping::new(),
        };

        let synthesized = [
            ("title", file_name.to_string()),
            ("author", self.facts.user.clone()),
            ("date", self.facts.date_string()),
        ];

        let mut merged = Mapping::new();
        for (key, value) in synthesized {
            let key = YamlValue::String(key.to_string());
            if !declared.contains_key(&key) {
                merged.insert(key, YamlValue::String(value));
            }
        }
        merged.extend(declared);

        let yaml = serde_yaml::to_string(&merged).map_err(|e| RenderError::Metadata(e.to_string()))?;
        Ok(format!("---\n{}---\n{}", yaml, front.body))
    }
}
