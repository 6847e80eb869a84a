/*
 * format.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Output format types and the built-in format registry.
 */

//! Output format specification.
//!
//! An [`OutputFormat`] is the fully resolved description of one render
//! target:
//! - The converter's `to`/`from` identifiers and output extension
//! - Converter arguments
//! - Weaving option overrides
//! - Optional pre/post processing hooks
//! - Output flags ([`FormatFlags`])
//!
//! [`FormatRegistry`] builds the built-in formats from their option maps.

use std::collections::BTreeMap;
use std::sync::Arc;

use knitdown_system_runtime::SystemRuntime;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::{RenderError, Result};
use crate::hooks::{
    HtmlDependencyPreProcessor, PostProcessor, PreProcessor, PreserveYamlPostProcessor,
};
use crate::weave::WeaveConfig;

/// Reader extensions used for literate documents.
pub const DEFAULT_FROM: &str = "markdown+autolink_bare_uris+tex_math_single_backslash";

/// Format used when neither the caller nor the document names one.
pub const DEFAULT_FORMAT: &str = "html_document";

/// Environment variable overriding the default LaTeX engine.
pub const LATEX_ENGINE_ENV_VAR: &str = "KNITDOWN_LATEX_ENGINE";

/// Conversion target of the identity format.
pub const IDENTITY_TARGET: &str = "identity";

/// Check if a converter target produces HTML.
///
/// Reader/writer extensions (`html5+smart`) are ignored.
pub fn is_html_target(to: &str) -> bool {
    let base = to.split(['+', '-']).next().unwrap_or(to);
    base.starts_with("html")
        || base.starts_with("epub")
        || matches!(base, "revealjs" | "s5" | "slidy" | "slideous" | "dzslides")
}

/// Extra representation produced by a first conversion pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuxiliaryTarget {
    /// Converter target for the extra pass
    pub to: String,
    /// Extension of the sibling file it produces
    pub extension: String,
}

impl AuxiliaryTarget {
    pub fn new(to: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            extension: extension.into(),
        }
    }
}

/// Output flags of a format.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormatFlags {
    /// Keep the auxiliary source (e.g. `.tex`) next to the output
    pub keep_intermediate_source: bool,
    /// Keep a plain markdown sibling of the woven text
    pub keep_woven: bool,
    /// Delete a newly created `{stem}_files` directory after the render
    pub clean_supporting: bool,
    /// Run the converter once for this target before the real conversion
    pub auxiliary: Option<AuxiliaryTarget>,
}

/// A fully resolved output format.
#[derive(Clone)]
pub struct OutputFormat {
    /// Format name, e.g. `html_document`
    pub name: String,
    /// Converter target identifier
    pub to: String,
    /// Converter source identifier
    pub from: String,
    /// Output file extension (without leading dot)
    pub extension: String,
    /// Converter arguments
    pub args: Vec<String>,
    /// Weaving options layered over the engine defaults
    pub weave: WeaveConfig,
    pub pre_processor: Option<Arc<dyn PreProcessor>>,
    pub post_processor: Option<Arc<dyn PostProcessor>>,
    pub flags: FormatFlags,
}

impl std::fmt::Debug for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputFormat")
            .field("name", &self.name)
            .field("to", &self.to)
            .field("from", &self.from)
            .field("extension", &self.extension)
            .field("args", &self.args)
            .field("weave", &self.weave)
            .field("pre_processor", &self.pre_processor.as_ref().map(|p| p.name()))
            .field(
                "post_processor",
                &self.post_processor.as_ref().map(|p| p.name()),
            )
            .field("flags", &self.flags)
            .finish()
    }
}

impl OutputFormat {
    /// Create a format with no arguments, hooks or flags.
    pub fn new(name: impl Into<String>, to: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            to: to.into(),
            from: DEFAULT_FROM.to_string(),
            extension: extension.into(),
            args: Vec::new(),
            weave: WeaveConfig::new(),
            pre_processor: None,
            post_processor: None,
            flags: FormatFlags::default(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn with_flags(mut self, flags: FormatFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_pre_processor(mut self, processor: Arc<dyn PreProcessor>) -> Self {
        self.pre_processor = Some(processor);
        self
    }

    pub fn with_post_processor(mut self, processor: Arc<dyn PostProcessor>) -> Self {
        self.post_processor = Some(processor);
        self
    }

    /// Whether the converter target produces HTML.
    pub fn is_html(&self) -> bool {
        is_html_target(&self.to)
    }

    /// Whether conversion is a plain copy.
    pub fn is_identity(&self) -> bool {
        self.to == IDENTITY_TARGET
    }
}

/// Options understood by the built-in formats.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FormatOptions {
    pub toc: bool,
    pub number_sections: bool,
    pub self_contained: Option<bool>,
    pub keep_md: bool,
    pub keep_tex: bool,
    pub latex_engine: Option<String>,
    pub fig_width: Option<f64>,
    pub fig_height: Option<f64>,
    #[serde(deserialize_with = "one_or_many")]
    pub css: Vec<String>,
    #[serde(deserialize_with = "one_or_many")]
    pub pandoc_args: Vec<String>,
    pub variant: Option<String>,
    pub preserve_yaml: bool,
}

impl FormatOptions {
    /// Parse options from a JSON object (`null` means defaults).
    pub fn from_value(value: &Value) -> Result<Self> {
        if value.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(value.clone())
            .map_err(|e| RenderError::configuration(format!("Invalid format options: {}", e)))
    }
}

fn one_or_many<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(s)) => vec![s],
        Some(OneOrMany::Many(v)) => v,
    })
}

type Builder = fn(&FormatRegistry, &FormatOptions) -> OutputFormat;

/// The built-in output formats.
#[derive(Debug, Clone)]
pub struct FormatRegistry {
    default_latex_engine: String,
    builders: BTreeMap<&'static str, Builder>,
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FormatRegistry {
    pub fn new() -> Self {
        let mut builders: BTreeMap<&'static str, Builder> = BTreeMap::new();
        builders.insert("html_document", Self::html_document);
        builders.insert("pdf_document", Self::pdf_document);
        builders.insert("latex_document", Self::latex_document);
        builders.insert("word_document", Self::word_document);
        builders.insert("md_document", Self::md_document);
        builders.insert("github_document", Self::github_document);
        builders.insert("identity", Self::identity);
        Self {
            default_latex_engine: "pdflatex".to_string(),
            builders,
        }
    }

    /// Registry whose default LaTeX engine comes from `KNITDOWN_LATEX_ENGINE`.
    pub fn from_env(runtime: &dyn SystemRuntime) -> Self {
        let mut registry = Self::new();
        if let Ok(Some(engine)) = runtime.env_get(LATEX_ENGINE_ENV_VAR)
            && !engine.trim().is_empty()
        {
            registry.default_latex_engine = engine.trim().to_string();
        }
        registry
    }

    /// Names of the available formats.
    pub fn names(&self) -> Vec<&'static str> {
        self.builders.keys().copied().collect()
    }

    /// Whether `name` (optionally `rmarkdown::`-qualified) is a known format.
    pub fn contains(&self, name: &str) -> bool {
        self.builders.contains_key(Self::unqualified(name))
    }

    fn unqualified(name: &str) -> &str {
        name.rsplit("::").next().unwrap_or(name)
    }

    /// Build the named format from its option map.
    pub fn resolve(&self, name: &str, options: &Value) -> Result<OutputFormat> {
        let builder = self.builders.get(Self::unqualified(name)).ok_or_else(|| {
            RenderError::configuration(format!(
                "Unknown output format '{}' (available: {})",
                name,
                self.names().join(", ")
            ))
        })?;
        let options = FormatOptions::from_value(options)?;
        Ok(builder(self, &options))
    }

    fn common_args(options: &FormatOptions) -> Vec<String> {
        let mut args = Vec::new();
        if options.toc {
            args.push("--toc".to_string());
        }
        if options.number_sections {
            args.push("--number-sections".to_string());
        }
        args
    }

    fn weave_defaults(dev: &str, width: f64, height: f64, options: &FormatOptions) -> WeaveConfig {
        let mut weave = WeaveConfig::new();
        weave.set_chunk("dev", dev);
        weave.set_chunk("fig.width", options.fig_width.unwrap_or(width));
        weave.set_chunk("fig.height", options.fig_height.unwrap_or(height));
        weave
            .knit_hooks
            .insert("render".to_string(), "markdown".to_string());
        weave
    }

    fn html_document(&self, options: &FormatOptions) -> OutputFormat {
        let self_contained = options.self_contained.unwrap_or(true);
        let mut args = vec!["--standalone".to_string(), "--section-divs".to_string()];
        args.extend(Self::common_args(options));
        if self_contained {
            args.push("--self-contained".to_string());
        }
        for css in &options.css {
            args.push("--css".to_string());
            args.push(css.clone());
        }
        args.extend(options.pandoc_args.iter().cloned());

        let mut format = OutputFormat::new("html_document", "html", "html")
            .with_args(args)
            .with_pre_processor(Arc::new(HtmlDependencyPreProcessor))
            .with_flags(FormatFlags {
                keep_woven: options.keep_md,
                clean_supporting: self_contained,
                ..Default::default()
            });
        format.weave = Self::weave_defaults("png", 7.0, 5.0, options);
        format
    }

    fn pdf_document(&self, options: &FormatOptions) -> OutputFormat {
        let engine = options
            .latex_engine
            .clone()
            .unwrap_or_else(|| self.default_latex_engine.clone());
        let mut args = vec![
            "--standalone".to_string(),
            format!("--pdf-engine={}", engine),
        ];
        args.extend(Self::common_args(options));
        args.extend(options.pandoc_args.iter().cloned());

        let mut format = OutputFormat::new("pdf_document", "latex", "pdf")
            .with_args(args)
            .with_flags(FormatFlags {
                keep_intermediate_source: options.keep_tex,
                keep_woven: options.keep_md,
                clean_supporting: !options.keep_tex,
                auxiliary: options
                    .keep_tex
                    .then(|| AuxiliaryTarget::new("latex", "tex")),
            });
        format.weave = Self::weave_defaults("pdf", 6.5, 4.5, options);
        format
    }

    fn latex_document(&self, options: &FormatOptions) -> OutputFormat {
        let mut args = vec!["--standalone".to_string()];
        args.extend(Self::common_args(options));
        args.extend(options.pandoc_args.iter().cloned());

        let mut format = OutputFormat::new("latex_document", "latex", "tex")
            .with_args(args)
            .with_flags(FormatFlags {
                keep_woven: options.keep_md,
                ..Default::default()
            });
        format.weave = Self::weave_defaults("pdf", 6.5, 4.5, options);
        format
    }

    fn word_document(&self, options: &FormatOptions) -> OutputFormat {
        let mut args = Self::common_args(options);
        args.extend(options.pandoc_args.iter().cloned());

        let mut format = OutputFormat::new("word_document", "docx", "docx")
            .with_args(args)
            .with_flags(FormatFlags {
                keep_woven: options.keep_md,
                clean_supporting: true,
                ..Default::default()
            });
        format.weave = Self::weave_defaults("png", 5.0, 4.0, options);
        format
    }

    fn markdown_format(name: &str, to: &str, options: &FormatOptions) -> OutputFormat {
        let mut args = vec!["--standalone".to_string()];
        args.extend(Self::common_args(options));
        args.extend(options.pandoc_args.iter().cloned());

        let mut format = OutputFormat::new(name, to, "md")
            .with_args(args)
            .with_flags(FormatFlags::default());
        if options.preserve_yaml {
            format = format.with_post_processor(Arc::new(PreserveYamlPostProcessor));
        }
        format.weave = Self::weave_defaults("png", 7.0, 5.0, options);
        format
    }

    fn md_document(&self, options: &FormatOptions) -> OutputFormat {
        let variant = options.variant.as_deref().unwrap_or("markdown_strict");
        Self::markdown_format("md_document", variant, options)
    }

    fn github_document(&self, options: &FormatOptions) -> OutputFormat {
        Self::markdown_format("github_document", "gfm", options)
    }

    fn identity(&self, options: &FormatOptions) -> OutputFormat {
        OutputFormat::new("identity", IDENTITY_TARGET, "txt").with_flags(FormatFlags {
            keep_woven: options.keep_md,
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_is_html_target() {
        assert!(is_html_target("html"));
        assert!(is_html_target("html5+smart"));
        assert!(is_html_target("revealjs"));
        assert!(is_html_target("epub3"));
        assert!(!is_html_target("latex"));
        assert!(!is_html_target("docx"));
        assert!(!is_html_target("gfm"));
        assert!(!is_html_target("identity"));
    }

    #[test]
    fn test_html_document_defaults() {
        let format = FormatRegistry::new()
            .resolve("html_document", &json!({}))
            .unwrap();
        assert_eq!(format.to, "html");
        assert_eq!(format.extension, "html");
        assert!(format.is_html());
        assert!(format.args.contains(&"--self-contained".to_string()));
        assert!(format.pre_processor.is_some());
        assert!(format.post_processor.is_none());
        assert!(format.flags.clean_supporting);
        assert!(!format.flags.keep_woven);
    }

    #[test]
    fn test_html_document_options() {
        let format = FormatRegistry::new()
            .resolve(
                "rmarkdown::html_document",
                &json!({"toc": true, "self_contained": false, "css": "style.css", "keep_md": true}),
            )
            .unwrap();
        assert!(format.args.contains(&"--toc".to_string()));
        assert!(!format.args.contains(&"--self-contained".to_string()));
        let css = format.args.iter().position(|a| a == "--css").unwrap();
        assert_eq!(format.args[css + 1], "style.css");
        assert!(!format.flags.clean_supporting);
        assert!(format.flags.keep_woven);
    }

    #[test]
    fn test_pdf_document_keep_tex() {
        let registry = FormatRegistry::new();
        let format = registry.resolve("pdf_document", &json!({})).unwrap();
        assert_eq!(format.to, "latex");
        assert_eq!(format.extension, "pdf");
        assert!(format.args.contains(&"--pdf-engine=pdflatex".to_string()));
        assert!(format.flags.auxiliary.is_none());

        let format = registry
            .resolve(
                "pdf_document",
                &json!({"keep_tex": true, "latex_engine": "xelatex"}),
            )
            .unwrap();
        assert!(format.args.contains(&"--pdf-engine=xelatex".to_string()));
        assert_eq!(
            format.flags.auxiliary,
            Some(AuxiliaryTarget::new("latex", "tex"))
        );
        assert!(format.flags.keep_intermediate_source);
        assert!(!format.flags.clean_supporting);
    }

    #[test]
    fn test_md_document_variant_and_preserve_yaml() {
        let format = FormatRegistry::new()
            .resolve(
                "md_document",
                &json!({"variant": "commonmark", "preserve_yaml": true}),
            )
            .unwrap();
        assert_eq!(format.to, "commonmark");
        assert_eq!(format.extension, "md");
        assert!(format.post_processor.is_some());
    }

    #[test]
    fn test_fig_options_reach_weave_overrides() {
        let format = FormatRegistry::new()
            .resolve("word_document", &json!({"fig_width": 3.5}))
            .unwrap();
        assert_eq!(format.weave.opts_chunk["fig.width"], 3.5);
        assert_eq!(format.weave.opts_chunk["fig.height"], 4.0);
    }

    #[test]
    fn test_unknown_format() {
        let err = FormatRegistry::new()
            .resolve("powerpoint_deck", &json!({}))
            .unwrap_err();
        assert!(matches!(err, RenderError::Configuration(_)));
        assert!(err.to_string().contains("powerpoint_deck"));
    }

    #[test]
    fn test_invalid_option_type() {
        let err = FormatRegistry::new()
            .resolve("html_document", &json!({"toc": "yes please"}))
            .unwrap_err();
        assert!(matches!(err, RenderError::Configuration(_)));
    }

    #[test]
    fn test_identity_format() {
        let format = FormatRegistry::new()
            .resolve("identity", &Value::Null)
            .unwrap();
        assert!(format.is_identity());
        assert!(!format.is_html());
    }

    #[test]
    fn test_debug_shows_hook_names() {
        let format = FormatRegistry::new()
            .resolve("html_document", &json!({}))
            .unwrap();
        let debug = format!("{:?}", format);
        assert!(debug.contains("html-dependencies"));
    }
}
