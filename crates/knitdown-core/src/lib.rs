//! Core rendering pipeline for knitdown
//!
//! This crate turns a literate source document (prose, executable code
//! chunks and YAML front matter) into a finished output document by
//! coordinating a weaving engine and a format converter.
//!
//! # Architecture
//!
//! The render pipeline is organized around these key types:
//!
//! - [`Renderer`] - Drives render passes for a [`RenderRequest`]
//! - [`IntermediateSet`] - Files created during one pass, deleted when it ends
//! - [`InputNormalizer`] - Whitespace-free input names and script spinning
//! - [`OutputFormat`] - A fully resolved output target, built by [`FormatRegistry`]
//! - [`WeaveOrchestrator`] - Runs a [`WeaveEngine`] under a scoped [`WeaveConfig`]
//! - [`PreProcessor`] / [`PostProcessor`] - Hooks carried by output formats
//! - [`Converter`] - Converts woven text to the target representation
//!
//! # Example
//!
//! ```ignore
//! use knitdown_core::{FormatRequest, KnitrEngine, PandocConverter, RenderRequest, Renderer};
//! use knitdown_system_runtime::NativeRuntime;
//!
//! let runtime = NativeRuntime::new();
//! let engine = KnitrEngine::discover(&runtime);
//! let pandoc = PandocConverter::discover(&runtime);
//!
//! let mut renderer = Renderer::new(&runtime, &engine, &pandoc);
//! let request = RenderRequest::new("report.Rmd")
//!     .with_format(FormatRequest::Named("html_document".into()));
//! let output = renderer.render(&request)?;
//! ```

pub mod convert;
pub mod error;
pub mod format;
pub mod hooks;
pub mod intermediates;
pub mod metadata;
pub mod normalize;
pub mod render;
pub mod resolve;
pub mod spin;
pub mod supporting;
pub mod weave;

// Re-export commonly used types
pub use convert::{
    ConversionError, ConversionRequest, Converter, ConverterVersion, IdentityConverter,
    MIN_PANDOC_VERSION, PandocConverter,
};
pub use error::{CompatibilityKind, RenderError, Result};
pub use format::{AuxiliaryTarget, FormatFlags, FormatOptions, FormatRegistry, OutputFormat};
pub use hooks::{
    HtmlDependencyPreProcessor, PostProcessContext, PostProcessor, PreProcessContext,
    PreProcessor, PreserveYamlPostProcessor,
};
pub use intermediates::IntermediateSet;
pub use metadata::{DeclaredFormat, Metadata, partition_front_matter};
pub use normalize::{InputKind, InputNormalizer, NormalizedInput, SessionFacts};
pub use render::{
    FormatRequest, RenderOutput, RenderPass, RenderRequest, RenderStage, Renderer,
};
pub use spin::{RoxygenSpinner, ScriptSpinner};
pub use supporting::materialize_supporting_files;
pub use weave::{
    DependencyMetadata, ExecutionEnv, HtmlDependency, KnitrEngine, PassthroughEngine,
    RuntimeMode, WeaveConfig, WeaveEngine, WeaveError, WeaveOrchestrator,
};
