/*
 * error.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Error types for knitdown-core.
 */

//! Error types for knitdown-core

use std::path::PathBuf;

use knitdown_system_runtime::RuntimeError;
use thiserror::Error;

use crate::convert::ConversionError;
use crate::weave::WeaveError;

/// The two ways woven content can be incompatible with a non-HTML target.
///
/// They are checked in declaration order and reported separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompatibilityKind {
    /// The weaving engine produced content that only renders in HTML.
    HtmlContentNonHtmlTarget,
    /// An interactive runtime was requested for a static target.
    NonStaticRuntimeNonHtmlTarget,
}

impl CompatibilityKind {
    /// Stable diagnostic key for this incompatibility.
    pub fn as_str(&self) -> &'static str {
        match self {
            CompatibilityKind::HtmlContentNonHtmlTarget => "html-content-non-html-target",
            CompatibilityKind::NonStaticRuntimeNonHtmlTarget => {
                "non-static-runtime-non-html-target"
            }
        }
    }

    /// Human-readable explanation shown after the key.
    pub fn explanation(&self) -> &'static str {
        match self {
            CompatibilityKind::HtmlContentNonHtmlTarget => {
                "functions that produce HTML output were found in the document \
                 but the target format is not HTML"
            }
            CompatibilityKind::NonStaticRuntimeNonHtmlTarget => {
                "documents with an interactive runtime can only be rendered to HTML"
            }
        }
    }
}

impl std::fmt::Display for CompatibilityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum RenderError {
    /// Missing or under-versioned converter, unknown format, unsupported encoding.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Cannot copy input to {}: file already exists", .path.display())]
    NameCollision { path: PathBuf },

    #[error("{kind}: {}", .kind.explanation())]
    Compatibility { kind: CompatibilityKind },

    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error(transparent)]
    Weave(#[from] WeaveError),

    #[error("Invalid front matter: {0}")]
    Metadata(String),

    #[error("Post-processing failed: {0}")]
    PostProcess(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Runtime(#[from] RuntimeError),
}

impl RenderError {
    /// Create a configuration error from any message.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a compatibility error.
    pub fn compatibility(kind: CompatibilityKind) -> Self {
        Self::Compatibility { kind }
    }

    /// The compatibility kind, when this is a compatibility error.
    pub fn compatibility_kind(&self) -> Option<CompatibilityKind> {
        match self {
            Self::Compatibility { kind } => Some(*kind),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, RenderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compatibility_display_starts_with_key() {
        let err = RenderError::compatibility(CompatibilityKind::HtmlContentNonHtmlTarget);
        assert!(err.to_string().starts_with("html-content-non-html-target"));

        let err = RenderError::compatibility(CompatibilityKind::NonStaticRuntimeNonHtmlTarget);
        assert!(
            err.to_string()
                .starts_with("non-static-runtime-non-html-target")
        );
    }

    #[test]
    fn test_compatibility_kind_accessor() {
        let err = RenderError::compatibility(CompatibilityKind::HtmlContentNonHtmlTarget);
        assert_eq!(
            err.compatibility_kind(),
            Some(CompatibilityKind::HtmlContentNonHtmlTarget)
        );
        assert!(RenderError::configuration("x").compatibility_kind().is_none());
    }

    #[test]
    fn test_name_collision_mentions_path() {
        let err = RenderError::NameCollision {
            path: PathBuf::from("/tmp/my-doc.Rmd"),
        };
        assert!(err.to_string().contains("/tmp/my-doc.Rmd"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: RenderError = io_err.into();
        assert!(matches!(err, RenderError::Io(_)));
    }
}
