/*
 * convert/mod.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Conversion of woven text into the target representation.
 */

//! Format conversion.
//!
//! A [`Converter`] turns the woven (or normalized) text into the output
//! representation named by a format's `to` identifier. The render
//! coordinator builds one [`ConversionRequest`] per invocation; it may invoke
//! the converter twice when the format asks for an auxiliary representation.
//!
//! - [`PandocConverter`] - runs the `pandoc` binary
//! - [`IdentityConverter`] - copies the input text to the output path

pub mod error;
pub mod identity;
pub mod pandoc;

use std::cmp::Ordering;
use std::fmt;
use std::path::Path;

use knitdown_system_runtime::SystemRuntime;

pub use error::ConversionError;
pub use identity::IdentityConverter;
pub use pandoc::PandocConverter;

/// Oldest pandoc release with built-in citation processing.
pub const MIN_PANDOC_VERSION: ConverterVersion = ConverterVersion::new(2, 11, 0);

/// A dotted converter version (`major.minor.patch`; missing parts are zero).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConverterVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl ConverterVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse the first dotted number in `text`, e.g. `pandoc 3.1.11.1`.
    pub fn parse(text: &str) -> Option<Self> {
        let token = text
            .split_whitespace()
            .find(|t| t.starts_with(|c: char| c.is_ascii_digit()))?;
        let mut parts = token
            .split(|c: char| !c.is_ascii_digit())
            .filter(|p| !p.is_empty())
            .map(|p| p.parse::<u32>());
        let major = parts.next()?.ok()?;
        let minor = parts.next().transpose().ok()?.unwrap_or(0);
        let patch = parts.next().transpose().ok()?.unwrap_or(0);
        Some(Self::new(major, minor, patch))
    }
}

impl PartialOrd for ConverterVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ConverterVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch).cmp(&(other.major, other.minor, other.patch))
    }
}

impl fmt::Display for ConverterVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// One converter invocation.
pub struct ConversionRequest<'a> {
    pub runtime: &'a dyn SystemRuntime,
    /// Text file to convert
    pub input: &'a Path,
    /// File to produce
    pub output: &'a Path,
    pub from: &'a str,
    pub to: &'a str,
    /// Format arguments followed by pre-processor arguments
    pub args: &'a [String],
    /// Run citation processing
    pub citeproc: bool,
    /// Bibliography files forwarded to the converter
    pub bibliography: &'a [String],
    /// Working directory of the converter process
    pub cwd: &'a Path,
}

/// Converts text between representations.
pub trait Converter: Send + Sync {
    fn name(&self) -> &str;

    /// Version of the converter, used for the capability precondition.
    fn version(&self, runtime: &dyn SystemRuntime) -> Result<ConverterVersion, ConversionError>;

    /// Minimum version the pipeline requires.
    fn min_version(&self) -> ConverterVersion {
        MIN_PANDOC_VERSION
    }

    /// Produce `request.output`.
    fn convert(&self, request: &ConversionRequest<'_>) -> Result<(), ConversionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_version() {
        assert_eq!(
            ConverterVersion::parse("pandoc 3.1.11.1\nFeatures: +server"),
            Some(ConverterVersion::new(3, 1, 11))
        );
        assert_eq!(
            ConverterVersion::parse("pandoc.exe 2.11"),
            Some(ConverterVersion::new(2, 11, 0))
        );
        assert_eq!(ConverterVersion::parse("no digits here"), None);
    }

    #[test]
    fn test_version_ordering() {
        assert!(ConverterVersion::new(2, 10, 1) < MIN_PANDOC_VERSION);
        assert!(ConverterVersion::new(2, 11, 0) >= MIN_PANDOC_VERSION);
        assert!(ConverterVersion::new(3, 0, 0) > MIN_PANDOC_VERSION);
        assert_eq!(MIN_PANDOC_VERSION.to_string(), "2.11.0");
    }
}
