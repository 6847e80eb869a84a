/*
 * hooks/markdown.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Front matter preservation for markdown outputs.
 */

use std::path::PathBuf;

use super::{PostProcessContext, PostProcessor};
use crate::error::{RenderError, Result};

/// Writes the document's front matter back on top of a markdown output.
#[derive(Debug, Default, Clone, Copy)]
pub struct PreserveYamlPostProcessor;

impl PostProcessor for PreserveYamlPostProcessor {
    fn name(&self) -> &str {
        "preserve-yaml"
    }

    fn post_process(&self, ctx: &PostProcessContext<'_>) -> Result<PathBuf> {
        if ctx.metadata.fields.is_empty() {
            return Ok(ctx.output_path.to_path_buf());
        }

        let yaml = serde_yaml::to_string(&ctx.metadata.fields)
            .map_err(|e| RenderError::PostProcess(e.to_string()))?;
        let body = ctx.runtime.file_read_string(ctx.output_path)?;
        let content = format!("---\n{}---\n\n{}", yaml, body);
        ctx.runtime
            .file_write(ctx.output_path, content.as_bytes())?;

        Ok(ctx.output_path.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::Metadata;
    use knitdown_system_runtime::NativeRuntime;
    use std::fs;

    #[test]
    fn test_front_matter_prepended() {
        let temp = tempfile::tempdir().unwrap();
        let output = temp.path().join("doc.md");
        fs::write(&output, "Body\n").unwrap();
        let meta = Metadata::from_text("---\ntitle: Kept\n---\n").unwrap();

        let ctx = PostProcessContext {
            runtime: &NativeRuntime,
            metadata: &meta,
            woven_path: &temp.path().join("doc.knit.md"),
            output_path: &output,
            clean: true,
            quiet: true,
        };
        let result = PreserveYamlPostProcessor.post_process(&ctx).unwrap();

        assert_eq!(result, output);
        assert_eq!(
            fs::read_to_string(&output).unwrap(),
            "---\ntitle: Kept\n---\n\nBody\n"
        );
    }

    #[test]
    fn test_no_front_matter_leaves_output() {
        let temp = tempfile::tempdir().unwrap();
        let output = temp.path().join("doc.md");
        fs::write(&output, "Body\n").unwrap();
        let meta = Metadata::default();

        let ctx = PostProcessContext {
            runtime: &NativeRuntime,
            metadata: &meta,
            woven_path: &temp.path().join("doc.knit.md"),
            output_path: &output,
            clean: true,
            quiet: true,
        };
        PreserveYamlPostProcessor.post_process(&ctx).unwrap();

        assert_eq!(fs::read_to_string(&output).unwrap(), "Body\n");
    }
}
