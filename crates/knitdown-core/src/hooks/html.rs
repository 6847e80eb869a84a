/*
 * hooks/html.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Staging of HTML dependencies before conversion.
 */

use std::path::{Component, Path, PathBuf};

use tracing::debug;

use super::{PreProcessContext, PreProcessor};
use crate::error::Result;
use crate::intermediates::IntermediateSet;
use crate::supporting::materialize_supporting_files;

/// Copies HTML dependencies into `{stem}_files/` and hands the converter a
/// header fragment linking them.
#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlDependencyPreProcessor;

/// Link from a document in `base` to `target`, with `/` separators.
///
/// `..` segments climb out of `base` when `target` is not below it. Paths
/// with no common root are linked absolutely.
fn link_path(base: &Path, target: &Path) -> String {
    let base: Vec<Component<'_>> = base.components().collect();
    let target_parts: Vec<Component<'_>> = target.components().collect();
    let common = base
        .iter()
        .zip(&target_parts)
        .take_while(|(a, b)| a == b)
        .count();
    if common == 0 {
        return target.display().to_string();
    }

    let mut segments: Vec<String> =
        std::iter::repeat_n("..".to_string(), base.len() - common).collect();
    segments.extend(
        target_parts[common..]
            .iter()
            .map(|c| c.as_os_str().to_string_lossy().into_owned()),
    );
    segments.join("/")
}

impl PreProcessor for HtmlDependencyPreProcessor {
    fn name(&self) -> &str {
        "html-dependencies"
    }

    fn pre_process(
        &self,
        ctx: &PreProcessContext<'_>,
        intermediates: &mut IntermediateSet,
    ) -> Result<Vec<String>> {
        let dependencies = &ctx.dependencies.html_dependencies;
        if dependencies.is_empty() {
            return Ok(Vec::new());
        }

        let mut header = String::new();
        for dep in dependencies {
            let staged = materialize_supporting_files(
                ctx.runtime,
                &dep.src,
                ctx.files_dir,
                Some(&dep.staged_name()),
            )?;
            let href = link_path(ctx.output_dir, &staged);
            for stylesheet in &dep.stylesheets {
                header.push_str(&format!(
                    "<link href=\"{}/{}\" rel=\"stylesheet\" />\n",
                    href, stylesheet
                ));
            }
            for script in &dep.scripts {
                header.push_str(&format!("<script src=\"{}/{}\"></script>\n", href, script));
            }
        }

        let header_path: PathBuf = ctx.woven_path.with_extension("header.html");
        intermediates.write_file(&header_path, header.as_bytes())?;
        debug!(
            "staged {} html dependencies, header at {}",
            dependencies.len(),
            header_path.display()
        );

        Ok(vec![
            "--include-in-header".to_string(),
            header_path.display().to_string(),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::Metadata;
    use crate::weave::{DependencyMetadata, HtmlDependency, RuntimeMode};
    use knitdown_system_runtime::NativeRuntime;
    use std::fs;

    #[test]
    fn test_no_dependencies_no_args() {
        let temp = tempfile::tempdir().unwrap();
        let deps = DependencyMetadata::default();
        let meta = Metadata::default();
        let ctx = PreProcessContext {
            runtime: &NativeRuntime,
            metadata: &meta,
            woven_path: &temp.path().join("doc.knit.md"),
            runtime_mode: RuntimeMode::Static,
            dependencies: &deps,
            files_dir: &temp.path().join("doc_files"),
            output_dir: temp.path(),
        };
        let mut set = IntermediateSet::new(&NativeRuntime, false);

        let args = HtmlDependencyPreProcessor.pre_process(&ctx, &mut set).unwrap();
        assert!(args.is_empty());
        assert!(!temp.path().join("doc_files").exists());
    }

    #[test]
    fn test_dependencies_are_staged_and_linked() {
        let temp = tempfile::tempdir().unwrap();
        let src = temp.path().join("lib").join("d3");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("d3.min.js"), "js").unwrap();
        fs::write(src.join("d3.css"), "css").unwrap();

        let deps = DependencyMetadata {
            html_dependencies: vec![HtmlDependency {
                name: "d3".into(),
                version: "7.0".into(),
                src,
                stylesheets: vec!["d3.css".into()],
                scripts: vec!["d3.min.js".into()],
            }],
            ..Default::default()
        };
        let meta = Metadata::default();
        let woven = temp.path().join("doc.knit.md");
        let files_dir = temp.path().join("doc_files");
        let ctx = PreProcessContext {
            runtime: &NativeRuntime,
            metadata: &meta,
            woven_path: &woven,
            runtime_mode: RuntimeMode::Static,
            dependencies: &deps,
            files_dir: &files_dir,
            output_dir: temp.path(),
        };
        let mut set = IntermediateSet::new(&NativeRuntime, false);

        let args = HtmlDependencyPreProcessor.pre_process(&ctx, &mut set).unwrap();

        assert_eq!(args[0], "--include-in-header");
        let header_path = PathBuf::from(&args[1]);
        assert!(set.contains(&header_path));
        let header = fs::read_to_string(&header_path).unwrap();
        assert!(header.contains("<link href=\"doc_files/d3-7.0/d3.css\" rel=\"stylesheet\" />"));
        assert!(header.contains("<script src=\"doc_files/d3-7.0/d3.min.js\"></script>"));
        assert!(files_dir.join("d3-7.0/d3.min.js").is_file());
    }

    #[test]
    fn test_link_path() {
        assert_eq!(
            link_path(Path::new("/project"), Path::new("/project/doc_files/d3-7.0")),
            "doc_files/d3-7.0"
        );
        assert_eq!(
            link_path(Path::new("/project/out"), Path::new("/project/doc_files/d3-7.0")),
            "../doc_files/d3-7.0"
        );
        assert_eq!(link_path(Path::new("/a/b/c"), Path::new("/a/x")), "../../x");
    }

    #[test]
    fn test_links_are_relative_to_a_separate_output_dir() {
        let temp = tempfile::tempdir().unwrap();
        let src = temp.path().join("lib").join("d3");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("d3.min.js"), "js").unwrap();

        let deps = DependencyMetadata {
            html_dependencies: vec![HtmlDependency {
                name: "d3".into(),
                version: "7.0".into(),
                src,
                stylesheets: Vec::new(),
                scripts: vec!["d3.min.js".into()],
            }],
            ..Default::default()
        };
        let meta = Metadata::default();
        let doc_dir = temp.path().join("doc");
        let output_dir = temp.path().join("site");
        fs::create_dir_all(&doc_dir).unwrap();
        fs::create_dir_all(&output_dir).unwrap();
        let woven = doc_dir.join("doc.knit.md");
        let files_dir = doc_dir.join("page_files");
        let ctx = PreProcessContext {
            runtime: &NativeRuntime,
            metadata: &meta,
            woven_path: &woven,
            runtime_mode: RuntimeMode::Static,
            dependencies: &deps,
            files_dir: &files_dir,
            output_dir: &output_dir,
        };
        let mut set = IntermediateSet::new(&NativeRuntime, false);

        let args = HtmlDependencyPreProcessor.pre_process(&ctx, &mut set).unwrap();

        let header = fs::read_to_string(&args[1]).unwrap();
        assert!(header.contains("<script src=\"../doc/page_files/d3-7.0/d3.min.js\"></script>"));
        assert!(!header.contains(temp.path().to_str().unwrap()));
    }

    #[test]
    fn test_existing_header_file_is_not_tracked() {
        let temp = tempfile::tempdir().unwrap();
        let src = temp.path().join("lib");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("a.js"), "js").unwrap();
        let header_path = temp.path().join("doc.knit.header.html");
        fs::write(&header_path, "user header").unwrap();

        let deps = DependencyMetadata {
            html_dependencies: vec![HtmlDependency {
                name: "a".into(),
                version: "1".into(),
                src,
                stylesheets: Vec::new(),
                scripts: vec!["a.js".into()],
            }],
            ..Default::default()
        };
        let meta = Metadata::default();
        let woven = temp.path().join("doc.knit.md");
        let files_dir = temp.path().join("doc_files");
        let ctx = PreProcessContext {
            runtime: &NativeRuntime,
            metadata: &meta,
            woven_path: &woven,
            runtime_mode: RuntimeMode::Static,
            dependencies: &deps,
            files_dir: &files_dir,
            output_dir: temp.path(),
        };
        {
            let mut set = IntermediateSet::new(&NativeRuntime, true);
            HtmlDependencyPreProcessor.pre_process(&ctx, &mut set).unwrap();
            assert!(!set.contains(&header_path));
        }
        assert!(header_path.exists());
    }
}
