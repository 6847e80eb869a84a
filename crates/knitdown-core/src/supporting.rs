/*
 * supporting.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Staging of auxiliary asset directories.
 */

//! Supporting-files materialization.
//!
//! Assets referenced by the rendered document (HTML dependency bundles,
//! figure directories) are copied into the `{stem}_files/` directory next to
//! the output, so links in the output stay valid when it is moved together
//! with that directory.
//!
//! ## Usage
//!
//! ```ignore
//! use knitdown_core::supporting::materialize_supporting_files;
//! use knitdown_system_runtime::NativeRuntime;
//!
//! let runtime = NativeRuntime::new();
//! let target = materialize_supporting_files(
//!     &runtime,
//!     Path::new("/lib/jquery-3.6.0"),
//!     Path::new("/out/report_files"),
//!     Some("jquery"),
//! )?;
//! // target == /out/report_files/jquery
//! ```

use std::path::{Path, PathBuf};

use knitdown_system_runtime::SystemRuntime;
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{RenderError, Result};

/// Copy `source_dir` into `files_dir`, optionally renaming it.
///
/// The copy happens only if neither `files_dir/<rename_to>` nor
/// `files_dir/<source base name>` exists yet, so repeated calls with the same
/// arguments copy once. Returns the final target path.
pub fn materialize_supporting_files(
    runtime: &dyn SystemRuntime,
    source_dir: &Path,
    files_dir: &Path,
    rename_to: Option<&str>,
) -> Result<PathBuf> {
    let staging_name = source_dir.file_name().ok_or_else(|| {
        RenderError::configuration(format!(
            "Supporting files source has no directory name: {}",
            source_dir.display()
        ))
    })?;

    if !runtime.is_dir(files_dir)? {
        runtime.dir_create(files_dir, true)?;
    }

    let staging = files_dir.join(staging_name);
    let target = match rename_to {
        Some(name) => files_dir.join(name),
        None => staging.clone(),
    };

    if runtime.path_exists(&target, None)? || runtime.path_exists(&staging, None)? {
        debug!("supporting files already present at {}", target.display());
        return Ok(target);
    }

    copy_dir_recursive(runtime, source_dir, &staging)?;
    if target != staging {
        runtime.path_rename(&staging, &target)?;
    }
    debug!(
        "materialized {} into {}",
        source_dir.display(),
        target.display()
    );

    Ok(target)
}

/// Recursively copy a directory tree.
fn copy_dir_recursive(runtime: &dyn SystemRuntime, src: &Path, dst: &Path) -> Result<()> {
    for entry in WalkDir::new(src).follow_links(true) {
        let entry = entry.map_err(|e| {
            RenderError::Io(std::io::Error::other(format!(
                "Failed to walk {}: {}",
                src.display(),
                e
            )))
        })?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| RenderError::Io(std::io::Error::other(e.to_string())))?;
        let dest = dst.join(relative);

        if entry.file_type().is_dir() {
            runtime.dir_create(&dest, true)?;
        } else {
            runtime.file_copy(entry.path(), &dest)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use knitdown_system_runtime::NativeRuntime;
    use std::fs;

    fn make_source(root: &Path) -> PathBuf {
        let src = root.join("lib").join("widget-1.0");
        fs::create_dir_all(src.join("css")).unwrap();
        fs::write(src.join("widget.js"), "js").unwrap();
        fs::write(src.join("css/widget.css"), "css").unwrap();
        src
    }

    #[test]
    fn test_copies_tree() {
        let temp = tempfile::tempdir().unwrap();
        let src = make_source(temp.path());
        let files = temp.path().join("doc_files");

        let target = materialize_supporting_files(&NativeRuntime, &src, &files, None).unwrap();

        assert_eq!(target, files.join("widget-1.0"));
        assert_eq!(fs::read_to_string(target.join("widget.js")).unwrap(), "js");
        assert_eq!(
            fs::read_to_string(target.join("css/widget.css")).unwrap(),
            "css"
        );
    }

    #[test]
    fn test_rename() {
        let temp = tempfile::tempdir().unwrap();
        let src = make_source(temp.path());
        let files = temp.path().join("doc_files");

        let target =
            materialize_supporting_files(&NativeRuntime, &src, &files, Some("widget")).unwrap();

        assert_eq!(target, files.join("widget"));
        assert!(target.join("widget.js").is_file());
        assert!(!files.join("widget-1.0").exists());
    }

    #[test]
    fn test_idempotent_single_copy() {
        let temp = tempfile::tempdir().unwrap();
        let src = make_source(temp.path());
        let files = temp.path().join("doc_files");

        let first =
            materialize_supporting_files(&NativeRuntime, &src, &files, Some("widget")).unwrap();
        // A second copy would overwrite this marker
        fs::write(first.join("widget.js"), "modified").unwrap();
        let second =
            materialize_supporting_files(&NativeRuntime, &src, &files, Some("widget")).unwrap();

        assert_eq!(first, second);
        assert_eq!(
            fs::read_to_string(second.join("widget.js")).unwrap(),
            "modified"
        );
        assert_eq!(fs::read_dir(&files).unwrap().count(), 1);
    }

    #[test]
    fn test_existing_staging_name_skips_copy() {
        let temp = tempfile::tempdir().unwrap();
        let src = make_source(temp.path());
        let files = temp.path().join("doc_files");
        fs::create_dir_all(files.join("widget-1.0")).unwrap();

        let target =
            materialize_supporting_files(&NativeRuntime, &src, &files, Some("widget")).unwrap();

        assert_eq!(target, files.join("widget"));
        assert!(!target.exists());
    }
}
