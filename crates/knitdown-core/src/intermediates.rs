/*
 * intermediates.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Tracking and cleanup of files generated during a render.
 */

//! Intermediate file tracking.
//!
//! Every file or directory a render creates on the way to its final output
//! (whitespace-free input copies, spun scripts, woven markdown, header
//! includes, ...) is registered in an [`IntermediateSet`]. The set is owned by
//! exactly one render pass. When cleanup is enabled, the tracked paths are
//! deleted once, either explicitly via [`IntermediateSet::cleanup`] or when the
//! set is dropped, so error paths clean up the same way success paths do.

use std::path::{Path, PathBuf};

use knitdown_system_runtime::{RuntimeResult, SystemRuntime};
use tracing::{debug, warn};

/// Ordered collection of paths created during one render.
pub struct IntermediateSet<'a> {
    runtime: &'a dyn SystemRuntime,
    paths: Vec<PathBuf>,
    clean: bool,
}

impl std::fmt::Debug for IntermediateSet<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntermediateSet")
            .field("paths", &self.paths)
            .field("clean", &self.clean)
            .finish()
    }
}

impl<'a> IntermediateSet<'a> {
    /// Create an empty set. `clean` decides whether tracked paths are deleted.
    pub fn new(runtime: &'a dyn SystemRuntime, clean: bool) -> Self {
        Self {
            runtime,
            paths: Vec::new(),
            clean,
        }
    }

    /// Track a path created by this render.
    ///
    /// Registering the same path twice is a no-op.
    pub fn register(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        if !self.paths.contains(&path) {
            debug!("tracking intermediate {}", path.display());
            self.paths.push(path);
        }
    }

    /// Write a generated file, tracking it only when this call creates it.
    ///
    /// A file that already existed is overwritten but never deleted by
    /// cleanup. Returns whether the file was created.
    pub fn write_file(&mut self, path: &Path, contents: &[u8]) -> RuntimeResult<bool> {
        let existed = self.runtime.path_exists(path, None)?;
        self.runtime.file_write(path, contents)?;
        if existed {
            debug!("overwrote existing {}", path.display());
        } else {
            self.register(path);
        }
        Ok(!existed)
    }

    /// Whether a path is currently tracked.
    pub fn contains(&self, path: &Path) -> bool {
        self.paths.iter().any(|p| p == path)
    }

    /// Tracked paths in registration order.
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Whether tracked paths will be deleted.
    pub fn is_clean(&self) -> bool {
        self.clean
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Delete every tracked path that still exists, newest first.
    ///
    /// The set is drained, so a second call (or the drop that follows) does
    /// nothing. Returns the paths that were removed. When cleanup is disabled
    /// the paths are forgotten without touching the filesystem.
    pub fn cleanup(&mut self) -> Vec<PathBuf> {
        let paths = std::mem::take(&mut self.paths);
        if !self.clean {
            return Vec::new();
        }

        let mut removed = Vec::new();
        for path in paths.into_iter().rev() {
            match self.remove(&path) {
                Ok(true) => {
                    debug!("removed intermediate {}", path.display());
                    removed.push(path);
                }
                Ok(false) => {}
                // A leftover file must not mask the render result
                Err(e) => warn!("failed to remove intermediate {}: {}", path.display(), e),
            }
        }
        removed
    }

    fn remove(&self, path: &Path) -> RuntimeResult<bool> {
        if self.runtime.is_dir(path)? {
            self.runtime.dir_remove(path, true)?;
        } else if self.runtime.path_exists(path, None)? {
            self.runtime.file_remove(path)?;
        } else {
            return Ok(false);
        }
        Ok(true)
    }
}

impl Drop for IntermediateSet<'_> {
    fn drop(&mut self) {
        self.cleanup();
    }
}
