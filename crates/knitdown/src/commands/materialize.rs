/*
 * materialize.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Materialize command implementation
 */

use std::path::Path;

use anyhow::{Context, Result};
use knitdown_core::materialize_supporting_files;
use knitdown_system_runtime::NativeRuntime;

/// Execute the materialize command
pub fn execute(source_dir: &str, files_dir: &str, rename: Option<&str>) -> Result<()> {
    let runtime = NativeRuntime::new();
    let target =
        materialize_supporting_files(&runtime, Path::new(source_dir), Path::new(files_dir), rename)
            .with_context(|| format!("Failed to materialize {}", source_dir))?;
    println!("{}", target.display());
    Ok(())
}
