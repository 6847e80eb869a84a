/*
 * knitdown-system-runtime
 * Copyright (c) 2025 Posit, PBC
 *
 * Runtime abstraction layer for knitdown system operations.
 *
 * This crate provides a trait-based abstraction for the filesystem, process
 * and environment operations the render pipeline performs:
 *
 * - NativeRuntime: Full system access using std
 */

mod native;
mod traits;

// Re-export core types (API surface)
pub use traits::{
    CommandOutput, CommandSpec, PathKind, RuntimeError, RuntimeResult, SystemRuntime, TempDir,
};

// Re-export runtime implementations
pub use native::NativeRuntime;
