/*
 * traits.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Defines the SystemRuntime trait and supporting types for the runtime abstraction layer.
 *
 * The render pipeline never touches the filesystem, the process table or the
 * environment directly; everything goes through this trait so the pipeline can
 * be exercised against temp directories and fake binaries.
 */

use std::io;
use std::path::{Path, PathBuf};

/// Result type for runtime operations
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Errors that can occur during runtime operations
#[derive(Debug)]
pub enum RuntimeError {
    /// Standard I/O error
    Io(io::Error),

    /// A binary could not be located
    BinaryNotFound(String),
}

impl std::fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuntimeError::Io(e) => write!(f, "I/O error: {}", e),
            RuntimeError::BinaryNotFound(name) => write!(f, "Binary not found: {}", name),
        }
    }
}

impl std::error::Error for RuntimeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RuntimeError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for RuntimeError {
    fn from(e: io::Error) -> Self {
        RuntimeError::Io(e)
    }
}

/// Type of filesystem path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    /// Regular file
    File,
    /// Directory
    Directory,
}

/// Output from a command execution
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Exit code (0 = success)
    pub code: i32,
    /// Standard output
    pub stdout: Vec<u8>,
    /// Standard error
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    /// Check if the command succeeded (exit code 0)
    pub fn success(&self) -> bool {
        self.code == 0
    }

    /// Get stdout as a string (lossy UTF-8 conversion)
    pub fn stdout_string(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    /// Get stderr as a string (lossy UTF-8 conversion)
    pub fn stderr_string(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// A command to run through [`SystemRuntime::exec_command`].
///
/// The working directory is always explicit: the render pipeline never
/// changes the process-wide current directory, it passes its base
/// directory here instead.
#[derive(Debug, Clone)]
pub struct CommandSpec<'a> {
    /// Program name or path
    pub program: &'a Path,
    /// Arguments, in order
    pub args: Vec<String>,
    /// Bytes written to the child's stdin, if any
    pub stdin: Option<&'a [u8]>,
    /// Working directory for the child process
    pub cwd: Option<&'a Path>,
}

impl<'a> CommandSpec<'a> {
    /// Create a command with no arguments.
    pub fn new(program: &'a Path) -> Self {
        Self {
            program,
            args: Vec::new(),
            stdin: None,
            cwd: None,
        }
    }

    /// Append arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the working directory.
    pub fn current_dir(mut self, cwd: &'a Path) -> Self {
        self.cwd = Some(cwd);
        self
    }

    /// Provide stdin content.
    pub fn stdin(mut self, stdin: &'a [u8]) -> Self {
        self.stdin = Some(stdin);
        self
    }
}

/// RAII guard for a temporary directory that is removed on drop
pub struct TempDir {
    path: PathBuf,
}

impl TempDir {
    /// Take ownership of an existing directory
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Get the path to the temporary directory
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        if self.path.exists() {
            // Best effort cleanup - ignore errors
            let _ = std::fs::remove_dir_all(&self.path);
        }
    }
}

/// Trait defining all low-level runtime operations used by the render pipeline.
///
/// Implementations provide the actual system interaction. The pipeline only
/// ever sees `&dyn SystemRuntime`, which keeps file copies, renames and
/// subprocess launches in one replaceable place.
pub trait SystemRuntime: Send + Sync {
    // ═══════════════════════════════════════════════════════════════════════
    // FILE OPERATIONS
    // ═══════════════════════════════════════════════════════════════════════

    /// Read entire file contents as bytes.
    fn file_read(&self, path: &Path) -> RuntimeResult<Vec<u8>>;

    /// Read file as string with UTF-8 encoding.
    ///
    /// Default implementation reads bytes and converts to string.
    fn file_read_string(&self, path: &Path) -> RuntimeResult<String> {
        let bytes = self.file_read(path)?;
        String::from_utf8(bytes).map_err(|e| {
            RuntimeError::Io(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Invalid UTF-8 in file: {}", e),
            ))
        })
    }

    /// Write bytes to file (creates or overwrites).
    fn file_write(&self, path: &Path, contents: &[u8]) -> RuntimeResult<()>;

    /// Check if path exists, optionally filtering by type.
    fn path_exists(&self, path: &Path, kind: Option<PathKind>) -> RuntimeResult<bool>;

    /// Check if path exists and is a file.
    fn is_file(&self, path: &Path) -> RuntimeResult<bool> {
        self.path_exists(path, Some(PathKind::File))
    }

    /// Check if path exists and is a directory.
    fn is_dir(&self, path: &Path) -> RuntimeResult<bool> {
        self.path_exists(path, Some(PathKind::Directory))
    }

    /// Copy file preserving permissions.
    fn file_copy(&self, src: &Path, dst: &Path) -> RuntimeResult<()>;

    /// Rename/move file or directory.
    fn path_rename(&self, old: &Path, new: &Path) -> RuntimeResult<()>;

    /// Delete file.
    fn file_remove(&self, path: &Path) -> RuntimeResult<()>;

    // ═══════════════════════════════════════════════════════════════════════
    // DIRECTORY OPERATIONS
    // ═══════════════════════════════════════════════════════════════════════

    /// Create directory (optionally with parents).
    fn dir_create(&self, path: &Path, recursive: bool) -> RuntimeResult<()>;

    /// Remove directory (optionally with contents).
    fn dir_remove(&self, path: &Path, recursive: bool) -> RuntimeResult<()>;

    /// Get current working directory.
    ///
    /// Used only to make relative request paths absolute.
    fn cwd(&self) -> RuntimeResult<PathBuf>;

    /// Create temporary directory with given template prefix.
    fn temp_dir(&self, template: &str) -> RuntimeResult<TempDir>;

    // ═══════════════════════════════════════════════════════════════════════
    // PROCESS EXECUTION
    // ═══════════════════════════════════════════════════════════════════════

    /// Execute command with full output capture.
    ///
    /// Returns exit code and both stdout/stderr. A non-zero exit is not an
    /// error at this level; callers inspect [`CommandOutput::success`].
    fn exec_command(&self, command: &CommandSpec<'_>) -> RuntimeResult<CommandOutput>;

    // ═══════════════════════════════════════════════════════════════════════
    // ENVIRONMENT
    // ═══════════════════════════════════════════════════════════════════════

    /// Get single environment variable.
    fn env_get(&self, name: &str) -> RuntimeResult<Option<String>>;

    /// Name of the user running the process, if it can be determined.
    fn current_user(&self) -> Option<String> {
        ["USER", "USERNAME", "LOGNAME"]
            .iter()
            .find_map(|var| self.env_get(var).ok().flatten())
            .filter(|name| !name.trim().is_empty())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // BINARY DISCOVERY
    // ═══════════════════════════════════════════════════════════════════════

    /// Find a binary by checking an environment variable first, then PATH.
    ///
    /// The `env_var` parameter names an environment variable that may contain
    /// the path to the binary (e.g., "KNITDOWN_PANDOC" for pandoc).
    ///
    /// Default implementation checks the environment variable but does not
    /// search PATH. `NativeRuntime` overrides this to use `which::which()`.
    fn find_binary(&self, name: &str, env_var: &str) -> Option<PathBuf> {
        if let Ok(Some(path_str)) = self.env_get(env_var) {
            let path = PathBuf::from(path_str);
            if self.is_file(&path).unwrap_or(false) {
                return Some(path);
            }
        }
        let _ = name;
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_output_helpers() {
        let output = CommandOutput {
            code: 0,
            stdout: b"hello world".to_vec(),
            stderr: b"warning".to_vec(),
        };

        assert!(output.success());
        assert_eq!(output.stdout_string(), "hello world");
        assert_eq!(output.stderr_string(), "warning");
    }

    #[test]
    fn test_command_output_failure() {
        let output = CommandOutput {
            code: 1,
            stdout: vec![],
            stderr: b"error occurred".to_vec(),
        };

        assert!(!output.success());
        assert_eq!(output.stderr_string(), "error occurred");
    }

    #[test]
    fn test_runtime_error_display() {
        let err = RuntimeError::BinaryNotFound("pandoc".to_string());
        assert_eq!(err.to_string(), "Binary not found: pandoc");

        let err: RuntimeError = io::Error::new(io::ErrorKind::NotFound, "gone").into();
        assert!(err.to_string().starts_with("I/O error"));
    }

    #[test]
    fn test_command_spec_builder() {
        let program = PathBuf::from("/usr/bin/pandoc");
        let cwd = PathBuf::from("/project");
        let spec = CommandSpec::new(&program)
            .args(["--from", "markdown"])
            .args(vec!["--to".to_string(), "html".to_string()])
            .current_dir(&cwd)
            .stdin(b"# Title");

        assert_eq!(spec.args, vec!["--from", "markdown", "--to", "html"]);
        assert_eq!(spec.cwd, Some(cwd.as_path()));
        assert_eq!(spec.stdin, Some(&b"# Title"[..]));
    }

    #[test]
    fn test_temp_dir_cleanup() {
        let temp_path = {
            let temp = TempDir::new(std::env::temp_dir().join("knitdown_test_cleanup_12345"));
            std::fs::create_dir_all(temp.path()).unwrap();
            assert!(temp.path().exists());
            temp.path().to_path_buf()
        };
        assert!(!temp_path.exists());
    }
}
