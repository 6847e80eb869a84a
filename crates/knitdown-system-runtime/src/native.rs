/*
 * native.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * NativeRuntime implementation with full system access.
 */

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::traits::{
    CommandOutput, CommandSpec, PathKind, RuntimeError, RuntimeResult, SystemRuntime, TempDir,
};

/// Runtime with unrestricted access to the local system, backed by `std`.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeRuntime;

impl NativeRuntime {
    /// Create a new native runtime.
    pub fn new() -> Self {
        Self
    }
}

impl SystemRuntime for NativeRuntime {
    fn file_read(&self, path: &Path) -> RuntimeResult<Vec<u8>> {
        Ok(std::fs::read(path)?)
    }

    fn file_write(&self, path: &Path, contents: &[u8]) -> RuntimeResult<()> {
        Ok(std::fs::write(path, contents)?)
    }

    fn path_exists(&self, path: &Path, kind: Option<PathKind>) -> RuntimeResult<bool> {
        // A dangling symlink still exists; file/dir checks follow links
        if std::fs::symlink_metadata(path).is_err() {
            return Ok(false);
        }
        Ok(match kind {
            None => true,
            Some(PathKind::File) => path.is_file(),
            Some(PathKind::Directory) => path.is_dir(),
        })
    }

    fn file_copy(&self, src: &Path, dst: &Path) -> RuntimeResult<()> {
        std::fs::copy(src, dst)?;
        Ok(())
    }

    fn path_rename(&self, old: &Path, new: &Path) -> RuntimeResult<()> {
        Ok(std::fs::rename(old, new)?)
    }

    fn file_remove(&self, path: &Path) -> RuntimeResult<()> {
        Ok(std::fs::remove_file(path)?)
    }

    fn dir_create(&self, path: &Path, recursive: bool) -> RuntimeResult<()> {
        if recursive {
            std::fs::create_dir_all(path)?;
        } else {
            std::fs::create_dir(path)?;
        }
        Ok(())
    }

    fn dir_remove(&self, path: &Path, recursive: bool) -> RuntimeResult<()> {
        if recursive {
            std::fs::remove_dir_all(path)?;
        } else {
            std::fs::remove_dir(path)?;
        }
        Ok(())
    }

    fn cwd(&self) -> RuntimeResult<PathBuf> {
        Ok(std::env::current_dir()?)
    }

    fn temp_dir(&self, template: &str) -> RuntimeResult<TempDir> {
        let dir = tempfile::Builder::new().prefix(template).tempdir()?;
        Ok(TempDir::new(dir.keep()))
    }

    fn exec_command(&self, command: &CommandSpec<'_>) -> RuntimeResult<CommandOutput> {
        let mut cmd = Command::new(command.program);
        cmd.args(&command.args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(if command.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            });
        if let Some(cwd) = command.cwd {
            cmd.current_dir(cwd);
        }

        let mut child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                RuntimeError::BinaryNotFound(command.program.display().to_string())
            } else {
                RuntimeError::Io(e)
            }
        })?;

        if let (Some(input), Some(mut stdin)) = (command.stdin, child.stdin.take()) {
            stdin.write_all(input)?;
        }

        let output = child.wait_with_output()?;
        Ok(CommandOutput {
            // Killed by a signal has no code; report it as a generic failure
            code: output.status.code().unwrap_or(-1),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }

    fn env_get(&self, name: &str) -> RuntimeResult<Option<String>> {
        match std::env::var(name) {
            Ok(value) => Ok(Some(value)),
            Err(std::env::VarError::NotPresent) => Ok(None),
            Err(std::env::VarError::NotUnicode(_)) => Err(RuntimeError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("environment variable {} is not valid unicode", name),
            ))),
        }
    }

    fn find_binary(&self, name: &str, env_var: &str) -> Option<PathBuf> {
        if let Ok(Some(path_str)) = self.env_get(env_var) {
            let path = PathBuf::from(path_str);
            if path.is_file() {
                return Some(path);
            }
            // The variable may point at an installation directory
            let in_bin = path.join("bin").join(name);
            if in_bin.is_file() {
                return Some(in_bin);
            }
        }
        which::which(name).ok()
    }
}
