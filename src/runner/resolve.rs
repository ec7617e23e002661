// src/runner/resolve.rs

//! Executable lookup on `PATH`.
//!
//! A name that already carries a path component (`./tool`, `bin/tool`,
//! `/usr/bin/env`) is passed through untouched; a missing file is then
//! reported by the spawn step. Only bare names are searched for.

use std::path::{Path, PathBuf};

use crate::errors::ExecError;

/// Resolve `name` to the path that will be spawned.
pub fn resolve_executable(name: &str) -> Result<PathBuf, ExecError> {
    let not_found = || ExecError::ExecutableNotFound {
        name: name.to_string(),
    };

    if name.is_empty() {
        return Err(not_found());
    }

    let candidate = Path::new(name);
    if has_path(candidate) {
        return Ok(candidate.to_path_buf());
    }

    let path = std::env::var_os("PATH").ok_or_else(not_found)?;
    std::env::split_paths(&path)
        .filter(|dir| !dir.as_os_str().is_empty())
        .find_map(|dir| resolve_in_dir(&dir, name))
        .ok_or_else(not_found)
}

fn has_path(candidate: &Path) -> bool {
    candidate.components().count() > 1
}

fn resolve_in_dir(dir: &Path, command: &str) -> Option<PathBuf> {
    let direct = dir.join(command);
    if is_executable(&direct) {
        return Some(direct);
    }

    if !cfg!(windows) {
        return None;
    }

    [".exe", ".cmd", ".bat", ".com"]
        .into_iter()
        .map(|ext| dir.join(format!("{command}{ext}")))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
