//! Locating the agent binary once at startup

use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Command name looked up when nothing is configured
pub const DEFAULT_COMMAND: &str = "claude";

/// Install locations that are often missing from a non-login shell's PATH
fn extra_search_dirs(home: Option<&Path>) -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    if let Some(home) = home {
        dirs.push(home.join(".local/bin"));
        dirs.push(home.join(".claude/local"));
        dirs.push(home.join(".npm-global/bin"));
    }
    dirs.push(PathBuf::from("/usr/local/bin"));
    dirs.push(PathBuf::from("/opt/homebrew/bin"));
    dirs
}

/// Absolute paths probed in order when the PATH lookup fails
fn fallback_candidates(command: &str, home: Option<&Path>) -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(home) = home {
        candidates.push(home.join(".claude/local").join(command));
        candidates.push(home.join(".local/bin").join(command));
        candidates.push(home.join(".npm-global/bin").join(command));
    }
    candidates.push(Path::new("/usr/local/bin").join(command));
    candidates.push(Path::new("/opt/homebrew/bin").join(command));
    candidates.push(Path::new("/usr/bin").join(command));
    candidates
}

/// Resolve `command` against the process environment.
pub fn resolve_binary(command: &str) -> PathBuf {
    resolve_with(
        command,
        std::env::var_os("PATH"),
        dirs::home_dir().as_deref(),
    )
}

/// Resolve `command` against an explicit PATH and home directory.
///
/// Falls back to the bare command name, which defers the failure to spawn time.
pub fn resolve_with(command: &str, path: Option<OsString>, home: Option<&Path>) -> PathBuf {
    let mut search = extra_search_dirs(home);
    if let Some(ref path) = path {
        search.extend(std::env::split_paths(path));
    }

    let joined = std::env::join_paths(&search).ok().or(path);
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/"));

    match which::which_in(command, joined, cwd) {
        Ok(found) => {
            tracing::debug!(binary = %found.display(), "resolved agent binary");
            return found;
        }
        Err(e) => tracing::debug!("PATH lookup for {} failed: {}", command, e),
    }

    if let Some(found) = fallback_candidates(command, home)
        .into_iter()
        .find(|candidate| is_executable(candidate))
    {
        tracing::debug!(binary = %found.display(), "using fallback agent binary");
        return found;
    }

    tracing::warn!("could not locate {}; deferring to spawn", command);
    PathBuf::from(command)
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
