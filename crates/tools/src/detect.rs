//! Detect which adapters have an executable on `PATH`.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use crate::adapters::{AdapterRegistry, ToolAdapter};

/// Locate `name` on the current `PATH`.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    find_in(&path, name)
}

/// Locate `name` in a `PATH`-formatted list of directories.
pub fn find_in(search_path: &OsStr, name: &str) -> Option<PathBuf> {
    std::env::split_paths(search_path)
        .flat_map(|dir| candidates(&dir, name))
        .find(|candidate| is_executable(candidate))
}

fn candidates(dir: &Path, name: &str) -> Vec<PathBuf> {
    let mut out = vec![dir.join(name)];
    if cfg!(target_os = "windows") {
        out.push(dir.join(format!("{name}.exe")));
    }
    out
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Whether any of the adapter's executable names is installed.
pub fn is_installed(adapter: &ToolAdapter) -> bool {
    adapter.executables().any(|name| find_executable(name).is_some())
}

/// Split the registry into (installed, missing) tool names, declaration order.
pub fn installed_tools(registry: &AdapterRegistry) -> (Vec<&'static str>, Vec<&'static str>) {
    registry
        .adapters()
        .iter()
        .map(|a| (a.name, is_installed(a)))
        .fold((Vec::new(), Vec::new()), |(mut yes, mut no), (name, installed)| {
            if installed {
                yes.push(name);
            } else {
                no.push(name);
            }
            (yes, no)
        })
}
