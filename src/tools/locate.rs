//! Which-style binary lookup

use std::path::{Path, PathBuf};

use super::ToolError;

/// Find `binary` in `extra_dir` (if any) and then in each `PATH` entry
pub fn locate_binary(binary: &str, extra_dir: Option<&Path>) -> Result<PathBuf, ToolError> {
    let mut dirs: Vec<PathBuf> = extra_dir.map(Path::to_path_buf).into_iter().collect();
    if let Some(path) = std::env::var_os("PATH") {
        dirs.extend(std::env::split_paths(&path));
    }

    locate_in(binary, dirs).ok_or_else(|| ToolError::NotFound {
        binary: binary.to_string(),
    })
}

/// First executable file named `binary` in `dirs`, in order
pub fn locate_in<I>(binary: &str, dirs: I) -> Option<PathBuf>
where
    I: IntoIterator<Item = PathBuf>,
{
    dirs.into_iter()
        .map(|dir| dir.join(binary))
        .find(|candidate| is_executable(candidate))
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
