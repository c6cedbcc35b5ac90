//! Path resolution against the workspace root

use std::path::{Component, Path, PathBuf};

/// Resolve a configured path against the workspace root.
///
/// Empty input stays empty, absolute paths pass through unchanged and
/// everything else is joined onto `root`.
pub fn resolve(input: &str, root: &Path) -> PathBuf {
    if input.is_empty() {
        return PathBuf::new();
    }

    let path = Path::new(input);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

/// Lexically collapse `.` and `..` components without touching the disk
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // Never pop past the root or a prefix
                let popped = matches!(
                    out.components().next_back(),
                    Some(Component::Normal(_))
                ) && out.pop();
                if !popped && !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }

    out
}

/// Check whether `path` lies inside `root`, comparing whole components
pub fn is_within(path: &Path, root: &Path) -> bool {
    normalize(path).starts_with(normalize(root))
}
