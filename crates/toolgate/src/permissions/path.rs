//! Path normalization and containment for persisted grants.
//!
//! Every path that is stored, compared or published goes through
//! [`normalize`] first. Cleaning is purely lexical: the filesystem is never
//! consulted and symlinks are not resolved.

use std::path::{Component, Path, PathBuf};

/// Resolve `path` against `working_dir` and clean it lexically.
///
/// An empty path resolves to the working directory itself.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use toolgate::permissions::path::normalize;
///
/// let wd = Path::new("/repo");
/// assert_eq!(normalize("src/../README.md", wd), "/repo/README.md");
/// assert_eq!(normalize("/tmp//proj/./a.txt", wd), "/tmp/proj/a.txt");
/// ```
pub fn normalize(path: &str, working_dir: &Path) -> String {
    let raw = Path::new(path);
    let joined = if raw.is_absolute() {
        raw.to_path_buf()
    } else {
        working_dir.join(raw)
    };
    clean(&joined).to_string_lossy().into_owned()
}

/// Lexically clean a path.
///
/// Drops `.` components and redundant separators, and folds `..` into the
/// preceding component. `..` directly under the root stays at the root.
pub fn clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(prefix) => out.push(prefix.as_os_str()),
            Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            Component::Normal(part) => out.push(part),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

/// Whether a grant on `granted` covers `requested`.
///
/// Both paths must already be normalized. Matching is component-wise, so a
/// grant on `/repo/src` covers `/repo/src` and `/repo/src/main.rs` but not
/// `/repo/src2/file`.
pub fn covers(granted: &Path, requested: &Path) -> bool {
    requested.starts_with(granted)
}
