//! Resource path resolution.
//!
//! Scripts ship either next to the executable (packaged install) or in the
//! working tree the binary is launched from (development). The layout is
//! decided once at startup; resolution afterwards is a pure path computation.

use anyhow::{Context, Result};
use std::path::{Component, Path, PathBuf};

/// Directory that marks a packaged install when found beside the executable.
pub const SCRIPTS_DIR: &str = "scripts";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// Root given through configuration.
    Explicit,
    /// Directory of the running executable.
    Bundled,
    /// Working directory at startup.
    Development,
}

#[derive(Debug, Clone)]
pub struct ResourceLocator {
    root: PathBuf,
    layout: Layout,
}

impl ResourceLocator {
    pub fn new(root: PathBuf, layout: Layout) -> Self {
        Self {
            root: normalize(&root),
            layout,
        }
    }

    /// Pick the resource root: explicit override, then bundle, then working directory.
    pub fn detect(explicit_root: Option<PathBuf>) -> Result<Self> {
        let cwd = std::env::current_dir().context("read current directory")?;

        if let Some(root) = explicit_root {
            let root = if root.is_absolute() { root } else { cwd.join(root) };
            return Ok(Self::new(root, Layout::Explicit));
        }

        if let Some(exe_dir) = std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(Path::to_path_buf))
        {
            if exe_dir.join(SCRIPTS_DIR).is_dir() {
                return Ok(Self::new(exe_dir, Layout::Bundled));
            }
        }

        Ok(Self::new(cwd, Layout::Development))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn resolve(&self, relative: impl AsRef<Path>) -> PathBuf {
        normalize(&self.root.join(relative))
    }
}

/// Lexical normalization: drops `.`, folds `..`, rebuilds separators.
///
/// Works on `OsStr` components so non-UTF-8 segments pass through untouched.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => {
                if !matches!(
                    out.components().next_back(),
                    None | Some(Component::RootDir) | Some(Component::Prefix(_))
                ) {
                    out.pop();
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_relative_to_root() {
        let loc = ResourceLocator::new(PathBuf::from("/opt/deck"), Layout::Bundled);
        assert_eq!(
            loc.resolve("scripts/CLion-setup.sh"),
            PathBuf::from("/opt/deck/scripts/CLion-setup.sh")
        );
    }

    #[test]
    fn folds_dot_segments() {
        let loc = ResourceLocator::new(PathBuf::from("/opt/./deck/bin/.."), Layout::Explicit);
        assert_eq!(loc.root(), Path::new("/opt/deck"));
        assert_eq!(
            loc.resolve("./scripts/../scripts/a.sh"),
            PathBuf::from("/opt/deck/scripts/a.sh")
        );
    }

    #[test]
    fn parent_never_escapes_root_dir() {
        let loc = ResourceLocator::new(PathBuf::from("/"), Layout::Explicit);
        assert_eq!(loc.resolve("../../x"), PathBuf::from("/x"));
    }

    #[test]
    fn keeps_non_ascii_segments() {
        let loc = ResourceLocator::new(PathBuf::from("/tmp/工具"), Layout::Development);
        let p = loc.resolve("scripts/脚本.sh");
        assert_eq!(p, PathBuf::from("/tmp/工具/scripts/脚本.sh"));
    }

    #[cfg(unix)]
    #[test]
    fn keeps_non_utf8_segments() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let raw = OsStr::from_bytes(b"caf\xe9");
        let loc = ResourceLocator::new(PathBuf::from("/tmp").join(raw), Layout::Development);
        let p = loc.resolve("scripts");
        assert!(p.to_str().is_none());
        assert!(p.ends_with("scripts"));
    }

    #[test]
    fn explicit_relative_root_is_anchored_at_cwd() {
        let loc = ResourceLocator::detect(Some(PathBuf::from("assets"))).unwrap();
        assert_eq!(loc.layout(), Layout::Explicit);
        assert!(loc.root().is_absolute());
        assert!(loc.root().ends_with("assets"));
    }
}
