use std::path::{Component, Path, PathBuf};

use crate::error::FsError;

/// Maps caller supplied relative paths onto the base directory, refusing
/// anything that would land outside of it.
#[derive(Debug, Clone)]
pub struct PathGuard {
    base: PathBuf,
}

impl PathGuard {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Resolves `relative` against the base directory.
    ///
    /// The path is normalised lexically first; any `..` that survives
    /// normalisation is rejected before joining. Leading `/` is treated as
    /// the base directory itself, never the filesystem root.
    pub fn resolve(&self, relative: &str) -> Result<PathBuf, FsError> {
        let normalized = normalize(Path::new(relative));
        if normalized
            .components()
            .any(|c| matches!(c, Component::ParentDir))
        {
            return Err(FsError::PathTraversal(relative.to_string()));
        }

        let full_path = self.base.join(&normalized);

        let Ok(rel) = full_path.strip_prefix(&self.base) else {
            return Err(FsError::PathTraversal(relative.to_string()));
        };
        if matches!(rel.components().next(), Some(Component::ParentDir)) {
            return Err(FsError::PathTraversal(relative.to_string()));
        }

        Ok(full_path)
    }

    /// Slash separated path of `path` relative to the base, `""` for the base
    /// itself. `None` if `path` is not under the base.
    pub fn relative(&self, path: &Path) -> Option<String> {
        relative_path(&self.base, path)
    }
}

pub(crate) fn relative_path(base: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(base).ok()?;
    let parts: Vec<_> = rel
        .components()
        .filter_map(|c| match c {
            Component::Normal(name) => Some(name.to_string_lossy()),
            _ => None,
        })
        .collect();
    Some(parts.join("/"))
}

/// Lexically collapse `.` and `..`. Root and prefix components are dropped
/// so the result is always relative; a `..` that cannot be collapsed is kept.
fn normalize(path: &Path) -> PathBuf {
    let mut parts: Vec<Component> = Vec::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir | Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                _ => parts.push(component),
            },
            Component::Normal(_) => parts.push(component),
        }
    }
    parts.iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn guard() -> PathGuard {
        PathGuard::new("/srv/base")
    }

    #[rstest]
    #[case("a.txt", "/srv/base/a.txt")]
    #[case("./a.txt", "/srv/base/a.txt")]
    #[case("dir/../a.txt", "/srv/base/a.txt")]
    #[case("dir/./sub/b.rs", "/srv/base/dir/sub/b.rs")]
    #[case("/dir/a.txt", "/srv/base/dir/a.txt")]
    #[case("", "/srv/base")]
    #[case(".", "/srv/base")]
    #[case("notes..txt", "/srv/base/notes..txt")]
    fn test_resolve_inside_base(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(guard().resolve(input).unwrap(), PathBuf::from(expected));
    }

    #[rstest]
    #[case("..")]
    #[case("../etc/passwd")]
    #[case("dir/../../etc")]
    #[case("a/b/../../../c")]
    #[case("/../x")]
    #[case("./../base/a.txt")]
    fn test_resolve_rejects_traversal(#[case] input: &str) {
        let err = guard().resolve(input).unwrap_err();
        assert!(err.is_traversal(), "{input} -> {err}");
    }

    #[test]
    fn test_relative() {
        let guard = guard();
        assert_eq!(
            guard.relative(Path::new("/srv/base/dir/a.txt")).as_deref(),
            Some("dir/a.txt")
        );
        assert_eq!(guard.relative(Path::new("/srv/base")).as_deref(), Some(""));
        assert_eq!(guard.relative(Path::new("/srv/other/a.txt")), None);
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Path::new("a/./b/../c")), PathBuf::from("a/c"));
        assert_eq!(normalize(Path::new("../a")), PathBuf::from("../a"));
        assert_eq!(normalize(Path::new("a/../..")), PathBuf::from(".."));
        assert_eq!(normalize(Path::new("/a/b")), PathBuf::from("a/b"));
    }
}
