//! Syntactic path containment checks.
//!
//! Both functions are pure: they never touch the filesystem. Anything
//! ambiguous is rejected.

use std::path::{Component, Path, PathBuf};

/// Validates an extension-relative path and returns it normalized.
///
/// Rejects empty paths, NUL bytes, backslashes, colons (drive letters and
/// alternate streams), absolute paths, and any `..` segment. Empty and `.`
/// segments are dropped. Returns `None` when the path is rejected.
pub fn sanitize_relative_path(raw: &str) -> Option<PathBuf> {
    if raw.is_empty() || raw.starts_with('/') {
        return None;
    }
    if raw.chars().any(|c| c == '\0' || c == '\\' || c == ':') {
        return None;
    }

    let mut clean = PathBuf::new();
    for segment in raw.split('/') {
        match segment {
            "" | "." => continue,
            ".." => return None,
            other => clean.push(other),
        }
    }

    let all_normal = clean
        .components()
        .all(|c| matches!(c, Component::Normal(_)));
    if clean.as_os_str().is_empty() || !all_normal {
        return None;
    }
    Some(clean)
}

/// Resolves `.` and `..` components without consulting the filesystem.
///
/// A `..` above the root is dropped, the way the kernel treats `/..`.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Whether `candidate`, once normalized, stays inside `root`.
pub fn is_contained(root: &Path, candidate: &Path) -> bool {
    let root = normalize_lexically(root);
    let candidate = normalize_lexically(candidate);
    candidate.starts_with(&root) && candidate != root
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_plain_relative_paths() {
        assert_eq!(
            sanitize_relative_path("components/widget.tsx"),
            Some(PathBuf::from("components/widget.tsx"))
        );
        assert_eq!(
            sanitize_relative_path("./admin//settings.jsx"),
            Some(PathBuf::from("admin/settings.jsx"))
        );
        assert_eq!(
            sanitize_relative_path("assets/fonts/inter...var.woff2"),
            Some(PathBuf::from("assets/fonts/inter...var.woff2"))
        );
    }

    #[test]
    fn test_rejects_escapes() {
        for raw in [
            "",
            ".",
            "./",
            "../secret",
            "components/../../etc/passwd",
            "a/b/..",
            "/etc/passwd",
            "//server/share",
            "C:/Windows/system.ini",
            "components\\..\\..\\secret",
            "widget.tsx\0.png",
            "file.txt:stream",
        ] {
            assert!(
                sanitize_relative_path(raw).is_none(),
                "expected rejection of {raw:?}"
            );
        }
    }

    #[test]
    fn test_normalize_and_contain() {
        let root = Path::new("/srv/plugins/oauth");
        assert!(is_contained(root, Path::new("/srv/plugins/oauth/lib/a.js")));
        assert!(is_contained(
            root,
            Path::new("/srv/plugins/oauth/lib/../components/b.jsx")
        ));
        assert!(!is_contained(root, Path::new("/srv/plugins/oauth/../other/x")));
        assert!(!is_contained(root, Path::new("/srv/plugins/oauth-evil/x")));
        assert!(!is_contained(root, Path::new("/srv/plugins/oauth")));
        assert_eq!(
            normalize_lexically(Path::new("/a/./b/../c")),
            PathBuf::from("/a/c")
        );
    }
}
