// path.rs — Project-relative path normalization.
//
// Every path the core compares is in one canonical form: forward slashes,
// no leading or trailing slash, no `.` segments, `..` collapsed. The project
// root is the empty string. A `..` that would climb above the root is an
// error, never silently dropped.

/// Normalize a project-relative path.
///
/// Returns the reason as `Err` when the path climbs above the root.
pub fn normalize(raw: &str) -> Result<String, String> {
    let unified = raw.replace('\\', "/");
    let mut segments: Vec<&str> = Vec::new();

    for segment in unified.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err("'..' climbs above the project root".to_string());
                }
            }
            other => segments.push(other),
        }
    }

    Ok(segments.join("/"))
}

/// Whether the raw input is absolute (`/x`, `\x`, or `C:/x`).
pub fn is_absolute(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    raw.starts_with('/')
        || raw.starts_with('\\')
        || (bytes.len() >= 3
            && bytes[0].is_ascii_alphabetic()
            && bytes[1] == b':'
            && (bytes[2] == b'/' || bytes[2] == b'\\'))
}

/// The path itself, then each ancestor, ending with the root (`""`).
///
/// `"a/b/c"` yields `"a/b/c"`, `"a/b"`, `"a"`, `""`.
pub fn ancestors(path: &str) -> impl Iterator<Item = &str> {
    let mut next = Some(path);
    std::iter::from_fn(move || {
        let current = next?;
        next = if current.is_empty() {
            None
        } else {
            Some(current.rfind('/').map_or("", |i| &current[..i]))
        };
        Some(current)
    })
}

/// The nearest strict ancestor of `path`, or `None` for the root.
pub fn parent_of(path: &str) -> Option<&str> {
    ancestors(path).nth(1)
}

/// `path` relative to the directory `dir`, if it lies inside it.
pub fn relative_to<'a>(path: &'a str, dir: &str) -> Option<&'a str> {
    if dir.is_empty() {
        return Some(path);
    }
    path.strip_prefix(dir)
        .and_then(|rest| rest.strip_prefix('/'))
}

/// Lowercased extension of the last segment, without the dot.
///
/// Dotfiles such as `.gitignore` have no extension.
pub fn extension(path: &str) -> Option<String> {
    let name = path.rsplit('/').next().unwrap_or(path);
    std::path::Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_segments() {
        assert_eq!(normalize("a/./b/../c").unwrap(), "a/c");
        assert_eq!(normalize("/backend/shared/").unwrap(), "backend/shared");
        assert_eq!(normalize("backend//workers").unwrap(), "backend/workers");
        assert_eq!(normalize("backend\\workers\\w.py").unwrap(), "backend/workers/w.py");
    }

    #[test]
    fn normalize_root_forms() {
        assert_eq!(normalize("").unwrap(), "");
        assert_eq!(normalize(".").unwrap(), "");
        assert_eq!(normalize("/").unwrap(), "");
        assert_eq!(normalize("a/..").unwrap(), "");
    }

    #[test]
    fn normalize_rejects_escape() {
        assert!(normalize("../x").is_err());
        assert!(normalize("a/../../x").is_err());
    }

    #[test]
    fn ancestors_walk_to_root() {
        let walked: Vec<&str> = ancestors("a/b/c").collect();
        assert_eq!(walked, vec!["a/b/c", "a/b", "a", ""]);
        let root: Vec<&str> = ancestors("").collect();
        assert_eq!(root, vec![""]);
    }

    #[test]
    fn parent_of_root_is_none() {
        assert_eq!(parent_of("a/b"), Some("a"));
        assert_eq!(parent_of("a"), Some(""));
        assert_eq!(parent_of(""), None);
    }

    #[test]
    fn relative_to_respects_segment_boundaries() {
        assert_eq!(relative_to("backend/x.py", "backend"), Some("x.py"));
        assert_eq!(relative_to("backend2/x.py", "backend"), None);
        assert_eq!(relative_to("x.py", ""), Some("x.py"));
    }

    #[test]
    fn extension_is_lowercased() {
        assert_eq!(extension("backend/X.PY"), Some("py".to_string()));
        assert_eq!(extension("backend/.gitignore"), None);
        assert_eq!(extension("Makefile"), None);
    }

    #[test]
    fn absolute_detection() {
        assert!(is_absolute("/home/dev/project"));
        assert!(is_absolute("C:\\work"));
        assert!(!is_absolute("backend/x.py"));
    }
}
