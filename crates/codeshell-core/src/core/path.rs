//! Path resolution for the virtual tree.
//!
//! Paths are absolute and `/`-joined. The virtual root `/` is the parent of
//! every top-level node. Relative input is resolved against a working
//! directory; only a bare `.` or `..` is interpreted, which [`is_supported`]
//! reports so callers can reject anything else.

/// The virtual root.
pub const ROOT: &str = "/";

/// Resolve `input` against `cwd`.
///
/// - absolute input is returned as is
/// - `.` is `cwd`, `..` is the parent of `cwd` (the root stays `/`)
/// - anything else is appended to `cwd`
///
/// Trailing slashes are dropped (`src/` resolves like `src`).
pub fn resolve(cwd: &str, input: &str) -> String {
    let input = trim_trailing(input);
    if input.starts_with('/') {
        return input.to_string();
    }
    match input {
        "" | "." => cwd.to_string(),
        ".." => parent(cwd),
        _ => join(cwd, input),
    }
}

/// Whether `resolve` gives the correct answer for `input`.
///
/// False for inputs with more than one segment that contain a `.` or `..`
/// segment (`../x`, `a/./b`), and for absolute paths containing one.
pub fn is_supported(input: &str) -> bool {
    let segments: Vec<&str> = input.split('/').filter(|s| !s.is_empty()).collect();
    let has_dots = segments.iter().any(|s| *s == "." || *s == "..");
    if input.starts_with('/') {
        return !has_dots;
    }
    !(has_dots && segments.len() > 1)
}

/// Parent of an absolute path. The parent of a root node is `/`.
pub fn parent(path: &str) -> String {
    let path = trim_trailing(path);
    match path.rfind('/') {
        Some(0) | None => ROOT.to_string(),
        Some(idx) => path[..idx].to_string(),
    }
}

/// Last segment of a path (empty for `/`).
pub fn file_name(path: &str) -> &str {
    let path = trim_trailing(path);
    path.rsplit('/').next().unwrap_or(path)
}

/// Child path `name` under `parent`.
pub fn join(parent: &str, name: &str) -> String {
    let parent = trim_trailing(parent);
    if parent.is_empty() || parent == ROOT {
        format!("/{}", name)
    } else {
        format!("{}/{}", parent, name)
    }
}

/// Whether `path` lies strictly below `ancestor`.
pub fn is_descendant(path: &str, ancestor: &str) -> bool {
    if ancestor == ROOT {
        return path != ROOT && path.starts_with('/');
    }
    path.len() > ancestor.len()
        && path.starts_with(ancestor)
        && path.as_bytes()[ancestor.len()] == b'/'
}

/// Number of segments (`/` is 0, `/src` is 1).
pub fn depth(path: &str) -> usize {
    path.split('/').filter(|s| !s.is_empty()).count()
}

fn trim_trailing(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() && path.starts_with('/') {
        ROOT
    } else {
        trimmed
    }
}
