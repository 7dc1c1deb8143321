//! Vault path helpers.
//!
//! Vault paths are `/`-separated and rooted at `/`, independent of the host
//! platform: `/03 People/Ada.md`.

/// Normalizes a vault path: `\` becomes `/`, empty and `.` segments are
/// dropped, and the result always starts with `/`.
pub fn normalize(path: &str) -> String {
    let segments: Vec<&str> = path
        .split(['/', '\\'])
        .filter(|s| !s.is_empty() && *s != ".")
        .collect();
    format!("/{}", segments.join("/"))
}

/// True when any segment walks upwards.
pub fn has_parent_segment(path: &str) -> bool {
    path.split(['/', '\\']).any(|s| s == "..")
}

/// Containing folder of a vault path. Top-level notes live in `/`.
pub fn parent_folder(path: &str) -> String {
    let path = normalize(path);
    match path.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(idx) => path[..idx].to_string(),
    }
}

pub fn file_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

pub fn join(folder: &str, name: &str) -> String {
    let folder = normalize(folder);
    if folder == "/" {
        format!("/{name}")
    } else {
        format!("{folder}/{name}")
    }
}

pub fn same_folder(a: &str, b: &str) -> bool {
    normalize(a) == normalize(b)
}

/// Returns true if `path` starts with any of the ignore prefixes.
/// Both sides are compared in normalized form; matching is a plain string
/// prefix test.
pub fn is_ignored(path: &str, prefixes: &[String]) -> bool {
    let path = normalize(path);
    prefixes
        .iter()
        .any(|prefix| path.starts_with(&normalize(prefix)))
}
