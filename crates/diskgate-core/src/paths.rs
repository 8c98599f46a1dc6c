//! Disk path helpers

/// Prefix the provider uses for paths on the user's disk
pub const DISK_PREFIX: &str = "disk:/";

/// Normalize a user-supplied path to the `disk:/` form.
///
/// An empty path stays empty, an already prefixed path is kept as is and
/// anything else gets the prefix with leading slashes removed.
pub fn normalize_disk_path(path: &str) -> String {
    if path.is_empty() || path.starts_with(DISK_PREFIX) {
        return path.to_string();
    }
    format!("{}{}", DISK_PREFIX, path.trim_start_matches('/'))
}

/// Path of `new_name` placed next to `path`.
///
/// A path ending in `/` names a directory, so the new name goes inside it.
pub fn sibling_path(path: &str, new_name: &str) -> String {
    match path.rsplit_once('/') {
        Some(("", last)) if !last.is_empty() => format!("{}{}", DISK_PREFIX, new_name),
        Some((parent, last)) if !last.is_empty() => format!("{}/{}", parent, new_name),
        _ if path == DISK_PREFIX => format!("{}{}", DISK_PREFIX, new_name),
        _ => format!("{}/{}", path.trim_end_matches('/'), new_name),
    }
}

/// Last path segment, if any
pub fn file_name(path: &str) -> Option<&str> {
    path.strip_prefix(DISK_PREFIX)
        .unwrap_or(path)
        .rsplit('/')
        .find(|segment| !segment.is_empty())
}
