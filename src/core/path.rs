//! Normalized index paths
//!
//! Every lookup key is a cleaned, slash-separated path relative to the pack
//! root. The root itself is the empty string.

/// Clean a path into index form
///
/// Empty and `.` segments are dropped, `..` pops the previous segment and
/// never climbs above the root, leading and trailing slashes disappear.
pub fn clean_path(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}

/// Split a cleaned path into parent path and base name
pub fn split_parent(path: &str) -> (&str, &str) {
    match path.rfind('/') {
        Some(idx) => (&path[..idx], &path[idx + 1..]),
        None => ("", path),
    }
}

/// Base name of a cleaned path (empty for the root)
pub fn base_name(path: &str) -> &str {
    split_parent(path).1
}

/// Join a cleaned parent path and a child name
pub fn join(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", parent, name)
    }
}

/// Every proper ancestor of a cleaned path, nearest first, ending at the root
pub fn ancestors(path: &str) -> impl Iterator<Item = &str> {
    let mut current = Some(path);
    std::iter::from_fn(move || {
        let p = current?;
        if p.is_empty() {
            current = None;
            return None;
        }
        let (parent, _) = split_parent(p);
        current = Some(parent);
        Some(parent)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_path() {
        assert_eq!(clean_path(""), "");
        assert_eq!(clean_path("."), "");
        assert_eq!(clean_path("/"), "");
        assert_eq!(clean_path("/index.html"), "index.html");
        assert_eq!(clean_path("a//b/./c/"), "a/b/c");
        assert_eq!(clean_path("a/b/../c"), "a/c");
        assert_eq!(clean_path("../../etc/passwd"), "etc/passwd");
        assert_eq!(clean_path("/a/../../b"), "b");
    }

    #[test]
    fn test_split_and_join() {
        assert_eq!(split_parent("a/b/c.txt"), ("a/b", "c.txt"));
        assert_eq!(split_parent("c.txt"), ("", "c.txt"));
        assert_eq!(base_name(""), "");
        assert_eq!(join("", "x"), "x");
        assert_eq!(join("a/b", "x"), "a/b/x");
    }

    #[test]
    fn test_ancestors() {
        let all: Vec<_> = ancestors("a/b/c.txt").collect();
        assert_eq!(all, vec!["a/b", "a", ""]);
        assert_eq!(ancestors("top.txt").collect::<Vec<_>>(), vec![""]);
        assert_eq!(ancestors("").count(), 0);
    }
}
