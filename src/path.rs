use regex::Regex;
use std::sync::OnceLock;

/// Clean up a relative path or URL.
///
/// `/site/pivotx/../index.php` becomes `/site/index.php`. Backslashes are
/// turned into slashes, runs of slashes are collapsed (except the one after an
/// `http:`/`https:` scheme), `.` segments are dropped and trailing slashes are
/// removed.
pub fn fix_path(path: &str) -> String {
    normalize(path, false)
}

/// Like [`fix_path`], but a leading `//` (protocol-relative URL) is kept.
pub fn fix_path_keep_leading_slashes(path: &str) -> String {
    normalize(path, true)
}

fn normalize(path: &str, keep_leading_double_slash: bool) -> String {
    static SLASHES: OnceLock<Regex> = OnceLock::new();
    let slashes = SLASHES.get_or_init(|| Regex::new("/+").expect("static regex"));

    let path = path.replace('\\', "/");
    let path = path.trim_end_matches('/');

    let (lead, path) = match path.strip_prefix("//") {
        Some(rest) if keep_leading_double_slash => ("//", rest),
        _ => ("", path),
    };

    let collapsed = slashes.replace_all(path, "/");
    let mut segments: Vec<&str> = Vec::new();

    for segment in collapsed.split('/') {
        match segment {
            ".." => {
                segments.pop();
            }
            "." => {}
            "http:" => segments.push("http:/"),
            "https:" => segments.push("https:/"),
            other => segments.push(other),
        }
    }

    format!("{}{}", lead, segments.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parent_segment_removes_previous() {
        assert_eq!(fix_path("/site/pivotx/../index.php"), "/site/index.php");
    }

    #[test]
    fn test_scheme_double_slash_preserved() {
        assert_eq!(fix_path("https://host//a//b/"), "https://host/a/b");
        assert_eq!(fix_path("http://example.com/de/"), "http://example.com/de");
    }

    #[test]
    fn test_query_string_untouched() {
        assert_eq!(fix_path("/about?lang=de"), "/about?lang=de");
        assert_eq!(fix_path("//about/?lang=de"), "/about/?lang=de");
    }

    #[test]
    fn test_current_dir_segments_dropped() {
        assert_eq!(fix_path("/a/./b/."), "/a/b");
    }

    #[test]
    fn test_backslashes_become_slashes() {
        assert_eq!(fix_path("\\files\\img.png"), "/files/img.png");
    }

    #[test]
    fn test_root_collapses_to_empty() {
        assert_eq!(fix_path("/"), "");
        assert_eq!(fix_path("///"), "");
    }

    #[test]
    fn test_parent_past_root() {
        assert_eq!(fix_path("/../a"), "a");
    }

    #[test]
    fn test_leading_double_slash_modes() {
        assert_eq!(fix_path("//cdn.example.com//x"), "/cdn.example.com/x");
        assert_eq!(
            fix_path_keep_leading_slashes("//cdn.example.com//x"),
            "//cdn.example.com/x"
        );
    }
}
