use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Characters never allowed in a stored filename: path separators,
    /// NUL and other control characters.
    pub static ref UNSAFE_FILENAME_CHARS: Regex = Regex::new(r#"[/\\\x00-\x1f]"#).unwrap();
}

/// Reduce a client-supplied filename to a safe final path component.
///
/// Directory prefixes are stripped, unsafe characters are replaced with `_`,
/// and degenerate results (`""`, `"."`, `".."`) fall back to `unnamed`.
pub fn sanitize_filename(raw: &str) -> String {
    let base = raw
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or("")
        .trim()
        .to_string();

    let cleaned = UNSAFE_FILENAME_CHARS.replace_all(&base, "_");
    let cleaned = cleaned.trim();

    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        "unnamed".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Whether a name can be safely looked up in the upload directory.
///
/// Stricter than `sanitize_filename`: lookups reject instead of rewriting,
/// so a traversal attempt can never alias an existing blob.
pub fn is_safe_filename(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !UNSAFE_FILENAME_CHARS.is_match(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_keeps_plain_names() {
        assert_eq!(sanitize_filename("report.pdf"), "report.pdf");
        assert_eq!(sanitize_filename("photo 2024.jpg"), "photo 2024.jpg");
        assert_eq!(sanitize_filename(".gitignore"), ".gitignore");
    }

    #[test]
    fn test_sanitize_strips_directories() {
        assert_eq!(sanitize_filename("/etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("..\\..\\boot.ini"), "boot.ini");
        assert_eq!(sanitize_filename("a/b/c/report.pdf"), "report.pdf");
    }

    #[test]
    fn test_sanitize_degenerate_names() {
        assert_eq!(sanitize_filename(""), "unnamed");
        assert_eq!(sanitize_filename("   "), "unnamed");
        assert_eq!(sanitize_filename(".."), "unnamed");
        assert_eq!(sanitize_filename("dir/"), "unnamed");
    }

    #[test]
    fn test_sanitize_replaces_control_chars() {
        assert_eq!(sanitize_filename("re\x00port.pdf"), "re_port.pdf");
    }

    #[test]
    fn test_is_safe_filename() {
        assert!(is_safe_filename("report.pdf"));
        assert!(is_safe_filename("report copy1.pdf"));
        assert!(!is_safe_filename(""));
        assert!(!is_safe_filename(".."));
        assert!(!is_safe_filename("../secret"));
        assert!(!is_safe_filename("a\\b"));
        assert!(!is_safe_filename("a\x1fb"));
    }
}
