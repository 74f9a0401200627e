use cow_utils::CowUtils;
use std::path::{Path, PathBuf};

/// Normalize line endings to LF (\n) for cross-platform consistency
/// This ensures reproducible builds regardless of the platform where bundling occurs
pub fn normalize_line_endings(content: String) -> String {
    // Replace Windows CRLF (\r\n) and Mac CR (\r) with Unix LF (\n)
    content
        .cow_replace("\r\n", "\n")
        .cow_replace('\r', "\n")
        .into_owned()
}

/// Resolve a configured path against the project root, leaving absolute paths alone.
pub fn resolve_path(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

/// Reserved words that can never be the name of a default-exported binding.
const RESERVED_WORDS: &[&str] = &[
    "async", "await", "break", "case", "catch", "class", "const", "continue", "debugger",
    "default", "delete", "do", "else", "enum", "export", "extends", "false", "finally", "for",
    "function", "if", "import", "in", "instanceof", "let", "new", "null", "return", "static",
    "super", "switch", "this", "throw", "true", "try", "typeof", "var", "void", "while", "with",
    "yield",
];

pub fn is_reserved_word(word: &str) -> bool {
    RESERVED_WORDS.contains(&word)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_line_endings() {
        assert_eq!(
            normalize_line_endings("a\r\nb\rc\n".to_owned()),
            "a\nb\nc\n"
        );
    }

    #[test]
    fn test_resolve_path() {
        let root = Path::new("/project");
        assert_eq!(
            resolve_path(root, Path::new("src/a.js")),
            PathBuf::from("/project/src/a.js")
        );
        #[cfg(not(windows))]
        assert_eq!(
            resolve_path(root, Path::new("/abs/a.js")),
            PathBuf::from("/abs/a.js")
        );
    }

    #[test]
    fn test_reserved_words() {
        assert!(is_reserved_word("function"));
        assert!(is_reserved_word("class"));
        assert!(!is_reserved_word("LiteGraph"));
    }
}
