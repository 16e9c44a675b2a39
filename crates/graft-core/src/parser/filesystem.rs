//! Filesystem scanning helpers for the snapshot pass.

use std::path::Path;

use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use crate::config::GraftConfig;

const LANGUAGE_BY_EXTENSION: &[(&str, &str)] = &[
    (".py", "python"),
    (".pyi", "python"),
    (".ts", "typescript"),
    (".tsx", "typescript"),
];

/// Map a path to a language identifier by extension.
pub fn detect_language(path: &str) -> Option<&'static str> {
    let ext = Path::new(path)
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))?;
    LANGUAGE_BY_EXTENSION
        .iter()
        .find(|(e, _)| *e == ext.as_str())
        .map(|(_, lang)| *lang)
}

/// Simple glob match supporting `*` and `?`.
pub fn glob_match(text: &str, pattern: &str) -> bool {
    let t_chars: Vec<char> = text.chars().collect();
    let p_chars: Vec<char> = pattern.chars().collect();
    let (tl, pl) = (t_chars.len(), p_chars.len());
    let mut dp = vec![vec![false; pl + 1]; tl + 1];
    dp[0][0] = true;
    for j in 1..=pl {
        if p_chars[j - 1] == '*' {
            dp[0][j] = dp[0][j - 1];
        }
    }
    for i in 1..=tl {
        for j in 1..=pl {
            if p_chars[j - 1] == '*' {
                dp[i][j] = dp[i][j - 1] || dp[i - 1][j];
            } else if p_chars[j - 1] == '?' || t_chars[i - 1] == p_chars[j - 1] {
                dp[i][j] = dp[i - 1][j - 1];
            }
        }
    }
    dp[tl][pl]
}

/// A relative path matches a pattern if the whole path or its file name does.
fn matches_pattern(rel_path: &str, pattern: &str) -> bool {
    if glob_match(rel_path, pattern) {
        return true;
    }
    // Bare directory names exclude everything beneath them.
    if rel_path
        .split('/')
        .any(|component| glob_match(component, pattern))
    {
        return true;
    }
    Path::new(rel_path)
        .file_name()
        .map(|f| glob_match(&f.to_string_lossy(), pattern))
        .unwrap_or(false)
}

pub fn is_excluded(rel_path: &str, config: &GraftConfig) -> bool {
    config
        .exclude_patterns
        .iter()
        .any(|p| matches_pattern(rel_path, p.trim_end_matches('/')))
}

fn matches_include(rel_path: &str, config: &GraftConfig) -> bool {
    if config.include_patterns.is_empty() {
        return true;
    }
    config
        .include_patterns
        .iter()
        .any(|p| matches_pattern(rel_path, p))
}

/// Walk `root` and return the relative (forward-slash) paths of every file
/// that passes the include/exclude filters and has a detectable language.
pub fn iter_project_files(root: &Path, config: &GraftConfig) -> Vec<String> {
    let mut result = Vec::new();
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            let rel = entry
                .path()
                .strip_prefix(root)
                .unwrap_or(entry.path())
                .to_string_lossy()
                .replace('\\', "/");
            rel.is_empty() || !is_excluded(&rel, config)
        });

    for entry in walker.flatten() {
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(root)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .replace('\\', "/");
        if detect_language(&rel).is_none() {
            continue;
        }
        if !matches_include(&rel, config) {
            continue;
        }
        result.push(rel);
    }
    result
}

/// SHA-256 hex digest of a file's contents.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_detect_language() {
        assert_eq!(detect_language("src/calc.py"), Some("python"));
        assert_eq!(detect_language("ui/App.TSX"), Some("typescript"));
        assert_eq!(detect_language("README.md"), None);
        assert_eq!(detect_language("Makefile"), None);
    }

    #[test]
    fn test_glob_match() {
        assert!(glob_match("calc.pyc", "*.pyc"));
        assert!(glob_match("graft.egg-info", "*.egg-info"));
        assert!(!glob_match("calc.py", "*.pyc"));
        assert!(glob_match("ab", "a?"));
    }

    #[test]
    fn test_excluded_directory_component() {
        let config = GraftConfig::default();
        assert!(is_excluded("src/__pycache__/calc.cpython-311.py", &config));
        assert!(is_excluded("venv/lib/thing.py", &config));
        assert!(!is_excluded("src/calc.py", &config));
    }

    #[test]
    fn test_iter_project_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("src/__pycache__")).unwrap();
        fs::write(root.join("src/calc.py"), "def add(a, b):\n    return a + b\n").unwrap();
        fs::write(root.join("src/__pycache__/calc.pyc"), "x").unwrap();
        fs::write(root.join("notes.txt"), "not code").unwrap();
        fs::write(root.join("app.ts"), "export function go() {}\n").unwrap();

        let files = iter_project_files(root, &GraftConfig::default());
        assert_eq!(files, vec!["app.ts".to_string(), "src/calc.py".to_string()]);
    }

    #[test]
    fn test_content_hash_stable() {
        assert_eq!(content_hash("abc"), content_hash("abc"));
        assert_ne!(content_hash("abc"), content_hash("abd"));
    }
}
