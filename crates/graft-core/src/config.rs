//! Run configuration for scanning and extraction.

use serde::{Deserialize, Serialize};

use crate::errors::{GraftError, GraftResult};

/// Settings that control which files are scanned and which structural
/// details the parsers extract.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GraftConfig {
    /// Glob patterns a file must match to be scanned; empty means "any
    /// file a registered parser understands".
    pub include_patterns: Vec<String>,
    /// Glob patterns (or directory names) excluded from the scan.
    pub exclude_patterns: Vec<String>,

    /// File stems treated as entry points for snapshot reporting and the
    /// analyzer's size-based fallback.
    pub entry_point_files: Vec<String>,
    /// Function names that mark a file as an entry point.
    pub entry_point_functions: Vec<String>,

    pub extract_docstrings: bool,
    pub extract_type_hints: bool,
    pub extract_decorators: bool,
    pub extract_base_classes: bool,
    /// Include names starting with a single underscore.
    pub include_private: bool,
    /// Include dunder names (`__init__`) even when private names are skipped.
    pub include_magic_methods: bool,
}

impl Default for GraftConfig {
    fn default() -> Self {
        GraftConfig {
            include_patterns: Vec::new(),
            exclude_patterns: vec![
                "__pycache__".to_string(),
                "*.pyc".to_string(),
                ".git".to_string(),
                ".pytest_cache".to_string(),
                "node_modules".to_string(),
                "build".to_string(),
                "dist".to_string(),
                "*.egg-info".to_string(),
                ".venv".to_string(),
                "venv".to_string(),
            ],
            entry_point_files: vec![
                "main".to_string(),
                "app".to_string(),
                "run".to_string(),
                "start".to_string(),
                "__main__".to_string(),
            ],
            entry_point_functions: vec![
                "main".to_string(),
                "run".to_string(),
                "start".to_string(),
                "execute".to_string(),
            ],
            extract_docstrings: true,
            extract_type_hints: true,
            extract_decorators: true,
            extract_base_classes: true,
            include_private: false,
            include_magic_methods: true,
        }
    }
}

impl GraftConfig {
    /// Name inclusion policy shared by every parser: single-underscore names
    /// are skipped unless `include_private`, dunder names survive when
    /// `include_magic_methods`.
    pub fn includes_name(&self, name: &str) -> bool {
        if !name.starts_with('_') || self.include_private {
            return true;
        }
        name.starts_with("__") && name.ends_with("__") && self.include_magic_methods
    }

    pub fn validate(&self) -> GraftResult<()> {
        for pattern in self.exclude_patterns.iter().chain(&self.include_patterns) {
            if pattern.trim().is_empty() {
                return Err(GraftError::Config(
                    "empty include/exclude pattern".to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_policy_default() {
        let config = GraftConfig::default();
        assert!(config.includes_name("add"));
        assert!(!config.includes_name("_helper"));
        // Magic methods survive the private filter by default.
        assert!(config.includes_name("__init__"));
    }

    #[test]
    fn test_name_policy_include_private() {
        let config = GraftConfig {
            include_private: true,
            ..GraftConfig::default()
        };
        assert!(config.includes_name("_helper"));
    }

    #[test]
    fn test_name_policy_no_magic() {
        let config = GraftConfig {
            include_magic_methods: false,
            ..GraftConfig::default()
        };
        assert!(!config.includes_name("__init__"));
        assert!(!config.includes_name("_helper"));
    }

    #[test]
    fn test_validate_rejects_blank_pattern() {
        let config = GraftConfig {
            exclude_patterns: vec!["  ".to_string()],
            ..GraftConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
