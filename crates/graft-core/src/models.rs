//! Shared typed models used across parsing, analysis, and integration layers.
//!
//! Everything here is language-neutral: the analyzer and integrator consume
//! only these shapes and never a specific parser's node types.  All records
//! serialize with serde so a project snapshot can be written to disk and
//! reloaded by a later run.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Structural descriptors (produced by the Source Parser)
// ---------------------------------------------------------------------------

/// A function or method extracted from one source file.
///
/// Parameters keep their annotation text when the parser extracted type
/// hints (`"count: int"`), otherwise just the bare name.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FunctionDescriptor {
    pub name: String,
    pub parameters: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docstring: Option<String>,
    pub start_line: usize,
    pub end_line: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub decorators: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_type: Option<String>,
    #[serde(default)]
    pub is_async: bool,
}

/// A class extracted from one source file, with its methods collected by the
/// same extraction logic as file-level functions.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ClassDescriptor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub base_classes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub decorators: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docstring: Option<String>,
    pub start_line: usize,
    pub end_line: usize,
    pub methods: Vec<FunctionDescriptor>,
}

/// The structural summary of one source file.
///
/// Produced wholesale by `parse()` and immutable afterwards; a re-parse
/// replaces the unit rather than updating it.  A file that failed to parse
/// still yields a unit, with empty descriptor lists and `parse_error` set,
/// so one broken file never aborts a project-wide scan.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SourceUnit {
    pub path: String,
    pub language: String,
    pub functions: Vec<FunctionDescriptor>,
    pub classes: Vec<ClassDescriptor>,
    /// Normalized single-line import statements (`import x`, `import x as y`,
    /// `from m import a, b`), aliasing preserved.
    pub imports: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parse_error: Option<String>,
}

impl SourceUnit {
    /// A unit carrying only a parse failure.
    pub fn broken(path: &str, language: &str, message: String) -> Self {
        SourceUnit {
            path: path.to_string(),
            language: language.to_string(),
            parse_error: Some(message),
            ..Default::default()
        }
    }

    /// Combined count of file-level functions and classes, used by the
    /// analyzer's size-based target fallback.
    pub fn symbol_count(&self) -> usize {
        self.functions.len() + self.classes.len()
    }
}

// ---------------------------------------------------------------------------
// Requirements (produced when first seen, mutated by the analyzer)
// ---------------------------------------------------------------------------

/// Lifecycle status of a requirement within one generation run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementStatus {
    New,
    Modified,
    Implemented,
    Failed,
    Skipped,
}

/// One free-text requirement plus everything the analyzer decided about it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RequirementRecord {
    pub id: String,
    pub description: String,
    pub status: RequirementStatus,
    /// Heuristic implementation difficulty, clamped to [1.0, 5.0].
    pub complexity_score: f64,
    /// Candidate files for the implementation, best first.
    pub target_files: Vec<String>,
    pub dependencies: Vec<String>,
    pub implementation_notes: String,
    #[serde(default)]
    pub error_message: String,
}

impl RequirementRecord {
    pub fn new(id: &str, description: &str) -> Self {
        RequirementRecord {
            id: id.to_string(),
            description: description.to_string(),
            status: RequirementStatus::New,
            complexity_score: 1.0,
            target_files: Vec::new(),
            dependencies: Vec::new(),
            implementation_notes: String::new(),
            error_message: String::new(),
        }
    }

    pub fn mark_implemented(&mut self) {
        self.status = RequirementStatus::Implemented;
        self.error_message.clear();
    }

    pub fn mark_failed(&mut self, message: impl Into<String>) {
        self.status = RequirementStatus::Failed;
        self.error_message = message.into();
    }
}

// ---------------------------------------------------------------------------
// Change descriptors (consumed exactly once by the Change Integrator)
// ---------------------------------------------------------------------------

/// Kind of structural edit to apply to the output tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    CreateFile,
    ModifyFile,
    AddFunction,
    AddClass,
    AddMethod,
    AddImport,
    CreateTest,
}

/// A unit of structural edit.  Terminal state is `applied = true` or a
/// non-empty `error_message`; the batch never aborts on a single failure.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChangeDescriptor {
    pub kind: ChangeKind,
    /// Path relative to the output root.
    pub file_path: String,
    pub content: String,
    pub requirement_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insert_line: Option<usize>,
    #[serde(default)]
    pub applied: bool,
    #[serde(default)]
    pub error_message: String,
}

impl ChangeDescriptor {
    pub fn new(kind: ChangeKind, file_path: &str, content: &str, requirement_id: &str) -> Self {
        ChangeDescriptor {
            kind,
            file_path: file_path.to_string(),
            content: content.to_string(),
            requirement_id: requirement_id.to_string(),
            target_class: None,
            insert_line: None,
            applied: false,
            error_message: String::new(),
        }
    }

    pub fn with_target_class(mut self, class_name: &str) -> Self {
        self.target_class = Some(class_name.to_string());
        self
    }

    pub fn mark_applied(&mut self) {
        self.applied = true;
        self.error_message.clear();
    }

    pub fn mark_failed(&mut self, message: impl Into<String>) {
        self.applied = false;
        self.error_message = message.into();
    }
}

// ---------------------------------------------------------------------------
// Coverage report (transient analyzer output, not persisted)
// ---------------------------------------------------------------------------

/// One descriptor that matched requirement keywords.
#[derive(Clone, Debug)]
pub struct CoverageMatch {
    /// Function name, `Class.method` for methods, or class name.
    pub name: String,
    pub file: String,
    pub keyword_hits: usize,
}

/// How much of a requirement the existing code already covers.
#[derive(Clone, Debug, Default)]
pub struct CoverageReport {
    pub functions: Vec<CoverageMatch>,
    pub classes: Vec<CoverageMatch>,
    /// Normalized to [0, 1]; 0 when the keyword set is empty.
    pub coverage_score: f64,
}

// ---------------------------------------------------------------------------
// Reporting (validator boundary + generation run rollup)
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// A line-tagged problem surfaced by any stage.  Also the record shape the
/// external heuristic validator reports through; purely advisory.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Problem {
    pub severity: Severity,
    /// Stage that raised it: "requirement", "generation", "integration", ...
    pub category: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requirement_id: Option<String>,
}

impl Problem {
    pub fn error(category: &str, message: impl Into<String>) -> Self {
        Problem {
            severity: Severity::Error,
            category: category.to_string(),
            message: message.into(),
            file_path: None,
            line: None,
            requirement_id: None,
        }
    }

    pub fn warning(category: &str, message: impl Into<String>) -> Self {
        Problem {
            severity: Severity::Warning,
            ..Problem::error(category, message)
        }
    }

    pub fn for_requirement(mut self, requirement_id: &str) -> Self {
        self.requirement_id = Some(requirement_id.to_string());
        self
    }
}

/// Outcome of one full generation run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStatus {
    Success,
    PartialSuccess,
    Failed,
}

///// Aggregate report for a generation run: per-requirement records, touched
/// path sets, problems, and token spend.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenerationReport {
    pub status: GenerationStatus,
    pub requirements: Vec<RequirementRecord>,
    pub requirements_implemented: usize,
    pub requirements_failed: usize,
    pub requirements_skipped: usize,
    pub files_created: Vec<String>,
    pub files_modified: Vec<String>,
    pub tests_generated: Vec<String>,
    pub problems: Vec<Problem>,
    pub tokens_used: u64,
}

impl GenerationReport {
    pub fn has_errors(&self) -> bool {
        self.problems
            .iter()
            .any(|p| p.severity == Severity::Error)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requirement_lifecycle() {
        let mut req = RequirementRecord::new("REQ-1", "Add two numbers");
        assert_eq!(req.status, RequirementStatus::New);
        assert_eq!(req.complexity_score, 1.0);

        req.mark_failed("analysis blew up");
        assert_eq!(req.status, RequirementStatus::Failed);
        assert_eq!(req.error_message, "analysis blew up");

        req.mark_implemented();
        assert_eq!(req.status, RequirementStatus::Implemented);
        assert!(req.error_message.is_empty());
    }

    #[test]
    fn test_change_terminal_states() {
        let mut change =
            ChangeDescriptor::new(ChangeKind::AddFunction, "calc.py", "def f():\n    pass", "R1");
        assert!(!change.applied);

        change.mark_failed("no such file");
        assert!(!change.applied);
        assert_eq!(change.error_message, "no such file");

        change.mark_applied();
        assert!(change.applied);
        assert!(change.error_message.is_empty());
    }

    #[test]
    fn test_source_unit_roundtrip() {
        let unit = SourceUnit {
            path: "src/calc.py".to_string(),
            language: "python".to_string(),
            functions: vec![FunctionDescriptor {
                name: "add".to_string(),
                parameters: vec!["a".to_string(), "b".to_string()],
                docstring: Some("Add two numbers.".to_string()),
                start_line: 1,
                end_line: 3,
                ..Default::default()
            }],
            imports: vec!["import math".to_string()],
            ..Default::default()
        };

        let json = serde_json::to_string(&unit).unwrap();
        let back: SourceUnit = serde_json::from_str(&json).unwrap();
        assert_eq!(back.path, "src/calc.py");
        assert_eq!(back.functions[0].name, "add");
        assert_eq!(back.symbol_count(), 1);
        assert!(back.parse_error.is_none());
    }

    #[test]
    fn test_broken_unit() {
        let unit = SourceUnit::broken("bad.py", "python", "Syntax error: line 3".to_string());
        assert!(unit.functions.is_empty());
        assert!(unit.classes.is_empty());
        assert_eq!(unit.parse_error.as_deref(), Some("Syntax error: line 3"));
    }
}
