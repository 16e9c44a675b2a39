//! Applies change batches to the output tree.
//!
//! Batch semantics are fail-soft: every change is attempted, each failure is
//! recorded on its descriptor, and the batch never aborts early.  There is no
//! rollback; the caller keeps a pre-batch copy of the tree if it needs one.

pub mod splice;

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexSet;
use tracing::{debug, info, warn};

use crate::models::{ChangeDescriptor, ChangeKind};

pub struct CodeIntegrator {
    output_root: PathBuf,
    files_created: IndexSet<String>,
    files_modified: IndexSet<String>,
    tests_generated: IndexSet<String>,
}

impl CodeIntegrator {
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        CodeIntegrator {
            output_root: output_root.into(),
            files_created: IndexSet::new(),
            files_modified: IndexSet::new(),
            tests_generated: IndexSet::new(),
        }
    }

    /// Apply every change in order, marking each descriptor applied or
    /// failed in place.  Returns the number of changes applied.
    pub fn apply(&mut self, changes: &mut [ChangeDescriptor]) -> usize {
        info!(count = changes.len(), "applying change batch");

        let applied = changes.iter_mut().fold(0usize, |applied, change| {
            match self.apply_one(change) {
                Ok(()) => {
                    change.mark_applied();
                    debug!(kind = ?change.kind, path = %change.file_path, "applied change");
                    applied + 1
                }
                Err(message) => {
                    warn!(kind = ?change.kind, path = %change.file_path, %message, "change failed");
                    change.mark_failed(message);
                    applied
                }
            }
        });

        info!(applied, total = changes.len(), "change batch finished");
        applied
    }

    /// Paths created during this run, relative to the output root, in first
    /// application order.
    pub fn files_created(&self) -> Vec<String> {
        self.files_created.iter().cloned().collect()
    }

    pub fn files_modified(&self) -> Vec<String> {
        self.files_modified.iter().cloned().collect()
    }

    pub fn tests_generated(&self) -> Vec<String> {
        self.tests_generated.iter().cloned().collect()
    }

    fn apply_one(&mut self, change: &ChangeDescriptor) -> Result<(), String> {
        match change.kind {
            ChangeKind::CreateFile => self.create_file(&change.file_path, &change.content),
            ChangeKind::ModifyFile => self.modify_file(&change.file_path, &change.content),
            ChangeKind::AddFunction | ChangeKind::AddClass => {
                self.add_symbol(&change.file_path, &change.content)
            }
            ChangeKind::AddMethod => self.add_method(change),
            ChangeKind::AddImport => self.add_import(&change.file_path, &change.content),
            ChangeKind::CreateTest => self.create_test(&change.file_path, &change.content),
        }
    }

    fn target(&self, rel_path: &str) -> PathBuf {
        self.output_root.join(rel_path)
    }

    fn read_target(&self, rel_path: &str) -> Result<String, String> {
        fs::read_to_string(self.target(rel_path))
            .map_err(|e| format!("Failed to read {rel_path}: {e}"))
    }

    fn write_target(&self, rel_path: &str, content: &str) -> Result<(), String> {
        fs::write(self.target(rel_path), content)
            .map_err(|e| format!("Failed to write {rel_path}: {e}"))
    }

    fn create_file(&mut self, rel_path: &str, content: &str) -> Result<(), String> {
        let target = self.target(rel_path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create directories for {rel_path}: {e}"))?;
        }
        self.write_target(rel_path, content)?;
        self.files_created.insert(rel_path.to_string());
        Ok(())
    }

    fn modify_file(&mut self, rel_path: &str, content: &str) -> Result<(), String> {
        if !self.target(rel_path).exists() {
            return Err(format!("File {rel_path} does not exist for modification"));
        }
        self.write_target(rel_path, content)?;
        self.files_modified.insert(rel_path.to_string());
        Ok(())
    }

    fn add_symbol(&mut self, rel_path: &str, content: &str) -> Result<(), String> {
        if !self.target(rel_path).exists() {
            return self.create_file(rel_path, content);
        }
        let original = self.read_target(rel_path)?;
        self.write_target(rel_path, &splice::append_symbol(&original, content))?;
        self.files_modified.insert(rel_path.to_string());
        Ok(())
    }

    fn add_method(&mut self, change: &ChangeDescriptor) -> Result<(), String> {
        let class_name = change
            .target_class
            .as_deref()
            .ok_or_else(|| "No target class specified for method addition".to_string())?;
        if !self.target(&change.file_path).exists() {
            return Err(format!(
                "File {} does not exist for method addition",
                change.file_path
            ));
        }
        let original = self.read_target(&change.file_path)?;
        let updated = splice::add_method(&original, class_name, &change.content)
            .map_err(|e| format!("{e} in {}", change.file_path))?;
        self.write_target(&change.file_path, &updated)?;
        self.files_modified.insert(change.file_path.clone());
        Ok(())
    }

    fn add_import(&mut self, rel_path: &str, statement: &str) -> Result<(), String> {
        if !self.target(rel_path).exists() {
            return self.create_file(rel_path, &format!("{}\n", statement.trim()));
        }
        let original = self.read_target(rel_path)?;
        match splice::insert_import(&original, statement) {
            // Already present: success with no write and no modified record.
            None => Ok(()),
            Some(updated) => {
                self.write_target(rel_path, &updated)?;
                self.files_modified.insert(rel_path.to_string());
                Ok(())
            }
        }
    }

    fn create_test(&mut self, rel_path: &str, content: &str) -> Result<(), String> {
        let rel_path = rewrite_test_path(rel_path);
        self.create_file(&rel_path, content)?;
        self.tests_generated.insert(rel_path);
        Ok(())
    }
}

/// Ensure a generated test lands in a `tests/` directory with a `test_`
/// name prefix; paths that already mention a test location pass through.
fn rewrite_test_path(rel_path: &str) -> String {
    if rel_path.to_lowercase().contains("test") {
        return rel_path.to_string();
    }
    let path = Path::new(rel_path);
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| rel_path.to_string());
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            format!("{}/tests/test_{}", parent.to_string_lossy().replace('\\', "/"), name)
        }
        _ => format!("tests/test_{name}"),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::python::PythonParser;
    use crate::parser::LanguageParser;
    use tempfile::TempDir;

    fn write(root: &TempDir, rel: &str, content: &str) {
        let path = root.path().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn read(root: &TempDir, rel: &str) -> String {
        fs::read_to_string(root.path().join(rel)).unwrap()
    }

    #[test]
    fn test_create_file_makes_parent_dirs() {
        let root = TempDir::new().unwrap();
        let mut integrator = CodeIntegrator::new(root.path());
        let mut changes = vec![ChangeDescriptor::new(
            ChangeKind::CreateFile,
            "pkg/sub/util.py",
            "def helper():\n    pass\n",
            "R1",
        )];
        assert_eq!(integrator.apply(&mut changes), 1);
        assert!(changes[0].applied);
        assert_eq!(read(&root, "pkg/sub/util.py"), "def helper():\n    pass\n");
        assert_eq!(integrator.files_created(), vec!["pkg/sub/util.py"]);
    }

    #[test]
    fn test_modify_missing_file_fails_soft() {
        let root = TempDir::new().unwrap();
        let mut integrator = CodeIntegrator::new(root.path());
        let mut changes = vec![ChangeDescriptor::new(
            ChangeKind::ModifyFile,
            "ghost.py",
            "x = 1\n",
            "R1",
        )];
        assert_eq!(integrator.apply(&mut changes), 0);
        assert!(!changes[0].applied);
        assert!(changes[0].error_message.contains("does not exist"));
    }

    #[test]
    fn test_batch_fail_soft_counts() {
        let root = TempDir::new().unwrap();
        write(&root, "calc.py", "def add(a, b):\n    return a + b\n");
        let mut integrator = CodeIntegrator::new(root.path());

        let mut changes = vec![
            ChangeDescriptor::new(
                ChangeKind::AddFunction,
                "calc.py",
                "def sub(a, b):\n    return a - b",
                "R1",
            ),
            // Invalid: no such file for modification.
            ChangeDescriptor::new(ChangeKind::ModifyFile, "missing.py", "x = 1\n", "R2"),
            // Invalid: class not present.
            ChangeDescriptor::new(ChangeKind::AddMethod, "calc.py", "def m(self):\n    pass", "R3")
                .with_target_class("Ghost"),
            ChangeDescriptor::new(ChangeKind::AddImport, "calc.py", "import math", "R4"),
        ];

        assert_eq!(integrator.apply(&mut changes), 2);
        let failed: Vec<_> = changes.iter().filter(|c| !c.applied).collect();
        assert_eq!(failed.len(), 2);
        assert!(failed.iter().all(|c| !c.error_message.is_empty()));
    }

    #[test]
    fn test_add_function_appends_with_blank_line() {
        let root = TempDir::new().unwrap();
        write(&root, "calc.py", "def add(a, b):\n    return a + b\n");
        let mut integrator = CodeIntegrator::new(root.path());
        let mut changes = vec![ChangeDescriptor::new(
            ChangeKind::AddFunction,
            "calc.py",
            "def sub(a, b):\n    return a - b",
            "R1",
        )];
        integrator.apply(&mut changes);
        assert_eq!(
            read(&root, "calc.py"),
            "def add(a, b):\n    return a + b\n\ndef sub(a, b):\n    return a - b\n"
        );
        assert_eq!(integrator.files_modified(), vec!["calc.py"]);
    }

    #[test]
    fn test_add_function_creates_missing_file() {
        let root = TempDir::new().unwrap();
        let mut integrator = CodeIntegrator::new(root.path());
        let mut changes = vec![ChangeDescriptor::new(
            ChangeKind::AddFunction,
            "fresh.py",
            "def f():\n    pass\n",
            "R1",
        )];
        integrator.apply(&mut changes);
        assert!(changes[0].applied);
        assert_eq!(integrator.files_created(), vec!["fresh.py"]);
        assert!(integrator.files_modified().is_empty());
    }

    #[test]
    fn test_add_method_splices_into_class() {
        let root = TempDir::new().unwrap();
        write(
            &root,
            "calc.py",
            "class Calculator:\n    def add(self, a, b):\n        return a + b\n",
        );
        let mut integrator = CodeIntegrator::new(root.path());
        let mut changes = vec![ChangeDescriptor::new(
            ChangeKind::AddMethod,
            "calc.py",
            "def sub(self, a, b):\n    return a - b",
            "R1",
        )
        .with_target_class("Calculator")];
        integrator.apply(&mut changes);
        assert!(changes[0].applied);
        let content = read(&root, "calc.py");
        assert!(content.contains("\n    def sub(self, a, b):\n        return a - b"));
    }

    #[test]
    fn test_unicode_whitespace_fragment_does_not_stop_batch() {
        let root = TempDir::new().unwrap();
        write(
            &root,
            "calc.py",
            "class Calculator:\n    def add(self, a, b):\n        return a + b\n",
        );
        let mut integrator = CodeIntegrator::new(root.path());
        let mut changes = vec![
            ChangeDescriptor::new(
                ChangeKind::AddMethod,
                "calc.py",
                "\u{a0}def neg(self, a):\n return -a",
                "R1",
            )
            .with_target_class("Calculator"),
            ChangeDescriptor::new(ChangeKind::AddImport, "calc.py", "import math", "R1"),
        ];
        // Every change in the batch is attempted, including the one after
        // the mixed-whitespace fragment.
        assert_eq!(integrator.apply(&mut changes), 2);
        assert!(changes.iter().all(|c| c.applied));
        let content = read(&root, "calc.py");
        assert!(content.starts_with("import math\n"));
        assert!(content.contains("\n    def neg(self, a):"));
    }

    #[test]
    fn test_add_import_twice_yields_one_line() {
        let root = TempDir::new().unwrap();
        write(&root, "calc.py", "def f():\n    pass\n");
        let mut integrator = CodeIntegrator::new(root.path());

        for _ in 0..2 {
            let mut changes = vec![ChangeDescriptor::new(
                ChangeKind::AddImport,
                "calc.py",
                "import math",
                "R1",
            )];
            assert_eq!(integrator.apply(&mut changes), 1);
        }
        let content = read(&root, "calc.py");
        assert_eq!(content.matches("import math").count(), 1);
        assert!(content.starts_with("import math\n"));
    }

    #[test]
    fn test_create_test_rewrites_path() {
        let root = TempDir::new().unwrap();
        let mut integrator = CodeIntegrator::new(root.path());
        let mut changes = vec![
            ChangeDescriptor::new(
                ChangeKind::CreateTest,
                "src/calc.py",
                "def test_add():\n    assert True\n",
                "R1",
            ),
            ChangeDescriptor::new(
                ChangeKind::CreateTest,
                "tests/test_util.py",
                "def test_util():\n    assert True\n",
                "R2",
            ),
        ];
        assert_eq!(integrator.apply(&mut changes), 2);
        assert!(root.path().join("src/tests/test_calc.py").exists());
        assert!(root.path().join("tests/test_util.py").exists());
        assert_eq!(
            integrator.tests_generated(),
            vec!["src/tests/test_calc.py", "tests/test_util.py"]
        );
    }

    #[test]
    fn test_create_then_reparse_roundtrip() {
        let root = TempDir::new().unwrap();
        let mut integrator = CodeIntegrator::new(root.path());
        let mut changes = vec![ChangeDescriptor::new(
            ChangeKind::CreateFile,
            "gen.py",
            "def multiply(a, b):\n    \"\"\"Multiply two numbers.\"\"\"\n    return a * b\n",
            "R1",
        )];
        integrator.apply(&mut changes);

        let parser = PythonParser::new(Default::default());
        let unit = parser.parse("gen.py", &read(&root, "gen.py"));
        assert_eq!(unit.functions.len(), 1);
        assert_eq!(unit.functions[0].name, "multiply");
    }
}
