//! End-to-end generation workflow.
//!
//! Scans the project, analyzes requirements, asks the code model for an
//! implementation per requirement, turns the returned text into a change
//! batch, and applies it to a copy of the project tree.  The model and the
//! output validator sit behind traits: this module never performs network
//! I/O itself and makes no retries.

use std::fs;
use std::path::Path;

use tracing::{info, warn};
use walkdir::WalkDir;

use crate::analyzer::RequirementAnalyzer;
use crate::config::GraftConfig;
use crate::errors::{GraftError, GraftResult};
use crate::integrator::CodeIntegrator;
use crate::models::{
    ChangeDescriptor, ChangeKind, GenerationReport, GenerationStatus, Problem,
    RequirementRecord, RequirementStatus,
};
use crate::parser::filesystem;
use crate::parser::snapshot::{scan_project, ProjectSnapshot};
use crate::parser::ParserRegistry;

/// Successful model output: the raw text plus its token cost.
#[derive(Clone, Debug)]
pub struct ModelResponse {
    pub text: String,
    pub tokens_used: u64,
}

/// The external text-generation collaborator.  One blocking call per
/// request, no retry or timeout handling at this layer.
pub trait CodeModel {
    fn generate(&self, system_prompt: &str, prompt: &str) -> GraftResult<ModelResponse>;
}

/// Advisory post-run check over the output tree.  Problems are collected
/// into the report and never change what was written.
pub trait OutputValidator {
    fn validate(&self, output_root: &Path, snapshot: &ProjectSnapshot) -> Vec<Problem>;
}

const CODE_SYSTEM_PROMPT: &str = "You are an expert Python developer. Generate clean, \
well-documented Python code based on requirements.\n\n\
Guidelines:\n\
1. Follow PEP 8 style guidelines\n\
2. Include proper docstrings for functions and classes\n\
3. Add type hints where appropriate\n\
4. Include error handling and validation\n\n\
Respond with only the Python code.";

const TEST_SYSTEM_PROMPT: &str = "You are an expert at writing Python test cases using \
pytest. Generate clean, comprehensive test code covering normal functionality, edge \
cases, and error conditions. Respond with only the Python code.";

/// Substring cues in generated code that imply a stdlib import.
const IMPORT_CUES: &[(&str, &[&str])] = &[
    ("datetime", &["datetime.", "date.today", "timedelta"]),
    ("json", &["json."]),
    ("os", &["os.path", "os.environ", "os.getcwd"]),
    ("sys", &["sys."]),
    ("logging", &["logging."]),
    ("argparse", &["ArgumentParser", "argparse."]),
];

const TYPING_NAMES: &[&str] = &["List", "Dict", "Optional", "Any", "Union"];

pub struct GenerationEngine {
    config: GraftConfig,
    analyzer: RequirementAnalyzer,
}

impl GenerationEngine {
    pub fn new(config: GraftConfig) -> Self {
        GenerationEngine {
            config,
            analyzer: RequirementAnalyzer::new(),
        }
    }

    pub fn with_analyzer(config: GraftConfig, analyzer: RequirementAnalyzer) -> Self {
        GenerationEngine { config, analyzer }
    }

    /// Run the full workflow: snapshot, analyze, copy the tree to
    /// `output_root`, generate and apply changes, generate tests.
    ///
    /// Hard failure is reserved for an unreadable project or an unwritable
    /// output root; everything narrower lands in the report as a failed
    /// requirement, failed change, or problem record.
    pub fn generate(
        &self,
        project_root: &Path,
        requirements: &[(String, String)],
        output_root: &Path,
        model: &dyn CodeModel,
        validator: Option<&dyn OutputValidator>,
    ) -> GraftResult<GenerationReport> {
        self.generate_with_baseline(project_root, requirements, &[], output_root, model, validator)
    }

    /// Like [`generate`](Self::generate), but diffed against the previous
    /// run's requirement set.  A requirement whose description matches its
    /// baseline entry is skipped outright; a changed description is marked
    /// modified and regenerated; everything else is treated as new.
    pub fn generate_with_baseline(
        &self,
        project_root: &Path,
        requirements: &[(String, String)],
        baseline: &[(String, String)],
        output_root: &Path,
        model: &dyn CodeModel,
        validator: Option<&dyn OutputValidator>,
    ) -> GraftResult<GenerationReport> {
        info!(
            project = %project_root.display(),
            requirement_count = requirements.len(),
            baseline_count = baseline.len(),
            "starting generation run"
        );

        let registry = ParserRegistry::with_defaults(&self.config);
        let snapshot = scan_project(project_root, &self.config, &registry)?;
        let mut records = self.analyzer.analyze_all(requirements, &snapshot);

        for record in &mut records {
            match baseline.iter().find(|(id, _)| id == &record.id) {
                Some((_, description)) if *description == record.description => {
                    info!(id = %record.id, "requirement unchanged since last run, skipping");
                    record.status = RequirementStatus::Skipped;
                }
                Some(_) => record.status = RequirementStatus::Modified,
                None => {}
            }
        }

        copy_tree(project_root, output_root, &self.config)?;

        let mut problems: Vec<Problem> = Vec::new();
        let mut tokens_used: u64 = 0;
        let mut changes: Vec<ChangeDescriptor> = Vec::new();

        for record in &mut records {
            if !matches!(
                record.status,
                RequirementStatus::New | RequirementStatus::Modified
            ) {
                continue;
            }
            match generate_for_requirement(record, &snapshot, model) {
                Ok((mut requirement_changes, tokens)) => {
                    tokens_used += tokens;
                    if requirement_changes.is_empty() {
                        record.mark_failed("No valid code changes generated");
                    } else {
                        record.mark_implemented();
                        changes.append(&mut requirement_changes);
                    }
                }
                Err(e) => {
                    warn!(id = %record.id, error = %e, "code generation failed");
                    record.mark_failed(format!("Code generation failed: {e}"));
                    problems.push(
                        Problem::error("generation", e.to_string()).for_requirement(&record.id),
                    );
                }
            }
        }

        let mut integrator = CodeIntegrator::new(output_root);
        integrator.apply(&mut changes);
        for change in changes.iter().filter(|c| !c.applied) {
            problems.push(
                Problem::error("integration", change.error_message.clone())
                    .for_requirement(&change.requirement_id),
            );
        }

        tokens_used += self.generate_tests(&records, model, &mut integrator, &mut problems);

        if let Some(validator) = validator {
            problems.extend(validator.validate(output_root, &snapshot));
        }

        let implemented = records
            .iter()
            .filter(|r| r.status == RequirementStatus::Implemented)
            .count();
        let failed = records
            .iter()
            .filter(|r| r.status == RequirementStatus::Failed)
            .count();
        let skipped = records
            .iter()
            .filter(|r| r.status == RequirementStatus::Skipped)
            .count();
        let has_errors = failed > 0
            || problems
                .iter()
                .any(|p| p.severity == crate::models::Severity::Error);

        let status = if !has_errors {
            GenerationStatus::Success
        } else if implemented > 0 {
            GenerationStatus::PartialSuccess
        } else {
            GenerationStatus::Failed
        };

        info!(?status, implemented, failed, skipped, tokens_used, "generation run finished");

        Ok(GenerationReport {
            status,
            requirements: records,
            requirements_implemented: implemented,
            requirements_failed: failed,
            requirements_skipped: skipped,
            files_created: integrator.files_created(),
            files_modified: integrator.files_modified(),
            tests_generated: integrator.tests_generated(),
            problems,
            tokens_used,
        })
    }

    /// One test file per implemented requirement.  Failures here are
    /// warnings, not errors: an untested implementation still counts.
    fn generate_tests(
        &self,
        records: &[RequirementRecord],
        model: &dyn CodeModel,
        integrator: &mut CodeIntegrator,
        problems: &mut Vec<Problem>,
    ) -> u64 {
        let mut tokens: u64 = 0;

        for record in records {
            if record.status != RequirementStatus::Implemented {
                continue;
            }
            let prompt = format!(
                "Generate pytest test cases for this requirement:\n\n\
                 Requirement: {}\n\
                 Target Files: {}",
                record.description,
                record.target_files.join(", ")
            );
            match model.generate(TEST_SYSTEM_PROMPT, &prompt) {
                Ok(response) => {
                    tokens += response.tokens_used;
                    let code = strip_code_fences(&response.text);
                    if code.is_empty() {
                        continue;
                    }
                    let file_name = format!("test_{}.py", sanitize_id(&record.id));
                    let mut change = vec![ChangeDescriptor::new(
                        ChangeKind::CreateTest,
                        &file_name,
                        &code,
                        &record.id,
                    )];
                    integrator.apply(&mut change);
                }
                Err(e) => {
                    warn!(id = %record.id, error = %e, "test generation failed");
                    problems.push(
                        Problem::warning("testing", format!("Test generation failed: {e}"))
                            .for_requirement(&record.id),
                    );
                }
            }
        }
        tokens
    }
}

fn generate_for_requirement(
    record: &RequirementRecord,
    snapshot: &ProjectSnapshot,
    model: &dyn CodeModel,
) -> GraftResult<(Vec<ChangeDescriptor>, u64)> {
    let context = build_context(record, snapshot);
    let prompt = format!(
        "Generate Python code for this requirement: {}\n\nContext:\n{}",
        record.description, context
    );
    let response = model.generate(CODE_SYSTEM_PROMPT, &prompt)?;
    let code = strip_code_fences(&response.text);
    if code.is_empty() {
        return Err(GraftError::Generation(format!(
            "Model returned no code for requirement {}",
            record.id
        )));
    }
    Ok((classify_changes(record, &code, snapshot), response.tokens_used))
}

/// Short textual context for the model: the requirement's analysis plus the
/// symbols already present in its candidate files.
fn build_context(record: &RequirementRecord, snapshot: &ProjectSnapshot) -> String {
    let mut parts: Vec<String> = Vec::new();

    parts.push(format!("Requirement ID: {}", record.id));
    parts.push(format!("Complexity Score: {:.1}", record.complexity_score));
    if !record.implementation_notes.is_empty() {
        parts.push(format!("Implementation Notes: {}", record.implementation_notes));
    }

    if !record.target_files.is_empty() {
        parts.push(format!("Target Files: {}", record.target_files.join(", ")));
        for path in record.target_files.iter().take(2) {
            if let Some(unit) = snapshot.files.iter().find(|u| &u.path == path) {
                let functions: Vec<&str> =
                    unit.functions.iter().map(|f| f.name.as_str()).collect();
                let classes: Vec<&str> = unit.classes.iter().map(|c| c.name.as_str()).collect();
                parts.push(format!("File: {path}"));
                parts.push(format!("Functions: {}", functions.join(", ")));
                parts.push(format!("Classes: {}", classes.join(", ")));
            }
        }
    }

    if !record.dependencies.is_empty() {
        parts.push(format!("Dependencies: {}", record.dependencies.join(", ")));
    }

    let file_list: Vec<&str> = snapshot
        .files
        .iter()
        .map(|u| u.path.as_str())
        .filter(|p| !p.contains("test") && !p.contains("__pycache__"))
        .take(10)
        .collect();
    if !file_list.is_empty() {
        parts.push(format!("Project Files: {}", file_list.join(", ")));
    }

    parts.join("\n")
}

/// Remove markdown code fences, keeping only the code between them (or the
/// whole text when no fences are present).
pub fn strip_code_fences(text: &str) -> String {
    let mut clean: Vec<&str> = Vec::new();
    for line in text.lines() {
        if line.trim_start().starts_with("```") {
            continue;
        }
        clean.push(line);
    }
    clean.join("\n").trim().to_string()
}

fn sanitize_id(id: &str) -> String {
    id.to_lowercase().replace([' ', '-'], "_")
}

/// Turn generated code into a change batch: a leading `class`/`def` becomes
/// an insertion into the first target file, anything else replaces it; a
/// requirement with no targets gets a fresh file named after its id.
/// Inferred imports that the target does not already carry are appended as
/// `ADD_IMPORT` changes.
fn classify_changes(
    record: &RequirementRecord,
    code: &str,
    snapshot: &ProjectSnapshot,
) -> Vec<ChangeDescriptor> {
    let mut changes: Vec<ChangeDescriptor> = Vec::new();

    let target = match record.target_files.first() {
        Some(target) => {
            let kind = if code.starts_with("class ") {
                ChangeKind::AddClass
            } else if code.starts_with("def ") || code.starts_with("async def ") {
                ChangeKind::AddFunction
            } else {
                ChangeKind::ModifyFile
            };
            changes.push(ChangeDescriptor::new(kind, target, code, &record.id));
            target.clone()
        }
        None => {
            let file = format!("{}.py", sanitize_id(&record.id));
            changes.push(ChangeDescriptor::new(
                ChangeKind::CreateFile,
                &file,
                code,
                &record.id,
            ));
            file
        }
    };

    for statement in required_imports(code) {
        if !import_exists(snapshot, &target, &statement) {
            changes.push(ChangeDescriptor::new(
                ChangeKind::AddImport,
                &target,
                &statement,
                &record.id,
            ));
        }
    }

    changes
}

/// Infer stdlib imports the generated fragment depends on but does not
/// declare itself.
pub fn required_imports(code: &str) -> Vec<String> {
    let mut imports: Vec<String> = Vec::new();

    let typing: Vec<&str> = TYPING_NAMES
        .iter()
        .copied()
        .filter(|name| code.contains(name))
        .collect();
    if !typing.is_empty() {
        imports.push(format!("from typing import {}", typing.join(", ")));
    }

    for (module, cues) in IMPORT_CUES {
        if cues.iter().any(|cue| code.contains(cue)) {
            let statement = format!("import {module}");
            if !code.lines().any(|l| l.trim() == statement) {
                imports.push(statement);
            }
        }
    }

    imports
}

fn import_exists(snapshot: &ProjectSnapshot, path: &str, statement: &str) -> bool {
    snapshot
        .files
        .iter()
        .find(|u| u.path == path)
        .map(|unit| unit.imports.iter().any(|imp| statement.contains(imp.as_str()) || imp == statement))
        .unwrap_or(false)
}

/// Copy the project into the output root, skipping excluded paths.  The
/// output root is created if missing; existing files are overwritten.
pub fn copy_tree(source: &Path, destination: &Path, config: &GraftConfig) -> GraftResult<()> {
    if !source.is_dir() {
        return Err(GraftError::Config(format!(
            "Source path is not a directory: {}",
            source.display()
        )));
    }
    fs::create_dir_all(destination)?;

    let walker = WalkDir::new(source).into_iter().filter_entry(|entry| {
        let rel = entry
            .path()
            .strip_prefix(source)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .replace('\\', "/");
        rel.is_empty() || !filesystem::is_excluded(&rel, config)
    });

    for entry in walker {
        let entry = entry.map_err(|e| GraftError::Io(e.into()))?;
        let rel = match entry.path().strip_prefix(source) {
            Ok(rel) if !rel.as_os_str().is_empty() => rel,
            _ => continue,
        };
        let target = destination.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else if entry.file_type().is_file() {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
