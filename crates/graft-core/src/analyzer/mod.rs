//! Requirement analysis against the project snapshot.
//!
//! Produces a cheap, reproducible triage signal per requirement: how much of
//! it existing code already covers, how hard it looks, which files should
//! receive the implementation, and which libraries it probably needs.  The
//! scoring is symmetric substring matching by design, not semantic
//! similarity; the goal is an actionable plan, not a correctness proof.

pub mod keywords;

use std::path::Path;

use indexmap::IndexSet;
use tracing::debug;

use crate::models::{CoverageMatch, CoverageReport, RequirementRecord};
use crate::parser::snapshot::ProjectSnapshot;

pub use keywords::Lexicon;

/// Path components that disqualify a file as an implementation target.
const EXCLUDED_PATH_TOKENS: &[&str] = &["test", "tests", "__pycache__", "node_modules"];

/// File stems skipped by the size-based fallback (entry shims, re-export
/// hubs), never good homes for new functionality.
const ENTRY_STEMS: &[&str] = &["main", "__main__", "__init__", "index", "app"];

/// Coverage above this prefers the files that produced the matches.
const COVERAGE_TARGET_THRESHOLD: f64 = 0.3;

const MAX_COMPLEXITY: f64 = 5.0;
const BASE_COMPLEXITY: f64 = 1.0;

pub struct RequirementAnalyzer {
    lexicon: Lexicon,
}

impl RequirementAnalyzer {
    pub fn new() -> Self {
        RequirementAnalyzer {
            lexicon: Lexicon::default(),
        }
    }

    /// Analyzer with replacement vocabulary/weight tables.
    pub fn with_lexicon(lexicon: Lexicon) -> Self {
        RequirementAnalyzer { lexicon }
    }

    /// Analyze one requirement against the snapshot.  Infallible: an empty
    /// keyword set yields zero coverage and baseline complexity, and the
    /// ordered target fallback always produces some plan when the project
    /// has eligible files.
    pub fn analyze(
        &self,
        id: &str,
        description: &str,
        snapshot: &ProjectSnapshot,
    ) -> RequirementRecord {
        let mut record = RequirementRecord::new(id, description);
        let keywords = self.lexicon.extract_keywords(description);

        let coverage = self.coverage(&keywords, snapshot);
        record.complexity_score = self.complexity(description, &keywords);
        record.target_files = self.target_files(&keywords, snapshot, &coverage);
        record.dependencies = self.dependencies(&keywords, snapshot);
        record.implementation_notes = implementation_notes(&keywords, &coverage, &record.target_files);

        debug!(
            id,
            coverage = coverage.coverage_score,
            complexity = record.complexity_score,
            targets = record.target_files.len(),
            "analyzed requirement"
        );
        record
    }

    /// Analyze a batch, one record per requirement in input order.  Failures
    /// are requirement-scoped: a record comes back FAILED, the rest proceed.
    pub fn analyze_all(
        &self,
        requirements: &[(String, String)],
        snapshot: &ProjectSnapshot,
    ) -> Vec<RequirementRecord> {
        requirements
            .iter()
            .map(|(id, description)| {
                if description.trim().is_empty() {
                    let mut record = RequirementRecord::new(id, description);
                    record.mark_failed("Requirement description is empty");
                    record
                } else {
                    self.analyze(id, description, snapshot)
                }
            })
            .collect()
    }

    /// Count keyword hits over every descriptor name and docstring in the
    /// project; `coverageScore = min(total / (keywords * 2), 1.0)`.
    pub fn coverage(&self, keywords: &[String], snapshot: &ProjectSnapshot) -> CoverageReport {
        let mut report = CoverageReport::default();
        if keywords.is_empty() {
            return report;
        }

        let mut total_matches = 0usize;
        for unit in &snapshot.files {
            for function in &unit.functions {
                let hits = keyword_hits(keywords, &function.name, function.docstring.as_deref());
                if hits > 0 {
                    report.functions.push(CoverageMatch {
                        name: function.name.clone(),
                        file: unit.path.clone(),
                        keyword_hits: hits,
                    });
                    total_matches += hits;
                }
            }
            for class in &unit.classes {
                let hits = keyword_hits(keywords, &class.name, class.docstring.as_deref());
                if hits > 0 {
                    report.classes.push(CoverageMatch {
                        name: class.name.clone(),
                        file: unit.path.clone(),
                        keyword_hits: hits,
                    });
                    total_matches += hits;
                }
                for method in &class.methods {
                    let hits = keyword_hits(keywords, &method.name, method.docstring.as_deref());
                    if hits > 0 {
                        report.functions.push(CoverageMatch {
                            name: format!("{}.{}", class.name, method.name),
                            file: unit.path.clone(),
                            keyword_hits: hits,
                        });
                        total_matches += hits;
                    }
                }
            }
        }

        report.coverage_score =
            (total_matches as f64 / (keywords.len() as f64 * 2.0)).min(1.0);
        report
    }

    /// Heuristic difficulty in [1.0, 5.0]: base 1.0 plus static per-keyword
    /// weights, length, escalation, and breadth bumps.
    pub fn complexity(&self, description: &str, keywords: &[String]) -> f64 {
        let mut complexity = BASE_COMPLEXITY;

        for keyword in keywords {
            if let Some(weight) = self.lexicon.weight_for(keyword) {
                complexity += weight;
            }
        }

        if description.split_whitespace().count() > 20 {
            complexity += 0.2;
        }
        let lowered = description.to_lowercase();
        if self
            .lexicon
            .escalation_words
            .iter()
            .any(|w| lowered.contains(w.as_str()))
        {
            complexity += 0.3;
        }
        if self
            .lexicon
            .breadth_words
            .iter()
            .any(|w| lowered.contains(w.as_str()))
        {
            complexity += 0.2;
        }

        complexity.clamp(BASE_COMPLEXITY, MAX_COMPLEXITY)
    }

    /// Ordered target fallback: coverage-based, then filename-based, then
    /// the largest eligible implementation file.  Empty only when the
    /// project has no eligible files at all.
    fn target_files(
        &self,
        keywords: &[String],
        snapshot: &ProjectSnapshot,
        coverage: &CoverageReport,
    ) -> Vec<String> {
        let mut targets: IndexSet<String> = IndexSet::new();

        if coverage.coverage_score > COVERAGE_TARGET_THRESHOLD {
            for m in coverage.functions.iter().chain(&coverage.classes) {
                targets.insert(m.file.clone());
            }
        }

        // Filename matches on eligible implementation files.
        for unit in &snapshot.files {
            if is_excluded_path(&unit.path) {
                continue;
            }
            let file_name = Path::new(&unit.path)
                .file_name()
                .map(|f| f.to_string_lossy().to_lowercase())
                .unwrap_or_default();
            if keywords.iter().any(|kw| file_name.contains(kw.as_str())) {
                targets.insert(unit.path.clone());
            }
        }

        // Size-based fallback: the richest non-entry implementation file.
        if targets.is_empty() {
            let mut best: Option<(&str, usize)> = None;
            for unit in &snapshot.files {
                if is_excluded_path(&unit.path) || is_entry_stem(&unit.path) {
                    continue;
                }
                let count = unit.symbol_count();
                if best.map(|(_, c)| count > c).unwrap_or(true) {
                    best = Some((&unit.path, count));
                }
            }
            if let Some((path, _)) = best {
                targets.insert(path.to_string());
            }
        }

        targets.into_iter().collect()
    }

    /// Union of existing project dependencies matching a keyword and the
    /// static keyword-to-library suggestion table.
    fn dependencies(&self, keywords: &[String], snapshot: &ProjectSnapshot) -> Vec<String> {
        let mut dependencies: IndexSet<String> = IndexSet::new();

        for dependency in snapshot.all_dependencies() {
            let lowered = dependency.to_lowercase();
            if keywords.iter().any(|kw| lowered.contains(kw.as_str())) {
                dependencies.insert(dependency.clone());
            }
        }

        for keyword in keywords {
            for library in self.lexicon.suggestions_for(keyword) {
                dependencies.insert(library.clone());
            }
        }

        dependencies.into_iter().collect()
    }
}

impl Default for RequirementAnalyzer {
    fn default() -> Self {
        RequirementAnalyzer::new()
    }
}

fn keyword_hits(keywords: &[String], name: &str, docstring: Option<&str>) -> usize {
    let name = name.to_lowercase();
    let doc = docstring.map(|d| d.to_lowercase()).unwrap_or_default();
    keywords
        .iter()
        .filter(|kw| name.contains(kw.as_str()) || doc.contains(kw.as_str()))
        .count()
}

fn is_excluded_path(path: &str) -> bool {
    let lowered = path.to_lowercase();
    EXCLUDED_PATH_TOKENS
        .iter()
        .any(|token| lowered.contains(token))
}

fn is_entry_stem(path: &str) -> bool {
    let stem = Path::new(path)
        .file_stem()
        .map(|s| s.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    ENTRY_STEMS.contains(&stem.as_str())
}

fn implementation_notes(
    keywords: &[String],
    coverage: &CoverageReport,
    target_files: &[String],
) -> String {
    let mut notes: Vec<String> = Vec::new();

    if coverage.coverage_score > 0.5 {
        notes.push("High existing coverage - consider extending existing functionality".to_string());
    } else if coverage.coverage_score > 0.2 {
        notes.push("Some existing coverage - can build upon existing code".to_string());
    } else {
        notes.push("New functionality - implement from scratch".to_string());
    }

    if target_files.is_empty() {
        notes.push("Create new file for implementation".to_string());
    } else {
        notes.push(format!("Suggested target files: {}", target_files.join(", ")));
    }

    let has = |kw: &str| keywords.iter().any(|k| k == kw);
    if has("validate") || has("error") {
        notes.push("Include proper error handling and validation".to_string());
    }
    if has("test") {
        notes.push("Generate comprehensive test cases".to_string());
    }
    if has("interface") || has("ui") {
        notes.push("Consider user interface design and usability".to_string());
    }

    notes.join("; ")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
