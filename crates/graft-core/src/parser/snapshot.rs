//! Project snapshot: the parsed metadata for a whole source tree.
//!
//! Rebuilt from scratch on every run; persisted as JSON so a later
//! generation run can consume the same snapshot the scan produced.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::GraftConfig;
use crate::errors::{GraftError, GraftResult};
use crate::models::SourceUnit;
use crate::parser::filesystem::{content_hash, detect_language, iter_project_files};
use crate::parser::ParserRegistry;

/// A record for one scanned file, independent of its parsed structure.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FileRecord {
    pub path: String,
    pub language: String,
    pub content_hash: String,
    pub size_bytes: u64,
}

/// Imports split into names resolved inside the project and external ones.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DependencyMap {
    pub internal: Vec<String>,
    pub external: Vec<String>,
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct SnapshotMetrics {
    pub total_files: usize,
    pub total_functions: usize,
    pub total_classes: usize,
    pub total_methods: usize,
    pub parse_errors: usize,
}

/// The parsed project, owned by one pipeline run.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ProjectSnapshot {
    pub root: String,
    pub files: Vec<SourceUnit>,
    pub records: Vec<FileRecord>,
    pub entry_points: Vec<String>,
    pub dependencies: DependencyMap,
    pub metrics: SnapshotMetrics,
}

impl ProjectSnapshot {
    pub fn unit(&self, path: &str) -> Option<&SourceUnit> {
        self.files.iter().find(|u| u.path == path)
    }

    /// Internal and external dependency names, internal first.
    pub fn all_dependencies(&self) -> impl Iterator<Item = &String> {
        self.dependencies
            .internal
            .iter()
            .chain(self.dependencies.external.iter())
    }

    pub fn save(&self, path: &Path) -> GraftResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: &Path) -> GraftResult<Self> {
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

/// Parse every eligible file under `root` into a snapshot.
///
/// Per-file problems (unreadable, malformed) are file-scoped: the unit
/// carries `parse_error` or the file is skipped with a warning.  Only a
/// missing root is a hard failure.
pub fn scan_project(
    root: &Path,
    config: &GraftConfig,
    registry: &ParserRegistry,
) -> GraftResult<ProjectSnapshot> {
    if !root.is_dir() {
        return Err(GraftError::Config(format!(
            "Project path is not a directory: {}",
            root.display()
        )));
    }
    config.validate()?;

    let paths = iter_project_files(root, config);
    info!(root = %root.display(), files = paths.len(), "scanning project");

    let mut snapshot = ProjectSnapshot {
        root: root.to_string_lossy().to_string(),
        ..Default::default()
    };

    for rel_path in paths {
        let Some(language) = detect_language(&rel_path) else {
            continue;
        };
        if !registry.supports(language) {
            continue;
        }
        let absolute = root.join(&rel_path);
        let text = match fs::read_to_string(&absolute) {
            Ok(text) => text,
            Err(e) => {
                warn!(path = %rel_path, error = %e, "skipping unreadable file");
                continue;
            }
        };

        snapshot.records.push(FileRecord {
            path: rel_path.clone(),
            language: language.to_string(),
            content_hash: content_hash(&text),
            size_bytes: text.len() as u64,
        });

        let unit = registry.parse(&rel_path, &text, language);
        debug!(
            path = %rel_path,
            functions = unit.functions.len(),
            classes = unit.classes.len(),
            "parsed"
        );
        snapshot.files.push(unit);
    }

    snapshot.entry_points = find_entry_points(&snapshot.files, config);
    snapshot.dependencies = split_dependencies(&snapshot.files);
    snapshot.metrics = compute_metrics(&snapshot.files);
    Ok(snapshot)
}

fn find_entry_points(units: &[SourceUnit], config: &GraftConfig) -> Vec<String> {
    let mut entry_points = Vec::new();
    for unit in units {
        let stem = Path::new(&unit.path)
            .file_stem()
            .map(|s| s.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let by_name = config.entry_point_files.iter().any(|f| *f == stem);
        let by_function = unit
            .functions
            .iter()
            .any(|f| config.entry_point_functions.contains(&f.name));
        if by_name || by_function {
            entry_points.push(unit.path.clone());
        }
    }
    entry_points
}

/// Split imported module roots into project-internal and external names.
fn split_dependencies(units: &[SourceUnit]) -> DependencyMap {
    let mut known_names: Vec<String> = Vec::new();
    for unit in units {
        for component in Path::new(&unit.path).components() {
            let name = component.as_os_str().to_string_lossy();
            let stem = name.split('.').next().unwrap_or(&name).to_string();
            if !stem.is_empty() && !known_names.contains(&stem) {
                known_names.push(stem);
            }
        }
    }

    let mut map = DependencyMap::default();
    for unit in units {
        for import in &unit.imports {
            let Some(root) = import_root(import) else {
                continue;
            };
            let bucket = if root.starts_with('.') || known_names.contains(&root) {
                &mut map.internal
            } else {
                &mut map.external
            };
            if !bucket.contains(&root) {
                bucket.push(root);
            }
        }
    }
    map
}

/// Top-level module name of a normalized import statement.
fn import_root(import: &str) -> Option<String> {
    // TypeScript-style imports carry the module in a quoted specifier.
    if let Some(idx) = import.find('"') {
        let module = import[idx + 1..].split('"').next()?.trim();
        if module.starts_with('.') {
            return Some(format!(".{}", module.trim_start_matches(['.', '/'])));
        }
        return Some(module.split('/').next()?.to_string());
    }

    let rest = import
        .strip_prefix("from ")
        .or_else(|| import.strip_prefix("import "))?;
    let module = rest.split_whitespace().next()?;
    if module.starts_with('.') {
        return Some(format!(".{}", module.trim_start_matches('.')));
    }
    let root = module.split('.').next()?.to_string();
    if root.is_empty() {
        None
    } else {
        Some(root)
    }
}

fn compute_metrics(units: &[SourceUnit]) -> SnapshotMetrics {
    let mut metrics = SnapshotMetrics {
        total_files: units.len(),
        ..Default::default()
    };
    for unit in units {
        metrics.total_functions += unit.functions.len();
        metrics.total_classes += unit.classes.len();
        metrics.total_methods += unit.classes.iter().map(|c| c.methods.len()).sum::<usize>();
        if unit.parse_error.is_some() {
            metrics.parse_errors += 1;
        }
    }
    metrics
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
