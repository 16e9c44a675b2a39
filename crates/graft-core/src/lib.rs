//! Graft core library — metadata extraction and structural code integration.
//!
//! This crate turns a source tree into a language-neutral structural snapshot
//! (functions, classes, imports per file), triages free-text requirements
//! against that snapshot (coverage, complexity, target files, dependency
//! suggestions), and applies generated code back into a copy of the tree as
//! an ordered, fail-soft batch of structural edits.

pub mod analyzer;
pub mod config;
pub mod engine;
pub mod errors;
pub mod integrator;
pub mod models;
pub mod parser;

pub use analyzer::{Lexicon, RequirementAnalyzer};
pub use config::GraftConfig;
pub use engine::{CodeModel, GenerationEngine, ModelResponse, OutputValidator};
pub use errors::{GraftError, GraftResult};
pub use integrator::CodeIntegrator;
pub use models::{
    ChangeDescriptor, ChangeKind, ClassDescriptor, CoverageReport, FunctionDescriptor,
    GenerationReport, GenerationStatus, Problem, RequirementRecord, RequirementStatus, Severity,
    SourceUnit,
};
pub use parser::snapshot::{scan_project, ProjectSnapshot};
pub use parser::{LanguageParser, ParserRegistry};
