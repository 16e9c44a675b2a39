//! Criterion benchmarks for graft-core.
//!
//! ## Benchmark groups
//!
//! 1. **parse** — Python and TypeScript extraction at various file sizes.
//! 2. **analyze** — Keyword extraction, coverage, and complexity scoring.
//! 3. **splice** — Method insertion and import placement on large files.
//!
//! ## Running
//!
//! ```sh
//! cargo bench --manifest-path crates/graft-core/Cargo.toml
//! # Run only the analyzer group:
//! cargo bench --manifest-path crates/graft-core/Cargo.toml -- analyze
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use graft_core::analyzer::RequirementAnalyzer;
use graft_core::config::GraftConfig;
use graft_core::integrator::splice::{add_method, insert_import};
use graft_core::models::SourceUnit;
use graft_core::parser::python::PythonParser;
use graft_core::parser::typescript::TypeScriptParser;
use graft_core::parser::snapshot::ProjectSnapshot;
use graft_core::parser::LanguageParser;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Synthetic Python module with `n` documented functions and one class.
fn python_module(n: usize) -> String {
    let mut src = String::from("\"\"\"Synthetic module.\"\"\"\nimport os\nimport json\n\n");
    for i in 0..n {
        src.push_str(&format!(
            "def handler_{i}(payload, retries=3):\n    \"\"\"Process payload {i} and validate the result.\"\"\"\n    return payload\n\n"
        ));
    }
    src.push_str("class Dispatcher:\n    def route(self, message):\n        return message\n");
    src
}

fn typescript_module(n: usize) -> String {
    let mut src = String::from("import { join } from \"path\";\n\n");
    for i in 0..n {
        src.push_str(&format!(
            "export function handler{i}(payload: string): string {{\n    return payload;\n}}\n\n"
        ));
    }
    src
}

fn synthetic_snapshot(files: usize, functions_per_file: usize) -> ProjectSnapshot {
    let parser = PythonParser::new(GraftConfig::default());
    let units: Vec<SourceUnit> = (0..files)
        .map(|i| {
            parser.parse(
                &format!("src/module_{i}.py"),
                &python_module(functions_per_file),
            )
        })
        .collect();
    ProjectSnapshot {
        root: "/bench".to_string(),
        files: units,
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// parse
// ---------------------------------------------------------------------------

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    let python = PythonParser::new(GraftConfig::default());
    let typescript = TypeScriptParser::new(GraftConfig::default());

    for &n in &[10usize, 100, 500] {
        let py_src = python_module(n);
        group.bench_with_input(BenchmarkId::new("python", n), &py_src, |b, src| {
            b.iter(|| python.parse(black_box("bench.py"), black_box(src)))
        });

        let ts_src = typescript_module(n);
        group.bench_with_input(BenchmarkId::new("typescript", n), &ts_src, |b, src| {
            b.iter(|| typescript.parse(black_box("bench.ts"), black_box(src)))
        });
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// analyze
// ---------------------------------------------------------------------------

fn bench_analyze(c: &mut Criterion) {
    let mut group = c.benchmark_group("analyze");
    let analyzer = RequirementAnalyzer::new();
    let description =
        "validate and parse the payload, handle errors, and update the database interface";

    for &files in &[5usize, 50] {
        let snapshot = synthetic_snapshot(files, 20);
        group.bench_with_input(
            BenchmarkId::new("requirement", files),
            &snapshot,
            |b, snap| b.iter(|| analyzer.analyze(black_box("R1"), black_box(description), snap)),
        );
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// splice
// ---------------------------------------------------------------------------

fn bench_splice(c: &mut Criterion) {
    let mut group = c.benchmark_group("splice");
    let content = {
        let mut src = python_module(200);
        src.push_str("\nclass Target:\n    def seed(self):\n        return 0\n");
        src
    };

    group.bench_function("add_method", |b| {
        b.iter(|| {
            add_method(
                black_box(&content),
                black_box("Target"),
                black_box("def added(self):\n    return 1"),
            )
            .unwrap()
        })
    });

    group.bench_function("insert_import", |b| {
        b.iter(|| insert_import(black_box(&content), black_box("import pathlib")).unwrap())
    });

    group.finish();
}

criterion_group!(benches, bench_parse, bench_analyze, bench_splice);
criterion_main!(benches);
