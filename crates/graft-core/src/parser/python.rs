//! Python structural extraction on the native tree-sitter grammar.
//!
//! Functions, classes, methods, imports, docstrings, decorators, parameter
//! annotations, and line spans all come off the syntax tree.  The enclosing
//! class is threaded through the traversal as an explicit context value, so
//! methods are attributed to their class and never leak into the file-level
//! function list, and the traversal stays reentrant.

use tree_sitter::Node;

use crate::config::GraftConfig;
use crate::models::{ClassDescriptor, FunctionDescriptor, SourceUnit};
use crate::parser::LanguageParser;

pub struct PythonParser {
    config: GraftConfig,
}

impl PythonParser {
    pub fn new(config: GraftConfig) -> Self {
        PythonParser { config }
    }
}

impl LanguageParser for PythonParser {
    fn language(&self) -> &'static str {
        "python"
    }

    fn parse(&self, path: &str, text: &str) -> SourceUnit {
        let mut parser = tree_sitter::Parser::new();
        if let Err(e) = parser.set_language(&tree_sitter_python::LANGUAGE.into()) {
            return SourceUnit::broken(path, "python", format!("Grammar load failed: {e}"));
        }

        let tree = match parser.parse(text.as_bytes(), None) {
            Some(tree) => tree,
            None => {
                return SourceUnit::broken(path, "python", "Parser returned no tree".to_string())
            }
        };

        let root = tree.root_node();
        if root.has_error() {
            let message = match first_error_line(root) {
                Some(line) => format!("Syntax error at line {line}"),
                None => "Syntax error".to_string(),
            };
            tracing::warn!(path, %message, "python parse failed");
            return SourceUnit::broken(path, "python", message);
        }

        let mut extractor = Extractor {
            src: text.as_bytes(),
            config: &self.config,
            unit: SourceUnit {
                path: path.to_string(),
                language: "python".to_string(),
                ..Default::default()
            },
        };
        extractor.walk_module(root);
        extractor.unit
    }
}

/// Line of the first ERROR or missing node, for the parse-error message.
fn first_error_line(node: Node<'_>) -> Option<usize> {
    if node.is_error() || node.is_missing() {
        return Some(node.start_position().row + 1);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if let Some(line) = first_error_line(child) {
            return Some(line);
        }
    }
    None
}

struct Extractor<'s> {
    src: &'s [u8],
    config: &'s GraftConfig,
    unit: SourceUnit,
}

impl<'s> Extractor<'s> {
    fn text(&self, node: Node<'_>) -> String {
        node.utf8_text(self.src).unwrap_or_default().to_string()
    }

    fn walk_module(&mut self, root: Node<'_>) {
        let mut cursor = root.walk();
        let children: Vec<Node<'_>> = root.named_children(&mut cursor).collect();
        for child in children {
            self.walk_statement(child);
        }
    }

    /// Generic statement walk outside any class body.  Functions found here
    /// (including ones nested inside other functions) are file-level.
    fn walk_statement(&mut self, node: Node<'_>) {
        match node.kind() {
            "import_statement" | "import_from_statement" | "future_import_statement" => {
                self.collect_imports(node);
            }
            "function_definition" => {
                self.handle_function(node, Vec::new());
            }
            "class_definition" => {
                self.handle_class(node, Vec::new());
            }
            "decorated_definition" => {
                let decorators = self.decorator_names(node);
                if let Some(definition) = node.child_by_field_name("definition") {
                    match definition.kind() {
                        "function_definition" => self.handle_function(definition, decorators),
                        "class_definition" => self.handle_class(definition, decorators),
                        _ => {}
                    }
                }
            }
            _ => {
                let mut cursor = node.walk();
                let children: Vec<Node<'_>> = node.named_children(&mut cursor).collect();
                for child in children {
                    self.walk_statement(child);
                }
            }
        }
    }

    fn handle_function(&mut self, node: Node<'_>, decorators: Vec<String>) {
        let descriptor = self.function_descriptor(node, decorators);
        if self.config.includes_name(&descriptor.name) {
            self.unit.functions.push(descriptor);
        }
        // Descend into the body: nested defs are file-level, and imports
        // inside function bodies still count.
        if let Some(body) = node.child_by_field_name("body") {
            self.walk_statement(body);
        }
    }

    fn handle_class(&mut self, node: Node<'_>, decorators: Vec<String>) {
        let name = node
            .child_by_field_name("name")
            .map(|n| self.text(n))
            .unwrap_or_default();
        if name.starts_with('_') && !self.config.include_private {
            return;
        }

        let mut class = ClassDescriptor {
            name,
            decorators: if self.config.extract_decorators {
                decorators
            } else {
                Vec::new()
            },
            docstring: self.docstring_of(node),
            start_line: node.start_position().row + 1,
            end_line: node.end_position().row + 1,
            ..Default::default()
        };

        if self.config.extract_base_classes {
            if let Some(superclasses) = node.child_by_field_name("superclasses") {
                let mut cursor = superclasses.walk();
                for base in superclasses.named_children(&mut cursor) {
                    if base.kind() == "keyword_argument" {
                        continue; // metaclass=... is not a base class
                    }
                    class.base_classes.push(self.text(base));
                }
            }
        }

        if let Some(body) = node.child_by_field_name("body") {
            let mut cursor = body.walk();
            let children: Vec<Node<'_>> = body.named_children(&mut cursor).collect();
            for child in children {
                self.walk_class_member(child, &mut class);
            }
        }

        self.unit.classes.push(class);
    }

    /// Walk one statement inside a class body, attributing functions to the
    /// enclosing class as methods.
    fn walk_class_member(&mut self, node: Node<'_>, class: &mut ClassDescriptor) {
        match node.kind() {
            "import_statement" | "import_from_statement" | "future_import_statement" => {
                self.collect_imports(node);
            }
            "function_definition" => {
                self.handle_method(node, Vec::new(), class);
            }
            "class_definition" => {
                // Nested classes land in the flat class list alongside the
                // enclosing class.
                self.handle_class(node, Vec::new());
            }
            "decorated_definition" => {
                let decorators = self.decorator_names(node);
                if let Some(definition) = node.child_by_field_name("definition") {
                    match definition.kind() {
                        "function_definition" => self.handle_method(definition, decorators, class),
                        "class_definition" => self.handle_class(definition, decorators),
                        _ => {}
                    }
                }
            }
            _ => {
                let mut cursor = node.walk();
                let children: Vec<Node<'_>> = node.named_children(&mut cursor).collect();
                for child in children {
                    self.walk_class_member(child, class);
                }
            }
        }
    }

    fn handle_method(&mut self, node: Node<'_>, decorators: Vec<String>, class: &mut ClassDescriptor) {
        let descriptor = self.function_descriptor(node, decorators);
        if self.config.includes_name(&descriptor.name) {
            class.methods.push(descriptor);
        }
        // Bodies of methods are outside the class scope: nested defs there
        // are file-level, matching the function case.
        if let Some(body) = node.child_by_field_name("body") {
            self.walk_statement(body);
        }
    }

    fn function_descriptor(&self, node: Node<'_>, decorators: Vec<String>) -> FunctionDescriptor {
        let name = node
            .child_by_field_name("name")
            .map(|n| self.text(n))
            .unwrap_or_default();

        let mut parameters = Vec::new();
        if let Some(params) = node.child_by_field_name("parameters") {
            let mut cursor = params.walk();
            for param in params.named_children(&mut cursor) {
                if let Some(rendered) = self.render_parameter(param) {
                    parameters.push(rendered);
                }
            }
        }

        let return_type = if self.config.extract_type_hints {
            node.child_by_field_name("return_type").map(|n| self.text(n))
        } else {
            None
        };

        let is_async = node.child(0).map(|c| c.kind() == "async").unwrap_or(false);

        FunctionDescriptor {
            name,
            parameters,
            docstring: self.docstring_of(node),
            start_line: node.start_position().row + 1,
            end_line: node.end_position().row + 1,
            decorators: if self.config.extract_decorators {
                decorators
            } else {
                Vec::new()
            },
            return_type,
            is_async,
        }
    }

    /// Render one parameter as `name` or `name: Type`.  Splat parameters and
    /// the bare `*` / `/` separators are skipped.
    fn render_parameter(&self, param: Node<'_>) -> Option<String> {
        match param.kind() {
            "identifier" => Some(self.text(param)),
            "typed_parameter" => {
                let name = param.named_child(0).map(|n| self.text(n))?;
                if name.is_empty() {
                    return None;
                }
                let annotation = param.child_by_field_name("type").map(|n| self.text(n));
                match annotation {
                    Some(t) if self.config.extract_type_hints => Some(format!("{name}: {t}")),
                    _ => Some(name),
                }
            }
            "default_parameter" => param.child_by_field_name("name").map(|n| self.text(n)),
            "typed_default_parameter" => {
                let name = param.child_by_field_name("name").map(|n| self.text(n))?;
                let annotation = param.child_by_field_name("type").map(|n| self.text(n));
                match annotation {
                    Some(t) if self.config.extract_type_hints => Some(format!("{name}: {t}")),
                    _ => Some(name),
                }
            }
            _ => None,
        }
    }

    /// Docstring of a function or class body: a leading expression statement
    /// holding a string literal.
    fn docstring_of(&self, node: Node<'_>) -> Option<String> {
        if !self.config.extract_docstrings {
            return None;
        }
        let body = node.child_by_field_name("body")?;
        let first = body.named_child(0)?;
        if first.kind() != "expression_statement" {
            return None;
        }
        let expr = first.named_child(0)?;
        if expr.kind() != "string" {
            return None;
        }
        let cleaned = clean_docstring(&self.text(expr));
        if cleaned.is_empty() {
            None
        } else {
            Some(cleaned)
        }
    }

    fn decorator_names(&self, decorated: Node<'_>) -> Vec<String> {
        let mut names = Vec::new();
        let mut cursor = decorated.walk();
        for child in decorated.named_children(&mut cursor) {
            if child.kind() != "decorator" {
                continue;
            }
            let Some(expr) = child.named_child(0) else {
                continue;
            };
            // `@lru_cache(maxsize=2)` records the callee, not the call.
            let name = if expr.kind() == "call" {
                expr.child_by_field_name("function")
                    .map(|n| self.text(n))
                    .unwrap_or_else(|| self.text(expr))
            } else {
                self.text(expr)
            };
            names.push(name);
        }
        names
    }

    /// Normalize an import node to canonical single-line statements,
    /// preserving aliases.
    fn collect_imports(&mut self, node: Node<'_>) {
        match node.kind() {
            "import_statement" => {
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    match child.kind() {
                        "dotted_name" => {
                            let module = self.text(child);
                            self.unit.imports.push(format!("import {module}"));
                        }
                        "aliased_import" => {
                            let module = child
                                .child_by_field_name("name")
                                .map(|n| self.text(n))
                                .unwrap_or_default();
                            let alias = child
                                .child_by_field_name("alias")
                                .map(|n| self.text(n))
                                .unwrap_or_default();
                            self.unit
                                .imports
                                .push(format!("import {module} as {alias}"));
                        }
                        _ => {}
                    }
                }
            }
            "import_from_statement" | "future_import_statement" => {
                let module = node
                    .child_by_field_name("module_name")
                    .map(|n| self.text(n))
                    .unwrap_or_else(|| "__future__".to_string());

                let mut has_wildcard = false;
                {
                    let mut cursor = node.walk();
                    for child in node.children(&mut cursor) {
                        if child.kind() == "wildcard_import" {
                            has_wildcard = true;
                        }
                    }
                }
                if has_wildcard {
                    self.unit.imports.push(format!("from {module} import *"));
                    return;
                }

                let mut names = Vec::new();
                let mut cursor = node.walk();
                for child in node.children_by_field_name("name", &mut cursor) {
                    match child.kind() {
                        "dotted_name" => names.push(self.text(child)),
                        "aliased_import" => {
                            let imported = child
                                .child_by_field_name("name")
                                .map(|n| self.text(n))
                                .unwrap_or_default();
                            let alias = child
                                .child_by_field_name("alias")
                                .map(|n| self.text(n))
                                .unwrap_or_default();
                            names.push(format!("{imported} as {alias}"));
                        }
                        _ => {}
                    }
                }
                if !names.is_empty() {
                    self.unit
                        .imports
                        .push(format!("from {module} import {}", names.join(", ")));
                }
            }
            _ => {}
        }
    }
}

/// Strip quotes and prefixes from a string literal and normalize the
/// indentation of continuation lines.
fn clean_docstring(raw: &str) -> String {
    let trimmed = raw.trim();
    let quote_start = trimmed.find(['"', '\'']).unwrap_or(0);
    let body = &trimmed[quote_start..];
    let stripped = if let Some(inner) = body
        .strip_prefix("\"\"\"")
        .and_then(|s| s.strip_suffix("\"\"\""))
    {
        inner
    } else if let Some(inner) = body.strip_prefix("'''").and_then(|s| s.strip_suffix("'''")) {
        inner
    } else if let Some(inner) = body.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
        inner
    } else if let Some(inner) = body.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')) {
        inner
    } else {
        body
    };

    let lines: Vec<&str> = stripped.lines().collect();
    if lines.len() <= 1 {
        return stripped.trim().to_string();
    }
    // Margin is measured in characters, not bytes; docstring indentation
    // occasionally mixes multi-byte whitespace such as U+00A0.
    let indent = lines[1..]
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.chars().take_while(|c| c.is_whitespace()).count())
        .min()
        .unwrap_or(0);
    let mut result = vec![lines[0].trim_end().to_string()];
    for line in &lines[1..] {
        if line.trim().is_empty() {
            result.push(String::new());
        } else {
            let rest = line
                .char_indices()
                .nth(indent)
                .map(|(idx, _)| &line[idx..])
                .unwrap_or("");
            result.push(rest.trim_end().to_string());
        }
    }
    result.join("\n").trim().to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> SourceUnit {
        PythonParser::new(GraftConfig::default()).parse("sample.py", text)
    }

    #[test]
    fn test_function_extraction() {
        let unit = parse(
            "\
def add(a: int, b: int) -> int:
    \"\"\"Add two numbers.\"\"\"
    return a + b
",
        );
        assert!(unit.parse_error.is_none());
        assert_eq!(unit.functions.len(), 1);
        let f = &unit.functions[0];
        assert_eq!(f.name, "add");
        assert_eq!(f.parameters, vec!["a: int", "b: int"]);
        assert_eq!(f.docstring.as_deref(), Some("Add two numbers."));
        assert_eq!(f.return_type.as_deref(), Some("int"));
        assert_eq!(f.start_line, 1);
        assert_eq!(f.end_line, 3);
        assert!(!f.is_async);
    }

    #[test]
    fn test_async_and_decorators() {
        let unit = parse(
            "\
import asyncio

@retry(attempts=3)
@staticmethod
async def fetch(url):
    return await asyncio.sleep(0)
",
        );
        let f = &unit.functions[0];
        assert_eq!(f.name, "fetch");
        assert!(f.is_async);
        assert_eq!(f.decorators, vec!["retry", "staticmethod"]);
        assert_eq!(unit.imports, vec!["import asyncio"]);
    }

    #[test]
    fn test_class_with_methods() {
        let unit = parse(
            "\
class Calculator(Base):
    \"\"\"A tiny calculator.\"\"\"

    def add(self, a, b):
        \"\"\"Add two numbers.\"\"\"
        return a + b

    def _scratch(self):
        pass

    def __init__(self):
        self.total = 0
",
        );
        assert_eq!(unit.classes.len(), 1);
        let cls = &unit.classes[0];
        assert_eq!(cls.name, "Calculator");
        assert_eq!(cls.base_classes, vec!["Base"]);
        assert_eq!(cls.docstring.as_deref(), Some("A tiny calculator."));
        // _scratch filtered by the private-name policy, __init__ survives as
        // a magic method.
        let names: Vec<&str> = cls.methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["add", "__init__"]);
        // Methods never leak into the file-level function list.
        assert!(unit.functions.is_empty());
    }

    #[test]
    fn test_nested_function_is_file_level() {
        let unit = parse(
            "\
def outer():
    def inner():
        pass
    return inner
",
        );
        let names: Vec<&str> = unit.functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["outer", "inner"]);
    }

    #[test]
    fn test_import_normalization() {
        let unit = parse(
            "\
import os
import numpy as np
from pathlib import Path
from typing import List, Optional as Opt
from . import sibling
from os import *
",
        );
        assert_eq!(
            unit.imports,
            vec![
                "import os",
                "import numpy as np",
                "from pathlib import Path",
                "from typing import List, Optional as Opt",
                "from . import sibling",
                "from os import *",
            ]
        );
    }

    #[test]
    fn test_syntax_error_never_raises() {
        let unit = parse("def broken(:\n    pass\n");
        assert!(unit.functions.is_empty());
        assert!(unit.classes.is_empty());
        assert!(unit.imports.is_empty());
        let message = unit.parse_error.expect("parse error must be recorded");
        assert!(message.contains("Syntax error"), "{message}");
    }

    #[test]
    fn test_private_function_filtered() {
        let unit = parse("def _hidden():\n    pass\n\ndef shown():\n    pass\n");
        let names: Vec<&str> = unit.functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["shown"]);

        let permissive = PythonParser::new(GraftConfig {
            include_private: true,
            ..GraftConfig::default()
        })
        .parse("sample.py", "def _hidden():\n    pass\n");
        assert_eq!(permissive.functions[0].name, "_hidden");
    }

    #[test]
    fn test_private_class_filtered() {
        let unit = parse("class _Internal:\n    def visible(self):\n        pass\n");
        assert!(unit.classes.is_empty());
    }

    #[test]
    fn test_line_spans_nondecreasing() {
        let unit = parse(
            "\
class Shape:
    def area(self):
        return 0

    def perimeter(self):
        return 0
",
        );
        let cls = &unit.classes[0];
        assert!(cls.start_line <= cls.end_line);
        for method in &cls.methods {
            assert!(method.start_line <= method.end_line);
            assert!(method.start_line >= cls.start_line);
        }
    }

    #[test]
    fn test_multiline_docstring_cleaned() {
        let unit = parse(
            "\
def f():
    \"\"\"First line.

    Indented continuation.
    \"\"\"
    pass
",
        );
        let doc = unit.functions[0].docstring.clone().unwrap();
        assert_eq!(doc, "First line.\n\nIndented continuation.");
    }

    #[test]
    fn test_docstring_with_mixed_unicode_indentation() {
        let unit = parse(
            "def f():\n    \"\"\"First.\n\u{a0}\u{a0}cont.\n x\n    \"\"\"\n    pass\n",
        );
        let doc = unit.functions[0].docstring.clone().unwrap();
        assert_eq!(doc, "First.\n\u{a0}cont.\nx");
    }
}
