//! TypeScript structural extraction via regex line scanning.
//!
//! Unlike Python, which rides the native syntax tree, TypeScript is scanned
//! line-by-line with brace-depth class tracking.  The output is shallower
//! (no docstrings, single-line function spans) but slots into the same
//! `SourceUnit` shape.

use std::sync::LazyLock;

use regex::Regex;

use crate::config::GraftConfig;
use crate::models::{ClassDescriptor, FunctionDescriptor, SourceUnit};
use crate::parser::LanguageParser;

static TS_IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*import(?:\s+type)?\s+(.*?)\s+from\s+['"]([^'"]+)['"];?"#).unwrap()
});

static TS_SIDE_EFFECT_IMPORT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^\s*import\s+['"]([^'"]+)['"];?"#).unwrap());

static TS_CLASS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?:export\s+)?(?:abstract\s+)?class\s+([A-Za-z_][A-Za-z0-9_]*)(?:\s+extends\s+([A-Za-z_][A-Za-z0-9_.]*))?(?:\s+implements\s+([A-Za-z_][A-Za-z0-9_.,\s]*))?",
    )
    .unwrap()
});

static TS_FUNCTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?:export\s+)?(async\s+)?function\s+([A-Za-z_][A-Za-z0-9_]*)\s*\(([^)]*)\)\s*(?::\s*([^{]+))?",
    )
    .unwrap()
});

static TS_ARROW_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?:export\s+)?(?:const|let|var)\s+([A-Za-z_][A-Za-z0-9_]*)\s*=\s*(async\s+)?\(([^)]*)\)\s*(?::\s*([^=]+))?\s*=>",
    )
    .unwrap()
});

static TS_METHOD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?:public\s+|private\s+|protected\s+)?(?:static\s+)?(async\s+)?([A-Za-z_][A-Za-z0-9_]*)\s*\(([^)]*)\)\s*(?::\s*([^{=]+))?\s*\{",
    )
    .unwrap()
});

const METHOD_KEYWORD_BLOCKLIST: &[&str] = &[
    "if", "for", "while", "switch", "catch", "return", "constructor", "function", "new",
];

pub struct TypeScriptParser {
    config: GraftConfig,
}

impl TypeScriptParser {
    pub fn new(config: GraftConfig) -> Self {
        TypeScriptParser { config }
    }
}

impl LanguageParser for TypeScriptParser {
    fn language(&self) -> &'static str {
        "typescript"
    }

    fn parse(&self, path: &str, text: &str) -> SourceUnit {
        let mut unit = SourceUnit {
            path: path.to_string(),
            language: "typescript".to_string(),
            ..Default::default()
        };

        let lines: Vec<&str> = text.lines().collect();
        // (descriptor, remaining brace depth)
        let mut class_stack: Vec<(ClassDescriptor, i32)> = Vec::new();

        for (line_idx, line) in lines.iter().enumerate() {
            let index = line_idx + 1;

            if let Some(caps) = TS_IMPORT_RE.captures(line) {
                let bindings = caps[1].trim();
                let module = &caps[2];
                unit.imports
                    .push(format!("import {bindings} from \"{module}\""));
            } else if let Some(caps) = TS_SIDE_EFFECT_IMPORT_RE.captures(line) {
                unit.imports.push(format!("import \"{}\"", &caps[1]));
            }

            if let Some(caps) = TS_CLASS_RE.captures(line) {
                let name = caps[1].to_string();
                if self.config.includes_name(&name) {
                    let mut class = ClassDescriptor {
                        name,
                        start_line: index,
                        end_line: index,
                        ..Default::default()
                    };
                    if self.config.extract_base_classes {
                        if let Some(base) = caps.get(2) {
                            class.base_classes.push(base.as_str().to_string());
                        }
                        if let Some(interfaces) = caps.get(3) {
                            for iface in interfaces.as_str().split(',') {
                                let iface = iface.trim();
                                if !iface.is_empty() {
                                    class.base_classes.push(iface.to_string());
                                }
                            }
                        }
                    }
                    let depth = brace_delta(line);
                    class_stack.push((class, depth));
                    continue;
                }
            }

            if let Some(caps) = TS_FUNCTION_RE.captures(line) {
                let name = caps[2].to_string();
                if self.config.includes_name(&name) {
                    unit.functions.push(FunctionDescriptor {
                        name,
                        parameters: split_parameters(&caps[3], &self.config),
                        return_type: self.return_type(caps.get(4).map(|m| m.as_str())),
                        is_async: caps.get(1).is_some(),
                        start_line: index,
                        end_line: index,
                        ..Default::default()
                    });
                }
            } else if let Some(caps) = TS_ARROW_RE.captures(line) {
                let name = caps[1].to_string();
                if self.config.includes_name(&name) {
                    unit.functions.push(FunctionDescriptor {
                        name,
                        parameters: split_parameters(&caps[3], &self.config),
                        return_type: self.return_type(caps.get(4).map(|m| m.as_str())),
                        is_async: caps.get(2).is_some(),
                        start_line: index,
                        end_line: index,
                        ..Default::default()
                    });
                }
            } else if let Some(caps) = TS_METHOD_RE.captures(line) {
                if let Some((class, _)) = class_stack.last_mut() {
                    let name = caps[2].to_string();
                    if !METHOD_KEYWORD_BLOCKLIST.contains(&name.as_str())
                        && self.config.includes_name(&name)
                    {
                        class.methods.push(FunctionDescriptor {
                            name,
                            parameters: split_parameters(&caps[3], &self.config),
                            return_type: self.return_type(caps.get(4).map(|m| m.as_str())),
                            is_async: caps.get(1).is_some(),
                            start_line: index,
                            end_line: index,
                            ..Default::default()
                        });
                    }
                }
            }

            // Brace-depth tracking closes classes when their body ends.
            if !class_stack.is_empty() {
                if let Some(top) = class_stack.last_mut() {
                    top.1 += brace_delta(line);
                }
                while let Some(top) = class_stack.last() {
                    if top.1 <= 0 {
                        let (mut class, _) = class_stack.pop().unwrap();
                        class.end_line = index;
                        unit.classes.push(class);
                    } else {
                        break;
                    }
                }
            }
        }

        // Unterminated classes close at end of file.
        let last_line = lines.len().max(1);
        while let Some((mut class, _)) = class_stack.pop() {
            class.end_line = last_line;
            unit.classes.push(class);
        }

        unit
    }
}

fn brace_delta(line: &str) -> i32 {
    line.chars().filter(|&c| c == '{').count() as i32
        - line.chars().filter(|&c| c == '}').count() as i32
}

/// Split a raw parameter list, keeping `name: type` text when type hints are
/// extracted.
fn split_parameters(raw: &str, config: &GraftConfig) -> Vec<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    trimmed
        .split(',')
        .map(|chunk| chunk.trim())
        .filter(|chunk| !chunk.is_empty())
        .map(|chunk| {
            if config.extract_type_hints {
                chunk.to_string()
            } else {
                chunk
                    .split(':')
                    .next()
                    .unwrap_or(chunk)
                    .trim()
                    .to_string()
            }
        })
        .collect()
}

impl TypeScriptParser {
    fn return_type(&self, raw: Option<&str>) -> Option<String> {
        if !self.config.extract_type_hints {
            return None;
        }
        let normalized = raw?.trim().trim_end_matches(';').trim();
        if normalized.is_empty() {
            None
        } else {
            Some(normalized.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
