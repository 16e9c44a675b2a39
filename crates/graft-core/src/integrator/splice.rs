//! Pure text splicing for Python source edits.
//!
//! Everything here is line-oriented string surgery with no filesystem
//! access, which keeps the placement rules unit-testable in isolation.
//! Indentation is measured in columns of leading whitespace; only space
//! indentation is produced, matching what the generator emits.

/// Width of one indentation step in generated code.
const INDENT_STEP: usize = 4;

/// Leading whitespace width in characters, not bytes; indentation may mix
/// multi-byte whitespace like U+00A0 into otherwise ASCII lines.
fn leading_width(line: &str) -> usize {
    line.chars().take_while(|c| c.is_whitespace()).count()
}

/// Drop the first `margin` characters of a line at a char boundary.
fn strip_margin(line: &str, margin: usize) -> &str {
    line.char_indices()
        .nth(margin)
        .map(|(idx, _)| &line[idx..])
        .unwrap_or("")
}

/// True when every non-blank, non-comment line is an import statement.
/// Such a file is structurally empty: a new symbol can follow the import
/// block directly.
pub fn only_has_imports(content: &str) -> bool {
    let mut saw_any = false;
    for line in content.lines() {
        let stripped = line.trim();
        if stripped.is_empty() || stripped.starts_with('#') {
            continue;
        }
        if stripped.starts_with("import ") || stripped.starts_with("from ") {
            saw_any = true;
        } else {
            return false;
        }
    }
    saw_any
}

/// Append a top-level function or class after the existing text, separated
/// by exactly one blank line, with a trailing newline preserved.
pub fn append_symbol(original: &str, fragment: &str) -> String {
    if original.trim().is_empty() || only_has_imports(original) {
        return format!("{}\n\n{}", original.trim_end(), fragment.trim_end());
    }
    format!("{}\n\n{}\n", original.trim_end(), fragment.trim_end())
}

/// Strip the common leading whitespace from every non-blank line of a
/// fragment so it can be re-homed at an arbitrary indent.
pub fn dedent(fragment: &str) -> String {
    let common = fragment
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(leading_width)
        .min()
        .unwrap_or(0);

    fragment
        .lines()
        .map(|line| {
            if line.trim().is_empty() {
                String::new()
            } else {
                strip_margin(line, common).to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Line index of the `class <name>` header, if present.
fn find_class_header(lines: &[&str], name: &str) -> Option<usize> {
    let prefix = format!("class {name}");
    lines.iter().position(|line| {
        let stripped = line.trim_start();
        if !stripped.starts_with(&prefix) {
            return false;
        }
        // Reject prefix collisions like `class CalculatorBase` for `Calculator`.
        match stripped.as_bytes().get(prefix.len()) {
            None => true,
            Some(&b) => !(b.is_ascii_alphanumeric() || b == b'_'),
        }
    })
}

/// Splice a method into the body of `class_name`, re-indented one step
/// inside the class header, preceded by one blank line, immediately before
/// the first line that leaves the class body.
pub fn add_method(content: &str, class_name: &str, fragment: &str) -> Result<String, String> {
    let lines: Vec<&str> = content.lines().collect();

    let header = find_class_header(&lines, class_name)
        .ok_or_else(|| format!("Class {class_name} not found"))?;
    let class_indent = leading_width(lines[header]);

    // Class body ends at the first non-blank line back at (or above) the
    // header's indent, or at end of file.
    let mut boundary = lines.len();
    for (i, line) in lines.iter().enumerate().skip(header + 1) {
        if line.trim().is_empty() {
            continue;
        }
        if leading_width(line) <= class_indent {
            boundary = i;
            break;
        }
    }

    let method_indent = " ".repeat(class_indent + INDENT_STEP);
    let indented: Vec<String> = dedent(fragment)
        .lines()
        .map(|line| {
            if line.trim().is_empty() {
                String::new()
            } else {
                format!("{method_indent}{line}")
            }
        })
        .collect();

    let mut out: Vec<String> = Vec::with_capacity(lines.len() + indented.len() + 1);
    out.extend(lines[..boundary].iter().map(|l| l.to_string()));
    out.push(String::new());
    out.extend(indented);
    out.extend(lines[boundary..].iter().map(|l| l.to_string()));

    let mut result = out.join("\n");
    if content.ends_with('\n') && !result.ends_with('\n') {
        result.push('\n');
    }
    Ok(result)
}

/// Insert an import line at the top of the module, after any shebang or
/// encoding comment, the module docstring, and the existing import run.
/// Returns `None` when the exact line is already present (idempotence).
pub fn insert_import(content: &str, statement: &str) -> Option<String> {
    let statement = statement.trim();
    if content.lines().any(|line| line.trim() == statement) {
        return None;
    }

    let lines: Vec<&str> = content.lines().collect();
    let mut insertion = 0usize;
    let mut i = 0usize;
    while i < lines.len() {
        let line = lines[i];
        let stripped = line.trim();

        if line.starts_with("#!") || (line.starts_with('#') && (stripped.contains("coding") || stripped.contains("encoding"))) {
            insertion = i + 1;
        } else if stripped.starts_with("\"\"\"") || stripped.starts_with("'''") {
            let quote = if stripped.starts_with("\"\"\"") { "\"\"\"" } else { "'''" };
            if stripped.matches(quote).count() >= 2 {
                insertion = i + 1;
            } else {
                // Multi-line docstring: skip to its closing quote.
                let mut closed = false;
                for (j, later) in lines.iter().enumerate().skip(i + 1) {
                    if later.contains(quote) {
                        insertion = j + 1;
                        i = j;
                        closed = true;
                        break;
                    }
                }
                if !closed {
                    break;
                }
            }
        } else if stripped.starts_with("import ") || stripped.starts_with("from ") {
            insertion = i + 1;
        } else if !stripped.is_empty() && !stripped.starts_with('#') {
            break;
        }
        i += 1;
    }

    let mut out: Vec<&str> = Vec::with_capacity(lines.len() + 1);
    out.extend(&lines[..insertion]);
    out.push(statement);
    out.extend(&lines[insertion..]);

    let mut result = out.join("\n");
    if content.ends_with('\n') {
        result.push('\n');
    }
    Some(result)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_has_imports() {
        assert!(only_has_imports("import os\nfrom pathlib import Path\n"));
        assert!(only_has_imports("# deps\nimport os\n\n"));
        assert!(!only_has_imports("import os\n\ndef f():\n    pass\n"));
        assert!(!only_has_imports(""));
        assert!(!only_has_imports("\n\n"));
    }

    #[test]
    fn test_append_symbol_separation() {
        let out = append_symbol("def a():\n    pass\n", "def b():\n    pass");
        assert_eq!(out, "def a():\n    pass\n\ndef b():\n    pass\n");
    }

    #[test]
    fn test_append_symbol_to_imports_only_file() {
        let out = append_symbol("import os\n", "def b():\n    pass");
        assert_eq!(out, "import os\n\ndef b():\n    pass");
    }

    #[test]
    fn test_dedent_preserves_relative_structure() {
        let fragment = "    def m(self):\n        return 1\n";
        assert_eq!(dedent(fragment), "def m(self):\n    return 1");
    }

    #[test]
    fn test_add_method_indent_and_position() {
        let content = "class Calculator:\n    def add(self, a, b):\n        return a + b\n\nprint(1)\n";
        let fragment = "def sub(self, a, b):\n    return a - b";
        let out = add_method(content, "Calculator", fragment).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        // Spliced before `print(1)`: existing blank, separator blank, method.
        assert_eq!(lines[3], "");
        assert_eq!(lines[4], "");
        assert_eq!(lines[5], "    def sub(self, a, b):");
        assert_eq!(lines[6], "        return a - b");
        assert_eq!(*lines.last().unwrap(), "print(1)");
    }

    #[test]
    fn test_add_method_at_end_of_file() {
        let content = "class Calculator:\n    def add(self, a, b):\n        return a + b\n";
        let out = add_method(content, "Calculator", "def neg(self, a):\n    return -a").unwrap();
        assert!(out.ends_with("    def neg(self, a):\n        return -a\n"));
    }

    #[test]
    fn test_dedent_mixed_unicode_whitespace() {
        // NBSP margin on one line, ASCII space on the next.
        let fragment = "\u{a0}def m(self):\n pass";
        assert_eq!(dedent(fragment), "def m(self):\npass");
    }

    #[test]
    fn test_add_method_unicode_whitespace_margin() {
        let content = "class Calculator:\n    def add(self, a, b):\n        return a + b\n";
        let out = add_method(content, "Calculator", "\u{a0}def m(self):\n pass").unwrap();
        assert!(out.contains("\n    def m(self):"));
    }

    #[test]
    fn test_add_method_rejects_prefix_collision() {
        let content = "class CalculatorBase:\n    pass\n";
        let err = add_method(content, "Calculator", "def m(self):\n    pass").unwrap_err();
        assert!(err.contains("Calculator not found"));
    }

    #[test]
    fn test_add_method_nested_class_indent() {
        let content = "class Outer:\n    class Inner:\n        pass\n";
        let out = add_method(content, "Inner", "def m(self):\n    pass").unwrap();
        assert!(out.contains("\n        def m(self):\n            pass"));
    }

    #[test]
    fn test_insert_import_idempotent() {
        let content = "import os\n\ndef f():\n    pass\n";
        assert!(insert_import(content, "import os").is_none());
        let once = insert_import(content, "import sys").unwrap();
        assert!(insert_import(&once, "import sys").is_none());
        assert_eq!(once.matches("import sys").count(), 1);
    }

    #[test]
    fn test_insert_import_after_docstring_and_imports() {
        let content = "#!/usr/bin/env python\n\"\"\"Module doc.\n\nMore.\n\"\"\"\nimport os\n\ndef f():\n    pass\n";
        let out = insert_import(content, "import sys").unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[5], "import os");
        assert_eq!(lines[6], "import sys");
    }

    #[test]
    fn test_insert_import_into_bare_code() {
        let out = insert_import("x = 1\n", "import os").unwrap();
        assert_eq!(out, "import os\nx = 1\n");
    }
}
