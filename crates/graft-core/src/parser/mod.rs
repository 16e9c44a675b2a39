//! Source parsing: one structural description per file.
//!
//! Each language plugs in through [`LanguageParser`], keyed by a language
//! identifier; the analyzer and integrator only ever see the language-neutral
//! [`SourceUnit`](crate::models::SourceUnit) shapes that come out of it.

pub mod filesystem;
pub mod python;
pub mod snapshot;
pub mod typescript;

use crate::config::GraftConfig;
use crate::models::SourceUnit;

/// A structural parser for one language.
///
/// `parse` never fails: malformed input yields a unit with empty descriptor
/// lists and `parse_error` set.
pub trait LanguageParser {
    /// Language identifier this parser handles ("python", "typescript", ...).
    fn language(&self) -> &'static str;

    fn parse(&self, path: &str, text: &str) -> SourceUnit;
}

/// Registry of language parsers, consulted by extension-detected language id.
pub struct ParserRegistry {
    parsers: Vec<Box<dyn LanguageParser>>,
}

impl ParserRegistry {
    pub fn new() -> Self {
        ParserRegistry {
            parsers: Vec::new(),
        }
    }

    /// Registry with every built-in parser, configured from `config`.
    pub fn with_defaults(config: &GraftConfig) -> Self {
        let mut registry = ParserRegistry::new();
        registry.register(Box::new(python::PythonParser::new(config.clone())));
        registry.register(Box::new(typescript::TypeScriptParser::new(config.clone())));
        registry
    }

    pub fn register(&mut self, parser: Box<dyn LanguageParser>) {
        self.parsers.push(parser);
    }

    pub fn get(&self, language: &str) -> Option<&dyn LanguageParser> {
        self.parsers
            .iter()
            .find(|p| p.language() == language)
            .map(|p| p.as_ref())
    }

    pub fn supports(&self, language: &str) -> bool {
        self.get(language).is_some()
    }

    /// Parse `text` with the parser registered for `language`.  An unknown
    /// language is a file-scoped failure, not a hard error.
    pub fn parse(&self, path: &str, text: &str, language: &str) -> SourceUnit {
        match self.get(language) {
            Some(parser) => parser.parse(path, text),
            None => SourceUnit::broken(
                path,
                language,
                format!("No parser registered for language: {language}"),
            ),
        }
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        ParserRegistry::with_defaults(&GraftConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_lookup() {
        let registry = ParserRegistry::default();
        assert!(registry.supports("python"));
        assert!(registry.supports("typescript"));
        assert!(!registry.supports("cobol"));
    }

    #[test]
    fn test_unknown_language_is_file_scoped() {
        let registry = ParserRegistry::default();
        let unit = registry.parse("prog.cob", "MOVE 1 TO X.", "cobol");
        assert!(unit.functions.is_empty());
        assert!(unit.parse_error.unwrap().contains("cobol"));
    }
}
