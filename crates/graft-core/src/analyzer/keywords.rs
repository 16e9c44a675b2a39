//! Keyword vocabularies and scoring tables for requirement analysis.
//!
//! The tables are hand-tuned triage heuristics, not calibrated metrics, so
//! they live in a replaceable [`Lexicon`] value instead of hard-wired
//! constants.  `Lexicon::default()` carries the stock tables.

use indexmap::IndexSet;

/// Arithmetic operation nouns and verbs.
const MATH_KEYWORDS: &[&str] = &[
    "add",
    "addition",
    "sum",
    "subtract",
    "subtraction",
    "minus",
    "multiply",
    "multiplication",
    "times",
    "divide",
    "division",
    "calculate",
    "compute",
    "operation",
    "arithmetic",
];

/// Data-structure nouns.
const DATA_KEYWORDS: &[&str] = &[
    "list",
    "array",
    "string",
    "number",
    "integer",
    "float",
    "dictionary",
    "set",
    "tuple",
    "collection",
];

/// Action verbs.
const ACTION_KEYWORDS: &[&str] = &[
    "create", "generate", "build", "implement", "add", "modify", "update", "delete", "remove",
    "validate", "check", "verify", "test", "parse", "format",
];

/// Interface and UI nouns.
const UI_KEYWORDS: &[&str] = &[
    "interface", "ui", "user", "input", "output", "display", "menu", "option", "choice", "prompt",
    "cli", "command",
];

/// Per-keyword complexity weight added on top of the 1.0 base.
const COMPLEXITY_WEIGHTS: &[(&str, f64)] = &[
    ("validate", 0.3),
    ("error", 0.3),
    ("exception", 0.3),
    ("test", 0.2),
    ("interface", 0.4),
    ("ui", 0.5),
    ("database", 0.6),
    ("api", 0.5),
    ("async", 0.4),
    ("thread", 0.4),
    ("network", 0.5),
    ("file", 0.2),
    ("parse", 0.3),
    ("format", 0.2),
    ("sort", 0.2),
    ("search", 0.3),
    ("algorithm", 0.4),
];

/// Keyword-triggered library suggestions.
const DEPENDENCY_SUGGESTIONS: &[(&str, &[&str])] = &[
    ("test", &["pytest", "unittest"]),
    ("validate", &["pydantic", "marshmallow"]),
    ("parse", &["argparse", "configparser"]),
    ("format", &["datetime", "json"]),
    ("file", &["pathlib", "os"]),
    ("network", &["requests", "urllib"]),
    ("database", &["sqlite3", "sqlalchemy"]),
    ("ui", &["tkinter", "PyQt", "streamlit"]),
    ("api", &["fastapi", "flask", "requests"]),
];

/// Words that escalate complexity when present anywhere in a description.
const ESCALATION_WORDS: &[&str] = &["complex", "advanced", "sophisticated"];

/// Words that indicate breadth of scope.
const BREADTH_WORDS: &[&str] = &["multiple", "various", "different"];

/// The vocabulary and weight tables driving analysis.
#[derive(Clone, Debug)]
pub struct Lexicon {
    pub keywords: Vec<String>,
    pub complexity_weights: Vec<(String, f64)>,
    pub dependency_suggestions: Vec<(String, Vec<String>)>,
    pub escalation_words: Vec<String>,
    pub breadth_words: Vec<String>,
}

impl Default for Lexicon {
    fn default() -> Self {
        let keywords = MATH_KEYWORDS
            .iter()
            .chain(DATA_KEYWORDS)
            .chain(ACTION_KEYWORDS)
            .chain(UI_KEYWORDS)
            .map(|s| s.to_string())
            .collect();
        Lexicon {
            keywords,
            complexity_weights: COMPLEXITY_WEIGHTS
                .iter()
                .map(|(k, w)| (k.to_string(), *w))
                .collect(),
            dependency_suggestions: DEPENDENCY_SUGGESTIONS
                .iter()
                .map(|(k, libs)| (k.to_string(), libs.iter().map(|l| l.to_string()).collect()))
                .collect(),
            escalation_words: ESCALATION_WORDS.iter().map(|s| s.to_string()).collect(),
            breadth_words: BREADTH_WORDS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Lexicon {
    /// Case-insensitive substring scan of `description` against the
    /// vocabulary, deduplicated in first-seen order.  An empty hit set is a
    /// valid outcome.
    pub fn extract_keywords(&self, description: &str) -> Vec<String> {
        let lowered = description.to_lowercase();
        let mut hits: IndexSet<String> = IndexSet::new();
        for keyword in &self.keywords {
            if lowered.contains(keyword.as_str()) {
                hits.insert(keyword.clone());
            }
        }
        hits.into_iter().collect()
    }

    pub fn weight_for(&self, keyword: &str) -> Option<f64> {
        self.complexity_weights
            .iter()
            .find(|(k, _)| k == keyword)
            .map(|(_, w)| *w)
    }

    pub fn suggestions_for(&self, keyword: &str) -> &[String] {
        self.dependency_suggestions
            .iter()
            .find(|(k, _)| k == keyword)
            .map(|(_, libs)| libs.as_slice())
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_keywords_dedup() {
        let lexicon = Lexicon::default();
        // "add" appears twice; "addition" contains "add" as a substring too.
        let hits = lexicon.extract_keywords("Add two numbers, then add a third");
        assert!(hits.contains(&"add".to_string()));
        assert_eq!(hits.iter().filter(|k| *k == "add").count(), 1);
    }

    #[test]
    fn test_extract_keywords_empty() {
        let lexicon = Lexicon::default();
        assert!(lexicon.extract_keywords("").is_empty());
        assert!(lexicon.extract_keywords("lorem ipsum dolor").is_empty());
    }

    #[test]
    fn test_case_insensitive() {
        let lexicon = Lexicon::default();
        let hits = lexicon.extract_keywords("VALIDATE the Input");
        assert!(hits.contains(&"validate".to_string()));
        assert!(hits.contains(&"input".to_string()));
    }

    #[test]
    fn test_weight_lookup() {
        let lexicon = Lexicon::default();
        assert_eq!(lexicon.weight_for("database"), Some(0.6));
        assert_eq!(lexicon.weight_for("add"), None);
    }

    #[test]
    fn test_suggestions_lookup() {
        let lexicon = Lexicon::default();
        assert_eq!(lexicon.suggestions_for("test"), &["pytest", "unittest"]);
        assert!(lexicon.suggestions_for("add").is_empty());
    }
}
