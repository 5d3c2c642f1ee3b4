//! Keyword-based sensitivity classifier

use crate::config::ClassifierConfig;
use crate::error::{Error, Result};
use regex::{Regex, RegexBuilder};

/// Decides whether extracted text is sensitive.
///
/// Implementations must be pure and infallible: anything that goes wrong
/// internally reports "not sensitive".
pub trait ContentClassifier: Send + Sync {
    fn is_sensitive(&self, text: &str) -> bool;
}

/// Classifier matching a fixed keyword list, case-insensitively.
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    pattern: Option<Regex>,
}

impl KeywordClassifier {
    /// Compile the keywords into a single alternation of escaped literals.
    pub fn new<I, S>(keywords: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let alternatives: Vec<String> = keywords
            .into_iter()
            .map(|k| k.as_ref().trim().to_string())
            .filter(|k| !k.is_empty())
            .map(|k| regex::escape(&k))
            .collect();

        if alternatives.is_empty() {
            return Ok(Self { pattern: None });
        }

        let pattern = RegexBuilder::new(&alternatives.join("|"))
            .case_insensitive(true)
            .build()
            .map_err(|e| Error::Config(format!("Invalid classifier keywords: {}", e)))?;

        Ok(Self {
            pattern: Some(pattern),
        })
    }

    pub fn from_config(config: &ClassifierConfig) -> Result<Self> {
        Self::new(&config.keywords)
    }
}

impl ContentClassifier for KeywordClassifier {
    fn is_sensitive(&self, text: &str) -> bool {
        self.pattern
            .as_ref()
            .map(|p| p.is_match(text))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_classifier() -> KeywordClassifier {
        KeywordClassifier::from_config(&ClassifierConfig::default()).unwrap()
    }

    #[test]
    fn test_matches_default_keywords() {
        let classifier = default_classifier();
        assert!(classifier.is_sensitive("Report for the Turkish Armed Forces"));
        assert!(classifier.is_sensitive("TOP SECRET"));
        assert!(classifier.is_sensitive("this is confidential, do not share"));
    }

    #[test]
    fn test_normal_text() {
        let classifier = default_classifier();
        assert!(!classifier.is_sensitive("Hello, how are you today?"));
        assert!(!classifier.is_sensitive(""));
    }

    #[test]
    fn test_keywords_are_literal() {
        let classifier = KeywordClassifier::new(["a.b", "(x)"]).unwrap();
        assert!(classifier.is_sensitive("see A.B here"));
        assert!(!classifier.is_sensitive("axb"));
        assert!(classifier.is_sensitive("value (X)"));
    }

    #[test]
    fn test_empty_keyword_list() {
        let classifier = KeywordClassifier::new(Vec::<String>::new()).unwrap();
        assert!(!classifier.is_sensitive("secret"));

        let classifier = KeywordClassifier::new(["", "   "]).unwrap();
        assert!(!classifier.is_sensitive("anything"));
    }
}
