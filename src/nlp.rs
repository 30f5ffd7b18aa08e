use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use stop_words::{get, LANGUAGE};
use unicode_normalization::UnicodeNormalization;

use crate::error::{PipelineError, Result};

static SHARED: OnceLock<LinguisticResources> = OnceLock::new();

/// Stopword set, lemma reducer, and cleaning pattern shared by every tokenizer.
///
/// Built once per process through [`LinguisticResources::shared`] and handed
/// to tokenizers by reference. Immutable after construction.
pub struct LinguisticResources {
    stopwords: HashSet<String>,
    stemmer: Stemmer,
    non_alphanumeric: Regex,
}

impl LinguisticResources {
    /// Build a fresh set of resources
    pub fn new() -> Result<Self> {
        let non_alphanumeric = Regex::new(r"[^a-zA-Z0-9]")
            .map_err(|e| PipelineError::InvalidConfig(format!("Failed to compile token regex: {e}")))?;

        // Initialize stopwords for English
        let stopwords: HashSet<String> = get(LANGUAGE::English)
            .iter()
            .map(ToString::to_string)
            .collect();

        Ok(Self {
            stopwords,
            stemmer: Stemmer::create(Algorithm::English),
            non_alphanumeric,
        })
    }

    /// Process-wide instance, built on first use
    pub fn shared() -> Result<&'static Self> {
        if let Some(resources) = SHARED.get() {
            return Ok(resources);
        }
        let resources = Self::new()?;
        Ok(SHARED.get_or_init(|| resources))
    }

    /// Whether `word` is in the stopword set
    #[must_use]
    pub fn is_stopword(&self, word: &str) -> bool {
        self.stopwords.contains(word)
    }

    /// Reduce a word to its base form
    #[must_use]
    pub fn lemmatize(&self, word: &str) -> String {
        self.stemmer.stem(word).into_owned()
    }
}

/// Turns raw message text into normalized word tokens
#[derive(Clone, Copy)]
pub struct Tokenizer<'a> {
    resources: &'a LinguisticResources,
}

impl<'a> Tokenizer<'a> {
    /// Create a tokenizer over the given resources
    #[must_use]
    pub const fn new(resources: &'a LinguisticResources) -> Self {
        Self { resources }
    }

    /// Lowercase, replace non-alphanumerics with spaces, split, drop
    /// stopwords, and lemmatize. No output token is a stopword. Token order follows the input and
    /// duplicates are kept.
    #[must_use]
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let lowered = text.nfc().collect::<String>().to_lowercase();
        let cleaned = self.resources.non_alphanumeric.replace_all(&lowered, " ");

        cleaned
            .split_whitespace()
            .filter(|word| !self.resources.is_stopword(word))
            .map(|word| self.resources.lemmatize(word))
            // Stemming can land on a stopword ("hims" -> "him")
            .filter(|token| !self.resources.is_stopword(token))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_removes_stopwords_and_punctuation() {
        let resources = LinguisticResources::new().expect("Failed to build resources");
        let tokenizer = Tokenizer::new(&resources);

        let tokens = tokenizer.tokenize("We need WATER, food and tents!!!");
        assert!(!tokens.contains(&"we".to_string()));
        assert!(!tokens.contains(&"and".to_string()));
        assert!(tokens.contains(&"water".to_string()));
        assert!(tokens.contains(&"food".to_string()));
        assert!(tokens.iter().all(|t| t.chars().all(|c| c.is_ascii_alphanumeric())));
    }

    #[test]
    fn test_tokenize_keeps_order_and_duplicates() {
        let resources = LinguisticResources::new().expect("Failed to build resources");
        let tokenizer = Tokenizer::new(&resources);

        let tokens = tokenizer.tokenize("water food water");
        assert_eq!(tokens, vec!["water", "food", "water"]);
    }

    #[test]
    fn test_tokenize_reduces_plurals() {
        let resources = LinguisticResources::new().expect("Failed to build resources");
        let tokenizer = Tokenizer::new(&resources);

        assert_eq!(tokenizer.tokenize("tents"), vec!["tent"]);
    }

    #[test]
    fn test_stems_that_are_stopwords_are_dropped() {
        let resources = LinguisticResources::new().expect("Failed to build resources");
        let tokenizer = Tokenizer::new(&resources);

        let tokens = tokenizer.tokenize("hims thems doings shelter");
        assert!(tokens.iter().all(|t| !resources.is_stopword(t)));
        assert!(tokens.contains(&"shelter".to_string()));
    }

    #[test]
    fn test_shared_resources_are_reused() {
        let first = LinguisticResources::shared().unwrap();
        let second = LinguisticResources::shared().unwrap();
        assert!(std::ptr::eq(first, second));
    }
}
