//! Keyword classifier
//!
//! Assigns an ESG category to a label by case-insensitive substring
//! matching against per-category keyword lists. Categories are checked in
//! a fixed priority order (environmental, social, governance) and the
//! first one with a matching keyword wins, so a label such as
//! "Employee energy training" is always environmental.

use esg_core::{Category, ClassifierConfig};

use crate::Categorizer;

/// Rule-based classifier over ordered keyword lists
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    /// (category, lowercase keywords), in priority order
    rules: Vec<(Category, Vec<String>)>,
}

impl KeywordClassifier {
    /// Create a classifier with the default ESG keyword lists
    pub fn new() -> Self {
        Self::from_config(&ClassifierConfig::default())
    }

    /// Create a classifier from configured keyword lists
    pub fn from_config(config: &ClassifierConfig) -> Self {
        let mut classifier = Self { rules: Vec::new() };

        for category in Category::PRIORITY {
            let keywords = match category {
                Category::Environmental => &config.environmental,
                Category::Social => &config.social,
                Category::Governance => &config.governance,
                Category::Unknown => continue,
            };
            classifier.add_keywords(category, keywords);
        }

        classifier
    }

    /// Add keywords to a category, keeping priority order
    fn add_keywords(&mut self, category: Category, keywords: &[String]) {
        let normalized = keywords
            .iter()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty());

        match self.rules.iter_mut().find(|(c, _)| *c == category) {
            Some((_, existing)) => existing.extend(normalized),
            None => {
                self.rules.push((category, normalized.collect()));
                self.rules.sort_by_key(|(c, _)| *c);
            }
        }
    }

    /// Keywords of a category, lowercased
    pub fn keywords(&self, category: Category) -> &[String] {
        self.rules
            .iter()
            .find(|(c, _)| *c == category)
            .map(|(_, k)| k.as_slice())
            .unwrap_or(&[])
    }

    /// First keyword of `category` found in `text`
    pub fn matched_keyword(&self, text: &str, category: Category) -> Option<&str> {
        let text_lower = text.to_lowercase();
        self.keywords(category)
            .iter()
            .find(|k| text_lower.contains(k.as_str()))
            .map(String::as_str)
    }
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Categorizer for KeywordClassifier {
    fn categorize(&self, text: &str) -> Category {
        if text.trim().is_empty() {
            return Category::Unknown;
        }

        let text_lower = text.to_lowercase();
        self.rules
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| text_lower.contains(k.as_str())))
            .map(|(category, _)| *category)
            .unwrap_or(Category::Unknown)
    }
}

// ============================================================================
// Tests
// ============================================================================
