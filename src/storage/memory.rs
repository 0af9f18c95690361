//! In-memory word lists
//!
//! Ships with a few built-in categories and can be replaced by a JSON file of
//! the form `{"Category": ["word", ...]}`.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use super::traits::WordSource;
use crate::error::{Result, WordRushError};

const BUILTIN_CATEGORIES: &[(&str, &[&str])] = &[
    (
        "Animals",
        &[
            "TIGER", "ELEPHANT", "GIRAFFE", "ZEBRA", "MONKEY", "PENGUIN", "DOLPHIN", "KANGAROO",
            "RABBIT", "TURTLE", "PARROT", "LEOPARD", "CHEETAH", "BEAVER", "OTTER", "FALCON",
        ],
    ),
    (
        "Food",
        &[
            "PIZZA", "PASTA", "BURGER", "SALAD", "CHEESE", "BREAD", "BANANA", "ORANGE", "NOODLE",
            "TACO", "CURRY", "WAFFLE", "PANCAKE", "YOGURT", "MANGO", "CARROT",
        ],
    ),
    (
        "Science",
        &[
            "ATOM", "GRAVITY", "PHOTON", "NEUTRON", "PROTON", "ENZYME", "GENOME", "PLASMA",
            "ISOTOPE", "MOLECULE", "QUANTUM", "CATALYST", "FOSSIL", "MAGNET", "OXYGEN", "CARBON",
        ],
    ),
    (
        "Sports",
        &[
            "SOCCER", "TENNIS", "HOCKEY", "RUGBY", "GOLF", "BOXING", "KARATE", "ROWING", "SKIING",
            "SURFING", "CYCLING", "CRICKET", "FENCING", "ARCHERY", "DIVING", "JUDO",
        ],
    ),
    (
        "Geography",
        &[
            "RIVER", "DESERT", "CANYON", "VOLCANO", "ISLAND", "GLACIER", "PLATEAU", "DELTA",
            "LAGOON", "TUNDRA", "VALLEY", "OCEAN", "SUMMIT", "CRATER", "FJORD", "SAVANNA",
        ],
    ),
];

/// Word lists held in memory, keyed by category name
#[derive(Debug, Clone, Default)]
pub struct MemoryWordSource {
    categories: BTreeMap<String, Vec<String>>,
}

impl MemoryWordSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// The lists compiled into the server
    pub fn builtin() -> Self {
        let mut source = Self::new();
        for (category, words) in BUILTIN_CATEGORIES {
            source.insert(category, words.iter().map(|w| w.to_string()));
        }
        source
    }

    /// Parse a `{category: [words]}` JSON object
    pub fn from_json_str(json: &str) -> Result<Self> {
        let raw: BTreeMap<String, Vec<String>> = serde_json::from_str(json)
            .map_err(|e| WordRushError::ConfigError(format!("invalid word list: {}", e)))?;

        let mut source = Self::new();
        for (category, words) in raw {
            source.insert(&category, words);
        }
        if source.categories.is_empty() {
            return Err(WordRushError::ConfigError(
                "word list has no usable categories".to_string(),
            ));
        }
        Ok(source)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|e| {
            WordRushError::ConfigError(format!("cannot read word list {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&json)
    }

    /// Add or replace a category. Words are uppercased; entries with anything
    /// but letters are dropped, as are duplicates.
    pub fn insert(&mut self, category: &str, words: impl IntoIterator<Item = String>) {
        let mut cleaned: Vec<String> = Vec::new();
        for word in words {
            let word = word.trim().to_uppercase();
            if word.is_empty() || !word.chars().all(|c| c.is_ascii_alphabetic()) {
                log::warn!("Skipping word '{}' in category {}", word, category);
                continue;
            }
            if !cleaned.contains(&word) {
                cleaned.push(word);
            }
        }
        if cleaned.is_empty() {
            log::warn!("Category {} has no usable words", category);
            return;
        }
        self.categories.insert(category.trim().to_string(), cleaned);
    }

    fn find(&self, category: &str) -> Option<&Vec<String>> {
        let category = category.trim();
        self.categories.get(category).or_else(|| {
            self.categories
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(category))
                .map(|(_, words)| words)
        })
    }
}

impl WordSource for MemoryWordSource {
    fn words(&self, category: &str) -> Option<Vec<String>> {
        self.find(category).cloned()
    }

    fn categories(&self) -> Vec<String> {
        self.categories.keys().cloned().collect()
    }
}
