//! Abstract storage interfaces for pluggable backends
//!
//! The game engine only reads word lists, so the interface is a read-only
//! category lookup.

/// Read-only category -> word list lookup
pub trait WordSource: Send + Sync {
    /// Words of a category, uppercase. `None` if the category does not exist.
    fn words(&self, category: &str) -> Option<Vec<String>>;

    /// Every category this source can serve
    fn categories(&self) -> Vec<String>;

    fn has_category(&self, category: &str) -> bool {
        self.words(category).is_some()
    }
}
