//! Recently used search terms

use serde_json::Value;

use crate::config::LocalStore;

pub const STORAGE_KEY: &str = "iptv_recent_searches";
pub const MAX_RECENT_SEARCHES: usize = 10;

/// Most recent first, without duplicates
pub struct RecentSearches {
    store: LocalStore,
    terms: Vec<String>,
}

impl RecentSearches {
    pub fn new(store: LocalStore) -> Self {
        let terms = store
            .get(STORAGE_KEY)
            .and_then(|v| serde_json::from_value::<Vec<String>>(v.clone()).ok())
            .unwrap_or_default();
        Self { store, terms }
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    /// Record a submitted search. Blank terms are ignored; a repeated term
    /// (case-insensitive) moves to the front.
    pub fn add(&mut self, term: &str) {
        let term = term.trim();
        if term.is_empty() {
            return;
        }
        let lower = term.to_lowercase();
        self.terms.retain(|t| t.to_lowercase() != lower);
        self.terms.insert(0, term.to_string());
        self.terms.truncate(MAX_RECENT_SEARCHES);
        self.persist();
    }

    pub fn clear(&mut self) {
        self.terms.clear();
        self.store.remove(STORAGE_KEY);
    }

    fn persist(&mut self) {
        let value = Value::from(self.terms.clone());
        self.store.set(STORAGE_KEY, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::temp_path;

    #[test]
    fn test_most_recent_first_without_duplicates() {
        let path = temp_path("recent.json");
        let mut recent = RecentSearches::new(LocalStore::open(path.clone()));
        recent.add("news");
        recent.add("sports");
        recent.add("  News ");
        recent.add("   ");

        assert_eq!(recent.terms(), &["News".to_string(), "sports".to_string()]);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_capped_and_persisted() {
        let path = temp_path("recent.json");
        let mut recent = RecentSearches::new(LocalStore::open(path.clone()));
        for i in 0..15 {
            recent.add(&format!("term {}", i));
        }
        assert_eq!(recent.terms().len(), MAX_RECENT_SEARCHES);
        assert_eq!(recent.terms()[0], "term 14");

        let reloaded = RecentSearches::new(LocalStore::open(path.clone()));
        assert_eq!(reloaded.terms(), recent.terms());

        recent.clear();
        assert!(recent.terms().is_empty());
        assert!(RecentSearches::new(LocalStore::open(path.clone())).terms().is_empty());
        std::fs::remove_file(&path).ok();
    }
}
