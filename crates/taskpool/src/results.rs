//! Concurrency-safe store for task outputs.

use std::collections::HashMap;
use std::sync::RwLock;

/// A typed key-value store tasks publish their outputs into.
///
/// Commands running under the scheduler use this to hand a task's output
/// (a fetched payload, a created remote id) to logic that runs after the
/// scheduler returns, keyed by task id. Entries live for the duration of
/// the run; there is no eviction.
#[derive(Debug, Default)]
pub struct Results<T> {
    inner: RwLock<HashMap<String, T>>,
}

impl<T: Clone> Results<T> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }

    pub fn store(&self, key: &str, value: T) {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        guard.insert(key.to_string(), value);
    }

    pub fn get(&self, key: &str) -> Option<T> {
        let guard = self.inner.read().unwrap_or_else(|e| e.into_inner());
        guard.get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        let guard = self.inner.read().unwrap_or_else(|e| e.into_inner());
        guard.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn store_and_get() {
        let results = Results::new();
        results.store("event:checkout", "ev_1".to_string());

        assert_eq!(results.get("event:checkout"), Some("ev_1".to_string()));
        assert_eq!(results.get("event:ghost"), None);
        assert_eq!(results.keys(), vec!["event:checkout".to_string()]);
    }

    #[test]
    fn concurrent_writers_are_all_observed() {
        let results = Arc::new(Results::new());

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let results = Arc::clone(&results);
                std::thread::spawn(move || results.store(&format!("task-{i}"), i))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(results.keys().len(), 16);
        assert_eq!(results.get("task-7"), Some(7));
    }
}
