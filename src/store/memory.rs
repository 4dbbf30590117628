//! In-process list store
//!
//! Clones share the same lists, so several writers (or a writer and a test)
//! can point at one key the way separate processes share a Redis key.

use super::{Connect, ListStore, LogList, StoreError};
use crate::config::LedisConfig;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// In-memory list store for tests, benchmarks and single-process use
#[derive(Debug, Clone, Default)]
pub struct InMemoryListStore {
    lists: Arc<RwLock<HashMap<String, LogList>>>,
    closed: bool,
}

impl InMemoryListStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whole list, head first (for tests)
    pub fn snapshot(&self, key: &str) -> Vec<String> {
        self.lists
            .read()
            .get(key)
            .map(|list| list.range(0, -1))
            .unwrap_or_default()
    }

    /// Number of keys holding a list
    pub fn key_count(&self) -> usize {
        self.lists.read().len()
    }

    /// True between `close()` and the next call on this handle
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    // Like a Redis client, a closed handle reconnects on its next call
    fn reopen(&mut self) {
        self.closed = false;
    }
}

impl ListStore for InMemoryListStore {
    fn push_head(&mut self, key: &str, value: &str) -> Result<usize, StoreError> {
        self.reopen();
        let mut lists = self.lists.write();
        Ok(lists
            .entry(key.to_string())
            .or_default()
            .lpush(value.to_string()))
    }

    fn trim(&mut self, key: &str, start: isize, stop: isize) -> Result<(), StoreError> {
        self.reopen();
        let mut lists = self.lists.write();
        let emptied = match lists.get_mut(key) {
            Some(list) => {
                list.trim(start, stop);
                list.is_empty()
            }
            None => false,
        };
        // Redis deletes keys whose list became empty
        if emptied {
            lists.remove(key);
        }
        Ok(())
    }

    fn range(&mut self, key: &str, start: isize, stop: isize) -> Result<Vec<String>, StoreError> {
        self.reopen();
        Ok(self
            .lists
            .read()
            .get(key)
            .map(|list| list.range(start, stop))
            .unwrap_or_default())
    }

    fn len(&mut self, key: &str) -> Result<usize, StoreError> {
        self.reopen();
        Ok(self.lists.read().get(key).map_or(0, LogList::len))
    }

    fn close(&mut self) -> Result<(), StoreError> {
        self.closed = true;
        Ok(())
    }
}

impl Connect for InMemoryListStore {
    fn connect(_config: &LedisConfig) -> Self {
        InMemoryListStore::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_range() {
        let mut store = InMemoryListStore::new();
        store.push_head("log", "one").unwrap();
        store.push_head("log", "two").unwrap();

        assert_eq!(store.range("log", 0, -1).unwrap(), vec!["two", "one"]);
        assert_eq!(store.len("log").unwrap(), 2);
        assert_eq!(store.len("other").unwrap(), 0);
        assert!(store.range("other", 0, 10).unwrap().is_empty());
    }

    #[test]
    fn test_clones_share_lists() {
        let mut a = InMemoryListStore::new();
        let mut b = a.clone();

        a.push_head("log", "from-a").unwrap();
        b.push_head("log", "from-b").unwrap();

        assert_eq!(a.snapshot("log"), vec!["from-b", "from-a"]);
    }

    #[test]
    fn test_trim_to_empty_removes_key() {
        let mut store = InMemoryListStore::new();
        store.push_head("log", "x").unwrap();
        store.trim("log", 1, 0).unwrap();

        assert_eq!(store.key_count(), 0);
        assert_eq!(store.len("log").unwrap(), 0);
    }

    #[test]
    fn test_closed_handle_reconnects() {
        let mut store = InMemoryListStore::new();
        store.push_head("log", "x").unwrap();
        store.close().unwrap();
        assert!(store.is_closed());

        assert_eq!(store.len("log").unwrap(), 1);
        assert!(!store.is_closed());
    }
}
